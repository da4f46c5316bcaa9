//! End-to-end resolution of small hand-built rosters.

#[path = "../src/test_support.rs"]
mod test_support;

use rosterlink::{
    CandidatePair, Component, MatchConfidence, MatchDecision, RawRecord, RecordId, Resolver,
    ResolverConfig,
};
use test_support::provider;

fn resolver() -> Resolver {
    Resolver::new(ResolverConfig::default()).expect("default config is valid")
}

#[test]
fn shared_npi_with_name_variant_forms_one_cluster() -> anyhow::Result<()> {
    let rows = vec![
        provider("Jon Smith", "1234567890"),
        provider("John Smith", "1234567890"),
    ];
    let resolution = resolver().resolve(&rows)?;

    assert_eq!(resolution.scored_pairs.len(), 1);
    let scored = &resolution.scored_pairs[0];
    assert!(scored.total >= 6.0);
    assert_eq!(scored.decision, MatchDecision::Definite);
    assert!(scored.explanation.feature(Component::NameSimilarity) > 0.9);

    assert_eq!(resolution.clusters.len(), 1);
    assert_eq!(resolution.roster[0].cluster_id, resolution.roster[1].cluster_id);
    assert!(resolution
        .roster
        .iter()
        .all(|entry| entry.match_confidence == MatchConfidence::Definite));
    assert_eq!(resolution.review.decisions.len(), 1);
    Ok(())
}

#[test]
fn npi_conflict_outweighs_shared_license() -> anyhow::Result<()> {
    let licensed = |npi: &str| RawRecord {
        npi: npi.to_string(),
        license_state: "NY".to_string(),
        license_number: "NY12345".to_string(),
        ..RawRecord::default()
    };
    let rows = vec![licensed("1111111111"), licensed("2222222222")];
    let resolution = resolver().resolve(&rows)?;

    assert_eq!(resolution.scored_pairs.len(), 1);
    let scored = &resolution.scored_pairs[0];
    assert_eq!(scored.total, 1.0);
    assert_eq!(scored.decision, MatchDecision::NonMatch);
    assert_eq!(
        scored.explanation.get(Component::NpiConflict).map(|c| c.contribution),
        Some(-4.0)
    );
    assert_eq!(
        scored.explanation.get(Component::LicenseMatch).map(|c| c.contribution),
        Some(5.0)
    );

    assert_eq!(resolution.clusters.len(), 2);
    assert!(resolution
        .roster
        .iter()
        .all(|entry| entry.match_confidence == MatchConfidence::Singleton));
    assert!(resolution.review.is_empty());
    Ok(())
}

#[test]
fn transitive_merge_across_conflict_is_flagged() -> anyhow::Result<()> {
    // 0-1 share an NPI, 1-2 share license and phone, 0-2 meet only in the
    // name block where their NPIs disagree.
    let rows = vec![
        provider("Samuel Ortiz", "1111111111"),
        RawRecord {
            license_state: "FL".into(),
            license_number: "ME88001".into(),
            practice_phone: "813-555-2040".into(),
            ..provider("Samuel Ortiz", "1111111111")
        },
        RawRecord {
            license_state: "FL".into(),
            license_number: "ME88001".into(),
            practice_phone: "(813) 555 2040".into(),
            ..provider("Samuel Ortiz", "3333333333")
        },
    ];
    let resolution = resolver().resolve(&rows)?;

    let outcome = |a: u32, b: u32| {
        let pair = CandidatePair::new(RecordId(a), RecordId(b)).unwrap();
        resolution
            .scored_pairs
            .iter()
            .find(|scored| scored.pair == pair)
            .map(|scored| (scored.decision, scored.has_conflict()))
    };
    assert_eq!(outcome(0, 1), Some((MatchDecision::Definite, false)));
    assert_eq!(outcome(1, 2), Some((MatchDecision::Definite, true)));
    assert_eq!(outcome(0, 2), Some((MatchDecision::NonMatch, true)));

    assert_eq!(resolution.clusters.len(), 1);
    let cluster = &resolution.clusters.clusters[0];
    assert!(cluster.conflict_flag);
    assert_eq!(cluster.members, vec![RecordId(0), RecordId(1), RecordId(2)]);

    assert_eq!(resolution.review.conflicted_clusters.len(), 1);
    let flagged = &resolution.review.conflicted_clusters[0];
    assert_eq!(flagged.cluster_id, cluster.id);
    assert_eq!(flagged.conflicting_pairs.len(), 2);
    assert_eq!(flagged.merge_edges.len(), 2);
    assert_eq!(resolution.stats.conflicted_clusters, 1);
    assert!(resolution
        .roster
        .iter()
        .all(|entry| entry.match_confidence == MatchConfidence::FlaggedPossible));
    Ok(())
}

#[test]
fn possible_match_is_queued_not_merged() -> anyhow::Result<()> {
    let rows = vec![provider("Priya Patel", ""), provider("Priya Patel", "")];
    let resolution = resolver().resolve(&rows)?;

    assert_eq!(resolution.clusters.len(), 2);
    assert_eq!(resolution.review.possible_matches.len(), 1);
    let review = &resolution.review.possible_matches[0];
    assert_eq!(review.total, 4.0);
    assert_ne!(review.cluster_a, review.cluster_b);
    assert_eq!(review.explanation.contributions.len(), 2);
    assert!(resolution
        .roster
        .iter()
        .all(|entry| entry.match_confidence == MatchConfidence::FlaggedPossible));
    Ok(())
}

#[test]
fn possible_pair_already_merged_stays_definite() -> anyhow::Result<()> {
    // 0-1 share an NPI, 1-2 share a license, 0-2 agree only on name.
    let rows = vec![
        RawRecord {
            practice_phone: "212-555-0100".into(),
            ..provider("John Smith", "1111111111")
        },
        RawRecord {
            license_state: "NY".into(),
            license_number: "L1".into(),
            ..provider("John Smith", "1111111111")
        },
        RawRecord {
            license_state: "NY".into(),
            license_number: "L1".into(),
            ..provider("John Smith", "")
        },
    ];
    let resolution = resolver().resolve(&rows)?;

    let a_c = CandidatePair::new(RecordId(0), RecordId(2)).unwrap();
    let scored = resolution
        .scored_pairs
        .iter()
        .find(|scored| scored.pair == a_c)
        .expect("name block pairs records 0 and 2");
    assert_eq!(scored.decision, MatchDecision::Possible);
    assert!(resolution.review.decisions.iter().any(|kept| kept.pair == a_c));

    assert_eq!(resolution.clusters.len(), 1);
    assert!(resolution.review.is_empty());
    assert!(resolution
        .roster
        .iter()
        .all(|entry| entry.match_confidence == MatchConfidence::Definite));
    Ok(())
}

#[test]
fn unblocked_record_is_a_singleton() -> anyhow::Result<()> {
    let rows = vec![
        provider("Grace Kim", "1000000001"),
        provider("Grace Kim", "1000000001"),
        provider("Zed", ""),
    ];
    let resolution = resolver().resolve(&rows)?;

    assert!(resolution
        .scored_pairs
        .iter()
        .all(|scored| !scored.pair.contains(RecordId(2))));
    let loner = &resolution.roster[2];
    assert_eq!(loner.cluster_id.representative(), RecordId(2));
    assert_eq!(loner.match_confidence, MatchConfidence::Singleton);
    Ok(())
}

#[test]
fn representative_is_most_complete_member() -> anyhow::Result<()> {
    let rows = vec![
        provider("", "1999999999"),
        RawRecord {
            practice_phone: "303-555-7788".into(),
            ..provider("Elena Rossi", "1999999999")
        },
        provider("Elena Rossi", "1999999999"),
    ];
    let resolution = resolver().resolve(&rows)?;

    assert_eq!(resolution.clusters.len(), 1);
    assert_eq!(resolution.clusters.clusters[0].representative, RecordId(1));
    assert!(resolution
        .roster
        .iter()
        .all(|entry| entry.cluster_id.representative() == RecordId(1)));
    Ok(())
}

#[test]
fn lowered_thresholds_promote_possible_to_definite() -> anyhow::Result<()> {
    let mut config = ResolverConfig::default();
    config.thresholds.definite = 3.5;
    config.thresholds.possible = 2.0;
    let resolver = Resolver::new(config)?;

    let rows = vec![provider("Priya Patel", ""), provider("Priya Patel", "")];
    let resolution = resolver.resolve(&rows)?;
    assert_eq!(resolution.clusters.len(), 1);
    assert!(resolution.review.possible_matches.is_empty());
    Ok(())
}

#[test]
fn empty_roster_resolves_to_nothing() -> anyhow::Result<()> {
    let resolution = resolver().resolve(&[])?;
    assert!(resolution.roster.is_empty());
    assert!(resolution.clusters.is_empty());
    assert!(resolution.review.is_empty());
    Ok(())
}
