use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::Context;
use rosterlink::config::{BlockingConfig, ConfigOverrides, NameMetric, ThresholdOverrides};
use rosterlink::{Component, RawRecord, Resolution, Resolver, ResolverConfig};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn parse_arg(flag: &str) -> Option<String> {
    let mut args = std::env::args();
    while let Some(arg) = args.next() {
        if arg == flag {
            return args.next();
        }
    }
    None
}

fn has_flag(flag: &str) -> bool {
    std::env::args().any(|arg| arg == flag)
}

fn print_help() {
    eprintln!(
        r#"rosterlink - provider roster deduplication

USAGE:
    rosterlink --input <FILE> [OPTIONS]

OPTIONS:
    -i, --input <FILE>          Roster CSV to resolve
        --roster-out <FILE>     Augmented roster CSV [default: dedup_results.csv]
        --pairs-out <FILE>      Scored candidate pairs CSV [default: dedup_candidate_pairs.csv]
        --review-out <FILE>     Review report JSON [default: dedup_review.json]
    -c, --config <FILE>         Path to config file (TOML)
        --definite <SCORE>      Override definite threshold
        --possible <SCORE>      Override possible threshold
        --max-block-size <N>    Skip blocks larger than N records
        --name-metric <NAME>    gestalt | jaro-winkler
    -h, --help                  Print help

ENVIRONMENT:
    ROSTERLINK_CONFIG                   Path to config file
    ROSTERLINK_THRESHOLDS__DEFINITE     Definite threshold
    ROSTERLINK_WEIGHTS__NPI_MATCH       Any weight, by component name
    RUST_LOG                            Log filter [default: info]
"#
    );
}

/// Read roster rows; rows that fail to parse are skipped before resolution.
fn load_roster(path: &Path) -> anyhow::Result<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open roster {}", path.display()))?;

    let mut rows = Vec::new();
    for (line, result) in reader.deserialize::<RawRecord>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(err) => warn!(line = line + 2, error = %err, "skipping malformed roster row"),
        }
    }
    Ok(rows)
}

fn write_roster(path: &Path, resolution: &Resolution) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer.write_record([
        "record_id",
        "provider_id",
        "full_name",
        "npi",
        "license_number",
        "license_state",
        "practice_phone",
        "practice_address_line1",
        "practice_city",
        "practice_state",
        "practice_zip",
        "taxonomy_code",
        "cluster_id",
        "match_confidence",
    ])?;
    for entry in &resolution.roster {
        let p = &entry.provider;
        writer.write_record([
            entry.record_id.0.to_string().as_str(),
            p.provider_id.as_str(),
            p.full_name.as_str(),
            p.npi.as_str(),
            p.license_number.as_str(),
            p.license_state.as_str(),
            p.practice_phone.as_str(),
            p.practice_address_line1.as_str(),
            p.practice_city.as_str(),
            p.practice_state.as_str(),
            p.practice_zip.as_str(),
            p.taxonomy_code.as_str(),
            entry.cluster_id.0.to_string().as_str(),
            entry.match_confidence.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_pairs(path: &Path, resolution: &Resolution) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer.write_record([
        "record_a",
        "record_b",
        "score",
        "name_sim",
        "tok_ov",
        "addr_ov",
        "reasons",
        "match_class",
    ])?;
    for scored in resolution.pairs_by_score() {
        let explanation = &scored.explanation;
        writer.write_record([
            scored.pair.a.0.to_string(),
            scored.pair.b.0.to_string(),
            format!("{:.4}", scored.total),
            format!("{:.3}", explanation.feature(Component::NameSimilarity)),
            format!("{:.3}", explanation.feature(Component::TokenOverlap)),
            format!("{:.3}", explanation.feature(Component::AddressOverlap)),
            explanation.reasons(),
            scored.decision.as_str().to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct ReviewDocument<'a> {
    stats: &'a rosterlink::ResolutionStats,
    review: &'a rosterlink::ReviewReport,
}

fn write_review(path: &Path, resolution: &Resolution) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let document = ReviewDocument {
        stats: &resolution.stats,
        review: &resolution.review,
    };
    serde_json::to_writer_pretty(BufWriter::new(file), &document)?;
    Ok(())
}

fn build_overrides() -> anyhow::Result<ConfigOverrides> {
    let mut overrides = ConfigOverrides::default();

    let definite = parse_arg("--definite").map(|v| v.parse::<f64>()).transpose()?;
    let possible = parse_arg("--possible").map(|v| v.parse::<f64>()).transpose()?;
    if definite.is_some() || possible.is_some() {
        overrides.thresholds = Some(ThresholdOverrides { definite, possible });
    }

    if let Some(cap) = parse_arg("--max-block-size") {
        overrides.blocking = Some(BlockingConfig {
            max_block_size: Some(cap.parse()?),
        });
    }

    if let Some(metric) = parse_arg("--name-metric") {
        overrides.name_metric = Some(match metric.as_str() {
            "gestalt" => NameMetric::Gestalt,
            "jaro-winkler" => NameMetric::JaroWinkler,
            other => anyhow::bail!("unknown name metric: {other}"),
        });
    }

    Ok(overrides)
}

fn main() -> anyhow::Result<()> {
    if has_flag("-h") || has_flag("--help") {
        print_help();
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let input: PathBuf = parse_arg("--input")
        .or_else(|| parse_arg("-i"))
        .map(PathBuf::from)
        .context("missing --input <FILE>")?;
    let roster_out = parse_arg("--roster-out").unwrap_or_else(|| "dedup_results.csv".into());
    let pairs_out =
        parse_arg("--pairs-out").unwrap_or_else(|| "dedup_candidate_pairs.csv".into());
    let review_out = parse_arg("--review-out").unwrap_or_else(|| "dedup_review.json".into());

    // Load config: overrides > Env > File > Defaults
    let config_path = parse_arg("--config")
        .or_else(|| parse_arg("-c"))
        .or_else(|| std::env::var("ROSTERLINK_CONFIG").ok())
        .map(PathBuf::from);
    let config = ResolverConfig::load(config_path.as_deref(), build_overrides()?)?;

    let rows = load_roster(&input)?;
    info!(rows = rows.len(), input = %input.display(), "loaded roster");

    let resolver = Resolver::new(config)?;
    let resolution = resolver.resolve(&rows)?;

    write_roster(Path::new(&roster_out), &resolution)?;
    write_pairs(Path::new(&pairs_out), &resolution)?;
    write_review(Path::new(&review_out), &resolution)?;

    let stats = &resolution.stats;
    info!(
        records = stats.records,
        clusters = stats.clusters,
        duplicate_clusters = stats.multi_member_clusters,
        review_items = resolution.review.possible_matches.len() + stats.conflicted_clusters,
        roster = %roster_out,
        pairs = %pairs_out,
        review = %review_out,
        "wrote resolution outputs"
    );
    Ok(())
}
