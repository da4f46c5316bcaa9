//! Seeded synthetic rosters shared by integration tests and benches.

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use rosterlink::RawRecord;

const FIRST_NAMES: &[&str] = &[
    "John", "Maria", "Wei", "Aisha", "Robert", "Priya", "Carlos", "Elena", "David", "Grace",
];
const LAST_NAMES: &[&str] = &[
    "Smith", "Garcia", "Chen", "Okafor", "Johnson", "Patel", "Rossi", "Nguyen", "Miller", "Kim",
];
const STREETS: &[&str] = &["Main St", "Oak Ave", "Pine Rd", "Elm Blvd", "Cedar Ln"];
const CITIES: &[(&str, &str)] = &[
    ("Albany", "NY"),
    ("Austin", "TX"),
    ("Denver", "CO"),
    ("Tampa", "FL"),
    ("Fresno", "CA"),
];
const TAXONOMIES: &[&str] = &["207Q00000X", "208D00000X", "207R00000X", "363L00000X"];

/// A synthetic roster with known duplicate structure
#[derive(Debug, Clone)]
pub struct GeneratedRoster {
    pub rows: Vec<RawRecord>,
    /// Index of the clean row each row was derived from
    pub origin: Vec<usize>,
}

/// Generate `count` clean providers and, with `duplicate_probability`, a
/// noisy copy of each (name typo, reformatted phone, suite added).
pub fn generate_roster(count: usize, duplicate_probability: f64, seed: u64) -> GeneratedRoster {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows = Vec::with_capacity(count * 2);
    let mut origin = Vec::with_capacity(count * 2);

    for i in 0..count {
        let first = FIRST_NAMES[rng.random_range(0..FIRST_NAMES.len())];
        let last = LAST_NAMES[rng.random_range(0..LAST_NAMES.len())];
        let (city, state) = CITIES[rng.random_range(0..CITIES.len())];
        let phone = format!(
            "{:03}-555-{:04}",
            rng.random_range(200..999),
            rng.random_range(0..10_000)
        );
        let clean = RawRecord {
            provider_id: format!("P{:06}", i),
            full_name: format!("{first} {last}"),
            npi: format!("{}", 1_000_000_000u64 + i as u64),
            license_number: format!("{state}{:05}", rng.random_range(0..100_000)),
            license_state: state.to_string(),
            practice_phone: phone,
            practice_address_line1: format!(
                "{} {}",
                rng.random_range(1..9_999),
                STREETS[rng.random_range(0..STREETS.len())]
            ),
            practice_city: city.to_string(),
            practice_state: state.to_string(),
            practice_zip: format!("{:05}", rng.random_range(10_000..99_999)),
            taxonomy_code: TAXONOMIES[rng.random_range(0..TAXONOMIES.len())].to_string(),
        };

        let duplicate = rng.random_bool(duplicate_probability).then(|| noisy_copy(&clean, &mut rng, i));

        origin.push(i);
        rows.push(clean);
        if let Some(duplicate) = duplicate {
            origin.push(i);
            rows.push(duplicate);
        }
    }

    GeneratedRoster { rows, origin }
}

fn noisy_copy(clean: &RawRecord, rng: &mut StdRng, index: usize) -> RawRecord {
    let mut copy = clean.clone();
    copy.provider_id = format!("D{:06}", index);

    // drop one character from the first name
    let mut name: Vec<char> = copy.full_name.chars().collect();
    if name.len() > 4 {
        name.remove(rng.random_range(1..3));
    }
    copy.full_name = format!("Dr. {}", name.into_iter().collect::<String>());

    let digits: String = copy.practice_phone.chars().filter(char::is_ascii_digit).collect();
    copy.practice_phone = format!("({}) {}-{}", &digits[..3], &digits[3..6], &digits[6..]);
    copy.practice_address_line1 = format!("{} Suite {}", copy.practice_address_line1, rng.random_range(100..400));
    copy.license_number = copy.license_number.to_lowercase();
    copy
}

/// Raw row builder for scenario tests.
pub fn provider(name: &str, npi: &str) -> RawRecord {
    RawRecord {
        full_name: name.to_string(),
        npi: npi.to_string(),
        ..RawRecord::default()
    }
}
