//! # Normalizer
//!
//! Turns raw roster rows into canonical comparable records. Normalization is
//! total: absent or unusable fields become `None`/empty and never fail.

use crate::model::{RawRecord, Record, RecordId};
use rayon::prelude::*;
use std::collections::BTreeSet;
use anyhow::{anyhow, Result};
use tracing::{debug, info};

/// Length of the last-name prefix used for name blocking
pub const LAST_NAME_PREFIX_LEN: usize = 4;

/// Number of trailing phone digits kept for matching
pub const PHONE_SUFFIX_LEN: usize = 4;

/// Titles and generational suffixes that carry no identity
const NAME_NOISE_TOKENS: &[&str] = &[
    "DR", "MD", "DO", "PROF", "MR", "MRS", "MS", "JR", "SR", "II", "III",
];

/// Address tokens that describe unit layout rather than location
const ADDRESS_STOP_TOKENS: &[&str] = &["suite", "ste", "unit", "apt", "fl", "floor", "#"];

/// Placeholder strings spreadsheet exports leave behind for empty cells
const NULL_MARKERS: &[&str] = &["NAN", "NULL", "NONE", "N/A"];

/// Normalize one raw row into an immutable record.
pub fn normalize(record_id: RecordId, raw: &RawRecord) -> Record {
    let name_tokens = name_tokens(&raw.full_name);
    let last_name_prefix = name_tokens
        .last()
        .map(|last| last.chars().take(LAST_NAME_PREFIX_LEN).collect::<String>());

    let address = [
        raw.practice_address_line1.as_str(),
        raw.practice_city.as_str(),
        raw.practice_state.as_str(),
        raw.practice_zip.as_str(),
    ]
    .join(" ");

    let record = Record {
        record_id,
        npi: normalize_npi(&raw.npi),
        license_number: normalize_code(&raw.license_number),
        license_state: normalize_code(&raw.license_state),
        name_tokens,
        last_name_prefix,
        phone_suffix: phone_suffix(&raw.practice_phone),
        address_tokens: address_tokens(&address),
        taxonomy_code: normalize_code(&raw.taxonomy_code),
    };

    log_gaps(&record);
    record
}

/// Normalize a loaded roster, assigning record ids by load order.
///
/// Fails when the roster has more rows than `u32` record ids can address.
pub fn normalize_all(raw_records: &[RawRecord]) -> Result<Vec<Record>> {
    let records: Vec<Record> = raw_records
        .par_iter()
        .enumerate()
        .map(|(index, raw)| {
            let record_id = RecordId::from_index(index)
                .ok_or_else(|| anyhow!("roster row {index} exceeds the record id space"))?;
            Ok(normalize(record_id, raw))
        })
        .collect::<Result<_>>()?;

    let with_gaps = records
        .iter()
        .filter(|record| !missing_fields(record).is_empty())
        .count();
    if with_gaps > 0 {
        info!(records = records.len(), with_gaps, "normalization gaps");
    }
    Ok(records)
}

/// Uppercase name tokens with punctuation and honorifics removed.
pub fn name_tokens(full_name: &str) -> Vec<String> {
    full_name
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_uppercase)
        .filter(|token| !NAME_NOISE_TOKENS.contains(&token.as_str()))
        .collect()
}

/// Last four digits of a phone number, or `None` when fewer than four digits remain.
pub fn phone_suffix(phone: &str) -> Option<String> {
    let digits: Vec<char> = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < PHONE_SUFFIX_LEN {
        return None;
    }
    Some(digits[digits.len() - PHONE_SUFFIX_LEN..].iter().collect())
}

/// Lowercased address tokens without unit stop-tokens.
pub fn address_tokens(address: &str) -> BTreeSet<String> {
    address
        .split(|c: char| !c.is_alphanumeric() && c != '#')
        .flat_map(|chunk| {
            // "#210" is a unit marker glued to its number
            chunk.split('#').filter(|part| !part.is_empty())
        })
        .map(str::to_lowercase)
        .filter(|token| !ADDRESS_STOP_TOKENS.contains(&token.as_str()))
        .collect()
}

fn normalize_npi(npi: &str) -> Option<String> {
    let digits: String = npi.chars().filter(char::is_ascii_digit).collect();
    (!digits.is_empty()).then_some(digits)
}

fn normalize_code(value: &str) -> Option<String> {
    let upper = value.trim().to_uppercase();
    if upper.is_empty() || NULL_MARKERS.contains(&upper.as_str()) {
        return None;
    }
    Some(upper)
}

/// Comparable fields a record is missing.
pub fn missing_fields(record: &Record) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if record.npi.is_none() {
        missing.push("npi");
    }
    if record.license_key().is_none() {
        missing.push("license");
    }
    if record.name_tokens.is_empty() {
        missing.push("name");
    }
    if record.phone_suffix.is_none() {
        missing.push("phone");
    }
    if record.address_tokens.is_empty() {
        missing.push("address");
    }
    if record.taxonomy_code.is_none() {
        missing.push("taxonomy");
    }
    missing
}

fn log_gaps(record: &Record) {
    let missing = missing_fields(record);
    if !missing.is_empty() {
        debug!(record = %record.record_id, missing = ?missing, "normalization gap");
    }
}
