//! # Similarity Primitives
//!
//! String and token-set similarity measures used by the pairwise scorer. All
//! measures are symmetric and return values in `[0, 1]`; an empty input carries
//! no evidence and yields `0.0`.

use std::collections::BTreeSet;

/// Gestalt pattern-matching ratio (Ratcliff/Obershelp): `2 * M / (|a| + |b|)`
/// where `M` counts characters in recursively found longest common blocks.
///
/// The block search favours earlier positions in its first argument, so the
/// inputs are put in lexicographic order first to keep the ratio symmetric.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    let first: Vec<char> = first.chars().collect();
    let second: Vec<char> = second.chars().collect();

    let matched = matching_characters(&first, &second);
    (2 * matched) as f64 / (first.len() + second.len()) as f64
}

/// Jaro-Winkler similarity.
pub fn jaro_winkler(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    strsim::jaro_winkler(a, b)
}

/// Jaccard overlap of two sets: `|a ∩ b| / |a ∪ b|`.
pub fn jaccard<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Jaccard overlap of two token sequences treated as sets.
pub fn token_jaccard(a: &[String], b: &[String]) -> f64 {
    let left: BTreeSet<&str> = a.iter().map(String::as_str).collect();
    let right: BTreeSet<&str> = b.iter().map(String::as_str).collect();
    jaccard(&left, &right)
}

fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut total = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_match(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        total += k;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            pending.push((i + k, ahi, j + k, bhi));
        }
    }

    total
}

/// Longest common block inside `a[alo..ahi]` and `b[blo..bhi]`, earliest in
/// `a` and then earliest in `b` among equally long blocks.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let width = bhi - blo;
    let mut best = (alo, blo, 0);
    let mut previous = vec![0usize; width + 1];
    let mut current = vec![0usize; width + 1];

    for i in alo..ahi {
        for j in blo..bhi {
            let slot = j - blo + 1;
            if a[i] == b[j] {
                let length = previous[slot - 1] + 1;
                current[slot] = length;
                if length > best.2 {
                    best = (i + 1 - length, j + 1 - length, length);
                }
            } else {
                current[slot] = 0;
            }
        }
        std::mem::swap(&mut previous, &mut current);
    }

    best
}
