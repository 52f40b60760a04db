//! Free-text model name matching against the canonical model index
//!
//! Scoring is a token sort ratio: both strings are normalised (lower case,
//! non-alphanumerics become spaces), their tokens sorted and re-joined, and the
//! results compared with an indel similarity scaled to 0..=100.

use serde::Serialize;

use crate::error::EstimateError;

/// A candidate together with its similarity score
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelMatch {
    pub model: String,
    pub score: u8,
}

#[derive(Debug)]
struct Candidate {
    name: String,
    key: Vec<char>,
}

/// Sorted, de-duplicated set of canonical model names
#[derive(Debug)]
pub struct CanonicalModelIndex {
    candidates: Vec<Candidate>,
}

impl CanonicalModelIndex {
    pub fn new(names: impl IntoIterator<Item = String>) -> Result<Self, EstimateError> {
        let mut names: Vec<String> = names.into_iter().collect();
        names.sort();
        names.dedup();

        if names.is_empty() {
            return Err(EstimateError::Configuration(
                "Canonical model index is empty; the photo table has no models".to_string(),
            ));
        }

        let candidates = names
            .into_iter()
            .map(|name| Candidate {
                key: sort_key(&name).chars().collect(),
                name,
            })
            .collect();

        Ok(Self { candidates })
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().map(|c| c.name.as_str())
    }

    /// Best candidate for `raw`; the first candidate in sorted order wins a tie
    pub fn best_match(&self, raw: &str) -> &str {
        let query: Vec<char> = sort_key(raw).chars().collect();

        let mut best = &self.candidates[0];
        let mut best_score = score_keys(&query, &best.key);
        for candidate in &self.candidates[1..] {
            let score = score_keys(&query, &candidate.key);
            if score > best_score {
                best = candidate;
                best_score = score;
            }
        }

        &best.name
    }

    /// Up to `limit` candidates ordered by descending score, ties in index order
    pub fn top_matches(&self, raw: &str, limit: usize) -> Vec<ModelMatch> {
        let query: Vec<char> = sort_key(raw).chars().collect();

        let mut scored: Vec<(usize, u8)> = self
            .candidates
            .iter()
            .enumerate()
            .map(|(idx, c)| (idx, score_keys(&query, &c.key)))
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        scored
            .into_iter()
            .take(limit)
            .map(|(idx, score)| ModelMatch {
                model: self.candidates[idx].name.clone(),
                score,
            })
            .collect()
    }
}

/// Resolve `raw` against `candidates`
///
/// Fails only when `candidates` is empty.
pub fn match_model<'a>(raw: &str, candidates: &'a CanonicalModelIndex) -> Result<&'a str, EstimateError> {
    if candidates.is_empty() {
        return Err(EstimateError::Configuration(
            "No candidate models to match against".to_string(),
        ));
    }
    Ok(candidates.best_match(raw))
}

/// Token sort ratio of two strings, 0..=100
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = sort_key(a).chars().collect();
    let b: Vec<char> = sort_key(b).chars().collect();
    score_keys(&a, &b)
}

fn sort_key(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase();

    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn score_keys(a: &[char], b: &[char]) -> u8 {
    let total = a.len() + b.len();
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    // Indel similarity: (total - indel distance) / total == 2 * LCS / total
    let lcs = longest_common_subsequence(a, b);
    // Halves round to even
    ((200 * lcs) as f64 / total as f64).round_ties_even() as u8
}

fn longest_common_subsequence(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
