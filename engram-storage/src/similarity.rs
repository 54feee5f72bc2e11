//! Fuzzy text similarity for entity lookup.
//!
//! Two-stage, mirroring a trigram-index-then-rank design: a pg_trgm-style
//! trigram Jaccard filter discards unrelated candidates cheaply, then
//! Jaro-Winkler (strsim) produces the similarity that is compared against
//! the resolution thresholds.

use std::collections::HashSet;

use engram_core::ids::fold_alias;

/// Candidates below this trigram overlap never reach the ranking stage.
pub const TRIGRAM_CANDIDATE_FLOOR: f64 = 0.3;

fn trigrams(text: &str) -> HashSet<[char; 3]> {
    let folded = fold_alias(text);
    let mut set = HashSet::new();
    for word in folded.split_whitespace() {
        let padded: Vec<char> = std::iter::repeat(' ')
            .take(2)
            .chain(word.chars())
            .chain(std::iter::once(' '))
            .collect();
        for w in padded.windows(3) {
            set.insert([w[0], w[1], w[2]]);
        }
    }
    set
}

/// pg_trgm-compatible trigram similarity in [0, 1]: Jaccard ratio of padded
/// word trigram sets.
pub fn trigram_similarity(a: &str, b: &str) -> f64 {
    let ta = trigrams(a);
    let tb = trigrams(b);
    if ta.is_empty() && tb.is_empty() {
        return 0.0;
    }
    let shared = ta.intersection(&tb).count();
    let union = ta.len() + tb.len() - shared;
    if union == 0 {
        return 0.0;
    }
    shared as f64 / union as f64
}

/// The similarity the resolver compares against `resolution.fuzzy_threshold`
/// and `resolution.fuzzy_auto`. Zero when the trigram filter rejects the
/// pair.
pub fn fuzzy_similarity(query: &str, candidate: &str) -> f64 {
    if trigram_similarity(query, candidate) < TRIGRAM_CANDIDATE_FLOOR {
        return 0.0;
    }
    strsim::jaro_winkler(&fold_alias(query), &fold_alias(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_one() {
        assert!((fuzzy_similarity("Kai Media", "kai media") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn close_misspelling_clears_auto_threshold() {
        let sim = fuzzy_similarity("Kay Media", "Kai Media");
        assert!(sim >= 0.85, "got {sim}");
    }

    #[test]
    fn unrelated_strings_are_filtered_out() {
        assert_eq!(fuzzy_similarity("TC Boiler", "Kai Media"), 0.0);
    }

    #[test]
    fn trigram_orders_by_overlap() {
        let close = trigram_similarity("Kay Media", "Kai Media");
        let far = trigram_similarity("Acme Corp", "Kai Media");
        assert!(close > far);
    }

    #[test]
    fn empty_input_scores_zero() {
        assert_eq!(trigram_similarity("", "Kai Media"), 0.0);
        assert_eq!(fuzzy_similarity("", "Kai Media"), 0.0);
    }
}
