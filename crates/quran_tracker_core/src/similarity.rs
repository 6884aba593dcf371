//! crates/quran_tracker_core/src/similarity.rs
//!
//! The fuzzy similarity scorer used to grade recitation attempts against
//! the expected Arabic text.

/// Computes a normalized edit-distance similarity between `candidate` (the
/// spoken transcript) and `reference` (the expected text).
///
/// Comparison is case-insensitive; the result is normalized by the character
/// count of the longer *raw* input, so a score of `1.0` means the inputs are
/// identical up to case and `0.0` means no character survives. Two empty
/// strings are defined as identical.
///
/// Total over all string pairs and symmetric in its arguments.
pub fn similarity(candidate: &str, reference: &str) -> f64 {
    let longer_len = candidate.chars().count().max(reference.chars().count());
    if longer_len == 0 {
        return 1.0;
    }
    let distance = edit_distance(&candidate.to_lowercase(), &reference.to_lowercase());
    // Case folding can change the character count (e.g. 'İ' folds to two
    // scalars), so the distance may exceed the raw length; clamp.
    let score = (longer_len as f64 - distance as f64) / longer_len as f64;
    score.clamp(0.0, 1.0)
}

/// Classic Levenshtein edit distance over Unicode scalar values, unit cost
/// for insertions, deletions and substitutions.
///
/// Two-row dynamic programming, O(n*m) time and O(min(n, m)) space; verse
/// inputs are tens to low hundreds of characters.
fn edit_distance(a: &str, b: &str) -> usize {
    let mut a: Vec<char> = a.chars().collect();
    let mut b: Vec<char> = b.chars().collect();
    if b.len() > a.len() {
        std::mem::swap(&mut a, &mut b);
    }

    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_one() {
        for s in ["", "kitab", "بِسْمِ اللَّهِ الرَّحْمَٰنِ الرَّحِيمِ"] {
            assert_eq!(similarity(s, s), 1.0);
        }
    }

    #[test]
    fn empty_pair_is_defined_as_identical() {
        assert_eq!(similarity("", ""), 1.0);
    }

    #[test]
    fn one_substitution_over_three_characters() {
        let score = similarity("abc", "abd");
        assert!((score - 2.0 / 3.0).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn comparison_is_case_insensitive() {
        assert_eq!(similarity("Kitab", "kitab"), 1.0);
    }

    #[test]
    fn disjoint_equal_length_strings_score_zero() {
        assert_eq!(similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn scorer_is_symmetric() {
        let pairs = [
            ("alhamdulillah", "alhamdulilah"),
            ("short", "a much longer string"),
            ("", "nonempty"),
        ];
        for (s, t) in pairs {
            assert_eq!(similarity(s, t), similarity(t, s));
        }
    }

    #[test]
    fn empty_versus_nonempty_scores_zero() {
        assert_eq!(similarity("", "abc"), 0.0);
    }

    #[test]
    fn normalizes_by_the_longer_input() {
        // distance("ab", "abcd") == 2, longer raw length 4.
        assert_eq!(similarity("ab", "abcd"), 0.5);
    }

    #[test]
    fn counts_characters_not_bytes() {
        // Each Arabic letter is multi-byte; one letter out of five differs.
        let score = similarity("سلامة", "سلامه");
        assert!((score - 4.0 / 5.0).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn edit_distance_matches_known_values() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("flaw", "lawn"), 2);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("abc", ""), 3);
    }
}
