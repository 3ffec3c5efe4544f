//! Fuzzy string scores on a 0-100 scale, built on `rapidfuzz`.

/// Whole-string similarity (0-100): the Indel ratio `2 * LCS / (|a| + |b|)`.
pub fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 100.0;
    }
    rapidfuzz::fuzz::ratio(a.chars(), b.chars()) * 100.0
}

/// Best similarity (0-100) between the shorter string and any equally long
/// window of the longer one. An exact substring scores 100.
pub fn partial_ratio(needle: &str, haystack: &str) -> f64 {
    let (short, long) = if needle.chars().count() <= haystack.chars().count() {
        (needle, haystack)
    } else {
        (haystack, needle)
    };

    let short_len = short.chars().count();
    if short_len == 0 {
        return 0.0;
    }
    if long.contains(short) {
        return 100.0;
    }

    // Byte offsets of every char boundary, so windows slice without allocating.
    let boundaries: Vec<usize> = long
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(long.len()))
        .collect();
    let long_len = boundaries.len() - 1;

    let mut best = 0.0_f64;
    for start in 0..=(long_len - short_len) {
        let window = &long[boundaries[start]..boundaries[start + short_len]];
        let score = ratio(short, window);
        if score > best {
            best = score;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_identical_is_100() {
        assert!((ratio("python", "python") - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ratio_disjoint_is_low() {
        assert!(ratio("rust", "figma") < 50.0);
    }

    #[test]
    fn test_partial_ratio_exact_substring_is_100() {
        assert_eq!(partial_ratio("sql", "we need python and sql experience"), 100.0);
    }

    #[test]
    fn test_partial_ratio_tolerates_one_typo_in_long_term() {
        // "kubernetes" vs "kubernetis": one substitution in ten chars.
        let score = partial_ratio("kubernetes", "deploying on kubernetis clusters");
        assert!(score >= 80.0, "score was {score}");
        assert!(score < 100.0);
    }

    #[test]
    fn test_partial_ratio_tolerates_transposed_letters() {
        // A swap costs two indels, so "pyhton" still scores 10/12 against "python".
        let score = partial_ratio("pyhton", "we use python daily");
        assert!(score >= 80.0, "score was {score}");
    }

    #[test]
    fn test_ratio_counts_insertions_only_once() {
        // One inserted '.' in 15 chars total.
        let score = ratio("reactjs", "react.js");
        assert!(score > 90.0, "score was {score}");
    }

    #[test]
    fn test_partial_ratio_absent_short_term_stays_below_threshold() {
        let score = partial_ratio("rust", "python and java required developer");
        assert!(score < 80.0, "score was {score}");
    }

    #[test]
    fn test_partial_ratio_is_symmetric_in_length() {
        assert_eq!(
            partial_ratio("python developer", "python"),
            partial_ratio("python", "python developer")
        );
    }

    #[test]
    fn test_partial_ratio_empty_is_zero() {
        assert_eq!(partial_ratio("", "anything"), 0.0);
        assert_eq!(partial_ratio("anything", ""), 0.0);
    }

    #[test]
    fn test_partial_ratio_handles_multibyte_text() {
        let score = partial_ratio("café", "un café crème");
        assert_eq!(score, 100.0);
        let fuzzy = partial_ratio("cafe", "un café crème");
        assert!(fuzzy >= 75.0, "score was {fuzzy}");
    }

    #[test]
    fn test_partial_ratio_bounded() {
        for (a, b) in [("go", "golang"), ("react", "reactive"), ("x", "y")] {
            let score = partial_ratio(a, b);
            assert!((0.0..=100.0).contains(&score));
        }
    }
}
