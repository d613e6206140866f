//! Heuristic confidence score for extracted text.
//!
//! The score flags likely scan/OCR artifacts. It is diagnostic only: the
//! pipeline logs a warning below the configured threshold but never fails a
//! document on it.

/// Punctuation that does not count as noise.
const ALLOWED_PUNCTUATION: &str = ".,!?;:()-\"";

/// Terms whose presence suggests a well-extracted academic document.
const STRUCTURE_TERMS: [&str; 6] = [
    "abstract",
    "introduction",
    "method",
    "result",
    "conclusion",
    "reference",
];

/// Text shorter than this scores 0.0 outright.
const MIN_SCORABLE_CHARS: usize = 100;

/// Scores extracted text on a [0.0, 1.0] scale, higher is cleaner.
///
/// Deterministic and total: any input maps to exactly one score.
pub fn score(text: &str) -> f64 {
    let total_chars = text.chars().count();
    if total_chars < MIN_SCORABLE_CHARS {
        return 0.0;
    }

    let mut score = 1.0_f64;
    let total = total_chars as f64;

    let alpha_or_space = text
        .chars()
        .filter(|c| c.is_alphabetic() || *c == ' ')
        .count() as f64;
    if alpha_or_space / total < 0.7 {
        score -= 0.3;
    }

    let noise = text
        .chars()
        .filter(|c| !c.is_alphanumeric() && *c != ' ' && !ALLOWED_PUNCTUATION.contains(*c))
        .count() as f64;
    if noise / total > 0.15 {
        score -= 0.2;
    }

    let word_lengths: Vec<usize> = text
        .split_whitespace()
        .filter(|w| w.chars().all(|c| c.is_alphabetic()))
        .map(|w| w.chars().count())
        .collect();
    if !word_lengths.is_empty() {
        let mean = word_lengths.iter().sum::<usize>() as f64 / word_lengths.len() as f64;
        if mean < 3.0 {
            score -= 0.3;
        } else if mean > 10.0 {
            score -= 0.1;
        }
    }

    let sentences: Vec<&str> = text
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .collect();
    if sentences.len() > 5 {
        let mean_words = sentences
            .iter()
            .map(|s| s.split_whitespace().count())
            .sum::<usize>() as f64
            / sentences.len() as f64;
        if mean_words > 5.0 && mean_words < 50.0 {
            score += 0.1;
        }
    }

    let lowered = text.to_lowercase();
    if STRUCTURE_TERMS.iter().any(|term| lowered.contains(term)) {
        score += 0.1;
    }

    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean_paragraph() -> String {
        "The quick brown fox jumps over the lazy dog near the river. \
         It was a calm morning and the water moved slowly past the bank. \
         Several birds called from the trees while the fox watched them. \
         Nothing else moved in the valley for a long quiet while."
            .to_string()
    }

    #[test]
    fn test_short_text_scores_zero() {
        assert_eq!(score(""), 0.0);
        assert_eq!(score("too short"), 0.0);
        // 99 characters exactly still short-circuits
        let just_under = "a".repeat(99);
        assert_eq!(score(&just_under), 0.0);
    }

    #[test]
    fn test_clean_prose_scores_high() {
        let s = score(&clean_paragraph());
        assert!(s >= 0.9, "expected clean prose to score high, got {}", s);
    }

    #[test]
    fn test_score_always_in_range() {
        let inputs = [
            clean_paragraph(),
            "###$$$%%%^^^&&&***".repeat(20),
            "a b c d e f g h i j k l m n o p q r s t u v w x y z".repeat(5),
            "x".repeat(500),
        ];
        for input in &inputs {
            let s = score(input);
            assert!((0.0..=1.0).contains(&s), "score {} out of range", s);
        }
    }

    #[test]
    fn test_deterministic() {
        let text = clean_paragraph();
        assert_eq!(score(&text), score(&text));
    }

    #[test]
    fn test_noise_heavy_text_penalized() {
        let noisy = "@@##$$%%^^&&**~~``||\\\\//<<>>{{}}[[]]==++".repeat(10);
        let s = score(&noisy);
        let clean = score(&clean_paragraph());
        assert!(s < clean, "noisy {} should score below clean {}", s, clean);
    }

    #[test]
    fn test_fragmented_words_penalized() {
        // Mean alphabetic word length well under 3.
        let fragments = "a b c d e f a b c d e f a b c d e f ".repeat(10);
        let s = score(&fragments);
        assert!(s <= 0.7, "fragmented text should lose points, got {}", s);
    }

    #[test]
    fn test_academic_terms_bonus() {
        let base = "The quick brown fox jumps over the lazy dog and keeps going \
                    until it reaches the far side of the wide green field today."
            .repeat(2);
        let with_term = format!("{} Introduction", base);
        assert!(score(&with_term) >= score(&base));
    }

    #[test]
    fn test_clamped_at_one() {
        // Clean prose with sentence bonus and an academic term cannot exceed 1.0.
        let text = format!("{} The abstract covers the method and result.", clean_paragraph());
        assert!(score(&text) <= 1.0);
    }
}
