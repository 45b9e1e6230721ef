//! Early-stop scoring for discussion rounds.

use std::collections::HashSet;

/// Scores how much a round's responses agree, in `0.0..=1.0`.
pub trait ConvergenceEvaluator: Send + Sync {
    fn score(&self, responses: &[&str]) -> f32;
}

/// Lexical overlap of the first two responses.
///
/// Each response is split on whitespace into a token set and the score is
/// `|A ∩ B| / min(|A|, |B|)`. Fewer than two responses, or an empty token set on either side,
/// scores `0.0`. Responses past the second are ignored.
///
/// This is a cheap word-overlap heuristic, not semantic similarity: two answers that agree
/// in different words score low, and a short answer that is a subset of a long one scores 1.0.
///
/// ```
/// use aichat::convergence::{ConvergenceEvaluator, LexicalOverlap};
///
/// let score = LexicalOverlap.score(&["a b c", "a b d"]);
/// assert!((score - 2.0 / 3.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalOverlap;

impl ConvergenceEvaluator for LexicalOverlap {
    fn score(&self, responses: &[&str]) -> f32 {
        if responses.len() < 2 {
            return 0.0;
        }

        let first: HashSet<&str> = responses[0].split_whitespace().collect();
        let second: HashSet<&str> = responses[1].split_whitespace().collect();

        let smaller = first.len().min(second.len());
        if smaller == 0 {
            return 0.0;
        }

        first.intersection(&second).count() as f32 / smaller as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_overlap() {
        let score = LexicalOverlap.score(&["a b c", "a b d"]);
        assert!((score - 0.6667).abs() < 1e-3);
    }

    #[test]
    fn identical_responses_score_one() {
        assert_eq!(LexicalOverlap.score(&["x y", "x y"]), 1.0);
    }

    #[test]
    fn single_response_scores_zero() {
        assert_eq!(LexicalOverlap.score(&["only one response"]), 0.0);
        assert_eq!(LexicalOverlap.score(&[]), 0.0);
    }

    #[test]
    fn empty_token_set_scores_zero() {
        assert_eq!(LexicalOverlap.score(&["   ", "a b"]), 0.0);
        assert_eq!(LexicalOverlap.score(&["", ""]), 0.0);
    }

    #[test]
    fn only_first_two_responses_count() {
        assert_eq!(LexicalOverlap.score(&["p q", "p q", "z"]), 1.0);
    }

    #[test]
    fn duplicate_tokens_collapse_into_sets() {
        // {a} vs {a, b}: 1 / min(1, 2)
        assert_eq!(LexicalOverlap.score(&["a a a", "a b"]), 1.0);
    }
}
