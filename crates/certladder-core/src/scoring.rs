//! Percentage-correct scoring of an answer set against an answer key.

/// Index of an option within a question.
pub type AnswerIndex = usize;

/// A learner's selection for one question; `None` is "no selection" and
/// never equals any valid answer index.
pub type Selection = Option<AnswerIndex>;

/// A score in `[0, 100]`.
pub type Percentage = f64;

/// Number of positions where the selection matches the key.
///
/// Compares element-wise up to the shorter of the two sequences.
pub fn count_correct(answers: &[Selection], key: &[AnswerIndex]) -> usize {
    answers
        .iter()
        .zip(key)
        .filter(|(selected, expected)| **selected == Some(**expected))
        .count()
}

/// Percentage of the key answered correctly.
///
/// Mismatched lengths are tolerated: only the overlapping prefix is compared,
/// and the percentage is taken over the whole key so an unanswered tail
/// counts as incorrect. Returns 0 when either sequence is empty.
pub fn score(answers: &[Selection], key: &[AnswerIndex]) -> Percentage {
    if answers.is_empty() || key.is_empty() {
        return 0.0;
    }
    (count_correct(answers, key) as f64 / key.len() as f64) * 100.0
}
