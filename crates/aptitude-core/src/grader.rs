//! Per-answer correctness rules.

use crate::model::{AnswerKind, Question};

/// Fraction of a subjective question's keywords an answer must contain.
pub const KEYWORD_MATCH_THRESHOLD: f64 = 0.6;

/// Whether `answer` is a correct answer to `question`.
///
/// Objective questions need an exact, case-sensitive match with no trimming.
/// Subjective questions are correct when at least 60% of their keywords occur
/// (case-insensitively) somewhere in the answer.
pub fn is_correct(question: &Question, answer: &str) -> bool {
    match &question.kind {
        AnswerKind::Objective { correct_answer, .. } => answer == correct_answer,
        AnswerKind::Subjective { keywords, .. } => {
            let matched = matched_keywords(keywords, answer);
            matched as f64 >= keywords.len() as f64 * KEYWORD_MATCH_THRESHOLD
        }
    }
}

/// Number of `keywords` that occur as substrings of `answer`, ignoring case.
pub fn matched_keywords(keywords: &[String], answer: &str) -> usize {
    let answer = answer.to_lowercase();
    keywords
        .iter()
        .filter(|kw| answer.contains(kw.to_lowercase().as_str()))
        .count()
}
