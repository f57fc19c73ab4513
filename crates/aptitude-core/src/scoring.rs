//! Answer-sheet scoring by category group.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::grader::is_correct;
use crate::model::{Category, Question};

/// Maps fine-grained catalog categories onto the coarse groups scores are
/// reported under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryGroups {
    /// Category → group name.
    #[serde(default)]
    pub groups: BTreeMap<Category, String>,
    /// Group for categories missing from `groups`.
    #[serde(default = "default_fallback_group")]
    pub fallback: String,
}

fn default_fallback_group() -> String {
    "other".to_string()
}

impl Default for CategoryGroups {
    fn default() -> Self {
        Self {
            groups: BTreeMap::from([
                (Category::Java, "technical".to_string()),
                (Category::Database, "technical".to_string()),
                (Category::ProblemSolving, "problem_solving".to_string()),
            ]),
            fallback: default_fallback_group(),
        }
    }
}

impl CategoryGroups {
    pub fn group_of(&self, category: &Category) -> &str {
        self.groups
            .get(category)
            .map(String::as_str)
            .unwrap_or(&self.fallback)
    }

    /// Every explicitly configured group name, deduplicated and sorted.
    pub fn group_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.groups.values().map(String::as_str).collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

/// Points earned by one answer sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scores {
    /// Group name → points. Configured groups are always present.
    pub by_group: BTreeMap<String, u32>,
    pub total: u32,
}

/// Score an answer sheet against the catalog.
///
/// Only questions that were answered and graded correct earn points.
/// Answers to ids missing from `questions` are ignored.
pub fn score(
    answers: &BTreeMap<String, String>,
    questions: &[Question],
    groups: &CategoryGroups,
) -> Scores {
    let mut by_group: BTreeMap<String, u32> = groups
        .group_names()
        .into_iter()
        .map(|name| (name.to_string(), 0))
        .collect();

    for question in questions {
        let Some(answer) = answers.get(&question.id) else {
            continue;
        };
        if is_correct(question, answer) {
            *by_group
                .entry(groups.group_of(&question.category).to_string())
                .or_insert(0) += question.points;
        }
    }

    let total = by_group.values().sum();
    Scores { by_group, total }
}

/// Grading outcome for a single question on an answer sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOutcome {
    pub question_id: String,
    pub category: Category,
    pub prompt: String,
    /// `None` when the question was left unanswered.
    pub answer: Option<String>,
    pub correct: bool,
    pub points_earned: u32,
    pub points_possible: u32,
}

/// Per-question breakdown of an answer sheet, in `question_ids` order.
///
/// Ids without a catalog entry are skipped.
pub fn review(
    answers: &BTreeMap<String, String>,
    question_ids: &[String],
    questions: &[Question],
) -> Vec<AnswerOutcome> {
    let by_id: HashMap<&str, &Question> = questions.iter().map(|q| (q.id.as_str(), q)).collect();

    question_ids
        .iter()
        .filter_map(|id| by_id.get(id.as_str()).copied())
        .map(|question| {
            let answer = answers.get(&question.id).cloned();
            let correct = answer
                .as_deref()
                .is_some_and(|a| is_correct(question, a));
            AnswerOutcome {
                question_id: question.id.clone(),
                category: question.category.clone(),
                prompt: question.prompt.clone(),
                answer,
                correct,
                points_earned: if correct { question.points } else { 0 },
                points_possible: question.points,
            }
        })
        .collect()
}
