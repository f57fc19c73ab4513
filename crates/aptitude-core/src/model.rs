//! Core data model types for aptitude.
//!
//! These are the records the engine reads and writes: questions and the
//! departments they belong to, registered candidates, and submitted results.

use std::collections::{BTreeMap, BTreeSet};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Question category.
///
/// The well-known categories get their own variants; anything else is kept
/// verbatim in `Custom` so new categories need no code change.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Java,
    Database,
    ProblemSolving,
    Custom(String),
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Java => write!(f, "java"),
            Category::Database => write!(f, "database"),
            Category::ProblemSolving => write!(f, "problem_solving"),
            Category::Custom(name) => write!(f, "{name}"),
        }
    }
}

impl FromStr for Category {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(match trimmed.to_lowercase().as_str() {
            "java" => Category::Java,
            "database" | "db" => Category::Database,
            "problem_solving" | "problem-solving" | "ps" => Category::ProblemSolving,
            _ => Category::Custom(trimmed.to_string()),
        })
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(category) => category,
            Err(never) => match never {},
        }
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        Category::from(s.to_string())
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.to_string()
    }
}

/// How a question is answered, and therefore how it is graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerType {
    Objective,
    Subjective,
}

impl fmt::Display for AnswerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerType::Objective => write!(f, "objective"),
            AnswerType::Subjective => write!(f, "subjective"),
        }
    }
}

impl FromStr for AnswerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "objective" | "mc" | "multiple_choice" => Ok(AnswerType::Objective),
            "subjective" | "sub" | "short_answer" => Ok(AnswerType::Subjective),
            other => Err(format!("unknown answer type: {other}")),
        }
    }
}

/// Question difficulty. Informational only; it does not affect sampling or scoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" | "low" => Ok(Difficulty::Easy),
            "medium" | "normal" => Ok(Difficulty::Medium),
            "hard" | "high" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// The answer-type specific part of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnswerKind {
    /// Graded by exact match against `correct_answer`.
    Objective {
        #[serde(default)]
        options: Vec<String>,
        correct_answer: String,
    },
    /// Graded by keyword overlap.
    Subjective {
        keywords: Vec<String>,
        /// Model answer shown to reviewers; never used for grading.
        #[serde(default)]
        reference_answer: Option<String>,
    },
}

/// A single catalog question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub category: Category,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub prompt: String,
    pub points: u32,
    /// Departments this question is offered to. Empty means unassigned.
    #[serde(default)]
    pub department_ids: BTreeSet<String>,
    #[serde(flatten)]
    pub kind: AnswerKind,
}

impl Question {
    pub fn answer_type(&self) -> AnswerType {
        match self.kind {
            AnswerKind::Objective { .. } => AnswerType::Objective,
            AnswerKind::Subjective { .. } => AnswerType::Subjective,
        }
    }

    pub fn bucket_key(&self) -> BucketKey {
        BucketKey::new(self.category.clone(), self.answer_type())
    }

    pub fn in_department(&self, department_id: &str) -> bool {
        self.department_ids.contains(department_id)
    }
}

/// The `(category, answer_type)` pair questions are grouped and sampled by.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BucketKey {
    pub category: Category,
    pub answer_type: AnswerType,
}

impl BucketKey {
    pub fn new(category: Category, answer_type: AnswerType) -> Self {
        Self {
            category,
            answer_type,
        }
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.answer_type)
    }
}

/// A department questions can be scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: String,
    pub name: String,
}

impl Department {
    /// Create a department with a freshly generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: format!("dept_{}", Uuid::new_v4()),
            name: name.into(),
        }
    }
}

/// Whether a candidate has been given a question set yet.
///
/// `AssignedEmpty` is distinct from `Unassigned`: allocation ran and found
/// nothing to draw, and it must not run again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "question_ids", rename_all = "snake_case")]
pub enum AssignmentState {
    #[default]
    Unassigned,
    Assigned(Vec<String>),
    AssignedEmpty,
}

impl AssignmentState {
    /// Build the assigned state for a list of ids, collapsing an empty list
    /// into `AssignedEmpty`.
    pub fn from_ids(ids: Vec<String>) -> Self {
        if ids.is_empty() {
            AssignmentState::AssignedEmpty
        } else {
            AssignmentState::Assigned(ids)
        }
    }

    pub fn is_assigned(&self) -> bool {
        !matches!(self, AssignmentState::Unassigned)
    }

    pub fn question_ids(&self) -> &[String] {
        match self {
            AssignmentState::Assigned(ids) => ids,
            AssignmentState::Unassigned | AssignmentState::AssignedEmpty => &[],
        }
    }
}

/// A pre-registered test taker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub department_id: Option<String>,
    pub created_at: DateTime<Utc>,
    /// The only calendar date on which the candidate may sit the test.
    #[serde(default)]
    pub access_date: Option<NaiveDate>,
    #[serde(default = "default_test_duration")]
    pub test_duration_minutes: u32,
    #[serde(default)]
    pub assignment: AssignmentState,
}

fn default_test_duration() -> u32 {
    10
}

impl Candidate {
    /// Register a new candidate with a generated id.
    pub fn new(name: impl Into<String>, department_id: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            email: String::new(),
            phone: String::new(),
            department_id,
            created_at: Utc::now(),
            access_date: None,
            test_duration_minutes: default_test_duration(),
            assignment: AssignmentState::Unassigned,
        }
    }

    /// Whether the candidate is allowed to sit the test on `date`.
    pub fn can_sit_on(&self, date: NaiveDate) -> bool {
        self.access_date == Some(date)
    }
}

/// A submitted and graded answer sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub candidate_id: String,
    pub submitted_at: DateTime<Utc>,
    /// Question id → submitted answer text.
    #[serde(default)]
    pub answers: BTreeMap<String, String>,
    /// Category group → points earned.
    #[serde(default)]
    pub scores: BTreeMap<String, u32>,
    pub total_score: u32,
    /// 1-based position in the leaderboard; 0 until ranks are computed.
    #[serde(default)]
    pub rank: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn objective(id: &str) -> Question {
        Question {
            id: id.into(),
            category: Category::Java,
            difficulty: Difficulty::Easy,
            prompt: "Which keyword infers a local type?".into(),
            points: 5,
            department_ids: BTreeSet::from(["dept_a".to_string()]),
            kind: AnswerKind::Objective {
                options: vec!["var".into(), "let".into()],
                correct_answer: "var".into(),
            },
        }
    }

    #[test]
    fn category_display_and_parse() {
        assert_eq!(Category::Java.to_string(), "java");
        assert_eq!("DB".parse::<Category>().unwrap(), Category::Database);
        assert_eq!("ps".parse::<Category>().unwrap(), Category::ProblemSolving);
        assert_eq!(
            "Networking".parse::<Category>().unwrap(),
            Category::Custom("Networking".into())
        );
    }

    #[test]
    fn category_order_puts_custom_last() {
        let mut cats = vec![
            Category::Custom("aaa".into()),
            Category::ProblemSolving,
            Category::Java,
            Category::Database,
        ];
        cats.sort();
        assert_eq!(
            cats,
            vec![
                Category::Java,
                Category::Database,
                Category::ProblemSolving,
                Category::Custom("aaa".into()),
            ]
        );
    }

    #[test]
    fn answer_type_parse() {
        assert_eq!("MC".parse::<AnswerType>().unwrap(), AnswerType::Objective);
        assert_eq!(
            "subjective".parse::<AnswerType>().unwrap(),
            AnswerType::Subjective
        );
        assert!("essay".parse::<AnswerType>().is_err());
    }

    #[test]
    fn question_json_uses_flat_type_tag() {
        let json = serde_json::to_value(objective("q1")).unwrap();
        assert_eq!(json["type"], "objective");
        assert_eq!(json["category"], "java");
        assert_eq!(json["correct_answer"], "var");

        let back: Question = serde_json::from_value(json).unwrap();
        assert_eq!(back.answer_type(), AnswerType::Objective);
        assert!(back.in_department("dept_a"));
    }

    #[test]
    fn subjective_question_requires_keywords_field() {
        let json = serde_json::json!({
            "id": "q2",
            "category": "database",
            "prompt": "Explain an index",
            "points": 3,
            "type": "subjective"
        });
        assert!(serde_json::from_value::<Question>(json).is_err());
    }

    #[test]
    fn assignment_state_from_ids() {
        assert_eq!(
            AssignmentState::from_ids(vec![]),
            AssignmentState::AssignedEmpty
        );
        let assigned = AssignmentState::from_ids(vec!["q1".into()]);
        assert!(assigned.is_assigned());
        assert_eq!(assigned.question_ids(), ["q1".to_string()]);
        assert!(!AssignmentState::Unassigned.is_assigned());
        assert!(AssignmentState::AssignedEmpty.is_assigned());
    }

    #[test]
    fn candidate_access_date() {
        let mut candidate = Candidate::new("Kim", Some("dept_a".into()));
        let day = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert!(!candidate.can_sit_on(day));
        candidate.access_date = Some(day);
        assert!(candidate.can_sit_on(day));
        assert_eq!(candidate.test_duration_minutes, 10);
    }

    #[test]
    fn department_ids_are_prefixed() {
        let dept = Department::new("Backend");
        assert!(dept.id.starts_with("dept_"));
    }
}
