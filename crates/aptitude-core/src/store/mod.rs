//! Persistence interface for the engine's collections.
//!
//! The engine needs get/put/list over four keyed collections (questions,
//! departments, candidates, results) plus a single quota record. Collections
//! keep insertion order; `put_*` replaces an existing record in place.

use anyhow::Result;
use async_trait::async_trait;

use crate::model::{AssignmentState, Candidate, Department, Question, TestResult};
use crate::quota::QuotaConfig;

mod json_dir;
mod memory;

pub use json_dir::JsonDirStore;
pub use memory::MemoryStore;

/// Outcome of [`ExamStore::claim_assignment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// The candidate was unassigned and now holds the offered state.
    Won(AssignmentState),
    /// The candidate was already assigned; its stored state is returned.
    Lost(AssignmentState),
}

impl Claim {
    pub fn state(&self) -> &AssignmentState {
        match self {
            Claim::Won(state) | Claim::Lost(state) => state,
        }
    }
}

/// Storage backend for questions, departments, candidates, results, and quota.
#[async_trait]
pub trait ExamStore: Send + Sync {
    async fn questions(&self) -> Result<Vec<Question>>;

    /// Replace the whole question collection in one write.
    async fn replace_questions(&self, questions: Vec<Question>) -> Result<()>;

    async fn put_question(&self, question: Question) -> Result<()>;

    /// Returns `false` if no question had that id.
    async fn remove_question(&self, id: &str) -> Result<bool>;

    async fn departments(&self) -> Result<Vec<Department>>;

    async fn put_department(&self, department: Department) -> Result<()>;

    async fn remove_department(&self, id: &str) -> Result<bool>;

    async fn candidate(&self, id: &str) -> Result<Option<Candidate>>;

    async fn candidates(&self) -> Result<Vec<Candidate>>;

    async fn put_candidate(&self, candidate: Candidate) -> Result<()>;

    async fn remove_candidate(&self, id: &str) -> Result<bool>;

    /// Compare-and-swap on a candidate's assignment: store `state` only if
    /// the candidate is still unassigned.
    ///
    /// Returns `None` if the candidate does not exist.
    async fn claim_assignment(&self, id: &str, state: AssignmentState) -> Result<Option<Claim>>;

    async fn result(&self, candidate_id: &str) -> Result<Option<TestResult>>;

    async fn results(&self) -> Result<Vec<TestResult>>;

    /// Append a result. Returns `false` without writing if the candidate
    /// already has one.
    async fn insert_result(&self, result: TestResult) -> Result<bool>;

    /// Replace the whole result collection in one write.
    async fn replace_results(&self, results: Vec<TestResult>) -> Result<()>;

    async fn remove_result(&self, candidate_id: &str) -> Result<bool>;

    async fn quota_config(&self) -> Result<QuotaConfig>;

    async fn set_quota_config(&self, config: QuotaConfig) -> Result<()>;
}

/// Replace the first item matching `same`, or append.
pub(crate) fn upsert<T>(items: &mut Vec<T>, item: T, same: impl Fn(&T) -> bool) {
    match items.iter_mut().find(|existing| same(existing)) {
        Some(slot) => *slot = item,
        None => items.push(item),
    }
}

/// Remove every item matching `matches`; returns whether anything was removed.
pub(crate) fn remove_where<T>(items: &mut Vec<T>, matches: impl Fn(&T) -> bool) -> bool {
    let before = items.len();
    items.retain(|item| !matches(item));
    items.len() != before
}

/// Apply the claim rule to a candidate record in place.
pub(crate) fn apply_claim(candidate: &mut Candidate, state: AssignmentState) -> Claim {
    if candidate.assignment.is_assigned() {
        Claim::Lost(candidate.assignment.clone())
    } else {
        candidate.assignment = state.clone();
        Claim::Won(state)
    }
}
