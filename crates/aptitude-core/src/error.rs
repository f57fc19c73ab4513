//! Engine error types.
//!
//! Only conditions a caller must act on are errors. Degenerate inputs such as
//! an empty catalog, a zero quota, or an unanswered question are valid and
//! produce empty or zero results instead.

use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

/// The kind of record a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Candidate,
    Question,
    Department,
    Result,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Candidate => write!(f, "candidate"),
            RecordKind::Question => write!(f, "question"),
            RecordKind::Department => write!(f, "department"),
            RecordKind::Result => write!(f, "result"),
        }
    }
}

/// Errors surfaced by the exam engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An id did not resolve to a stored record.
    #[error("{kind} not found: {id}")]
    NotFound { kind: RecordKind, id: String },

    /// A configuration value was rejected (e.g. a negative quota).
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A department with the same name already exists.
    #[error("department name already exists: {0}")]
    DuplicateDepartment(String),

    /// The candidate already has a submitted result.
    #[error("candidate already submitted: {0}")]
    AlreadySubmitted(String),

    /// The candidate may not sit the test on this date.
    #[error("candidate {candidate_id} has no access on {date}")]
    NoAccess {
        candidate_id: String,
        date: NaiveDate,
    },

    /// The backing store failed.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl EngineError {
    pub(crate) fn not_found(kind: RecordKind, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Returns `true` for errors caused by caller input rather than storage.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, EngineError::Storage(_))
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
