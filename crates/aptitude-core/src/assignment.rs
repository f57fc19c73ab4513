//! One-time question allocation for candidates.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::bucket::{bucket, BucketScope};
use crate::model::{AssignmentState, Candidate, Question};
use crate::quota::QuotaConfig;
use crate::sampler::sample;

/// Whether an assignment call drew a new question set or found one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentOutcome {
    /// Questions were drawn by this call.
    Fresh,
    /// The candidate was already assigned; nothing was drawn.
    Existing,
}

/// The question set a candidate will sit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub candidate_id: String,
    pub state: AssignmentState,
    pub outcome: AssignmentOutcome,
}

impl Assignment {
    pub fn question_ids(&self) -> &[String] {
        self.state.question_ids()
    }

    pub fn is_fresh(&self) -> bool {
        self.outcome == AssignmentOutcome::Fresh
    }
}

/// Draw question ids for a department according to `quota`.
///
/// Buckets are visited in quota order and their samples concatenated. A
/// candidate without a department draws nothing.
pub fn draw_questions<R: Rng + ?Sized>(
    department_id: Option<&str>,
    catalog: &[Question],
    quota: &QuotaConfig,
    rng: &mut R,
) -> Vec<String> {
    let Some(department_id) = department_id else {
        return Vec::new();
    };

    let buckets = bucket(catalog, BucketScope::Department(department_id));
    let mut ids = Vec::new();
    for (key, count) in quota.iter() {
        let drawn = sample(buckets.get(key), count, rng);
        tracing::debug!(
            "bucket {key}: drew {} of {} (quota {count})",
            drawn.len(),
            buckets.get(key).len()
        );
        ids.extend(drawn.into_iter().map(|q| q.id.clone()));
    }
    ids
}

/// Assign questions to `candidate` unless it already has an assignment.
///
/// An existing assignment, including an empty one, is returned unchanged;
/// calling this repeatedly never re-rolls a candidate's test.
pub fn assign_once<R: Rng + ?Sized>(
    candidate: &mut Candidate,
    catalog: &[Question],
    quota: &QuotaConfig,
    rng: &mut R,
) -> Assignment {
    if candidate.assignment.is_assigned() {
        return Assignment {
            candidate_id: candidate.id.clone(),
            state: candidate.assignment.clone(),
            outcome: AssignmentOutcome::Existing,
        };
    }

    let ids = draw_questions(candidate.department_id.as_deref(), catalog, quota, rng);
    candidate.assignment = AssignmentState::from_ids(ids);

    Assignment {
        candidate_id: candidate.id.clone(),
        state: candidate.assignment.clone(),
        outcome: AssignmentOutcome::Fresh,
    }
}
