//! Leaderboard ranking over the full result set.

use crate::model::TestResult;

/// Assign 1-based sequential ranks by descending total score.
///
/// Returns the results in ranked order. Every result gets a distinct rank:
/// equal totals occupy adjacent ranks rather than sharing one. The sort is
/// stable, so ties keep their input order, which for stored results is
/// submission order.
pub fn recompute_ranks(mut results: Vec<TestResult>) -> Vec<TestResult> {
    results.sort_by(|a, b| b.total_score.cmp(&a.total_score));
    for (index, result) in results.iter_mut().enumerate() {
        result.rank = index as u32 + 1;
    }
    results
}

/// The rank stored for `candidate_id`, if it has a result.
pub fn rank_of(results: &[TestResult], candidate_id: &str) -> Option<u32> {
    results
        .iter()
        .find(|r| r.candidate_id == candidate_id)
        .map(|r| r.rank)
}
