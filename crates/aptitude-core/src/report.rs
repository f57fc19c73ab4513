//! Leaderboard and answer-review reports with JSON persistence.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Candidate, Department, TestResult};
use crate::scoring::AnswerOutcome;

/// A ranked listing of every submitted result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leaderboard {
    /// When the leaderboard was built.
    pub generated_at: DateTime<Utc>,
    /// Entries in rank order.
    pub entries: Vec<LeaderboardEntry>,
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub candidate_id: String,
    /// Empty when the candidate record no longer exists.
    pub candidate_name: String,
    pub department: Option<String>,
    pub scores: BTreeMap<String, u32>,
    pub total_score: u32,
    pub submitted_at: DateTime<Utc>,
}

impl Leaderboard {
    /// Join ranked results with candidate and department names.
    pub fn build(
        results: &[TestResult],
        candidates: &[Candidate],
        departments: &[Department],
    ) -> Self {
        let candidates: HashMap<&str, &Candidate> =
            candidates.iter().map(|c| (c.id.as_str(), c)).collect();
        let departments: HashMap<&str, &str> = departments
            .iter()
            .map(|d| (d.id.as_str(), d.name.as_str()))
            .collect();

        let mut entries: Vec<LeaderboardEntry> = results
            .iter()
            .map(|r| {
                let candidate = candidates.get(r.candidate_id.as_str());
                let department = candidate
                    .and_then(|c| c.department_id.as_deref())
                    .map(|id| departments.get(id).copied().unwrap_or(id).to_string());
                LeaderboardEntry {
                    rank: r.rank,
                    candidate_id: r.candidate_id.clone(),
                    candidate_name: candidate.map(|c| c.name.clone()).unwrap_or_default(),
                    department,
                    scores: r.scores.clone(),
                    total_score: r.total_score,
                    submitted_at: r.submitted_at,
                }
            })
            .collect();
        entries.sort_by_key(|e| e.rank);

        Self {
            generated_at: Utc::now(),
            entries,
        }
    }

    /// Save the leaderboard as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize leaderboard")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write leaderboard to {}", path.display()))?;
        Ok(())
    }

    /// Load a leaderboard from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read leaderboard from {}", path.display()))?;
        let leaderboard: Leaderboard =
            serde_json::from_str(&content).context("failed to parse leaderboard JSON")?;
        Ok(leaderboard)
    }

    /// Score group names across all entries, sorted.
    pub fn group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .iter()
            .flat_map(|e| e.scores.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Format the leaderboard as markdown.
    pub fn to_markdown(&self) -> String {
        let groups = self.group_names();
        let mut md = String::new();

        md.push_str(&format!(
            "**Leaderboard** ({} candidates, generated {})\n\n",
            self.entries.len(),
            self.generated_at.format("%Y-%m-%d %H:%M UTC")
        ));

        md.push_str("| Rank | Candidate | Department |");
        for group in &groups {
            md.push_str(&format!(" {group} |"));
        }
        md.push_str(" Total |\n");
        md.push_str("|------|-----------|------------|");
        for _ in &groups {
            md.push_str("------|");
        }
        md.push_str("-------|\n");

        for e in &self.entries {
            let name = if e.candidate_name.is_empty() {
                e.candidate_id.as_str()
            } else {
                e.candidate_name.as_str()
            };
            md.push_str(&format!(
                "| {} | {} | {} |",
                e.rank,
                name,
                e.department.as_deref().unwrap_or("-")
            ));
            for group in &groups {
                md.push_str(&format!(" {} |", e.scores.get(group).copied().unwrap_or(0)));
            }
            md.push_str(&format!(" {} |\n", e.total_score));
        }

        md
    }
}

/// Per-question breakdown of one candidate's submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerReview {
    pub candidate_id: String,
    pub candidate_name: String,
    pub rank: u32,
    pub total_score: u32,
    /// Sum of points over every reviewed question.
    pub points_possible: u32,
    pub outcomes: Vec<AnswerOutcome>,
}

impl AnswerReview {
    pub fn new(candidate: &Candidate, result: &TestResult, outcomes: Vec<AnswerOutcome>) -> Self {
        Self {
            candidate_id: candidate.id.clone(),
            candidate_name: candidate.name.clone(),
            rank: result.rank,
            total_score: result.total_score,
            points_possible: outcomes.iter().map(|o| o.points_possible).sum(),
            outcomes,
        }
    }

    pub fn correct_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.correct).count()
    }

    /// Format the review as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        md.push_str(&format!(
            "**{}** (rank {}): {}/{} points, {}/{} correct\n\n",
            self.candidate_name,
            self.rank,
            self.total_score,
            self.points_possible,
            self.correct_count(),
            self.outcomes.len()
        ));
        md.push_str("| Question | Category | Answer | Correct | Points |\n");
        md.push_str("|----------|----------|--------|---------|--------|\n");
        for o in &self.outcomes {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {}/{} |\n",
                o.question_id,
                o.category,
                o.answer.as_deref().unwrap_or("-").replace('|', "\\|"),
                if o.correct { "yes" } else { "no" },
                o.points_earned,
                o.points_possible
            ));
        }
        md
    }
}
