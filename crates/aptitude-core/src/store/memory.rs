//! In-process store.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use async_trait::async_trait;

use super::{apply_claim, remove_where, upsert, Claim, ExamStore};
use crate::model::{AssignmentState, Candidate, Department, Question, TestResult};
use crate::quota::QuotaConfig;

#[derive(Debug, Default)]
struct Collections {
    questions: Vec<Question>,
    departments: Vec<Department>,
    candidates: Vec<Candidate>,
    results: Vec<TestResult>,
    quota: QuotaConfig,
}

/// A store that keeps everything in memory.
///
/// Counts candidate mutations so callers can check how often assignment
/// state was written.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Collections>,
    candidate_writes: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes that changed a candidate record.
    pub fn candidate_writes(&self) -> u32 {
        self.candidate_writes.load(Ordering::Relaxed)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>> {
        self.inner
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))
    }
}

#[async_trait]
impl ExamStore for MemoryStore {
    async fn questions(&self) -> Result<Vec<Question>> {
        Ok(self.lock()?.questions.clone())
    }

    async fn replace_questions(&self, questions: Vec<Question>) -> Result<()> {
        self.lock()?.questions = questions;
        Ok(())
    }

    async fn put_question(&self, question: Question) -> Result<()> {
        let id = question.id.clone();
        upsert(&mut self.lock()?.questions, question, |q| q.id == id);
        Ok(())
    }

    async fn remove_question(&self, id: &str) -> Result<bool> {
        Ok(remove_where(&mut self.lock()?.questions, |q| q.id == id))
    }

    async fn departments(&self) -> Result<Vec<Department>> {
        Ok(self.lock()?.departments.clone())
    }

    async fn put_department(&self, department: Department) -> Result<()> {
        let id = department.id.clone();
        upsert(&mut self.lock()?.departments, department, |d| d.id == id);
        Ok(())
    }

    async fn remove_department(&self, id: &str) -> Result<bool> {
        Ok(remove_where(&mut self.lock()?.departments, |d| d.id == id))
    }

    async fn candidate(&self, id: &str) -> Result<Option<Candidate>> {
        Ok(self.lock()?.candidates.iter().find(|c| c.id == id).cloned())
    }

    async fn candidates(&self) -> Result<Vec<Candidate>> {
        Ok(self.lock()?.candidates.clone())
    }

    async fn put_candidate(&self, candidate: Candidate) -> Result<()> {
        let id = candidate.id.clone();
        upsert(&mut self.lock()?.candidates, candidate, |c| c.id == id);
        self.candidate_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn remove_candidate(&self, id: &str) -> Result<bool> {
        Ok(remove_where(&mut self.lock()?.candidates, |c| c.id == id))
    }

    async fn claim_assignment(&self, id: &str, state: AssignmentState) -> Result<Option<Claim>> {
        let mut inner = self.lock()?;
        let Some(candidate) = inner.candidates.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        let claim = apply_claim(candidate, state);
        if matches!(claim, Claim::Won(_)) {
            self.candidate_writes.fetch_add(1, Ordering::Relaxed);
        }
        Ok(Some(claim))
    }

    async fn result(&self, candidate_id: &str) -> Result<Option<TestResult>> {
        Ok(self
            .lock()?
            .results
            .iter()
            .find(|r| r.candidate_id == candidate_id)
            .cloned())
    }

    async fn results(&self) -> Result<Vec<TestResult>> {
        Ok(self.lock()?.results.clone())
    }

    async fn insert_result(&self, result: TestResult) -> Result<bool> {
        let mut inner = self.lock()?;
        if inner
            .results
            .iter()
            .any(|r| r.candidate_id == result.candidate_id)
        {
            return Ok(false);
        }
        inner.results.push(result);
        Ok(true)
    }

    async fn replace_results(&self, results: Vec<TestResult>) -> Result<()> {
        self.lock()?.results = results;
        Ok(())
    }

    async fn remove_result(&self, candidate_id: &str) -> Result<bool> {
        Ok(remove_where(&mut self.lock()?.results, |r| {
            r.candidate_id == candidate_id
        }))
    }

    async fn quota_config(&self) -> Result<QuotaConfig> {
        Ok(self.lock()?.quota.clone())
    }

    async fn set_quota_config(&self, config: QuotaConfig) -> Result<()> {
        self.lock()?.quota = config;
        Ok(())
    }
}
