//! File-backed store: one pretty-printed JSON file per collection.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use super::{apply_claim, remove_where, upsert, Claim, ExamStore};
use crate::model::{AssignmentState, Candidate, Department, Question, TestResult};
use crate::quota::QuotaConfig;

const QUESTIONS_FILE: &str = "questions.json";
const DEPARTMENTS_FILE: &str = "departments.json";
const CANDIDATES_FILE: &str = "candidates.json";
const RESULTS_FILE: &str = "results.json";
const QUOTA_FILE: &str = "quota.json";

/// A store persisted as JSON files in a data directory.
///
/// Missing files read as empty collections. Every operation holds one
/// store-wide lock for its whole read-modify-write cycle, and files are
/// replaced by rename so readers never see a partial write.
pub struct JsonDirStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl JsonDirStore {
    /// Open (and create if needed) a data directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("failed to create data directory: {}", dir.display()))?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn load<T: DeserializeOwned + Default>(&self, file: &str) -> Result<T> {
        let path = self.dir.join(file);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()));
            }
        };
        if content.trim().is_empty() {
            return Ok(T::default());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    async fn save<T: Serialize + ?Sized>(&self, file: &str, value: &T) -> Result<()> {
        let path = self.dir.join(file);
        let tmp = self.dir.join(format!("{file}.tmp"));
        let json = serde_json::to_string_pretty(value)
            .with_context(|| format!("failed to serialize {file}"))?;
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl ExamStore for JsonDirStore {
    async fn questions(&self) -> Result<Vec<Question>> {
        let _guard = self.lock.lock().await;
        self.load(QUESTIONS_FILE).await
    }

    async fn replace_questions(&self, questions: Vec<Question>) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.save(QUESTIONS_FILE, &questions).await
    }

    async fn put_question(&self, question: Question) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut questions: Vec<Question> = self.load(QUESTIONS_FILE).await?;
        let id = question.id.clone();
        upsert(&mut questions, question, |q| q.id == id);
        self.save(QUESTIONS_FILE, &questions).await
    }

    async fn remove_question(&self, id: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut questions: Vec<Question> = self.load(QUESTIONS_FILE).await?;
        let removed = remove_where(&mut questions, |q| q.id == id);
        if removed {
            self.save(QUESTIONS_FILE, &questions).await?;
        }
        Ok(removed)
    }

    async fn departments(&self) -> Result<Vec<Department>> {
        let _guard = self.lock.lock().await;
        self.load(DEPARTMENTS_FILE).await
    }

    async fn put_department(&self, department: Department) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut departments: Vec<Department> = self.load(DEPARTMENTS_FILE).await?;
        let id = department.id.clone();
        upsert(&mut departments, department, |d| d.id == id);
        self.save(DEPARTMENTS_FILE, &departments).await
    }

    async fn remove_department(&self, id: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut departments: Vec<Department> = self.load(DEPARTMENTS_FILE).await?;
        let removed = remove_where(&mut departments, |d| d.id == id);
        if removed {
            self.save(DEPARTMENTS_FILE, &departments).await?;
        }
        Ok(removed)
    }

    async fn candidate(&self, id: &str) -> Result<Option<Candidate>> {
        let _guard = self.lock.lock().await;
        let candidates: Vec<Candidate> = self.load(CANDIDATES_FILE).await?;
        Ok(candidates.into_iter().find(|c| c.id == id))
    }

    async fn candidates(&self) -> Result<Vec<Candidate>> {
        let _guard = self.lock.lock().await;
        self.load(CANDIDATES_FILE).await
    }

    async fn put_candidate(&self, candidate: Candidate) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut candidates: Vec<Candidate> = self.load(CANDIDATES_FILE).await?;
        let id = candidate.id.clone();
        upsert(&mut candidates, candidate, |c| c.id == id);
        self.save(CANDIDATES_FILE, &candidates).await
    }

    async fn remove_candidate(&self, id: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut candidates: Vec<Candidate> = self.load(CANDIDATES_FILE).await?;
        let removed = remove_where(&mut candidates, |c| c.id == id);
        if removed {
            self.save(CANDIDATES_FILE, &candidates).await?;
        }
        Ok(removed)
    }

    async fn claim_assignment(&self, id: &str, state: AssignmentState) -> Result<Option<Claim>> {
        let _guard = self.lock.lock().await;
        let mut candidates: Vec<Candidate> = self.load(CANDIDATES_FILE).await?;
        let Some(candidate) = candidates.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        let claim = apply_claim(candidate, state);
        if matches!(claim, Claim::Won(_)) {
            self.save(CANDIDATES_FILE, &candidates).await?;
        }
        Ok(Some(claim))
    }

    async fn result(&self, candidate_id: &str) -> Result<Option<TestResult>> {
        let _guard = self.lock.lock().await;
        let results: Vec<TestResult> = self.load(RESULTS_FILE).await?;
        Ok(results.into_iter().find(|r| r.candidate_id == candidate_id))
    }

    async fn results(&self) -> Result<Vec<TestResult>> {
        let _guard = self.lock.lock().await;
        self.load(RESULTS_FILE).await
    }

    async fn insert_result(&self, result: TestResult) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut results: Vec<TestResult> = self.load(RESULTS_FILE).await?;
        if results.iter().any(|r| r.candidate_id == result.candidate_id) {
            return Ok(false);
        }
        results.push(result);
        self.save(RESULTS_FILE, &results).await?;
        Ok(true)
    }

    async fn replace_results(&self, results: Vec<TestResult>) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.save(RESULTS_FILE, &results).await
    }

    async fn remove_result(&self, candidate_id: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut results: Vec<TestResult> = self.load(RESULTS_FILE).await?;
        let removed = remove_where(&mut results, |r| r.candidate_id == candidate_id);
        if removed {
            self.save(RESULTS_FILE, &results).await?;
        }
        Ok(removed)
    }

    async fn quota_config(&self) -> Result<QuotaConfig> {
        let _guard = self.lock.lock().await;
        self.load(QUOTA_FILE).await
    }

    async fn set_quota_config(&self, config: QuotaConfig) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.save(QUOTA_FILE, &config).await
    }
}
