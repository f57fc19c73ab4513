//! Exam engine facade.
//!
//! Wraps an [`ExamStore`] with the locking needed to serve concurrent
//! callers: a per-candidate lock around assignment, one engine-wide lock
//! around submit-and-rerank, and a catalog read/write lock so grading and
//! drawing always see a consistent question set.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use chrono::NaiveDate;
use tokio::sync::{OwnedMutexGuard, RwLock};
use tracing::{info, warn};

use crate::assignment::{self, Assignment, AssignmentOutcome};
use crate::config::AptitudeConfig;
use crate::error::{EngineError, EngineResult, RecordKind};
use crate::model::{
    AnswerKind, AssignmentState, Candidate, Category, Department, Question, TestResult,
};
use crate::parser::Catalog;
use crate::quota::QuotaConfig;
use crate::ranking::recompute_ranks;
use crate::report::{AnswerReview, Leaderboard};
use crate::sampler::sample;
use crate::scoring::{review, score, CategoryGroups};
use crate::store::{Claim, ExamStore};

/// Counts of records written by [`ExamEngine::import_catalog`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub departments: usize,
    pub questions: usize,
    pub candidates: usize,
    pub quota_replaced: bool,
}

/// The question allocation and scoring engine.
pub struct ExamEngine {
    store: Arc<dyn ExamStore>,
    groups: CategoryGroups,
    catalog_lock: RwLock<()>,
    candidate_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    rank_lock: tokio::sync::Mutex<()>,
    rng: Mutex<StdRng>,
}

impl ExamEngine {
    /// Create an engine whose draws are seeded from OS entropy.
    pub fn new(store: Arc<dyn ExamStore>, groups: CategoryGroups) -> Self {
        Self::with_rng(store, groups, StdRng::from_entropy())
    }

    pub fn with_rng(store: Arc<dyn ExamStore>, groups: CategoryGroups, rng: StdRng) -> Self {
        Self {
            store,
            groups,
            catalog_lock: RwLock::new(()),
            candidate_locks: Mutex::new(HashMap::new()),
            rank_lock: tokio::sync::Mutex::new(()),
            rng: Mutex::new(rng),
        }
    }

    /// Build an engine from loaded configuration. A configured seed makes
    /// every draw reproducible.
    pub fn from_config(store: Arc<dyn ExamStore>, config: &AptitudeConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(store, config.category_groups.clone(), rng)
    }

    pub fn category_groups(&self) -> &CategoryGroups {
        &self.groups
    }

    fn rng(&self) -> EngineResult<MutexGuard<'_, StdRng>> {
        self.rng
            .lock()
            .map_err(|_| EngineError::Storage(anyhow::anyhow!("rng lock poisoned")))
    }

    fn candidate_lock(&self, candidate_id: &str) -> EngineResult<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self
            .candidate_locks
            .lock()
            .map_err(|_| EngineError::Storage(anyhow::anyhow!("candidate lock table poisoned")))?;
        Ok(locks.entry(candidate_id.to_string()).or_default().clone())
    }

    fn forget_candidate_lock(&self, candidate_id: &str) {
        if let Ok(mut locks) = self.candidate_locks.lock() {
            locks.remove(candidate_id);
        }
    }

    /// Lock an existing candidate and read it under the lock.
    ///
    /// Unknown ids fail before a lock entry is created; an id deleted while
    /// waiting for the lock has its entry dropped again.
    async fn lock_candidate(
        &self,
        candidate_id: &str,
    ) -> EngineResult<(OwnedMutexGuard<()>, Candidate)> {
        self.require_candidate(candidate_id).await?;
        let guard = self.candidate_lock(candidate_id)?.lock_owned().await;
        match self.require_candidate(candidate_id).await {
            Ok(candidate) => Ok((guard, candidate)),
            Err(e) => {
                drop(guard);
                self.forget_candidate_lock(candidate_id);
                Err(e)
            }
        }
    }

    /// Insert or update a candidate under its lock. An existing record keeps
    /// its assignment and registration time.
    async fn upsert_candidate(&self, mut candidate: Candidate) -> EngineResult<Candidate> {
        let _guard = self.candidate_lock(&candidate.id)?.lock_owned().await;
        if let Some(current) = self.store.candidate(&candidate.id).await? {
            candidate.assignment = current.assignment;
            candidate.created_at = current.created_at;
        }
        self.store.put_candidate(candidate.clone()).await?;
        Ok(candidate)
    }

    async fn require_candidate(&self, candidate_id: &str) -> EngineResult<Candidate> {
        self.store
            .candidate(candidate_id)
            .await?
            .ok_or_else(|| EngineError::not_found(RecordKind::Candidate, candidate_id))
    }

    // ---- candidate-facing calls ----

    /// Give a candidate its question set, drawing one only on the first call.
    ///
    /// Concurrent calls for the same candidate all return the same ids and
    /// the store sees a single assignment write.
    pub async fn assign_once(&self, candidate_id: &str) -> EngineResult<Assignment> {
        let (_guard, mut candidate) = self.lock_candidate(candidate_id).await?;
        if candidate.assignment.is_assigned() {
            return Ok(Assignment {
                candidate_id: candidate.id,
                state: candidate.assignment,
                outcome: AssignmentOutcome::Existing,
            });
        }

        let quota = self.store.quota_config().await?;
        let drawn = {
            let _catalog = self.catalog_lock.read().await;
            let catalog = self.store.questions().await?;
            let mut rng = self.rng()?;
            assignment::assign_once(&mut candidate, &catalog, &quota, &mut *rng)
        };

        match self.store.claim_assignment(candidate_id, drawn.state).await? {
            Some(Claim::Won(state)) => {
                info!(
                    "assigned {} questions to candidate {candidate_id}",
                    state.question_ids().len()
                );
                Ok(Assignment {
                    candidate_id: candidate_id.to_string(),
                    state,
                    outcome: AssignmentOutcome::Fresh,
                })
            }
            Some(Claim::Lost(state)) => Ok(Assignment {
                candidate_id: candidate_id.to_string(),
                state,
                outcome: AssignmentOutcome::Existing,
            }),
            None => Err(EngineError::not_found(RecordKind::Candidate, candidate_id)),
        }
    }

    /// Grade an answer sheet, store it as the candidate's result, and
    /// re-rank every result.
    ///
    /// A candidate with an assignment is graded on its assigned questions
    /// only; one that was never assigned is graded against the whole
    /// catalog.
    pub async fn grade_and_submit(
        &self,
        candidate_id: &str,
        answers: BTreeMap<String, String>,
    ) -> EngineResult<TestResult> {
        let _rank = self.rank_lock.lock().await;

        let candidate = self.require_candidate(candidate_id).await?;
        if self.store.result(candidate_id).await?.is_some() {
            return Err(EngineError::AlreadySubmitted(candidate_id.to_string()));
        }

        let scores = {
            let _catalog = self.catalog_lock.read().await;
            let catalog = self.store.questions().await?;
            let sheet = graded_questions(&candidate.assignment, catalog);
            let graded: HashSet<&str> = sheet.iter().map(|q| q.id.as_str()).collect();
            let ignored = answers
                .keys()
                .filter(|id| !graded.contains(id.as_str()))
                .count();
            if ignored > 0 {
                warn!(
                    "candidate {candidate_id}: ignoring {ignored} answers to unassigned questions"
                );
            }
            score(&answers, &sheet, &self.groups)
        };

        let result = TestResult {
            candidate_id: candidate_id.to_string(),
            submitted_at: chrono::Utc::now(),
            answers,
            scores: scores.by_group,
            total_score: scores.total,
            rank: 0,
        };
        if !self.store.insert_result(result.clone()).await? {
            return Err(EngineError::AlreadySubmitted(candidate_id.to_string()));
        }

        let ranked = self.rerank().await?;
        let stored = ranked
            .into_iter()
            .find(|r| r.candidate_id == candidate_id)
            .unwrap_or(result);
        info!(
            "candidate {candidate_id} submitted: {} points, rank {}",
            stored.total_score, stored.rank
        );
        Ok(stored)
    }

    /// Recompute and persist ranks. Callers must hold `rank_lock`.
    async fn rerank(&self) -> EngineResult<Vec<TestResult>> {
        let results = self.store.results().await?;
        let ranked = recompute_ranks(results);
        self.store.replace_results(ranked.clone()).await?;
        Ok(ranked)
    }

    /// The candidate's current leaderboard position.
    pub async fn get_rank(&self, candidate_id: &str) -> EngineResult<u32> {
        match self.store.result(candidate_id).await? {
            Some(result) => Ok(result.rank),
            None => {
                self.require_candidate(candidate_id).await?;
                Err(EngineError::not_found(RecordKind::Result, candidate_id))
            }
        }
    }

    // ---- quota ----

    /// Replace the quota table. Takes effect from the next assignment.
    pub async fn set_quota_config(&self, config: QuotaConfig) -> EngineResult<()> {
        info!("quota updated: {} buckets, {} questions", config.iter().count(), config.total());
        self.store.set_quota_config(config).await?;
        Ok(())
    }

    pub async fn quota_config(&self) -> EngineResult<QuotaConfig> {
        Ok(self.store.quota_config().await?)
    }

    // ---- candidates ----

    /// Store a candidate record. The department, if any, must exist.
    ///
    /// Registering an id that is already stored updates its details but
    /// keeps the drawn assignment and the original registration time.
    pub async fn register_candidate(&self, candidate: Candidate) -> EngineResult<Candidate> {
        if let Some(dept) = &candidate.department_id {
            let departments = self.store.departments().await?;
            if !departments.iter().any(|d| &d.id == dept) {
                return Err(EngineError::not_found(RecordKind::Department, dept.clone()));
            }
        }
        let candidate = self.upsert_candidate(candidate).await?;
        info!("registered candidate {} ({})", candidate.id, candidate.name);
        Ok(candidate)
    }

    /// Admit a candidate on `date`. Only the candidate's access date admits.
    pub async fn check_in(&self, candidate_id: &str, date: NaiveDate) -> EngineResult<Candidate> {
        let candidate = self.require_candidate(candidate_id).await?;
        if !candidate.can_sit_on(date) {
            warn!(
                "candidate {candidate_id} refused on {date} (access date {:?})",
                candidate.access_date
            );
            return Err(EngineError::NoAccess {
                candidate_id: candidate_id.to_string(),
                date,
            });
        }
        Ok(candidate)
    }

    pub async fn candidates(&self) -> EngineResult<Vec<Candidate>> {
        Ok(self.store.candidates().await?)
    }

    pub async fn candidate(&self, candidate_id: &str) -> EngineResult<Candidate> {
        self.require_candidate(candidate_id).await
    }

    /// Delete a candidate together with its result, re-ranking if a result
    /// was removed.
    pub async fn delete_candidate(&self, candidate_id: &str) -> EngineResult<()> {
        let (guard, _) = self.lock_candidate(candidate_id).await?;
        let _rank = self.rank_lock.lock().await;

        if !self.store.remove_candidate(candidate_id).await? {
            return Err(EngineError::not_found(RecordKind::Candidate, candidate_id));
        }
        if self.store.remove_result(candidate_id).await? {
            self.rerank().await?;
        }
        drop(guard);
        self.forget_candidate_lock(candidate_id);
        info!("deleted candidate {candidate_id}");
        Ok(())
    }

    /// Replace a candidate's assignment with an explicit question list.
    pub async fn override_assignment(
        &self,
        candidate_id: &str,
        question_ids: Vec<String>,
    ) -> EngineResult<Assignment> {
        let (_guard, mut candidate) = self.lock_candidate(candidate_id).await?;
        {
            let _catalog = self.catalog_lock.read().await;
            let catalog = self.store.questions().await?;
            let known: HashSet<&str> = catalog.iter().map(|q| q.id.as_str()).collect();
            if let Some(missing) = question_ids.iter().find(|id| !known.contains(id.as_str())) {
                return Err(EngineError::not_found(RecordKind::Question, missing.clone()));
            }
        }

        candidate.assignment = AssignmentState::from_ids(question_ids);
        let state = candidate.assignment.clone();
        self.store.put_candidate(candidate).await?;
        info!(
            "assignment for candidate {candidate_id} overridden with {} questions",
            state.question_ids().len()
        );
        Ok(Assignment {
            candidate_id: candidate_id.to_string(),
            state,
            outcome: AssignmentOutcome::Fresh,
        })
    }

    /// The candidate's assigned questions in assignment order. Ids that no
    /// longer exist in the catalog are skipped.
    pub async fn candidate_questions(&self, candidate_id: &str) -> EngineResult<Vec<Question>> {
        let candidate = self.require_candidate(candidate_id).await?;
        let _catalog = self.catalog_lock.read().await;
        let catalog = self.store.questions().await?;
        let mut by_id: HashMap<String, Question> =
            catalog.into_iter().map(|q| (q.id.clone(), q)).collect();
        Ok(candidate
            .assignment
            .question_ids()
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect())
    }

    // ---- departments ----

    pub async fn departments(&self) -> EngineResult<Vec<Department>> {
        Ok(self.store.departments().await?)
    }

    /// Create a department. Names are unique.
    pub async fn add_department(&self, name: &str) -> EngineResult<Department> {
        let _catalog = self.catalog_lock.write().await;
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::InvalidConfig("department name is empty".into()));
        }
        let departments = self.store.departments().await?;
        if departments.iter().any(|d| d.name == name) {
            return Err(EngineError::DuplicateDepartment(name.to_string()));
        }
        let department = Department::new(name);
        self.store.put_department(department.clone()).await?;
        info!("added department {} ({})", department.id, department.name);
        Ok(department)
    }

    /// Delete a department and remove it from every question.
    ///
    /// Returns how many questions lost the department.
    pub async fn delete_department(&self, department_id: &str) -> EngineResult<usize> {
        let _catalog = self.catalog_lock.write().await;
        if !self.store.remove_department(department_id).await? {
            return Err(EngineError::not_found(RecordKind::Department, department_id));
        }

        let mut questions = self.store.questions().await?;
        let mut touched = 0;
        for question in &mut questions {
            if question.department_ids.remove(department_id) {
                touched += 1;
            }
        }
        if touched > 0 {
            self.store.replace_questions(questions).await?;
        }

        let orphaned = self
            .store
            .candidates()
            .await?
            .iter()
            .filter(|c| c.department_id.as_deref() == Some(department_id))
            .count();
        if orphaned > 0 {
            warn!("{orphaned} candidates still reference deleted department {department_id}");
        }
        info!("deleted department {department_id}, updated {touched} questions");
        Ok(touched)
    }

    /// Add a department to each listed question.
    pub async fn assign_questions_to_department(
        &self,
        department_id: &str,
        question_ids: &[String],
    ) -> EngineResult<()> {
        let _catalog = self.catalog_lock.write().await;
        let departments = self.store.departments().await?;
        if !departments.iter().any(|d| d.id == department_id) {
            return Err(EngineError::not_found(RecordKind::Department, department_id));
        }

        let mut questions = self.store.questions().await?;
        for id in question_ids {
            if !questions.iter().any(|q| &q.id == id) {
                return Err(EngineError::not_found(RecordKind::Question, id.clone()));
            }
        }
        let wanted: HashSet<&str> = question_ids.iter().map(String::as_str).collect();
        for question in questions.iter_mut().filter(|q| wanted.contains(q.id.as_str())) {
            question.department_ids.insert(department_id.to_string());
        }
        self.store.replace_questions(questions).await?;
        info!(
            "assigned {} questions to department {department_id}",
            question_ids.len()
        );
        Ok(())
    }

    /// Clear every department from a question.
    pub async fn unassign_question(&self, question_id: &str) -> EngineResult<()> {
        let _catalog = self.catalog_lock.write().await;
        let mut questions = self.store.questions().await?;
        let Some(question) = questions.iter_mut().find(|q| q.id == question_id) else {
            return Err(EngineError::not_found(RecordKind::Question, question_id));
        };
        question.department_ids.clear();
        self.store.replace_questions(questions).await?;
        Ok(())
    }

    // ---- questions ----

    pub async fn questions(&self) -> EngineResult<Vec<Question>> {
        let _catalog = self.catalog_lock.read().await;
        Ok(self.store.questions().await?)
    }

    /// Insert or replace a question.
    pub async fn put_question(&self, question: Question) -> EngineResult<()> {
        check_question(&question)?;
        let _catalog = self.catalog_lock.write().await;
        info!("saving question {}", question.id);
        self.store.put_question(question).await?;
        Ok(())
    }

    pub async fn delete_question(&self, question_id: &str) -> EngineResult<()> {
        let _catalog = self.catalog_lock.write().await;
        if !self.store.remove_question(question_id).await? {
            return Err(EngineError::not_found(RecordKind::Question, question_id));
        }
        info!("deleted question {question_id}");
        Ok(())
    }

    /// Draw up to `count` questions from the whole catalog, optionally
    /// restricted to one category.
    pub async fn random_questions(
        &self,
        count: u32,
        category: Option<&Category>,
    ) -> EngineResult<Vec<Question>> {
        let _catalog = self.catalog_lock.read().await;
        let pool: Vec<Question> = self
            .store
            .questions()
            .await?
            .into_iter()
            .filter(|q| category.map_or(true, |c| &q.category == c))
            .collect();
        let mut rng = self.rng()?;
        Ok(sample(&pool, count, &mut *rng))
    }

    // ---- reports ----

    /// Ranked results joined with candidate and department names.
    pub async fn leaderboard(&self) -> EngineResult<Leaderboard> {
        let results = self.store.results().await?;
        let candidates = self.store.candidates().await?;
        let departments = self.store.departments().await?;
        Ok(Leaderboard::build(&results, &candidates, &departments))
    }

    /// Per-question grading breakdown of a candidate's submission.
    pub async fn answer_review(&self, candidate_id: &str) -> EngineResult<AnswerReview> {
        let candidate = self.require_candidate(candidate_id).await?;
        let result = self
            .store
            .result(candidate_id)
            .await?
            .ok_or_else(|| EngineError::not_found(RecordKind::Result, candidate_id))?;

        let _catalog = self.catalog_lock.read().await;
        let catalog = self.store.questions().await?;
        let order: Vec<String> = if candidate.assignment.question_ids().is_empty() {
            catalog.iter().map(|q| q.id.clone()).collect()
        } else {
            candidate.assignment.question_ids().to_vec()
        };
        let outcomes = review(&result.answers, &order, &catalog);
        Ok(AnswerReview::new(&candidate, &result, outcomes))
    }

    // ---- bulk import ----

    /// Upsert a parsed catalog into the store.
    ///
    /// Existing candidates keep their assignment and registration time. A
    /// department whose name is already taken by a different id is rejected
    /// before anything is written.
    pub async fn import_catalog(&self, catalog: Catalog) -> EngineResult<ImportSummary> {
        let catalog_guard = self.catalog_lock.write().await;

        let existing = self.store.departments().await?;
        let mut names: HashMap<&str, &str> = HashMap::new();
        for department in &catalog.departments {
            if existing
                .iter()
                .any(|d| d.name == department.name && d.id != department.id)
            {
                return Err(EngineError::DuplicateDepartment(department.name.clone()));
            }
            if let Some(first) = names.insert(department.name.as_str(), department.id.as_str()) {
                if first != department.id {
                    return Err(EngineError::DuplicateDepartment(department.name.clone()));
                }
            }
        }
        for question in &catalog.questions {
            check_question(question)?;
        }

        let mut summary = ImportSummary::default();
        for department in catalog.departments {
            self.store.put_department(department).await?;
            summary.departments += 1;
        }
        for question in catalog.questions {
            self.store.put_question(question).await?;
            summary.questions += 1;
        }
        if let Some(quota) = catalog.quota {
            self.store.set_quota_config(quota).await?;
            summary.quota_replaced = true;
        }
        // assign_once takes a candidate lock before the catalog lock
        drop(catalog_guard);

        for candidate in catalog.candidates {
            self.upsert_candidate(candidate).await?;
            summary.candidates += 1;
        }

        info!(
            "imported {} departments, {} questions, {} candidates",
            summary.departments, summary.questions, summary.candidates
        );
        Ok(summary)
    }
}

/// The questions a submission is graded against.
fn graded_questions(state: &AssignmentState, catalog: Vec<Question>) -> Vec<Question> {
    match state {
        AssignmentState::Unassigned => catalog,
        AssignmentState::Assigned(ids) => {
            let ids: HashSet<&str> = ids.iter().map(String::as_str).collect();
            catalog
                .into_iter()
                .filter(|q| ids.contains(q.id.as_str()))
                .collect()
        }
        AssignmentState::AssignedEmpty => Vec::new(),
    }
}

fn check_question(question: &Question) -> EngineResult<()> {
    if question.points == 0 {
        return Err(EngineError::InvalidConfig(format!(
            "question {}: points must be greater than 0",
            question.id
        )));
    }
    if let AnswerKind::Subjective { keywords, .. } = &question.kind {
        if keywords.is_empty() {
            return Err(EngineError::InvalidConfig(format!(
                "question {}: subjective questions need keywords",
                question.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use futures::future::join_all;

    use super::*;
    use crate::bucket::{bucket, BucketScope};
    use crate::model::{AnswerType, BucketKey, Difficulty};
    use crate::store::{JsonDirStore, MemoryStore};

    fn objective(id: &str, category: Category, points: u32, depts: &[&str]) -> Question {
        Question {
            id: id.into(),
            category,
            difficulty: Difficulty::Medium,
            prompt: format!("prompt {id}"),
            points,
            department_ids: depts.iter().map(|d| d.to_string()).collect::<BTreeSet<_>>(),
            kind: AnswerKind::Objective {
                options: vec!["right".into(), "wrong".into()],
                correct_answer: "right".into(),
            },
        }
    }

    fn subjective(id: &str, points: u32, depts: &[&str]) -> Question {
        Question {
            id: id.into(),
            category: Category::Database,
            difficulty: Difficulty::Hard,
            prompt: format!("prompt {id}"),
            points,
            department_ids: depts.iter().map(|d| d.to_string()).collect::<BTreeSet<_>>(),
            kind: AnswerKind::Subjective {
                keywords: vec!["select".into(), "from".into(), "where".into()],
                reference_answer: None,
            },
        }
    }

    fn quota(entries: &[(Category, AnswerType, i64)]) -> QuotaConfig {
        QuotaConfig::from_counts(
            entries
                .iter()
                .map(|(c, t, n)| (BucketKey::new(c.clone(), *t), *n)),
        )
        .unwrap()
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        engine: ExamEngine,
        dept: Department,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let engine = ExamEngine::with_rng(
            store.clone(),
            CategoryGroups::default(),
            StdRng::seed_from_u64(17),
        );
        let dept = engine.add_department("Backend").await.unwrap();
        let d = dept.id.as_str();

        let mut questions = Vec::new();
        for i in 0..6 {
            questions.push(objective(&format!("j{i}"), Category::Java, 10, &[d]));
        }
        for i in 0..3 {
            questions.push(subjective(&format!("s{i}"), 20, &[d]));
        }
        for i in 0..4 {
            questions.push(objective(&format!("p{i}"), Category::ProblemSolving, 5, &[d]));
        }
        questions.push(objective("other-dept", Category::Java, 10, &["dept_elsewhere"]));
        for q in questions {
            engine.put_question(q).await.unwrap();
        }

        engine
            .set_quota_config(quota(&[
                (Category::Java, AnswerType::Objective, 3),
                (Category::Database, AnswerType::Subjective, 1),
                (Category::ProblemSolving, AnswerType::Objective, 2),
            ]))
            .await
            .unwrap();

        Fixture {
            store,
            engine,
            dept,
        }
    }

    async fn register(fx: &Fixture, name: &str) -> String {
        fx.engine
            .register_candidate(Candidate::new(name, Some(fx.dept.id.clone())))
            .await
            .unwrap()
            .id
    }

    fn all_right(ids: &[String], catalog: &[Question]) -> BTreeMap<String, String> {
        ids.iter()
            .map(|id| {
                let q = catalog.iter().find(|q| &q.id == id).unwrap();
                let answer = match &q.kind {
                    AnswerKind::Objective { correct_answer, .. } => correct_answer.clone(),
                    AnswerKind::Subjective { .. } => "SELECT a FROM b WHERE c".into(),
                };
                (id.clone(), answer)
            })
            .collect()
    }

    #[tokio::test]
    async fn assign_once_draws_per_quota_and_is_idempotent() {
        let fx = fixture().await;
        let id = register(&fx, "Kim").await;

        let first = fx.engine.assign_once(&id).await.unwrap();
        let second = fx.engine.assign_once(&id).await.unwrap();

        assert!(first.is_fresh());
        assert_eq!(second.outcome, AssignmentOutcome::Existing);
        assert_eq!(first.question_ids(), second.question_ids());
        assert_eq!(first.question_ids().len(), 6);
        assert!(!first.question_ids().contains(&"other-dept".to_string()));
        assert!(first.question_ids()[..3].iter().all(|q| q.starts_with('j')));
        assert!(first.question_ids()[3].starts_with('s'));
    }

    #[tokio::test]
    async fn concurrent_assign_writes_once() {
        let fx = fixture().await;
        let id = register(&fx, "Lee").await;
        let writes_before = fx.store.candidate_writes();

        let calls = (0..8).map(|_| fx.engine.assign_once(&id));
        let outcomes: Vec<Assignment> = join_all(calls)
            .await
            .into_iter()
            .collect::<EngineResult<_>>()
            .unwrap();

        assert_eq!(fx.store.candidate_writes(), writes_before + 1);
        assert_eq!(outcomes.iter().filter(|a| a.is_fresh()).count(), 1);
        assert!(outcomes
            .iter()
            .all(|a| a.question_ids() == outcomes[0].question_ids()));
    }

    #[tokio::test]
    async fn quota_changes_apply_to_later_candidates_only() {
        let fx = fixture().await;
        let early = register(&fx, "Early").await;
        let late = register(&fx, "Late").await;

        let before = fx.engine.assign_once(&early).await.unwrap();
        fx.engine
            .set_quota_config(quota(&[(Category::Java, AnswerType::Objective, 1)]))
            .await
            .unwrap();
        let after = fx.engine.assign_once(&late).await.unwrap();
        let early_again = fx.engine.assign_once(&early).await.unwrap();

        assert_eq!(before.question_ids().len(), 6);
        assert_eq!(after.question_ids().len(), 1);
        assert_eq!(early_again.question_ids(), before.question_ids());
    }

    #[tokio::test]
    async fn zero_quota_records_empty_assignment() {
        let fx = fixture().await;
        fx.engine.set_quota_config(QuotaConfig::default()).await.unwrap();
        let id = register(&fx, "Park").await;

        let first = fx.engine.assign_once(&id).await.unwrap();
        assert_eq!(first.state, AssignmentState::AssignedEmpty);

        fx.engine
            .set_quota_config(quota(&[(Category::Java, AnswerType::Objective, 3)]))
            .await
            .unwrap();
        let second = fx.engine.assign_once(&id).await.unwrap();
        assert_eq!(second.outcome, AssignmentOutcome::Existing);
        assert!(second.question_ids().is_empty());
    }

    #[tokio::test]
    async fn unknown_candidate_is_not_found() {
        let fx = fixture().await;
        let err = fx.engine.assign_once("ghost").await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::NotFound {
                kind: RecordKind::Candidate,
                ..
            }
        ));
        assert!(fx.engine.get_rank("ghost").await.is_err());
    }

    #[tokio::test]
    async fn submissions_are_graded_and_ranked() {
        let fx = fixture().await;
        let catalog = fx.engine.questions().await.unwrap();

        let a = register(&fx, "A").await;
        let b = register(&fx, "B").await;
        let c = register(&fx, "C").await;
        for id in [&a, &b, &c] {
            fx.engine.assign_once(id).await.unwrap();
        }

        let ids_a = fx.engine.candidate(&a).await.unwrap().assignment;
        let ids_b = fx.engine.candidate(&b).await.unwrap().assignment;
        let ids_c = fx.engine.candidate(&c).await.unwrap().assignment;

        // Everything right: 3*10 + 20 + 2*5 = 60.
        let ra = fx
            .engine
            .grade_and_submit(&a, all_right(ids_a.question_ids(), &catalog))
            .await
            .unwrap();
        assert_eq!(ra.total_score, 60);
        assert_eq!(ra.scores["technical"], 50);
        assert_eq!(ra.scores["problem_solving"], 10);
        assert_eq!(ra.rank, 1);

        fx.engine
            .grade_and_submit(&b, all_right(ids_b.question_ids(), &catalog))
            .await
            .unwrap();

        // Only the problem-solving answers: 10 points.
        let ps_only: BTreeMap<String, String> = all_right(ids_c.question_ids(), &catalog)
            .into_iter()
            .filter(|(id, _)| id.starts_with('p'))
            .collect();
        let rc = fx.engine.grade_and_submit(&c, ps_only).await.unwrap();
        assert_eq!(rc.total_score, 10);

        assert_eq!(fx.engine.get_rank(&a).await.unwrap(), 1);
        assert_eq!(fx.engine.get_rank(&b).await.unwrap(), 2);
        assert_eq!(fx.engine.get_rank(&c).await.unwrap(), 3);

        let stored: Vec<String> = fx
            .store
            .results()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.candidate_id)
            .collect();
        assert_eq!(stored, vec![a, b, c]);
    }

    #[tokio::test]
    async fn answers_outside_the_assignment_do_not_score() {
        let fx = fixture().await;
        let id = register(&fx, "Cheat").await;
        fx.engine
            .override_assignment(&id, vec!["j0".into()])
            .await
            .unwrap();

        let answers = BTreeMap::from([
            ("j0".to_string(), "right".to_string()),
            ("j1".to_string(), "right".to_string()),
        ]);
        let result = fx.engine.grade_and_submit(&id, answers).await.unwrap();
        assert_eq!(result.total_score, 10);
        assert_eq!(result.answers.len(), 2);
    }

    #[tokio::test]
    async fn resubmission_is_rejected() {
        let fx = fixture().await;
        let id = register(&fx, "Twice").await;
        fx.engine.grade_and_submit(&id, BTreeMap::new()).await.unwrap();
        let err = fx
            .engine
            .grade_and_submit(&id, BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::AlreadySubmitted(_)));
    }

    #[tokio::test]
    async fn delete_candidate_removes_result_and_reranks() {
        let fx = fixture().await;
        let top = register(&fx, "Top").await;
        let low = register(&fx, "Low").await;
        fx.engine
            .override_assignment(&top, vec!["j0".into()])
            .await
            .unwrap();
        fx.engine
            .grade_and_submit(&top, BTreeMap::from([("j0".to_string(), "right".to_string())]))
            .await
            .unwrap();
        fx.engine.grade_and_submit(&low, BTreeMap::new()).await.unwrap();
        assert_eq!(fx.engine.get_rank(&low).await.unwrap(), 2);

        fx.engine.delete_candidate(&top).await.unwrap();
        assert_eq!(fx.engine.get_rank(&low).await.unwrap(), 1);
        assert!(fx.engine.candidate(&top).await.is_err());
        assert!(matches!(
            fx.engine.delete_candidate(&top).await.unwrap_err(),
            EngineError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn delete_department_cascades_to_questions() {
        let fx = fixture().await;
        let touched = fx.engine.delete_department(&fx.dept.id).await.unwrap();
        assert_eq!(touched, 13);

        let catalog = fx.engine.questions().await.unwrap();
        assert!(catalog.iter().all(|q| !q.in_department(&fx.dept.id)));
        let buckets = bucket(&catalog, BucketScope::Department(&fx.dept.id));
        assert_eq!(buckets.question_count(), 0);
        assert!(buckets.iter().all(|(_, qs)| qs.is_empty()));

        assert!(fx.engine.departments().await.unwrap().is_empty());
        assert!(fx.engine.delete_department(&fx.dept.id).await.is_err());
    }

    #[tokio::test]
    async fn duplicate_department_name_is_rejected() {
        let fx = fixture().await;
        let err = fx.engine.add_department(" Backend ").await.unwrap_err();
        assert!(matches!(err, EngineError::DuplicateDepartment(name) if name == "Backend"));
        fx.engine.add_department("Frontend").await.unwrap();
        assert_eq!(fx.engine.departments().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn department_membership_edits() {
        let fx = fixture().await;
        let ops = fx.engine.add_department("Ops").await.unwrap();
        fx.engine
            .assign_questions_to_department(&ops.id, &["j0".into(), "p1".into()])
            .await
            .unwrap();
        let catalog = fx.engine.questions().await.unwrap();
        let j0 = catalog.iter().find(|q| q.id == "j0").unwrap();
        assert!(j0.in_department(&ops.id) && j0.in_department(&fx.dept.id));

        fx.engine.unassign_question("j0").await.unwrap();
        let catalog = fx.engine.questions().await.unwrap();
        assert!(catalog
            .iter()
            .find(|q| q.id == "j0")
            .unwrap()
            .department_ids
            .is_empty());

        let err = fx
            .engine
            .assign_questions_to_department(&ops.id, &["nope".into()])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::NotFound {
                kind: RecordKind::Question,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn override_rejects_unknown_questions() {
        let fx = fixture().await;
        let id = register(&fx, "Jung").await;
        fx.engine.assign_once(&id).await.unwrap();

        let err = fx
            .engine
            .override_assignment(&id, vec!["j0".into(), "missing".into()])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));

        let replaced = fx
            .engine
            .override_assignment(&id, vec!["p2".into(), "j4".into()])
            .await
            .unwrap();
        assert_eq!(replaced.question_ids(), ["p2".to_string(), "j4".to_string()]);

        let questions = fx.engine.candidate_questions(&id).await.unwrap();
        let ids: Vec<&str> = questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["p2", "j4"]);
    }

    #[tokio::test]
    async fn question_edits() {
        let fx = fixture().await;
        let mut bad = objective("zero", Category::Java, 0, &[]);
        assert!(matches!(
            fx.engine.put_question(bad.clone()).await.unwrap_err(),
            EngineError::InvalidConfig(_)
        ));
        bad.points = 2;
        fx.engine.put_question(bad).await.unwrap();
        fx.engine.delete_question("zero").await.unwrap();
        assert!(fx.engine.delete_question("zero").await.is_err());
    }

    #[tokio::test]
    async fn random_questions_respects_category_and_count() {
        let fx = fixture().await;
        let picked = fx
            .engine
            .random_questions(3, Some(&Category::ProblemSolving))
            .await
            .unwrap();
        assert_eq!(picked.len(), 3);
        assert!(picked.iter().all(|q| q.category == Category::ProblemSolving));

        let everything = fx.engine.random_questions(100, None).await.unwrap();
        assert_eq!(everything.len(), 14);
    }

    #[tokio::test]
    async fn leaderboard_and_review() {
        let fx = fixture().await;
        let id = register(&fx, "Yoon").await;
        fx.engine
            .override_assignment(&id, vec!["s0".into(), "j0".into()])
            .await
            .unwrap();
        fx.engine
            .grade_and_submit(
                &id,
                BTreeMap::from([("s0".to_string(), "select only".to_string())]),
            )
            .await
            .unwrap();

        let board = fx.engine.leaderboard().await.unwrap();
        assert_eq!(board.entries.len(), 1);
        assert_eq!(board.entries[0].candidate_name, "Yoon");
        assert_eq!(board.entries[0].department.as_deref(), Some("Backend"));

        let review = fx.engine.answer_review(&id).await.unwrap();
        assert_eq!(review.outcomes.len(), 2);
        assert_eq!(review.outcomes[0].question_id, "s0");
        assert!(!review.outcomes[0].correct);
        assert_eq!(review.outcomes[1].answer, None);
        assert_eq!(review.points_possible, 30);
    }

    #[tokio::test]
    async fn import_keeps_existing_assignments() {
        let fx = fixture().await;
        let mut candidate = Candidate::new("Han", Some(fx.dept.id.clone()));
        candidate.id = "cand-1".into();
        fx.engine.register_candidate(candidate.clone()).await.unwrap();
        let drawn = fx.engine.assign_once("cand-1").await.unwrap();

        candidate.email = "han@example.com".into();
        let summary = fx
            .engine
            .import_catalog(Catalog {
                departments: vec![fx.dept.clone()],
                questions: vec![objective("new-q", Category::Java, 3, &[])],
                quota: None,
                candidates: vec![candidate],
            })
            .await
            .unwrap();

        assert_eq!(summary.questions, 1);
        assert!(!summary.quota_replaced);
        let stored = fx.engine.candidate("cand-1").await.unwrap();
        assert_eq!(stored.email, "han@example.com");
        assert_eq!(stored.assignment, drawn.state);
    }

    #[tokio::test]
    async fn import_rejects_renamed_duplicate_department() {
        let fx = fixture().await;
        let err = fx
            .engine
            .import_catalog(Catalog {
                departments: vec![Department {
                    id: "other-id".into(),
                    name: "Backend".into(),
                }],
                ..Catalog::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateDepartment(_)));
    }

    #[tokio::test]
    async fn register_requires_known_department() {
        let fx = fixture().await;
        let err = fx
            .engine
            .register_candidate(Candidate::new("Seo", Some("dept_missing".into())))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::NotFound {
                kind: RecordKind::Department,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn works_over_json_directory_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = AptitudeConfig {
            data_dir: dir.path().to_path_buf(),
            seed: Some(5),
            ..AptitudeConfig::default()
        };
        let store = Arc::new(JsonDirStore::open(&config.data_dir).await.unwrap());
        let engine = ExamEngine::from_config(store, &config);

        let dept = engine.add_department("Data").await.unwrap();
        engine
            .put_question(subjective("s1", 8, &[dept.id.as_str()]))
            .await
            .unwrap();
        engine
            .set_quota_config(quota(&[(Category::Database, AnswerType::Subjective, 1)]))
            .await
            .unwrap();
        let candidate = engine
            .register_candidate(Candidate::new("Shin", Some(dept.id.clone())))
            .await
            .unwrap();

        let drawn = engine.assign_once(&candidate.id).await.unwrap();
        assert_eq!(drawn.question_ids(), ["s1".to_string()]);
        let result = engine
            .grade_and_submit(
                &candidate.id,
                BTreeMap::from([("s1".to_string(), "select x from y".to_string())]),
            )
            .await
            .unwrap();
        assert_eq!(result.total_score, 8);

        // A second engine over the same directory sees the persisted state.
        let reopened = ExamEngine::from_config(
            Arc::new(JsonDirStore::open(dir.path()).await.unwrap()),
            &config,
        );
        assert_eq!(reopened.get_rank(&candidate.id).await.unwrap(), 1);
        assert_eq!(
            reopened.assign_once(&candidate.id).await.unwrap().outcome,
            AssignmentOutcome::Existing
        );
    }

    #[tokio::test]
    async fn reregistering_keeps_the_drawn_assignment() {
        let fx = fixture().await;
        let mut candidate = Candidate::new("Yoon", Some(fx.dept.id.clone()));
        candidate.id = "cand-x".into();
        let registered = fx.engine.register_candidate(candidate.clone()).await.unwrap();
        let first = fx.engine.assign_once("cand-x").await.unwrap();

        candidate.phone = "010-0000-0000".into();
        candidate.created_at = registered.created_at + chrono::Duration::days(1);
        let again = fx.engine.register_candidate(candidate).await.unwrap();
        assert_eq!(again.assignment, first.state);
        assert_eq!(again.created_at, registered.created_at);

        let second = fx.engine.assign_once("cand-x").await.unwrap();
        assert_eq!(second.outcome, AssignmentOutcome::Existing);
        assert_eq!(second.question_ids(), first.question_ids());
        assert_eq!(fx.engine.candidate("cand-x").await.unwrap().phone, "010-0000-0000");
    }

    #[tokio::test]
    async fn import_waits_for_an_in_flight_assignment() {
        let fx = fixture().await;
        let mut candidate = Candidate::new("Jang", Some(fx.dept.id.clone()));
        candidate.id = "cand-1".into();
        fx.engine.register_candidate(candidate.clone()).await.unwrap();

        // Hold the candidate lock the way assign_once does between drawing
        // and claiming.
        let lock = fx.engine.candidate_lock("cand-1").unwrap();
        let guard = lock.lock().await;

        let import = fx.engine.import_catalog(Catalog {
            candidates: vec![candidate],
            ..Catalog::default()
        });
        tokio::pin!(import);
        let wait = std::time::Duration::from_millis(50);
        let pending = tokio::time::timeout(wait, &mut import).await;
        assert!(pending.is_err(), "import must not write a locked candidate");

        let claimed = AssignmentState::from_ids(vec!["j0".into(), "p1".into()]);
        let claim = fx
            .store
            .claim_assignment("cand-1", claimed.clone())
            .await
            .unwrap();
        assert!(matches!(claim, Some(Claim::Won(_))));
        drop(guard);

        let summary = import.await.unwrap();
        assert_eq!(summary.candidates, 1);
        assert_eq!(fx.engine.candidate("cand-1").await.unwrap().assignment, claimed);
    }

    #[tokio::test]
    async fn import_rejects_repeated_department_names() {
        let fx = fixture().await;
        let err = fx
            .engine
            .import_catalog(Catalog {
                departments: vec![
                    Department {
                        id: "d1".into(),
                        name: "Ops".into(),
                    },
                    Department {
                        id: "d2".into(),
                        name: "Ops".into(),
                    },
                ],
                ..Catalog::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateDepartment(ref name) if name == "Ops"));

        let names: Vec<String> = fx
            .engine
            .departments()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, ["Backend"]);
    }

    #[tokio::test]
    async fn concurrent_submissions_rank_every_result() {
        let fx = fixture().await;
        let catalog = fx.engine.questions().await.unwrap();

        let mut sheets = Vec::new();
        for i in 0..6 {
            let id = register(&fx, &format!("cand {i}")).await;
            let drawn = fx.engine.assign_once(&id).await.unwrap();
            let ids = drawn.question_ids();
            let answers = all_right(&ids[..i.min(ids.len())], &catalog);
            sheets.push((id, answers));
        }

        let submits = sheets
            .iter()
            .map(|(id, answers)| fx.engine.grade_and_submit(id, answers.clone()));
        let returned: Vec<TestResult> = join_all(submits)
            .await
            .into_iter()
            .collect::<EngineResult<_>>()
            .unwrap();
        assert!(returned.iter().all(|r| r.rank > 0));

        let stored = fx.store.results().await.unwrap();
        let ranks: Vec<u32> = stored.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, (1..=6).collect::<Vec<u32>>());
        assert!(stored
            .windows(2)
            .all(|w| w[0].total_score >= w[1].total_score));
        assert_eq!(recompute_ranks(stored.clone()), stored);
        for result in &stored {
            assert_eq!(
                fx.engine.get_rank(&result.candidate_id).await.unwrap(),
                result.rank
            );
        }
    }

    #[tokio::test]
    async fn unknown_ids_leave_no_lock_entries() {
        let fx = fixture().await;
        let before = fx.engine.candidate_locks.lock().unwrap().len();

        assert!(fx.engine.assign_once("ghost").await.is_err());
        assert!(fx
            .engine
            .override_assignment("ghost", Vec::new())
            .await
            .is_err());
        assert!(fx.engine.delete_candidate("ghost").await.is_err());

        assert_eq!(fx.engine.candidate_locks.lock().unwrap().len(), before);
    }

    #[tokio::test]
    async fn check_in_only_on_the_access_date() {
        let fx = fixture().await;
        let day = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let mut candidate = Candidate::new("Oh", Some(fx.dept.id.clone()));
        candidate.access_date = Some(day);
        let with_date = fx.engine.register_candidate(candidate).await.unwrap();
        let without_date = register(&fx, "Moon").await;

        let admitted = fx.engine.check_in(&with_date.id, day).await.unwrap();
        assert_eq!(admitted.id, with_date.id);

        let next_day = day.succ_opt().unwrap();
        let err = fx.engine.check_in(&with_date.id, next_day).await.unwrap_err();
        assert!(matches!(err, EngineError::NoAccess { date, .. } if date == next_day));
        assert!(matches!(
            fx.engine.check_in(&without_date, day).await,
            Err(EngineError::NoAccess { .. })
        ));
        assert!(matches!(
            fx.engine.check_in("ghost", day).await,
            Err(EngineError::NotFound { .. })
        ));
    }
}
