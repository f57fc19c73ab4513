//! TOML catalog parser.
//!
//! Loads departments, questions, an optional quota table, and a candidate
//! roster from a TOML file, and validates them.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::bucket::{bucket, BucketScope};
use crate::model::{
    AnswerKind, AnswerType, AssignmentState, BucketKey, Candidate, Category, Department,
    Difficulty, Question,
};
use crate::quota::QuotaConfig;

/// Everything a catalog file can carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub departments: Vec<Department>,
    pub questions: Vec<Question>,
    /// `None` when the file has no `[[quota]]` entries.
    pub quota: Option<QuotaConfig>,
    pub candidates: Vec<Candidate>,
}

/// Intermediate TOML structure for parsing catalog files.
#[derive(Debug, Deserialize)]
struct TomlCatalogFile {
    #[serde(default)]
    departments: Vec<TomlDepartment>,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
    #[serde(default)]
    quota: Vec<TomlQuota>,
    #[serde(default)]
    candidates: Vec<TomlCandidate>,
}

#[derive(Debug, Deserialize)]
struct TomlDepartment {
    #[serde(default)]
    id: Option<String>,
    name: String,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    category: String,
    #[serde(rename = "type")]
    answer_type: String,
    #[serde(default)]
    difficulty: Option<String>,
    prompt: String,
    #[serde(default = "default_points")]
    points: i64,
    #[serde(default)]
    department_ids: Vec<String>,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    correct_answer: Option<String>,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    reference_answer: Option<String>,
}

fn default_points() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
struct TomlQuota {
    category: String,
    answer_type: String,
    count: i64,
}

#[derive(Debug, Deserialize)]
struct TomlCandidate {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    phone: String,
    #[serde(default)]
    department_id: Option<String>,
    #[serde(default)]
    access_date: Option<String>,
    #[serde(default)]
    test_duration_minutes: Option<u32>,
}

/// Parse a single TOML file into a `Catalog`.
pub fn parse_catalog(path: &Path) -> Result<Catalog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog file: {}", path.display()))?;

    parse_catalog_str(&content, path)
}

/// Parse a TOML string into a `Catalog` (useful for testing).
pub fn parse_catalog_str(content: &str, source_path: &Path) -> Result<Catalog> {
    let parsed: TomlCatalogFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let departments = parsed
        .departments
        .into_iter()
        .map(|d| Department {
            id: d.id.unwrap_or_else(|| format!("dept_{}", Uuid::new_v4())),
            name: d.name,
        })
        .collect();

    let questions = parsed
        .questions
        .into_iter()
        .map(convert_question)
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("invalid question in {}", source_path.display()))?;

    let quota = if parsed.quota.is_empty() {
        None
    } else {
        let entries = parsed
            .quota
            .into_iter()
            .map(|q| {
                let answer_type: AnswerType =
                    q.answer_type.parse().map_err(|e: String| anyhow::anyhow!("{}", e))?;
                Ok((BucketKey::new(Category::from(q.category), answer_type), q.count))
            })
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("invalid quota in {}", source_path.display()))?;
        let config = QuotaConfig::from_counts(entries)
            .with_context(|| format!("invalid quota in {}", source_path.display()))?;
        Some(config)
    };

    let candidates = parsed
        .candidates
        .into_iter()
        .map(convert_candidate)
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("invalid candidate in {}", source_path.display()))?;

    Ok(Catalog {
        departments,
        questions,
        quota,
        candidates,
    })
}

fn convert_question(q: TomlQuestion) -> Result<Question> {
    let answer_type: AnswerType = q
        .answer_type
        .parse()
        .map_err(|e: String| anyhow::anyhow!("question {}: {}", q.id, e))?;

    let difficulty = q
        .difficulty
        .map(|d| {
            d.parse::<Difficulty>()
                .map_err(|e| anyhow::anyhow!("question {}: {}", q.id, e))
        })
        .transpose()?
        .unwrap_or_default();

    if q.points <= 0 {
        anyhow::bail!("question {}: points must be greater than 0, got {}", q.id, q.points);
    }
    let points = u32::try_from(q.points)
        .with_context(|| format!("question {}: points out of range", q.id))?;

    let kind = match answer_type {
        AnswerType::Objective => {
            let Some(correct_answer) = q.correct_answer else {
                anyhow::bail!("question {}: objective questions need correct_answer", q.id);
            };
            AnswerKind::Objective {
                options: q.options,
                correct_answer,
            }
        }
        AnswerType::Subjective => {
            if q.keywords.is_empty() {
                anyhow::bail!("question {}: subjective questions need keywords", q.id);
            }
            AnswerKind::Subjective {
                keywords: q.keywords,
                reference_answer: q.reference_answer,
            }
        }
    };

    Ok(Question {
        id: q.id,
        category: Category::from(q.category),
        difficulty,
        prompt: q.prompt,
        points,
        department_ids: q.department_ids.into_iter().collect::<BTreeSet<_>>(),
        kind,
    })
}

fn convert_candidate(c: TomlCandidate) -> Result<Candidate> {
    let access_date = c
        .access_date
        .map(|d| {
            NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d")
                .with_context(|| format!("candidate {}: bad access_date '{}'", c.name, d))
        })
        .transpose()?;

    Ok(Candidate {
        id: c.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        name: c.name,
        email: c.email,
        phone: c.phone,
        department_id: c.department_id,
        created_at: Utc::now(),
        access_date,
        test_duration_minutes: c.test_duration_minutes.unwrap_or(10),
        assignment: AssignmentState::Unassigned,
    })
}

/// A warning from catalog validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The record id (if applicable).
    pub record_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Validate a catalog for common issues.
pub fn validate_catalog(catalog: &Catalog) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let known_departments: HashSet<&str> =
        catalog.departments.iter().map(|d| d.id.as_str()).collect();

    let mut seen_ids = HashSet::new();
    for question in &catalog.questions {
        if !seen_ids.insert(&question.id) {
            warnings.push(ValidationWarning {
                record_id: Some(question.id.clone()),
                message: format!("duplicate question ID: {}", question.id),
            });
        }
    }

    let mut seen_names: HashMap<&str, &str> = HashMap::new();
    for department in &catalog.departments {
        if let Some(first) = seen_names.insert(department.name.as_str(), department.id.as_str()) {
            warnings.push(ValidationWarning {
                record_id: Some(department.id.clone()),
                message: format!(
                    "duplicate department name '{}' (also used by {first})",
                    department.name
                ),
            });
        }
    }

    for question in &catalog.questions {
        for dept in &question.department_ids {
            if !known_departments.contains(dept.as_str()) {
                warnings.push(ValidationWarning {
                    record_id: Some(question.id.clone()),
                    message: format!("references unknown department: {dept}"),
                });
            }
        }

        if question.prompt.trim().is_empty() {
            warnings.push(ValidationWarning {
                record_id: Some(question.id.clone()),
                message: "prompt is empty".into(),
            });
        }

        if let AnswerKind::Objective {
            options,
            correct_answer,
        } = &question.kind
        {
            if !options.is_empty() && !options.contains(correct_answer) {
                warnings.push(ValidationWarning {
                    record_id: Some(question.id.clone()),
                    message: format!("correct_answer '{correct_answer}' is not one of the options"),
                });
            }
        }
    }

    for candidate in &catalog.candidates {
        if let Some(dept) = &candidate.department_id {
            if !known_departments.contains(dept.as_str()) {
                warnings.push(ValidationWarning {
                    record_id: Some(candidate.id.clone()),
                    message: format!("candidate references unknown department: {dept}"),
                });
            }
        }
    }

    if let Some(quota) = &catalog.quota {
        let buckets = bucket(&catalog.questions, BucketScope::Unscoped);
        for (key, count) in quota.iter() {
            if count > 0 && buckets.get(key).is_empty() {
                warnings.push(ValidationWarning {
                    record_id: None,
                    message: format!("quota for {key} has no matching questions"),
                });
            }
        }
    }

    warnings
}
