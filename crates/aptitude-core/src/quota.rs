//! Per-bucket question quotas.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::model::{AnswerType, BucketKey, Category};

/// How many questions to draw from each `(category, answer_type)` bucket.
///
/// Iteration follows `BucketKey` ordering (known categories first, then
/// custom ones by name; objective before subjective), so a fixed table
/// always yields the same sequence of buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<QuotaEntry>", into = "Vec<QuotaEntry>")]
pub struct QuotaConfig {
    counts: BTreeMap<BucketKey, u32>,
}

/// One row of a quota table as it appears on the wire.
///
/// `count` is signed so that negative values reach validation instead of
/// failing as a type error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaEntry {
    pub category: Category,
    pub answer_type: AnswerType,
    pub count: i64,
}

impl QuotaConfig {
    /// Build a quota table, rejecting negative counts.
    ///
    /// A key listed more than once keeps its last count.
    pub fn from_counts<I>(counts: I) -> EngineResult<Self>
    where
        I: IntoIterator<Item = (BucketKey, i64)>,
    {
        let mut table = BTreeMap::new();
        for (key, count) in counts {
            if count < 0 {
                return Err(EngineError::InvalidConfig(format!(
                    "quota for {key} must be 0 or more, got {count}"
                )));
            }
            let count = u32::try_from(count).map_err(|_| {
                EngineError::InvalidConfig(format!("quota for {key} is too large: {count}"))
            })?;
            table.insert(key, count);
        }
        Ok(Self { counts: table })
    }

    /// The configured count for `key`; unlisted keys have a quota of 0.
    pub fn count(&self, key: &BucketKey) -> u32 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BucketKey, u32)> {
        self.counts.iter().map(|(k, &v)| (k, v))
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all quotas, the upper bound on an assignment's length.
    pub fn total(&self) -> u64 {
        self.counts.values().map(|&c| u64::from(c)).sum()
    }
}

impl TryFrom<Vec<QuotaEntry>> for QuotaConfig {
    type Error = EngineError;

    fn try_from(entries: Vec<QuotaEntry>) -> Result<Self, Self::Error> {
        Self::from_counts(
            entries
                .into_iter()
                .map(|e| (BucketKey::new(e.category, e.answer_type), e.count)),
        )
    }
}

impl From<QuotaConfig> for Vec<QuotaEntry> {
    fn from(config: QuotaConfig) -> Self {
        config
            .counts
            .into_iter()
            .map(|(key, count)| QuotaEntry {
                category: key.category,
                answer_type: key.answer_type,
                count: i64::from(count),
            })
            .collect()
    }
}

/// Parse a `category:type=count` spec such as `java:objective=3`.
pub fn parse_quota_spec(spec: &str) -> EngineResult<(BucketKey, i64)> {
    let invalid =
        || EngineError::InvalidConfig(format!("expected category:type=count, got '{spec}'"));

    let (key, count) = spec.split_once('=').ok_or_else(invalid)?;
    let (category, answer_type) = key.split_once(':').ok_or_else(invalid)?;
    let answer_type: AnswerType = answer_type.parse().map_err(EngineError::InvalidConfig)?;
    let count: i64 = count.trim().parse().map_err(|_| invalid())?;
    let category: Category = category.into();

    Ok((BucketKey::new(category, answer_type), count))
}
