//! Question bucketing by department scope and `(category, answer_type)`.

use std::collections::BTreeMap;

use crate::model::{BucketKey, Question};

/// Which questions are eligible for bucketing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketScope<'a> {
    /// Only questions offered to this department.
    Department(&'a str),
    /// Every question in the catalog, department or not.
    Unscoped,
}

impl BucketScope<'_> {
    fn admits(&self, question: &Question) -> bool {
        match self {
            BucketScope::Department(id) => question.in_department(id),
            BucketScope::Unscoped => true,
        }
    }
}

/// Questions grouped by bucket key, borrowing from the catalog.
#[derive(Debug, Clone, Default)]
pub struct Buckets<'q> {
    groups: BTreeMap<BucketKey, Vec<&'q Question>>,
}

impl<'q> Buckets<'q> {
    /// Questions in the bucket for `key`; empty if the key is unknown.
    pub fn get(&self, key: &BucketKey) -> &[&'q Question] {
        self.groups.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BucketKey, &[&'q Question])> {
        self.groups.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &BucketKey> {
        self.groups.keys()
    }

    /// Total number of questions across all buckets.
    pub fn question_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

/// Partition `questions` into buckets.
///
/// Every key seen anywhere in `questions` is present in the result, even when
/// the scope filters out all of its members.
pub fn bucket<'q>(questions: &'q [Question], scope: BucketScope<'_>) -> Buckets<'q> {
    let mut groups: BTreeMap<BucketKey, Vec<&'q Question>> = BTreeMap::new();
    for question in questions {
        let members = groups.entry(question.bucket_key()).or_default();
        if scope.admits(question) {
            members.push(question);
        }
    }
    Buckets { groups }
}
