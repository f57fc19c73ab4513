//! Quota-bounded sampling without replacement.

use rand::seq::SliceRandom;
use rand::Rng;

/// Draw `min(bucket.len(), quota)` distinct elements uniformly at random.
///
/// A quota larger than the bucket returns the whole bucket (in random order);
/// under-fill is not an error.
pub fn sample<T: Clone, R: Rng + ?Sized>(bucket: &[T], quota: u32, rng: &mut R) -> Vec<T> {
    let amount = bucket.len().min(quota as usize);
    if amount == 0 {
        return Vec::new();
    }
    bucket.choose_multiple(rng, amount).cloned().collect()
}
