// Per-bucket stacks of prefixes still to be listed
#![forbid(unsafe_code)]
#![deny(missing_docs)]
use crate::common::{
    ListingRequest,
    Prefix,
};
use std::collections::BTreeMap;

/// The traversal work list.
///
/// Each bucket owns a stack of unexplored prefixes. Buckets are visited in
/// name order when draining, and each stack is popped from the top so the
/// most recently discovered prefixes are listed first.
#[derive(Debug, Default)]
pub struct Frontier {
    pending: BTreeMap<String, Vec<Prefix>>,
}

impl Frontier {
    /// Returns an empty `Frontier`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `bucket` with a single `Prefix::Root` entry.
    ///
    /// Seeding a bucket twice leaves it with a single root entry.
    pub fn seed(&mut self, bucket: &str) {
        self.pending.insert(bucket.to_string(), vec![Prefix::Root]);
    }

    /// Push newly discovered `prefixes` onto `bucket`'s stack.
    ///
    /// Returns `false`, leaving the frontier untouched, if `bucket` was never
    /// seeded.
    pub fn extend(&mut self, bucket: &str, prefixes: Vec<Prefix>) -> bool {
        match self.pending.get_mut(bucket) {
            Some(stack) => {
                stack.extend(prefixes);
                true
            },
            None => false,
        }
    }

    /// Pop up to `budget` requests, bucket by bucket.
    ///
    /// Every returned prefix has already been removed from its stack.
    pub fn drain(&mut self, budget: usize) -> Vec<ListingRequest> {
        let mut requests = Vec::with_capacity(budget.min(self.len()));

        for (bucket, stack) in self.pending.iter_mut() {
            while requests.len() < budget {
                let prefix = match stack.pop() {
                    Some(prefix) => prefix,
                    None         => break,
                };

                requests.push(ListingRequest {
                    bucket_name: bucket.clone(),
                    prefix,
                });
            }

            if requests.len() == budget {
                break;
            }
        }

        requests
    }

    /// Total number of prefixes waiting to be listed across all buckets.
    pub fn len(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    /// Returns `true` when no bucket has pending prefixes.
    pub fn is_empty(&self) -> bool {
        self.pending.values().all(Vec::is_empty)
    }
}
