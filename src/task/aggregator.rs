// Thread-safe accumulation of listing results
#![forbid(unsafe_code)]
#![deny(missing_docs)]
use crate::common::{
    scaled_size,
    ListingRequest,
    ListingResult,
};
use std::sync::{
    Mutex,
    MutexGuard,
    PoisonError,
};
use super::frontier::Frontier;
use tokio::sync::Notify;
use tracing::{
    debug,
    error,
};

/// Final or partial totals of a traversal.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Totals {
    /// Sum of the sizes of all counted objects, in bytes.
    pub total_bytes: u64,

    /// Number of counted objects.
    pub total_objects: u64,
}

impl Totals {
    /// `total_bytes` scaled by 1024 with three decimal places, e.g.
    /// `45.000 B`.
    pub fn size_readable(&self) -> String {
        scaled_size(self.total_bytes)
    }
}

/// A snapshot of traversal progress, taken between rounds.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Progress {
    /// Rounds dispatched so far.
    pub round: usize,

    /// Requests dispatched in the latest round.
    pub dispatched: usize,

    /// Totals accumulated so far.
    pub totals: Totals,

    /// Prefixes still waiting in the frontier.
    pub pending: usize,

    /// Requests dispatched but not yet merged.
    pub in_flight: usize,
}

#[derive(Debug, Default)]
struct AggregateState {
    totals:    Totals,
    in_flight: usize,
    fatal:     Option<String>,
    frontier:  Frontier,
}

impl AggregateState {
    // Record the first fatal error, later ones add nothing useful.
    fn flag_fatal(&mut self, reason: String) {
        error!("Fatal aggregation error: {}", reason);

        if self.fatal.is_none() {
            self.fatal = Some(reason);
        }
    }

    fn apply(&mut self, result: ListingResult) -> Result<(), String> {
        let bytes = result.object_sizes
            .iter()
            .try_fold(0u64, |acc, size| acc.checked_add(*size))
            .ok_or("object sizes overflowed")?;

        let objects = u64::try_from(result.object_sizes.len())
            .map_err(|e| e.to_string())?;

        let total_bytes = self.totals.total_bytes
            .checked_add(bytes)
            .ok_or("total bytes overflowed")?;

        let total_objects = self.totals.total_objects
            .checked_add(objects)
            .ok_or("total objects overflowed")?;

        if !self.frontier.extend(&result.bucket_name, result.sub_prefixes) {
            return Err(format!(
                "result for untracked bucket '{}'",
                result.bucket_name,
            ));
        }

        self.totals.total_bytes   = total_bytes;
        self.totals.total_objects = total_objects;

        Ok(())
    }
}

/// Accumulates listing results from concurrent workers.
///
/// The frontier lives inside the same lock as the counters, so draining a
/// round and accounting for it as in flight is a single step.
#[derive(Debug, Default)]
pub struct Aggregator {
    state:  Mutex<AggregateState>,
    notify: Notify,
}

impl Aggregator {
    /// Returns an `Aggregator` with an empty frontier and zeroed totals.
    pub fn new() -> Self {
        Self::default()
    }

    // Nothing panics while holding the lock, so a poisoned state is still
    // consistent.
    fn state(&self) -> MutexGuard<'_, AggregateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed the frontier with the root of `bucket`.
    pub fn seed(&self, bucket: &str) {
        debug!("seed: Adding root of '{}' to frontier", bucket);

        self.state().frontier.seed(bucket);
    }

    /// Drain up to `budget` requests from the frontier and mark them as in
    /// flight.
    ///
    /// Returns nothing once a fatal error has been flagged.
    pub fn take_round(&self, budget: usize) -> Vec<ListingRequest> {
        let mut state = self.state();

        if state.fatal.is_some() {
            return Vec::new();
        }

        let requests = state.frontier.drain(budget);
        state.in_flight += requests.len();

        requests
    }

    /// Merge one listing result into the totals and the frontier.
    ///
    /// Never blocks beyond the lock. Bookkeeping faults are flagged as
    /// fatal instead of being returned, the dispatcher picks them up when
    /// the round completes.
    pub fn merge(&self, result: ListingResult) {
        {
            let mut state = self.state();

            if state.in_flight == 0 {
                state.flag_fatal(format!(
                    "merge of '{}' in '{}' with nothing in flight",
                    result.prefix,
                    result.bucket_name,
                ));
            }
            else {
                state.in_flight -= 1;

                if let Err(reason) = state.apply(result) {
                    state.flag_fatal(reason);
                }
            }
        }

        self.notify.notify_one();
    }

    /// Flag a fatal error and wake the dispatcher.
    pub fn flag_fatal(&self, reason: String) {
        self.state().flag_fatal(reason);
        self.notify.notify_one();
    }

    /// Wait until nothing is in flight or a fatal error has been flagged.
    pub async fn wait_round(&self) {
        loop {
            let notified = self.notify.notified();

            {
                let state = self.state();

                if state.in_flight == 0 || state.fatal.is_some() {
                    return;
                }
            }

            notified.await;
        }
    }

    /// The fatal error, if one was flagged.
    pub fn fatal(&self) -> Option<String> {
        self.state().fatal.clone()
    }

    /// Current totals.
    pub fn totals(&self) -> Totals {
        self.state().totals
    }

    /// Current totals scaled for display, read under the lock.
    pub fn size_readable(&self) -> String {
        self.totals().size_readable()
    }

    /// Progress snapshot for `round`, which dispatched `dispatched`
    /// requests.
    pub fn progress(&self, round: usize, dispatched: usize) -> Progress {
        let state = self.state();

        Progress {
            round,
            dispatched,
            totals:    state.totals,
            pending:   state.frontier.len(),
            in_flight: state.in_flight,
        }
    }

    /// Returns `true` when nothing is pending and nothing is in flight.
    pub fn is_complete(&self) -> bool {
        let state = self.state();

        state.frontier.is_empty() && state.in_flight == 0
    }
}
