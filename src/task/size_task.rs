// SizeTask: seeds the frontier and drives the dispatcher to completion
#![forbid(unsafe_code)]
#![deny(missing_docs)]
use crate::common::{
    HumanSize,
    SizeUnit,
    StorageBackend,
    TaskError,
};
use std::sync::Arc;
use super::aggregator::{
    Aggregator,
    Progress,
    Totals,
};
use super::dispatcher::{
    DispatchState,
    RoundDispatcher,
};
use tracing::{
    debug,
    info,
};

/// How a `SizeTask` ended.
#[derive(Debug, Eq, PartialEq)]
pub enum TaskOutcome {
    /// Every discovered prefix was listed.
    Complete(Totals),

    /// The targeted bucket doesn't exist, nothing was listed.
    BucketNotFound {
        /// Name of the missing bucket.
        bucket: String,
    },

    /// Aggregation hit a fatal error. `partial` is whatever had been counted
    /// by then and shouldn't be relied upon.
    Failed {
        /// Description of the fatal error.
        reason: String,

        /// Totals accumulated before the error.
        partial: Totals,
    },
}

/// Options for a `SizeTask`.
#[derive(Debug, Default)]
pub struct TaskOptions {
    /// Size only this bucket, rather than every visible bucket.
    pub bucket_name: Option<String>,

    /// Maximum listings in flight at once.
    pub max_concurrency: usize,

    /// Suppress per-round progress output.
    pub quiet: bool,

    /// Unit used for the per-round size output.
    pub size_unit: SizeUnit,
}

/// Computes the total size and object count of one or all buckets.
///
/// A `SizeTask` can only be started once, a fresh one is needed per run.
pub struct SizeTask {
    aggregator: Arc<Aggregator>,
    backend:    Arc<dyn StorageBackend>,
    options:    TaskOptions,
    started:    bool,
}

impl SizeTask {
    /// Return a new `SizeTask` over `backend`.
    pub fn new(backend: Arc<dyn StorageBackend>, options: TaskOptions) -> Self {
        Self {
            aggregator: Arc::new(Aggregator::new()),
            backend,
            options,
            started: false,
        }
    }

    /// Totals accumulated so far.
    pub fn totals(&self) -> Totals {
        self.aggregator.totals()
    }

    /// Bytes accumulated so far, scaled for display.
    pub fn size_readable(&self) -> String {
        self.aggregator.size_readable()
    }

    /// Run the task to completion.
    ///
    /// Fails with `TaskError::AlreadyStarted` if called more than once, and
    /// with `TaskError::Backend` if the buckets couldn't be enumerated or
    /// checked.
    pub async fn start(&mut self) -> Result<TaskOutcome, TaskError> {
        if self.started {
            return Err(TaskError::AlreadyStarted);
        }

        self.started = true;

        if let Some(outcome) = self.seed().await? {
            return Ok(outcome);
        }

        let mut dispatcher = RoundDispatcher::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.aggregator),
            self.options.max_concurrency,
        );

        let quiet           = self.options.quiet;
        let max_concurrency = self.options.max_concurrency;
        let size_unit       = &self.options.size_unit;

        let state = dispatcher.run(|progress| {
            if !quiet {
                print_progress(progress, max_concurrency, size_unit);
            }
        }).await;

        let totals = self.aggregator.totals();

        let outcome = match state {
            DispatchState::Failed => TaskOutcome::Failed {
                reason:  self.aggregator.fatal().unwrap_or_default(),
                partial: totals,
            },
            _ => TaskOutcome::Complete(totals),
        };

        info!(
            state = ?dispatcher.state(),
            rounds = dispatcher.rounds(),
            objects = totals.total_objects,
            bytes = totals.total_bytes,
            "Size task finished",
        );

        Ok(outcome)
    }

    // Seed the frontier with the targeted bucket, or every bucket we can
    // see. Returns an outcome if there's nothing to traverse.
    async fn seed(&self) -> Result<Option<TaskOutcome>, TaskError> {
        match &self.options.bucket_name {
            Some(bucket) => {
                debug!("seed: Checking '{}' exists", bucket);

                if !self.backend.bucket_exists(bucket).await? {
                    info!("Bucket '{}' does not exist", bucket);

                    return Ok(Some(TaskOutcome::BucketNotFound {
                        bucket: bucket.clone(),
                    }));
                }

                self.aggregator.seed(bucket);
            },
            None => {
                let buckets = self.backend.buckets().await?;

                debug!("seed: Sizing {} buckets", buckets.len());

                for bucket in &buckets {
                    self.aggregator.seed(bucket);
                }
            },
        }

        Ok(None)
    }
}

// Per-round progress, printed between rounds.
fn print_progress(progress: &Progress, max_concurrency: usize, size_unit: &SizeUnit) {
    let totals = progress.totals;

    println!(
        "requests in round: {}/{}, prefixes pending: {}",
        progress.dispatched,
        max_concurrency,
        progress.pending,
    );
    println!("objects read so far: {}", totals.total_objects);
    println!("size so far: {}", totals.total_bytes.humansize(size_unit));
    println!("--");
}
