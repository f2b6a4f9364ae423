// Round based, bounded concurrency dispatch of listing requests
#![forbid(unsafe_code)]
#![deny(missing_docs)]
use crate::common::StorageBackend;
use std::sync::Arc;
use super::aggregator::{
    Aggregator,
    Progress,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{
    debug,
    info,
};

/// States of the `RoundDispatcher`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DispatchState {
    /// Not started yet.
    Idle,

    /// Draining the frontier and launching listings.
    Dispatching,

    /// Waiting for the current round's listings to be merged.
    AwaitingRound,

    /// Frontier empty and nothing in flight.
    Draining,

    /// Traversal finished.
    Done,

    /// A fatal error stopped the traversal.
    Failed,
}

/// Drives the traversal in rounds of at most `max_concurrency` listings.
pub struct RoundDispatcher {
    aggregator:      Arc<Aggregator>,
    backend:         Arc<dyn StorageBackend>,
    max_concurrency: usize,
    permits:         Arc<Semaphore>,
    rounds:          usize,
    state:           DispatchState,
}

impl RoundDispatcher {
    /// Return a new `RoundDispatcher`.
    ///
    /// `max_concurrency` is expected to already be clamped, it is raised to
    /// 1 if zero is given.
    pub fn new(
        backend:         Arc<dyn StorageBackend>,
        aggregator:      Arc<Aggregator>,
        max_concurrency: usize,
    ) -> Self {
        let max_concurrency = max_concurrency.max(1);

        Self {
            aggregator,
            backend,
            max_concurrency,
            permits: Arc::new(Semaphore::new(max_concurrency)),
            rounds:  0,
            state:   DispatchState::Idle,
        }
    }

    /// Current state.
    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Rounds that dispatched at least one listing.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Run rounds until the frontier is exhausted or a fatal error is
    /// flagged, calling `on_round` with a progress snapshot after each one.
    ///
    /// Returns the terminal state, either `Done` or `Failed`.
    pub async fn run<F>(&mut self, mut on_round: F) -> DispatchState
    where
        F: FnMut(&Progress),
    {
        loop {
            self.state = DispatchState::Dispatching;

            let requests = self.aggregator.take_round(self.max_concurrency);

            if requests.is_empty() {
                if self.aggregator.fatal().is_some() {
                    self.state = DispatchState::Failed;
                    break;
                }

                self.state = DispatchState::Draining;
                debug!("run: Frontier exhausted after {} rounds", self.rounds);

                if !self.aggregator.is_complete() {
                    self.aggregator.flag_fatal(
                        "frontier exhausted with listings still in flight".into(),
                    );

                    self.state = DispatchState::Failed;
                    break;
                }

                self.state = DispatchState::Done;
                break;
            }

            self.rounds += 1;
            let dispatched = requests.len();

            info!(
                round = self.rounds,
                dispatched,
                max = self.max_concurrency,
                "Dispatching round",
            );

            let mut workers = JoinSet::new();

            for request in requests {
                let aggregator = Arc::clone(&self.aggregator);
                let backend    = Arc::clone(&self.backend);
                let permits    = Arc::clone(&self.permits);

                workers.spawn(async move {
                    let _permit = match permits.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(e)     => {
                            aggregator.flag_fatal(
                                format!("listing permits unavailable: {}", e),
                            );

                            return;
                        },
                    };

                    let result = backend.list_one_level(request).await;
                    aggregator.merge(result);
                });
            }

            self.state = DispatchState::AwaitingRound;
            self.await_round(&mut workers).await;

            if self.aggregator.fatal().is_some() {
                self.state = DispatchState::Failed;
                break;
            }

            let progress = self.aggregator.progress(self.rounds, dispatched);
            on_round(&progress);
        }

        self.state
    }

    // Wait for the round to be merged, then join every worker so none
    // outlive the round. A worker that dies before merging its result
    // leaves the in-flight count unbalanced, so it's flagged as fatal.
    async fn await_round(&self, workers: &mut JoinSet<()>) {
        let round_merged = self.aggregator.wait_round();
        tokio::pin!(round_merged);

        loop {
            tokio::select! {
                _ = &mut round_merged => break,
                Some(joined) = workers.join_next() => {
                    if let Err(e) = joined {
                        self.aggregator.flag_fatal(
                            format!("listing worker failed: {}", e),
                        );
                    }
                },
            }
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                self.aggregator.flag_fatal(
                    format!("listing worker failed: {}", e),
                );
            }
        }
    }
}
