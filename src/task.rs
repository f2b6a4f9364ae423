// Imports all of the components needed for the size task
#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// `Aggregator` accumulates listing results and owns the frontier.
mod aggregator;

/// `RoundDispatcher` runs listings in bounded rounds.
mod dispatcher;

/// `Frontier` holds the prefixes still to be listed.
mod frontier;

/// `SizeTask` seeds and drives a traversal.
mod size_task;

#[cfg(test)]
mod fixture;

pub use aggregator::{
    Progress,
    Totals,
};
pub use size_task::*;
