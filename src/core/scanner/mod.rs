//! # Scanner Module
//!
//! Keeps relations and version tags in step with stored image histories.
//!
//! ## Scanning Stages
//! 1. **Resolve** - Turn the history of every item tagged
//!    `NeedResolvingHistory` into derived-from relations
//! 2. **Tag** - Categorize the history graph of every item tagged
//!    `NeedTaggingHistoryGraph` and set its version tags
//!
//! Removing items queues their surviving relatives for the tagging stage.

mod executor;

pub use executor::{
    CancellationToken, HistoryScanResult, HistoryScanner, HistoryScannerBuilder, HistoryScannerConfig, Resolution,
};
