//! Event type definitions for progress reporting.

use crate::core::history::ItemId;
use serde::{Deserialize, Serialize};

/// All events emitted by the history tooling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// History scanning events
    HistoryScan(HistoryScanEvent),
}

/// The two stages of a history scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStage {
    /// Turning stored histories into relations
    Resolving,
    /// Categorizing history graphs into version tags
    Tagging,
}

/// Events during a history scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HistoryScanEvent {
    /// A stage has started
    Started { stage: ScanStage, total: usize },
    /// Progress update within a stage
    Progress(HistoryScanProgress),
    /// The history of an item was turned into relations
    Resolved {
        id: ItemId,
        relations: usize,
        fully_resolved: bool,
    },
    /// The history graph around an item was categorized
    Tagged { id: ItemId, images: usize },
    /// An error occurred but scanning continues
    Error { id: ItemId, message: String },
    /// Scanning completed
    Completed { summary: HistoryScanSummary },
}

/// Progress information within a stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryScanProgress {
    pub stage: ScanStage,
    /// Number of items handled so far
    pub completed: usize,
    /// Number of items in this stage
    pub total: usize,
    /// Item being handled
    pub current: ItemId,
}

/// Summary of a finished history scan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryScanSummary {
    /// Items whose history was resolved
    pub resolved: usize,
    /// Items whose history still names unknown images
    pub unresolved: usize,
    /// History graphs that were categorized
    pub tagged: usize,
    /// Items that failed
    pub errors: usize,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_their_stage() {
        let event = Event::HistoryScan(HistoryScanEvent::Started {
            stage: ScanStage::Tagging,
            total: 3,
        });

        let json = serde_json::to_string(&event).unwrap();

        assert!(json.contains("\"tagging\""));
        assert!(json.contains("\"total\":3"));
    }
}
