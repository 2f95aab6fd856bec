//! # Store Module
//!
//! Persisted items, their relations, histories and internal tags.
//!
//! The history graph reads through [`ItemResolver`] and [`HistoryStore`];
//! scanning and import write through [`HistoryWriter`].
//!
//! ## Backends
//! - `SqliteStore` - Persistent storage using SQLite
//! - `InMemoryStore` - For testing and fixtures

mod catalog;
mod memory;
mod proximity;
mod sqlite;
mod traits;

pub use catalog::{Catalog, CatalogEntry};
pub use memory::InMemoryStore;
pub use proximity::sort_by_proximity;
pub use sqlite::SqliteStore;
pub use traits::{HistoryStore, HistoryWriter, ItemResolver};

pub(crate) use traits::resolve_among;

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Tags the application keeps on items for history bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InternalTag {
    /// The item's history has not been turned into relations yet
    NeedResolvingHistory,
    /// The item's history graph needs to be categorized again
    NeedTaggingHistoryGraph,
    OriginalVersion,
    CurrentVersion,
    IntermediateVersion,
}

impl InternalTag {
    pub const ALL: [InternalTag; 5] = [
        Self::NeedResolvingHistory,
        Self::NeedTaggingHistoryGraph,
        Self::OriginalVersion,
        Self::CurrentVersion,
        Self::IntermediateVersion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NeedResolvingHistory => "need_resolving_history",
            Self::NeedTaggingHistoryGraph => "need_tagging_history_graph",
            Self::OriginalVersion => "original_version",
            Self::CurrentVersion => "current_version",
            Self::IntermediateVersion => "intermediate_version",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::NeedResolvingHistory => "Need Resolving History",
            Self::NeedTaggingHistoryGraph => "Need Tagging History Graph",
            Self::OriginalVersion => "Original Version",
            Self::CurrentVersion => "Current Version",
            Self::IntermediateVersion => "Intermediate Version",
        }
    }
}

impl FromStr for InternalTag {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| StoreError::UnknownTag(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_through_their_names() {
        for tag in InternalTag::ALL {
            assert_eq!(tag.as_str().parse::<InternalTag>().ok(), Some(tag));
        }
        assert!(matches!(
            "favourite".parse::<InternalTag>(),
            Err(StoreError::UnknownTag(name)) if name == "favourite"
        ));
    }

    #[test]
    fn tag_serializes_as_snake_case() {
        let json = serde_json::to_string(&InternalTag::NeedTaggingHistoryGraph).unwrap();
        assert_eq!(json, "\"need_tagging_history_graph\"");
    }
}
