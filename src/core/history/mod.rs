//! # History Module
//!
//! The version history of images as a directed graph.
//!
//! ## Features
//! - Value types for histories, history ids and filter actions
//! - Identity-aware graph construction from history sequences and relations
//! - Display preparation: reduction, dropping unresolved steps, proximity sorting
//! - Categorization into original, intermediate, current and source images
//! - A tree model that lays the graph out for display

mod data;
mod graph;
mod model;
mod properties;
mod types;

pub use data::{HistoryGraph, ItemHistoryGraphData};
pub use graph::{HistoryLoadingMode, ItemHistoryGraph, ProcessingMode};
pub use model::{HistoryTreeItem, HistoryTreeMode, HistoryTreeModel, NodeId};
pub use properties::{same_referred_image, HistoryEdgeProperties, HistoryVertexProperties};
pub use types::{
    FilterAction, FilterActionFlags, FilterCategory, HistoryEntry, HistoryImageId, HistoryImageType,
    HistoryImageTypes, ImageHistory, ItemId, ItemInfo,
};
