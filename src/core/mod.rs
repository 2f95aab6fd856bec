//! # Core Module
//!
//! The front-end agnostic history engine.
//!
//! ## Modules
//! - `graph` - Generic directed graph with the algorithms histories need
//! - `history` - Image histories as graphs, and their display model
//! - `store` - Persisted items, relations, histories and tags
//! - `scanner` - Turns stored histories into relations and version tags

pub mod graph;
pub mod history;
pub mod scanner;
pub mod store;

// Re-export commonly used types
pub use graph::{Graph, Vertex};
pub use history::{ImageHistory, ItemHistoryGraph, ItemInfo};
pub use store::{HistoryStore, ItemResolver};
