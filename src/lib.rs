//! # Photo History Graph
//!
//! Follows the versions of an image through its edit history.
//!
//! ## Core Philosophy
//! - **Histories degrade, they do not fail** - missing or contradictory
//!   information yields a smaller graph, never an error
//! - **Identity over location** - images are matched by uuid, content
//!   hash, name and date, or path, in that order
//! - **Graphs are values** - copies share storage until one is modified
//!
//! ## Architecture
//! - `core` - The graph engine, history graph, stores and scanner
//! - `events` - Event-driven progress reporting
//! - `error` - Error types
//! - `cli` - Command-line interface

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{HistoryGraphError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point. Calling it again
/// keeps the subscriber that is already installed.
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
