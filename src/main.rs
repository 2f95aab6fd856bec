//! # photo-history CLI
//!
//! Command-line interface for the photo history graph.
//!
//! ## Usage
//! ```bash
//! photo-history import catalog.json
//! photo-history scan
//! photo-history show 42 --mode tree --output json
//! ```

mod cli;

use photo_history_graph::Result;

fn main() -> Result<()> {
    cli::run()
}
