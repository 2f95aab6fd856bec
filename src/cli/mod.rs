//! # CLI Module
//!
//! Command-line interface for the photo history graph.
//!
//! ## Usage
//! ```bash
//! # Load items and their histories
//! photo-history import catalog.json
//!
//! # Turn histories into relations and version tags
//! photo-history scan
//!
//! # Show the history of one image
//! photo-history show 42 --mode tree
//!
//! # JSON output
//! photo-history show 42 --output json
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use photo_history_graph::core::history::{
    HistoryImageTypes, HistoryLoadingMode, HistoryTreeMode, HistoryTreeModel, ItemHistoryGraph, ItemId, ItemInfo,
    ProcessingMode,
};
use photo_history_graph::core::scanner::{HistoryScanResult, HistoryScanner};
use photo_history_graph::core::store::{Catalog, HistoryWriter, InternalTag, ItemResolver, SqliteStore};
use photo_history_graph::error::{HistoryGraphError, Result, StoreError};
use photo_history_graph::events::{Event, EventChannel, HistoryScanEvent, ScanStage};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

/// Photo History Graph - Follow every version of an image
#[derive(Parser, Debug)]
#[command(name = "photo-history")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// History database path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import items and histories from a JSON catalog
    Import {
        /// Catalog file
        catalog: PathBuf,
    },

    /// Resolve stored histories into relations and version tags
    Scan {
        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// Show the history graph of an image
    Show {
        /// Item id
        id: ItemId,

        /// Tree layout
        #[arg(short, long, default_value = "combined")]
        mode: Mode,

        /// Show the graph as loaded, without display preparation
        #[arg(long)]
        raw: bool,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// Mark images removed and queue their relatives for tagging
    Remove {
        /// Item ids
        #[arg(required = true)]
        ids: Vec<ItemId>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Every image, oldest first
    List,
    /// Images nested by derivation
    Tree,
    /// History of the image with actions (default)
    Combined,
}

impl From<Mode> for HistoryTreeMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::List => HistoryTreeMode::ImagesList,
            Mode::Tree => HistoryTreeMode::ImagesTree,
            Mode::Combined => HistoryTreeMode::CombinedTree,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Run the CLI
pub fn run() -> Result<()> {
    photo_history_graph::init_tracing();
    let cli = Cli::parse();

    let db_path = cli.db.unwrap_or_else(default_db_path);
    let store = Arc::new(SqliteStore::open(&db_path)?);

    match cli.command {
        Commands::Import { catalog } => run_import(&store, catalog),
        Commands::Scan { output } => run_scan(store, output),
        Commands::Show { id, mode, raw, output } => run_show(&store, id, mode.into(), raw, output),
        Commands::Remove { ids } => run_remove(store, &ids),
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("photo-history-graph")
        .join("history.db")
}

fn run_import(store: &SqliteStore, catalog_path: PathBuf) -> Result<()> {
    let term = Term::stderr();
    let catalog = Catalog::load(&catalog_path)?;
    let ids = catalog.import(store)?;
    let with_history = catalog.items.iter().filter(|entry| !entry.history.is_empty()).count();

    term.write_line(&format!(
        "{} Imported {} items ({} with history) into {}",
        style("✓").green().bold(),
        style(ids.len()).cyan(),
        style(with_history).cyan(),
        style(store.db_path().display()).dim()
    ))
    .ok();

    Ok(())
}

fn run_scan(store: Arc<SqliteStore>, output: OutputFormat) -> Result<()> {
    let scanner = HistoryScanner::builder().store(store).build();
    let (sender, receiver) = EventChannel::new();

    // Progress bar for pretty output
    let progress = if matches!(output, OutputFormat::Pretty) {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .map_err(|e| HistoryGraphError::Config(e.to_string()))?
                .progress_chars("█▓░"),
        );
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(pb) = progress_clone.as_ref() else {
                continue;
            };

            match event {
                Event::HistoryScan(HistoryScanEvent::Started { stage, total }) => {
                    pb.set_length(total as u64);
                    pb.set_position(0);
                    pb.set_message(match stage {
                        ScanStage::Resolving => "resolving histories",
                        ScanStage::Tagging => "tagging history graphs",
                    });
                }
                Event::HistoryScan(HistoryScanEvent::Progress(p)) => {
                    pb.set_position(p.completed as u64 + 1);
                }
                Event::HistoryScan(HistoryScanEvent::Completed { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    let result = scanner.run_with_events(&sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let result = result?;
    match output {
        OutputFormat::Pretty => print_pretty_scan(&Term::stderr(), &result),
        OutputFormat::Json => print_json_scan(&result)?,
    }

    Ok(())
}

fn print_pretty_scan(term: &Term, result: &HistoryScanResult) {
    term.write_line(&format!("{} History Scan Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} histories resolved in {:.1}s",
        style(result.resolved.len()).cyan(),
        result.duration_ms as f64 / 1000.0
    ))
    .ok();

    if !result.unresolved.is_empty() {
        term.write_line(&format!(
            "  {} histories refer to images that are not imported yet",
            style(result.unresolved.len()).yellow()
        ))
        .ok();
    }

    term.write_line(&format!(
        "  {} history graphs tagged",
        style(result.tagged.len()).cyan()
    ))
    .ok();

    for error in &result.errors {
        term.write_line(&format!("  {} {}", style("✗").red(), error)).ok();
    }
}

fn print_json_scan(result: &HistoryScanResult) -> Result<()> {
    let output = serde_json::json!({
        "resolved": result.resolved,
        "unresolved": result.unresolved,
        "tagged": result.tagged,
        "errors": result.errors.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
        "duration_ms": result.duration_ms,
    });

    println!("{}", to_pretty_json(&output)?);
    Ok(())
}

fn run_show(store: &SqliteStore, id: ItemId, mode: HistoryTreeMode, raw: bool, output: OutputFormat) -> Result<()> {
    let info = store.item_info(id).ok_or(StoreError::UnknownItem { id })?;

    let processing = if raw {
        ProcessingMode::NoProcessing
    } else {
        ProcessingMode::PrepareForDisplay
    };
    let graph = ItemHistoryGraph::from_info(&info, store, HistoryLoadingMode::LOAD_ALL, processing);

    let mut model = HistoryTreeModel::new(mode);
    model.set_history(&info, graph.clone(), store);

    let mut categories: Vec<(ItemInfo, HistoryImageTypes)> = graph.categorize().into_iter().collect();
    categories.sort_by_key(|(image, _)| image.id);

    match output {
        OutputFormat::Pretty => print_pretty_show(store, &info, &graph, &categories, &model),
        OutputFormat::Json => {
            let output = serde_json::json!({
                "item": info,
                "vertices": graph.data().vertex_count(),
                "edges": graph.data().edge_count(),
                "relation_cloud": graph.relation_cloud(),
                "categories": categories
                    .iter()
                    .map(|(image, types)| serde_json::json!({ "id": image.id, "types": types.to_string() }))
                    .collect::<Vec<_>>(),
                "tree": model.to_json(),
            });
            println!("{}", to_pretty_json(&output)?);
        }
    }

    Ok(())
}

fn print_pretty_show(
    store: &SqliteStore,
    info: &ItemInfo,
    graph: &ItemHistoryGraph,
    categories: &[(ItemInfo, HistoryImageTypes)],
    model: &HistoryTreeModel,
) {
    let term = Term::stdout();

    term.write_line(&format!(
        "{} {}",
        style(&info.name).bold().cyan(),
        style(format!("#{}", info.id)).dim()
    ))
    .ok();
    term.write_line("").ok();

    term.write_line(&format!("{}", style("Graph:").bold().underlined())).ok();
    for line in graph.to_string().lines() {
        term.write_line(&format!("  {line}")).ok();
    }
    term.write_line("").ok();

    let cloud = graph.relation_cloud();
    if !cloud.is_empty() {
        term.write_line(&format!("{}", style("Derived from:").bold().underlined())).ok();
        for (derived, ancestor) in cloud {
            term.write_line(&format!("  {derived} {} {ancestor}", style("->").dim())).ok();
        }
        term.write_line("").ok();
    }

    term.write_line(&format!("{}", style("Categories:").bold().underlined())).ok();
    for (image, types) in categories {
        let tags = store
            .tags(image.id)
            .map(|tags| tags.iter().map(InternalTag::display_name).collect::<Vec<_>>().join(", "))
            .unwrap_or_default();
        term.write_line(&format!(
            "  #{} {} {} {}",
            image.id,
            image.name,
            style(types).yellow(),
            style(tags).dim()
        ))
        .ok();
    }
    term.write_line("").ok();

    term.write_line(&format!("{}", style("History:").bold().underlined())).ok();
    for line in model.render().lines() {
        term.write_line(&format!("  {line}")).ok();
    }
}

fn run_remove(store: Arc<SqliteStore>, ids: &[ItemId]) -> Result<()> {
    let term = Term::stderr();
    let scanner = HistoryScanner::builder().store(store).build();
    let queued = scanner.remove_items(ids)?;

    term.write_line(&format!(
        "{} Removed {} items, {} related images queued for tagging",
        style("✓").green().bold(),
        style(ids.len()).cyan(),
        style(queued.len()).cyan()
    ))
    .ok();
    term.write_line(&format!("{}", style("Run `photo-history scan` to update version tags.").dim()))
        .ok();

    Ok(())
}

fn to_pretty_json(value: &serde_json::Value) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| StoreError::from(e).into())
}
