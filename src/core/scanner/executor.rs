//! History scanner implementation.

use crate::core::history::{HistoryImageTypes, HistoryLoadingMode, ItemHistoryGraph, ItemId, ProcessingMode};
use crate::core::store::{HistoryWriter, InMemoryStore, InternalTag};
use crate::error::{HistoryGraphError, ScanError, StoreError};
use crate::events::{
    null_sender, Event, EventSender, HistoryScanEvent, HistoryScanProgress, HistoryScanSummary, ScanStage,
};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Version tags and the category flag each one mirrors
const VERSION_TAGS: [(InternalTag, HistoryImageTypes); 3] = [
    (InternalTag::OriginalVersion, HistoryImageTypes::ORIGINAL),
    (InternalTag::IntermediateVersion, HistoryImageTypes::INTERMEDIATE),
    (InternalTag::CurrentVersion, HistoryImageTypes::CURRENT),
];

/// Stops a running scan between two items
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// What resolving one item's history produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Derived-from pairs written to the store
    pub relations: usize,
    /// False if the history names images that are not in the store
    pub fully_resolved: bool,
    /// Root image queued for the tagging stage
    pub needs_tagging: Option<ItemId>,
}

/// Result of a history scan
#[derive(Debug, Default)]
pub struct HistoryScanResult {
    /// Items whose history was turned into relations
    pub resolved: Vec<ItemId>,
    /// Items whose history still names unknown images
    pub unresolved: Vec<ItemId>,
    /// Items whose history graph was categorized
    pub tagged: Vec<ItemId>,
    /// Per-item failures (non-fatal)
    pub errors: Vec<ScanError>,
    pub duration_ms: u64,
}

/// Configuration for the history scanner
#[derive(Debug, Clone)]
pub struct HistoryScannerConfig {
    /// Run the resolving stage
    pub resolve_histories: bool,
    /// Run the tagging stage
    pub tag_graphs: bool,
}

impl Default for HistoryScannerConfig {
    fn default() -> Self {
        Self {
            resolve_histories: true,
            tag_graphs: true,
        }
    }
}

/// Builder for the history scanner
pub struct HistoryScannerBuilder {
    config: HistoryScannerConfig,
    store: Option<Arc<dyn HistoryWriter>>,
    cancellation: CancellationToken,
}

impl HistoryScannerBuilder {
    pub fn new() -> Self {
        Self {
            config: HistoryScannerConfig::default(),
            store: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Set the store to scan
    pub fn store(mut self, store: Arc<dyn HistoryWriter>) -> Self {
        self.store = Some(store);
        self
    }

    /// Enable or disable the resolving stage
    pub fn resolve_histories(mut self, enabled: bool) -> Self {
        self.config.resolve_histories = enabled;
        self
    }

    /// Enable or disable the tagging stage
    pub fn tag_graphs(mut self, enabled: bool) -> Self {
        self.config.tag_graphs = enabled;
        self
    }

    /// Share a cancellation token with the caller
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn build(self) -> HistoryScanner {
        HistoryScanner {
            config: self.config,
            store: self.store.unwrap_or_else(|| Arc::new(InMemoryStore::new())),
            cancellation: self.cancellation,
        }
    }
}

impl Default for HistoryScannerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Scans stored histories into relations and version tags
pub struct HistoryScanner {
    config: HistoryScannerConfig,
    store: Arc<dyn HistoryWriter>,
    cancellation: CancellationToken,
}

impl HistoryScanner {
    pub fn builder() -> HistoryScannerBuilder {
        HistoryScannerBuilder::new()
    }

    pub fn config(&self) -> &HistoryScannerConfig {
        &self.config
    }

    /// Run both stages without events
    pub fn run(&self) -> Result<HistoryScanResult, HistoryGraphError> {
        self.run_with_events(&null_sender())
    }

    /// Run both stages with event reporting
    ///
    /// Failures on single items are collected in the result; failing to
    /// list the pending items, or cancellation, aborts the scan.
    pub fn run_with_events(&self, events: &EventSender) -> Result<HistoryScanResult, HistoryGraphError> {
        let start_time = Instant::now();
        let mut result = HistoryScanResult::default();
        let mut needs_tagging = BTreeSet::new();

        if self.config.resolve_histories {
            let ids = self.store.items_with_tag(InternalTag::NeedResolvingHistory)?;
            info!(count = ids.len(), "Resolving image histories");
            self.announce(events, ScanStage::Resolving, ids.len());

            for (n, &id) in ids.iter().enumerate() {
                self.check_cancelled()?;
                self.progress(events, ScanStage::Resolving, n, ids.len(), id);

                match self.resolve(id) {
                    Ok(resolution) => {
                        needs_tagging.extend(resolution.needs_tagging);
                        if resolution.fully_resolved {
                            result.resolved.push(id);
                        } else {
                            result.unresolved.push(id);
                        }
                        events.send(Event::HistoryScan(HistoryScanEvent::Resolved {
                            id,
                            relations: resolution.relations,
                            fully_resolved: resolution.fully_resolved,
                        }));
                    }
                    Err(source) => self.record_error(events, &mut result, ScanError::Resolve { id, source }),
                }
            }
        }

        if self.config.tag_graphs {
            needs_tagging.extend(self.store.items_with_tag(InternalTag::NeedTaggingHistoryGraph)?);
            let ids: Vec<ItemId> = needs_tagging.into_iter().collect();
            info!(count = ids.len(), "Tagging history graphs");
            self.announce(events, ScanStage::Tagging, ids.len());

            let mut done = BTreeSet::new();
            for (n, &id) in ids.iter().enumerate() {
                self.check_cancelled()?;
                self.progress(events, ScanStage::Tagging, n, ids.len(), id);

                // one graph covers every image in it
                if done.contains(&id) {
                    continue;
                }

                match self.tag_graph(id) {
                    Ok(images) => {
                        done.extend(images.iter().copied());
                        result.tagged.push(id);
                        events.send(Event::HistoryScan(HistoryScanEvent::Tagged {
                            id,
                            images: images.len(),
                        }));
                    }
                    Err(source) => self.record_error(events, &mut result, ScanError::Tag { id, source }),
                }
            }
        }

        result.duration_ms = start_time.elapsed().as_millis() as u64;

        events.send(Event::HistoryScan(HistoryScanEvent::Completed {
            summary: HistoryScanSummary {
                resolved: result.resolved.len(),
                unresolved: result.unresolved.len(),
                tagged: result.tagged.len(),
                errors: result.errors.len(),
                duration_ms: result.duration_ms,
            },
        }));

        Ok(result)
    }

    /// Turn the stored history of `id` into relations
    ///
    /// Returns false if the history names images that are not in the store.
    pub fn resolve_image_history(&self, id: ItemId) -> Result<bool, StoreError> {
        self.resolve(id).map(|resolution| resolution.fully_resolved)
    }

    /// Resolve the history of `id`, reporting what was written
    ///
    /// `NeedResolvingHistory` is cleared from every image of the graph even
    /// when parts of the history could not be found; a partial result is
    /// only reported through [`Resolution::fully_resolved`].
    pub fn resolve(&self, id: ItemId) -> Result<Resolution, StoreError> {
        let store = self.store.as_ref();
        let history = store.image_history(id);

        let mut graph = ItemHistoryGraph::new();
        if !history.is_empty() {
            graph.add_scanned_history(&history, id, store);
        }

        if !graph.has_edges() {
            store.remove_tag(&[id], InternalTag::NeedResolvingHistory)?;
            return Ok(Resolution {
                fully_resolved: true,
                ..Default::default()
            });
        }

        let (subjects, objects) = graph.relation_cloud_parallel();
        store.add_image_relations(&subjects, &objects)?;

        let fully_resolved = !graph.has_unresolved_entries();
        let mut resolved_ids = graph.all_image_ids();
        if !resolved_ids.contains(&id) {
            resolved_ids.push(id);
        }
        store.remove_tag(&resolved_ids, InternalTag::NeedResolvingHistory)?;

        let needs_tagging = graph.root_images().first().map(|root| root.id);
        if let Some(root) = needs_tagging {
            store.add_tag(&[root], InternalTag::NeedTaggingHistoryGraph)?;
        }

        if !fully_resolved {
            debug!(id, "History refers to images that are not in the store");
        }

        Ok(Resolution {
            relations: subjects.len(),
            fully_resolved,
            needs_tagging,
        })
    }

    /// Set the version tags of every image in the history graph of `id`
    ///
    /// Returns the ids of the tagged images; unknown items are skipped.
    pub fn tag_item_history_graph(&self, id: ItemId) -> Result<Vec<ItemId>, StoreError> {
        self.tag_graph(id)
    }

    fn tag_graph(&self, id: ItemId) -> Result<Vec<ItemId>, StoreError> {
        let store = self.store.as_ref();

        let Some(info) = store.item_info(id) else {
            debug!(id, "Skipping tagging of unknown item");
            return Ok(Vec::new());
        };

        let graph = ItemHistoryGraph::from_info(&info, store, HistoryLoadingMode::LOAD_ALL, ProcessingMode::NoProcessing);
        let types = graph.categorize();

        for (tag, kind) in VERSION_TAGS {
            let mut with = Vec::new();
            let mut without = Vec::new();
            for (image, types) in &types {
                if types.contains(kind) {
                    with.push(image.id);
                } else {
                    without.push(image.id);
                }
            }

            store.add_tag(&with, tag)?;
            store.remove_tag(&without, tag)?;
        }

        let mut images: Vec<ItemId> = types.keys().map(|image| image.id).collect();
        images.sort_unstable();

        let mut done = images.clone();
        done.push(id);
        store.remove_tag(&done, InternalTag::NeedTaggingHistoryGraph)?;

        Ok(images)
    }

    /// Mark items removed and queue their related images for tagging
    ///
    /// Returns the queued images.
    pub fn remove_items(&self, ids: &[ItemId]) -> Result<Vec<ItemId>, StoreError> {
        let related = self.store.mark_removed(ids)?;
        self.store.add_tag(&related, InternalTag::NeedTaggingHistoryGraph)?;
        info!(removed = ids.len(), queued = related.len(), "Removed items");
        Ok(related)
    }

    fn check_cancelled(&self) -> Result<(), ScanError> {
        if self.cancellation.is_cancelled() {
            warn!("History scan cancelled");
            return Err(ScanError::Cancelled);
        }
        Ok(())
    }

    fn announce(&self, events: &EventSender, stage: ScanStage, total: usize) {
        events.send(Event::HistoryScan(HistoryScanEvent::Started { stage, total }));
    }

    fn progress(&self, events: &EventSender, stage: ScanStage, completed: usize, total: usize, current: ItemId) {
        events.send(Event::HistoryScan(HistoryScanEvent::Progress(HistoryScanProgress {
            stage,
            completed,
            total,
            current,
        })));
    }

    fn record_error(&self, events: &EventSender, result: &mut HistoryScanResult, error: ScanError) {
        warn!(error = %error, "History scan error");
        let id = match &error {
            ScanError::Resolve { id, .. } | ScanError::Tag { id, .. } => *id,
            ScanError::Cancelled => 0,
        };
        events.send(Event::HistoryScan(HistoryScanEvent::Error {
            id,
            message: error.to_string(),
        }));
        result.errors.push(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::history::{FilterAction, HistoryImageId, HistoryImageType, ImageHistory, ItemInfo};
    use crate::core::store::{HistoryStore, ItemResolver};
    use crate::events::EventChannel;

    fn item(name: &str, uuid: &str) -> ItemInfo {
        ItemInfo {
            uuid: Some(uuid.to_string()),
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn derived_from(uuid: &str) -> ImageHistory {
        ImageHistory::new()
            .referring(HistoryImageId::new(HistoryImageType::Original).with_uuid(uuid))
            .then(FilterAction::new("transform:rotate", 1))
    }

    /// original(1) and an edit(2) whose history names the original
    fn edited_store() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store.add_item(item("orig.jpg", "u1"), &ImageHistory::new()).unwrap();
        store.add_item(item("edit.jpg", "u2"), &derived_from("u1")).unwrap();
        store
    }

    fn scanner(store: &Arc<InMemoryStore>) -> HistoryScanner {
        HistoryScanner::builder().store(store.clone()).build()
    }

    #[test]
    fn builder_defaults_run_both_stages() {
        let scanner = HistoryScanner::builder().tag_graphs(false).build();

        assert!(scanner.config().resolve_histories);
        assert!(!scanner.config().tag_graphs);
    }

    #[test]
    fn scan_writes_relations_and_version_tags() {
        let store = edited_store();

        let result = scanner(&store).run().unwrap();

        assert_eq!(result.resolved, vec![2]);
        assert_eq!(result.tagged, vec![1]);
        assert!(result.errors.is_empty());
        assert_eq!(store.relation_cloud(1), vec![(2, 1)]);
        assert_eq!(store.tags(1).unwrap(), vec![InternalTag::OriginalVersion]);
        assert_eq!(store.tags(2).unwrap(), vec![InternalTag::CurrentVersion]);
    }

    #[test]
    fn second_scan_has_nothing_to_do() {
        let store = edited_store();
        let scanner = scanner(&store);
        scanner.run().unwrap();

        let result = scanner.run().unwrap();

        assert!(result.resolved.is_empty());
        assert!(result.tagged.is_empty());
    }

    #[test]
    fn unresolved_history_is_reported_once() {
        let store = Arc::new(InMemoryStore::new());
        store.add_item(item("edit.jpg", "u2"), &derived_from("not-imported")).unwrap();
        let scanner = scanner(&store);

        let first = scanner.run().unwrap();
        let second = scanner.run().unwrap();

        assert_eq!(first.unresolved, vec![1]);
        assert!(store.relation_cloud(1).is_empty());
        assert!(!store.tags(1).unwrap().contains(&InternalTag::NeedResolvingHistory));
        assert!(second.unresolved.is_empty());
        assert!(second.resolved.is_empty());
    }

    #[test]
    fn removal_requeues_survivors_for_tagging() {
        let store = edited_store();
        let scanner = scanner(&store);
        scanner.run().unwrap();

        let queued = scanner.remove_items(&[2]).unwrap();
        assert_eq!(queued, vec![1]);

        let result = scanner.run().unwrap();

        assert_eq!(result.tagged, vec![1]);
        assert!(store.item_info(2).is_none());
        assert_eq!(store.tags(1).unwrap(), vec![InternalTag::CurrentVersion]);
    }

    #[test]
    fn cancelled_scan_stops() {
        let store = edited_store();
        let token = CancellationToken::new();
        let scanner = HistoryScanner::builder()
            .store(store.clone())
            .cancellation(token.clone())
            .build();

        token.cancel();

        assert!(matches!(
            scanner.run(),
            Err(HistoryGraphError::Scan(ScanError::Cancelled))
        ));
    }

    #[test]
    fn scan_reports_progress_events() {
        let store = edited_store();
        let (sender, receiver) = EventChannel::new();

        scanner(&store).run_with_events(&sender).unwrap();
        drop(sender);

        let events: Vec<Event> = receiver.iter().collect();
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::HistoryScan(HistoryScanEvent::Resolved { id: 2, fully_resolved: true, .. }))));
        assert!(matches!(
            events.last(),
            Some(Event::HistoryScan(HistoryScanEvent::Completed { summary })) if summary.tagged == 1
        ));
    }
}
