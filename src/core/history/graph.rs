//! The item history graph: all known versions of an image and how they
//! derive from each other.

use super::data::ItemHistoryGraphData;
use super::types::{HistoryImageId, HistoryImageTypes, ImageHistory, ItemId, ItemInfo};
use crate::core::graph::AdjacencyFlags;
use crate::core::store::{HistoryStore, ItemResolver};
use std::collections::HashMap;
use std::fmt;
use std::ops::BitOr;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// Which sources [`ItemHistoryGraph::from_info`] reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryLoadingMode(u8);

impl HistoryLoadingMode {
    /// The stored derived-from relations of the subject's component
    pub const LOAD_RELATION_CLOUD: Self = Self(1);
    /// The subject's own history sequence
    pub const LOAD_SUBJECT_HISTORY: Self = Self(1 << 1);
    /// The history sequences of all current versions found so far
    pub const LOAD_LEAVES_HISTORY: Self = Self(1 << 2);
    pub const LOAD_ALL: Self = Self(0b111);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for HistoryLoadingMode {
    fn default() -> Self {
        Self::LOAD_ALL
    }
}

impl BitOr for HistoryLoadingMode {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// What [`ItemHistoryGraph::from_info`] does after loading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Keep the graph as loaded
    NoProcessing,
    /// Reduce edges, drop unresolved vertices, sort items for the subject
    #[default]
    PrepareForDisplay,
}

/// History graph with cheap copies
///
/// Copies share their data until one of them is modified. Default graphs
/// all share one empty instance and report [`is_null`](Self::is_null).
///
/// Nothing here fails: malformed relations and histories are logged and
/// leave a smaller or less reduced graph.
#[derive(Clone)]
pub struct ItemHistoryGraph {
    d: Arc<ItemHistoryGraphData>,
}

fn shared_null() -> &'static Arc<ItemHistoryGraphData> {
    static NULL: OnceLock<Arc<ItemHistoryGraphData>> = OnceLock::new();
    NULL.get_or_init(|| Arc::new(ItemHistoryGraphData::new()))
}

impl Default for ItemHistoryGraph {
    fn default() -> Self {
        Self {
            d: Arc::clone(shared_null()),
        }
    }
}

impl ItemHistoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while this graph still shares the default empty instance
    pub fn is_null(&self) -> bool {
        Arc::ptr_eq(&self.d, shared_null())
    }

    pub fn is_empty(&self) -> bool {
        self.d.is_empty()
    }

    pub fn is_single_vertex(&self) -> bool {
        self.d.vertex_count() == 1
    }

    pub fn has_edges(&self) -> bool {
        self.d.has_edges()
    }

    pub fn data(&self) -> &ItemHistoryGraphData {
        &self.d
    }

    /// Mutable data, detached from all copies first
    pub fn data_mut(&mut self) -> &mut ItemHistoryGraphData {
        Arc::make_mut(&mut self.d)
    }

    pub fn clear(&mut self) {
        *self.data_mut() = ItemHistoryGraphData::new();
    }

    /// Build the graph around one item
    ///
    /// The result always contains at least the subject itself, whatever
    /// `loading` selects.
    pub fn from_info<S>(subject: &ItemInfo, store: &S, loading: HistoryLoadingMode, processing: ProcessingMode) -> Self
    where
        S: HistoryStore + ?Sized,
    {
        let mut graph = Self::new();

        if loading.contains(HistoryLoadingMode::LOAD_RELATION_CLOUD) {
            graph.add_relations(&store.relation_cloud(subject.id), store);
        }

        if loading.contains(HistoryLoadingMode::LOAD_SUBJECT_HISTORY) {
            graph.add_history(&store.image_history(subject.id), subject, store);
        }

        if loading.contains(HistoryLoadingMode::LOAD_LEAVES_HISTORY) {
            for leaf in graph.leaf_images() {
                if leaf != *subject {
                    graph.add_history(&store.image_history(leaf.id), &leaf, store);
                }
            }
        }

        if graph.is_empty() {
            graph.data_mut().add_vertex_for_info(subject, store);
        }

        if processing == ProcessingMode::PrepareForDisplay {
            graph.prepare_for_display(subject, store);
        }

        graph
    }

    /// Add a history sequence that ends with `subject`
    pub fn add_history<R>(&mut self, history: &ImageHistory, subject: &ItemInfo, resolver: &R)
    where
        R: ItemResolver + ?Sized,
    {
        let subject_id = resolver.history_image_id(subject);
        self.add_history_with_id(history, &subject_id, resolver);
    }

    /// Add a history sequence that ends with the image `subject_id` names
    pub fn add_history_with_id<R>(&mut self, history: &ImageHistory, subject_id: &HistoryImageId, resolver: &R)
    where
        R: ItemResolver + ?Sized,
    {
        let mut history = history.clone();

        if subject_id.is_valid() {
            history.push_referred_image(subject_id.clone());
        }

        self.data_mut().add_history(&history, None, resolver);
    }

    /// Add the history of a freshly scanned item, linking the item by id
    pub fn add_scanned_history<R>(&mut self, history: &ImageHistory, subject_id: ItemId, resolver: &R)
    where
        R: ItemResolver + ?Sized,
    {
        self.data_mut().add_history(history, Some(subject_id), resolver);
    }

    /// Add derived-from pairs `(derived, ancestor)`
    pub fn add_relations<R>(&mut self, pairs: &[(ItemId, ItemId)], resolver: &R)
    where
        R: ItemResolver + ?Sized,
    {
        for &(derived, ancestor) in pairs {
            if derived < 1 || ancestor < 1 {
                continue;
            }

            if derived == ancestor {
                warn!(id = derived, "Broken relation cloud: refusing to add a loop");
            }

            let d = self.data_mut();
            let v1 = d.add_vertex_for_item_id(derived, resolver);
            let v2 = d.add_vertex_for_item_id(ancestor, resolver);
            if v1 != v2 {
                d.link(v1, v2);
            }
        }
    }

    /// Replace the edges by their transitive reduction
    ///
    /// Leaves the graph unchanged if it contains a cycle.
    pub fn reduce_edges(&mut self) {
        if self.d.vertex_count() <= 1 {
            return;
        }

        let Some(reduction) = self.d.transitive_reduction() else {
            warn!("History graph is not a DAG, edges are not reduced");
            return;
        };

        for &e in &reduction.removed_edges {
            let carries_actions = self.d.edge_properties(e).is_some_and(|props| !props.is_empty());
            if carries_actions {
                debug!(edge = e.index(), "Conflicting history information: edge removed by reduction carries actions");
            }
        }

        *self.data_mut() = ItemHistoryGraphData::from(reduction.graph);
    }

    /// True if some vertex never resolved to a persisted item
    pub fn has_unresolved_entries(&self) -> bool {
        self.d.vertices().into_iter().any(|v| !self.d[v].is_resolved())
    }

    /// Remove all vertices without persisted items, bridging their edges
    pub fn drop_unresolved_entries(&mut self) {
        if !self.has_unresolved_entries() {
            return;
        }

        let d = self.data_mut();
        let mut index = 0;
        // each round removes a vertex or ends the loop
        loop {
            let before = d.vertex_count();
            index = d.remove_next_unresolved_vertex(index);
            if d.vertex_count() == before {
                break;
            }
        }
    }

    /// Order the items of each vertex by closeness to `subject`
    pub fn sort_for_info<R>(&mut self, subject: &ItemInfo, resolver: &R)
    where
        R: ItemResolver + ?Sized,
    {
        if self.is_null() {
            return;
        }

        let d = self.data_mut();
        for v in d.vertices() {
            resolver.sort_by_proximity(&mut d[v].infos, subject);
        }
    }

    /// Reduce edges, drop unresolved vertices, then sort for `subject`
    pub fn prepare_for_display<R>(&mut self, subject: &ItemInfo, resolver: &R)
    where
        R: ItemResolver + ?Sized,
    {
        self.reduce_edges();
        self.drop_unresolved_entries();
        self.sort_for_info(subject, resolver);
    }

    /// Every derived-from pair `(derived, ancestor)` of persisted items
    ///
    /// Taken from the transitive closure, so indirect ancestors are listed
    /// whether or not the graph is reduced.
    pub fn relation_cloud(&self) -> Vec<(ItemId, ItemId)> {
        let (subjects, objects) = self.relation_cloud_parallel();
        subjects.into_iter().zip(objects).collect()
    }

    /// [`relation_cloud`](Self::relation_cloud) as two parallel lists
    pub fn relation_cloud_parallel(&self) -> (Vec<ItemId>, Vec<ItemId>) {
        let closure = self.d.transitive_closure();
        let mut subjects = Vec::new();
        let mut objects = Vec::new();

        for (a, b) in closure.edge_pairs() {
            for source in &closure[a].infos {
                for target in &closure[b].infos {
                    subjects.push(source.id);
                    objects.push(target.id);
                }
            }
        }

        (subjects, objects)
    }

    pub fn all_images(&self) -> Vec<ItemInfo> {
        self.d.to_info_list(&self.d.vertices())
    }

    pub fn all_image_ids(&self) -> Vec<ItemId> {
        self.all_images().into_iter().map(|info| info.id).collect()
    }

    /// Items of the vertices nothing was derived from
    pub fn root_images(&self) -> Vec<ItemInfo> {
        self.d.to_info_list(&self.d.roots())
    }

    /// Items of the vertices nothing derives from
    pub fn leaf_images(&self) -> Vec<ItemInfo> {
        self.d.to_info_list(&self.d.leaves())
    }

    /// Image types of every persisted item
    pub fn categorize(&self) -> HashMap<ItemInfo, HistoryImageTypes> {
        let types = self.d.categorize();
        let mut result = HashMap::new();

        for (v, kind) in types {
            for info in &self.d[v].infos {
                result.insert(info.clone(), kind);
            }
        }

        result
    }
}

impl fmt::Debug for ItemHistoryGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemHistoryGraph")
            .field("vertices", &self.d.vertex_count())
            .field("edges", &self.d.edge_count())
            .field("null", &self.is_null())
            .finish()
    }
}

/// Multi-line listing: each vertex with the vertices derived from it
impl fmt::Display for ItemHistoryGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.data();

        if d.is_empty() {
            return writeln!(f, "(Empty graph)");
        }

        let mut vertices = d.topological_sort();
        if vertices.is_empty() {
            vertices = d.vertices();
            writeln!(f, "Not-a-DAG graph with {} vertices:", vertices.len())?;
        } else {
            writeln!(f, "Graph with {} vertices:", vertices.len())?;
        }

        let mut unconnected = Vec::new();

        for &target in &vertices {
            let sources: Vec<String> = d
                .adjacent_vertices(target, AdjacencyFlags::InboundEdges)
                .into_iter()
                .map(|source| d[source].to_string())
                .collect();

            if !sources.is_empty() {
                writeln!(f, "  {} <- {}", d[target], sources.join(", "))?;
            } else if d.out_degree(target) == 0 {
                unconnected.push(d[target].to_string());
            }
        }

        if !unconnected.is_empty() {
            writeln!(f, "Unconnected: {}", unconnected.join(", "))?;
        }

        Ok(())
    }
}
