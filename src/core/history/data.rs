//! The history graph specialised with vertex and edge payloads.
//!
//! Vertices are found or created by identity: a history id is looked up by
//! uuid or "same referred image", then resolved into persisted items that
//! are looked up again. Whatever was learned is merged into the vertex.

use super::properties::{HistoryEdgeProperties, HistoryVertexProperties};
use super::types::{HistoryImageId, HistoryImageType, HistoryImageTypes, ImageHistory, ItemId, ItemInfo};
use crate::core::graph::{AdjacencyFlags, Edge, Graph, MeaningOfDirection, Vertex};
use crate::core::store::ItemResolver;
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use tracing::{debug, warn};

/// Graph of image versions, edges pointing from derived image to parent
pub type HistoryGraph = Graph<HistoryVertexProperties, HistoryEdgeProperties>;

/// A [`HistoryGraph`] with identity-aware construction
#[derive(Debug, Clone)]
pub struct ItemHistoryGraphData {
    graph: HistoryGraph,
}

impl Default for ItemHistoryGraphData {
    fn default() -> Self {
        Self::new()
    }
}

impl From<HistoryGraph> for ItemHistoryGraphData {
    fn from(graph: HistoryGraph) -> Self {
        Self { graph }
    }
}

impl Deref for ItemHistoryGraphData {
    type Target = HistoryGraph;

    fn deref(&self) -> &HistoryGraph {
        &self.graph
    }
}

impl DerefMut for ItemHistoryGraphData {
    fn deref_mut(&mut self) -> &mut HistoryGraph {
        &mut self.graph
    }
}

impl ItemHistoryGraphData {
    pub fn new() -> Self {
        Self {
            graph: HistoryGraph::new(MeaningOfDirection::ChildToParent),
        }
    }

    pub fn into_graph(self) -> HistoryGraph {
        self.graph
    }

    /// Find or create the vertex for a group of content-identical files
    ///
    /// The first id drives the lookup, the others are merged into the
    /// vertex it yields. `None` if the list is empty or its first id is
    /// invalid.
    pub fn add_vertex_for_ids<R>(&mut self, ids: &[HistoryImageId], resolver: &R) -> Option<Vertex>
    where
        R: ItemResolver + ?Sized,
    {
        let (first, rest) = ids.split_first()?;
        let v = self.add_vertex_for_history_id(first, resolver)?;

        if !rest.is_empty() {
            self.apply_properties(Some(v), Vec::new(), rest.to_vec());
        }

        Some(v)
    }

    /// Find or create the vertex for one history id
    ///
    /// `None` for an invalid id.
    pub fn add_vertex_for_history_id<R>(&mut self, id: &HistoryImageId, resolver: &R) -> Option<Vertex>
    where
        R: ItemResolver + ?Sized,
    {
        if !id.is_valid() {
            return None;
        }

        let mut v = self.find_by_history_image_id(id);
        let mut infos = Vec::new();

        if v.is_none() {
            for item_id in resolver.resolve_history_image_id(id) {
                let Some(info) = resolver.item_info(item_id) else {
                    continue;
                };

                if v.is_none() {
                    v = self.find_by_info(&info);
                }
                infos.push(info);
            }
        }

        Some(self.apply_properties(v, infos, vec![id.clone()]))
    }

    /// Find or create the vertex for a persisted item id
    ///
    /// An id the resolver does not know yields a fresh unresolved vertex.
    pub fn add_vertex_for_item_id<R>(&mut self, id: ItemId, resolver: &R) -> Vertex
    where
        R: ItemResolver + ?Sized,
    {
        match resolver.item_info(id) {
            Some(info) => self.add_vertex_for_info(&info, resolver),
            None => {
                debug!(id, "Item not found, adding unresolved vertex");
                self.apply_properties(None, Vec::new(), Vec::new())
            }
        }
    }

    /// Find or create the vertex for a persisted item
    ///
    /// Looks up the item id, then its uuid, then its history id, and only
    /// then resolves the history id into a new vertex.
    pub fn add_vertex_for_info<R>(&mut self, info: &ItemInfo, resolver: &R) -> Vertex
    where
        R: ItemResolver + ?Sized,
    {
        let mut history_id = None;
        let mut v = self.find_by_info(info);

        if v.is_none() {
            v = info.uuid().and_then(|uuid| self.find_by_uuid(uuid));

            if v.is_none() {
                let id = resolver.history_image_id(info);
                v = self.find_by_history_image_id(&id);

                if v.is_none() {
                    v = self.add_vertex_for_history_id(&id, resolver);
                }
                history_id = Some(id);
            }
        }

        self.apply_properties(v, vec![info.clone()], history_id.into_iter().collect())
    }

    /// Find or create the vertex for an item by id only
    ///
    /// Skips deriving a history id from the item, which scanning can not
    /// afford for every file.
    pub fn add_vertex_scanned<R>(&mut self, id: ItemId, resolver: &R) -> Vertex
    where
        R: ItemResolver + ?Sized,
    {
        let v = self.find_by_item_id(id);
        let infos = resolver.item_info(id).into_iter().collect();
        self.apply_properties(v, infos, Vec::new())
    }

    /// Merge `infos` and `ids` into `v`, creating the vertex if needed
    fn apply_properties(&mut self, v: Option<Vertex>, infos: Vec<ItemInfo>, ids: Vec<HistoryImageId>) -> Vertex {
        let v = match v {
            Some(v) if self.contains(v) => v,
            _ => self.graph.add_vertex(),
        };

        let props = &mut self.graph[v];
        for info in infos {
            props.add_info(info);
        }
        for id in ids {
            props.add_history_image_id(id);
        }

        v
    }

    /// Ingest one history sequence
    ///
    /// Each step with referred images becomes a vertex, linked to the
    /// previous step's vertex by an edge carrying the actions in between.
    /// `extra_current`, if given, is linked after the last step.
    pub fn add_history<R>(&mut self, history: &ImageHistory, extra_current: Option<ItemId>, resolver: &R)
    where
        R: ItemResolver + ?Sized,
    {
        if history.is_empty() {
            return;
        }

        let mut last: Option<Vertex> = None;
        let mut edge_props = HistoryEdgeProperties::default();

        for entry in &history.entries {
            if last.is_some() {
                if let Some(action) = &entry.action {
                    edge_props.push(action.clone());
                }
            }

            let Some(v) = self.add_vertex_for_ids(&entry.referred_images, resolver) else {
                continue;
            };

            if let Some(previous) = last {
                if v != previous {
                    if let Some(e) = self.link(v, previous) {
                        self.graph.set_edge_properties(e, std::mem::take(&mut edge_props));
                    }
                } else {
                    warn!("Broken history: same file referred by different entries, refusing to add a loop");
                }
            }

            last = Some(v);
        }

        if let Some(id) = extra_current.filter(|&id| id > 0) {
            let v = self.add_vertex_scanned(id, resolver);

            if let Some(previous) = last.filter(|&previous| previous != v) {
                if let Some(e) = self.link(v, previous) {
                    self.graph.set_edge_properties(e, edge_props);
                }
            }
        }
    }

    /// The edge `from -> to`, added if not present yet
    pub fn link(&mut self, from: Vertex, to: Vertex) -> Option<Edge> {
        self.graph
            .edge_between(from, to)
            .or_else(|| self.graph.add_edge(from, to))
    }

    /// Remove the first vertex at or after `index` that has no resolved item
    ///
    /// Its parents are linked directly to its children, the new edges
    /// carrying the actions of both removed edges. Returns the position of
    /// the removed vertex, where the next search should start, or `index`
    /// unchanged if nothing was removed; compare vertex counts to tell the
    /// two apart.
    pub fn remove_next_unresolved_vertex(&mut self, index: usize) -> usize {
        let vertices = self.graph.vertices();

        for (position, &v) in vertices.iter().enumerate().skip(index) {
            if self.graph[v].is_resolved() {
                continue;
            }

            for upper in self.graph.edges_of(v, AdjacencyFlags::EdgesToRoot) {
                for lower in self.graph.edges_of(v, AdjacencyFlags::EdgesToLeaf) {
                    let (Some(derived), Some(parent)) = (self.graph.source(lower), self.graph.target(upper)) else {
                        continue;
                    };

                    let mut combined = HistoryEdgeProperties::default();
                    combined.actions.extend(self.graph[upper].actions.iter().cloned());
                    combined.actions.extend(self.graph[lower].actions.iter().cloned());

                    if let Some(e) = self.link(derived, parent) {
                        self.graph.set_edge_properties(e, combined);
                    }
                }
            }

            debug!(vertex = %v, "Removing unresolved vertex");
            self.graph.remove(v);
            return position;
        }

        index
    }

    /// Classify every vertex as source, original, intermediate and/or current
    pub fn categorize(&self) -> BTreeMap<Vertex, HistoryImageTypes> {
        let mut types = BTreeMap::new();

        for v in self.graph.vertices() {
            let props = &self.graph[v];
            let mut kind = HistoryImageTypes::NONE;

            if props.always_marked_as(HistoryImageType::Source) {
                kind.insert(HistoryImageType::Source);
            } else if self.graph.is_leaf(v) {
                kind.insert(HistoryImageType::Current);
            } else if self.graph.is_root(v) {
                if props.marked_as(HistoryImageType::Original) {
                    kind.insert(HistoryImageType::Original);
                }
            } else {
                kind.insert(HistoryImageType::Intermediate);
            }

            // a derived image does not hide its parent if every next action branches explicitly
            if !kind.contains(HistoryImageType::Current) && self.graph.has_edges_of(v, AdjacencyFlags::EdgesToLeaf) {
                let all_branches = self
                    .graph
                    .edges_of(v, AdjacencyFlags::EdgesToLeaf)
                    .into_iter()
                    .filter_map(|e| self.graph[e].first_action())
                    .all(|action| action.is_explicit_branch());

                if all_branches {
                    kind.insert(HistoryImageType::Current);
                }
            }

            types.insert(v, kind);
        }

        types
    }

    pub fn find_by_uuid(&self, uuid: &str) -> Option<Vertex> {
        self.graph.find_vertex(|props| props.has_uuid(uuid))
    }

    pub fn find_by_info(&self, info: &ItemInfo) -> Option<Vertex> {
        self.graph.find_vertex(|props| props.contains_info(info))
    }

    pub fn find_by_item_id(&self, id: ItemId) -> Option<Vertex> {
        self.graph.find_vertex(|props| props.contains_id(id))
    }

    pub fn find_by_history_image_id(&self, id: &HistoryImageId) -> Option<Vertex> {
        self.graph.find_vertex(|props| props.matches(id))
    }

    /// All resolved items of `vertices`, in order
    pub fn to_info_list(&self, vertices: &[Vertex]) -> Vec<ItemInfo> {
        vertices
            .iter()
            .filter_map(|&v| self.graph.properties(v))
            .flat_map(|props| props.infos.iter().cloned())
            .collect()
    }
}
