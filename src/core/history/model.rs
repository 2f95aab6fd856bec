//! # History Tree Model
//!
//! Projects a display-ready history graph onto a tree of display items.
//!
//! ## Modes
//! - `ImagesList` - every image, oldest branch first
//! - `ImagesTree` - images nested by their distance from the original
//! - `CombinedTree` - the subject's history with the actions between
//!   versions, followed by derived, related and identical images
//!
//! The model only reads the graph. Nodes live in an arena and are
//! addressed by [`NodeId`].

use super::data::ItemHistoryGraphData;
use super::graph::{HistoryLoadingMode, ItemHistoryGraph, ProcessingMode};
use super::properties::HistoryVertexProperties;
use super::types::{FilterAction, HistoryImageTypes, ItemInfo};
use crate::core::graph::{AdjacencyFlags, Vertex};
use crate::core::store::HistoryStore;
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Position of a node in the model's arena
pub type NodeId = usize;

/// How the graph is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryTreeMode {
    ImagesList,
    ImagesTree,
    #[default]
    CombinedTree,
}

/// One display item
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryTreeItem {
    /// An image; `info` is the item shown for the vertex
    Vertex {
        vertex: Vertex,
        info: Option<ItemInfo>,
        category: HistoryImageTypes,
    },
    FilterAction(FilterAction),
    /// Title of a group of images below an image
    Header(String),
    /// Title of a top-level section
    Category(String),
    Separator,
}

#[derive(Debug, Clone)]
struct TreeNode {
    item: HistoryTreeItem,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Tree of display items for one subject image
#[derive(Debug, Default)]
pub struct HistoryTreeModel {
    mode: HistoryTreeMode,
    subject: ItemInfo,
    graph: ItemHistoryGraph,
    nodes: Vec<TreeNode>,
    top_level: Vec<NodeId>,
    vertex_nodes: Vec<NodeId>,
    path: Vec<Vertex>,
    categories: BTreeMap<Vertex, HistoryImageTypes>,
}

impl HistoryTreeModel {
    pub fn new(mode: HistoryTreeMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn mode(&self) -> HistoryTreeMode {
        self.mode
    }

    /// Switch the layout, rebuilding the tree from the current graph
    pub fn set_mode(&mut self, mode: HistoryTreeMode) {
        if self.mode == mode {
            return;
        }

        self.mode = mode;
        self.build();
    }

    /// Show the history of `subject`
    ///
    /// A null `graph` is loaded from `store`; any other graph is prepared
    /// for display around `subject` first.
    pub fn set_history<S>(&mut self, subject: &ItemInfo, graph: ItemHistoryGraph, store: &S)
    where
        S: HistoryStore + ?Sized,
    {
        self.subject = subject.clone();

        self.graph = if graph.is_null() {
            ItemHistoryGraph::from_info(subject, store, HistoryLoadingMode::LOAD_ALL, ProcessingMode::PrepareForDisplay)
        } else {
            let mut graph = graph;
            graph.prepare_for_display(subject, store);
            graph
        };

        self.build();
    }

    pub fn subject(&self) -> &ItemInfo {
        &self.subject
    }

    pub fn graph(&self) -> &ItemHistoryGraph {
        &self.graph
    }

    /// The longest path through the subject, original first
    pub fn path(&self) -> &[Vertex] {
        &self.path
    }

    pub fn categories(&self) -> &BTreeMap<Vertex, HistoryImageTypes> {
        &self.categories
    }

    /// Nodes below `parent`, or the top-level nodes for `None`
    pub fn children(&self, parent: Option<NodeId>) -> &[NodeId] {
        match parent {
            Some(node) => self.nodes.get(node).map_or(&[][..], |n| n.children.as_slice()),
            None => &self.top_level,
        }
    }

    pub fn row_count(&self, parent: Option<NodeId>) -> usize {
        self.children(parent).len()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node).and_then(|n| n.parent)
    }

    pub fn item(&self, node: NodeId) -> Option<&HistoryTreeItem> {
        self.nodes.get(node).map(|n| &n.item)
    }

    pub fn is_image(&self, node: NodeId) -> bool {
        matches!(self.item(node), Some(HistoryTreeItem::Vertex { .. }))
    }

    pub fn is_filter_action(&self, node: NodeId) -> bool {
        matches!(self.item(node), Some(HistoryTreeItem::FilterAction(_)))
    }

    pub fn filter_action(&self, node: NodeId) -> Option<&FilterAction> {
        match self.item(node) {
            Some(HistoryTreeItem::FilterAction(action)) => Some(action),
            _ => None,
        }
    }

    /// The item shown by an image node
    pub fn image_info(&self, node: NodeId) -> Option<&ItemInfo> {
        match self.item(node) {
            Some(HistoryTreeItem::Vertex { info, .. }) => info.as_ref(),
            _ => None,
        }
    }

    /// Whether `info` is part of the shown graph
    pub fn has_image(&self, info: &ItemInfo) -> bool {
        self.graph.data().find_by_info(info).is_some()
    }

    /// The image node showing `info`
    ///
    /// Prefers a node that shows exactly this item, then any node whose
    /// vertex contains it.
    pub fn node_for_info(&self, info: &ItemInfo) -> Option<NodeId> {
        if info.is_null() {
            return None;
        }

        let shown = self
            .vertex_nodes
            .iter()
            .copied()
            .find(|&node| self.image_info(node) == Some(info));

        shown.or_else(|| {
            self.vertex_nodes.iter().copied().find(|&node| {
                self.vertex_props(node)
                    .is_some_and(|props| props.contains_info(info))
            })
        })
    }

    /// Whether an image node stands for the subject
    pub fn is_subject(&self, node: NodeId) -> bool {
        self.vertex_props(node)
            .is_some_and(|props| props.contains_info(&self.subject))
    }

    /// Text to show for a node, `None` for separators
    pub fn display_text(&self, node: NodeId) -> Option<String> {
        match self.item(node)? {
            HistoryTreeItem::Vertex { info, category, .. } => {
                let name = match info {
                    Some(info) if !info.name.is_empty() => info.name.clone(),
                    Some(info) => format!("#{}", info.id),
                    None => "(unknown image)".to_string(),
                };

                if category.contains(HistoryImageTypes::ORIGINAL) {
                    Some(format!("{name} (Original Image)"))
                } else if category.contains(HistoryImageTypes::SOURCE) {
                    Some(format!("{name} (Source Image)"))
                } else {
                    Some(name)
                }
            }
            HistoryTreeItem::FilterAction(action) => Some(action.display_name().to_string()),
            HistoryTreeItem::Header(title) | HistoryTreeItem::Category(title) => Some(title.clone()),
            HistoryTreeItem::Separator => None,
        }
    }

    /// Indented plain-text rendering of the tree
    pub fn render(&self) -> String {
        self.to_string()
    }

    fn render_node(&self, node: NodeId, depth: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indent = "  ".repeat(depth);
        let text = self.display_text(node).unwrap_or_default();

        match self.item(node) {
            Some(HistoryTreeItem::Vertex { .. }) => {
                let marker = if self.is_subject(node) { "*" } else { "-" };
                writeln!(f, "{indent}{marker} {text}")?;
            }
            Some(HistoryTreeItem::FilterAction(_)) => writeln!(f, "{indent}    > {text}")?,
            Some(HistoryTreeItem::Header(_)) => writeln!(f, "{indent}{text}")?,
            Some(HistoryTreeItem::Category(_)) => writeln!(f, "{indent}== {text} ==")?,
            Some(HistoryTreeItem::Separator) => writeln!(f, "{indent}--")?,
            None => {}
        }

        for &child in self.children(Some(node)) {
            self.render_node(child, depth + 1, f)?;
        }
        Ok(())
    }

    /// JSON rendering of the tree
    pub fn to_json(&self) -> Value {
        Value::Array(self.top_level.iter().map(|&node| self.node_json(node)).collect())
    }

    fn node_json(&self, node: NodeId) -> Value {
        let children: Vec<Value> = self
            .children(Some(node))
            .iter()
            .map(|&child| self.node_json(child))
            .collect();
        let text = self.display_text(node);

        let mut value = match self.item(node) {
            Some(HistoryTreeItem::Vertex { info, category, .. }) => json!({
                "kind": "image",
                "id": info.as_ref().map(|i| i.id),
                "category": category.to_string(),
                "subject": self.is_subject(node),
                "text": text,
            }),
            Some(HistoryTreeItem::FilterAction(action)) => json!({
                "kind": "action",
                "identifier": action.identifier,
                "text": text,
            }),
            Some(HistoryTreeItem::Header(_)) => json!({ "kind": "header", "text": text }),
            Some(HistoryTreeItem::Category(_)) => json!({ "kind": "category", "text": text }),
            Some(HistoryTreeItem::Separator) | None => json!({ "kind": "separator" }),
        };

        if !children.is_empty() {
            value["children"] = Value::Array(children);
        }
        value
    }

    fn vertex_props(&self, node: NodeId) -> Option<&HistoryVertexProperties> {
        match self.item(node)? {
            HistoryTreeItem::Vertex { vertex, .. } => self.graph.data().properties(*vertex),
            _ => None,
        }
    }

    fn build(&mut self) {
        self.nodes.clear();
        self.top_level.clear();
        self.vertex_nodes.clear();
        self.path.clear();
        self.categories.clear();

        let graph = self.graph.clone();
        let data = graph.data();

        let Some(reference) = data.find_by_info(&self.subject) else {
            return;
        };

        self.path = data.longest_path_touching(reference, newest_info_first);
        self.categories = data.categorize();

        if self.path.is_empty() {
            return;
        }

        match self.mode {
            HistoryTreeMode::ImagesList => self.build_images_list(data),
            HistoryTreeMode::ImagesTree => self.build_images_tree(data),
            HistoryTreeMode::CombinedTree => self.build_combined_tree(data, reference),
        }
    }

    fn build_images_list(&mut self, data: &ItemHistoryGraphData) {
        for v in data.vertices_depth_first_sorted(self.path[0], oldest_info_first) {
            let item = self.vertex_item(data, v, None);
            self.add_node(None, item);
        }
    }

    fn build_images_tree(&mut self, data: &ItemHistoryGraphData) {
        let first = self.path[0];
        let ordered = data.vertices_depth_first_sorted(first, oldest_info_first);
        let distances = data.shortest_distances_from(first);

        let mut sources = Vec::new();
        let mut parent: Option<NodeId> = None;
        let mut previous_item: Option<NodeId> = None;
        let mut previous_level = 0;

        for v in ordered {
            let Some(level) = distances.get(&v).copied().flatten() else {
                if data.is_root(v) && parent.is_none() {
                    let item = self.vertex_item(data, v, None);
                    self.add_node(None, item);
                } else {
                    sources.push(v);
                }
                continue;
            };

            let item = self.vertex_item(data, v, None);
            let node = self.new_node(item);

            if !sources.is_empty() {
                let pending = std::mem::take(&mut sources);
                self.add_item_subgroup(data, node, &pending, "Source Images", false);
            }

            if level > previous_level && previous_item.is_some() {
                parent = previous_item;
            } else if level < previous_level {
                for _ in level..previous_level {
                    parent = parent.and_then(|p| self.nodes[p].parent);
                }
            }
            self.attach(parent, node);

            previous_item = Some(node);
            previous_level = level;
        }

        // sources after the last reachable image have no image to hang below
        for v in sources {
            let item = self.vertex_item(data, v, None);
            self.add_node(None, item);
        }
    }

    fn build_combined_tree(&mut self, data: &ItemHistoryGraphData, reference: Vertex) {
        self.add_node(None, HistoryTreeItem::Category("Image History".to_string()));

        let mut added = Vec::new();
        let mut current_versions: Vec<Vertex> = self
            .categories
            .iter()
            .filter(|(_, kind)| **kind == HistoryImageTypes::CURRENT)
            .map(|(&v, _)| v)
            .collect();
        data.sort_by_insertion(&mut current_versions);
        let mut leaves = data.leaves_from(reference);
        let one_path = leaves.len() <= 1;

        let path = self.path.clone();
        for (i, &v) in path.iter().enumerate() {
            let previous = i.checked_sub(1).map(|p| path[p]);

            for source in data.adjacent_vertices(v, AdjacencyFlags::EdgesToRoot) {
                if Some(source) != previous {
                    let item = self.vertex_item(data, source, None);
                    self.add_node(None, item);
                }
            }

            if let Some(props) = previous.and_then(|p| data.properties_between(v, p)) {
                for action in &props.actions {
                    self.add_node(None, HistoryTreeItem::FilterAction(action.clone()));
                }
            }

            let item = self.vertex_item(data, v, None);
            self.add_node(None, item);
            added.push(v);

            // several derived images are listed in their own section
            if v == reference && !one_path {
                break;
            }
        }

        leaves.retain(|v| !added.contains(v));
        if !leaves.is_empty() {
            self.add_combined_item_category(data, leaves, "Derived Images", reference, &mut added);
        }

        current_versions.retain(|v| !added.contains(v));
        if !current_versions.is_empty() {
            self.add_combined_item_category(data, current_versions, "Related Images", path[0], &mut added);
        }

        let infos = data[reference].infos.clone();
        if infos.len() > 1 {
            self.add_identical_items(data, reference, &infos, "Identical Images");
        }
    }

    fn add_combined_item_category(
        &mut self,
        data: &ItemHistoryGraphData,
        mut vertices: Vec<Vertex>,
        title: &str,
        show_actions_from: Vertex,
        added: &mut Vec<Vertex>,
    ) {
        self.add_node(None, HistoryTreeItem::Category(title.to_string()));
        vertices.sort_by(|&a, &b| oldest_info_first(&data[a], &data[b]));

        for (n, &v) in vertices.iter().enumerate() {
            if n > 0 {
                self.add_node(None, HistoryTreeItem::Separator);
            }

            let item = self.vertex_item(data, v, None);
            let node = self.new_node(item);
            let shortest_path = data.shortest_path(show_actions_from, v);

            for step in shortest_path.windows(2) {
                if let Some(props) = data.properties_between(step[1], step[0]) {
                    for action in &props.actions {
                        self.add_node(None, HistoryTreeItem::FilterAction(action.clone()));
                    }
                }
            }

            self.attach(None, node);
            added.push(v);

            let intermediates: Vec<Vertex> = shortest_path
                .into_iter()
                .filter(|w| *w != show_actions_from && *w != v && !added.contains(w))
                .collect();
            self.add_item_subgroup(data, node, &intermediates, "Intermediate Steps:", true);
        }
    }

    fn add_item_subgroup(&mut self, data: &ItemHistoryGraphData, parent: NodeId, vertices: &[Vertex], title: &str, flat: bool) {
        if vertices.is_empty() {
            return;
        }

        let header = self.add_node(Some(parent), HistoryTreeItem::Header(title.to_string()));
        let target = if flat { parent } else { header };

        for &v in vertices {
            let item = self.vertex_item(data, v, None);
            self.add_node(Some(target), item);
        }
    }

    /// Further items of `vertex`; the first one is already shown
    fn add_identical_items(&mut self, data: &ItemHistoryGraphData, vertex: Vertex, infos: &[ItemInfo], title: &str) {
        self.add_node(None, HistoryTreeItem::Category(title.to_string()));

        for (n, info) in infos.iter().enumerate().skip(1) {
            if n > 1 {
                self.add_node(None, HistoryTreeItem::Separator);
            }
            let item = self.vertex_item(data, vertex, Some(info.clone()));
            self.add_node(None, item);
        }
    }

    fn vertex_item(&self, data: &ItemHistoryGraphData, v: Vertex, info: Option<ItemInfo>) -> HistoryTreeItem {
        HistoryTreeItem::Vertex {
            vertex: v,
            info: info.or_else(|| data[v].first_item_info().cloned()),
            category: self.categories.get(&v).copied().unwrap_or_default(),
        }
    }

    fn new_node(&mut self, item: HistoryTreeItem) -> NodeId {
        let id = self.nodes.len();
        if matches!(item, HistoryTreeItem::Vertex { .. }) {
            self.vertex_nodes.push(id);
        }
        self.nodes.push(TreeNode {
            item,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn attach(&mut self, parent: Option<NodeId>, node: NodeId) {
        match parent {
            Some(p) => {
                self.nodes[node].parent = Some(p);
                self.nodes[p].children.push(node);
            }
            None => self.top_level.push(node),
        }
    }

    fn add_node(&mut self, parent: Option<NodeId>, item: HistoryTreeItem) -> NodeId {
        let node = self.new_node(item);
        self.attach(parent, node);
        node
    }
}

/// Vertices ordered by the modification date of their first item;
/// unresolved vertices last
fn oldest_info_first(a: &HistoryVertexProperties, b: &HistoryVertexProperties) -> Ordering {
    match (a.first_item_info(), b.first_item_info()) {
        (Some(x), Some(y)) => x.modification_date.cmp(&y.modification_date),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn newest_info_first(a: &HistoryVertexProperties, b: &HistoryVertexProperties) -> Ordering {
    match (a.first_item_info(), b.first_item_info()) {
        (Some(x), Some(y)) => y.modification_date.cmp(&x.modification_date),
        _ => oldest_info_first(a, b),
    }
}

/// Same text as [`HistoryTreeModel::render`]
impl fmt::Display for HistoryTreeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &node in &self.top_level {
            self.render_node(node, 0, f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::history::types::{HistoryImageId, HistoryImageType, ImageHistory, ItemId};
    use crate::core::store::{InMemoryStore, ItemResolver};
    use chrono::{Duration, TimeZone, Utc};

    /// orig(1) -> one(2) -> two(3) -> three(4) and four(5)
    fn fixture() -> (InMemoryStore, ItemHistoryGraph) {
        let store = InMemoryStore::new();
        let base = Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap();
        for id in 1..=5 {
            store.insert(ItemInfo {
                id,
                uuid: Some(format!("u{id}")),
                name: format!("img{id}.jpg"),
                album_id: Some(1),
                modification_date: Some(base + Duration::hours(id)),
                ..Default::default()
            });
        }

        let chain = |last: &str| {
            ImageHistory::new()
                .referring(HistoryImageId::new(HistoryImageType::Original).with_uuid("u1"))
                .then(FilterAction::new("transform:rotate", 1))
                .referring(HistoryImageId::new(HistoryImageType::Intermediate).with_uuid("u2"))
                .then(FilterAction::new("transform:crop", 1))
                .referring(HistoryImageId::new(HistoryImageType::Intermediate).with_uuid("u3"))
                .then(FilterAction::new(last, 1))
        };

        let mut graph = ItemHistoryGraph::new();
        for (id, action) in [(4, "transform:resize"), (5, "sharpen")] {
            let subject = store.item_info(id).unwrap();
            graph.add_history(&chain(action), &subject, &store);
        }

        (store, graph)
    }

    fn model(mode: HistoryTreeMode, subject: ItemId) -> HistoryTreeModel {
        let (store, graph) = fixture();
        let subject = store.item_info(subject).unwrap();
        let mut model = HistoryTreeModel::new(mode);
        model.set_history(&subject, graph, &store);
        model
    }

    fn shown_ids(model: &HistoryTreeModel, nodes: &[NodeId]) -> Vec<ItemId> {
        nodes
            .iter()
            .filter_map(|&n| model.image_info(n))
            .map(|info| info.id)
            .collect()
    }

    #[test]
    fn path_runs_from_original_through_subject() {
        let model = model(HistoryTreeMode::CombinedTree, 4);
        let ids: Vec<ItemId> = model
            .path()
            .iter()
            .map(|&v| model.graph().data()[v].infos[0].id)
            .collect();

        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn images_list_is_oldest_first() {
        let model = model(HistoryTreeMode::ImagesList, 4);

        assert_eq!(shown_ids(&model, model.children(None)), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn images_tree_nests_by_distance() {
        let model = model(HistoryTreeMode::ImagesTree, 4);

        let top = model.children(None);
        assert_eq!(shown_ids(&model, top), vec![1]);

        let two = model.children(Some(top[0]));
        let three = model.children(Some(two[0]));
        assert_eq!(shown_ids(&model, three), vec![3]);
        assert_eq!(shown_ids(&model, model.children(Some(three[0]))), vec![4, 5]);
    }

    #[test]
    fn combined_tree_shows_actions_between_versions() {
        let model = model(HistoryTreeMode::CombinedTree, 4);
        let top = model.children(None);
        let texts: Vec<String> = top.iter().filter_map(|&n| model.display_text(n)).collect();

        assert_eq!(
            texts,
            vec![
                "Image History",
                "img1.jpg (Original Image)",
                "transform:rotate",
                "img2.jpg",
                "transform:crop",
                "img3.jpg",
                "transform:resize",
                "img4.jpg",
                "Related Images",
                "transform:rotate",
                "transform:crop",
                "sharpen",
                "img5.jpg",
            ]
        );
    }

    #[test]
    fn subject_node_is_found_and_marked() {
        let model = model(HistoryTreeMode::CombinedTree, 4);
        let node = model.node_for_info(&ItemInfo::new(4)).unwrap();

        assert!(model.is_image(node));
        assert!(model.is_subject(node));
        assert!(model.has_image(&ItemInfo::new(5)));
        assert!(!model.has_image(&ItemInfo::new(9)));
        assert!(model.render().contains("* img4.jpg"));
    }

    #[test]
    fn rendering_marks_each_kind_of_row() {
        let model = model(HistoryTreeMode::CombinedTree, 4);
        let text = model.render();

        assert!(text.starts_with("== Image History ==\n"));
        assert!(text.contains("* img4.jpg\n"));
        assert!(text.contains("- img5.jpg"));
        assert_eq!(model.to_string(), text);
    }

    #[test]
    fn switching_mode_rebuilds() {
        let mut model = model(HistoryTreeMode::CombinedTree, 4);
        model.set_mode(HistoryTreeMode::ImagesList);

        assert_eq!(model.row_count(None), 5);
        assert!(model.children(None).iter().all(|&n| model.is_image(n)));
    }

    #[test]
    fn subject_with_several_derived_images_lists_them_separately() {
        let model = model(HistoryTreeMode::CombinedTree, 3);
        let texts: Vec<String> = model
            .children(None)
            .iter()
            .filter_map(|&n| model.display_text(n))
            .collect();

        let derived = texts.iter().position(|t| t == "Derived Images").unwrap();
        assert_eq!(texts[derived - 1], "img3.jpg");
        assert!(texts[derived..].contains(&"img4.jpg".to_string()));
        assert!(texts[derived..].contains(&"img5.jpg".to_string()));
        assert!(!texts.contains(&"Related Images".to_string()));
    }

    #[test]
    fn unknown_subject_builds_nothing() {
        let (store, graph) = fixture();
        let mut model = HistoryTreeModel::new(HistoryTreeMode::CombinedTree);
        model.set_history(&ItemInfo::new(42), graph, &store);

        assert_eq!(model.row_count(None), 0);
        assert!(model.path().is_empty());
    }
}
