//! Integration tests for history graphs.
//!
//! These tests build graphs through the public API against an in-memory
//! store and check:
//! - Relation clouds and root/leaf images of forked histories
//! - Rebuilding after an image was removed
//! - Edge reduction on dense relation sets
//! - Categorization of linear chains

use photo_history_graph::core::graph::AdjacencyFlags;
use photo_history_graph::core::history::{
    FilterAction, FilterActionFlags, HistoryImageId, HistoryImageType, HistoryImageTypes, HistoryLoadingMode,
    HistoryVertexProperties, ImageHistory, ItemHistoryGraph, ItemId, ItemInfo, ProcessingMode,
};
use photo_history_graph::core::scanner::HistoryScanner;
use photo_history_graph::core::store::{HistoryWriter, InMemoryStore, InternalTag, ItemResolver};
use std::collections::BTreeSet;
use std::sync::Arc;

const ORIG: ItemId = 1;
const ONE: ItemId = 2;
const TWO: ItemId = 3;
const THREE: ItemId = 4;
const FOUR: ItemId = 5;

fn uuid_of(id: ItemId) -> String {
    format!("uuid-{id}")
}

fn referring(kind: HistoryImageType, id: ItemId) -> HistoryImageId {
    HistoryImageId::new(kind).with_uuid(uuid_of(id))
}

fn store_with(ids: impl IntoIterator<Item = ItemId>) -> InMemoryStore {
    let store = InMemoryStore::new();
    for id in ids {
        store.insert(ItemInfo {
            id,
            uuid: Some(uuid_of(id)),
            name: format!("{id}.jpg"),
            ..Default::default()
        });
    }
    store
}

/// `orig -> [rotate] -> one -> [crop] -> two -> [last] -> subject`
fn forked_history(last: &str) -> ImageHistory {
    ImageHistory::new()
        .referring(referring(HistoryImageType::Original, ORIG))
        .then(FilterAction::new("transform:rotate", 1))
        .referring(referring(HistoryImageType::Intermediate, ONE))
        .then(FilterAction::new("transform:crop", 1))
        .referring(referring(HistoryImageType::Intermediate, TWO))
        .then(FilterAction::new(last, 1))
}

fn scenario_a(store: &InMemoryStore) -> ItemHistoryGraph {
    let mut graph = ItemHistoryGraph::new();
    for (subject, last) in [(THREE, "transform:resize"), (FOUR, "sharpen")] {
        let info = store.item_info(subject).unwrap();
        graph.add_history(&forked_history(last), &info, store);
    }
    graph
}

fn ids(infos: Vec<ItemInfo>) -> BTreeSet<ItemId> {
    infos.into_iter().map(|info| info.id).collect()
}

#[test]
fn forked_history_has_full_relation_cloud() {
    let store = store_with(ORIG..=FOUR);
    let graph = scenario_a(&store);

    assert_eq!(graph.data().vertex_count(), 5);

    let cloud: BTreeSet<(ItemId, ItemId)> = graph.relation_cloud().into_iter().collect();
    let expected: BTreeSet<(ItemId, ItemId)> = [
        (ONE, ORIG),
        (TWO, ONE),
        (TWO, ORIG),
        (THREE, TWO),
        (THREE, ONE),
        (THREE, ORIG),
        (FOUR, TWO),
        (FOUR, ONE),
        (FOUR, ORIG),
    ]
    .into_iter()
    .collect();
    assert_eq!(cloud, expected);

    assert_eq!(ids(graph.leaf_images()), BTreeSet::from([THREE, FOUR]));
    assert_eq!(ids(graph.root_images()), BTreeSet::from([ORIG]));
}

#[test]
fn forked_history_actions_sit_on_their_edges() {
    let store = store_with(ORIG..=FOUR);
    let graph = scenario_a(&store);
    let data = graph.data();

    let two = data.find_by_item_id(TWO).unwrap();
    let four = data.find_by_item_id(FOUR).unwrap();
    let props = data.properties_between(four, two).unwrap();

    assert_eq!(props.first_action().unwrap().identifier, "sharpen");
    assert_eq!(data.adjacent_vertices(two, AdjacencyFlags::EdgesToLeaf).len(), 2);
}

#[test]
fn removed_intermediate_is_bridged_after_rescan() {
    let store = Arc::new(store_with(ORIG..=FOUR));
    store.set_history(THREE, forked_history("transform:resize"));
    store.set_history(FOUR, forked_history("sharpen"));
    let scanner = HistoryScanner::builder().store(store.clone()).build();

    // the histories are resolved into stored relations first
    store.add_tag(&[THREE, FOUR], InternalTag::NeedResolvingHistory).unwrap();
    scanner.run().unwrap();

    scanner.remove_items(&[TWO]).unwrap();
    scanner.run().unwrap();

    let four = store.item_info(FOUR).unwrap();
    let graph = ItemHistoryGraph::from_info(
        &four,
        store.as_ref(),
        HistoryLoadingMode::LOAD_ALL,
        ProcessingMode::PrepareForDisplay,
    );

    assert_eq!(graph.data().vertex_count(), 4);
    assert!(!graph.has_unresolved_entries());
    assert_eq!(graph.all_image_ids().into_iter().collect::<BTreeSet<_>>(), BTreeSet::from([ORIG, ONE, THREE, FOUR]));

    let cloud = graph.relation_cloud();
    assert!(cloud.contains(&(FOUR, ONE)));
    assert!(cloud.contains(&(THREE, ORIG)));
}

#[test]
fn dense_relations_reduce_to_necessary_edges() {
    let pairs: Vec<(ItemId, ItemId)> = vec![
        (2, 1), (3, 1), (4, 1), (5, 1), (6, 1), (7, 1), (8, 1), (10, 1), (11, 1), (12, 1),
        (13, 1), (14, 1), (15, 1), (16, 1), (17, 1), (18, 1), (22, 4), (23, 4), (24, 4), (14, 5),
        (15, 6), (22, 1), (23, 1), (24, 1), (8, 2), (9, 2), (10, 2), (11, 4), (12, 4), (13, 4),
        (16, 7), (17, 7), (18, 7), (19, 9), (20, 9), (21, 9), (22, 12), (23, 12), (24, 13), (24, 23),
        (24, 4), (24, 1), (24, 12),
    ];
    let store = store_with(1..=24);
    let mut graph = ItemHistoryGraph::new();
    graph.add_relations(&pairs, &store);

    graph.reduce_edges();

    let data = graph.data();
    let edges: BTreeSet<(ItemId, ItemId)> = data
        .edge_pairs()
        .into_iter()
        .map(|(a, b)| (data[a].infos[0].id, data[b].infos[0].id))
        .collect();

    assert!(edges.contains(&(24, 13)));
    assert!(edges.contains(&(24, 23)));
    assert!(!edges.contains(&(24, 1)));
    assert!(!edges.contains(&(24, 4)));
    assert!(!edges.contains(&(24, 12)));
    assert!(graph.relation_cloud().contains(&(24, 1)));
}

#[test]
fn reduction_keeps_the_relation_cloud() {
    let store = store_with(ORIG..=FOUR);
    let graph = scenario_a(&store);
    let mut reduced = graph.clone();

    reduced.reduce_edges();

    let mut before = graph.relation_cloud();
    let mut after = reduced.relation_cloud();
    before.sort();
    after.sort();
    assert_eq!(before, after);
    assert!(reduced.data().edge_count() <= graph.data().edge_count());
}

#[test]
fn linear_chain_categorizes_by_position() {
    let store = store_with(ORIG..=TWO);
    let history = ImageHistory::new()
        .referring(referring(HistoryImageType::Original, ORIG))
        .then(FilterAction::new("transform:rotate", 1))
        .referring(referring(HistoryImageType::Intermediate, ONE))
        .then(FilterAction::new("transform:crop", 1));
    let mut graph = ItemHistoryGraph::new();
    graph.add_history(&history, &store.item_info(TWO).unwrap(), &store);

    let types = graph.categorize();

    assert_eq!(types[&ItemInfo::new(ORIG)], HistoryImageTypes::ORIGINAL);
    assert_eq!(types[&ItemInfo::new(ONE)], HistoryImageTypes::INTERMEDIATE);
    assert_eq!(types[&ItemInfo::new(TWO)], HistoryImageTypes::CURRENT);
}

#[test]
fn explicit_branch_keeps_parent_current() {
    let store = store_with(ORIG..=ONE);
    let history = ImageHistory::new()
        .referring(referring(HistoryImageType::Original, ORIG))
        .then(FilterAction::new("copy", 1).with_flags(FilterActionFlags::EXPLICIT_BRANCH));
    let mut graph = ItemHistoryGraph::new();
    graph.add_history(&history, &store.item_info(ONE).unwrap(), &store);

    let types = graph.categorize();

    assert!(types[&ItemInfo::new(ORIG)].contains(HistoryImageTypes::ORIGINAL));
    assert!(types[&ItemInfo::new(ORIG)].contains(HistoryImageTypes::CURRENT));
}

#[test]
fn lone_subject_graph_holds_the_subject() {
    let store = store_with([7]);
    let subject = store.item_info(7).unwrap();

    let graph = ItemHistoryGraph::from_info(&subject, &store, HistoryLoadingMode::LOAD_ALL, ProcessingMode::PrepareForDisplay);

    assert_eq!(graph.data().vertex_count(), 1);
    assert_eq!(graph.all_image_ids(), vec![7]);
}

#[test]
fn same_uuid_twice_is_one_vertex() {
    let store = store_with([ORIG]);
    let mut graph = ItemHistoryGraph::new();
    let id = referring(HistoryImageType::Original, ORIG);

    let a = graph.data_mut().add_vertex_for_history_id(&id, &store);
    let b = graph.data_mut().add_vertex_for_history_id(&id, &store);

    assert_eq!(a, b);
    assert_eq!(graph.data().vertex_count(), 1);
}

#[test]
fn no_vertex_links_to_itself() {
    let store = store_with([ORIG]);
    let mut graph = ItemHistoryGraph::new();
    graph.add_relations(&[(ORIG, ORIG)], &store);

    let data = graph.data_mut();
    let v = data.find_by_item_id(ORIG).unwrap();
    assert!(data.add_edge(v, v).is_none());
    assert!(data.edge_between(v, v).is_none());
}

#[test]
fn dropping_unresolved_entries_terminates_clean() {
    let store = store_with([ORIG, TWO]);
    let history = ImageHistory::new()
        .referring(referring(HistoryImageType::Original, ORIG))
        .then(FilterAction::new("transform:rotate", 1))
        .referring(HistoryImageId::new(HistoryImageType::Intermediate).with_uuid("gone-1"))
        .then(FilterAction::new("transform:crop", 1))
        .referring(HistoryImageId::new(HistoryImageType::Intermediate).with_uuid("gone-2"))
        .then(FilterAction::new("sharpen", 1));
    let mut graph = ItemHistoryGraph::new();
    graph.add_history(&history, &store.item_info(TWO).unwrap(), &store);
    assert!(graph.has_unresolved_entries());

    graph.drop_unresolved_entries();

    assert!(!graph.has_unresolved_entries());
    assert_eq!(graph.data().vertex_count(), 2);
    assert_eq!(graph.relation_cloud(), vec![(TWO, ORIG)]);
}

#[test]
fn mixed_markers_are_marked_but_not_always() {
    let mut props = HistoryVertexProperties::default();
    props.add_history_image_id(HistoryImageId::new(HistoryImageType::Original).with_uuid("x"));
    props.add_history_image_id(HistoryImageId::new(HistoryImageType::Intermediate).with_uuid("y"));

    assert!(props.marked_as(HistoryImageType::Original));
    assert!(!props.always_marked_as(HistoryImageType::Original));
}
