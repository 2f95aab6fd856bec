//! # Graph Module
//!
//! A generic directed graph with per-vertex and per-edge payloads.
//!
//! ## Storage
//! Vertices and edges live in a `petgraph` stable graph: an index arena
//! with tombstones, so a [`Vertex`] or [`Edge`] handle stays valid (and keeps
//! naming the same element) after other elements are removed. A missing
//! handle is expressed as `Option::None`, never as a dangling index.
//!
//! The arena reuses freed slots, so a handle's index says nothing about
//! age. Each vertex also gets a sequence number on insertion, and every
//! "insertion order" below follows that number.
//!
//! ## Direction
//! Every graph fixes the meaning of its edges at construction time
//! ([`MeaningOfDirection`]). Root/leaf queries and the
//! [`AdjacencyFlags::EdgesToRoot`] / [`AdjacencyFlags::EdgesToLeaf`]
//! selectors are interpreted through that convention.
//!
//! ## Algorithms
//! Reductions, closures, sorting, paths and traversals live in
//! [`algorithms`](self::algorithms).

mod algorithms;

pub use algorithms::{Reduction, TraversalOrder};

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;
use std::fmt;
use std::ops::{Index, IndexMut};
use tracing::warn;

/// Handle to a vertex of a [`Graph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Vertex(NodeIndex);

impl Vertex {
    /// Slot of the vertex in the arena
    ///
    /// Slots are reused after removal; see [`Graph::vertices`] for age order.
    pub fn index(self) -> usize {
        self.0.index()
    }
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0.index())
    }
}

/// Handle to an edge of a [`Graph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge(EdgeIndex);

impl Edge {
    /// Slot of the edge in the arena
    pub fn index(self) -> usize {
        self.0.index()
    }
}

/// What an edge `a -> b` means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeaningOfDirection {
    /// `a` is the parent, `b` was derived from it
    ParentToChild,
    /// `a` was derived from its parent `b`
    #[default]
    ChildToParent,
}

/// Selects which incident edges of a vertex to look at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjacencyFlags {
    /// Edges starting at the vertex
    OutboundEdges,
    /// Edges ending at the vertex
    InboundEdges,
    /// Edges leading towards the leaves (newer versions)
    EdgesToLeaf,
    /// Edges leading towards the roots (older versions)
    EdgesToRoot,
    /// Both inbound and outbound edges
    AllEdges,
}

/// Directed graph with payload `V` on vertices and `E` on edges
#[derive(Debug, Clone)]
pub struct Graph<V, E> {
    graph: StableDiGraph<V, E>,
    direction: MeaningOfDirection,
    sequence: HashMap<NodeIndex, u64>,
    next_sequence: u64,
}

impl<V, E> Default for Graph<V, E> {
    fn default() -> Self {
        Self::new(MeaningOfDirection::default())
    }
}

impl<V, E> Graph<V, E> {
    /// Create an empty graph with the given edge convention
    pub fn new(direction: MeaningOfDirection) -> Self {
        Self {
            graph: StableDiGraph::default(),
            direction,
            sequence: HashMap::new(),
            next_sequence: 0,
        }
    }

    /// The edge convention fixed at construction
    pub fn direction(&self) -> MeaningOfDirection {
        self.direction
    }

    /// Remove all vertices and edges
    pub fn clear(&mut self) {
        self.graph.clear();
        self.sequence.clear();
    }

    /// Add an isolated vertex carrying `props`
    pub fn add_vertex_with(&mut self, props: V) -> Vertex {
        let n = self.graph.add_node(props);
        self.sequence.insert(n, self.next_sequence);
        self.next_sequence += 1;
        Vertex(n)
    }

    /// Add an isolated vertex with default properties
    pub fn add_vertex(&mut self) -> Vertex
    where
        V: Default,
    {
        self.add_vertex_with(V::default())
    }

    /// Add a directed edge `from -> to` carrying `props`
    ///
    /// Parallel edges are allowed; callers decide about duplicates.
    /// Returns `None` for self-loops and for vertices not in this graph.
    pub fn add_edge_with(&mut self, from: Vertex, to: Vertex, props: E) -> Option<Edge> {
        if from == to {
            warn!(vertex = %from, "Refusing to add an edge from a vertex to itself");
            return None;
        }

        if !self.contains(from) || !self.contains(to) {
            warn!(%from, %to, "Refusing to add an edge between unknown vertices");
            return None;
        }

        Some(Edge(self.graph.add_edge(from.0, to.0, props)))
    }

    /// Add a directed edge `from -> to` with default properties
    pub fn add_edge(&mut self, from: Vertex, to: Vertex) -> Option<Edge>
    where
        E: Default,
    {
        self.add_edge_with(from, to, E::default())
    }

    /// Remove a vertex and all incident edges, returning its properties
    pub fn remove(&mut self, v: Vertex) -> Option<V> {
        self.sequence.remove(&v.0);
        self.graph.remove_node(v.0)
    }

    /// Remove a single edge, returning its properties
    pub fn remove_edge(&mut self, e: Edge) -> Option<E> {
        self.graph.remove_edge(e.0)
    }

    /// Whether `v` names a live vertex of this graph
    pub fn contains(&self, v: Vertex) -> bool {
        self.graph.contains_node(v.0)
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// True if the graph has no vertices
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// True if the graph has at least one edge
    ///
    /// A graph with a single isolated vertex is neither empty nor has edges.
    pub fn has_edges(&self) -> bool {
        self.graph.edge_count() > 0
    }

    /// All vertices in insertion order
    pub fn vertices(&self) -> Vec<Vertex> {
        let mut vertices: Vec<Vertex> = self.graph.node_indices().map(Vertex).collect();
        self.sort_by_insertion(&mut vertices);
        vertices
    }

    /// Sort `vertices` oldest first and drop repeats
    pub fn sort_by_insertion(&self, vertices: &mut Vec<Vertex>) {
        vertices.sort_by_key(|&v| self.insertion_rank(v));
        vertices.dedup();
    }

    /// Position of `v` among all vertices ever added, `u64::MAX` if unknown
    pub(crate) fn insertion_rank(&self, v: Vertex) -> u64 {
        self.sequence.get(&v.0).copied().unwrap_or(u64::MAX)
    }

    /// All edges, in arena order
    pub fn edges(&self) -> Vec<Edge> {
        self.graph.edge_indices().map(Edge).collect()
    }

    /// Endpoints `(source, target)` of every edge, in arena order
    pub fn edge_pairs(&self) -> Vec<(Vertex, Vertex)> {
        self.graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .map(|(a, b)| (Vertex(a), Vertex(b)))
            .collect()
    }

    pub fn source(&self, e: Edge) -> Option<Vertex> {
        self.graph.edge_endpoints(e.0).map(|(a, _)| Vertex(a))
    }

    pub fn target(&self, e: Edge) -> Option<Vertex> {
        self.graph.edge_endpoints(e.0).map(|(_, b)| Vertex(b))
    }

    /// Properties of a vertex
    pub fn properties(&self, v: Vertex) -> Option<&V> {
        self.graph.node_weight(v.0)
    }

    /// Mutable properties of a vertex
    pub fn properties_mut(&mut self, v: Vertex) -> Option<&mut V> {
        self.graph.node_weight_mut(v.0)
    }

    /// Properties of an edge
    pub fn edge_properties(&self, e: Edge) -> Option<&E> {
        self.graph.edge_weight(e.0)
    }

    /// Mutable properties of an edge
    pub fn edge_properties_mut(&mut self, e: Edge) -> Option<&mut E> {
        self.graph.edge_weight_mut(e.0)
    }

    /// Replace the properties of an edge
    pub fn set_edge_properties(&mut self, e: Edge, props: E) {
        if let Some(weight) = self.graph.edge_weight_mut(e.0) {
            *weight = props;
        }
    }

    /// The first edge `from -> to`, if any
    pub fn edge_between(&self, from: Vertex, to: Vertex) -> Option<Edge> {
        self.graph.find_edge(from.0, to.0).map(Edge)
    }

    /// Properties of the first edge `from -> to`, if any
    pub fn properties_between(&self, from: Vertex, to: Vertex) -> Option<&E> {
        self.edge_between(from, to)
            .and_then(|e| self.graph.edge_weight(e.0))
    }

    /// Mutable properties of the first edge `from -> to`, if any
    pub fn properties_between_mut(&mut self, from: Vertex, to: Vertex) -> Option<&mut E> {
        let e = self.edge_between(from, to)?;
        self.graph.edge_weight_mut(e.0)
    }

    /// First vertex (in insertion order) whose properties satisfy `predicate`
    pub fn find_vertex<F>(&self, mut predicate: F) -> Option<Vertex>
    where
        F: FnMut(&V) -> bool,
    {
        self.vertices()
            .into_iter()
            .find(|&v| predicate(&self.graph[v.0]))
    }

    /// Incident edges of `v` selected by `flags`, in arena order
    pub fn edges_of(&self, v: Vertex, flags: AdjacencyFlags) -> Vec<Edge> {
        if !self.contains(v) {
            return Vec::new();
        }

        let mut edges: Vec<Edge> = self
            .directions(flags)
            .iter()
            .flat_map(|&dir| self.graph.edges_directed(v.0, dir).map(|e| Edge(e.id())))
            .collect();
        edges.sort();
        edges.dedup();
        edges
    }

    /// Neighbours of `v` across the edges selected by `flags`
    ///
    /// Sorted by vertex insertion order, each neighbour listed once.
    pub fn adjacent_vertices(&self, v: Vertex, flags: AdjacencyFlags) -> Vec<Vertex> {
        if !self.contains(v) {
            return Vec::new();
        }

        let mut neighbours: Vec<Vertex> = self
            .directions(flags)
            .iter()
            .flat_map(|&dir| self.graph.neighbors_directed(v.0, dir).map(Vertex))
            .collect();
        self.sort_by_insertion(&mut neighbours);
        neighbours
    }

    /// Whether `v` has any edge selected by `flags`
    pub fn has_edges_of(&self, v: Vertex, flags: AdjacencyFlags) -> bool {
        self.contains(v)
            && self
                .directions(flags)
                .iter()
                .any(|&dir| self.graph.edges_directed(v.0, dir).next().is_some())
    }

    pub fn out_degree(&self, v: Vertex) -> usize {
        self.edges_of(v, AdjacencyFlags::OutboundEdges).len()
    }

    pub fn in_degree(&self, v: Vertex) -> usize {
        self.edges_of(v, AdjacencyFlags::InboundEdges).len()
    }

    /// True if no edge leads from `v` towards an older version
    pub fn is_root(&self, v: Vertex) -> bool {
        !self.has_edges_of(v, AdjacencyFlags::EdgesToRoot)
    }

    /// True if no edge leads from `v` towards a newer version
    pub fn is_leaf(&self, v: Vertex) -> bool {
        !self.has_edges_of(v, AdjacencyFlags::EdgesToLeaf)
    }

    /// All root vertices, in insertion order
    pub fn roots(&self) -> Vec<Vertex> {
        self.vertices().into_iter().filter(|&v| self.is_root(v)).collect()
    }

    /// All leaf vertices, in insertion order
    pub fn leaves(&self) -> Vec<Vertex> {
        self.vertices().into_iter().filter(|&v| self.is_leaf(v)).collect()
    }

    /// Petgraph directions covered by `flags` under this graph's convention
    fn directions(&self, flags: AdjacencyFlags) -> Vec<Direction> {
        match flags {
            AdjacencyFlags::OutboundEdges => vec![Direction::Outgoing],
            AdjacencyFlags::InboundEdges => vec![Direction::Incoming],
            AdjacencyFlags::EdgesToRoot => vec![self.toward_root()],
            AdjacencyFlags::EdgesToLeaf => vec![self.toward_root().opposite()],
            AdjacencyFlags::AllEdges => vec![Direction::Outgoing, Direction::Incoming],
        }
    }

    fn toward_root(&self) -> Direction {
        match self.direction {
            MeaningOfDirection::ChildToParent => Direction::Outgoing,
            MeaningOfDirection::ParentToChild => Direction::Incoming,
        }
    }
}

/// Panics if the vertex is not part of the graph, like slice indexing
impl<V, E> Index<Vertex> for Graph<V, E> {
    type Output = V;

    fn index(&self, v: Vertex) -> &V {
        &self.graph[v.0]
    }
}

impl<V, E> IndexMut<Vertex> for Graph<V, E> {
    fn index_mut(&mut self, v: Vertex) -> &mut V {
        &mut self.graph[v.0]
    }
}

impl<V, E> Index<Edge> for Graph<V, E> {
    type Output = E;

    fn index(&self, e: Edge) -> &E {
        &self.graph[e.0]
    }
}

impl<V, E> IndexMut<Edge> for Graph<V, E> {
    fn index_mut(&mut self, e: Edge) -> &mut E {
        &mut self.graph[e.0]
    }
}
