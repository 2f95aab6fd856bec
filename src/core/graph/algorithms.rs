//! Algorithms over [`Graph`]: reduction, closure, ordering, paths and traversals.
//!
//! Every traversal copes with disconnected graphs. Where several results are
//! equally valid, the caller's comparator decides and insertion order breaks
//! remaining ties, so output is reproducible across runs.

use super::{AdjacencyFlags, Edge, Graph, MeaningOfDirection, Vertex};
use petgraph::algo::{dominators, toposort};
use petgraph::visit::Reversed;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use tracing::{debug, warn};

/// Visiting order for subgraph traversals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraversalOrder {
    DepthFirst,
    #[default]
    BreadthFirst,
}

/// A transitively reduced copy of a graph
#[derive(Debug, Clone)]
pub struct Reduction<V, E> {
    /// Same vertices (and handles) as the input, minimal edge set
    pub graph: Graph<V, E>,
    /// Edges of the input graph that were dropped
    pub removed_edges: Vec<Edge>,
}

/// Result of a breadth-first search
struct Search {
    start: Vertex,
    order: Vec<Vertex>,
    predecessors: HashMap<Vertex, Vertex>,
    distances: HashMap<Vertex, usize>,
}

impl Search {
    /// Path from the search start to `target`, both included
    fn path_to(&self, target: Vertex) -> Option<Vec<Vertex>> {
        if !self.distances.contains_key(&target) {
            return None;
        }

        let mut path = vec![target];
        let mut current = target;
        while current != self.start {
            current = *self.predecessors.get(&current)?;
            path.push(current);
        }
        path.reverse();
        Some(path)
    }
}

impl<V, E> Graph<V, E> {
    /// True if the graph contains no directed cycle
    pub fn is_dag(&self) -> bool {
        toposort(&self.graph, None).is_ok()
    }

    /// Vertices in topological order (every edge source before its target)
    ///
    /// Returns an empty list if the graph has a cycle.
    pub fn topological_sort(&self) -> Vec<Vertex> {
        match toposort(&self.graph, None) {
            Ok(order) => order.into_iter().map(Vertex).collect(),
            Err(cycle) => {
                debug!(vertex = cycle.node_id().index(), "Graph is not a DAG, no topological order");
                Vec::new()
            }
        }
    }

    /// Copy of the graph with the minimal edge set of equal reachability
    ///
    /// An edge `a -> c` is dropped when `c` is also reachable from `a` over
    /// another path, and parallel duplicates of a kept edge are dropped too.
    /// Returns `None` if the graph is not a DAG.
    pub fn transitive_reduction(&self) -> Option<Reduction<V, E>>
    where
        V: Clone,
        E: Clone,
    {
        if !self.is_dag() {
            warn!(vertices = self.vertex_count(), "Cannot reduce a graph that is not a DAG");
            return None;
        }

        let mut removed_edges = Vec::new();

        for v in self.vertices() {
            let mut indirect = HashSet::new();
            for w in self.adjacent_vertices(v, AdjacencyFlags::OutboundEdges) {
                indirect.extend(self.reachable(w, AdjacencyFlags::OutboundEdges));
            }

            let mut kept = HashSet::new();
            for e in self.edges_of(v, AdjacencyFlags::OutboundEdges) {
                let Some(target) = self.target(e) else {
                    continue;
                };

                if indirect.contains(&target) || !kept.insert(target) {
                    removed_edges.push(e);
                }
            }
        }

        let mut graph = self.clone();
        for &e in &removed_edges {
            graph.remove_edge(e);
        }

        Some(Reduction {
            graph,
            removed_edges,
        })
    }

    /// Copy of the graph with exactly one edge for every reachable pair
    ///
    /// Edges present in the input keep their properties, new ones get defaults.
    pub fn transitive_closure(&self) -> Graph<V, E>
    where
        V: Clone,
        E: Clone + Default,
    {
        let mut closure = self.clone();
        closure.graph.clear_edges();

        for v in self.vertices() {
            for w in self.reachable(v, AdjacencyFlags::OutboundEdges) {
                if w == v {
                    continue;
                }

                let props = self.properties_between(v, w).cloned().unwrap_or_default();
                closure.add_edge_with(v, w, props);
            }
        }

        closure
    }

    /// Shortest path from `from` to `to`, both included
    ///
    /// Follows edge direction first and falls back to the reverse direction,
    /// so a path between an old and a new version is found either way round.
    /// Empty if the two are not connected.
    pub fn shortest_path(&self, from: Vertex, to: Vertex) -> Vec<Vertex> {
        if !self.contains(from) || !self.contains(to) {
            return Vec::new();
        }

        [AdjacencyFlags::OutboundEdges, AdjacencyFlags::InboundEdges]
            .into_iter()
            .find_map(|flags| self.breadth_first(from, flags).path_to(to))
            .unwrap_or_default()
    }

    /// Edge count from `v` to every vertex, walking towards the leaves
    ///
    /// Every vertex of the graph has an entry; `None` marks unreachable ones.
    pub fn shortest_distances_from(&self, v: Vertex) -> BTreeMap<Vertex, Option<usize>> {
        let search = self.breadth_first(v, AdjacencyFlags::EdgesToLeaf);

        self.vertices()
            .into_iter()
            .map(|w| (w, search.distances.get(&w).copied()))
            .collect()
    }

    /// The longest path from a root to a leaf that passes through `v`
    ///
    /// Ordered root first. When several paths are equally long, the one whose
    /// vertices come first under `compare` wins. An isolated vertex yields
    /// just itself; a graph with cycles yields just `v`.
    pub fn longest_path_touching<F>(&self, v: Vertex, compare: F) -> Vec<Vertex>
    where
        F: Fn(&V, &V) -> Ordering,
    {
        if !self.contains(v) {
            return Vec::new();
        }

        if !self.is_dag() {
            warn!(vertex = %v, "No longest path in a graph that is not a DAG");
            return vec![v];
        }

        let mut path = self.longest_walk(v, AdjacencyFlags::EdgesToRoot, &compare);
        path.reverse();

        let towards_leaf = self.longest_walk(v, AdjacencyFlags::EdgesToLeaf, &compare);
        path.extend(towards_leaf.into_iter().skip(1));
        path
    }

    /// All vertices in depth-first order, starting at `start`
    ///
    /// Walks towards the leaves, visiting siblings in `compare` order.
    /// Vertices not reachable from `start` follow, each remaining root
    /// starting its own tree.
    pub fn vertices_depth_first_sorted<F>(&self, start: Vertex, compare: F) -> Vec<Vertex>
    where
        F: Fn(&V, &V) -> Ordering,
    {
        if !self.contains(start) {
            return Vec::new();
        }

        let mut visited = HashSet::new();
        let mut order = Vec::new();
        self.sorted_pre_order(start, &compare, &mut visited, &mut order);

        let mut remaining: Vec<Vertex> = self
            .vertices()
            .into_iter()
            .filter(|v| !visited.contains(v))
            .collect();
        remaining.sort_by(|&a, &b| self.order_by(a, b, &compare));
        remaining.sort_by_key(|&v| !self.is_root(v));

        for v in remaining {
            if !visited.contains(&v) {
                self.sorted_pre_order(v, &compare, &mut visited, &mut order);
            }
        }

        order
    }

    /// `v` and every vertex that can only be reached from `root` through `v`
    ///
    /// `root` is an ancestor of `v`; paths are followed towards the leaves.
    pub fn vertices_dominated_by(&self, v: Vertex, root: Vertex, order: TraversalOrder) -> Vec<Vertex> {
        if !self.contains(v) {
            return Vec::new();
        }

        let tree = self.dominator_tree(root);

        match order {
            TraversalOrder::DepthFirst => {
                let mut result = Vec::new();
                let mut stack = vec![v];
                while let Some(current) = stack.pop() {
                    result.push(current);
                    if let Some(children) = tree.get(&current) {
                        stack.extend(children.iter().rev());
                    }
                }
                result
            }
            TraversalOrder::BreadthFirst => {
                let mut result = Vec::new();
                let mut queue = VecDeque::from([v]);
                while let Some(current) = queue.pop_front() {
                    result.push(current);
                    if let Some(children) = tree.get(&current) {
                        queue.extend(children.iter());
                    }
                }
                result
            }
        }
    }

    /// Depth-first [`vertices_dominated_by`](Self::vertices_dominated_by),
    /// siblings visited in `compare` order
    pub fn vertices_dominated_by_depth_first_sorted<F>(&self, v: Vertex, root: Vertex, compare: F) -> Vec<Vertex>
    where
        F: Fn(&V, &V) -> Ordering,
    {
        if !self.contains(v) {
            return Vec::new();
        }

        let mut tree = self.dominator_tree(root);
        for children in tree.values_mut() {
            children.sort_by(|&a, &b| self.order_by(a, b, &compare));
        }

        let mut result = Vec::new();
        let mut stack = vec![v];
        while let Some(current) = stack.pop() {
            result.push(current);
            if let Some(children) = tree.get(&current) {
                stack.extend(children.iter().rev());
            }
        }
        result
    }

    /// Roots reachable from `v` towards the roots (`v` itself if it is one)
    pub fn roots_of(&self, v: Vertex) -> Vec<Vertex> {
        if !self.contains(v) {
            return Vec::new();
        }

        let mut roots: Vec<Vertex> = std::iter::once(v)
            .chain(self.reachable(v, AdjacencyFlags::EdgesToRoot))
            .filter(|&w| self.is_root(w))
            .collect();
        self.sort_by_insertion(&mut roots);
        roots
    }

    /// Leaves reachable from `v` towards the leaves (`v` itself if it is one)
    pub fn leaves_from(&self, v: Vertex) -> Vec<Vertex> {
        if !self.contains(v) {
            return Vec::new();
        }

        let mut leaves: Vec<Vertex> = std::iter::once(v)
            .chain(self.reachable(v, AdjacencyFlags::EdgesToLeaf))
            .filter(|&w| self.is_leaf(w))
            .collect();
        self.sort_by_insertion(&mut leaves);
        leaves
    }

    /// Vertices reachable from `start` over `flags` edges, `start` excluded
    /// unless it lies on a cycle. Sorted by insertion order.
    fn reachable(&self, start: Vertex, flags: AdjacencyFlags) -> Vec<Vertex> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([start]);

        while let Some(v) = queue.pop_front() {
            for w in self.adjacent_vertices(v, flags) {
                if seen.insert(w) {
                    queue.push_back(w);
                }
            }
        }

        let mut result: Vec<Vertex> = seen.into_iter().collect();
        self.sort_by_insertion(&mut result);
        result
    }

    fn breadth_first(&self, start: Vertex, flags: AdjacencyFlags) -> Search {
        let mut search = Search {
            start,
            order: Vec::new(),
            predecessors: HashMap::new(),
            distances: HashMap::new(),
        };

        if !self.contains(start) {
            return search;
        }

        search.distances.insert(start, 0);
        let mut queue = VecDeque::from([start]);

        while let Some(v) = queue.pop_front() {
            search.order.push(v);
            let distance = search.distances.get(&v).copied().unwrap_or(0);

            for w in self.adjacent_vertices(v, flags) {
                if !search.distances.contains_key(&w) {
                    search.distances.insert(w, distance + 1);
                    search.predecessors.insert(w, v);
                    queue.push_back(w);
                }
            }
        }

        search
    }

    /// Vertices reachable from `start` in depth-first post order
    fn post_order(&self, start: Vertex, flags: AdjacencyFlags) -> Vec<Vertex> {
        let mut visited = HashSet::from([start]);
        let mut finished = Vec::new();
        let mut stack = vec![(start, self.adjacent_vertices(start, flags), 0usize)];

        while let Some((v, neighbours, next)) = stack.last_mut() {
            let v = *v;
            let step = neighbours.get(*next).copied();
            *next += 1;

            match step {
                Some(w) => {
                    if visited.insert(w) {
                        let children = self.adjacent_vertices(w, flags);
                        stack.push((w, children, 0));
                    }
                }
                None => {
                    finished.push(v);
                    stack.pop();
                }
            }
        }

        finished
    }

    /// Longest walk from `start` over `flags` edges, `start` first
    ///
    /// Requires a DAG.
    fn longest_walk<F>(&self, start: Vertex, flags: AdjacencyFlags, compare: &F) -> Vec<Vertex>
    where
        F: Fn(&V, &V) -> Ordering,
    {
        let mut order = self.post_order(start, flags);
        order.reverse();

        let mut distance: HashMap<Vertex, usize> = HashMap::from([(start, 0)]);
        let mut predecessor: HashMap<Vertex, Vertex> = HashMap::new();

        for &u in &order {
            let Some(&du) = distance.get(&u) else {
                continue;
            };

            for w in self.adjacent_vertices(u, flags) {
                let candidate = du + 1;
                let better = match distance.get(&w) {
                    None => true,
                    Some(&dw) if candidate > dw => true,
                    Some(&dw) if candidate == dw => predecessor
                        .get(&w)
                        .map_or(true, |&p| self.order_by(u, p, compare) == Ordering::Less),
                    Some(_) => false,
                };

                if better {
                    distance.insert(w, candidate);
                    predecessor.insert(w, u);
                }
            }
        }

        let length = |v: &Vertex| distance.get(v).copied().unwrap_or(0);
        let end = order.iter().copied().fold(start, |best, u| {
            match length(&u).cmp(&length(&best)) {
                Ordering::Greater => u,
                Ordering::Equal if self.order_by(u, best, compare) == Ordering::Less => u,
                _ => best,
            }
        });

        let mut walk = vec![end];
        let mut current = end;
        while let Some(&p) = predecessor.get(&current) {
            walk.push(p);
            current = p;
        }
        walk.reverse();
        walk
    }

    /// Depth-first pre order towards the leaves, siblings in `compare` order
    fn sorted_pre_order<F>(
        &self,
        start: Vertex,
        compare: &F,
        visited: &mut HashSet<Vertex>,
        order: &mut Vec<Vertex>,
    ) where
        F: Fn(&V, &V) -> Ordering,
    {
        let mut stack = vec![start];

        while let Some(v) = stack.pop() {
            if !visited.insert(v) {
                continue;
            }
            order.push(v);

            let mut children = self.adjacent_vertices(v, AdjacencyFlags::EdgesToLeaf);
            children.retain(|c| !visited.contains(c));
            children.sort_by(|&a, &b| self.order_by(a, b, compare));
            stack.extend(children.into_iter().rev());
        }
    }

    /// Immediate-dominator children of every vertex reachable from `root`
    /// towards the leaves, in insertion order
    fn dominator_tree(&self, root: Vertex) -> HashMap<Vertex, Vec<Vertex>> {
        let mut children: HashMap<Vertex, Vec<Vertex>> = HashMap::new();

        if !self.contains(root) {
            return children;
        }

        let dominators = match self.direction {
            MeaningOfDirection::ChildToParent => dominators::simple_fast(Reversed(&self.graph), root.0),
            MeaningOfDirection::ParentToChild => dominators::simple_fast(&self.graph, root.0),
        };

        for v in self.vertices() {
            if let Some(d) = dominators.immediate_dominator(v.0) {
                children.entry(Vertex(d)).or_default().push(v);
            }
        }

        children
    }

    /// Comparator order on the payloads, insertion order on ties
    fn order_by<F>(&self, a: Vertex, b: Vertex, compare: &F) -> Ordering
    where
        F: Fn(&V, &V) -> Ordering,
    {
        compare(&self[a], &self[b]).then_with(|| self.insertion_rank(a).cmp(&self.insertion_rank(b)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type IdGraph = Graph<u32, ()>;

    /// Derivation pairs (child, parent) of a tree below 1 where 24 was
    /// derived from both 13 and 23. Edges commented with X survive reduction.
    const PAIRS: &[(u32, u32)] = &[
        (2, 1),  // X
        (3, 1),  // X
        (4, 1),  // X
        (5, 1),  // X
        (6, 1),  // X
        (7, 1),  // X
        (8, 1),
        (10, 1),
        (11, 1),
        (12, 1),
        (13, 1),
        (14, 1),
        (15, 1),
        (16, 1),
        (17, 1),
        (18, 1),
        (22, 4),
        (23, 4),
        (24, 4),
        (14, 5), // X
        (15, 6), // X
        (22, 1),
        (23, 1),
        (24, 1),
        (8, 2),  // X
        (9, 2),  // X
        (10, 2), // X
        (11, 4), // X
        (12, 4), // X
        (13, 4), // X
        (16, 7), // X
        (17, 7), // X
        (18, 7), // X
        (19, 9), // X
        (20, 9), // X
        (21, 9), // X
        (22, 12), // X
        (23, 12), // X
        (24, 13), // X
        (24, 23), // X
        (24, 4),
        (24, 1),
        (24, 12),
    ];

    fn build(pairs: &[(u32, u32)]) -> (IdGraph, HashMap<u32, Vertex>) {
        let mut graph = IdGraph::default();
        let mut by_id = HashMap::new();

        for &(child, parent) in pairs {
            let c = *by_id.entry(child).or_insert_with(|| graph.add_vertex_with(child));
            let p = *by_id.entry(parent).or_insert_with(|| graph.add_vertex_with(parent));
            graph.add_edge(c, p).unwrap();
        }

        (graph, by_id)
    }

    fn ids(graph: &IdGraph, vertices: &[Vertex]) -> Vec<u32> {
        vertices.iter().map(|&v| graph[v]).collect()
    }

    fn sorted_ids(graph: &IdGraph, vertices: &[Vertex]) -> Vec<u32> {
        let mut result = ids(graph, vertices);
        result.sort();
        result
    }

    fn id_pairs(graph: &IdGraph) -> Vec<(u32, u32)> {
        let mut pairs: Vec<(u32, u32)> = graph
            .edge_pairs()
            .into_iter()
            .map(|(a, b)| (graph[a], graph[b]))
            .collect();
        pairs.sort();
        pairs
    }

    fn by_id(a: &u32, b: &u32) -> Ordering {
        a.cmp(b)
    }

    fn reduced() -> (IdGraph, HashMap<u32, Vertex>) {
        let (graph, vertices) = build(PAIRS);
        (graph.transitive_reduction().unwrap().graph, vertices)
    }

    #[test]
    fn reduction_keeps_only_necessary_edges() {
        let (graph, _) = build(PAIRS);
        let reduction = graph.transitive_reduction().unwrap();
        let kept = id_pairs(&reduction.graph);

        assert_eq!(kept.len(), 24);
        assert!(kept.contains(&(24, 13)));
        assert!(kept.contains(&(24, 23)));
        assert!(!kept.contains(&(24, 1)));
        assert!(!kept.contains(&(24, 4)));
        assert!(!kept.contains(&(24, 12)));
        assert_eq!(reduction.removed_edges.len(), graph.edge_count() - 24);
    }

    #[test]
    fn reduction_preserves_reachability() {
        let (graph, _) = build(PAIRS);
        let reduction = graph.transitive_reduction().unwrap();

        assert_eq!(
            id_pairs(&reduction.graph.transitive_closure()),
            id_pairs(&graph.transitive_closure())
        );
    }

    #[test]
    fn reduction_drops_parallel_duplicates() {
        let (graph, _) = build(&[(2, 1), (2, 1)]);
        let reduction = graph.transitive_reduction().unwrap();

        assert_eq!(reduction.graph.edge_count(), 1);
        assert_eq!(reduction.removed_edges.len(), 1);
    }

    #[test]
    fn closure_contains_every_reachable_pair() {
        let (graph, _) = reduced();
        let closure = id_pairs(&graph.transitive_closure());

        assert!(closure.contains(&(7, 1)));
        assert!(closure.contains(&(9, 1)));
        assert!(closure.contains(&(19, 1)));
        assert!(closure.contains(&(24, 1)));
        assert!(!closure.contains(&(1, 24)));
    }

    #[test]
    fn cyclic_graph_cannot_be_reduced_or_sorted() {
        let (graph, _) = build(&[(2, 1), (3, 2), (1, 3)]);

        assert!(!graph.is_dag());
        assert!(graph.transitive_reduction().is_none());
        assert!(graph.topological_sort().is_empty());
    }

    #[test]
    fn topological_sort_puts_sources_first() {
        let (graph, vertices) = build(&[(2, 1), (3, 2)]);
        let order = graph.topological_sort();

        assert_eq!(order, vec![vertices[&3], vertices[&2], vertices[&1]]);
    }

    #[test]
    fn roots_and_leaves_of_reduced_graph() {
        let (graph, _) = reduced();

        assert_eq!(sorted_ids(&graph, &graph.roots()), vec![1]);
        assert_eq!(
            sorted_ids(&graph, &graph.leaves()),
            vec![3, 8, 10, 11, 14, 15, 16, 17, 18, 19, 20, 21, 22, 24]
        );
    }

    #[test]
    fn longest_path_through_a_vertex() {
        let (graph, vertices) = reduced();

        assert_eq!(
            ids(&graph, &graph.longest_path_touching(vertices[&18], by_id)),
            vec![1, 7, 18]
        );
        assert_eq!(
            ids(&graph, &graph.longest_path_touching(vertices[&24], by_id)),
            vec![1, 4, 12, 23, 24]
        );
    }

    #[test]
    fn longest_path_ties_follow_comparator() {
        let (graph, vertices) = build(&[(2, 1), (3, 1)]);

        let newest_first = graph.longest_path_touching(vertices[&1], |a: &u32, b: &u32| b.cmp(a));
        let oldest_first = graph.longest_path_touching(vertices[&1], by_id);

        assert_eq!(ids(&graph, &newest_first), vec![1, 3]);
        assert_eq!(ids(&graph, &oldest_first), vec![1, 2]);
    }

    #[test]
    fn equal_payloads_prefer_the_older_vertex() {
        let mut graph = IdGraph::default();
        let root = graph.add_vertex_with(0);
        let gone = graph.add_vertex_with(1);
        let older = graph.add_vertex_with(2);
        graph.remove(gone);
        let newer = graph.add_vertex_with(4);
        graph.add_edge(older, root).unwrap();
        graph.add_edge(newer, root).unwrap();

        let path = graph.longest_path_touching(root, |_: &u32, _: &u32| Ordering::Equal);

        assert_eq!(graph.vertices(), vec![root, older, newer]);
        assert_eq!(path, vec![root, older]);
    }

    #[test]
    fn longest_path_of_isolated_vertex_is_itself() {
        let mut graph = IdGraph::default();
        let v = graph.add_vertex_with(1);

        assert_eq!(graph.longest_path_touching(v, by_id), vec![v]);
    }

    #[test]
    fn dominated_subgraph_depth_first() {
        let (graph, vertices) = reduced();
        let subgraph = graph.vertices_dominated_by(vertices[&2], vertices[&1], TraversalOrder::DepthFirst);

        assert_eq!(sorted_ids(&graph, &subgraph), vec![2, 8, 9, 10, 19, 20, 21]);
    }

    #[test]
    fn dominated_subgraph_breadth_first() {
        let (graph, vertices) = reduced();
        let subgraph = ids(
            &graph,
            &graph.vertices_dominated_by(vertices[&4], vertices[&1], TraversalOrder::BreadthFirst),
        );

        let position = |id: u32| subgraph.iter().position(|&x| x == id).unwrap();
        assert!(position(22) > position(13));

        let mut sorted = subgraph.clone();
        sorted.sort();
        assert_eq!(sorted, vec![4, 11, 12, 13, 22, 23, 24]);
    }

    #[test]
    fn dominated_subgraph_sorted_depth_first() {
        let (graph, vertices) = reduced();
        let subgraph = graph.vertices_dominated_by_depth_first_sorted(vertices[&2], vertices[&1], by_id);

        assert_eq!(ids(&graph, &subgraph), vec![2, 8, 9, 19, 20, 21, 10]);
    }

    #[test]
    fn roots_of_and_leaves_from() {
        let (graph, vertices) = reduced();

        assert_eq!(sorted_ids(&graph, &graph.roots_of(vertices[&18])), vec![1]);
        assert_eq!(
            sorted_ids(&graph, &graph.leaves_from(vertices[&2])),
            vec![8, 10, 19, 20, 21]
        );
        assert_eq!(ids(&graph, &graph.leaves_from(vertices[&3])), vec![3]);
    }

    #[test]
    fn shortest_path_in_either_direction() {
        let (graph, vertices) = reduced();

        assert_eq!(
            ids(&graph, &graph.shortest_path(vertices[&19], vertices[&1])),
            vec![19, 9, 2, 1]
        );
        assert_eq!(
            ids(&graph, &graph.shortest_path(vertices[&1], vertices[&19])),
            vec![1, 2, 9, 19]
        );
        assert!(graph.shortest_path(vertices[&19], vertices[&20]).is_empty());
    }

    #[test]
    fn distances_mark_unreachable_vertices() {
        let (graph, vertices) = reduced();
        let distances = graph.shortest_distances_from(vertices[&2]);

        assert_eq!(distances.len(), graph.vertex_count());
        assert_eq!(distances[&vertices[&2]], Some(0));
        assert_eq!(distances[&vertices[&19]], Some(2));
        assert_eq!(distances[&vertices[&1]], None);
        assert_eq!(distances[&vertices[&24]], None);
    }

    #[test]
    fn depth_first_sorted_covers_disconnected_parts() {
        let (graph, vertices) = build(&[(2, 1), (3, 1), (5, 4)]);
        let order = ids(&graph, &graph.vertices_depth_first_sorted(vertices[&1], by_id));

        assert_eq!(order, vec![1, 2, 3, 4, 5]);
    }
}
