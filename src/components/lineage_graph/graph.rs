//! Full and drawn lineage graphs, and progressive expansion between them.

use std::collections::{HashMap, HashSet};

use log::debug;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef};

use super::types::{LineageEdge, RankDir};

/// Field attributes kept for every node of the full graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeInfo {
	pub id: String,
	pub label: String,
	pub parent: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeClass {
	/// Has outgoing edges, can be expanded.
	Inner,
	Leaf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeState {
	Hidden,
	Collapsed,
	Expanded,
}

/// Counts of what an expansion added to the drawn graph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Expansion {
	pub nodes: usize,
	pub edges: usize,
}

impl Expansion {
	pub fn is_empty(&self) -> bool {
		self.nodes == 0 && self.edges == 0
	}
}

/// Every node and edge received from the backend. Read-only once loaded.
#[derive(Debug, Default)]
pub struct FullGraph {
	graph: DiGraph<NodeInfo, ()>,
	index: HashMap<String, NodeIndex>,
}

impl FullGraph {
	fn from_edges(edges: &[LineageEdge]) -> Self {
		let mut full = Self::default();
		for edge in edges {
			let from = full.upsert(NodeInfo {
				id: edge.from.id.clone(),
				label: edge.from.label.clone(),
				parent: edge.from.parent.clone(),
			});
			let to = full.upsert(NodeInfo {
				id: edge.to.id.clone(),
				label: edge.to.label.clone(),
				parent: edge.to.parent.clone(),
			});
			full.graph.update_edge(from, to, ());
		}
		full
	}

	fn upsert(&mut self, info: NodeInfo) -> NodeIndex {
		match self.index.get(&info.id) {
			Some(&idx) => {
				self.graph[idx] = info;
				idx
			}
			None => {
				let id = info.id.clone();
				let idx = self.graph.add_node(info);
				self.index.insert(id, idx);
				idx
			}
		}
	}

	pub fn node(&self, id: &str) -> Option<&NodeInfo> {
		self.index.get(id).map(|&idx| &self.graph[idx])
	}

	pub fn node_count(&self) -> usize {
		self.graph.node_count()
	}

	pub fn edge_count(&self) -> usize {
		self.graph.edge_count()
	}

	/// Nodes without incoming edges, in insertion order.
	pub fn sources(&self) -> Vec<&str> {
		self.graph
			.node_indices()
			.filter(|&idx| {
				self.graph
					.neighbors_directed(idx, Direction::Incoming)
					.next()
					.is_none()
			})
			.map(|idx| self.graph[idx].id.as_str())
			.collect()
	}

	pub fn class(&self, id: &str) -> NodeClass {
		match self.index.get(id) {
			Some(&idx) if self.graph.edges(idx).next().is_some() => NodeClass::Inner,
			_ => NodeClass::Leaf,
		}
	}

	/// Out-edges of every node reachable from `id`, `id` included.
	///
	/// Each node is visited once, so cycles terminate.
	pub fn subtree_edges(&self, id: &str) -> Vec<(String, String)> {
		let Some(&start) = self.index.get(id) else {
			return Vec::new();
		};
		let mut edges = Vec::new();
		let mut dfs = Dfs::new(&self.graph, start);
		while let Some(nx) = dfs.next(&self.graph) {
			for edge in self.graph.edges(nx) {
				edges.push((
					self.graph[edge.source()].id.clone(),
					self.graph[edge.target()].id.clone(),
				));
			}
		}
		edges
	}
}

/// The part of the full graph currently on screen. Only ever grows.
#[derive(Debug, Default)]
pub struct DrawnGraph {
	graph: DiGraph<String, ()>,
	index: HashMap<String, NodeIndex>,
	clusters: Vec<String>,
	cluster_set: HashSet<String>,
	membership: HashMap<String, String>,
}

impl DrawnGraph {
	/// Returns true if the node was not drawn before.
	fn add_node(&mut self, id: &str) -> bool {
		if self.index.contains_key(id) {
			return false;
		}
		let idx = self.graph.add_node(id.to_string());
		self.index.insert(id.to_string(), idx);
		true
	}

	/// Returns true if the edge was not drawn before.
	fn add_edge(&mut self, from: &str, to: &str) -> bool {
		self.add_node(from);
		self.add_node(to);
		let (a, b) = (self.index[from], self.index[to]);
		if self.graph.contains_edge(a, b) {
			return false;
		}
		self.graph.add_edge(a, b, ());
		true
	}

	fn add_cluster(&mut self, cluster: &str) {
		if self.cluster_set.insert(cluster.to_string()) {
			self.clusters.push(cluster.to_string());
		}
	}

	fn set_parent(&mut self, id: &str, cluster: &str) {
		self.add_cluster(cluster);
		self.membership.insert(id.to_string(), cluster.to_string());
	}

	pub fn contains(&self, id: &str) -> bool {
		self.index.contains_key(id)
	}

	pub fn node_count(&self) -> usize {
		self.graph.node_count()
	}

	pub fn edge_count(&self) -> usize {
		self.graph.edge_count()
	}

	/// Drawn node ids in insertion order.
	pub fn node_ids(&self) -> impl Iterator<Item = &str> {
		self.graph.node_weights().map(String::as_str)
	}

	pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
		self.graph.edge_references().map(|e| {
			(
				self.graph[e.source()].as_str(),
				self.graph[e.target()].as_str(),
			)
		})
	}

	/// Drawn nodes adjacent to `id` in either direction.
	pub fn neighbors(&self, id: &str) -> Vec<&str> {
		let Some(&idx) = self.index.get(id) else {
			return Vec::new();
		};
		self.graph
			.neighbors_undirected(idx)
			.map(|n| self.graph[n].as_str())
			.collect()
	}

	/// Cluster ids in the order they were first drawn.
	pub fn clusters(&self) -> &[String] {
		&self.clusters
	}

	pub fn cluster_of(&self, id: &str) -> Option<&str> {
		self.membership.get(id).map(String::as_str)
	}
}

/// A lineage graph that starts at its sources and is unfolded on demand.
#[derive(Debug, Default)]
pub struct LineageGraph {
	rankdir: RankDir,
	full: FullGraph,
	drawn: DrawnGraph,
	expanded: HashSet<String>,
}

impl LineageGraph {
	pub fn new(rankdir: RankDir) -> Self {
		Self {
			rankdir,
			..Self::default()
		}
	}

	/// Loads the edge list and draws its sources. A second call starts over.
	pub fn set_data(&mut self, edges: &[LineageEdge]) -> Vec<String> {
		self.full = FullGraph::from_edges(edges);
		self.drawn = DrawnGraph::default();
		self.expanded.clear();

		let sources: Vec<String> = self.full.sources().into_iter().map(String::from).collect();
		for id in &sources {
			self.add_source_node(id);
		}
		debug!(
			"lineage loaded: {} nodes, {} edges, {} sources",
			self.full.node_count(),
			self.full.edge_count(),
			sources.len()
		);
		sources
	}

	fn add_source_node(&mut self, id: &str) {
		self.drawn.add_node(id);
		if let Some(parent) = self.full.node(id).map(|n| n.parent.clone()) {
			self.drawn.set_parent(id, &parent);
		}
	}

	/// Reveals the whole descendant subtree of a drawn, non-leaf node.
	pub fn expand(&mut self, id: &str) -> Expansion {
		if !self.is_expandable(id) {
			return Expansion::default();
		}
		let before = self.drawn.node_count();
		let mut added = Expansion::default();
		for (from, to) in self.full.subtree_edges(id) {
			if self.drawn.add_edge(&from, &to) {
				added.edges += 1;
			}
			if let Some(parent) = self.full.node(&to).map(|n| n.parent.clone()) {
				self.drawn.set_parent(&to, &parent);
			}
		}
		added.nodes = self.drawn.node_count() - before;
		self.expanded.insert(id.to_string());
		debug!("expanded {id}: +{} nodes, +{} edges", added.nodes, added.edges);
		added
	}

	pub fn node_state(&self, id: &str) -> NodeState {
		if !self.drawn.contains(id) {
			NodeState::Hidden
		} else if self.expanded.contains(id) {
			NodeState::Expanded
		} else {
			NodeState::Collapsed
		}
	}

	pub fn is_leaf(&self, id: &str) -> bool {
		self.full.class(id) == NodeClass::Leaf
	}

	/// Drawn and not a leaf: clicking it may reveal more.
	pub fn is_expandable(&self, id: &str) -> bool {
		self.drawn.contains(id) && !self.is_leaf(id)
	}

	pub fn label_of(&self, id: &str) -> Option<&str> {
		self.full.node(id).map(|n| n.label.as_str())
	}

	pub fn rankdir(&self) -> RankDir {
		self.rankdir
	}

	pub fn full(&self) -> &FullGraph {
		&self.full
	}

	pub fn drawn(&self) -> &DrawnGraph {
		&self.drawn
	}
}


#[cfg(test)]
mod proptests {
	use std::collections::BTreeSet;

	use proptest::prelude::*;

	use super::tests::edge;
	use super::*;
	use crate::components::lineage_graph::layout::{Layout, LayoutSpacing};

	const IDS: [&str; 8] = ["A", "B", "C", "D", "E", "F", "G", "H"];

	/// Small id alphabet so that shared nodes, self loops and cycles are common.
	fn arb_edges() -> impl Strategy<Value = Vec<LineageEdge>> {
		prop::collection::vec((0..IDS.len(), 0..IDS.len()), 0..24).prop_map(|pairs| {
			pairs
				.into_iter()
				.map(|(a, b)| edge(IDS[a], IDS[b]))
				.collect()
		})
	}

	fn arb_clicks() -> impl Strategy<Value = Vec<&'static str>> {
		prop::collection::vec(0..IDS.len(), 0..12)
			.prop_map(|picks| picks.into_iter().map(|i| IDS[i]).collect())
	}

	fn arb_rankdir() -> impl Strategy<Value = RankDir> {
		prop_oneof![
			Just(RankDir::TopBottom),
			Just(RankDir::BottomTop),
			Just(RankDir::LeftRight),
			Just(RankDir::RightLeft),
		]
	}

	fn pairs(edges: &[LineageEdge]) -> BTreeSet<(String, String)> {
		edges
			.iter()
			.map(|e| (e.from.id.clone(), e.to.id.clone()))
			.collect()
	}

	/// Nodes reachable from `start` over `edges`, `start` included.
	fn reachable(edges: &BTreeSet<(String, String)>, start: &str) -> BTreeSet<String> {
		let mut seen = BTreeSet::from([start.to_string()]);
		let mut stack = vec![start.to_string()];
		while let Some(id) = stack.pop() {
			for (_, to) in edges.iter().filter(|(from, _)| *from == id) {
				if seen.insert(to.clone()) {
					stack.push(to.clone());
				}
			}
		}
		seen
	}

	fn drawn_nodes(g: &LineageGraph) -> BTreeSet<String> {
		g.drawn().node_ids().map(String::from).collect()
	}

	fn drawn_edges(g: &LineageGraph) -> BTreeSet<(String, String)> {
		g.drawn()
			.edges()
			.map(|(a, b)| (a.to_string(), b.to_string()))
			.collect()
	}

	fn assert_clustered(g: &LineageGraph) -> Result<(), TestCaseError> {
		for id in g.drawn().node_ids() {
			let expected = format!("table_{id}");
			prop_assert_eq!(g.drawn().cluster_of(id), Some(expected.as_str()));
			prop_assert!(g.drawn().clusters().contains(&expected));
		}
		Ok(())
	}

	proptest! {
		#[test]
		fn load_draws_exactly_the_sources(edges in arb_edges(), rankdir in arb_rankdir()) {
			let all = pairs(&edges);
			let targets: BTreeSet<String> = all.iter().map(|(_, to)| to.clone()).collect();
			let sources: BTreeSet<String> = all
				.iter()
				.map(|(from, _)| from.clone())
				.filter(|id| !targets.contains(id))
				.collect();

			let mut g = LineageGraph::new(rankdir);
			let returned: BTreeSet<String> = g.set_data(&edges).into_iter().collect();

			prop_assert_eq!(&returned, &sources);
			prop_assert_eq!(drawn_nodes(&g), sources);
			prop_assert_eq!(g.drawn().edge_count(), 0);
			for id in g.drawn().node_ids() {
				prop_assert!(g.full().node(id).is_some());
			}
			assert_clustered(&g)?;
		}

		#[test]
		fn clicks_add_exactly_the_reachable_edges(
			edges in arb_edges(),
			clicks in arb_clicks(),
			rankdir in arb_rankdir()
		) {
			let all = pairs(&edges);
			let mut g = LineageGraph::new(rankdir);
			g.set_data(&edges);

			for id in clicks {
				let (nodes_before, edges_before) = (drawn_nodes(&g), drawn_edges(&g));
				let expandable = g.is_expandable(id);
				let added = g.expand(id);
				let (nodes_after, edges_after) = (drawn_nodes(&g), drawn_edges(&g));

				if expandable {
					let from = reachable(&all, id);
					let mut expected_edges = edges_before.clone();
					expected_edges.extend(all.iter().filter(|(a, _)| from.contains(a)).cloned());
					let mut expected_nodes = nodes_before.clone();
					expected_nodes.extend(expected_edges.iter().map(|(_, b)| b.clone()));

					prop_assert_eq!(&edges_after, &expected_edges);
					prop_assert_eq!(&nodes_after, &expected_nodes);
					prop_assert_eq!(added.edges, edges_after.len() - edges_before.len());
					prop_assert_eq!(added.nodes, nodes_after.len() - nodes_before.len());
					prop_assert_eq!(g.node_state(id), NodeState::Expanded);
					prop_assert!(g.expand(id).is_empty());
				} else {
					prop_assert!(added.is_empty());
					prop_assert_eq!(&nodes_after, &nodes_before);
					prop_assert_eq!(&edges_after, &edges_before);
				}

				prop_assert!(nodes_before.is_subset(&nodes_after));
				prop_assert!(edges_before.is_subset(&edges_after));
				prop_assert!(edges_after.is_subset(&all));
				assert_clustered(&g)?;
			}

			let layout = Layout::compute(&g, &LayoutSpacing::default());
			prop_assert_eq!(layout.nodes.len(), g.drawn().node_count());
			prop_assert_eq!(layout.edges.len(), g.drawn().edge_count());
		}
	}
}
