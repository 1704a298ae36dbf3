use std::collections::{HashMap, HashSet};

use log::info;

use super::graph::{LineageGraph, NodeState};
use super::layout::{Layout, LayoutSpacing, Rect, cluster_rect};
use super::types::{LineageEdge, RankDir};

/// Seconds a relayout takes to move nodes to their new places.
pub const TRANSITION_SECS: f64 = 0.512;

/// Canvas size. Grows to fit the content, never shrinks.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Surface {
	pub width: f64,
	pub height: f64,
}

#[derive(Clone, Debug, Default)]
pub struct HoverState {
	pub node: Option<String>,
	pub neighbors: HashSet<String>,
	pub highlight_t: f64,
	pub prev_node: Option<String>,
	pub prev_neighbors: HashSet<String>,
}

/// Node rectangles at the start of the running transition.
#[derive(Clone, Debug, Default)]
pub struct Transition {
	pub from: HashMap<String, Rect>,
	pub t: f64,
}

pub struct LineageGraphState {
	pub graph: LineageGraph,
	pub spacing: LayoutSpacing,
	pub layout: Layout,
	pub transition: Transition,
	pub hover: HoverState,
	pub surface: Surface,
	pub dirty: bool,
}

impl LineageGraphState {
	pub fn new(rankdir: RankDir) -> Self {
		Self {
			graph: LineageGraph::new(rankdir),
			spacing: LayoutSpacing::default(),
			layout: Layout::default(),
			transition: Transition {
				from: HashMap::new(),
				t: 1.0,
			},
			hover: HoverState::default(),
			surface: Surface::default(),
			dirty: true,
		}
	}

	pub fn set_data(&mut self, edges: &[LineageEdge]) {
		let sources = self.graph.set_data(edges);
		info!(
			"{} lineage: {} edges, {} sources drawn",
			self.graph.rankdir(),
			edges.len(),
			sources.len()
		);
		self.layout = Layout::default();
		self.hover = HoverState::default();
		self.relayout();
	}

	/// Expands the node under `(x, y)`. Returns true if anything was revealed.
	pub fn click_at(&mut self, x: f64, y: f64) -> bool {
		let Some(id) = self.expandable_at(x, y) else {
			return false;
		};
		let was_expanded = self.graph.node_state(&id) == NodeState::Expanded;
		let added = self.graph.expand(&id);
		if added.is_empty() {
			// First click on an already revealed subtree still marks the node expanded.
			if !was_expanded {
				self.relayout();
			}
			return false;
		}
		info!("{id}: revealed {} nodes, {} edges", added.nodes, added.edges);
		self.relayout();
		true
	}

	/// Recomputes the layout of the drawn graph and starts a transition to it.
	pub fn relayout(&mut self) {
		let from = self
			.layout
			.nodes
			.iter()
			.enumerate()
			.map(|(i, n)| (n.id.clone(), self.node_rect(i)))
			.collect();
		self.layout = Layout::compute(&self.graph, &self.spacing);
		self.transition = Transition { from, t: 0.0 };
		if let Some(hovered) = self.hover.node.clone() {
			self.hover.neighbors = self.neighbors_of(&hovered);
		}
		self.fit_surface();
		self.dirty = true;
	}

	/// Grows the surface to the layout's bounding box. Returns true on change.
	pub fn fit_surface(&mut self) -> bool {
		let (width, height) = (
			self.surface.width.max(self.layout.width.ceil()),
			self.surface.height.max(self.layout.height.ceil()),
		);
		if width == self.surface.width && height == self.surface.height {
			return false;
		}
		self.surface = Surface { width, height };
		true
	}

	/// Eased progress of the running transition.
	pub fn progress(&self) -> f64 {
		ease_in_out_cubic(self.transition.t.clamp(0.0, 1.0))
	}

	/// Current, possibly mid-transition, rectangle of layout node `i`.
	pub fn node_rect(&self, i: usize) -> Rect {
		let node = &self.layout.nodes[i];
		match self.transition.from.get(&node.id) {
			Some(start) if self.transition.t < 1.0 => start.lerp(&node.rect, self.progress()),
			_ => node.rect,
		}
	}

	/// Current rectangle of cluster `ci`, following its moving members.
	pub fn cluster_rect(&self, ci: usize) -> Rect {
		let cluster = &self.layout.clusters[ci];
		cluster_rect(cluster.members.iter().map(|&m| self.node_rect(m)), &self.spacing)
			.unwrap_or(cluster.rect)
	}

	/// Nodes revealed by the running transition fade in.
	pub fn node_alpha(&self, i: usize) -> f64 {
		if self.transition.from.contains_key(&self.layout.nodes[i].id) {
			1.0
		} else {
			self.progress()
		}
	}

	pub fn node_at_position(&self, x: f64, y: f64) -> Option<usize> {
		(0..self.layout.nodes.len())
			.rev()
			.find(|&i| self.node_rect(i).contains(x, y))
	}

	pub fn expandable_at(&self, x: f64, y: f64) -> Option<String> {
		let i = self.node_at_position(x, y)?;
		let id = &self.layout.nodes[i].id;
		self.graph.is_expandable(id).then(|| id.clone())
	}

	fn neighbors_of(&self, id: &str) -> HashSet<String> {
		self.graph
			.drawn()
			.neighbors(id)
			.into_iter()
			.map(String::from)
			.collect()
	}

	pub fn set_hover(&mut self, node: Option<String>) {
		if self.hover.node == node {
			return;
		}
		let was_hovering = self.hover.node.is_some();

		// Keep the previous highlight around while it fades out.
		if was_hovering && node.is_none() {
			self.hover.prev_node = self.hover.node.take();
			self.hover.prev_neighbors = std::mem::take(&mut self.hover.neighbors);
		} else {
			self.hover.prev_node = None;
			self.hover.prev_neighbors.clear();
		}

		self.hover.neighbors = match &node {
			Some(id) => self.neighbors_of(id),
			None => HashSet::new(),
		};
		self.hover.node = node;
		self.dirty = true;
	}

	pub fn is_highlighted(&self, id: &str) -> bool {
		self.hover.node.as_deref() == Some(id)
			|| self.hover.neighbors.contains(id)
			|| self.hover.prev_node.as_deref() == Some(id)
			|| self.hover.prev_neighbors.contains(id)
	}

	pub fn is_hovered(&self, id: &str) -> bool {
		self.hover.node.as_deref() == Some(id) || self.hover.prev_node.as_deref() == Some(id)
	}

	pub fn has_active_highlight(&self) -> bool {
		self.hover.node.is_some() || self.hover.prev_node.is_some()
	}

	/// Advances the transition and the hover fade by `dt` seconds.
	pub fn tick(&mut self, dt: f64) {
		if self.transition.t < 1.0 {
			self.transition.t = (self.transition.t + dt / TRANSITION_SECS).min(1.0);
			self.dirty = true;
			if self.transition.t >= 1.0 {
				self.fit_surface();
			}
		}

		let (target, speed) = if self.hover.node.is_some() {
			(1.0, 6.0)
		} else {
			(0.0, 4.0)
		};
		let before = self.hover.highlight_t;
		self.hover.highlight_t += (target - self.hover.highlight_t) * (speed * dt).min(1.0);
		if self.hover.node.is_none() && self.hover.highlight_t < 0.01 {
			self.hover.highlight_t = 0.0;
			self.hover.prev_node = None;
			self.hover.prev_neighbors.clear();
		}
		if (self.hover.highlight_t - before).abs() > f64::EPSILON {
			self.dirty = true;
		}
	}
}

fn ease_in_out_cubic(t: f64) -> f64 {
	if t < 0.5 {
		4.0 * t * t * t
	} else {
		1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::lineage_graph::graph::tests::edge;

	fn settled(rankdir: RankDir, edges: &[LineageEdge]) -> LineageGraphState {
		let mut state = LineageGraphState::new(rankdir);
		state.set_data(edges);
		finish(&mut state);
		state
	}

	fn finish(state: &mut LineageGraphState) {
		for _ in 0..64 {
			state.tick(0.016);
		}
		assert!(state.transition.t >= 1.0);
	}

	fn index_of(state: &LineageGraphState, id: &str) -> usize {
		state.layout.nodes.iter().position(|n| n.id == id).unwrap()
	}

	fn center_of(state: &LineageGraphState, id: &str) -> (f64, f64) {
		let i = index_of(state, id);
		state.node_rect(i).center()
	}

	#[test]
	fn clicking_a_source_reveals_its_subtree() {
		let mut state = settled(RankDir::LeftRight, &[edge("A", "B"), edge("B", "C")]);
		assert_eq!(state.layout.nodes.len(), 1);

		let (x, y) = center_of(&state, "A");
		assert!(state.click_at(x, y));
		assert_eq!(state.layout.nodes.len(), 3);
		assert_eq!(state.graph.node_state("A"), NodeState::Expanded);
		assert!(state.transition.t < 1.0);
	}

	#[test]
	fn clicks_on_leaves_and_background_do_nothing() {
		let mut state = settled(RankDir::LeftRight, &[edge("A", "B")]);
		let (x, y) = center_of(&state, "A");
		state.click_at(x, y);
		finish(&mut state);

		let (lx, ly) = center_of(&state, "B");
		assert!(state.expandable_at(lx, ly).is_none());
		assert!(!state.click_at(lx, ly));
		assert!(!state.click_at(-50.0, -50.0));
		assert_eq!(state.layout.nodes.len(), 2);
	}

	#[test]
	fn second_click_changes_nothing() {
		let mut state = settled(RankDir::TopBottom, &[edge("A", "B"), edge("B", "C")]);
		let (x, y) = center_of(&state, "A");
		assert!(state.click_at(x, y));
		finish(&mut state);
		let before = state.layout.clone();

		let (x, y) = center_of(&state, "A");
		assert!(!state.click_at(x, y));
		assert_eq!(state.layout, before);
	}

	#[test]
	fn surface_only_grows() {
		let mut state = settled(RankDir::LeftRight, &[edge("A", "B"), edge("A", "C")]);
		let initial = state.surface;
		assert!(initial.width >= state.layout.width && initial.height >= state.layout.height);

		let (x, y) = center_of(&state, "A");
		state.click_at(x, y);
		finish(&mut state);
		let grown = state.surface;
		assert!(grown.width > initial.width);
		assert!(grown.height >= initial.height);

		state.set_data(&[edge("X", "Y")]);
		finish(&mut state);
		assert_eq!(state.surface, grown);
		assert!(!state.fit_surface());
	}

	#[test]
	fn nodes_move_from_their_old_place() {
		let mut state = settled(RankDir::LeftRight, &[edge("A", "B"), edge("C", "B")]);
		let start = state.node_rect(index_of(&state, "A"));
		let (x, y) = start.center();
		state.click_at(x, y);

		let i = index_of(&state, "A");
		assert_eq!(state.node_rect(i), start);
		let b = index_of(&state, "B");
		assert_eq!(state.node_alpha(b), 0.0);
		finish(&mut state);
		assert_eq!(state.node_rect(i), state.layout.nodes[i].rect);
		assert_eq!(state.node_alpha(b), 1.0);
	}

	#[test]
	fn hover_highlights_drawn_neighbors_and_fades() {
		let mut state = settled(RankDir::LeftRight, &[edge("A", "B"), edge("B", "C")]);
		let (x, y) = center_of(&state, "A");
		state.click_at(x, y);
		finish(&mut state);

		state.set_hover(Some("B".into()));
		assert!(state.is_hovered("B"));
		assert!(state.is_highlighted("A") && state.is_highlighted("C"));
		state.tick(0.5);
		assert!(state.hover.highlight_t > 0.9);

		state.set_hover(None);
		assert!(state.has_active_highlight());
		assert!(state.is_highlighted("C"));
		for _ in 0..120 {
			state.tick(0.016);
		}
		assert!(!state.has_active_highlight());
		assert_eq!(state.hover.highlight_t, 0.0);
	}

	#[test]
	fn cluster_rect_follows_members() {
		let state = settled(RankDir::LeftRight, &[edge("A", "B")]);
		let rect = state.cluster_rect(0);
		let node = state.node_rect(0);
		assert!(rect.contains(node.x, node.y) && rect.contains(node.right(), node.bottom()));
		let laid_out = state.layout.clusters[0].rect;
		assert!((rect.x - laid_out.x).abs() < 1e-9 && (rect.y - laid_out.y).abs() < 1e-9);
		assert!((rect.width - laid_out.width).abs() < 1e-9);
	}
}
