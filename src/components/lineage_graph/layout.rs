//! Layered layout of the drawn graph with table clusters.
//!
//! Ranks come from longest-path layering, rank order from barycenter sweeps
//! that keep cluster members next to each other, and coordinates from the
//! rank direction. Edges are straight segments between node borders.

use std::collections::HashMap;

use super::graph::{LineageGraph, NodeClass, NodeState};
use super::types::RankDir;

/// Sizes and gaps, in canvas pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutSpacing {
	pub node_height: f64,
	pub min_node_width: f64,
	/// Approximate advance of one label character.
	pub char_width: f64,
	pub node_padding: f64,
	pub node_gap: f64,
	pub rank_gap: f64,
	pub cluster_padding: f64,
	/// Height reserved above the members for the cluster title.
	pub cluster_title: f64,
	pub cluster_gap: f64,
	pub margin: f64,
	pub sweeps: usize,
}

impl Default for LayoutSpacing {
	fn default() -> Self {
		Self {
			node_height: 28.0,
			min_node_width: 60.0,
			char_width: 7.0,
			node_padding: 10.0,
			node_gap: 14.0,
			rank_gap: 64.0,
			cluster_padding: 10.0,
			cluster_title: 18.0,
			cluster_gap: 12.0,
			margin: 12.0,
			sweeps: 2,
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
	pub x: f64,
	pub y: f64,
	pub width: f64,
	pub height: f64,
}

impl Rect {
	pub fn center(&self) -> (f64, f64) {
		(self.x + self.width / 2.0, self.y + self.height / 2.0)
	}

	pub fn right(&self) -> f64 {
		self.x + self.width
	}

	pub fn bottom(&self) -> f64 {
		self.y + self.height
	}

	pub fn contains(&self, px: f64, py: f64) -> bool {
		px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
	}

	pub fn union(&self, other: &Rect) -> Rect {
		let (x, y) = (self.x.min(other.x), self.y.min(other.y));
		Rect {
			x,
			y,
			width: self.right().max(other.right()) - x,
			height: self.bottom().max(other.bottom()) - y,
		}
	}

	/// Linear interpolation towards `other`, `t` in `0..=1`.
	pub fn lerp(&self, other: &Rect, t: f64) -> Rect {
		let mix = |a: f64, b: f64| a + (b - a) * t;
		Rect {
			x: mix(self.x, other.x),
			y: mix(self.y, other.y),
			width: mix(self.width, other.width),
			height: mix(self.height, other.height),
		}
	}

	/// Point where the segment from the centre towards `(tx, ty)` leaves the rectangle.
	pub fn boundary_toward(&self, tx: f64, ty: f64) -> (f64, f64) {
		let (cx, cy) = self.center();
		let (dx, dy) = (tx - cx, ty - cy);
		if dx.abs() < f64::EPSILON && dy.abs() < f64::EPSILON {
			return (cx, cy);
		}
		let sx = if dx.abs() > f64::EPSILON {
			self.width / 2.0 / dx.abs()
		} else {
			f64::INFINITY
		};
		let sy = if dy.abs() > f64::EPSILON {
			self.height / 2.0 / dy.abs()
		} else {
			f64::INFINITY
		};
		let s = sx.min(sy).min(1.0);
		(cx + dx * s, cy + dy * s)
	}

	fn translate(&mut self, dx: f64, dy: f64) {
		self.x += dx;
		self.y += dy;
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeBox {
	pub id: String,
	pub label: String,
	pub rect: Rect,
	pub class: NodeClass,
	pub state: NodeState,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClusterBox {
	pub id: String,
	/// Indices into [`Layout::nodes`].
	pub members: Vec<usize>,
	pub rect: Rect,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Layout {
	pub nodes: Vec<NodeBox>,
	pub clusters: Vec<ClusterBox>,
	/// Pairs of indices into [`Layout::nodes`].
	pub edges: Vec<(usize, usize)>,
	pub width: f64,
	pub height: f64,
}

impl Layout {
	/// Lays out everything currently drawn in `graph`.
	pub fn compute(graph: &LineageGraph, spacing: &LayoutSpacing) -> Layout {
		let drawn = graph.drawn();
		let ids: Vec<&str> = drawn.node_ids().collect();
		let n = ids.len();
		if n == 0 {
			return Layout::default();
		}
		let position: HashMap<&str, usize> = ids
			.iter()
			.enumerate()
			.map(|(i, &id)| (id, i))
			.collect();

		let mut adj = vec![Vec::new(); n];
		let mut rev = vec![Vec::new(); n];
		let mut edges = Vec::with_capacity(drawn.edge_count());
		for (from, to) in drawn.edges() {
			let (a, b) = (position[from], position[to]);
			adj[a].push(b);
			rev[b].push(a);
			edges.push((a, b));
		}

		let cluster_rank: HashMap<&str, usize> = drawn
			.clusters()
			.iter()
			.enumerate()
			.map(|(i, c)| (c.as_str(), i))
			.collect();
		let cluster_of: Vec<Option<usize>> = ids
			.iter()
			.map(|&id| drawn.cluster_of(id).and_then(|c| cluster_rank.get(c).copied()))
			.collect();

		let ranks = assign_ranks(&adj, &rev);
		let mut rank_order = build_rank_buckets(&ranks, &cluster_of);
		for _ in 0..spacing.sweeps {
			for r in 1..rank_order.len() {
				let scored = score(&rank_order[r - 1], &rank_order[r], &rev, n);
				rank_order[r] = sort_by_cluster(scored, &cluster_of);
			}
			for r in (0..rank_order.len().saturating_sub(1)).rev() {
				let scored = score(&rank_order[r + 1], &rank_order[r], &adj, n);
				rank_order[r] = sort_by_cluster(scored, &cluster_of);
			}
		}

		let sizes: Vec<(f64, f64)> = ids
			.iter()
			.map(|&id| {
				let chars = graph.label_of(id).unwrap_or(id).chars().count() as f64;
				(
					(chars * spacing.char_width + 2.0 * spacing.node_padding)
						.max(spacing.min_node_width),
					spacing.node_height,
				)
			})
			.collect();
		let mut rects = assign_coordinates(
			&rank_order,
			&cluster_of,
			&sizes,
			graph.rankdir(),
			spacing,
		);

		let mut clusters: Vec<ClusterBox> = drawn
			.clusters()
			.iter()
			.enumerate()
			.filter_map(|(ci, id)| {
				let members: Vec<usize> =
					(0..n).filter(|&i| cluster_of[i] == Some(ci)).collect();
				let rect = cluster_rect(members.iter().map(|&i| rects[i]), spacing)?;
				Some(ClusterBox {
					id: id.clone(),
					members,
					rect,
				})
			})
			.collect();

		// Shift the content so its top-left corner sits on the margin.
		let bounds = rects
			.iter()
			.chain(clusters.iter().map(|c| &c.rect))
			.fold(None, |acc: Option<Rect>, r| Some(acc.map_or(*r, |a| a.union(r))))
			.unwrap_or_default();
		let (dx, dy) = (spacing.margin - bounds.x, spacing.margin - bounds.y);
		rects.iter_mut().for_each(|r| r.translate(dx, dy));
		clusters.iter_mut().for_each(|c| c.rect.translate(dx, dy));

		let nodes = ids
			.iter()
			.enumerate()
			.map(|(i, &id)| NodeBox {
				id: id.to_string(),
				label: graph.label_of(id).unwrap_or(id).to_string(),
				rect: rects[i],
				class: graph.full().class(id),
				state: graph.node_state(id),
			})
			.collect();

		Layout {
			nodes,
			clusters,
			edges,
			width: bounds.width + 2.0 * spacing.margin,
			height: bounds.height + 2.0 * spacing.margin,
		}
	}
}

/// Bounding box of a cluster around member rectangles, title on top.
pub fn cluster_rect(
	members: impl Iterator<Item = Rect>,
	spacing: &LayoutSpacing,
) -> Option<Rect> {
	let bounds = members.reduce(|a, b| a.union(&b))?;
	let pad = spacing.cluster_padding;
	Some(Rect {
		x: bounds.x - pad,
		y: bounds.y - pad - spacing.cluster_title,
		width: bounds.width + 2.0 * pad,
		height: bounds.height + 2.0 * pad + spacing.cluster_title,
	})
}

/// Longest-path layering. Nodes stuck in a cycle go one rank past the rest.
fn assign_ranks(adj: &[Vec<usize>], rev: &[Vec<usize>]) -> Vec<usize> {
	let n = adj.len();
	let mut in_degree: Vec<usize> = rev.iter().map(Vec::len).collect();
	let mut queue: Vec<usize> = (0..n).filter(|&v| in_degree[v] == 0).collect();
	let mut ranks = vec![0usize; n];
	let mut placed = vec![false; n];

	let mut head = 0;
	while head < queue.len() {
		let u = queue[head];
		head += 1;
		placed[u] = true;
		for &v in &adj[u] {
			ranks[v] = ranks[v].max(ranks[u] + 1);
			in_degree[v] -= 1;
			if in_degree[v] == 0 {
				queue.push(v);
			}
		}
	}

	if queue.len() < n {
		let max_rank = (0..n)
			.filter(|&v| placed[v])
			.map(|v| ranks[v])
			.max()
			.unwrap_or(0);
		let next = if queue.is_empty() { 0 } else { max_rank + 1 };
		for v in (0..n).filter(|&v| !placed[v]) {
			ranks[v] = next;
		}
	}
	ranks
}

fn build_rank_buckets(ranks: &[usize], cluster_of: &[Option<usize>]) -> Vec<Vec<usize>> {
	let max_rank = ranks.iter().copied().max().unwrap_or(0);
	let mut buckets = vec![Vec::new(); max_rank + 1];
	for (v, &r) in ranks.iter().enumerate() {
		buckets[r].push(v);
	}
	for bucket in &mut buckets {
		bucket.sort_by_key(|&v| (cluster_of[v].unwrap_or(usize::MAX), v));
	}
	buckets
}

/// Barycenter of every node in `layer` against its neighbours in `fixed`.
fn score(
	fixed: &[usize],
	layer: &[usize],
	neighbors: &[Vec<usize>],
	n: usize,
) -> Vec<(usize, f64)> {
	let mut pos = vec![usize::MAX; n];
	for (p, &v) in fixed.iter().enumerate() {
		pos[v] = p;
	}
	layer
		.iter()
		.enumerate()
		.map(|(current, &v)| {
			let placed: Vec<f64> = neighbors[v]
				.iter()
				.filter(|&&nb| pos[nb] != usize::MAX)
				.map(|&nb| pos[nb] as f64)
				.collect();
			// Nodes without placed neighbours keep their current slot.
			let bc = if placed.is_empty() {
				current as f64
			} else {
				placed.iter().sum::<f64>() / placed.len() as f64
			};
			(v, bc)
		})
		.collect()
}

/// Sorts by (cluster barycenter, cluster, barycenter, index) so that the
/// members of one cluster stay contiguous inside a rank.
fn sort_by_cluster(scored: Vec<(usize, f64)>, cluster_of: &[Option<usize>]) -> Vec<usize> {
	let mut sums: HashMap<usize, (f64, usize)> = HashMap::new();
	for &(v, bc) in &scored {
		if let Some(ci) = cluster_of[v] {
			let entry = sums.entry(ci).or_insert((0.0, 0));
			entry.0 += bc;
			entry.1 += 1;
		}
	}
	let key = |v: usize, bc: f64| match cluster_of[v] {
		Some(ci) => {
			let (sum, count) = sums[&ci];
			(sum / count as f64, ci, bc, v)
		}
		None => (bc, usize::MAX, bc, v),
	};
	let mut sorted = scored;
	sorted.sort_by(|a, b| {
		let (ka, kb) = (key(a.0, a.1), key(b.0, b.1));
		ka.0.total_cmp(&kb.0)
			.then(ka.1.cmp(&kb.1))
			.then(ka.2.total_cmp(&kb.2))
			.then(ka.3.cmp(&kb.3))
	});
	sorted.into_iter().map(|(v, _)| v).collect()
}

/// Rank axis: y for TB/BT, x for LR/RL. Order axis: the other one.
fn assign_coordinates(
	rank_order: &[Vec<usize>],
	cluster_of: &[Option<usize>],
	sizes: &[(f64, f64)],
	rankdir: RankDir,
	spacing: &LayoutSpacing,
) -> Vec<Rect> {
	let horizontal = rankdir.is_horizontal();
	let rank_span = |(w, h): (f64, f64)| if horizontal { w } else { h };
	let order_span = |(w, h): (f64, f64)| if horizontal { h } else { w };

	let rank_thickness: Vec<f64> = rank_order
		.iter()
		.map(|nodes| nodes.iter().map(|&v| rank_span(sizes[v])).fold(0.0, f64::max))
		.collect();
	let mut rank_start = Vec::with_capacity(rank_order.len());
	let mut offset = 0.0;
	for &thickness in &rank_thickness {
		rank_start.push(offset);
		offset += thickness + spacing.rank_gap;
	}
	let total_rank_extent = offset - spacing.rank_gap;

	let cluster_break = 2.0 * spacing.cluster_padding + spacing.cluster_gap;
	let cluster_head = if horizontal { spacing.cluster_title } else { 0.0 };

	let mut rects = vec![Rect::default(); sizes.len()];
	let mut extents = Vec::with_capacity(rank_order.len());
	for (r, nodes) in rank_order.iter().enumerate() {
		let mut cursor = 0.0;
		let mut previous: Option<Option<usize>> = None;
		for &v in nodes {
			match previous {
				None => cursor += cluster_head,
				Some(prev) if prev != cluster_of[v] => {
					cursor += cluster_break + cluster_head
				}
				Some(_) => cursor += spacing.node_gap,
			}
			previous = Some(cluster_of[v]);

			let (w, h) = sizes[v];
			let along = rank_start[r] + (rank_thickness[r] - rank_span(sizes[v])) / 2.0;
			let along = if rankdir.is_reversed() {
				total_rank_extent - along - rank_span(sizes[v])
			} else {
				along
			};
			rects[v] = if horizontal {
				Rect {
					x: along,
					y: cursor,
					width: w,
					height: h,
				}
			} else {
				Rect {
					x: cursor,
					y: along,
					width: w,
					height: h,
				}
			};
			cursor += order_span(sizes[v]);
		}
		extents.push(cursor);
	}

	// Centre every rank against the widest one.
	let widest = extents.iter().copied().fold(0.0, f64::max);
	for (r, nodes) in rank_order.iter().enumerate() {
		let shift = (widest - extents[r]) / 2.0;
		for &v in nodes {
			if horizontal {
				rects[v].y += shift;
			} else {
				rects[v].x += shift;
			}
		}
	}
	rects
}
