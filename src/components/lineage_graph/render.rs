use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::graph::{NodeClass, NodeState};
use super::layout::Rect;
use super::state::LineageGraphState;

const BACKGROUND: &str = "#ffffff";
const CLUSTER_FILL: &str = "#f4f6fa";
const CLUSTER_STROKE: &str = "#aab4c8";
const CLUSTER_TEXT: &str = "#4a5568";
const INNER_FILL: &str = "#ffffff";
const EXPANDED_FILL: &str = "#e3efff";
const LEAF_FILL: &str = "#eeeeee";
const NODE_STROKE: &str = "#333333";
const NODE_TEXT: &str = "#1a1a1a";
const ARROW_SIZE: f64 = 7.0;
const FONT: &str = "12px sans-serif";

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

pub fn render(state: &LineageGraphState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, state.surface.width, state.surface.height);
	draw_clusters(state, ctx);
	draw_edges(state, ctx);
	draw_nodes(state, ctx);
}

fn draw_clusters(state: &LineageGraphState, ctx: &CanvasRenderingContext2d) {
	ctx.set_font(FONT);
	ctx.set_text_align("left");
	ctx.set_text_baseline("top");
	let _ = ctx.set_line_dash(&js_sys::Array::of2(
		&JsValue::from_f64(4.0),
		&JsValue::from_f64(3.0),
	));
	for (ci, cluster) in state.layout.clusters.iter().enumerate() {
		let r = state.cluster_rect(ci);
		ctx.set_fill_style_str(CLUSTER_FILL);
		ctx.fill_rect(r.x, r.y, r.width, r.height);
		ctx.set_stroke_style_str(CLUSTER_STROKE);
		ctx.set_line_width(1.0);
		ctx.stroke_rect(r.x, r.y, r.width, r.height);

		ctx.set_fill_style_str(CLUSTER_TEXT);
		let pad = state.spacing.cluster_padding;
		let _ =
			ctx.fill_text_with_max_width(&cluster.id, r.x + pad, r.y + 4.0, r.width - 2.0 * pad);
	}
	let _ = ctx.set_line_dash(&js_sys::Array::new());
}

fn draw_edges(state: &LineageGraphState, ctx: &CanvasRenderingContext2d) {
	let t = ease_out_cubic(state.hover.highlight_t);

	for &(from, to) in &state.layout.edges {
		let (a, b) = (state.node_rect(from), state.node_rect(to));
		let (acx, acy) = a.center();
		let (bcx, bcy) = b.center();
		let (x1, y1) = a.boundary_toward(bcx, bcy);
		let (x2, y2) = b.boundary_toward(acx, acy);
		let (dx, dy) = (x2 - x1, y2 - y1);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < 0.001 {
			continue;
		}

		let (src, dst) = (&state.layout.nodes[from].id, &state.layout.nodes[to].id);
		let is_highlighted = state.has_active_highlight()
			&& state.is_highlighted(src)
			&& state.is_highlighted(dst)
			&& (state.is_hovered(src) || state.is_hovered(dst));

		// t=0: every edge at 0.7, t=1: highlighted at 1.0, others at 0.25
		let (alpha, width) = if is_highlighted {
			(0.7 + 0.3 * t, 1.2 + 0.8 * t)
		} else if state.has_active_highlight() {
			(0.7 - 0.45 * t, 1.2)
		} else {
			(0.7, 1.2)
		};
		let alpha = alpha * state.node_alpha(to);
		let color = format!("rgba(51, 51, 51, {alpha})");

		let (ux, uy) = (dx / dist, dy / dist);
		ctx.set_stroke_style_str(&color);
		ctx.set_line_width(width);
		ctx.begin_path();
		ctx.move_to(x1, y1);
		ctx.line_to(x2 - ux * ARROW_SIZE, y2 - uy * ARROW_SIZE);
		ctx.stroke();

		ctx.set_fill_style_str(&color);
		let (back_x, back_y) = (x2 - ux * ARROW_SIZE, y2 - uy * ARROW_SIZE);
		let (px, py) = (-uy * ARROW_SIZE * 0.5, ux * ARROW_SIZE * 0.5);
		ctx.begin_path();
		ctx.move_to(x2, y2);
		ctx.line_to(back_x + px, back_y + py);
		ctx.line_to(back_x - px, back_y - py);
		ctx.close_path();
		ctx.fill();
	}
}

fn draw_nodes(state: &LineageGraphState, ctx: &CanvasRenderingContext2d) {
	let t = ease_out_cubic(state.hover.highlight_t);
	ctx.set_font(FONT);
	ctx.set_text_align("center");
	ctx.set_text_baseline("middle");

	for (i, node) in state.layout.nodes.iter().enumerate() {
		let r = state.node_rect(i);
		let dimmed = state.has_active_highlight() && !state.is_highlighted(&node.id);
		let alpha = state.node_alpha(i) * if dimmed { 1.0 - 0.6 * t } else { 1.0 };
		ctx.set_global_alpha(alpha);

		let fill = match (node.class, node.state) {
			(NodeClass::Leaf, _) => LEAF_FILL,
			(NodeClass::Inner, NodeState::Expanded) => EXPANDED_FILL,
			(NodeClass::Inner, _) => INNER_FILL,
		};
		ctx.set_fill_style_str(fill);
		ctx.fill_rect(r.x, r.y, r.width, r.height);

		let hovered = state.is_hovered(&node.id);
		ctx.set_stroke_style_str(NODE_STROKE);
		ctx.set_line_width(if hovered { 1.0 + 1.5 * t } else { 1.0 });
		ctx.stroke_rect(r.x, r.y, r.width, r.height);

		if node.class == NodeClass::Inner {
			draw_expand_marker(ctx, &r, node.state == NodeState::Expanded);
		}

		ctx.set_fill_style_str(NODE_TEXT);
		let (cx, cy) = r.center();
		let _ = ctx.fill_text_with_max_width(&node.label, cx, cy, r.width - 8.0);
	}
	ctx.set_global_alpha(1.0);
}

/// Small bar on the node's edge: hollow while collapsed, filled once expanded.
fn draw_expand_marker(ctx: &CanvasRenderingContext2d, r: &Rect, expanded: bool) {
	let (w, h) = (3.0, r.height - 8.0);
	let (x, y) = (r.right() - w - 3.0, r.y + 4.0);
	if expanded {
		ctx.set_fill_style_str(NODE_STROKE);
		ctx.fill_rect(x, y, w, h);
	} else {
		ctx.stroke_rect(x, y, w, h);
	}
}
