//! Canvas view bound to a page element: listeners, animation loop, cleanup.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use web_sys::{
	CanvasRenderingContext2d, Element, HtmlCanvasElement, HtmlElement, MouseEvent, Window,
};

use super::render;
use super::state::LineageGraphState;
use super::types::{LineageEdge, RankDir};
use crate::error::LineageError;

type Listener = Closure<dyn FnMut(MouseEvent)>;

/// A lineage graph drawn into a canvas inside a page element.
///
/// Dropping the view detaches its listeners, stops its animation loop and
/// removes the canvas.
pub struct LineageGraphView {
	state: Rc<RefCell<LineageGraphState>>,
	canvas: HtmlCanvasElement,
	listeners: Vec<(&'static str, Listener)>,
	alive: Rc<Cell<bool>>,
}

impl LineageGraphView {
	/// Creates a canvas inside the element matching `selector`.
	pub fn attach(selector: &str, rankdir: RankDir) -> Result<Self, LineageError> {
		let window = web_sys::window().ok_or(LineageError::NoWindow)?;
		let document = window.document().ok_or(LineageError::NoWindow)?;
		let container = document
			.query_selector(selector)?
			.ok_or_else(|| LineageError::MissingTarget(selector.to_string()))?;

		let canvas: HtmlCanvasElement = document
			.create_element("canvas")?
			.dyn_into()
			.map_err(|_| LineageError::Js("created element is not a canvas".into()))?;
		canvas.set_class_name("lineage-graph-canvas");
		container.append_child(&canvas)?;

		let mut view = Self {
			state: Rc::new(RefCell::new(LineageGraphState::new(rankdir))),
			canvas,
			listeners: Vec::new(),
			alive: Rc::new(Cell::new(true)),
		};
		let ctx: CanvasRenderingContext2d = view
			.canvas
			.get_context("2d")?
			.ok_or(LineageError::NoContext)?
			.dyn_into()
			.map_err(|_| LineageError::NoContext)?;

		let (state, canvas) = (view.state.clone(), view.canvas.clone());
		view.listen("click", move |ev: MouseEvent| {
			let (x, y) = local_position(&canvas, &ev);
			state.borrow_mut().click_at(x, y);
		})?;

		let (state, canvas) = (view.state.clone(), view.canvas.clone());
		view.listen("mousemove", move |ev: MouseEvent| {
			let (x, y) = local_position(&canvas, &ev);
			let mut s = state.borrow_mut();
			let hovered = s.node_at_position(x, y).map(|i| s.layout.nodes[i].id.clone());
			let clickable = s.expandable_at(x, y).is_some();
			s.set_hover(hovered);
			set_cursor(&canvas, cursor_for(clickable));
		})?;

		let (state, canvas) = (view.state.clone(), view.canvas.clone());
		view.listen("mouseleave", move |_: MouseEvent| {
			state.borrow_mut().set_hover(None);
			set_cursor(&canvas, cursor_for(false));
		})?;

		view.start_animation(&window, ctx)?;
		Ok(view)
	}

	/// Loads the full edge list and draws its sources.
	pub fn set_data(&self, edges: &[LineageEdge]) {
		self.state.borrow_mut().set_data(edges);
	}

	fn listen(
		&mut self,
		event: &'static str,
		handler: impl FnMut(MouseEvent) + 'static,
	) -> Result<(), LineageError> {
		let closure: Listener = Closure::new(handler);
		self.canvas
			.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
		self.listeners.push((event, closure));
		Ok(())
	}

	fn start_animation(
		&self,
		window: &Window,
		ctx: CanvasRenderingContext2d,
	) -> Result<(), LineageError> {
		let animate: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
		let (state, canvas, alive, animate_inner) = (
			self.state.clone(),
			self.canvas.clone(),
			self.alive.clone(),
			animate.clone(),
		);
		let mut last_frame: Option<f64> = None;

		*animate.borrow_mut() = Some(Closure::new(move |now: f64| {
			if !alive.get() {
				// Breaks the self reference so the loop can be freed.
				animate_inner.borrow_mut().take();
				return;
			}
			let dt = last_frame.map_or(0.016, |prev| ((now - prev) / 1000.0).clamp(0.0, 0.1));
			last_frame = Some(now);

			if let Ok(mut s) = state.try_borrow_mut() {
				s.tick(dt);
				sync_canvas_size(&canvas, &mut s);
				if s.dirty {
					render::render(&s, &ctx);
					s.dirty = false;
				}
			}

			if let (Some(window), Some(cb)) = (web_sys::window(), animate_inner.borrow().as_ref()) {
				let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate.borrow() {
			window.request_animation_frame(cb.as_ref().unchecked_ref())?;
		}
		Ok(())
	}
}

impl Drop for LineageGraphView {
	fn drop(&mut self) {
		self.alive.set(false);
		for (event, closure) in &self.listeners {
			let _ = self
				.canvas
				.remove_event_listener_with_callback(event, closure.as_ref().unchecked_ref());
		}
		Element::remove(&self.canvas);
	}
}

/// Canvas pixels follow the surface; resizing clears, so force a redraw.
fn sync_canvas_size(canvas: &HtmlCanvasElement, state: &mut LineageGraphState) {
	let (w, h) = (state.surface.width as u32, state.surface.height as u32);
	if canvas.width() != w || canvas.height() != h {
		canvas.set_width(w);
		canvas.set_height(h);
		state.dirty = true;
	}
}

fn cursor_for(clickable: bool) -> &'static str {
	if clickable { "pointer" } else { "default" }
}

fn set_cursor(canvas: &HtmlCanvasElement, cursor: &str) {
	let _ = HtmlElement::style(canvas).set_property("cursor", cursor);
}

fn local_position(canvas: &HtmlCanvasElement, ev: &MouseEvent) -> (f64, f64) {
	let rect = canvas.get_bounding_client_rect();
	(
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn pointer_only_over_expandable_nodes() {
		assert_eq!(cursor_for(true), "pointer");
		assert_eq!(cursor_for(false), "default");
	}
}
