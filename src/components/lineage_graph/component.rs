use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::error;

use super::types::{LineageEdge, RankDir};
use super::view::LineageGraphView;

/// Page element that hosts a [`LineageGraphView`] once `edges` arrive.
#[component]
pub fn LineageGraphCanvas(
	#[prop(into)] container_id: String,
	rankdir: RankDir,
	#[prop(into)] edges: Signal<Option<Vec<LineageEdge>>>,
) -> impl IntoView {
	let container_ref = NodeRef::<leptos::html::Div>::new();
	let graph_view: Rc<RefCell<Option<LineageGraphView>>> = Rc::new(RefCell::new(None));
	let selector = format!("#{container_id}");

	Effect::new(move |_| {
		if container_ref.get().is_none() {
			return;
		}
		let Some(edges) = edges.get() else {
			return;
		};
		let mut slot = graph_view.borrow_mut();
		if slot.is_none() {
			match LineageGraphView::attach(&selector, rankdir) {
				Ok(view) => *slot = Some(view),
				Err(err) => {
					error!("cannot draw {rankdir} lineage: {err}");
					return;
				}
			}
		}
		if let Some(view) = slot.as_ref() {
			view.set_data(&edges);
		}
	});

	view! { <div id=container_id node_ref=container_ref class="lineage-container" /> }
}
