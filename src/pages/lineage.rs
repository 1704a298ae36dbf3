use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::hooks::use_query_map;
use log::info;

use crate::api::{self, DEFAULT_FQDN};
use crate::components::lineage_graph::{LineageGraphCanvas, RankDir, SchemaLineage};

/// Backward and forward field lineage of the table named by `?fqdn=`.
#[component]
pub fn LineagePage() -> impl IntoView {
	let query = use_query_map();
	let fqdn = Memo::new(move |_| {
		query
			.with(|q| q.get("fqdn"))
			.filter(|f| !f.is_empty())
			.unwrap_or_else(|| DEFAULT_FQDN.to_string())
	});
	let lineage = RwSignal::new(None::<SchemaLineage>);

	Effect::new(move |_| {
		let fqdn = fqdn.get();
		spawn_local(async move {
			match api::fetch_schema_lineage(&fqdn).await {
				Ok(data) => {
					info!(
						"lineage of {fqdn}: {} backward, {} forward edges",
						data.backward_edges.len(),
						data.forward_edges.len()
					);
					lineage.set(Some(data));
				}
				Err(err) => api::report_load_failure(&err),
			}
		});
	});

	let backward = Signal::derive(move || {
		lineage.with(|l| l.as_ref().map(|l| l.backward_edges.clone()))
	});
	let forward = Signal::derive(move || {
		lineage.with(|l| l.as_ref().map(|l| l.forward_edges.clone()))
	});

	view! {
		<div class="lineage-page">
			<h1>"Schema lineage"</h1>
			<p class="subtitle">{move || fqdn.get()}</p>
			<p class="hint">"Click a field to reveal everything that depends on it."</p>

			<section>
				<h2>"Backward lineage"</h2>
				<LineageGraphCanvas
					container_id="backward-lineage-container"
					rankdir=RankDir::LeftRight
					edges=backward
				/>
			</section>

			<section>
				<h2>"Forward lineage"</h2>
				<LineageGraphCanvas
					container_id="forward-lineage-container"
					rankdir=RankDir::RightLeft
					edges=forward
				/>
			</section>
		</div>
	}
}
