//! Trunk entry point: mounts the lineage app.

use leptos::mount::mount_to_body;
use lineage_graph_canvas::{App, init_logging};

fn main() {
	init_logging();
	mount_to_body(App)
}
