//! Client for the schema lineage endpoint.
//!
//! Uses the browser fetch API through web-sys.

use log::{debug, error};
use url::form_urlencoded;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, Response};

use crate::components::lineage_graph::SchemaLineage;
use crate::error::LineageError;

pub const LINEAGE_ENDPOINT: &str = "/table/schema/lineage";

/// Table shown when the page URL names none.
pub const DEFAULT_FQDN: &str = "demo_schedoscope_example_osm_processed.nodes_with_geohash";

/// `GET` path for the lineage of table `fqdn`.
pub fn lineage_url(fqdn: &str) -> String {
	let query = form_urlencoded::Serializer::new(String::new())
		.append_pair("fqdn", fqdn)
		.finish();
	format!("{LINEAGE_ENDPOINT}?{query}")
}

pub fn parse_schema_lineage(body: &str) -> Result<SchemaLineage, LineageError> {
	Ok(serde_json::from_str(body)?)
}

/// Fetches backward and forward field lineage of table `fqdn`.
pub async fn fetch_schema_lineage(fqdn: &str) -> Result<SchemaLineage, LineageError> {
	let url = lineage_url(fqdn);

	let opts = RequestInit::new();
	opts.set_method("GET");
	let request = Request::new_with_str_and_init(&url, &opts)?;
	request.headers().set("Content-Type", "application/json")?;

	let window = web_sys::window().ok_or(LineageError::NoWindow)?;
	let resp: Response = JsFuture::from(window.fetch_with_request(&request))
		.await?
		.dyn_into()
		.map_err(|_| LineageError::Js("fetch did not resolve to a Response".into()))?;

	if resp.status() != 200 {
		return Err(LineageError::Status {
			status: resp.status(),
			status_text: resp.status_text(),
		});
	}

	let body = JsFuture::from(resp.text()?)
		.await?
		.as_string()
		.ok_or_else(|| LineageError::Js("response body is not text".into()))?;
	debug!("GET {url}: {} bytes", body.len());
	parse_schema_lineage(&body)
}

/// Logs a failed load and tells the user with a browser alert.
pub fn report_load_failure(err: &LineageError) {
	error!("{err}");
	if let Some(window) = web_sys::window() {
		let _ = window.alert_with_message(&err.alert_text());
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn url_encodes_the_table_name() {
		assert_eq!(
			lineage_url("db.table"),
			"/table/schema/lineage?fqdn=db.table"
		);
		assert_eq!(
			lineage_url("my db.t&x"),
			"/table/schema/lineage?fqdn=my+db.t%26x"
		);
	}

	#[test]
	fn parses_both_directions() {
		let body = r#"{"backwardEdges":[],"forwardEdges":[
			{"from":{"id":"a","label":"a","parent":"p"},"to":{"id":"b","label":"b","parent":"q"}}
		]}"#;
		let lineage = parse_schema_lineage(body).unwrap();
		assert!(lineage.backward_edges.is_empty());
		assert_eq!(lineage.forward_edges[0].from.id, "a");
	}

	#[test]
	fn body_without_forward_edges_is_a_decode_error() {
		let err = parse_schema_lineage(r#"{"backwardEdges":[]}"#).unwrap_err();
		assert!(matches!(err, LineageError::Decode(_)));
		assert!(err.alert_text().contains("forwardEdges"));
	}

	#[test]
	fn malformed_body_is_a_decode_error() {
		let body = r#"{"backwardEdges":[],"forwardEdges":[{"from":{}}]}"#;
		let err = parse_schema_lineage(body).unwrap_err();
		assert!(matches!(err, LineageError::Decode(_)));
	}
}
