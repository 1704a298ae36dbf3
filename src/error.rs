//! Errors raised while attaching graphs and loading lineage data.

use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Debug, Error)]
pub enum LineageError {
	/// The render target selector matched nothing.
	#[error("the selector '{0}' does not match any element")]
	MissingTarget(String),

	#[error("no browser window available")]
	NoWindow,

	#[error("canvas has no 2d rendering context")]
	NoContext,

	#[error("javascript error: {0}")]
	Js(String),

	/// The backend answered with something other than 200.
	#[error("backend responded with {status} {status_text}")]
	Status { status: u16, status_text: String },

	#[error("malformed lineage document: {0}")]
	Decode(#[from] serde_json::Error),
}

impl From<JsValue> for LineageError {
	fn from(value: JsValue) -> Self {
		LineageError::Js(value.as_string().unwrap_or_else(|| format!("{value:?}")))
	}
}

impl LineageError {
	/// Text shown to the user when a load fails.
	pub fn alert_text(&self) -> String {
		match self {
			LineageError::Status { status_text, .. } => {
				format!("Could not load lineage from backend: {status_text}")
			}
			other => format!("Could not load lineage from backend: {other}"),
		}
	}
}
