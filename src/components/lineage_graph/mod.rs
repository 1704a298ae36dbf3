//! Progressive lineage graph: model, layout, canvas drawing and DOM glue.

mod component;
mod graph;
mod layout;
mod render;
mod state;
mod types;
mod view;

pub use component::LineageGraphCanvas;
pub use types::{RankDir, SchemaLineage};
