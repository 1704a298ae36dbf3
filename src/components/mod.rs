//! Page components.

pub mod lineage_graph;
