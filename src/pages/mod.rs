pub mod lineage;
pub mod not_found;
