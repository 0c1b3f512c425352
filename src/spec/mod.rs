//! Spec layer: configuration schema + validated station graph.
//!
//! This module is separate from page parsing and the merge model. It owns:
//! - HarvestConfig (file shape, policies)
//! - StationGraph (stations + adjacency index)

pub mod config;
pub mod graph;

pub use config::{AggregationSpec, FailurePolicy, HarvestConfig, StationSpec};
pub use graph::{Station, StationGraph};
