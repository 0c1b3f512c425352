//! Model: reconciled series and the merged, day-indexed dataset.

pub mod merge;
pub mod series;

pub use merge::{Column, Dataset, DatasetMerger, OmittedStation, StationSnapshot, SummaryColumn};
pub use series::{Aggregation, Series, SeriesReconciler, reconcile};
