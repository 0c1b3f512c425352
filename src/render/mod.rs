//! Export of a merged dataset for downstream consumers.

pub mod table;

pub use table::{render_csv, render_json, write_csv};
