//! Telemetry harvester for a networked factory simulation.
//!
//! Stations form a graph ([`spec`]); each station's pages are fetched through
//! a [`session::Session`], parsed ([`page`]), reconciled into day-indexed
//! series and merged into one [`model::Dataset`] ([`harvest`]).

pub mod error;
pub mod harvest;
pub mod model;
pub mod page;
pub mod render;
pub mod session;
pub mod spec;

pub use error::{HarvestError, Result};
pub use harvest::{HarvestOptions, Harvester};
pub use model::Dataset;
pub use session::{DirSession, Session};
pub use spec::{HarvestConfig, StationGraph};
