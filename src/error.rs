//! Error taxonomy for the acquisition cycle.
//!
//! Parse gaps (a page without references, a row that is not `label: value`)
//! are deliberately absent here: they degrade to fewer columns instead.

/// Errors surfaced by graph building, fetching, reconciliation and merging.
#[derive(thiserror::Error, Debug)]
pub enum HarvestError {
    /// Invalid station graph definition. Raised before any fetch.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The session collaborator failed while fetching a station page.
    #[error("transport error fetching {address} for station {station}: {source}")]
    Transport {
        station: String,
        address: String,
        #[source]
        source: anyhow::Error,
    },

    /// Two rows of an integer-day series share the same day.
    #[error("reconciliation conflict in series {label}: day {day} reported twice")]
    Reconciliation { label: String, day: i64 },

    /// A value or day token that is not a finite number.
    #[error("bad token {token:?} in series {label}")]
    BadToken { label: String, token: String },

    /// Two stations produced the same column name.
    #[error("merge conflict on column {column}: produced by stations {first} and {second}")]
    MergeConflict {
        column: String,
        first: String,
        second: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HarvestError>;

impl HarvestError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
