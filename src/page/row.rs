use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// One unparsed (day, value) pair from a secondary page's token stream.
///
/// Tokens stay as text until reconciliation decides whether days are integral.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawObservation {
    pub day: String,
    pub value: String,
    pub label: String,
}

/// A scalar reading from a station's summary panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatValue {
    Numeric(f64),
    Text(String),
}

impl StatValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StatValue::Numeric(v) => Some(*v),
            StatValue::Text(_) => None,
        }
    }
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Numeric(v) => write!(f, "{}", v),
            StatValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistic {
    /// Normalized label, e.g. `QUEUE_LENGTH`.
    pub label: String,
    pub value: StatValue,
}

/// Statistics of one page keyed by normalized label.
pub type StatisticIndex = BTreeMap<String, Statistic>;
