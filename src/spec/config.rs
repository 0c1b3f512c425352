//! Harvest configuration (harvest.json).
//!
//! JSON shape:
//! {
//!   "series_address": "Plot?data={label}&x=all",
//!   "prefix_series": false,
//!   "failure_policy": "fail_fast",
//!   "aggregation": { "default": "sum", "labels": { "INV": "last" } },
//!   "stations": {
//!     "S1": { "alias": "Station 1", "address": "StationMenu?id=1", "children": ["S2"] },
//!     "S2": { "alias": "Station 2" }
//!   }
//! }
//!
//! The station mapping keeps file order; that order is the graph's insertion
//! order and therefore the column order of the merged dataset. A station id
//! listed twice is rejected when the graph is built.

use crate::error::{HarvestError, Result};
use crate::model::Aggregation;
use crate::spec::StationGraph;
use serde::Deserialize;
use serde::de::{Deserializer, MapAccess, Visitor};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

pub const DEFAULT_SERIES_ADDRESS: &str = "Plot?data={label}&x=all";

#[derive(Debug, Clone, Deserialize)]
pub struct HarvestConfig {
    #[serde(default = "default_series_address")]
    pub series_address: String,

    #[serde(default)]
    pub prefix_series: bool,

    #[serde(default)]
    pub failure_policy: FailurePolicy,

    #[serde(default)]
    pub aggregation: AggregationSpec,

    /// station id -> station entry, in file order. Repeated ids are kept
    /// so graph building can reject them.
    #[serde(deserialize_with = "station_entries")]
    pub stations: Vec<(String, serde_json::Value)>,
}

/// Raw station entry as it appears in the config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StationSpec {
    #[serde(default)]
    pub alias: Option<String>,

    #[serde(default)]
    pub address: Option<String>,

    #[serde(default)]
    pub children: Vec<String>,
}

/// What a fetch failure does to the cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    FailFast,
    /// Drop the station's columns and record it in `Dataset::omitted`.
    Omit,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AggregationSpec {
    #[serde(default)]
    pub default: Aggregation,
    /// Per-label overrides, keyed by the secondary-page label.
    #[serde(default)]
    pub labels: BTreeMap<String, Aggregation>,
}

impl AggregationSpec {
    pub fn for_label(&self, label: &str) -> Aggregation {
        self.labels.get(label).copied().unwrap_or(self.default)
    }
}

fn default_series_address() -> String {
    DEFAULT_SERIES_ADDRESS.to_string()
}

/// Read the `stations` object entry by entry instead of through a map type,
/// which would let a repeated key silently replace the earlier one.
fn station_entries<'de, D>(
    de: D,
) -> std::result::Result<Vec<(String, serde_json::Value)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct EntriesVisitor;

    impl<'de> Visitor<'de> for EntriesVisitor {
        type Value = Vec<(String, serde_json::Value)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of station id to station entry")
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut out = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry::<String, serde_json::Value>()? {
                out.push(entry);
            }
            Ok(out)
        }
    }

    de.deserialize_map(EntriesVisitor)
}

impl HarvestConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Decode the station entries in order and build the validated graph.
    pub fn build_graph(&self) -> Result<StationGraph> {
        let mut entries = Vec::with_capacity(self.stations.len());
        for (id, raw) in &self.stations {
            let spec: StationSpec = serde_json::from_value(raw.clone()).map_err(|e| {
                HarvestError::config(format!("station {} has an invalid entry: {}", id, e))
            })?;
            entries.push((id.clone(), spec));
        }
        StationGraph::build(entries)
    }

    /// Address of the secondary page carrying `label`.
    pub fn series_address_for(&self, label: &str) -> String {
        self.series_address.replace("{label}", label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CONFIG: &str = r#"{
        "aggregation": { "default": "sum", "labels": { "INV": "last" } },
        "stations": {
            "S3": { "alias": "Finish" },
            "S1": { "alias": "Board", "address": "StationMenu?id=1", "children": ["S2"] },
            "S2": { "children": ["S3"] }
        }
    }"#;

    #[test]
    fn stations_keep_file_order() {
        let cfg = HarvestConfig::from_json(CONFIG).unwrap();
        let graph = cfg.build_graph().unwrap();
        let ids: Vec<&str> = graph.stations().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["S3", "S1", "S2"]);
    }

    #[test]
    fn defaults_apply() {
        let cfg = HarvestConfig::from_json(CONFIG).unwrap();
        assert_eq!(cfg.failure_policy, FailurePolicy::FailFast);
        assert!(!cfg.prefix_series);
        assert_eq!(cfg.series_address_for("JOBQ"), "Plot?data=JOBQ&x=all");
        assert_eq!(cfg.aggregation.for_label("INV"), Aggregation::Last);
        assert_eq!(cfg.aggregation.for_label("JOBIN"), Aggregation::Sum);
    }

    #[test]
    fn invalid_station_entry_is_configuration_error() {
        let cfg = HarvestConfig::from_json(r#"{ "stations": { "S1": { "children": 3 } } }"#)
            .unwrap();
        assert!(matches!(
            cfg.build_graph(),
            Err(HarvestError::Configuration(_))
        ));
    }

    #[test]
    fn repeated_station_id_is_configuration_error() {
        let cfg = HarvestConfig::from_json(
            r#"{ "stations": {
                "S1": { "alias": "First" },
                "S2": {},
                "S1": { "alias": "Second" }
            } }"#,
        )
        .unwrap();
        assert_eq!(cfg.stations.len(), 3);
        match cfg.build_graph() {
            Err(HarvestError::Configuration(msg)) => assert!(msg.contains("S1")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn failure_policy_parses() {
        let cfg =
            HarvestConfig::from_json(r#"{ "failure_policy": "omit", "stations": { "A": {} } }"#)
                .unwrap();
        assert_eq!(cfg.failure_policy, FailurePolicy::Omit);
    }
}
