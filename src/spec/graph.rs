//! Station graph: plain station records plus a separate adjacency index.
//!
//! Stations are kept in insertion order. Children may be declared before
//! their own entry appears, so references are checked only once every
//! station is known. Cycles are not rejected; the graph is a DAG by
//! convention (raw material -> finished goods).

use crate::error::{HarvestError, Result};
use crate::spec::StationSpec;
use std::collections::{BTreeMap, HashMap};

/// One processing station. Immutable after the graph is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Station {
    pub id: String,
    /// Display name, not required to be unique. Defaults to `id`.
    pub alias: String,
    /// Address of the station's main page.
    pub address: String,
    pub children: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct StationGraph {
    stations: Vec<Station>,
    index: HashMap<String, usize>,
    parents: BTreeMap<String, Vec<String>>,
}

/// Address used for a station that does not configure one.
pub fn default_address(id: &str) -> String {
    format!("StationMenu?id={}", id)
}

impl StationGraph {
    /// Validate station entries and build the graph:
    /// - at least one station
    /// - unique ids
    /// - every child references an existing station
    pub fn build<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, StationSpec)>,
    {
        // 1) Unique stations, insertion order.
        let mut stations = Vec::new();
        let mut index = HashMap::new();
        for (id, spec) in entries {
            if index.contains_key(&id) {
                return Err(HarvestError::config(format!("duplicate station id: {}", id)));
            }
            index.insert(id.clone(), stations.len());
            stations.push(Station {
                alias: spec.alias.unwrap_or_else(|| id.clone()),
                address: spec.address.unwrap_or_else(|| default_address(&id)),
                children: spec.children,
                id,
            });
        }
        if stations.is_empty() {
            return Err(HarvestError::config("station graph must contain at least 1 station"));
        }

        // 2) Forward references resolved now that every id is known.
        let mut parents = BTreeMap::<String, Vec<String>>::new();
        for station in &stations {
            for child in &station.children {
                if !index.contains_key(child) {
                    return Err(HarvestError::config(format!(
                        "station {} references missing child {}",
                        station.id, child
                    )));
                }
                parents
                    .entry(child.clone())
                    .or_default()
                    .push(station.id.clone());
            }
        }

        Ok(Self {
            stations,
            index,
            parents,
        })
    }

    /// All stations in insertion order.
    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn get(&self, id: &str) -> Option<&Station> {
        self.index.get(id).map(|&i| &self.stations[i])
    }

    pub fn children_of(&self, id: &str) -> Option<&[String]> {
        self.get(id).map(|s| s.children.as_slice())
    }

    pub fn parents_of(&self, id: &str) -> &[String] {
        self.parents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn alias_of(&self, id: &str) -> Option<&str> {
        self.get(id).map(|s| s.alias.as_str())
    }

    /// Stations nothing feeds into, in insertion order.
    pub fn roots(&self) -> Vec<&Station> {
        self.stations
            .iter()
            .filter(|s| !self.parents.contains_key(&s.id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}
