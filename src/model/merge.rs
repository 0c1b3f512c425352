//! Merge model: fold per-station snapshots into one day-indexed table.

use crate::error::{HarvestError, Result};
use crate::model::Series;
use crate::page::{Statistic, StatisticIndex, normalize_label};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Everything gathered for one station in one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct StationSnapshot {
    pub station: String,
    pub alias: String,
    pub series: Vec<Series>,
    pub statistics: StatisticIndex,
}

/// Time-indexed column; `cells[i]` belongs to `Dataset::days[i]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub station: String,
    pub cells: Vec<Option<f64>>,
}

/// Scalar column from a station's summary panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryColumn {
    pub name: String,
    pub station: String,
    pub statistic: Statistic,
}

/// A station left out of the dataset and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OmittedStation {
    pub station: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    /// Union of every series' days, ascending.
    pub days: Vec<i64>,
    pub columns: Vec<Column>,
    pub summary: Vec<SummaryColumn>,
    pub omitted: Vec<OmittedStation>,
}

impl Dataset {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn summary_column(&self, name: &str) -> Option<&SummaryColumn> {
        self.summary.iter().find(|c| c.name == name)
    }

    /// Cell at (`day`, `column`); `None` for absence or unknown day/column.
    pub fn value(&self, day: i64, column: &str) -> Option<f64> {
        let row = self.days.binary_search(&day).ok()?;
        self.column(column)?.cells[row]
    }

    /// One row aligned with `columns`.
    pub fn row(&self, day: i64) -> Option<Vec<Option<f64>>> {
        let row = self.days.binary_search(&day).ok()?;
        Some(self.columns.iter().map(|c| c.cells[row]).collect())
    }

    /// Time-indexed column names followed by summary column names.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(|c| c.name.as_str())
            .chain(self.summary.iter().map(|c| c.name.as_str()))
            .collect()
    }
}

/// Column name for a station-scoped label: `<ALIAS_UPPER>_<LABEL>`.
pub fn prefixed_name(alias: &str, label: &str) -> String {
    format!("{}_{}", normalize_label(alias), label)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DatasetMerger {
    /// Prefix series columns with the station alias like statistics.
    pub prefix_series: bool,
}

impl DatasetMerger {
    pub fn new(prefix_series: bool) -> Self {
        Self { prefix_series }
    }

    /// Full outer union on day. Column order follows snapshot order, then
    /// series order within a snapshot.
    ///
    /// Any column name produced twice is a `MergeConflict` naming both
    /// stations; nothing is overwritten.
    pub fn merge(&self, snapshots: &[StationSnapshot]) -> Result<Dataset> {
        // 1) Claim every column name, series and statistics alike.
        let mut owner: HashMap<String, String> = HashMap::new();
        let mut claim = |name: &str, station: &str| -> Result<()> {
            if let Some(prev) = owner.insert(name.to_string(), station.to_string()) {
                return Err(HarvestError::MergeConflict {
                    column: name.to_string(),
                    first: prev,
                    second: station.to_string(),
                });
            }
            Ok(())
        };

        let mut named: Vec<(String, &StationSnapshot, &Series)> = Vec::new();
        let mut summary: Vec<SummaryColumn> = Vec::new();
        for snap in snapshots {
            for series in &snap.series {
                let name = if self.prefix_series {
                    prefixed_name(&snap.alias, &series.label)
                } else {
                    series.label.clone()
                };
                claim(&name, &snap.station)?;
                named.push((name, snap, series));
            }
            for stat in snap.statistics.values() {
                let name = prefixed_name(&snap.alias, &stat.label);
                claim(&name, &snap.station)?;
                summary.push(SummaryColumn {
                    name,
                    station: snap.station.clone(),
                    statistic: stat.clone(),
                });
            }
        }

        // 2) Row index = union of all days.
        let days: Vec<i64> = named
            .iter()
            .flat_map(|(_, _, s)| s.days())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        // 3) Align every series on the shared index.
        let columns: Vec<Column> = named
            .into_iter()
            .map(|(name, snap, series)| Column {
                name,
                station: snap.station.clone(),
                cells: days.iter().map(|&d| series.get(d)).collect(),
            })
            .collect();

        debug!(
            rows = days.len(),
            columns = columns.len(),
            summary = summary.len(),
            "merged dataset"
        );

        Ok(Dataset {
            days,
            columns,
            summary,
            omitted: Vec::new(),
        })
    }
}
