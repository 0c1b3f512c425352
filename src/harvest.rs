//! Acquisition cycle: fetch -> parse -> reconcile -> merge, plus the cached
//! dataset.
//!
//! Fetching is sequential through one `&mut Session`. Once every page of a
//! station is in memory, parsing and reconciliation run in parallel across
//! stations; results are collected back in station order.

use crate::error::{HarvestError, Result};
use crate::model::{Dataset, DatasetMerger, OmittedStation, SeriesReconciler, StationSnapshot};
use crate::page::PageParser;
use crate::session::Session;
use crate::spec::{AggregationSpec, FailurePolicy, HarvestConfig, Station, StationGraph};
use crate::spec::config::DEFAULT_SERIES_ADDRESS;
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct HarvestOptions {
    /// Secondary page address template; `{label}` is substituted.
    pub series_address: String,
    pub prefix_series: bool,
    pub failure_policy: FailurePolicy,
    pub aggregation: AggregationSpec,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            series_address: DEFAULT_SERIES_ADDRESS.to_string(),
            prefix_series: false,
            failure_policy: FailurePolicy::FailFast,
            aggregation: AggregationSpec::default(),
        }
    }
}

impl From<&HarvestConfig> for HarvestOptions {
    fn from(cfg: &HarvestConfig) -> Self {
        Self {
            series_address: cfg.series_address.clone(),
            prefix_series: cfg.prefix_series,
            failure_policy: cfg.failure_policy,
            aggregation: cfg.aggregation.clone(),
        }
    }
}

/// Raw text of one station's main page and its secondary pages.
struct FetchedStation<'g> {
    station: &'g Station,
    main: String,
    series_pages: Vec<(String, String)>,
}

/// Runs acquisition cycles over a station graph and caches the last
/// successful dataset. The cache starts empty, is filled by the first
/// successful cycle and replaced only on an explicit refresh.
#[derive(Debug)]
pub struct Harvester {
    graph: StationGraph,
    options: HarvestOptions,
    parser: PageParser,
    reconciler: SeriesReconciler,
    merger: DatasetMerger,
    cache: Option<Dataset>,
}

impl Harvester {
    pub fn new(graph: StationGraph, options: HarvestOptions) -> Result<Self> {
        Ok(Self {
            parser: PageParser::new()?,
            reconciler: SeriesReconciler::new(options.aggregation.clone()),
            merger: DatasetMerger::new(options.prefix_series),
            graph,
            options,
            cache: None,
        })
    }

    pub fn from_config(cfg: &HarvestConfig) -> Result<Self> {
        Self::new(cfg.build_graph()?, HarvestOptions::from(cfg))
    }

    pub fn graph(&self) -> &StationGraph {
        &self.graph
    }

    pub fn cached(&self) -> Option<&Dataset> {
        self.cache.as_ref()
    }

    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    /// Cached dataset, or a fresh cycle when the cache is empty or `refresh`
    /// is set. A failed refresh keeps the previous dataset.
    pub fn dataset<S>(&mut self, session: &mut S, refresh: bool) -> Result<&Dataset>
    where
        S: Session + ?Sized,
    {
        let ds = match self.cache.take() {
            Some(ds) if !refresh => {
                debug!("serving cached dataset");
                ds
            }
            previous => match self.run_cycle(session) {
                Ok(ds) => ds,
                Err(e) => {
                    self.cache = previous;
                    return Err(e);
                }
            },
        };
        Ok(self.cache.insert(ds))
    }

    /// One full cycle, bypassing the cache.
    #[instrument(level = "info", skip_all, fields(stations = self.graph.len()))]
    pub fn run_cycle<S>(&self, session: &mut S) -> Result<Dataset>
    where
        S: Session + ?Sized,
    {
        // 1) Fetch, one page at a time.
        let mut fetched = Vec::with_capacity(self.graph.len());
        let mut omitted = Vec::new();
        for station in self.graph.stations() {
            match self.fetch_station(session, station) {
                Ok(f) => fetched.push(f),
                Err(e) => match self.options.failure_policy {
                    FailurePolicy::FailFast => return Err(e),
                    FailurePolicy::Omit => {
                        warn!(station = %station.id, error = %e, "omitting station");
                        omitted.push(OmittedStation {
                            station: station.id.clone(),
                            reason: e.to_string(),
                        });
                    }
                },
            }
        }

        // 2) Parse + reconcile in parallel.
        let snapshots = fetched
            .par_iter()
            .map(|f| self.snapshot(f))
            .collect::<Result<Vec<_>>>()?;

        // 3) Merge.
        let mut ds = self.merger.merge(&snapshots)?;
        ds.omitted = omitted;

        info!(
            rows = ds.days.len(),
            columns = ds.columns.len(),
            summary = ds.summary.len(),
            omitted = ds.omitted.len(),
            "harvest cycle complete"
        );
        Ok(ds)
    }

    fn fetch_station<'g, S>(
        &self,
        session: &mut S,
        station: &'g Station,
    ) -> Result<FetchedStation<'g>>
    where
        S: Session + ?Sized,
    {
        let main = fetch(session, station, &station.address)?;
        let labels = self.parser.extract_series_references(&main);
        if labels.is_empty() {
            debug!(station = %station.id, "no series references on station page");
        }

        let mut series_pages = Vec::with_capacity(labels.len());
        for label in labels {
            let address = self.options.series_address.replace("{label}", &label);
            let text = fetch(session, station, &address)?;
            series_pages.push((label, text));
        }

        Ok(FetchedStation {
            station,
            main,
            series_pages,
        })
    }

    fn snapshot(&self, fetched: &FetchedStation<'_>) -> Result<StationSnapshot> {
        let station = fetched.station;
        let statistics = self.parser.extract_statistics(&fetched.main);

        let mut series = Vec::with_capacity(fetched.series_pages.len());
        for (label, text) in &fetched.series_pages {
            let raw = self.parser.extract_raw_series(text, label);
            if raw.is_empty() {
                debug!(station = %station.id, label = %label, "series page has no data");
                continue;
            }
            series.push(self.reconciler.reconcile(label, &raw)?);
        }

        debug!(
            station = %station.id,
            series = series.len(),
            statistics = statistics.len(),
            "station snapshot"
        );

        Ok(StationSnapshot {
            station: station.id.clone(),
            alias: station.alias.clone(),
            series,
            statistics,
        })
    }
}

fn fetch<S>(session: &mut S, station: &Station, address: &str) -> Result<String>
where
    S: Session + ?Sized,
{
    session
        .fetch_page(address)
        .map_err(|source| HarvestError::Transport {
            station: station.id.clone(),
            address: address.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::StationSpec;
    use anyhow::anyhow;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    /// In-memory pages keyed by address, counting fetches.
    #[derive(Default)]
    struct MapSession {
        pages: HashMap<String, String>,
        fetches: usize,
    }

    impl MapSession {
        fn page(mut self, address: &str, text: &str) -> Self {
            self.pages.insert(address.to_string(), text.to_string());
            self
        }
    }

    impl Session for MapSession {
        fn fetch_page(&mut self, address: &str) -> anyhow::Result<String> {
            self.fetches += 1;
            self.pages
                .get(address)
                .cloned()
                .ok_or_else(|| anyhow!("connection reset"))
        }
    }

    fn graph() -> StationGraph {
        StationGraph::build(vec![
            (
                "1".to_string(),
                StationSpec {
                    alias: Some("Board".to_string()),
                    address: None,
                    children: vec!["2".to_string()],
                },
            ),
            (
                "2".to_string(),
                StationSpec {
                    alias: Some("Tester".to_string()),
                    address: None,
                    children: vec![],
                },
            ),
        ])
        .unwrap()
    }

    fn session() -> MapSession {
        MapSession::default()
            .page(
                "StationMenu?id=1",
                r#"<a href="Plot?data=S1Q&x=all">queue</a>
Queue Length: 4.0 jobs<BR>"#,
            )
            .page(
                "StationMenu?id=2",
                r#"<a href="Plot?data=S2Q&amp;x=all">queue</a>
<a href="Plot?data=S2U&x=all">util</a>
Utilization: 85 %<BR>Policy: FIFO<BR>"#,
            )
            .page("Plot?data=S1Q&x=all", r#"<PARAM NAME="data" VALUE="1 10 2 20">"#)
            .page("Plot?data=S2Q&x=all", r#"<PARAM NAME="data" VALUE="2 3 2.5 4 3 1">"#)
            .page("Plot?data=S2U&x=all", r#"<PARAM NAME="data" VALUE="">"#)
    }

    #[test]
    fn cycle_merges_all_stations() {
        let h = Harvester::new(graph(), HarvestOptions::default()).unwrap();
        let ds = h.run_cycle(&mut session()).unwrap();

        assert_eq!(ds.days, vec![1, 2, 3]);
        assert_eq!(ds.column("S1Q").unwrap().cells, vec![Some(10.0), Some(20.0), None]);
        assert_eq!(ds.column("S2Q").unwrap().cells, vec![None, Some(7.0), Some(1.0)]);
        assert_eq!(ds.column("S2U"), None);
        assert_eq!(
            ds.column_names(),
            vec![
                "S1Q",
                "S2Q",
                "BOARD_QUEUE_LENGTH",
                "TESTER_POLICY",
                "TESTER_UTILIZATION"
            ]
        );
        assert!(ds.omitted.is_empty());
    }

    #[test]
    fn identical_pages_give_identical_datasets() {
        let h = Harvester::new(graph(), HarvestOptions::default()).unwrap();
        let a = h.run_cycle(&mut session()).unwrap();
        let b = h.run_cycle(&mut session()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn transport_failure_names_station_under_fail_fast() {
        let h = Harvester::new(graph(), HarvestOptions::default()).unwrap();
        let mut s = session();
        s.pages.remove("Plot?data=S2Q&x=all");
        match h.run_cycle(&mut s).unwrap_err() {
            HarvestError::Transport {
                station, address, ..
            } => {
                assert_eq!(station, "2");
                assert_eq!(address, "Plot?data=S2Q&x=all");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn omit_policy_drops_failed_station_and_reports_it() {
        let options = HarvestOptions {
            failure_policy: FailurePolicy::Omit,
            ..HarvestOptions::default()
        };
        let h = Harvester::new(graph(), options).unwrap();
        let mut s = session();
        s.pages.remove("StationMenu?id=1");

        let ds = h.run_cycle(&mut s).unwrap();
        assert_eq!(ds.omitted.len(), 1);
        assert_eq!(ds.omitted[0].station, "1");
        assert_eq!(ds.column("S1Q"), None);
        assert!(ds.summary_column("BOARD_QUEUE_LENGTH").is_none());
        assert_eq!(ds.days, vec![2, 3]);
    }

    #[test]
    fn cache_is_served_until_refresh() {
        let mut h = Harvester::new(graph(), HarvestOptions::default()).unwrap();
        let mut s = session();
        assert!(h.cached().is_none());

        h.dataset(&mut s, false).unwrap();
        let first = s.fetches;
        assert_eq!(first, 5);

        h.dataset(&mut s, false).unwrap();
        assert_eq!(s.fetches, first);

        h.dataset(&mut s, true).unwrap();
        assert_eq!(s.fetches, first * 2);

        h.invalidate();
        assert!(h.cached().is_none());
    }

    #[test]
    fn failed_refresh_keeps_previous_dataset() {
        let mut h = Harvester::new(graph(), HarvestOptions::default()).unwrap();
        let before = h.dataset(&mut session(), false).unwrap().clone();

        let mut broken = MapSession::default();
        assert!(h.dataset(&mut broken, true).is_err());
        assert_eq!(h.cached(), Some(&before));
    }
}
