use std::{
    collections::{BTreeMap, HashMap, btree_map::Entry},
    fmt::Display,
    hash::Hash,
};

use eyre::{Result, bail};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    config::{DuplicatePolicy, Schema},
    metric::Metric,
    table::MeasurementTable,
};

/// worker count -> value
pub type WorkerSeries = BTreeMap<u32, f64>;

#[derive(Debug, Error)]
#[error("Duplicate measurement for {0}")]
pub struct DuplicateEntry(pub String);

/// Nested lookup `task -> metric -> variant -> worker count -> value`
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingIndex(BTreeMap<String, BTreeMap<Metric, BTreeMap<String, WorkerSeries>>>);

/// Measurements grouped by `(variant, task)` without a worker dimension
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PairIndex(BTreeMap<PairKey, BTreeMap<Metric, f64>>);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairKey {
    pub variant: String,
    pub task: String,
}

impl PairKey {
    pub fn new(variant: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            variant: variant.into(),
            task: task.into(),
        }
    }
}

impl Display for PairKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}+{}", self.variant, self.task)
    }
}

/// Applies a [`DuplicatePolicy`] while values are written into an index
struct Merger<K> {
    policy: DuplicatePolicy,
    seen: HashMap<K, usize>,
    duplicates: usize,
}

impl<K: Eq + Hash + Clone + Display> Merger<K> {
    fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            seen: HashMap::new(),
            duplicates: 0,
        }
    }

    fn merge<S: Ord>(&mut self, key: K, slot: Entry<'_, S, f64>, value: f64) -> Result<()> {
        let count = self.seen.entry(key.clone()).or_default();
        *count += 1;
        match slot {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(mut slot) => {
                self.duplicates += 1;
                match self.policy {
                    DuplicatePolicy::Overwrite => {
                        debug!("Overwriting {key}: {} -> {value}", slot.get());
                        slot.insert(value);
                    }
                    DuplicatePolicy::Reject => return Err(DuplicateEntry(key.to_string()).into()),
                    DuplicatePolicy::Mean => {
                        let mean = slot.get_mut();
                        *mean += (value - *mean) / *count as f64;
                    }
                }
            }
        }
        Ok(())
    }
}

impl ScalingIndex {
    /// Builds the index from a table whose label scheme carries worker
    /// counts. Rows with malformed labels are skipped.
    pub fn build(table: &MeasurementTable, policy: DuplicatePolicy) -> Result<Self> {
        let scheme = table.scheme();
        if !scheme.has_workers() {
            bail!("{scheme:?} labels have no worker count, a scaling index needs one");
        }
        let mut index = Self::default();
        let mut merger = Merger::new(policy);
        let mut skipped = 0;

        for row in table.rows() {
            let label = match scheme.parse(row.label()) {
                Ok(label) => label,
                Err(err) => {
                    debug!("Skipping row: {err}");
                    skipped += 1;
                    continue;
                }
            };
            let Some(workers) = label.workers else {
                skipped += 1;
                continue;
            };

            for metric in Metric::ALL {
                let value = row.value(metric)?;
                let series = index
                    .0
                    .entry(label.task.clone())
                    .or_default()
                    .entry(metric)
                    .or_default()
                    .entry(label.variant.clone())
                    .or_default();
                merger.merge(
                    format!("{label} {metric}"),
                    series.entry(workers),
                    value,
                )?;
            }
        }

        if skipped > 0 {
            info!("Skipped {skipped} rows with malformed labels");
        }
        if merger.duplicates > 0 {
            warn!(
                "{} duplicate measurements merged ({:?})",
                merger.duplicates, policy
            );
        }
        Ok(index)
    }

    /// Loads and reshapes the table at `path`, `None` if it does not exist
    pub async fn load(
        path: &std::path::Path,
        schema: &Schema,
        policy: DuplicatePolicy,
    ) -> Result<Option<Self>> {
        match MeasurementTable::load(path, schema).await? {
            Some(table) => Ok(Some(Self::build(&table, policy)?)),
            None => Ok(None),
        }
    }

    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn series(&self, task: &str, metric: Metric, variant: &str) -> Option<&WorkerSeries> {
        self.0.get(task)?.get(&metric)?.get(variant)
    }

    pub fn get(&self, task: &str, metric: Metric, variant: &str, workers: u32) -> Option<f64> {
        self.series(task, metric, variant)?.get(&workers).copied()
    }

    /// `value / workers` for every worker count of a series, in ascending
    /// worker order. A worker count of zero yields no point.
    pub fn per_worker(&self, task: &str, metric: Metric, variant: &str) -> Vec<(u32, f64)> {
        self.series(task, metric, variant)
            .map(|series| {
                series
                    .iter()
                    .filter(|(workers, _)| **workers > 0)
                    .map(|(workers, value)| (*workers, value / *workers as f64))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of `(task, metric, variant, workers)` slots
    pub fn len(&self) -> usize {
        self.0
            .values()
            .flat_map(|metrics| metrics.values())
            .flat_map(|variants| variants.values())
            .map(BTreeMap::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PairIndex {
    /// Builds the index keyed by `(variant, task)` of each label. Worker
    /// counts of scaling labels are folded together under `policy`. Rows
    /// with malformed labels are skipped.
    pub fn build(table: &MeasurementTable, policy: DuplicatePolicy) -> Result<Self> {
        let mut index = Self::default();
        let mut merger = Merger::new(policy);
        let mut skipped = 0;

        for row in table.rows() {
            let label = match table.scheme().parse(row.label()) {
                Ok(label) => label,
                Err(err) => {
                    debug!("Skipping row: {err}");
                    skipped += 1;
                    continue;
                }
            };
            let key = PairKey::new(label.variant, label.task);
            for metric in Metric::ALL {
                let value = row.value(metric)?;
                let values = index.0.entry(key.clone()).or_default();
                merger.merge(format!("{key} {metric}"), values.entry(metric), value)?;
            }
        }

        if skipped > 0 {
            info!("Skipped {skipped} rows with malformed labels");
        }
        if merger.duplicates > 0 {
            warn!(
                "{} duplicate measurements merged ({:?})",
                merger.duplicates, policy
            );
        }
        Ok(index)
    }

    pub async fn load(
        path: &std::path::Path,
        schema: &Schema,
        policy: DuplicatePolicy,
    ) -> Result<Option<Self>> {
        match MeasurementTable::load(path, schema).await? {
            Some(table) => Ok(Some(Self::build(&table, policy)?)),
            None => Ok(None),
        }
    }

    pub fn get(&self, variant: &str, task: &str, metric: Metric) -> Option<f64> {
        self.0
            .get(&PairKey::new(variant, task))?
            .get(&metric)
            .copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PairKey, &BTreeMap<Metric, f64>)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `variant+task -> metric -> value`, for printing
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let map = self
            .0
            .iter()
            .map(|(key, values)| Ok((key.to_string(), serde_json::to_value(values)?)))
            .collect::<Result<serde_json::Map<_, _>>>()?;
        Ok(map.into())
    }
}
