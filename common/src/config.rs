use std::{collections::BTreeMap, path::PathBuf};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{label::LabelScheme, metric::Metric, plot::Plot};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub name: String,
    #[serde(default)]
    pub settings: Settings,
    pub plots: Vec<Box<dyn Plot>>,
}

impl Config {
    pub fn from_yaml(data: &str) -> Result<Self> {
        serde_yml::from_str(data).context("Parse plot config")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default)]
    pub duplicates: DuplicatePolicy,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_width() -> u32 {
    1600
}

fn default_height() -> u32 {
    1200
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            width: default_width(),
            height: default_height(),
            duplicates: DuplicatePolicy::default(),
        }
    }
}

impl Settings {
    /// Image size with width and height scaled by `num / den`, clamped to
    /// `u32::MAX`
    pub fn scaled(&self, width: (u32, u32), height: (u32, u32)) -> (u32, u32) {
        (scale(self.width, width), scale(self.height, height))
    }
}

fn scale(px: u32, (num, den): (u32, u32)) -> u32 {
    let scaled = u64::from(px) * u64::from(num) / u64::from(den.max(1));
    u32::try_from(scaled).unwrap_or(u32::MAX)
}

/// What to do when two rows map onto the same index slot
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Last row read wins
    #[default]
    Overwrite,
    /// Fail the plot job
    Reject,
    /// Arithmetic mean of all rows for the slot
    Mean,
}

/// Column layout of a measurement table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub label_column: String,
    pub label_scheme: LabelScheme,
    #[serde(default = "default_metric_columns")]
    pub metric_columns: BTreeMap<Metric, String>,
}

fn default_metric_columns() -> BTreeMap<Metric, String> {
    Metric::ALL
        .iter()
        .map(|metric| (*metric, metric.column().to_owned()))
        .collect()
}

impl Schema {
    /// `Configuration,Duration,CPU_Usage,Mem_Usage,IO_Usage` with
    /// `Program_A_Scaling_cpu_4` style labels
    pub fn scaling() -> Self {
        Self {
            label_column: "Configuration".to_owned(),
            label_scheme: LabelScheme::Scaling,
            metric_columns: default_metric_columns(),
        }
    }

    /// `Program_Variant,Duration,CPU_Usage,Mem_Usage,IO_Usage` with
    /// `Program_A+cpu` style labels
    pub fn pair() -> Self {
        Self {
            label_column: "Program_Variant".to_owned(),
            label_scheme: LabelScheme::Pair,
            metric_columns: default_metric_columns(),
        }
    }

    pub fn column(&self, metric: Metric) -> &str {
        self.metric_columns
            .get(&metric)
            .map(String::as_str)
            .unwrap_or(metric.column())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_defaults_apply_to_missing_fields() {
        let settings: Settings = serde_yml::from_str("width: 800").unwrap();
        assert_eq!(settings.width, 800);
        assert_eq!(settings.height, 1200);
        assert_eq!(settings.output_dir, PathBuf::from("."));
        assert_eq!(settings.duplicates, DuplicatePolicy::Overwrite);
    }

    #[test]
    fn schema_column_override() {
        let schema: Schema = serde_yml::from_str(
            "label_column: Config\nlabel_scheme: Scaling\nmetric_columns:\n  Duration: Time\n",
        )
        .unwrap();
        assert_eq!(schema.column(Metric::Duration), "Time");
        assert_eq!(schema.column(Metric::MemUsage), "Mem_Usage");
    }

    #[test]
    fn scaled_size_does_not_overflow() {
        let settings = Settings::default();
        assert_eq!(settings.scaled((7, 5), (3, 5)), (2240, 720));
        let huge = Settings {
            width: u32::MAX,
            height: u32::MAX / 2,
            ..Default::default()
        };
        assert_eq!(huge.scaled((7, 5), (1, 1)), (u32::MAX, u32::MAX / 2));
    }

    #[test]
    fn duplicate_policy_is_lowercase() {
        let policy: DuplicatePolicy = serde_yml::from_str("mean").unwrap();
        assert_eq!(policy, DuplicatePolicy::Mean);
    }
}
