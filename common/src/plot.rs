use core::fmt::Debug;
use std::path::PathBuf;

use dyn_clone::{DynClone, clone_trait_object};
use eyre::{Result, bail};
use serde::{Deserialize, Serialize};
use tokio::fs::create_dir_all;
use tracing::{debug, error, info};

use crate::config::{Config, Settings};

/// What a plot job did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlotOutcome {
    /// The images written, in order
    Generated(Vec<PathBuf>),
    /// The input table does not exist, nothing was written
    Skipped { missing: PathBuf },
}

#[typetag::serde(tag = "type")]
#[async_trait::async_trait]
pub trait Plot: Debug + DynClone + Send + Sync {
    /// Human readable name of the plot job
    fn name(&self) -> &'static str;
    /// File names of the images this job writes, relative to the output dir
    fn outputs(&self) -> Vec<String>;
    /// Reads the input, reshapes it and renders the images
    ///
    /// Arguments:
    /// * `settings` - The settings from the config, the images are written to
    ///   `settings.output_dir`
    async fn plot(&self, settings: &Settings) -> Result<PlotOutcome>;
    /// The reshaped data the job would plot, `None` if the input is missing
    async fn dump(&self, settings: &Settings) -> Result<Option<serde_json::Value>>;
}
clone_trait_object!(Plot);

pub async fn ensure_output_dir(settings: &Settings) -> Result<()> {
    create_dir_all(&settings.output_dir).await?;
    Ok(())
}

pub fn output_path(settings: &Settings, name: &str) -> PathBuf {
    settings.output_dir.join(name)
}

/// Runs every plot job of the config in order.
///
/// A failing job does not stop the batch, the collected failures are
/// reported once all jobs ran.
pub async fn plot(config: &Config) -> Result<Vec<PlotOutcome>> {
    if config.plots.is_empty() {
        debug!("No plots");
        return Ok(Vec::new());
    }
    ensure_output_dir(&config.settings).await?;

    let mut outcomes = Vec::new();
    let mut failed = Vec::new();
    for plot in &config.plots {
        info!("Plotting {}", plot.name());
        match plot.plot(&config.settings).await {
            Ok(outcome) => outcomes.push(outcome),
            Err(err) => {
                error!("{} failed: {err:?}", plot.name());
                failed.push(plot.name());
            }
        }
    }

    if !failed.is_empty() {
        bail!("Failed plots: {}", failed.join(", "));
    }
    Ok(outcomes)
}
