use std::path::{Path, PathBuf};

use common::{
    config::{Schema, Settings},
    index::ScalingIndex,
    metric::Metric,
    plot::{Plot, PlotOutcome, output_path},
};
use eyre::{Context, Result};
use plot_common::{
    LineData, LinePanel, SeriesStyle, VariantSpec, XAxis, canvas, draw_err, draw_line_panel,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Per-worker overhead of one metric, ie. memory usage divided by the
/// number of workers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerEfficiency {
    pub input: PathBuf,
    #[serde(default = "default_output")]
    pub output: String,
    #[serde(default = "default_task")]
    pub task: String,
    #[serde(default = "default_metric")]
    pub metric: Metric,
    #[serde(default = "default_variants")]
    pub variants: Vec<VariantSpec>,
    #[serde(default = "Schema::scaling")]
    pub schema: Schema,
}

fn default_output() -> String {
    "MT25091_Part_D_Plot_2.png".to_owned()
}

fn default_task() -> String {
    "mem".to_owned()
}

fn default_metric() -> Metric {
    Metric::MemUsage
}

fn default_variants() -> Vec<VariantSpec> {
    vec![
        VariantSpec::new("Program_A", "Process (A)"),
        VariantSpec::new("Program_B", "Thread (B)"),
    ]
}

impl Default for WorkerEfficiency {
    fn default() -> Self {
        Self {
            input: PathBuf::from("MT25091_Part_D_CSV.csv"),
            output: default_output(),
            task: default_task(),
            metric: default_metric(),
            variants: default_variants(),
            schema: Schema::scaling(),
        }
    }
}

#[async_trait::async_trait]
#[typetag::serde]
impl Plot for WorkerEfficiency {
    fn name(&self) -> &'static str {
        "WorkerEfficiency"
    }

    fn outputs(&self) -> Vec<String> {
        vec![self.output.clone()]
    }

    async fn plot(&self, settings: &Settings) -> Result<PlotOutcome> {
        let Some(index) = ScalingIndex::load(&self.input, &self.schema, settings.duplicates).await?
        else {
            return Ok(PlotOutcome::Skipped {
                missing: self.input.clone(),
            });
        };

        let path = output_path(settings, &self.output);
        self.render(&index, &path, settings.scaled((1, 1), (3, 4)))
            .context(format!("Render {}", path.display()))?;
        println!("Generated {}", self.output);
        Ok(PlotOutcome::Generated(vec![path]))
    }

    async fn dump(&self, settings: &Settings) -> Result<Option<serde_json::Value>> {
        let Some(index) = ScalingIndex::load(&self.input, &self.schema, settings.duplicates).await?
        else {
            return Ok(None);
        };
        let series = self
            .variants
            .iter()
            .map(|variant| {
                let points = index.per_worker(&self.task, self.metric, &variant.id);
                (variant.id.clone(), serde_json::json!(points))
            })
            .collect::<serde_json::Map<_, _>>();
        Ok(Some(series.into()))
    }
}

impl WorkerEfficiency {
    fn series(&self, index: &ScalingIndex) -> Vec<LineData> {
        self.variants
            .iter()
            .enumerate()
            .map(|(idx, variant)| {
                let style = SeriesStyle::nth(idx);
                let points = index
                    .per_worker(&self.task, self.metric, &variant.id)
                    .into_iter()
                    .map(|(workers, value)| (workers as f64, value))
                    .collect::<Vec<_>>();
                debug!("{} {}: {} points", variant.id, self.task, points.len());
                LineData {
                    label: variant.label.clone(),
                    points,
                    // the thread series is drawn dashed
                    style: if idx % 2 == 1 { style.dashed() } else { style },
                }
            })
            .collect()
    }

    fn render(&self, index: &ScalingIndex, path: &Path, size: (u32, u32)) -> Result<()> {
        let series = self.series(index);
        let title = format!("Per-Worker {} Overhead (Efficiency)", self.metric.column());
        let y_desc = format!("{} per Worker", self.metric.title());

        let root = canvas(path, size)?;
        draw_line_panel(
            &root,
            &LinePanel {
                title: Some(title.as_str()),
                x_desc: "Number of Workers (N)",
                y_desc: &y_desc,
                x_axis: XAxis::from_series(&series),
                series: &series,
                legend: true,
                annotate: None,
                note: None,
            },
        )?;
        root.present().map_err(draw_err)?;
        Ok(())
    }
}
