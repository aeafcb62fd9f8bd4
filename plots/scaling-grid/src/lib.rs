use std::path::{Path, PathBuf};

use common::{
    config::{Schema, Settings},
    index::ScalingIndex,
    metric::Metric,
    plot::{Plot, PlotOutcome, output_path},
};
use eyre::{Context, Result, bail};
use plot_common::{
    LineData, LinePanel, SeriesStyle, VariantSpec, XAxis, canvas, default_tasks, draw_err,
    draw_line_panel, grid,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

const TITLE: &str = "Comprehensive Scaling Analysis (Rows=Task Type, Cols=Metric)";

/// Line charts of every metric against the worker count, one row per task
/// and one column per metric
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalingGrid {
    pub input: PathBuf,
    #[serde(default = "default_output")]
    pub output: String,
    #[serde(default = "default_tasks")]
    pub tasks: Vec<String>,
    #[serde(default = "default_variants")]
    pub variants: Vec<VariantSpec>,
    #[serde(default = "Schema::scaling")]
    pub schema: Schema,
}

fn default_output() -> String {
    "MT25091_Part_D_Plot_1.png".to_owned()
}

fn default_variants() -> Vec<VariantSpec> {
    vec![
        VariantSpec::new("Program_A", "Proc (A)"),
        VariantSpec::new("Program_B", "Thread (B)"),
    ]
}

impl Default for ScalingGrid {
    fn default() -> Self {
        Self {
            input: PathBuf::from("MT25091_Part_D_CSV.csv"),
            output: default_output(),
            tasks: default_tasks(),
            variants: default_variants(),
            schema: Schema::scaling(),
        }
    }
}

/// The lines of one grid cell
#[derive(Debug, Clone)]
struct Cell<'a> {
    row: usize,
    col: usize,
    task: &'a str,
    metric: Metric,
    series: Vec<LineData>,
}

#[async_trait::async_trait]
#[typetag::serde]
impl Plot for ScalingGrid {
    fn name(&self) -> &'static str {
        "ScalingGrid"
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
        self.render(&index, &path, (settings.width, settings.height))
            .context(format!("Render {}", path.display()))?;
        println!(
            "Generated {} with {} subplots ({}x{} grid)",
            self.output,
            self.tasks.len() * Metric::ALL.len(),
            self.tasks.len(),
            Metric::ALL.len()
        );
        Ok(PlotOutcome::Generated(vec![path]))
    }

    async fn dump(&self, settings: &Settings) -> Result<Option<serde_json::Value>> {
        let index = ScalingIndex::load(&self.input, &self.schema, settings.duplicates).await?;
        index
            .map(|index| serde_json::to_value(&index).context("Serialize scaling index"))
            .transpose()
    }
}

impl ScalingGrid {
    fn cells<'a>(&'a self, index: &ScalingIndex) -> Vec<Cell<'a>> {
        let mut cells = Vec::with_capacity(self.tasks.len() * Metric::ALL.len());
        for (row, task) in self.tasks.iter().enumerate() {
            for (col, metric) in Metric::ALL.into_iter().enumerate() {
                let series = self
                    .variants
                    .iter()
                    .enumerate()
                    .map(|(idx, variant)| LineData {
                        label: variant.label.clone(),
                        points: index
                            .series(task, metric, &variant.id)
                            .map(|series| {
                                series
                                    .iter()
                                    .map(|(workers, value)| (*workers as f64, *value))
                                    .collect()
                            })
                            .unwrap_or_default(),
                        style: SeriesStyle::nth(idx),
                    })
                    .collect();
                cells.push(Cell {
                    row,
                    col,
                    task,
                    metric,
                    series,
                });
            }
        }
        cells
    }

    fn render(&self, index: &ScalingIndex, path: &Path, size: (u32, u32)) -> Result<()> {
        if self.tasks.is_empty() {
            bail!("No tasks to plot");
        }
        let root = canvas(path, size)?;
        let areas = grid(&root, Some(TITLE), self.tasks.len(), Metric::ALL.len())?;

        for (cell, area) in self.cells(index).iter().zip(areas.iter()) {
            debug!("Drawing {} {}", cell.task, cell.metric);
            let y_desc = if cell.col == 0 {
                format!("{} Task {}", cell.task.to_uppercase(), cell.metric.unit())
            } else {
                cell.metric.unit().to_owned()
            };
            draw_line_panel(
                area,
                &LinePanel {
                    title: (cell.row == 0).then(|| cell.metric.short_title()),
                    x_desc: "Workers",
                    y_desc: &y_desc,
                    x_axis: XAxis::from_series(&cell.series),
                    series: &cell.series,
                    legend: cell.row == 0 && cell.col == 0,
                    annotate: None,
                    note: None,
                },
            )?;
        }
        root.present().map_err(draw_err)?;
        Ok(())
    }
}
