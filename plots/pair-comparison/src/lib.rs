use std::path::{Path, PathBuf};

use common::{
    config::{Schema, Settings},
    index::PairIndex,
    metric::Metric,
    plot::{Plot, PlotOutcome, output_path},
};
use eyre::{Context, Result};
use plot_common::{
    BarGroup, BarPanel, SeriesStyle, VariantSpec, canvas, default_tasks, draw_bar_panel, draw_err,
    grid,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

const TITLE: &str = "Process vs Thread Performance Analysis";
const COLUMNS: usize = 2;

/// Grouped bars of every metric for a fixed worker count, one panel per
/// metric
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairComparison {
    pub input: PathBuf,
    #[serde(default = "default_output")]
    pub output: String,
    #[serde(default = "default_tasks")]
    pub tasks: Vec<String>,
    #[serde(default = "default_variants")]
    pub variants: Vec<VariantSpec>,
    #[serde(default = "Schema::pair")]
    pub schema: Schema,
}

fn default_output() -> String {
    "MT25091_Part_C_Plot.png".to_owned()
}

fn default_variants() -> Vec<VariantSpec> {
    vec![
        VariantSpec::new("Program_A", "Processes (A)"),
        VariantSpec::new("Program_B", "Threads (B)"),
    ]
}

impl Default for PairComparison {
    fn default() -> Self {
        Self {
            input: PathBuf::from("MT25091_Part_C_CSV.csv"),
            output: default_output(),
            tasks: default_tasks(),
            variants: default_variants(),
            schema: Schema::pair(),
        }
    }
}

#[async_trait::async_trait]
#[typetag::serde]
impl Plot for PairComparison {
    fn name(&self) -> &'static str {
        "PairComparison"
    }

    fn outputs(&self) -> Vec<String> {
        vec![self.output.clone()]
    }

    async fn plot(&self, settings: &Settings) -> Result<PlotOutcome> {
        let Some(index) = PairIndex::load(&self.input, &self.schema, settings.duplicates).await?
        else {
            return Ok(PlotOutcome::Skipped {
                missing: self.input.clone(),
            });
        };

        let path = output_path(settings, &self.output);
        self.render(&index, &path, (settings.width, settings.height))
            .context(format!("Render {}", path.display()))?;
        println!(
            "Generated {} with {} subplots",
            self.output,
            Metric::ALL.len()
        );
        Ok(PlotOutcome::Generated(vec![path]))
    }

    async fn dump(&self, settings: &Settings) -> Result<Option<serde_json::Value>> {
        match PairIndex::load(&self.input, &self.schema, settings.duplicates).await? {
            Some(index) => Ok(Some(index.to_json()?)),
            None => Ok(None),
        }
    }
}

impl PairComparison {
    /// One bar group per variant, missing measurements are drawn as 0
    fn groups(&self, index: &PairIndex, metric: Metric) -> Vec<BarGroup> {
        self.variants
            .iter()
            .enumerate()
            .map(|(idx, variant)| BarGroup {
                label: variant.label.clone(),
                values: self
                    .tasks
                    .iter()
                    .map(|task| index.get(&variant.id, task, metric).unwrap_or(0.0))
                    .collect(),
                color: SeriesStyle::nth(idx).color,
            })
            .collect()
    }

    fn render(&self, index: &PairIndex, path: &Path, size: (u32, u32)) -> Result<()> {
        let categories = self
            .tasks
            .iter()
            .map(|task| task.to_uppercase())
            .collect::<Vec<_>>();

        let root = canvas(path, size)?;
        let rows = Metric::ALL.len().div_ceil(COLUMNS);
        let areas = grid(&root, Some(TITLE), rows, COLUMNS)?;
        for (idx, (metric, area)) in Metric::ALL.iter().zip(areas.iter()).enumerate() {
            let title = format!("{} Comparison", metric.title());
            let groups = self.groups(index, *metric);
            debug!("Drawing {metric} for {} variants", groups.len());
            draw_bar_panel(
                area,
                &BarPanel {
                    title: Some(title.as_str()),
                    y_desc: metric.title(),
                    categories: &categories,
                    groups: &groups,
                    legend: idx == 0,
                },
            )?;
        }
        root.present().map_err(draw_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use common::{config::DuplicatePolicy, table::MeasurementTable};

    use super::*;

    #[test]
    fn missing_pairs_are_zero() {
        let table = MeasurementTable::parse(
            "Program_Variant, Duration, CPU_Usage, Mem_Usage, IO_Usage
Program_A+cpu, 5.0, 99.0, 1.0, 0.5
Program_B+cpu, 4.0, 98.0, 1.5, 0.5
Program_B+io, 2.0, 10.0, 1.0, 40.0
",
            &Schema::pair(),
        )
        .unwrap();
        let index = PairIndex::build(&table, DuplicatePolicy::Overwrite).unwrap();
        let plot = PairComparison::default();

        let groups = plot.groups(&index, Metric::Duration);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].label, "Processes (A)");
        assert_eq!(groups[0].values, vec![5.0, 0.0, 0.0]);
        assert_eq!(groups[1].values, vec![4.0, 0.0, 2.0]);
    }

    #[tokio::test]
    async fn dump_groups_by_pair() {
        let path = std::env::temp_dir().join(format!("pair-dump-{}.csv", std::process::id()));
        std::fs::write(
            &path,
            "Program_Variant,Duration,CPU_Usage,Mem_Usage,IO_Usage\nProgram_A+cpu,5.0,1,2,3\n",
        )
        .unwrap();
        let plot = PairComparison {
            input: path.clone(),
            ..Default::default()
        };
        let dump = plot.dump(&Settings::default()).await.unwrap().unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(dump["Program_A+cpu"]["Duration"], serde_json::json!(5.0));
    }
}
