use std::path::{Path, PathBuf};

use common::{
    config::Settings,
    plot::{Plot, PlotOutcome, output_path},
};
use eyre::{Context, Result};
use plot_common::{
    BLUE, GREEN, LineData, LinePanel, Marker, RED, SeriesStyle, XAxis, canvas, draw_err,
    draw_line_panel, grid,
};
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::{Deserialize, Serialize};
use tracing::info;

mod data;

pub use data::{NetIoData, Strategy, size_label};

/// Throughput, latency, cache and cycle charts of the socket copy strategy
/// experiment. The data is part of the config, defaulting to the recorded
/// runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetIoAnalysis {
    #[serde(default)]
    pub data: NetIoData,
    #[serde(default)]
    pub outputs: NetIoOutputs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetIoOutputs {
    pub throughput: String,
    pub latency: String,
    pub cache_misses: String,
    pub cycles_per_byte: String,
}

impl Default for NetIoOutputs {
    fn default() -> Self {
        Self {
            throughput: "plot_throughput_vs_msgsize.png".to_owned(),
            latency: "plot_latency_vs_threads.png".to_owned(),
            cache_misses: "plot_cache_misses_vs_msgsize.png".to_owned(),
            cycles_per_byte: "plot_cycles_per_byte.png".to_owned(),
        }
    }
}

type Chart = fn(&NetIoData, &Path, (u32, u32)) -> Result<()>;

#[async_trait::async_trait]
#[typetag::serde]
impl Plot for NetIoAnalysis {
    fn name(&self) -> &'static str {
        "NetIoAnalysis"
    }

    fn outputs(&self) -> Vec<String> {
        vec![
            self.outputs.throughput.clone(),
            self.outputs.latency.clone(),
            self.outputs.cache_misses.clone(),
            self.outputs.cycles_per_byte.clone(),
        ]
    }

    async fn plot(&self, settings: &Settings) -> Result<PlotOutcome> {
        self.data.validate()?;
        info!(
            "Plotting {} copy strategies over {} message sizes",
            self.data.strategies.len(),
            self.data.message_sizes.len()
        );

        let size = settings.scaled((1, 1), (3, 5));
        let jobs: Vec<(PathBuf, (u32, u32), Chart)> = vec![
            (
                output_path(settings, &self.outputs.throughput),
                size,
                throughput_chart as Chart,
            ),
            (
                output_path(settings, &self.outputs.latency),
                size,
                latency_chart as Chart,
            ),
            (
                output_path(settings, &self.outputs.cache_misses),
                settings.scaled((7, 5), (3, 5)),
                cache_miss_chart as Chart,
            ),
            (
                output_path(settings, &self.outputs.cycles_per_byte),
                size,
                cycles_per_byte_chart as Chart,
            ),
        ];

        let paths = jobs
            .into_par_iter()
            .map(|(path, size, chart)| {
                chart(&self.data, &path, size).context(format!("Render {}", path.display()))?;
                Ok(path)
            })
            .collect::<Result<Vec<_>>>()?;

        for path in &paths {
            println!(
                "Generated: {}",
                path.file_name().unwrap_or_default().to_string_lossy()
            );
        }
        Ok(PlotOutcome::Generated(paths))
    }

    async fn dump(&self, _settings: &Settings) -> Result<Option<serde_json::Value>> {
        self.data.validate()?;
        let mut value = serde_json::to_value(&self.data)?;
        for (idx, strategy) in self.data.strategies.iter().enumerate() {
            value["strategies"][idx]["cycles_per_byte"] =
                serde_json::json!(strategy.cycles_per_byte()?);
        }
        Ok(Some(value))
    }
}

fn strategy_style(idx: usize) -> SeriesStyle {
    match idx {
        0 => SeriesStyle::new(BLUE, Marker::Circle),
        1 => SeriesStyle::new(GREEN, Marker::Square),
        2 => SeriesStyle::new(RED, Marker::Triangle),
        _ => SeriesStyle::nth(idx),
    }
}

/// One line per strategy over the message sizes
fn per_message_size<F>(data: &NetIoData, full_label: bool, values: F) -> Result<Vec<LineData>>
where
    F: Fn(&Strategy) -> Result<Vec<f64>>,
{
    data.strategies
        .iter()
        .enumerate()
        .map(|(idx, strategy)| {
            Ok(LineData {
                label: if full_label {
                    strategy.label()
                } else {
                    strategy.name.clone()
                },
                points: values(strategy)?
                    .into_iter()
                    .enumerate()
                    .map(|(x, y)| (x as f64, y))
                    .collect(),
                style: strategy_style(idx),
            })
        })
        .collect()
}

fn throughput_chart(data: &NetIoData, path: &Path, size: (u32, u32)) -> Result<()> {
    let series = per_message_size(data, true, |s| Ok(s.throughput_gbps.clone()))?;
    let root = canvas(path, size)?;
    draw_line_panel(
        &root,
        &LinePanel {
            title: Some("Throughput vs Message Size"),
            x_desc: "Message Size",
            y_desc: "Throughput (Gbps)",
            x_axis: XAxis::Categorical(data.message_labels()),
            series: &series,
            legend: true,
            annotate: Some(0),
            note: data.system_note.as_deref(),
        },
    )?;
    root.present().map_err(draw_err)?;
    Ok(())
}

fn latency_chart(data: &NetIoData, path: &Path, size: (u32, u32)) -> Result<()> {
    let series = data
        .strategies
        .iter()
        .enumerate()
        .map(|(idx, strategy)| LineData {
            label: strategy.label(),
            points: data
                .thread_counts
                .iter()
                .zip(&strategy.latency_us)
                .map(|(threads, latency)| (*threads as f64, *latency))
                .collect(),
            style: strategy_style(idx),
        })
        .collect::<Vec<_>>();
    let title = format!(
        "Latency vs Thread Count (Message Size: {})",
        size_label(data.latency_message_size)
    );

    let root = canvas(path, size)?;
    draw_line_panel(
        &root,
        &LinePanel {
            title: Some(title.as_str()),
            x_desc: "Thread Count",
            y_desc: "Average Latency (µs)",
            x_axis: XAxis::Numeric(data.thread_counts.iter().map(|t| *t as f64).collect()),
            series: &series,
            legend: true,
            annotate: Some(0),
            note: data.system_note.as_deref(),
        },
    )?;
    root.present().map_err(draw_err)?;
    Ok(())
}

fn cache_miss_chart(data: &NetIoData, path: &Path, size: (u32, u32)) -> Result<()> {
    let l1 = per_message_size(data, false, |s| {
        Ok(s.l1_misses.iter().map(|m| *m as f64 / 1e6).collect())
    })?;
    let llc = per_message_size(data, false, |s| {
        Ok(s.llc_misses.iter().map(|m| *m as f64 / 1e3).collect())
    })?;

    let root = canvas(path, size)?;
    let areas = grid(&root, Some("Cache Misses Analysis"), 1, 2)?;
    let panels = [
        (
            "L1 Cache Misses vs Message Size",
            "L1 Cache Misses (millions)",
            &l1,
        ),
        (
            "LLC (Last Level Cache) Misses vs Message Size",
            "LLC Misses (thousands)",
            &llc,
        ),
    ];
    for ((title, y_desc, series), area) in panels.into_iter().zip(areas.iter()) {
        draw_line_panel(
            area,
            &LinePanel {
                title: Some(title),
                x_desc: "Message Size",
                y_desc,
                x_axis: XAxis::Categorical(data.message_labels()),
                series,
                legend: true,
                annotate: None,
                note: None,
            },
        )?;
    }
    root.present().map_err(draw_err)?;
    Ok(())
}

fn cycles_per_byte_chart(data: &NetIoData, path: &Path, size: (u32, u32)) -> Result<()> {
    let series = per_message_size(data, true, Strategy::cycles_per_byte)?;
    let root = canvas(path, size)?;
    draw_line_panel(
        &root,
        &LinePanel {
            title: Some("CPU Cycles per Byte Transferred"),
            x_desc: "Message Size",
            y_desc: "CPU Cycles per Byte",
            x_axis: XAxis::Categorical(data.message_labels()),
            series: &series,
            legend: true,
            annotate: Some(0),
            note: data.system_note.as_deref(),
        },
    )?;
    root.present().map_err(draw_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_misses_are_scaled() {
        let data = NetIoData::default();
        let l1 = per_message_size(&data, false, |s| {
            Ok(s.l1_misses.iter().map(|m| *m as f64 / 1e6).collect())
        })
        .unwrap();
        assert_eq!(l1.len(), 3);
        assert_eq!(l1[2].label, "Zero-Copy");
        assert!((l1[0].points[0].1 - 61.018298).abs() < 1e-9);
        assert_eq!(l1[0].points[3].0, 3.0);
    }

    #[test]
    fn full_labels_name_the_call() {
        let data = NetIoData::default();
        let series = per_message_size(&data, true, Strategy::cycles_per_byte).unwrap();
        assert_eq!(series[2].label, "Zero-Copy (MSG_ZEROCOPY)");
        assert_eq!(series[1].style.marker, Marker::Square);
    }

    #[tokio::test]
    async fn dump_includes_cycles_per_byte() {
        let plot = NetIoAnalysis::default();
        let dump = plot.dump(&Settings::default()).await.unwrap().unwrap();
        let cpb = dump["strategies"][0]["cycles_per_byte"].as_array().unwrap();
        assert_eq!(cpb.len(), 4);
        assert_eq!(dump["message_sizes"][2], serde_json::json!(16384));
    }

    #[test]
    fn outputs_in_render_order() {
        assert_eq!(
            NetIoAnalysis::default().outputs(),
            vec![
                "plot_throughput_vs_msgsize.png",
                "plot_latency_vs_threads.png",
                "plot_cache_misses_vs_msgsize.png",
                "plot_cycles_per_byte.png",
            ]
        );
    }

    #[tokio::test]
    async fn invalid_data_fails_before_rendering() {
        let mut plot = NetIoAnalysis::default();
        plot.data.strategies[0].latency_us.pop();
        let settings = Settings {
            output_dir: std::env::temp_dir().join("netio-invalid"),
            ..Default::default()
        };
        assert!(plot.plot(&settings).await.is_err());
        assert!(!settings.output_dir.join("plot_latency_vs_threads.png").exists());
    }
}
