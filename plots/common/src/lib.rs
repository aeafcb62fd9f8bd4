use std::{fmt::Debug, ops::Range, path::Path};

use eyre::{Result, eyre};
use plotters::{coord::Shift, prelude::*, series::DashedLineSeries};
use serde::{Deserialize, Serialize};

pub const FONT: &str = "sans-serif";
pub const MONO_FONT: &str = "monospace";

/// Two-copy / process colour
pub const BLUE: RGBColor = RGBColor(0x34, 0x98, 0xdb);
pub const GREEN: RGBColor = RGBColor(0x2e, 0xcc, 0x71);
/// Zero-copy / thread colour
pub const RED: RGBColor = RGBColor(0xe7, 0x4c, 0x3c);
const PALETTE: [RGBColor; 4] = [BLUE, RED, GREEN, RGBColor(0xf3, 0x9c, 0x12)];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Marker {
    #[default]
    Circle,
    Cross,
    Square,
    Triangle,
}

#[derive(Debug, Clone, Copy)]
pub struct SeriesStyle {
    pub color: RGBColor,
    pub marker: Marker,
    pub dashed: bool,
}

impl SeriesStyle {
    pub fn new(color: RGBColor, marker: Marker) -> Self {
        Self {
            color,
            marker,
            dashed: false,
        }
    }

    /// Style of the `idx`-th series when none is configured
    pub fn nth(idx: usize) -> Self {
        let marker = match idx % 4 {
            0 => Marker::Circle,
            1 => Marker::Cross,
            2 => Marker::Square,
            _ => Marker::Triangle,
        };
        Self::new(PALETTE[idx % PALETTE.len()], marker)
    }

    pub fn dashed(mut self) -> Self {
        self.dashed = true;
        self
    }
}

/// A program variant to plot and its legend label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSpec {
    pub id: String,
    pub label: String,
}

impl VariantSpec {
    pub fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_owned(),
            label: label.to_owned(),
        }
    }
}

pub fn default_tasks() -> Vec<String> {
    vec!["cpu".to_owned(), "mem".to_owned(), "io".to_owned()]
}

/// One line of a [`LinePanel`]
#[derive(Debug, Clone)]
pub struct LineData {
    pub label: String,
    pub points: Vec<(f64, f64)>,
    pub style: SeriesStyle,
}

/// How the x axis of a line panel is labelled
#[derive(Debug, Clone)]
pub enum XAxis {
    /// Ticks at the given values
    Numeric(Vec<f64>),
    /// Ticks at `0..n`, labelled with the given names
    Categorical(Vec<String>),
}

impl XAxis {
    /// Ticks at every distinct x value of the series
    pub fn from_series(series: &[LineData]) -> Self {
        let mut ticks = series
            .iter()
            .flat_map(|s| s.points.iter().map(|(x, _)| *x))
            .collect::<Vec<_>>();
        ticks.sort_by(f64::total_cmp);
        ticks.dedup();
        XAxis::Numeric(ticks)
    }

    /// Upper bound on x labels. A categorical range `-0.5..n-0.5` allows
    /// exactly one label per integer position.
    fn label_count(&self) -> usize {
        match self {
            XAxis::Numeric(ticks) => (ticks.len() * 2).max(5),
            XAxis::Categorical(names) => names.len().max(1),
        }
    }

    fn range(&self) -> Range<f64> {
        match self {
            XAxis::Categorical(names) => -0.5..(names.len().max(1) as f64 - 0.5),
            XAxis::Numeric(ticks) => {
                let range = value_range(ticks.iter().copied(), false);
                let pad = (range.end - range.start) * 0.05;
                (range.start - pad)..(range.end + pad)
            }
        }
    }

    fn format(&self, x: f64) -> String {
        match self {
            XAxis::Categorical(names) => {
                let idx = x.round();
                if (x - idx).abs() < 1e-6 && idx >= 0.0 {
                    names.get(idx as usize).cloned().unwrap_or_default()
                } else {
                    String::new()
                }
            }
            XAxis::Numeric(_) => format_number(x),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LinePanel<'a> {
    pub title: Option<&'a str>,
    pub x_desc: &'a str,
    pub y_desc: &'a str,
    pub x_axis: XAxis,
    pub series: &'a [LineData],
    pub legend: bool,
    /// Label the points of this series with their value
    pub annotate: Option<usize>,
    /// Boxed text in the upper left corner
    pub note: Option<&'a str>,
}

/// One bar per category, all bars of a group share a colour
#[derive(Debug, Clone)]
pub struct BarGroup {
    pub label: String,
    pub values: Vec<f64>,
    pub color: RGBColor,
}

#[derive(Debug, Clone)]
pub struct BarPanel<'a> {
    pub title: Option<&'a str>,
    pub y_desc: &'a str,
    pub categories: &'a [String],
    pub groups: &'a [BarGroup],
    pub legend: bool,
}

pub fn draw_err<E: Debug>(err: E) -> eyre::Report {
    eyre!("Drawing failed: {err:?}")
}

fn format_number(x: f64) -> String {
    if (x - x.round()).abs() < 1e-9 {
        format!("{x:.0}")
    } else {
        format!("{x:.1}")
    }
}

/// Axis range covering `values`, always including zero when `from_zero` is
/// set, with head room for value labels
pub fn value_range(values: impl Iterator<Item = f64>, from_zero: bool) -> Range<f64> {
    let (mut min, mut max) = values
        .filter(|v| v.is_finite())
        .fold((f64::MAX, f64::MIN), |(min, max), v| (min.min(v), max.max(v)));
    if min > max {
        return 0.0..1.0;
    }
    if from_zero {
        min = min.min(0.0);
        max = max.max(0.0);
        if max > 0.0 {
            max *= 1.15;
        }
        if min < 0.0 {
            min *= 1.15;
        }
    }
    if (max - min).abs() < f64::EPSILON {
        min -= 1.0;
        max += 1.0;
    }
    min..max
}

/// A white PNG canvas of `size` pixels at `path`
pub fn canvas(path: &Path, size: (u32, u32)) -> Result<DrawingArea<BitMapBackend<'_>, Shift>> {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;
    Ok(root)
}

/// Splits `root` below an optional figure title into a `rows` x `cols` grid
pub fn grid<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    title: Option<&str>,
    rows: usize,
    cols: usize,
) -> Result<Vec<DrawingArea<DB, Shift>>> {
    let area = match title {
        Some(title) => root.titled(title, (FONT, 28).into_font()).map_err(draw_err)?,
        None => root.clone(),
    };
    Ok(area.split_evenly((rows, cols)))
}

macro_rules! draw_markers {
    ($chart:expr, $points:expr, $style:expr) => {{
        let color = $style.color;
        let points = $points.iter().copied();
        let drawn = match $style.marker {
            Marker::Circle => $chart
                .draw_series(points.map(|p| Circle::new(p, 4, color.filled())))
                .map(|_| ()),
            Marker::Cross => $chart
                .draw_series(points.map(|p| Cross::new(p, 4, color.stroke_width(2))))
                .map(|_| ()),
            Marker::Triangle => $chart
                .draw_series(points.map(|p| TriangleMarker::new(p, 5, color.filled())))
                .map(|_| ()),
            Marker::Square => $chart
                .draw_series(
                    points.map(|p| EmptyElement::at(p) + Rectangle::new([(-4, -4), (4, 4)], color.filled())),
                )
                .map(|_| ()),
        };
        drawn.map_err(draw_err)
    }};
}

pub fn draw_line_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    panel: &LinePanel<'_>,
) -> Result<()> {
    let y_range = value_range(
        panel
            .series
            .iter()
            .flat_map(|s| s.points.iter().map(|(_, y)| *y)),
        true,
    );
    let x_range = panel.x_axis.range();

    let mut builder = ChartBuilder::on(area);
    builder
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70);
    if let Some(title) = panel.title {
        builder.caption(title, (FONT, 20).into_font());
    }
    let mut chart = builder
        .build_cartesian_2d(x_range, y_range)
        .map_err(draw_err)?;

    let x_formatter = |x: &f64| panel.x_axis.format(*x);
    let y_formatter = |y: &f64| format_number(*y);
    chart
        .configure_mesh()
        .x_labels(panel.x_axis.label_count())
        .x_desc(panel.x_desc)
        .y_desc(panel.y_desc)
        .x_label_formatter(&x_formatter)
        .y_label_formatter(&y_formatter)
        .light_line_style(BLACK.mix(0.05))
        .bold_line_style(BLACK.mix(0.15))
        .axis_desc_style((FONT, 16).into_font())
        .label_style((FONT, 13).into_font())
        .draw()
        .map_err(draw_err)?;

    for (idx, line) in panel.series.iter().enumerate() {
        let color = line.style.color;
        let stroke = color.stroke_width(2);
        let drawn = if line.style.dashed {
            chart.draw_series(DashedLineSeries::new(line.points.iter().copied(), 8, 5, stroke))
        } else {
            chart.draw_series(LineSeries::new(line.points.iter().copied(), stroke))
        };
        let anno = drawn.map_err(draw_err)?;
        anno.label(line.label.as_str()).legend(move |(x, y)| {
            PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
        });

        draw_markers!(chart, line.points, line.style)?;

        if panel.annotate == Some(idx) {
            chart
                .draw_series(line.points.iter().map(|&(x, y)| {
                    EmptyElement::at((x, y))
                        + Text::new(format!("{y:.1}"), (-10, -18), (FONT, 12).into_font())
                }))
                .map_err(draw_err)?;
        }
    }

    if panel.legend {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .label_font((FONT, 14).into_font())
            .draw()
            .map_err(draw_err)?;
    }

    if let Some(note) = panel.note {
        draw_note(area, note, (90, 50))?;
    }
    Ok(())
}

pub fn draw_bar_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    panel: &BarPanel<'_>,
) -> Result<()> {
    let y_range = value_range(
        panel.groups.iter().flat_map(|g| g.values.iter().copied()),
        true,
    );
    let x_axis = XAxis::Categorical(panel.categories.to_vec());
    let width = 0.8 / panel.groups.len().max(1) as f64;

    let mut builder = ChartBuilder::on(area);
    builder
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(70);
    if let Some(title) = panel.title {
        builder.caption(title, (FONT, 20).into_font());
    }
    let mut chart = builder
        .build_cartesian_2d(x_axis.range(), y_range)
        .map_err(draw_err)?;

    let x_formatter = |x: &f64| x_axis.format(*x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(x_axis.label_count())
        .y_desc(panel.y_desc)
        .x_label_formatter(&x_formatter)
        .light_line_style(BLACK.mix(0.05))
        .bold_line_style(BLACK.mix(0.2))
        .axis_desc_style((FONT, 16).into_font())
        .label_style((FONT, 13).into_font())
        .draw()
        .map_err(draw_err)?;

    for (g_idx, group) in panel.groups.iter().enumerate() {
        let offset = (g_idx as f64 - (panel.groups.len() as f64 - 1.0) / 2.0) * width;
        let color = group.color;
        let bars = group
            .values
            .iter()
            .enumerate()
            .map(|(c_idx, value)| {
                let x = c_idx as f64 + offset;
                (x - width / 2.0, x + width / 2.0, *value)
            })
            .collect::<Vec<_>>();

        chart
            .draw_series(
                bars.iter()
                    .map(|(x0, x1, v)| Rectangle::new([(*x0, 0.0), (*x1, *v)], color.filled())),
            )
            .map_err(draw_err)?
            .label(group.label.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], color.filled()));

        chart
            .draw_series(bars.iter().map(|(x0, x1, v)| {
                EmptyElement::at(((x0 + x1) / 2.0, *v))
                    + Text::new(format!("{v:.1}"), (-10, -16), (FONT, 12).into_font())
            }))
            .map_err(draw_err)?;
    }

    if panel.legend {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .label_font((FONT, 14).into_font())
            .draw()
            .map_err(draw_err)?;
    }
    Ok(())
}

/// Draws `text` line by line on a light box at `pos` (pixels)
pub fn draw_note<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    text: &str,
    pos: (i32, i32),
) -> Result<()> {
    let lines = text.lines().collect::<Vec<_>>();
    let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) as i32 * 7 + 12;
    let height = lines.len() as i32 * 13 + 10;
    area.draw(&Rectangle::new(
        [pos, (pos.0 + width, pos.1 + height)],
        RGBColor(0xf5, 0xde, 0xb3).mix(0.5).filled(),
    ))
    .map_err(draw_err)?;
    for (idx, line) in lines.iter().enumerate() {
        area.draw(&Text::new(
            line.to_string(),
            (pos.0 + 6, pos.1 + 5 + idx as i32 * 13),
            (MONO_FONT, 11).into_font(),
        ))
        .map_err(draw_err)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_range_starts_at_zero_with_headroom() {
        let range = value_range([2.0, 10.0].into_iter(), true);
        assert_eq!(range.start, 0.0);
        assert!((range.end - 11.5).abs() < 1e-9);
    }

    #[test]
    fn value_range_of_nothing() {
        assert_eq!(value_range(std::iter::empty(), true), 0.0..1.0);
        assert_eq!(value_range([f64::NAN].into_iter(), false), 0.0..1.0);
    }

    #[test]
    fn flat_range_is_widened() {
        assert_eq!(value_range([4.0, 4.0].into_iter(), false), 3.0..5.0);
    }

    #[test]
    fn categorical_axis_labels_integer_positions() {
        let axis = XAxis::Categorical(vec!["1KB".to_owned(), "4KB".to_owned()]);
        assert_eq!(axis.format(0.0), "1KB");
        assert_eq!(axis.format(1.0), "4KB");
        assert_eq!(axis.format(0.5), "");
        assert_eq!(axis.format(2.0), "");
        assert_eq!(axis.label_count(), 2);
        assert_eq!(axis.range(), -0.5..1.5);
    }

    #[test]
    fn numeric_ticks_from_series() {
        let series = [
            LineData {
                label: "a".to_owned(),
                points: vec![(4.0, 1.0), (1.0, 2.0)],
                style: SeriesStyle::nth(0),
            },
            LineData {
                label: "b".to_owned(),
                points: vec![(2.0, 1.0), (4.0, 2.0)],
                style: SeriesStyle::nth(1),
            },
        ];
        match XAxis::from_series(&series) {
            XAxis::Numeric(ticks) => assert_eq!(ticks, vec![1.0, 2.0, 4.0]),
            other => panic!("unexpected axis {other:?}"),
        }
    }

    /// Text layout needs a system font; without one there is nothing to draw
    fn font_available() -> bool {
        (FONT, 12).into_font().box_size("0").is_ok()
    }

    #[test]
    fn line_panel_renders_to_svg() {
        if !font_available() {
            return;
        }
        let series = [
            LineData {
                label: "Process (A)".to_owned(),
                points: vec![(1.0, 2.0), (2.0, 3.5), (4.0, 6.0)],
                style: SeriesStyle::nth(0),
            },
            LineData {
                label: "Thread (B)".to_owned(),
                points: vec![(1.0, 1.0), (4.0, 2.0)],
                style: SeriesStyle::nth(1).dashed(),
            },
        ];
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (800, 600)).into_drawing_area();
            root.fill(&WHITE).unwrap();
            draw_line_panel(
                &root,
                &LinePanel {
                    title: Some("Scaling"),
                    x_desc: "Workers",
                    y_desc: "Seconds",
                    x_axis: XAxis::from_series(&series),
                    series: &series,
                    legend: true,
                    annotate: Some(0),
                    note: Some("CPU: test\nMemory: 1GB"),
                },
            )
            .unwrap();
            root.present().unwrap();
        }
        assert!(svg.contains("Scaling"));
        assert!(svg.contains("Thread (B)"));
        assert!(svg.contains("3.5"));
        assert!(svg.contains("Memory: 1GB"));
    }

    #[test]
    fn categorical_line_panel_renders_to_svg() {
        if !font_available() {
            return;
        }
        let series = [LineData {
            label: "Zero-Copy".to_owned(),
            points: vec![(0.0, 0.3), (1.0, 1.2), (2.0, 4.3)],
            style: SeriesStyle::new(RED, Marker::Triangle),
        }];
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (800, 600)).into_drawing_area();
            let areas = grid(&root, Some("Throughput"), 1, 1).unwrap();
            draw_line_panel(
                &areas[0],
                &LinePanel {
                    title: None,
                    x_desc: "Message Size",
                    y_desc: "Gbps",
                    x_axis: XAxis::Categorical(vec![
                        "1KB".to_owned(),
                        "4KB".to_owned(),
                        "16KB".to_owned(),
                    ]),
                    series: &series,
                    legend: false,
                    annotate: None,
                    note: None,
                },
            )
            .unwrap();
            root.present().unwrap();
        }
        assert!(svg.contains("16KB"));
        assert!(svg.contains("Throughput"));
    }

    #[test]
    fn bar_panel_renders_to_svg() {
        if !font_available() {
            return;
        }
        let categories = vec!["CPU".to_owned(), "MEM".to_owned(), "IO".to_owned()];
        let groups = [
            BarGroup {
                label: "Processes (A)".to_owned(),
                values: vec![5.0, 0.0, 2.5],
                color: BLUE,
            },
            BarGroup {
                label: "Threads (B)".to_owned(),
                values: vec![4.0, 1.5, 0.0],
                color: RED,
            },
        ];
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (800, 600)).into_drawing_area();
            root.fill(&WHITE).unwrap();
            draw_bar_panel(
                &root,
                &BarPanel {
                    title: Some("Duration Comparison"),
                    y_desc: "Duration",
                    categories: &categories,
                    groups: &groups,
                    legend: true,
                },
            )
            .unwrap();
            root.present().unwrap();
        }
        assert!(svg.contains("Duration Comparison"));
        assert!(svg.contains("MEM"));
        assert!(svg.contains("Threads (B)"));
        assert!(svg.contains("2.5"));
    }
}
