//! Distribution comparison plots.
//!
//! Plot functions build [`Figure`] values and hand them to a [`Canvas`]; the
//! statistics never depend on how a canvas draws. Backends live in
//! [`canvas`].

pub mod canvas;
pub mod density;

use authorship_core::{AuthorshipError, Result};
use serde::{Deserialize, Serialize};

use crate::dataset::Table;
use density::{gaussian_kde, histogram_density, KDE_GRID_POINTS};

pub use canvas::{JsonCanvas, RecordingCanvas, TextCanvas};

// ---------------------------------------------------------------------------
// Figure model
// ---------------------------------------------------------------------------

/// Series colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Blue,
    Red,
}

/// A density curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveSeries {
    pub label: String,
    pub color: Color,
    /// `(x, density)` points in increasing `x`.
    pub points: Vec<(f64, f64)>,
}

/// A density-normalised histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramSeries {
    pub label: String,
    pub color: Color,
    /// Bin edges, one more than `densities`.
    pub edges: Vec<f64>,
    pub densities: Vec<f64>,
}

/// Annotated count grid; `cells[row][col]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heatmap {
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    pub cells: Vec<Vec<usize>>,
}

/// What a figure draws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FigureBody {
    Density { series: Vec<CurveSeries> },
    Histogram { series: Vec<HistogramSeries> },
    Heatmap(Heatmap),
}

/// One titled, labelled chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub body: FigureBody,
}

/// A rendering backend.
pub trait Canvas {
    /// Draw one figure.
    fn render(&mut self, figure: &Figure) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Comparison plots
// ---------------------------------------------------------------------------

/// How each subgroup's distribution is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotMode {
    /// Gaussian kernel density curves.
    Kde,
    /// Density-normalised histograms.
    Histogram,
}

/// Settings shared by the comparison plots.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotOptions {
    /// Label drawn in blue on every figure.
    pub reference_label: String,
    /// Histogram bins per series.
    pub bins: usize,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            reference_label: "human".to_string(),
            bins: 30,
        }
    }
}

impl From<&authorship_core::AnalysisConfig> for PlotOptions {
    fn from(config: &authorship_core::AnalysisConfig) -> Self {
        Self {
            reference_label: config.reference_label.clone(),
            bins: config.bins,
        }
    }
}

/// Overlay `"human"` against every other label as kernel density curves.
pub fn kdeplot_comparison(
    table: &Table,
    column: &str,
    name: &str,
    canvas: &mut dyn Canvas,
) -> Result<()> {
    plot_comparison(table, column, name, PlotMode::Kde, &PlotOptions::default(), canvas)
}

/// Overlay `"human"` against every other label as 30-bin density histograms.
pub fn histplot_comparison(
    table: &Table,
    column: &str,
    name: &str,
    canvas: &mut dyn Canvas,
) -> Result<()> {
    plot_comparison(
        table,
        column,
        name,
        PlotMode::Histogram,
        &PlotOptions::default(),
        canvas,
    )
}

/// Render one figure per non-reference label, in label order.
///
/// Every figure is built before the first one is rendered, so a failing
/// group leaves the canvas untouched.
///
/// # Errors
///
/// - `ColumnNotFound` if no row has a numeric value for `column`
/// - `EmptyGroup` if the reference group or a compared group has no values
/// - `UndefinedStatistic` if a KDE is requested for a group with fewer than
///   two distinct values
pub fn plot_comparison(
    table: &Table,
    column: &str,
    name: &str,
    mode: PlotMode,
    options: &PlotOptions,
    canvas: &mut dyn Canvas,
) -> Result<()> {
    let groups = table.grouped(column)?;
    let reference = groups
        .get(&options.reference_label)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AuthorshipError::EmptyGroup(options.reference_label.clone()))?;

    let mut figures = Vec::new();
    for (label, values) in groups.iter().filter(|(l, _)| **l != options.reference_label) {
        if values.is_empty() {
            return Err(AuthorshipError::EmptyGroup(label.clone()));
        }

        let body = match mode {
            PlotMode::Kde => FigureBody::Density {
                series: vec![
                    curve(&options.reference_label, Color::Blue, reference)?,
                    curve(label, Color::Red, values)?,
                ],
            },
            PlotMode::Histogram => FigureBody::Histogram {
                series: vec![
                    histogram(&options.reference_label, Color::Blue, reference, options.bins)?,
                    histogram(label, Color::Red, values, options.bins)?,
                ],
            },
        };

        figures.push(Figure {
            title: format!(
                "{name} : {} vs {}",
                capitalize(&options.reference_label),
                capitalize(label)
            ),
            x_label: name.to_string(),
            y_label: "Density".to_string(),
            body,
        });
    }

    tracing::debug!(column, figures = figures.len(), ?mode, "Rendering comparison plots");
    for figure in &figures {
        canvas.render(figure)?;
    }
    Ok(())
}

fn curve(label: &str, color: Color, values: &[f64]) -> Result<CurveSeries> {
    let points = gaussian_kde(values, KDE_GRID_POINTS).map_err(|e| match e {
        AuthorshipError::UndefinedStatistic(msg) => {
            AuthorshipError::UndefinedStatistic(format!("{label}: {msg}"))
        }
        other => other,
    })?;
    Ok(CurveSeries {
        label: label.to_string(),
        color,
        points,
    })
}

fn histogram(label: &str, color: Color, values: &[f64], bins: usize) -> Result<HistogramSeries> {
    let (edges, densities) = histogram_density(values, bins)?;
    Ok(HistogramSeries {
        label: label.to_string(),
        color,
        edges,
        densities,
    })
}

/// Upper-case the first character and lower-case the rest.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Observation;

    fn table() -> Table {
        let mut rows = Vec::new();
        for v in [1.0, 2.0, 2.5, 3.0] {
            rows.push(Observation::new("human").with_value("len", v));
        }
        for v in [4.0, 5.0, 6.5] {
            rows.push(Observation::new("chatgpt").with_value("len", v));
        }
        for v in [2.0, 4.0] {
            rows.push(Observation::new("polish").with_value("len", v));
        }
        Table::from_rows(rows)
    }

    #[test]
    fn test_one_figure_per_non_reference_label() {
        let mut canvas = RecordingCanvas::default();
        kdeplot_comparison(&table(), "len", "Length", &mut canvas).unwrap();
        let titles: Vec<&str> = canvas.figures().iter().map(|f| f.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Length : Human vs Chatgpt", "Length : Human vs Polish"]
        );

        let figure = &canvas.figures()[0];
        assert_eq!(figure.x_label, "Length");
        assert_eq!(figure.y_label, "Density");
        match &figure.body {
            FigureBody::Density { series } => {
                assert_eq!(series.len(), 2);
                assert_eq!(series[0].label, "human");
                assert_eq!(series[0].color, Color::Blue);
                assert_eq!(series[1].label, "chatgpt");
                assert_eq!(series[1].color, Color::Red);
                assert_eq!(series[0].points.len(), KDE_GRID_POINTS);
            }
            other => panic!("expected density figure, got {other:?}"),
        }
    }

    #[test]
    fn test_histogram_mode_uses_thirty_bins() {
        let mut canvas = RecordingCanvas::default();
        histplot_comparison(&table(), "len", "Length", &mut canvas).unwrap();
        assert_eq!(canvas.figures().len(), 2);
        match &canvas.figures()[1].body {
            FigureBody::Histogram { series } => {
                assert!(series.iter().all(|s| s.densities.len() == 30));
                assert!(series.iter().all(|s| s.edges.len() == 31));
            }
            other => panic!("expected histogram figure, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_reference_group() {
        let t = Table::from_rows(vec![
            Observation::new("chatgpt").with_value("len", 1.0),
            Observation::new("chatgpt").with_value("len", 2.0),
        ]);
        let mut canvas = RecordingCanvas::default();
        let result = histplot_comparison(&t, "len", "Length", &mut canvas);
        assert!(matches!(result, Err(AuthorshipError::EmptyGroup(l)) if l == "human"));
        assert!(canvas.figures().is_empty());
    }

    #[test]
    fn test_empty_comparison_group_renders_nothing() {
        let mut rows = table().rows().to_vec();
        rows.push(Observation::new("mix"));
        let mut canvas = RecordingCanvas::default();
        let result = histplot_comparison(&Table::from_rows(rows), "len", "Length", &mut canvas);
        assert!(matches!(result, Err(AuthorshipError::EmptyGroup(l)) if l == "mix"));
        assert!(canvas.figures().is_empty());
    }

    #[test]
    fn test_only_reference_label_renders_nothing() {
        let t = Table::from_rows(vec![Observation::new("human").with_value("len", 1.0)]);
        let mut canvas = RecordingCanvas::default();
        histplot_comparison(&t, "len", "Length", &mut canvas).unwrap();
        assert!(canvas.figures().is_empty());
    }

    #[test]
    fn test_custom_reference_label() {
        let options = PlotOptions {
            reference_label: "chatgpt".to_string(),
            bins: 5,
        };
        let mut canvas = RecordingCanvas::default();
        plot_comparison(&table(), "len", "Length", PlotMode::Histogram, &options, &mut canvas)
            .unwrap();
        let titles: Vec<&str> = canvas.figures().iter().map(|f| f.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Length : Chatgpt vs Human", "Length : Chatgpt vs Polish"]
        );
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("chatGPT"), "Chatgpt");
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("x"), "X");
    }
}
