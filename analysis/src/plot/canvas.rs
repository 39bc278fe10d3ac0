//! Canvas backends: terminal text, JSON files, and in-memory recording.

use std::io::Write;
use std::path::{Path, PathBuf};

use authorship_core::Result;

use super::{Canvas, Figure, FigureBody, Heatmap};

/// Width in characters of the longest bar.
const BAR_WIDTH: usize = 40;

/// Rows drawn for a density curve.
const CURVE_ROWS: usize = 24;

/// Glyphs per series, in series order.
const GLYPHS: [char; 2] = ['#', '*'];

// ---------------------------------------------------------------------------
// TextCanvas
// ---------------------------------------------------------------------------

/// Draws figures as text bar charts and tables.
pub struct TextCanvas<W: Write> {
    out: W,
}

impl<W: Write> TextCanvas<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn bar(value: f64, max: f64, glyph: char) -> String {
        let len = if max > 0.0 {
            ((value / max) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        std::iter::repeat(glyph).take(len.min(BAR_WIDTH)).collect()
    }

    fn legend(&mut self, labels: &[&str]) -> std::io::Result<()> {
        let entries: Vec<String> = labels
            .iter()
            .zip(GLYPHS.iter().cycle())
            .map(|(label, glyph)| format!("{glyph} {label}"))
            .collect();
        writeln!(self.out, "legend: {}", entries.join("   "))
    }

    fn render_heatmap(&mut self, figure: &Figure, heatmap: &Heatmap) -> std::io::Result<()> {
        let corner = format!("{} \\ {}", figure.y_label, figure.x_label);
        let mut header = format!("| {corner:<18} |");
        for col in &heatmap.col_labels {
            header.push_str(&format!(" {col:>8} |"));
        }
        writeln!(self.out, "{header}")?;

        let mut separator = format!("|{:-<20}|", "");
        for _ in &heatmap.col_labels {
            separator.push_str(&format!("{:->10}|", ""));
        }
        writeln!(self.out, "{separator}")?;

        for (row_label, row) in heatmap.row_labels.iter().zip(&heatmap.cells) {
            let mut line = format!("| {row_label:<18} |");
            for count in row {
                line.push_str(&format!(" {count:>8} |"));
            }
            writeln!(self.out, "{line}")?;
        }
        Ok(())
    }
}

impl<W: Write> Canvas for TextCanvas<W> {
    fn render(&mut self, figure: &Figure) -> Result<()> {
        writeln!(self.out, "\n=== {} ===", figure.title)?;

        match &figure.body {
            FigureBody::Density { series } => {
                let max = series
                    .iter()
                    .flat_map(|s| s.points.iter().map(|p| p.1))
                    .fold(0.0, f64::max);
                writeln!(self.out, "{:>12} | {}", figure.x_label, figure.y_label)?;
                for (s, glyph) in series.iter().zip(GLYPHS.iter().cycle()) {
                    if s.points.is_empty() {
                        continue;
                    }
                    let stride = (s.points.len() / CURVE_ROWS).max(1);
                    for (x, y) in s.points.iter().step_by(stride) {
                        writeln!(self.out, "{x:>12.4} | {}", Self::bar(*y, max, *glyph))?;
                    }
                    writeln!(self.out, "{:>12} |", "")?;
                }
                let labels: Vec<&str> = series.iter().map(|s| s.label.as_str()).collect();
                self.legend(&labels)?;
            }
            FigureBody::Histogram { series } => {
                let max = series
                    .iter()
                    .flat_map(|s| s.densities.iter().copied())
                    .fold(0.0, f64::max);
                writeln!(self.out, "{:>25} | {}", figure.x_label, figure.y_label)?;
                for (s, glyph) in series.iter().zip(GLYPHS.iter().cycle()) {
                    for (edge, density) in s.edges.windows(2).zip(&s.densities) {
                        writeln!(
                            self.out,
                            "[{:>10.4}, {:>10.4}] | {}",
                            edge[0],
                            edge[1],
                            Self::bar(*density, max, *glyph)
                        )?;
                    }
                    writeln!(self.out, "{:>25} |", "")?;
                }
                let labels: Vec<&str> = series.iter().map(|s| s.label.as_str()).collect();
                self.legend(&labels)?;
            }
            FigureBody::Heatmap(heatmap) => self.render_heatmap(figure, heatmap)?,
        }

        self.out.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JsonCanvas
// ---------------------------------------------------------------------------

/// Writes each figure as a pretty-printed JSON file in a directory.
///
/// Files are named `NN_<title-slug>.json` in render order.
pub struct JsonCanvas {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl JsonCanvas {
    /// Create the output directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            written: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Paths written so far, in render order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl Canvas for JsonCanvas {
    fn render(&mut self, figure: &Figure) -> Result<()> {
        let path = self
            .dir
            .join(format!("{:02}_{}.json", self.written.len(), slug(&figure.title)));
        let json = serde_json::to_string_pretty(figure)?;
        std::fs::write(&path, json)?;
        tracing::info!(path = %path.display(), "Wrote figure");
        self.written.push(path);
        Ok(())
    }
}

fn slug(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "figure".to_string()
    } else {
        trimmed.to_string()
    }
}

// ---------------------------------------------------------------------------
// RecordingCanvas
// ---------------------------------------------------------------------------

/// Keeps rendered figures in memory.
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    figures: Vec<Figure>,
}

impl RecordingCanvas {
    pub fn figures(&self) -> &[Figure] {
        &self.figures
    }

    pub fn into_figures(self) -> Vec<Figure> {
        self.figures
    }
}

impl Canvas for RecordingCanvas {
    fn render(&mut self, figure: &Figure) -> Result<()> {
        self.figures.push(figure.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::{Color, CurveSeries, HistogramSeries};

    fn heatmap_figure() -> Figure {
        Figure {
            title: "Confusion Matrix".to_string(),
            x_label: "Predicted".to_string(),
            y_label: "True".to_string(),
            body: FigureBody::Heatmap(Heatmap {
                row_labels: vec!["0".to_string(), "1".to_string()],
                col_labels: vec!["0".to_string(), "1".to_string()],
                cells: vec![vec![2, 0], vec![1, 1]],
            }),
        }
    }

    #[test]
    fn test_text_canvas_heatmap() {
        let mut canvas = TextCanvas::new(Vec::new());
        canvas.render(&heatmap_figure()).unwrap();
        let text = String::from_utf8(canvas.into_inner()).unwrap();
        assert!(text.contains("=== Confusion Matrix ==="));
        assert!(text.contains("True \\ Predicted"));
        let rows: Vec<&str> = text.lines().filter(|l| l.starts_with("| 1 ")).collect();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].contains("        1 |        1 |"));
    }

    #[test]
    fn test_text_canvas_density_scales_bars() {
        let figure = Figure {
            title: "Len : Human vs Ai".to_string(),
            x_label: "Len".to_string(),
            y_label: "Density".to_string(),
            body: FigureBody::Density {
                series: vec![
                    CurveSeries {
                        label: "human".to_string(),
                        color: Color::Blue,
                        points: vec![(0.0, 0.5), (1.0, 1.0)],
                    },
                    CurveSeries {
                        label: "ai".to_string(),
                        color: Color::Red,
                        points: vec![(0.0, 0.0)],
                    },
                ],
            },
        };
        let mut canvas = TextCanvas::new(Vec::new());
        canvas.render(&figure).unwrap();
        let text = String::from_utf8(canvas.into_inner()).unwrap();
        assert!(text.contains(&"#".repeat(BAR_WIDTH)));
        assert!(text.contains(&format!("| {}\n", "#".repeat(BAR_WIDTH / 2))));
        assert!(text.contains("legend: # human   * ai"));
    }

    #[test]
    fn test_text_canvas_histogram_rows() {
        let figure = Figure {
            title: "h".to_string(),
            x_label: "x".to_string(),
            y_label: "Density".to_string(),
            body: FigureBody::Histogram {
                series: vec![HistogramSeries {
                    label: "human".to_string(),
                    color: Color::Blue,
                    edges: vec![0.0, 1.0, 2.0],
                    densities: vec![0.25, 0.75],
                }],
            },
        };
        let mut canvas = TextCanvas::new(Vec::new());
        canvas.render(&figure).unwrap();
        let text = String::from_utf8(canvas.into_inner()).unwrap();
        assert_eq!(text.lines().filter(|l| l.starts_with('[')).count(), 2);
    }

    #[test]
    fn test_json_canvas_writes_numbered_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut canvas = JsonCanvas::new(dir.path().join("figs")).unwrap();
        canvas.render(&heatmap_figure()).unwrap();
        canvas.render(&heatmap_figure()).unwrap();

        let written = canvas.written();
        assert_eq!(written.len(), 2);
        assert!(written[0].ends_with("00_confusion_matrix.json"));
        assert!(written[1].ends_with("01_confusion_matrix.json"));

        let json = std::fs::read_to_string(&written[0]).unwrap();
        let parsed: Figure = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, heatmap_figure());
        assert!(json.contains("\"kind\": \"heatmap\""));
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("Length : Human vs Chatgpt"), "length_human_vs_chatgpt");
        assert_eq!(slug("::"), "figure");
    }
}
