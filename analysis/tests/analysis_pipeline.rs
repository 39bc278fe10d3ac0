//! End-to-end flow over files on disk: load a feature table, describe it,
//! test the difference in means, write figures, and report predictions.

use authorship_analysis::prelude::*;
use authorship_core::AuthorshipError;
use std::io::Write;
use tempfile::NamedTempFile;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const FEATURES_JSON: &str = r#"[
  {"label": "human",   "perplexity": 40.0, "text": "a"},
  {"label": "human",   "perplexity": 42.0, "text": "b"},
  {"label": "human",   "perplexity": 45.0, "text": "c"},
  {"label": "human",   "perplexity": 41.0, "text": "d"},
  {"label": "human",   "perplexity": 44.0, "text": "e"},
  {"label": "chatgpt", "perplexity": 12.0, "text": "f"},
  {"label": "chatgpt", "perplexity": 15.0, "text": "g"},
  {"label": "chatgpt", "perplexity": 13.0, "text": "h"},
  {"label": "chatgpt", "perplexity": 14.0, "text": "i"},
  {"label": "chatgpt", "perplexity": 11.0, "text": "j"},
  {"label": "polish",  "perplexity": 30.0, "text": "k"},
  {"label": "polish",  "perplexity": 28.0, "text": "l"},
  {"label": "polish",  "perplexity": 33.0, "text": "m"}
]"#;

fn write_json(json: &str) -> NamedTempFile {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(json.as_bytes()).unwrap();
    f
}

fn load_features() -> Table {
    let f = write_json(FEATURES_JSON);
    Table::load_from_file(f.path()).unwrap()
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[test]
fn test_describe_then_compare() {
    let table = load_features();
    assert_eq!(table.labels(), vec!["chatgpt", "human", "polish"]);

    let stats = get_statistics_df(&table, "perplexity").unwrap();
    assert_eq!(stats.labels(), vec!["chatgpt", "human", "polish"]);

    let human = stats.get("human").unwrap();
    assert_eq!(human.count, 5);
    assert!((human.mean - 42.4).abs() < 1e-12);
    assert!((human.std - 4.3f64.sqrt()).abs() < 1e-12);
    assert_eq!(human.median, 42.0);

    let result = compare_groups(&stats, "human", "chatgpt").unwrap();
    let expected_t = 29.4 / 1.36f64.sqrt();
    assert!((result.t_stat - expected_t).abs() < 1e-9);
    assert!(result.is_significant(0.001));

    let reversed = compare_groups(&stats, "chatgpt", "human").unwrap();
    assert!((result.t_stat + reversed.t_stat).abs() < 1e-12);
    assert!((result.p_value - reversed.p_value).abs() < 1e-15);
}

#[test]
fn test_compare_unknown_label() {
    let stats = get_statistics_df(&load_features(), "perplexity").unwrap();
    assert!(matches!(
        compare_groups(&stats, "human", "mix"),
        Err(AuthorshipError::LabelNotFound(l)) if l == "mix"
    ));
}

#[test]
fn test_describe_unknown_column() {
    assert!(matches!(
        get_statistics_df(&load_features(), "burstiness"),
        Err(AuthorshipError::ColumnNotFound(_))
    ));
}

// ---------------------------------------------------------------------------
// Figures
// ---------------------------------------------------------------------------

#[test]
fn test_plots_written_as_json_files() {
    let table = load_features();
    let dir = tempfile::tempdir().unwrap();

    let mut canvas = JsonCanvas::new(dir.path()).unwrap();
    kdeplot_comparison(&table, "perplexity", "Perplexity", &mut canvas).unwrap();
    histplot_comparison(&table, "perplexity", "Perplexity", &mut canvas).unwrap();

    let written = canvas.written().to_vec();
    assert_eq!(written.len(), 4);
    assert!(written[0].ends_with("00_perplexity_human_vs_chatgpt.json"));
    assert!(written[1].ends_with("01_perplexity_human_vs_polish.json"));

    let figure: Figure =
        serde_json::from_str(&std::fs::read_to_string(&written[3]).unwrap()).unwrap();
    assert_eq!(figure.title, "Perplexity : Human vs Polish");
    assert_eq!(figure.x_label, "Perplexity");
    assert_eq!(figure.y_label, "Density");
}

#[test]
fn test_text_canvas_draws_every_figure() {
    let table = load_features();
    let mut canvas = TextCanvas::new(Vec::new());
    histplot_comparison(&table, "perplexity", "Perplexity", &mut canvas).unwrap();
    let text = String::from_utf8(canvas.into_inner()).unwrap();
    assert!(text.contains("=== Perplexity : Human vs Chatgpt ==="));
    assert!(text.contains("=== Perplexity : Human vs Polish ==="));
}

// ---------------------------------------------------------------------------
// Prediction reports
// ---------------------------------------------------------------------------

#[test]
fn test_report_from_prediction_file() {
    let f = write_json(
        r#"[
          {"label": 0, "predicted": 0, "probability": 0.1},
          {"label": 1, "predicted": 1, "probability": 0.8},
          {"label": 1, "predicted": 0, "probability": 0.25},
          {"label": 0, "predicted": 0, "probability": 0.3}
        ]"#,
    );
    let records = authorship_analysis::dataset::load_predictions(f.path()).unwrap();
    let y_true: Vec<i64> = records.iter().map(|r| r.label).collect();
    let y_pred: Vec<i64> = records.iter().map(|r| r.predicted).collect();
    let y_proba: Vec<f64> = records.iter().map(|r| r.probability).collect();

    let report = print_metrics(&y_true, &y_pred, &y_proba).unwrap();
    assert!((report.accuracy - 0.75).abs() < 1e-12);
    assert!((report.auc - 0.75).abs() < 1e-12);

    // The trapezoid area under the ROC points agrees with the rank formulation.
    let curve = roc_curve(&y_true, &y_proba).unwrap();
    let area: f64 = curve
        .windows(2)
        .map(|w| (w[1].fpr - w[0].fpr) * (w[0].tpr + w[1].tpr) / 2.0)
        .sum();
    assert!((area - report.auc).abs() < 1e-12);

    let mut canvas = RecordingCanvas::default();
    let cm = plot_confusion_matrix(&y_true, &y_pred, [0, 1], "Confusion Matrix", &mut canvas)
        .unwrap();
    assert_eq!(cm.counts, [[2, 0], [1, 1]]);
    assert_eq!(canvas.figures().len(), 1);
}

#[test]
fn test_single_class_predictions_have_no_auc() {
    let result = print_metrics(&[1, 1, 1], &[1, 0, 1], &[0.9, 0.4, 0.7]);
    assert!(matches!(
        result,
        Err(AuthorshipError::UndefinedStatistic(_))
    ));
}
