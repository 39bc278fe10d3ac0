//! Statistics, plots, and classification metrics for authorship studies
//!
//! Companion toolkit to the hybrid classifier in `authorship-model`: it
//! summarises per-label feature distributions, tests mean differences, draws
//! comparison figures, and reports how well predictions match ground truth.
//!
//! # Modules
//!
//! - [`dataset`] — labelled JSON tables, prediction and scoring records
//! - [`describe`] — per-label count, mean, median, std, min, max
//! - [`ttest`] — Welch's t-test from summary statistics
//! - [`plot`] — KDE / histogram comparison figures and canvas backends
//! - [`metrics`] — confusion matrix, accuracy, ROC-AUC, classification report
//! - [`config`] / [`logging`] — YAML configuration and tracing setup for the CLI

pub mod config;
pub mod dataset;
pub mod describe;
pub mod logging;
pub mod metrics;
pub mod plot;
pub mod ttest;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::dataset::{Observation, PredictionRecord, ScoreInput, Table};
    pub use crate::describe::{get_statistics_df, GroupStatistics, GroupSummary};
    pub use crate::metrics::{
        accuracy, classification_report, confusion_matrix, plot_confusion_matrix, print_metrics,
        roc_auc, roc_curve, ClassificationReport, ConfusionMatrix, MetricsReport, RocPoint,
    };
    pub use crate::plot::{
        histplot_comparison, kdeplot_comparison, plot_comparison, Canvas, Figure, JsonCanvas,
        PlotMode, PlotOptions, RecordingCanvas, TextCanvas,
    };
    pub use crate::ttest::{compare_groups, welch_ttest, WelchTest};
}
