//! Classification metrics for binary authorship predictions.
//!
//! - **Confusion matrix** and its heatmap figure
//! - **Accuracy**: fraction of predictions equal to the ground truth
//! - **ROC-AUC**: Mann–Whitney formulation, ties counted one half
//! - **ROC curve**: one point per distinct score
//! - **Classification report**: per-class precision, recall, F1, support

use authorship_core::{AuthorshipError, Result};
use serde::{Deserialize, Serialize};

use crate::plot::{Canvas, Figure, FigureBody, Heatmap};

fn check_lengths(
    left: &'static str,
    left_len: usize,
    right: &'static str,
    right_len: usize,
) -> Result<()> {
    if left_len != right_len {
        return Err(AuthorshipError::LengthMismatch {
            left,
            left_len,
            right,
            right_len,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Confusion matrix
// ---------------------------------------------------------------------------

/// 2×2 confusion matrix over an ordered label pair.
///
/// `counts[i][j]` is the number of samples whose true label is `labels[i]`
/// and whose prediction is `labels[j]`. `labels[1]` is the positive class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub labels: [i64; 2],
    pub counts: [[usize; 2]; 2],
}

impl ConfusionMatrix {
    /// Create an empty matrix for `labels` (negative first).
    pub fn new(labels: [i64; 2]) -> Self {
        Self {
            labels,
            counts: [[0; 2]; 2],
        }
    }

    fn index(&self, value: i64) -> Result<usize> {
        self.labels
            .iter()
            .position(|&l| l == value)
            .ok_or(AuthorshipError::InvalidLabel {
                value,
                expected: self.labels,
            })
    }

    /// Record one prediction.
    pub fn record(&mut self, actual: i64, predicted: i64) -> Result<()> {
        let row = self.index(actual)?;
        let col = self.index(predicted)?;
        self.counts[row][col] += 1;
        Ok(())
    }

    pub fn tp(&self) -> usize {
        self.counts[1][1]
    }

    pub fn tn(&self) -> usize {
        self.counts[0][0]
    }

    pub fn fp(&self) -> usize {
        self.counts[0][1]
    }

    pub fn fn_(&self) -> usize {
        self.counts[1][0]
    }

    /// Total number of samples.
    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// The matrix as a heatmap with rows = true label, columns = prediction.
    pub fn to_heatmap(&self) -> Heatmap {
        let names: Vec<String> = self.labels.iter().map(i64::to_string).collect();
        Heatmap {
            row_labels: names.clone(),
            col_labels: names,
            cells: self.counts.iter().map(|row| row.to_vec()).collect(),
        }
    }
}

/// Count `(y_true, y_pred)` pairs into a matrix over `labels`.
///
/// # Errors
///
/// - `LengthMismatch` if the inputs differ in length
/// - `InvalidLabel` if a value is not one of `labels`
pub fn confusion_matrix(
    y_true: &[i64],
    y_pred: &[i64],
    labels: [i64; 2],
) -> Result<ConfusionMatrix> {
    check_lengths("y_true", y_true.len(), "y_pred", y_pred.len())?;
    if labels[0] == labels[1] {
        return Err(AuthorshipError::InvalidInput(format!(
            "confusion matrix labels must be distinct, got {labels:?}"
        )));
    }

    let mut cm = ConfusionMatrix::new(labels);
    for (&actual, &predicted) in y_true.iter().zip(y_pred) {
        cm.record(actual, predicted)?;
    }
    Ok(cm)
}

/// Render the confusion matrix as an annotated heatmap and return it.
pub fn plot_confusion_matrix(
    y_true: &[i64],
    y_pred: &[i64],
    labels: [i64; 2],
    title: &str,
    canvas: &mut dyn Canvas,
) -> Result<ConfusionMatrix> {
    let cm = confusion_matrix(y_true, y_pred, labels)?;
    canvas.render(&Figure {
        title: title.to_string(),
        x_label: "Predicted".to_string(),
        y_label: "True".to_string(),
        body: FigureBody::Heatmap(cm.to_heatmap()),
    })?;
    Ok(cm)
}

// ---------------------------------------------------------------------------
// Scalar metrics
// ---------------------------------------------------------------------------

/// Fraction of positions where `y_pred` equals `y_true`.
///
/// # Errors
///
/// `LengthMismatch` on unequal lengths, `UndefinedStatistic` on empty input.
pub fn accuracy(y_true: &[i64], y_pred: &[i64]) -> Result<f64> {
    check_lengths("y_true", y_true.len(), "y_pred", y_pred.len())?;
    if y_true.is_empty() {
        return Err(AuthorshipError::UndefinedStatistic(
            "accuracy of an empty sample".to_string(),
        ));
    }
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Split scores into (negative, positive) by the larger of the two classes.
fn binary_scores(y_true: &[i64], y_proba: &[f64]) -> Result<(Vec<f64>, Vec<f64>)> {
    check_lengths("y_true", y_true.len(), "y_proba", y_proba.len())?;
    if let Some(bad) = y_proba.iter().find(|p| p.is_nan()) {
        return Err(AuthorshipError::InvalidInput(format!(
            "scores must not be NaN, got {bad}"
        )));
    }

    let mut classes: Vec<i64> = y_true.to_vec();
    classes.sort_unstable();
    classes.dedup();
    match classes.len() {
        2 => {}
        0 | 1 => {
            return Err(AuthorshipError::UndefinedStatistic(format!(
                "ROC is undefined when y_true holds a single class ({classes:?})"
            )))
        }
        n => {
            return Err(AuthorshipError::InvalidInput(format!(
                "ROC needs binary labels, got {n} classes"
            )))
        }
    }

    let positive = classes[1];
    let mut negatives = Vec::new();
    let mut positives = Vec::new();
    for (&t, &p) in y_true.iter().zip(y_proba) {
        if t == positive {
            positives.push(p);
        } else {
            negatives.push(p);
        }
    }
    Ok((negatives, positives))
}

/// Area under the ROC curve.
///
/// Computed as the Mann–Whitney U statistic over average ranks, so tied
/// scores contribute one half. The larger label value is the positive class.
///
/// # Errors
///
/// - `LengthMismatch` on unequal lengths
/// - `UndefinedStatistic` if `y_true` contains a single class
/// - `InvalidInput` for more than two classes or a NaN score
pub fn roc_auc(y_true: &[i64], y_proba: &[f64]) -> Result<f64> {
    let (negatives, positives) = binary_scores(y_true, y_proba)?;

    let mut scored: Vec<(f64, bool)> = negatives
        .iter()
        .map(|&s| (s, false))
        .chain(positives.iter().map(|&s| (s, true)))
        .collect();
    scored.sort_by(|a, b| a.0.total_cmp(&b.0));

    // Sum of 1-based average ranks of the positive scores.
    let mut rank_sum = 0.0;
    let mut i = 0;
    while i < scored.len() {
        let mut j = i;
        while j + 1 < scored.len() && scored[j + 1].0 == scored[i].0 {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        rank_sum += avg_rank * scored[i..=j].iter().filter(|(_, pos)| *pos).count() as f64;
        i = j + 1;
    }

    let n_pos = positives.len() as f64;
    let n_neg = negatives.len() as f64;
    let u = rank_sum - n_pos * (n_pos + 1.0) / 2.0;
    Ok(u / (n_pos * n_neg))
}

/// One operating point of a ROC curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RocPoint {
    pub fpr: f64,
    pub tpr: f64,
    /// Scores `>= threshold` are predicted positive.
    pub threshold: f64,
}

/// ROC curve points at each distinct score, highest threshold first.
///
/// The first point is `(0, 0)` at an infinite threshold; the last is `(1, 1)`.
pub fn roc_curve(y_true: &[i64], y_proba: &[f64]) -> Result<Vec<RocPoint>> {
    let (negatives, positives) = binary_scores(y_true, y_proba)?;
    let n_pos = positives.len() as f64;
    let n_neg = negatives.len() as f64;

    let mut scored: Vec<(f64, bool)> = negatives
        .iter()
        .map(|&s| (s, false))
        .chain(positives.iter().map(|&s| (s, true)))
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut points = vec![RocPoint {
        fpr: 0.0,
        tpr: 0.0,
        threshold: f64::INFINITY,
    }];
    let (mut tp, mut fp) = (0usize, 0usize);
    for (idx, &(score, is_pos)) in scored.iter().enumerate() {
        if is_pos {
            tp += 1;
        } else {
            fp += 1;
        }
        let last_of_tie = scored.get(idx + 1).map_or(true, |next| next.0 != score);
        if last_of_tie {
            points.push(RocPoint {
                fpr: fp as f64 / n_neg,
                tpr: tp as f64 / n_pos,
                threshold: score,
            });
        }
    }
    Ok(points)
}

// ---------------------------------------------------------------------------
// Classification report
// ---------------------------------------------------------------------------

/// Precision, recall, and F1 for one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassReport {
    pub label: i64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of samples whose true label is this class.
    pub support: usize,
}

/// Per-class metrics plus overall accuracy and averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassReport>,
    pub accuracy: f64,
    pub macro_f1: f64,
    pub weighted_f1: f64,
    pub support: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den > 0 {
        num as f64 / den as f64
    } else {
        0.0
    }
}

/// Per-class precision, recall, F1, and support.
///
/// Ratios with a zero denominator are reported as `0.0`.
pub fn classification_report(
    y_true: &[i64],
    y_pred: &[i64],
    labels: [i64; 2],
) -> Result<ClassificationReport> {
    let cm = confusion_matrix(y_true, y_pred, labels)?;
    let total = cm.total();
    if total == 0 {
        return Err(AuthorshipError::UndefinedStatistic(
            "classification report of an empty sample".to_string(),
        ));
    }

    let classes: Vec<ClassReport> = (0..2)
        .map(|k| {
            let tp = cm.counts[k][k];
            let predicted = cm.counts[0][k] + cm.counts[1][k];
            let support = cm.counts[k][0] + cm.counts[k][1];
            let precision = ratio(tp, predicted);
            let recall = ratio(tp, support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassReport {
                label: labels[k],
                precision,
                recall,
                f1,
                support,
            }
        })
        .collect();

    let macro_f1 = classes.iter().map(|c| c.f1).sum::<f64>() / classes.len() as f64;
    let weighted_f1 = classes
        .iter()
        .map(|c| c.f1 * c.support as f64)
        .sum::<f64>()
        / total as f64;

    Ok(ClassificationReport {
        classes,
        accuracy: ratio(cm.tp() + cm.tn(), total),
        macro_f1,
        weighted_f1,
        support: total,
    })
}

impl std::fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "| {:<12} | {:>9} | {:>9} | {:>9} | {:>9} |",
            "class", "precision", "recall", "f1", "support"
        )?;
        writeln!(
            f,
            "|{:-<14}|{:->11}|{:->11}|{:->11}|{:->11}|",
            "", "", "", "", ""
        )?;
        for c in &self.classes {
            writeln!(
                f,
                "| {:<12} | {:>9.4} | {:>9.4} | {:>9.4} | {:>9} |",
                c.label, c.precision, c.recall, c.f1, c.support
            )?;
        }
        writeln!(
            f,
            "| {:<12} | {:>9} | {:>9} | {:>9.4} | {:>9} |",
            "accuracy", "", "", self.accuracy, self.support
        )?;
        writeln!(
            f,
            "| {:<12} | {:>9} | {:>9} | {:>9.4} | {:>9} |",
            "macro f1", "", "", self.macro_f1, self.support
        )?;
        write!(
            f,
            "| {:<12} | {:>9} | {:>9} | {:>9.4} | {:>9} |",
            "weighted f1", "", "", self.weighted_f1, self.support
        )
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Accuracy and AUC of one set of predictions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub accuracy: f64,
    pub auc: f64,
}

impl MetricsReport {
    /// Print the two summary lines to stdout.
    pub fn print_summary(&self) {
        println!("Accuracy: {:.4}", self.accuracy);
        println!("AUC: {:.4}", self.auc);
    }
}

/// Compute accuracy and ROC-AUC, print them, and return them.
///
/// # Errors
///
/// `LengthMismatch` if the three inputs differ in length, plus the errors of
/// [`accuracy`] and [`roc_auc`].
pub fn print_metrics(y_true: &[i64], y_pred: &[i64], y_proba: &[f64]) -> Result<MetricsReport> {
    check_lengths("y_true", y_true.len(), "y_pred", y_pred.len())?;
    check_lengths("y_true", y_true.len(), "y_proba", y_proba.len())?;

    let report = MetricsReport {
        accuracy: accuracy(y_true, y_pred)?,
        auc: roc_auc(y_true, y_proba)?,
    };
    tracing::info!(
        samples = y_true.len(),
        accuracy = report.accuracy,
        auc = report.auc,
        "Classification metrics"
    );
    report.print_summary();
    Ok(report)
}
