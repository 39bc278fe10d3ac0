//! Welch's two-sample t-test from summary statistics.
//!
//! Tests H0: μ0 = μ1 against the two-sided alternative without assuming
//! equal variances. Degrees of freedom use the Welch–Satterthwaite
//! approximation and the p-value comes from Student's t distribution.

use authorship_core::{AuthorshipError, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::describe::GroupStatistics;

/// Outcome of a Welch's t-test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WelchTest {
    pub t_stat: f64,
    /// Welch–Satterthwaite degrees of freedom (positive, not necessarily integral).
    pub degrees_of_freedom: f64,
    /// Two-sided p-value in `[0, 1]`.
    pub p_value: f64,
}

impl WelchTest {
    /// Whether H0 is rejected at significance level `alpha`.
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

impl std::fmt::Display for WelchTest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "t={:.4} df={:.2} p={:.4e}",
            self.t_stat, self.degrees_of_freedom, self.p_value
        )
    }
}

/// Welch's t-test from means `m`, standard deviations `s`, and sizes `n`.
///
/// # Errors
///
/// - `InvalidSampleSize` if either `n` is below 2
/// - `InvalidInput` if a mean is not finite or a std is negative or not finite
/// - `UndefinedStatistic` if both standard deviations are zero
pub fn welch_ttest(m0: f64, s0: f64, n0: usize, m1: f64, s1: f64, n1: usize) -> Result<WelchTest> {
    check_group("group 0", m0, s0, n0)?;
    check_group("group 1", m1, s1, n1)?;

    let (n0f, n1f) = (n0 as f64, n1 as f64);

    // Work with standard deviations relative to the larger one so the squared
    // and fourth-power terms neither underflow nor overflow.
    let scale = s0.max(s1);
    if scale == 0.0 {
        return Err(AuthorshipError::UndefinedStatistic(
            "both groups have zero variance; the t statistic is undefined".to_string(),
        ));
    }
    let w0 = (s0 / scale).powi(2) / n0f;
    let w1 = (s1 / scale).powi(2) / n1f;

    let se = scale * (w0 + w1).sqrt();
    let t_stat = (m0 - m1) / se;
    let degrees_of_freedom =
        (w0 + w1).powi(2) / (w0.powi(2) / (n0f - 1.0) + w1.powi(2) / (n1f - 1.0));

    let t_dist = StudentsT::new(0.0, 1.0, degrees_of_freedom).map_err(|e| {
        AuthorshipError::UndefinedStatistic(format!(
            "Student's t with df={degrees_of_freedom}: {e}"
        ))
    })?;
    let p_value = (2.0 * t_dist.sf(t_stat.abs())).clamp(0.0, 1.0);

    Ok(WelchTest {
        t_stat,
        degrees_of_freedom,
        p_value,
    })
}

fn check_group(label: &str, mean: f64, std: f64, count: usize) -> Result<()> {
    if count < 2 {
        return Err(AuthorshipError::InvalidSampleSize {
            label: label.to_string(),
            count,
        });
    }
    if !mean.is_finite() {
        return Err(AuthorshipError::InvalidInput(format!(
            "{label} mean is not finite: {mean}"
        )));
    }
    if !std.is_finite() || std < 0.0 {
        return Err(AuthorshipError::InvalidInput(format!(
            "{label} standard deviation must be finite and non-negative, got {std}"
        )));
    }
    Ok(())
}

/// Run [`welch_ttest`] on two rows of a statistics table.
///
/// # Errors
///
/// `LabelNotFound` if either label has no row; otherwise the errors of
/// [`welch_ttest`], with sample-size errors naming the offending label.
pub fn compare_groups(
    statistics: &GroupStatistics,
    label0: &str,
    label1: &str,
) -> Result<WelchTest> {
    let row0 = statistics.get(label0)?;
    let row1 = statistics.get(label1)?;

    for (label, row) in [(label0, row0), (label1, row1)] {
        if row.count < 2 {
            return Err(AuthorshipError::InvalidSampleSize {
                label: label.to_string(),
                count: row.count,
            });
        }
    }

    let result = welch_ttest(row0.mean, row0.std, row0.count, row1.mean, row1.std, row1.count)?;
    tracing::info!(
        column = statistics.column(),
        label0,
        label1,
        t_stat = result.t_stat,
        df = result.degrees_of_freedom,
        p_value = result.p_value,
        "Welch's t-test"
    );
    Ok(result)
}
