//! Per-label descriptive statistics.

use authorship_core::{AuthorshipError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::dataset::Table;

/// Aggregate statistics of one label's values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    /// Number of values (always positive).
    pub count: usize,
    pub mean: f64,
    /// Middle value; the average of the two middle values for even counts.
    pub median: f64,
    /// Sample standard deviation (`count - 1` denominator), `0` for a single value.
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl GroupSummary {
    /// Summarise a slice of finite values. Returns `None` for an empty slice.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let count = values.len();
        let n = count as f64;
        let mean = values.iter().sum::<f64>() / n;

        let std = if count > 1 {
            let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (n - 1.0)).sqrt()
        } else {
            0.0
        };

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let mid = count / 2;
        let median = if count % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        Some(Self {
            count,
            mean,
            median,
            std,
            min: sorted[0],
            max: sorted[count - 1],
        })
    }
}

/// Statistics table: one [`GroupSummary`] per label, ordered by label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStatistics {
    column: String,
    groups: BTreeMap<String, GroupSummary>,
}

impl GroupStatistics {
    /// Build a table directly from summaries.
    pub fn new(column: impl Into<String>, groups: BTreeMap<String, GroupSummary>) -> Self {
        Self {
            column: column.into(),
            groups,
        }
    }

    /// The column these statistics describe.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Look up one label's row.
    ///
    /// # Errors
    ///
    /// `LabelNotFound` if the label has no row.
    pub fn get(&self, label: &str) -> Result<&GroupSummary> {
        self.groups
            .get(label)
            .ok_or_else(|| AuthorshipError::LabelNotFound(label.to_string()))
    }

    /// Rows in label order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &GroupSummary)> {
        self.groups.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn labels(&self) -> Vec<&str> {
        self.groups.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Format the full table header.
    pub fn table_header() -> String {
        format!(
            "| {:<20} | {:>7} | {:>12} | {:>12} | {:>12} | {:>12} | {:>12} |",
            "label", "count", "mean", "median", "std", "min", "max"
        )
    }

    /// Format the table separator.
    pub fn table_separator() -> String {
        format!(
            "|{:-<22}|{:->9}|{:->14}|{:->14}|{:->14}|{:->14}|{:->14}|",
            "", "", "", "", "", "", ""
        )
    }

    /// Render the statistics as a markdown table.
    pub fn to_table(&self) -> String {
        let mut lines = vec![Self::table_header(), Self::table_separator()];
        for (label, s) in self.iter() {
            lines.push(format!(
                "| {:<20} | {:>7} | {:>12.4} | {:>12.4} | {:>12.4} | {:>12.4} | {:>12.4} |",
                label, s.count, s.mean, s.median, s.std, s.min, s.max
            ));
        }
        lines.join("\n")
    }
}

/// Group `table` by label and describe `column` within each group.
///
/// Rows without a numeric value for `column` are skipped; labels left with
/// no values do not get a row.
///
/// # Errors
///
/// `ColumnNotFound` if no row has a numeric value for `column`.
pub fn get_statistics_df(table: &Table, column: &str) -> Result<GroupStatistics> {
    let groups: BTreeMap<String, GroupSummary> = table
        .grouped(column)?
        .into_iter()
        .filter_map(|(label, values)| GroupSummary::from_values(&values).map(|s| (label, s)))
        .collect();

    tracing::debug!(column, groups = groups.len(), "Computed group statistics");
    Ok(GroupStatistics::new(column, groups))
}
