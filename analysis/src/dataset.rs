//! Tabular input for the statistics helpers and the CLI.
//!
//! Tables are JSON arrays of objects. Every object carries a categorical
//! `label` plus any number of other columns; numeric columns feed the
//! statistics and plots, the rest is carried along untouched.
//!
//! ```json
//! [
//!   {"label": "human", "perplexity": 41.2, "text": "..."},
//!   {"label": "chatgpt", "perplexity": 12.9, "text": "..."}
//! ]
//! ```

use authorship_core::{AuthorshipError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// One row of a [`Table`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Group the row belongs to (e.g. `"human"`, `"chatgpt"`).
    pub label: String,
    /// All other columns.
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl Observation {
    /// Create a row with no columns besides the label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style helper to set a numeric column.
    pub fn with_value(mut self, column: impl Into<String>, value: f64) -> Self {
        self.fields.insert(column.into(), serde_json::Value::from(value));
        self
    }

    /// Numeric value of `column`, or `None` when missing, non-numeric, or
    /// not finite.
    pub fn value(&self, column: &str) -> Option<f64> {
        self.fields
            .get(column)
            .and_then(serde_json::Value::as_f64)
            .filter(|v| v.is_finite())
    }
}

/// An ordered collection of labelled observations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Table {
    rows: Vec<Observation>,
}

impl Table {
    pub fn from_rows(rows: Vec<Observation>) -> Self {
        Self { rows }
    }

    /// Load a table from a JSON file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let table = Self::load_from_str(&content)?;
        tracing::debug!(path = %path.display(), rows = table.len(), "Loaded table");
        Ok(table)
    }

    /// Load from a JSON string directly.
    pub fn load_from_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct labels in lexicographic order.
    pub fn labels(&self) -> Vec<&str> {
        self.rows
            .iter()
            .map(|r| r.label.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Whether at least one row has a numeric value for `column`.
    pub fn has_column(&self, column: &str) -> bool {
        self.rows.iter().any(|r| r.value(column).is_some())
    }

    /// Numeric values of `column` for the rows labelled `label`.
    pub fn column_values(&self, column: &str, label: &str) -> Vec<f64> {
        self.rows
            .iter()
            .filter(|r| r.label == label)
            .filter_map(|r| r.value(column))
            .collect()
    }

    /// Numeric values of `column` grouped by label.
    ///
    /// Every label present in the table gets an entry, possibly empty.
    ///
    /// # Errors
    ///
    /// `ColumnNotFound` if no row carries a numeric value for `column`.
    pub fn grouped(&self, column: &str) -> Result<BTreeMap<String, Vec<f64>>> {
        if !self.has_column(column) {
            return Err(AuthorshipError::ColumnNotFound(column.to_string()));
        }
        let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for row in &self.rows {
            let values = groups.entry(row.label.clone()).or_default();
            if let Some(v) = row.value(column) {
                values.push(v);
            }
        }
        Ok(groups)
    }
}

// ---------------------------------------------------------------------------
// Prediction and scoring records
// ---------------------------------------------------------------------------

/// One scored example: ground truth, hard prediction, and probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub label: i64,
    pub predicted: i64,
    pub probability: f64,
}

/// Load prediction records from a JSON array.
pub fn load_predictions(path: &Path) -> Result<Vec<PredictionRecord>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Text plus numeric features awaiting classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreInput {
    pub id: String,
    pub text: String,
    pub features: Vec<f32>,
}

/// Load scoring inputs from a JSON array.
pub fn load_score_inputs(path: &Path) -> Result<Vec<ScoreInput>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_deserialize_observation_with_extra_columns() {
        let json = r#"[{"label": "human", "score": 1.5, "text": "hello", "flag": true}]"#;
        let table = Table::load_from_str(json).unwrap();
        assert_eq!(table.len(), 1);
        let row = &table.rows()[0];
        assert_eq!(row.label, "human");
        assert_eq!(row.value("score"), Some(1.5));
        assert_eq!(row.value("text"), None);
        assert_eq!(row.value("flag"), None);
        assert_eq!(row.value("missing"), None);
    }

    #[test]
    fn test_labels_are_sorted_and_unique() {
        let table = Table::from_rows(vec![
            Observation::new("polish"),
            Observation::new("human"),
            Observation::new("chatgpt"),
            Observation::new("human"),
        ]);
        assert_eq!(table.labels(), vec!["chatgpt", "human", "polish"]);
    }

    #[test]
    fn test_grouped_skips_missing_values() {
        let table = Table::from_rows(vec![
            Observation::new("human").with_value("x", 1.0),
            Observation::new("human"),
            Observation::new("ai").with_value("y", 3.0),
        ]);
        let groups = table.grouped("x").unwrap();
        assert_eq!(groups["human"], vec![1.0]);
        assert!(groups["ai"].is_empty());
    }

    #[test]
    fn test_grouped_unknown_column() {
        let table = Table::from_rows(vec![Observation::new("human").with_value("x", 1.0)]);
        assert!(matches!(
            table.grouped("nope"),
            Err(AuthorshipError::ColumnNotFound(c)) if c == "nope"
        ));
    }

    #[test]
    fn test_load_predictions_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(br#"[{"label": 1, "predicted": 0, "probability": 0.4}]"#)
            .unwrap();
        let records = load_predictions(f.path()).unwrap();
        assert_eq!(
            records,
            vec![PredictionRecord {
                label: 1,
                predicted: 0,
                probability: 0.4
            }]
        );
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = Table::load_from_file(Path::new("/nonexistent/table.json"));
        assert!(matches!(result, Err(AuthorshipError::Io(_))));
    }
}
