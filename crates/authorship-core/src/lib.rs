//! Core types, configuration, and errors for authorship
//!
//! This crate contains the foundational types shared by the hybrid classifier
//! (`authorship-model`) and the statistics and reporting toolkit
//! (`authorship-analysis`).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Classifier configuration
// ---------------------------------------------------------------------------

/// Dropout applied to the concatenated `[embedding | features]` vector.
pub const INPUT_DROPOUT: f32 = 0.3;

/// Dropout applied after the hidden ReLU layer.
pub const HIDDEN_DROPOUT: f32 = 0.2;

/// Configuration for the hybrid text + feature classifier.
///
/// # Example
///
/// ```
/// use authorship_core::ClassifierConfig;
///
/// let config = ClassifierConfig::default();
/// assert_eq!(config.num_features, 38);
/// assert_eq!(config.hidden_size, 256);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// HuggingFace model ID of the pretrained text encoder.
    #[serde(default = "default_text_model_identifier")]
    pub text_model_identifier: String,
    /// Width of the numeric feature vector appended to the sentence embedding.
    #[serde(default = "default_num_features")]
    pub num_features: usize,
    /// Width of the hidden layer of the classifier head.
    #[serde(default = "default_hidden_size")]
    pub hidden_size: usize,
}

fn default_text_model_identifier() -> String {
    "bert-base-uncased".to_string()
}

fn default_num_features() -> usize {
    38
}

fn default_hidden_size() -> usize {
    256
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            text_model_identifier: default_text_model_identifier(),
            num_features: default_num_features(),
            hidden_size: default_hidden_size(),
        }
    }
}

impl ClassifierConfig {
    /// Reject configurations that cannot build a classifier head.
    pub fn validate(&self) -> Result<()> {
        if self.text_model_identifier.trim().is_empty() {
            return Err(AuthorshipError::Config(
                "text_model_identifier must not be empty".to_string(),
            ));
        }
        if self.num_features == 0 {
            return Err(AuthorshipError::Config(
                "num_features must be positive".to_string(),
            ));
        }
        if self.hidden_size == 0 {
            return Err(AuthorshipError::Config(
                "hidden_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for downloading and running the pretrained encoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Optional cache directory for downloaded models.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// Token sequences longer than this are truncated.
    #[serde(default = "default_max_seq_len")]
    pub max_seq_len: usize,
}

fn default_max_seq_len() -> usize {
    512
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            max_seq_len: default_max_seq_len(),
        }
    }
}

// ---------------------------------------------------------------------------
// Analysis configuration
// ---------------------------------------------------------------------------

/// Settings for the statistics and plotting helpers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Number of histogram bins per series.
    #[serde(default = "default_bins")]
    pub bins: usize,
    /// Label every other group is compared against in distribution plots.
    #[serde(default = "default_reference_label")]
    pub reference_label: String,
    /// The two class values used by confusion matrices, negative first.
    #[serde(default = "default_binary_labels")]
    pub labels: [i64; 2],
}

fn default_bins() -> usize {
    30
}

fn default_reference_label() -> String {
    "human".to_string()
}

fn default_binary_labels() -> [i64; 2] {
    [0, 1]
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            bins: default_bins(),
            reference_label: default_reference_label(),
            labels: default_binary_labels(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging configuration
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format: `text` (human-readable) or `json` (structured).
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Top-level configuration file layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Hybrid classifier architecture.
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Encoder download and tokenization settings.
    #[serde(default)]
    pub encoder: EncoderConfig,
    /// Statistics and plotting settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Core error types.
#[derive(thiserror::Error, Debug)]
pub enum AuthorshipError {
    /// Tensor dimensions do not line up (features, tokens, or batch).
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A t-test group has too few members for the variance estimate.
    #[error("Invalid sample size: {label} has n = {count}, need at least 2")]
    InvalidSampleSize {
        /// Which group was too small.
        label: String,
        /// Its sample size.
        count: usize,
    },

    /// The requested statistic has no defined value for this input.
    #[error("Undefined statistic: {0}")]
    UndefinedStatistic(String),

    /// A group label was requested that the statistics table does not contain.
    #[error("Label not found: {0}")]
    LabelNotFound(String),

    /// Parallel sequences were given with different lengths.
    #[error("Length mismatch: {left} has {left_len} values, {right} has {right_len}")]
    LengthMismatch {
        /// Name of the first sequence.
        left: &'static str,
        /// Length of the first sequence.
        left_len: usize,
        /// Name of the second sequence.
        right: &'static str,
        /// Length of the second sequence.
        right_len: usize,
    },

    /// No row carries a numeric value for the requested column.
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// A subgroup required for a comparison has no values.
    #[error("Empty group: no values for label '{0}'")]
    EmptyGroup(String),

    /// A class value outside the configured binary label set.
    #[error("Invalid label {value}: expected one of {expected:?}")]
    InvalidLabel {
        /// The offending value.
        value: i64,
        /// The allowed label set.
        expected: [i64; 2],
    },

    /// Numeric input outside the domain of an operation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Tensor, encoder, or tokenizer failure.
    #[error("Model error: {0}")]
    Model(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization / deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias for `std::result::Result<T, AuthorshipError>`.
pub type Result<T> = std::result::Result<T, AuthorshipError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
