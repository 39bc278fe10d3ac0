//! YAML configuration loading for the `authorship` binary.
//!
//! Loads [`AppConfig`] from a YAML file on disk. Every section and field is
//! optional; missing values take their defaults.

use authorship_core::AppConfig;
use std::path::Path;

/// Load an [`AppConfig`] from a YAML file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the YAML is invalid, or the
/// classifier section fails validation.
pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e))?;
    let config: AppConfig = serde_yaml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse config YAML: {}", e))?;
    config.classifier.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper to write YAML to a temp file and return the path.
    fn write_yaml(yaml: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(yaml.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_load_config_full() {
        let yaml = r#"
classifier:
  text_model_identifier: "bert-base-cased"
  num_features: 12
  hidden_size: 64
encoder:
  cache_dir: "/tmp/models"
  max_seq_len: 128
analysis:
  bins: 20
  reference_label: "human"
  labels: [0, 1]
logging:
  level: "debug"
  format: "json"
"#;
        let f = write_yaml(yaml);
        let config = load_config(f.path()).unwrap();
        assert_eq!(config.classifier.text_model_identifier, "bert-base-cased");
        assert_eq!(config.classifier.num_features, 12);
        assert_eq!(config.classifier.hidden_size, 64);
        assert_eq!(
            config.encoder.cache_dir.as_deref(),
            Some(Path::new("/tmp/models"))
        );
        assert_eq!(config.encoder.max_seq_len, 128);
        assert_eq!(config.analysis.bins, 20);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_load_config_empty_sections_use_defaults() {
        let f = write_yaml("analysis:\n  bins: 10\n");
        let config = load_config(f.path()).unwrap();
        assert_eq!(config.analysis.bins, 10);
        assert_eq!(config.analysis.reference_label, "human");
        assert_eq!(config.classifier, authorship_core::ClassifierConfig::default());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_config_rejects_zero_hidden_size() {
        let f = write_yaml("classifier:\n  hidden_size: 0\n");
        let err = load_config(f.path()).unwrap_err();
        assert!(err.to_string().contains("hidden_size"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config(Path::new("/nonexistent/config.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_yaml() {
        let f = write_yaml("not: [valid: yaml: {{{}}}");
        let result = load_config(f.path());
        assert!(result.is_err());
    }
}
