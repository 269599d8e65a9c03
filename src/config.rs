//! Engine configuration
//!
//! Loaded from YAML. Every section has defaults, so an empty document is a
//! valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Environment variable that overrides `reasoning.api_key`
pub const API_KEY_ENV: &str = "TALENTGRAPH_API_KEY";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub analysis: AnalysisThresholds,
    pub privacy: PrivacyConfig,
    pub reasoning: ReasoningConfig,
}

impl Config {
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Reject thresholds that would make classification meaningless
    pub fn validate(&self) -> ConfigResult<()> {
        let a = &self.analysis;
        if !(a.alpha > 0.0 && a.alpha < 1.0) {
            return Err(ConfigError::Invalid(format!("alpha must be in (0, 1), got {}", a.alpha)));
        }
        if !(a.watch_alpha >= a.alpha && a.watch_alpha < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "watch_alpha must be in [alpha, 1), got {}",
                a.watch_alpha
            )));
        }
        if !(0.0..=1.0).contains(&a.min_effect_size) {
            return Err(ConfigError::Invalid(format!(
                "min_effect_size must be in [0, 1], got {}",
                a.min_effect_size
            )));
        }
        if a.deviation_threshold < 0.0 {
            return Err(ConfigError::Invalid("deviation_threshold must not be negative".to_string()));
        }
        if a.min_team_size == 0 {
            return Err(ConfigError::Invalid("min_team_size must be at least 1".to_string()));
        }

        let t = &a.target_distribution;
        if [t.high, t.medium, t.low].iter().any(|p| *p <= 0.0) {
            return Err(ConfigError::Invalid(
                "target_distribution shares must all be positive".to_string(),
            ));
        }
        let sum = t.high + t.medium + t.low;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(ConfigError::Invalid(format!(
                "target_distribution must sum to 1, got {:.4}",
                sum
            )));
        }

        if self.privacy.deny_fields.is_empty() {
            return Err(ConfigError::Invalid("privacy.deny_fields must not be empty".to_string()));
        }
        if self.reasoning.enabled && self.reasoning.model.trim().is_empty() {
            return Err(ConfigError::Invalid("reasoning.model is required when enabled".to_string()));
        }
        Ok(())
    }

    /// Apply environment overrides
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.reasoning.api_key = Some(key);
            }
        }
    }
}

/// Significance and sizing thresholds shared by every analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisThresholds {
    /// p-value below which a result may alert
    pub alpha: f64,
    /// p-value below which a result is at least watched
    pub watch_alpha: f64,
    /// Minimum Cramér's V for an alert
    pub min_effect_size: f64,
    /// Tier-rate deviation from baseline, in percentage points, that flags a category
    pub deviation_threshold: f64,
    /// Minimum direct reports for a manager to count as a category
    pub min_team_size: usize,
    /// Minimum employees for a dimension to be tested at all
    pub min_sample_size: usize,
    /// Minimum members for a category deviation to be flagged
    pub min_category_size: usize,
    /// Calibration curve each level is compared against
    pub target_distribution: TargetDistribution,
}

impl Default for AnalysisThresholds {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            watch_alpha: 0.10,
            min_effect_size: 0.10,
            deviation_threshold: 10.0,
            min_team_size: 2,
            min_sample_size: 10,
            min_category_size: 5,
            target_distribution: TargetDistribution::default(),
        }
    }
}

/// Expected share of each tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetDistribution {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl TargetDistribution {
    /// Shares in `Rating::ALL` column order (low, medium, high)
    pub fn proportions(&self) -> [f64; 3] {
        [self.low, self.medium, self.high]
    }
}

impl Default for TargetDistribution {
    fn default() -> Self {
        Self {
            high: 0.20,
            medium: 0.70,
            low: 0.10,
        }
    }
}

/// Anonymization boundary settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacyConfig {
    /// Keys that must never appear in an anonymized payload
    pub deny_fields: Vec<String>,
}

impl PrivacyConfig {
    pub fn is_denied(&self, key: &str) -> bool {
        self.deny_fields.iter().any(|f| f.eq_ignore_ascii_case(key))
    }
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            deny_fields: [
                "name",
                "employee_name",
                "display_name",
                "job_title",
                "title",
                "email",
                "manager",
                "manager_id",
                "manager_name",
                "employee_id",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LLMProvider {
    OpenAI,
    Ollama,
    Anthropic,
}

/// External reasoning collaborator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    /// Enabled status
    pub enabled: bool,
    /// The LLM provider to use
    pub provider: LLMProvider,
    /// Model name (e.g., "gpt-4o", "llama3")
    pub model: String,
    /// API Key (optional, can be loaded from env if None)
    pub api_key: Option<String>,
    /// API Base URL (required for self-hosted Ollama, optional for others)
    pub api_base_url: Option<String>,
    /// System prompt for the LLM
    pub system_prompt: Option<String>,
    /// Bound on a single call, in seconds
    pub timeout_secs: u64,
    /// Additional attempts after the first failure
    pub max_retries: u32,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: LLMProvider::Ollama,
            model: "llama3".to_string(),
            api_key: None,
            api_base_url: None,
            system_prompt: None,
            timeout_secs: 30,
            max_retries: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.analysis.min_team_size, 2);
        assert_eq!(config.analysis.target_distribution.proportions(), [0.10, 0.70, 0.20]);
        assert!(config.privacy.is_denied("Email"));
        assert!(!config.privacy.is_denied("level"));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
analysis:
  alpha: 0.01
  min_team_size: 3
reasoning:
  enabled: true
  provider: openai
  model: gpt-4o
"#;
        let config = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(config.analysis.alpha, 0.01);
        assert_eq!(config.analysis.min_team_size, 3);
        assert_eq!(config.analysis.watch_alpha, 0.10);
        assert_eq!(config.reasoning.provider, LLMProvider::OpenAI);
        assert_eq!(config.reasoning.timeout_secs, 30);
        assert_eq!(config.privacy, PrivacyConfig::default());
    }

    #[test]
    fn test_empty_document() {
        let config = Config::from_yaml_str("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let err = Config::from_yaml_str("analysis:\n  alpha: 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let yaml = "analysis:\n  target_distribution:\n    high: 0.5\n    medium: 0.5\n    low: 0.5\n";
        assert!(matches!(Config::from_yaml_str(yaml), Err(ConfigError::Invalid(_))));

        assert!(matches!(
            Config::from_yaml_str("analysis: [1, 2]"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "privacy:\n  deny_fields: [name, ssn]").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.privacy.deny_fields, vec!["name", "ssn"]);

        assert!(matches!(
            Config::load("/nonexistent/talentgraph.yaml"),
            Err(ConfigError::Io(_))
        ));
    }
}
