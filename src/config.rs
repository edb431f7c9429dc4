use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::stepper::{
    TransitionPolicy, DEFAULT_ACTIVE_CLASS, DEFAULT_INITIAL_STEP, DEFAULT_PREV_TRIGGER_SELECTOR,
    DEFAULT_STEP_KEY, DEFAULT_STEP_SELECTOR, DEFAULT_TRIGGER_SELECTOR,
};

/// Environment variable prefix for configuration overrides
/// (e.g. `STEPABLE__STEPPER__INITIAL_STEP=2`)
pub const ENV_PREFIX: &str = "STEPABLE";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub stepper: StepperConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Non-hook controller options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepperConfig {
    /// Base name of the marker classes (`{active_class}--true` / `--false`)
    #[serde(default = "default_active_class")]
    pub active_class: String,
    #[serde(default = "default_initial_step")]
    pub initial_step: i64,
    /// Data attribute read for explicit trigger destinations
    #[serde(default = "default_step_key")]
    pub step_key: String,
    #[serde(default = "default_step_selector")]
    pub step_selector: String,
    #[serde(default = "default_trigger_selector")]
    pub trigger_selector: String,
    #[serde(default = "default_prev_trigger_selector")]
    pub prev_trigger_selector: String,
    /// Overlapping-transition policy (last-commit-wins or exclusive)
    #[serde(default)]
    pub policy: TransitionPolicy,
}

fn default_active_class() -> String {
    DEFAULT_ACTIVE_CLASS.to_string()
}

fn default_initial_step() -> i64 {
    DEFAULT_INITIAL_STEP
}

fn default_step_key() -> String {
    DEFAULT_STEP_KEY.to_string()
}

fn default_step_selector() -> String {
    DEFAULT_STEP_SELECTOR.to_string()
}

fn default_trigger_selector() -> String {
    DEFAULT_TRIGGER_SELECTOR.to_string()
}

fn default_prev_trigger_selector() -> String {
    DEFAULT_PREV_TRIGGER_SELECTOR.to_string()
}

impl Default for StepperConfig {
    fn default() -> Self {
        Self {
            active_class: default_active_class(),
            initial_step: default_initial_step(),
            step_key: default_step_key(),
            step_selector: default_step_selector(),
            trigger_selector: default_trigger_selector(),
            prev_trigger_selector: default_prev_trigger_selector(),
            policy: TransitionPolicy::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Write logs to a file under `dir` instead of stderr
    #[serde(default)]
    pub to_file: bool,

    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: false,
            dir: default_log_dir(),
        }
    }
}

impl Config {
    /// Project-local config file
    pub fn local_config_path() -> PathBuf {
        PathBuf::from("stepable.toml")
    }

    /// Per-user config file (`~/.config/stepable/config.toml` on Linux)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("stepable").join("config.toml"))
    }

    /// Load configuration, lowest priority first:
    /// embedded defaults, `./stepable.toml`, the user config file, the
    /// explicit `config_path`, then `STEPABLE__*` environment variables.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut files = vec![Self::local_config_path()];
        files.extend(Self::user_config_path());
        Self::load_layered(&files, config_path)
    }

    fn load_layered(optional_files: &[PathBuf], config_path: Option<&str>) -> Result<Self> {
        // Start with embedded defaults so stepable works without config files
        let defaults = Config::default();
        let defaults_json =
            serde_json::to_string(&defaults).context("Failed to serialize default config")?;

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        for path in optional_files {
            if path.exists() {
                builder = builder.add_source(config::File::from(path.clone()));
            }
        }

        // Explicit config file (CLI override)
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to load configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Write config as TOML
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .context("Failed to create config directory")?;
            }
        }

        let toml_str = self.to_toml()?;
        std::fs::write(path, toml_str).context("Failed to write config file")?;

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config to TOML")
    }

    /// Get absolute path to the log directory
    pub fn logs_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.logging.dir);
        if path.is_absolute() {
            path
        } else {
            std::env::current_dir().unwrap_or_default().join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_matches_option_defaults() {
        let config = Config::default();
        assert_eq!(config.stepper.active_class, "stepable-active");
        assert_eq!(config.stepper.initial_step, 0);
        assert_eq!(config.stepper.step_key, "data-step");
        assert_eq!(config.stepper.step_selector, ".stepable");
        assert_eq!(config.stepper.trigger_selector, ".stepable-trigger");
        assert_eq!(config.stepper.prev_trigger_selector, ".stepable-prev");
        assert_eq!(config.stepper.policy, TransitionPolicy::LastCommitWins);
        assert_eq!(config.logging.level, "warn");
        assert!(!config.logging.to_file);
    }

    #[test]
    fn test_load_without_files_uses_defaults() {
        let config = Config::load_layered(&[], None).unwrap();
        assert_eq!(config.stepper, StepperConfig::default());
    }

    #[test]
    fn test_partial_file_overrides_only_given_keys() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("stepable.toml");
        std::fs::write(
            &path,
            "[stepper]\nactive_class = \"wiz\"\ninitial_step = 2\npolicy = \"exclusive\"\n",
        )
        .unwrap();

        let config = Config::load_layered(&[path], None).unwrap();
        assert_eq!(config.stepper.active_class, "wiz");
        assert_eq!(config.stepper.initial_step, 2);
        assert_eq!(config.stepper.policy, TransitionPolicy::Exclusive);
        assert_eq!(config.stepper.step_selector, ".stepable");
    }

    #[test]
    fn test_explicit_path_wins_over_optional_files() {
        let temp_dir = TempDir::new().unwrap();
        let local = temp_dir.path().join("local.toml");
        let explicit = temp_dir.path().join("explicit.toml");
        std::fs::write(&local, "[stepper]\nstep_selector = \"section\"\n").unwrap();
        std::fs::write(&explicit, "[stepper]\nstep_selector = \"li.step\"\n").unwrap();

        let config =
            Config::load_layered(&[local], Some(explicit.to_str().unwrap())).unwrap();
        assert_eq!(config.stepper.step_selector, "li.step");
    }

    #[test]
    fn test_missing_optional_file_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.toml");
        let config = Config::load_layered(&[missing], None).unwrap();
        assert_eq!(config.stepper.active_class, "stepable-active");
    }

    #[test]
    fn test_save_round_trips_through_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.stepper.prev_trigger_selector = "button.back".to_string();
        config.logging.level = "debug".to_string();
        config.save(&path).unwrap();

        let loaded = Config::load_layered(&[path], None).unwrap();
        assert_eq!(loaded.stepper.prev_trigger_selector, "button.back");
        assert_eq!(loaded.logging.level, "debug");
    }

    #[test]
    fn test_logs_path_relative_to_cwd() {
        let config = Config::default();
        let logs = config.logs_path();
        assert!(logs.is_absolute());
        assert!(logs.ends_with("logs"));
    }
}
