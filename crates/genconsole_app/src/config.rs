//! Layered settings: built-in defaults, then an optional RON file, then CLI flags.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use genconsole_core::TotalStepsPolicy;
use genconsole_engine::ClientSettings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::GenerateArgs;

pub const DEFAULT_CONFIG_FILENAME: &str = "genconsole.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings from {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse settings from {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_base: String,
    pub connect_timeout_secs: u64,
    pub reconnect_delay_ms: u64,
    pub max_reconnects: u32,
    pub expected_steps: Option<u32>,
    pub output_dir: Option<PathBuf>,
    pub log_level: String,
    pub log_to_file: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let client = ClientSettings::default();
        Self {
            api_base: client.api_base,
            connect_timeout_secs: client.connect_timeout.as_secs(),
            reconnect_delay_ms: client.reconnect_delay.as_millis() as u64,
            max_reconnects: client.max_reconnects,
            expected_steps: None,
            output_dir: None,
            log_level: "info".to_string(),
            log_to_file: false,
        }
    }
}

impl Settings {
    /// Reads `explicit` if given, else `./genconsole.ron` when it exists, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILENAME);
                if fallback.is_file() {
                    Self::from_file(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&content).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    /// CLI flags win over file values.
    pub fn apply_args(&mut self, args: &GenerateArgs) {
        if let Some(api_base) = &args.api_base {
            self.api_base = api_base.clone();
        }
        if let Some(delay) = args.reconnect_delay_ms {
            self.reconnect_delay_ms = delay;
        }
        if let Some(max) = args.max_reconnects {
            self.max_reconnects = max;
        }
        if args.expected_steps.is_some() {
            self.expected_steps = args.expected_steps;
        }
        if let Some(output) = &args.output {
            self.output_dir = Some(output.clone());
        }
        if let Some(level) = &args.log_level {
            self.log_level = level.clone();
        }
        if args.log_file {
            self.log_to_file = true;
        }
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            api_base: self.api_base.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
            max_reconnects: self.max_reconnects,
        }
    }

    pub fn total_steps_policy(&self) -> TotalStepsPolicy {
        match self.expected_steps {
            Some(expected) if expected > 0 => TotalStepsPolicy::Fixed(expected),
            _ => TotalStepsPolicy::Incremental,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("genconsole.ron");
        fs::write(&path, "(api_base: \"https://api.example.com\", max_reconnects: 5)").unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.api_base, "https://api.example.com");
        assert_eq!(settings.max_reconnects, 5);
        assert_eq!(settings.reconnect_delay_ms, Settings::default().reconnect_delay_ms);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn cli_overrides_file_values() {
        let mut settings = Settings {
            api_base: "https://file.example.com".to_string(),
            expected_steps: Some(4),
            ..Settings::default()
        };
        let args = GenerateArgs {
            api_base: Some("https://cli.example.com".to_string()),
            reconnect_delay_ms: Some(250),
            log_file: true,
            ..GenerateArgs::default()
        };
        settings.apply_args(&args);

        assert_eq!(settings.api_base, "https://cli.example.com");
        assert_eq!(settings.reconnect_delay_ms, 250);
        assert_eq!(settings.expected_steps, Some(4));
        assert!(settings.log_to_file);
        assert_eq!(
            settings.client_settings().reconnect_delay,
            Duration::from_millis(250)
        );
    }

    #[test]
    fn expected_steps_selects_fixed_policy() {
        let mut settings = Settings::default();
        assert_eq!(settings.total_steps_policy(), TotalStepsPolicy::Incremental);
        settings.expected_steps = Some(6);
        assert_eq!(settings.total_steps_policy(), TotalStepsPolicy::Fixed(6));
        settings.expected_steps = Some(0);
        assert_eq!(settings.total_steps_policy(), TotalStepsPolicy::Incremental);
    }

    #[test]
    fn unreadable_file_is_reported() {
        let temp = TempDir::new().unwrap();
        let err = Settings::load(Some(&temp.path().join("absent.ron"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));

        let bad = temp.path().join("bad.ron");
        fs::write(&bad, "(api_base: 42)").unwrap();
        assert!(matches!(
            Settings::from_file(&bad).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }
}
