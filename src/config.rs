use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::PipelineError;
use crate::metadata::{YearPolicy, DEFAULT_BASE_URL, DEFAULT_TARGET_YEAR, DEFAULT_YEAR_EXEMPT_TITLES};

/// Run configuration. Every field has a default, so a config file only needs
/// the values it changes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the weekly report files.
    pub data_dir: PathBuf,
    /// Report whose ranked titles get a sheet each.
    pub target_report: PathBuf,
    pub output_path: PathBuf,
    pub history_csv: Option<PathBuf>,
    pub summary_json: Option<PathBuf>,
    pub lookup: LookupConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    pub base_url: String,
    /// Environment variable holding the OMDb API key.
    pub api_key_env: String,
    pub target_year: i32,
    pub year_exempt_titles: Vec<String>,
    pub timeout_secs: u64,
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            target_report: PathBuf::from("data/bfi-weekend-box-office-report-2024-08-23-25.xls"),
            output_path: PathBuf::from("Task_output.xlsx"),
            history_csv: None,
            summary_json: None,
            lookup: LookupConfig::default(),
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: "API_KEY".to_string(),
            target_year: DEFAULT_TARGET_YEAR,
            year_exempt_titles: DEFAULT_YEAR_EXEMPT_TITLES
                .iter()
                .map(|t| t.to_string())
                .collect(),
            timeout_secs: 10,
            workers: 1,
        }
    }
}

impl Config {
    /// Built-in defaults, or the given TOML file layered over them.
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&text).map_err(|e| match e {
            PipelineError::Config(msg) => PipelineError::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, PipelineError> {
        let config: Config = toml::from_str(text).map_err(|e| PipelineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), PipelineError> {
        if self.lookup.timeout_secs == 0 {
            return Err(PipelineError::Config("lookup.timeout_secs must be at least 1".into()));
        }
        if self.lookup.base_url.trim().is_empty() {
            return Err(PipelineError::Config("lookup.base_url is empty".into()));
        }
        Ok(())
    }

    pub fn year_policy(&self) -> YearPolicy {
        YearPolicy {
            target_year: self.lookup.target_year,
            exempt_titles: self.lookup.year_exempt_titles.clone(),
        }
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup.timeout_secs)
    }
}
