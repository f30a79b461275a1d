//! Configuration management for Prospector
//!
//! Repository-level settings live in `.prospector/config.toml`. Every section
//! and field has a default, so a missing file or a partial file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::{DEFAULT_MAX_CARDS_PER_PAGE, DEFAULT_MAX_CONNECTS_PER_PAGE};
use crate::{ProspectorError, Result};

/// Directory holding the config file, relative to the project root
pub const CONFIG_DIR: &str = ".prospector";

/// Repository-level Prospector configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProspectorConfig {
    #[serde(default)]
    pub run: RunDefaults,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub heuristics: HeuristicConfig,

    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub site: SiteConfig,
}

/// Defaults applied when the command line does not override them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunDefaults {
    #[serde(default = "default_max_cards")]
    pub max_cards_per_page: usize,

    #[serde(default = "default_max_connects")]
    pub max_connects_per_page: usize,

    #[serde(default = "default_true")]
    pub headless: bool,
}

/// Fixed delays used by the workflow
///
/// These are hard-coded waits, not adaptive deadlines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Window in which an operator may complete the second factor
    #[serde(default = "default_second_factor_wait_secs")]
    pub second_factor_wait_secs: u64,

    /// Pause after submitting the login form
    #[serde(default = "default_login_settle_secs")]
    pub login_settle_secs: u64,

    /// Timeout for the results container to appear
    #[serde(default = "default_results_timeout_secs")]
    pub results_timeout_secs: u64,

    /// Number of scroll pulses used to trigger lazy loading
    #[serde(default = "default_scroll_pulses")]
    pub scroll_pulses: usize,

    #[serde(default = "default_scroll_pulse_ms")]
    pub scroll_pulse_ms: u64,

    /// Pause between clicking connect and looking for the send control
    #[serde(default = "default_confirm_delay_ms")]
    pub confirm_delay_ms: u64,

    #[serde(default = "default_jitter_min_ms")]
    pub jitter_min_ms: u64,

    #[serde(default = "default_jitter_max_ms")]
    pub jitter_max_ms: u64,
}

/// Tunable keyword sets for the extraction heuristic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeuristicConfig {
    /// Tokens that mark a headline as containing an organization name
    #[serde(default = "default_org_keywords")]
    pub org_keywords: Vec<String>,

    /// Country names recognized as locations
    #[serde(default = "default_country_names")]
    pub country_names: Vec<String>,
}

/// Invite ledger location and weekly cap
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_path")]
    pub path: PathBuf,

    #[serde(default = "default_weekly_limit")]
    pub weekly_limit: usize,
}

/// The professional network being automated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

// Default value providers
fn default_max_cards() -> usize {
    DEFAULT_MAX_CARDS_PER_PAGE
}

fn default_max_connects() -> usize {
    DEFAULT_MAX_CONNECTS_PER_PAGE
}

fn default_true() -> bool {
    true
}

fn default_second_factor_wait_secs() -> u64 {
    8
}

fn default_login_settle_secs() -> u64 {
    3
}

fn default_results_timeout_secs() -> u64 {
    30
}

fn default_scroll_pulses() -> usize {
    2
}

fn default_scroll_pulse_ms() -> u64 {
    1000
}

fn default_confirm_delay_ms() -> u64 {
    1000
}

fn default_jitter_min_ms() -> u64 {
    500
}

fn default_jitter_max_ms() -> u64 {
    1500
}

fn default_org_keywords() -> Vec<String> {
    [
        "group", "grupo", "company", "corp", "corporation", "inc", "llc", "ltd", "ltda", "plc",
        "gmbh", "s.a.", "s/a", "holding",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_country_names() -> Vec<String> {
    [
        "Brazil",
        "Brasil",
        "Portugal",
        "United States",
        "USA",
        "Canada",
        "Mexico",
        "México",
        "Argentina",
        "Chile",
        "Colombia",
        "United Kingdom",
        "Ireland",
        "Germany",
        "Deutschland",
        "France",
        "Spain",
        "España",
        "Italy",
        "Netherlands",
        "India",
        "Australia",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("data/invites.csv")
}

fn default_weekly_limit() -> usize {
    200
}

fn default_base_url() -> String {
    "https://www.linkedin.com".to_string()
}

impl ProspectorConfig {
    /// Load configuration from `.prospector/config.toml` or use defaults
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let config_path = Self::path_in(root);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Self = toml::from_str(&content).map_err(|e| {
                ProspectorError::Config(format!("Failed to parse config file: {}", e))
            })?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Write default configuration to `.prospector/config.toml`
    pub fn write_default(root: &Path) -> Result<PathBuf> {
        let config_dir = root.join(CONFIG_DIR);
        std::fs::create_dir_all(&config_dir)?;

        let config_path = Self::path_in(root);
        let content = toml::to_string_pretty(&Self::default()).map_err(|e| {
            ProspectorError::Config(format!("Failed to serialize config: {}", e))
        })?;
        std::fs::write(&config_path, content)?;
        Ok(config_path)
    }

    pub fn path_in(root: &Path) -> PathBuf {
        root.join(CONFIG_DIR).join("config.toml")
    }

    pub fn validate(&self) -> Result<()> {
        if self.timing.jitter_min_ms > self.timing.jitter_max_ms {
            return Err(ProspectorError::Config(format!(
                "jitter_min_ms ({}) exceeds jitter_max_ms ({})",
                self.timing.jitter_min_ms, self.timing.jitter_max_ms
            )));
        }
        if self.ledger.weekly_limit == 0 {
            return Err(ProspectorError::Config(
                "weekly_limit must be positive".to_string(),
            ));
        }
        if !self.site.base_url.starts_with("http") {
            return Err(ProspectorError::Config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.site.base_url
            )));
        }
        Ok(())
    }
}

impl TimingConfig {
    pub fn second_factor_wait(&self) -> Duration {
        Duration::from_secs(self.second_factor_wait_secs)
    }

    pub fn login_settle(&self) -> Duration {
        Duration::from_secs(self.login_settle_secs)
    }

    pub fn results_timeout(&self) -> Duration {
        Duration::from_secs(self.results_timeout_secs)
    }

    pub fn scroll_pulse(&self) -> Duration {
        Duration::from_millis(self.scroll_pulse_ms)
    }

    pub fn confirm_delay(&self) -> Duration {
        Duration::from_millis(self.confirm_delay_ms)
    }
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            max_cards_per_page: default_max_cards(),
            max_connects_per_page: default_max_connects(),
            headless: default_true(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            second_factor_wait_secs: default_second_factor_wait_secs(),
            login_settle_secs: default_login_settle_secs(),
            results_timeout_secs: default_results_timeout_secs(),
            scroll_pulses: default_scroll_pulses(),
            scroll_pulse_ms: default_scroll_pulse_ms(),
            confirm_delay_ms: default_confirm_delay_ms(),
            jitter_min_ms: default_jitter_min_ms(),
            jitter_max_ms: default_jitter_max_ms(),
        }
    }
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            org_keywords: default_org_keywords(),
            country_names: default_country_names(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
            weekly_limit: default_weekly_limit(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = ProspectorConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config.run.max_cards_per_page, 60);
        assert_eq!(config.timing.second_factor_wait_secs, 8);
        assert_eq!(config.ledger.weekly_limit, 200);
    }

    #[test]
    fn test_write_default_round_trips() {
        let dir = tempdir().unwrap();
        let path = ProspectorConfig::write_default(dir.path()).unwrap();
        assert!(path.ends_with(".prospector/config.toml"));

        let config = ProspectorConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config.timing.scroll_pulses, 2);
        assert!(config.heuristics.org_keywords.contains(&"ltd".to_string()));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(CONFIG_DIR)).unwrap();
        std::fs::write(
            ProspectorConfig::path_in(dir.path()),
            "[timing]\nsecond_factor_wait_secs = 30\n\n[ledger]\nweekly_limit = 50\n",
        )
        .unwrap();

        let config = ProspectorConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config.timing.second_factor_wait_secs, 30);
        assert_eq!(config.timing.login_settle_secs, 3);
        assert_eq!(config.ledger.weekly_limit, 50);
        assert_eq!(config.site.base_url, "https://www.linkedin.com");
    }

    #[test]
    fn test_invalid_jitter_rejected() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(CONFIG_DIR)).unwrap();
        std::fs::write(
            ProspectorConfig::path_in(dir.path()),
            "[timing]\njitter_min_ms = 2000\njitter_max_ms = 100\n",
        )
        .unwrap();

        let err = ProspectorConfig::load_or_default(dir.path()).unwrap_err();
        assert!(matches!(err, ProspectorError::Config(_)));
    }

    #[test]
    fn test_durations() {
        let timing = TimingConfig::default();
        assert_eq!(timing.second_factor_wait(), Duration::from_secs(8));
        assert_eq!(timing.confirm_delay(), Duration::from_millis(1000));
    }
}
