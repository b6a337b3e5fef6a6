use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_TARGET_URL: &str = "http://library-api-app:8080/author";
pub const DEFAULT_TREND_NAME: &str = "my_trend";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scenario: ScenarioConfig,
    #[serde(default)]
    pub ramp: RampConfig,
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let url = url::Url::parse(&self.target.url)
            .map_err(|e| anyhow::anyhow!("Invalid target.url {}: {}", self.target.url, e))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            anyhow::bail!("target.url must be http:// or https:// (got {})", self.target.url);
        }
        if self.ramp.stages.is_empty() {
            anyhow::bail!("ramp.stages must contain at least one stage");
        }
        if self.runner.tick_ms == 0 {
            anyhow::bail!("runner.tick_ms must be greater than zero");
        }
        if !(100..=599).contains(&self.scenario.expected_status) {
            anyhow::bail!(
                "scenario.expected_status must be a valid HTTP status (got {})",
                self.scenario.expected_status
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Scenario label used in logs and results
    #[serde(default = "default_scenario_name")]
    pub name: String,
    /// Optional seed for reproducible payloads; each virtual user derives its own stream
    #[serde(default)]
    pub seed: Option<u64>,
    /// Pause after every iteration in milliseconds
    #[serde(default = "default_think_time_ms")]
    pub think_time_ms: u64,
    /// Status code the check expects from the endpoint
    #[serde(default = "default_expected_status")]
    pub expected_status: u16,
    /// Name of the latency trend metric
    #[serde(default = "default_trend_name")]
    pub trend_name: String,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            name: default_scenario_name(),
            seed: None,
            think_time_ms: default_think_time_ms(),
            expected_status: default_expected_status(),
            trend_name: default_trend_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RampStage {
    /// Time to move linearly from the previous target to this one, in milliseconds
    pub duration_ms: u64,
    /// Concurrent virtual users at the end of the stage
    pub target: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RampConfig {
    pub stages: Vec<RampStage>,
}

impl Default for RampConfig {
    fn default() -> Self {
        Self {
            stages: vec![RampStage {
                duration_ms: 60_000,
                target: 100,
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Full URL the payloads are POSTed to
    #[serde(default = "default_target_url")]
    pub url: String,
    /// Request timeout in milliseconds; unset keeps the HTTP client default
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            url: default_target_url(),
            timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Virtual users running when the first stage begins
    #[serde(default = "default_start_vus")]
    pub start_vus: u64,
    /// How often the runner re-evaluates the ramp, in milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// How long stopping virtual users may finish their iteration before being aborted
    #[serde(default = "default_graceful_stop_ms")]
    pub graceful_stop_ms: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            start_vus: default_start_vus(),
            tick_ms: default_tick_ms(),
            graceful_stop_ms: default_graceful_stop_ms(),
        }
    }
}

fn default_scenario_name() -> String {
    "create-author".to_string()
}

fn default_think_time_ms() -> u64 {
    100
}

fn default_expected_status() -> u16 {
    201
}

fn default_trend_name() -> String {
    DEFAULT_TREND_NAME.to_string()
}

fn default_target_url() -> String {
    DEFAULT_TARGET_URL.to_string()
}

fn default_start_vus() -> u64 {
    1
}

fn default_tick_ms() -> u64 {
    100
}

fn default_graceful_stop_ms() -> u64 {
    30_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serde() {
        let config_str = r#"
[scenario]
name = "authors"
seed = 42
think_time_ms = 250

[[ramp.stages]]
duration_ms = 30000
target = 50

[[ramp.stages]]
duration_ms = 10000
target = 0

[target]
url = "http://localhost:8080/author"
timeout_ms = 5000

[runner]
start_vus = 0
        "#;

        let config: Config = toml::from_str(config_str).unwrap();
        assert_eq!(config.scenario.name, "authors");
        assert_eq!(config.scenario.seed, Some(42));
        assert_eq!(config.scenario.think_time_ms, 250);
        assert_eq!(config.scenario.expected_status, 201);
        assert_eq!(config.scenario.trend_name, "my_trend");
        assert_eq!(config.ramp.stages.len(), 2);
        assert_eq!(config.ramp.stages[1].target, 0);
        assert_eq!(config.target.timeout_ms, Some(5000));
        assert_eq!(config.runner.start_vus, 0);
        assert_eq!(config.runner.tick_ms, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_matches_builtin_scenario() {
        let config = Config::default();
        assert_eq!(config.target.url, "http://library-api-app:8080/author");
        assert_eq!(config.target.timeout_ms, None);
        assert_eq!(config.ramp.stages.len(), 1);
        assert_eq!(config.ramp.stages[0].duration_ms, 60_000);
        assert_eq!(config.ramp.stages[0].target, 100);
        assert_eq!(config.scenario.think_time_ms, 100);
        assert_eq!(config.scenario.expected_status, 201);
        assert_eq!(config.scenario.seed, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.ramp.stages[0].target, 100);
        assert_eq!(config.scenario.trend_name, "my_trend");
    }

    #[test]
    fn test_shipped_configs_parse() {
        for contents in [
            include_str!("../../../config/author-ramp.toml"),
            include_str!("../../../config/local.toml"),
        ] {
            let config: Config = toml::from_str(contents).unwrap();
            config.validate().unwrap();
        }
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.target.url = "ftp://library-api-app/author".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.ramp.stages.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.runner.tick_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.scenario.expected_status = 42;
        assert!(config.validate().is_err());
    }
}
