use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::agent::{AccuracyTier, SubscriptionRequest};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub web: WebConfig,
    pub settings: SettingsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Movement below this many meters is not reported.
    #[serde(default = "default_distance_threshold_m")]
    pub distance_threshold_m: f64,
    #[serde(default)]
    pub accuracy: AccuracyTier,
    #[serde(default = "default_update_interval", deserialize_with = "duration")]
    pub update_interval: Duration,
    #[serde(
        default = "default_min_update_interval",
        deserialize_with = "duration"
    )]
    pub min_update_interval: Duration,
    #[serde(default = "default_max_update_delay", deserialize_with = "duration")]
    pub max_update_delay: Duration,
    #[serde(default = "default_queue_capacity")]
    pub delivery_queue_capacity: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            distance_threshold_m: default_distance_threshold_m(),
            accuracy: AccuracyTier::default(),
            update_interval: default_update_interval(),
            min_update_interval: default_min_update_interval(),
            max_update_delay: default_max_update_delay(),
            delivery_queue_capacity: default_queue_capacity(),
        }
    }
}

impl AgentConfig {
    pub fn subscription_request(&self) -> SubscriptionRequest {
        SubscriptionRequest {
            accuracy: self.accuracy,
            interval: self.update_interval,
            min_interval: self.min_update_interval,
            max_delay: self.max_update_delay,
        }
    }
}

fn default_distance_threshold_m() -> f64 {
    10.0
}

fn default_update_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_min_update_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_max_update_delay() -> Duration {
    Duration::from_secs(15)
}

fn default_queue_capacity() -> usize {
    32
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    pub primary_url: String,
    #[serde(default)]
    pub backup_urls: Vec<String>,
    #[serde(default = "default_delivery_timeout", deserialize_with = "duration")]
    pub timeout: Duration,
}

impl DeliveryConfig {
    /// Primary first, then each backup in configured order.
    pub fn endpoints(&self) -> Vec<String> {
        std::iter::once(self.primary_url.clone())
            .chain(self.backup_urls.iter().cloned())
            .collect()
    }
}

fn default_delivery_timeout() -> Duration {
    Duration::from_secs(30)
}

#[derive(Debug, Clone, Deserialize)]
pub struct SettingsConfig {
    /// Path of the operator settings file written by the login flow.
    pub file: PathBuf,
}

fn duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom)
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}
