use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Operator identity and credential. Resolved once at session start and
/// immutable for the session's lifetime; a change takes effect on the next
/// session.
#[derive(Debug, Clone, Deserialize)]
pub struct OperatorCredentials {
    #[serde(default)]
    pub job_number: String,
    #[serde(default)]
    pub api_key: String,
}

/// Read-only view of the durable settings file maintained by the login flow.
///
/// An absent file or empty keys are the normal "not configured" state right
/// after installation, not errors.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns `Ok(None)` unless both the job number and the API key are
    /// present and non-empty.
    pub fn load(&self) -> Result<Option<OperatorCredentials>, SettingsError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        let credentials: OperatorCredentials = serde_yaml::from_str(&content)?;

        if credentials.job_number.is_empty() || credentials.api_key.is_empty() {
            return Ok(None);
        }
        Ok(Some(credentials))
    }
}
