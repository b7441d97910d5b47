use thiserror::Error;

use crate::settings::SettingsError;

use super::source::SourceError;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("settings storage error: {0}")]
    Settings(#[from] SettingsError),
    #[error("positioning subscription failed: {0}")]
    Subscription(#[from] SourceError),
}
