//! Circuit-breaker configuration.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::core::supervisor::RiskConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfigToml {
    #[serde(default = "default_max_consecutive_losses")]
    pub max_consecutive_losses: u32,
    #[serde(default = "default_max_session_loss")]
    pub max_session_loss: Decimal,
}

const fn default_max_consecutive_losses() -> u32 {
    3
}

fn default_max_session_loss() -> Decimal {
    Decimal::from(30)
}

impl Default for RiskConfigToml {
    fn default() -> Self {
        Self { max_consecutive_losses: default_max_consecutive_losses(), max_session_loss: default_max_session_loss() }
    }
}

impl From<RiskConfigToml> for RiskConfig {
    fn from(toml: RiskConfigToml) -> Self {
        Self { max_consecutive_losses: toml.max_consecutive_losses, max_session_loss: toml.max_session_loss }
    }
}
