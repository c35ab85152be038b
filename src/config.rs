//! Engine configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) yields the
//! standard program rules.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::Amount;
use crate::campaign::{self, BrandCampaign, CampaignError};
use crate::fraud::FraudThresholds;
use crate::policy::{PolicyError, TierPolicy};
use crate::reward::DEFAULT_ENGAGEMENT_FLOOR;
use crate::tier::TierStrategyKind;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid tier policy: {0}")]
    Policy(#[from] PolicyError),

    #[error("invalid brand campaign: {0}")]
    Campaign(#[from] CampaignError),

    #[error("invalid config: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tier_strategy: TierStrategyKind,
    /// Rolling spend required before any reward unlocks.
    pub engagement_floor: Amount,
    pub policy: TierPolicy,
    pub fraud: FraudThresholds,
    pub campaigns: Vec<BrandCampaign>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tier_strategy: TierStrategyKind::default(),
            engagement_floor: Amount::from_whole(DEFAULT_ENGAGEMENT_FLOOR),
            policy: TierPolicy::default(),
            fraud: FraudThresholds::default(),
            campaigns: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.policy.validate()?;
        campaign::validate(&self.campaigns)?;
        if self.engagement_floor.is_negative() {
            return Err(ConfigError::Validation(format!(
                "engagement floor must not be negative, got {}",
                self.engagement_floor
            )));
        }
        if self.fraud.max_wallet.is_negative() {
            return Err(ConfigError::Validation(
                "fraud wallet threshold must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}
