use serde::{Deserialize, Serialize};

use crate::errors::{DebtError, Result};
use crate::types::Currency;

/// engine configuration shared by the normalizer, reconciler and service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// upper bound on installments a single plan may imply
    pub max_installments: u32,
    /// compare-and-swap attempts before a ledger update gives up
    pub max_reconcile_attempts: u32,
    /// currency applied when a new debt does not name one
    pub default_currency: Currency,
    /// window used by due-soon queries when the caller passes none
    pub due_soon_days: u32,
    /// window used by upcoming-payment queries when the caller passes none
    pub upcoming_days: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_installments: 1200,
            max_reconcile_attempts: 5,
            default_currency: Currency(String::from("PHP")),
            due_soon_days: 7,
            upcoming_days: 30,
        }
    }
}

impl EngineConfig {
    /// tighter limits, suited to request paths with small budgets
    pub fn strict() -> Self {
        Self {
            max_installments: 520,
            max_reconcile_attempts: 3,
            ..Self::default()
        }
    }

    /// parse from json, missing fields fall back to defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| DebtError::InvalidConfiguration {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_installments == 0 {
            return Err(DebtError::InvalidConfiguration {
                message: "max_installments must be at least 1".to_string(),
            });
        }
        if self.max_reconcile_attempts == 0 {
            return Err(DebtError::InvalidConfiguration {
                message: "max_reconcile_attempts must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
