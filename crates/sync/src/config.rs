//! Configuration of a sync run.

use crate::ConfigError;
use blockmetrics_primitives::{Address, ValidatorNames};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path, time::Duration};

/// Settings of the sync engine, usually loaded from a TOML file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Websocket endpoint of the consensus node.
    pub ws_url: String,
    /// Human readable prefix used to render ledger addresses.
    pub hrp: String,
    /// The only currency fees may be paid in.
    pub fee_ticker: String,
    /// How long to wait before asking the node for a new height again.
    #[serde(with = "humantime_serde")]
    pub retry_interval: Duration,
    /// Display names of known validators, keyed by hex address.
    pub validator_names: BTreeMap<String, String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            ws_url: "ws://localhost:26657/websocket".to_string(),
            hrp: "iov".to_string(),
            fee_ticker: "IOV".to_string(),
            retry_interval: Duration::from_secs(3),
            validator_names: BTreeMap::new(),
        }
    }
}

impl SyncConfig {
    /// Loads and validates the config at `path`, writing the defaults if the file is missing.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = confy::load_path(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every setting that would otherwise only fail in the middle of a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fee_ticker.is_empty() {
            return Err(ConfigError::EmptyFeeTicker)
        }
        Address::validate_hrp(&self.hrp)
            .map_err(|source| ConfigError::InvalidHrp { hrp: self.hrp.clone(), source })?;
        self.validator_names().map(drop)
    }

    /// The validator display name table.
    pub fn validator_names(&self) -> Result<ValidatorNames, ConfigError> {
        self.validator_names
            .iter()
            .map(|(address, name)| {
                let parsed = Address::from_hex(address).map_err(|source| {
                    ConfigError::ValidatorAddress { address: address.clone(), source }
                })?;
                Ok::<_, ConfigError>((parsed, name.clone()))
            })
            .collect()
    }
}
