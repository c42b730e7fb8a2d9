//! Engine construction settings.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

pub const MIN_SAMPLE_RATE: f64 = 8000.0;
pub const MAX_SAMPLE_RATE: f64 = 384_000.0;
pub const MAX_BLOCK_SIZE: usize = 8192;
pub const MAX_REFRESH_INTERVAL: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub sample_rate: f64,
    /// Samples rendered per `process_block` call.
    pub block_size: usize,
    /// Slots in the control-command queue.
    pub command_capacity: usize,
    /// Branch coefficients and pan gains are re-checked every this many
    /// samples. 1 checks every sample.
    pub refresh_interval: usize,
    pub seed: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            sample_rate: 44100.0,
            block_size: 128,
            command_capacity: 256,
            refresh_interval: 8,
            seed: 0x1234_5678,
        }
    }
}

impl EngineConfig {
    pub fn new(sample_rate: f64, block_size: usize) -> Self {
        EngineConfig {
            sample_rate,
            block_size,
            ..EngineConfig::default()
        }
    }

    /// Parse a (possibly partial) camelCase JSON config. Missing fields
    /// take their defaults. The result is not validated.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            return Err(EngineError::InvalidSampleRate(self.sample_rate));
        }
        if self.block_size == 0 || self.block_size > MAX_BLOCK_SIZE {
            return Err(EngineError::InvalidBlockSize(self.block_size));
        }
        if self.command_capacity == 0 {
            return Err(EngineError::InvalidCommandCapacity);
        }
        if self.refresh_interval == 0 || self.refresh_interval > MAX_REFRESH_INTERVAL {
            return Err(EngineError::InvalidRefreshInterval(self.refresh_interval));
        }
        Ok(())
    }
}
