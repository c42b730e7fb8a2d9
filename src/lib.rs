pub mod command;
pub mod config;
pub mod dsp;
pub mod error;
pub mod params;

use crate::command::EngineCommand;
use crate::config::EngineConfig;
use crate::dsp::branch::{BranchSettings, BranchUpdate};
use crate::dsp::engine::SynthEngine;
use crate::dsp::mixer::{OutputBuses, STEM_COUNT};
use crate::dsp::scale::ScaleSpec;
use crate::error::EngineError;
use crate::params::GlobalParams;
use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the raingarden-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{e}"))
}

fn decode<T: serde::de::DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(|e| js_error(EngineError::Decode(e.to_string())))
}

/// WASM-exposed engine for an AudioWorklet. The worklet is single-threaded,
/// so commands are applied directly between `process` calls.
#[wasm_bindgen]
pub struct WasmEngine {
    engine: SynthEngine,
    params: GlobalParams,
    buses: OutputBuses,
}

#[wasm_bindgen]
impl WasmEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(sample_rate: f64, block_size: usize) -> Result<WasmEngine, JsValue> {
        let engine = SynthEngine::new(EngineConfig::new(sample_rate, block_size)).map_err(js_error)?;
        let buses = engine.output_buses();
        Ok(WasmEngine {
            engine,
            params: GlobalParams::default(),
            buses,
        })
    }

    /// Replace the global parameter snapshot used by subsequent blocks.
    pub fn set_params(&mut self, params: JsValue) -> Result<(), JsValue> {
        self.params = decode(params)?;
        Ok(())
    }

    /// Partial update of one branch, e.g. `{ freq: 220 }`.
    pub fn set_branch(&mut self, index: usize, update: JsValue) -> Result<(), JsValue> {
        let update: BranchUpdate = decode(update)?;
        self.engine.apply_command(EngineCommand::SetBranch { index, update });
        Ok(())
    }

    /// Bulk update from an array of `{ freq, decay, amp, pan }`.
    pub fn set_all_branches(&mut self, branches: JsValue) -> Result<(), JsValue> {
        let branches: Vec<BranchSettings> = decode(branches)?;
        self.engine.apply_command(EngineCommand::set_all(&branches));
        Ok(())
    }

    pub fn set_scale(&mut self, name: &str, root: i32) {
        self.engine
            .apply_command(EngineCommand::SetScale(ScaleSpec::from_name(name, root)));
    }

    pub fn reset(&mut self) {
        self.engine.apply_command(EngineCommand::Reset);
    }

    /// Render one block into the internal buses.
    pub fn process(&mut self) {
        self.engine.process_block(&self.params, &mut self.buses);
    }

    pub fn noise_left(&self) -> Vec<f32> {
        self.buses.noise_l.clone()
    }

    pub fn noise_right(&self) -> Vec<f32> {
        self.buses.noise_r.clone()
    }

    pub fn rain_left(&self) -> Vec<f32> {
        self.buses.rain_l.clone()
    }

    pub fn rain_right(&self) -> Vec<f32> {
        self.buses.rain_r.clone()
    }

    /// Mono stem `index` (0..5); empty for an out-of-range index.
    pub fn stem(&self, index: usize) -> Vec<f32> {
        if index < STEM_COUNT {
            self.buses.stems[index].clone()
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_matches_manifest() {
        assert_eq!(core_version(), env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn worklet_surface_renders_blocks() {
        let mut engine = WasmEngine::new(48000.0, 64).unwrap();
        engine.engine.apply_command(EngineCommand::set_all(&[BranchSettings::default(); 4]));
        engine.params.n_branches = 4;
        engine.set_scale("dorian", 2);
        for _ in 0..8 {
            engine.process();
        }
        assert_eq!(engine.noise_left().len(), 64);
        assert_eq!(engine.stem(4).len(), 64);
        assert!(engine.stem(5).is_empty());
        assert!(engine.noise_left().iter().any(|&s| s != 0.0));
        assert_eq!(engine.engine.scale(), ScaleSpec::from_name("Dorian", 2));
    }
}
