//! DSP Engine: pure Rust resonant filter-bank synthesis.
//!
//! All DSP runs in Rust for deterministic, cross-platform audio output.
//! The same code powers both the WebAudio host (via AudioWorklet + WASM) and
//! the offline renderer (WAV export).

pub mod branch;
pub mod engine;
pub mod exciter;
pub mod filter;
pub mod lfo;
pub mod mixer;
pub mod noise;
pub mod raindrop;
pub mod random;
pub mod renderer;
pub mod resonator;
pub mod scale;
