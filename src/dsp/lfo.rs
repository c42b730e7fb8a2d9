//! Amplitude LFO for the noise exciter.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use super::random::FastRng;
use crate::params::HostCode;

/// LFO waveform shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "HostCode")]
pub enum LfoWaveform {
    #[default]
    Sine,
    Triangle,
    Square,
    /// A new random level is drawn once per cycle and held.
    SampleHold,
}

impl LfoWaveform {
    /// Map a numeric host parameter (0..=3) to a waveform. Out-of-range
    /// values clamp to the nearest shape.
    pub fn from_index(index: i32) -> Self {
        match index {
            i32::MIN..=0 => LfoWaveform::Sine,
            1 => LfoWaveform::Triangle,
            2 => LfoWaveform::Square,
            _ => LfoWaveform::SampleHold,
        }
    }
}

impl TryFrom<HostCode> for LfoWaveform {
    type Error = String;

    fn try_from(code: HostCode) -> Result<Self, Self::Error> {
        match code {
            HostCode::Index(value) => Ok(LfoWaveform::from_index(HostCode::index(value))),
            HostCode::Name(name) => match HostCode::key(&name).as_str() {
                "sine" => Ok(LfoWaveform::Sine),
                "triangle" => Ok(LfoWaveform::Triangle),
                "square" => Ok(LfoWaveform::Square),
                "samplehold" | "sampleandhold" | "sh" => Ok(LfoWaveform::SampleHold),
                _ => Err(format!("unknown LFO waveform {name:?}")),
            },
        }
    }
}

/// Free-running phase accumulator producing an amplitude multiplier in
/// `[1 - depth, 1]`.
#[derive(Debug, Clone)]
pub struct Lfo {
    phase: f64,
    held: f64,
    sample_rate: f64,
}

impl Lfo {
    pub fn new(sample_rate: f64) -> Self {
        Lfo {
            phase: 0.0,
            held: 0.0,
            sample_rate,
        }
    }

    /// Raw bipolar waveform value in [-1, 1] at the current phase.
    fn wave(&self, waveform: LfoWaveform) -> f64 {
        match waveform {
            LfoWaveform::Sine => (2.0 * PI * self.phase).sin(),
            LfoWaveform::Triangle => {
                if self.phase < 0.5 {
                    4.0 * self.phase - 1.0
                } else {
                    3.0 - 4.0 * self.phase
                }
            }
            LfoWaveform::Square => {
                if self.phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            LfoWaveform::SampleHold => self.held,
        }
    }

    /// Advance one sample and return the amplitude multiplier.
    #[inline]
    pub fn next_gain(
        &mut self,
        waveform: LfoWaveform,
        rate_hz: f64,
        depth: f64,
        rng: &mut FastRng,
    ) -> f64 {
        let wave = self.wave(waveform);

        self.phase += rate_hz / self.sample_rate;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
            if waveform == LfoWaveform::SampleHold {
                self.held = rng.next_signed();
            }
        }

        (1.0 - depth) + depth * (wave + 1.0) * 0.5
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.held = 0.0;
    }
}
