//! Branch: one resonant voice with its parameter targets, smoothed running values,
//! and the filter state for both excitation paths.
//!
//! Targets are written by control commands between blocks. Everything else
//! is owned by the audio thread and advanced per sample. Filter and
//! resonator coefficients are derived only from the branch's *effective*
//! frequency and decay, and are rebuilt only when those drift past a small
//! epsilon from the values last baked in.

use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_4;

use super::filter::{Biquad, BiquadCoeffs, FilterType};
use super::resonator::{ComplexCoeffs, ResonatorPair, TwoPoleCoeffs};
use super::scale::{PitchClasses, quantize_within};

/// Fixed branch capacity; all branch state is allocated up front.
pub const MAX_BRANCHES: usize = 40;

/// Effective-frequency drift (Hz) that triggers a coefficient rebuild.
pub const FREQ_EPSILON: f64 = 0.1;
/// Effective-decay drift (ms) that triggers a coefficient rebuild.
pub const DECAY_EPSILON: f64 = 0.1;
/// Smoothed-pan drift that triggers a pan-gain refresh.
pub const PAN_EPSILON: f64 = 1e-4;

/// Lowest effective frequency.
pub const MIN_EFFECTIVE_FREQ: f64 = 25.0;
/// Highest effective frequency as a fraction of the sample rate.
pub const MAX_EFFECTIVE_FREQ_RATIO: f64 = 0.45;

const FREQ_SMOOTH_MS: f64 = 30.0;
const AMP_SMOOTH_MS: f64 = 20.0;
const PAN_SMOOTH_MS: f64 = 30.0;

/// One-pole smoothing coefficient reaching 1/e of a step after `time_ms`.
pub fn smoothing_alpha(time_ms: f64, sample_rate: f64) -> f64 {
    1.0 - (-1000.0 / (time_ms * sample_rate)).exp()
}

/// Per-sample approach rates for the smoothed branch values.
#[derive(Debug, Clone, Copy)]
pub struct SmoothingCoeffs {
    pub freq: f64,
    pub amp: f64,
    pub pan: f64,
}

impl SmoothingCoeffs {
    pub fn new(sample_rate: f64) -> Self {
        SmoothingCoeffs {
            freq: smoothing_alpha(FREQ_SMOOTH_MS, sample_rate),
            amp: smoothing_alpha(AMP_SMOOTH_MS, sample_rate),
            pan: smoothing_alpha(PAN_SMOOTH_MS, sample_rate),
        }
    }
}

/// Full branch parameter set, as sent by the bulk command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchSettings {
    pub freq: f64,
    pub decay: f64,
    pub amp: f64,
    pub pan: f64,
}

impl Default for BranchSettings {
    fn default() -> Self {
        BranchSettings {
            freq: 440.0,
            decay: 400.0,
            amp: 0.02,
            pan: 0.0,
        }
    }
}

/// Partial branch update; absent fields keep their previous target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchUpdate {
    pub freq: Option<f64>,
    pub decay: Option<f64>,
    pub amp: Option<f64>,
    pub pan: Option<f64>,
}

impl From<BranchSettings> for BranchUpdate {
    fn from(s: BranchSettings) -> Self {
        BranchUpdate {
            freq: Some(s.freq),
            decay: Some(s.decay),
            amp: Some(s.amp),
            pan: Some(s.pan),
        }
    }
}

/// Clamp a host value into range; non-finite values keep `previous`.
#[inline]
fn ingest(value: f64, previous: f64, min: f64, max: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        previous
    }
}

/// Global transform from a branch's raw values to its effective ones.
/// Built once per block.
#[derive(Debug, Clone, Copy)]
pub struct EffectiveTransform {
    /// `freqScale · 2^octaves`.
    pub freq_factor: f64,
    pub freq_center: f64,
    pub decay_scale: f64,
    pub max_freq: f64,
    pub quantize: bool,
    pub pitch_classes: Option<PitchClasses>,
}

impl EffectiveTransform {
    /// Identity transform with quantization off.
    pub fn identity(sample_rate: f64) -> Self {
        EffectiveTransform {
            freq_factor: 1.0,
            freq_center: 0.0,
            decay_scale: 1.0,
            max_freq: MAX_EFFECTIVE_FREQ_RATIO * sample_rate,
            quantize: false,
            pitch_classes: None,
        }
    }

    #[inline]
    pub fn frequency(&self, smooth_freq: f64) -> f64 {
        let f = (smooth_freq * self.freq_factor + self.freq_center)
            .clamp(MIN_EFFECTIVE_FREQ, self.max_freq);
        if self.quantize {
            quantize_within(f, self.pitch_classes.as_ref(), MIN_EFFECTIVE_FREQ, self.max_freq)
        } else {
            f
        }
    }

    #[inline]
    pub fn decay(&self, target_decay: f64) -> f64 {
        (target_decay * self.decay_scale).max(1.0)
    }
}

/// Bandpass + resonator pair for one excitation path. Each path keeps its
/// own delay lines so the two paths never share filter memory.
#[derive(Debug, Clone)]
pub struct ExcitationPath {
    bandpass: Biquad,
    resonators: ResonatorPair,
    cached_q: f64,
}

impl ExcitationPath {
    fn new(freq: f64, decay: f64, q: f64, sample_rate: f64) -> Self {
        ExcitationPath {
            bandpass: Biquad::new(BiquadCoeffs::new(FilterType::Bandpass, freq, q, sample_rate)),
            resonators: ResonatorPair::new(freq, decay, sample_rate),
            cached_q: q,
        }
    }

    #[inline]
    pub fn bandpass(&mut self, input: f64) -> f64 {
        self.bandpass.process(input)
    }

    #[inline]
    pub fn resonate(&mut self, filtered: f64, mix: f64) -> f64 {
        self.resonators.process(filtered, mix)
    }

    fn reset(&mut self) {
        self.bandpass.reset();
        self.resonators.reset();
    }
}

/// Which coefficient sets a refresh rebuilt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Refresh {
    pub bandpass: bool,
    pub resonators: bool,
}

#[derive(Debug, Clone)]
pub struct Branch {
    pub target_freq: f64,
    pub target_decay: f64,
    pub target_amp: f64,
    pub target_pan: f64,

    pub smooth_freq: f64,
    pub smooth_amp: f64,
    pub smooth_pan: f64,

    pub left_gain: f64,
    pub right_gain: f64,
    gains_pan: f64,

    pub noise: ExcitationPath,
    pub rain: ExcitationPath,

    pub cached_eff_freq: f64,
    pub cached_eff_decay: f64,

    /// Raindrop envelope, decaying geometrically every sample.
    pub rain_env: f64,

    /// Set when targets were snapped; forces a refresh on the next sample.
    dirty: bool,
    sample_rate: f64,
}

impl Branch {
    pub fn new(settings: BranchSettings, sample_rate: f64, q_noise: f64, q_rain: f64) -> Self {
        let transform = EffectiveTransform::identity(sample_rate);
        let mut branch = Branch {
            target_freq: 0.0,
            target_decay: 0.0,
            target_amp: 0.0,
            target_pan: 0.0,
            smooth_freq: 0.0,
            smooth_amp: 0.0,
            smooth_pan: 0.0,
            left_gain: 0.0,
            right_gain: 0.0,
            gains_pan: f64::NAN,
            noise: ExcitationPath::new(440.0, 400.0, q_noise, sample_rate),
            rain: ExcitationPath::new(440.0, 400.0, q_rain, sample_rate),
            cached_eff_freq: f64::NAN,
            cached_eff_decay: f64::NAN,
            rain_env: 0.0,
            dirty: true,
            sample_rate,
        };
        branch.apply_settings(&settings);
        branch.refresh(&transform, q_noise, q_rain);
        branch
    }

    /// Partial target update; smoothed values follow on their own.
    pub fn apply_update(&mut self, update: &BranchUpdate) {
        if let Some(f) = update.freq {
            self.target_freq = ingest(f, self.target_freq, 1.0, 30_000.0);
        }
        if let Some(d) = update.decay {
            self.target_decay = ingest(d, self.target_decay, 1.0, 60_000.0);
        }
        if let Some(a) = update.amp {
            self.target_amp = ingest(a, self.target_amp, 0.0, 1.0);
        }
        if let Some(p) = update.pan {
            self.target_pan = ingest(p, self.target_pan, -1.0, 1.0);
        }
    }

    /// Replace all targets and snap the smoothed values onto them, forcing
    /// a coefficient and pan-gain rebuild on the next sample.
    pub fn apply_settings(&mut self, settings: &BranchSettings) {
        self.apply_update(&BranchUpdate::from(*settings));
        self.smooth_freq = self.target_freq;
        self.smooth_amp = self.target_amp;
        self.smooth_pan = self.target_pan;
        self.dirty = true;
    }

    /// Advance the smoothed values one sample toward their targets.
    #[inline]
    pub fn smooth(&mut self, alpha: &SmoothingCoeffs) {
        self.smooth_freq += (self.target_freq - self.smooth_freq) * alpha.freq;
        self.smooth_amp += (self.target_amp - self.smooth_amp) * alpha.amp;
        self.smooth_pan += (self.target_pan - self.smooth_pan) * alpha.pan;
    }

    #[inline]
    pub fn needs_refresh(&self) -> bool {
        self.dirty
    }

    /// Rebuild whatever drifted: bandpass coefficients when the effective
    /// frequency or a path's Q moved, resonators when the effective
    /// frequency or decay moved, pan gains when the smoothed pan moved.
    pub fn refresh(&mut self, transform: &EffectiveTransform, q_noise: f64, q_rain: f64) -> Refresh {
        let eff_freq = transform.frequency(self.smooth_freq);
        let eff_decay = transform.decay(self.target_decay);
        let sr = self.sample_rate;

        let freq_moved = self.dirty || !((eff_freq - self.cached_eff_freq).abs() <= FREQ_EPSILON);
        let decay_moved = self.dirty || !((eff_decay - self.cached_eff_decay).abs() <= DECAY_EPSILON);
        let mut refresh = Refresh::default();

        if freq_moved || q_noise != self.noise.cached_q || q_rain != self.rain.cached_q {
            if freq_moved || q_noise != self.noise.cached_q {
                self.noise.bandpass.set_coeffs(BiquadCoeffs::new(FilterType::Bandpass, eff_freq, q_noise, sr));
                self.noise.cached_q = q_noise;
            }
            if freq_moved || q_rain != self.rain.cached_q {
                self.rain.bandpass.set_coeffs(BiquadCoeffs::new(FilterType::Bandpass, eff_freq, q_rain, sr));
                self.rain.cached_q = q_rain;
            }
            refresh.bandpass = true;
        }

        if freq_moved || decay_moved {
            let two_pole = TwoPoleCoeffs::new(eff_freq, eff_decay, sr);
            let complex = ComplexCoeffs::new(eff_freq, eff_decay, sr);
            self.noise.resonators.retune(two_pole, complex);
            self.rain.resonators.retune(two_pole, complex);
            self.cached_eff_freq = eff_freq;
            self.cached_eff_decay = eff_decay;
            refresh.resonators = true;
        }

        if self.dirty || !((self.smooth_pan - self.gains_pan).abs() <= PAN_EPSILON) {
            self.update_pan_gains();
        }

        self.dirty = false;
        refresh
    }

    /// Equal-power pan law: θ = (pan + 1)·π/4, L = cos θ, R = sin θ.
    fn update_pan_gains(&mut self) {
        let theta = (self.smooth_pan.clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
        self.left_gain = theta.cos();
        self.right_gain = theta.sin();
        self.gains_pan = self.smooth_pan;
    }

    /// Clear all filter memory and the rain envelope; targets are kept.
    pub fn reset(&mut self) {
        self.noise.reset();
        self.rain.reset();
        self.rain_env = 0.0;
        self.dirty = true;
    }
}
