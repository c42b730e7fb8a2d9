//! Global parameter snapshot supplied by the host once per block.
//!
//! Every field has a default so hosts may send partial JSON / JS objects.
//! [`GlobalParams::sanitized`] clamps the whole snapshot into range at the
//! block boundary; the per-sample path never sees an out-of-range value.

use serde::{Deserialize, Serialize};

use crate::dsp::branch::{MAX_BRANCHES, MAX_EFFECTIVE_FREQ_RATIO};
use crate::dsp::lfo::LfoWaveform;
use crate::dsp::noise::NoiseColor;
use crate::dsp::raindrop::RaindropParams;

/// Wire form of an enumerated host parameter: its numeric code or its name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum HostCode {
    Index(f64),
    Name(String),
}

impl HostCode {
    /// Numeric code rounded to the nearest integer.
    pub fn index(value: f64) -> i32 {
        value.round() as i32
    }

    /// Lowercase alphanumeric key for name lookups.
    pub fn key(name: &str) -> String {
        name.chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect()
    }
}

/// Amplitude LFO applied to the noise excitation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LfoParams {
    pub enabled: bool,
    pub rate_hz: f64,
    pub depth: f64,
    pub waveform: LfoWaveform,
}

impl Default for LfoParams {
    fn default() -> Self {
        LfoParams {
            enabled: false,
            rate_hz: 0.2,
            depth: 0.5,
            waveform: LfoWaveform::Sine,
        }
    }
}

/// Exciter conditioning and per-path bandpass shaping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExciterParams {
    /// Low-pass cutoff applied to the noise excitation.
    pub cutoff_hz: f64,
    /// High-pass cutoff applied to the noise excitation.
    pub highpass_hz: f64,
    /// Branch bandpass Q on the noise path.
    pub band_q_noise: f64,
    /// Branch bandpass Q on the rain path.
    pub band_q_rain: f64,
}

impl Default for ExciterParams {
    fn default() -> Self {
        ExciterParams {
            cutoff_hz: 8000.0,
            highpass_hz: 30.0,
            band_q_noise: 4.0,
            band_q_rain: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GlobalParams {
    pub n_branches: usize,
    pub noise_level: f64,
    pub noise_type: NoiseColor,
    /// Crossfade between the 2-pole (0) and complex (1) resonators.
    pub mix: f64,
    pub freq_scale: f64,
    pub freq_center: f64,
    pub decay_scale: f64,
    pub octaves: f64,
    pub quantize: bool,
    pub exciter: ExciterParams,
    pub rain: RaindropParams,
    pub lfo: LfoParams,
    /// Report the bandpassed excitation instead of the resonator output.
    pub monitor_exciter: bool,
    pub group_enabled: bool,
    /// Branches below the split get noise only, the rest get rain only.
    pub group_split_index: usize,
}

impl Default for GlobalParams {
    fn default() -> Self {
        GlobalParams {
            n_branches: 16,
            noise_level: 1.0,
            noise_type: NoiseColor::Pink,
            mix: 0.0,
            freq_scale: 1.0,
            freq_center: 0.0,
            decay_scale: 1.0,
            octaves: 0.0,
            quantize: false,
            exciter: ExciterParams::default(),
            rain: RaindropParams::default(),
            lfo: LfoParams::default(),
            monitor_exciter: false,
            group_enabled: false,
            group_split_index: 0,
        }
    }
}

#[inline]
fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}

impl GlobalParams {
    /// Clamp every field into its valid range. Non-finite values fall back
    /// to the field default.
    pub fn sanitized(&self, sample_rate: f64) -> Self {
        let d = GlobalParams::default();
        let de = ExciterParams::default();
        let dl = LfoParams::default();
        let nyquist_guard = MAX_EFFECTIVE_FREQ_RATIO * sample_rate;
        let n_branches = self.n_branches.min(MAX_BRANCHES);

        GlobalParams {
            n_branches,
            noise_level: finite_or(self.noise_level, d.noise_level).clamp(0.0, 4.0),
            noise_type: self.noise_type,
            mix: finite_or(self.mix, d.mix).clamp(0.0, 1.0),
            freq_scale: finite_or(self.freq_scale, d.freq_scale).clamp(0.01, 16.0),
            freq_center: finite_or(self.freq_center, d.freq_center).clamp(-5000.0, 5000.0),
            decay_scale: finite_or(self.decay_scale, d.decay_scale).clamp(0.01, 100.0),
            octaves: finite_or(self.octaves, d.octaves).clamp(-4.0, 4.0),
            quantize: self.quantize,
            exciter: ExciterParams {
                cutoff_hz: finite_or(self.exciter.cutoff_hz, de.cutoff_hz)
                    .clamp(20.0, nyquist_guard),
                highpass_hz: finite_or(self.exciter.highpass_hz, de.highpass_hz)
                    .clamp(1.0, nyquist_guard),
                band_q_noise: finite_or(self.exciter.band_q_noise, de.band_q_noise).clamp(0.1, 50.0),
                band_q_rain: finite_or(self.exciter.band_q_rain, de.band_q_rain).clamp(0.1, 50.0),
            },
            rain: self.rain.sanitized(),
            lfo: LfoParams {
                enabled: self.lfo.enabled,
                rate_hz: finite_or(self.lfo.rate_hz, dl.rate_hz).clamp(0.001, 100.0),
                depth: finite_or(self.lfo.depth, dl.depth).clamp(0.0, 1.0),
                waveform: self.lfo.waveform,
            },
            monitor_exciter: self.monitor_exciter,
            group_enabled: self.group_enabled,
            group_split_index: self.group_split_index.min(n_branches),
        }
    }

    /// `freqScale · 2^octaves`.
    pub fn freq_factor(&self) -> f64 {
        self.freq_scale * self.octaves.exp2()
    }

    /// Grouping split point, when grouping is enabled.
    pub fn group_split(&self) -> Option<usize> {
        self.group_enabled.then_some(self.group_split_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f64 = 44100.0;

    #[test]
    fn defaults_are_already_sane() {
        let p = GlobalParams::default();
        assert_eq!(p.sanitized(SR), p);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let p: GlobalParams = serde_json::from_str(
            r#"{"nBranches": 8, "noiseType": "brown", "rain": {"enabled": true, "limbCount": 3}}"#,
        )
        .unwrap();
        assert_eq!(p.n_branches, 8);
        assert_eq!(p.noise_type, NoiseColor::Brown);
        assert!(p.rain.enabled);
        assert_eq!(p.rain.limb_count, 3);
        assert_eq!(p.rain.rate_hz, RaindropParams::default().rate_hz);
        assert_eq!(p.exciter, ExciterParams::default());
    }

    #[test]
    fn numeric_codes_decode() {
        let p: GlobalParams =
            serde_json::from_str(r#"{"noiseType": 1, "lfo": {"enabled": true, "waveform": 3}}"#)
                .unwrap();
        assert_eq!(p.noise_type, NoiseColor::Pink);
        assert_eq!(p.lfo.waveform, LfoWaveform::SampleHold);

        let p: GlobalParams =
            serde_json::from_str(r#"{"noiseType": 3.0, "lfo": {"waveform": 0}}"#).unwrap();
        assert_eq!(p.noise_type, NoiseColor::Blue);
        assert_eq!(p.lfo.waveform, LfoWaveform::Sine);
    }

    #[test]
    fn named_codes_still_decode() {
        let p: GlobalParams =
            serde_json::from_str(r#"{"noiseType": "blue", "lfo": {"waveform": "sampleHold"}}"#)
                .unwrap();
        assert_eq!(p.noise_type, NoiseColor::Blue);
        assert_eq!(p.lfo.waveform, LfoWaveform::SampleHold);
    }

    #[test]
    fn unknown_code_name_is_rejected() {
        let result = serde_json::from_str::<GlobalParams>(r#"{"noiseType": "purple"}"#);
        assert!(result.is_err(), "Unknown noise color should fail to decode");
    }

    #[test]
    fn sanitize_clamps_ranges() {
        let p = GlobalParams {
            n_branches: 500,
            noise_level: -1.0,
            mix: 3.0,
            freq_scale: 0.0,
            octaves: 9.0,
            exciter: ExciterParams {
                cutoff_hz: 1e9,
                highpass_hz: 0.0,
                band_q_noise: 0.0,
                band_q_rain: 1000.0,
            },
            lfo: LfoParams {
                depth: 2.0,
                ..LfoParams::default()
            },
            group_split_index: 900,
            ..GlobalParams::default()
        }
        .sanitized(SR);

        assert_eq!(p.n_branches, MAX_BRANCHES);
        assert_eq!(p.noise_level, 0.0);
        assert_eq!(p.mix, 1.0);
        assert_eq!(p.freq_scale, 0.01);
        assert_eq!(p.octaves, 4.0);
        assert_eq!(p.exciter.cutoff_hz, 0.45 * SR);
        assert_eq!(p.exciter.highpass_hz, 1.0);
        assert_eq!(p.exciter.band_q_noise, 0.1);
        assert_eq!(p.exciter.band_q_rain, 50.0);
        assert_eq!(p.lfo.depth, 1.0);
        assert_eq!(p.group_split_index, MAX_BRANCHES);
    }

    #[test]
    fn non_finite_falls_back_to_default() {
        let p = GlobalParams {
            mix: f64::NAN,
            freq_center: f64::INFINITY,
            ..GlobalParams::default()
        }
        .sanitized(SR);
        assert_eq!(p.mix, GlobalParams::default().mix);
        assert_eq!(p.freq_center, 0.0);
    }

    #[test]
    fn freq_factor_combines_scale_and_octaves() {
        let p = GlobalParams {
            freq_scale: 1.5,
            octaves: -1.0,
            ..GlobalParams::default()
        };
        assert!((p.freq_factor() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn group_split_only_when_enabled() {
        let mut p = GlobalParams {
            group_split_index: 4,
            ..GlobalParams::default()
        };
        assert_eq!(p.group_split(), None);
        p.group_enabled = true;
        assert_eq!(p.group_split(), Some(4));
    }
}
