//! Biquad and one-pole filters for exciter shaping and per-branch bandpass.

use std::f64::consts::PI;

/// Biquad response type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterType {
    Lowpass,
    /// Constant skirt gain bandpass: peak gain equals Q.
    Bandpass,
}

/// Normalized biquad coefficients (a0 divided out).
///
/// Formulas from the Audio EQ Cookbook (Robert Bristow-Johnson).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    /// Pass-through coefficients.
    pub const IDENTITY: BiquadCoeffs = BiquadCoeffs {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    pub fn new(filter_type: FilterType, frequency: f64, q: f64, sample_rate: f64) -> Self {
        let w0 = 2.0 * PI * frequency / sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * q);

        let (b0, b1, b2, a0, a1, a2) = match filter_type {
            FilterType::Lowpass => {
                let b1 = 1.0 - cos_w0;
                let b0 = b1 / 2.0;
                let b2 = b0;
                (b0, b1, b2, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
            }
            FilterType::Bandpass => {
                let b0 = sin_w0 / 2.0;
                (b0, 0.0, -b0, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
            }
        };

        BiquadCoeffs {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

/// A biquad IIR section (Direct Form II Transposed).
///
/// Coefficients are owned by the caller's change detection; this struct
/// only holds them alongside the delay-line state.
#[derive(Debug, Clone)]
pub struct Biquad {
    coeffs: BiquadCoeffs,
    z1: f64,
    z2: f64,
}

impl Biquad {
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Biquad {
            coeffs,
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// Swap coefficients without touching the delay line.
    pub fn set_coeffs(&mut self, coeffs: BiquadCoeffs) {
        self.coeffs = coeffs;
    }

    pub fn coeffs(&self) -> &BiquadCoeffs {
        &self.coeffs
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let c = &self.coeffs;
        let output = c.b0 * input + self.z1;
        self.z1 = c.b1 * input - c.a1 * output + self.z2;
        self.z2 = c.b2 * input - c.a2 * output;
        output
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

impl Default for Biquad {
    fn default() -> Self {
        Biquad::new(BiquadCoeffs::IDENTITY)
    }
}

/// One-pole RC high-pass: `y[n] = α·(y[n-1] + x[n] - x[n-1])`.
#[derive(Debug, Clone)]
pub struct OnePoleHighpass {
    alpha: f64,
    x1: f64,
    y1: f64,
}

impl OnePoleHighpass {
    pub fn new() -> Self {
        OnePoleHighpass {
            alpha: 1.0,
            x1: 0.0,
            y1: 0.0,
        }
    }

    /// `α = RC / (RC + Δt)` with `RC = 1 / (2π·fc)`.
    pub fn set_cutoff(&mut self, cutoff_hz: f64, sample_rate: f64) {
        let rc = 1.0 / (2.0 * PI * cutoff_hz);
        let dt = 1.0 / sample_rate;
        self.alpha = rc / (rc + dt);
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.alpha * (self.y1 + input - self.x1);
        self.x1 = input;
        self.y1 = output;
        output
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.y1 = 0.0;
    }
}

impl Default for OnePoleHighpass {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f64 = 44100.0;

    fn sine_peak(filter: &mut Biquad, freq: f64) -> f64 {
        let mut max_out = 0.0_f64;
        for i in 0..8820 {
            let t = i as f64 / SR;
            let out = filter.process((2.0 * PI * freq * t).sin());
            if i > 4410 {
                max_out = max_out.max(out.abs());
            }
        }
        max_out
    }

    #[test]
    fn lowpass_passes_dc() {
        let mut f = Biquad::new(BiquadCoeffs::new(FilterType::Lowpass, 5000.0, 0.7071, SR));
        let mut output = 0.0;
        for _ in 0..1000 {
            output = f.process(1.0);
        }
        assert!((output - 1.0).abs() < 0.001, "Lowpass should pass DC, got {output}");
    }

    #[test]
    fn lowpass_attenuates_high_freq() {
        let mut f = Biquad::new(BiquadCoeffs::new(FilterType::Lowpass, 200.0, 0.7071, SR));
        let peak = sine_peak(&mut f, 10000.0);
        assert!(peak < 0.01, "Lowpass@200Hz should strongly attenuate 10kHz, got {peak}");
    }

    #[test]
    fn bandpass_peak_gain_equals_q() {
        for q in [0.5, 1.0, 4.0] {
            let mut f = Biquad::new(BiquadCoeffs::new(FilterType::Bandpass, 1000.0, q, SR));
            let peak = sine_peak(&mut f, 1000.0);
            assert!(
                (peak - q).abs() / q < 0.02,
                "Constant-skirt bandpass at center should have gain Q={q}, got {peak}"
            );
        }
    }

    #[test]
    fn bandpass_blocks_dc() {
        let mut f = Biquad::new(BiquadCoeffs::new(FilterType::Bandpass, 300.0, 2.0, SR));
        let mut output = 1.0;
        for _ in 0..20000 {
            output = f.process(1.0);
        }
        assert!(output.abs() < 1e-3, "Bandpass should block DC, got {output}");
    }

    #[test]
    fn coefficient_swap_keeps_state_finite() {
        let mut f = Biquad::default();
        for i in 0..10000 {
            if i % 100 == 0 {
                let freq = 25.0 + (i as f64 / 10000.0) * 19000.0;
                f.set_coeffs(BiquadCoeffs::new(FilterType::Bandpass, freq, 1.0, SR));
            }
            let input = if i % 50 == 0 { 1.0 } else { 0.0 };
            let out = f.process(input);
            assert!(out.is_finite(), "Filter output not finite at sample {i}");
        }
    }

    #[test]
    fn highpass_blocks_dc() {
        let mut hp = OnePoleHighpass::new();
        hp.set_cutoff(40.0, SR);
        let mut output = 1.0;
        for _ in 0..20000 {
            output = hp.process(1.0);
        }
        assert!(output.abs() < 1e-3, "High-pass should block DC, got {output}");
    }

    #[test]
    fn highpass_passes_treble() {
        let mut hp = OnePoleHighpass::new();
        hp.set_cutoff(40.0, SR);
        let mut max_out = 0.0_f64;
        for i in 0..8820 {
            let t = i as f64 / SR;
            let out = hp.process((2.0 * PI * 5000.0 * t).sin());
            if i > 4410 {
                max_out = max_out.max(out.abs());
            }
        }
        assert!(max_out > 0.98, "High-pass@40Hz should pass 5kHz, got {max_out}");
    }
}
