//! Dual resonator models: a 2-pole real resonator and a complex one-pole
//! resonator, tuned to the same frequency and decay and crossfaded.
//!
//! Both models hard-clamp their output (and therefore their feedback state)
//! to [-1, 1] every sample so a transient coefficient jump can never blow up.

use std::f64::consts::PI;

/// Input scaling for the complex resonator, balancing it against the
/// 2-pole model's higher resonant gain at 44.1 kHz with up to 40 branches.
pub const COMPLEX_INPUT_GAIN: f64 = 0.02;

/// Decay-to-radius calibration for the complex resonator: the pole radius
/// is `exp((-1000 / sr) / (decay_ms * COMPLEX_DECAY_FACTOR))`.
pub const COMPLEX_DECAY_FACTOR: f64 = 0.08;

/// Coefficients of the damped-cosine recursion
/// `y[n] = a·x[n] + b·y[n-1] + c·y[n-2]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoPoleCoeffs {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl TwoPoleCoeffs {
    /// Tune to `freq_hz` with an envelope that falls to 1/e after `decay_ms`.
    pub fn new(freq_hz: f64, decay_ms: f64, sample_rate: f64) -> Self {
        let omega = 2.0 * PI * freq_hz / sample_rate;
        let bw = 2.0 / (decay_ms * 0.001 * sample_rate);
        let b = 2.0 * omega.cos() * (-0.5 * bw).exp();
        let c = -(-bw).exp();
        TwoPoleCoeffs {
            a: 1.0 - (b + c),
            b,
            c,
        }
    }

    /// Radius of the conjugate pole pair, `sqrt(-c)`.
    pub fn pole_radius(&self) -> f64 {
        (-self.c).sqrt()
    }
}

#[derive(Debug, Clone)]
pub struct TwoPoleResonator {
    coeffs: TwoPoleCoeffs,
    y1: f64,
    y2: f64,
}

impl TwoPoleResonator {
    pub fn new(coeffs: TwoPoleCoeffs) -> Self {
        TwoPoleResonator {
            coeffs,
            y1: 0.0,
            y2: 0.0,
        }
    }

    pub fn set_coeffs(&mut self, coeffs: TwoPoleCoeffs) {
        self.coeffs = coeffs;
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let c = &self.coeffs;
        let y = (c.a * input + c.b * self.y1 + c.c * self.y2).clamp(-1.0, 1.0);
        self.y2 = self.y1;
        self.y1 = y;
        y
    }

    pub fn reset(&mut self) {
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

/// Rotation of the complex one-pole: `(r·cos ω, r·sin ω)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComplexCoeffs {
    pub re: f64,
    pub im: f64,
}

impl ComplexCoeffs {
    pub fn new(freq_hz: f64, decay_ms: f64, sample_rate: f64) -> Self {
        let omega = 2.0 * PI * freq_hz / sample_rate;
        let r = ((-1000.0 / sample_rate) / (decay_ms * COMPLEX_DECAY_FACTOR)).exp();
        ComplexCoeffs {
            re: r * omega.cos(),
            im: r * omega.sin(),
        }
    }

    pub fn radius(&self) -> f64 {
        self.re.hypot(self.im)
    }
}

#[derive(Debug, Clone)]
pub struct ComplexResonator {
    coeffs: ComplexCoeffs,
    ry1: f64,
    iy1: f64,
}

impl ComplexResonator {
    pub fn new(coeffs: ComplexCoeffs) -> Self {
        ComplexResonator {
            coeffs,
            ry1: 0.0,
            iy1: 0.0,
        }
    }

    pub fn set_coeffs(&mut self, coeffs: ComplexCoeffs) {
        self.coeffs = coeffs;
    }

    /// Rotate the state by one step, inject the scaled input into the real
    /// part, and return the real part.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let ComplexCoeffs { re, im } = self.coeffs;
        let ry = (re * self.ry1 - im * self.iy1 + input * COMPLEX_INPUT_GAIN).clamp(-1.0, 1.0);
        let iy = (im * self.ry1 + re * self.iy1).clamp(-1.0, 1.0);
        self.ry1 = ry;
        self.iy1 = iy;
        ry
    }

    pub fn reset(&mut self) {
        self.ry1 = 0.0;
        self.iy1 = 0.0;
    }
}

/// Both resonator models for one excitation path of one branch.
#[derive(Debug, Clone)]
pub struct ResonatorPair {
    pub two_pole: TwoPoleResonator,
    pub complex: ComplexResonator,
}

impl ResonatorPair {
    pub fn new(freq_hz: f64, decay_ms: f64, sample_rate: f64) -> Self {
        ResonatorPair {
            two_pole: TwoPoleResonator::new(TwoPoleCoeffs::new(freq_hz, decay_ms, sample_rate)),
            complex: ComplexResonator::new(ComplexCoeffs::new(freq_hz, decay_ms, sample_rate)),
        }
    }

    pub fn retune(&mut self, two_pole: TwoPoleCoeffs, complex: ComplexCoeffs) {
        self.two_pole.set_coeffs(two_pole);
        self.complex.set_coeffs(complex);
    }

    /// `(1 - mix)·two_pole + mix·complex`.
    #[inline]
    pub fn process(&mut self, input: f64, mix: f64) -> f64 {
        let a = self.two_pole.process(input);
        let b = self.complex.process(input);
        (1.0 - mix) * a + mix * b
    }

    pub fn reset(&mut self) {
        self.two_pole.reset();
        self.complex.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f64 = 44100.0;

    fn grid() -> impl Iterator<Item = (f64, f64)> {
        let freqs = [25.0, 50.0, 100.0, 440.0, 1000.0, 5000.0, 12000.0, 0.45 * SR];
        let decays = [1.0, 2.0, 10.0, 100.0, 400.0, 1000.0, 3000.0, 60000.0];
        freqs
            .into_iter()
            .flat_map(move |f| decays.into_iter().map(move |d| (f, d)))
    }

    #[test]
    fn two_pole_poles_inside_unit_circle() {
        for (f, d) in grid() {
            let c = TwoPoleCoeffs::new(f, d, SR);
            // z^2 - b z - c = 0
            assert!(c.b * c.b + 4.0 * c.c < 0.0, "Expected complex poles at f={f} decay={d}");
            let radius = c.pole_radius();
            assert!(radius < 1.0, "Unstable pole {radius} at f={f} decay={d}");
            assert!(c.b.abs() < 2.0 && c.c.abs() < 1.0, "Coefficients out of bounds at f={f} decay={d}");
        }
    }

    #[test]
    fn complex_radius_below_one() {
        for (f, d) in grid() {
            let c = ComplexCoeffs::new(f, d, SR);
            assert!(c.radius() < 1.0, "Complex pole radius {} at f={f} decay={d}", c.radius());
        }
    }

    #[test]
    fn damped_cosine_decays_to_inverse_e_at_decay_time() {
        // 100 Hz, 500 ms: one period is 10 ms, so a 10 ms window always
        // contains an envelope peak.
        let mut r = TwoPoleResonator::new(TwoPoleCoeffs::new(100.0, 500.0, SR));
        let n = (SR * 0.7) as usize;
        let out: Vec<f64> = (0..n)
            .map(|i| r.process(if i == 0 { 1.0 } else { 0.0 }))
            .collect();

        let window_peak = |start_s: f64| {
            let start = (start_s * SR) as usize;
            let len = (0.01 * SR) as usize;
            out[start..start + len].iter().fold(0.0_f64, |m, s| m.max(s.abs()))
        };

        let early = window_peak(0.05);
        let late = window_peak(0.55);
        let ratio = late / early;
        let expected = (-1.0_f64).exp();
        assert!(
            (ratio - expected).abs() / expected < 0.05,
            "Envelope should fall by 1/e over 500 ms, ratio {ratio}"
        );
    }

    #[test]
    fn damped_cosine_rings_at_tuned_frequency() {
        let mut r = TwoPoleResonator::new(TwoPoleCoeffs::new(100.0, 2000.0, SR));
        let out: Vec<f64> = (0..SR as usize)
            .map(|i| r.process(if i == 0 { 1.0 } else { 0.0 }))
            .collect();
        let crossings = out
            .windows(2)
            .filter(|w| (w[0] < 0.0) != (w[1] < 0.0))
            .count();
        // Two zero crossings per cycle over one second.
        assert!(
            (198..=202).contains(&crossings),
            "Expected ~200 zero crossings for 100 Hz, got {crossings}"
        );
    }

    #[test]
    fn outputs_clamped_under_parameter_jumps() {
        let mut pair = ResonatorPair::new(440.0, 400.0, SR);
        let mut freq: f64 = 25.0;
        let mut decay: f64 = 1.0;
        for i in 0..10_000 {
            if i % 100 == 0 {
                freq = if freq > 10000.0 { 25.0 } else { freq * 1.7 };
                decay = if decay > 2500.0 { 1.0 } else { decay * 2.3 };
                pair.retune(
                    TwoPoleCoeffs::new(freq.min(20000.0), decay.min(3000.0), SR),
                    ComplexCoeffs::new(freq.min(20000.0), decay.min(3000.0), SR),
                );
            }
            let input = if i % 37 == 0 { 50.0 } else { -3.0 };
            for mix in [0.0, 0.5, 1.0] {
                let out = pair.clone().process(input, mix);
                assert!(out.abs() <= 1.0, "Resonator output {out} escaped clamp at {i}");
            }
            let out = pair.process(input, 0.3);
            assert!(out.is_finite() && out.abs() <= 1.0 + 1e-12);
        }
    }

    #[test]
    fn mix_endpoints_select_model() {
        let mut pair = ResonatorPair::new(300.0, 200.0, SR);
        let mut solo = TwoPoleResonator::new(TwoPoleCoeffs::new(300.0, 200.0, SR));
        for i in 0..1000 {
            let x = if i == 0 { 1.0 } else { 0.0 };
            assert_eq!(pair.process(x, 0.0), solo.process(x));
        }

        let mut pair = ResonatorPair::new(300.0, 200.0, SR);
        let mut solo = ComplexResonator::new(ComplexCoeffs::new(300.0, 200.0, SR));
        for i in 0..1000 {
            let x = if i == 0 { 1.0 } else { 0.0 };
            assert_eq!(pair.process(x, 1.0), solo.process(x));
        }
    }

    #[test]
    fn complex_input_scaled() {
        let mut r = ComplexResonator::new(ComplexCoeffs::new(1000.0, 100.0, SR));
        assert!((r.process(1.0) - COMPLEX_INPUT_GAIN).abs() < 1e-12);
    }
}
