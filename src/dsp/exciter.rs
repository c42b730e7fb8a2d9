//! Exciter conditioner: shared high-pass + low-pass applied to the noise
//! excitation before it reaches any branch.
//!
//! Coefficients follow k-rate parameters and are refreshed once per block.

use super::filter::{Biquad, BiquadCoeffs, FilterType, OnePoleHighpass};

const BUTTERWORTH_Q: f64 = std::f64::consts::FRAC_1_SQRT_2;

#[derive(Debug, Clone)]
pub struct ExciterConditioner {
    highpass: OnePoleHighpass,
    lowpass: Biquad,
    cutoff_hz: f64,
    highpass_hz: f64,
    sample_rate: f64,
}

impl ExciterConditioner {
    pub fn new(sample_rate: f64, cutoff_hz: f64, highpass_hz: f64) -> Self {
        let mut conditioner = ExciterConditioner {
            highpass: OnePoleHighpass::new(),
            lowpass: Biquad::default(),
            cutoff_hz: f64::NAN,
            highpass_hz: f64::NAN,
            sample_rate,
        };
        conditioner.update(cutoff_hz, highpass_hz);
        conditioner
    }

    /// Block-rate coefficient refresh. Only recomputes what changed.
    pub fn update(&mut self, cutoff_hz: f64, highpass_hz: f64) {
        if cutoff_hz != self.cutoff_hz {
            self.cutoff_hz = cutoff_hz;
            self.lowpass.set_coeffs(BiquadCoeffs::new(
                FilterType::Lowpass,
                cutoff_hz,
                BUTTERWORTH_Q,
                self.sample_rate,
            ));
        }
        if highpass_hz != self.highpass_hz {
            self.highpass_hz = highpass_hz;
            self.highpass.set_cutoff(highpass_hz, self.sample_rate);
        }
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        self.lowpass.process(self.highpass.process(input))
    }

    pub fn reset(&mut self) {
        self.highpass.reset();
        self.lowpass.reset();
    }
}
