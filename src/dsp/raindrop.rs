//! Raindrop impulse generator.
//!
//! Each "limb" is an independent Poisson arrival process. When a limb fires
//! it drops a unit impulse onto one branch's rain envelope, picking the
//! branch from a Gaussian centered somewhere in the bank. The envelopes
//! themselves live on the branches and decay geometrically every sample.

use serde::{Deserialize, Serialize};

use super::random::FastRng;

/// Upper bound on simultaneously active limbs.
pub const MAX_LIMBS: usize = 16;

/// Raindrop excitation parameters (k-rate).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RaindropParams {
    pub enabled: bool,
    /// Scales every branch's rain envelope into an excitation sample.
    pub gain: f64,
    /// Mean arrivals per second, per limb.
    pub rate_hz: f64,
    /// Time for a drop's envelope to fall to 1/e.
    pub duration_ms: f64,
    /// Standard deviation of the branch pick, as a fraction of half the bank.
    pub spread: f64,
    /// Mean of the branch pick, 0 = first branch, 1 = last.
    pub center: f64,
    pub limb_count: usize,
}

impl Default for RaindropParams {
    fn default() -> Self {
        Self {
            enabled: false,
            gain: 1.0,
            rate_hz: 2.0,
            duration_ms: 20.0,
            spread: 0.5,
            center: 0.5,
            limb_count: 4,
        }
    }
}

impl RaindropParams {
    pub fn sanitized(&self) -> Self {
        let d = Self::default();
        Self {
            enabled: self.enabled,
            gain: finite_or(self.gain, d.gain).clamp(0.0, 10.0),
            rate_hz: finite_or(self.rate_hz, d.rate_hz).clamp(0.01, 200.0),
            duration_ms: finite_or(self.duration_ms, d.duration_ms).clamp(1.0, 10_000.0),
            spread: finite_or(self.spread, d.spread).clamp(0.0, 1.0),
            center: finite_or(self.center, d.center).clamp(0.0, 1.0),
            limb_count: self.limb_count.min(MAX_LIMBS),
        }
    }
}

#[inline]
fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}

/// Which branches a drop may land on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RainTargets {
    pub n_branches: usize,
    /// With grouping enabled, only indices at or above the split receive rain.
    pub group_split: Option<usize>,
}

/// Pick a branch index for one drop, or `None` when no branch is eligible.
pub fn pick_branch(
    center: f64,
    spread: f64,
    targets: RainTargets,
    rng: &mut FastRng,
) -> Option<usize> {
    let n = targets.n_branches;
    if n == 0 {
        return None;
    }
    let span = (n - 1) as f64;
    let mean = (center * span).round();
    let sd = (spread * span / 2.0).max(0.5);
    let index = (mean + rng.next_gaussian() * sd).round().clamp(0.0, span) as usize;

    match targets.group_split {
        Some(split) if split >= n => None,
        Some(split) if index < split => Some(split + index % (n - split)),
        _ => Some(index),
    }
}

/// Per-limb arrival scheduling.
#[derive(Debug, Clone)]
pub struct RaindropGenerator {
    /// Samples until each limb's next drop; 0 means not yet scheduled.
    countdowns: [u32; MAX_LIMBS],
    decay: f64,
    duration_ms: f64,
    sample_rate: f64,
}

impl RaindropGenerator {
    pub fn new(sample_rate: f64) -> Self {
        let mut generator = RaindropGenerator {
            countdowns: [0; MAX_LIMBS],
            decay: 0.0,
            duration_ms: f64::NAN,
            sample_rate,
        };
        generator.set_duration(RaindropParams::default().duration_ms);
        generator
    }

    /// Recompute the per-sample envelope decay. Called once per block.
    pub fn set_duration(&mut self, duration_ms: f64) {
        if duration_ms != self.duration_ms {
            self.duration_ms = duration_ms;
            self.decay = (-1.0 / (duration_ms * 0.001 * self.sample_rate)).exp();
        }
    }

    /// Geometric per-sample multiplier for the branch rain envelopes.
    #[inline]
    pub fn envelope_decay(&self) -> f64 {
        self.decay
    }

    /// Draw an exponential inter-arrival time, in samples (at least one).
    pub fn next_interval(&self, rate_hz: f64, rng: &mut FastRng) -> u32 {
        let samples = (rng.next_exponential(rate_hz) * self.sample_rate).round();
        samples.clamp(1.0, u32::MAX as f64) as u32
    }

    /// Advance every active limb by one sample, calling `on_drop` with the
    /// branch index for each drop that lands. Returns the number of drops.
    #[inline]
    pub fn tick(
        &mut self,
        params: &RaindropParams,
        targets: RainTargets,
        rng: &mut FastRng,
        mut on_drop: impl FnMut(usize),
    ) -> usize {
        if !params.enabled {
            return 0;
        }
        let mut fired = 0;
        for limb in 0..params.limb_count.min(MAX_LIMBS) {
            if self.countdowns[limb] == 0 {
                self.countdowns[limb] = self.next_interval(params.rate_hz, rng);
                continue;
            }
            self.countdowns[limb] -= 1;
            if self.countdowns[limb] == 0 {
                if let Some(branch) = pick_branch(params.center, params.spread, targets, rng) {
                    on_drop(branch);
                    fired += 1;
                }
                self.countdowns[limb] = self.next_interval(params.rate_hz, rng);
            }
        }
        fired
    }

    pub fn reset(&mut self) {
        self.countdowns = [0; MAX_LIMBS];
    }
}
