//! Colored noise exciter.
//!
//! Produces one mono excitation sample per tick in one of four spectral
//! colors. Each color is scaled so that all four land at a comparable
//! perceived loudness and stay roughly inside [-1, 1].

use serde::{Deserialize, Serialize};

use crate::params::HostCode;

/// Spectral color of the noise exciter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "HostCode")]
pub enum NoiseColor {
    White,
    #[default]
    Pink,
    Brown,
    Blue,
}

impl NoiseColor {
    /// Map a numeric host parameter (0 = white, 1 = pink, 2 = brown,
    /// 3 = blue). Out-of-range values clamp.
    pub fn from_index(index: i32) -> Self {
        match index {
            i32::MIN..=0 => NoiseColor::White,
            1 => NoiseColor::Pink,
            2 => NoiseColor::Brown,
            _ => NoiseColor::Blue,
        }
    }
}

impl TryFrom<HostCode> for NoiseColor {
    type Error = String;

    fn try_from(code: HostCode) -> Result<Self, Self::Error> {
        match code {
            HostCode::Index(value) => Ok(NoiseColor::from_index(HostCode::index(value))),
            HostCode::Name(name) => match HostCode::key(&name).as_str() {
                "white" => Ok(NoiseColor::White),
                "pink" => Ok(NoiseColor::Pink),
                "brown" | "red" => Ok(NoiseColor::Brown),
                "blue" => Ok(NoiseColor::Blue),
                _ => Err(format!("unknown noise color {name:?}")),
            },
        }
    }
}

const WHITE_GAIN: f64 = 0.2;
const PINK_GAIN: f64 = 0.05;
const BLUE_GAIN: f64 = 0.5;
const BROWN_STEP: f64 = 0.02;
const BROWN_LEAK: f64 = 0.998;

/// Filter memory for the colored noise generator.
#[derive(Debug, Clone, Default)]
pub struct ColoredNoise {
    // Paul Kellet economy pink filter
    pink_b0: f64,
    pink_b1: f64,
    pink_b2: f64,
    brown: f64,
    last_white: f64,
}

impl ColoredNoise {
    pub fn new() -> Self {
        Self::default()
    }

    /// Color one white sample. `white` is the raw signed-uniform draw already
    /// scaled by the noise level and LFO gain.
    #[inline]
    pub fn process(&mut self, white: f64, color: NoiseColor) -> f64 {
        match color {
            NoiseColor::White => white * WHITE_GAIN,
            NoiseColor::Pink => {
                self.pink_b0 = 0.99765 * self.pink_b0 + white * 0.099_046_0;
                self.pink_b1 = 0.96300 * self.pink_b1 + white * 0.296_516_4;
                self.pink_b2 = 0.57000 * self.pink_b2 + white * 1.052_691_3;
                let pink = self.pink_b0 + self.pink_b1 + self.pink_b2 + white * 0.1848;
                pink * PINK_GAIN
            }
            NoiseColor::Brown => {
                self.brown = ((self.brown + white * BROWN_STEP) * BROWN_LEAK).clamp(-1.0, 1.0);
                self.brown
            }
            NoiseColor::Blue => {
                let out = (white - self.last_white) * BLUE_GAIN;
                self.last_white = white;
                out
            }
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::random::FastRng;

    fn run(color: NoiseColor, n: usize) -> Vec<f64> {
        let mut rng = FastRng::new(11);
        let mut noise = ColoredNoise::new();
        (0..n).map(|_| noise.process(rng.next_signed(), color)).collect()
    }

    #[test]
    fn all_colors_bounded() {
        for color in [
            NoiseColor::White,
            NoiseColor::Pink,
            NoiseColor::Brown,
            NoiseColor::Blue,
        ] {
            for (i, s) in run(color, 100_000).into_iter().enumerate() {
                assert!(s.is_finite(), "{color:?} not finite at {i}");
                assert!(s.abs() <= 1.0, "{color:?} out of range at {i}: {s}");
            }
        }
    }

    #[test]
    fn white_is_attenuated() {
        let peak = run(NoiseColor::White, 10_000)
            .iter()
            .fold(0.0_f64, |m, s| m.max(s.abs()));
        assert!(peak <= WHITE_GAIN, "White peak should be <= 0.2, got {peak}");
        assert!(peak > 0.15, "White peak suspiciously low: {peak}");
    }

    #[test]
    fn brown_is_smoother_than_blue() {
        // Mean absolute first difference: brown changes slowly, blue quickly.
        let roughness = |v: &[f64]| {
            v.windows(2).map(|w| (w[1] - w[0]).abs()).sum::<f64>() / (v.len() - 1) as f64
        };
        let brown = run(NoiseColor::Brown, 20_000);
        let blue = run(NoiseColor::Blue, 20_000);
        let brown_rms = (brown.iter().map(|s| s * s).sum::<f64>() / brown.len() as f64).sqrt();
        let blue_rms = (blue.iter().map(|s| s * s).sum::<f64>() / blue.len() as f64).sqrt();
        assert!(
            roughness(&brown) / brown_rms < roughness(&blue) / blue_rms,
            "Brown noise should have relatively less high-frequency energy than blue"
        );
    }

    #[test]
    fn silent_input_stays_silent() {
        let mut noise = ColoredNoise::new();
        for color in [NoiseColor::White, NoiseColor::Pink, NoiseColor::Blue] {
            for _ in 0..100 {
                assert_eq!(noise.process(0.0, color), 0.0);
            }
        }
    }

    #[test]
    fn color_from_index() {
        assert_eq!(NoiseColor::from_index(0), NoiseColor::White);
        assert_eq!(NoiseColor::from_index(1), NoiseColor::Pink);
        assert_eq!(NoiseColor::from_index(2), NoiseColor::Brown);
        assert_eq!(NoiseColor::from_index(3), NoiseColor::Blue);
        assert_eq!(NoiseColor::from_index(9), NoiseColor::Blue);
    }

    #[test]
    fn color_decodes_from_code_or_name() {
        let c: NoiseColor = serde_json::from_str("2").unwrap();
        assert_eq!(c, NoiseColor::Brown);
        let c: NoiseColor = serde_json::from_str(r#""Pink""#).unwrap();
        assert_eq!(c, NoiseColor::Pink);
        assert_eq!(serde_json::to_string(&NoiseColor::Blue).unwrap(), r#""blue""#);
    }
}
