//! Fast xorshift32 pseudo random number generator.
//!
//! Every stochastic choice in the engine (noise, sample-and-hold LFO,
//! raindrop timing and placement) draws from one of these, so a fixed seed
//! reproduces a render bit for bit.

/// Seed substituted for zero, which is a fixed point of xorshift.
const FALLBACK_SEED: u32 = 0x9E37_79B9;

/// Deterministic xorshift32 generator.
#[derive(Debug, Clone)]
pub struct FastRng {
    state: u32,
}

impl FastRng {
    pub fn new(seed: u32) -> Self {
        FastRng {
            state: if seed == 0 { FALLBACK_SEED } else { seed },
        }
    }

    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Uniform in the open interval (0, 1). Never returns 0, so callers may
    /// take `ln()` of the result directly.
    #[inline]
    pub fn next_unit(&mut self) -> f64 {
        self.next_u32() as f64 / 4_294_967_296.0
    }

    /// Uniform in (-1, 1).
    #[inline]
    pub fn next_signed(&mut self) -> f64 {
        2.0 * self.next_unit() - 1.0
    }

    /// Standard normal draw (Box–Muller, cosine branch).
    #[inline]
    pub fn next_gaussian(&mut self) -> f64 {
        let u1 = self.next_unit();
        let u2 = self.next_unit();
        (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }

    /// Exponentially distributed draw with the given rate (inverse CDF).
    #[inline]
    pub fn next_exponential(&mut self, rate: f64) -> f64 {
        -self.next_unit().ln() / rate
    }
}

impl Default for FastRng {
    fn default() -> Self {
        FastRng::new(FALLBACK_SEED)
    }
}
