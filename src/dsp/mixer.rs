//! Output buses: per-path stereo accumulators plus mono stems.

/// Number of round-robin mono stem buses.
pub const STEM_COUNT: usize = 5;

/// Bus assignment for a branch's stem output.
#[inline]
pub fn stem_for_branch(branch: usize) -> usize {
    branch % STEM_COUNT
}

/// One block of engine output. All buffers are allocated up front and
/// cleared, never resized, by the engine.
#[derive(Debug, Clone)]
pub struct OutputBuses {
    pub noise_l: Vec<f32>,
    pub noise_r: Vec<f32>,
    pub rain_l: Vec<f32>,
    pub rain_r: Vec<f32>,
    pub stems: [Vec<f32>; STEM_COUNT],
}

impl OutputBuses {
    pub fn new(block_size: usize) -> Self {
        OutputBuses {
            noise_l: vec![0.0; block_size],
            noise_r: vec![0.0; block_size],
            rain_l: vec![0.0; block_size],
            rain_r: vec![0.0; block_size],
            stems: std::array::from_fn(|_| vec![0.0; block_size]),
        }
    }

    /// Samples per bus.
    pub fn frames(&self) -> usize {
        self.noise_l.len()
    }

    /// Zero every bus.
    pub fn clear(&mut self) {
        self.noise_l.fill(0.0);
        self.noise_r.fill(0.0);
        self.rain_l.fill(0.0);
        self.rain_r.fill(0.0);
        for stem in &mut self.stems {
            stem.fill(0.0);
        }
    }

    /// Sum both stereo paths into one stereo pair. Writes
    /// `min(frames, left.len(), right.len())` samples.
    pub fn mix_stereo_into(&self, left: &mut [f32], right: &mut [f32]) {
        let frames = self.frames().min(left.len()).min(right.len());
        for i in 0..frames {
            left[i] = self.noise_l[i] + self.rain_l[i];
            right[i] = self.noise_r[i] + self.rain_r[i];
        }
    }
}
