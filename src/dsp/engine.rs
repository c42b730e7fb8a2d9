//! Synth engine: per-block processor driving the whole branch bank.
//!
//! Each sample: advance the mix smoother, draw and color one noise sample,
//! condition it, tick the raindrop limbs, then run every live branch's two
//! excitation paths through their bandpass and resonator pair and
//! accumulate the panned results into the output buses.
//!
//! All state is allocated in [`SynthEngine::new`]. Nothing in
//! [`SynthEngine::process_block`] allocates, locks, or logs.

use crate::command::{CommandReceiver, CommandSender, EngineCommand, MAX_COMMANDS_PER_BLOCK, command_queue};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::params::{ExciterParams, GlobalParams};

use super::branch::{
    Branch, BranchSettings, EffectiveTransform, MAX_BRANCHES, MAX_EFFECTIVE_FREQ_RATIO,
    SmoothingCoeffs, smoothing_alpha,
};
use super::exciter::ExciterConditioner;
use super::lfo::Lfo;
use super::mixer::{OutputBuses, stem_for_branch};
use super::noise::ColoredNoise;
use super::raindrop::{RainTargets, RaindropGenerator};
use super::random::FastRng;
use super::scale::{PitchClasses, ScaleSpec};

const MIX_SMOOTH_MS: f64 = 50.0;

/// What the engine writes to its output buses. Chosen once per block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Resonator output, panned and summed.
    Synthesis,
    /// Mean bandpassed excitation per path; resonators bypassed, stems silent.
    Monitor,
}

pub struct SynthEngine {
    config: EngineConfig,
    sample_rate: f64,
    rng: FastRng,
    noise: ColoredNoise,
    lfo: Lfo,
    exciter: ExciterConditioner,
    raindrops: RaindropGenerator,
    branches: Vec<Branch>,
    alphas: SmoothingCoeffs,
    mix_alpha: f64,
    smooth_mix: f64,
    scale: ScaleSpec,
    pitch_classes: Option<PitchClasses>,
    /// Samples until the next periodic branch refresh.
    refresh_countdown: usize,
    commands: Option<CommandReceiver>,
    scratch: OutputBuses,
}

impl SynthEngine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let sr = config.sample_rate;
        let exciter = ExciterParams::default();
        let branches = (0..MAX_BRANCHES)
            .map(|_| Branch::new(BranchSettings::default(), sr, exciter.band_q_noise, exciter.band_q_rain))
            .collect();

        log::info!(
            "synth engine: {} Hz, block {}, refresh every {} samples, seed {:#010x}",
            sr,
            config.block_size,
            config.refresh_interval,
            config.seed
        );

        Ok(SynthEngine {
            config,
            sample_rate: sr,
            rng: FastRng::new(config.seed),
            noise: ColoredNoise::new(),
            lfo: Lfo::new(sr),
            exciter: ExciterConditioner::new(sr, exciter.cutoff_hz, exciter.highpass_hz),
            raindrops: RaindropGenerator::new(sr),
            branches,
            alphas: SmoothingCoeffs::new(sr),
            mix_alpha: smoothing_alpha(MIX_SMOOTH_MS, sr),
            smooth_mix: 0.0,
            scale: ScaleSpec::default(),
            pitch_classes: None,
            refresh_countdown: 0,
            commands: None,
            scratch: OutputBuses::new(config.block_size),
        })
    }

    /// Build an engine together with the sending half of its command queue.
    pub fn with_commands(config: EngineConfig) -> Result<(Self, CommandSender), EngineError> {
        let mut engine = SynthEngine::new(config)?;
        let (sender, receiver) = command_queue(config.command_capacity);
        engine.commands = Some(receiver);
        Ok((engine, sender))
    }

    /// Fresh output buses sized for this engine's block.
    pub fn output_buses(&self) -> OutputBuses {
        OutputBuses::new(self.config.block_size)
    }

    pub fn branch(&self, index: usize) -> Option<&Branch> {
        self.branches.get(index)
    }

    pub fn scale(&self) -> ScaleSpec {
        self.scale
    }

    /// Smoothed resonator crossfade.
    pub fn mix(&self) -> f64 {
        self.smooth_mix
    }

    /// Apply one control command. Call between blocks only.
    pub fn apply_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::SetBranch { index, update } => match self.branches.get_mut(index) {
                Some(branch) => branch.apply_update(&update),
                None => log::debug!("ignoring update for branch {index}"),
            },
            EngineCommand::SetAllBranches { count, branches } => {
                for (branch, settings) in self.branches.iter_mut().zip(&branches[..count.min(MAX_BRANCHES)]) {
                    branch.apply_settings(settings);
                }
            }
            EngineCommand::SetScale(scale) => {
                self.scale = scale;
                self.pitch_classes = scale.pitch_classes();
            }
            EngineCommand::Reset => self.reset(),
        }
    }

    /// Clear all filter and resonator history, rain envelopes, and the
    /// noise and LFO state. Branch targets and the scale are kept.
    pub fn reset(&mut self) {
        for branch in &mut self.branches {
            branch.reset();
        }
        self.noise.reset();
        self.lfo.reset();
        self.exciter.reset();
        self.raindrops.reset();
        self.refresh_countdown = 0;
    }

    fn drain_commands(&mut self) {
        let Some(mut receiver) = self.commands.take() else {
            return;
        };
        for _ in 0..MAX_COMMANDS_PER_BLOCK {
            match receiver.pop() {
                Some(command) => self.apply_command(command),
                None => break,
            }
        }
        self.commands = Some(receiver);
    }

    /// Render one block into `out`, filling `out.frames()` samples per bus.
    pub fn process_block(&mut self, params: &GlobalParams, out: &mut OutputBuses) {
        self.drain_commands();

        let p = params.sanitized(self.sample_rate);
        let n = p.n_branches;
        let split = p.group_split();
        let mode = if p.monitor_exciter {
            OutputMode::Monitor
        } else {
            OutputMode::Synthesis
        };

        // Block-rate refresh.
        self.exciter.update(p.exciter.cutoff_hz, p.exciter.highpass_hz);
        self.raindrops.set_duration(p.rain.duration_ms);
        for branch in &mut self.branches[n..] {
            branch.rain_env = 0.0;
        }

        let transform = EffectiveTransform {
            freq_factor: p.freq_factor(),
            freq_center: p.freq_center,
            decay_scale: p.decay_scale,
            max_freq: MAX_EFFECTIVE_FREQ_RATIO * self.sample_rate,
            quantize: p.quantize,
            pitch_classes: self.pitch_classes,
        };
        let q_noise = p.exciter.band_q_noise;
        let q_rain = p.exciter.band_q_rain;
        let targets = RainTargets {
            n_branches: n,
            group_split: split,
        };
        let rain_gain = p.rain.gain;
        let rain_decay = self.raindrops.envelope_decay();
        let inv_n = if n > 0 { 1.0 / n as f64 } else { 0.0 };

        out.clear();
        for i in 0..out.frames() {
            self.smooth_mix += (p.mix - self.smooth_mix) * self.mix_alpha;
            let mix = self.smooth_mix;

            let mut white = self.rng.next_signed() * p.noise_level;
            if p.lfo.enabled {
                white *= self
                    .lfo
                    .next_gain(p.lfo.waveform, p.lfo.rate_hz, p.lfo.depth, &mut self.rng);
            }
            let excitation = self.exciter.process(self.noise.process(white, p.noise_type));

            let branches = &mut self.branches;
            self.raindrops
                .tick(&p.rain, targets, &mut self.rng, |b| branches[b].rain_env += 1.0);

            let refresh_tick = self.refresh_countdown == 0;
            self.refresh_countdown = if refresh_tick {
                self.config.refresh_interval - 1
            } else {
                self.refresh_countdown - 1
            };

            let (mut noise_l, mut noise_r, mut rain_l, mut rain_r) = (0.0, 0.0, 0.0, 0.0);
            let (mut monitor_noise, mut monitor_rain) = (0.0, 0.0);

            for (b, branch) in self.branches[..n].iter_mut().enumerate() {
                branch.smooth(&self.alphas);
                if refresh_tick || branch.needs_refresh() {
                    branch.refresh(&transform, q_noise, q_rain);
                }

                let noise_in = match split {
                    Some(s) if b >= s => 0.0,
                    _ => excitation,
                };
                let rain_in = match split {
                    Some(s) if b < s => 0.0,
                    _ => rain_gain * branch.rain_env,
                };
                branch.rain_env *= rain_decay;

                let noise_bp = branch.noise.bandpass(noise_in);
                let rain_bp = branch.rain.bandpass(rain_in);

                if mode == OutputMode::Monitor {
                    monitor_noise += noise_bp;
                    monitor_rain += rain_bp;
                    continue;
                }

                let v_noise = branch.noise.resonate(noise_bp, mix) * branch.smooth_amp;
                let v_rain = branch.rain.resonate(rain_bp, mix) * branch.smooth_amp;
                noise_l += v_noise * branch.left_gain;
                noise_r += v_noise * branch.right_gain;
                rain_l += v_rain * branch.left_gain;
                rain_r += v_rain * branch.right_gain;
                out.stems[stem_for_branch(b)][i] += v_rain as f32;
            }

            if mode == OutputMode::Monitor {
                noise_l = monitor_noise * inv_n;
                noise_r = noise_l;
                rain_l = monitor_rain * inv_n;
                rain_r = rain_l;
            }

            out.noise_l[i] = noise_l as f32;
            out.noise_r[i] = noise_r as f32;
            out.rain_l[i] = rain_l as f32;
            out.rain_r[i] = rain_r as f32;
        }
    }

    /// Render one block and sum both paths into a single stereo pair.
    pub fn process_mixed(&mut self, params: &GlobalParams, left: &mut [f32], right: &mut [f32]) {
        let mut scratch = std::mem::replace(&mut self.scratch, OutputBuses::new(0));
        self.process_block(params, &mut scratch);
        scratch.mix_stereo_into(left, right);
        self.scratch = scratch;
    }
}
