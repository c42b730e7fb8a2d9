//! WAV renderer: renders the engine offline to a WAV byte buffer.

use crate::command::EngineCommand;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::params::GlobalParams;

use super::branch::BranchSettings;
use super::engine::SynthEngine;
use super::scale::ScaleSpec;

/// Render `seconds` of the mixed stereo output as separate left/right f32 channels.
pub fn render_stereo(
    config: EngineConfig,
    params: &GlobalParams,
    branches: &[BranchSettings],
    scale: ScaleSpec,
    seconds: f64,
) -> Result<(Vec<f32>, Vec<f32>), EngineError> {
    let mut engine = SynthEngine::new(config)?;
    engine.apply_command(EngineCommand::set_all(branches));
    engine.apply_command(EngineCommand::SetScale(scale));

    let total = (seconds.max(0.0) * config.sample_rate).round() as usize;
    log::info!(
        "rendering {total} frames ({} branches) at {} Hz",
        branches.len(),
        config.sample_rate
    );

    let mut left = vec![0.0_f32; total];
    let mut right = vec![0.0_f32; total];
    let block = config.block_size;
    let mut block_l = vec![0.0_f32; block];
    let mut block_r = vec![0.0_f32; block];
    let mut pos = 0;
    while pos < total {
        engine.process_mixed(params, &mut block_l, &mut block_r);
        let n = block.min(total - pos);
        left[pos..pos + n].copy_from_slice(&block_l[..n]);
        right[pos..pos + n].copy_from_slice(&block_r[..n]);
        pos += n;
    }
    Ok((left, right))
}

/// Render to a WAV file as bytes (16-bit stereo PCM).
pub fn render_wav(
    config: EngineConfig,
    params: &GlobalParams,
    branches: &[BranchSettings],
    scale: ScaleSpec,
    seconds: f64,
) -> Result<Vec<u8>, EngineError> {
    let (left, right) = render_stereo(config, params, branches, scale, seconds)?;
    let mut pcm = Vec::with_capacity(left.len() * 2);
    for (&l, &r) in left.iter().zip(&right) {
        pcm.push(to_i16(l));
        pcm.push(to_i16(r));
    }
    Ok(encode_wav(&pcm, config.sample_rate.round() as u32, 2))
}

fn to_i16(sample: f32) -> i16 {
    (sample as f64 * 32767.0).round().clamp(-32768.0, 32767.0) as i16
}

/// Encode interleaved i16 PCM samples to a WAV byte buffer.
fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * (bits_per_sample as u32 / 8);
    let block_align = channels * (bits_per_sample / 8);
    let data_size = (samples.len() * 2) as u32;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM format
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &sample in samples {
        buf.extend_from_slice(&sample.to_le_bytes());
    }

    buf
}
