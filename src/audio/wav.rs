//! WAV decode/encode for source recordings and waveform artifacts.
//!
//! Source recordings must be mono; a multi-channel or undecodable file is a
//! data-integrity failure for the whole run, never a per-sample skip.

use crate::error::{MixError, Result};
use std::path::Path;

/// Decode a WAV file into mono f32 samples at `target_rate`.
///
/// `key` identifies the recording in error messages. Files at a different
/// rate are resampled with linear interpolation.
pub fn decode(path: &Path, key: &str, target_rate: u32) -> Result<Vec<f32>> {
    let mut reader = hound::WavReader::open(path).map_err(|e| MixError::DataIntegrity {
        key: key.to_string(),
        message: format!("failed to open WAV: {e}"),
    })?;

    let spec = reader.spec();
    if spec.channels != 1 {
        return Err(MixError::DataIntegrity {
            key: key.to_string(),
            message: format!("{} channels, expected mono", spec.channels),
        });
    }

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| MixError::DataIntegrity {
                key: key.to_string(),
                message: format!("failed to read samples: {e}"),
            })?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| MixError::DataIntegrity {
                    key: key.to_string(),
                    message: format!("failed to read samples: {e}"),
                })?
        }
    };

    if spec.sample_rate == target_rate {
        Ok(samples)
    } else {
        Ok(resample(&samples, spec.sample_rate, target_rate))
    }
}

/// Write mono f32 samples as a 32-bit float WAV.
pub fn encode(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer =
        hound::WavWriter::create(path, spec).map_err(|e| MixError::Other(format!(
            "failed to create {}: {e}",
            path.display()
        )))?;
    for &sample in samples {
        writer
            .write_sample(sample)
            .map_err(|e| MixError::Other(format!("failed to write {}: {e}", path.display())))?;
    }
    writer
        .finalize()
        .map_err(|e| MixError::Other(format!("failed to finalize {}: {e}", path.display())))?;
    Ok(())
}

/// Simple linear interpolation resampling.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = source_pos.floor() as usize;
            let fraction = source_pos - source_idx as f64;

            if source_idx + 1 >= samples.len() {
                samples[source_idx.min(samples.len() - 1)]
            } else {
                let left = samples[source_idx] as f64;
                let right = samples[source_idx + 1] as f64;
                (left + (right - left) * fraction) as f32
            }
        })
        .collect()
}
