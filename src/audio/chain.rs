//! Pure signal-chain transforms.
//!
//! Every function is deterministic, performs no I/O, and returns a new
//! signal. Silence gating uses per-frame RMS with a threshold 20 dB below
//! the loudest frame; cuts land on frame boundaries, which makes trimming
//! idempotent.

use crate::defaults::{PEAK_HEADROOM, TOP_DB, TRIM_FRAME};

/// RMS of each non-overlapping `TRIM_FRAME`-sample frame (last frame may be
/// shorter).
fn frame_rms(signal: &[f32]) -> Vec<f32> {
    signal
        .chunks(TRIM_FRAME)
        .map(|frame| {
            let sum: f64 = frame.iter().map(|&s| (s as f64) * (s as f64)).sum();
            (sum / frame.len() as f64).sqrt() as f32
        })
        .collect()
}

/// Gate threshold: `TOP_DB` below the loudest frame.
fn gate_threshold(rms: &[f32]) -> f32 {
    let peak = rms.iter().copied().fold(0.0f32, f32::max);
    peak * 10f32.powf(-TOP_DB / 20.0)
}

/// Drop leading and trailing silent frames.
///
/// A fully silent signal trims to empty. Trimming an already-trimmed signal
/// is a no-op.
pub fn trim_silence(signal: &[f32]) -> Vec<f32> {
    let rms = frame_rms(signal);
    let threshold = gate_threshold(&rms);

    let first = rms.iter().position(|&r| r > threshold);
    let last = rms.iter().rposition(|&r| r > threshold);

    match (first, last) {
        (Some(first), Some(last)) => {
            let start = first * TRIM_FRAME;
            let end = ((last + 1) * TRIM_FRAME).min(signal.len());
            signal[start..end].to_vec()
        }
        _ => Vec::new(),
    }
}

/// Concatenate voiced intervals, discarding interior silence entirely.
///
/// Used for corpora with long internal pauses; the frame gate is the same
/// one `trim_silence` uses.
pub fn vad_merge(signal: &[f32]) -> Vec<f32> {
    let rms = frame_rms(signal);
    let threshold = gate_threshold(&rms);

    let mut merged = Vec::new();
    for (i, &r) in rms.iter().enumerate() {
        if r > threshold {
            let start = i * TRIM_FRAME;
            let end = ((i + 1) * TRIM_FRAME).min(signal.len());
            merged.extend_from_slice(&signal[start..end]);
        }
    }
    merged
}

/// Crop to exactly `l` samples, or `None` when the signal is too short —
/// the caller rejects the whole sample in that case.
pub fn fit_length(signal: &[f32], l: usize) -> Option<Vec<f32>> {
    if signal.len() < l {
        None
    } else {
        Some(signal[..l].to_vec())
    }
}

/// Elementwise sum of two equal-length signals.
pub fn mix(a: &[f32], b: &[f32]) -> Vec<f32> {
    debug_assert_eq!(a.len(), b.len(), "mix requires equal-length signals");
    a.iter().zip(b.iter()).map(|(&x, &y)| x + y).collect()
}

/// Shared normalization factor: `1.1 * max(|mixed|)`.
///
/// Derived from the mixed signal only and applied identically to target and
/// mixed — normalizing them independently would destroy the corpus's SNR
/// semantics.
pub fn mix_norm_factor(mixed: &[f32]) -> f32 {
    PEAK_HEADROOM * mixed.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()))
}

/// Divide every sample by `norm`.
pub fn scale(signal: &[f32], norm: f32) -> Vec<f32> {
    signal.iter().map(|&s| s / norm).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `secs` of constant-amplitude signal at 16kHz.
    fn tone(secs: f64, amplitude: f32) -> Vec<f32> {
        vec![amplitude; (16000.0 * secs) as usize]
    }

    #[test]
    fn trim_removes_leading_and_trailing_silence() {
        let mut signal = tone(0.5, 0.0);
        signal.extend(tone(1.0, 0.5));
        signal.extend(tone(0.5, 0.0));

        let trimmed = trim_silence(&signal);

        // Cut on frame boundaries: voiced span 8000..24000 widens to frame edges
        assert!(trimmed.len() >= 16000);
        assert!(trimmed.len() <= 16000 + 2 * TRIM_FRAME);
        assert!(trimmed[0].abs() > 0.0 || trimmed.len() < signal.len());
        assert!(trimmed.len() < signal.len());
    }

    #[test]
    fn trim_is_idempotent() {
        let mut signal = tone(0.3, 0.0);
        signal.extend(tone(0.7, 0.4));
        signal.extend(tone(0.2, 0.001));
        signal.extend(tone(0.4, 0.0));

        let once = trim_silence(&signal);
        let twice = trim_silence(&once);

        assert_eq!(once, twice);
    }

    #[test]
    fn trim_of_silence_is_empty() {
        let silence = tone(1.0, 0.0);
        assert!(trim_silence(&silence).is_empty());
    }

    #[test]
    fn trim_of_empty_is_empty() {
        assert!(trim_silence(&[]).is_empty());
    }

    #[test]
    fn trim_keeps_fully_voiced_signal() {
        let signal = tone(1.0, 0.5);
        assert_eq!(trim_silence(&signal), signal);
    }

    #[test]
    fn trim_keeps_quiet_tail_within_20db_of_peak() {
        // 0.1 amplitude is exactly -20 dB of 1.0; 0.2 is well inside the gate
        let mut signal = tone(0.5, 1.0);
        signal.extend(tone(0.5, 0.2));
        let trimmed = trim_silence(&signal);
        assert_eq!(trimmed.len(), signal.len());
    }

    #[test]
    fn vad_merge_drops_interior_silence() {
        let mut signal = tone(1.0, 0.5);
        signal.extend(tone(5.0, 0.0));
        signal.extend(tone(1.0, 0.5));

        let merged = vad_merge(&signal);

        // ~2s of voiced audio survives out of 7s
        assert!(merged.len() >= 2 * 16000 - 2 * TRIM_FRAME);
        assert!(merged.len() <= 2 * 16000 + 2 * TRIM_FRAME);
    }

    #[test]
    fn vad_merge_keeps_continuous_speech_intact() {
        let signal = tone(2.0, 0.3);
        assert_eq!(vad_merge(&signal), signal);
    }

    #[test]
    fn fit_length_rejects_short_signal() {
        let signal = tone(1.0, 0.5);
        assert!(fit_length(&signal, 16001).is_none());
    }

    #[test]
    fn fit_length_crops_to_exact_length() {
        let signal = tone(3.0, 0.5);
        let fitted = fit_length(&signal, 40000).unwrap();
        assert_eq!(fitted.len(), 40000);
        assert_eq!(fitted[..], signal[..40000]);
    }

    #[test]
    fn fit_length_exact_boundary_is_accepted() {
        let signal = tone(1.0, 0.5);
        assert_eq!(fit_length(&signal, 16000).unwrap().len(), 16000);
    }

    #[test]
    fn mix_is_elementwise_sum() {
        let a = vec![0.1, 0.2, -0.3];
        let b = vec![0.4, -0.1, 0.3];
        let mixed = mix(&a, &b);
        assert!((mixed[0] - 0.5).abs() < 1e-7);
        assert!((mixed[1] - 0.1).abs() < 1e-7);
        assert!(mixed[2].abs() < 1e-7);
    }

    #[test]
    fn norm_factor_is_headroom_times_peak() {
        let mixed = vec![0.1, -0.8, 0.4];
        let norm = mix_norm_factor(&mixed);
        assert!((norm - 0.88).abs() < 1e-6);
    }

    #[test]
    fn joint_scaling_preserves_mix_identity() {
        let target = tone(0.5, 0.3);
        let interference = tone(0.5, 0.2);
        let mixed = mix(&target, &interference);
        let norm = mix_norm_factor(&mixed);

        let target_n = scale(&target, norm);
        let mixed_n = scale(&mixed, norm);
        let interference_n = scale(&interference, norm);

        // mixed_n == target_n + interference_n under the shared factor
        for i in 0..mixed_n.len() {
            assert!((mixed_n[i] - (target_n[i] + interference_n[i])).abs() < 1e-6);
        }
        // peak of normalized mixed sits at 1/1.1
        let peak = mixed_n.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));
        assert!((peak - 1.0 / PEAK_HEADROOM).abs() < 1e-6);
    }
}
