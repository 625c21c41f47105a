//! Per-sample accept/skip decision and signal-chain execution.
//!
//! `SampleBuilder` is pure: it takes three decoded mono signals and either
//! produces the in-memory artifact set for one sample or a typed rejection.
//! All file writing and uploading belongs to the orchestrator, so the
//! builder is independently testable.

use crate::audio::chain;
use crate::audio::spectrum::{Spectrogram, Spectrum};
use crate::config::Config;

/// Why a sample was skipped. Rejection is expected behavior, not an error;
/// a rejected index produces zero artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Trimmed enrollment clip is too short for speaker-embedding use.
    EnrollmentTooShort,
    /// Target shorter than the fixed crop length.
    TargetTooShort,
    /// Interference shorter than the fixed crop length.
    InterferenceTooShort,
}

/// The in-memory artifacts of one accepted sample.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltSample {
    /// Clean target waveform, exactly `len` samples, jointly normalized.
    pub target: Vec<f32>,
    /// Mixed waveform, exactly `len` samples, jointly normalized.
    pub mixed: Vec<f32>,
    pub target_mag: Spectrum,
    pub mixed_mag: Spectrum,
}

/// Result of one build attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildOutcome {
    Built(BuiltSample),
    Rejected(RejectReason),
}

/// Executes the decision sequence and signal chain for one sample.
pub struct SampleBuilder {
    /// Fixed crop length `L = sample_rate * audio_len_secs`.
    len: usize,
    /// Minimum trimmed enrollment length, `1.1 * window * hop`.
    min_enrollment: usize,
    /// Apply VAD merging to target and interference (never enrollment).
    vad: bool,
    spectrogram: Spectrogram,
}

impl SampleBuilder {
    pub fn new(len: usize, min_enrollment: usize, vad: bool, spectrogram: Spectrogram) -> Self {
        Self {
            len,
            min_enrollment,
            vad,
            spectrogram,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.crop_len(),
            config.min_enrollment_len(),
            config.generate.vad,
            Spectrogram::new(config.spectral.window, config.spectral.hop),
        )
    }

    pub fn crop_len(&self) -> usize {
        self.len
    }

    /// Run the accept/skip decision and signal chain.
    ///
    /// Inputs are mono by construction (decode enforces the channel
    /// invariant fatally). The check order is fixed: enrollment length
    /// first, then target, then interference.
    pub fn build(&self, enrollment: &[f32], target: &[f32], interference: &[f32]) -> BuildOutcome {
        let enrollment = chain::trim_silence(enrollment);
        let mut target = chain::trim_silence(target);
        let mut interference = chain::trim_silence(interference);

        if enrollment.len() < self.min_enrollment {
            return BuildOutcome::Rejected(RejectReason::EnrollmentTooShort);
        }

        if self.vad {
            target = chain::vad_merge(&target);
            interference = chain::vad_merge(&interference);
        }

        let Some(target) = chain::fit_length(&target, self.len) else {
            return BuildOutcome::Rejected(RejectReason::TargetTooShort);
        };
        let Some(interference) = chain::fit_length(&interference, self.len) else {
            return BuildOutcome::Rejected(RejectReason::InterferenceTooShort);
        };

        let mixed = chain::mix(&target, &interference);
        let norm = chain::mix_norm_factor(&mixed);
        let target = chain::scale(&target, norm);
        let mixed = chain::scale(&mixed, norm);

        let target_mag = self.spectrogram.magnitude(&target);
        let mixed_mag = self.spectrogram.magnitude(&mixed);

        BuildOutcome::Built(BuiltSample {
            target,
            mixed,
            target_mag,
            mixed_mag,
        })
    }
}
