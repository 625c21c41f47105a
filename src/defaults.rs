//! Default configuration constants for voxmix.
//!
//! Shared constants used across configuration types and the signal chain,
//! kept in one place to ensure consistency.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech corpora and matches the LibriSpeech
/// recordings the generator was designed around.
pub const SAMPLE_RATE: u32 = 16000;

/// Default length of every generated sample in seconds.
///
/// Target and interference are cropped to exactly this duration so all
/// samples in the corpus are comparable.
pub const AUDIO_LEN_SECS: f64 = 3.0;

/// Silence threshold relative to the peak frame, in dB.
///
/// Frames whose RMS is more than 20 dB below the loudest frame are treated
/// as silence by both trimming and VAD merging.
pub const TOP_DB: f32 = 20.0;

/// Frame length in samples for the silence gate.
pub const TRIM_FRAME: usize = 512;

/// Headroom factor applied to the mixed signal's peak when normalizing.
///
/// The shared norm is `1.1 * max(|mixed|)`, leaving ~0.8 dB of headroom so
/// the written waveforms never clip.
pub const PEAK_HEADROOM: f32 = 1.1;

/// Safety factor on the minimum enrollment length.
///
/// The enrollment clip feeds a speaker-embedding window of `window * hop`
/// samples downstream; clips shorter than 1.1x that are rejected.
pub const ENROLLMENT_FLOOR: f64 = 1.1;

/// Default FFT window size for the magnitude spectrogram.
pub const SPECTRAL_WINDOW: usize = 400;

/// Default hop length in samples between spectrogram frames.
pub const SPECTRAL_HOP: usize = 160;

/// Default number of training samples to generate.
pub const TRAIN_SAMPLES: u64 = 100_000;

/// Default number of test samples to generate.
///
/// Disabled by default; enable by setting a count and a `test_prefix`.
pub const TEST_SAMPLES: u64 = 0;

/// Default retry attempts for remote fetch/put before escalating to fatal.
pub const RETRY_ATTEMPTS: u32 = 3;

/// Default base delay in milliseconds for exponential retry backoff.
pub const RETRY_BASE_MS: u64 = 500;

/// File-name suffix identifying usable utterances in the store listing.
pub const UTTERANCE_SUFFIX: &str = "-norm.wav";

/// Width of the zero-padded sample index in artifact filenames.
pub const INDEX_WIDTH: usize = 6;
