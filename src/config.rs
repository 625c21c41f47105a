use crate::defaults;
use crate::error::{MixError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub spectral: SpectralConfig,
    pub store: StoreConfig,
    pub generate: GenerateConfig,
    pub form: FormConfig,
}

/// Audio parameters shared by decode and the signal chain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub audio_len_secs: f64,
}

/// Spectral transform parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpectralConfig {
    /// FFT window size in samples
    pub window: usize,
    /// Hop length in samples between frames
    pub hop: usize,
}

/// Remote object store configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Root directory for the `fs` backend
    pub root: Option<String>,
    /// Base URL for the `http` backend
    pub endpoint: Option<String>,
    /// Key prefix for the training-split source corpus
    pub prefix: String,
    /// Key prefix for the test-split source corpus (disjoint from `prefix`)
    pub test_prefix: Option<String>,
    /// File-name suffix identifying usable utterances
    pub suffix: String,
    pub retry_attempts: u32,
    pub retry_base_ms: u64,
}

/// Store backend selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Fs,
    Http,
}

/// Generation run parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerateConfig {
    pub train_samples: u64,
    pub test_samples: u64,
    /// Worker pool size; 0 means available core count
    pub workers: usize,
    /// Apply VAD merging to target/interference before cropping
    pub vad: bool,
    /// Base RNG seed; random when absent
    pub seed: Option<u64>,
}

/// Artifact filename templates; `*` is replaced by the zero-padded index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FormConfig {
    pub target_wav: String,
    pub mixed_wav: String,
    pub target_mag: String,
    pub mixed_mag: String,
    pub dvec: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            audio_len_secs: defaults::AUDIO_LEN_SECS,
        }
    }
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            window: defaults::SPECTRAL_WINDOW,
            hop: defaults::SPECTRAL_HOP,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Fs,
            root: None,
            endpoint: None,
            prefix: "train-clean-100".to_string(),
            test_prefix: None,
            suffix: defaults::UTTERANCE_SUFFIX.to_string(),
            retry_attempts: defaults::RETRY_ATTEMPTS,
            retry_base_ms: defaults::RETRY_BASE_MS,
        }
    }
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            train_samples: defaults::TRAIN_SAMPLES,
            test_samples: defaults::TEST_SAMPLES,
            workers: 0,
            vad: false,
            seed: None,
        }
    }
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            target_wav: "*-target.wav".to_string(),
            mixed_wav: "*-mixed.wav".to_string(),
            target_mag: "*-target.mag".to_string(),
            mixed_mag: "*-mixed.mag".to_string(),
            dvec: "*-dvec.txt".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing fields use default values; missing file and invalid TOML
    /// are startup-fatal errors.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MixError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                MixError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - VOXMIX_ENDPOINT → store.endpoint
    /// - VOXMIX_SEED → generate.seed
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(endpoint) = std::env::var("VOXMIX_ENDPOINT")
            && !endpoint.is_empty()
        {
            self.store.endpoint = Some(endpoint);
        }

        if let Ok(seed) = std::env::var("VOXMIX_SEED")
            && let Ok(seed) = seed.parse::<u64>()
        {
            self.generate.seed = Some(seed);
        }

        self
    }

    /// Check invariants the rest of the pipeline relies on.
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(MixError::ConfigInvalidValue {
                key: "audio.sample_rate".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.audio.audio_len_secs <= 0.0 {
            return Err(MixError::ConfigInvalidValue {
                key: "audio.audio_len_secs".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.spectral.window == 0 || self.spectral.hop == 0 {
            return Err(MixError::ConfigInvalidValue {
                key: "spectral".to_string(),
                message: "window and hop must be positive".to_string(),
            });
        }
        for (key, template) in [
            ("form.target_wav", &self.form.target_wav),
            ("form.mixed_wav", &self.form.mixed_wav),
            ("form.target_mag", &self.form.target_mag),
            ("form.mixed_mag", &self.form.mixed_mag),
            ("form.dvec", &self.form.dvec),
        ] {
            if !template.contains('*') {
                return Err(MixError::ConfigInvalidValue {
                    key: key.to_string(),
                    message: "template must contain a '*' index placeholder".to_string(),
                });
            }
        }
        match self.store.backend {
            StoreBackend::Fs if self.store.root.is_none() => Err(MixError::ConfigInvalidValue {
                key: "store.root".to_string(),
                message: "required for the fs backend".to_string(),
            }),
            StoreBackend::Http if self.store.endpoint.is_none() => {
                Err(MixError::ConfigInvalidValue {
                    key: "store.endpoint".to_string(),
                    message: "required for the http backend".to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Crop length `L` in samples: `sample_rate * audio_len_secs`.
    pub fn crop_len(&self) -> usize {
        (self.audio.sample_rate as f64 * self.audio.audio_len_secs) as usize
    }

    /// Minimum enrollment length in samples: `1.1 * window * hop`.
    pub fn min_enrollment_len(&self) -> usize {
        (defaults::ENROLLMENT_FLOOR * (self.spectral.window * self.spectral.hop) as f64) as usize
    }
}
