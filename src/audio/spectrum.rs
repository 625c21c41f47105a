//! Magnitude spectrogram computation and the on-disk tensor format.

use crate::error::{MixError, Result};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::PI;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

const MAGIC: &[u8; 4] = b"VXMG";
const VERSION: u32 = 1;

/// A 2-D magnitude spectrum, `frames` rows of `bins` columns, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    pub frames: usize,
    pub bins: usize,
    pub data: Vec<f32>,
}

impl Spectrum {
    /// Write as a small binary tensor: magic, version, frames, bins, f32-LE data.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut file = fs::File::create(path)?;
        file.write_all(MAGIC)?;
        file.write_all(&VERSION.to_le_bytes())?;
        file.write_all(&(self.frames as u32).to_le_bytes())?;
        file.write_all(&(self.bins as u32).to_le_bytes())?;
        let mut bytes = Vec::with_capacity(self.data.len() * 4);
        for &v in &self.data {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        file.write_all(&bytes)?;
        Ok(())
    }

    /// Read a tensor written by [`Spectrum::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let mut file = fs::File::open(path)?;
        let mut header = [0u8; 16];
        file.read_exact(&mut header)?;

        if &header[0..4] != MAGIC {
            return Err(MixError::Other(format!(
                "{}: not a spectrum tensor file",
                path.display()
            )));
        }
        let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if version != VERSION {
            return Err(MixError::Other(format!(
                "{}: unsupported tensor version {version}",
                path.display()
            )));
        }
        let frames = u32::from_le_bytes([header[8], header[9], header[10], header[11]]) as usize;
        let bins = u32::from_le_bytes([header[12], header[13], header[14], header[15]]) as usize;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        if bytes.len() != frames * bins * 4 {
            return Err(MixError::Other(format!(
                "{}: tensor data truncated",
                path.display()
            )));
        }

        let data = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        Ok(Self { frames, bins, data })
    }
}

/// STFT magnitude extractor with a precomputed Hann window and FFT plan.
///
/// Deterministic and pure: the same signal and parameters always produce
/// the same spectrum.
pub struct Spectrogram {
    window: usize,
    hop: usize,
    hann: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
}

impl Spectrogram {
    pub fn new(window: usize, hop: usize) -> Self {
        let hann = (0..window)
            .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / window as f32).cos())
            .collect();
        let fft = FftPlanner::new().plan_fft_forward(window);
        Self {
            window,
            hop,
            hann,
            fft,
        }
    }

    /// Number of frequency bins per frame: `window / 2 + 1`.
    pub fn bins(&self) -> usize {
        self.window / 2 + 1
    }

    /// Compute the magnitude spectrum of a 1-D signal.
    ///
    /// The signal is zero-padded by `window / 2` on both sides so frames are
    /// centered, matching the usual STFT convention.
    pub fn magnitude(&self, signal: &[f32]) -> Spectrum {
        let pad = self.window / 2;
        let mut padded = vec![0.0f32; pad];
        padded.extend_from_slice(signal);
        padded.extend(std::iter::repeat_n(0.0f32, pad));

        let n_frames = if padded.len() < self.window {
            0
        } else {
            (padded.len() - self.window) / self.hop + 1
        };
        let bins = self.bins();
        let mut data = Vec::with_capacity(n_frames * bins);

        let mut buffer = vec![Complex::new(0.0f32, 0.0f32); self.window];
        for frame in 0..n_frames {
            let start = frame * self.hop;
            for (i, slot) in buffer.iter_mut().enumerate() {
                *slot = Complex::new(padded[start + i] * self.hann[i], 0.0);
            }
            self.fft.process(&mut buffer);
            data.extend(buffer.iter().take(bins).map(|c| c.norm()));
        }

        Spectrum {
            frames: n_frames,
            bins,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sine(len: usize, freq: f32, rate: f32) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / rate).sin())
            .collect()
    }

    #[test]
    fn magnitude_shape_matches_window_and_hop() {
        let spec = Spectrogram::new(400, 160);
        let signal = vec![0.1f32; 40000];

        let out = spec.magnitude(&signal);

        assert_eq!(out.bins, 201);
        // padded len 40400, frames = (40400 - 400) / 160 + 1
        assert_eq!(out.frames, 251);
        assert_eq!(out.data.len(), out.frames * out.bins);
    }

    #[test]
    fn magnitude_is_deterministic() {
        let spec = Spectrogram::new(400, 160);
        let signal = sine(16000, 440.0, 16000.0);

        let a = spec.magnitude(&signal);
        let b = spec.magnitude(&signal);

        assert_eq!(a, b);
    }

    #[test]
    fn sine_energy_concentrates_in_matching_bin() {
        let spec = Spectrogram::new(400, 160);
        // 1000 Hz at 16 kHz with a 400-point FFT -> bin 25 exactly
        let signal = sine(16000, 1000.0, 16000.0);

        let out = spec.magnitude(&signal);

        // Inspect an interior frame, away from the padded edges
        let frame = 50;
        let row = &out.data[frame * out.bins..(frame + 1) * out.bins];
        let peak_bin = row
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak_bin, 25);
    }

    #[test]
    fn silence_has_zero_magnitude() {
        let spec = Spectrogram::new(400, 160);
        let out = spec.magnitude(&vec![0.0f32; 8000]);
        assert!(out.data.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn empty_signal_yields_padded_frames_only() {
        let spec = Spectrogram::new(400, 160);
        let out = spec.magnitude(&[]);
        // 400 padded samples -> exactly one frame of zeros
        assert_eq!(out.frames, 1);
        assert!(out.data.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.mag");
        let spec = Spectrogram::new(64, 16);
        let original = spec.magnitude(&sine(2000, 440.0, 16000.0));

        original.save(&path).unwrap();
        let loaded = Spectrum::load(&path).unwrap();

        assert_eq!(loaded, original);
    }

    #[test]
    fn load_rejects_wrong_magic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.mag");
        fs::write(&path, b"NOPE\x01\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00").unwrap();

        assert!(matches!(Spectrum::load(&path), Err(MixError::Other(_))));
    }

    #[test]
    fn load_rejects_truncated_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short.mag");
        let spectrum = Spectrum {
            frames: 2,
            bins: 3,
            data: vec![0.0; 6],
        };
        spectrum.save(&path).unwrap();
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();

        assert!(matches!(Spectrum::load(&path), Err(MixError::Other(_))));
    }
}
