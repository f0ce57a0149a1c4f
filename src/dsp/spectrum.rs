//! Whole-signal static spectrum.
//!
//! Welch averaging: the mono mixdown is cut into overlapping frames, each
//! frame is Blackman–Harris windowed and transformed, and the per-bin power
//! is averaged across frames. The averaged magnitude is then log-compressed
//! into the same 0..=255 byte domain a live analyser reports, so both sources
//! can feed the peak picker interchangeably.

use serde::{Deserialize, Serialize};
use std::ops::Deref;

use super::fft::{blackman_harris, is_power_of_two, Radix2Fft};
use crate::audio::SampleBuffer;
use crate::error::{AnalysisError, AnalysisResult};

/// Default strength of the `log1p` display curve.
pub const DEFAULT_LOG_COMPRESSION: f64 = 20.0;

/// Byte magnitudes, bin `i` at `i * sample_rate / transform_size` Hz.
/// Length is always `transform_size / 2`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MagnitudeSpectrum {
    bins: Vec<u8>,
}

impl MagnitudeSpectrum {
    pub fn new(bins: Vec<u8>) -> Self {
        Self { bins }
    }

    pub fn zeros(len: usize) -> Self {
        Self { bins: vec![0; len] }
    }

    pub fn bins(&self) -> &[u8] {
        &self.bins
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.bins
    }
}

impl Deref for MagnitudeSpectrum {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bins
    }
}

impl From<Vec<u8>> for MagnitudeSpectrum {
    fn from(bins: Vec<u8>) -> Self {
        Self::new(bins)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SpectrumConfig {
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    /// `None` means a quarter of `fft_size`.
    #[serde(default)]
    pub hop_size: Option<usize>,
    #[serde(default = "default_log_compression")]
    pub log_compression: f64,
}

impl SpectrumConfig {
    pub fn hop_size(&self) -> usize {
        self.hop_size.unwrap_or(self.fft_size / 4)
    }
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            fft_size: default_fft_size(),
            hop_size: None,
            log_compression: default_log_compression(),
        }
    }
}

fn default_fft_size() -> usize { 16384 }
fn default_log_compression() -> f64 { DEFAULT_LOG_COMPRESSION }

/// Static spectrum of the whole buffer with the default display curve.
pub fn compute_static_spectrum(
    buffer: &SampleBuffer,
    fft_size: usize,
    hop_size: usize,
) -> AnalysisResult<MagnitudeSpectrum> {
    compute_static_spectrum_with(
        buffer,
        &SpectrumConfig {
            fft_size,
            hop_size: Some(hop_size),
            log_compression: DEFAULT_LOG_COMPRESSION,
        },
    )
}

pub fn compute_static_spectrum_with(
    buffer: &SampleBuffer,
    cfg: &SpectrumConfig,
) -> AnalysisResult<MagnitudeSpectrum> {
    let fft_size = cfg.fft_size;
    let hop_size = cfg.hop_size();
    if !is_power_of_two(fft_size) {
        return Err(AnalysisError::InvalidFftSize { size: fft_size });
    }
    if hop_size == 0 || hop_size > fft_size {
        return Err(AnalysisError::InvalidHopSize { hop_size, fft_size });
    }

    let mono = buffer.mix_to_mono();
    let Some(magnitudes) = welch_magnitudes(&mono, fft_size, hop_size)? else {
        log::debug!(
            "Signal of {} samples shorter than fft size {}, static spectrum is silent",
            mono.len(),
            fft_size
        );
        return Ok(MagnitudeSpectrum::zeros(fft_size / 2));
    };

    Ok(to_byte_bins(&magnitudes, cfg.log_compression))
}

/// Welch-averaged magnitude per positive-frequency bin, or `None` when not a
/// single full frame fits. The trailing partial frame is dropped.
fn welch_magnitudes(
    mono: &[f32],
    fft_size: usize,
    hop_size: usize,
) -> AnalysisResult<Option<Vec<f64>>> {
    let fft = Radix2Fft::new(fft_size)?;
    let window = blackman_harris(fft_size);
    let half = fft_size / 2;

    let mut acc_power = vec![0.0f64; half];
    let mut re = vec![0.0f32; fft_size];
    let mut im = vec![0.0f32; fft_size];
    let mut frames = 0usize;

    let mut start = 0;
    while start + fft_size <= mono.len() {
        let frame = &mono[start..start + fft_size];
        for ((r, i), (&x, &w)) in re.iter_mut().zip(im.iter_mut()).zip(frame.iter().zip(&window)) {
            *r = x * w;
            *i = 0.0;
        }

        fft.process(&mut re, &mut im)?;

        for (k, acc) in acc_power.iter_mut().enumerate() {
            let (r, i) = (re[k] as f64, im[k] as f64);
            *acc += r * r + i * i;
        }
        frames += 1;
        start += hop_size;
    }

    if frames == 0 {
        return Ok(None);
    }
    log::debug!("Welch average over {} frames (fft={}, hop={})", frames, fft_size, hop_size);

    let inv_frames = 1.0 / frames as f64;
    Ok(Some(acc_power.into_iter().map(|p| (p * inv_frames).sqrt()).collect()))
}

/// Map non-negative magnitudes to bytes with `log1p(c·m/peak) / log1p(c)`.
/// A compression of zero (or less) falls back to a linear `m/peak`.
fn to_byte_bins(magnitudes: &[f64], log_compression: f64) -> MagnitudeSpectrum {
    let peak = magnitudes.iter().copied().fold(0.0f64, f64::max);
    if peak <= 0.0 {
        return MagnitudeSpectrum::zeros(magnitudes.len());
    }

    let bins = magnitudes
        .iter()
        .map(|&m| {
            let rel = m / peak;
            let v = if log_compression > 0.0 {
                (log_compression * rel).ln_1p() / log_compression.ln_1p()
            } else {
                rel
            };
            (v * 255.0).round().clamp(0.0, 255.0) as u8
        })
        .collect();
    MagnitudeSpectrum::new(bins)
}
