//! Byte spectrum snapshots in the manner of a real-time analyser node.
//!
//! The live view of the explorer reads a smoothed, dB-scaled byte spectrum
//! from the playing signal once per display frame. `LiveAnalyser` produces
//! the same snapshots from a decoded buffer at an arbitrary play position.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::Deserialize;
use std::f32::consts::PI;
use std::sync::Arc;

use super::fft::is_power_of_two;
use super::spectrum::MagnitudeSpectrum;
use crate::error::{AnalysisError, AnalysisResult};

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct LiveConfig {
    /// Simulated display refresh rate.
    #[serde(default = "default_fps")]
    pub fps: f64,
    /// How often the dissonance curve may be rebuilt.
    #[serde(default = "default_curve_rate_hz")]
    pub curve_rate_hz: f64,
    /// Time constant of the frame-to-frame magnitude smoothing, in [0, 1].
    #[serde(default)]
    pub smoothing: f32,
    #[serde(default = "default_min_decibels")]
    pub min_decibels: f32,
    #[serde(default = "default_max_decibels")]
    pub max_decibels: f32,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            curve_rate_hz: default_curve_rate_hz(),
            smoothing: 0.0,
            min_decibels: default_min_decibels(),
            max_decibels: default_max_decibels(),
        }
    }
}

fn default_fps() -> f64 { 60.0 }
fn default_curve_rate_hz() -> f64 { 12.0 }
fn default_min_decibels() -> f32 { -100.0 }
fn default_max_decibels() -> f32 { -30.0 }

pub struct LiveAnalyser {
    fft_size: usize,
    smoothing: f32,
    min_db: f32,
    max_db: f32,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl LiveAnalyser {
    pub fn new(fft_size: usize, cfg: &LiveConfig) -> AnalysisResult<Self> {
        if !is_power_of_two(fft_size) {
            return Err(AnalysisError::InvalidFftSize { size: fft_size });
        }
        if !(cfg.min_decibels < cfg.max_decibels) {
            return Err(AnalysisError::InvalidDecibelRange {
                min: cfg.min_decibels,
                max: cfg.max_decibels,
            });
        }

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);

        Ok(Self {
            fft_size,
            smoothing: cfg.smoothing.clamp(0.0, 1.0),
            min_db: cfg.min_decibels,
            max_db: cfg.max_decibels,
            window: blackman_window(fft_size),
            fft,
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            smoothed: vec![0.0; fft_size / 2],
        })
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Forget the smoothing history.
    pub fn reset(&mut self) {
        self.smoothed.iter_mut().for_each(|x| *x = 0.0);
    }

    /// Snapshot of the `fft_size` samples ending at `end` (exclusive). Samples
    /// before the start of the signal are silence.
    pub fn analyse_at(&mut self, mono: &[f32], end: usize) -> MagnitudeSpectrum {
        let end = end.min(mono.len());
        let start = end.saturating_sub(self.fft_size);
        let frame = &mono[start..end];
        let pad = self.fft_size - frame.len();

        for c in &mut self.buffer[..pad] {
            *c = Complex::new(0.0, 0.0);
        }
        for ((c, &x), &w) in self.buffer[pad..]
            .iter_mut()
            .zip(frame)
            .zip(&self.window[pad..])
        {
            *c = Complex::new(x * w, 0.0);
        }

        self.fft.process(&mut self.buffer);

        let scale = 1.0 / self.fft_size as f32;
        let tau = self.smoothing;
        let range = self.max_db - self.min_db;
        let bins = self
            .smoothed
            .iter_mut()
            .zip(&self.buffer)
            .map(|(s, c)| {
                *s = tau * *s + (1.0 - tau) * c.norm() * scale;
                if *s <= 0.0 {
                    return 0;
                }
                let db = 20.0 * s.log10();
                (255.0 * (db - self.min_db) / range).floor().clamp(0.0, 255.0) as u8
            })
            .collect();
        MagnitudeSpectrum::new(bins)
    }
}

/// Classic (periodic) Blackman window.
fn blackman_window(size: usize) -> Vec<f32> {
    let n = size as f32;
    (0..size)
        .map(|i| {
            let x = 2.0 * PI * i as f32 / n;
            0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| 0.5 * (2.0 * PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn rejects_bad_configuration() {
        assert!(matches!(
            LiveAnalyser::new(1000, &LiveConfig::default()),
            Err(AnalysisError::InvalidFftSize { size: 1000 })
        ));
        let cfg = LiveConfig {
            min_decibels: -30.0,
            max_decibels: -30.0,
            ..LiveConfig::default()
        };
        assert!(matches!(
            LiveAnalyser::new(1024, &cfg),
            Err(AnalysisError::InvalidDecibelRange { .. })
        ));
    }

    #[test]
    fn sine_shows_up_at_its_bin() {
        let sr = 8000.0;
        let mono = sine(1000.0, sr, 4096);
        let mut analyser = LiveAnalyser::new(1024, &LiveConfig::default()).unwrap();
        let spec = analyser.analyse_at(&mono, mono.len());
        assert_eq!(spec.len(), 512);

        let (bin, &peak) = spec.iter().enumerate().max_by_key(|&(_, &b)| b).unwrap();
        assert_eq!(peak, 255);
        assert!((bin as i64 - 128).abs() <= 2);
        assert!(spec[400] < peak);
    }

    #[test]
    fn silence_and_empty_history_are_zero() {
        let mut analyser = LiveAnalyser::new(512, &LiveConfig::default()).unwrap();
        let spec = analyser.analyse_at(&vec![0.0; 2048], 2048);
        assert!(spec.iter().all(|&b| b == 0));

        let mono = sine(440.0, 8000.0, 2048);
        let spec = analyser.analyse_at(&mono, 0);
        assert!(spec.iter().all(|&b| b == 0));
    }

    #[test]
    fn smoothing_carries_energy_forward() {
        let mono: Vec<f32> = sine(1000.0, 8000.0, 1024)
            .into_iter()
            .chain(std::iter::repeat(0.0).take(1024))
            .collect();

        let mut sharp = LiveAnalyser::new(1024, &LiveConfig::default()).unwrap();
        sharp.analyse_at(&mono, 1024);
        assert!(sharp.analyse_at(&mono, 2048).iter().all(|&b| b == 0));

        let smooth_cfg = LiveConfig {
            smoothing: 0.8,
            ..LiveConfig::default()
        };
        let mut smooth = LiveAnalyser::new(1024, &smooth_cfg).unwrap();
        smooth.analyse_at(&mono, 1024);
        assert!(smooth.analyse_at(&mono, 2048)[128] > 0);

        smooth.reset();
        assert!(smooth.analyse_at(&mono, 2048).iter().all(|&b| b == 0));
    }
}
