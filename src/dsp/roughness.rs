//! Sethares / Plomp–Levelt sensory roughness.
//!
//! Two partials at `f1`, `f2` contribute
//!
//! ```text
//! x = |f1 - f2| / bw(min(f1, f2))
//! r = exp(-3.5 x) - exp(-5.75 x)
//! ```
//!
//! which is zero for unison, peaks near a quarter of the auditory bandwidth
//! and decays for wide separations. The bandwidth approximation is a strategy
//! so the power-law critical band and the Glasberg–Moore ERB share one kernel.

use serde::{Deserialize, Serialize};

use super::peaks::Peak;

const DECAY_A: f64 = 3.5;
const DECAY_B: f64 = 5.75;

/// Auditory bandwidth (Hz) around a frequency.
pub trait Bandwidth {
    fn bandwidth_hz(&self, min_frequency_hz: f64) -> f64;
}

impl<F> Bandwidth for F
where
    F: Fn(f64) -> f64,
{
    fn bandwidth_hz(&self, min_frequency_hz: f64) -> f64 {
        self(min_frequency_hz)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BandwidthModel {
    /// Sethares' empirical fit `1.72 · f^0.65`.
    #[default]
    CriticalBand,
    /// Glasberg–Moore equivalent rectangular bandwidth `24.7 · (4.37 f/1000 + 1)`.
    Erb,
}

impl Bandwidth for BandwidthModel {
    fn bandwidth_hz(&self, f: f64) -> f64 {
        match self {
            BandwidthModel::CriticalBand => 1.72 * f.powf(0.65),
            BandwidthModel::Erb => 24.7 * (4.37 * f / 1000.0 + 1.0),
        }
    }
}

/// Roughness between two pure partials with the critical-band fit.
pub fn roughness_kernel(f1: f64, f2: f64) -> f64 {
    roughness_kernel_with(&BandwidthModel::CriticalBand, f1, f2)
}

pub fn roughness_kernel_with<B: Bandwidth + ?Sized>(bandwidth: &B, f1: f64, f2: f64) -> f64 {
    if f1 == f2 {
        return 0.0;
    }
    let df = (f1 - f2).abs();
    let bw = bandwidth.bandwidth_hz(f1.min(f2));
    if !(bw > 0.0) {
        return 0.0;
    }
    let x = df / bw;
    (-DECAY_A * x).exp() - (-DECAY_B * x).exp()
}

/// Total amplitude-weighted roughness between every pair across two peak sets.
pub fn dissonance(peaks_a: &[Peak], peaks_b: &[Peak]) -> f64 {
    dissonance_with(&BandwidthModel::CriticalBand, peaks_a, peaks_b)
}

pub fn dissonance_with<B: Bandwidth + ?Sized>(
    bandwidth: &B,
    peaks_a: &[Peak],
    peaks_b: &[Peak],
) -> f64 {
    let mut total = 0.0;
    for p in peaks_a.iter().filter(|p| p.amplitude != 0.0) {
        for q in peaks_b.iter().filter(|q| q.amplitude != 0.0) {
            total += p.amplitude
                * q.amplitude
                * roughness_kernel_with(bandwidth, p.frequency_hz, q.frequency_hz);
        }
    }
    total
}
