//! Peak picking over a byte magnitude spectrum.
//!
//! Works the same for a live analyser snapshot and for a static spectrum: find
//! local maxima above a fraction of the spectrum maximum, then greedily keep
//! the strongest ones that are far enough apart.

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;

/// Lowest bin ever considered; bins 0 and 1 carry DC and near-DC leakage.
const FIRST_CANDIDATE_BIN: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub frequency_hz: f64,
    /// Compressed, normalized magnitude in [0, 1].
    pub amplitude: f64,
    pub bin_index: usize,
}

impl Peak {
    pub fn new(frequency_hz: f64, amplitude: f64) -> Self {
        Self {
            frequency_hz,
            amplitude,
            bin_index: 0,
        }
    }
}

/// Peaks in selection order (strongest first).
pub type PeakSet = Vec<Peak>;

/// Minimum spacing between accepted peaks, in bins (at least one).
pub fn min_separation_bins(min_separation_hz: f64, bin_hz: f64) -> usize {
    (min_separation_hz / bin_hz).round().max(1.0) as usize
}

fn min_candidate_bin(min_frequency_hz: f64, bin_hz: f64) -> usize {
    (min_frequency_hz / bin_hz)
        .round()
        .max(FIRST_CANDIDATE_BIN as f64) as usize
}

pub fn pick_peaks(
    spectrum: &[u8],
    sample_rate: u32,
    transform_size: usize,
    cfg: &AnalysisConfig,
) -> PeakSet {
    if spectrum.is_empty() || sample_rate == 0 || transform_size == 0 || cfg.max_peaks == 0 {
        return PeakSet::new();
    }

    let bin_hz = sample_rate as f64 / transform_size as f64;
    let max_magnitude = spectrum.iter().copied().max().unwrap_or(0);
    let threshold = cfg.threshold_fraction * max_magnitude as f64;
    let min_sep = min_separation_bins(cfg.min_separation_hz, bin_hz);
    let min_bin = min_candidate_bin(cfg.min_frequency_hz, bin_hz);

    // Strictly above the left neighbour, at least the right one: the left
    // edge of a flat plateau wins.
    let last = spectrum.len().saturating_sub(2);
    let mut candidates: Vec<(usize, u8)> = (min_bin..last)
        .filter_map(|i| {
            let mag = spectrum[i];
            let is_peak =
                mag > spectrum[i - 1] && mag >= spectrum[i + 1] && mag as f64 > threshold;
            is_peak.then_some((i, mag))
        })
        .collect();

    // Stable sort keeps ascending bin order among equal magnitudes.
    candidates.sort_by(|a, b| b.1.cmp(&a.1));

    let mut chosen: Vec<(usize, u8)> = Vec::with_capacity(cfg.max_peaks.min(candidates.len()));
    for (bin, mag) in candidates {
        if chosen.len() >= cfg.max_peaks {
            break;
        }
        if chosen.iter().any(|&(b, _)| b.abs_diff(bin) < min_sep) {
            continue;
        }
        chosen.push((bin, mag));
    }

    chosen
        .into_iter()
        .map(|(bin, mag)| Peak {
            frequency_hz: bin as f64 * bin_hz,
            amplitude: (mag as f64 / 255.0).powf(cfg.amplitude_compress_exponent),
            bin_index: bin,
        })
        .collect()
}
