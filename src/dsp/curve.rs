//! Dissonance curve of a timbre against transposed copies of itself.
//!
//! For each interval on a cents grid the peak set is shifted by
//! `2^(cents/1200)` and the total roughness between the unshifted set and the
//! shifted copy is recorded. Local minima of the resulting curve are the
//! intervals that sound most consonant for that partial structure.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::peaks::Peak;
use super::roughness::{dissonance_with, BandwidthModel};
use crate::config::AnalysisConfig;

/// Slack on the upper sweep bound so accumulated step error keeps the endpoint.
const CENTS_EPSILON: f64 = 1e-9;

/// Upper bound on sweep points; finer steps are widened to fit.
pub const MAX_CURVE_POINTS: usize = 100_000;

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CurveConfig {
    #[serde(default)]
    pub cents_min: f64,
    #[serde(default = "default_cents_max")]
    pub cents_max: f64,
    /// Set from `[analysis]` through [`CurveConfig::with_analysis`].
    #[serde(skip_deserializing, default = "default_cents_step")]
    pub cents_step: f64,
    /// Strongest peaks kept before the quadratic sweep.
    #[serde(default = "default_max_peaks")]
    pub max_peaks: usize,
    #[serde(default = "default_normalize")]
    pub normalize_curve: bool,
    #[serde(skip_deserializing, default = "default_amp_compress")]
    pub amp_compress: f64,
    #[serde(default)]
    pub bandwidth: BandwidthModel,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            cents_min: 0.0,
            cents_max: default_cents_max(),
            cents_step: default_cents_step(),
            max_peaks: default_max_peaks(),
            normalize_curve: default_normalize(),
            amp_compress: default_amp_compress(),
            bandwidth: BandwidthModel::default(),
        }
    }
}

impl CurveConfig {
    /// Take the sweep step and amplitude compression from the analysis settings.
    pub fn with_analysis(mut self, analysis: &AnalysisConfig) -> Self {
        self.cents_step = analysis.cents_step;
        self.amp_compress = analysis.amplitude_compress_exponent;
        self
    }
}

fn default_cents_max() -> f64 { 1200.0 }
fn default_cents_step() -> f64 { 10.0 }
fn default_max_peaks() -> usize { 30 }
fn default_normalize() -> bool { true }
fn default_amp_compress() -> f64 { 0.5 }

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DissonanceCurve {
    pub cents: Vec<f64>,
    pub values: Vec<f64>,
    pub raw_min: f64,
    pub raw_max: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CurveMinimum {
    pub cents: f64,
    pub value: f64,
    /// Height of the surrounding shoulders above the valley floor.
    pub depth: f64,
}

impl DissonanceCurve {
    pub fn len(&self) -> usize {
        self.cents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cents.is_empty()
    }

    /// Interior local minima, lowest value first (deeper valley on ties),
    /// at most `top_k` of them.
    pub fn local_minima(&self, top_k: usize) -> Vec<CurveMinimum> {
        let xs = &self.values;
        let n = xs.len();
        if n < 3 {
            return Vec::new();
        }

        let mut mins: Vec<CurveMinimum> = (1..n - 1)
            .filter_map(|i| {
                let (l, m, r) = (xs[i - 1], xs[i], xs[i + 1]);
                if m <= l && m <= r && (m < l || m < r) {
                    let shoulder = 0.5 * (climb(xs, i, Direction::Left) + climb(xs, i, Direction::Right));
                    Some(CurveMinimum {
                        cents: self.cents[i],
                        value: m,
                        depth: (shoulder - m).max(0.0),
                    })
                } else {
                    None
                }
            })
            .collect();

        mins.sort_by(|a, b| {
            a.value
                .partial_cmp(&b.value)
                .unwrap_or(Ordering::Equal)
                .then(b.depth.partial_cmp(&a.depth).unwrap_or(Ordering::Equal))
        });
        mins.truncate(top_k);
        mins
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Left,
    Right,
}

/// Highest value reached walking uphill from `idx` in one direction.
fn climb(xs: &[f64], idx: usize, dir: Direction) -> f64 {
    let mut best = xs[idx];
    let mut i = idx;
    loop {
        let next = match dir {
            Direction::Left if i > 0 => i - 1,
            Direction::Right if i + 1 < xs.len() => i + 1,
            _ => break,
        };
        if xs[next] > best {
            best = xs[next];
            i = next;
        } else {
            break;
        }
    }
    best
}

pub fn build_dissonance_curve(peaks: &[Peak], cfg: &CurveConfig) -> DissonanceCurve {
    let base = prepare_peaks(peaks, cfg.max_peaks, cfg.amp_compress);
    if base.is_empty() {
        return DissonanceCurve::default();
    }
    let cents = cents_grid(cfg.cents_min, cfg.cents_max, cfg.cents_step);
    if cents.is_empty() {
        return DissonanceCurve::default();
    }

    let mut values = Vec::with_capacity(cents.len());
    let mut raw_min = f64::INFINITY;
    let mut raw_max = f64::NEG_INFINITY;
    let mut shifted = base.clone();

    for &c in &cents {
        let ratio = (c / 1200.0).exp2();
        for (s, p) in shifted.iter_mut().zip(&base) {
            s.frequency_hz = p.frequency_hz * ratio;
        }
        let d = dissonance_with(&cfg.bandwidth, &base, &shifted);
        raw_min = raw_min.min(d);
        raw_max = raw_max.max(d);
        values.push(d);
    }

    if cfg.normalize_curve {
        if raw_max > raw_min {
            let inv = 1.0 / (raw_max - raw_min);
            for v in &mut values {
                *v = (*v - raw_min) * inv;
            }
        } else {
            values.iter_mut().for_each(|v| *v = 0.0);
            raw_min = 0.0;
            raw_max = 0.0;
        }
    }

    DissonanceCurve {
        cents,
        values,
        raw_min,
        raw_max,
    }
}

/// Drop unusable peaks, keep the `max_peaks` loudest and rescale their
/// amplitudes to `(a / a_max)^amp_compress`.
fn prepare_peaks(peaks: &[Peak], max_peaks: usize, amp_compress: f64) -> Vec<Peak> {
    let mut kept: Vec<Peak> = peaks
        .iter()
        .filter(|p| {
            p.frequency_hz.is_finite()
                && p.amplitude.is_finite()
                && p.frequency_hz > 0.0
                && p.amplitude > 0.0
        })
        .copied()
        .collect();
    kept.sort_by(|a, b| b.amplitude.total_cmp(&a.amplitude));
    kept.truncate(max_peaks);

    let a_max = kept.iter().map(|p| p.amplitude).fold(0.0f64, f64::max);
    let a_max = if a_max > 0.0 { a_max } else { 1.0 };
    for p in &mut kept {
        p.amplitude = (p.amplitude / a_max).powf(amp_compress);
    }
    kept
}

fn cents_grid(min: f64, max: f64, step: f64) -> Vec<f64> {
    if !(min.is_finite() && max.is_finite()) || min > max + CENTS_EPSILON {
        return Vec::new();
    }
    // A step too small to move `min` behaves like a zero step.
    if !(step > 0.0 && step.is_finite()) || min + step <= min {
        return vec![min];
    }
    let span = (max - min).max(0.0);
    let step = step.max(span / (MAX_CURVE_POINTS - 1) as f64);

    let points = ((span / step) as usize + 1).min(MAX_CURVE_POINTS);
    let mut grid = Vec::with_capacity(points);
    let mut c = min;
    while c <= max + CENTS_EPSILON && grid.len() < MAX_CURVE_POINTS {
        grid.push(c);
        c += step;
    }
    grid
}
