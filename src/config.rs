use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::dsp::curve::CurveConfig;
use crate::dsp::live::LiveConfig;
use crate::dsp::spectrum::SpectrumConfig;

/// Peak picking parameters, passed explicitly into every analysis call.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AnalysisConfig {
    /// Candidates must exceed this fraction of the spectrum maximum.
    #[serde(default = "default_threshold_fraction")]
    pub threshold_fraction: f64,
    #[serde(default = "default_max_peaks")]
    pub max_peaks: usize,
    #[serde(default = "default_min_separation_hz")]
    pub min_separation_hz: f64,
    #[serde(default = "default_min_frequency_hz")]
    pub min_frequency_hz: f64,
    /// 0.5 is a square root; 1.0 keeps the linear byte ratio.
    #[serde(default = "default_amplitude_compress_exponent")]
    pub amplitude_compress_exponent: f64,
    #[serde(default = "default_cents_step")]
    pub cents_step: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            threshold_fraction: default_threshold_fraction(),
            max_peaks: default_max_peaks(),
            min_separation_hz: default_min_separation_hz(),
            min_frequency_hz: default_min_frequency_hz(),
            amplitude_compress_exponent: default_amplitude_compress_exponent(),
            cents_step: default_cents_step(),
        }
    }
}

fn default_threshold_fraction() -> f64 { 0.2 }
fn default_max_peaks() -> usize { 20 }
fn default_min_separation_hz() -> f64 { 30.0 }
fn default_min_frequency_hz() -> f64 { 60.0 }
fn default_amplitude_compress_exponent() -> f64 { 0.5 }
fn default_cents_step() -> f64 { 10.0 }

/// Contents of `timbrescope.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub spectrum: SpectrumConfig,
    #[serde(default)]
    pub curve: CurveConfig,
    #[serde(default)]
    pub live: LiveConfig,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Invalid config file: {}", path.display()))
}

pub fn parse_config(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

/// `./timbrescope.toml`, then `~/.config/timbrescope/config.toml`, then the
/// platform config directory.
pub fn discover_config_path() -> Option<PathBuf> {
    let local = PathBuf::from("timbrescope.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("timbrescope").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("timbrescope").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::roughness::BandwidthModel;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.analysis, AnalysisConfig::default());
        assert_eq!(cfg.spectrum, SpectrumConfig::default());
        assert_eq!(cfg.curve, CurveConfig::default());
        assert_eq!(cfg.live, LiveConfig::default());
    }

    #[test]
    fn defaults_match_explorer_controls() {
        let a = AnalysisConfig::default();
        assert_eq!(a.threshold_fraction, 0.2);
        assert_eq!(a.max_peaks, 20);
        assert_eq!(a.min_separation_hz, 30.0);
        assert_eq!(a.min_frequency_hz, 60.0);
        assert_eq!(a.amplitude_compress_exponent, 0.5);
        assert_eq!(a.cents_step, 10.0);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = parse_config(
            r#"
            [analysis]
            threshold_fraction = 0.35
            max_peaks = 8

            [spectrum]
            fft_size = 4096
            hop_size = 512

            [curve]
            bandwidth = "erb"
            normalize_curve = false

            [live]
            fps = 30.0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.analysis.threshold_fraction, 0.35);
        assert_eq!(cfg.analysis.max_peaks, 8);
        assert_eq!(cfg.analysis.min_separation_hz, 30.0);
        assert_eq!(cfg.spectrum.fft_size, 4096);
        assert_eq!(cfg.spectrum.hop_size(), 512);
        assert_eq!(cfg.curve.bandwidth, BandwidthModel::Erb);
        assert!(!cfg.curve.normalize_curve);
        assert_eq!(cfg.curve.max_peaks, 30);
        assert_eq!(cfg.live.fps, 30.0);
        assert_eq!(cfg.live.curve_rate_hz, 12.0);
    }

    #[test]
    fn curve_step_and_compression_come_from_analysis() {
        let cfg = parse_config(
            r#"
            [analysis]
            cents_step = 25.0

            [curve]
            cents_step = 50.0
            amp_compress = 2.0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.curve.cents_step, 10.0);
        assert_eq!(cfg.curve.amp_compress, 0.5);
        let curve = cfg.curve.clone().with_analysis(&cfg.analysis);
        assert_eq!(curve.cents_step, 25.0);
        assert_eq!(curve.amp_compress, 0.5);
    }

    #[test]
    fn rejects_unknown_bandwidth() {
        assert!(parse_config("[curve]\nbandwidth = \"bark\"\n").is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_config(Path::new("/nonexistent/timbrescope.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/timbrescope.toml"));
    }
}
