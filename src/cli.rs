use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use timbrescope::config::Config;
use timbrescope::dsp::BandwidthModel;
use timbrescope::report::Mode;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Whole-file spectra, one curve
    Static,
    /// Simulated playback with throttled curve updates
    Live,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Static => Mode::Static,
            ModeArg::Live => Mode::Live,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum BandwidthArg {
    CriticalBand,
    Erb,
}

impl From<BandwidthArg> for BandwidthModel {
    fn from(arg: BandwidthArg) -> Self {
        match arg {
            BandwidthArg::CriticalBand => BandwidthModel::CriticalBand,
            BandwidthArg::Erb => BandwidthModel::Erb,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "timbrescope",
    about = "Spectral peaks and Sethares dissonance curves for audio files"
)]
pub struct Cli {
    /// Input audio files (WAV, MP3, FLAC, OGG); tracks are named A, B, C, ...
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Analysis mode
    #[arg(long, value_enum, default_value_t = ModeArg::Static)]
    pub mode: ModeArg,

    /// Track whose peaks drive the dissonance curve
    #[arg(short, long, default_value = "A")]
    pub reference: String,

    /// Mix these tracks into a bus analysed as an extra track (comma-separated ids)
    #[arg(long, value_delimiter = ',')]
    pub bus: Vec<String>,

    /// Transform size (power of two)
    #[arg(long)]
    pub fft_size: Option<usize>,

    /// Hop between frames of the static estimate (default: fft size / 4)
    #[arg(long)]
    pub hop_size: Option<usize>,

    /// Peak threshold as a fraction of the spectrum maximum (0.0-1.0)
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Maximum number of peaks per spectrum
    #[arg(long)]
    pub max_peaks: Option<usize>,

    /// Minimum distance between peaks in Hz
    #[arg(long)]
    pub min_sep_hz: Option<f64>,

    /// Ignore peaks below this frequency
    #[arg(long)]
    pub min_freq_hz: Option<f64>,

    /// Peak amplitude exponent (0.5 = square root)
    #[arg(long)]
    pub amp_compress: Option<f64>,

    /// Curve resolution in cents
    #[arg(long)]
    pub cents_step: Option<f64>,

    /// Strongest peaks kept for the dissonance curve
    #[arg(long)]
    pub curve_max_peaks: Option<usize>,

    /// Bandwidth model of the roughness kernel
    #[arg(long, value_enum)]
    pub bandwidth: Option<BandwidthArg>,

    /// Keep raw dissonance values instead of normalizing the curve to [0, 1]
    #[arg(long)]
    pub raw: bool,

    /// Simulated display rate in live mode
    #[arg(long)]
    pub fps: Option<f64>,

    /// Maximum curve recomputations per second in live mode
    #[arg(long)]
    pub curve_rate: Option<f64>,

    /// Config file (default: ./timbrescope.toml or the user config directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the JSON report here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl Cli {
    /// Flags given on the command line win over the config file.
    pub fn apply_to(&self, cfg: &mut Config) {
        if let Some(v) = self.fft_size { cfg.spectrum.fft_size = v; }
        if let Some(v) = self.hop_size { cfg.spectrum.hop_size = Some(v); }
        if let Some(v) = self.threshold { cfg.analysis.threshold_fraction = v; }
        if let Some(v) = self.max_peaks { cfg.analysis.max_peaks = v; }
        if let Some(v) = self.min_sep_hz { cfg.analysis.min_separation_hz = v; }
        if let Some(v) = self.min_freq_hz { cfg.analysis.min_frequency_hz = v; }
        if let Some(v) = self.amp_compress { cfg.analysis.amplitude_compress_exponent = v; }
        if let Some(v) = self.cents_step { cfg.analysis.cents_step = v; }
        if let Some(v) = self.curve_max_peaks { cfg.curve.max_peaks = v; }
        if let Some(v) = self.bandwidth { cfg.curve.bandwidth = v.into(); }
        if self.raw { cfg.curve.normalize_curve = false; }
        if let Some(v) = self.fps { cfg.live.fps = v; }
        if let Some(v) = self.curve_rate { cfg.live.curve_rate_hz = v; }
    }
}
