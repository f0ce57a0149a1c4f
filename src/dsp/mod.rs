pub mod curve;
pub mod fft;
pub mod live;
pub mod peaks;
pub mod roughness;
pub mod spectrum;

pub use curve::{build_dissonance_curve, CurveConfig, DissonanceCurve};
pub use fft::{blackman_harris, fft_in_place, Radix2Fft};
pub use live::{LiveAnalyser, LiveConfig};
pub use peaks::{pick_peaks, Peak, PeakSet};
pub use roughness::{dissonance, roughness_kernel, BandwidthModel};
pub use spectrum::{compute_static_spectrum, MagnitudeSpectrum, SpectrumConfig};
