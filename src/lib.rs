//! Spectral peak extraction and Sethares dissonance curves for recorded sounds.

pub mod audio;
pub mod config;
pub mod dsp;
pub mod error;
pub mod report;
pub mod session;
pub mod throttle;
pub mod track;

pub use error::{AnalysisError, AnalysisResult};
