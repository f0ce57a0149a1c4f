use std::path::{Path, PathBuf};

use crate::audio::{mix_buses, SampleBuffer};
use crate::config::AnalysisConfig;
use crate::dsp::peaks::{pick_peaks, PeakSet};
use crate::dsp::spectrum::{compute_static_spectrum_with, MagnitudeSpectrum, SpectrumConfig};
use crate::error::AnalysisResult;

/// `A`, `B`, ... for the first 26 inputs, `T27`, `T28`, ... after that.
pub fn track_id(index: usize) -> String {
    if index < 26 {
        char::from(b'A' + index as u8).to_string()
    } else {
        format!("T{}", index + 1)
    }
}

/// One loaded sound plus its lazily computed whole-file spectrum.
#[derive(Clone, Debug)]
pub struct Track {
    pub id: String,
    pub source: Option<PathBuf>,
    pub buffer: SampleBuffer,
    static_spectrum: Option<(SpectrumConfig, MagnitudeSpectrum)>,
}

impl Track {
    pub fn new(id: impl Into<String>, buffer: SampleBuffer) -> Self {
        Self {
            id: id.into(),
            source: None,
            buffer,
            static_spectrum: None,
        }
    }

    pub fn with_source(mut self, path: &Path) -> Self {
        self.source = Some(path.to_path_buf());
        self
    }

    /// Whole-file spectrum, computed once per spectrum configuration.
    pub fn static_spectrum(&mut self, cfg: &SpectrumConfig) -> AnalysisResult<&MagnitudeSpectrum> {
        let spectrum = match self.static_spectrum.take() {
            Some((cached_cfg, spectrum)) if cached_cfg == *cfg => spectrum,
            _ => {
                let spectrum = compute_static_spectrum_with(&self.buffer, cfg)?;
                log::info!(
                    "Track {}: static spectrum over {:.1}s (fft={}, hop={})",
                    self.id,
                    self.buffer.duration_secs(),
                    cfg.fft_size,
                    cfg.hop_size()
                );
                spectrum
            }
        };
        let (_, spectrum) = self.static_spectrum.insert((cfg.clone(), spectrum));
        Ok(&*spectrum)
    }

    pub fn static_peaks(
        &mut self,
        spectrum_cfg: &SpectrumConfig,
        analysis: &AnalysisConfig,
    ) -> AnalysisResult<PeakSet> {
        let sample_rate = self.buffer.sample_rate;
        let spectrum = self.static_spectrum(spectrum_cfg)?;
        Ok(pick_peaks(spectrum, sample_rate, spectrum_cfg.fft_size, analysis))
    }

    pub fn has_cached_spectrum(&self) -> bool {
        self.static_spectrum.is_some()
    }
}

/// A named group of tracks analysed as one mixed signal.
#[derive(Clone, Debug, PartialEq)]
pub struct Bus {
    pub id: String,
    pub members: Vec<String>,
}

impl Bus {
    pub fn new(id: impl Into<String>, members: Vec<String>) -> Self {
        Self {
            id: id.into(),
            members,
        }
    }

    /// Mix the member tracks found in `tracks` into a new track. Unknown
    /// member ids are skipped; `None` when no member is present.
    pub fn render(&self, tracks: &[Track]) -> AnalysisResult<Option<Track>> {
        let sources: Vec<&SampleBuffer> = tracks
            .iter()
            .filter(|t| self.members.contains(&t.id))
            .map(|t| &t.buffer)
            .collect();
        if sources.len() < self.members.len() {
            log::warn!(
                "Bus {}: {} of {} members loaded",
                self.id,
                sources.len(),
                self.members.len()
            );
        }
        Ok(mix_buses(&sources)?.map(|buffer| Track::new(self.id.clone(), buffer)))
    }
}
