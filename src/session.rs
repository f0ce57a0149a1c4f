//! Analysis runs over a set of loaded tracks.
//!
//! The static run summarises each whole file once; the live run steps through
//! simulated playback at display rate, the way the explorer's draw loop does,
//! rebuilding the reference track's dissonance curve at a throttled rate.

use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::time::Duration;

use crate::config::Config;
use crate::dsp::curve::{build_dissonance_curve, CurveConfig};
use crate::dsp::live::LiveAnalyser;
use crate::dsp::peaks::{pick_peaks, PeakSet};
use crate::report::{CurveReport, LiveSnapshot, Mode, Report, TrackPeaks, TrackReport};
use crate::throttle::Throttled;
use crate::track::Track;

/// Minima listed per curve in reports.
const REPORTED_MINIMA: usize = 8;

fn curve_config(cfg: &Config) -> CurveConfig {
    cfg.curve.clone().with_analysis(&cfg.analysis)
}

fn curve_report(track: &str, peaks: &PeakSet, curve_cfg: &CurveConfig) -> CurveReport {
    let curve = build_dissonance_curve(peaks, curve_cfg);
    let minima = curve.local_minima(REPORTED_MINIMA);
    CurveReport {
        track: track.to_string(),
        curve,
        minima,
    }
}

fn track_report(track: &Track, peaks: PeakSet, error: Option<String>) -> TrackReport {
    TrackReport {
        id: track.id.clone(),
        source: track.source.as_ref().map(|p| p.display().to_string()),
        sample_rate: track.buffer.sample_rate,
        duration_secs: track.buffer.duration_secs(),
        peaks,
        error,
    }
}

/// Whole-file spectra and peaks for every track, plus the reference curve.
/// A track that fails is reported with its error and does not stop the others.
pub fn run_static(tracks: &mut [Track], reference: &str, cfg: &Config) -> Report {
    let reports: Vec<TrackReport> = tracks
        .par_iter_mut()
        .map(|track| match track.static_peaks(&cfg.spectrum, &cfg.analysis) {
            Ok(peaks) => {
                log::info!("Track {}: {} peaks", track.id, peaks.len());
                track_report(track, peaks, None)
            }
            Err(err) => {
                log::warn!("Track {}: analysis failed: {}", track.id, err);
                track_report(track, PeakSet::new(), Some(err.to_string()))
            }
        })
        .collect();

    let curve = match reports.iter().find(|r| r.id == reference) {
        Some(r) if r.error.is_none() => Some(curve_report(&r.id, &r.peaks, &curve_config(cfg))),
        Some(_) => None,
        None => {
            log::warn!("Reference track {} not loaded, no dissonance curve", reference);
            None
        }
    };

    Report {
        mode: Mode::Static,
        tracks: reports,
        curve,
        snapshots: Vec::new(),
    }
}

/// Simulated playback of all tracks from the start of the reference track to
/// its end.
pub fn run_live(tracks: &[Track], reference: &str, cfg: &Config) -> Result<Report> {
    let live = &cfg.live;
    if !(live.fps > 0.0 && live.fps.is_finite()) {
        bail!("Display rate must be positive, got {}", live.fps);
    }
    let Some(ref_index) = tracks.iter().position(|t| t.id == reference) else {
        bail!("Reference track {} not loaded", reference);
    };

    let fft_size = cfg.spectrum.fft_size;
    let mut analysers = tracks
        .iter()
        .map(|_| LiveAnalyser::new(fft_size, live))
        .collect::<Result<Vec<_>, _>>()?;
    let monos: Vec<Vec<f32>> = tracks.iter().map(|t| t.buffer.mix_to_mono()).collect();
    let mut latest: Vec<PeakSet> = vec![PeakSet::new(); tracks.len()];

    let duration = tracks[ref_index].buffer.duration_secs() as f64;
    let total_frames = (duration * live.fps).ceil() as usize;
    let curve_cfg = curve_config(cfg);
    let mut curve_cache: Throttled<CurveReport> = Throttled::from_rate_hz(live.curve_rate_hz);
    let mut snapshots = Vec::new();

    log::info!(
        "Live playback: {} frames at {:.0} fps, curve at {:.0} Hz",
        total_frames,
        live.fps,
        live.curve_rate_hz
    );

    let pb = ProgressBar::new(total_frames as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );

    for frame_idx in 0..total_frames {
        let time = frame_idx as f64 / live.fps;

        for (i, track) in tracks.iter().enumerate() {
            let sample_rate = track.buffer.sample_rate;
            let end = (time * sample_rate as f64) as usize;
            let spectrum = analysers[i].analyse_at(&monos[i], end);
            latest[i] = pick_peaks(&spectrum, sample_rate, fft_size, &cfg.analysis);
        }

        let ref_peaks = &latest[ref_index];
        let (curve, fresh) = curve_cache.get_or_update(Duration::from_secs_f64(time), || {
            curve_report(reference, ref_peaks, &curve_cfg)
        });
        if fresh {
            snapshots.push(LiveSnapshot {
                time_secs: time,
                tracks: tracks
                    .iter()
                    .zip(&latest)
                    .map(|(t, peaks)| TrackPeaks {
                        id: t.id.clone(),
                        peaks: peaks.clone(),
                    })
                    .collect(),
                curve: curve.clone(),
            });
        }
        pb.set_position(frame_idx as u64 + 1);
    }
    pb.finish_with_message("Playback complete");

    log::info!("Recorded {} curve snapshots", snapshots.len());

    Ok(Report {
        mode: Mode::Live,
        tracks: tracks
            .iter()
            .zip(latest)
            .map(|(t, peaks)| track_report(t, peaks, None))
            .collect(),
        curve: curve_cache.get().cloned(),
        snapshots,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SampleBuffer;
    use crate::dsp::spectrum::SpectrumConfig;

    fn partials(freqs: &[(f32, f32)], sample_rate: u32, len: usize) -> SampleBuffer {
        let samples = (0..len)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                freqs
                    .iter()
                    .map(|&(f, a)| a * (2.0 * std::f32::consts::PI * f * t).sin())
                    .sum()
            })
            .collect();
        SampleBuffer::mono(sample_rate, samples)
    }

    fn test_config() -> Config {
        Config {
            spectrum: SpectrumConfig {
                fft_size: 2048,
                hop_size: Some(512),
                ..SpectrumConfig::default()
            },
            ..Config::default()
        }
    }

    fn tracks() -> Vec<Track> {
        vec![
            Track::new("A", partials(&[(220.0, 0.5), (440.0, 0.3), (660.0, 0.2)], 8000, 16_000)),
            Track::new("B", partials(&[(330.0, 0.5)], 8000, 16_000)),
        ]
    }

    #[test]
    fn static_run_reports_every_track_and_the_curve() {
        let mut tracks = tracks();
        let report = run_static(&mut tracks, "A", &test_config());
        assert_eq!(report.mode, Mode::Static);
        assert_eq!(report.tracks.len(), 2);
        assert!(report.tracks.iter().all(|t| t.error.is_none()));
        assert!(report.tracks[0].peaks.len() >= 3);

        let curve = report.curve.unwrap();
        assert_eq!(curve.track, "A");
        assert_eq!(curve.curve.len(), 121);
        assert!(tracks.iter().all(|t| t.has_cached_spectrum()));
    }

    #[test]
    fn static_run_isolates_failures() {
        let mut tracks = tracks();
        let mut cfg = test_config();
        cfg.spectrum.hop_size = Some(0);
        let report = run_static(&mut tracks, "A", &cfg);
        assert!(report.tracks.iter().all(|t| t.error.is_some()));
        assert!(report.curve.is_none());
    }

    #[test]
    fn static_run_without_reference_has_no_curve() {
        let mut tracks = tracks();
        let report = run_static(&mut tracks, "Z", &test_config());
        assert!(report.curve.is_none());
        assert_eq!(report.tracks.len(), 2);
    }

    #[test]
    fn silent_track_gives_empty_peaks_and_curve() {
        let mut tracks = vec![Track::new("A", SampleBuffer::mono(8000, vec![0.0; 8000]))];
        let report = run_static(&mut tracks, "A", &test_config());
        assert!(report.tracks[0].peaks.is_empty());
        assert!(report.curve.unwrap().curve.is_empty());
    }

    #[test]
    fn live_run_throttles_curve_snapshots() {
        let tracks = tracks();
        let mut cfg = test_config();
        cfg.live.fps = 30.0;
        cfg.live.curve_rate_hz = 4.0;
        let report = run_live(&tracks, "A", &cfg).unwrap();

        // 60 frames over 2 s; a 0.25 s interval lands on every 8th frame.
        assert_eq!(report.mode, Mode::Live);
        assert_eq!(report.snapshots.len(), 8);
        for pair in report.snapshots.windows(2) {
            assert!(pair[1].time_secs - pair[0].time_secs >= 0.25);
        }
        let last = report.snapshots.last().unwrap();
        assert_eq!(last.tracks.len(), 2);
        assert!(!last.tracks[1].peaks.is_empty());
        assert!(report.curve.is_some());
    }

    #[test]
    fn live_run_rejects_missing_reference() {
        assert!(run_live(&tracks(), "Q", &test_config()).is_err());
    }
}
