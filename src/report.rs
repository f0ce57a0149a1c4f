use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::dsp::curve::{CurveMinimum, DissonanceCurve};
use crate::dsp::peaks::PeakSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Static,
    Live,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub mode: Mode,
    pub tracks: Vec<TrackReport>,
    pub curve: Option<CurveReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub snapshots: Vec<LiveSnapshot>,
}

#[derive(Debug, Serialize)]
pub struct TrackReport {
    pub id: String,
    pub source: Option<String>,
    pub sample_rate: u32,
    pub duration_secs: f32,
    pub peaks: PeakSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CurveReport {
    pub track: String,
    pub curve: DissonanceCurve,
    pub minima: Vec<CurveMinimum>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TrackPeaks {
    pub id: String,
    pub peaks: PeakSet,
}

/// State of the live view at one curve recomputation.
#[derive(Clone, Debug, Serialize)]
pub struct LiveSnapshot {
    pub time_secs: f64,
    pub tracks: Vec<TrackPeaks>,
    pub curve: CurveReport,
}

/// Pretty JSON to `output`, or stdout when no path is given.
pub fn write_report(report: &Report, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write report: {}", path.display()))?;
            log::info!("Report written to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", json).context("Failed to write report to stdout")?;
        }
    }
    Ok(())
}
