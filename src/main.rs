mod cli;

use anyhow::{bail, Result};
use clap::Parser;

use cli::Cli;
use timbrescope::audio::decode_audio;
use timbrescope::config::{self, Config};
use timbrescope::report::{write_report, Mode, Report, TrackReport};
use timbrescope::session;
use timbrescope::track::{track_id, Bus, Track};

const BUS_ID: &str = "BUS";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(config::discover_config_path);
    let mut cfg = match config_path {
        Some(ref path) => match config::load_config(path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            Err(err) => {
                log::warn!("Failed to load config: {:#}", err);
                Config::default()
            }
        },
        None => Config::default(),
    };
    cli.apply_to(&mut cfg);

    log::info!("timbrescope - spectral peaks and dissonance curves");
    log::info!(
        "Mode: {:?}, reference: {}, fft size: {}",
        cli.mode,
        cli.reference,
        cfg.spectrum.fft_size
    );

    log::info!("Decoding {} input(s)...", cli.inputs.len());
    let mut tracks = Vec::with_capacity(cli.inputs.len());
    let mut failed = Vec::new();
    for (index, path) in cli.inputs.iter().enumerate() {
        let id = track_id(index);
        match decode_audio(path) {
            Ok(buffer) => tracks.push(Track::new(id, buffer).with_source(path)),
            Err(err) => {
                log::warn!("Track {}: {:#}", id, err);
                failed.push(TrackReport {
                    id,
                    source: Some(path.display().to_string()),
                    sample_rate: 0,
                    duration_secs: 0.0,
                    peaks: Vec::new(),
                    error: Some(format!("{:#}", err)),
                });
            }
        }
    }
    if tracks.is_empty() {
        bail!("No input could be decoded");
    }

    if !cli.bus.is_empty() {
        let bus = Bus::new(BUS_ID, cli.bus.clone());
        match bus.render(&tracks) {
            Ok(Some(track)) => {
                log::info!("Bus {} mixed from {}", BUS_ID, cli.bus.join(", "));
                tracks.push(track);
            }
            Ok(None) => log::warn!("Bus {}: no member tracks loaded", BUS_ID),
            Err(err) => log::warn!("Bus {}: {}", BUS_ID, err),
        }
    }

    let mut report: Report = match Mode::from(cli.mode) {
        Mode::Static => session::run_static(&mut tracks, &cli.reference, &cfg),
        Mode::Live => session::run_live(&tracks, &cli.reference, &cfg)?,
    };
    report.tracks.extend(failed);

    if let Some(curve) = &report.curve {
        for m in &curve.minima {
            log::info!(
                "Curve minimum at {:.0} cents: {:.3} (depth {:.3})",
                m.cents,
                m.value,
                m.depth
            );
        }
    }

    write_report(&report, cli.output.as_deref())?;
    Ok(())
}
