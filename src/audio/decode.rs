use anyhow::{Context, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer as PacketSamples;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::buffer::SampleBuffer;

/// Decode the first audio track of `path`, keeping every channel.
pub fn decode_audio(path: &Path) -> Result<SampleBuffer> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open audio file: {}", path.display()))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .context("Failed to probe audio format")?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .context("No audio tracks found")?;

    let track_id = track.id;
    let sample_rate = track.codec_params.sample_rate.context("Unknown sample rate")?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create audio decoder")?;

    // Sized from the first decoded packet.
    let mut channels: Vec<Vec<f32>> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(err)) => {
                log::debug!("Skipping undecodable packet: {}", err);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();

        let mut sample_buf = PacketSamples::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        push_interleaved(&mut channels, sample_buf.samples(), spec.channels.count());
    }

    let buffer = SampleBuffer::new(sample_rate, channels);
    log::info!(
        "Decoded {}: {} frames x {} ch, {}Hz, {:.1}s",
        path.display(),
        buffer.frames(),
        buffer.channel_count(),
        sample_rate,
        buffer.duration_secs()
    );

    Ok(buffer)
}

/// De-interleave one packet into `channels`, using the packet's own channel
/// count. Channels that appear late start with silence so all stay aligned.
fn push_interleaved(channels: &mut Vec<Vec<f32>>, samples: &[f32], packet_channels: usize) {
    let packet_channels = packet_channels.max(1);
    if channels.len() < packet_channels {
        let frames = channels.iter().map(Vec::len).max().unwrap_or(0);
        channels.resize(packet_channels, vec![0.0; frames]);
    }
    for frame in samples.chunks(packet_channels) {
        for (ch, &x) in channels.iter_mut().zip(frame) {
            ch.push(x);
        }
    }
}
