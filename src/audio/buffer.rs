use crate::error::{AnalysisError, AnalysisResult};

/// Decoded multi-channel audio, channels stored de-interleaved.
#[derive(Clone, Debug, Default)]
pub struct SampleBuffer {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl SampleBuffer {
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self::new(sample_rate, vec![samples])
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Length in sample frames (the longest channel).
    pub fn frames(&self) -> usize {
        self.channels.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f32 / self.sample_rate as f32
    }

    /// Per-sample average of all channels. A channel shorter than the
    /// buffer contributes silence past its end.
    pub fn mix_to_mono(&self) -> Vec<f32> {
        match self.channels.as_slice() {
            [] => Vec::new(),
            [only] => only.clone(),
            channels => {
                let mut mono = vec![0.0f32; self.frames()];
                for ch in channels {
                    for (acc, &x) in mono.iter_mut().zip(ch) {
                        *acc += x;
                    }
                }
                let inv = 1.0 / channels.len() as f32;
                for x in &mut mono {
                    *x *= inv;
                }
                mono
            }
        }
    }
}

/// Render a group bus: every source is mixed to mono and summed into one
/// channel as long as the longest source. `None` when there is nothing to mix.
pub fn mix_buses(sources: &[&SampleBuffer]) -> AnalysisResult<Option<SampleBuffer>> {
    let Some(first) = sources.first() else {
        return Ok(None);
    };
    let sample_rate = first.sample_rate;
    if let Some(bad) = sources.iter().find(|s| s.sample_rate != sample_rate) {
        return Err(AnalysisError::SampleRateMismatch {
            expected: sample_rate,
            actual: bad.sample_rate,
        });
    }

    let len = sources.iter().map(|s| s.frames()).max().unwrap_or(0);
    let mut mix = vec![0.0f32; len];
    for source in sources {
        for (acc, x) in mix.iter_mut().zip(source.mix_to_mono()) {
            *acc += x;
        }
    }
    Ok(Some(SampleBuffer::mono(sample_rate, mix)))
}
