// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
//! Sample loading for composer tracks.
//!
//! Samples are decoded entirely into memory when a track is created so that scheduling never
//! waits on IO.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use super::{AssetSource, SampleDecoder, SampleError};

/// A decoded sample, ready to be scheduled. Shared between sources through an Arc.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedSample {
    /// The sample data as f32 samples (interleaved if multi-channel).
    data: Vec<f32>,
    /// Number of channels in the sample.
    channel_count: u16,
    /// Sample rate of the audio data.
    sample_rate: u32,
}

impl DecodedSample {
    pub fn new(data: Vec<f32>, channel_count: u16, sample_rate: u32) -> DecodedSample {
        DecodedSample {
            data,
            channel_count,
            sample_rate,
        }
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Returns the number of channels.
    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames, i.e. samples per channel.
    pub fn frame_count(&self) -> usize {
        if self.channel_count == 0 {
            return 0;
        }
        self.data.len() / self.channel_count as usize
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frame_count() as f64 / self.sample_rate as f64)
    }

    /// Returns the memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }

    /// Resamples to `target_rate`. Returns the sample unchanged if it is already at that rate.
    pub fn transcode(self, target_rate: u32) -> DecodedSample {
        if self.sample_rate == target_rate || self.sample_rate == 0 || target_rate == 0 {
            return self;
        }

        debug!(
            source_rate = self.sample_rate,
            target_rate, "Transcoding sample"
        );
        let data = transcode_samples(&self.data, self.channel_count, self.sample_rate, target_rate);
        DecodedSample::new(data, self.channel_count, target_rate)
    }
}

/// Fetches and decodes samples for tracks. Cheap to clone; every load task holds its own copy.
#[derive(Clone)]
pub struct SampleLoader {
    assets: Arc<dyn AssetSource>,
    decoder: Arc<dyn SampleDecoder>,
    /// Target sample rate for transcoding (matches audio output).
    target_sample_rate: u32,
}

impl SampleLoader {
    pub fn new(
        assets: Arc<dyn AssetSource>,
        decoder: Arc<dyn SampleDecoder>,
        target_sample_rate: u32,
    ) -> SampleLoader {
        SampleLoader {
            assets,
            decoder,
            target_sample_rate,
        }
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    /// Fetches `{region}/{file}` once, then decodes and transcodes it on a blocking thread.
    pub async fn load(&self, region: &str, file: &str) -> Result<Arc<DecodedSample>, SampleError> {
        let bytes = self.assets.fetch(region, file).await?;
        let encoded_size = bytes.len();

        let decoder = self.decoder.clone();
        let target_sample_rate = self.target_sample_rate;
        let sample = tokio::task::spawn_blocking(move || {
            decoder
                .decode(bytes)
                .map(|sample| sample.transcode(target_sample_rate))
        })
        .await??;

        info!(
            region,
            file,
            encoded_kb = encoded_size / 1024,
            channels = sample.channel_count(),
            sample_rate = sample.sample_rate(),
            duration_ms = sample.duration().as_millis(),
            memory_kb = sample.memory_size() / 1024,
            "Sample loaded"
        );

        Ok(Arc::new(sample))
    }
}

impl std::fmt::Debug for SampleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleLoader")
            .field("target_sample_rate", &self.target_sample_rate)
            .finish()
    }
}

/// Transcodes samples from one sample rate to another using linear interpolation.
/// Good enough for one-shots and loops.
fn transcode_samples(
    samples: &[f32],
    channel_count: u16,
    source_rate: u32,
    target_rate: u32,
) -> Vec<f32> {
    let channels = channel_count.max(1) as usize;
    let ratio = target_rate as f64 / source_rate as f64;
    let source_frames = samples.len() / channels;
    let target_frames = (source_frames as f64 * ratio).ceil() as usize;

    let mut output = Vec::with_capacity(target_frames * channels);
    for target_frame in 0..target_frames {
        let source_pos = target_frame as f64 / ratio;
        let source_frame = source_pos.floor() as usize;
        let frac = source_pos.fract() as f32;

        for channel in 0..channels {
            let s0 = samples
                .get(source_frame * channels + channel)
                .copied()
                .unwrap_or(0.0);
            let s1 = samples
                .get((source_frame + 1) * channels + channel)
                .copied()
                .unwrap_or(s0);
            output.push(s0 + (s1 - s0) * frac);
        }
    }

    output
}
