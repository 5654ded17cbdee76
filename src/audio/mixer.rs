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
// Core audio mixing logic shared by the cpal and mock devices. The mixer is also the audio
// clock: its sample counter only advances when a device pulls frames out of it.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::error;

use crate::audio::gain::GainHandle;
use crate::playsync::CancelHandle;
use crate::samples::DecodedSample;

/// Invoked once when a source stops producing audio, whether it ran out or was cancelled.
pub type EndCallback = Box<dyn FnOnce() + Send>;

/// A decoded sample scheduled to start at an absolute position on the mixer clock.
pub struct ActiveSource {
    /// Unique ID for this source
    pub id: u64,
    /// The decoded audio to play
    pub sample: Arc<DecodedSample>,
    /// Gain of the owning track, read once per block
    pub gain: GainHandle,
    /// The mixer sample at which the first frame is heard
    pub start_at_sample: u64,
    /// Cancel handle for this source
    pub cancel_handle: CancelHandle,
    /// Fires when the source is removed from the mixer
    pub on_ended: Option<EndCallback>,
    /// Frames of `sample` already mixed
    position: usize,
}

impl ActiveSource {
    /// Creates a new source without an end callback.
    pub fn new(
        id: u64,
        sample: Arc<DecodedSample>,
        gain: GainHandle,
        start_at_sample: u64,
        cancel_handle: CancelHandle,
    ) -> Self {
        Self {
            id,
            sample,
            gain,
            start_at_sample,
            cancel_handle,
            on_ended: None,
            position: 0,
        }
    }

    /// Attaches the end callback.
    pub fn with_end_callback(mut self, on_ended: EndCallback) -> Self {
        self.on_ended = Some(on_ended);
        self
    }

    /// Mixes as much of this source as falls into the block starting at `block_start`.
    /// Returns true once the source has nothing left to play.
    fn mix_into(&mut self, output: &mut [f32], num_channels: usize, block_start: u64) -> bool {
        let source_channels = self.sample.channel_count() as usize;
        let total_frames = self.sample.frame_count();
        if source_channels == 0 || self.position >= total_frames {
            return true;
        }

        let num_frames = output.len() / num_channels;
        let skip = self.start_at_sample.saturating_sub(block_start);
        if skip >= num_frames as u64 {
            return false;
        }

        let gain = self.gain.value();
        let data = self.sample.data();
        for frame in (skip as usize)..num_frames {
            if self.position >= total_frames {
                break;
            }
            let in_base = self.position * source_channels;
            let out_base = frame * num_channels;
            for channel in 0..num_channels {
                // Mono sources feed every output channel; wider sources wrap around.
                let source_channel = channel % source_channels;
                output[out_base + channel] += data[in_base + source_channel] * gain;
            }
            self.position += 1;
        }

        self.position >= total_frames
    }
}

/// Core audio mixing logic that's independent of any audio backend
pub struct AudioMixer {
    /// Sources currently scheduled or playing. Only the audio thread locks this.
    active_sources: Mutex<Vec<ActiveSource>>,
    /// New sources travel through this queue so the control thread never waits on the audio thread.
    source_tx: Sender<ActiveSource>,
    source_rx: Receiver<ActiveSource>,
    /// Frames rendered so far. This is the audio clock.
    current_sample: AtomicU64,
    /// Number of output channels
    num_channels: u16,
    /// Sample rate
    sample_rate: u32,
}

impl AudioMixer {
    /// Creates a new audio mixer
    pub fn new(num_channels: u16, sample_rate: u32) -> Self {
        let (source_tx, source_rx) = crossbeam_channel::unbounded();
        Self {
            active_sources: Mutex::new(Vec::new()),
            source_tx,
            source_rx,
            current_sample: AtomicU64::new(0),
            num_channels: num_channels.max(1),
            sample_rate,
        }
    }

    /// Queues a source. It is picked up at the start of the next block.
    pub fn add_source(&self, source: ActiveSource) {
        if let Err(e) = self.source_tx.send(source) {
            error!(error = %e, "Failed to queue source for the mixer");
        }
    }

    /// The current position of the audio clock, in samples.
    pub fn current_sample(&self) -> u64 {
        self.current_sample.load(Ordering::Acquire)
    }

    /// The current position of the audio clock, in seconds.
    pub fn current_time(&self) -> f64 {
        self.current_sample() as f64 / self.sample_rate as f64
    }

    /// Converts an absolute clock time in seconds to the sample it falls on.
    pub fn sample_at(&self, time: f64) -> u64 {
        (time.max(0.0) * self.sample_rate as f64).round() as u64
    }

    /// Number of sources either queued or being mixed.
    pub fn active_source_count(&self) -> usize {
        self.active_sources.lock().len() + self.source_rx.len()
    }

    /// Renders `num_frames` interleaved frames into `output` and advances the clock.
    pub fn process_into_output(&self, output: &mut [f32], num_frames: usize) {
        let num_channels = self.num_channels as usize;
        let len = (num_frames * num_channels).min(output.len());
        let output = &mut output[..len];
        output.fill(0.0);

        let block_start = self.current_sample();
        let mut ended: Vec<EndCallback> = Vec::new();
        {
            let mut sources = self.active_sources.lock();
            sources.extend(self.source_rx.try_iter());

            sources.retain_mut(|source| {
                let finished = source.cancel_handle.is_cancelled()
                    || source.mix_into(output, num_channels, block_start);
                if finished {
                    if let Some(on_ended) = source.on_ended.take() {
                        ended.push(on_ended);
                    }
                }
                !finished
            });
        }

        self.current_sample
            .fetch_add((len / num_channels) as u64, Ordering::AcqRel);

        // Callbacks run without the lock held so they may queue new sources.
        for on_ended in ended {
            on_ended();
        }
    }

    /// Processes multiple frames of audio mixing
    pub fn process_frames(&self, num_frames: usize) -> Vec<f32> {
        let mut frames = vec![0.0f32; num_frames * self.num_channels as usize];
        self.process_into_output(&mut frames, num_frames);
        frames
    }

    /// Gets the number of output channels
    pub fn num_channels(&self) -> u16 {
        self.num_channels
    }

    /// Gets the sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl std::fmt::Debug for AudioMixer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioMixer")
            .field("num_channels", &self.num_channels)
            .field("sample_rate", &self.sample_rate)
            .field("current_sample", &self.current_sample())
            .finish()
    }
}
