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
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config;

pub mod cpal;
pub mod gain;
pub mod mixer;
pub mod mock;
mod thread_priority;

pub use gain::{GainControl, GainHandle};
pub use mixer::{ActiveSource, AudioMixer};

/// Global atomic counter for generating unique source IDs
static SOURCE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Returns a process-wide unique ID for a mixer source.
pub fn next_source_id() -> u64 {
    SOURCE_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Errors raised while opening or driving an output device.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("no audio device found with name {0}")]
    DeviceNotFound(String),

    #[error("{requested} channels requested, audio device {device} only has {available}")]
    NotEnoughChannels {
        device: String,
        requested: u16,
        available: u16,
    },

    #[error("unable to enumerate devices: {0}")]
    Devices(#[from] ::cpal::DevicesError),

    #[error("unable to read device name: {0}")]
    DeviceName(#[from] ::cpal::DeviceNameError),

    #[error("unable to build output stream: {0}")]
    BuildStream(#[from] ::cpal::BuildStreamError),

    #[error("unable to start output stream: {0}")]
    PlayStream(#[from] ::cpal::PlayStreamError),

    #[error("unsupported output sample format {0}")]
    UnsupportedFormat(String),

    #[error("output thread exited before the stream started")]
    OutputThread,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An output device renders an [`AudioMixer`] in real time. The mixer's sample counter is the
/// hardware clock every track schedules against.
pub trait Device: fmt::Display + Send + Sync {
    /// The mixer this device pulls audio from.
    fn mixer(&self) -> Arc<AudioMixer>;
}

/// Lists devices known to cpal.
pub fn list_devices() -> Result<Vec<cpal::Listing>, AudioError> {
    cpal::Device::list()
}

/// Opens the device named in the configuration. Names starting with "mock" open a mock device.
pub fn get_device(config: &config::Audio) -> Result<Arc<dyn Device>, AudioError> {
    let device = config.device();
    if device.starts_with("mock") {
        return Ok(Arc::new(mock::Device::start(device, config)));
    };

    Ok(Arc::new(cpal::Device::get(config)?))
}
