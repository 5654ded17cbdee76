// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
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
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Arc,
    },
    thread,
    time::Duration,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info, span, Level};

use super::thread_priority::{configure_render_thread, render_thread_priority, rt_audio_enabled};
use super::{AudioError, AudioMixer};
use crate::config;

/// A cpal output device as seen while enumerating hosts.
pub struct Listing {
    /// The name of the device.
    name: String,
    /// The maximum number of channels the device supports.
    max_channels: u16,
    /// The host ID of the device.
    host_id: cpal::HostId,
}

impl Listing {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_channels(&self) -> u16 {
        self.max_channels
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.max_channels,
            self.host_id.name()
        )
    }
}

/// An open cpal output stream rendering the mixer.
pub struct Device {
    /// How the device was found.
    listing: Listing,
    /// The mixer the output callback pulls from.
    mixer: Arc<AudioMixer>,
    /// Tells the output thread to drop the stream.
    stop: Arc<AtomicBool>,
    /// The thread that owns the stream. cpal streams can't move between threads.
    output_thread: Option<thread::JoinHandle<()>>,
}

impl Device {
    /// Lists cpal output devices.
    pub fn list() -> Result<Vec<Listing>, AudioError> {
        Ok(Device::list_cpal_devices()?
            .into_iter()
            .map(|(_, listing)| listing)
            .collect())
    }

    fn list_cpal_devices() -> Result<Vec<(cpal::Device, Listing)>, AudioError> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices = Vec::new();
        for host_id in cpal::available_hosts() {
            let host = match cpal::host_from_id(host_id) {
                Ok(host) => host,
                Err(e) => {
                    error!(err = %e, host = host_id.name(), "Host unavailable");
                    continue;
                }
            };
            let host_devices = match host.devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                let Ok(output_configs) = device.supported_output_configs() else {
                    continue;
                };
                let max_channels = output_configs
                    .map(|output_config| output_config.channels())
                    .max()
                    .unwrap_or(0);

                if max_channels > 0 {
                    let listing = Listing {
                        name: device.name()?,
                        max_channels,
                        host_id,
                    };
                    devices.push((device, listing));
                }
            }
        }

        devices.sort_by(|(_, a), (_, b)| a.name.cmp(&b.name));
        Ok(devices)
    }

    /// Opens the named device and starts rendering a fresh mixer through it.
    pub fn get(config: &config::Audio) -> Result<Device, AudioError> {
        let span = span!(Level::INFO, "open device (cpal)");
        let _enter = span.enter();

        let name = config.device();
        let (device, listing) = Device::list_cpal_devices()?
            .into_iter()
            .find(|(_, listing)| listing.name.trim() == name)
            .ok_or_else(|| AudioError::DeviceNotFound(name.to_string()))?;

        let num_channels = config.channels();
        if listing.max_channels < num_channels {
            return Err(AudioError::NotEnoughChannels {
                device: listing.name.clone(),
                requested: num_channels,
                available: listing.max_channels,
            });
        }

        let mixer = Arc::new(AudioMixer::new(num_channels, config.sample_rate()));
        let stop = Arc::new(AtomicBool::new(false));
        let output_thread = start_output_thread(device, config, mixer.clone(), stop.clone())?;

        info!(
            device = listing.name,
            channels = num_channels,
            sample_rate = config.sample_rate(),
            "Opened output device."
        );

        Ok(Device {
            listing,
            mixer,
            stop,
            output_thread: Some(output_thread),
        })
    }
}

/// Builds and starts the stream on its own thread, then parks that thread until `stop` is set.
/// Returns once the stream is playing or failed to start.
fn start_output_thread(
    device: cpal::Device,
    config: &config::Audio,
    mixer: Arc<AudioMixer>,
    stop: Arc<AtomicBool>,
) -> Result<thread::JoinHandle<()>, AudioError> {
    let sample_format = device
        .default_output_config()
        .map(|default_config| default_config.sample_format())
        .unwrap_or(cpal::SampleFormat::F32);
    let stream_config = cpal::StreamConfig {
        channels: mixer.num_channels(),
        sample_rate: cpal::SampleRate(mixer.sample_rate()),
        buffer_size: cpal::BufferSize::Fixed(config.buffer_size() as u32),
    };

    let (ready_tx, ready_rx) = mpsc::channel::<Result<(), AudioError>>();
    let output_thread = thread::spawn(move || {
        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, mixer),
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, mixer),
            cpal::SampleFormat::I32 => build_stream::<i32>(&device, &stream_config, mixer),
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, mixer),
            other => Err(AudioError::UnsupportedFormat(format!("{:?}", other))),
        };
        let stream = match stream.and_then(|stream| {
            stream.play()?;
            Ok(stream)
        }) {
            Ok(stream) => stream,
            Err(e) => {
                let _ = ready_tx.send(Err(e));
                return;
            }
        };

        info!("CPAL output stream started successfully");
        let _ = ready_tx.send(Ok(()));

        // Keep the stream alive until the device is dropped.
        while !stop.load(Ordering::Acquire) {
            thread::sleep(Duration::from_millis(100));
        }
        drop(stream);
    });

    ready_rx.recv().map_err(|_| AudioError::OutputThread)??;
    Ok(output_thread)
}

/// Builds an output stream whose callback renders the mixer directly. Non-float devices get
/// converted through a scratch buffer that only grows.
fn build_stream<T>(
    device: &cpal::Device,
    stream_config: &cpal::StreamConfig,
    mixer: Arc<AudioMixer>,
) -> Result<cpal::Stream, AudioError>
where
    T: cpal::SizedSample + cpal::FromSample<f32> + Send + 'static,
{
    let num_channels = stream_config.channels as usize;
    let priority = render_thread_priority();
    let rt_audio = rt_audio_enabled();
    let mut priority_set = false;
    let mut scratch: Vec<f32> = Vec::new();

    let stream = device.build_output_stream(
        stream_config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            if !priority_set {
                configure_render_thread(priority, rt_audio);
                priority_set = true;
            }

            if scratch.len() < data.len() {
                scratch.resize(data.len(), 0.0);
            }
            let block = &mut scratch[..data.len()];
            mixer.process_into_output(block, data.len() / num_channels);
            for (dst, &src) in data.iter_mut().zip(block.iter()) {
                *dst = T::from_sample(src);
            }
        },
        |err| error!("CPAL output stream error: {}", err),
        None,
    )?;
    Ok(stream)
}

impl super::Device for Device {
    fn mixer(&self) -> Arc<AudioMixer> {
        self.mixer.clone()
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.output_thread.take() {
            let _ = thread.join();
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.listing, f)
    }
}
