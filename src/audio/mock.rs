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
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use tracing::{debug, info};

use super::AudioMixer;
use crate::config;

/// A mock device. Renders the mixer in real time and throws the audio away.
pub struct Device {
    name: String,
    mixer: Arc<AudioMixer>,
    stop: Arc<AtomicBool>,
    render_thread: Option<thread::JoinHandle<()>>,
}

impl Device {
    /// Starts a mock device that pulls `buffer_size` frames at a time, paced to the sample rate.
    pub fn start(name: &str, config: &config::Audio) -> Device {
        let mixer = Arc::new(AudioMixer::new(config.channels(), config.sample_rate()));
        let stop = Arc::new(AtomicBool::new(false));
        let block_frames = config.buffer_size();
        let block_duration =
            Duration::from_secs_f64(block_frames as f64 / config.sample_rate().max(1) as f64);

        let render_thread = {
            let mixer = mixer.clone();
            let stop = stop.clone();
            thread::spawn(move || {
                let mut block = vec![0.0f32; block_frames * mixer.num_channels() as usize];
                let started = Instant::now();
                let mut blocks: u32 = 0;
                while !stop.load(Ordering::Acquire) {
                    mixer.process_into_output(&mut block, block_frames);
                    blocks = blocks.wrapping_add(1);

                    // Sleep against the absolute deadline so pacing doesn't drift.
                    let deadline = started + block_duration * blocks;
                    let now = Instant::now();
                    if deadline > now {
                        spin_sleep::sleep(deadline - now);
                    }
                }
                debug!("Mock render thread stopped");
            })
        };

        info!(
            device = name,
            sample_rate = config.sample_rate(),
            channels = config.channels(),
            "Started mock device."
        );

        Device {
            name: name.to_string(),
            mixer,
            stop,
            render_thread: Some(render_thread),
        }
    }
}

impl super::Device for Device {
    fn mixer(&self) -> Arc<AudioMixer> {
        self.mixer.clone()
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.render_thread.take() {
            let _ = thread.join();
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}
