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
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::audio::AudioMixer;
use crate::config::{self, ConfigError, Region, DEFAULT_BEAT_SIZE, DEFAULT_LOOKAHEAD};
use crate::samples::{FileAssetSource, SampleLoader, SymphoniaDecoder};

mod events;
mod manager;
mod track;

pub use events::{EventSender, Notification, TrackEvent};
pub use manager::TrackManager;
pub use track::{LiveSource, PlacedSample, SampleTrack, TrackError};

/// Buffered notifications per subscriber before slow subscribers start lagging.
const NOTIFICATION_CAPACITY: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum ComposerError {
    #[error("unknown region {0}")]
    UnknownRegion(String),
}

/// Handles shared by every manager and track: where samples come from, the clock they are
/// scheduled against, and where notifications go.
#[derive(Clone, Debug)]
pub struct Context {
    loader: SampleLoader,
    mixer: Arc<AudioMixer>,
    notifications: broadcast::Sender<Notification>,
    lookahead: Duration,
    beat_size: f64,
}

impl Context {
    pub fn new(loader: SampleLoader, mixer: Arc<AudioMixer>) -> Context {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Context {
            loader,
            mixer,
            notifications,
            lookahead: DEFAULT_LOOKAHEAD,
            beat_size: DEFAULT_BEAT_SIZE,
        }
    }

    pub fn with_lookahead(mut self, lookahead: Duration) -> Context {
        self.lookahead = lookahead;
        self
    }

    pub fn with_beat_size(mut self, beat_size: f64) -> Context {
        self.beat_size = beat_size;
        self
    }

    pub fn loader(&self) -> &SampleLoader {
        &self.loader
    }

    pub fn mixer(&self) -> &Arc<AudioMixer> {
        &self.mixer
    }

    pub fn lookahead(&self) -> Duration {
        self.lookahead
    }

    pub fn beat_size(&self) -> f64 {
        self.beat_size
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Broadcasts a notification. Having no subscribers is fine.
    pub(crate) fn notify(&self, notification: Notification) {
        match self.notifications.send(notification) {
            Ok(receivers) => debug!(%notification, receivers, "Notification sent"),
            Err(_) => debug!(%notification, "Notification sent with no subscribers"),
        }
    }
}

/// The registry of track managers, one per region code, created on first use.
pub struct Composer {
    regions: Vec<Region>,
    context: Context,
    managers: HashMap<String, TrackManager>,
}

impl Composer {
    pub fn new(regions: Vec<Region>, context: Context) -> Composer {
        Composer {
            regions,
            context,
            managers: HashMap::new(),
        }
    }

    /// Builds a composer that reads assets from disk, decodes them with symphonia, and schedules
    /// on the given mixer.
    pub fn from_config(
        config: &config::Composer,
        mixer: Arc<AudioMixer>,
    ) -> Result<Composer, ConfigError> {
        let assets = FileAssetSource::new(config.assets()).with_extension(config.extension());
        let decoder = SymphoniaDecoder::new().with_extension(config.extension());
        let loader = SampleLoader::new(Arc::new(assets), Arc::new(decoder), mixer.sample_rate());
        let context = Context::new(loader, mixer)
            .with_lookahead(config.lookahead()?)
            .with_beat_size(config.beat_size());

        Ok(Composer::new(config.regions().to_vec(), context))
    }

    /// Returns the manager for the region, creating it and its configured tracks on first use.
    /// Must be called within a tokio runtime.
    pub fn get(&mut self, code: &str) -> Result<&mut TrackManager, ComposerError> {
        let region = self
            .regions
            .iter()
            .find(|region| region.code() == code)
            .ok_or_else(|| ComposerError::UnknownRegion(code.to_string()))?;

        let context = &self.context;
        Ok(self.managers.entry(code.to_string()).or_insert_with(|| {
            info!(region = code, tracks = region.tracks().len(), "Creating track manager");
            let mut manager = TrackManager::new(region.clone(), context.clone());
            for definition in region.tracks() {
                manager.create_track(
                    definition.name(),
                    definition.samples().to_vec(),
                    definition.composition().to_vec(),
                );
            }
            manager
        }))
    }

    /// Drops the cached manager for the region, stopping its playback and aborting its loads.
    pub fn evict(&mut self, code: &str) -> bool {
        match self.managers.remove(code) {
            Some(mut manager) => {
                manager.stop();
                info!(region = code, "Evicted track manager");
                true
            }
            None => false,
        }
    }

    pub fn is_cached(&self, code: &str) -> bool {
        self.managers.contains_key(code)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.context.subscribe()
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn context(&self) -> &Context {
        &self.context
    }
}
