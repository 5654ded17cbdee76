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
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, span, Level};

use super::events::{EventSender, Notification, TrackEvent};
use super::track::SampleTrack;
use super::Context;
use crate::config::{CompositionEntry, Region, SampleRef};

/// Owns the tracks of one region and plays them against one shared start time.
pub struct TrackManager {
    region: Region,
    context: Context,
    tracks: Vec<SampleTrack>,
    /// Seconds per beat.
    beat_duration: f64,
    /// Clock time of beat zero of the current or last play.
    play_time: Option<f64>,
    /// Seconds between a play request and beat zero.
    play_offset: f64,
    /// Tracks that reported all of their samples decoded.
    loaded_tracks: usize,
    /// A play started that hasn't been reported as ended yet.
    ended_pending: bool,
    events_tx: EventSender,
    events_rx: mpsc::UnboundedReceiver<TrackEvent>,
}

impl TrackManager {
    pub fn new(region: Region, context: Context) -> TrackManager {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        TrackManager {
            beat_duration: 60.0 / region.composer_bpm(),
            play_offset: context.lookahead().as_secs_f64(),
            region,
            context,
            tracks: Vec::new(),
            play_time: None,
            loaded_tracks: 0,
            ended_pending: false,
            events_tx,
            events_rx,
        }
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn beat_duration(&self) -> f64 {
        self.beat_duration
    }

    pub fn play_time(&self) -> Option<f64> {
        self.play_time
    }

    pub fn tracks(&self) -> &[SampleTrack] {
        &self.tracks
    }

    pub fn track(&self, name: &str) -> Option<&SampleTrack> {
        self.tracks.iter().find(|track| track.name() == name)
    }

    pub fn track_mut(&mut self, name: &str) -> Option<&mut SampleTrack> {
        self.tracks.iter_mut().find(|track| track.name() == name)
    }

    pub fn loaded_tracks(&self) -> usize {
        self.loaded_tracks
    }

    /// Every track has all of its samples.
    pub fn is_ready(&self) -> bool {
        self.loaded_tracks == self.tracks.len()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.context.subscribe()
    }

    /// Creates a track and starts loading its samples. Must be called within a tokio runtime.
    pub fn create_track(
        &mut self,
        name: &str,
        sample_refs: Vec<SampleRef>,
        sample_composition: Vec<CompositionEntry>,
    ) -> &mut SampleTrack {
        let index = self.tracks.len();
        let track = SampleTrack::new(
            index,
            name,
            self.region.code(),
            sample_refs,
            sample_composition,
            &self.context,
            self.events_tx.clone(),
        );
        self.tracks.push(track);
        &mut self.tracks[index]
    }

    pub fn is_playing(&self) -> bool {
        self.tracks.iter().any(|track| track.is_playing())
    }

    /// Starts every track against one start time, a lookahead after the current clock time.
    pub fn play(&mut self) {
        if self.is_playing() {
            return;
        }

        let span = span!(Level::INFO, "play", region = self.region.code());
        let _enter = span.enter();

        let play_time = self.context.mixer().current_time() + self.play_offset;
        self.play_time = Some(play_time);
        for track in self.tracks.iter_mut() {
            track.play(play_time, self.beat_duration);
        }
        self.ended_pending = self.is_playing();

        info!(
            play_time,
            playing = self.tracks.iter().filter(|track| track.is_playing()).count(),
            tracks = self.tracks.len(),
            "Playing tracks."
        );
    }

    /// Stops every track. Reports the end of playback if this play hadn't ended yet.
    pub fn stop(&mut self) {
        if !self.is_playing() {
            return;
        }

        let span = span!(Level::INFO, "stop", region = self.region.code());
        let _enter = span.enter();

        for track in self.tracks.iter_mut() {
            track.stop();
        }
        info!("Stopped tracks.");
        self.on_track_ended();
    }

    /// Grid position of the playhead: elapsed beats times the beat size. Zero when stopped and
    /// during the lookahead.
    pub fn play_progress(&self) -> f64 {
        let Some(play_time) = self.play_time else {
            return 0.0;
        };
        if !self.is_playing() {
            return 0.0;
        }
        let elapsed = self.context.mixer().current_time() - play_time;
        (elapsed / self.beat_duration * self.context.beat_size()).max(0.0)
    }

    /// The longest track duration, once something has played.
    pub fn duration(&self) -> Option<f64> {
        self.tracks
            .iter()
            .filter_map(|track| track.duration())
            .reduce(f64::max)
    }

    /// Empties every track. Decoded samples are kept.
    pub fn clean_up(&mut self) {
        for track in self.tracks.iter_mut() {
            track.empty();
        }
    }

    /// Resets every track to its default arrangement.
    pub fn load_example(&mut self) {
        let span = span!(Level::INFO, "load example", region = self.region.code());
        let _enter = span.enter();

        for track in self.tracks.iter_mut() {
            track.load_example();
        }
        info!(
            placed = self
                .tracks
                .iter()
                .map(|track| track.placed_samples().len())
                .sum::<usize>(),
            "Loaded example composition."
        );
    }

    /// A track has all of its samples.
    pub fn on_track_loaded(&mut self) {
        self.loaded_tracks += 1;
        if self.loaded_tracks == self.tracks.len() {
            info!(
                region = self.region.code(),
                tracks = self.tracks.len(),
                "All tracks loaded."
            );
            self.context.notify(Notification::TracksLoaded);
        }
    }

    /// A track stopped sounding. Reports the end of playback once nothing is playing.
    pub fn on_track_ended(&mut self) {
        if self.ended_pending && !self.is_playing() {
            self.ended_pending = false;
            info!(region = self.region.code(), "All tracks ended.");
            self.context.notify(Notification::TracksEnded);
        }
    }

    /// Applies an event from a load task or the mixer.
    pub fn handle_event(&mut self, event: TrackEvent) {
        match event {
            TrackEvent::SampleLoaded {
                track,
                file,
                sample,
            } => {
                let loaded = self
                    .tracks
                    .get_mut(track)
                    .is_some_and(|track| track.store_sample(&file, sample));
                if loaded {
                    self.on_track_loaded();
                }
            }
            TrackEvent::SampleFailed { track, file, error } => {
                error!(
                    region = self.region.code(),
                    file = file.as_str(),
                    err = %error,
                    "Unable to load sample"
                );
                if let Some(track) = self.tracks.get_mut(track) {
                    track.record_failure(&file);
                }
            }
            TrackEvent::NothingToLoad { track } => {
                if track < self.tracks.len() {
                    self.on_track_loaded();
                }
            }
            TrackEvent::SourceEnded { track, pass } => {
                let ended = self
                    .tracks
                    .get_mut(track)
                    .is_some_and(|track| track.on_source_ended(pass));
                if ended {
                    self.on_track_ended();
                }
            }
        }
    }

    /// Applies every queued event without waiting. Returns how many were applied.
    pub fn process_pending(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
            processed += 1;
        }
        processed
    }

    /// Waits for the next event and applies it.
    pub async fn next_event(&mut self) {
        // The manager holds a sender, so the queue never closes.
        if let Some(event) = self.events_rx.recv().await {
            self.handle_event(event);
        }
    }

    /// Applies events until every load has either decoded or failed. Returns whether the manager
    /// is ready.
    pub async fn wait_until_loaded(&mut self) -> bool {
        // Empty tracks report through events queued at creation, so drain those first.
        self.process_pending();
        while !self.tracks.iter().all(|track| track.is_settled()) {
            self.next_event().await;
        }
        self.is_ready()
    }

    /// Applies events until playback has ended.
    pub async fn wait_until_ended(&mut self) {
        self.process_pending();
        while self.is_playing() {
            self.next_event().await;
        }
    }
}

impl std::fmt::Debug for TrackManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackManager")
            .field("region", &self.region.code())
            .field("beat_duration", &self.beat_duration)
            .field("tracks", &self.tracks)
            .field("loaded_tracks", &self.loaded_tracks)
            .field("play_time", &self.play_time)
            .finish()
    }
}
