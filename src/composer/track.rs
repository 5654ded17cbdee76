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

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::events::{EventSender, TrackEvent};
use super::Context;
use crate::audio::{next_source_id, ActiveSource, AudioMixer, GainControl};
use crate::config::{CompositionEntry, SampleRef};
use crate::playsync::CancelHandle;
use crate::samples::DecodedSample;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TrackError {
    #[error("no sample {file} placed at beat {pos}")]
    SampleNotFound { file: String, pos: f64 },

    #[error("sample {0} has not been loaded")]
    SampleNotLoaded(String),
}

/// A sample reference bound to a position on the track timeline, in beats.
#[derive(Clone, Debug)]
pub struct PlacedSample {
    sample: SampleRef,
    pos: f64,
    /// Bound once the file has decoded.
    buffer: Option<Arc<DecodedSample>>,
}

impl PlacedSample {
    /// Creates an unbound placement. Negative positions are clamped to the start of the timeline.
    pub fn new(sample: SampleRef, pos: f64) -> PlacedSample {
        PlacedSample {
            sample,
            pos: pos.max(0.0),
            buffer: None,
        }
    }

    pub fn sample(&self) -> &SampleRef {
        &self.sample
    }

    pub fn pos(&self) -> f64 {
        self.pos
    }

    pub fn is_bound(&self) -> bool {
        self.buffer.is_some()
    }
}

/// Placements are equal when they reference the same sample at the same position, whether or
/// not their buffers are bound.
impl PartialEq for PlacedSample {
    fn eq(&self, other: &Self) -> bool {
        self.sample == other.sample && self.pos == other.pos
    }
}

/// A source handed to the mixer by one playback pass.
#[derive(Debug)]
pub struct LiveSource {
    pos: f64,
    beats: f64,
    source_id: u64,
    /// Absolute clock time the source starts at, in seconds.
    start_time: f64,
    cancel_handle: CancelHandle,
}

impl LiveSource {
    pub fn pos(&self) -> f64 {
        self.pos
    }

    pub fn beats(&self) -> f64 {
        self.beats
    }

    pub fn source_id(&self) -> u64 {
        self.source_id
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }
}

fn ends_later(a: &PlacedSample, b: &PlacedSample) -> bool {
    a.pos > b.pos || (a.pos == b.pos && a.sample.beats() > b.sample.beats())
}

/// Picks the placement that drives the end of a pass: greatest position, then longest, then
/// earliest inserted.
fn last_placement<'a, I>(placements: I) -> Option<usize>
where
    I: IntoIterator<Item = &'a PlacedSample>,
{
    let mut last: Option<(usize, &PlacedSample)> = None;
    for (index, placed) in placements.into_iter().enumerate() {
        if last.is_none_or(|(_, current)| ends_later(placed, current)) {
            last = Some((index, placed));
        }
    }
    last.map(|(index, _)| index)
}

/// One track: its sample library, its timeline and its gain.
pub struct SampleTrack {
    /// Position in the owning manager. Events are addressed by it.
    index: usize,
    name: String,
    region: String,
    sample_refs: Vec<SampleRef>,
    sample_composition: Vec<CompositionEntry>,
    /// Distinct files of `sample_refs`, in first-seen order.
    distinct_files: Vec<String>,
    /// Decoded cache, keyed by file.
    samples: HashMap<String, Arc<DecodedSample>>,
    failed_files: Vec<String>,
    placed: Vec<PlacedSample>,
    live_sources: Vec<LiveSource>,
    /// Index into `live_sources` of the source that ends the pass.
    last_source: Option<usize>,
    playing: bool,
    /// Incremented on every play so stale end events can be told apart.
    pass: u64,
    gain: GainControl,
    /// Beat duration of the last pass.
    beat_duration: f64,
    mixer: Arc<AudioMixer>,
    events: EventSender,
    /// Outstanding loads. Dropping the track aborts them.
    loads: JoinSet<()>,
}

impl SampleTrack {
    /// Creates the track and starts one load per distinct sample file. Must be called within a
    /// tokio runtime.
    pub fn new(
        index: usize,
        name: &str,
        region: &str,
        sample_refs: Vec<SampleRef>,
        sample_composition: Vec<CompositionEntry>,
        context: &Context,
        events: EventSender,
    ) -> SampleTrack {
        let mut distinct_files: Vec<String> = Vec::new();
        for sample_ref in &sample_refs {
            if !distinct_files.iter().any(|file| file == sample_ref.file()) {
                distinct_files.push(sample_ref.file().to_string());
            }
        }

        let mut loads = JoinSet::new();
        for file in &distinct_files {
            let loader = context.loader().clone();
            let events = events.clone();
            let region = region.to_string();
            let file = file.clone();
            loads.spawn(async move {
                let event = match loader.load(&region, &file).await {
                    Ok(sample) => TrackEvent::SampleLoaded {
                        track: index,
                        file,
                        sample,
                    },
                    Err(error) => TrackEvent::SampleFailed {
                        track: index,
                        file,
                        error,
                    },
                };
                // The manager may be gone already.
                let _ = events.send(event);
            });
        }
        if distinct_files.is_empty() {
            let _ = events.send(TrackEvent::NothingToLoad { track: index });
        }

        info!(
            track = name,
            region,
            files = distinct_files.len(),
            "Loading track samples"
        );

        SampleTrack {
            index,
            name: name.to_string(),
            region: region.to_string(),
            sample_refs,
            sample_composition,
            distinct_files,
            samples: HashMap::new(),
            failed_files: Vec::new(),
            placed: Vec::new(),
            live_sources: Vec::new(),
            last_source: None,
            playing: false,
            pass: 0,
            gain: GainControl::new(),
            beat_duration: 0.0,
            mixer: context.mixer().clone(),
            events,
            loads,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sample_refs(&self) -> &[SampleRef] {
        &self.sample_refs
    }

    pub fn sample_composition(&self) -> &[CompositionEntry] {
        &self.sample_composition
    }

    pub fn distinct_files(&self) -> &[String] {
        &self.distinct_files
    }

    pub fn placed_samples(&self) -> &[PlacedSample] {
        &self.placed
    }

    pub fn live_sources(&self) -> &[LiveSource] {
        &self.live_sources
    }

    /// Number of distinct files decoded so far.
    pub fn loaded_count(&self) -> usize {
        self.samples.len()
    }

    pub fn is_loaded(&self) -> bool {
        self.samples.len() == self.distinct_files.len()
    }

    /// Every load has either decoded or failed.
    pub fn is_settled(&self) -> bool {
        self.samples.len() + self.failed_files.len() == self.distinct_files.len()
    }

    pub fn failed_files(&self) -> &[String] {
        &self.failed_files
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Stores a decoded file and binds it to placements waiting for it. Returns true exactly once:
    /// when the last distinct file arrives.
    pub fn store_sample(&mut self, file: &str, sample: Arc<DecodedSample>) -> bool {
        if !self.distinct_files.iter().any(|f| f == file) {
            warn!(track = self.name, file, "Ignoring sample the track never requested");
            return false;
        }
        if self.samples.contains_key(file) {
            debug!(track = self.name, file, "Ignoring duplicate sample");
            return false;
        }

        for placed in self
            .placed
            .iter_mut()
            .filter(|placed| placed.buffer.is_none() && placed.sample.file() == file)
        {
            placed.buffer = Some(sample.clone());
        }
        self.samples.insert(file.to_string(), sample);

        self.is_loaded()
    }

    /// Records a load that failed. The track will never report loaded.
    pub fn record_failure(&mut self, file: &str) {
        if !self.samples.contains_key(file) && !self.failed_files.iter().any(|f| f == file) {
            self.failed_files.push(file.to_string());
        }
    }

    /// Places a sample on the timeline and returns its length in beats.
    pub fn add_sample(&mut self, sample: SampleRef, pos: f64) -> f64 {
        let beats = sample.beats();
        let mut placed = PlacedSample::new(sample, pos);
        placed.buffer = self.samples.get(placed.sample.file()).cloned();
        self.placed.push(placed);
        beats
    }

    /// Removes the first placement equal to `entry`.
    pub fn remove_sample(&mut self, entry: &PlacedSample) -> Result<PlacedSample, TrackError> {
        let index = self
            .placed
            .iter()
            .position(|placed| placed == entry)
            .ok_or_else(|| TrackError::SampleNotFound {
                file: entry.sample.file().to_string(),
                pos: entry.pos,
            })?;
        Ok(self.placed.remove(index))
    }

    /// Moves the first placement of `file` at `pos` to `new_pos`.
    pub fn move_sample(&mut self, file: &str, pos: f64, new_pos: f64) -> Result<(), TrackError> {
        let placed = self
            .placed
            .iter_mut()
            .find(|placed| placed.sample.file() == file && placed.pos == pos)
            .ok_or_else(|| TrackError::SampleNotFound {
                file: file.to_string(),
                pos,
            })?;
        placed.pos = new_pos.max(0.0);
        Ok(())
    }

    /// Clears the timeline. Decoded samples are kept.
    pub fn empty(&mut self) {
        self.placed.clear();
    }

    /// Replaces the timeline with the default arrangement. Entries that don't resolve against
    /// the sample references are skipped.
    pub fn load_example(&mut self) {
        self.empty();
        let entries = self.sample_composition.clone();
        for entry in &entries {
            match entry.resolve(&self.sample_refs) {
                Some(sample_ref) => {
                    self.add_sample(sample_ref.clone(), entry.pos());
                }
                None => warn!(
                    track = self.name,
                    file = entry.file(),
                    color = entry.color(),
                    "Composition entry does not match any sample, skipping"
                ),
            }
        }
    }

    /// Schedules every bound placement at `start_time + pos * beat_duration`. Does nothing while
    /// playing or when there is nothing to play.
    pub fn play(&mut self, start_time: f64, beat_duration: f64) {
        if self.playing {
            return;
        }

        let playable: Vec<&PlacedSample> =
            self.placed.iter().filter(|placed| placed.is_bound()).collect();
        if playable.len() < self.placed.len() {
            warn!(
                track = self.name,
                skipped = self.placed.len() - playable.len(),
                "Skipping placements whose samples have not loaded"
            );
        }
        let Some(last) = last_placement(playable.iter().copied()) else {
            return;
        };

        self.pass += 1;
        self.beat_duration = beat_duration;
        let mut live_sources = Vec::with_capacity(playable.len());
        for (index, placed) in playable.iter().enumerate() {
            let Some(buffer) = &placed.buffer else {
                continue;
            };
            let time = start_time + placed.pos * beat_duration;
            let cancel_handle = CancelHandle::new();
            let source_id = next_source_id();
            let mut source = ActiveSource::new(
                source_id,
                buffer.clone(),
                self.gain.handle(),
                self.mixer.sample_at(time),
                cancel_handle.clone(),
            );
            if index == last {
                let events = self.events.clone();
                let track = self.index;
                let pass = self.pass;
                source = source.with_end_callback(Box::new(move || {
                    let _ = events.send(TrackEvent::SourceEnded { track, pass });
                }));
            }
            self.mixer.add_source(source);

            live_sources.push(LiveSource {
                pos: placed.pos,
                beats: placed.sample.beats(),
                source_id,
                start_time: time,
                cancel_handle,
            });
        }

        debug!(
            track = self.name,
            pass = self.pass,
            sources = live_sources.len(),
            "Scheduled track"
        );
        self.live_sources = live_sources;
        self.last_source = Some(last);
        self.playing = true;
    }

    /// Lands the end callback of a pass. Returns true if it ended the current pass.
    pub fn on_source_ended(&mut self, pass: u64) -> bool {
        if pass != self.pass || !self.playing {
            debug!(track = self.name, pass, current = self.pass, "Ignoring stale end event");
            return false;
        }
        self.playing = false;
        true
    }

    /// Silences every source of the current pass immediately.
    pub fn stop(&mut self) {
        if !self.playing {
            return;
        }
        for live_source in &self.live_sources {
            live_source.cancel_handle.cancel();
        }
        self.playing = false;
    }

    /// Returns whether the track is muted after toggling.
    pub fn toggle_mute(&mut self) -> bool {
        self.gain.toggle_mute()
    }

    pub fn is_mute(&self) -> bool {
        self.gain.is_mute()
    }

    /// Sets the unmuted level. The mute state is left alone.
    pub fn set_volume(&mut self, level: f32) {
        self.gain.set_level(level);
    }

    pub fn volume(&self) -> f32 {
        self.gain.level()
    }

    /// Seconds from the start of the last pass until its last source ends.
    pub fn duration(&self) -> Option<f64> {
        let last = self.live_sources.get(self.last_source?)?;
        Some((last.pos + last.beats) * self.beat_duration)
    }

    /// Plays a decoded sample right away through the track gain, outside the timeline.
    pub fn sound_sample(&self, file: &str) -> Result<CancelHandle, TrackError> {
        let sample = self
            .samples
            .get(file)
            .ok_or_else(|| TrackError::SampleNotLoaded(file.to_string()))?;

        let cancel_handle = CancelHandle::new();
        self.mixer.add_source(ActiveSource::new(
            next_source_id(),
            sample.clone(),
            self.gain.handle(),
            self.mixer.current_sample(),
            cancel_handle.clone(),
        ));
        debug!(track = self.name, file, "Sounding sample");
        Ok(cancel_handle)
    }
}

impl Drop for SampleTrack {
    fn drop(&mut self) {
        for live_source in &self.live_sources {
            live_source.cancel_handle.cancel();
        }
        self.loads.abort_all();
    }
}

impl std::fmt::Debug for SampleTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleTrack")
            .field("name", &self.name)
            .field("region", &self.region)
            .field("loaded", &self.samples.len())
            .field("distinct_files", &self.distinct_files.len())
            .field("placed", &self.placed.len())
            .field("playing", &self.playing)
            .field("pass", &self.pass)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    use super::*;
    use crate::samples::SampleLoader;
    use crate::testutil::{FakeDecoder, MemoryAssetSource};

    const SAMPLE_RATE: u32 = 100;

    fn context() -> Context {
        // No assets: every load fails, samples are stored by hand.
        let loader = SampleLoader::new(
            Arc::new(MemoryAssetSource::new()),
            Arc::new(FakeDecoder::new(SAMPLE_RATE)),
            SAMPLE_RATE,
        );
        Context::new(loader, Arc::new(AudioMixer::new(1, SAMPLE_RATE)))
            .with_lookahead(Duration::ZERO)
    }

    fn decoded(frames: usize, level: f32) -> Arc<DecodedSample> {
        Arc::new(DecodedSample::new(vec![level; frames], 1, SAMPLE_RATE))
    }

    fn new_track(
        context: &Context,
        refs: Vec<SampleRef>,
    ) -> (SampleTrack, UnboundedReceiver<TrackEvent>) {
        let (events, rx) = unbounded_channel();
        let track = SampleTrack::new(0, "test", "andes", refs, vec![], context, events);
        (track, rx)
    }

    fn kick() -> SampleRef {
        SampleRef::new("kick", 1.0)
    }

    #[tokio::test]
    async fn test_distinct_files() {
        let context = context();
        let (track, _rx) = new_track(
            &context,
            vec![
                SampleRef::new("kick", 1.0),
                SampleRef::new("bell", 2.0).with_color("red"),
                SampleRef::new("kick", 2.0),
                SampleRef::new("bell", 4.0).with_color("blue"),
            ],
        );
        assert_eq!(track.distinct_files(), &["kick".to_string(), "bell".to_string()]);
    }

    #[tokio::test]
    async fn test_store_sample_reports_loaded_once() {
        let context = context();
        let (mut track, _rx) = new_track(
            &context,
            vec![kick(), SampleRef::new("snare", 1.0), SampleRef::new("kick", 2.0)],
        );

        assert!(!track.store_sample("kick", decoded(10, 0.5)));
        assert!(!track.store_sample("kick", decoded(10, 0.5)));
        assert!(!track.store_sample("hat", decoded(10, 0.5)));
        assert_eq!(track.loaded_count(), 1);
        assert!(track.store_sample("snare", decoded(10, 0.5)));
        assert!(!track.store_sample("snare", decoded(10, 0.5)));
        assert!(track.is_loaded());
        assert!(track.loaded_count() <= track.distinct_files().len());
    }

    #[tokio::test]
    async fn test_add_sample_returns_beats_and_clamps() {
        let context = context();
        let (mut track, _rx) = new_track(&context, vec![kick()]);

        assert_eq!(track.add_sample(SampleRef::new("kick", 1.5), -3.0), 1.5);
        assert_eq!(track.placed_samples()[0].pos(), 0.0);
    }

    #[tokio::test]
    async fn test_move_kick_to_eight() {
        let context = context();
        let (mut track, _rx) = new_track(&context, vec![kick()]);

        track.add_sample(kick(), 0.0);
        track.move_sample("kick", 0.0, 8.0).unwrap();

        assert_eq!(track.placed_samples().len(), 1);
        assert_eq!(track.placed_samples()[0].pos(), 8.0);
    }

    #[tokio::test]
    async fn test_move_and_remove_missing() {
        let context = context();
        let (mut track, _rx) = new_track(&context, vec![kick()]);
        track.add_sample(kick(), 1.0);

        assert_eq!(
            track.move_sample("kick", 0.0, 8.0),
            Err(TrackError::SampleNotFound {
                file: "kick".to_string(),
                pos: 0.0
            })
        );
        assert!(track.remove_sample(&PlacedSample::new(kick(), 2.0)).is_err());
        assert_eq!(track.placed_samples().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_first_equal_entry() {
        let context = context();
        let (mut track, _rx) = new_track(&context, vec![kick()]);
        track.add_sample(kick(), 1.0);
        track.add_sample(kick(), 1.0);
        track.add_sample(SampleRef::new("kick", 2.0), 1.0);

        let removed = track.remove_sample(&PlacedSample::new(kick(), 1.0)).unwrap();
        assert_eq!(removed.sample().beats(), 1.0);
        assert_eq!(track.placed_samples().len(), 2);

        track.empty();
        assert!(track.placed_samples().is_empty());
    }

    #[tokio::test]
    async fn test_load_example_skips_unresolved() {
        let context = context();
        let (events, _rx) = unbounded_channel();
        let mut track = SampleTrack::new(
            0,
            "test",
            "andes",
            vec![kick(), SampleRef::new("bell", 2.0).with_color("red")],
            vec![
                CompositionEntry::new("kick", 0.0),
                CompositionEntry::new("snare", 1.0),
                CompositionEntry::new("bell", 2.0).with_color("red"),
                CompositionEntry::new("bell", 3.0).with_color("blue"),
            ],
            &context,
            events,
        );
        track.add_sample(kick(), 7.0);

        track.load_example();

        let placed: Vec<(&str, f64)> = track
            .placed_samples()
            .iter()
            .map(|p| (p.sample().file(), p.pos()))
            .collect();
        assert_eq!(placed, vec![("kick", 0.0), ("bell", 2.0)]);
    }

    #[tokio::test]
    async fn test_play_without_placements_is_noop() {
        let context = context();
        let (mut track, _rx) = new_track(&context, vec![kick()]);
        track.store_sample("kick", decoded(10, 0.5));

        track.play(0.0, 0.5);

        assert!(!track.is_playing());
        assert_eq!(track.duration(), None);
        assert_eq!(context.mixer().active_source_count(), 0);
    }

    #[tokio::test]
    async fn test_duration_at_120_bpm() {
        let context = context();
        let (mut track, _rx) = new_track(&context, vec![SampleRef::new("kick", 2.0)]);
        track.store_sample("kick", decoded(10, 0.5));
        track.add_sample(SampleRef::new("kick", 2.0), 4.0);
        assert_eq!(track.duration(), None);

        track.play(0.0, 0.5);

        assert_eq!(track.duration(), Some(3.0));
    }

    #[tokio::test]
    async fn test_late_decode_binds_placement() {
        let context = context();
        let (mut track, _rx) = new_track(&context, vec![kick()]);
        track.add_sample(kick(), 0.0);
        assert!(!track.placed_samples()[0].is_bound());

        track.play(0.0, 0.5);
        assert!(!track.is_playing());

        track.store_sample("kick", decoded(10, 0.5));
        assert!(track.placed_samples()[0].is_bound());
        track.play(0.0, 0.5);
        assert!(track.is_playing());
        assert_eq!(context.mixer().active_source_count(), 1);
    }

    #[tokio::test]
    async fn test_play_is_idempotent() {
        let context = context();
        let (mut track, _rx) = new_track(&context, vec![kick()]);
        track.store_sample("kick", decoded(10, 0.5));
        track.add_sample(kick(), 0.0);
        track.add_sample(kick(), 1.0);

        track.play(0.0, 0.5);
        track.play(0.0, 0.5);

        assert_eq!(track.live_sources().len(), 2);
        assert_eq!(context.mixer().active_source_count(), 2);
    }

    #[tokio::test]
    async fn test_sources_scheduled_on_beats() {
        let context = context();
        let (mut track, _rx) = new_track(&context, vec![kick()]);
        track.store_sample("kick", decoded(5, 0.5));
        track.add_sample(kick(), 0.0);
        track.add_sample(kick(), 1.0);

        track.play(0.25, 0.5);

        let starts: Vec<f64> = track.live_sources().iter().map(|s| s.start_time()).collect();
        assert_eq!(starts, vec![0.25, 0.75]);

        // 100 Hz: the first kick covers samples 25..30, the second 75..80.
        let output = context.mixer().process_frames(85);
        assert_eq!(&output[23..32], &[0.0, 0.0, 0.5, 0.5, 0.5, 0.5, 0.5, 0.0, 0.0]);
        assert_eq!(&output[73..82], &[0.0, 0.0, 0.5, 0.5, 0.5, 0.5, 0.5, 0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_end_event_from_last_source_only() {
        let context = context();
        let (mut track, mut rx) = new_track(&context, vec![kick()]);
        while rx.try_recv().is_ok() {}
        track.store_sample("kick", decoded(5, 0.5));
        track.add_sample(kick(), 1.0);
        track.add_sample(kick(), 0.0);

        track.play(0.0, 0.5);
        context.mixer().process_frames(100);

        let mut ended = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let TrackEvent::SourceEnded { track: index, pass } = event {
                ended.push((index, pass));
            }
        }
        assert_eq!(ended, vec![(0, 1)]);
        assert!(track.on_source_ended(1));
        assert!(!track.is_playing());
    }

    #[tokio::test]
    async fn test_stale_end_event_ignored() {
        let context = context();
        let (mut track, _rx) = new_track(&context, vec![kick()]);
        track.store_sample("kick", decoded(50, 0.5));
        track.add_sample(kick(), 0.0);

        track.play(0.0, 0.5);
        track.stop();
        track.play(0.0, 0.5);

        assert!(!track.on_source_ended(1));
        assert!(track.is_playing());
        assert!(track.on_source_ended(2));
    }

    #[tokio::test]
    async fn test_stop_then_play_does_not_overlap() {
        let context = context();
        let mixer = context.mixer().clone();
        let (mut track, _rx) = new_track(&context, vec![kick()]);
        track.store_sample("kick", decoded(1000, 0.5));
        track.add_sample(kick(), 0.0);

        track.play(mixer.current_time(), 0.5);
        assert!(mixer.process_frames(10).iter().all(|s| *s == 0.5));

        track.stop();
        track.play(mixer.current_time(), 0.5);
        assert!(mixer.process_frames(10).iter().all(|s| *s == 0.5));
        assert_eq!(mixer.active_source_count(), 1);
    }

    #[tokio::test]
    async fn test_stop_when_not_playing_is_noop() {
        let context = context();
        let (mut track, _rx) = new_track(&context, vec![kick()]);
        track.stop();
        assert!(!track.is_playing());
    }

    #[tokio::test]
    async fn test_toggle_mute_is_own_inverse() {
        let context = context();
        let mixer = context.mixer().clone();
        let (mut track, _rx) = new_track(&context, vec![kick()]);
        track.store_sample("kick", decoded(1000, 0.5));
        track.add_sample(kick(), 0.0);
        track.play(0.0, 0.5);

        assert!(track.toggle_mute());
        assert!(track.is_mute());
        assert!(mixer.process_frames(5).iter().all(|s| *s == 0.0));

        assert!(!track.toggle_mute());
        assert!(!track.is_mute());
        assert!(mixer.process_frames(5).iter().all(|s| *s == 0.5));
    }

    #[tokio::test]
    async fn test_set_volume_keeps_mute() {
        let context = context();
        let (mut track, _rx) = new_track(&context, vec![kick()]);
        track.toggle_mute();
        track.set_volume(0.5);

        assert!(track.is_mute());
        assert_eq!(track.volume(), 0.5);
        track.toggle_mute();
        assert_eq!(track.volume(), 0.5);
    }

    #[tokio::test]
    async fn test_sound_sample() {
        let context = context();
        let mixer = context.mixer().clone();
        let (mut track, _rx) = new_track(&context, vec![kick()]);

        assert_eq!(
            track.sound_sample("kick").unwrap_err(),
            TrackError::SampleNotLoaded("kick".to_string())
        );

        track.store_sample("kick", decoded(3, 0.5));
        track.sound_sample("kick").unwrap();
        assert_eq!(mixer.process_frames(4), vec![0.5, 0.5, 0.5, 0.0]);
        assert!(!track.is_playing());
    }

    #[test]
    fn test_last_placement_tie_break() {
        let placements = vec![
            PlacedSample::new(SampleRef::new("a", 1.0), 4.0),
            PlacedSample::new(SampleRef::new("b", 2.0), 4.0),
            PlacedSample::new(SampleRef::new("c", 2.0), 4.0),
            PlacedSample::new(SampleRef::new("d", 8.0), 3.0),
        ];
        assert_eq!(last_placement(&placements), Some(1));
        assert_eq!(last_placement(&placements[..1]), Some(0));
        assert_eq!(last_placement(&placements[..0]), None);
    }
}
