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
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::samples::{DecodedSample, SampleError};

/// Sender half of a manager's event queue. Load tasks and mixer end callbacks hold clones.
pub type EventSender = mpsc::UnboundedSender<TrackEvent>;

/// Something that happened off the control thread to one of a manager's tracks. Tracks are
/// identified by their index in the manager.
#[derive(Debug)]
pub enum TrackEvent {
    /// A sample file finished decoding.
    SampleLoaded {
        track: usize,
        file: String,
        sample: Arc<DecodedSample>,
    },
    /// A sample file could not be fetched or decoded.
    SampleFailed {
        track: usize,
        file: String,
        error: SampleError,
    },
    /// The track has no sample files, so it is loaded as soon as it exists.
    NothingToLoad { track: usize },
    /// The last source of playback pass `pass` stopped, either naturally or through cancellation.
    SourceEnded { track: usize, pass: u64 },
}

/// Application-wide signals. They carry no payload beyond their name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notification {
    /// Every track of a manager has decoded all of its samples.
    TracksLoaded,
    /// Playback has fully stopped.
    TracksEnded,
}

impl Notification {
    pub fn name(&self) -> &'static str {
        match self {
            Notification::TracksLoaded => "tracks-loaded",
            Notification::TracksEnded => "tracks-ended",
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
