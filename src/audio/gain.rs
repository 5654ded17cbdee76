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

//! Per-track gain with a two-state mute switch.
//!
//! The control side keeps the volume level and the mute flag apart; the audio thread only
//! ever sees the effective gain through a lock-free [`GainHandle`].

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Full volume.
pub const UNITY_GAIN: f32 = 1.0;

/// Read side of a gain control, shared with every source a track schedules.
#[derive(Clone, Debug)]
pub struct GainHandle {
    bits: Arc<AtomicU32>,
}

impl GainHandle {
    fn new(value: f32) -> Self {
        Self {
            bits: Arc::new(AtomicU32::new(value.to_bits())),
        }
    }

    /// The effective gain right now.
    #[inline]
    pub fn value(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }

    fn store(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }
}

impl Default for GainHandle {
    fn default() -> Self {
        GainHandle::new(UNITY_GAIN)
    }
}

/// Owned by exactly one track.
#[derive(Debug)]
pub struct GainControl {
    level: f32,
    muted: bool,
    handle: GainHandle,
}

impl GainControl {
    /// Creates an unmuted control at full volume.
    pub fn new() -> Self {
        Self {
            level: UNITY_GAIN,
            muted: false,
            handle: GainHandle::new(UNITY_GAIN),
        }
    }

    /// Flips between muted and audible. Returns the new mute state.
    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        self.publish();
        self.muted
    }

    pub fn is_mute(&self) -> bool {
        self.muted
    }

    /// Sets the volume level. Negative levels are treated as silence. The mute state is untouched.
    pub fn set_level(&mut self, level: f32) {
        self.level = level.max(0.0);
        self.publish();
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    /// A handle for the audio thread.
    pub fn handle(&self) -> GainHandle {
        self.handle.clone()
    }

    fn publish(&self) {
        self.handle
            .store(if self.muted { 0.0 } else { self.level });
    }
}

impl Default for GainControl {
    fn default() -> Self {
        GainControl::new()
    }
}
