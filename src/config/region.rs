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

use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use super::track::TrackDefinition;

/// A YAML representation of a region: the tempo and sample library of one composer page.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Region {
    /// The region code. Also the directory prefix of the region's assets.
    code: String,
    /// Tempo in quarter-note beats per minute.
    composer_bpm: f64,
    /// The tracks to create when the region is opened.
    #[serde(default)]
    tracks: Vec<TrackDefinition>,
}

impl Region {
    pub fn new(code: &str, composer_bpm: f64, tracks: Vec<TrackDefinition>) -> Region {
        Region {
            code: code.to_string(),
            composer_bpm,
            tracks,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn composer_bpm(&self) -> f64 {
        self.composer_bpm
    }

    pub fn tracks(&self) -> &[TrackDefinition] {
        &self.tracks
    }

    /// Rejects tempos that can't produce a finite beat duration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.composer_bpm.is_finite() || self.composer_bpm <= 0.0 {
            return Err(ConfigError::InvalidBpm {
                region: self.code.clone(),
                bpm: self.composer_bpm,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} BPM, tracks: {})",
            self.code,
            self.composer_bpm,
            self.tracks
                .iter()
                .map(|track| track.name())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}
