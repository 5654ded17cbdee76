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
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, File, FileFormat};
use duration_string::DurationString;
use serde::Deserialize;

mod audio;
mod error;
mod region;
mod track;

pub use self::audio::Audio;
pub use self::error::ConfigError;
pub use self::region::Region;
pub use self::track::{CompositionEntry, SampleRef, TrackDefinition};

/// Default lookahead between a play request and the first scheduled beat.
pub const DEFAULT_LOOKAHEAD: Duration = Duration::from_millis(100);

/// Default width of one beat on the composer grid, in pixels.
pub const DEFAULT_BEAT_SIZE: f64 = 40.0;

/// Default extension of sample assets.
pub const DEFAULT_EXTENSION: &str = "mp3";

/// The configuration for the composer.
#[derive(Deserialize, Clone, Debug)]
pub struct Composer {
    /// The audio output configuration.
    #[serde(default)]
    audio: Audio,
    /// Root directory of the sample assets. Assets live at `{assets}/{region}/{file}.{extension}`.
    #[serde(default)]
    assets: PathBuf,
    /// Extension of the sample assets (default: mp3).
    extension: Option<String>,
    /// Scheduling lookahead as a duration string (default: 100ms).
    lookahead: Option<String>,
    /// Width of a beat on the grid, used for progress reporting (default: 40).
    beat_size: Option<f64>,
    /// The regions that can be opened.
    #[serde(default)]
    regions: Vec<Region>,
}

impl Composer {
    /// Creates a configuration in code.
    pub fn new(audio: Audio, assets: &Path, regions: Vec<Region>) -> Composer {
        Composer {
            audio,
            assets: assets.to_path_buf(),
            extension: None,
            lookahead: None,
            beat_size: None,
            regions,
        }
    }

    /// Deserializes the configuration file at the given path and validates it. Relative asset
    /// roots are resolved against the directory of the file.
    pub fn deserialize(path: &Path) -> Result<Composer, ConfigError> {
        let mut composer = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Composer>()?;

        if composer.assets.is_relative() {
            if let Some(parent) = path.parent() {
                composer.assets = parent.join(&composer.assets);
            }
        }

        composer.validate()?;
        Ok(composer)
    }

    /// Parses a YAML document and validates it.
    pub fn from_yaml(yaml: &str) -> Result<Composer, ConfigError> {
        let composer = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize::<Composer>()?;
        composer.validate()?;
        Ok(composer)
    }

    /// Checks every region and the scheduling parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut codes = HashSet::new();
        for region in &self.regions {
            region.validate()?;
            if !codes.insert(region.code()) {
                return Err(ConfigError::DuplicateRegion(region.code().to_string()));
            }
        }
        self.lookahead()?;
        Ok(())
    }

    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    pub fn assets(&self) -> &Path {
        &self.assets
    }

    /// Returns the asset extension (default: mp3).
    pub fn extension(&self) -> &str {
        self.extension.as_deref().unwrap_or(DEFAULT_EXTENSION)
    }

    /// Returns the scheduling lookahead (default: 100ms).
    pub fn lookahead(&self) -> Result<Duration, ConfigError> {
        match &self.lookahead {
            Some(lookahead) => Ok(DurationString::from_string(lookahead.clone())
                .map_err(|e| ConfigError::InvalidDuration {
                    value: lookahead.clone(),
                    reason: e.to_string(),
                })?
                .into()),
            None => Ok(DEFAULT_LOOKAHEAD),
        }
    }

    /// Returns the grid beat size (default: 40).
    pub fn beat_size(&self) -> f64 {
        self.beat_size.unwrap_or(DEFAULT_BEAT_SIZE)
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Looks up a region by code.
    pub fn region(&self, code: &str) -> Option<&Region> {
        self.regions.iter().find(|region| region.code() == code)
    }
}
