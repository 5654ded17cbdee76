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
use serde::{Deserialize, Serialize};

/// A sample a track can place on its timeline: an audio asset and how many beats it lasts.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct SampleRef {
    /// The asset name, without region prefix or extension.
    file: String,
    /// The length of the sample in beats.
    beats: f64,
    /// Optional color tag. Several references may share a file and differ by color.
    color: Option<String>,
}

impl SampleRef {
    /// Creates an uncolored sample reference.
    pub fn new(file: &str, beats: f64) -> SampleRef {
        SampleRef {
            file: file.to_string(),
            beats,
            color: None,
        }
    }

    /// Tags the reference with a color.
    pub fn with_color(mut self, color: &str) -> SampleRef {
        self.color = Some(color.to_string());
        self
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn beats(&self) -> f64 {
        self.beats
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }
}

/// One placement of a track's default arrangement.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct CompositionEntry {
    /// The asset name to place.
    file: String,
    /// The position on the timeline, in beats.
    pos: f64,
    /// When set, only a reference with this color matches.
    color: Option<String>,
}

impl CompositionEntry {
    pub fn new(file: &str, pos: f64) -> CompositionEntry {
        CompositionEntry {
            file: file.to_string(),
            pos,
            color: None,
        }
    }

    pub fn with_color(mut self, color: &str) -> CompositionEntry {
        self.color = Some(color.to_string());
        self
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn pos(&self) -> f64 {
        self.pos
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    /// Finds the first reference with the same file and, if this entry has a color, the same color.
    pub fn resolve<'a>(&self, sample_refs: &'a [SampleRef]) -> Option<&'a SampleRef> {
        sample_refs.iter().find(|sample_ref| {
            sample_ref.file == self.file
                && self
                    .color
                    .as_deref()
                    .is_none_or(|color| sample_ref.color() == Some(color))
        })
    }
}

/// A YAML representation of a track.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct TrackDefinition {
    /// The name of the track.
    name: String,
    /// The samples the track may use.
    #[serde(default)]
    samples: Vec<SampleRef>,
    /// The default arrangement.
    #[serde(default)]
    composition: Vec<CompositionEntry>,
}

impl TrackDefinition {
    pub fn new(
        name: &str,
        samples: Vec<SampleRef>,
        composition: Vec<CompositionEntry>,
    ) -> TrackDefinition {
        TrackDefinition {
            name: name.to_string(),
            samples,
            composition,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn samples(&self) -> &[SampleRef] {
        &self.samples
    }

    pub fn composition(&self) -> &[CompositionEntry] {
        &self.composition
    }

    /// Composition entries that don't resolve against this track's samples.
    pub fn unresolved(&self) -> Vec<&CompositionEntry> {
        self.composition
            .iter()
            .filter(|entry| entry.resolve(&self.samples).is_none())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs() -> Vec<SampleRef> {
        vec![
            SampleRef::new("kick", 1.0),
            SampleRef::new("bell", 2.0).with_color("red"),
            SampleRef::new("bell", 4.0).with_color("blue"),
        ]
    }

    #[test]
    fn test_resolve_by_file() {
        let refs = refs();
        let resolved = CompositionEntry::new("kick", 0.0).resolve(&refs);
        assert_eq!(resolved, Some(&refs[0]));
    }

    #[test]
    fn test_resolve_by_file_and_color() {
        let refs = refs();
        let resolved = CompositionEntry::new("bell", 2.0)
            .with_color("blue")
            .resolve(&refs);
        assert_eq!(resolved.map(|r| r.beats()), Some(4.0));

        // Without a color the first reference for the file wins.
        let resolved = CompositionEntry::new("bell", 2.0).resolve(&refs);
        assert_eq!(resolved.map(|r| r.beats()), Some(2.0));
    }

    #[test]
    fn test_unresolved_entries() {
        let track = TrackDefinition::new(
            "perc",
            refs(),
            vec![
                CompositionEntry::new("kick", 0.0),
                CompositionEntry::new("snare", 1.0),
                CompositionEntry::new("bell", 2.0).with_color("green"),
            ],
        );

        let unresolved = track.unresolved();
        assert_eq!(unresolved.len(), 2);
        assert_eq!(unresolved[0].file(), "snare");
        assert_eq!(unresolved[1].color(), Some("green"));
    }
}
