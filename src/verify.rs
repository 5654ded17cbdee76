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

use std::collections::{BTreeMap, HashSet};

use crate::config::Region;
use crate::samples::FileAssetSource;

/// Severity level for a verification issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A single verification issue found during checking.
#[derive(Debug, Clone)]
pub struct Issue {
    pub severity: Severity,
    pub category: &'static str,
    pub region: String,
    pub message: String,
}

impl Issue {
    fn new(severity: Severity, category: &'static str, region: &Region, message: String) -> Issue {
        Issue {
            severity,
            category,
            region: region.code().to_string(),
            message,
        }
    }
}

/// Result of verifying a set of regions.
#[derive(Debug, Clone, Default)]
pub struct VerificationReport {
    pub issues: Vec<Issue>,
}

impl VerificationReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    /// Merge another report into this one.
    pub fn merge(&mut self, other: VerificationReport) {
        self.issues.extend(other.issues);
    }
}

/// Checks that every track's sample references are usable and that its composition only
/// places samples the track declares.
pub fn check_tracks(region: &Region) -> Vec<Issue> {
    let mut issues = Vec::new();
    for track in region.tracks() {
        let mut seen = HashSet::new();
        for sample in track.samples() {
            if !seen.insert((sample.file(), sample.color())) {
                issues.push(Issue::new(
                    Severity::Warning,
                    "samples",
                    region,
                    format!(
                        "track \"{}\" declares \"{}\" more than once with the same color",
                        track.name(),
                        sample.file()
                    ),
                ));
            }
            if sample.beats() <= 0.0 {
                issues.push(Issue::new(
                    Severity::Warning,
                    "samples",
                    region,
                    format!(
                        "track \"{}\" gives \"{}\" a length of {} beats",
                        track.name(),
                        sample.file(),
                        sample.beats()
                    ),
                ));
            }
        }

        for entry in track.unresolved() {
            issues.push(Issue::new(
                Severity::Error,
                "composition",
                region,
                format!(
                    "track \"{}\" places \"{}\" at beat {} but does not declare it",
                    track.name(),
                    entry.file(),
                    entry.pos()
                ),
            ));
        }
    }
    issues
}

/// Checks that every distinct sample file of the region exists under the asset root.
pub fn check_assets(region: &Region, assets: &FileAssetSource) -> Vec<Issue> {
    let mut files: Vec<&str> = region
        .tracks()
        .iter()
        .flat_map(|track| track.samples().iter().map(|sample| sample.file()))
        .collect();
    files.sort_unstable();
    files.dedup();

    files
        .into_iter()
        .filter_map(|file| {
            let path = assets.path(region.code(), file);
            if path.is_file() {
                return None;
            }
            Some(Issue::new(
                Severity::Error,
                "assets",
                region,
                format!("sample \"{}\" not found at {}", file, path.display()),
            ))
        })
        .collect()
}

/// Runs every check over every region.
pub fn verify_regions(regions: &[Region], assets: &FileAssetSource) -> VerificationReport {
    let mut report = VerificationReport::default();
    for region in regions {
        report.issues.extend(check_tracks(region));
        report.issues.extend(check_assets(region, assets));
    }
    report
}

/// Prints a verification report grouped by region code.
pub fn print_report(report: &VerificationReport, regions: &[Region]) {
    if report.is_clean() {
        println!("\u{2705} All {} region(s) passed verification.", regions.len());
        return;
    }

    let mut by_region: BTreeMap<&str, Vec<&Issue>> = BTreeMap::new();
    for issue in &report.issues {
        by_region.entry(&issue.region).or_default().push(issue);
    }

    let clean_count = regions
        .iter()
        .filter(|region| !by_region.contains_key(region.code()))
        .count();

    for (code, issues) in &by_region {
        let has_errors = issues.iter().any(|i| i.severity == Severity::Error);
        let icon = if has_errors {
            "\u{274c}"
        } else {
            "\u{26a0}\u{fe0f} "
        };
        println!("{} {}", icon, code);
        for issue in issues {
            let severity_icon = match issue.severity {
                Severity::Warning => "\u{26a0}\u{fe0f} ",
                Severity::Error => "\u{274c}",
            };
            println!(
                "   {} [{}] {}",
                severity_icon, issue.category, issue.message
            );
        }
    }

    if clean_count > 0 {
        println!("\n\u{2705} {} region(s) passed all checks.", clean_count);
    }

    println!(
        "\nSummary: {} issue(s) found across {} region(s).",
        report.issues.len(),
        by_region.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CompositionEntry, SampleRef, TrackDefinition};

    fn region(tracks: Vec<TrackDefinition>) -> Region {
        Region::new("andes", 120.0, tracks)
    }

    #[test]
    fn test_check_tracks_clean() {
        let region = region(vec![TrackDefinition::new(
            "percussion",
            vec![SampleRef::new("bombo", 1.0), SampleRef::new("caja", 0.5)],
            vec![
                CompositionEntry::new("bombo", 0.0),
                CompositionEntry::new("caja", 1.0),
            ],
        )]);
        assert!(check_tracks(&region).is_empty());
    }

    #[test]
    fn test_check_tracks_unresolved_composition() {
        let region = region(vec![TrackDefinition::new(
            "percussion",
            vec![SampleRef::new("bombo", 1.0)],
            vec![CompositionEntry::new("quena", 4.0)],
        )]);

        let issues = check_tracks(&region);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Error);
        assert_eq!(issues[0].category, "composition");
        assert_eq!(issues[0].region, "andes");
        assert!(issues[0].message.contains("quena"));
    }

    #[test]
    fn test_check_tracks_duplicate_and_zero_length() {
        let region = region(vec![TrackDefinition::new(
            "percussion",
            vec![SampleRef::new("bombo", 1.0), SampleRef::new("bombo", 0.0)],
            vec![],
        )]);

        let issues = check_tracks(&region);
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.severity == Severity::Warning));
    }

    #[test]
    fn test_check_assets() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("andes")).unwrap();
        std::fs::write(dir.path().join("andes").join("bombo.wav"), b"riff").unwrap();
        let assets = FileAssetSource::new(dir.path()).with_extension("wav");

        let region = region(vec![
            TrackDefinition::new("percussion", vec![SampleRef::new("bombo", 1.0)], vec![]),
            TrackDefinition::new(
                "bass",
                vec![SampleRef::new("bombo", 2.0), SampleRef::new("charango", 2.0)],
                vec![],
            ),
        ]);

        let issues = check_assets(&region, &assets);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].category, "assets");
        assert!(issues[0].message.contains("charango"));
    }

    #[test]
    fn test_verify_regions_merges_checks() {
        let dir = tempfile::tempdir().unwrap();
        let assets = FileAssetSource::new(dir.path()).with_extension("wav");
        let regions = vec![
            region(vec![TrackDefinition::new(
                "percussion",
                vec![SampleRef::new("bombo", 1.0)],
                vec![CompositionEntry::new("caja", 0.0)],
            )]),
            Region::new("pampa", 90.0, vec![]),
        ];

        let report = verify_regions(&regions, &assets);
        // Unresolved "caja" plus the missing "bombo" file.
        assert_eq!(report.issues.len(), 2);
        assert!(report.has_errors());
        assert!(report.issues.iter().all(|i| i.region == "andes"));
    }

    #[test]
    fn test_verification_report_merge() {
        let mut report_a = VerificationReport::default();
        assert!(report_a.is_clean());
        let mut report_b = VerificationReport::default();
        report_b.issues.push(Issue {
            severity: Severity::Warning,
            category: "b",
            region: "andes".to_string(),
            message: "issue b".to_string(),
        });
        report_a.merge(report_b);
        assert_eq!(report_a.issues.len(), 1);
        assert!(!report_a.has_errors());
    }
}
