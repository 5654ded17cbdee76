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
use std::error::Error;
use std::path::PathBuf;

use clap::{crate_version, Parser, Subcommand};
use composer::audio;
use composer::composer::Composer;
use composer::config;
use composer::samples::FileAssetSource;
use composer::util::{beats_display, seconds_display};
use composer::verify;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A multitrack sample sequencer."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the regions and tracks in the given configuration.
    Regions {
        /// The path to the composer config.
        config_path: PathBuf,
    },
    /// Verifies the regions and sample assets in the given configuration.
    Verify {
        /// The path to the composer config.
        config_path: PathBuf,
    },
    /// Lists the available audio output devices.
    Devices {},
    /// Plays the arrangement of a region through the configured audio device.
    Play {
        /// The path to the composer config.
        config_path: PathBuf,
        /// The region code to play.
        region: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Regions { config_path } => {
            let config = config::Composer::deserialize(&config_path)?;

            if config.regions().is_empty() {
                println!("No regions found in {}.", config_path.display());
                return Ok(());
            }

            println!("Regions (count: {}):", config.regions().len());
            for region in config.regions() {
                println!("- {}", region);
                for track in region.tracks() {
                    let placements = track
                        .composition()
                        .iter()
                        .map(|entry| format!("{}@{}", entry.file(), beats_display(entry.pos())))
                        .collect::<Vec<_>>()
                        .join(", ");
                    println!(
                        "  - {} (samples: {}) [{}]",
                        track.name(),
                        track.samples().len(),
                        placements
                    );
                }
            }
        }
        Commands::Verify { config_path } => {
            let config = config::Composer::deserialize(&config_path)?;
            let assets = FileAssetSource::new(config.assets()).with_extension(config.extension());

            let report = verify::verify_regions(config.regions(), &assets);
            verify::print_report(&report, config.regions());
            if report.has_errors() {
                return Err("verification failed".into());
            }
        }
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Play {
            config_path,
            region,
        } => {
            let config = config::Composer::deserialize(&config_path)?;
            let device = audio::get_device(config.audio())?;
            println!("Playing through {}", device);

            let mut composer = Composer::from_config(&config, device.mixer())?;
            let manager = composer.get(&region)?;

            if !manager.wait_until_loaded().await {
                warn!(
                    region = region.as_str(),
                    "Some samples failed to load, they will be skipped"
                );
            }
            manager.load_example();

            manager.play();
            if !manager.is_playing() {
                println!("Nothing to play in {}.", region);
                return Ok(());
            }
            if let Some(duration) = manager.duration() {
                println!("{} ({})", region, seconds_display(duration));
            }
            manager.wait_until_ended().await;
        }
    }

    Ok(())
}
