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
//! Sample library loading.
//!
//! This module provides:
//! - Asset retrieval of raw encoded sample files
//! - Decoding into interleaved f32 frames
//! - Transcoding to the output sample rate, off the control thread

mod asset;
mod decoder;
mod loader;

pub use asset::{AssetSource, FileAssetSource};
pub use decoder::{SampleDecoder, SymphoniaDecoder};
pub use loader::{DecodedSample, SampleLoader};

/// Errors raised while fetching or decoding a sample file.
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("unable to fetch {asset}: {source}")]
    Fetch {
        asset: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to decode sample: {0}")]
    Decode(String),

    #[error("audio file error: {0}")]
    Audio(#[from] symphonia::core::errors::Error),

    #[error("sample contains no audio frames")]
    Empty,

    #[error("sample load task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
