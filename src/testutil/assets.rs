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
use std::io;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::samples::{AssetSource, DecodedSample, SampleDecoder, SampleError};

/// An asset source backed by a map. Records every fetch.
#[derive(Default)]
pub struct MemoryAssetSource {
    assets: HashMap<String, Vec<u8>>,
    fetches: Mutex<Vec<String>>,
}

impl MemoryAssetSource {
    pub fn new() -> MemoryAssetSource {
        MemoryAssetSource::default()
    }

    pub fn with_asset(mut self, region: &str, file: &str, bytes: Vec<u8>) -> MemoryAssetSource {
        self.assets.insert(format!("{}/{}", region, file), bytes);
        self
    }

    /// The `{region}/{file}` keys fetched so far, in order.
    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().clone()
    }
}

#[async_trait]
impl AssetSource for MemoryAssetSource {
    async fn fetch(&self, region: &str, file: &str) -> Result<Vec<u8>, SampleError> {
        let key = format!("{}/{}", region, file);
        self.fetches.lock().push(key.clone());
        self.assets
            .get(&key)
            .cloned()
            .ok_or_else(|| SampleError::Fetch {
                asset: key,
                source: io::Error::new(io::ErrorKind::NotFound, "no such asset"),
            })
    }
}

/// A payload the fake decoder turns into `frames` mono frames of `level / 128`.
pub fn fake_asset(frames: usize, level: u8) -> Vec<u8> {
    vec![level; frames]
}

/// Decodes every byte into one mono frame of `byte / 128`. Payloads starting with "bad" fail.
pub struct FakeDecoder {
    sample_rate: u32,
}

impl FakeDecoder {
    pub fn new(sample_rate: u32) -> FakeDecoder {
        FakeDecoder { sample_rate }
    }
}

impl SampleDecoder for FakeDecoder {
    fn decode(&self, bytes: Vec<u8>) -> Result<DecodedSample, SampleError> {
        if bytes.starts_with(b"bad") {
            return Err(SampleError::Decode("corrupt payload".to_string()));
        }
        if bytes.is_empty() {
            return Err(SampleError::Empty);
        }
        let data = bytes.iter().map(|b| *b as f32 / 128.0).collect();
        Ok(DecodedSample::new(data, 1, self.sample_rate))
    }
}
