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
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::SampleError;
use crate::config::DEFAULT_EXTENSION;

/// Where raw encoded sample files come from.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Fetches the bytes of `{region}/{file}`. Called once per distinct file, never retried.
    async fn fetch(&self, region: &str, file: &str) -> Result<Vec<u8>, SampleError>;
}

/// Reads assets from `{root}/{region}/{file}.{extension}`.
#[derive(Clone, Debug)]
pub struct FileAssetSource {
    root: PathBuf,
    extension: String,
}

impl FileAssetSource {
    pub fn new(root: &Path) -> FileAssetSource {
        FileAssetSource {
            root: root.to_path_buf(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    pub fn with_extension(mut self, extension: &str) -> FileAssetSource {
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// The on-disk path of an asset.
    pub fn path(&self, region: &str, file: &str) -> PathBuf {
        self.root
            .join(region)
            .join(format!("{}.{}", file, self.extension))
    }
}

#[async_trait]
impl AssetSource for FileAssetSource {
    async fn fetch(&self, region: &str, file: &str) -> Result<Vec<u8>, SampleError> {
        let path = self.path(region, file);
        debug!(path = ?path, "Fetching sample asset");
        tokio::fs::read(&path).await.map_err(|source| SampleError::Fetch {
            asset: path.display().to_string(),
            source,
        })
    }
}
