// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Configuration for the memfs storage engine

use serde::{Deserialize, Serialize};

use crate::types::Statfs;

/// Chunk size used for file content unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 512;

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

/// Engine configuration, typically supplied by the bridge as a JSON blob.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FsConfig {
    /// Fixed size of the content chunks files are stored in. Must be
    /// non-zero; every chunk except a file's last is exactly this long.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Ownership assigned to newly created nodes (root directory included).
    #[serde(default)]
    pub default_uid: u32,
    #[serde(default)]
    pub default_gid: u32,
    /// Advertised capacity; see [`Statfs`].
    #[serde(default)]
    pub capacity: Statfs,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            default_uid: 0,
            default_gid: 0,
            capacity: Statfs::default(),
        }
    }
}

impl FsConfig {
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
