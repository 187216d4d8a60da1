// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Core type definitions for the memfs storage engine

use serde::{Deserialize, Serialize};

/// Opaque handle identifier returned by `create`/`open`.
///
/// The engine hands these out from a monotonic counter and keeps no handle
/// table; handle lifecycle belongs to the bridge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandleId(pub u64);

impl HandleId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

/// File timestamps (seconds since the Unix epoch)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileTimes {
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
}

/// File attributes, as reported to the bridge.
///
/// `perm` holds the permission bits only; [`Attributes::mode`] combines
/// them with the file-type bits derived from the node kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Attributes {
    pub len: u64,
    pub times: FileTimes,
    pub uid: u32,
    pub gid: u32,
    pub perm: u32,
    pub nlink: u32,
    pub is_dir: bool,
    pub is_symlink: bool,
}

impl Attributes {
    /// Full st_mode value: file-type bits plus permission bits.
    pub fn mode(&self) -> u32 {
        let type_bits = if self.is_dir {
            libc::S_IFDIR as u32
        } else if self.is_symlink {
            libc::S_IFLNK as u32
        } else {
            libc::S_IFREG as u32
        };
        type_bits | (self.perm & 0o7777)
    }
}

/// Directory entry information
#[derive(Clone, Debug)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
    pub is_symlink: bool,
    pub len: u64,
}

/// Filesystem capacity report.
///
/// These are fixed, advertised values; the engine does no real block
/// accounting, and callers must not assume they reflect usage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statfs {
    pub block_size: u32,
    pub total_blocks: u64,
    pub available_blocks: u64,
}

impl Default for Statfs {
    fn default() -> Self {
        Self {
            block_size: 512,
            total_blocks: 4096,
            available_blocks: 2048,
        }
    }
}
