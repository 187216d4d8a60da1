// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! memfs-core — in-memory hierarchical filesystem storage engine
//!
//! This crate is the storage core behind a virtual-filesystem bridge: the
//! bridge translates kernel file-operation requests into calls on [`MemFs`],
//! which owns the namespace tree (directories, regular files, symlinks) and
//! the block-chunked representation of file content.
//!
//! Everything is volatile: state exists only for the lifetime of the
//! `MemFs` instance. The engine is synchronous and single-threaded; hosts
//! that dispatch from multiple threads must serialize calls externally
//! (see the [`vfs`] module docs).

pub mod config;
pub mod error;
pub mod storage;
pub mod types;
pub mod vfs;

// Re-export the public surface
pub use config::FsConfig;
pub use error::{FsError, FsResult};
pub use types::{Attributes, DirEntry, FileTimes, HandleId, Statfs};
pub use vfs::MemFs;
