// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! In-memory filesystem engine
//!
//! [`MemFs`] owns the entire namespace tree and every file's chunked
//! content. It is the surface the virtual-filesystem bridge calls into:
//! each operation resolves a path, mutates or reads the tree, and returns
//! a typed result synchronously.
//!
//! The engine is single-threaded by design. Mutating operations take
//! `&mut self` and there is no internal locking; a bridge that dispatches
//! requests from multiple threads must hold one exclusive lock around each
//! call. No operation suspends, retries or runs in the background, and a
//! failed operation performs none of its mutation.

use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::config::FsConfig;
use crate::error::{FsError, FsResult};
use crate::storage::ChunkedContent;
use crate::types::{Attributes, DirEntry, FileTimes, HandleId, Statfs};

/// Internal node ID for filesystem nodes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(u64);

/// Filesystem node payload
#[derive(Clone, Debug)]
pub(crate) enum NodeKind {
    File {
        /// Exclusively owned; dropped with the node.
        content: ChunkedContent,
    },
    Directory {
        children: HashMap<String, NodeId>,
    },
    Symlink {
        target: String,
    },
}

/// Filesystem node
#[derive(Clone, Debug)]
pub(crate) struct Node {
    pub kind: NodeKind,
    pub times: FileTimes,
    /// Permission bits only; the file-type bits are derived from `kind`.
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub nlink: u32,
    pub xattrs: BTreeMap<String, Vec<u8>>,
}

/// The main filesystem engine.
///
/// All nodes live in one arena keyed by [`NodeId`]; directories reference
/// their children by ID, so removing the last directory reference (and the
/// arena entry) is the only way a node is destroyed.
pub struct MemFs {
    config: FsConfig,
    nodes: HashMap<NodeId, Node>,
    root_id: NodeId,
    next_node_id: u64,
    next_handle_id: u64,
}

impl MemFs {
    /// Create a new engine instance with a seeded root directory.
    pub fn new(config: FsConfig) -> FsResult<Self> {
        if config.chunk_size == 0 {
            return Err(FsError::InvalidArgument);
        }

        let root_id = NodeId(1);
        let root = Node {
            kind: NodeKind::Directory {
                children: HashMap::new(),
            },
            times: Self::fresh_times(),
            mode: 0o755,
            uid: config.default_uid,
            gid: config.default_gid,
            nlink: 2, // '.' and '..'
            xattrs: BTreeMap::new(),
        };

        let mut nodes = HashMap::new();
        nodes.insert(root_id, root);

        Ok(Self {
            config,
            nodes,
            root_id,
            next_node_id: 2,
            next_handle_id: 1,
        })
    }

    fn allocate_node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    fn allocate_handle_id(&mut self) -> HandleId {
        let id = HandleId::new(self.next_handle_id);
        self.next_handle_id += 1;
        id
    }

    fn current_timestamp() -> i64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
    }

    fn fresh_times() -> FileTimes {
        let now = Self::current_timestamp();
        FileTimes {
            atime: now,
            mtime: now,
            ctime: now,
        }
    }

    /// Normal path components; separators, repeats and `.` are tolerated.
    fn path_components(path: &Path) -> Vec<&str> {
        path.components()
            .filter_map(|c| match c {
                Component::Normal(s) => s.to_str(),
                _ => None,
            })
            .collect()
    }

    fn node(&self, id: NodeId) -> FsResult<&Node> {
        self.nodes.get(&id).ok_or(FsError::NotFound)
    }

    fn node_mut(&mut self, id: NodeId) -> FsResult<&mut Node> {
        self.nodes.get_mut(&id).ok_or(FsError::NotFound)
    }

    /// Walk `path` from the root to its target node. Any missing component
    /// and any non-directory intermediate fails with `NotFound`.
    fn resolve_node(&self, path: &Path) -> FsResult<NodeId> {
        let mut current = self.root_id;
        for component in Self::path_components(path) {
            let node = self.node(current)?;
            match &node.kind {
                NodeKind::Directory { children } => {
                    current = *children.get(component).ok_or(FsError::NotFound)?;
                }
                _ => return Err(FsError::NotFound),
            }
        }
        Ok(current)
    }

    /// Walk to the parent of `path`'s final component, which itself need
    /// not exist. The root has no parent.
    fn resolve_parent<'a>(&self, path: &'a Path) -> FsResult<(NodeId, &'a str)> {
        let components = Self::path_components(path);
        let (name, prefix) = components.split_last().ok_or(FsError::InvalidArgument)?;

        let mut current = self.root_id;
        for component in prefix {
            let node = self.node(current)?;
            match &node.kind {
                NodeKind::Directory { children } => {
                    current = *children.get(*component).ok_or(FsError::NotFound)?;
                }
                _ => return Err(FsError::NotFound),
            }
        }
        // The insertion point must be a directory.
        match &self.node(current)?.kind {
            NodeKind::Directory { .. } => Ok((current, *name)),
            _ => Err(FsError::NotFound),
        }
    }

    fn child_id(&self, parent_id: NodeId, name: &str) -> FsResult<NodeId> {
        match &self.node(parent_id)?.kind {
            NodeKind::Directory { children } => {
                children.get(name).copied().ok_or(FsError::NotFound)
            }
            _ => Err(FsError::NotADirectory),
        }
    }

    /// Insert `child_id` under `parent_id`. Bumps the parent's mtime/ctime
    /// and, for a directory child, its link count.
    fn attach_child(&mut self, parent_id: NodeId, name: &str, child_id: NodeId) -> FsResult<()> {
        let child_is_dir = matches!(
            self.nodes.get(&child_id).map(|n| &n.kind),
            Some(NodeKind::Directory { .. })
        );
        let now = Self::current_timestamp();
        let parent = self.node_mut(parent_id)?;
        match &mut parent.kind {
            NodeKind::Directory { children } => {
                if children.contains_key(name) {
                    return Err(FsError::AlreadyExists);
                }
                children.insert(name.to_string(), child_id);
                parent.times.mtime = now;
                parent.times.ctime = now;
                if child_is_dir {
                    parent.nlink = parent.nlink.saturating_add(1);
                }
                Ok(())
            }
            _ => Err(FsError::NotADirectory),
        }
    }

    /// Remove the named entry from `parent_id`, returning the detached
    /// node's ID. Bumps the parent's mtime/ctime and, for a directory
    /// child, decrements its link count. The node stays in the arena.
    fn detach_child(&mut self, parent_id: NodeId, name: &str) -> Option<NodeId> {
        let now = Self::current_timestamp();
        let removed = {
            let parent = self.nodes.get_mut(&parent_id)?;
            match &mut parent.kind {
                NodeKind::Directory { children } => {
                    let child_id = children.remove(name)?;
                    parent.times.mtime = now;
                    parent.times.ctime = now;
                    Some(child_id)
                }
                _ => None,
            }
        }?;

        let child_is_dir = matches!(
            self.nodes.get(&removed).map(|n| &n.kind),
            Some(NodeKind::Directory { .. })
        );
        if child_is_dir {
            if let Some(parent) = self.nodes.get_mut(&parent_id) {
                parent.nlink = parent.nlink.saturating_sub(1);
            }
        }
        Some(removed)
    }

    /// Destroy a node and, for directories, everything beneath it.
    fn remove_subtree(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.remove(&id) {
            if let NodeKind::Directory { children } = node.kind {
                for (_, child_id) in children {
                    self.remove_subtree(child_id);
                }
            }
        }
    }

    fn node_attributes(&self, id: NodeId) -> FsResult<Attributes> {
        let node = self.node(id)?;
        let (len, is_dir, is_symlink) = match &node.kind {
            NodeKind::File { content } => (content.len(), false, false),
            NodeKind::Directory { .. } => (0, true, false),
            NodeKind::Symlink { target } => (target.len() as u64, false, true),
        };
        Ok(Attributes {
            len,
            times: node.times,
            uid: node.uid,
            gid: node.gid,
            perm: node.mode & 0o7777,
            nlink: node.nlink,
            is_dir,
            is_symlink,
        })
    }

    // --- metadata operations ---

    /// Get node metadata (never includes the child map).
    pub fn getattr(&self, path: &Path) -> FsResult<Attributes> {
        let node_id = self.resolve_node(path)?;
        self.node_attributes(node_id)
    }

    /// Change permission bits (basic chmod semantics); the node kind and
    /// therefore the file-type bits are untouched.
    pub fn set_mode(&mut self, path: &Path, mode: u32) -> FsResult<()> {
        let node_id = self.resolve_node(path)?;
        let now = Self::current_timestamp();
        let node = self.node_mut(node_id)?;
        node.mode = mode & 0o7777;
        node.times.ctime = now;
        Ok(())
    }

    /// Change ownership of a node addressed by path.
    pub fn set_owner(&mut self, path: &Path, uid: u32, gid: u32) -> FsResult<()> {
        let node_id = self.resolve_node(path)?;
        let now = Self::current_timestamp();
        let node = self.node_mut(node_id)?;
        node.uid = uid;
        node.gid = gid;
        node.times.ctime = now;
        Ok(())
    }

    /// Set access/modification times; `None` means "now" for both.
    pub fn set_times(&mut self, path: &Path, times: Option<(i64, i64)>) -> FsResult<()> {
        let node_id = self.resolve_node(path)?;
        let now = Self::current_timestamp();
        let (atime, mtime) = times.unwrap_or((now, now));
        let node = self.node_mut(node_id)?;
        node.times.atime = atime;
        node.times.mtime = mtime;
        Ok(())
    }

    /// Advertised capacity constants; no real accounting happens.
    pub fn statfs(&self) -> Statfs {
        self.config.capacity
    }

    // --- namespace operations ---

    /// Create an empty regular file and return a fresh handle ID.
    pub fn create(&mut self, path: &Path, mode: u32) -> FsResult<HandleId> {
        let (parent_id, name) = self.resolve_parent(path)?;
        if self.child_id(parent_id, name).is_ok() {
            return Err(FsError::AlreadyExists);
        }

        let node_id = self.allocate_node_id();
        let node = Node {
            kind: NodeKind::File {
                content: ChunkedContent::new(self.config.chunk_size),
            },
            times: Self::fresh_times(),
            mode: mode & 0o7777,
            uid: self.config.default_uid,
            gid: self.config.default_gid,
            nlink: 1,
            xattrs: BTreeMap::new(),
        };
        let name = name.to_string();
        self.nodes.insert(node_id, node);
        self.attach_child(parent_id, &name, node_id)?;

        debug!(path = %path.display(), "create");
        Ok(self.allocate_handle_id())
    }

    /// Hand out a fresh handle ID for an existing node.
    pub fn open(&mut self, path: &Path) -> FsResult<HandleId> {
        self.resolve_node(path)?;
        Ok(self.allocate_handle_id())
    }

    pub fn mkdir(&mut self, path: &Path, mode: u32) -> FsResult<()> {
        let (parent_id, name) = self.resolve_parent(path)?;
        if self.child_id(parent_id, name).is_ok() {
            return Err(FsError::AlreadyExists);
        }

        let node_id = self.allocate_node_id();
        let node = Node {
            kind: NodeKind::Directory {
                children: HashMap::new(),
            },
            times: Self::fresh_times(),
            mode: mode & 0o7777,
            uid: self.config.default_uid,
            gid: self.config.default_gid,
            nlink: 2, // '.' and '..'
            xattrs: BTreeMap::new(),
        };
        let name = name.to_string();
        self.nodes.insert(node_id, node);
        // attach_child raises the parent's link count for the new subdir
        self.attach_child(parent_id, &name, node_id)?;

        debug!(path = %path.display(), "mkdir");
        Ok(())
    }

    /// Remove an empty directory.
    pub fn rmdir(&mut self, path: &Path) -> FsResult<()> {
        let (parent_id, name) = self.resolve_parent(path)?;
        let node_id = self.child_id(parent_id, name)?;

        match &self.node(node_id)?.kind {
            NodeKind::Directory { children } => {
                if !children.is_empty() {
                    return Err(FsError::NotEmpty);
                }
            }
            _ => return Err(FsError::NotADirectory),
        }

        let name = name.to_string();
        self.detach_child(parent_id, &name);
        self.nodes.remove(&node_id);

        debug!(path = %path.display(), "rmdir");
        Ok(())
    }

    /// Remove a regular file or symlink. The parent's link count is not
    /// affected; only directory children contribute to it.
    pub fn unlink(&mut self, path: &Path) -> FsResult<()> {
        let (parent_id, name) = self.resolve_parent(path)?;
        let node_id = self.child_id(parent_id, name)?;

        if matches!(self.node(node_id)?.kind, NodeKind::Directory { .. }) {
            return Err(FsError::IsADirectory);
        }

        let name = name.to_string();
        self.detach_child(parent_id, &name);
        self.nodes.remove(&node_id);

        debug!(path = %path.display(), "unlink");
        Ok(())
    }

    /// Move a node to a new parent/name, overwriting any existing entry at
    /// the destination. A moved directory contributes one link to whichever
    /// parent currently holds it, so the old parent's count drops and the
    /// new parent's rises.
    pub fn rename(&mut self, old: &Path, new: &Path) -> FsResult<()> {
        let (old_parent, old_name) = self.resolve_parent(old)?;
        let src_id = self.child_id(old_parent, old_name)?;
        let (new_parent, new_name) = self.resolve_parent(new)?;

        if old_parent == new_parent && old_name == new_name {
            return Ok(());
        }

        let src_is_dir = matches!(self.node(src_id)?.kind, NodeKind::Directory { .. });
        if src_is_dir && new.starts_with(old) {
            // A directory cannot be moved beneath itself.
            return Err(FsError::InvalidArgument);
        }

        let dest_id = match self.child_id(new_parent, new_name) {
            Ok(id) => Some(id),
            Err(FsError::NotFound) => None,
            Err(e) => return Err(e),
        };

        // Everything is validated; mutate.
        let old_name = old_name.to_string();
        let new_name = new_name.to_string();
        self.detach_child(old_parent, &old_name);
        if let Some(dest_id) = dest_id {
            self.detach_child(new_parent, &new_name);
            self.remove_subtree(dest_id);
        }
        self.attach_child(new_parent, &new_name, src_id)?;
        self.node_mut(src_id)?.times.ctime = Self::current_timestamp();

        debug!(from = %old.display(), to = %new.display(), "rename");
        Ok(())
    }

    /// Create a symbolic link at `link_path` whose payload is `target`.
    /// The link's size is the length of the target text.
    pub fn symlink(&mut self, link_path: &Path, target: &str) -> FsResult<()> {
        let (parent_id, name) = self.resolve_parent(link_path)?;
        if self.child_id(parent_id, name).is_ok() {
            return Err(FsError::AlreadyExists);
        }

        let node_id = self.allocate_node_id();
        let node = Node {
            kind: NodeKind::Symlink {
                target: target.to_string(),
            },
            times: Self::fresh_times(),
            mode: 0o777,
            uid: self.config.default_uid,
            gid: self.config.default_gid,
            nlink: 1,
            xattrs: BTreeMap::new(),
        };
        let name = name.to_string();
        self.nodes.insert(node_id, node);
        self.attach_child(parent_id, &name, node_id)?;

        debug!(path = %link_path.display(), to = %target, "symlink");
        Ok(())
    }

    pub fn readlink(&self, path: &Path) -> FsResult<String> {
        let node_id = self.resolve_node(path)?;
        match &self.node(node_id)?.kind {
            NodeKind::Symlink { target } => Ok(target.clone()),
            _ => Err(FsError::NotASymlink),
        }
    }

    /// Child names plus the conventional `.` and `..` entries.
    pub fn readdir(&self, path: &Path) -> FsResult<Vec<String>> {
        let node_id = self.resolve_node(path)?;
        match &self.node(node_id)?.kind {
            NodeKind::Directory { children } => {
                let mut names: Vec<String> = children.keys().cloned().collect();
                names.sort();
                let mut entries = vec![".".to_string(), "..".to_string()];
                entries.extend(names);
                Ok(entries)
            }
            _ => Err(FsError::NotADirectory),
        }
    }

    /// Directory entries with attributes in one call (libfuse readdirplus
    /// pattern); excludes the dot entries.
    pub fn readdir_plus(&self, path: &Path) -> FsResult<Vec<(DirEntry, Attributes)>> {
        let node_id = self.resolve_node(path)?;
        let children = match &self.node(node_id)?.kind {
            NodeKind::Directory { children } => children,
            _ => return Err(FsError::NotADirectory),
        };

        let mut names: Vec<&String> = children.keys().collect();
        names.sort();

        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            let child_id = children[name];
            let attrs = self.node_attributes(child_id)?;
            entries.push((
                DirEntry {
                    name: name.clone(),
                    is_dir: attrs.is_dir,
                    is_symlink: attrs.is_symlink,
                    len: attrs.len,
                },
                attrs,
            ));
        }
        Ok(entries)
    }

    // --- file content operations ---

    /// Read up to `size` bytes at `offset`, clipped to EOF.
    pub fn read(&self, path: &Path, size: usize, offset: u64) -> FsResult<Vec<u8>> {
        let node_id = self.resolve_node(path)?;
        match &self.node(node_id)?.kind {
            NodeKind::File { content } => Ok(content.read(offset, size)),
            _ => Err(FsError::NotAFile),
        }
    }

    /// Splice `data` into the file at `offset` (zero-filling any gap past
    /// EOF) and return the number of bytes written. The reported size
    /// always tracks the content length.
    pub fn write(&mut self, path: &Path, data: &[u8], offset: u64) -> FsResult<usize> {
        let node_id = self.resolve_node(path)?;
        let now = Self::current_timestamp();
        let node = self.node_mut(node_id)?;
        match &mut node.kind {
            NodeKind::File { content } => {
                let written = content.write(offset, data);
                node.times.mtime = now;
                node.times.ctime = now;
                debug!(path = %path.display(), offset, written, "write");
                Ok(written)
            }
            _ => Err(FsError::NotAFile),
        }
    }

    /// Truncate or zero-extend the file to `new_len` bytes.
    pub fn truncate(&mut self, path: &Path, new_len: u64) -> FsResult<()> {
        let node_id = self.resolve_node(path)?;
        let now = Self::current_timestamp();
        let node = self.node_mut(node_id)?;
        match &mut node.kind {
            NodeKind::File { content } => {
                content.truncate(new_len);
                node.times.mtime = now;
                node.times.ctime = now;
                debug!(path = %path.display(), new_len, "truncate");
                Ok(())
            }
            _ => Err(FsError::NotAFile),
        }
    }

    // --- extended attributes ---

    fn xattr_lookup<'a>(node: &'a Node, name: &str) -> FsResult<&'a [u8]> {
        node.xattrs.get(name).map(|v| v.as_slice()).ok_or(FsError::AttributeNotFound)
    }

    pub fn xattr_set(&mut self, path: &Path, name: &str, value: &[u8]) -> FsResult<()> {
        let node_id = self.resolve_node(path)?;
        let node = self.node_mut(node_id)?;
        node.xattrs.insert(name.to_string(), value.to_vec());
        Ok(())
    }

    /// A missing attribute deliberately reads as an empty value rather
    /// than an error; `AttributeNotFound` never crosses this boundary.
    pub fn xattr_get(&self, path: &Path, name: &str) -> FsResult<Vec<u8>> {
        let node_id = self.resolve_node(path)?;
        match Self::xattr_lookup(self.node(node_id)?, name) {
            Ok(value) => Ok(value.to_vec()),
            Err(FsError::AttributeNotFound) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    pub fn xattr_list(&self, path: &Path) -> FsResult<Vec<String>> {
        let node_id = self.resolve_node(path)?;
        Ok(self.node(node_id)?.xattrs.keys().cloned().collect())
    }

    /// Removing a name that was never set is a silent no-op.
    pub fn xattr_remove(&mut self, path: &Path, name: &str) -> FsResult<()> {
        let node_id = self.resolve_node(path)?;
        let node = self.node_mut(node_id)?;
        node.xattrs.remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn test_fs() -> MemFs {
        MemFs::new(FsConfig::default()).expect("engine construction")
    }

    fn p(s: &str) -> &Path {
        Path::new(s)
    }

    #[test]
    fn test_root_exists_with_seeded_metadata() {
        let fs = test_fs();
        let attrs = fs.getattr(p("/")).expect("getattr root");
        assert!(attrs.is_dir);
        assert_eq!(attrs.nlink, 2);
        assert_eq!(attrs.perm, 0o755);
        assert_eq!(attrs.mode() & libc::S_IFMT as u32, libc::S_IFDIR as u32);
    }

    #[test]
    fn test_create_and_getattr() {
        let mut fs = test_fs();
        let handle = fs.create(p("/file.txt"), 0o644).expect("create");
        assert!(handle.0 > 0);

        let attrs = fs.getattr(p("/file.txt")).expect("getattr");
        assert_eq!(attrs.len, 0);
        assert_eq!(attrs.nlink, 1);
        assert_eq!(attrs.perm, 0o644);
        assert!(!attrs.is_dir);
    }

    #[test]
    fn test_create_rejects_duplicates_and_missing_parent() {
        let mut fs = test_fs();
        fs.create(p("/f"), 0o644).expect("create");
        assert_eq!(fs.create(p("/f"), 0o644), Err(FsError::AlreadyExists));
        assert_eq!(fs.create(p("/no/such/dir/f"), 0o644), Err(FsError::NotFound));
    }

    #[test]
    fn test_open_returns_distinct_handles() {
        let mut fs = test_fs();
        let h1 = fs.create(p("/f"), 0o644).expect("create");
        let h2 = fs.open(p("/f")).expect("open");
        assert_ne!(h1, h2);
        assert_eq!(fs.open(p("/missing")), Err(FsError::NotFound));
    }

    #[test]
    fn test_path_resolution_tolerates_separator_noise() {
        let mut fs = test_fs();
        fs.mkdir(p("/a"), 0o755).expect("mkdir a");
        fs.create(p("/a/f"), 0o644).expect("create f");
        assert!(fs.getattr(p("//a///f")).is_ok());
        assert!(fs.getattr(p("/a/f/")).is_ok());
    }

    #[test]
    fn test_resolution_through_file_fails_not_found() {
        let mut fs = test_fs();
        fs.create(p("/f"), 0o644).expect("create");
        assert_eq!(fs.getattr(p("/f/deeper")), Err(FsError::NotFound));
        assert_eq!(fs.create(p("/f/child"), 0o644), Err(FsError::NotFound));
    }

    #[test]
    fn test_write_read_round_trip() {
        let mut fs = test_fs();
        fs.create(p("/data"), 0o644).expect("create");

        let payload = b"the quick brown fox";
        let written = fs.write(p("/data"), payload, 0).expect("write");
        assert_eq!(written, payload.len());
        assert_eq!(fs.read(p("/data"), payload.len(), 0).expect("read"), payload.to_vec());
        assert_eq!(fs.getattr(p("/data")).unwrap().len, payload.len() as u64);
    }

    #[test]
    fn test_round_trip_at_offset_with_trailing_data() {
        let mut fs = test_fs();
        fs.create(p("/data"), 0o644).expect("create");
        let base: Vec<u8> = (0..1500).map(|i| (i % 251) as u8).collect();
        fs.write(p("/data"), &base, 0).expect("seed");

        let patch = vec![0x5A; 64];
        fs.write(p("/data"), &patch, 200).expect("patch");
        assert_eq!(fs.read(p("/data"), 64, 200).unwrap(), patch);
        // Unrelated trailing data survives.
        assert_eq!(fs.read(p("/data"), 100, 1400).unwrap(), base[1400..].to_vec());
        assert_eq!(fs.getattr(p("/data")).unwrap().len, 1500);
    }

    #[test]
    fn test_block_boundary_splice() {
        let mut fs = test_fs();
        fs.create(p("/data"), 0o644).expect("create");
        let base: Vec<u8> = (0..600).map(|i| (i % 251) as u8).collect();
        fs.write(p("/data"), &base, 0).expect("seed");

        // 10 bytes at offset 510 straddle the 512-byte chunk boundary.
        let patch = [0xEE; 10];
        fs.write(p("/data"), &patch, 510).expect("splice");

        let mut expected = base;
        expected[510..520].copy_from_slice(&patch);
        let got = fs.read(p("/data"), 600, 0).expect("read back");
        assert_eq!(got.len(), 600);
        assert_eq!(got, expected);
    }

    #[test]
    fn test_write_updates_size_and_mtime() {
        let mut fs = test_fs();
        fs.create(p("/data"), 0o644).expect("create");
        fs.set_times(p("/data"), Some((1, 1))).expect("reset times");

        fs.write(p("/data"), &[1; 100], 50).expect("write");
        let attrs = fs.getattr(p("/data")).unwrap();
        assert_eq!(attrs.len, 150);
        assert!(attrs.times.mtime > 1);
    }

    #[test]
    fn test_truncate_shrink_keeps_prefix() {
        let mut fs = test_fs();
        fs.create(p("/data"), 0o644).expect("create");
        let base: Vec<u8> = (0..1000).map(|i| (i % 251) as u8).collect();
        fs.write(p("/data"), &base, 0).expect("seed");

        fs.truncate(p("/data"), 100).expect("truncate");
        assert_eq!(fs.getattr(p("/data")).unwrap().len, 100);
        assert_eq!(fs.read(p("/data"), 100, 0).unwrap(), base[..100].to_vec());
    }

    #[test]
    fn test_truncate_grow_zero_fills() {
        let mut fs = test_fs();
        fs.create(p("/data"), 0o644).expect("create");
        fs.write(p("/data"), &[9; 10], 0).expect("seed");

        fs.truncate(p("/data"), 50).expect("truncate");
        assert_eq!(fs.getattr(p("/data")).unwrap().len, 50);
        let tail = fs.read(p("/data"), 40, 10).unwrap();
        assert_eq!(tail.len(), 40);
        assert!(tail.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_content_ops_reject_wrong_kind() {
        let mut fs = test_fs();
        fs.mkdir(p("/d"), 0o755).expect("mkdir");
        fs.symlink(p("/l"), "/d").expect("symlink");

        assert_eq!(fs.read(p("/d"), 10, 0), Err(FsError::NotAFile));
        assert_eq!(fs.write(p("/d"), b"x", 0), Err(FsError::NotAFile));
        assert_eq!(fs.truncate(p("/l"), 0), Err(FsError::NotAFile));
        assert_eq!(fs.readdir(p("/l")), Err(FsError::NotADirectory));
        assert_eq!(fs.readlink(p("/d")), Err(FsError::NotASymlink));
    }

    #[test]
    fn test_mkdir_updates_parent_link_count() {
        let mut fs = test_fs();
        assert_eq!(fs.getattr(p("/")).unwrap().nlink, 2);
        fs.mkdir(p("/a"), 0o755).expect("mkdir a");
        assert_eq!(fs.getattr(p("/")).unwrap().nlink, 3);
        assert_eq!(fs.getattr(p("/a")).unwrap().nlink, 2);
        fs.mkdir(p("/b"), 0o755).expect("mkdir b");
        assert_eq!(fs.getattr(p("/")).unwrap().nlink, 4);
        // Files do not contribute to the parent's count.
        fs.create(p("/f"), 0o644).expect("create");
        assert_eq!(fs.getattr(p("/")).unwrap().nlink, 4);
    }

    #[test]
    fn test_rmdir_emptiness_gate() {
        let mut fs = test_fs();
        fs.mkdir(p("/d"), 0o755).expect("mkdir");
        assert_eq!(fs.getattr(p("/")).unwrap().nlink, 3);

        fs.create(p("/d/child"), 0o644).expect("create child");
        assert_eq!(fs.rmdir(p("/d")), Err(FsError::NotEmpty));
        // Failed rmdir left everything in place.
        assert!(fs.getattr(p("/d/child")).is_ok());
        assert_eq!(fs.getattr(p("/")).unwrap().nlink, 3);

        fs.unlink(p("/d/child")).expect("unlink child");
        fs.rmdir(p("/d")).expect("rmdir now empty");
        assert_eq!(fs.getattr(p("/d")), Err(FsError::NotFound));
        assert_eq!(fs.getattr(p("/")).unwrap().nlink, 2);
    }

    #[test]
    fn test_rmdir_wrong_kind_and_root() {
        let mut fs = test_fs();
        fs.create(p("/f"), 0o644).expect("create");
        assert_eq!(fs.rmdir(p("/f")), Err(FsError::NotADirectory));
        assert_eq!(fs.rmdir(p("/")), Err(FsError::InvalidArgument));
    }

    #[test]
    fn test_unlink_file_and_symlink() {
        let mut fs = test_fs();
        fs.create(p("/f"), 0o644).expect("create");
        fs.symlink(p("/l"), "/f").expect("symlink");
        fs.mkdir(p("/d"), 0o755).expect("mkdir");

        fs.unlink(p("/f")).expect("unlink file");
        fs.unlink(p("/l")).expect("unlink symlink");
        assert_eq!(fs.getattr(p("/f")), Err(FsError::NotFound));
        assert_eq!(fs.unlink(p("/d")), Err(FsError::IsADirectory));
        // Parent link count untouched by file/symlink removal.
        assert_eq!(fs.getattr(p("/")).unwrap().nlink, 3);
    }

    #[test]
    fn test_rename_preserves_content_and_metadata() {
        let mut fs = test_fs();
        fs.mkdir(p("/src"), 0o755).expect("mkdir src");
        fs.mkdir(p("/dst"), 0o755).expect("mkdir dst");
        fs.create(p("/src/f"), 0o600).expect("create");
        let payload = b"rename me";
        fs.write(p("/src/f"), payload, 0).expect("write");
        fs.xattr_set(p("/src/f"), "user.tag", b"v1").expect("xattr");

        fs.rename(p("/src/f"), p("/dst/g")).expect("rename");

        assert_eq!(fs.getattr(p("/src/f")), Err(FsError::NotFound));
        let attrs = fs.getattr(p("/dst/g")).expect("getattr moved");
        assert_eq!(attrs.len, payload.len() as u64);
        assert_eq!(attrs.perm, 0o600);
        assert_eq!(fs.read(p("/dst/g"), payload.len(), 0).unwrap(), payload.to_vec());
        assert_eq!(fs.xattr_get(p("/dst/g"), "user.tag").unwrap(), b"v1".to_vec());
    }

    #[test]
    fn test_rename_directory_adjusts_both_parents() {
        let mut fs = test_fs();
        fs.mkdir(p("/a"), 0o755).expect("mkdir a");
        fs.mkdir(p("/b"), 0o755).expect("mkdir b");
        fs.mkdir(p("/a/d"), 0o755).expect("mkdir a/d");
        assert_eq!(fs.getattr(p("/a")).unwrap().nlink, 3);
        assert_eq!(fs.getattr(p("/b")).unwrap().nlink, 2);

        fs.rename(p("/a/d"), p("/b/d")).expect("rename dir");
        assert_eq!(fs.getattr(p("/a")).unwrap().nlink, 2);
        assert_eq!(fs.getattr(p("/b")).unwrap().nlink, 3);
        assert_eq!(fs.getattr(p("/b/d")).unwrap().nlink, 2);
    }

    #[test]
    fn test_rename_overwrites_destination() {
        let mut fs = test_fs();
        fs.create(p("/f"), 0o644).expect("create f");
        fs.write(p("/f"), b"new", 0).expect("write f");
        fs.create(p("/g"), 0o644).expect("create g");
        fs.write(p("/g"), b"old contents", 0).expect("write g");

        fs.rename(p("/f"), p("/g")).expect("rename over");
        assert_eq!(fs.getattr(p("/f")), Err(FsError::NotFound));
        assert_eq!(fs.read(p("/g"), 16, 0).unwrap(), b"new".to_vec());
    }

    #[test]
    fn test_rename_overwriting_directory_keeps_link_counts() {
        let mut fs = test_fs();
        fs.mkdir(p("/victim"), 0o755).expect("mkdir victim");
        fs.create(p("/victim/inner"), 0o644).expect("populate victim");
        fs.mkdir(p("/mover"), 0o755).expect("mkdir mover");
        assert_eq!(fs.getattr(p("/")).unwrap().nlink, 4);

        fs.rename(p("/mover"), p("/victim")).expect("rename over dir");
        // One directory child remains under root; the victim subtree is gone.
        assert_eq!(fs.getattr(p("/")).unwrap().nlink, 3);
        assert_eq!(fs.getattr(p("/victim")).unwrap().nlink, 2);
        assert_eq!(fs.getattr(p("/victim/inner")), Err(FsError::NotFound));
        assert_eq!(fs.getattr(p("/mover")), Err(FsError::NotFound));
    }

    #[test]
    fn test_rename_into_own_subtree_rejected() {
        let mut fs = test_fs();
        fs.mkdir(p("/d"), 0o755).expect("mkdir");
        assert_eq!(fs.rename(p("/d"), p("/d/sub")), Err(FsError::InvalidArgument));
        // Nothing moved.
        assert!(fs.getattr(p("/d")).is_ok());
    }

    #[test]
    fn test_failed_rename_leaves_state_unchanged() {
        let mut fs = test_fs();
        fs.create(p("/f"), 0o644).expect("create");
        fs.write(p("/f"), b"payload", 0).expect("write");

        assert_eq!(fs.rename(p("/f"), p("/missing/g")), Err(FsError::NotFound));
        assert_eq!(fs.read(p("/f"), 7, 0).unwrap(), b"payload".to_vec());
    }

    #[test]
    fn test_symlink_and_readlink() {
        let mut fs = test_fs();
        fs.symlink(p("/link"), "/some/target").expect("symlink");

        let attrs = fs.getattr(p("/link")).expect("getattr");
        assert!(attrs.is_symlink);
        assert_eq!(attrs.len, "/some/target".len() as u64);
        assert_eq!(attrs.perm, 0o777);
        assert_eq!(fs.readlink(p("/link")).unwrap(), "/some/target");
        assert_eq!(fs.symlink(p("/link"), "/x"), Err(FsError::AlreadyExists));
    }

    #[test]
    fn test_readdir_includes_dot_entries_sorted() {
        let mut fs = test_fs();
        fs.mkdir(p("/d"), 0o755).expect("mkdir");
        fs.create(p("/d/zeta"), 0o644).expect("create zeta");
        fs.create(p("/d/alpha"), 0o644).expect("create alpha");
        fs.mkdir(p("/d/mid"), 0o755).expect("mkdir mid");

        let entries = fs.readdir(p("/d")).expect("readdir");
        assert_eq!(entries, vec![".", "..", "alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_readdir_plus_reports_kinds_and_sizes() {
        let mut fs = test_fs();
        fs.mkdir(p("/d"), 0o755).expect("mkdir");
        fs.create(p("/d/f"), 0o644).expect("create");
        fs.write(p("/d/f"), &[0; 42], 0).expect("write");
        fs.mkdir(p("/d/sub"), 0o755).expect("mkdir sub");

        let entries = fs.readdir_plus(p("/d")).expect("readdir_plus");
        assert_eq!(entries.len(), 2);
        let (entry, attrs) = &entries[0];
        assert_eq!(entry.name, "f");
        assert!(!entry.is_dir);
        assert_eq!(entry.len, 42);
        assert_eq!(attrs.len, 42);
        assert!(entries[1].0.is_dir);
    }

    #[test]
    fn test_xattr_round_trip() {
        let mut fs = test_fs();
        fs.create(p("/f"), 0o644).expect("create");

        fs.xattr_set(p("/f"), "user.a", b"one").expect("set a");
        fs.xattr_set(p("/f"), "user.b", b"two").expect("set b");
        assert_eq!(fs.xattr_get(p("/f"), "user.a").unwrap(), b"one".to_vec());
        assert_eq!(fs.xattr_list(p("/f")).unwrap(), vec!["user.a", "user.b"]);

        fs.xattr_remove(p("/f"), "user.a").expect("remove a");
        assert_eq!(fs.xattr_list(p("/f")).unwrap(), vec!["user.b"]);
    }

    #[test]
    fn test_missing_xattr_reads_empty_and_remove_is_noop() {
        let mut fs = test_fs();
        fs.create(p("/f"), 0o644).expect("create");

        assert_eq!(fs.xattr_get(p("/f"), "user.never"), Ok(Vec::new()));
        fs.xattr_remove(p("/f"), "user.never").expect("remove of missing is a no-op");
        assert_eq!(fs.xattr_get(p("/f"), "user.never"), Ok(Vec::new()));
        // But a missing node is still an error.
        assert_eq!(fs.xattr_get(p("/gone"), "user.x"), Err(FsError::NotFound));
    }

    #[test]
    fn test_set_mode_replaces_permission_bits_only() {
        let mut fs = test_fs();
        fs.create(p("/f"), 0o644).expect("create");
        fs.set_mode(p("/f"), 0o600).expect("chmod");

        let attrs = fs.getattr(p("/f")).unwrap();
        assert_eq!(attrs.perm, 0o600);
        assert_eq!(attrs.mode() & libc::S_IFMT as u32, libc::S_IFREG as u32);
    }

    #[test]
    fn test_set_owner_and_times() {
        let mut fs = test_fs();
        fs.create(p("/f"), 0o644).expect("create");

        fs.set_owner(p("/f"), 1000, 1000).expect("chown");
        fs.set_times(p("/f"), Some((11, 22))).expect("utimens");

        let attrs = fs.getattr(p("/f")).unwrap();
        assert_eq!(attrs.uid, 1000);
        assert_eq!(attrs.gid, 1000);
        assert_eq!(attrs.times.atime, 11);
        assert_eq!(attrs.times.mtime, 22);
    }

    #[test]
    fn test_statfs_reports_fixed_capacity() {
        let fs = test_fs();
        let stats = fs.statfs();
        assert_eq!(stats.block_size, 512);
        assert_eq!(stats.total_blocks, 4096);
        assert_eq!(stats.available_blocks, 2048);
    }

    #[test]
    fn test_rejects_zero_chunk_size() {
        let config = FsConfig {
            chunk_size: 0,
            ..FsConfig::default()
        };
        assert!(matches!(MemFs::new(config), Err(FsError::InvalidArgument)));
    }

    #[test]
    fn test_deep_tree_operations() {
        let mut fs = test_fs();
        fs.mkdir(p("/a"), 0o755).expect("a");
        fs.mkdir(p("/a/b"), 0o755).expect("b");
        fs.mkdir(p("/a/b/c"), 0o755).expect("c");
        fs.create(p("/a/b/c/leaf"), 0o644).expect("leaf");
        fs.write(p("/a/b/c/leaf"), b"deep", 0).expect("write");

        assert_eq!(fs.read(p("/a/b/c/leaf"), 4, 0).unwrap(), b"deep".to_vec());
        assert_eq!(fs.getattr(p("/a/b")).unwrap().nlink, 3);
        assert_eq!(fs.rmdir(p("/a/b")), Err(FsError::NotEmpty));
    }
}
