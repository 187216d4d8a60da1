// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for the memfs storage engine

/// Core filesystem error type
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum FsError {
    #[error("not found")]
    NotFound,
    #[error("directory not empty")]
    NotEmpty,
    #[error("already exists")]
    AlreadyExists,
    #[error("not a directory")]
    NotADirectory,
    #[error("is a directory")]
    IsADirectory,
    #[error("not a regular file")]
    NotAFile,
    #[error("not a symlink")]
    NotASymlink,
    /// Internal signal only: the public xattr surface reports a missing
    /// attribute as an empty value / silent no-op, never as this error.
    #[error("attribute not found")]
    AttributeNotFound,
    #[error("invalid argument")]
    InvalidArgument,
}

pub type FsResult<T> = Result<T, FsError>;

impl FsError {
    /// errno mapping used by the virtual-filesystem bridge.
    pub fn to_errno(&self) -> i32 {
        match self {
            FsError::NotFound => libc::ENOENT,
            FsError::NotEmpty => libc::ENOTEMPTY,
            FsError::AlreadyExists => libc::EEXIST,
            FsError::NotADirectory => libc::ENOTDIR,
            FsError::IsADirectory => libc::EISDIR,
            FsError::NotAFile => libc::EINVAL,
            FsError::NotASymlink => libc::EINVAL,
            FsError::AttributeNotFound => libc::ENODATA,
            FsError::InvalidArgument => libc::EINVAL,
        }
    }
}
