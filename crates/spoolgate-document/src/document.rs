// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Local document handle with scoped ownership of transient files.

use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tracing::{debug, warn};

/// Whether the pages of a document have been rewritten for landscape output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationState {
    Unrotated,
    Rotated,
}

/// A printable file on the local filesystem.
///
/// When the file was created by this process the handle owns it: dropping
/// the handle deletes the file, on every exit path. Files that already
/// existed (local job sources) are never deleted.
#[derive(Debug)]
pub struct LocalDocument {
    path: PathBuf,
    state: OrientationState,
    /// Present only for files this process created.
    temp: Option<TempPath>,
    /// Hex SHA-256 of the bytes, when computed during acquisition.
    sha256: Option<String>,
}

impl LocalDocument {
    /// Wrap a file that already exists. It will not be deleted.
    pub fn borrowed(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: OrientationState::Unrotated,
            temp: None,
            sha256: None,
        }
    }

    /// Take ownership of a transient file.
    pub fn owned(temp: TempPath, state: OrientationState, sha256: Option<String>) -> Self {
        Self {
            path: temp.to_path_buf(),
            state,
            temp: Some(temp),
            sha256,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> OrientationState {
        self.state
    }

    /// Whether dropping this handle removes the file.
    pub fn is_owned(&self) -> bool {
        self.temp.is_some()
    }

    pub fn sha256(&self) -> Option<&str> {
        self.sha256.as_deref()
    }

    /// Delete an owned file now, reporting failures instead of ignoring them
    /// as `Drop` would. A no-op for borrowed files.
    pub fn close(mut self) {
        if let Some(temp) = self.temp.take() {
            match temp.close() {
                Ok(()) => debug!(path = %self.path.display(), "transient document removed"),
                Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove transient document"),
            }
        }
    }
}
