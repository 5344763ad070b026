// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometry normalizer: rewrites page orientation for landscape jobs.
//
// The spooler cannot be relied on to lay portrait pages out sideways, so
// landscape documents are rewritten with every page rotated a quarter turn
// before submission. The input file is never modified.

use std::io::Write;
use std::path::PathBuf;

use tracing::{debug, info, instrument};

use spoolgate_core::Orientation;
use spoolgate_core::error::Result;

use crate::document::{LocalDocument, OrientationState};
use crate::fetch::TEMP_PREFIX;
use crate::pdf::PdfReader;

/// Quarter turn clockwise. Fixed.
pub const LANDSCAPE_ROTATION_DEGREES: i32 = 90;

/// Produces landscape-ready copies of documents.
///
/// All methods are synchronous because `lopdf` is. In an async context, wrap
/// calls in `tokio::task::spawn_blocking`.
#[derive(Debug, Clone)]
pub struct GeometryNormalizer {
    temp_dir: PathBuf,
    suffix: String,
}

impl GeometryNormalizer {
    pub fn new(temp_dir: impl Into<PathBuf>, suffix: &str) -> Self {
        Self {
            temp_dir: temp_dir.into(),
            suffix: format!("-rotated{suffix}"),
        }
    }

    /// Normalize `document` for `orientation`.
    ///
    /// Returns `None` when no rewrite is needed (portrait). Otherwise returns
    /// a new owned document at a distinct path with every page rotated. On
    /// error no output file exists.
    #[instrument(skip(self, document), fields(path = %document.path().display()))]
    pub fn normalize(
        &self,
        document: &LocalDocument,
        orientation: Orientation,
    ) -> Result<Option<LocalDocument>> {
        if !orientation.needs_rotation() {
            debug!(?orientation, "no rotation needed");
            return Ok(None);
        }

        let reader = PdfReader::open(document.path())?;
        let page_count = reader.page_count();
        let rotated = reader.rotate_all(LANDSCAPE_ROTATION_DEGREES)?;

        let mut output = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(&self.suffix)
            .tempfile_in(&self.temp_dir)?;
        output.write_all(&rotated)?;
        output.as_file().sync_all()?;
        let temp_path = output.into_temp_path();

        info!(
            pages = page_count,
            output = %temp_path.display(),
            "rotated document written"
        );
        Ok(Some(LocalDocument::owned(
            temp_path,
            OrientationState::Rotated,
            None,
        )))
    }
}
