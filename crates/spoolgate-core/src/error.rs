// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Spoolgate.

use thiserror::Error;

/// Top-level error type for all Spoolgate operations.
///
/// Every variant raised while processing a single job is caught at the
/// pipeline boundary and turns the job into a skipped job; none of them stop
/// the intake loop.
#[derive(Debug, Error)]
pub enum DispatchError {
    // -- Job intake --
    #[error("malformed job request: {0}")]
    MalformedRequest(String),

    // -- Document errors --
    #[error("document download failed: {0}")]
    Download(String),

    #[error("document transform failed: {0}")]
    Transform(String),

    // -- Spooler errors --
    #[error("printer '{0}' not found")]
    PrinterNotFound(String),

    #[error("print submission failed: {0}")]
    Submission(String),

    // -- Process plumbing --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("message stream error: {0}")]
    Stream(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatchError {
    /// Stable short label for structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedRequest(_) => "malformed_request",
            Self::Download(_) => "download",
            Self::Transform(_) => "transform",
            Self::PrinterNotFound(_) => "printer_not_found",
            Self::Submission(_) => "submission",
            Self::Config(_) => "config",
            Self::Stream(_) => "stream",
            Self::Io(_) => "io",
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DispatchError>;
