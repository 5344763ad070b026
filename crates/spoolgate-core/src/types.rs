// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Spoolgate print dispatcher.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DispatchError, Result};

/// Correlation identifier for one pass through the job pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier assigned by the spooler when it accepts a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpoolJobId(pub i32);

impl std::fmt::Display for SpoolJobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of a single spooler submission.
pub type SubmissionResult = Result<SpoolJobId>;

/// Requested page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    /// IPP `orientation-requested` enum value (RFC 8011 §5.2.10).
    pub fn ipp_enum_value(&self) -> i32 {
        match self {
            Self::Portrait => 3,
            Self::Landscape => 4,
        }
    }

    /// Whether pages must be rotated before submission.
    pub fn needs_rotation(&self) -> bool {
        matches!(self, Self::Landscape)
    }
}

/// Duplex printing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplexMode {
    Simplex,
    LongEdge,
}

impl DuplexMode {
    pub fn from_flag(double_sided: bool) -> Self {
        if double_sided { Self::LongEdge } else { Self::Simplex }
    }

    /// IPP `sides` keyword (RFC 8011 §5.2.8).
    pub fn ipp_sides_keyword(&self) -> &'static str {
        match self {
            Self::Simplex => "one-sided",
            Self::LongEdge => "two-sided-long-edge",
        }
    }
}

/// CUPS `ColorModel` job option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorModel {
    Color,
    Grayscale,
}

impl ColorModel {
    pub fn from_flag(color: bool) -> Self {
        if color { Self::Color } else { Self::Grayscale }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Color => "Color",
            Self::Grayscale => "Grayscale",
        }
    }
}

/// Where the document for a job comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// An `http`/`https` URL that must be downloaded.
    Remote(String),
    /// A file already on this machine; printed in place.
    Local(PathBuf),
}

impl DocumentSource {
    /// Classify a `file_url` value.
    ///
    /// `http://` and `https://` are remote, `file://` URLs and bare paths are
    /// local. Any other scheme is rejected.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DispatchError::MalformedRequest("file_url is empty".into()));
        }

        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Ok(Self::Remote(trimmed.to_string()));
        }
        if lower.starts_with("file://") {
            let path = &trimmed["file://".len()..];
            if path.is_empty() {
                return Err(DispatchError::MalformedRequest(
                    "file_url has an empty file:// path".into(),
                ));
            }
            return Ok(Self::Local(PathBuf::from(path)));
        }
        if let Some((scheme, _)) = trimmed.split_once("://") {
            return Err(DispatchError::MalformedRequest(format!(
                "unsupported file_url scheme '{scheme}'"
            )));
        }

        Ok(Self::Local(PathBuf::from(trimmed)))
    }
}

impl std::fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote(url) => write!(f, "{url}"),
            Self::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Wire shape of an inbound queue message.
///
/// Every key is mandatory; unknown keys are ignored.
#[derive(Debug, Deserialize)]
struct JobMessage {
    file_url: String,
    quantity: u32,
    double_sided: bool,
    color: bool,
    position: Orientation,
}

/// Largest copy count the spooler's `copies` integer can carry.
pub const MAX_QUANTITY: u32 = i32::MAX as u32;

/// A validated description of one document to print.
///
/// Immutable once constructed. `quantity` is always in `1..=MAX_QUANTITY`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    source: DocumentSource,
    printer_name: String,
    quantity: u32,
    double_sided: bool,
    color: bool,
    orientation: Orientation,
}

impl JobRequest {
    pub fn new(
        source: DocumentSource,
        printer_name: impl Into<String>,
        quantity: u32,
        double_sided: bool,
        color: bool,
        orientation: Orientation,
    ) -> Result<Self> {
        if quantity == 0 {
            return Err(DispatchError::MalformedRequest(
                "quantity must be at least 1".into(),
            ));
        }
        if quantity > MAX_QUANTITY {
            return Err(DispatchError::MalformedRequest(format!(
                "quantity {quantity} exceeds the maximum of {MAX_QUANTITY}"
            )));
        }
        let printer_name = printer_name.into();
        if printer_name.trim().is_empty() {
            return Err(DispatchError::MalformedRequest(
                "printer name is empty".into(),
            ));
        }

        Ok(Self {
            source,
            printer_name,
            quantity,
            double_sided,
            color,
            orientation,
        })
    }

    /// Decode one queue payload (UTF-8 JSON) into a request for `printer_name`.
    pub fn from_message(payload: &[u8], printer_name: &str) -> Result<Self> {
        let text = std::str::from_utf8(payload).map_err(|e| {
            DispatchError::MalformedRequest(format!("payload is not UTF-8: {e}"))
        })?;
        let message: JobMessage = serde_json::from_str(text)
            .map_err(|e| DispatchError::MalformedRequest(e.to_string()))?;

        Self::new(
            DocumentSource::parse(&message.file_url)?,
            printer_name,
            message.quantity,
            message.double_sided,
            message.color,
            message.position,
        )
    }

    pub fn source(&self) -> &DocumentSource {
        &self.source
    }

    pub fn printer_name(&self) -> &str {
        &self.printer_name
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn double_sided(&self) -> bool {
        self.double_sided
    }

    pub fn color(&self) -> bool {
        self.color
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }
}

/// Spooler-vocabulary projection of a [`JobRequest`]. Recomputed per job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintOptions {
    pub copies: String,
    pub sides: DuplexMode,
    pub color_model: ColorModel,
    /// Present only for landscape jobs.
    pub orientation: Option<Orientation>,
}

impl PrintOptions {
    pub fn from_request(request: &JobRequest) -> Self {
        Self {
            copies: request.quantity().to_string(),
            sides: DuplexMode::from_flag(request.double_sided()),
            color_model: ColorModel::from_flag(request.color()),
            orientation: request
                .orientation()
                .needs_rotation()
                .then_some(request.orientation()),
        }
    }

    /// Option name/value pairs as the CUPS spooler knows them.
    pub fn as_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("copies", self.copies.clone()),
            ("sides", self.sides.ipp_sides_keyword().to_string()),
            ("ColorModel", self.color_model.keyword().to_string()),
        ];
        if let Some(orientation) = self.orientation {
            pairs.push((
                "orientation-requested",
                orientation.ipp_enum_value().to_string(),
            ));
        }
        pairs
    }
}

/// Lifecycle states of one pass through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Received,
    Fetching,
    Normalizing,
    Submitting,
    Done,
    Failed,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Received => "received",
            Self::Fetching => "fetching",
            Self::Normalizing => "normalizing",
            Self::Submitting => "submitting",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Terminal report for one job.
#[derive(Debug)]
pub enum JobOutcome {
    Done {
        job_id: JobId,
        spool_job_id: SpoolJobId,
    },
    Failed {
        job_id: JobId,
        /// State the job was in when it failed.
        stage: JobState,
        error: DispatchError,
    },
}

impl JobOutcome {
    pub fn job_id(&self) -> JobId {
        match self {
            Self::Done { job_id, .. } | Self::Failed { job_id, .. } => *job_id,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }

    pub fn state(&self) -> JobState {
        match self {
            Self::Done { .. } => JobState::Done,
            Self::Failed { .. } => JobState::Failed,
        }
    }
}
