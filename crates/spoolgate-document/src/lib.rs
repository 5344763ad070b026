// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// spoolgate-document — Turns a job's document reference into a printable
// local file.
//
// Provides the fetcher (remote download into a transient file), the PDF page
// rotation primitive, and the geometry normalizer that applies it for
// landscape jobs.

pub mod document;
pub mod fetch;
pub mod normalize;
pub mod pdf;

pub use document::{LocalDocument, OrientationState};
pub use fetch::DocumentFetcher;
pub use normalize::GeometryNormalizer;
pub use pdf::PdfReader;
