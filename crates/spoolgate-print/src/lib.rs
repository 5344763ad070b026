// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spoolgate Print — IPP client for a CUPS spooler and the submission step of
// the job pipeline.  This crate bridges between the core domain types defined
// in `spoolgate-core` and the actual printing infrastructure.

pub mod ipp_client;
pub mod submitter;

pub use ipp_client::IppClient;
pub use submitter::{CupsSpooler, Spooler, SpoolerSubmitter};
