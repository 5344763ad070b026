// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spooler submission: the last step of the job pipeline.
//
// The printer registry is queried fresh for every submission; there is no
// cache. A printer missing from the registry short-circuits before the
// spooler is asked to print anything. Submission is fire-and-forget: the
// spooler's job id is returned on acceptance and physical completion is not
// tracked. Failures are reported, never retried.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use tracing::{info, instrument, warn};

use spoolgate_core::error::{DispatchError, Result};
use spoolgate_core::{PrintOptions, SpoolJobId, SubmissionResult};

use crate::ipp_client::{IppClient, document_format_for};

/// A print spooler: a printer registry plus a print-file command.
pub trait Spooler {
    /// Names of the printers currently available.
    fn printers(&self) -> impl Future<Output = Result<Vec<String>>>;

    /// Hand a file to the spooler. Resolves once the spooler has accepted
    /// (or rejected) the job.
    fn print_file(
        &self,
        printer_name: &str,
        path: &Path,
        job_title: &str,
        options: &PrintOptions,
    ) -> impl Future<Output = SubmissionResult>;
}

/// [`Spooler`] backed by a CUPS server over IPP.
///
/// Every call is bounded by `timeout`; an expired call is a submission
/// failure.
pub struct CupsSpooler {
    client: IppClient,
    timeout: Duration,
}

impl CupsSpooler {
    pub fn new(cups_uri: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: IppClient::new(cups_uri)?,
            timeout,
        })
    }

    async fn bounded<T>(&self, what: &str, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.timeout, call).await.map_err(|_| {
            DispatchError::Submission(format!(
                "{what} timed out after {}s",
                self.timeout.as_secs()
            ))
        })?
    }
}

impl Spooler for CupsSpooler {
    async fn printers(&self) -> Result<Vec<String>> {
        self.bounded("CUPS-Get-Printers", self.client.get_printers())
            .await
    }

    async fn print_file(
        &self,
        printer_name: &str,
        path: &Path,
        job_title: &str,
        options: &PrintOptions,
    ) -> SubmissionResult {
        let document_bytes = tokio::fs::read(path).await?;
        let format = document_format_for(path);
        let job_id = self
            .bounded(
                "Print-Job",
                self.client
                    .print_job(printer_name, document_bytes, format, job_title, options),
            )
            .await?;
        Ok(SpoolJobId(job_id))
    }
}

/// Validates the target printer and submits a normalized document.
pub struct SpoolerSubmitter<S> {
    spooler: S,
    job_title: String,
}

impl<S: Spooler> SpoolerSubmitter<S> {
    pub fn new(spooler: S, job_title: impl Into<String>) -> Self {
        Self {
            spooler,
            job_title: job_title.into(),
        }
    }

    pub fn spooler(&self) -> &S {
        &self.spooler
    }

    /// Submit `path` to `printer_name` with `options`.
    ///
    /// Returns `PrinterNotFound` without contacting the spooler's print
    /// command when the printer is absent from the current registry.
    #[instrument(skip(self, options), fields(path = %path.display()))]
    pub async fn submit(
        &self,
        path: &Path,
        printer_name: &str,
        options: &PrintOptions,
    ) -> SubmissionResult {
        let printers = self.spooler.printers().await?;
        if !printers.iter().any(|p| p == printer_name) {
            warn!(printer = printer_name, available = ?printers, "printer not found");
            return Err(DispatchError::PrinterNotFound(printer_name.to_string()));
        }

        let job_id = self
            .spooler
            .print_file(printer_name, path, &self.job_title, options)
            .await?;
        info!(printer = printer_name, %job_id, "print job submitted");
        Ok(job_id)
    }
}
