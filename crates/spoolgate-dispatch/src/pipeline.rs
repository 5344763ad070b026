// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job pipeline: takes one job description through
//
//   Received → Fetching → (Normalizing) → Submitting → Done
//
// with any state able to drop to Failed. Errors never leave `process`: they
// are logged with the job id and turned into a `JobOutcome::Failed`.
// Transient files are owned by `LocalDocument` handles local to one run, so
// every exit path (success, error, panic in the blocking normalizer) removes
// them.

use tracing::{Instrument, debug, info, info_span, warn};

use spoolgate_core::error::{DispatchError, Result};
use spoolgate_core::{
    DispatcherConfig, JobId, JobOutcome, JobRequest, JobState, PrintOptions, SpoolJobId,
};
use spoolgate_document::{DocumentFetcher, GeometryNormalizer};
use spoolgate_print::{Spooler, SpoolerSubmitter};

/// Longest payload excerpt written to the log for a received message.
const LOGGED_PAYLOAD_CHARS: usize = 512;

/// Orchestrates fetch, normalize, submit, and cleanup for one job at a time.
pub struct JobPipeline<S> {
    /// Fixed target printer for every job.
    printer_name: String,
    fetcher: DocumentFetcher,
    normalizer: GeometryNormalizer,
    submitter: SpoolerSubmitter<S>,
}

impl<S: Spooler> JobPipeline<S> {
    /// Build a pipeline from configuration and a spooler.
    pub fn new(config: &DispatcherConfig, spooler: S) -> Result<Self> {
        let temp_dir = config.pipeline.temp_dir();
        let fetcher = DocumentFetcher::new(
            temp_dir.clone(),
            config.pipeline.temp_suffix.clone(),
            config.pipeline.download_timeout(),
        )?;
        let normalizer = GeometryNormalizer::new(temp_dir, &config.pipeline.temp_suffix);

        Ok(Self {
            printer_name: config.printer.name.clone(),
            fetcher,
            normalizer,
            submitter: SpoolerSubmitter::new(spooler, config.printer.job_title.clone()),
        })
    }

    pub fn printer_name(&self) -> &str {
        &self.printer_name
    }

    pub fn spooler(&self) -> &S {
        self.submitter.spooler()
    }

    /// Decode a raw queue payload and process it.
    pub async fn process_message(&self, payload: &[u8]) -> JobOutcome {
        let job_id = JobId::new();
        let excerpt: String = String::from_utf8_lossy(payload)
            .chars()
            .take(LOGGED_PAYLOAD_CHARS)
            .collect();
        info!(%job_id, payload = %excerpt, "received message");

        match JobRequest::from_message(payload, &self.printer_name) {
            Ok(request) => self.process_with_id(job_id, request).await,
            Err(error) => fail(job_id, JobState::Received, error),
        }
    }

    /// Process one request to completion. Never returns an error; failures
    /// are reported through the outcome.
    pub async fn process(&self, request: JobRequest) -> JobOutcome {
        self.process_with_id(JobId::new(), request).await
    }

    async fn process_with_id(&self, job_id: JobId, request: JobRequest) -> JobOutcome {
        let span = info_span!("job", %job_id, printer = %request.printer_name());
        async {
            let mut state = JobState::Received;
            match self.run(&request, &mut state).await {
                Ok(spool_job_id) => {
                    info!(%spool_job_id, "job done");
                    JobOutcome::Done {
                        job_id,
                        spool_job_id,
                    }
                }
                Err(error) => fail(job_id, state, error),
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, request: &JobRequest, state: &mut JobState) -> Result<SpoolJobId> {
        *state = JobState::Fetching;
        info!(source = %request.source(), "fetching document");
        let fetched = self.fetcher.fetch(request.source()).await?;

        let orientation = request.orientation();
        let (fetched, rotated) = if orientation.needs_rotation() {
            *state = JobState::Normalizing;
            let normalizer = self.normalizer.clone();
            let (fetched, rotated) = tokio::task::spawn_blocking(move || {
                let rotated = normalizer.normalize(&fetched, orientation);
                (fetched, rotated)
            })
            .await
            .map_err(|e| DispatchError::Transform(format!("normalizer task failed: {e}")))?;
            (fetched, rotated?)
        } else {
            (fetched, None)
        };

        *state = JobState::Submitting;
        let document = rotated.as_ref().unwrap_or(&fetched);
        let options = PrintOptions::from_request(request);
        debug!(path = %document.path().display(), options = ?options.as_pairs(), "submitting");
        let result = self
            .submitter
            .submit(document.path(), request.printer_name(), &options)
            .await;

        if let Some(rotated) = rotated {
            rotated.close();
        }
        fetched.close();
        result
    }
}

fn fail(job_id: JobId, stage: JobState, error: DispatchError) -> JobOutcome {
    warn!(%job_id, %stage, kind = error.kind(), %error, "job skipped");
    JobOutcome::Failed {
        job_id,
        stage,
        error,
    }
}
