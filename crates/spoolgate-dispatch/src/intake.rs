// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Intake loop: pulls job messages off the inbound stream one at a time.
//
// Strictly sequential: a message is fully processed (fetch, normalize,
// submit, cleanup) before the next is pulled, followed by a fixed pause that
// keeps bursts off the physical printer. Progress is committed according to
// the configured `CommitPolicy`. The loop stops on the shutdown signal or
// when the stream ends, and closes the stream as its last act.
//
// A stream commits one position per partition, so under `AfterSuccess` a
// partition stops advancing at its first failed job. Consumption resumes from
// that job after a restart; later jobs of the partition are redelivered too.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use tracing::{error, info, warn};

use spoolgate_core::config::CommitPolicy;
use spoolgate_core::error::Result;
use spoolgate_print::Spooler;

use crate::pipeline::JobPipeline;

/// Where a message sits in the inbound stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamPosition {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

/// One message taken off the stream.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub payload: Vec<u8>,
    pub position: StreamPosition,
}

/// An at-least-once inbound stream of job payloads with manual progress
/// marking.
pub trait JobStream {
    /// Wait for the next message. `None` means the stream has ended.
    fn next_message(&mut self) -> impl Future<Output = Option<Result<InboundMessage>>>;

    /// Mark `message` as consumed.
    fn commit(&mut self, message: &InboundMessage) -> Result<()>;

    /// Release the connection. Called once, when the loop stops.
    fn close(&mut self);
}

/// Counters reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntakeStats {
    pub received: u64,
    pub done: u64,
    pub failed: u64,
    pub committed: u64,
    pub stream_errors: u64,
}

/// The unbounded control loop feeding the job pipeline.
pub struct IntakeLoop<St, S> {
    stream: St,
    pipeline: JobPipeline<S>,
    job_delay: Duration,
    commit_policy: CommitPolicy,
}

impl<St: JobStream, S: Spooler> IntakeLoop<St, S> {
    pub fn new(
        stream: St,
        pipeline: JobPipeline<S>,
        job_delay: Duration,
        commit_policy: CommitPolicy,
    ) -> Self {
        Self {
            stream,
            pipeline,
            job_delay,
            commit_policy,
        }
    }

    /// Run until `shutdown` resolves or the stream ends.
    ///
    /// Shutdown is observed while waiting for a message and during the pause
    /// between jobs; a job already in progress runs to completion first.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> IntakeStats {
        tokio::pin!(shutdown);
        let mut stats = IntakeStats::default();
        // (topic, partition) pairs whose progress is frozen at a failed job.
        let mut held: HashSet<(String, i32)> = HashSet::new();
        info!(
            printer = self.pipeline.printer_name(),
            delay_ms = self.job_delay.as_millis() as u64,
            policy = ?self.commit_policy,
            "intake loop started"
        );

        loop {
            let next = tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
                next = self.stream.next_message() => next,
            };

            match next {
                None => {
                    info!("message stream ended");
                    break;
                }
                Some(Err(e)) => {
                    stats.stream_errors += 1;
                    error!(error = %e, "failed to receive message");
                }
                Some(Ok(message)) => {
                    stats.received += 1;
                    let outcome = self.pipeline.process_message(&message.payload).await;
                    if outcome.is_done() {
                        stats.done += 1;
                    } else {
                        stats.failed += 1;
                    }

                    let should_commit = match self.commit_policy {
                        CommitPolicy::Always => true,
                        CommitPolicy::AfterSuccess => {
                            let key = (message.position.topic.clone(), message.position.partition);
                            if outcome.is_done() {
                                !held.contains(&key)
                            } else {
                                if held.insert(key) {
                                    warn!(
                                        partition = message.position.partition,
                                        offset = message.position.offset,
                                        "holding partition progress at failed job"
                                    );
                                }
                                false
                            }
                        }
                    };
                    if should_commit {
                        match self.stream.commit(&message) {
                            Ok(()) => stats.committed += 1,
                            Err(e) => warn!(
                                error = %e,
                                offset = message.position.offset,
                                "failed to commit stream progress"
                            ),
                        }
                    }
                }
            }

            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
                _ = tokio::time::sleep(self.job_delay) => {}
            }
        }

        self.stream.close();
        info!(?stats, "intake loop stopped");
        stats
    }
}
