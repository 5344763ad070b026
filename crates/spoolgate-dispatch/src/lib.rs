// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// spoolgate-dispatch — Drives jobs through fetch, normalize, and submit, and
// feeds them in one at a time from the inbound message stream.

pub mod intake;
pub mod pipeline;

#[cfg(feature = "kafka")]
pub mod kafka;

pub use intake::{InboundMessage, IntakeLoop, IntakeStats, JobStream, StreamPosition};
pub use pipeline::JobPipeline;

#[cfg(feature = "kafka")]
pub use kafka::KafkaJobStream;
