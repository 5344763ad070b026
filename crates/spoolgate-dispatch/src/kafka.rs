// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Kafka-backed job stream (behind the "kafka" feature).
//
// Offsets are committed by the client's background auto-commit, but only
// offsets the intake loop has explicitly stored are eligible
// (`enable.auto.offset.store = false`). Closing commits whatever is stored
// synchronously before leaving the consumer group.

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::topic_partition_list::{Offset, TopicPartitionList};
use tracing::{debug, info, instrument, warn};

use spoolgate_core::config::StreamConfig;
use spoolgate_core::error::{DispatchError, Result};

use crate::intake::{InboundMessage, JobStream, StreamPosition};

/// [`JobStream`] reading one topic as a member of a consumer group.
pub struct KafkaJobStream {
    consumer: StreamConsumer,
    topic: String,
}

impl KafkaJobStream {
    /// Connect to `bootstrap_servers` and subscribe to the configured topic.
    #[instrument(skip(config), fields(topic = %config.topic, group = %config.group_id))]
    pub fn connect(config: &StreamConfig, bootstrap_servers: &str) -> Result<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers)
            .set("group.id", &config.group_id)
            .set("auto.offset.reset", &config.auto_offset_reset)
            .set("enable.auto.commit", "true")
            .set("enable.auto.offset.store", "false")
            .create()
            .map_err(|e| DispatchError::Stream(format!("create consumer: {e}")))?;

        consumer
            .subscribe(&[config.topic.as_str()])
            .map_err(|e| DispatchError::Stream(format!("subscribe to {}: {e}", config.topic)))?;

        info!("subscribed to message stream");
        Ok(Self {
            consumer,
            topic: config.topic.clone(),
        })
    }
}

impl JobStream for KafkaJobStream {
    async fn next_message(&mut self) -> Option<Result<InboundMessage>> {
        let result = match self.consumer.recv().await {
            Ok(message) => {
                let inbound = InboundMessage {
                    payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
                    position: StreamPosition {
                        topic: message.topic().to_string(),
                        partition: message.partition(),
                        offset: message.offset(),
                    },
                };
                debug!(
                    partition = inbound.position.partition,
                    offset = inbound.position.offset,
                    bytes = inbound.payload.len(),
                    "message received"
                );
                Ok(inbound)
            }
            Err(e) => Err(DispatchError::Stream(format!("receive from {}: {e}", self.topic))),
        };
        Some(result)
    }

    fn commit(&mut self, message: &InboundMessage) -> Result<()> {
        let position = &message.position;
        // The committed offset names the next message to read.
        let mut offsets = TopicPartitionList::new();
        offsets
            .add_partition_offset(
                &position.topic,
                position.partition,
                Offset::Offset(position.offset + 1),
            )
            .map_err(|e| DispatchError::Stream(format!("offset list: {e}")))?;
        self.consumer
            .store_offsets(&offsets)
            .map_err(|e| DispatchError::Stream(format!("store offset: {e}")))
    }

    fn close(&mut self) {
        if let Err(e) = self.consumer.commit_consumer_state(CommitMode::Sync) {
            // Nothing stored yet is reported as an error by the client.
            warn!(error = %e, "final offset commit failed");
        }
        self.consumer.unsubscribe();
        info!(topic = %self.topic, "message stream closed");
    }
}
