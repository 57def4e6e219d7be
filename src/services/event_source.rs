//! Event sources feeding the stream driver
//!
//! A source hands out micro-batches of raw messages. Batching policy: a batch
//! opens on the first available message and closes once it holds
//! `max_batch_size` messages or `trigger_interval` has passed since it opened.

use std::{pin::pin, sync::Arc, time::Duration};

use futures::{Stream, StreamExt};
use rdkafka::{
    consumer::{CommitMode, Consumer, StreamConsumer},
    error::KafkaError,
    message::BorrowedMessage,
    ClientConfig, Message,
};
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};

use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::RawMessage,
};

/// Trait for sources of preference messages
#[async_trait::async_trait]
pub trait EventSource: Send {
    /// Register interest in the source's topic
    async fn subscribe(&mut self) -> AppResult<()>;

    /// Wait for the next micro-batch.
    ///
    /// Returns `None` once the source is exhausted and will never produce again.
    async fn next_batch(&mut self) -> AppResult<Option<Vec<RawMessage>>>;

    /// Acknowledge everything handed out so far
    async fn commit(&mut self) -> AppResult<()> {
        Ok(())
    }

    /// Source name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Groups a message stream into micro-batches.
///
/// Messages of the batch being collected are held here, so dropping a
/// `next_batch` future part way loses nothing; the next call resumes the same
/// batch with its original deadline.
#[derive(Debug)]
pub struct MicroBatcher {
    trigger_interval: Duration,
    max_batch_size: usize,
    pending: Vec<RawMessage>,
    deadline: Option<Instant>,
}

impl MicroBatcher {
    pub fn new(trigger_interval: Duration, max_batch_size: usize) -> Self {
        Self {
            trigger_interval,
            max_batch_size,
            pending: Vec::new(),
            deadline: None,
        }
    }

    /// Messages collected for the unfinished batch
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Waits for a first message, then collects until the batch is full or
    /// `trigger_interval` has passed since that first message.
    ///
    /// Returns `None` when the stream has ended and nothing is pending.
    pub async fn next_batch<S>(&mut self, messages: &mut S) -> AppResult<Option<Vec<RawMessage>>>
    where
        S: Stream<Item = AppResult<RawMessage>> + Unpin,
    {
        if self.pending.is_empty() {
            match messages.next().await {
                Some(message) => self.pending.push(message?),
                None => return Ok(None),
            }
        }

        let deadline = *self
            .deadline
            .get_or_insert_with(|| Instant::now() + self.trigger_interval);
        while self.pending.len() < self.max_batch_size {
            match timeout_at(deadline, messages.next()).await {
                Ok(Some(message)) => self.pending.push(message?),
                // Stream ended or the interval ran out
                Ok(None) | Err(_) => break,
            }
        }

        self.deadline = None;
        Ok(Some(std::mem::take(&mut self.pending)))
    }
}

/// Kafka consumer-group source
pub struct KafkaEventSource {
    consumer: Arc<StreamConsumer>,
    topic: String,
    metadata_timeout: Duration,
    batcher: MicroBatcher,
}

impl KafkaEventSource {
    /// Creates the consumer. No broker traffic happens until [`EventSource::subscribe`].
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.kafka_bootstrap_servers)
            .set("group.id", &config.kafka_group_id)
            .set("auto.offset.reset", config.kafka_offset_reset.as_str())
            .set("enable.auto.commit", "false")
            .set("enable.partition.eof", "false")
            .create()
            .map_err(|e| AppError::Connect(format!("failed to create consumer: {}", e)))?;

        Ok(Self {
            consumer: Arc::new(consumer),
            topic: config.kafka_topic.clone(),
            metadata_timeout: config.kafka_metadata_timeout(),
            batcher: MicroBatcher::new(config.trigger_interval(), config.max_batch_size),
        })
    }

    fn source_error(e: KafkaError) -> AppError {
        AppError::EventSource(e.to_string())
    }
}

fn to_raw(message: &BorrowedMessage<'_>) -> RawMessage {
    RawMessage::new(
        message.payload().map(<[u8]>::to_vec),
        message.partition(),
        message.offset(),
    )
}

#[async_trait::async_trait]
impl EventSource for KafkaEventSource {
    async fn subscribe(&mut self) -> AppResult<()> {
        // Metadata fetch blocks until the broker answers or the timeout passes
        let consumer = Arc::clone(&self.consumer);
        let topic = self.topic.clone();
        let timeout = self.metadata_timeout;
        tokio::task::spawn_blocking(move || consumer.fetch_metadata(Some(topic.as_str()), timeout))
            .await
            .map_err(|e| AppError::Internal(format!("metadata task failed: {}", e)))?
            .map_err(|e| AppError::Connect(format!("broker unreachable: {}", e)))?;

        self.consumer
            .subscribe(&[self.topic.as_str()])
            .map_err(|e| AppError::Connect(format!("subscribe to {} failed: {}", self.topic, e)))?;

        tracing::info!(topic = %self.topic, "Subscribed to Kafka topic");
        Ok(())
    }

    async fn next_batch(&mut self) -> AppResult<Option<Vec<RawMessage>>> {
        let mut messages = pin!(self
            .consumer
            .stream()
            .map(|result| result.map(|message| to_raw(&message)).map_err(Self::source_error)));
        self.batcher.next_batch(&mut messages).await
    }

    async fn commit(&mut self) -> AppResult<()> {
        match self.consumer.commit_consumer_state(CommitMode::Async) {
            Ok(()) => Ok(()),
            // Nothing consumed since the last commit
            Err(KafkaError::ConsumerCommit(rdkafka::types::RDKafkaErrorCode::NoOffset)) => Ok(()),
            Err(e) => Err(Self::source_error(e)),
        }
    }

    fn name(&self) -> &'static str {
        "kafka"
    }
}

/// In-process source fed through [`ChannelEventSender`].
///
/// Each `send_batch` call becomes exactly one micro-batch.
pub struct ChannelEventSource {
    receiver: mpsc::Receiver<Vec<RawMessage>>,
}

/// Producer half of [`ChannelEventSource`]
#[derive(Clone)]
pub struct ChannelEventSender {
    sender: mpsc::Sender<Vec<RawMessage>>,
}

impl ChannelEventSource {
    pub fn new(capacity: usize) -> (ChannelEventSender, Self) {
        let (sender, receiver) = mpsc::channel(capacity);
        (ChannelEventSender { sender }, Self { receiver })
    }
}

impl ChannelEventSender {
    /// Queue raw payloads as one batch; offsets count from zero within the batch
    pub async fn send_batch<I, P>(&self, payloads: I) -> AppResult<()>
    where
        I: IntoIterator<Item = P>,
        P: Into<Vec<u8>>,
    {
        let messages = payloads
            .into_iter()
            .enumerate()
            .map(|(offset, payload)| RawMessage::new(Some(payload.into()), 0, offset as i64))
            .collect();
        self.send_messages(messages).await
    }

    pub async fn send_messages(&self, messages: Vec<RawMessage>) -> AppResult<()> {
        self.sender
            .send(messages)
            .await
            .map_err(|_| AppError::EventSource("channel source closed".to_string()))
    }
}

#[async_trait::async_trait]
impl EventSource for ChannelEventSource {
    async fn subscribe(&mut self) -> AppResult<()> {
        Ok(())
    }

    async fn next_batch(&mut self) -> AppResult<Option<Vec<RawMessage>>> {
        Ok(self.receiver.recv().await)
    }

    fn name(&self) -> &'static str {
        "channel"
    }
}
