use serde::Serialize;

/// One message as delivered by an event source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Message value; `None` for tombstones
    pub payload: Option<Vec<u8>>,
    pub partition: i32,
    pub offset: i64,
}

impl RawMessage {
    pub fn new(payload: Option<Vec<u8>>, partition: i32, offset: i64) -> Self {
        Self {
            payload,
            partition,
            offset,
        }
    }

    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }
}

/// A finite group of messages processed together
#[derive(Debug, Clone)]
pub struct MicroBatch {
    /// Sequential id, starting at 0 for the first batch of a run
    pub id: u64,
    pub messages: Vec<RawMessage>,
}

impl MicroBatch {
    pub fn new(id: u64, messages: Vec<RawMessage>) -> Self {
        Self { id, messages }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Counters for one processed batch
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct BatchReport {
    pub batch_id: u64,
    /// Events handed to the matcher
    pub events: usize,
    /// Records skipped by the decode policy
    pub dropped: usize,
    /// Total matching rows across all events
    pub matches: usize,
}
