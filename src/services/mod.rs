pub mod catalog;
pub mod decoder;
pub mod driver;
pub mod event_source;
pub mod matcher;
pub mod sink;

pub use catalog::{load_catalog, CatalogSource, ObjectStoreCatalogSource};
pub use decoder::{decode, decode_with_policy, DecodeAnomaly};
pub use driver::{DriverHandle, DriverState, DriverStatus, StatusHandle, StreamDriver};
pub use event_source::{
    ChannelEventSender, ChannelEventSource, EventSource, KafkaEventSource,
    MicroBatcher,
};
pub use matcher::{match_event, process_batch};
pub use sink::{LogSink, MatchSink};
