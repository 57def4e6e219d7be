use std::sync::Arc;

use crate::{config::DecodePolicy, models::Catalog, services::sink::MatchSink};

/// Everything batch processing needs, built once at startup.
///
/// Cloning is cheap; the catalog and sink are shared.
#[derive(Clone)]
pub struct PipelineContext {
    pub catalog: Arc<Catalog>,
    pub sink: Arc<dyn MatchSink>,
    pub decode_policy: DecodePolicy,
}

impl PipelineContext {
    pub fn new(catalog: Arc<Catalog>, sink: Arc<dyn MatchSink>, decode_policy: DecodePolicy) -> Self {
        Self {
            catalog,
            sink,
            decode_policy,
        }
    }
}
