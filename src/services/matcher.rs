use crate::{
    context::PipelineContext,
    error::{AppError, AppResult},
    models::{BatchReport, Catalog, CatalogEntry, MicroBatch, PreferenceEvent},
    services::decoder::decode_with_policy,
};

/// Catalog entries whose `(genre, artist_name, language)` equals the event's
/// `(genre, artist, language)`.
///
/// Comparison is exact and case-sensitive. An event with a null anywhere in
/// that triple matches nothing.
pub fn match_event<'a>(catalog: &'a Catalog, event: &PreferenceEvent) -> Vec<&'a CatalogEntry> {
    match event.match_key() {
        Some(key) => catalog.lookup(&key),
        None => Vec::new(),
    }
}

/// Decodes, matches and emits every message of one batch, in arrival order.
///
/// A sink failure aborts the batch; nothing is retried.
pub async fn process_batch(ctx: &PipelineContext, batch: &MicroBatch) -> AppResult<BatchReport> {
    let mut report = BatchReport {
        batch_id: batch.id,
        ..BatchReport::default()
    };

    for message in &batch.messages {
        let Some(event) = decode_with_policy(message.payload(), ctx.decode_policy) else {
            tracing::debug!(
                partition = message.partition,
                offset = message.offset,
                "Dropped undecodable message"
            );
            report.dropped += 1;
            continue;
        };

        let matches: Vec<CatalogEntry> = match_event(&ctx.catalog, &event)
            .into_iter()
            .cloned()
            .collect();

        ctx.sink
            .emit(&event, &matches)
            .await
            .map_err(|e| AppError::BatchProcessing {
                batch_id: batch.id,
                reason: e.to_string(),
            })?;

        report.events += 1;
        report.matches += matches.len();
    }

    Ok(report)
}
