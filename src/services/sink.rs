use tabled::{settings::Style, Table};

use crate::{
    error::AppResult,
    models::{CatalogEntry, PreferenceEvent},
};

/// Destination for per-event match results
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MatchSink: Send + Sync {
    /// Report one event together with every catalog row it matched
    async fn emit(&self, event: &PreferenceEvent, matches: &[CatalogEntry]) -> AppResult<()>;
}

/// Writes results to the log: one line per event, then a table of matching rows
pub struct LogSink {
    display_limit: usize,
}

impl LogSink {
    pub fn new(display_limit: usize) -> Self {
        Self { display_limit }
    }
}

#[async_trait::async_trait]
impl MatchSink for LogSink {
    async fn emit(&self, event: &PreferenceEvent, matches: &[CatalogEntry]) -> AppResult<()> {
        tracing::info!(
            user_id = or_null(&event.user_id),
            matches = matches.len(),
            "User {} Preference: {}, {}, {}",
            or_null(&event.user_id),
            or_null(&event.genre),
            or_null(&event.artist),
            or_null(&event.language),
        );
        tracing::info!(
            target: "tunelake::matches",
            "\n{}",
            render_table(matches, self.display_limit)
        );
        Ok(())
    }
}

fn or_null(field: &Option<String>) -> &str {
    field.as_deref().unwrap_or("null")
}

/// Renders up to `limit` rows as a bordered ASCII table, without truncating cells
pub fn render_table(entries: &[CatalogEntry], limit: usize) -> String {
    let shown = &entries[..entries.len().min(limit)];
    let mut table = Table::new(shown).with(Style::ascii()).to_string();

    if entries.len() > shown.len() {
        let noun = if shown.len() == 1 { "row" } else { "rows" };
        table.push_str(&format!("\nonly showing top {} {}", shown.len(), noun));
    }

    table
}
