use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::models::{CatalogEntry, CatalogSummary, PreferenceEvent};
use crate::services::{driver::DriverStatus, matcher::match_event};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub count: usize,
    pub matches: Vec<CatalogEntry>,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Current stream driver status
pub async fn get_status(State(state): State<AppState>) -> Json<DriverStatus> {
    Json(state.status.snapshot().await)
}

/// Catalog size and distinct attribute counts
pub async fn get_catalog(State(state): State<AppState>) -> Json<CatalogSummary> {
    Json(state.catalog.summary())
}

/// Preview the catalog rows a preference would match
pub async fn match_preference(
    State(state): State<AppState>,
    Json(request): Json<MatchRequest>,
) -> Json<MatchResponse> {
    let event = PreferenceEvent {
        genre: request.genre,
        artist: request.artist,
        language: request.language,
        ..PreferenceEvent::default()
    };

    let matches: Vec<CatalogEntry> = match_event(&state.catalog, &event)
        .into_iter()
        .cloned()
        .collect();

    Json(MatchResponse {
        count: matches.len(),
        matches,
    })
}
