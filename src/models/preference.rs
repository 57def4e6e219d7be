use serde::{Deserialize, Serialize};

use super::MatchKey;

/// A user's desired genre/artist/language combination.
///
/// Every field is nullable: a field missing from the payload stays `None`,
/// and an event with any `None` in its match triple matches nothing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreferenceEvent {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    /// Event-time marker, carried verbatim
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl PreferenceEvent {
    /// An event with all fields null
    pub fn null() -> Self {
        Self::default()
    }

    /// The match triple, or `None` when any part of it is null
    pub fn match_key(&self) -> Option<MatchKey> {
        Some(MatchKey {
            genre: self.genre.clone()?,
            artist: self.artist.clone()?,
            language: self.language.clone()?,
        })
    }
}
