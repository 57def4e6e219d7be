use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// Columns a catalog object must provide, in output order
pub const CATALOG_COLUMNS: [&str; 5] = ["track_id", "track_name", "artist_name", "genre", "language"];

/// One song in the reference catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Tabled)]
pub struct CatalogEntry {
    /// Unique identifier for the track
    pub track_id: String,
    pub track_name: String,
    pub artist_name: String,
    pub genre: String,
    pub language: String,
}

impl CatalogEntry {
    pub fn new(
        track_id: impl Into<String>,
        track_name: impl Into<String>,
        artist_name: impl Into<String>,
        genre: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            track_id: track_id.into(),
            track_name: track_name.into(),
            artist_name: artist_name.into(),
            genre: genre.into(),
            language: language.into(),
        }
    }

    /// The entry's match triple, or `None` when any part of it is empty.
    ///
    /// An empty CSV cell is a null value, and null never equals anything.
    fn key(&self) -> Option<MatchKey> {
        if self.genre.is_empty() || self.artist_name.is_empty() || self.language.is_empty() {
            return None;
        }
        Some(MatchKey {
            genre: self.genre.clone(),
            artist: self.artist_name.clone(),
            language: self.language.clone(),
        })
    }
}

/// The `(genre, artist, language)` triple entries are matched on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchKey {
    pub genre: String,
    pub artist: String,
    pub language: String,
}

/// Distinct attribute counts, reported by the status API
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CatalogSummary {
    pub entries: usize,
    pub genres: usize,
    pub artists: usize,
    pub languages: usize,
}

/// Immutable song catalog with an index on the match triple.
///
/// Built once at startup and shared behind an `Arc`; nothing mutates it afterwards.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    index: HashMap<MatchKey, Vec<usize>>,
}

impl Catalog {
    /// Builds a catalog from every given row, in order.
    ///
    /// Rows sharing a `track_id` are all kept and each matches on its own
    /// triple. Returns the catalog and the number of rows whose `track_id`
    /// was already seen.
    pub fn from_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> (Self, usize) {
        let entries: Vec<CatalogEntry> = entries.into_iter().collect();

        let mut seen = HashSet::new();
        let duplicates = entries
            .iter()
            .filter(|entry| !seen.insert(entry.track_id.as_str()))
            .count();

        let mut index: HashMap<MatchKey, Vec<usize>> = HashMap::new();
        for (position, entry) in entries.iter().enumerate() {
            if let Some(key) = entry.key() {
                index.entry(key).or_default().push(position);
            }
        }

        (Self { entries, index }, duplicates)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Entries whose triple equals `key` exactly, in catalog order
    pub fn lookup(&self, key: &MatchKey) -> Vec<&CatalogEntry> {
        self.index
            .get(key)
            .map(|positions| positions.iter().map(|&i| &self.entries[i]).collect())
            .unwrap_or_default()
    }

    pub fn summary(&self) -> CatalogSummary {
        let genres: BTreeSet<&str> = self.entries.iter().map(|e| e.genre.as_str()).collect();
        let artists: BTreeSet<&str> = self.entries.iter().map(|e| e.artist_name.as_str()).collect();
        let languages: BTreeSet<&str> = self.entries.iter().map(|e| e.language.as_str()).collect();

        CatalogSummary {
            entries: self.entries.len(),
            genres: genres.len(),
            artists: artists.len(),
            languages: languages.len(),
        }
    }
}
