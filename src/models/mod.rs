pub mod batch;
pub mod catalog;
pub mod preference;

pub use batch::{BatchReport, MicroBatch, RawMessage};
pub use catalog::{Catalog, CatalogEntry, CatalogSummary, MatchKey, CATALOG_COLUMNS};
pub use preference::PreferenceEvent;
