use std::sync::{Arc, Mutex};
use std::time::Duration;

use object_store::{memory::InMemory, path::Path, ObjectStore, PutPayload};

use tunelake::{
    error::AppResult,
    models::{Catalog, CatalogEntry, PreferenceEvent},
    services::{
        load_catalog, match_event, ChannelEventSource, DriverState, MatchSink,
        ObjectStoreCatalogSource, StatusHandle, StreamDriver,
    },
    AppError, DecodePolicy, PipelineContext,
};

const CATALOG_CSV: &str = "\
track_id,track_name,artist_name,genre,language
t1,Song X,Artist A,Pop,en
t2,Song Y,Artist B,Rock,en
t3,Song Z,Artist A,Pop,en
";

type Emitted = Vec<(PreferenceEvent, Vec<CatalogEntry>)>;

/// Records everything it is given
#[derive(Clone, Default)]
struct CollectingSink {
    emitted: Arc<Mutex<Emitted>>,
}

impl CollectingSink {
    fn take(&self) -> Emitted {
        std::mem::take(&mut *self.emitted.lock().unwrap())
    }
}

#[async_trait::async_trait]
impl MatchSink for CollectingSink {
    async fn emit(&self, event: &PreferenceEvent, matches: &[CatalogEntry]) -> AppResult<()> {
        self.emitted
            .lock()
            .unwrap()
            .push((event.clone(), matches.to_vec()));
        Ok(())
    }
}

struct FailingSink;

#[async_trait::async_trait]
impl MatchSink for FailingSink {
    async fn emit(&self, _: &PreferenceEvent, _: &[CatalogEntry]) -> AppResult<()> {
        Err(AppError::Sink("output closed".to_string()))
    }
}

async fn load_test_catalog(csv: &'static str) -> Catalog {
    let store = InMemory::new();
    store
        .put(&Path::from("Music Info.csv"), PutPayload::from(csv))
        .await
        .unwrap();
    let source = ObjectStoreCatalogSource::new(Arc::new(store), "Music Info.csv");
    load_catalog(&source).await.unwrap()
}

fn ids(matches: &[CatalogEntry]) -> Vec<&str> {
    matches.iter().map(|e| e.track_id.as_str()).collect()
}

fn preference(user: &str, genre: &str, artist: &str, language: &str) -> String {
    serde_json::json!({
        "user_id": user,
        "genre": genre,
        "artist": artist,
        "language": language,
        "timestamp": "2024-01-15 10:30:25",
    })
    .to_string()
}

#[tokio::test]
async fn test_single_entry_scenarios() {
    let catalog = load_test_catalog(
        "track_id,track_name,artist_name,genre,language\nt1,Song X,Artist A,Pop,en\n",
    )
    .await;

    let hit = tunelake::services::decode(Some(preference("u1", "Pop", "Artist A", "en").as_bytes()))
        .unwrap();
    let ids: Vec<&str> = match_event(&catalog, &hit)
        .iter()
        .map(|e| e.track_id.as_str())
        .collect();
    assert_eq!(ids, vec!["t1"]);

    let genre_miss =
        tunelake::services::decode(Some(preference("u1", "Rock", "Artist A", "en").as_bytes()))
            .unwrap();
    assert!(match_event(&catalog, &genre_miss).is_empty());

    let no_artist = tunelake::services::decode(Some(
        br#"{"user_id":"u1","genre":"Pop","language":"en","timestamp":"t"}"#.as_slice(),
    ))
    .unwrap();
    assert_eq!(no_artist.artist, None);
    assert!(match_event(&catalog, &no_artist).is_empty());
}

#[tokio::test]
async fn test_driver_processes_batches_until_source_exhausted() {
    let catalog = Arc::new(load_test_catalog(CATALOG_CSV).await);
    let sink = CollectingSink::default();
    let ctx = PipelineContext::new(catalog.clone(), Arc::new(sink.clone()), DecodePolicy::NullFill);

    let (sender, source) = ChannelEventSource::new(8);
    sender
        .send_batch([
            preference("u1", "Pop", "Artist A", "en"),
            preference("u2", "Rock", "Artist B", "en"),
        ])
        .await
        .unwrap();
    sender
        .send_batch(vec!["{not json".to_string(), preference("u3", "Jazz", "Artist A", "en")])
        .await
        .unwrap();
    drop(sender);

    let status = StatusHandle::new();
    let (driver, _handle) = StreamDriver::new(ctx, Box::new(source), status.clone());
    driver.run().await.unwrap();

    let emitted = sink.take();
    assert_eq!(emitted.len(), 4);
    assert_eq!(emitted[0].0.user_id.as_deref(), Some("u1"));
    assert_eq!(ids(&emitted[0].1), vec!["t1", "t3"]);
    assert_eq!(ids(&emitted[1].1), vec!["t2"]);
    // Undecodable payload flows through with null fields
    assert_eq!(emitted[2].0, PreferenceEvent::null());
    assert!(emitted[2].1.is_empty());
    assert!(emitted[3].1.is_empty());

    let snapshot = status.snapshot().await;
    assert_eq!(snapshot.state, DriverState::Terminated);
    assert_eq!(snapshot.batches_processed, 2);
    assert_eq!(snapshot.events_processed, 4);
    assert_eq!(snapshot.matches_emitted, 3);
    assert_eq!(snapshot.last_batch_id, Some(1));

    // The catalog is untouched by processing
    assert_eq!(catalog.len(), 3);
    assert_eq!(catalog.entries()[0], CatalogEntry::new("t1", "Song X", "Artist A", "Pop", "en"));
}

#[tokio::test]
async fn test_matches_do_not_depend_on_batch_neighbours() {
    let catalog = Arc::new(load_test_catalog(CATALOG_CSV).await);

    let alone = CollectingSink::default();
    let crowded = CollectingSink::default();

    for (sink, payloads) in [
        (&alone, vec![preference("u1", "Pop", "Artist A", "en")]),
        (
            &crowded,
            vec![
                preference("u9", "Rock", "Artist B", "en"),
                preference("u1", "Pop", "Artist A", "en"),
                "garbage".to_string(),
            ],
        ),
    ] {
        let ctx = PipelineContext::new(catalog.clone(), Arc::new(sink.clone()), DecodePolicy::NullFill);
        let (sender, source) = ChannelEventSource::new(1);
        sender.send_batch(payloads).await.unwrap();
        drop(sender);
        let (driver, _handle) = StreamDriver::new(ctx, Box::new(source), StatusHandle::new());
        driver.run().await.unwrap();
    }

    let alone = alone.take();
    let crowded = crowded.take();
    let from_crowd = crowded
        .iter()
        .find(|(event, _)| event.user_id.as_deref() == Some("u1"))
        .unwrap();
    assert_eq!(alone[0].1, from_crowd.1);
}

#[tokio::test]
async fn test_drop_policy_counts_dropped_records() {
    let catalog = Arc::new(load_test_catalog(CATALOG_CSV).await);
    let sink = CollectingSink::default();
    let ctx = PipelineContext::new(catalog, Arc::new(sink.clone()), DecodePolicy::Drop);

    let (sender, source) = ChannelEventSource::new(1);
    sender
        .send_batch(vec!["[]".to_string(), preference("u1", "Pop", "Artist A", "en")])
        .await
        .unwrap();
    drop(sender);

    let status = StatusHandle::new();
    let (driver, _handle) = StreamDriver::new(ctx, Box::new(source), status.clone());
    driver.run().await.unwrap();

    assert_eq!(sink.take().len(), 1);
    let snapshot = status.snapshot().await;
    assert_eq!(snapshot.events_dropped, 1);
    assert_eq!(snapshot.events_processed, 1);
}

#[tokio::test]
async fn test_shutdown_terminates_idle_driver() {
    let catalog = Arc::new(load_test_catalog(CATALOG_CSV).await);
    let ctx = PipelineContext::new(catalog, Arc::new(CollectingSink::default()), DecodePolicy::NullFill);

    // Sender stays alive so the source never runs dry
    let (_sender, source) = ChannelEventSource::new(1);
    let status = StatusHandle::new();
    let (driver, handle) = StreamDriver::new(ctx, Box::new(source), status.clone());
    let run = tokio::spawn(driver.run());

    for _ in 0..100 {
        if status.state().await == DriverState::AwaitingBatch {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(status.state().await, DriverState::AwaitingBatch);

    handle.shutdown().await;
    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("driver did not stop")
        .unwrap()
        .unwrap();
    assert_eq!(status.state().await, DriverState::Terminated);
}

#[tokio::test]
async fn test_dropped_handle_does_not_stop_driver() {
    let catalog = Arc::new(load_test_catalog(CATALOG_CSV).await);
    let sink = CollectingSink::default();
    let ctx = PipelineContext::new(catalog, Arc::new(sink.clone()), DecodePolicy::NullFill);

    let (sender, source) = ChannelEventSource::new(1);
    let status = StatusHandle::new();
    let (driver, handle) = StreamDriver::new(ctx, Box::new(source), status.clone());
    drop(handle);
    let run = tokio::spawn(driver.run());

    sender
        .send_batch([preference("u1", "Pop", "Artist A", "en")])
        .await
        .unwrap();
    drop(sender);

    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("driver did not stop")
        .unwrap()
        .unwrap();
    assert_eq!(sink.take().len(), 1);
}

#[tokio::test]
async fn test_sink_failure_fails_the_job() {
    let catalog = Arc::new(load_test_catalog(CATALOG_CSV).await);
    let ctx = PipelineContext::new(catalog, Arc::new(FailingSink), DecodePolicy::NullFill);

    let (sender, source) = ChannelEventSource::new(2);
    sender
        .send_batch([preference("u1", "Pop", "Artist A", "en")])
        .await
        .unwrap();
    sender
        .send_batch([preference("u2", "Pop", "Artist A", "en")])
        .await
        .unwrap();

    let status = StatusHandle::new();
    let (driver, _handle) = StreamDriver::new(ctx, Box::new(source), status.clone());
    let err = driver.run().await.unwrap_err();
    assert!(matches!(err, AppError::BatchProcessing { batch_id: 0, .. }));

    let snapshot = status.snapshot().await;
    assert_eq!(snapshot.state, DriverState::Failed);
    assert_eq!(snapshot.batches_processed, 0);
    assert!(snapshot.failure.unwrap().contains("output closed"));
}

#[tokio::test]
async fn test_missing_catalog_columns_fail_load() {
    let store = InMemory::new();
    store
        .put(
            &Path::from("Music Info.csv"),
            PutPayload::from("track_id,track_name,genre\nt1,Song X,Pop\n"),
        )
        .await
        .unwrap();
    let source = ObjectStoreCatalogSource::new(Arc::new(store), "Music Info.csv");

    let err = load_catalog(&source).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "catalog is missing required columns: artist_name, language"
    );
}
