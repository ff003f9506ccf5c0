//! Integration tests for the per-library driver.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use tempfile::tempdir;
use tokio_test::assert_ok;

use common::{
    item_processor, library, library_config, library_processor, movie, with_rating, FakeMedia,
    TrackingCompositor,
};
use posterforge::media::MediaService;
use posterforge::processor::LibraryOutcome;
use posterforge_common::{Error, Handle, RatingName, RatingType, RunContext};

fn processor(compositor: Arc<TrackingCompositor>) -> posterforge::processor::LibraryProcessor {
    library_processor(
        item_processor(2, Vec::new(), compositor),
        Duration::from_secs(60),
    )
}

#[tokio::test]
async fn disabled_library_fetches_nothing() {
    let dir = tempdir().unwrap();
    let media = Arc::new(FakeMedia::new(vec![library("1", "Movies")]));
    let mut config = library_config("Movies", dir.path());
    config.enabled = false;
    let service = media.service(vec![config.clone()]);

    let outcome = processor(TrackingCompositor::new(Duration::ZERO))
        .process_library(&RunContext::new(), &config, &media.libraries, &service)
        .await
        .unwrap();

    assert_eq!(outcome, LibraryOutcome::Disabled);
    assert_eq!(media.item_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_library_is_reported() {
    let dir = tempdir().unwrap();
    let media = Arc::new(FakeMedia::new(vec![library("1", "Movies")]));
    let config = library_config("Documentaries", dir.path());
    let service = media.service(vec![config.clone()]);

    let result = processor(TrackingCompositor::new(Duration::ZERO))
        .process_library(&RunContext::new(), &config, &media.libraries, &service)
        .await;

    assert_matches!(result, Err(Error::LibraryNotFound(name)) if name == "Documentaries");
}

#[tokio::test]
async fn each_missing_handle_is_named() {
    let dir = tempdir().unwrap();
    let media = Arc::new(FakeMedia::new(vec![library("1", "Movies")]));
    let config = library_config("Movies", dir.path());
    let full = media.service(vec![config.clone()]);
    let lp = processor(TrackingCompositor::new(Duration::ZERO));

    let cases = [
        (MediaService { libraries: None, ..full.clone() }, Handle::Libraries),
        (MediaService { items: None, ..full.clone() }, Handle::Items),
        (MediaService { posters: None, ..full.clone() }, Handle::Posters),
    ];
    for (service, expected) in cases {
        let result = lp
            .process_library(&RunContext::new(), &config, &media.libraries, &service)
            .await;
        assert_matches!(result, Err(Error::HandleMissing(h)) if h == expected);
    }
}

#[tokio::test]
async fn empty_library_skips_refresh() {
    let dir = tempdir().unwrap();
    let media = Arc::new(FakeMedia::new(vec![library("1", "Movies")]));
    let mut config = library_config("Movies", dir.path());
    config.refresh = true;
    let service = media.service(vec![config.clone()]);

    let outcome = processor(TrackingCompositor::new(Duration::ZERO))
        .process_library(&RunContext::new(), &config, &media.libraries, &service)
        .await
        .unwrap();

    assert_eq!(outcome, LibraryOutcome::Empty);
    assert!(media.refreshed.lock().is_empty());
}

#[tokio::test]
async fn processed_library_is_refreshed_when_configured() {
    let dir = tempdir().unwrap();
    let item = with_rating(
        movie("10", "Heat", dir.path()),
        RatingName::Imdb,
        RatingType::Audience,
        8.3,
    );
    let media = Arc::new(FakeMedia::new(vec![library("7", "Movies")]).with_items("7", vec![item]));
    let mut config = library_config("Movies", dir.path());
    config.refresh = true;
    let service = media.service(vec![config.clone()]);
    let compositor = TrackingCompositor::new(Duration::ZERO);

    let outcome = assert_ok!(
        processor(compositor.clone())
            .process_library(&RunContext::new(), &config, &media.libraries, &service)
            .await
    );

    assert_matches!(outcome, LibraryOutcome::Processed(summary) if summary.processed == 1 && summary.errors == 0);
    assert_eq!(*media.refreshed.lock(), vec!["7".to_string()]);
    assert_eq!(compositor.composed(), vec!["Heat".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn slow_item_fetch_hits_library_deadline() {
    let dir = tempdir().unwrap();
    let media = Arc::new(
        FakeMedia::new(vec![library("1", "Movies")]).with_items_delay(Duration::from_secs(5)),
    );
    let config = library_config("Movies", dir.path());
    let service = media.service(vec![config.clone()]);
    let lp = library_processor(
        item_processor(1, Vec::new(), TrackingCompositor::new(Duration::ZERO)),
        Duration::from_secs(1),
    );

    let err = lp
        .process_library(&RunContext::new(), &config, &media.libraries, &service)
        .await
        .unwrap_err();

    assert_matches!(err, Error::Cancelled { .. });
    assert!(err.is_deadline_exceeded());
}
