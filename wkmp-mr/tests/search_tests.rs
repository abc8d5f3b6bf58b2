//! Catalog search integration tests against mock mirrors
//!
//! Covers failover order, reliability bookkeeping, response validation,
//! best-effort categories and cross-mirror deduplication.

mod helpers;

use helpers::*;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};
use wkmp_mr::mirror::{CLIENT_ID_HEADER, DEFAULT_CLIENT_ID, DEFAULT_USER_AGENT};
use wkmp_mr::reliability::ReliabilityRecord;
use wkmp_mr::search::{SearchAggregate, SearchStatus};

// ============================================================================
// Failover
// ============================================================================

#[tokio::test]
async fn test_third_mirror_answers_after_two_failures() {
    let a = MockMirror::start().await;
    let b = MockMirror::start().await;
    let c = MockMirror::start().await;
    a.fail_everything(500).await;
    b.fail_everything(503).await;
    c.search_json("s", "daft punk", track_page(&[("1", "One More Time", "Daft Punk")]), 1)
        .await;

    let (router, _) = router_for(&[&a, &b, &c]).await;
    let outcome = router.search().search("daft punk", &CancellationToken::new()).await;

    assert_eq!(outcome.status, SearchStatus::OkWithResults);
    assert_eq!(outcome.mirror.as_deref(), Some(c.uri().as_str()));
    assert_eq!(outcome.aggregate.tracks()[0].title, "One More Time");

    let store = router.store();
    assert_eq!(store.record(&a.uri()).await.failure_count, 1);
    assert_eq!(store.record(&b.uri()).await.failure_count, 1);
    let winner = store.record(&c.uri()).await;
    assert_eq!(winner.success_count, 1);
    assert_eq!(winner.failure_count, 0);

    // The mirror that just answered is tried first next time
    assert_eq!(store.ranked_mirrors().await, vec![c.uri(), a.uri(), b.uri()]);
}

#[tokio::test]
async fn test_first_success_leaves_remaining_mirrors_untouched() {
    let a = MockMirror::start().await;
    let b = MockMirror::start().await;
    a.search_json("s", "query", track_page(&[("1", "Song", "Band")]), 1).await;

    let (router, _) = router_for(&[&a, &b]).await;
    let outcome = router.search().search("query", &CancellationToken::new()).await;

    assert_eq!(outcome.status, SearchStatus::OkWithResults);
    assert!(b.requests().await.is_empty());
    assert_eq!(router.store().record(&b.uri()).await, ReliabilityRecord::default());
}

#[tokio::test]
async fn test_all_mirrors_failing_reports_failure_once_each() {
    let a = MockMirror::start().await;
    let b = MockMirror::start().await;
    a.fail_everything(500).await;
    b.fail_everything(502).await;

    let (router, _) = router_for(&[&a, &b]).await;
    let outcome = router.search().search("anything", &CancellationToken::new()).await;

    assert_eq!(outcome.status, SearchStatus::AllMirrorsFailed);
    assert!(outcome.mirror.is_none());
    assert!(outcome.aggregate.is_empty());

    for mirror in [&a, &b] {
        let record = router.store().record(&mirror.uri()).await;
        assert_eq!(record.failure_count, 1);
        assert_eq!(record.success_count, 0);
        // Track query failed, so album and artist queries were never sent
        assert_eq!(mirror.requests().await.len(), 1);
    }
}

// ============================================================================
// Response validation
// ============================================================================

#[tokio::test]
async fn test_html_with_status_200_is_a_failure() {
    let a = MockMirror::start().await;
    let b = MockMirror::start().await;
    a.search_raw("s", "q", 200, "<!DOCTYPE html><html>captive portal</html>", 1)
        .await;
    a.search_json("al", "q", album_page(&[("9", "Never", "Nobody")]), 0).await;
    a.search_json("a", "q", artist_page(&[("9", "Nobody")]), 0).await;
    b.search_json("s", "q", track_page(&[("2", "Real", "Artist")]), 1).await;

    let (router, _) = router_for(&[&a, &b]).await;
    let outcome = router.search().search("q", &CancellationToken::new()).await;

    assert_eq!(outcome.status, SearchStatus::OkWithResults);
    assert_eq!(outcome.mirror.as_deref(), Some(b.uri().as_str()));
    assert!(outcome.aggregate.albums().is_empty());
    assert_eq!(router.store().record(&a.uri()).await.failure_count, 1);
}

#[tokio::test]
async fn test_empty_body_with_status_200_is_a_failure() {
    let a = MockMirror::start().await;
    a.search_raw("s", "q", 200, "", 1).await;

    let (router, _) = router_for(&[&a]).await;
    let outcome = router.search().search("q", &CancellationToken::new()).await;

    assert_eq!(outcome.status, SearchStatus::AllMirrorsFailed);
    assert_eq!(router.store().record(&a.uri()).await.failure_count, 1);
}

#[tokio::test]
async fn test_valid_empty_answer_is_ok_empty() {
    let a = MockMirror::start().await;
    let b = MockMirror::start().await;
    a.search_json("s", "zzzz", track_page(&[]), 1).await;

    let (router, _) = router_for(&[&a, &b]).await;
    let outcome = router.search().search("zzzz", &CancellationToken::new()).await;

    assert_eq!(outcome.status, SearchStatus::OkEmpty);
    assert_eq!(outcome.mirror.as_deref(), Some(a.uri().as_str()));
    assert_eq!(router.store().record(&a.uri()).await.success_count, 1);
    assert!(b.requests().await.is_empty());
}

#[tokio::test]
async fn test_blank_query_makes_no_requests() {
    let a = MockMirror::start().await;
    let (router, _) = router_for(&[&a]).await;

    let outcome = router.search().search("   ", &CancellationToken::new()).await;

    assert_eq!(outcome.status, SearchStatus::OkEmpty);
    assert!(a.requests().await.is_empty());
    assert_eq!(router.store().record(&a.uri()).await, ReliabilityRecord::default());
}

// ============================================================================
// Categories
// ============================================================================

#[tokio::test]
async fn test_album_failure_leaves_other_categories() {
    let a = MockMirror::start().await;
    a.search_json("s", "radiohead", track_page(&[("1", "Creep", "Radiohead")]), 1)
        .await;
    a.search_raw("al", "radiohead", 500, "boom", 1).await;
    a.search_json("a", "radiohead", artist_page(&[("7", "Radiohead")]), 1).await;

    let (router, _) = router_for(&[&a]).await;
    let outcome = router.search().search("radiohead", &CancellationToken::new()).await;

    assert_eq!(outcome.status, SearchStatus::OkWithResults);
    assert_eq!(outcome.aggregate.tracks().len(), 1);
    assert!(outcome.aggregate.albums().is_empty());
    assert_eq!(outcome.aggregate.artists()[0].name, "Radiohead");
    assert_eq!(router.store().record(&a.uri()).await.failure_count, 0);
}

#[tokio::test]
async fn test_albums_deduplicated_across_mirrors() {
    let a = MockMirror::start().await;
    let b = MockMirror::start().await;

    // A answers the first search only
    for (param, body) in [
        ("s", track_page(&[("1", "Come Together", "The Beatles")])),
        ("al", album_page(&[("100", "Abbey Road", "The Beatles")])),
    ] {
        Mock::given(method("GET"))
            .and(path("/search/"))
            .and(query_param(param, "beatles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .up_to_n_times(1)
            .mount(a.server())
            .await;
    }
    b.search_json("s", "beatles", track_page(&[("1", "Come Together", "The Beatles")]), 1)
        .await;
    b.search_json(
        "al",
        "beatles",
        album_page(&[("200", "ABBEY  ROAD", "the beatles"), ("201", "Let It Be", "The Beatles")]),
        1,
    )
    .await;

    let (router, _) = router_for(&[&a, &b]).await;
    let cancel = CancellationToken::new();

    let first = router.search().search("beatles", &cancel).await;
    assert_eq!(first.mirror.as_deref(), Some(a.uri().as_str()));

    let merged = router.search().search_into("beatles", first.aggregate, &cancel).await;
    assert_eq!(merged.mirror.as_deref(), Some(b.uri().as_str()));

    let albums: Vec<_> = merged.aggregate.albums().iter().map(|a| a.id.as_str()).collect();
    assert_eq!(albums, vec!["100", "201"]);
    // Tracks are never deduplicated
    assert_eq!(merged.aggregate.tracks().len(), 2);
}

#[tokio::test]
async fn test_search_into_keeps_existing_results_when_mirrors_fail() {
    let a = MockMirror::start().await;
    a.fail_everything(500).await;

    let mut existing = SearchAggregate::new();
    existing.push_artist(wkmp_mr::search::Artist {
        id: "1".to_string(),
        name: "Kept".to_string(),
        picture: None,
    });

    let (router, _) = router_for(&[&a]).await;
    let outcome = router
        .search()
        .search_into("q", existing, &CancellationToken::new())
        .await;

    assert_eq!(outcome.status, SearchStatus::AllMirrorsFailed);
    assert_eq!(outcome.aggregate.artists().len(), 1);
}

// ============================================================================
// Cancellation, identity, persistence errors
// ============================================================================

#[tokio::test]
async fn test_cancellation_mid_attempt_records_nothing() {
    let a = MockMirror::start().await;
    a.stall_everything(Duration::from_secs(5)).await;

    let (router, _) = router_for(&[&a]).await;
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let outcome = router.search().search("slow", &cancel).await;

    assert_eq!(outcome.status, SearchStatus::Cancelled);
    assert_eq!(router.store().record(&a.uri()).await, ReliabilityRecord::default());
}

#[tokio::test]
async fn test_requests_carry_client_identity() {
    let a = MockMirror::start().await;
    a.search_json("s", "id check", track_page(&[]), 1).await;

    let (router, _) = router_for(&[&a]).await;
    router.search().search("id check", &CancellationToken::new()).await;

    let requests = a.requests().await;
    let first = &requests[0];
    assert_eq!(first.headers.get(CLIENT_ID_HEADER).unwrap().to_str().unwrap(), DEFAULT_CLIENT_ID);
    assert_eq!(first.headers.get("user-agent").unwrap().to_str().unwrap(), DEFAULT_USER_AGENT);
}

#[tokio::test]
async fn test_persistence_failure_does_not_fail_search() {
    let a = MockMirror::start().await;
    a.search_json("s", "q", track_page(&[("1", "Song", "Band")]), 1).await;

    let settings = Arc::new(FailingSettingsStore::default());
    let router = router_with_settings(&[&a], settings.clone()).await;
    let outcome = router.search().search("q", &CancellationToken::new()).await;

    assert_eq!(outcome.status, SearchStatus::OkWithResults);
    assert_eq!(router.store().record(&a.uri()).await.success_count, 1);
    assert!(settings.write_attempts() >= 1);
}
