// ============================================================================
// Upload Waiter Tests
// ============================================================================
//
// Timing behavior of the long-poll loop, run on tokio's paused clock
// so no test actually sleeps:
// - Deadline is honored within one poll interval
// - Pre-existing pages return immediately
// - Pages appearing mid-wait are picked up on the next poll
// - Deadlines are capped at the configured ceiling
//
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use atelier_chat::config::UploadConfig;
use atelier_chat::store::{ConversationStore, MemoryStore};
use atelier_chat::uploads::UploadWaiter;
use tokio::time::Instant;

fn waiter_over(store: Arc<dyn ConversationStore>) -> UploadWaiter {
    UploadWaiter::new(
        store,
        &UploadConfig {
            poll_interval_ms: 2000,
            wait_ceiling_secs: 25,
        },
    )
}

#[tokio::test(start_paused = true)]
async fn a_missing_page_times_out_at_the_deadline() {
    let store: Arc<dyn ConversationStore> = Arc::new(MemoryStore::new());
    let waiter = waiter_over(store);

    let started = Instant::now();
    let outcome = waiter
        .wait_for("abc", 7, Duration::from_secs(5))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert!(!outcome.found);
    assert!(outcome.image_url.is_none());
    // Returns at the deadline, not a poll-grid step past it
    assert!(elapsed >= Duration::from_secs(5), "returned early: {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(6), "returned late: {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn a_pre_registered_page_returns_without_sleeping() {
    let store: Arc<dyn ConversationStore> = Arc::new(MemoryStore::new());
    store
        .record_upload_page("abc", 7, "https://cdn.example.com/abc/7.jpg")
        .await
        .unwrap();
    let waiter = waiter_over(store.clone());

    let started = Instant::now();
    let outcome = waiter
        .wait_for("abc", 7, Duration::from_secs(5))
        .await
        .unwrap();

    assert!(outcome.found);
    assert_eq!(
        outcome.image_url.as_deref(),
        Some("https://cdn.example.com/abc/7.jpg")
    );
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn a_page_appearing_mid_wait_is_found_on_the_next_poll() {
    let store: Arc<dyn ConversationStore> = Arc::new(MemoryStore::new());
    let waiter = waiter_over(store.clone());

    let writer = store.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(3)).await;
        writer
            .record_upload_page("late", 1, "https://cdn.example.com/late/1.jpg")
            .await
            .unwrap();
    });

    let started = Instant::now();
    let outcome = waiter
        .wait_for("late", 1, Duration::from_secs(10))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert!(outcome.found);
    assert!(elapsed >= Duration::from_secs(3));
    assert!(elapsed <= Duration::from_secs(5), "missed a poll: {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn requested_deadlines_are_capped_at_the_ceiling() {
    let store: Arc<dyn ConversationStore> = Arc::new(MemoryStore::new());
    let waiter = waiter_over(store);

    let started = Instant::now();
    let outcome = waiter
        .wait_for("abc", 1, Duration::from_secs(60))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert!(!outcome.found);
    assert!(elapsed >= Duration::from_secs(25));
    assert!(elapsed < Duration::from_secs(26), "ceiling ignored: {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn the_final_sleep_is_truncated_to_the_deadline() {
    let store: Arc<dyn ConversationStore> = Arc::new(MemoryStore::new());
    let waiter = waiter_over(store);

    // Polls land at 0s and 2s; the remaining 1s must not stretch to a
    // full interval
    let started = Instant::now();
    let outcome = waiter
        .wait_for("abc", 1, Duration::from_secs(3))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert!(!outcome.found);
    assert!(elapsed >= Duration::from_secs(3));
    assert!(elapsed < Duration::from_secs(4), "slept past the deadline: {:?}", elapsed);
}
