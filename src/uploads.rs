use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::UploadConfig;
use crate::error::AppResult;
use crate::store::ConversationStore;

/// Result of waiting for a processed upload page. `found: false` is a
/// normal outcome, not an error: the page may simply still be
/// processing when the deadline passes.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WaitOutcome {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Polls the store until a registered upload page appears or the
/// deadline passes. Long-polling here keeps clients off a tight retry
/// loop while pages render.
pub struct UploadWaiter {
    store: Arc<dyn ConversationStore>,
    poll_interval: Duration,
    wait_ceiling: Duration,
}

impl UploadWaiter {
    pub fn new(store: Arc<dyn ConversationStore>, config: &UploadConfig) -> Self {
        Self {
            store,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            wait_ceiling: Duration::from_secs(config.wait_ceiling_secs),
        }
    }

    /// Waits up to `deadline` (capped at the configured ceiling, which
    /// sits below the HTTP request timeout) for the page to appear.
    pub async fn wait_for(
        &self,
        upload_id: &str,
        page_number: i32,
        deadline: Duration,
    ) -> AppResult<WaitOutcome> {
        let deadline = deadline.min(self.wait_ceiling);
        let started = tokio::time::Instant::now();

        loop {
            if let Some(page) = self.store.find_upload_page(upload_id, page_number).await? {
                return Ok(WaitOutcome {
                    found: true,
                    image_url: Some(page.image_url),
                });
            }

            let elapsed = started.elapsed();
            if elapsed >= deadline {
                crate::metrics::UPLOAD_WAIT_TIMEOUTS_TOTAL.inc();
                tracing::debug!(
                    upload_id,
                    page_number,
                    "Upload page did not appear before the deadline"
                );
                return Ok(WaitOutcome {
                    found: false,
                    image_url: None,
                });
            }

            // Never sleep past the deadline.
            tokio::time::sleep(self.poll_interval.min(deadline - elapsed)).await;
        }
    }
}
