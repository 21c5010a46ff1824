// ============================================================================
// Shared test helpers
// ============================================================================
//
// spawn_app() starts a full HTTP server on a random port over the
// in-memory store with push delivery disabled, so tests need no
// external services.
//
// ============================================================================

use std::sync::Arc;

use atelier_chat::auth::AuthManager;
use atelier_chat::broker::NotificationBroker;
use atelier_chat::config::{ChatConfig, Config, UploadConfig};
use atelier_chat::context::AppContext;
use atelier_chat::models::Party;
use atelier_chat::routes::create_router;
use atelier_chat::store::{ConversationStore, MemoryStore};
use tokio::net::TcpListener;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test-secret-0123456789abcdef0123456789abcdef";

pub fn test_config() -> Config {
    Config {
        database_url: None,
        redis_url: None,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        jwt_issuer: "atelier-chat".to_string(),
        access_token_ttl_hours: 1,
        port: 0,
        rust_log: "info".to_string(),
        chat: ChatConfig {
            default_page_size: 50,
            max_page_size: 200,
            max_text_chars: 4000,
        },
        upload: UploadConfig {
            // Fast polling keeps the long-poll tests quick
            poll_interval_ms: 50,
            wait_ceiling_secs: 25,
        },
    }
}

pub struct TestApp {
    pub address: String,
    pub store: Arc<dyn ConversationStore>,
    pub auth: Arc<AuthManager>,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.address, path)
    }

    /// Issues a bearer token for the given principal
    pub fn bearer_for(&self, user_id: Uuid, role: Party) -> String {
        let (token, _expires_at) = self
            .auth
            .create_token(&user_id, "test@example.com", role)
            .expect("Failed to issue test token");
        token
    }
}

pub async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let address = format!("127.0.0.1:{}", port);

    let app_config = Arc::new(test_config());
    let store: Arc<dyn ConversationStore> = Arc::new(MemoryStore::new());
    let broker = Arc::new(NotificationBroker::disabled());
    let auth_manager = Arc::new(AuthManager::new(&app_config));

    let app_context = Arc::new(AppContext::new(
        app_config,
        store.clone(),
        broker,
        auth_manager.clone(),
    ));
    let router = create_router(app_context);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        store,
        auth: auth_manager,
        client: reqwest::Client::new(),
    }
}
