use crate::auth::AuthManager;
use crate::broker::EventPublisher;
use crate::config::Config;
use crate::service::ChatService;
use crate::store::ConversationStore;
use crate::uploads::UploadWaiter;
use std::sync::Arc;

/// Shared dependencies for the whole request path, built once at boot
/// and handed to the router as state.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub store: Arc<dyn ConversationStore>,
    pub chat: Arc<ChatService>,
    pub waiter: Arc<UploadWaiter>,
    pub auth_manager: Arc<AuthManager>,
}

impl AppContext {
    /// Creates a new application context, wiring the service layer to
    /// the given store and broker.
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn ConversationStore>,
        broker: Arc<dyn EventPublisher>,
        auth_manager: Arc<AuthManager>,
    ) -> Self {
        let chat = Arc::new(ChatService::new(
            store.clone(),
            broker,
            config.chat.clone(),
        ));
        let waiter = Arc::new(UploadWaiter::new(store.clone(), &config.upload));

        Self {
            config,
            store,
            chat,
            waiter,
            auth_manager,
        }
    }
}
