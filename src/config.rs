use anyhow::Result;

// ============================================================================
// Defaults
// ============================================================================

const DEFAULT_PORT: u16 = 8080;

// Access tokens are short-lived; the platform refreshes them out of band.
const DEFAULT_ACCESS_TOKEN_TTL_HOURS: i64 = 24;

// Chat paging and input limits
const DEFAULT_PAGE_SIZE: u32 = 50;
const DEFAULT_MAX_PAGE_SIZE: u32 = 200;
const DEFAULT_MAX_TEXT_CHARS: usize = 4000;

// Upload waiter timing. The ceiling must stay strictly below the
// platform's 30s request timeout so the handler always answers.
const DEFAULT_UPLOAD_POLL_INTERVAL_MS: u64 = 2000;
const DEFAULT_UPLOAD_WAIT_CEILING_SECS: u64 = 25;

/// Paging and input limits for the conversation API
#[derive(Clone, Debug)]
pub struct ChatConfig {
    /// Page size used when the client sends no limit
    pub default_page_size: u32,
    /// Hard cap a client-supplied limit is clamped to
    pub max_page_size: u32,
    /// Maximum message length in characters
    pub max_text_chars: usize,
}

/// Upload waiter timing
#[derive(Clone, Debug)]
pub struct UploadConfig {
    /// Interval between store polls (milliseconds)
    pub poll_interval_ms: u64,
    /// Hard ceiling any wait deadline is capped to (seconds)
    pub wait_ceiling_secs: u64,
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Postgres connection string. Absent means the in-memory store
    /// (single-process development mode, nothing survives a restart).
    pub database_url: Option<String>,
    /// Redis connection string. Absent means push delivery is disabled;
    /// clients still converge by fetching.
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub access_token_ttl_hours: i64,
    pub port: u16,
    pub rust_log: String,
    pub chat: ChatConfig,
    pub upload: UploadConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").ok(),
            redis_url: std::env::var("REDIS_URL").ok(),
            jwt_secret: {
                let secret = std::env::var("JWT_SECRET")?;
                if secret.len() < 32 {
                    anyhow::bail!("JWT_SECRET must be at least 32 characters long");
                }
                secret
            },
            jwt_issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "atelier-chat".to_string()),
            access_token_ttl_hours: std::env::var("ACCESS_TOKEN_TTL_HOURS")
                .ok()
                .and_then(|h| h.parse().ok())
                .unwrap_or(DEFAULT_ACCESS_TOKEN_TTL_HOURS),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            chat: ChatConfig {
                default_page_size: std::env::var("CHAT_DEFAULT_PAGE_SIZE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_PAGE_SIZE),
                max_page_size: std::env::var("CHAT_MAX_PAGE_SIZE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_MAX_PAGE_SIZE),
                max_text_chars: std::env::var("CHAT_MAX_TEXT_CHARS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_MAX_TEXT_CHARS),
            },
            upload: UploadConfig {
                poll_interval_ms: std::env::var("UPLOAD_POLL_INTERVAL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_UPLOAD_POLL_INTERVAL_MS),
                wait_ceiling_secs: std::env::var("UPLOAD_WAIT_CEILING_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_UPLOAD_WAIT_CEILING_SECS),
            },
        })
    }
}
