//! Service configuration, loaded from environment variables with sensible
//! defaults. Grounded on `RateLimitConfig::from_env()` from the teacher
//! repo, generalized to cover every knob the dispatcher and handlers need.

use std::env;
use std::time::Duration;

/// All environment-tunable knobs for the chat core.
///
/// Environment variables:
/// - `CHAT_JWT_SECRET` — HMAC-SHA256 signing secret for bearer tokens (required in
///   production; a development default is used if unset so tests don't need env setup).
/// - `CHAT_MESSAGE_MAX_BYTES` — max message content size (default: 512 KiB)
/// - `CHAT_ATTACHMENT_MAX_BYTES` — max attachment size, metadata only (default: 100 MiB)
/// - `CHAT_RATE_SUSTAINED_RPS` — sustained token-bucket refill rate (default: 5)
/// - `CHAT_RATE_BURST` — token-bucket burst capacity (default: 5)
/// - `CHAT_RATE_CLEANUP_SECS` — idle-bucket eviction cadence (default: 300)
/// - `CHAT_SUBSCRIBER_QUEUE_SIZE` — per-subscriber bounded event queue size (default: 256)
/// - `CHAT_REQUEST_TIMEOUT_SECS` — per-handler deadline (default: 30)
/// - `CHAT_WS_HEARTBEAT_SECS` — real-time transport heartbeat interval (default: 15)
/// - `CHAT_WS_IDLE_TIMEOUT_SECS` — idle real-time session eviction (default: 60)
/// - `CHAT_DIRECTORY_BASE_URL` — external directory service base URL
/// - `CHAT_DIRECTORY_CACHE_TTL_SECS` — directory cache TTL (default: 300)
pub struct ServiceConfig {
    pub jwt_secret: String,
    pub message_max_bytes: usize,
    pub attachment_max_bytes: usize,
    pub rate_sustained_rps: f64,
    pub rate_burst: f64,
    pub rate_cleanup: Duration,
    pub subscriber_queue_size: usize,
    pub request_timeout: Duration,
    pub ws_heartbeat: Duration,
    pub ws_idle_timeout: Duration,
    pub directory_base_url: Option<String>,
    pub directory_cache_ttl: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "dev-secret-do-not-use-in-production".to_string(),
            message_max_bytes: 512 * 1024,
            attachment_max_bytes: 100 * 1024 * 1024,
            rate_sustained_rps: 5.0,
            rate_burst: 5.0,
            rate_cleanup: Duration::from_secs(300),
            subscriber_queue_size: 256,
            request_timeout: Duration::from_secs(30),
            ws_heartbeat: Duration::from_secs(15),
            ws_idle_timeout: Duration::from_secs(60),
            directory_base_url: None,
            directory_cache_ttl: Duration::from_secs(300),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = env::var("CHAT_JWT_SECRET") {
            config.jwt_secret = val;
        }
        if let Ok(val) = env::var("CHAT_MESSAGE_MAX_BYTES")
            && let Ok(n) = val.parse::<usize>()
        {
            config.message_max_bytes = n;
        }
        if let Ok(val) = env::var("CHAT_ATTACHMENT_MAX_BYTES")
            && let Ok(n) = val.parse::<usize>()
        {
            config.attachment_max_bytes = n;
        }
        if let Ok(val) = env::var("CHAT_RATE_SUSTAINED_RPS")
            && let Ok(n) = val.parse::<f64>()
        {
            config.rate_sustained_rps = n;
        }
        if let Ok(val) = env::var("CHAT_RATE_BURST")
            && let Ok(n) = val.parse::<f64>()
        {
            config.rate_burst = n;
        }
        if let Ok(val) = env::var("CHAT_RATE_CLEANUP_SECS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.rate_cleanup = Duration::from_secs(n);
        }
        if let Ok(val) = env::var("CHAT_SUBSCRIBER_QUEUE_SIZE")
            && let Ok(n) = val.parse::<usize>()
        {
            config.subscriber_queue_size = n;
        }
        if let Ok(val) = env::var("CHAT_REQUEST_TIMEOUT_SECS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.request_timeout = Duration::from_secs(n);
        }
        if let Ok(val) = env::var("CHAT_WS_HEARTBEAT_SECS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.ws_heartbeat = Duration::from_secs(n);
        }
        if let Ok(val) = env::var("CHAT_WS_IDLE_TIMEOUT_SECS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.ws_idle_timeout = Duration::from_secs(n);
        }
        if let Ok(val) = env::var("CHAT_DIRECTORY_BASE_URL") {
            config.directory_base_url = Some(val);
        }
        if let Ok(val) = env::var("CHAT_DIRECTORY_CACHE_TTL_SECS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.directory_cache_ttl = Duration::from_secs(n);
        }

        config
    }
}
