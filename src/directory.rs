//! Directory Client (spec §4.1 component list, §6): resolves user display
//! metadata and validates access to external entities (ticket/project/
//! team/epic) a room may be bound to. Treated as best-effort and cached;
//! failures never fail a request unless the handler's contract explicitly
//! requires directory confirmation (spec §6, §7).
//!
//! Grounded on the teacher's `reqwest::Client` usage in `src/webhooks.rs`
//! (timeout-bounded client, JSON body), generalized into a GET-based lookup
//! client with an in-memory TTL cache (no crate the teacher doesn't already
//! depend on).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::config::ServiceConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct UserMetadata {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl UserMetadata {
    fn unknown(user_id: &str) -> Self {
        UserMetadata {
            id: user_id.to_string(),
            display_name: "unknown".to_string(),
            avatar_url: None,
        }
    }
}

struct CacheEntry<T> {
    value: T,
    fetched_at: Instant,
}

/// Best-effort HTTP client over the external directory service. Every
/// outward-facing method degrades gracefully: user metadata defaults to
/// "unknown", entity validation failures are reported to the caller (who
/// decides, per the handler's contract, whether that is fatal).
pub struct DirectoryClient {
    http: reqwest::Client,
    base_url: Option<String>,
    ttl: Duration,
    users: Mutex<HashMap<String, CacheEntry<UserMetadata>>>,
    entities: Mutex<HashMap<(String, String), CacheEntry<bool>>>,
}

impl DirectoryClient {
    pub fn new(config: &ServiceConfig) -> Self {
        DirectoryClient {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .expect("failed to build directory HTTP client"),
            base_url: config.directory_base_url.clone(),
            ttl: config.directory_cache_ttl,
            users: Mutex::new(HashMap::new()),
            entities: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves display metadata for a user id. Never fails: directory
    /// outages or cache misses resolve to a placeholder (spec §6).
    pub async fn resolve_user(&self, user_id: &str) -> UserMetadata {
        if let Some(cached) = self.cached_user(user_id) {
            return cached;
        }

        let Some(base) = &self.base_url else {
            return UserMetadata::unknown(user_id);
        };

        let url = format!("{base}/users/{user_id}");
        let fetched = match self.http.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => resp.json::<UserMetadata>().await.ok(),
            Ok(resp) => {
                log::warn!("directory lookup for {user_id} returned {}", resp.status());
                None
            }
            Err(e) => {
                log::warn!("directory lookup for {user_id} failed: {e}");
                None
            }
        };

        let metadata = fetched.unwrap_or_else(|| UserMetadata::unknown(user_id));
        self.users.lock().unwrap().insert(
            user_id.to_string(),
            CacheEntry { value: metadata.clone(), fetched_at: Instant::now() },
        );
        metadata
    }

    fn cached_user(&self, user_id: &str) -> Option<UserMetadata> {
        let cache = self.users.lock().unwrap();
        let entry = cache.get(user_id)?;
        if entry.fetched_at.elapsed() < self.ttl {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// Validates that `(entity_type, entity_id)` exists and is accessible.
    /// Returns `None` when the directory cannot be consulted (no base URL
    /// configured, or the request failed) — the caller decides what that
    /// means for the action at hand (spec §6).
    pub async fn validate_entity(&self, entity_type: &str, entity_id: &str) -> Option<bool> {
        let key = (entity_type.to_string(), entity_id.to_string());
        {
            let cache = self.entities.lock().unwrap();
            if let Some(entry) = cache.get(&key)
                && entry.fetched_at.elapsed() < self.ttl
            {
                return Some(entry.value);
            }
        }

        let base = self.base_url.as_ref()?;
        let url = format!("{base}/entities/{entity_type}/{entity_id}");
        let valid = match self.http.get(&url).send().await {
            Ok(resp) => Some(resp.status().is_success()),
            Err(e) => {
                log::warn!("directory entity validation for {entity_type}:{entity_id} failed: {e}");
                None
            }
        };

        if let Some(v) = valid {
            self.entities.lock().unwrap().insert(key, CacheEntry { value: v, fetched_at: Instant::now() });
        }
        valid
    }
}
