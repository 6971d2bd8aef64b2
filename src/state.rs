//! Shared application state handed to every dispatcher route and handler,
//! grounded on the teacher's `State<Db>`/`State<PresenceTracker>` pattern
//! in `src/lib.rs` — generalized into one bundle instead of several
//! independently-managed Rocket states, since every handler now needs all
//! of them.

use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::directory::DirectoryClient;
use crate::events::EventFabric;
use crate::rate_limit::RateLimiter;
use crate::repo::Repository;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub events: Arc<EventFabric>,
    pub rate_limiter: Arc<RateLimiter>,
    pub directory: Arc<DirectoryClient>,
    pub config: Arc<ServiceConfig>,
}
