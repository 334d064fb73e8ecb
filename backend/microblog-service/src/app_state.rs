//! Central application state
//!
//! Everything a handler needs is reachable from `AppState`; services are
//! built on demand from the shared pool and configuration.

use crate::config::Config;
use crate::services::{FeedAssembler, IdentityProvider, IdentityService, LikeService, PostService};
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<Config>,
    /// `None` when no external provider is configured
    pub identity_provider: Option<Arc<dyn IdentityProvider>>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        config: Config,
        identity_provider: Option<Arc<dyn IdentityProvider>>,
    ) -> Self {
        Self {
            db,
            config: Arc::new(config),
            identity_provider,
        }
    }

    pub fn identity(&self) -> IdentityService {
        IdentityService::new(self.db.clone(), self.config.session.ttl_hours)
    }

    pub fn feed(&self) -> FeedAssembler {
        FeedAssembler::new(self.db.clone())
    }

    pub fn likes(&self) -> LikeService {
        LikeService::new(self.db.clone())
    }

    pub fn posts(&self) -> PostService {
        PostService::new(self.db.clone(), self.config.uploads.max_media_bytes)
    }
}
