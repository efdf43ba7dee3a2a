//! # Pulse Service
//!
//! The operations behind every endpoint. Each takes the caller's identity
//! explicitly; nothing here reads ambient session state.
//!
//! ```text
//!   pulse-web ──► Service ──► Store (pulse-mongodb)
//!                    └──────► MediaHost (pulse-media)
//! ```
//!
//! Validation happens before the first store call, so a rejected request
//! never leaves partial writes behind.

pub mod bookmarks;
pub mod messages;
pub mod properties;
pub mod ratings;
pub mod reviews;
pub mod users;
pub mod views;

use std::sync::Arc;

use pulse_config::ListingConfig;
use pulse_media::MediaHost;
use pulse_mongodb::Store;

pub use bookmarks::BookmarkToggle;
pub use properties::{ListParams, SearchParams};

#[derive(Clone)]
pub struct Service {
    store: Arc<dyn Store>,
    media: Arc<dyn MediaHost>,
    listing: ListingConfig,
}

impl Service {
    pub fn new(store: Arc<dyn Store>, media: Arc<dyn MediaHost>, listing: ListingConfig) -> Self {
        Self {
            store,
            media,
            listing,
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn listing(&self) -> ListingConfig {
        self.listing
    }

    /// True when the store answers a ping.
    pub async fn store_healthy(&self) -> bool {
        match self.store.ping().await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(backend = self.store.backend(), %err, "Store ping failed");
                false
            }
        }
    }
}
