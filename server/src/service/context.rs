use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::config::Config;
use crate::connections::ConnectionManager;
use crate::persistence::Persistence;
use crate::profiles::{ProfileManager, Timeouts};
use crate::storage::ImageStore;

/// Shared state handed to every handler.
pub struct AppState<D: Persistence> {
    pub store: Arc<D>,
    pub images: Arc<ImageStore>,
    pub tokens: Arc<TokenIssuer>,
    pub profiles: Arc<ProfileManager<D>>,
    pub connections: Arc<ConnectionManager<D>>,
    pub settings: Arc<Settings>,
}

/// The slice of [`Config`] the handlers read.
#[derive(Debug, Clone)]
pub struct Settings {
    pub public_url: String,
    pub default_icon_path: PathBuf,
    pub timeouts: Timeouts,
}

impl<D: Persistence> AppState<D> {
    pub fn new(store: Arc<D>, images: Arc<ImageStore>, config: &Config) -> Self {
        let timeouts = Timeouts {
            db: config.db_timeout,
            cascade: config.cascade_timeout,
        };
        Self {
            profiles: Arc::new(ProfileManager::new(store.clone(), images.clone(), timeouts)),
            connections: Arc::new(ConnectionManager::new(store.clone(), timeouts.db)),
            tokens: Arc::new(TokenIssuer::new(config.jwt_secret.as_bytes(), config.token_ttl)),
            settings: Arc::new(Settings {
                public_url: config.public_url.clone(),
                default_icon_path: config.default_icon_path.clone(),
                timeouts,
            }),
            store,
            images,
        }
    }
}

impl<D: Persistence> Clone for AppState<D> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            images: self.images.clone(),
            tokens: self.tokens.clone(),
            profiles: self.profiles.clone(),
            connections: self.connections.clone(),
            settings: self.settings.clone(),
        }
    }
}
