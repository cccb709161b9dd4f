//! Autolote - client core of a used-car marketplace
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Service Layer                           │
//! │  - Browse orchestrator (page / search / filters / deep link) │
//! │  - Publication, cascading deletion, favorites, profile       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       REST Layer                             │
//! │  - Filter queries, item-range pagination                     │
//! │  - reqwest client with error mapping and metrics             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │               External REST data service                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `rest`: Data service access (queries, ranges, HTTP client)
//! - `service`: Workflows and the browse orchestrator
//! - `export`: Technical sheet rendering (HTML, PNG, PDF)
//! - `data`: Entity models and form validation helpers
//! - `auth`: Stored token, claims and sign-up validation
//! - `config`: Configuration management
//! - `error`: Error types

pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod metrics;
pub mod rest;
pub mod service;

use std::sync::Arc;

use auth::TokenStore;
use error::AppError;
use export::SheetExporter;
use rest::RestClient;
use service::{
    CatalogService, DeletionService, FavoritesManager, FavoritesService, ListingBrowser,
    ListingRepository, ProfileService, PublicationService,
};

/// Shared resources every workflow is built from
///
/// Cheap to clone; services created from it share one HTTP client and one
/// catalog cache.
#[derive(Clone)]
pub struct Marketplace {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Data service client
    pub rest: Arc<RestClient>,

    /// Stored session token
    pub tokens: TokenStore,

    /// Lookup lists, loaded once
    pub catalog: Arc<CatalogService>,
}

impl Marketplace {
    /// Build the shared resources from a validated configuration
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or the HTTP client
    /// cannot be built
    pub fn new(config: config::AppConfig) -> Result<Self, AppError> {
        config.validate()?;
        let rest = Arc::new(RestClient::new(&config.api)?);
        let tokens = TokenStore::new(config.session.token_path.clone());
        let catalog = Arc::new(CatalogService::new(rest.clone()));

        tracing::info!(
            base_url = %rest.base_url(),
            logged_in = tokens.is_logged(),
            "Marketplace initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            rest,
            tokens,
            catalog,
        })
    }

    /// Logged-in user id, if any
    pub fn viewer(&self) -> Option<i64> {
        self.tokens.logged_user_id()
    }

    pub fn listings(&self) -> ListingRepository {
        ListingRepository::new(self.rest.clone(), self.catalog.clone())
    }

    /// Browse orchestrator hiding the logged-in user's own listings
    pub fn browser(&self) -> ListingBrowser<ListingRepository> {
        ListingBrowser::new(Arc::new(self.listings()), self.viewer())
    }

    pub fn publication(&self) -> PublicationService {
        PublicationService::new(self.rest.clone(), self.tokens.clone())
    }

    pub fn deletion(&self) -> DeletionService {
        DeletionService::new(self.rest.clone(), self.tokens.clone())
    }

    pub fn favorites(&self) -> FavoritesService {
        FavoritesService::new(self.rest.clone())
    }

    /// Favorites of the logged-in user
    ///
    /// # Errors
    /// Returns `Unauthorized` when nobody is logged in
    pub fn favorites_manager(&self) -> Result<FavoritesManager, AppError> {
        let user_id = self.viewer().ok_or(AppError::Unauthorized)?;
        Ok(FavoritesManager::new(Arc::new(self.favorites()), user_id))
    }

    pub fn profile(&self) -> ProfileService {
        ProfileService::new(self.rest.clone())
    }

    pub fn exporter(&self) -> SheetExporter {
        SheetExporter::new(self.config.export.output_dir.clone())
    }
}
