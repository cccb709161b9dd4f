//! Catalog service
//!
//! Brand, model, style, transmission, displacement, fuel and year lists are
//! small reference tables. They are fetched concurrently the first time
//! anything needs them and kept for the lifetime of the service.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;

use crate::data::{Catalog, Lookup};
use crate::error::AppError;
use crate::rest::{Direction, Query, RestClient};

/// Catalog service
pub struct CatalogService {
    rest: Arc<RestClient>,
    cache: OnceCell<Arc<Catalog>>,
}

impl CatalogService {
    pub fn new(rest: Arc<RestClient>) -> Self {
        Self {
            rest,
            cache: OnceCell::new(),
        }
    }

    /// All lookup lists, fetched on first use
    ///
    /// # Errors
    /// Returns the first failing lookup's error; nothing is cached then and
    /// the next call retries
    pub async fn load(&self) -> Result<Arc<Catalog>, AppError> {
        self.cache
            .get_or_try_init(|| async { self.fetch_all().await.map(Arc::new) })
            .await
            .cloned()
    }

    /// Catalog if it was already loaded
    pub fn cached(&self) -> Option<Arc<Catalog>> {
        self.cache.get().cloned()
    }

    async fn fetch_all(&self) -> Result<Catalog, AppError> {
        let (brands, models, styles, transmissions, displacements, fuel, years) = tokio::try_join!(
            self.fetch_lookup(),
            self.fetch_lookup(),
            self.fetch_lookup(),
            self.fetch_lookup(),
            self.fetch_lookup(),
            self.fetch_lookup(),
            self.fetch_lookup(),
        )?;

        let catalog = Catalog {
            brands,
            models,
            styles,
            transmissions,
            displacements,
            fuel,
            years,
        };
        tracing::info!(
            brands = catalog.brands.len(),
            models = catalog.models.len(),
            years = catalog.years.len(),
            "Catalog loaded"
        );
        Ok(catalog)
    }

    async fn fetch_lookup<T>(&self) -> Result<Vec<T>, AppError>
    where
        T: Lookup + DeserializeOwned,
    {
        let query = Query::new()
            .select("*")
            .order(T::ID_COLUMN, Direction::Asc);
        self.rest.select(T::RESOURCE, &query).await
    }
}
