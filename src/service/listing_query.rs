//! Listing query derivation
//!
//! Turns the browse state (selected id, free text, advanced filter, page,
//! viewer) into exactly one kind of request and executes it against the
//! `cars` resource. Precedence is id lookup, then free text, then the
//! filtered or plain browse.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use crate::data::{Catalog, Listing, ListingFilter};
use crate::error::AppError;
use crate::rest::{Direction, PAGE_SIZE, PageRange, Query, RestClient, resources, total_pages};
use crate::service::CatalogService;

/// Embedded select shared by every listing read, so each row is self-contained
pub const LISTING_SELECT: &str = "*,brands(*),models(*),styles(*),transmissions(*),displacements(*),fuel(*),years(*),audit(*),users(*),cars_images(images(*))";

/// The one request a browse state maps to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingRequest {
    /// Deep link to a single listing; no paging or filtering
    ById { id: i64 },
    /// Prefix search over brand and model descriptions
    Search {
        text: String,
        page: u32,
        viewer: Option<i64>,
    },
    /// Plain or filtered browse
    Browse {
        filter: ListingFilter,
        page: u32,
        viewer: Option<i64>,
    },
}

/// Items of one page and the page count reported alongside them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingPage {
    pub items: Vec<Listing>,
    pub total_pages: u32,
}

/// Pick the request for the current browse inputs
///
/// # Arguments
/// * `selected_id` - Deep-linked listing id, 0 when none
/// * `search_query` - Free text; blank means no search
/// * `filters` - Advanced filter, ignored while searching
/// * `page` - 1-based page
/// * `viewer` - Logged-in user whose own listings are hidden
pub fn derive_request(
    selected_id: i64,
    search_query: &str,
    filters: &ListingFilter,
    page: u32,
    viewer: Option<i64>,
) -> ListingRequest {
    let page = page.max(1);
    if selected_id != 0 {
        ListingRequest::ById { id: selected_id }
    } else if !search_query.trim().is_empty() {
        ListingRequest::Search {
            text: search_query.trim().to_string(),
            page,
            viewer,
        }
    } else {
        ListingRequest::Browse {
            filter: filters.clone(),
            page,
            viewer,
        }
    }
}

// =============================================================================
// Query construction
// =============================================================================

/// Unsold listings with the shared select, hiding the viewer's own
pub fn base_query(viewer: Option<i64>) -> Query {
    let query = Query::new().eq("sold", false);
    let query = match viewer {
        Some(user_id) => query.neq("id_users", user_id),
        None => query,
    };
    query.select(LISTING_SELECT)
}

/// Browse query with the advanced filter applied
pub fn browse_query(filter: &ListingFilter, viewer: Option<i64>) -> Query {
    let mut query = base_query(viewer);

    if let Some(brand) = filter.brand {
        query = query.eq("id_brands", brand);
    }
    if let Some(model) = filter.model {
        query = query.eq("id_models", model);
    }
    if let Some(style) = filter.style {
        query = query.eq("id_styles", style);
    }
    if let Some(color) = non_blank(&filter.color_ext) {
        query = query.contains("exterior_color", color);
    }
    if let Some(color) = non_blank(&filter.color_inter) {
        query = query.contains("interior_color", color);
    }
    if let Some(year) = filter.year_from {
        query = query.gte("id_year", year);
    }
    if let Some(year) = filter.year_to {
        query = query.lte("id_year", year);
    }
    if let Some(price) = filter.price_from {
        query = query.gte("price", price);
    }
    if let Some(price) = filter.price_to {
        query = query.lte("price", price);
    }
    if let Some(doors) = filter.doors {
        query = query.eq("number_of_doors", doors);
    }
    if let Some(fuel) = filter.fuel {
        query = query.eq("id_fuel", fuel);
    }
    if let Some(transmission) = filter.transmission {
        query = query.eq("id_transmission", transmission);
    }
    if let Some(displacement) = filter.displacement {
        query = query.eq("id_displacement", displacement);
    }

    // At most one ordering; price wins when both are ticked.
    if filter.order_by_price {
        query = query.order("price", Direction::Asc);
    } else if filter.order_by_year {
        query = query.order("id_year", Direction::Asc);
    }

    query
}

/// Brand-prefix and model-prefix queries for a free-text search
///
/// The searched relation is embedded with `!inner`, so the service drops
/// non-matching rows before paging and counting.
pub fn search_queries(text: &str, viewer: Option<i64>) -> (Query, Query) {
    let by_brand = base_query(viewer)
        .select(inner_select("brands"))
        .starts_with("brands.desc", text);
    let by_model = base_query(viewer)
        .select(inner_select("models"))
        .starts_with("models.desc", text);
    (by_brand, by_model)
}

/// The shared select with `relation` turned into an inner join
fn inner_select(relation: &str) -> String {
    LISTING_SELECT.replacen(
        &format!(",{relation}(*)"),
        &format!(",{relation}!inner(*)"),
        1,
    )
}

pub fn by_id_query(id: i64) -> Query {
    Query::new().eq("id_cars", id).select(LISTING_SELECT)
}

/// Union of both search legs, de-duplicated by listing id
///
/// Rows whose searched relation came back empty are not hits. Model hits
/// come first and win over the same listing found by brand.
pub fn merge_search_results(model_hits: Vec<Listing>, brand_hits: Vec<Listing>) -> Vec<Listing> {
    let mut seen = HashSet::new();
    let models = model_hits.into_iter().filter(|car| car.models.is_some());
    let brands = brand_hits.into_iter().filter(|car| car.brands.is_some());

    models
        .chain(brands)
        .filter(|car| seen.insert(car.id_cars))
        .collect()
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

// =============================================================================
// Execution
// =============================================================================

/// Where the browse orchestrator gets its data from
pub trait ListingSource: Send + Sync + 'static {
    fn fetch(
        &self,
        request: ListingRequest,
    ) -> impl Future<Output = Result<ListingPage, AppError>> + Send;

    fn load_catalog(&self) -> impl Future<Output = Result<Arc<Catalog>, AppError>> + Send;
}

/// Listing reads against the data service
pub struct ListingRepository {
    rest: Arc<RestClient>,
    catalog: Arc<CatalogService>,
}

impl ListingRepository {
    pub fn new(rest: Arc<RestClient>, catalog: Arc<CatalogService>) -> Self {
        Self { rest, catalog }
    }

    /// Fetch one listing with all embedded relations
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Listing>, AppError> {
        let rows: Vec<Listing> = self.rest.select(resources::CARS, &by_id_query(id)).await?;
        Ok(rows.into_iter().next())
    }

    async fn browse(
        &self,
        filter: &ListingFilter,
        page: u32,
        viewer: Option<i64>,
    ) -> Result<ListingPage, AppError> {
        let range = PageRange::new(page, PAGE_SIZE);
        let result = self
            .rest
            .select_page(resources::CARS, &browse_query(filter, viewer), range)
            .await?;

        Ok(ListingPage {
            items: result.items,
            total_pages: total_pages(result.total.unwrap_or(0), PAGE_SIZE),
        })
    }

    async fn search(
        &self,
        text: &str,
        page: u32,
        viewer: Option<i64>,
    ) -> Result<ListingPage, AppError> {
        let range = PageRange::new(page, PAGE_SIZE);
        let (by_brand, by_model) = search_queries(text, viewer);

        let (brand_page, model_page) = tokio::try_join!(
            self.rest.select_page::<Listing>(resources::CARS, &by_brand, range),
            self.rest.select_page::<Listing>(resources::CARS, &by_model, range),
        )?;

        let pages = total_pages(brand_page.total.unwrap_or(0), PAGE_SIZE)
            .max(total_pages(model_page.total.unwrap_or(0), PAGE_SIZE));
        let items = merge_search_results(model_page.items, brand_page.items);
        tracing::debug!(text, page, hits = items.len(), "Search completed");

        Ok(ListingPage {
            items,
            total_pages: pages,
        })
    }
}

impl ListingSource for ListingRepository {
    async fn fetch(&self, request: ListingRequest) -> Result<ListingPage, AppError> {
        match request {
            ListingRequest::ById { id } => {
                let items: Vec<Listing> =
                    self.rest.select(resources::CARS, &by_id_query(id)).await?;
                Ok(ListingPage {
                    items,
                    total_pages: 1,
                })
            }
            ListingRequest::Search { text, page, viewer } => self.search(&text, page, viewer).await,
            ListingRequest::Browse {
                filter,
                page,
                viewer,
            } => self.browse(&filter, page, viewer).await,
        }
    }

    async fn load_catalog(&self) -> Result<Arc<Catalog>, AppError> {
        self.catalog.load().await
    }
}
