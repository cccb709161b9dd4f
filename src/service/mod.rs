//! Service layer
//!
//! Workflows on top of the REST client: listing queries and the browse
//! orchestrator, publication, cascading deletion, favorites, profile and
//! catalog loading.

mod browse;
mod catalog;
mod deletion;
mod favorites;
pub mod listing_query;
mod profile;
mod publication;
mod steps;

pub use browse::{BrowseState, FetchHandle, FetchOutcome, ListingBrowser};
pub use catalog::CatalogService;
pub use deletion::{DeletionOutcome, DeletionService, LANDING_ROUTE};
pub use favorites::{FavoriteCar, FavoriteOutcome, FavoritesManager, FavoritesService, paginate};
pub use listing_query::{ListingPage, ListingRepository, ListingRequest, ListingSource};
pub use profile::{ProfileService, ProfileUpdate, image_from_bytes};
pub use publication::{ImageDiff, ImageUpload, ListingDraft, PublicationService, PublishedListing, edit_draft};
