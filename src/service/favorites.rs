//! Favorites (wishlist)
//!
//! `FavoritesService` talks to the data service; `FavoritesManager` keeps
//! the list a view renders and updates it locally after add and remove.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::listing_query::LISTING_SELECT;
use crate::data::{Favorite, Listing, NewFavorite};
use crate::error::AppError;
use crate::export::format_price_crc;
use crate::rest::{PAGE_SIZE, Query, RestClient, resources, total_pages};

/// Card shown in the favorites grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteCar {
    pub id_cars: i64,
    /// First picture, if any
    pub image: Option<String>,
    pub price: i64,
    /// "₡8 500 000"
    pub price_label: String,
    /// "Toyota Corolla 2020"
    pub title: String,
    pub sold: bool,
}

impl FavoriteCar {
    pub fn from_listing(listing: &Listing) -> Self {
        Self {
            id_cars: listing.id_cars,
            image: listing.images().next().map(|image| image.image.clone()),
            price: listing.price,
            price_label: format_price_crc(listing.price),
            title: listing.headline(),
            sold: listing.sold,
        }
    }
}

/// Result of adding a favorite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteOutcome {
    Added,
    /// The pair already existed; not an error
    AlreadyFavorite,
}

#[derive(Debug, Deserialize)]
struct ListingOwner {
    id_users: i64,
}

/// Favorites service
pub struct FavoritesService {
    rest: Arc<RestClient>,
}

impl FavoritesService {
    pub fn new(rest: Arc<RestClient>) -> Self {
        Self { rest }
    }

    /// Favorited listings of `user_id`, in the order they were added,
    /// excluding the user's own listings
    pub async fn list(&self, user_id: i64) -> Result<Vec<FavoriteCar>, AppError> {
        let favorites: Vec<Favorite> = self
            .rest
            .select(
                resources::WISHLIST,
                &Query::new().eq("id_users", user_id).select("*"),
            )
            .await?;
        if favorites.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = favorites.iter().map(|favorite| favorite.id_cars).collect();
        let listings: Vec<Listing> = self
            .rest
            .select(
                resources::CARS,
                &Query::new()
                    .one_of("id_cars", &ids)
                    .neq("id_users", user_id)
                    .select(LISTING_SELECT),
            )
            .await?;

        let by_id: HashMap<i64, &Listing> = listings
            .iter()
            .map(|listing| (listing.id_cars, listing))
            .collect();
        let cars: Vec<FavoriteCar> = ids
            .iter()
            .filter_map(|id| by_id.get(id))
            .map(|listing| FavoriteCar::from_listing(listing))
            .collect();

        tracing::debug!(user_id, favorites = cars.len(), "Favorites loaded");
        Ok(cars)
    }

    /// Add a favorite; a duplicate pair is reported as `AlreadyFavorite`
    ///
    /// # Errors
    /// `Validation` when the user owns the listing, `NotFound` for unknown listings
    pub async fn add(&self, user_id: i64, listing_id: i64) -> Result<FavoriteOutcome, AppError> {
        let owners: Vec<ListingOwner> = self
            .rest
            .select(
                resources::CARS,
                &Query::new().eq("id_cars", listing_id).select("id_users"),
            )
            .await?;
        let owner = owners.first().ok_or(AppError::NotFound)?;
        if owner.id_users == user_id {
            return Err(AppError::Validation(
                "No puedes agregar tu propio vehículo a favoritos".to_string(),
            ));
        }

        let body = NewFavorite {
            id_users: user_id,
            id_cars: listing_id,
        };
        match self.rest.insert::<_, Favorite>(resources::WISHLIST, &body).await {
            Ok(favorite) => {
                tracing::info!(user_id, listing_id, id = favorite.id_wishlist, "Favorite added");
                Ok(FavoriteOutcome::Added)
            }
            Err(AppError::Conflict(_)) => {
                tracing::debug!(user_id, listing_id, "Listing already in favorites");
                Ok(FavoriteOutcome::AlreadyFavorite)
            }
            Err(error) => Err(error),
        }
    }

    pub async fn remove(&self, user_id: i64, listing_id: i64) -> Result<(), AppError> {
        self.rest
            .delete(
                resources::WISHLIST,
                &Query::new()
                    .eq("id_users", user_id)
                    .eq("id_cars", listing_id),
            )
            .await?;
        tracing::info!(user_id, listing_id, "Favorite removed");
        Ok(())
    }
}

/// One user's favorites as a view shows them
pub struct FavoritesManager {
    service: Arc<FavoritesService>,
    user_id: i64,
    items: Vec<FavoriteCar>,
}

impl FavoritesManager {
    pub fn new(service: Arc<FavoritesService>, user_id: i64) -> Self {
        Self {
            service,
            user_id,
            items: Vec::new(),
        }
    }

    pub fn items(&self) -> &[FavoriteCar] {
        &self.items
    }

    /// Replace the local list with the stored favorites
    pub async fn load(&mut self) -> Result<&[FavoriteCar], AppError> {
        self.items = self.service.list(self.user_id).await?;
        Ok(&self.items)
    }

    /// Add `listing` and show it right away, also when it was already a favorite
    pub async fn add(&mut self, listing: &Listing) -> Result<FavoriteOutcome, AppError> {
        let outcome = self.service.add(self.user_id, listing.id_cars).await?;
        if !self.items.iter().any(|car| car.id_cars == listing.id_cars) {
            self.items.push(FavoriteCar::from_listing(listing));
        }
        Ok(outcome)
    }

    /// Remove a favorite and drop it from the local list without refetching
    pub async fn remove(&mut self, listing_id: i64) -> Result<(), AppError> {
        self.service.remove(self.user_id, listing_id).await?;
        self.items.retain(|car| car.id_cars != listing_id);
        Ok(())
    }

    /// One page of the local list and the page count
    pub fn page(&self, page: u32) -> (&[FavoriteCar], u32) {
        paginate(&self.items, page)
    }
}

/// Slice `items` into pages of ten; there is always at least one page and
/// out-of-range pages are clamped
pub fn paginate<T>(items: &[T], page: u32) -> (&[T], u32) {
    let pages = total_pages(items.len() as u64, PAGE_SIZE).max(1);
    let page = page.clamp(1, pages);
    let start = ((page - 1) * PAGE_SIZE) as usize;
    let end = (start + PAGE_SIZE as usize).min(items.len());
    (&items[start.min(end)..end], pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginate_has_at_least_one_page() {
        let empty: Vec<u8> = Vec::new();
        assert_eq!(paginate(&empty, 1), (&[][..], 1));

        let items: Vec<u32> = (0..23).collect();
        let (page, pages) = paginate(&items, 3);
        assert_eq!(pages, 3);
        assert_eq!(page, &[20, 21, 22]);

        let (page, _) = paginate(&items, 99);
        assert_eq!(page.len(), 3);
        let (page, _) = paginate(&items, 0);
        assert_eq!(page[0], 0);
    }

    #[test]
    fn favorite_card_uses_first_image_and_headline() {
        let listing: Listing = serde_json::from_value(serde_json::json!({
            "id_cars": 4,
            "price": 12500000,
            "brands": {"id_brands": 1, "desc": "Honda"},
            "models": {"id_models": 1, "desc": "Civic"},
            "years": {"id_years": 1, "desc": "2019"},
            "cars_images": [
                {"images": {"id_images": 1, "image": "data:image/png;base64,AA"}},
                {"images": {"id_images": 2, "image": "data:image/png;base64,BB"}}
            ]
        }))
        .unwrap();

        let card = FavoriteCar::from_listing(&listing);
        assert_eq!(card.title, "Honda Civic 2019");
        assert_eq!(card.image.as_deref(), Some("data:image/png;base64,AA"));
        assert_eq!(card.price_label, "₡12\u{a0}500\u{a0}000");
    }
}
