//! Cascading deletion
//!
//! The data service does not cascade deletes, so dependent rows are removed
//! first: image links, images, favorites, the listing, then its audit row.
//! Account deletion repeats this for every owned listing before detaching
//! and deleting the user's own image and audit rows and the user itself.

use std::sync::Arc;

use serde::Deserialize;

use super::steps::StepLog;
use crate::auth::TokenStore;
use crate::data::{ListingImageLink, ListingKeys, UserDetach};
use crate::error::AppError;
use crate::rest::{Query, RestClient, resources};

/// Route the client returns to once the account is gone
pub const LANDING_ROUTE: &str = "/";

/// What a deletion removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionOutcome {
    pub listings_deleted: usize,
    pub images_deleted: usize,
    /// Set when the caller must navigate away
    pub redirect_to: Option<&'static str>,
}

/// References a user row holds to its own image and audit rows
#[derive(Debug, Deserialize)]
struct UserRefs {
    #[serde(default)]
    id_images: Option<i64>,
    #[serde(default)]
    id_audit: Option<i64>,
    #[serde(default)]
    images: Option<ImageRefs>,
}

#[derive(Debug, Deserialize)]
struct ImageRefs {
    #[serde(default)]
    id_audit: Option<i64>,
}

/// Deletion service
pub struct DeletionService {
    rest: Arc<RestClient>,
    tokens: TokenStore,
}

impl DeletionService {
    pub fn new(rest: Arc<RestClient>, tokens: TokenStore) -> Self {
        Self { rest, tokens }
    }

    /// Delete one listing and every row that depends on it
    ///
    /// # Errors
    /// `NotFound` if the listing does not exist; otherwise the failing
    /// step's error, with the steps before it already applied
    pub async fn delete_listing(&self, listing_id: i64) -> Result<DeletionOutcome, AppError> {
        let mut log = StepLog::new("delete_listing");
        let keys: Vec<ListingKeys> = log
            .run(
                "resolve listing",
                self.rest.select(
                    resources::CARS,
                    &Query::new()
                        .eq("id_cars", listing_id)
                        .select("id_cars,id_audit"),
                ),
            )
            .await?;
        let keys = keys.into_iter().next().ok_or(AppError::NotFound)?;

        let images_deleted = self.cascade_listing(&mut log, &keys).await?;
        log.finish();

        tracing::info!(listing_id, images_deleted, "Listing deleted");
        Ok(DeletionOutcome {
            listings_deleted: 1,
            images_deleted,
            redirect_to: None,
        })
    }

    /// Delete a user account with all of its listings and favorites, then
    /// clear the stored session
    pub async fn delete_user(&self, user_id: i64) -> Result<DeletionOutcome, AppError> {
        let by_user = Query::new().eq("id_user", user_id);
        let mut log = StepLog::new("delete_user");

        log.run(
            "delete favorites of user",
            self.rest
                .delete(resources::WISHLIST, &Query::new().eq("id_users", user_id)),
        )
        .await?;

        let owned: Vec<ListingKeys> = log
            .run(
                "resolve owned listings",
                self.rest.select(
                    resources::CARS,
                    &Query::new()
                        .eq("id_users", user_id)
                        .select("id_cars,id_audit"),
                ),
            )
            .await?;

        let mut outcome = DeletionOutcome::default();
        for keys in &owned {
            outcome.images_deleted += self.cascade_listing(&mut log, keys).await?;
            outcome.listings_deleted += 1;
        }

        let refs: Vec<UserRefs> = log
            .run(
                "resolve profile references",
                self.rest.select(
                    resources::USERS,
                    &by_user.clone().select("id_images,id_audit,images(id_audit)"),
                ),
            )
            .await?;
        let refs = refs.into_iter().next().ok_or(AppError::NotFound)?;

        log.run(
            "detach profile image and audit",
            self.rest
                .patch(resources::USERS, &by_user, &UserDetach::default()),
        )
        .await?;

        if let Some(image_id) = refs.id_images {
            log.run(
                "delete profile image",
                self.rest
                    .delete(resources::IMAGES, &Query::new().eq("id_images", image_id)),
            )
            .await?;
            outcome.images_deleted += 1;

            if let Some(audit_id) = refs.images.and_then(|image| image.id_audit) {
                log.run(
                    "delete profile image audit",
                    self.rest
                        .delete(resources::AUDIT, &Query::new().eq("id_audit", audit_id)),
                )
                .await?;
            }
        }

        if let Some(audit_id) = refs.id_audit {
            log.run(
                "delete user audit",
                self.rest
                    .delete(resources::AUDIT, &Query::new().eq("id_audit", audit_id)),
            )
            .await?;
        }

        log.run("delete user", self.rest.delete(resources::USERS, &by_user))
            .await?;
        log.finish();

        self.tokens.clear()?;
        tracing::info!(
            user_id,
            listings = outcome.listings_deleted,
            images = outcome.images_deleted,
            "Account deleted"
        );

        outcome.redirect_to = Some(LANDING_ROUTE);
        Ok(outcome)
    }

    /// Dependent rows of one listing, then the listing and its audit row
    async fn cascade_listing(
        &self,
        log: &mut StepLog,
        keys: &ListingKeys,
    ) -> Result<usize, AppError> {
        let listing_id = keys.id_cars;
        let by_listing = Query::new().eq("id_cars", listing_id);

        let links: Vec<ListingImageLink> = log
            .run(
                format!("resolve image links of {listing_id}"),
                self.rest.select(
                    resources::CARS_IMAGES,
                    &by_listing.clone().select("id_cars,id_images"),
                ),
            )
            .await?;

        log.run(
            format!("delete image links of {listing_id}"),
            self.rest.delete(resources::CARS_IMAGES, &by_listing),
        )
        .await?;

        for link in &links {
            log.run(
                format!("delete image {}", link.id_images),
                self.rest
                    .delete(resources::IMAGES, &Query::new().eq("id_images", link.id_images)),
            )
            .await?;
        }

        log.run(
            format!("delete favorites of {listing_id}"),
            self.rest.delete(resources::WISHLIST, &by_listing),
        )
        .await?;

        log.run(
            format!("delete listing {listing_id}"),
            self.rest.delete(resources::CARS, &by_listing),
        )
        .await?;

        if let Some(audit_id) = keys.id_audit {
            log.run(
                format!("delete audit of {listing_id}"),
                self.rest
                    .delete(resources::AUDIT, &Query::new().eq("id_audit", audit_id)),
            )
            .await?;
        }

        Ok(links.len())
    }
}
