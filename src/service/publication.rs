//! Publication workflow
//!
//! Creating and editing a listing. Both paths validate the form draft
//! before any request is sent and then run their requests strictly in
//! sequence, since each step needs ids produced by the previous one.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};

use super::listing_query::{LISTING_SELECT, by_id_query};
use super::steps::StepLog;
use crate::auth::TokenStore;
use crate::data::validation::{is_alphabetic_text, parse_whole_amount};
use crate::data::{
    Audit, AuditTouch, DEFAULT_DOORS, Image, Listing, ListingImageLink, ListingPatch, NewAudit,
    NewImage, NewListing, SoldPatch,
};
use crate::error::AppError;
use crate::rest::{Direction, Query, RestClient, resources};

// =============================================================================
// Form draft
// =============================================================================

/// A picture picked in the form, not yet stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Wrap raw file contents, sniffing the MIME type from the bytes first
    /// and the file extension second
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime = image::guess_format(&bytes)
            .or_else(|_| image::ImageFormat::from_path(&file_name))
            .map(|format| format.to_mime_type().to_string())
            .unwrap_or_else(|_| "application/octet-stream".to_string());

        Self {
            file_name,
            mime,
            bytes,
        }
    }

    /// Read a picture from disk
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::from_bytes(file_name, bytes))
    }

    /// Base64 `data:` URL, the form images are stored in
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime,
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

/// Values of the publication form
///
/// Selections use 0 for "nothing selected"; the price is kept as typed.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingDraft {
    pub id_brands: i64,
    pub id_models: i64,
    pub id_styles: i64,
    pub exterior_color: String,
    pub interior_color: String,
    pub id_transmission: i64,
    pub id_displacement: i64,
    pub id_fuel: i64,
    pub receives: bool,
    pub negotiable: bool,
    pub number_of_doors: i32,
    pub id_year: i64,
    pub price: String,
    /// Ids of already stored images the user kept
    pub existing_images: Vec<i64>,
    /// Pictures added in this session
    pub new_images: Vec<ImageUpload>,
}

impl Default for ListingDraft {
    fn default() -> Self {
        Self {
            id_brands: 0,
            id_models: 0,
            id_styles: 0,
            exterior_color: String::new(),
            interior_color: String::new(),
            id_transmission: 0,
            id_displacement: 0,
            id_fuel: 0,
            receives: false,
            negotiable: false,
            number_of_doors: DEFAULT_DOORS,
            id_year: 0,
            price: String::new(),
            existing_images: Vec::new(),
            new_images: Vec::new(),
        }
    }
}

impl ListingDraft {
    /// Prefill the form with a stored listing
    pub fn from_listing(listing: &Listing) -> Self {
        Self {
            id_brands: listing.id_brands,
            id_models: listing.id_models,
            id_styles: listing.id_styles,
            exterior_color: listing.exterior_color.clone(),
            interior_color: listing.interior_color.clone(),
            id_transmission: listing.id_transmission,
            id_displacement: listing.id_displacement,
            id_fuel: listing.id_fuel,
            receives: listing.receives,
            negotiable: listing.negotiable,
            number_of_doors: listing.number_of_doors,
            id_year: listing.id_year,
            price: listing.price.to_string(),
            existing_images: listing.image_ids(),
            new_images: Vec::new(),
        }
    }

    pub fn image_count(&self) -> usize {
        self.existing_images.len() + self.new_images.len()
    }

    /// Check every rule in form order and report the first one that fails
    ///
    /// # Errors
    /// Returns `Validation` with the message shown to the user
    pub fn validate(&self) -> Result<(), AppError> {
        self.validate_fields()?;
        require_images(self.image_count())
    }

    /// Validate an edit of a listing whose stored images are `original_images`
    ///
    /// The image rule counts what survives the edit: stored images still
    /// retained plus new uploads. Retained ids foreign to the listing count
    /// for nothing.
    ///
    /// # Errors
    /// Returns `Validation` with the message shown to the user
    pub fn validate_edit(&self, original_images: &[i64]) -> Result<ImageDiff, AppError> {
        self.validate_fields()?;
        let diff = ImageDiff::compute(original_images, &self.existing_images, &self.new_images);
        require_images(diff.image_count())?;
        Ok(diff)
    }

    fn validate_fields(&self) -> Result<(), AppError> {
        let selections = [
            (self.id_brands, "Seleccione una marca"),
            (self.id_models, "Seleccione un modelo"),
            (self.id_styles, "Seleccione un estilo"),
            (self.id_transmission, "Seleccione una transmisión"),
            (self.id_displacement, "Seleccione un cilindraje"),
            (self.id_fuel, "Seleccione un tipo de combustible"),
            (self.id_year, "Seleccione un año"),
        ];
        if let Some((_, message)) = selections.iter().find(|(id, _)| *id == 0) {
            return Err(AppError::Validation((*message).to_string()));
        }

        check_color(&self.exterior_color, "exterior")?;
        check_color(&self.interior_color, "interior")?;

        if self.price.trim().is_empty() {
            return Err(AppError::Validation("Ingrese el precio".to_string()));
        }
        self.price_value()?;
        Ok(())
    }

    /// Price as a whole amount
    pub fn price_value(&self) -> Result<i64, AppError> {
        parse_whole_amount(&self.price)
            .ok_or_else(|| AppError::Validation("El precio debe ser numérico".to_string()))
    }

    fn to_new_listing(&self, id_audit: i64, owner: i64) -> Result<NewListing, AppError> {
        Ok(NewListing {
            id_brands: self.id_brands,
            id_models: self.id_models,
            id_styles: self.id_styles,
            exterior_color: self.exterior_color.trim().to_string(),
            interior_color: self.interior_color.trim().to_string(),
            id_transmission: self.id_transmission,
            id_displacement: self.id_displacement,
            id_fuel: self.id_fuel,
            receives: self.receives,
            negotiable: self.negotiable,
            number_of_doors: self.number_of_doors,
            id_year: self.id_year,
            price: self.price_value()?,
            id_audit,
            sold: false,
            id_users: owner,
        })
    }

    fn to_patch(&self) -> Result<ListingPatch, AppError> {
        Ok(ListingPatch {
            id_brands: self.id_brands,
            id_models: self.id_models,
            id_styles: self.id_styles,
            exterior_color: self.exterior_color.trim().to_string(),
            interior_color: self.interior_color.trim().to_string(),
            id_transmission: self.id_transmission,
            id_displacement: self.id_displacement,
            id_fuel: self.id_fuel,
            receives: self.receives,
            negotiable: self.negotiable,
            number_of_doors: self.number_of_doors,
            id_year: self.id_year,
            price: self.price_value()?,
        })
    }
}

fn check_color(value: &str, which: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("Ingrese el color {which}")));
    }
    if !is_alphabetic_text(value.trim()) {
        return Err(AppError::Validation(format!(
            "El color {which} solo debe contener letras"
        )));
    }
    Ok(())
}

fn require_images(count: usize) -> Result<(), AppError> {
    if count == 0 {
        return Err(AppError::Validation(
            "Agregue al menos una imagen".to_string(),
        ));
    }
    Ok(())
}

// =============================================================================
// Image diff
// =============================================================================

/// Image changes an edit has to apply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageDiff {
    /// Stored images the user kept
    pub kept: Vec<i64>,
    /// Stored images the user removed
    pub to_delete: Vec<i64>,
    /// New pictures to store
    pub to_insert: Vec<ImageUpload>,
}

impl ImageDiff {
    /// Three-way diff of the stored set, the retained set and the added pictures
    ///
    /// Retained ids that were never part of the stored set are ignored.
    pub fn compute(original: &[i64], retained: &[i64], added: &[ImageUpload]) -> Self {
        let retained: HashSet<i64> = retained.iter().copied().collect();
        let mut seen = HashSet::new();
        let (kept, to_delete): (Vec<i64>, Vec<i64>) = original
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .partition(|id| retained.contains(id));

        Self {
            kept,
            to_delete,
            to_insert: added.to_vec(),
        }
    }

    /// Images the listing holds once the diff is applied
    pub fn image_count(&self) -> usize {
        self.kept.len() + self.to_insert.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_insert.is_empty()
    }
}

// =============================================================================
// Service
// =============================================================================

/// What a publish or edit changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedListing {
    pub id_cars: i64,
    pub id_audit: i64,
    pub images_added: usize,
    pub images_removed: usize,
}

/// Publication service
pub struct PublicationService {
    rest: Arc<RestClient>,
    tokens: TokenStore,
}

impl PublicationService {
    pub fn new(rest: Arc<RestClient>, tokens: TokenStore) -> Self {
        Self { rest, tokens }
    }

    /// Publish a new listing owned by the logged-in user
    ///
    /// Creates the audit row, then the listing, then one image row and one
    /// join row per picture.
    ///
    /// # Errors
    /// `Validation` or `Unauthorized` before any request; otherwise the
    /// error of the failing step, with earlier steps left in place
    pub async fn create(&self, draft: &ListingDraft) -> Result<PublishedListing, AppError> {
        draft.validate()?;
        let owner = self.tokens.logged_user_id().ok_or(AppError::Unauthorized)?;
        let body_without_audit = draft.to_new_listing(0, owner)?;

        let mut log = StepLog::new("publish_listing");
        let audit: Audit = log
            .run("create audit", self.rest.insert(resources::AUDIT, &NewAudit::default()))
            .await?;

        let body = NewListing {
            id_audit: audit.id_audit,
            ..body_without_audit
        };
        let listing: Listing = log
            .run("create listing", self.rest.insert(resources::CARS, &body))
            .await?;

        for upload in &draft.new_images {
            self.attach_image(&mut log, listing.id_cars, upload).await?;
        }

        tracing::info!(
            listing_id = listing.id_cars,
            owner,
            images = draft.new_images.len(),
            "Listing published"
        );
        log.finish();

        Ok(PublishedListing {
            id_cars: listing.id_cars,
            id_audit: audit.id_audit,
            images_added: draft.new_images.len(),
            images_removed: 0,
        })
    }

    /// Load a listing into the edit form
    ///
    /// # Errors
    /// `SoldListing` for sold listings, `NotFound` for unknown ids
    pub async fn open_for_edit(&self, listing_id: i64) -> Result<ListingDraft, AppError> {
        let rows: Vec<Listing> = self
            .rest
            .select(resources::CARS, &by_id_query(listing_id))
            .await?;
        let listing = rows.into_iter().next().ok_or(AppError::NotFound)?;
        edit_draft(&listing)
    }

    /// Save the edit form over `original`
    ///
    /// Touches the audit row, patches the listing, removes dropped images
    /// (join row first, then the image row) and stores the new ones.
    pub async fn edit(
        &self,
        original: &Listing,
        draft: &ListingDraft,
    ) -> Result<PublishedListing, AppError> {
        if original.sold {
            return Err(AppError::SoldListing);
        }
        let diff = draft.validate_edit(&original.image_ids())?;
        let patch = draft.to_patch()?;

        let listing_id = original.id_cars;
        let by_listing = Query::new().eq("id_cars", listing_id);
        let mut log = StepLog::new("edit_listing");

        log.run(
            "touch audit",
            self.rest.patch(
                resources::AUDIT,
                &Query::new().eq("id_audit", original.id_audit),
                &AuditTouch::now(),
            ),
        )
        .await?;

        log.run(
            "patch listing",
            self.rest.patch(resources::CARS, &by_listing, &patch),
        )
        .await?;

        for image_id in &diff.to_delete {
            let link = by_listing.clone().eq("id_images", image_id);
            log.run(
                format!("delete image link {image_id}"),
                self.rest.delete(resources::CARS_IMAGES, &link),
            )
            .await?;
            log.run(
                format!("delete image {image_id}"),
                self.rest
                    .delete(resources::IMAGES, &Query::new().eq("id_images", image_id)),
            )
            .await?;
        }

        for upload in &diff.to_insert {
            self.attach_image(&mut log, listing_id, upload).await?;
        }

        tracing::info!(
            listing_id,
            removed = diff.to_delete.len(),
            added = diff.to_insert.len(),
            "Listing updated"
        );
        log.finish();

        Ok(PublishedListing {
            id_cars: listing_id,
            id_audit: original.id_audit,
            images_added: diff.to_insert.len(),
            images_removed: diff.to_delete.len(),
        })
    }

    /// Every listing of the logged-in user, sold ones included
    pub async fn my_listings(&self) -> Result<Vec<Listing>, AppError> {
        let owner = self.tokens.logged_user_id().ok_or(AppError::Unauthorized)?;
        let query = Query::new()
            .eq("id_users", owner)
            .select(LISTING_SELECT)
            .order("id_cars", Direction::Asc);
        self.rest.select(resources::CARS, &query).await
    }

    /// Flag a listing as sold; it leaves the public browse and can no longer be edited
    pub async fn mark_sold(&self, listing: &Listing) -> Result<(), AppError> {
        if listing.sold {
            return Err(AppError::SoldListing);
        }
        let mut log = StepLog::new("mark_sold");
        log.run(
            "touch audit",
            self.rest.patch(
                resources::AUDIT,
                &Query::new().eq("id_audit", listing.id_audit),
                &AuditTouch::now(),
            ),
        )
        .await?;
        log.run(
            "flag sold",
            self.rest.patch(
                resources::CARS,
                &Query::new().eq("id_cars", listing.id_cars),
                &SoldPatch { sold: true },
            ),
        )
        .await?;

        tracing::info!(listing_id = listing.id_cars, "Listing marked as sold");
        log.finish();
        Ok(())
    }

    async fn attach_image(
        &self,
        log: &mut StepLog,
        listing_id: i64,
        upload: &ImageUpload,
    ) -> Result<(), AppError> {
        let body = NewImage {
            image: upload.to_data_url(),
            id_audit: None,
        };
        let image: Image = log
            .run(
                format!("create image {}", upload.file_name),
                self.rest.insert(resources::IMAGES, &body),
            )
            .await?;

        let link = ListingImageLink {
            id_cars: listing_id,
            id_images: image.id_images,
        };
        let _: ListingImageLink = log
            .run(
                format!("link image {}", image.id_images),
                self.rest.insert(resources::CARS_IMAGES, &link),
            )
            .await?;
        Ok(())
    }
}

/// Edit form for `listing`, refused for sold listings
pub fn edit_draft(listing: &Listing) -> Result<ListingDraft, AppError> {
    if listing.sold {
        tracing::info!(listing_id = listing.id_cars, "Edit blocked for sold listing");
        return Err(AppError::SoldListing);
    }
    Ok(ListingDraft::from_listing(listing))
}
