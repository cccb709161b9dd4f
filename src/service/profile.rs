//! Profile service
//!
//! Reading and updating the logged-in user's profile, including the
//! profile picture and the audit rows of both.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::publication::ImageUpload;
use super::steps::StepLog;
use crate::data::validation::{is_alphabetic_text, is_email};
use crate::data::{Audit, AuditTouch, Image, NewAudit, NewImage, User, UserPatch};
use crate::error::AppError;
use crate::rest::{Query, RestClient, resources};

const PROFILE_SELECT: &str = "*,audit(*),images(*)";

/// Editable profile fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub idcard: Option<String>,
    pub age: Option<i32>,
    /// New profile picture as a `data:` URL
    pub image: Option<String>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        if !is_alphabetic_text(self.name.trim()) {
            return Err(AppError::Validation(
                "El nombre solo debe contener letras".to_string(),
            ));
        }
        if !is_alphabetic_text(self.last_name.trim()) {
            return Err(AppError::Validation(
                "El apellido solo debe contener letras".to_string(),
            ));
        }
        if !is_email(self.email.trim()) {
            return Err(AppError::Validation(
                "Correo electrónico no válido".to_string(),
            ));
        }
        if self.age.is_some_and(|age| !(0..=150).contains(&age)) {
            return Err(AppError::Validation("Edad no válida".to_string()));
        }
        Ok(())
    }
}

/// Encode a picked file as the `data:` URL stored for profile pictures
pub fn image_from_bytes(file_name: &str, bytes: Vec<u8>) -> String {
    ImageUpload::from_bytes(file_name, bytes).to_data_url()
}

/// Profile service
pub struct ProfileService {
    rest: Arc<RestClient>,
}

impl ProfileService {
    pub fn new(rest: Arc<RestClient>) -> Self {
        Self { rest }
    }

    /// User row with its audit and picture embedded
    pub async fn fetch(&self, user_id: i64) -> Result<User, AppError> {
        let rows: Vec<User> = self
            .rest
            .select(
                resources::USERS,
                &Query::new().eq("id_user", user_id).select(PROFILE_SELECT),
            )
            .await?;
        rows.into_iter().next().ok_or(AppError::NotFound)
    }

    /// Save profile changes
    ///
    /// Touches (or creates) the user's audit row; when a new picture is
    /// given, touches (or creates) the picture's audit row and patches (or
    /// creates) the picture; finally patches the user row.
    pub async fn update(&self, user_id: i64, update: &ProfileUpdate) -> Result<User, AppError> {
        update.validate()?;
        let current = self.fetch(user_id).await?;
        let mut log = StepLog::new("update_profile");

        let id_audit = self.touch_or_create_audit(&mut log, current.id_audit, "user").await?;

        let id_images = match &update.image {
            Some(data_url) => {
                let image_audit = current.images.as_ref().and_then(|image| image.id_audit);
                let image_audit = self
                    .touch_or_create_audit(&mut log, image_audit, "profile image")
                    .await?;
                let body = NewImage {
                    image: data_url.clone(),
                    id_audit: Some(image_audit),
                };

                match current.id_images {
                    Some(image_id) => {
                        log.run(
                            "patch profile image",
                            self.rest.patch(
                                resources::IMAGES,
                                &Query::new().eq("id_images", image_id),
                                &body,
                            ),
                        )
                        .await?;
                        Some(image_id)
                    }
                    None => {
                        let image: Image = log
                            .run(
                                "create profile image",
                                self.rest.insert(resources::IMAGES, &body),
                            )
                            .await?;
                        Some(image.id_images)
                    }
                }
            }
            None => current.id_images,
        };

        let patch = UserPatch {
            name: update.name.trim().to_string(),
            last_name: update.last_name.trim().to_string(),
            email: update.email.trim().to_string(),
            phone: update.phone.clone(),
            idcard: update.idcard.clone(),
            age: update.age,
            id_audit: Some(id_audit),
            id_images,
        };
        let rows: Vec<User> = log
            .run(
                "patch user",
                self.rest.update(
                    resources::USERS,
                    &Query::new().eq("id_user", user_id),
                    &patch,
                ),
            )
            .await?;
        log.finish();

        tracing::info!(user_id, "Profile updated");
        rows.into_iter().next().ok_or(AppError::NotFound)
    }

    async fn touch_or_create_audit(
        &self,
        log: &mut StepLog,
        existing: Option<i64>,
        owner: &str,
    ) -> Result<i64, AppError> {
        match existing {
            Some(audit_id) => {
                log.run(
                    format!("touch {owner} audit"),
                    self.rest.patch(
                        resources::AUDIT,
                        &Query::new().eq("id_audit", audit_id),
                        &AuditTouch::now(),
                    ),
                )
                .await?;
                Ok(audit_id)
            }
            None => {
                let audit: Audit = log
                    .run(
                        format!("create {owner} audit"),
                        self.rest.insert(resources::AUDIT, &NewAudit::default()),
                    )
                    .await?;
                Ok(audit.id_audit)
            }
        }
    }
}
