//! Persistent token storage
//!
//! A single file holds the raw bearer token of the logged-in user. Read
//! helpers never fail: a missing or undecodable token simply means nobody
//! is logged in.

use std::path::{Path, PathBuf};

use super::session::{TokenClaims, decode_token};
use crate::error::AppError;

/// File-backed token storage
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw token, if one is stored
    pub fn load(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(token) => {
                let token = token.trim();
                (!token.is_empty()).then(|| token.to_string())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read token file");
                None
            }
        }
    }

    /// Persist `token`, creating the parent directory when needed
    ///
    /// # Errors
    /// Returns `Storage` if the file cannot be written
    pub fn save(&self, token: &str) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, token.trim())?;
        tracing::debug!(path = %self.path.display(), "Token stored");
        Ok(())
    }

    /// Forget the stored token; clearing an empty store is not an error
    pub fn clear(&self) -> Result<(), AppError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "Session cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Claims of the stored token
    pub fn logged_user(&self) -> Option<TokenClaims> {
        let token = self.load()?;
        match decode_token(&token) {
            Ok(claims) => Some(claims),
            Err(_) => {
                tracing::debug!("Stored token could not be decoded");
                None
            }
        }
    }

    pub fn logged_user_id(&self) -> Option<i64> {
        self.logged_user().map(|claims| claims.id_user)
    }

    pub fn logged_user_role(&self) -> Option<i32> {
        self.logged_user().and_then(|claims| claims.rol)
    }

    pub fn is_logged(&self) -> bool {
        self.logged_user().is_some()
    }
}
