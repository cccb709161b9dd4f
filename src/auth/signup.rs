//! Sign-up form validation
//!
//! Every field is checked and all problems are reported together so the
//! form can mark each input.

use serde::{Deserialize, Serialize};

use crate::data::validation::{is_alphabetic_text, is_email};

/// Minimum password length accepted at sign-up
pub const MIN_PASSWORD_LEN: usize = 6;

/// Values typed into the sign-up form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignUpForm {
    pub name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Per-field error messages; `None` means the field is fine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignUpErrors {
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

impl SignUpErrors {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl SignUpForm {
    pub fn validate(&self) -> SignUpErrors {
        let name_error = |value: &str| {
            if value.trim().is_empty() {
                Some("Este campo es obligatorio".to_string())
            } else if !is_alphabetic_text(value) {
                Some("El nombre solo debe contener letras".to_string())
            } else {
                None
            }
        };

        let email = if self.email.trim().is_empty() {
            Some("El correo es obligatorio".to_string())
        } else if !is_email(self.email.trim()) {
            Some("Correo electrónico no válido".to_string())
        } else {
            None
        };

        let password = (self.password.chars().count() < MIN_PASSWORD_LEN).then(|| {
            format!("La contraseña debe tener al menos {MIN_PASSWORD_LEN} caracteres")
        });

        // Confirmation is only compared once the user started typing it.
        let confirm_password = (!self.confirm_password.is_empty()
            && self.confirm_password != self.password)
            .then(|| "Las contraseñas no coinciden".to_string());

        SignUpErrors {
            name: name_error(&self.name),
            last_name: name_error(&self.last_name),
            email,
            password,
            confirm_password,
        }
    }
}
