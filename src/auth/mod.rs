//! Client-side identity
//!
//! Handles:
//! - Reading claims from the stored bearer token
//! - Persisting and clearing that token
//! - Sign-up form validation

pub mod session;
pub mod signup;
mod store;

pub use session::{TokenClaims, decode_token};
pub use signup::{SignUpErrors, SignUpForm};
pub use store::TokenStore;
