//! Data layer module
//!
//! Entity models served by the data service, write payloads, and the
//! client-side text rules applied before anything is sent.

mod models;
pub mod validation;

pub use models::*;
