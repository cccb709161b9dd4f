//! REST data service access
//!
//! Query construction, item-range pagination and the HTTP client. Resource
//! names are collected here so every workflow addresses the same tables.

mod client;
pub mod query;
pub mod range;

pub use client::{Page, RestClient};
pub use query::{Direction, Op, Query};
pub use range::{ContentRange, PAGE_SIZE, PageRange, total_pages};

/// Resource names exposed by the data service
pub mod resources {
    pub const CARS: &str = "cars";
    pub const CARS_IMAGES: &str = "cars_images";
    pub const IMAGES: &str = "images";
    pub const AUDIT: &str = "audit";
    pub const USERS: &str = "users";
    pub const WISHLIST: &str = "wishlist";
}
