//! External collaborators: persistence, cache, and geolocation.

pub mod cache;
pub mod geo;
pub mod persistence;
