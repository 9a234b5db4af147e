//! IP geolocation lookup.

mod ip_api;

pub use ip_api::IpApiGeoLookup;

use async_trait::async_trait;

/// Country code returned for loopback, private, and unresolvable-by-design
/// addresses without touching the network.
pub const LOCAL_COUNTRY: &str = "Local";

/// Trait for resolving a client IP address to a country.
///
/// Implementations absorb their own failures: a lookup that errors or times
/// out yields `None`, never an error, so analytics handlers degrade to an
/// unset country instead of failing the whole event.
///
/// # Implementations
///
/// - [`IpApiGeoLookup`] - HTTP lookup against ipapi.co
/// - [`crate::test_utils::StaticGeoLookup`] - fixed answer for tests
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GeoLookup: Send + Sync {
    /// Resolves an IP address to a country code or name.
    ///
    /// Returns `None` when the lookup fails or the address cannot be
    /// resolved; loopback/private ranges return [`LOCAL_COUNTRY`].
    async fn country_for_ip(&self, ip: &str) -> Option<String>;
}
