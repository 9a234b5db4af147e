//! HTTP geolocation client backed by ipapi.co.

use super::{GeoLookup, LOCAL_COUNTRY};
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "http://ipapi.co";

/// Geo lookup client querying the ipapi.co country endpoint.
///
/// Requests carry a bounded timeout; any transport error, non-success status,
/// or empty body degrades to `None`. Loopback and private ranges never reach
/// the network.
pub struct IpApiGeoLookup {
    http: reqwest::Client,
    base_url: String,
}

impl IpApiGeoLookup {
    /// Builds the client with the given per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns the underlying builder error if the HTTP client cannot be
    /// constructed.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Overrides the endpoint base URL. Used by tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Whether an address should resolve to the local sentinel without a network
/// round trip.
///
/// Upstream proxies hand us the literal `"unknown"` when they could not
/// determine a client address; treat it like localhost.
fn is_local_address(ip: &str) -> Option<bool> {
    if ip == "unknown" || ip == "localhost" {
        return Some(true);
    }

    match ip.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => Some(
            v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified(),
        ),
        Ok(IpAddr::V6(v6)) => Some(
            v6.is_loopback() || v6.is_unspecified() || (v6.segments()[0] & 0xfe00) == 0xfc00,
        ),
        // Not an address at all: skip the doomed network call.
        Err(_) => None,
    }
}

#[async_trait]
impl GeoLookup for IpApiGeoLookup {
    async fn country_for_ip(&self, ip: &str) -> Option<String> {
        match is_local_address(ip) {
            Some(true) => return Some(LOCAL_COUNTRY.to_string()),
            Some(false) => {}
            None => {
                debug!("Unparseable IP address, skipping geo lookup: {}", ip);
                return None;
            }
        }

        let url = format!("{}/{}/country/", self.base_url, ip);

        let response = match self.http.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Failed to get country for IP {}: {}", ip, e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(
                "Geo lookup for IP {} returned status {}",
                ip,
                response.status()
            );
            return None;
        }

        match response.text().await {
            Ok(body) => {
                let country = body.trim();
                if country.is_empty() {
                    None
                } else {
                    Some(country.to_string())
                }
            }
            Err(e) => {
                warn!("Failed to read geo response for IP {}: {}", ip, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_is_local() {
        assert_eq!(is_local_address("127.0.0.1"), Some(true));
        assert_eq!(is_local_address("::1"), Some(true));
    }

    #[test]
    fn test_private_ranges_are_local() {
        assert_eq!(is_local_address("10.1.2.3"), Some(true));
        assert_eq!(is_local_address("192.168.0.17"), Some(true));
        assert_eq!(is_local_address("172.16.5.5"), Some(true));
        assert_eq!(is_local_address("fd00::1"), Some(true));
    }

    #[test]
    fn test_public_address_is_not_local() {
        assert_eq!(is_local_address("8.8.8.8"), Some(false));
        assert_eq!(is_local_address("2001:4860:4860::8888"), Some(false));
    }

    #[test]
    fn test_proxy_sentinels_are_local() {
        assert_eq!(is_local_address("unknown"), Some(true));
        assert_eq!(is_local_address("localhost"), Some(true));
    }

    #[test]
    fn test_garbage_is_unparseable() {
        assert_eq!(is_local_address("not-an-ip"), None);
    }

    #[tokio::test]
    async fn test_private_ip_short_circuits_without_network() {
        let geo = IpApiGeoLookup::new(Duration::from_secs(1)).unwrap();

        // No server is listening anywhere; this must still answer instantly.
        let country = geo.country_for_ip("192.168.1.1").await;
        assert_eq!(country.as_deref(), Some(LOCAL_COUNTRY));
    }

    #[tokio::test]
    async fn test_unparseable_ip_yields_unset() {
        let geo = IpApiGeoLookup::new(Duration::from_secs(1)).unwrap();

        let country = geo.country_for_ip("definitely-not-an-ip").await;
        assert_eq!(country, None);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_yields_unset() {
        let geo = IpApiGeoLookup::new(Duration::from_millis(200))
            .unwrap()
            .with_base_url("http://127.0.0.1:1");

        let country = geo.country_for_ip("8.8.8.8").await;
        assert_eq!(country, None);
    }
}
