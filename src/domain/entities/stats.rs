//! Redirect statistics entities.

use chrono::{DateTime, Utc};

/// Aggregated redirect counter for a single link.
///
/// One-to-one with [`super::Link`]; `redirects_count` never decreases and is
/// only updated by the redirect stats handler, together with an appended
/// [`LinkRedirect`] record, in one atomic store operation.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkStats {
    pub id: i64,
    pub link_id: i64,
    pub redirects_count: i64,
}

/// A single recorded redirect.
///
/// Append-only: rows are never mutated or reordered after insertion. Display
/// order is `clicked_at` descending.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkRedirect {
    pub id: i64,
    pub link_stats_id: i64,
    pub ip: Option<String>,
    pub country: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub device: Option<String>,
    pub is_mobile: Option<bool>,
    pub is_tablet: Option<bool>,
    pub clicked_at: DateTime<Utc>,
}

/// Input data for appending a redirect record.
///
/// All client metadata is optional: an event without a user-agent or IP still
/// counts, it just carries less detail.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRedirect {
    pub ip: Option<String>,
    pub country: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub device: Option<String>,
    pub is_mobile: Option<bool>,
    pub is_tablet: Option<bool>,
    pub clicked_at: DateTime<Utc>,
}

impl NewRedirect {
    /// A record with every client field unset, for events carrying no
    /// user-agent or IP.
    pub fn bare(clicked_at: DateTime<Utc>) -> Self {
        Self {
            ip: None,
            country: None,
            browser: None,
            os: None,
            device: None,
            is_mobile: None,
            is_tablet: None,
            clicked_at,
        }
    }
}

/// Per-user aggregate across all owned links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerTotals {
    pub total_links: i64,
    pub total_redirects: i64,
}
