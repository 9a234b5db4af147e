//! Link entity representing a shortened URL mapping.

use chrono::{DateTime, Utc};

/// A shortened URL owned by a user.
///
/// Represents the mapping between a globally unique short code and a target
/// URL. Ownership (`user_id`) changes only through account reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub id: i64,
    pub user_id: i64,
    pub short_code: String,
    pub target_url: String,
    pub created_at: DateTime<Utc>,
}

impl Link {
    /// Creates a new Link instance.
    pub fn new(
        id: i64,
        user_id: i64,
        short_code: String,
        target_url: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            short_code,
            target_url,
            created_at,
        }
    }
}

/// Input data for creating a new link.
///
/// The stats row is created alongside the link itself.
#[derive(Debug, Clone)]
pub struct NewLink {
    pub user_id: i64,
    pub short_code: String,
    pub target_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_creation() {
        let now = Utc::now();
        let link = Link::new(
            1,
            10,
            "ab12cd".to_string(),
            "https://example.com".to_string(),
            now,
        );

        assert_eq!(link.id, 1);
        assert_eq!(link.user_id, 10);
        assert_eq!(link.short_code, "ab12cd");
        assert_eq!(link.target_url, "https://example.com");
        assert_eq!(link.created_at, now);
    }

    #[test]
    fn test_new_link_creation() {
        let new_link = NewLink {
            user_id: 42,
            short_code: "xyz789".to_string(),
            target_url: "https://rust-lang.org".to_string(),
        };

        assert_eq!(new_link.user_id, 42);
        assert_eq!(new_link.short_code, "xyz789");
        assert_eq!(new_link.target_url, "https://rust-lang.org");
    }
}
