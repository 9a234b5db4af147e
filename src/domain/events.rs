//! Domain events carried over the message broker.
//!
//! The wire format mirrors the upstream emitters: every message is a JSON
//! envelope `{"pattern": "<KIND>", "data": {...}}` with camelCase payload
//! fields. Decoding is strict on shape: an unknown pattern, a missing `data`
//! object, or a type mismatch is a decode error, never a coerced value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Discriminant for routing a message to its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    LinkRedirect,
    AccountsMerged,
    UserDeleted,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::LinkRedirect => "LINK_REDIRECT",
            EventKind::AccountsMerged => "USER_ACCOUNTS_MERGED",
            EventKind::UserDeleted => "USER_DELETED",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A short link was visited.
///
/// Carries either the link id or the stats id; publishers that already hold
/// the stats row send `linkStatsId`, but both are accepted because upstream
/// emitters disagree on which one they put on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRedirectEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_stats_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Two user accounts were merged; links move from source to target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountsMergedEvent {
    pub source_user_id: i64,
    pub target_user_id: i64,
}

/// A user account was deleted; all owned links go with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDeletedEvent {
    pub user_id: i64,
}

/// Tagged union of every event this service publishes or consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pattern", content = "data")]
pub enum DomainEvent {
    #[serde(rename = "LINK_REDIRECT")]
    LinkRedirect(LinkRedirectEvent),
    #[serde(rename = "USER_ACCOUNTS_MERGED")]
    AccountsMerged(AccountsMergedEvent),
    #[serde(rename = "USER_DELETED")]
    UserDeleted(UserDeletedEvent),
}

impl DomainEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DomainEvent::LinkRedirect(_) => EventKind::LinkRedirect,
            DomainEvent::AccountsMerged(_) => EventKind::AccountsMerged,
            DomainEvent::UserDeleted(_) => EventKind::UserDeleted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_redirect_envelope_decodes() {
        let raw = r#"{
            "pattern": "LINK_REDIRECT",
            "data": {
                "linkStatsId": 7,
                "userAgent": "Mozilla/5.0",
                "ip": "8.8.8.8",
                "timestamp": "2024-06-01T12:00:00Z"
            }
        }"#;

        let event: DomainEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.kind(), EventKind::LinkRedirect);

        match event {
            DomainEvent::LinkRedirect(ev) => {
                assert_eq!(ev.link_stats_id, Some(7));
                assert_eq!(ev.link_id, None);
                assert_eq!(ev.user_agent.as_deref(), Some("Mozilla/5.0"));
                assert_eq!(ev.ip.as_deref(), Some("8.8.8.8"));
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn test_link_redirect_accepts_link_id_only() {
        let raw = r#"{
            "pattern": "LINK_REDIRECT",
            "data": { "linkId": 3, "timestamp": "2024-06-01T12:00:00Z" }
        }"#;

        let event: DomainEvent = serde_json::from_str(raw).unwrap();
        match event {
            DomainEvent::LinkRedirect(ev) => {
                assert_eq!(ev.link_id, Some(3));
                assert!(ev.link_stats_id.is_none());
                assert!(ev.user_agent.is_none());
                assert!(ev.ip.is_none());
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn test_accounts_merged_envelope_decodes() {
        let raw = r#"{
            "pattern": "USER_ACCOUNTS_MERGED",
            "data": { "sourceUserId": 10, "targetUserId": 20 }
        }"#;

        let event: DomainEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(
            event,
            DomainEvent::AccountsMerged(AccountsMergedEvent {
                source_user_id: 10,
                target_user_id: 20,
            })
        );
    }

    #[test]
    fn test_user_deleted_envelope_decodes() {
        let raw = r#"{ "pattern": "USER_DELETED", "data": { "userId": 5 } }"#;

        let event: DomainEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.kind(), EventKind::UserDeleted);
    }

    #[test]
    fn test_unknown_pattern_is_rejected() {
        let raw = r#"{ "pattern": "LINK_EXPIRED", "data": {} }"#;
        assert!(serde_json::from_str::<DomainEvent>(raw).is_err());
    }

    #[test]
    fn test_missing_data_is_rejected() {
        let raw = r#"{ "pattern": "USER_DELETED" }"#;
        assert!(serde_json::from_str::<DomainEvent>(raw).is_err());
    }

    #[test]
    fn test_type_mismatch_is_rejected() {
        let raw = r#"{ "pattern": "USER_DELETED", "data": { "userId": "five" } }"#;
        assert!(serde_json::from_str::<DomainEvent>(raw).is_err());
    }

    #[test]
    fn test_serialized_envelope_uses_camel_case() {
        let event = DomainEvent::AccountsMerged(AccountsMergedEvent {
            source_user_id: 1,
            target_user_id: 2,
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["pattern"], "USER_ACCOUNTS_MERGED");
        assert_eq!(json["data"]["sourceUserId"], 1);
        assert_eq!(json["data"]["targetUserId"], 2);
    }

    #[test]
    fn test_redirect_event_omits_absent_fields() {
        let event = DomainEvent::LinkRedirect(LinkRedirectEvent {
            link_id: None,
            link_stats_id: Some(4),
            user_agent: None,
            ip: None,
            timestamp: Utc::now(),
        });

        let json = serde_json::to_value(&event).unwrap();
        let data = json["data"].as_object().unwrap();
        assert!(!data.contains_key("linkId"));
        assert!(!data.contains_key("userAgent"));
        assert!(!data.contains_key("ip"));
        assert!(data.contains_key("linkStatsId"));
    }
}
