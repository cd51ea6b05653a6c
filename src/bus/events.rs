// ============================================================================
// Event envelopes
// ============================================================================
//
// Tagged union of every event kind the system publishes, keyed by routing
// key. Payloads are validated on receipt; unknown routing keys and malformed
// bodies are rejected so nothing opaque flows through a consumer.
//
// ============================================================================

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const POST_CREATED: &str = "post.created";
pub const POST_DELETED: &str = "post.deleted";
pub const MEDIA_DELETED: &str = "media.deleted";

/// A post came into existence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostCreated {
    pub post_id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub media_ids: Vec<Uuid>,
    /// Unix timestamp in seconds
    pub occurred_at: i64,
}

/// A post was removed; consumers owning derived state (attached media,
/// denormalized listings) cascade their own cleanup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDeleted {
    pub post_id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub media_ids: Vec<Uuid>,
    pub occurred_at: i64,
}

/// Media objects were removed; cached views embedding them are stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaDeleted {
    pub media_ids: Vec<Uuid>,
    /// Post whose deletion triggered the cascade, when applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<Uuid>,
    pub occurred_at: i64,
}

/// Every event kind the bus carries. The routing key doubles as the type tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    PostCreated(PostCreated),
    PostDeleted(PostDeleted),
    MediaDeleted(MediaDeleted),
}

#[derive(Error, Debug)]
pub enum EventDecodeError {
    #[error("unknown routing key: {0}")]
    UnknownRoutingKey(String),
    #[error("malformed event body: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl Event {
    pub fn routing_key(&self) -> &'static str {
        match self {
            Event::PostCreated(_) => POST_CREATED,
            Event::PostDeleted(_) => POST_DELETED,
            Event::MediaDeleted(_) => MEDIA_DELETED,
        }
    }

    /// Serialize the payload for the wire (UTF-8 JSON).
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        match self {
            Event::PostCreated(payload) => serde_json::to_vec(payload),
            Event::PostDeleted(payload) => serde_json::to_vec(payload),
            Event::MediaDeleted(payload) => serde_json::to_vec(payload),
        }
    }

    /// Decode a delivery into a typed event, validating shape against the
    /// schema the routing key promises.
    pub fn decode(routing_key: &str, body: &[u8]) -> Result<Event, EventDecodeError> {
        match routing_key {
            POST_CREATED => Ok(Event::PostCreated(serde_json::from_slice(body)?)),
            POST_DELETED => Ok(Event::PostDeleted(serde_json::from_slice(body)?)),
            MEDIA_DELETED => Ok(Event::MediaDeleted(serde_json::from_slice(body)?)),
            other => Err(EventDecodeError::UnknownRoutingKey(other.to_string())),
        }
    }

    pub fn post_created(post_id: Uuid, user_id: Uuid, media_ids: Vec<Uuid>) -> Event {
        Event::PostCreated(PostCreated {
            post_id,
            user_id,
            media_ids,
            occurred_at: Utc::now().timestamp(),
        })
    }

    pub fn post_deleted(post_id: Uuid, user_id: Uuid, media_ids: Vec<Uuid>) -> Event {
        Event::PostDeleted(PostDeleted {
            post_id,
            user_id,
            media_ids,
            occurred_at: Utc::now().timestamp(),
        })
    }

    pub fn media_deleted(media_ids: Vec<Uuid>, post_id: Option<Uuid>) -> Event {
        Event::MediaDeleted(MediaDeleted {
            media_ids,
            post_id,
            occurred_at: Utc::now().timestamp(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_keys_are_dot_delimited() {
        let event = Event::post_created(Uuid::new_v4(), Uuid::new_v4(), vec![]);
        assert_eq!(event.routing_key(), "post.created");
        let event = Event::media_deleted(vec![Uuid::new_v4()], None);
        assert_eq!(event.routing_key(), "media.deleted");
    }

    #[test]
    fn encode_decode_round_trip() {
        let event = Event::post_deleted(Uuid::new_v4(), Uuid::new_v4(), vec![Uuid::new_v4()]);
        let body = event.encode().unwrap();
        let decoded = Event::decode(event.routing_key(), &body).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn wire_fields_are_camel_case() {
        let event = Event::post_deleted(Uuid::new_v4(), Uuid::new_v4(), vec![]);
        let body = event.encode().unwrap();
        let raw: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(raw.get("postId").is_some());
        assert!(raw.get("userId").is_some());
        assert!(raw.get("post_id").is_none());
    }

    #[test]
    fn unknown_routing_key_is_rejected() {
        let err = Event::decode("user.banned", b"{}").unwrap_err();
        assert!(matches!(err, EventDecodeError::UnknownRoutingKey(_)));
    }

    #[test]
    fn malformed_body_is_rejected() {
        let err = Event::decode(POST_DELETED, b"not json").unwrap_err();
        assert!(matches!(err, EventDecodeError::Malformed(_)));

        // Valid JSON with the wrong shape is also rejected
        let err = Event::decode(POST_DELETED, br#"{"unrelated": true}"#).unwrap_err();
        assert!(matches!(err, EventDecodeError::Malformed(_)));
    }

    #[test]
    fn missing_media_ids_defaults_to_empty() {
        let body = format!(
            r#"{{"postId":"{}","userId":"{}","occurredAt":0}}"#,
            Uuid::new_v4(),
            Uuid::new_v4()
        );
        let event = Event::decode(POST_DELETED, body.as_bytes()).unwrap();
        match event {
            Event::PostDeleted(payload) => assert!(payload.media_ids.is_empty()),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
