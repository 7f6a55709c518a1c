//! Permission grants embedded in an access token.
//!
//! Field names follow the platform's wire format (camelCase inside the
//! `video` claim), so this struct serializes directly into the JWT.

use serde::{Deserialize, Serialize};

/// Video grants for a room participant.
///
/// Empty/false fields are kept out of the encoded claim where the platform
/// treats absence and `false` the same, keeping tokens small.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoGrants {
    /// Permission to join the named room.
    pub room_join: bool,

    /// Room name the grant is scoped to.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub room: String,

    /// Permission to publish media.
    pub can_publish: bool,

    /// Permission to subscribe to other participants.
    pub can_subscribe: bool,

    /// Permission to publish data messages.
    pub can_publish_data: bool,

    /// When non-empty, restricts publishable sources (e.g. `["microphone"]`).
    /// An empty list means all sources are allowed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub can_publish_sources: Vec<String>,

    /// Administrative access to the room (used by service-side tokens,
    /// never handed to end users).
    pub room_admin: bool,
}

impl VideoGrants {
    /// Full participant grant for a room: join, publish all sources,
    /// subscribe, publish data.
    pub fn participant(room: &str) -> Self {
        VideoGrants {
            room_join: true,
            room: room.to_string(),
            can_publish: true,
            can_subscribe: true,
            can_publish_data: true,
            ..VideoGrants::default()
        }
    }

    /// Restrict publishing to the given sources.
    #[must_use]
    pub fn with_publish_sources(mut self, sources: &[&str]) -> Self {
        self.can_publish_sources = sources.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Administrative grant for a room, used to authenticate service-side
    /// RPCs such as agent dispatch.
    pub fn room_admin(room: &str) -> Self {
        VideoGrants {
            room_admin: true,
            room: room.to_string(),
            ..VideoGrants::default()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_grant_serializes_camel_case() {
        let grants = VideoGrants::participant("studio-1");
        let value = serde_json::to_value(&grants).unwrap();

        assert_eq!(value["roomJoin"], true);
        assert_eq!(value["room"], "studio-1");
        assert_eq!(value["canPublish"], true);
        assert_eq!(value["canSubscribe"], true);
        assert_eq!(value["canPublishData"], true);
        // All sources allowed: the restriction list must be absent entirely.
        assert!(value.get("canPublishSources").is_none());
    }

    #[test]
    fn test_publish_source_restriction_is_encoded() {
        let grants = VideoGrants::participant("studio-1").with_publish_sources(&["microphone"]);
        let value = serde_json::to_value(&grants).unwrap();

        assert_eq!(
            value["canPublishSources"],
            serde_json::json!(["microphone"])
        );
    }

    #[test]
    fn test_room_admin_grant_has_no_participant_permissions() {
        let grants = VideoGrants::room_admin("studio-1");

        assert!(grants.room_admin);
        assert!(!grants.room_join);
        assert!(!grants.can_publish);
        assert!(!grants.can_subscribe);
    }

    #[test]
    fn test_grants_round_trip() {
        let grants = VideoGrants::participant("r").with_publish_sources(&["microphone"]);
        let json = serde_json::to_string(&grants).unwrap();
        let decoded: VideoGrants = serde_json::from_str(&json).unwrap();
        assert_eq!(grants, decoded);
    }
}
