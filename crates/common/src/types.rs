//! Chat-platform identifiers and member data shared by Talking Stick components.
//!
//! Platform ids are snowflakes transmitted as decimal strings, so every id
//! type is a string newtype that serializes transparently.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Borrow the raw snowflake string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

snowflake_id!(
    /// Identifier of a guild (server).
    GuildId
);
snowflake_id!(
    /// Identifier of a text or voice channel.
    ChannelId
);
snowflake_id!(
    /// Identifier of a user.
    UserId
);
snowflake_id!(
    /// Identifier of a message posted in a channel.
    MessageId
);

/// A guild member as seen by a session.
///
/// Sessions hold members by value as a snapshot taken when the session is
/// created; they never own the platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Platform user id.
    pub id: UserId,
    /// Nickname, global name, or username, in that order of preference.
    pub display_name: String,
    /// Avatar URL, if the member has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl Member {
    /// Create a member without an avatar.
    #[must_use]
    pub fn new(id: impl Into<UserId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            avatar_url: None,
        }
    }

    /// Mention markup that pings the member when rendered.
    #[must_use]
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let id = ChannelId::from("80351110224678912");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"80351110224678912\"");

        let back: ChannelId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }

    #[test]
    fn test_member_mention() {
        let member = Member::new("42", "alice");
        assert_eq!(member.mention(), "<@42>");
        assert_eq!(member.id.as_str(), "42");
    }

    #[test]
    fn test_member_without_avatar_omits_field() {
        let json = serde_json::to_value(Member::new("7", "bob")).expect("serialize");
        assert!(json.get("avatar_url").is_none());
        assert_eq!(json["display_name"], "bob");
    }
}
