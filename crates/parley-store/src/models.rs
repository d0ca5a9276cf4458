//! Domain model structs persisted in partitions.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be stored as
//! JSON and handed directly to the presentation layer.  Field names are
//! camelCase on the wire.

use std::collections::BTreeMap;

use parley_shared::constants::{
    EMPTY_CONVERSATION_PREVIEW, PREVIEW_AUDIO, PREVIEW_DOCUMENT, PREVIEW_IMAGE, PREVIEW_VIDEO,
    STORY_TTL_MS,
};
use parley_shared::types::AccountId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `accounts.credentials`: identifier -> secret.
pub type Credentials = BTreeMap<AccountId, String>;

/// `accounts.profiles`: identifier -> profile.
pub type Profiles = BTreeMap<AccountId, Profile>;

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// Cached snapshot of another account, held in an owner's contact list.
///
/// This is a cache, not a source of truth: it is refreshed by push whenever
/// the referenced account renames itself or changes avatar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub uid: AccountId,
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Directory entry for one account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            avatar_url: None,
            contacts: Vec::new(),
        }
    }

    pub fn contact(&self, uid: &AccountId) -> Option<&Contact> {
        self.contacts.iter().find(|c| &c.uid == uid)
    }

    pub fn has_contact(&self, uid: &AccountId) -> bool {
        self.contact(uid).is_some()
    }
}

/// A full account view: identifier plus profile.  This is what the session
/// keeps as "current" and what the presentation layer renders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub uid: AccountId,
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
}

impl Account {
    pub fn from_profile(uid: AccountId, profile: &Profile) -> Self {
        Self {
            uid,
            name: profile.name.clone(),
            avatar_url: profile.avatar_url.clone(),
            contacts: profile.contacts.clone(),
        }
    }

    pub fn contact(&self, uid: &AccountId) -> Option<&Contact> {
        self.contacts.iter().find(|c| &c.uid == uid)
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Video,
    Audio,
    Document,
}

impl MessageKind {
    /// Kind of a file message, from its MIME type.
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("image/") {
            Self::Image
        } else if mime.starts_with("video/") {
            Self::Video
        } else if mime.starts_with("audio/") {
            Self::Audio
        } else {
            Self::Document
        }
    }
}

/// An inlined file: a self-contained `data:` URI plus display metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub file_url: String,
    pub file_name: String,
    /// Human-readable size, e.g. `"12.50 KB"`.
    pub file_size: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageBody {
    Text { text: String },
    Image(Attachment),
    Video(Attachment),
    Audio(Attachment),
    Document(Attachment),
}

impl MessageBody {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn file(kind: MessageKind, attachment: Attachment) -> Self {
        match kind {
            MessageKind::Image => Self::Image(attachment),
            MessageKind::Video => Self::Video(attachment),
            MessageKind::Audio => Self::Audio(attachment),
            // A text kind has no attachment slot; keep the file as a document.
            MessageKind::Document | MessageKind::Text => Self::Document(attachment),
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Text { .. } => MessageKind::Text,
            Self::Image(_) => MessageKind::Image,
            Self::Video(_) => MessageKind::Video,
            Self::Audio(_) => MessageKind::Audio,
            Self::Document(_) => MessageKind::Document,
        }
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        match self {
            Self::Text { .. } => None,
            Self::Image(a) | Self::Video(a) | Self::Audio(a) | Self::Document(a) => Some(a),
        }
    }

    /// Text shown as a conversation's last-message preview.
    pub fn preview(&self) -> &str {
        match self {
            Self::Text { text } => text,
            Self::Image(_) => PREVIEW_IMAGE,
            Self::Video(_) => PREVIEW_VIDEO,
            Self::Audio(_) => PREVIEW_AUDIO,
            Self::Document(_) => PREVIEW_DOCUMENT,
        }
    }
}

/// A single chat message.  Immutable once appended to a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Strictly increasing within every conversation that holds it.
    pub id: u64,
    pub sender_uid: AccountId,
    /// Display time, `HH:MM` local.
    pub timestamp: String,
    pub body: MessageBody,
}

// ---------------------------------------------------------------------------
// Conversations
// ---------------------------------------------------------------------------

/// One account's view of its exchange with a counterpart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// The other participant; unique within a ledger.
    pub counterpart: AccountId,
    pub last_message: String,
    pub last_message_timestamp: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new(counterpart: AccountId) -> Self {
        Self {
            counterpart,
            last_message: EMPTY_CONVERSATION_PREVIEW.to_string(),
            last_message_timestamp: String::new(),
            messages: Vec::new(),
        }
    }

    pub fn last_message_id(&self) -> Option<u64> {
        self.messages.last().map(|m| m.id)
    }
}

// ---------------------------------------------------------------------------
// Stories
// ---------------------------------------------------------------------------

/// An ephemeral image post.  Owner name and avatar are snapshots taken at
/// post time and refreshed by profile propagation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: Uuid,
    pub user_id: AccountId,
    pub user_name: String,
    #[serde(default)]
    pub user_avatar_url: Option<String>,
    pub image_url: String,
    /// Creation instant, unix milliseconds.
    pub timestamp: i64,
}

impl Story {
    /// Whether the story is still inside its visibility window at `now_ms`.
    pub fn is_active_at(&self, now_ms: i64) -> bool {
        now_ms - self.timestamp < STORY_TTL_MS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(s: &str) -> AccountId {
        AccountId::parse(s).unwrap()
    }

    #[test]
    fn previews_follow_kind() {
        let att = Attachment {
            file_url: "data:image/png;base64,AA==".into(),
            file_name: "a.png".into(),
            file_size: "0.00 KB".into(),
        };
        assert_eq!(MessageBody::text("hello").preview(), "hello");
        assert_eq!(MessageBody::Image(att.clone()).preview(), "Image");
        assert_eq!(MessageBody::Video(att.clone()).preview(), "Video");
        assert_eq!(MessageBody::Audio(att.clone()).preview(), "Audio");
        assert_eq!(MessageBody::Document(att).preview(), "Document");
    }

    #[test]
    fn kind_from_mime() {
        assert_eq!(MessageKind::from_mime("image/jpeg"), MessageKind::Image);
        assert_eq!(MessageKind::from_mime("video/mp4"), MessageKind::Video);
        assert_eq!(MessageKind::from_mime("audio/ogg"), MessageKind::Audio);
        assert_eq!(MessageKind::from_mime("application/pdf"), MessageKind::Document);
    }

    #[test]
    fn message_json_shape() {
        let msg = Message {
            id: 7,
            sender_uid: uid("12345678"),
            timestamp: "09:30".into(),
            body: MessageBody::text("hi"),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["senderUid"], "12345678");
        assert_eq!(json["body"]["type"], "text");
        assert_eq!(json["body"]["text"], "hi");

        let back: Message = serde_json::from_value(json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn profile_tolerates_missing_optional_fields() {
        let profile: Profile = serde_json::from_str(r#"{"name":"Ann"}"#).unwrap();
        assert_eq!(profile, Profile::new("Ann"));
    }

    #[test]
    fn new_conversation_has_placeholder_preview() {
        let convo = Conversation::new(uid("12345678"));
        assert_eq!(convo.last_message, EMPTY_CONVERSATION_PREVIEW);
        assert!(convo.last_message_timestamp.is_empty());
        assert_eq!(convo.last_message_id(), None);
    }

    #[test]
    fn story_activity_window() {
        let story = Story {
            id: Uuid::new_v4(),
            user_id: uid("12345678"),
            user_name: "Ann".into(),
            user_avatar_url: None,
            image_url: "data:image/png;base64,AA==".into(),
            timestamp: 0,
        };
        assert!(story.is_active_at(STORY_TTL_MS - 1));
        assert!(!story.is_active_at(STORY_TTL_MS));
    }
}
