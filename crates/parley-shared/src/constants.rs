/// Application name
pub const APP_NAME: &str = "Parley";

/// Number of decimal digits in an account identifier
pub const ACCOUNT_ID_LEN: usize = 8;

/// Smallest and largest generated identifiers (no leading zero)
pub const ACCOUNT_ID_MIN: u32 = 10_000_000;
pub const ACCOUNT_ID_MAX: u32 = 99_999_999;

/// Minimum secret length, enforced at account creation only
pub const MIN_SECRET_LEN: usize = 4;

/// A story stays visible for 14 hours after it is posted
pub const STORY_TTL_MS: i64 = 14 * 60 * 60 * 1000;

/// Maximum number of active stories per account
pub const MAX_ACTIVE_STORIES: usize = 15;

/// Playback time per story in milliseconds
pub const STORY_DURATION_MS: u64 = 5_000;

/// Preview shown for a conversation with no messages yet
pub const EMPTY_CONVERSATION_PREVIEW: &str = "Say hi to start the conversation!";

/// Preview labels for file messages
pub const PREVIEW_IMAGE: &str = "Image";
pub const PREVIEW_VIDEO: &str = "Video";
pub const PREVIEW_AUDIO: &str = "Audio";
pub const PREVIEW_DOCUMENT: &str = "Document";

/// Reply returned when the automated reply service cannot be reached
pub const REPLY_FALLBACK: &str =
    "Sorry, I'm having trouble connecting right now. Please try again later.";
