//! Data models for Google Reader entities.
//!
//! This module contains the normalized payload records returned to callers:
//!
//! - `Subscription`, `Category`, `SubscriptionChange`: feeds and folders
//! - `Item`, `ItemPage`, `ItemIdPage`, `ItemStateChange`: articles and their read state
//! - `UnreadCount`, `Tag`, `UserInfo`: account-level listings
//!
//! and the stream id helpers used to address them upstream.

pub mod feed;
pub mod item;

pub use feed::{
    Category, Subscription, SubscriptionAction, SubscriptionChange, Tag, TagKind, UnreadCount,
    UserInfo,
};
pub use item::{Item, ItemIdPage, ItemPage, ItemStateChange};

pub(crate) use feed::{
    QuickAddResponse, SubscriptionListResponse, TagListResponse, UnreadCountResponse,
    UserInfoResponse,
};
pub(crate) use item::{ItemIdsResponse, StreamContentsResponse};

/// Prefix of feed stream ids
pub const FEED_PREFIX: &str = "feed/";

/// Prefix of folder/tag stream ids
pub const LABEL_PREFIX: &str = "user/-/label/";

pub const STATE_READ: &str = "user/-/state/com.google/read";
pub const STATE_STARRED: &str = "user/-/state/com.google/starred";
pub const STATE_READING_LIST: &str = "user/-/state/com.google/reading-list";

/// Turn a feed argument into a stream id.
///
/// Accepts `feed/42`, a bare id (`42`) or a feed URL; the latter two get
/// the `feed/` prefix.
pub fn feed_stream_id(feed: &str) -> String {
    let feed = feed.trim();
    if feed.starts_with(FEED_PREFIX) {
        feed.to_string()
    } else {
        format!("{}{}", FEED_PREFIX, feed)
    }
}

/// Turn a folder name into its label stream id. Full label ids pass through.
pub fn label_stream_id(folder: &str) -> String {
    let folder = folder.trim();
    if is_label(folder) {
        folder.to_string()
    } else {
        format!("{}{}", LABEL_PREFIX, folder)
    }
}

/// Whether a stream id names a folder/tag (`user/<id>/label/<name>`)
pub fn is_label(stream_id: &str) -> bool {
    stream_id.starts_with("user/") && stream_id.contains("/label/")
}

/// Display name for a label or state stream id: the text after `/label/`,
/// else the last path segment.
pub fn label_name(stream_id: &str) -> &str {
    match stream_id.find("/label/") {
        Some(i) if stream_id.starts_with("user/") => &stream_id[i + "/label/".len()..],
        _ => stream_id.rsplit('/').next().unwrap_or(stream_id),
    }
}
