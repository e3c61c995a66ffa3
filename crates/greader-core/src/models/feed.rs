//! Subscription, folder and account models.
//!
//! The public types are the normalized payload records handed back to
//! callers; the `*Api` types mirror the upstream JSON and stay private to
//! the conversion code.

use serde::{Deserialize, Serialize};

use crate::utils::unescape_html;

use super::{is_label, label_name};

/// A feed the user is subscribed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// Stream id, e.g. `feed/42`
    pub id: String,
    pub title: String,
    /// URL of the feed document itself
    pub url: Option<String>,
    pub html_url: Option<String>,
    pub icon_url: Option<String>,
    pub categories: Vec<Category>,
}

/// A folder (label) a subscription is filed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub label: String,
}

/// What a subscription edit did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionAction {
    Subscribed,
    Unsubscribed,
    Renamed,
    Moved,
}

/// Result of a subscription edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionChange {
    pub feed_id: String,
    pub action: SubscriptionAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
}

/// Unread count for a feed, folder or state stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCount {
    pub id: String,
    pub count: u64,
    pub newest_item_timestamp_usec: Option<String>,
}

/// Kind of entry in the tag list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKind {
    Folder,
    Tag,
    State,
}

/// A folder, user tag or built-in state stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    /// Display name; the last path segment for labels
    pub name: String,
    pub kind: TagKind,
    pub unread_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_id: String,
    pub user_name: String,
    pub user_email: Option<String>,
}

// ============================================================================
// Upstream response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct SubscriptionListResponse {
    #[serde(default)]
    subscriptions: Vec<SubscriptionApi>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionApi {
    id: String,
    #[serde(default)]
    title: String,
    url: Option<String>,
    #[serde(rename = "htmlUrl")]
    html_url: Option<String>,
    #[serde(rename = "iconUrl")]
    icon_url: Option<String>,
    #[serde(default)]
    categories: Vec<CategoryApi>,
}

#[derive(Debug, Deserialize)]
struct CategoryApi {
    id: String,
    label: Option<String>,
}

impl SubscriptionListResponse {
    pub(crate) fn into_subscriptions(self) -> Vec<Subscription> {
        self.subscriptions
            .into_iter()
            .map(SubscriptionApi::into_subscription)
            .collect()
    }
}

impl SubscriptionApi {
    fn into_subscription(self) -> Subscription {
        Subscription {
            title: unescape_html(&self.title),
            categories: self
                .categories
                .into_iter()
                .map(|c| Category {
                    label: match c.label {
                        Some(label) => unescape_html(&label),
                        None => unescape_html(label_name(&c.id)),
                    },
                    id: c.id,
                })
                .collect(),
            id: self.id,
            url: self.url.filter(|u| !u.is_empty()),
            html_url: self.html_url.filter(|u| !u.is_empty()),
            icon_url: self.icon_url.filter(|u| !u.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct UnreadCountResponse {
    #[serde(default)]
    unreadcounts: Vec<UnreadCountApi>,
}

#[derive(Debug, Deserialize)]
struct UnreadCountApi {
    id: String,
    count: u64,
    #[serde(rename = "newestItemTimestampUsec")]
    newest_item_timestamp_usec: Option<String>,
}

impl UnreadCountResponse {
    pub(crate) fn into_counts(self) -> Vec<UnreadCount> {
        self.unreadcounts
            .into_iter()
            .map(|c| UnreadCount {
                id: c.id,
                count: c.count,
                newest_item_timestamp_usec: c.newest_item_timestamp_usec,
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TagListResponse {
    #[serde(default)]
    tags: Vec<TagApi>,
}

#[derive(Debug, Deserialize)]
struct TagApi {
    id: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    unread_count: Option<u64>,
}

impl TagListResponse {
    pub(crate) fn into_tags(self) -> Vec<Tag> {
        self.tags
            .into_iter()
            .map(|t| {
                let kind = match t.kind.as_deref() {
                    Some("folder") => TagKind::Folder,
                    Some("tag") => TagKind::Tag,
                    _ if is_label(&t.id) => TagKind::Folder,
                    _ => TagKind::State,
                };
                Tag {
                    name: unescape_html(label_name(&t.id)),
                    id: t.id,
                    kind,
                    unread_count: t.unread_count,
                }
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserInfoResponse {
    #[serde(rename = "userId")]
    user_id: String,
    #[serde(rename = "userName")]
    user_name: String,
    #[serde(rename = "userEmail")]
    user_email: Option<String>,
}

impl UserInfoResponse {
    pub(crate) fn into_user_info(self) -> UserInfo {
        UserInfo {
            user_id: self.user_id,
            user_name: self.user_name,
            user_email: self.user_email.filter(|e| !e.is_empty()),
        }
    }
}

/// Answer to `subscription/quickadd`. `numResults` is 0 when nothing
/// could be subscribed.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuickAddResponse {
    #[serde(default)]
    num_results: u32,
    stream_id: Option<String>,
    stream_name: Option<String>,
    error: Option<String>,
}

impl QuickAddResponse {
    /// The subscription made, or the server's reason for not making one
    pub(crate) fn into_change(self) -> Result<SubscriptionChange, String> {
        match self.stream_id.filter(|id| !id.is_empty()) {
            Some(feed_id) if self.num_results > 0 => Ok(SubscriptionChange {
                feed_id,
                action: SubscriptionAction::Subscribed,
                title: self
                    .stream_name
                    .filter(|n| !n.is_empty())
                    .map(|n| unescape_html(&n)),
                folder: None,
            }),
            _ => Err(self
                .error
                .unwrap_or_else(|| "quickadd found no feed to subscribe to".to_string())),
        }
    }
}
