//! Logical operations and their upstream requests.
//!
//! An [`Operation`] is what the external dispatcher hands us: a kebab-case
//! name plus keyed arguments. Each argument struct knows which single
//! upstream request it maps to; the [`Translator`] sends it and shapes the
//! answer into an [`OperationResult`].

pub mod result;
pub mod translator;

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};

use crate::api::request::escape_stream_path;
use crate::api::{ApiError, UpstreamRequest};
use crate::models::{
    feed_stream_id, label_stream_id, FEED_PREFIX, STATE_READ, STATE_READING_LIST, STATE_STARRED,
};

pub use result::{Ack, ErrorDescriptor, ErrorKind, OperationResult, Payload};
pub use translator::Translator;

/// Items per page when the caller doesn't say
pub const DEFAULT_COUNT: u32 = 20;

/// Upper bound the Google Reader API accepts for `n`
pub const MAX_COUNT: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "kebab-case")]
pub enum Operation {
    ListSubscriptions,
    ListUnreadItems(ListUnreadItems),
    ListItemsByFeed(ListItemsByFeed),
    MarkItemState(MarkItemState),
    SubscribeToFeed(SubscribeToFeed),
    UnsubscribeFromFeed(UnsubscribeFromFeed),
    RenameFeed(RenameFeed),
    MoveFeedToFolder(MoveFeedToFolder),
    ListStarredItems(ListStarredItems),
    GetItems(GetItems),
    MarkFeedRead(MarkFeedRead),
    MarkFolderRead(MarkFolderRead),
    SetItemLabel(SetItemLabel),
    DeleteFolder(DeleteFolder),
    GetUnreadCounts,
    GetUserInfo,
    ListTags,
    ListItemIds(ListItemIds),
    QuickSubscribe(QuickSubscribe),
}

impl Operation {
    /// Every operation name, in declaration order
    pub const NAMES: [&'static str; 19] = [
        "list-subscriptions",
        "list-unread-items",
        "list-items-by-feed",
        "mark-item-state",
        "subscribe-to-feed",
        "unsubscribe-from-feed",
        "rename-feed",
        "move-feed-to-folder",
        "list-starred-items",
        "get-items",
        "mark-feed-read",
        "mark-folder-read",
        "set-item-label",
        "delete-folder",
        "get-unread-counts",
        "get-user-info",
        "list-tags",
        "list-item-ids",
        "quick-subscribe",
    ];

    /// Decode an operation from its name and a JSON object of arguments.
    /// `null` arguments are treated as an empty object.
    pub fn decode(name: &str, arguments: serde_json::Value) -> Result<Self, serde_json::Error> {
        let mut object = match arguments {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => serde_json::Map::new(),
            other => {
                return Err(serde::de::Error::custom(format!(
                    "arguments must be an object, got {}",
                    other
                )))
            }
        };
        object.insert("operation".to_string(), serde_json::Value::from(name));
        serde_json::from_value(serde_json::Value::Object(object))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::ListSubscriptions => "list-subscriptions",
            Operation::ListUnreadItems(_) => "list-unread-items",
            Operation::ListItemsByFeed(_) => "list-items-by-feed",
            Operation::MarkItemState(_) => "mark-item-state",
            Operation::SubscribeToFeed(_) => "subscribe-to-feed",
            Operation::UnsubscribeFromFeed(_) => "unsubscribe-from-feed",
            Operation::RenameFeed(_) => "rename-feed",
            Operation::MoveFeedToFolder(_) => "move-feed-to-folder",
            Operation::ListStarredItems(_) => "list-starred-items",
            Operation::GetItems(_) => "get-items",
            Operation::MarkFeedRead(_) => "mark-feed-read",
            Operation::MarkFolderRead(_) => "mark-folder-read",
            Operation::SetItemLabel(_) => "set-item-label",
            Operation::DeleteFolder(_) => "delete-folder",
            Operation::GetUnreadCounts => "get-unread-counts",
            Operation::GetUserInfo => "get-user-info",
            Operation::ListTags => "list-tags",
            Operation::ListItemIds(_) => "list-item-ids",
            Operation::QuickSubscribe(_) => "quick-subscribe",
        }
    }
}

// ============================================================================
// Arguments
// ============================================================================

/// Accept a number either as a JSON number or as a numeric string (`"20"`).
fn number_or_string<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Deserialize<'de>,
    T::Err: fmt::Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Number(T),
        Text(String),
    }

    match Option::<Raw<T>>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("invalid number {:?}: {}", s, e))),
    }
}

/// Listing order; the protocol's `r` parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    #[default]
    #[serde(alias = "d", alias = "n")]
    NewestFirst,
    #[serde(alias = "o")]
    OldestFirst,
}

impl SortOrder {
    fn as_param(self) -> &'static str {
        match self {
            SortOrder::NewestFirst => "d",
            SortOrder::OldestFirst => "o",
        }
    }
}

/// Order and publication window shared by every stream listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
    /// Unix seconds; only items published at or after this (`ot`)
    #[serde(
        default,
        deserialize_with = "number_or_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub newer_than: Option<i64>,
    /// Unix seconds; only items published before this (`nt`)
    #[serde(
        default,
        deserialize_with = "number_or_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub older_than: Option<i64>,
}

impl StreamFilter {
    fn apply(&self, request: UpstreamRequest) -> UpstreamRequest {
        request
            .query_opt("r", self.sort_order.map(SortOrder::as_param))
            .query_opt("ot", self.newer_than.map(|t| t.to_string()))
            .query_opt("nt", self.older_than.map(|t| t.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUnreadItems {
    /// Restrict to one feed; the whole reading list otherwise
    #[serde(default)]
    pub feed: Option<String>,
    #[serde(default, deserialize_with = "number_or_string")]
    pub count: Option<u32>,
    #[serde(default)]
    pub continuation: Option<String>,
    #[serde(flatten)]
    pub filter: StreamFilter,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItemsByFeed {
    pub feed: String,
    #[serde(default, deserialize_with = "number_or_string")]
    pub count: Option<u32>,
    #[serde(default)]
    pub continuation: Option<String>,
    #[serde(default)]
    pub exclude_read: bool,
    #[serde(flatten)]
    pub filter: StreamFilter,
}

/// Mark one item (`item`) or several (`items`) read or unread.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkItemState {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub item: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<String>,
    pub read: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeToFeed {
    /// URL of the feed document
    pub url: String,
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsubscribeFromFeed {
    pub feed: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameFeed {
    pub feed: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveFeedToFolder {
    pub feed: String,
    pub folder: String,
    /// Folder to take the feed out of; FreshRSS files a feed in one folder,
    /// so this can usually be left out.
    #[serde(default)]
    pub from_folder: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListStarredItems {
    #[serde(default, deserialize_with = "number_or_string")]
    pub count: Option<u32>,
    #[serde(default)]
    pub continuation: Option<String>,
    #[serde(flatten)]
    pub filter: StreamFilter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetItems {
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkFeedRead {
    pub feed: String,
    /// Unix seconds; items newer than this stay unread. Defaults to now.
    #[serde(default, deserialize_with = "number_or_string")]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkFolderRead {
    pub folder: String,
    /// Unix seconds; items newer than this stay unread. Defaults to now.
    #[serde(default, deserialize_with = "number_or_string")]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetItemLabel {
    pub item: String,
    pub label: String,
    /// true attaches the label, false removes it
    pub present: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFolder {
    pub folder: String,
}

/// Item ids of a stream, without their contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItemIds {
    /// Any stream id (`feed/42`, `user/-/label/News`, a state stream) or a
    /// bare feed id
    pub stream: String,
    #[serde(default, deserialize_with = "number_or_string")]
    pub count: Option<u32>,
    #[serde(default)]
    pub continuation: Option<String>,
    #[serde(default)]
    pub exclude_read: bool,
    #[serde(default)]
    pub starred_only: bool,
    #[serde(flatten)]
    pub filter: StreamFilter,
}

/// Subscribe by URL alone and let the server pick title and folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickSubscribe {
    pub url: String,
}

// ============================================================================
// Request construction
// ============================================================================

fn required<'a>(name: &str, value: &'a str) -> Result<&'a str, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ApiError::InvalidRequest(format!("{} must not be empty", name)))
    } else {
        Ok(value)
    }
}

fn optional(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn clamp_count(count: Option<u32>) -> String {
    count.unwrap_or(DEFAULT_COUNT).clamp(1, MAX_COUNT).to_string()
}

/// `mark-all-as-read` takes `ts` in microseconds
fn older_than_usec(timestamp: Option<i64>) -> String {
    let secs = timestamp.unwrap_or_else(|| Utc::now().timestamp());
    secs.saturating_mul(1_000_000).to_string()
}

/// Stream ids pass through; anything else is taken as a feed.
fn any_stream_id(stream: &str) -> String {
    if stream.starts_with("user/") || stream.starts_with(FEED_PREFIX) {
        stream.to_string()
    } else {
        feed_stream_id(stream)
    }
}

fn stream_contents(
    stream_id: &str,
    count: Option<u32>,
    continuation: Option<&str>,
    filter: &StreamFilter,
) -> UpstreamRequest {
    let request = UpstreamRequest::get(format!("stream/contents/{}", escape_stream_path(stream_id)))
        .query("output", "json")
        .query("n", clamp_count(count))
        .query_opt("c", optional(continuation));
    filter.apply(request)
}

pub(crate) fn list_subscriptions_request() -> UpstreamRequest {
    UpstreamRequest::get("subscription/list").query("output", "json")
}

pub(crate) fn unread_counts_request() -> UpstreamRequest {
    UpstreamRequest::get("unread-count").query("output", "json")
}

pub(crate) fn user_info_request() -> UpstreamRequest {
    UpstreamRequest::get("user-info").query("output", "json")
}

pub(crate) fn tag_list_request() -> UpstreamRequest {
    UpstreamRequest::get("tag/list").query("output", "json")
}

impl ListUnreadItems {
    pub fn request(&self) -> Result<UpstreamRequest, ApiError> {
        let stream = match optional(self.feed.as_deref()) {
            Some(feed) => feed_stream_id(feed),
            None => STATE_READING_LIST.to_string(),
        };
        Ok(
            stream_contents(&stream, self.count, self.continuation.as_deref(), &self.filter)
                .query("xt", STATE_READ),
        )
    }
}

impl ListItemsByFeed {
    pub fn request(&self) -> Result<UpstreamRequest, ApiError> {
        let stream = feed_stream_id(required("feed", &self.feed)?);
        let request =
            stream_contents(&stream, self.count, self.continuation.as_deref(), &self.filter);
        Ok(if self.exclude_read {
            request.query("xt", STATE_READ)
        } else {
            request
        })
    }
}

impl MarkItemState {
    /// `item` first, then `items`, blanks rejected
    pub fn ids(&self) -> Result<Vec<&str>, ApiError> {
        let mut ids = Vec::with_capacity(self.items.len() + 1);
        if !self.item.trim().is_empty() {
            ids.push(self.item.trim());
        }
        for item in &self.items {
            ids.push(required("items", item)?);
        }
        if ids.is_empty() {
            return Err(ApiError::InvalidRequest(
                "item or items must be given".to_string(),
            ));
        }
        Ok(ids)
    }

    pub fn request(&self) -> Result<UpstreamRequest, ApiError> {
        let mut request = UpstreamRequest::edit("edit-tag");
        for id in self.ids()? {
            request = request.form("i", id);
        }
        Ok(if self.read {
            request.form("a", STATE_READ)
        } else {
            request.form("r", STATE_READ)
        })
    }
}

impl SubscribeToFeed {
    pub fn request(&self) -> Result<UpstreamRequest, ApiError> {
        Ok(UpstreamRequest::edit("subscription/edit")
            .form("ac", "subscribe")
            .form("s", feed_stream_id(required("url", &self.url)?))
            .form_opt("a", optional(self.folder.as_deref()).map(label_stream_id))
            .form_opt("t", optional(self.title.as_deref())))
    }
}

impl UnsubscribeFromFeed {
    pub fn request(&self) -> Result<UpstreamRequest, ApiError> {
        Ok(UpstreamRequest::edit("subscription/edit")
            .form("ac", "unsubscribe")
            .form("s", feed_stream_id(required("feed", &self.feed)?)))
    }
}

impl RenameFeed {
    pub fn request(&self) -> Result<UpstreamRequest, ApiError> {
        Ok(UpstreamRequest::edit("subscription/edit")
            .form("ac", "edit")
            .form("s", feed_stream_id(required("feed", &self.feed)?))
            .form("t", required("title", &self.title)?))
    }
}

impl MoveFeedToFolder {
    pub fn request(&self) -> Result<UpstreamRequest, ApiError> {
        Ok(UpstreamRequest::edit("subscription/edit")
            .form("ac", "edit")
            .form("s", feed_stream_id(required("feed", &self.feed)?))
            .form("a", label_stream_id(required("folder", &self.folder)?))
            .form_opt("r", optional(self.from_folder.as_deref()).map(label_stream_id)))
    }
}

impl ListStarredItems {
    pub fn request(&self) -> Result<UpstreamRequest, ApiError> {
        Ok(stream_contents(
            STATE_STARRED,
            self.count,
            self.continuation.as_deref(),
            &self.filter,
        ))
    }
}

impl GetItems {
    pub fn request(&self) -> Result<UpstreamRequest, ApiError> {
        if self.items.is_empty() {
            return Err(ApiError::InvalidRequest("items must not be empty".to_string()));
        }
        let mut request = UpstreamRequest::post("stream/items/contents").query("output", "json");
        for item in &self.items {
            request = request.form("i", required("items", item)?);
        }
        Ok(request)
    }
}

impl MarkFeedRead {
    pub fn request(&self) -> Result<UpstreamRequest, ApiError> {
        Ok(UpstreamRequest::edit("mark-all-as-read")
            .form("s", feed_stream_id(required("feed", &self.feed)?))
            .form("ts", older_than_usec(self.timestamp)))
    }
}

impl MarkFolderRead {
    pub fn request(&self) -> Result<UpstreamRequest, ApiError> {
        Ok(UpstreamRequest::edit("mark-all-as-read")
            .form("s", label_stream_id(required("folder", &self.folder)?))
            .form("ts", older_than_usec(self.timestamp)))
    }
}

impl SetItemLabel {
    pub fn request(&self) -> Result<UpstreamRequest, ApiError> {
        let request = UpstreamRequest::edit("edit-tag").form("i", required("item", &self.item)?);
        let label = label_stream_id(required("label", &self.label)?);
        Ok(if self.present {
            request.form("a", label)
        } else {
            request.form("r", label)
        })
    }
}

impl DeleteFolder {
    pub fn request(&self) -> Result<UpstreamRequest, ApiError> {
        Ok(UpstreamRequest::edit("disable-tag")
            .form("s", label_stream_id(required("folder", &self.folder)?)))
    }
}

impl ListItemIds {
    pub fn request(&self) -> Result<UpstreamRequest, ApiError> {
        let stream = any_stream_id(required("stream", &self.stream)?);
        let request = UpstreamRequest::get("stream/items/ids")
            .query("output", "json")
            .query("s", stream)
            .query("n", clamp_count(self.count))
            .query_opt("c", optional(self.continuation.as_deref()))
            .query_opt("xt", self.exclude_read.then_some(STATE_READ))
            .query_opt("it", self.starred_only.then_some(STATE_STARRED));
        Ok(self.filter.apply(request))
    }
}

impl QuickSubscribe {
    /// Answered with JSON rather than `OK`
    pub fn request(&self) -> Result<UpstreamRequest, ApiError> {
        Ok(UpstreamRequest::post("subscription/quickadd")
            .form("quickadd", feed_stream_id(required("url", &self.url)?)))
    }
}
