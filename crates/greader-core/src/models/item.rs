//! Item (article) models and the stream-contents response they come from.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::{strip_html, truncate_string, unescape_html};

use super::{is_label, label_name, STATE_READ, STATE_STARRED};

/// Maximum length of the plain-text summary carried on an item.
/// Long enough to judge an article, short enough to list dozens at once.
pub const MAX_SUMMARY_CHARS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub title: String,
    /// Stream id of the feed the item came from, e.g. `feed/42`
    pub feed_id: String,
    pub feed_title: Option<String>,
    pub url: Option<String>,
    pub author: Option<String>,
    pub published: Option<DateTime<Utc>>,
    /// Plain-text summary, HTML stripped and truncated
    pub summary: Option<String>,
    pub is_read: bool,
    pub is_starred: bool,
    /// Folder/tag names attached to the item
    pub labels: Vec<String>,
}

/// One page of a stream listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPage {
    pub items: Vec<Item>,
    /// Cursor for the next page; absent on the last page
    pub continuation: Option<String>,
}

/// Result of marking one or more items read or unread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStateChange {
    /// First id of the batch
    pub item_id: String,
    pub item_ids: Vec<String>,
    pub read: bool,
}

impl ItemStateChange {
    pub fn new(item_ids: Vec<String>, read: bool) -> Self {
        Self {
            item_id: item_ids.first().cloned().unwrap_or_default(),
            item_ids,
            read,
        }
    }
}

/// One page of item ids from `stream/items/ids`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemIdPage {
    pub ids: Vec<String>,
    pub continuation: Option<String>,
}

// ============================================================================
// Upstream response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct StreamContentsResponse {
    #[serde(default)]
    items: Vec<ItemApi>,
    continuation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItemApi {
    id: String,
    #[serde(default)]
    title: String,
    published: Option<i64>,
    author: Option<String>,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    canonical: Vec<LinkApi>,
    #[serde(default)]
    alternate: Vec<LinkApi>,
    summary: Option<ContentApi>,
    content: Option<ContentApi>,
    origin: Option<OriginApi>,
}

#[derive(Debug, Deserialize)]
struct LinkApi {
    href: String,
}

#[derive(Debug, Deserialize)]
struct ContentApi {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct OriginApi {
    #[serde(rename = "streamId")]
    stream_id: String,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ItemIdsResponse {
    #[serde(default)]
    item_refs: Vec<ItemRefApi>,
    continuation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItemRefApi {
    id: String,
}

impl ItemIdsResponse {
    pub(crate) fn into_page(self) -> ItemIdPage {
        ItemIdPage {
            ids: self.item_refs.into_iter().map(|r| r.id).collect(),
            continuation: self.continuation.filter(|c| !c.is_empty()),
        }
    }
}

impl StreamContentsResponse {
    pub(crate) fn into_page(self) -> ItemPage {
        ItemPage {
            items: self.items.into_iter().map(ItemApi::into_item).collect(),
            continuation: self.continuation.filter(|c| !c.is_empty()),
        }
    }
}

impl ItemApi {
    fn into_item(self) -> Item {
        let is_read = self.categories.iter().any(|c| is_state(c, STATE_READ));
        let is_starred = self.categories.iter().any(|c| is_state(c, STATE_STARRED));
        let labels = self
            .categories
            .iter()
            .filter(|c| is_label(c))
            .map(|c| unescape_html(label_name(c)))
            .collect();

        let url = self
            .canonical
            .into_iter()
            .chain(self.alternate)
            .map(|l| l.href)
            .find(|h| !h.is_empty());

        let summary = self
            .summary
            .or(self.content)
            .map(|c| strip_html(&c.content))
            .filter(|s| !s.is_empty())
            .map(|s| truncate_string(&s, MAX_SUMMARY_CHARS));

        let (feed_id, feed_title) = match self.origin {
            Some(origin) => (origin.stream_id, origin.title.map(|t| unescape_html(&t))),
            None => (String::new(), None),
        };

        Item {
            id: self.id,
            title: unescape_html(&self.title),
            feed_id,
            feed_title,
            url,
            author: self.author.filter(|a| !a.is_empty()).map(|a| unescape_html(&a)),
            published: self
                .published
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
            summary,
            is_read,
            is_starred,
            labels,
        }
    }
}

/// Match `user/-/state/com.google/read` as well as the `user/<id>/...` form
/// some servers send back.
fn is_state(category: &str, state: &str) -> bool {
    let suffix = state.trim_start_matches("user/-");
    category.starts_with("user/") && category.ends_with(suffix)
}
