//! Operation translator: one upstream call per logical operation.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::{ApiError, ReaderClient, UpstreamBody, UpstreamRequest};
use crate::auth::SessionManager;
use crate::config::Config;
use crate::models::{
    feed_stream_id, label_stream_id, ItemIdPage, ItemIdsResponse, ItemPage, ItemStateChange,
    QuickAddResponse, StreamContentsResponse, Subscription, SubscriptionAction,
    SubscriptionChange, SubscriptionListResponse, Tag, TagListResponse, UnreadCount,
    UnreadCountResponse, UserInfo, UserInfoResponse,
};

use super::{
    list_subscriptions_request, tag_list_request, unread_counts_request, user_info_request, Ack,
    DeleteFolder, GetItems, ListItemIds, ListItemsByFeed, ListStarredItems, ListUnreadItems,
    MarkFeedRead, MarkFolderRead, MarkItemState, MoveFeedToFolder, Operation, OperationResult,
    Payload, QuickSubscribe, RenameFeed, SetItemLabel, SubscribeToFeed, UnsubscribeFromFeed,
};

/// Translates operations into upstream calls.
/// Clone is cheap - the session manager and its HTTP pool are shared.
#[derive(Clone)]
pub struct Translator {
    session: Arc<SessionManager>,
}

impl Translator {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    /// Build the client, session manager and translator for a config
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let client = ReaderClient::new(config)?;
        let session = SessionManager::new(client, config.credentials.clone());
        Ok(Self::new(Arc::new(session)))
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Run an operation and fold any failure into the result record.
    pub async fn execute(&self, operation: Operation) -> OperationResult {
        let name = operation.name();
        debug!(operation = name, "Executing operation");

        let result = match operation {
            Operation::ListSubscriptions => {
                self.list_subscriptions().await.map(Payload::Subscriptions)
            }
            Operation::ListUnreadItems(args) => self.list_unread_items(&args).await.map(Payload::Items),
            Operation::ListItemsByFeed(args) => {
                self.list_items_by_feed(&args).await.map(Payload::Items)
            }
            Operation::MarkItemState(args) => {
                self.mark_item_state(&args).await.map(Payload::ItemState)
            }
            Operation::SubscribeToFeed(args) => {
                self.subscribe_to_feed(&args).await.map(Payload::SubscriptionChange)
            }
            Operation::UnsubscribeFromFeed(args) => self
                .unsubscribe_from_feed(&args)
                .await
                .map(Payload::SubscriptionChange),
            Operation::RenameFeed(args) => {
                self.rename_feed(&args).await.map(Payload::SubscriptionChange)
            }
            Operation::MoveFeedToFolder(args) => self
                .move_feed_to_folder(&args)
                .await
                .map(Payload::SubscriptionChange),
            Operation::ListStarredItems(args) => {
                self.list_starred_items(&args).await.map(Payload::Items)
            }
            Operation::GetItems(args) => self.get_items(&args).await.map(Payload::Items),
            Operation::MarkFeedRead(args) => self.mark_feed_read(&args).await.map(Payload::Ack),
            Operation::MarkFolderRead(args) => self.mark_folder_read(&args).await.map(Payload::Ack),
            Operation::SetItemLabel(args) => self.set_item_label(&args).await.map(Payload::Ack),
            Operation::DeleteFolder(args) => self.delete_folder(&args).await.map(Payload::Ack),
            Operation::GetUnreadCounts => self.unread_counts().await.map(Payload::UnreadCounts),
            Operation::GetUserInfo => self.user_info().await.map(Payload::UserInfo),
            Operation::ListTags => self.list_tags().await.map(Payload::Tags),
            Operation::ListItemIds(args) => self.list_item_ids(&args).await.map(Payload::ItemIds),
            Operation::QuickSubscribe(args) => {
                self.quick_subscribe(&args).await.map(Payload::SubscriptionChange)
            }
        };

        if let Err(ref e) = result {
            warn!(operation = name, error = %e, "Operation failed");
        }
        OperationResult::from_result(result)
    }

    // ===== Core operations =====

    pub async fn list_subscriptions(&self) -> Result<Vec<Subscription>, ApiError> {
        let body = self.call(&list_subscriptions_request()).await?;
        let parsed: SubscriptionListResponse = body.json("subscription list")?;
        Ok(parsed.into_subscriptions())
    }

    /// Unread items of one feed, or of the whole reading list.
    pub async fn list_unread_items(&self, args: &ListUnreadItems) -> Result<ItemPage, ApiError> {
        let mut page = self.fetch_stream(&args.request()?).await?;
        // Some servers ignore `xt` on the reading list
        page.items.retain(|item| !item.is_read);
        Ok(page)
    }

    pub async fn list_items_by_feed(&self, args: &ListItemsByFeed) -> Result<ItemPage, ApiError> {
        self.fetch_stream(&args.request()?).await
    }

    /// Mark one item or a batch in a single `edit-tag` call.
    pub async fn mark_item_state(&self, args: &MarkItemState) -> Result<ItemStateChange, ApiError> {
        let request = args.request()?;
        self.call(&request).await?;
        let ids = args.ids()?.into_iter().map(str::to_string).collect();
        Ok(ItemStateChange::new(ids, args.read))
    }

    pub async fn subscribe_to_feed(
        &self,
        args: &SubscribeToFeed,
    ) -> Result<SubscriptionChange, ApiError> {
        self.call(&args.request()?).await?;
        Ok(SubscriptionChange {
            feed_id: feed_stream_id(&args.url),
            action: SubscriptionAction::Subscribed,
            title: args.title.clone(),
            folder: args.folder.clone(),
        })
    }

    pub async fn unsubscribe_from_feed(
        &self,
        args: &UnsubscribeFromFeed,
    ) -> Result<SubscriptionChange, ApiError> {
        self.call(&args.request()?).await?;
        Ok(SubscriptionChange {
            feed_id: feed_stream_id(&args.feed),
            action: SubscriptionAction::Unsubscribed,
            title: None,
            folder: None,
        })
    }

    pub async fn rename_feed(&self, args: &RenameFeed) -> Result<SubscriptionChange, ApiError> {
        self.call(&args.request()?).await?;
        Ok(SubscriptionChange {
            feed_id: feed_stream_id(&args.feed),
            action: SubscriptionAction::Renamed,
            title: Some(args.title.trim().to_string()),
            folder: None,
        })
    }

    pub async fn move_feed_to_folder(
        &self,
        args: &MoveFeedToFolder,
    ) -> Result<SubscriptionChange, ApiError> {
        self.call(&args.request()?).await?;
        Ok(SubscriptionChange {
            feed_id: feed_stream_id(&args.feed),
            action: SubscriptionAction::Moved,
            title: None,
            folder: Some(args.folder.trim().to_string()),
        })
    }

    // ===== Supplementary operations =====

    pub async fn list_starred_items(&self, args: &ListStarredItems) -> Result<ItemPage, ApiError> {
        self.fetch_stream(&args.request()?).await
    }

    pub async fn get_items(&self, args: &GetItems) -> Result<ItemPage, ApiError> {
        self.fetch_stream(&args.request()?).await
    }

    pub async fn mark_feed_read(&self, args: &MarkFeedRead) -> Result<Ack, ApiError> {
        self.call(&args.request()?).await?;
        debug!(stream = %feed_stream_id(&args.feed), "Marked feed read");
        Ok(Self::ack("mark-feed-read"))
    }

    pub async fn mark_folder_read(&self, args: &MarkFolderRead) -> Result<Ack, ApiError> {
        self.call(&args.request()?).await?;
        debug!(stream = %label_stream_id(&args.folder), "Marked folder read");
        Ok(Self::ack("mark-folder-read"))
    }

    pub async fn set_item_label(&self, args: &SetItemLabel) -> Result<Ack, ApiError> {
        self.call(&args.request()?).await?;
        Ok(Self::ack("set-item-label"))
    }

    pub async fn delete_folder(&self, args: &DeleteFolder) -> Result<Ack, ApiError> {
        self.call(&args.request()?).await?;
        Ok(Self::ack("delete-folder"))
    }

    pub async fn list_item_ids(&self, args: &ListItemIds) -> Result<ItemIdPage, ApiError> {
        let body = self.call(&args.request()?).await?;
        let parsed: ItemIdsResponse = body.json("item ids")?;
        Ok(parsed.into_page())
    }

    pub async fn quick_subscribe(
        &self,
        args: &QuickSubscribe,
    ) -> Result<SubscriptionChange, ApiError> {
        let body = self.call(&args.request()?).await?;
        let parsed: QuickAddResponse = body.json("quickadd result")?;
        parsed
            .into_change()
            .map_err(|reason| ApiError::InvalidResponse(format!("Quick subscribe failed: {}", reason)))
    }

    pub async fn unread_counts(&self) -> Result<Vec<UnreadCount>, ApiError> {
        let body = self.call(&unread_counts_request()).await?;
        let parsed: UnreadCountResponse = body.json("unread counts")?;
        Ok(parsed.into_counts())
    }

    pub async fn user_info(&self) -> Result<UserInfo, ApiError> {
        let body = self.call(&user_info_request()).await?;
        let parsed: UserInfoResponse = body.json("user info")?;
        Ok(parsed.into_user_info())
    }

    pub async fn list_tags(&self) -> Result<Vec<Tag>, ApiError> {
        let body = self.call(&tag_list_request()).await?;
        let parsed: TagListResponse = body.json("tag list")?;
        Ok(parsed.into_tags())
    }

    // ===== Plumbing =====

    fn ack(operation: &str) -> Ack {
        Ack {
            operation: operation.to_string(),
        }
    }

    async fn fetch_stream(&self, request: &UpstreamRequest) -> Result<ItemPage, ApiError> {
        let body = self.call(request).await?;
        let parsed: StreamContentsResponse = body.json("stream contents")?;
        Ok(parsed.into_page())
    }

    /// Send a request with the current token. If the upstream reports the
    /// session expired, log in again and send it exactly once more.
    async fn call(&self, request: &UpstreamRequest) -> Result<UpstreamBody, ApiError> {
        let token = self.session.ensure_token().await?;
        let client = self.session.client();

        match client.send(&token, request).await {
            Err(ApiError::SessionExpired) => {}
            other => return other,
        }

        warn!(
            path = %request.path,
            token_age_secs = token.age().num_seconds(),
            "Session token rejected, reauthenticating"
        );
        let token = self.session.refresh(&token).await?;

        match client.send(&token, request).await {
            Err(ApiError::SessionExpired) => {
                warn!(path = %request.path, "Session token rejected again after reauthentication");
                Err(ApiError::Authentication(
                    "Upstream rejected the session again after reauthentication".to_string(),
                ))
            }
            other => other,
        }
    }
}
