//! The normalized result record returned for every operation.

use std::error::Error as _;

use serde::{Deserialize, Serialize};

use crate::api::ApiError;
use crate::models::{
    ItemIdPage, ItemPage, ItemStateChange, Subscription, SubscriptionChange, Tag, UnreadCount, UserInfo,
};

/// Acknowledgement for write operations with nothing richer to report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    pub operation: String,
}

/// Operation-specific success payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Payload {
    Subscriptions(Vec<Subscription>),
    Items(ItemPage),
    ItemIds(ItemIdPage),
    ItemState(ItemStateChange),
    SubscriptionChange(SubscriptionChange),
    UnreadCounts(Vec<UnreadCount>),
    UserInfo(UserInfo),
    Tags(Vec<Tag>),
    Ack(Ack),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Credentials rejected, or the session was still rejected after
    /// logging in again
    Authentication,
    /// Non-success or unusable answer from the reader service
    Upstream,
    /// Connection failure or timeout
    Network,
    /// Arguments rejected before anything was sent
    InvalidRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDescriptor {
    pub kind: ErrorKind,
    /// Upstream HTTP status, when there was one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub message: String,
    /// Whether retrying the whole operation later may succeed
    pub transient: bool,
}

impl ErrorDescriptor {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
            transient: false,
        }
    }
}

impl From<ApiError> for ErrorDescriptor {
    fn from(err: ApiError) -> Self {
        let transient = err.is_transient();
        match err {
            ApiError::Authentication(message) => Self::new(ErrorKind::Authentication, message),
            ApiError::SessionExpired => Self::new(ErrorKind::Authentication, err.to_string()),
            ApiError::Upstream { status, message } => Self {
                kind: ErrorKind::Upstream,
                status: Some(status),
                message,
                transient,
            },
            ApiError::InvalidResponse(message) => Self::new(ErrorKind::Upstream, message),
            ApiError::InvalidRequest(message) => Self::new(ErrorKind::InvalidRequest, message),
            ApiError::Network(ref e) => {
                // reqwest's Display hides the cause (timeout, refused, dns)
                let mut message = err.to_string();
                let mut source = e.source();
                while let Some(cause) = source {
                    message.push_str(": ");
                    message.push_str(&cause.to_string());
                    source = cause.source();
                }
                Self {
                    kind: ErrorKind::Network,
                    status: e.status().map(|s| s.as_u16()),
                    message,
                    transient,
                }
            }
        }
    }
}

/// Outcome of one operation: a payload on success, an error descriptor
/// otherwise. Never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDescriptor>,
}

impl OperationResult {
    pub fn ok(payload: Payload) -> Self {
        Self {
            success: true,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn err(error: impl Into<ErrorDescriptor>) -> Self {
        Self {
            success: false,
            payload: None,
            error: Some(error.into()),
        }
    }

    pub fn from_result(result: Result<Payload, ApiError>) -> Self {
        match result {
            Ok(payload) => Self::ok(payload),
            Err(e) => Self::err(e),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}
