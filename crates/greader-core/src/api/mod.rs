//! HTTP client module for the upstream Google Reader API.
//!
//! This module provides the `ReaderClient` for communicating with a
//! FreshRSS-compatible server, the `UpstreamRequest` description of a single
//! call, and the `ApiError` classification of failures.
//!
//! The API uses ClientLogin: an `Auth` token sent in a `GoogleLogin` header
//! plus a short-lived `T` action token sent as a parameter.

pub mod client;
pub mod error;
pub mod request;

pub use client::{ReaderClient, UpstreamBody};
pub use error::ApiError;
pub use request::UpstreamRequest;
