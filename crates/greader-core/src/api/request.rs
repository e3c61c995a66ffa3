//! Description of a single upstream call, independent of the token used to
//! send it, so the same request can be replayed after reauthentication.

use reqwest::Method;

/// Prefix of the Google Reader API below the configured base URL
pub const API_PREFIX: &str = "reader/api/0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    pub method: Method,
    /// Path relative to `{base}/reader/api/0/`, already escaped
    pub path: String,
    pub query: Vec<(&'static str, String)>,
    pub form: Vec<(&'static str, String)>,
    /// Write endpoints answer with a bare `OK`
    pub expects_ok: bool,
}

impl UpstreamRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            form: Vec::new(),
            expects_ok: false,
        }
    }

    /// A state-changing POST whose success body is `OK`
    pub fn edit(path: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            expects_ok: true,
            ..Self::get(path)
        }
    }

    /// A POST used for reading (e.g. `stream/items/contents`)
    pub fn post(path: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            ..Self::get(path)
        }
    }

    pub fn query(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }

    pub fn query_opt(self, key: &'static str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    pub fn form(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.form.push((key, value.into()));
        self
    }

    pub fn form_opt(self, key: &'static str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(v) => self.form(key, v),
            None => self,
        }
    }
}

/// Escape a stream id for use as trailing path segments.
///
/// Slashes are kept (FreshRSS reads `stream/contents/feed/42` literally);
/// each segment between them is percent-encoded.
pub fn escape_stream_path(stream_id: &str) -> String {
    stream_id
        .split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}
