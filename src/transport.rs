// HTTP transport seam.
//
// Remote operations are written against the `Transport` trait so decoders
// and the retry executor can be exercised with a scripted transport in
// tests. The production implementation wraps `reqwest` with redirects
// disabled: the login flow must observe the 302 and read `Set-Cookie` off it
// instead of following the redirect.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::warn;

use crate::config::Config;
use crate::error::ApiError;
use crate::session::SessionToken;

/// Session cookie name issued by the facility's login endpoint.
pub const SESSION_COOKIE: &str = "PHPSESSID";

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:144.0) Gecko/20100101 Firefox/144.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One remote call: method, absolute URL, extra headers, optional
/// URL-encoded form body, optional session credential (injected as the
/// facility's cookie).
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub form: Option<Vec<(String, String)>>,
    pub session: Option<SessionToken>,
}

impl TransportRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            form: None,
            session: None,
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            ..Self::get(url)
        }
    }

    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.form = Some(fields);
        self
    }

    pub fn session(mut self, token: SessionToken) -> Self {
        self.session = Some(token);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Response body, already classified by content type.
#[derive(Debug, Clone)]
pub enum Payload {
    Json(serde_json::Value),
    Html(String),
    Binary(Bytes),
}

impl Payload {
    pub fn as_html(&self) -> Option<&str> {
        match self {
            Payload::Html(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    /// Lowercased header names; duplicates preserved (Set-Cookie).
    pub headers: Vec<(String, String)>,
    pub payload: Payload,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Session token from any `Set-Cookie` header, if present.
    pub fn session_cookie(&self) -> Option<SessionToken> {
        self.headers
            .iter()
            .filter(|(n, _)| n == "set-cookie")
            .find_map(|(_, v)| {
                let rest = v.split_once(&format!("{SESSION_COOKIE}="))?.1;
                let token = rest.split(';').next()?.trim();
                if token.is_empty() {
                    None
                } else {
                    Some(SessionToken::new(token))
                }
            })
    }
}

/// The transport returns a response for *any* status; classifying non-2xx
/// statuses into errors is the caller's concern (login legitimately sees a
/// 302).
#[async_trait]
pub trait Transport: Send + Sync {
    async fn perform(&self, request: TransportRequest) -> Result<TransportResponse, ApiError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ApiError::Unexpected(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, ApiError> {
        Self::new(&Config {
            request_timeout: timeout,
            ..Config::default()
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn perform(&self, request: TransportRequest) -> Result<TransportResponse, ApiError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(token) = &request.session {
            builder = builder.header(
                "Cookie",
                format!("{SESSION_COOKIE}={}; CooAcc=1", token.as_str()),
            );
        }
        if let Some(form) = &request.form {
            builder = builder.form(form);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(url = %request.url, error = %e, "request failed");
            ApiError::RequestFailed(format!(
                "{:?} request failed for {}: {e}",
                request.method, request.url
            ))
        })?;

        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(n, v)| {
                (
                    n.as_str().to_ascii_lowercase(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();
        let content_type = headers
            .iter()
            .find(|(n, _)| n == "content-type")
            .map(|(_, v)| v.to_ascii_lowercase())
            .unwrap_or_default();

        let payload = if content_type.contains("application/json") {
            let text = response
                .text()
                .await
                .map_err(|e| ApiError::RequestFailed(format!("failed to read body: {e}")))?;
            let value = serde_json::from_str(&text)
                .map_err(|e| ApiError::Parse(format!("invalid JSON body: {e}")))?;
            Payload::Json(value)
        } else if content_type.contains("text/") {
            let text = response
                .text()
                .await
                .map_err(|e| ApiError::RequestFailed(format!("failed to read body: {e}")))?;
            Payload::Html(text)
        } else {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| ApiError::RequestFailed(format!("failed to read body: {e}")))?;
            Payload::Binary(bytes)
        };

        Ok(TransportResponse {
            status,
            headers,
            payload,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_extraction() {
        let response = TransportResponse {
            status: 302,
            headers: vec![
                ("set-cookie".into(), "CooAcc=1; path=/".into()),
                (
                    "set-cookie".into(),
                    "PHPSESSID=69184bbcb7df0abc; path=/; HttpOnly".into(),
                ),
            ],
            payload: Payload::Html(String::new()),
        };
        assert_eq!(
            response.session_cookie().map(|t| t.as_str().to_string()),
            Some("69184bbcb7df0abc".to_string())
        );
    }

    #[test]
    fn session_cookie_absent() {
        let response = TransportResponse {
            status: 200,
            headers: vec![("content-type".into(), "text/html".into())],
            payload: Payload::Html(String::new()),
        };
        assert!(response.session_cookie().is_none());
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let response = TransportResponse {
            status: 200,
            headers: vec![("content-type".into(), "text/html".into())],
            payload: Payload::Html(String::new()),
        };
        assert_eq!(response.header("Content-Type"), Some("text/html"));
        assert!(response.is_success());
    }

    #[test]
    fn request_builder() {
        let request = TransportRequest::post("https://example.pl/ajax.php?load=courts_list")
            .form(vec![("date".into(), "27.12.2025".into())])
            .session(SessionToken::new("abc"))
            .header("X-Requested-With", "XMLHttpRequest");
        assert_eq!(request.method, Method::Post);
        assert!(request.form.is_some());
        assert!(request.session.is_some());
        assert_eq!(request.headers.len(), 1);
    }
}
