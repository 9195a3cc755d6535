//! HTTP client for the Feishu open API using reqwest

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Request failed: {message}")]
    RequestFailed { message: String },
    #[error("Timeout")]
    Timeout,
    #[error("Rate limited")]
    RateLimited,
    #[error("Parse error: {message}")]
    ParseError { message: String },
    #[error("API error {code}: {msg}")]
    Api { code: i64, msg: String },
}

impl HttpError {
    /// Whether the call might succeed if simply repeated
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            HttpError::RequestFailed { .. } | HttpError::Timeout | HttpError::RateLimited
        )
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            HttpError::Timeout
        } else if e.is_decode() {
            HttpError::ParseError {
                message: e.to_string(),
            }
        } else {
            HttpError::RequestFailed {
                message: e.to_string(),
            }
        }
    }
}

/// Standard Feishu response envelope
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Unwrap `data` when `code == 0`
    pub fn into_data(self) -> Result<T, HttpError> {
        if self.code != 0 {
            return Err(HttpError::Api {
                code: self.code,
                msg: self.msg,
            });
        }
        self.data.ok_or_else(|| HttpError::ParseError {
            message: "response has no data".to_string(),
        })
    }
}

pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(timeout)
            .no_proxy()
            .user_agent(concat!("firewatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and decode the Feishu envelope
    pub async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<ApiResponse<T>, HttpError> {
        self.send_raw(request).await
    }

    /// Send a request and decode the body as `T` directly, for the few
    /// endpoints (the tenant token) that answer without a `data` wrapper
    pub async fn send_raw<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, HttpError> {
        let response = request.send().await?;

        if response.status().as_u16() == 429 {
            return Err(HttpError::RateLimited);
        }

        // Feishu reports most failures as non-2xx with a JSON body, so the
        // body is decoded regardless of status.
        let status = response.status();
        let body = response.text().await?;
        decode_body(status.as_u16(), &body)
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
        query: &[(&str, &str)],
        body: &B,
    ) -> Result<ApiResponse<T>, HttpError> {
        self.send(self.request(Method::POST, path, token).query(query).json(body))
            .await
    }

    pub async fn patch_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
        query: &[(&str, &str)],
        body: &B,
    ) -> Result<ApiResponse<T>, HttpError> {
        self.send(self.request(Method::PATCH, path, Some(token)).query(query).json(body))
            .await
    }

    pub async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
        query: &[(&str, &str)],
    ) -> Result<ApiResponse<T>, HttpError> {
        self.send(self.request(Method::GET, path, Some(token)).query(query))
            .await
    }

    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
        form: reqwest::multipart::Form,
    ) -> Result<ApiResponse<T>, HttpError> {
        self.send(self.request(Method::POST, path, Some(token)).multipart(form))
            .await
    }
}

fn decode_body<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, HttpError> {
    serde_json::from_str(body).map_err(|e| HttpError::ParseError {
        message: format!("status {}: {} ({})", status, e, truncate(body, 200)),
    })
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
