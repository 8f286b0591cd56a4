//! HTTP client for the backoffice REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, error};

use super::{ApiError, BackofficeApi};
use crate::auth::{SessionData, UserRecord};

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct MeResponse {
    user: UserRecord,
}

/// API client for the backoffice.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct BackofficeClient {
    client: Client,
    base_url: String,
}

impl BackofficeClient {
    /// Create a client rooted at `base_url` (e.g. `https://host/backoffice`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static(JSON_CONTENT_TYPE),
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static(JSON_CONTENT_TYPE),
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Check status and content type, then decode the JSON body.
    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiError::from_status(status, &body));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.contains(JSON_CONTENT_TYPE) {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::UnexpectedContentType {
                content_type: if content_type.is_empty() {
                    "no content type".to_string()
                } else {
                    content_type
                },
                body: ApiError::truncate_body(&body),
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl BackofficeApi for BackofficeClient {
    async fn login(&self, username: &str, password: &str) -> Result<SessionData, ApiError> {
        let url = self.url("login");
        debug!(url = %url, username, "Sending login request");

        let result = async {
            let response = self
                .client
                .post(&url)
                .json(&LoginRequest { username, password })
                .send()
                .await?;
            Self::read_json::<SessionData>(response).await
        }
        .await;

        if let Err(ref e) = result {
            error!(url = %url, error = %e, "Request failed");
        }
        result
    }

    async fn whoami(&self, token: &str) -> Result<UserRecord, ApiError> {
        let url = self.url("me");
        debug!(url = %url, "Sending identity check");

        let result = async {
            let response = self.client.get(&url).bearer_auth(token).send().await?;
            Self::read_json::<MeResponse>(response).await
        }
        .await;

        match result {
            Ok(me) => Ok(me.user),
            Err(e) => {
                error!(url = %url, error = %e, "Request failed");
                Err(e)
            }
        }
    }
}
