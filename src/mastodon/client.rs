use super::traits::StatusDeleter;
use super::types::Account;
use crate::error::MastodonError;
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Authenticated REST client for one Mastodon account.
#[derive(Clone)]
pub struct MastodonClient {
    server: Url,
    access_token: String,
    client: reqwest::Client,
}

impl MastodonClient {
    pub fn new(server: &str, access_token: impl Into<String>) -> Result<Self, MastodonError> {
        Self::with_timeout(server, access_token, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Every request, including reading the body, must finish within `timeout`.
    pub fn with_timeout(
        server: &str,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, MastodonError> {
        let server = Url::parse(server)
            .map_err(|e| MastodonError::Endpoint(format!("{server}: {e}")))?;
        if !matches!(server.scheme(), "http" | "https") {
            return Err(MastodonError::Endpoint(format!(
                "unsupported scheme '{}'",
                server.scheme()
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(|e| MastodonError::Endpoint(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            server,
            access_token: access_token.into(),
            client,
        })
    }

    pub fn server(&self) -> &Url {
        &self.server
    }

    pub(crate) fn access_token(&self) -> &str {
        &self.access_token
    }

    fn endpoint(&self, path: &str) -> Result<Url, MastodonError> {
        self.server
            .join(path)
            .map_err(|e| MastodonError::Endpoint(format!("{path}: {e}")))
    }

    /// `/api/v1/statuses/{id}` with `id` escaped as a single path segment.
    fn status_url(&self, id: &str) -> Result<Url, MastodonError> {
        let mut url = self.endpoint("/api/v1/statuses")?;
        url.path_segments_mut()
            .map_err(|()| MastodonError::Endpoint(format!("{} cannot be a base", self.server)))?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }

    /// Resolve the account that owns the access token.
    pub async fn verify_credentials(&self) -> Result<Account, MastodonError> {
        const OP: &str = "verify credentials";
        let url = self.endpoint("/api/v1/accounts/verify_credentials")?;

        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| MastodonError::Request {
                operation: OP.into(),
                message: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read response body: {e}>"));
            return Err(MastodonError::Status {
                operation: OP.into(),
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<Account>()
            .await
            .map_err(|e| MastodonError::Decode {
                operation: OP.into(),
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl StatusDeleter for MastodonClient {
    async fn delete_status(&self, id: &str) -> Result<(), MastodonError> {
        let operation = format!("delete status {id}");
        let url = self.status_url(id)?;

        let resp = self
            .client
            .delete(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| MastodonError::Request {
                operation: operation.clone(),
                message: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read response body: {e}>"));
            return Err(MastodonError::Status {
                operation,
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
