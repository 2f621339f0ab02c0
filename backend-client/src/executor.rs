use quotebook_protocol::ApiEnvelope;
use quotebook_protocol::Page;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use tracing::warn;
use url::Url;

use crate::body::RequestBody;
use crate::credentials::ACCESS_TOKEN_KEY;
use crate::credentials::CredentialStore;
use crate::endpoint::Endpoint;
use crate::endpoints;
use crate::error::ApiError;
use crate::refresh::TokenRefresher;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_USER_AGENT: &str = concat!("quotebook-client/", env!("CARGO_PKG_VERSION"));

/// Transport settings shared by every request of one executor.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl ClientConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn parse(base_url: &str) -> Result<Self, ApiError> {
        Url::parse(base_url)
            .map(Self::new)
            .map_err(|err| ApiError::InvalidUrl(format!("{base_url}: {err}")))
    }

    pub fn build_http_client(&self) -> Result<reqwest::Client, ApiError> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .user_agent(self.user_agent.clone())
            .build()
            .map_err(|err| ApiError::network(&err))
    }
}

/// `Url::join` drops the last path segment unless the base ends with `/`.
fn normalize_base_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

struct RawReply {
    status: StatusCode,
    body: Vec<u8>,
    /// Access token attached to the request, if any.
    token: Option<String>,
}

/// Sends API requests, attaches the bearer token and transparently recovers
/// from an expired access token by refreshing it and retrying once.
pub struct RequestExecutor {
    client: reqwest::Client,
    base_url: Url,
    credentials: Arc<dyn CredentialStore>,
    refresher: TokenRefresher,
}

impl RequestExecutor {
    pub fn new(config: &ClientConfig, credentials: Arc<dyn CredentialStore>) -> Result<Self, ApiError> {
        let client = config.build_http_client()?;
        let refresh_url = join_url(&config.base_url, endpoints::auth::refresh().path())?;
        let refresher = TokenRefresher::new(client.clone(), refresh_url, Arc::clone(&credentials));
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            credentials,
            refresher,
        })
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    pub fn refresher(&self) -> &TokenRefresher {
        &self.refresher
    }

    /// Executes `endpoint` and returns the decoded envelope.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
        body: &RequestBody,
    ) -> Result<ApiEnvelope<T>, ApiError> {
        let reply = self.send(endpoint, body).await?;
        let reply = if reply.status == StatusCode::UNAUTHORIZED && endpoint.requires_auth() {
            self.retry_after_refresh(endpoint, body, reply).await?
        } else {
            reply
        };
        classify(endpoint, reply)
    }

    /// Executes `endpoint` and returns its `data` payload.
    pub async fn execute_data<T: DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
        body: &RequestBody,
    ) -> Result<T, ApiError> {
        self.execute::<T>(endpoint, body)
            .await?
            .data
            .ok_or_else(|| ApiError::Decoding(format!("{endpoint}: response has no data")))
    }

    /// Executes a collection endpoint and returns its items plus pagination.
    pub async fn execute_page<T: DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
    ) -> Result<Page<T>, ApiError> {
        let envelope = self
            .execute::<Vec<T>>(endpoint, &RequestBody::Empty)
            .await?;
        let pagination = envelope.pagination.ok_or_else(|| {
            ApiError::Decoding(format!("{endpoint}: response has no pagination"))
        })?;
        Ok(Page {
            items: envelope.data.unwrap_or_default(),
            pagination,
        })
    }

    /// Executes `endpoint` ignoring whatever `data` it returns.
    pub async fn execute_empty(&self, endpoint: &Endpoint, body: &RequestBody) -> Result<(), ApiError> {
        self.execute::<serde_json::Value>(endpoint, body)
            .await
            .map(|_| ())
    }

    async fn retry_after_refresh(
        &self,
        endpoint: &Endpoint,
        body: &RequestBody,
        rejected: RawReply,
    ) -> Result<RawReply, ApiError> {
        debug!("{endpoint}: access token rejected; refreshing");
        let refreshed = match rejected.token.as_deref() {
            Some(token) => self.refresher.refresh_rejected(token).await,
            None => self.refresher.refresh().await,
        };
        if !refreshed {
            warn!("{endpoint}: token refresh failed");
            return Err(ApiError::Unauthorized);
        }

        let retry = self.send(endpoint, body).await?;
        if retry.status == StatusCode::UNAUTHORIZED {
            warn!("{endpoint}: refreshed token rejected as well");
            return Err(ApiError::Unauthorized);
        }
        Ok(retry)
    }

    async fn send(&self, endpoint: &Endpoint, body: &RequestBody) -> Result<RawReply, ApiError> {
        let mut url = join_url(&self.base_url, endpoint.path())?;
        if !endpoint.query().is_empty() {
            url.query_pairs_mut()
                .extend_pairs(endpoint.query().iter().map(|(key, value)| (*key, value.as_str())));
        }

        let mut request = self.client.request(endpoint.method().clone(), url);
        let token = if endpoint.requires_auth() {
            let token = self.access_token()?;
            request = request.bearer_auth(&token);
            Some(token)
        } else {
            None
        };
        let request = body.attach(request)?;

        let response = request.send().await.map_err(|err| {
            warn!("{endpoint}: request failed: {err}");
            ApiError::network(&err)
        })?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| ApiError::network(&err))?
            .to_vec();
        debug!("{endpoint}: {status} ({} bytes)", body.len());
        Ok(RawReply {
            status,
            body,
            token,
        })
    }

    fn access_token(&self) -> Result<String, ApiError> {
        match self.credentials.get(ACCESS_TOKEN_KEY) {
            Ok(Some(token)) => Ok(token),
            Ok(None) => Err(ApiError::Unauthorized),
            Err(err) => {
                warn!("failed to read access token: {err}");
                Err(ApiError::Unauthorized)
            }
        }
    }
}

fn join_url(base: &Url, path: &str) -> Result<Url, ApiError> {
    base.join(path)
        .map_err(|err| ApiError::InvalidUrl(format!("{path}: {err}")))
}

fn classify<T: DeserializeOwned>(
    endpoint: &Endpoint,
    reply: RawReply,
) -> Result<ApiEnvelope<T>, ApiError> {
    let status = reply.status;
    if !status.is_success() {
        return Err(ApiError::server(status.as_u16(), error_message(status, &reply.body)));
    }

    let envelope: ApiEnvelope<T> = serde_json::from_slice(&reply.body).map_err(|err| {
        warn!("{endpoint}: undecodable response: {err}");
        ApiError::decoding(err)
    })?;
    if !envelope.success {
        return Err(ApiError::server(status.as_u16(), envelope.message));
    }
    Ok(envelope)
}

/// Best-effort human readable message for a failed response.
fn error_message(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<ApiEnvelope<serde_json::Value>>(body)
        .ok()
        .map(|envelope| envelope.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        })
}
