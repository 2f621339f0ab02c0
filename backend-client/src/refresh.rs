//! Single-flight access token refresh.
//!
//! Every request that sees a 401 ends up here. Only the first caller talks to
//! the refresh endpoint; everyone arriving while that call is in flight
//! awaits the same [`Shared`] future and observes the same outcome.

use futures::FutureExt;
use futures::future::BoxFuture;
use futures::future::Shared;
use parking_lot::Mutex;
use quotebook_protocol::ApiEnvelope;
use quotebook_protocol::RefreshRequest;
use quotebook_protocol::TokenRefreshResponse;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use tracing::debug;
use tracing::info;
use tracing::warn;
use url::Url;

use crate::credentials::ACCESS_TOKEN_KEY;
use crate::credentials::CredentialStore;
use crate::credentials::CredentialStoreError;
use crate::credentials::REFRESH_TOKEN_KEY;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshOutcome {
    Refreshed,
    /// The server answered and refused the refresh token.
    Rejected,
    /// Transport, decoding or storage failure; worth trying again later.
    Failed,
}

type PendingRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

struct InFlight {
    ticket: u64,
    outcome: PendingRefresh,
}

pub struct TokenRefresher {
    client: reqwest::Client,
    url: Url,
    credentials: Arc<dyn CredentialStore>,
    in_flight: Mutex<Option<InFlight>>,
    next_ticket: AtomicU64,
    /// Refresh token the server has already refused; never sent twice.
    rejected_refresh_token: Arc<Mutex<Option<String>>>,
}

impl TokenRefresher {
    pub fn new(client: reqwest::Client, url: Url, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            client,
            url,
            credentials,
            in_flight: Mutex::new(None),
            next_ticket: AtomicU64::new(0),
            rejected_refresh_token: Arc::new(Mutex::new(None)),
        }
    }

    /// Obtains a new access token. Returns `false` when there is no refresh
    /// token or the refresh failed; stored tokens are untouched in that case.
    pub async fn refresh(&self) -> bool {
        self.join_or_start(None).await == RefreshOutcome::Refreshed
    }

    /// Refresh triggered by the server rejecting `access_token`.
    ///
    /// If the stored access token has already moved on, another request
    /// refreshed in the meantime and no network call is made.
    pub async fn refresh_rejected(&self, access_token: &str) -> bool {
        self.join_or_start(Some(access_token)).await == RefreshOutcome::Refreshed
    }

    /// Joins the refresh in flight or starts one. With `rejected_access_token`
    /// set, the stored token is compared under the same lock first: a leader
    /// persists its tokens before its slot is cleared, so a changed token
    /// means the work is already done.
    async fn join_or_start(&self, rejected_access_token: Option<&str>) -> RefreshOutcome {
        let (ticket, outcome) = {
            let mut slot = self.in_flight.lock();
            match slot.as_ref() {
                Some(flight) => (flight.ticket, flight.outcome.clone()),
                None => {
                    if let Some(rejected) = rejected_access_token {
                        match self.credentials.get(ACCESS_TOKEN_KEY) {
                            Ok(Some(current)) if current != rejected => {
                                debug!("access token already replaced by a concurrent refresh");
                                return RefreshOutcome::Refreshed;
                            }
                            Ok(_) => {}
                            Err(err) => {
                                warn!("failed to read access token before refresh: {err}");
                                return RefreshOutcome::Failed;
                            }
                        }
                    }
                    let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
                    let outcome = refresh_tokens(
                        self.client.clone(),
                        self.url.clone(),
                        Arc::clone(&self.credentials),
                        Arc::clone(&self.rejected_refresh_token),
                    )
                    .boxed()
                    .shared();
                    *slot = Some(InFlight {
                        ticket,
                        outcome: outcome.clone(),
                    });
                    (ticket, outcome)
                }
            }
        };

        let result = outcome.await;

        let mut slot = self.in_flight.lock();
        if slot.as_ref().is_some_and(|flight| flight.ticket == ticket) {
            *slot = None;
        }
        result
    }
}

async fn refresh_tokens(
    client: reqwest::Client,
    url: Url,
    credentials: Arc<dyn CredentialStore>,
    rejected_refresh_token: Arc<Mutex<Option<String>>>,
) -> RefreshOutcome {
    let refresh_token = match credentials.get(REFRESH_TOKEN_KEY) {
        Ok(Some(token)) => token,
        Ok(None) => {
            debug!("no refresh token stored; skipping refresh");
            return RefreshOutcome::Rejected;
        }
        Err(err) => {
            warn!("failed to read refresh token: {err}");
            return RefreshOutcome::Failed;
        }
    };

    if rejected_refresh_token.lock().as_deref() == Some(refresh_token.as_str()) {
        debug!("refresh token was already rejected by the server");
        return RefreshOutcome::Rejected;
    }

    let response = match client
        .post(url)
        .bearer_auth(&refresh_token)
        .json(&RefreshRequest {
            refresh_token: &refresh_token,
        })
        .send()
        .await
    {
        Ok(response) => response,
        Err(err) => {
            warn!("token refresh request failed: {err}");
            return RefreshOutcome::Failed;
        }
    };

    let status = response.status();
    let body = match response.bytes().await {
        Ok(body) => body,
        Err(err) => {
            warn!("failed to read token refresh response: {err}");
            return RefreshOutcome::Failed;
        }
    };

    if !status.is_success() {
        warn!("token refresh rejected with status {status}");
        if status.is_client_error() {
            *rejected_refresh_token.lock() = Some(refresh_token);
            return RefreshOutcome::Rejected;
        }
        return RefreshOutcome::Failed;
    }

    let envelope: ApiEnvelope<TokenRefreshResponse> = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!("failed to decode token refresh response: {err}");
            return RefreshOutcome::Failed;
        }
    };
    let refreshed = match envelope.data {
        Some(data) if envelope.success => data,
        _ => {
            warn!("token refresh refused: {}", envelope.message);
            *rejected_refresh_token.lock() = Some(refresh_token);
            return RefreshOutcome::Rejected;
        }
    };

    if let Err(err) = persist_tokens(credentials.as_ref(), &refresh_token, &refreshed) {
        warn!("failed to persist refreshed tokens: {err}");
        return RefreshOutcome::Failed;
    }

    info!("access token refreshed");
    RefreshOutcome::Refreshed
}

/// Writes the rotated refresh token (if any) and then the access token. When
/// the access token cannot be written the previous refresh token is put back,
/// so a failed refresh leaves the stored pair as it was.
fn persist_tokens(
    credentials: &dyn CredentialStore,
    previous_refresh_token: &str,
    refreshed: &TokenRefreshResponse,
) -> Result<(), CredentialStoreError> {
    let rotated = refreshed.refresh_token.as_deref();
    if let Some(rotated) = rotated {
        credentials.set(REFRESH_TOKEN_KEY, rotated)?;
    }
    if let Err(err) = credentials.set(ACCESS_TOKEN_KEY, &refreshed.access_token) {
        if rotated.is_some() {
            if let Err(restore) = credentials.set(REFRESH_TOKEN_KEY, previous_refresh_token) {
                warn!("failed to restore previous refresh token: {restore}");
            }
        }
        return Err(err);
    }
    Ok(())
}
