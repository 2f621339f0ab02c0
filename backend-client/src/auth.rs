use quotebook_protocol::AccountSummary;
use quotebook_protocol::SignInRequest;
use quotebook_protocol::SignInResponse;
use quotebook_protocol::UserId;
use std::sync::Arc;
use tracing::info;
use tracing::warn;

use crate::body::RequestBody;
use crate::credentials::USER_ID_KEY;
use crate::endpoints;
use crate::error::ApiError;
use crate::executor::RequestExecutor;

/// Signs users in and out, persisting the token pair through the executor's
/// credential store.
#[derive(Clone)]
pub struct AuthClient {
    executor: Arc<RequestExecutor>,
}

impl AuthClient {
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AccountSummary, ApiError> {
        let body = RequestBody::json(&SignInRequest {
            email: email.to_string(),
            password: password.to_string(),
        })?;
        let response: SignInResponse = self
            .executor
            .execute_data(&endpoints::auth::sign_in(), &body)
            .await?;

        let credentials = self.executor.credentials();
        credentials
            .store_tokens(&response.tokens)
            .and_then(|()| credentials.set(USER_ID_KEY, response.user.id.as_str()))
            .map_err(|err| ApiError::Storage(err.to_string()))?;
        info!("signed in as {}", response.user.id);
        Ok(response.user)
    }

    /// Tells the server the session is over, then forgets the local tokens
    /// regardless of whether the server call succeeded.
    pub async fn sign_out(&self) -> Result<(), ApiError> {
        if let Err(err) = self
            .executor
            .execute_empty(&endpoints::auth::sign_out(), &RequestBody::Empty)
            .await
        {
            warn!("server sign-out failed: {err}");
        }
        self.executor
            .credentials()
            .clear_all()
            .map_err(|err| ApiError::Storage(err.to_string()))?;
        info!("signed out");
        Ok(())
    }

    /// The id of the signed-in user, if tokens are stored.
    pub fn current_user(&self) -> Option<UserId> {
        let credentials = self.executor.credentials();
        match credentials.token_pair() {
            Ok(Some(_)) => {}
            Ok(None) => return None,
            Err(err) => {
                warn!("failed to read credentials: {err}");
                return None;
            }
        }
        match credentials.get(USER_ID_KEY) {
            Ok(user) => user.map(UserId::new),
            Err(err) => {
                warn!("failed to read user id: {err}");
                None
            }
        }
    }
}
