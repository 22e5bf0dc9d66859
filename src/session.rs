use crate::client::RestClient;
use crate::error::ClientError;
use crate::model::{AuthOutcome, Session};
use crate::storage::CredentialStore;
use http::Method;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const TOKEN_PATH: &str = "/auth/v1/token?grant_type=password";
const SIGNUP_PATH: &str = "/auth/v1/signup";
const USER_PATH: &str = "/auth/v1/user";

#[derive(Serialize)]
struct PasswordCredentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    user: Option<AuthUser>,
}

#[derive(Deserialize)]
struct AuthUser {
    id: String,
}

/// Owns the auth token lifecycle. The token itself lives in the credential store,
/// shared with the `Gateway`.
#[derive(Clone)]
pub struct SessionManager {
    client: RestClient,
    credentials: Arc<dyn CredentialStore>,
}

impl SessionManager {
    pub fn new(client: RestClient, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            client,
            credentials,
        }
    }

    fn validate<'a>(
        email: &'a str,
        password: &'a str,
    ) -> Result<PasswordCredentials<'a>, ClientError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(ClientError::Validation("email"));
        }
        if password.trim().is_empty() {
            return Err(ClientError::Validation("password"));
        }
        Ok(PasswordCredentials { email, password })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthOutcome, ClientError> {
        let body = serde_json::to_string(&Self::validate(email, password)?)?;
        let resp = self
            .client
            .send(Method::POST, TOKEN_PATH, Some(body), None)
            .await?;
        if !resp.is_success() {
            return Err(ClientError::InvalidCredentials {
                status: resp.status.as_u16(),
            });
        }

        let token: TokenResponse = resp.json()?;
        let session = Session {
            token: token.access_token,
            user_id: token.user.map(|u| u.id),
        };
        self.credentials
            .store(&session)
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        log::debug!("Logged in (user id present: {})", session.user_id.is_some());
        Ok(AuthOutcome::Authenticated)
    }

    /// Creates the account. Does not log in; the session is left as it was.
    pub async fn signup(&self, email: &str, password: &str) -> Result<AuthOutcome, ClientError> {
        let body = serde_json::to_string(&Self::validate(email, password)?)?;
        let resp = self
            .client
            .send(Method::POST, SIGNUP_PATH, Some(body), None)
            .await?;
        if !resp.is_success() {
            return Err(ClientError::SignupFailed {
                status: resp.status.as_u16(),
            });
        }
        Ok(AuthOutcome::AccountCreated)
    }

    pub fn logout(&self) -> Result<AuthOutcome, ClientError> {
        self.credentials
            .clear()
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        Ok(AuthOutcome::LoggedOut)
    }

    /// Deletes the auth user. The session is cleared only after the backend accepted.
    pub async fn delete_account(&self) -> Result<AuthOutcome, ClientError> {
        let session = self.credentials.load().ok_or(ClientError::AuthRequired)?;
        let resp = self
            .client
            .send(Method::DELETE, USER_PATH, None, Some(&session.token))
            .await?;
        if !resp.is_success() {
            return Err(ClientError::DeleteFailed {
                status: resp.status.as_u16(),
            });
        }
        self.credentials
            .clear()
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        Ok(AuthOutcome::AccountDeleted)
    }

    pub fn current_token(&self) -> Option<String> {
        self.credentials.load().map(|s| s.token)
    }

    pub fn current_user_id(&self) -> Option<String> {
        self.credentials.load().and_then(|s| s.user_id)
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.load().is_some()
    }
}
