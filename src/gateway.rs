use crate::client::{RawResponse, RestClient};
use crate::error::ClientError;
use crate::model::{Club, Profile, ProfilePatch, Session};
use crate::storage::CredentialStore;
use http::Method;
use std::sync::Arc;

const CLUBS_PATH: &str = "/rest/v1/clubs";
const PROFILES_PATH: &str = "/rest/v1/profiles";

/// Typed access to the club and profile tables.
///
/// Reads the current session from the shared credential store on every call, so a
/// login or logout done through the `SessionManager` is picked up immediately.
#[derive(Clone)]
pub struct Gateway {
    client: RestClient,
    credentials: Arc<dyn CredentialStore>,
}

impl Gateway {
    pub fn new(client: RestClient, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            client,
            credentials,
        }
    }

    fn token(&self) -> Option<String> {
        self.credentials.load().map(|s| s.token)
    }

    fn require_session(&self) -> Result<Session, ClientError> {
        self.credentials.load().ok_or(ClientError::AuthRequired)
    }

    async fn fetch_clubs(&self, path_and_query: &str) -> Result<Vec<Club>, ClientError> {
        let token = self.token();
        let resp = self
            .client
            .send(Method::GET, path_and_query, None, token.as_deref())
            .await?;
        read_rows(&resp)
    }

    // --- CLUBS ---

    pub async fn list_clubs(&self) -> Result<Vec<Club>, ClientError> {
        self.fetch_clubs(&format!("{}?select=*", CLUBS_PATH)).await
    }

    /// Server-side name search (`ilike`). A blank query lists everything.
    pub async fn search_clubs(&self, query: &str) -> Result<Vec<Club>, ClientError> {
        let query = query.trim();
        if query.is_empty() {
            return self.list_clubs().await;
        }
        let pattern = format!("ilike.*{}*", query);
        self.fetch_clubs(&format!(
            "{}?name={}&select=*",
            CLUBS_PATH,
            urlencoding::encode(&pattern)
        ))
        .await
    }

    pub async fn get_club_by_id(&self, id: &str) -> Result<Club, ClientError> {
        let rows = self
            .fetch_clubs(&format!("{}?id={}&select=*", CLUBS_PATH, eq_filter(id)))
            .await?;
        rows.into_iter().next().ok_or(ClientError::NotFound)
    }

    // --- PROFILES ---

    pub async fn get_profile(&self, user_id: &str) -> Result<Profile, ClientError> {
        let session = self.require_session()?;
        let resp = self
            .client
            .send(
                Method::GET,
                &profile_path(user_id),
                None,
                Some(&session.token),
            )
            .await?;
        let rows: Vec<Profile> = read_rows(&resp)?;
        rows.into_iter().next().ok_or(ClientError::NotFound)
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        patch: &ProfilePatch,
    ) -> Result<(), ClientError> {
        let session = self.require_session()?;
        let body = serde_json::to_string(patch)?;
        let resp = self
            .client
            .send(
                Method::PATCH,
                &profile_path(user_id),
                Some(body),
                Some(&session.token),
            )
            .await?;
        if !resp.is_success() {
            return Err(ClientError::UpdateFailed {
                status: resp.status.as_u16(),
            });
        }
        Ok(())
    }

    /// Deletes the profile row and, on success, ends the session.
    pub async fn delete_profile(&self, user_id: &str) -> Result<(), ClientError> {
        let session = self.require_session()?;
        let resp = self
            .client
            .send(
                Method::DELETE,
                &profile_path(user_id),
                None,
                Some(&session.token),
            )
            .await?;
        if !resp.is_success() {
            return Err(ClientError::DeleteFailed {
                status: resp.status.as_u16(),
            });
        }
        self.credentials
            .clear()
            .map_err(|e| ClientError::Storage(e.to_string()))
    }
}

fn eq_filter(value: &str) -> String {
    format!("eq.{}", urlencoding::encode(value))
}

fn profile_path(user_id: &str) -> String {
    format!("{}?id={}", PROFILES_PATH, eq_filter(user_id))
}

fn read_rows<T: serde::de::DeserializeOwned>(resp: &RawResponse) -> Result<Vec<T>, ClientError> {
    if !resp.is_success() {
        return Err(ClientError::RequestFailed {
            status: resp.status.as_u16(),
        });
    }
    resp.json()
}
