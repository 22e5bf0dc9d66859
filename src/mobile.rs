// File: ./src/mobile.rs
use crate::client::RestClient;
use crate::config::{Config, DEFAULT_CATEGORY_KEYWORD};
use crate::directions::{
    DirectionsOutcome, DirectionsResolver, DispatchError, LocationPlatform, NavigationRequest,
    Provider,
};
use crate::error::ClientError;
use crate::gateway::Gateway;
use crate::model::{AuthOutcome, Club, Profile, ProfilePatch};
use crate::paths::AppPaths;
use crate::session::SessionManager;
use crate::storage::{CredentialStore, FileCredentialStore};
use crate::store::ClubStore;
use std::sync::{Arc, Mutex, MutexGuard};

#[cfg(target_os = "android")]
use android_logger::Config as LogConfig;
#[cfg(target_os = "android")]
use log::LevelFilter;

#[derive(Debug, uniffi::Error)]
#[uniffi(flat_error)]
pub enum MobileError {
    Validation(String),
    Network(String),
    AuthRequired,
    /// The backend answered with a non-2xx status.
    Rejected(String),
    NotFound,
    Parse(String),
    Generic(String),
}
impl From<ClientError> for MobileError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Validation(field) => Self::Validation(format!("{} is required", field)),
            ClientError::Network(msg) => Self::Network(msg),
            ClientError::AuthRequired => Self::AuthRequired,
            ClientError::NotFound => Self::NotFound,
            ClientError::Parse(msg) => Self::Parse(msg),
            other if other.status().is_some() => Self::Rejected(other.to_string()),
            other => Self::Generic(other.to_string()),
        }
    }
}
impl From<anyhow::Error> for MobileError {
    fn from(e: anyhow::Error) -> Self {
        Self::Generic(e.to_string())
    }
}
impl std::fmt::Display for MobileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MobileError::Validation(s)
            | MobileError::Network(s)
            | MobileError::Rejected(s)
            | MobileError::Parse(s)
            | MobileError::Generic(s) => write!(f, "{}", s),
            MobileError::AuthRequired => write!(f, "Not logged in"),
            MobileError::NotFound => write!(f, "Not found"),
        }
    }
}
impl std::error::Error for MobileError {}

// --- DTOs ---

#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct MobileClub {
    pub id: String,
    pub display_name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub has_location: bool,
}

#[derive(Debug, Clone, Default, PartialEq, uniffi::Record)]
pub struct MobileProfile {
    pub name: Option<String>,
    pub major: Option<String>,
    pub year: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, uniffi::Enum)]
pub enum MobileAuthOutcome {
    Authenticated,
    AccountCreated,
    LoggedOut,
    AccountDeleted,
}

#[derive(Debug, Clone, Copy, PartialEq, uniffi::Enum)]
pub enum MobileProvider {
    NavigationApp,
    GeoHandler,
    WebSearch,
}

#[derive(Debug, Clone, Copy, PartialEq, uniffi::Enum)]
pub enum MobileDirectionsOutcome {
    MissingLocation,
    ServiceDisabled,
    PermissionRequired,
    Dispatched { provider: MobileProvider },
}

fn club_to_mobile(c: &Club) -> MobileClub {
    MobileClub {
        id: c.id.clone(),
        display_name: c.display_name().to_string(),
        slug: c.slug.clone(),
        description: c.description.clone(),
        website: c.website.clone(),
        address: c.destination().map(str::to_string),
        email: c.email.clone(),
        phone: c.phone.clone(),
        has_location: c.destination().is_some(),
    }
}

fn profile_to_mobile(p: Profile) -> MobileProfile {
    MobileProfile {
        name: p.name,
        major: p.major,
        year: p.year,
        email: p.email,
    }
}

impl From<AuthOutcome> for MobileAuthOutcome {
    fn from(o: AuthOutcome) -> Self {
        match o {
            AuthOutcome::Authenticated => Self::Authenticated,
            AuthOutcome::AccountCreated => Self::AccountCreated,
            AuthOutcome::LoggedOut => Self::LoggedOut,
            AuthOutcome::AccountDeleted => Self::AccountDeleted,
        }
    }
}

impl From<DirectionsOutcome> for MobileDirectionsOutcome {
    fn from(o: DirectionsOutcome) -> Self {
        match o {
            DirectionsOutcome::MissingLocation => Self::MissingLocation,
            DirectionsOutcome::ServiceDisabled => Self::ServiceDisabled,
            DirectionsOutcome::PermissionRequired => Self::PermissionRequired,
            DirectionsOutcome::Dispatched(p) => Self::Dispatched {
                provider: match p {
                    Provider::NavigationApp => MobileProvider::NavigationApp,
                    Provider::GeoHandler => MobileProvider::GeoHandler,
                    Provider::WebSearch => MobileProvider::WebSearch,
                },
            },
        }
    }
}

// --- PLATFORM CALLBACKS (implemented in Kotlin) ---

/// Raised by the Kotlin side when a handler lookup or launch throws.
/// Must stay non-flat: uniffi cannot lift a flat error coming back from foreign code.
#[derive(Debug, Clone, PartialEq, thiserror::Error, uniffi::Error)]
pub enum PlatformError {
    #[error("{reason}")]
    Failed { reason: String },
}
impl From<uniffi::UnexpectedUniFFICallbackError> for PlatformError {
    fn from(e: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::Failed { reason: e.reason }
    }
}

#[uniffi::export(with_foreign)]
pub trait MobilePlatform: Send + Sync {
    fn location_service_enabled(&self) -> bool;
    fn location_permission_granted(&self) -> bool;
    fn prompt_enable_service(&self);
    fn request_permission(&self);
    fn can_handle(&self, uri: String, package: Option<String>) -> Result<bool, PlatformError>;
    fn launch(&self, uri: String, package: Option<String>) -> Result<(), PlatformError>;
}

struct PlatformBridge(Arc<dyn MobilePlatform>);

impl LocationPlatform for PlatformBridge {
    fn location_service_enabled(&self) -> bool {
        self.0.location_service_enabled()
    }
    fn location_permission_granted(&self) -> bool {
        self.0.location_permission_granted()
    }
    fn prompt_enable_service(&self) {
        self.0.prompt_enable_service()
    }
    fn request_permission(&self) {
        self.0.request_permission()
    }
    fn can_handle(&self, request: &NavigationRequest) -> Result<bool, DispatchError> {
        self.0
            .can_handle(request.uri.clone(), request.package.clone())
            .map_err(|e| DispatchError(e.to_string()))
    }
    fn launch(&self, request: &NavigationRequest) -> Result<(), DispatchError> {
        self.0
            .launch(request.uri.clone(), request.package.clone())
            .map_err(|e| DispatchError(e.to_string()))
    }
}

// --- MAIN OBJECT ---

#[derive(uniffi::Object)]
pub struct ClubDirectoryMobile {
    session: SessionManager,
    gateway: Gateway,
    store: Mutex<ClubStore>,
    resolver: DirectionsResolver<PlatformBridge>,
}

#[uniffi::export(async_runtime = "tokio")]
impl ClubDirectoryMobile {
    #[uniffi::constructor]
    pub fn new(
        android_files_dir: String,
        base_url: String,
        api_key: String,
        category_keyword: Option<String>,
        platform: Arc<dyn MobilePlatform>,
    ) -> Result<Self, MobileError> {
        #[cfg(target_os = "android")]
        android_logger::init_once(
            LogConfig::default()
                .with_max_level(LevelFilter::Debug)
                .with_tag("ClubDirRust"),
        );
        AppPaths::init_android_path(android_files_dir);
        let config = Config {
            base_url,
            api_key,
            category_keyword: category_keyword
                .unwrap_or_else(|| DEFAULT_CATEGORY_KEYWORD.to_string()),
            allow_insecure_certs: false,
        };
        let credentials = Arc::new(FileCredentialStore::open_default()?);
        Self::from_parts(&config, credentials, platform)
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_authenticated()
    }

    pub async fn login(
        &self,
        email: String,
        password: String,
    ) -> Result<MobileAuthOutcome, MobileError> {
        Ok(self.session.login(&email, &password).await?.into())
    }

    pub async fn signup(
        &self,
        email: String,
        password: String,
    ) -> Result<MobileAuthOutcome, MobileError> {
        Ok(self.session.signup(&email, &password).await?.into())
    }

    pub fn logout(&self) -> Result<MobileAuthOutcome, MobileError> {
        Ok(self.session.logout()?.into())
    }

    pub async fn delete_account(&self) -> Result<MobileAuthOutcome, MobileError> {
        Ok(self.session.delete_account().await?.into())
    }

    /// Fetches the full list and returns the part visible under the current filter.
    pub async fn load_clubs(&self) -> Result<Vec<MobileClub>, MobileError> {
        let clubs = self.gateway.list_clubs().await?;
        let mut store = self.lock_store();
        store.set_data(clubs);
        Ok(store.visible().iter().map(club_to_mobile).collect())
    }

    pub async fn search_clubs(&self, query: String) -> Result<Vec<MobileClub>, MobileError> {
        let clubs = self.gateway.search_clubs(&query).await?;
        let mut store = self.lock_store();
        store.set_data(clubs);
        Ok(store.visible().iter().map(club_to_mobile).collect())
    }

    pub fn apply_filter(&self, query: String, category_only: bool) -> Vec<MobileClub> {
        let mut store = self.lock_store();
        store.apply_filter(&query, category_only);
        store.visible().iter().map(club_to_mobile).collect()
    }

    pub fn visible_clubs(&self) -> Vec<MobileClub> {
        self.lock_store()
            .visible()
            .iter()
            .map(club_to_mobile)
            .collect()
    }

    /// Always fetched fresh, so the detail screen never shows a stale record.
    pub async fn get_club(&self, id: String) -> Result<MobileClub, MobileError> {
        let club = self.gateway.get_club_by_id(&id).await?;
        Ok(club_to_mobile(&club))
    }

    pub async fn get_profile(&self) -> Result<MobileProfile, MobileError> {
        let user_id = self.user_id()?;
        let profile = self.gateway.get_profile(&user_id).await?;
        Ok(profile_to_mobile(profile))
    }

    pub async fn save_profile(&self, profile: MobileProfile) -> Result<(), MobileError> {
        let user_id = self.user_id()?;
        let patch = ProfilePatch {
            name: profile.name,
            major: profile.major,
            year: profile.year,
            email: profile.email,
        };
        self.gateway
            .update_profile(&user_id, &patch)
            .await
            .map_err(MobileError::from)
    }

    /// Deletes the profile and logs out.
    pub async fn delete_profile(&self) -> Result<(), MobileError> {
        let user_id = self.user_id()?;
        self.gateway
            .delete_profile(&user_id)
            .await
            .map_err(MobileError::from)
    }

    /// Call again after the permission callback or after returning from settings.
    pub fn get_directions(&self, destination: String) -> MobileDirectionsOutcome {
        self.resolver.resolve(&destination).into()
    }
}

impl ClubDirectoryMobile {
    pub fn from_parts(
        config: &Config,
        credentials: Arc<dyn CredentialStore>,
        platform: Arc<dyn MobilePlatform>,
    ) -> Result<Self, MobileError> {
        let client =
            RestClient::new(&config.base_url, &config.api_key, config.allow_insecure_certs)?;
        Ok(Self {
            session: SessionManager::new(client.clone(), credentials.clone()),
            gateway: Gateway::new(client, credentials),
            store: Mutex::new(ClubStore::new(&config.category_keyword)),
            resolver: DirectionsResolver::new(PlatformBridge(platform)),
        })
    }

    fn lock_store(&self) -> MutexGuard<'_, ClubStore> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn user_id(&self) -> Result<String, MobileError> {
        self.session
            .current_user_id()
            .ok_or(MobileError::AuthRequired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryCredentialStore;
    use mockito::{Matcher, Server};

    struct DesktopPlatform {
        granted: bool,
    }

    impl MobilePlatform for DesktopPlatform {
        fn location_service_enabled(&self) -> bool {
            true
        }
        fn location_permission_granted(&self) -> bool {
            self.granted
        }
        fn prompt_enable_service(&self) {}
        fn request_permission(&self) {}
        fn can_handle(
            &self,
            _uri: String,
            _package: Option<String>,
        ) -> Result<bool, PlatformError> {
            Ok(false)
        }
        fn launch(&self, uri: String, _package: Option<String>) -> Result<(), PlatformError> {
            if uri.starts_with("geo:") {
                return Err(PlatformError::Failed {
                    reason: "no geo handler".to_string(),
                });
            }
            Ok(())
        }
    }

    fn mobile(server: &Server, granted: bool) -> ClubDirectoryMobile {
        let config = Config {
            base_url: server.url(),
            api_key: "anon".to_string(),
            ..Config::default()
        };
        ClubDirectoryMobile::from_parts(
            &config,
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(DesktopPlatform { granted }),
        )
        .expect("mobile object")
    }

    #[test]
    fn test_error_mapping_keeps_status_text() {
        let e: MobileError = ClientError::InvalidCredentials { status: 400 }.into();
        assert_eq!(e.to_string(), "invalid credentials (400)");
        assert!(matches!(
            MobileError::from(ClientError::AuthRequired),
            MobileError::AuthRequired
        ));
        assert!(matches!(
            MobileError::from(ClientError::Storage("disk full".to_string())),
            MobileError::Generic(_)
        ));
    }

    #[test]
    fn test_platform_error_lifts_back_from_foreign_code() {
        use uniffi::{Lift, Lower};

        let err = PlatformError::Failed {
            reason: "activity not found".to_string(),
        };
        let lowered = <PlatformError as Lower<crate::UniFfiTag>>::lower(err.clone());
        let lifted =
            <PlatformError as Lift<crate::UniFfiTag>>::try_lift(lowered).expect("lift");
        assert_eq!(lifted, err);
        assert_eq!(lifted.to_string(), "activity not found");
    }

    #[test]
    fn test_club_dto_uses_display_rules() {
        let club = Club {
            id: "c1".to_string(),
            slug: Some("robotics".to_string()),
            name: None,
            description: None,
            website: None,
            address: Some("  ".to_string()),
            email: None,
            phone: None,
        };
        let dto = club_to_mobile(&club);
        assert_eq!(dto.display_name, "robotics");
        assert_eq!(dto.address, None);
        assert!(!dto.has_location);
    }

    #[tokio::test]
    async fn test_login_then_profile_flow() {
        let mut server = Server::new_async().await;
        let _login = server
            .mock("POST", "/auth/v1/token")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"access_token":"jwt","user":{"id":"u1"}}"#)
            .create_async()
            .await;
        let profile = server
            .mock("GET", "/rest/v1/profiles")
            .match_query(Matcher::UrlEncoded("id".into(), "eq.u1".into()))
            .match_header("authorization", "Bearer jwt")
            .with_status(200)
            .with_body(r#"[{"id":"u1","name":"Ada","year":2}]"#)
            .create_async()
            .await;

        let m = mobile(&server, true);
        assert!(matches!(m.get_profile().await, Err(MobileError::AuthRequired)));

        let outcome = m
            .login("ada@uni.edu".to_string(), "secret".to_string())
            .await
            .expect("login");
        assert_eq!(outcome, MobileAuthOutcome::Authenticated);
        assert!(m.is_logged_in());

        let p = m.get_profile().await.expect("profile");
        assert_eq!(p.name.as_deref(), Some("Ada"));
        assert_eq!(p.year.as_deref(), Some("2"));
        profile.assert_async().await;

        assert_eq!(m.logout().expect("logout"), MobileAuthOutcome::LoggedOut);
        assert!(!m.is_logged_in());
    }

    #[tokio::test]
    async fn test_load_and_filter_clubs() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/rest/v1/clubs")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"[{"id":"1","name":"Robotics","description":"A STEM club"},{"id":"2","name":"Chess"}]"#,
            )
            .create_async()
            .await;

        let m = mobile(&server, true);
        assert_eq!(m.load_clubs().await.expect("load").len(), 2);

        let stem = m.apply_filter(String::new(), true);
        assert_eq!(stem.len(), 1);
        assert_eq!(stem[0].id, "1");
        assert_eq!(m.visible_clubs(), stem);
    }

    #[test]
    fn test_directions_through_bridge() {
        let server_url = "http://127.0.0.1:9";
        let config = Config {
            base_url: server_url.to_string(),
            api_key: "anon".to_string(),
            ..Config::default()
        };
        let m = ClubDirectoryMobile::from_parts(
            &config,
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(DesktopPlatform { granted: true }),
        )
        .expect("mobile object");

        assert_eq!(
            m.get_directions(String::new()),
            MobileDirectionsOutcome::MissingLocation
        );
        // No navigation app, geo handler fails: web search is what remains.
        assert_eq!(
            m.get_directions("123 Main St".to_string()),
            MobileDirectionsOutcome::Dispatched {
                provider: MobileProvider::WebSearch
            }
        );

        let denied = ClubDirectoryMobile::from_parts(
            &config,
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(DesktopPlatform { granted: false }),
        )
        .expect("mobile object");
        assert_eq!(
            denied.get_directions("123 Main St".to_string()),
            MobileDirectionsOutcome::PermissionRequired
        );
    }
}
