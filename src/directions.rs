use crate::model::Club;
use thiserror::Error;

pub const NAVIGATION_PACKAGE: &str = "com.google.android.apps.maps";
const WEB_SEARCH_URL: &str = "https://www.google.com/maps/search/?api=1&query=";

/// Handler that ended up receiving the navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Dedicated navigation app (turn-by-turn).
    NavigationApp,
    /// Any app accepting `geo:` URIs.
    GeoHandler,
    /// Map search in the browser. Needs no special capability.
    WebSearch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionsOutcome {
    MissingLocation,
    ServiceDisabled,
    PermissionRequired,
    Dispatched(Provider),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    pub provider: Provider,
    pub uri: String,
    /// Restricts the request to one app when set.
    pub package: Option<String>,
}

impl NavigationRequest {
    pub fn new(provider: Provider, destination: &str) -> Self {
        let encoded = urlencoding::encode(destination);
        match provider {
            Provider::NavigationApp => Self {
                provider,
                uri: format!("google.navigation:q={}", encoded),
                package: Some(NAVIGATION_PACKAGE.to_string()),
            },
            Provider::GeoHandler => Self {
                provider,
                uri: format!("geo:0,0?q={}", encoded),
                package: None,
            },
            Provider::WebSearch => Self {
                provider,
                uri: format!("{}{}", WEB_SEARCH_URL, encoded),
                package: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct DispatchError(pub String);

/// Device capabilities the resolver depends on.
///
/// The two queries are asked fresh on every `resolve`; the two requests are
/// fire-and-forget.
pub trait LocationPlatform {
    fn location_service_enabled(&self) -> bool;
    fn location_permission_granted(&self) -> bool;
    /// Surface the system location settings to the user.
    fn prompt_enable_service(&self);
    /// Ask for the location permission. The answer arrives out of band.
    fn request_permission(&self);
    /// Whether some installed handler accepts this request.
    fn can_handle(&self, request: &NavigationRequest) -> Result<bool, DispatchError>;
    fn launch(&self, request: &NavigationRequest) -> Result<(), DispatchError>;
}

pub struct DirectionsResolver<P> {
    platform: P,
}

impl<P: LocationPlatform> DirectionsResolver<P> {
    pub fn new(platform: P) -> Self {
        Self { platform }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn resolve_for(&self, club: &Club) -> DirectionsOutcome {
        self.resolve(club.destination().unwrap_or_default())
    }

    /// One independent decision. Service and permission problems are reported,
    /// not retried; the caller resolves again once the user fixed them.
    pub fn resolve(&self, destination: &str) -> DirectionsOutcome {
        let destination = destination.trim();
        if destination.is_empty() {
            return DirectionsOutcome::MissingLocation;
        }

        if !self.platform.location_service_enabled() {
            self.platform.prompt_enable_service();
            return DirectionsOutcome::ServiceDisabled;
        }

        if !self.platform.location_permission_granted() {
            self.platform.request_permission();
            return DirectionsOutcome::PermissionRequired;
        }

        DirectionsOutcome::Dispatched(self.dispatch(destination))
    }

    fn dispatch(&self, destination: &str) -> Provider {
        let nav = NavigationRequest::new(Provider::NavigationApp, destination);
        match self.platform.can_handle(&nav) {
            Ok(true) => match self.platform.launch(&nav) {
                Ok(()) => return Provider::NavigationApp,
                Err(e) => log::debug!("Navigation app refused request: {}", e),
            },
            Ok(false) => {}
            Err(e) => {
                log::warn!("Handler lookup failed, using web maps: {}", e);
                return self.web_fallback(destination);
            }
        }

        let geo = NavigationRequest::new(Provider::GeoHandler, destination);
        match self.platform.launch(&geo) {
            Ok(()) => Provider::GeoHandler,
            Err(e) => {
                log::debug!("Geo handler refused request: {}", e);
                self.web_fallback(destination)
            }
        }
    }

    fn web_fallback(&self, destination: &str) -> Provider {
        let web = NavigationRequest::new(Provider::WebSearch, destination);
        if let Err(e) = self.platform.launch(&web) {
            log::warn!("Web map launch failed: {}", e);
        }
        Provider::WebSearch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct FakePlatform {
        service_enabled: bool,
        permission_granted: bool,
        nav_installed: bool,
        lookup_fails: bool,
        failing: Vec<Provider>,
        prompted: Cell<u32>,
        permission_requests: Cell<u32>,
        launched: RefCell<Vec<NavigationRequest>>,
    }

    impl FakePlatform {
        fn ready() -> Self {
            Self {
                service_enabled: true,
                permission_granted: true,
                nav_installed: true,
                ..Default::default()
            }
        }

        fn launched_providers(&self) -> Vec<Provider> {
            self.launched.borrow().iter().map(|r| r.provider).collect()
        }
    }

    impl LocationPlatform for FakePlatform {
        fn location_service_enabled(&self) -> bool {
            self.service_enabled
        }
        fn location_permission_granted(&self) -> bool {
            self.permission_granted
        }
        fn prompt_enable_service(&self) {
            self.prompted.set(self.prompted.get() + 1);
        }
        fn request_permission(&self) {
            self.permission_requests
                .set(self.permission_requests.get() + 1);
        }
        fn can_handle(&self, _request: &NavigationRequest) -> Result<bool, DispatchError> {
            if self.lookup_fails {
                return Err(DispatchError("package manager unavailable".to_string()));
            }
            Ok(self.nav_installed)
        }
        fn launch(&self, request: &NavigationRequest) -> Result<(), DispatchError> {
            self.launched.borrow_mut().push(request.clone());
            if self.failing.contains(&request.provider) {
                return Err(DispatchError("activity not found".to_string()));
            }
            Ok(())
        }
    }

    #[test]
    fn test_blank_destination_touches_nothing() {
        let resolver = DirectionsResolver::new(FakePlatform::default());
        assert_eq!(resolver.resolve(""), DirectionsOutcome::MissingLocation);
        assert_eq!(resolver.resolve("   "), DirectionsOutcome::MissingLocation);
        let p = resolver.platform();
        assert_eq!(p.prompted.get(), 0);
        assert_eq!(p.permission_requests.get(), 0);
        assert!(p.launched.borrow().is_empty());
    }

    #[test]
    fn test_service_disabled_prompts_and_stops() {
        let resolver = DirectionsResolver::new(FakePlatform {
            service_enabled: false,
            ..FakePlatform::ready()
        });
        assert_eq!(
            resolver.resolve("123 Main St"),
            DirectionsOutcome::ServiceDisabled
        );
        let p = resolver.platform();
        assert_eq!(p.prompted.get(), 1);
        assert_eq!(p.permission_requests.get(), 0);
        assert!(p.launched.borrow().is_empty());
    }

    #[test]
    fn test_permission_missing_requests_and_stops() {
        let resolver = DirectionsResolver::new(FakePlatform {
            permission_granted: false,
            ..FakePlatform::ready()
        });
        assert_eq!(
            resolver.resolve("123 Main St"),
            DirectionsOutcome::PermissionRequired
        );
        // A second call asks again; nothing is cached between calls.
        assert_eq!(
            resolver.resolve("123 Main St"),
            DirectionsOutcome::PermissionRequired
        );
        let p = resolver.platform();
        assert_eq!(p.permission_requests.get(), 2);
        assert!(p.launched.borrow().is_empty());
    }

    #[test]
    fn test_navigation_app_preferred() {
        let resolver = DirectionsResolver::new(FakePlatform::ready());
        assert_eq!(
            resolver.resolve(" 123 Main St "),
            DirectionsOutcome::Dispatched(Provider::NavigationApp)
        );
        let launched = resolver.platform().launched.borrow();
        assert_eq!(launched.len(), 1);
        assert_eq!(launched[0].uri, "google.navigation:q=123%20Main%20St");
        assert_eq!(launched[0].package.as_deref(), Some(NAVIGATION_PACKAGE));
    }

    #[test]
    fn test_geo_handler_when_navigation_app_missing() {
        let resolver = DirectionsResolver::new(FakePlatform {
            nav_installed: false,
            ..FakePlatform::ready()
        });
        assert_eq!(
            resolver.resolve("Union & Main"),
            DirectionsOutcome::Dispatched(Provider::GeoHandler)
        );
        let launched = resolver.platform().launched.borrow();
        assert_eq!(launched.len(), 1);
        assert_eq!(launched[0].uri, "geo:0,0?q=Union%20%26%20Main");
    }

    #[test]
    fn test_primary_failure_falls_through_to_geo() {
        let resolver = DirectionsResolver::new(FakePlatform {
            failing: vec![Provider::NavigationApp],
            ..FakePlatform::ready()
        });
        assert_eq!(
            resolver.resolve("123 Main St"),
            DirectionsOutcome::Dispatched(Provider::GeoHandler)
        );
        assert_eq!(
            resolver.platform().launched_providers(),
            vec![Provider::NavigationApp, Provider::GeoHandler]
        );
    }

    #[test]
    fn test_everything_failing_ends_on_web_search() {
        let resolver = DirectionsResolver::new(FakePlatform {
            failing: vec![Provider::NavigationApp, Provider::GeoHandler],
            ..FakePlatform::ready()
        });
        assert_eq!(
            resolver.resolve("123 Main St"),
            DirectionsOutcome::Dispatched(Provider::WebSearch)
        );
        let launched = resolver.platform().launched.borrow();
        assert_eq!(
            launched.iter().map(|r| r.provider).collect::<Vec<_>>(),
            vec![Provider::NavigationApp, Provider::GeoHandler, Provider::WebSearch]
        );
        assert_eq!(
            launched[2].uri,
            "https://www.google.com/maps/search/?api=1&query=123%20Main%20St"
        );
    }

    #[test]
    fn test_failed_lookup_goes_straight_to_web() {
        let resolver = DirectionsResolver::new(FakePlatform {
            lookup_fails: true,
            ..FakePlatform::ready()
        });
        assert_eq!(
            resolver.resolve("123 Main St"),
            DirectionsOutcome::Dispatched(Provider::WebSearch)
        );
        assert_eq!(
            resolver.platform().launched_providers(),
            vec![Provider::WebSearch]
        );
    }

    #[test]
    fn test_web_search_is_reported_even_if_launch_fails() {
        let resolver = DirectionsResolver::new(FakePlatform {
            nav_installed: false,
            failing: vec![Provider::GeoHandler, Provider::WebSearch],
            ..FakePlatform::ready()
        });
        assert_eq!(
            resolver.resolve("123 Main St"),
            DirectionsOutcome::Dispatched(Provider::WebSearch)
        );
    }

    #[test]
    fn test_resolve_for_club_uses_address() {
        let mut club = Club {
            id: "c1".to_string(),
            slug: None,
            name: Some("Robotics".to_string()),
            description: None,
            website: None,
            address: None,
            email: None,
            phone: None,
        };
        let resolver = DirectionsResolver::new(FakePlatform::ready());
        assert_eq!(resolver.resolve_for(&club), DirectionsOutcome::MissingLocation);

        club.address = Some("Engineering Bldg".to_string());
        assert_eq!(
            resolver.resolve_for(&club),
            DirectionsOutcome::Dispatched(Provider::NavigationApp)
        );
    }
}
