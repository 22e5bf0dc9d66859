// File: src/client.rs
use crate::error::ClientError;
use anyhow::{Context, Result};
use cert::NoVerifier;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{Method, Request, StatusCode, Uri};
use http_body_util::BodyExt;
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde::de::DeserializeOwned;
use std::error::Error as _;
use std::sync::Arc;

mod cert;

type HttpsClient = Client<hyper_rustls::HttpsConnector<HttpConnector>, String>;

pub const API_KEY_HEADER: &str = "apikey";
const JSON: &str = "application/json";

/// Status and body of a completed request.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Thin HTTPS client bound to one backend.
///
/// Cheap to clone; clones share the connection pool. Every request carries the
/// `apikey` and `Accept` headers; the bearer header is added only when a token is
/// passed in.
#[derive(Clone, Debug)]
pub struct RestClient {
    http: HttpsClient,
    base_url: String,
    api_key: String,
}

impl RestClient {
    pub fn new(base_url: &str, api_key: &str, insecure: bool) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        let uri: Uri = base_url
            .parse()
            .with_context(|| format!("Invalid base URL: {}", base_url))?;
        if uri.scheme().is_none() || uri.authority().is_none() {
            return Err(anyhow::anyhow!("Base URL must be absolute: {}", base_url));
        }

        let tls_config = if insecure {
            rustls::ClientConfig::builder()
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoVerifier))
                .with_no_client_auth()
        } else {
            Self::verified_tls_config(uri.scheme_str() == Some("https"))?
        };

        let https_connector = HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .build();

        Ok(Self {
            http: Client::builder(TokioExecutor::new()).build(https_connector),
            base_url,
            api_key: api_key.to_string(),
        })
    }

    #[cfg(not(target_os = "android"))]
    fn verified_tls_config(require_roots: bool) -> Result<rustls::ClientConfig> {
        let mut root_store = rustls::RootCertStore::empty();
        let result = rustls_native_certs::load_native_certs();
        root_store.add_parsable_certificates(result.certs);

        // A plain-http backend (local development, tests) never uses the roots.
        if root_store.is_empty() && require_roots {
            return Err(anyhow::anyhow!("No valid system certificates found."));
        }

        Ok(rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth())
    }

    #[cfg(target_os = "android")]
    fn verified_tls_config(_require_roots: bool) -> Result<rustls::ClientConfig> {
        use rustls_platform_verifier::ConfigVerifierExt;
        rustls::ClientConfig::with_platform_verifier()
            .map_err(|e| anyhow::anyhow!("Platform certificate verifier unavailable: {}", e))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends one request. There is no retry: a transport failure is returned as
    /// `ClientError::Network` and the caller decides what to do.
    pub async fn send(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<String>,
        token: Option<&str>,
    ) -> Result<RawResponse, ClientError> {
        let url = format!("{}{}", self.base_url, path_and_query);

        let mut builder = Request::builder()
            .method(method.clone())
            .uri(url.as_str())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .header(ACCEPT, JSON);
        if body.is_some() {
            builder = builder.header(CONTENT_TYPE, JSON);
        }
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = builder
            .body(body.unwrap_or_default())
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))?;

        log::debug!("{} {}", method, path_and_query);

        let response = self.http.request(request).await.map_err(|e| {
            let msg = match e.source() {
                Some(source) => format!("{}: {}", e, source),
                None => e.to_string(),
            };
            ClientError::Network(msg)
        })?;

        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?
            .to_bytes();

        log::debug!("{} {} -> {}", method, path_and_query, status);

        Ok(RawResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn test_rejects_relative_base_url() {
        assert!(RestClient::new("not a url", "anon", false).is_err());
        assert!(RestClient::new("/rest/v1", "anon", false).is_err());
    }

    #[tokio::test]
    async fn test_trailing_slash_is_trimmed() {
        let client = RestClient::new("http://localhost:54321/", "anon", false).expect("client");
        assert_eq!(client.base_url(), "http://localhost:54321");
    }

    #[tokio::test]
    async fn test_fixed_headers_without_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/v1/clubs")
            .match_query(Matcher::Any)
            .match_header("apikey", "anon-key")
            .match_header("accept", "application/json")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let client = RestClient::new(&server.url(), "anon-key", false).expect("client");
        let resp = client
            .send(Method::GET, "/rest/v1/clubs?select=*", None, None)
            .await
            .expect("request should succeed");

        assert!(resp.is_success());
        assert_eq!(resp.body, b"[]");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_bearer_and_content_type_when_needed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PATCH", "/rest/v1/profiles")
            .match_query(Matcher::Any)
            .match_header("apikey", "anon-key")
            .match_header("authorization", "Bearer jwt")
            .match_header("content-type", "application/json")
            .match_body(Matcher::JsonString(r#"{"name":"Ada"}"#.to_string()))
            .with_status(204)
            .create_async()
            .await;

        let client = RestClient::new(&server.url(), "anon-key", false).expect("client");
        let resp = client
            .send(
                Method::PATCH,
                "/rest/v1/profiles?id=eq.u1",
                Some(r#"{"name":"Ada"}"#.to_string()),
                Some("jwt"),
            )
            .await
            .expect("request should succeed");

        assert_eq!(resp.status, StatusCode::NO_CONTENT);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // Bind then drop a listener to get a port nobody is serving.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .and_then(|l| l.local_addr())
            .map(|a| a.port())
            .expect("free port");
        let client =
            RestClient::new(&format!("http://127.0.0.1:{}", port), "anon", false).expect("client");

        let err = client
            .send(Method::GET, "/rest/v1/clubs?select=*", None, None)
            .await
            .expect_err("nothing is listening");
        assert!(matches!(err, ClientError::Network(_)), "got {:?}", err);
    }
}
