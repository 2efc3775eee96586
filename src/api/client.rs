//! API client for the Investment Hub backend.
//!
//! This module provides the `ApiClient` struct for authenticated requests
//! against the backend REST API (auth, watchlist, stock prices). Requests
//! carry the session's bearer token; a 403 response triggers exactly one
//! silent token refresh followed by one retry of the original request.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method};
use serde::Deserialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::models::{NewWatchlistItem, WatchlistResponse, WatchlistUpdate};
use crate::session::{SessionStore, User};

use super::ApiError;

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Emitted when the session becomes unusable and the UI must return to the
/// login screen. The TUI's counterpart of a forced navigation to `/login`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SessionExpired,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: User,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
    refresh_token: String,
}

/// Response from `GET /stocks/{symbol}`. The backend serializes the price
/// as a string.
#[derive(Debug, Deserialize)]
struct LastPriceResponse {
    last_price: serde_json::Value,
}

/// An outbound call described so it can be re-issued after a token refresh.
/// The single-retry marker travels next to it as an explicit bool rather
/// than as hidden mutation of a shared request object.
struct OutboundRequest {
    method: Method,
    url: String,
    body: Option<serde_json::Value>,
}

/// API client for the Investment Hub backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection
/// pooling, and the session store is itself a shared handle.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: SessionStore,
    auth_events: UnboundedSender<AuthEvent>,
    /// Serializes concurrent refresh attempts: when several requests hit a
    /// 403 at once, only the first issues a refresh call; the rest retry
    /// with the token it installed.
    refresh_guard: Arc<tokio::sync::Mutex<()>>,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        session: SessionStore,
        auth_events: UnboundedSender<AuthEvent>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
            auth_events,
            refresh_guard: Arc::new(tokio::sync::Mutex::new(())),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    // =====================================================================
    // Authentication endpoints (issued directly, never intercepted)
    // =====================================================================

    /// Register a new account. Redirect-to-login on success is the UI's job.
    pub async fn register(&self, email: &str, password: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url("/auth/register"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        Self::check_response(response).await?;
        Ok(())
    }

    /// Authenticate and return the session payload. The caller stores it.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse login response: {}", e)))
    }

    /// Exchange the stored refresh token for a new token pair and install it
    /// in the session store. Used by the expiry prompt's "still here" path;
    /// the 403 interceptor shares the same underlying refresh call.
    pub async fn refresh_session(&self) -> Result<(), ApiError> {
        let snapshot = self.session.snapshot();
        let Some(refresh_token) = snapshot.refresh_token else {
            self.session.clear();
            return Err(ApiError::Unauthorized);
        };
        let Some(user) = snapshot.user else {
            self.session.clear();
            return Err(ApiError::Unauthorized);
        };

        match self
            .refresh_call(&refresh_token, snapshot.access_token.as_deref())
            .await
        {
            Ok(tokens) => {
                self.session
                    .set(user, tokens.access_token, Some(tokens.refresh_token));
                Ok(())
            }
            Err(e) => {
                self.session.clear();
                Err(e)
            }
        }
    }

    /// The raw refresh request. Never routed through the interceptor, so a
    /// failing refresh can never trigger another refresh.
    async fn refresh_call(
        &self,
        refresh_token: &str,
        access_token: Option<&str>,
    ) -> Result<RefreshResponse, ApiError> {
        let mut builder = self
            .client
            .post(self.url("/auth/refresh"))
            .json(&serde_json::json!({ "refreshToken": refresh_token }));
        if let Some(token) = access_token {
            builder = builder.bearer_auth(token);
        }
        let response = builder.send().await?;
        let response = Self::check_response(response).await?;
        response.json().await.map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse refresh response: {}", e))
        })
    }

    // =====================================================================
    // Intercepted request path
    // =====================================================================

    async fn execute(
        &self,
        request: &OutboundRequest,
        token: Option<&str>,
    ) -> Result<reqwest::Response, ApiError> {
        let mut builder = self.client.request(request.method.clone(), &request.url);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }
        Ok(builder.send().await?)
    }

    /// Send a request with the current bearer token, recovering from at most
    /// one authorization failure via a token refresh.
    async fn send(&self, request: OutboundRequest) -> Result<reqwest::Response, ApiError> {
        let mut attempted = false;
        let mut token = self.session.access_token();

        loop {
            let response = self.execute(&request, token.as_deref()).await?;
            if response.status().is_success() {
                return Ok(response);
            }

            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = ApiError::from_status(status, &body);

            if !error.is_auth_failure() || attempted {
                return Err(error);
            }

            attempted = true;
            token = Some(self.recover_auth(error, token.as_deref()).await?);
            debug!(url = %request.url, "Retrying request with refreshed token");
        }
    }

    /// Handle a 403: refresh once and hand back the token to retry with, or
    /// clear the session, signal the UI, and fail.
    async fn recover_auth(
        &self,
        original_error: ApiError,
        stale_token: Option<&str>,
    ) -> Result<String, ApiError> {
        let snapshot = self.session.snapshot();

        let Some(refresh_token) = snapshot.refresh_token else {
            warn!("Authorization failed with no refresh token; forcing logout");
            self.force_logout();
            return Err(original_error);
        };

        let _guard = self.refresh_guard.lock().await;

        // Another request may have completed a refresh while we waited on
        // the guard; retry with its token instead of refreshing again.
        if let Some(current) = self.session.access_token() {
            if stale_token != Some(current.as_str()) {
                debug!("Token already refreshed by a concurrent request");
                return Ok(current);
            }
        }

        match self
            .refresh_call(&refresh_token, snapshot.access_token.as_deref())
            .await
        {
            Ok(tokens) => match snapshot.user {
                Some(user) => {
                    debug!("Token refresh succeeded");
                    self.session.set(
                        user,
                        tokens.access_token.clone(),
                        Some(tokens.refresh_token),
                    );
                    Ok(tokens.access_token)
                }
                None => {
                    // Tokens without a user is not a session worth keeping.
                    warn!("Token refresh succeeded but no user in session; forcing logout");
                    self.force_logout();
                    Err(original_error)
                }
            },
            Err(refresh_error) => {
                warn!(error = %refresh_error, "Token refresh failed; forcing logout");
                self.force_logout();
                Err(refresh_error)
            }
        }
    }

    fn force_logout(&self) {
        self.session.clear();
        if self.auth_events.send(AuthEvent::SessionExpired).is_err() {
            warn!("Auth event channel closed; logout event dropped");
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .send(OutboundRequest {
                method: Method::GET,
                url: self.url(path),
                body: None,
            })
            .await?;
        response.json().await.map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", path, e))
        })
    }

    // =====================================================================
    // Watchlist
    // =====================================================================

    /// Fetch the user's watchlist with its total invested value.
    pub async fn watchlist(&self) -> Result<WatchlistResponse, ApiError> {
        self.get_json("/watchlist").await
    }

    /// Add a position to the watchlist.
    pub async fn add_watchlist_item(&self, item: &NewWatchlistItem) -> Result<(), ApiError> {
        let body = serde_json::to_value(item)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode item: {}", e)))?;
        self.send(OutboundRequest {
            method: Method::POST,
            url: self.url("/watchlist"),
            body: Some(body),
        })
        .await?;
        Ok(())
    }

    /// Update quantity, purchase price, or purchase date of a position.
    pub async fn update_watchlist_item(
        &self,
        id: i64,
        update: &WatchlistUpdate,
    ) -> Result<(), ApiError> {
        let body = serde_json::to_value(update)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode update: {}", e)))?;
        self.send(OutboundRequest {
            method: Method::PUT,
            url: self.url(&format!("/watchlist/{}", id)),
            body: Some(body),
        })
        .await?;
        Ok(())
    }

    /// Remove a position from the watchlist.
    pub async fn remove_watchlist_item(&self, id: i64) -> Result<(), ApiError> {
        self.send(OutboundRequest {
            method: Method::DELETE,
            url: self.url(&format!("/watchlist/{}", id)),
            body: None,
        })
        .await?;
        Ok(())
    }

    // =====================================================================
    // Stock prices
    // =====================================================================

    /// Latest price for a symbol, via the backend's quote proxy.
    pub async fn last_price(&self, symbol: &str) -> Result<f64, ApiError> {
        let response: LastPriceResponse = self.get_json(&format!("/stocks/{}", symbol)).await?;
        parse_price(&response.last_price).ok_or_else(|| {
            ApiError::InvalidResponse(format!(
                "Unparseable last_price for {}: {}",
                symbol, response.last_price
            ))
        })
    }
}

/// The backend is loose about numeric encoding; accept both `"123.45"` and
/// `123.45`.
fn parse_price(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price_accepts_number_and_string() {
        assert_eq!(parse_price(&serde_json::json!(123.45)), Some(123.45));
        assert_eq!(parse_price(&serde_json::json!("123.45")), Some(123.45));
        assert_eq!(parse_price(&serde_json::json!("nope")), None);
        assert_eq!(parse_price(&serde_json::json!(null)), None);
    }

    #[test]
    fn test_login_response_parsing() {
        let json = r#"{"accessToken":"A1","user":{"id":1,"email":"a@x.com"}}"#;
        let parsed: LoginResponse = serde_json::from_str(json).expect("parse login response");
        assert_eq!(parsed.access_token, "A1");
        assert_eq!(parsed.refresh_token, None);
        assert_eq!(parsed.user.id, 1);
        assert_eq!(parsed.user.email, "a@x.com");

        let json = r#"{"accessToken":"A1","refreshToken":"R1","user":{"id":1,"email":"a@x.com"}}"#;
        let parsed: LoginResponse = serde_json::from_str(json).expect("parse login response");
        assert_eq!(parsed.refresh_token.as_deref(), Some("R1"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let client = ApiClient::new("http://localhost:3000/", SessionStore::new(), tx)
            .expect("build client");
        assert_eq!(client.url("/watchlist"), "http://localhost:3000/watchlist");
    }

    mod interceptor {
        use super::*;
        use tokio::sync::mpsc::UnboundedReceiver;
        use wiremock::matchers::{body_json, header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        fn user() -> User {
            User {
                id: 1,
                email: "a@x.com".to_string(),
            }
        }

        fn watchlist_body() -> serde_json::Value {
            serde_json::json!({ "watchlist": [], "total": "0" })
        }

        async fn client_with_session(
            server: &MockServer,
            refresh_token: Option<&str>,
        ) -> (ApiClient, SessionStore, UnboundedReceiver<AuthEvent>) {
            let store = SessionStore::new();
            store.set(
                user(),
                "A1".to_string(),
                refresh_token.map(|t| t.to_string()),
            );
            let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
            let client =
                ApiClient::new(server.uri(), store.clone(), tx).expect("build client");
            (client, store, rx)
        }

        #[tokio::test]
        async fn forbidden_triggers_one_refresh_then_retry() {
            let server = MockServer::start().await;
            let (client, store, mut events) = client_with_session(&server, Some("R1")).await;

            Mock::given(method("GET"))
                .and(path("/watchlist"))
                .and(header("authorization", "Bearer A1"))
                .respond_with(ResponseTemplate::new(403))
                .expect(1)
                .mount(&server)
                .await;

            Mock::given(method("POST"))
                .and(path("/auth/refresh"))
                .and(header("authorization", "Bearer A1"))
                .and(body_json(serde_json::json!({ "refreshToken": "R1" })))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "accessToken": "A2",
                    "refreshToken": "R2"
                })))
                .expect(1)
                .mount(&server)
                .await;

            Mock::given(method("GET"))
                .and(path("/watchlist"))
                .and(header("authorization", "Bearer A2"))
                .respond_with(ResponseTemplate::new(200).set_body_json(watchlist_body()))
                .expect(1)
                .mount(&server)
                .await;

            let response = client.watchlist().await.expect("retried request succeeds");
            assert!(response.watchlist.is_empty());

            let snapshot = store.snapshot();
            assert_eq!(snapshot.access_token.as_deref(), Some("A2"));
            assert_eq!(snapshot.refresh_token.as_deref(), Some("R2"));
            assert_eq!(snapshot.user, Some(user()));
            assert!(events.try_recv().is_err());
        }

        #[tokio::test]
        async fn second_forbidden_propagates_without_another_refresh() {
            let server = MockServer::start().await;
            let (client, _store, _events) = client_with_session(&server, Some("R1")).await;

            // Both the original and the retried request are rejected
            Mock::given(method("GET"))
                .and(path("/watchlist"))
                .respond_with(ResponseTemplate::new(403))
                .expect(2)
                .mount(&server)
                .await;

            Mock::given(method("POST"))
                .and(path("/auth/refresh"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "accessToken": "A2",
                    "refreshToken": "R2"
                })))
                .expect(1)
                .mount(&server)
                .await;

            let error = client.watchlist().await.expect_err("second 403 propagates");
            assert!(matches!(error, ApiError::Forbidden));
        }

        #[tokio::test]
        async fn missing_refresh_token_logs_out_without_calling_refresh() {
            let server = MockServer::start().await;
            let (client, store, mut events) = client_with_session(&server, None).await;

            Mock::given(method("GET"))
                .and(path("/watchlist"))
                .respond_with(ResponseTemplate::new(403))
                .expect(1)
                .mount(&server)
                .await;

            Mock::given(method("POST"))
                .and(path("/auth/refresh"))
                .respond_with(ResponseTemplate::new(200))
                .expect(0)
                .mount(&server)
                .await;

            let error = client.watchlist().await.expect_err("original error returned");
            assert!(matches!(error, ApiError::Forbidden));
            assert!(!store.is_authenticated());
            assert_eq!(events.try_recv().ok(), Some(AuthEvent::SessionExpired));
        }

        #[tokio::test]
        async fn failed_refresh_clears_session_and_returns_refresh_error() {
            let server = MockServer::start().await;
            let (client, store, mut events) = client_with_session(&server, Some("R1")).await;

            Mock::given(method("GET"))
                .and(path("/watchlist"))
                .respond_with(ResponseTemplate::new(403))
                .expect(1)
                .mount(&server)
                .await;

            Mock::given(method("POST"))
                .and(path("/auth/refresh"))
                .respond_with(ResponseTemplate::new(401))
                .expect(1)
                .mount(&server)
                .await;

            let error = client.watchlist().await.expect_err("refresh failure propagates");
            assert!(matches!(error, ApiError::Unauthorized));
            assert!(!store.is_authenticated());
            assert_eq!(events.try_recv().ok(), Some(AuthEvent::SessionExpired));
        }

        #[tokio::test]
        async fn other_errors_bypass_the_refresh_path() {
            let server = MockServer::start().await;
            let (client, store, _events) = client_with_session(&server, Some("R1")).await;

            Mock::given(method("GET"))
                .and(path("/watchlist"))
                .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
                .expect(1)
                .mount(&server)
                .await;

            Mock::given(method("POST"))
                .and(path("/auth/refresh"))
                .respond_with(ResponseTemplate::new(200))
                .expect(0)
                .mount(&server)
                .await;

            let error = client.watchlist().await.expect_err("500 is not recovered");
            assert!(matches!(error, ApiError::ServerError(_)));
            assert!(store.is_authenticated());
        }

        #[tokio::test]
        async fn refresh_session_installs_new_token_pair() {
            let server = MockServer::start().await;
            let (client, store, _events) = client_with_session(&server, Some("R1")).await;

            Mock::given(method("POST"))
                .and(path("/auth/refresh"))
                .and(body_json(serde_json::json!({ "refreshToken": "R1" })))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "accessToken": "A2",
                    "refreshToken": "R2"
                })))
                .expect(1)
                .mount(&server)
                .await;

            client.refresh_session().await.expect("refresh succeeds");

            let snapshot = store.snapshot();
            assert_eq!(snapshot.access_token.as_deref(), Some("A2"));
            assert_eq!(snapshot.refresh_token.as_deref(), Some("R2"));
        }

        #[tokio::test]
        async fn refresh_session_without_token_clears_session() {
            let server = MockServer::start().await;
            let (client, store, _events) = client_with_session(&server, None).await;

            let error = client
                .refresh_session()
                .await
                .expect_err("no refresh token to use");
            assert!(matches!(error, ApiError::Unauthorized));
            assert!(!store.is_authenticated());
        }

        #[tokio::test]
        async fn login_parses_tokens_and_user() {
            let server = MockServer::start().await;
            let store = SessionStore::new();
            let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
            let client = ApiClient::new(server.uri(), store, tx).expect("build client");

            Mock::given(method("POST"))
                .and(path("/auth/login"))
                .and(body_json(serde_json::json!({
                    "email": "a@x.com",
                    "password": "hunter2"
                })))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "accessToken": "A1",
                    "refreshToken": "R1",
                    "user": { "id": 1, "email": "a@x.com" }
                })))
                .expect(1)
                .mount(&server)
                .await;

            let response = client.login("a@x.com", "hunter2").await.expect("login");
            assert_eq!(response.access_token, "A1");
            assert_eq!(response.user.email, "a@x.com");
        }

        #[tokio::test]
        async fn last_price_parses_string_payload() {
            let server = MockServer::start().await;
            let (client, _store, _events) = client_with_session(&server, Some("R1")).await;

            Mock::given(method("GET"))
                .and(path("/stocks/AAPL"))
                .and(header("authorization", "Bearer A1"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "last_price": "231.59"
                })))
                .expect(1)
                .mount(&server)
                .await;

            let price = client.last_price("AAPL").await.expect("price");
            assert_eq!(price, 231.59);
        }
    }
}
