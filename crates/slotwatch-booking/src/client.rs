//! HTTP client for the YCLIENTS B2C booking platform.
//!
//! Handles login, session token refresh, request headers and status mapping.
//! Listing calls go through [`BookingClient::post`], which makes sure a fresh
//! token is held before the request is built.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{Span, debug, error, info, warn};

use crate::api::{BookingApi, BoxFuture};
use crate::config::BookingConfig;
use crate::error::{BookingError, BookingResult};
use crate::payload;
use crate::response;
use crate::session::{SessionState, SessionToken};

/// Path of the staff search endpoint.
pub const SEARCH_STAFF_PATH: &str = "/api/v1/b2c/booking/availability/search-staff";
/// Path of the dates search endpoint.
pub const SEARCH_DATES_PATH: &str = "/api/v1/b2c/booking/availability/search-dates";
/// Path of the timeslots search endpoint.
pub const SEARCH_TIMESLOTS_PATH: &str = "/api/v1/b2c/booking/availability/search-timeslots";

const LOGIN_ACCEPT: &str = "application/vnd.api.v2+json";
const LISTING_ACCEPT: &str = "application/json, text/plain, */*";
const APPLICATION_NAME: &str = "client.booking";
const APPLICATION_ACTION: &str = "company";

/// Maximum number of body bytes included in warning logs.
const LOG_BODY_LIMIT: usize = 600;

#[derive(Serialize)]
struct LoginRequest<'a> {
    login: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: LoginData,
}

#[derive(Debug, Default, Deserialize)]
struct LoginData {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    user_token: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    meta: Option<ErrorMeta>,
}

#[derive(Debug, Deserialize)]
struct ErrorMeta {
    message: Option<String>,
}

/// Snapshot of the client state, for the startup log and `slotwatch check`.
#[derive(Debug, Clone)]
pub struct ClientStatus {
    /// Login, password and partner token are all set.
    pub auth_configured: bool,
    /// Current session state.
    pub state: SessionState,
    /// Time until the held token is refreshed, if any.
    pub refresh_in: Option<Duration>,
    /// Base URL of the availability endpoints.
    pub base_url: String,
}

/// Authenticated client for the availability endpoints.
pub struct BookingClient {
    http: reqwest::Client,
    config: BookingConfig,
    session: RwLock<Option<SessionToken>>,
    /// Serializes logins so at most one is in flight.
    refresh: Mutex<()>,
}

impl BookingClient {
    /// Creates a client. No network traffic happens until the first call.
    pub fn new(config: BookingConfig) -> BookingResult<Self> {
        config.validate().map_err(BookingError::configuration)?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                BookingError::configuration(format!("failed to build HTTP client: {}", e))
                    .with_source(e)
            })?;

        Ok(Self {
            http,
            config,
            session: RwLock::new(None),
            refresh: Mutex::new(()),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &BookingConfig {
        &self.config
    }

    /// Makes sure a fresh session token is held, logging in if needed.
    pub async fn authenticate(&self) -> BookingResult<()> {
        self.session_token().await.map(|_| ())
    }

    /// Drops the held token; the next call logs in again.
    pub async fn invalidate_session(&self) {
        *self.session.write().await = None;
    }

    /// Reports configuration and session state.
    pub async fn status(&self) -> ClientStatus {
        let session = self.session.read().await;
        let now = Instant::now();
        let (state, refresh_in) = match session.as_ref() {
            Some(token) => (token.state_at(now), Some(token.time_to_refresh())),
            None => (SessionState::Unauthenticated, None),
        };
        ClientStatus {
            auth_configured: self.config.has_credentials(),
            state,
            refresh_in,
            base_url: self.config.base_url.to_string(),
        }
    }

    /// Lists staff bookable for a service.
    pub async fn list_staff(&self, location_id: u64, service_id: u64) -> BookingResult<Vec<u64>> {
        let body = payload::search_staff(location_id, service_id);
        let raw = self.post(SEARCH_STAFF_PATH, &body).await?;
        response::parse_staff_ids(&raw)
    }

    /// Lists bookable dates in a range.
    pub async fn list_dates(
        &self,
        location_id: u64,
        service_id: u64,
        date_from: &str,
        date_to: &str,
        staff_id: Option<u64>,
    ) -> BookingResult<Vec<String>> {
        let body = payload::search_dates(location_id, service_id, date_from, date_to, staff_id);
        let raw = self.post(SEARCH_DATES_PATH, &body).await?;
        response::parse_dates(&raw)
    }

    /// Lists bookable timeslots on a date.
    pub async fn list_timeslots(
        &self,
        location_id: u64,
        service_id: u64,
        date: &str,
        staff_id: u64,
    ) -> BookingResult<Vec<String>> {
        let body = payload::search_timeslots(location_id, service_id, date, staff_id);
        let raw = self.post(SEARCH_TIMESLOTS_PATH, &body).await?;
        response::parse_timeslots(&raw)
    }

    async fn fresh_token(&self) -> Option<String> {
        let session = self.session.read().await;
        session
            .as_ref()
            .filter(|token| token.is_fresh())
            .map(|token| token.value().to_string())
    }

    /// Returns a token valid for a call sent now.
    async fn session_token(&self) -> BookingResult<String> {
        if let Some(token) = self.fresh_token().await {
            return Ok(token);
        }

        let _guard = self.refresh.lock().await;
        // Another caller may have refreshed while we waited.
        if let Some(token) = self.fresh_token().await {
            return Ok(token);
        }

        let token = self.login().await?;
        let value = token.value().to_string();
        *self.session.write().await = Some(token);
        Ok(value)
    }

    async fn login(&self) -> BookingResult<SessionToken> {
        debug!(endpoint = %self.config.auth_url, "authenticating with booking platform");

        let issued_at = Instant::now();
        let response = self
            .http
            .post(self.config.auth_url.clone())
            .header(AUTHORIZATION, authorization_header(&self.config.partner_token, None))
            .header(ACCEPT, LOGIN_ACCEPT)
            .json(&LoginRequest {
                login: &self.config.login,
                password: &self.config.password,
            })
            .send()
            .await
            .map_err(|e| transport_error("auth request", e))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            BookingError::network(format!("failed to read auth response: {}", e)).with_source(e)
        })?;

        if !status.is_success() {
            warn!(
                status = status.as_u16(),
                body = %truncate_for_log(&body, LOG_BODY_LIMIT),
                "auth request failed"
            );
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.meta)
                .and_then(|m| m.message)
                .filter(|m| !m.is_empty());
            let err = match message {
                Some(message) => BookingError::authentication(format!("auth failed: {}", message)),
                None => BookingError::authentication(format!(
                    "auth failed with status {}",
                    status.as_u16()
                )),
            };
            return Err(err.with_status(status.as_u16()));
        }

        let parsed: LoginResponse = serde_json::from_slice(&body).map_err(|e| {
            BookingError::invalid_response(format!("failed to parse auth response: {}", e))
                .with_source(e)
        })?;

        if !parsed.success || parsed.data.user_token.is_empty() {
            return Err(BookingError::authentication(
                "auth unsuccessful: no user token",
            ));
        }

        info!(
            user_id = ?parsed.data.id,
            user_name = parsed.data.name.as_deref().unwrap_or(""),
            token_lifetime_secs = self.config.token_lifetime.as_secs(),
            "authenticated with booking platform"
        );

        Ok(SessionToken::new(
            parsed.data.user_token,
            issued_at,
            self.config.token_lifetime,
            self.config.refresh_margin,
        ))
    }

    /// Posts a JSON body to an availability endpoint and returns the raw body.
    #[tracing::instrument(
        skip(self, body),
        fields(component = "booking_client", status, duration_ms)
    )]
    async fn post<B>(&self, endpoint: &str, body: &B) -> BookingResult<Vec<u8>>
    where
        B: Serialize + ?Sized,
    {
        let url = self.config.base_url.join(endpoint).map_err(|e| {
            BookingError::configuration(format!("invalid endpoint {}: {}", endpoint, e))
        })?;

        let token = self.session_token().await?;

        let started = std::time::Instant::now();
        let result = self
            .http
            .post(url)
            .header(
                AUTHORIZATION,
                authorization_header(&self.config.partner_token, Some(&token)),
            )
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, LISTING_ACCEPT)
            .header("X-YCLIENTS-Application-Name", APPLICATION_NAME)
            .header("X-YCLIENTS-Application-Action", APPLICATION_ACTION)
            .header("X-YCLIENTS-Application-Platform", &self.config.platform)
            .json(body)
            .send()
            .await;
        let elapsed = started.elapsed();
        Span::current().record("duration_ms", elapsed.as_millis() as u64);

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "booking request failed");
                return Err(transport_error("request", e));
            }
        };

        let status = response.status();
        Span::current().record("status", status.as_u16());

        let bytes = response.bytes().await.map_err(|e| {
            BookingError::network(format!("failed to read response body: {}", e)).with_source(e)
        })?;

        if !status.is_success() {
            warn!(
                body = %truncate_for_log(&bytes, LOG_BODY_LIMIT),
                body_size = bytes.len(),
                "non-2xx response from booking platform"
            );
            if status == StatusCode::UNAUTHORIZED {
                self.invalidate_session().await;
            }
            return Err(status_error(status, endpoint));
        }

        debug!(body_size = bytes.len(), "booking request succeeded");
        Ok(bytes.to_vec())
    }
}

impl BookingApi for BookingClient {
    fn list_bookable_staff(
        &self,
        location_id: u64,
        service_id: u64,
    ) -> BoxFuture<'_, BookingResult<Vec<u64>>> {
        Box::pin(self.list_staff(location_id, service_id))
    }

    fn list_bookable_dates<'a>(
        &'a self,
        location_id: u64,
        service_id: u64,
        date_from: &'a str,
        date_to: &'a str,
        staff_id: Option<u64>,
    ) -> BoxFuture<'a, BookingResult<Vec<String>>> {
        Box::pin(self.list_dates(location_id, service_id, date_from, date_to, staff_id))
    }

    fn list_bookable_timeslots<'a>(
        &'a self,
        location_id: u64,
        service_id: u64,
        date: &'a str,
        staff_id: u64,
    ) -> BoxFuture<'a, BookingResult<Vec<String>>> {
        Box::pin(self.list_timeslots(location_id, service_id, date, staff_id))
    }
}

impl std::fmt::Debug for BookingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// `Bearer <partner>, User <token>`, or just `Bearer <partner>` without a token.
pub fn authorization_header(partner_token: &str, user_token: Option<&str>) -> String {
    match user_token {
        Some(token) if !token.is_empty() => format!("Bearer {}, User {}", partner_token, token),
        _ => format!("Bearer {}", partner_token),
    }
}

fn transport_error(what: &str, e: reqwest::Error) -> BookingError {
    let message = if e.is_timeout() {
        format!("{} timed out", what)
    } else if e.is_connect() {
        format!("{}: connection failed: {}", what, e)
    } else {
        format!("{} failed: {}", what, e)
    };
    BookingError::network(message).with_source(e)
}

fn status_error(status: StatusCode, endpoint: &str) -> BookingError {
    let code = status.as_u16();
    let err = match status {
        StatusCode::UNAUTHORIZED => {
            BookingError::authentication(format!("session rejected by {}", endpoint))
        }
        StatusCode::FORBIDDEN => BookingError::authorization(format!("access denied to {}", endpoint)),
        StatusCode::NOT_FOUND => BookingError::not_found(format!("{} not found", endpoint)),
        StatusCode::TOO_MANY_REQUESTS => {
            BookingError::rate_limited(format!("rate limit exceeded on {}", endpoint))
        }
        s if s.is_server_error() => {
            BookingError::server(format!("{} returned status {}", endpoint, code))
        }
        _ => BookingError::bad_request(format!("{} returned status {}", endpoint, code)),
    };
    err.with_status(code)
}

/// A compact, single-line preview of a response body.
///
/// Control characters are replaced by spaces so bodies cannot forge log lines.
pub fn truncate_for_log(body: &[u8], limit: usize) -> String {
    let cut = &body[..body.len().min(limit)];
    String::from_utf8_lossy(cut)
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BookingErrorCode;
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    /// Exact match on the full header value; values here contain commas.
    fn header_is(
        name: &'static str,
        value: &'static str,
    ) -> impl Fn(&Request) -> bool + Send + Sync + 'static {
        move |req: &Request| {
            req.headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v == value)
        }
    }

    fn login_ok(token: &str) -> ResponseTemplate {
        ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "data": {"id": 1, "user_token": token, "name": "Test"},
            "meta": []
        }))
    }

    fn staff_body() -> serde_json::Value {
        json!({"data": [
            {"type": "staff", "id": "42", "attributes": {"is_bookable": true}},
            {"type": "staff", "id": "43", "attributes": {"is_bookable": false}}
        ]})
    }

    fn client_for(server: &MockServer) -> BookingClient {
        let base = Url::parse(&server.uri()).unwrap();
        let auth = base.join("/api/v1/auth").unwrap();
        let config = BookingConfig::new("user", "pass", "partner")
            .with_base_url(base)
            .with_auth_url(auth)
            .with_timeout(Duration::from_secs(5));
        BookingClient::new(config).unwrap()
    }

    #[test]
    fn authorization_header_shape() {
        assert_eq!(
            authorization_header("p", Some("u")),
            "Bearer p, User u"
        );
        assert_eq!(authorization_header("p", None), "Bearer p");
        assert_eq!(authorization_header("p", Some("")), "Bearer p");
    }

    #[test]
    fn truncate_for_log_strips_control_chars() {
        assert_eq!(truncate_for_log(b"a\nb\r\tc", 100), "a b  c");
        assert_eq!(truncate_for_log(b"abcdef", 3), "abc");
    }

    #[test]
    fn new_rejects_missing_credentials() {
        let err = BookingClient::new(BookingConfig::new("", "", "")).unwrap_err();
        assert_eq!(err.code(), BookingErrorCode::ConfigurationError);
    }

    #[tokio::test]
    async fn login_once_and_reuse_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth"))
            .and(header("authorization", "Bearer partner"))
            .and(header("accept", LOGIN_ACCEPT))
            .and(body_json(json!({"login": "user", "password": "pass"})))
            .respond_with(login_ok("tok-1"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(SEARCH_STAFF_PATH))
            .and(header_is("authorization", "Bearer partner, User tok-1"))
            .and(header_is("accept", LISTING_ACCEPT))
            .respond_with(ResponseTemplate::new(200).set_body_json(staff_body()))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(client.status().await.state, SessionState::Unauthenticated);
        assert_eq!(client.list_staff(780413, 100).await.unwrap(), vec![42]);
        assert_eq!(client.list_staff(780413, 100).await.unwrap(), vec![42]);
        assert_eq!(client.status().await.state, SessionState::Authenticated);
    }

    #[tokio::test]
    async fn refreshes_after_expiry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth"))
            .respond_with(login_ok("tok"))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(SEARCH_STAFF_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(staff_body()))
            .mount(&server)
            .await;

        let base = Url::parse(&server.uri()).unwrap();
        let config = BookingConfig::new("user", "pass", "partner")
            .with_auth_url(base.join("/api/v1/auth").unwrap())
            .with_base_url(base)
            .with_token_lifetime(Duration::from_millis(200), Duration::from_millis(100));
        let client = BookingClient::new(config).unwrap();

        client.list_staff(1, 100).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(client.status().await.state, SessionState::Expiring);
        client.list_staff(1, 100).await.unwrap();
    }

    #[tokio::test]
    async fn listing_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth"))
            .respond_with(login_ok("tok"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(SEARCH_TIMESLOTS_PATH))
            .and(header("content-type", "application/json"))
            .and(header("x-yclients-application-name", "client.booking"))
            .and(header("x-yclients-application-action", "company"))
            .and(header("x-yclients-application-platform", "rust-client"))
            .and(body_json(json!({
                "context": {"location_id": 1},
                "filter": {
                    "date": "2025-06-01",
                    "records": [{
                        "staff_id": 42,
                        "attendance_service_items": [{"type": "service", "id": 100}]
                    }]
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [
                {"type": "slot", "id": "1", "attributes": {"datetime": "2025-06-01T10:00:00+03:00", "is_bookable": true}}
            ]})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let slots = client.list_timeslots(1, 100, "2025-06-01", 42).await.unwrap();
        assert_eq!(slots, vec!["2025-06-01T10:00:00+03:00"]);
    }

    #[tokio::test]
    async fn login_failure_carries_meta_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "success": false,
                "data": null,
                "meta": {"message": "Неверный логин или пароль"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.list_staff(1, 100).await.unwrap_err();
        assert!(err.is_auth());
        assert_eq!(err.status(), Some(401));
        assert!(err.message().contains("Неверный логин или пароль"));
    }

    #[tokio::test]
    async fn login_without_token_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "success": true,
                "data": {"user_token": ""}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.authenticate().await.unwrap_err().is_auth());
    }

    #[tokio::test]
    async fn status_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth"))
            .respond_with(login_ok("tok"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(SEARCH_STAFF_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_string("down\nfor maintenance"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(SEARCH_DATES_PATH))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad filter"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(SEARCH_TIMESLOTS_PATH))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = client_for(&server);

        let err = client.list_staff(1, 100).await.unwrap_err();
        assert_eq!(err.code(), BookingErrorCode::ServerError);
        assert!(err.is_retryable());

        let err = client
            .list_dates(1, 100, "2025-06-01", "9999-01-01", Some(42))
            .await
            .unwrap_err();
        assert_eq!(err.code(), BookingErrorCode::BadRequest);
        assert_eq!(err.status(), Some(422));

        let err = client
            .list_timeslots(1, 100, "2025-06-01", 42)
            .await
            .unwrap_err();
        assert_eq!(err.code(), BookingErrorCode::RateLimited);
    }

    #[tokio::test]
    async fn unauthorized_listing_drops_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth"))
            .respond_with(login_ok("tok"))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(SEARCH_STAFF_PATH))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.list_staff(1, 100).await.unwrap_err().is_auth());
        assert_eq!(client.status().await.state, SessionState::Unauthenticated);
        assert!(client.list_staff(1, 100).await.is_err());
    }

    #[tokio::test]
    async fn malformed_record_does_not_fail_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth"))
            .respond_with(login_ok("tok"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(SEARCH_DATES_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [
                {"type": "date", "id": "1", "attributes": 5},
                {"type": "date", "id": "2", "attributes": {"date": "2025-06-02", "is_bookable": true}}
            ]})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let dates = client
            .list_dates(1, 100, "2025-06-01", "9999-01-01", Some(42))
            .await
            .unwrap();
        assert_eq!(dates, vec!["2025-06-02"]);
    }

    #[tokio::test]
    async fn concurrent_calls_share_one_login() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth"))
            .respond_with(login_ok("tok").set_delay(Duration::from_millis(50)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(SEARCH_STAFF_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(staff_body()))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let (a, b, c) = tokio::join!(
            client.list_staff(1, 100),
            client.list_staff(1, 101),
            client.list_staff(1, 102)
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
    }
}
