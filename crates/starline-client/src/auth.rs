//! Session authentication against the StarLine identity service
//!
//! The vendor hands out a session cookie only after a four-step handshake:
//! an application code, an application token, a user login over multipart
//! form data, and finally the SLID token exchange on the data service. Each
//! step consumes the previous step's output, so the sequence is strictly
//! linear. The cookie is good for at most four hours; the authenticator can
//! re-run the whole sequence on a timer to keep it fresh.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use md5::{Digest, Md5};
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, SET_COOKIE};
use serde_json::{json, Value};
use sha1::Sha1;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, instrument, warn};

use crate::error::{AuthFailure, Result};
use crate::request::{RequestExecutor, RequestSpec, DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT};
use crate::routes::VendorRoutes;
use crate::session::SessionHandle;
use crate::types::value_to_string;

/// Refresh cadence when `auto_refresh` is enabled. The vendor states a
/// maximum session lifetime of four hours; refreshing hourly before that
/// bound at three keeps a live cookie without hammering the identity
/// service.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(3 * 60 * 60);

/// Application and user credentials, supplied once at construction.
///
/// The secret and password leave the process only as MD5/SHA-1 hex digests.
#[derive(Clone)]
pub struct Credentials {
    pub app_id: String,
    pub app_secret: String,
    pub login: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("login", &self.login)
            .field("app_secret", &"<redacted>")
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Authenticator configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    credentials: Credentials,
    auto_refresh: bool,
    refresh_interval: Duration,
    identity_base: String,
    data_base: String,
    timeout: Duration,
    connect_timeout: Duration,
}

impl AuthConfig {
    pub fn new(
        app_id: impl Into<String>,
        app_secret: impl Into<String>,
        login: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            credentials: Credentials {
                app_id: app_id.into(),
                app_secret: app_secret.into(),
                login: login.into(),
                password: password.into(),
            },
            auto_refresh: false,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            identity_base: crate::routes::IDENTITY_BASE.to_string(),
            data_base: crate::routes::DATA_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Re-run the handshake periodically in the background
    pub fn auto_refresh(mut self, enabled: bool) -> Self {
        self.auto_refresh = enabled;
        self
    }

    /// Override the refresh cadence (only meaningful with `auto_refresh`)
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Override the identity service base URL
    pub fn identity_base(mut self, base: impl Into<String>) -> Self {
        self.identity_base = base.into();
        self
    }

    /// Override the data service base URL
    pub fn data_base(mut self, base: impl Into<String>) -> Self {
        self.data_base = base.into();
        self
    }

    /// Override the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Where the session currently stands, published on every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// A handshake is pending or in flight
    Pending,
    /// Step 4 completed; cookie and user id are set
    Ready,
    /// The last attempt failed; detail is in the session state
    Failed,
}

/// Session state: cookie, user id, failure detail.
///
/// Ready means a cookie is present; failed means a failure is recorded.
/// Every mutation that sets one clears the other, so the two are never
/// simultaneously true.
#[derive(Debug, Clone, Default)]
pub struct Session {
    cookie: Option<String>,
    user_id: Option<String>,
    failure: Option<AuthFailure>,
}

impl Session {
    pub fn is_ready(&self) -> bool {
        self.cookie.is_some()
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn failure(&self) -> Option<&AuthFailure> {
        self.failure.as_ref()
    }

    fn clear(&mut self) {
        *self = Self::default();
    }

    fn complete(&mut self, cookie: String, user_id: String) {
        self.cookie = Some(cookie);
        self.user_id = Some(user_id);
        self.failure = None;
    }

    fn fail(&mut self, failure: AuthFailure) {
        self.cookie = None;
        self.user_id = None;
        self.failure = Some(failure);
    }
}

fn md5_hex(input: &[u8]) -> String {
    hex::encode(Md5::digest(input))
}

fn sha1_hex(input: &[u8]) -> String {
    hex::encode(Sha1::digest(input))
}

/// JS-style truthiness for the identity service's `state` field, which
/// arrives as a number today but has been seen as a string elsewhere in
/// the vendor API.
fn state_is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Step 4 success predicate: `code == 200`, string or number
fn slid_code_ok(body: &Value) -> bool {
    match body.get("code") {
        Some(Value::String(s)) => s == "200",
        Some(Value::Number(n)) => n.as_i64() == Some(200),
        _ => false,
    }
}

/// Extract the session cookie: first `set-cookie` entry, truncated before
/// its first `;`
fn session_cookie(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(SET_COOKIE)?.to_str().ok()?;
    let end = raw.find(';').unwrap_or(raw.len());
    Some(raw[..end].to_string())
}

/// Pull a string (or number) field out of the envelope's `desc` object;
/// a missing field means the response, though nominally successful, is
/// unusable — the body itself becomes the failure detail.
fn desc_field(body: &Value, field: &str) -> std::result::Result<String, AuthFailure> {
    body.get("desc")
        .and_then(|desc| desc.get(field))
        .and_then(value_to_string)
        .ok_or_else(|| AuthFailure::Rejected(body.clone()))
}

/// Shared authenticator core: executor, routes, credentials, session state,
/// phase channel, and the single-flight gate serializing handshake attempts.
pub(crate) struct AuthCore {
    executor: RequestExecutor,
    routes: VendorRoutes,
    credentials: Credentials,
    session: RwLock<Session>,
    phase_tx: watch::Sender<SessionPhase>,
    gate: Mutex<()>,
}

impl AuthCore {
    pub(crate) fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    pub(crate) fn routes(&self) -> &VendorRoutes {
        &self.routes
    }

    pub(crate) fn snapshot(&self) -> Session {
        self.session.read().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SessionPhase> {
        self.phase_tx.subscribe()
    }

    /// Run one gated handshake attempt, replacing the session state.
    ///
    /// Overlapping callers (manual refresh vs. the timer) serialize on the
    /// gate rather than racing their writes.
    #[instrument(skip(self))]
    pub(crate) async fn authenticate(&self) {
        let _flight = self.gate.lock().await;

        // The not-ready window: the old cookie is gone until step 4 of the
        // new attempt completes.
        self.session.write().clear();
        self.phase_tx.send_replace(SessionPhase::Pending);

        match self.handshake().await {
            Ok((cookie, user_id)) => {
                debug!(%user_id, "session established");
                self.session.write().complete(cookie, user_id);
                self.phase_tx.send_replace(SessionPhase::Ready);
            }
            Err(failure) => {
                warn!(%failure, "authentication failed");
                self.session.write().fail(failure);
                self.phase_tx.send_replace(SessionPhase::Failed);
            }
        }
    }

    async fn handshake(&self) -> std::result::Result<(String, String), AuthFailure> {
        let credentials = &self.credentials;

        // Step 1: application code
        let mut secret = md5_hex(credentials.app_secret.as_bytes());
        let body = self
            .identity_call(
                RequestSpec::get(self.routes.get_code().map_err(transport)?)
                    .query("appId", &credentials.app_id)
                    .query("secret", &secret),
            )
            .await?;
        let code = desc_field(&body, "code")?;

        // Step 2: application token, secret re-keyed with the code
        secret = md5_hex(format!("{}{}", credentials.app_secret, code).as_bytes());
        let body = self
            .identity_call(
                RequestSpec::get(self.routes.get_token().map_err(transport)?)
                    .query("appId", &credentials.app_id)
                    .query("secret", &secret),
            )
            .await?;
        let token = desc_field(&body, "token")?;

        // Step 3: user login as a multipart form, token in a header
        let body = self
            .identity_call(
                RequestSpec::post(self.routes.login().map_err(transport)?)
                    .header("token", &token)
                    .form(vec![
                        ("login".to_string(), credentials.login.clone()),
                        ("pass".to_string(), sha1_hex(credentials.password.as_bytes())),
                    ]),
            )
            .await?;
        let user_token = desc_field(&body, "user_token")?;

        // Step 4: SLID token exchange on the data service
        let response = self
            .executor
            .execute(
                RequestSpec::post(self.routes.auth_slid().map_err(transport)?)
                    .json(json!({ "slid_token": user_token })),
            )
            .await
            .map_err(transport)?;

        if !slid_code_ok(&response.body) {
            return Err(AuthFailure::Rejected(response.body));
        }
        let user_id = response
            .body
            .get("user_id")
            .and_then(value_to_string)
            .ok_or_else(|| AuthFailure::Rejected(response.body.clone()))?;
        let cookie = session_cookie(&response.headers)
            .ok_or_else(|| AuthFailure::Transport("response missing set-cookie header".into()))?;

        Ok((cookie, user_id))
    }

    /// One identity-service round trip with the shared failure predicate:
    /// transport error or falsy `state` ends the handshake.
    async fn identity_call(
        &self,
        spec: RequestSpec,
    ) -> std::result::Result<Value, AuthFailure> {
        let response = self.executor.execute(spec).await.map_err(transport)?;
        let state = response.body.get("state").cloned().unwrap_or(Value::Null);
        if state_is_truthy(&state) {
            Ok(response.body)
        } else {
            Err(AuthFailure::Rejected(response.body))
        }
    }
}

fn transport(error: impl fmt::Display) -> AuthFailure {
    AuthFailure::Transport(error.to_string())
}

/// Owns the session and the background tasks that maintain it.
///
/// Construction spawns the first handshake immediately; with
/// `auto_refresh` a second task re-runs the full sequence on the
/// configured cadence. Both tasks are aborted on drop, so no timer
/// outlives the authenticator.
pub struct SessionAuthenticator {
    core: Arc<AuthCore>,
    initial: JoinHandle<()>,
    refresh: Option<JoinHandle<()>>,
}

impl SessionAuthenticator {
    /// Build the authenticator and begin authenticating.
    ///
    /// Must be called within a tokio runtime. Readiness is observed through
    /// [`SessionAuthenticator::handle`], not returned here.
    pub fn spawn(config: AuthConfig) -> Result<Self> {
        let executor = RequestExecutor::with_config(config.timeout, config.connect_timeout)?;
        let routes = VendorRoutes::new(&config.identity_base, &config.data_base)?;
        let (phase_tx, _) = watch::channel(SessionPhase::Pending);

        let core = Arc::new(AuthCore {
            executor,
            routes,
            credentials: config.credentials,
            session: RwLock::new(Session::default()),
            phase_tx,
            gate: Mutex::new(()),
        });

        let initial = tokio::spawn({
            let core = Arc::clone(&core);
            async move {
                core.authenticate().await;
            }
        });

        let refresh = config.auto_refresh.then(|| {
            tokio::spawn({
                let core = Arc::clone(&core);
                let period = config.refresh_interval;
                async move {
                    let mut ticker = tokio::time::interval(period);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    // The first tick completes immediately; the initial
                    // handshake task already covers that attempt.
                    ticker.tick().await;
                    loop {
                        ticker.tick().await;
                        core.authenticate().await;
                    }
                }
            })
        });

        Ok(Self {
            core,
            initial,
            refresh,
        })
    }

    /// A clonable read-only view of the session
    pub fn handle(&self) -> SessionHandle {
        SessionHandle::new(Arc::clone(&self.core))
    }

    /// Force a refresh ahead of the timer; runs the same gated sequence
    pub async fn authenticate(&self) {
        self.core.authenticate().await;
    }

    pub fn is_ready(&self) -> bool {
        self.core.snapshot().is_ready()
    }

    pub fn is_failed(&self) -> bool {
        self.core.snapshot().is_failed()
    }

    pub fn cookie(&self) -> Option<String> {
        self.core.snapshot().cookie().map(str::to_string)
    }

    pub fn user_id(&self) -> Option<String> {
        self.core.snapshot().user_id().map(str::to_string)
    }
}

impl Drop for SessionAuthenticator {
    fn drop(&mut self) {
        self.initial.abort();
        if let Some(task) = &self.refresh {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_md5_hex() {
        assert_eq!(md5_hex(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5_hex(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_sha1_hex() {
        assert_eq!(sha1_hex(b"abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[rstest]
    #[case(json!(1), true)]
    #[case(json!(0), false)]
    #[case(json!("1"), true)]
    #[case(json!(""), false)]
    #[case(json!(null), false)]
    #[case(json!(true), true)]
    #[case(json!({"nested": 0}), true)]
    fn test_state_truthiness(#[case] state: Value, #[case] expected: bool) {
        assert_eq!(state_is_truthy(&state), expected);
    }

    #[rstest]
    #[case(json!({"code": "200"}), true)]
    #[case(json!({"code": 200}), true)]
    #[case(json!({"code": "404"}), false)]
    #[case(json!({"code": 500}), false)]
    #[case(json!({}), false)]
    fn test_slid_code_tolerance(#[case] body: Value, #[case] expected: bool) {
        assert_eq!(slid_code_ok(&body), expected);
    }

    #[test]
    fn test_session_cookie_truncation() {
        let mut headers = HeaderMap::new();
        headers.insert(SET_COOKIE, "SLNET=xyz; Path=/; HttpOnly".parse().unwrap());
        assert_eq!(session_cookie(&headers).as_deref(), Some("SLNET=xyz"));
    }

    #[test]
    fn test_session_cookie_without_attributes() {
        let mut headers = HeaderMap::new();
        headers.insert(SET_COOKIE, "SLNET=xyz".parse().unwrap());
        assert_eq!(session_cookie(&headers).as_deref(), Some("SLNET=xyz"));
    }

    #[test]
    fn test_session_cookie_missing() {
        assert_eq!(session_cookie(&HeaderMap::new()), None);
    }

    #[test]
    fn test_desc_field_prefers_scalars() {
        let body = json!({"state": 1, "desc": {"code": 7}});
        assert_eq!(desc_field(&body, "code").unwrap(), "7");

        let missing = json!({"state": 1, "desc": {}});
        assert_eq!(
            desc_field(&missing, "code").unwrap_err(),
            AuthFailure::Rejected(missing.clone())
        );
    }

    #[test]
    fn test_session_never_ready_and_failed() {
        let mut session = Session::default();
        session.complete("SLNET=a".into(), "U1".into());
        assert!(session.is_ready() && !session.is_failed());

        session.fail(AuthFailure::Transport("boom".into()));
        assert!(!session.is_ready() && session.is_failed());

        session.complete("SLNET=b".into(), "U1".into());
        assert!(session.is_ready() && !session.is_failed());
        assert_eq!(session.cookie(), Some("SLNET=b"));
    }

    #[test]
    fn test_credentials_debug_redacts_secrets() {
        let credentials = Credentials {
            app_id: "1".into(),
            app_secret: "s3cret".into(),
            login: "user".into(),
            password: "hunter2".into(),
        };
        let rendered = format!("{credentials:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(!rendered.contains("hunter2"));
    }
}
