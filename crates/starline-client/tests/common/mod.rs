//! Shared mock vendor service for integration tests
//!
//! One axum router plays both vendor hosts: identity routes under
//! `/apiV3/`, data routes under `/json/`. Handlers record what they saw
//! into [`VendorState`] so tests assert after the fact instead of
//! panicking inside the server task.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use md5::{Digest, Md5};
use parking_lot::Mutex;
use serde_json::{json, Value};
use sha1::Sha1;
use starline_client::testing::TestServer;
use starline_client::AuthConfig;

pub const APP_ID: &str = "4321";
pub const APP_SECRET: &str = "app-secret";
pub const LOGIN: &str = "driver@example.com";
pub const PASSWORD: &str = "hunter2";

pub fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}

pub fn sha1_hex(input: &str) -> String {
    hex::encode(Sha1::digest(input.as_bytes()))
}

#[derive(Default)]
pub struct VendorState {
    seen: Mutex<HashMap<String, String>>,
    /// Hits on the device endpoints (auth.slid excluded)
    pub data_hits: AtomicUsize,
    /// Completed auth.slid exchanges
    pub slid_logins: AtomicUsize,
    /// Answer `{state: 0}` on getCode
    pub reject_get_code: AtomicBool,
    /// Answer `{state: 0}` on getToken
    pub reject_get_token: AtomicBool,
    /// Answer HTTP 500 on getCode
    pub error_get_code: AtomicBool,
    /// Answer HTTP 500 on user_info
    pub fail_user_info: AtomicBool,
}

impl VendorState {
    pub fn record(&self, key: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.seen.lock().insert(key.to_string(), value.to_string());
        }
    }

    pub fn seen(&self, key: &str) -> Option<String> {
        self.seen.lock().get(key).cloned()
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

async fn get_code(
    State(state): State<Arc<VendorState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.record("getCode.appId", query.get("appId").map(String::as_str));
    state.record("getCode.secret", query.get("secret").map(String::as_str));
    if state.error_get_code.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "maintenance"})),
        )
            .into_response();
    }
    if state.reject_get_code.load(Ordering::SeqCst) {
        return Json(json!({"state": 0})).into_response();
    }
    Json(json!({"state": 1, "desc": {"code": "A"}})).into_response()
}

async fn get_token(
    State(state): State<Arc<VendorState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    state.record("getToken.appId", query.get("appId").map(String::as_str));
    state.record("getToken.secret", query.get("secret").map(String::as_str));
    if state.reject_get_token.load(Ordering::SeqCst) {
        return Json(json!({"state": 0}));
    }
    Json(json!({"state": 1, "desc": {"token": "B"}}))
}

async fn login(
    State(state): State<Arc<VendorState>>,
    headers: HeaderMap,
    mut form: Multipart,
) -> Json<Value> {
    state.record("login.token", header_str(&headers, "token"));
    while let Ok(Some(field)) = form.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        if let Ok(value) = field.text().await {
            state.record(&format!("login.{name}"), Some(&value));
        }
    }
    Json(json!({"state": 1, "desc": {"user_token": "C"}}))
}

async fn auth_slid(
    State(state): State<Arc<VendorState>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    state.record("slid.slid_token", body.get("slid_token").and_then(Value::as_str));
    let attempt = state.slid_logins.fetch_add(1, Ordering::SeqCst) + 1;
    let cookie = if attempt == 1 {
        "SLNET=xyz; Path=/".to_string()
    } else {
        format!("SLNET=renewed{attempt}; Path=/")
    };
    (
        [(header::SET_COOKIE, cookie)],
        Json(json!({"code": "200", "user_id": "U1"})),
    )
}

async fn user_info(
    State(state): State<Arc<VendorState>>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.data_hits.fetch_add(1, Ordering::SeqCst);
    state.record("user_info.user_id", Some(&user_id));
    state.record("user_info.cookie", header_str(&headers, "cookie"));
    if state.fail_user_info.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "boom"})),
        )
            .into_response();
    }
    Json(json!({
        "code": "200",
        "devices": [
            {"device_id": 123456789, "alias": "Car"},
            {"device_id": "987", "alias": "Bike"}
        ]
    }))
    .into_response()
}

async fn command_dispatch(
    State(state): State<Arc<VendorState>>,
    Path(device_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.data_hits.fetch_add(1, Ordering::SeqCst);
    state.record("command.device_id", Some(&device_id));
    state.record("command.cookie", header_str(&headers, "cookie"));
    state.record("command.body", Some(&body.to_string()));
    Json(json!({"cmd_id": "77"}))
}

async fn command_status(
    State(state): State<Arc<VendorState>>,
    Path((device_id, cmd_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Json<Value> {
    state.data_hits.fetch_add(1, Ordering::SeqCst);
    state.record("status.device_id", Some(&device_id));
    state.record("status.cmd_id", Some(&cmd_id));
    state.record("status.cookie", header_str(&headers, "cookie"));
    Json(json!({"state": 2}))
}

async fn track_ways(
    State(state): State<Arc<VendorState>>,
    Path(device_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.data_hits.fetch_add(1, Ordering::SeqCst);
    state.record("ways.device_id", Some(&device_id));
    state.record("ways.cookie", header_str(&headers, "cookie"));
    state.record("ways.body", Some(&body.to_string()));
    Json(json!({"state": 1, "way": [{"lat": 55.75, "lng": 37.61}]}))
}

async fn obd_params(
    State(state): State<Arc<VendorState>>,
    Path(device_id): Path<String>,
    headers: HeaderMap,
) -> Json<Value> {
    state.data_hits.fetch_add(1, Ordering::SeqCst);
    state.record("obd.device_id", Some(&device_id));
    state.record("obd.cookie", header_str(&headers, "cookie"));
    Json(json!({"obd": {"fuel_litres": 40, "mileage": 100500}}))
}

pub fn vendor_router(state: Arc<VendorState>) -> Router {
    Router::new()
        .route("/apiV3/application/getCode", get(get_code))
        .route("/apiV3/application/getToken", get(get_token))
        .route("/apiV3/user/login", post(login))
        .route("/json/v2/auth.slid", post(auth_slid))
        .route("/json/v2/user/{user_id}/user_info", post(user_info))
        .route("/json/v2/device/{device_id}/async", post(command_dispatch))
        .route(
            "/json/v2/device/{device_id}/async/{cmd_id}",
            get(command_status),
        )
        .route("/json/v1/device/{device_id}/ways", post(track_ways))
        .route("/json/v1/device/{device_id}/obd_params", post(obd_params))
        .with_state(state)
}

/// Client configuration aimed at the mock vendor
pub fn auth_config(server: &TestServer) -> AuthConfig {
    AuthConfig::new(APP_ID, APP_SECRET, LOGIN, PASSWORD)
        .identity_base(format!("{}/apiV3/", server.base_url()))
        .data_base(format!("{}/json/", server.base_url()))
}
