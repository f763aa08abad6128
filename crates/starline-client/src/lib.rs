//! StarLine Client Library
//!
//! Typed client for the StarLine alarm/telemetry REST API: the four-step
//! session handshake against the vendor identity service, session lifetime
//! management with optional background refresh, and the authenticated
//! device endpoints (listing, asynchronous commands, GPS tracks, OBD
//! snapshots).
//!
//! # Example
//!
//! ```rust,no_run
//! use starline_client::{AuthConfig, CommandRequest, DeviceCommands, SessionAuthenticator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let auth = SessionAuthenticator::spawn(
//!         AuthConfig::new("1234", "app-secret", "driver@example.com", "password")
//!             .auto_refresh(true),
//!     )?;
//!
//!     let session = auth.handle();
//!     session.wait_until_ready().await?;
//!
//!     let commands = DeviceCommands::new(session.clone(), "123456789");
//!     let cmd_id = commands.dispatch(&CommandRequest::new("poke", 1)).await?;
//!     let status = commands.status(&cmd_id).await?;
//!     println!("{status}");
//!
//!     Ok(())
//! }
//! ```
//!
//! # Session lifecycle
//!
//! [`SessionAuthenticator::spawn`] starts the handshake immediately in the
//! background; nothing blocks. Dependent components take a cheap
//! [`SessionHandle`] clone and either await [`SessionHandle::wait_until_ready`]
//! or poll [`SessionHandle::is_ready`]. Endpoint operations invoked before
//! readiness fail fast with [`StarlineError::NotReady`] and never touch the
//! network. The vendor caps session lifetime at four hours; with
//! `auto_refresh` the authenticator re-runs the handshake every three, and
//! the session is briefly not-ready while each refresh is in flight.
//!
//! # Testing
//!
//! The [`testing`] module runs an in-process mock vendor:
//!
//! ```rust,ignore
//! use starline_client::testing::TestServer;
//!
//! let server = TestServer::start(mock_vendor_router()).await?;
//! let config = AuthConfig::new("1234", "secret", "login", "pass")
//!     .identity_base(format!("{}/apiV3/", server.base_url()))
//!     .data_base(format!("{}/json/", server.base_url()));
//! ```

mod auth;
mod endpoints;
mod error;
mod request;
mod routes;
mod session;
pub mod testing;
mod types;

pub use auth::{
    AuthConfig, Credentials, Session, SessionAuthenticator, SessionPhase,
    DEFAULT_REFRESH_INTERVAL,
};
pub use endpoints::{
    DeviceCommands, DeviceInventory, ObdSnapshot, TrackHistory, AUTO_UPDATE_INTERVAL,
};
pub use error::{AuthFailure, Result, StarlineError};
pub use request::{
    merge_json, Body, RequestExecutor, RequestSpec, VendorResponse, DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_TIMEOUT,
};
pub use routes::{VendorRoutes, DATA_BASE, IDENTITY_BASE};
pub use session::SessionHandle;
pub use types::{CommandRequest, Device, TrackQuery, UserInfo};
