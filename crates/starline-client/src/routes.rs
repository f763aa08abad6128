//! Vendor endpoint URLs
//!
//! StarLine splits its API across two hosts: the identity service handles
//! the credential handshake, the data service everything after it.

use url::Url;

use crate::error::Result;

/// Identity service base (handshake steps 1-3)
pub const IDENTITY_BASE: &str = "https://id.starline.ru/apiV3/";
/// Data service base (session exchange and device endpoints)
pub const DATA_BASE: &str = "https://developer.starline.ru/json/";

/// URL builder for both vendor services.
///
/// Bases are overridable so tests can point the client at an in-process
/// mock server.
#[derive(Debug, Clone)]
pub struct VendorRoutes {
    identity: Url,
    data: Url,
}

/// Parse a base URL, forcing the trailing slash `Url::join` needs to
/// treat the last path segment as a directory.
fn parse_base(base: &str) -> Result<Url> {
    if base.ends_with('/') {
        Ok(Url::parse(base)?)
    } else {
        Ok(Url::parse(&format!("{base}/"))?)
    }
}

impl VendorRoutes {
    /// Build routes against the production vendor hosts
    pub fn vendor() -> Result<Self> {
        Self::new(IDENTITY_BASE, DATA_BASE)
    }

    /// Build routes against custom bases
    pub fn new(identity_base: &str, data_base: &str) -> Result<Self> {
        Ok(Self {
            identity: parse_base(identity_base)?,
            data: parse_base(data_base)?,
        })
    }

    /// `GET application/getCode` — handshake step 1
    pub fn get_code(&self) -> Result<Url> {
        Ok(self.identity.join("application/getCode")?)
    }

    /// `GET application/getToken` — handshake step 2
    pub fn get_token(&self) -> Result<Url> {
        Ok(self.identity.join("application/getToken")?)
    }

    /// `POST user/login` — handshake step 3
    pub fn login(&self) -> Result<Url> {
        Ok(self.identity.join("user/login")?)
    }

    /// `POST v2/auth.slid` — handshake step 4, against the data service
    pub fn auth_slid(&self) -> Result<Url> {
        Ok(self.data.join("v2/auth.slid")?)
    }

    /// `POST v2/user/{user_id}/user_info` — device list
    pub fn user_info(&self, user_id: &str) -> Result<Url> {
        Ok(self.data.join(&format!("v2/user/{user_id}/user_info"))?)
    }

    /// `POST v2/device/{device_id}/async` — command dispatch
    pub fn command_dispatch(&self, device_id: &str) -> Result<Url> {
        Ok(self.data.join(&format!("v2/device/{device_id}/async"))?)
    }

    /// `GET v2/device/{device_id}/async/{cmd_id}` — command status poll
    pub fn command_status(&self, device_id: &str, cmd_id: &str) -> Result<Url> {
        Ok(self
            .data
            .join(&format!("v2/device/{device_id}/async/{cmd_id}"))?)
    }

    /// `POST v1/device/{device_id}/ways` — track fetch
    pub fn track_ways(&self, device_id: &str) -> Result<Url> {
        Ok(self.data.join(&format!("v1/device/{device_id}/ways"))?)
    }

    /// `POST v1/device/{device_id}/obd_params` — diagnostics snapshot
    pub fn obd_params(&self, device_id: &str) -> Result<Url> {
        Ok(self.data.join(&format!("v1/device/{device_id}/obd_params"))?)
    }
}
