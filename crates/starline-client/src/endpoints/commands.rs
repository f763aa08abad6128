//! Asynchronous command dispatch and status polling

use serde_json::Value;
use tracing::instrument;

use crate::error::{Result, StarlineError};
use crate::request::RequestSpec;
use crate::session::SessionHandle;
use crate::types::{value_to_string, CommandRequest};

/// Command interface for one device.
///
/// Dispatch is asynchronous on the vendor side: the response carries only a
/// `cmd_id`, and completion is observed by polling [`status`](Self::status).
pub struct DeviceCommands {
    session: SessionHandle,
    device_id: String,
}

impl DeviceCommands {
    pub fn new(session: SessionHandle, device_id: impl Into<String>) -> Self {
        Self {
            session,
            device_id: device_id.into(),
        }
    }

    /// Dispatch a command; returns the vendor's `cmd_id` for polling
    #[instrument(skip(self, command), fields(device_id = %self.device_id))]
    pub async fn dispatch(&self, command: &CommandRequest) -> Result<String> {
        let cookie = self.session.require_cookie()?;
        let url = self.session.routes().command_dispatch(&self.device_id)?;
        let payload =
            serde_json::to_value(command).map_err(|e| StarlineError::Parse(e.to_string()))?;
        let spec = RequestSpec::post(url).header("Cookie", cookie).json(payload);
        let body = self.session.executor().execute(spec).await?.body;

        body.get("cmd_id")
            .and_then(value_to_string)
            .ok_or(StarlineError::Rejected(body))
    }

    /// Poll a previously dispatched command
    #[instrument(skip(self), fields(device_id = %self.device_id))]
    pub async fn status(&self, cmd_id: &str) -> Result<Value> {
        let cookie = self.session.require_cookie()?;
        let url = self
            .session
            .routes()
            .command_status(&self.device_id, cmd_id)?;
        let spec = RequestSpec::get(url).header("Cookie", cookie);
        Ok(self.session.executor().execute(spec).await?.body)
    }
}
