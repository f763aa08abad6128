//! Onboard-diagnostics snapshot fetch

use serde_json::Value;
use tracing::instrument;

use crate::error::Result;
use crate::request::RequestSpec;
use crate::session::SessionHandle;

/// OBD parameter snapshot for one device
pub struct ObdSnapshot {
    session: SessionHandle,
    device_id: String,
}

impl ObdSnapshot {
    pub fn new(session: SessionHandle, device_id: impl Into<String>) -> Self {
        Self {
            session,
            device_id: device_id.into(),
        }
    }

    /// Fetch the current diagnostics snapshot, as opaque JSON
    #[instrument(skip(self), fields(device_id = %self.device_id))]
    pub async fn fetch(&self) -> Result<Value> {
        let cookie = self.session.require_cookie()?;
        let url = self.session.routes().obd_params(&self.device_id)?;
        let spec = RequestSpec::post(url).header("Cookie", cookie);
        Ok(self.session.executor().execute(spec).await?.body)
    }
}
