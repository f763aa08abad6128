//! GPS track fetch

use serde_json::Value;
use tracing::instrument;

use crate::error::{Result, StarlineError};
use crate::request::RequestSpec;
use crate::session::SessionHandle;
use crate::types::TrackQuery;

/// Track history for one device
pub struct TrackHistory {
    session: SessionHandle,
    device_id: String,
}

impl TrackHistory {
    pub fn new(session: SessionHandle, device_id: impl Into<String>) -> Self {
        Self {
            session,
            device_id: device_id.into(),
        }
    }

    /// Fetch the track for `[begin, end]` (unix timestamps, seconds).
    ///
    /// The payload shape varies by firmware; it is returned as opaque JSON.
    #[instrument(skip(self), fields(device_id = %self.device_id))]
    pub async fn fetch(&self, begin: i64, end: i64) -> Result<Value> {
        let cookie = self.session.require_cookie()?;
        let url = self.session.routes().track_ways(&self.device_id)?;
        let payload = serde_json::to_value(TrackQuery::new(begin, end))
            .map_err(|e| StarlineError::Parse(e.to_string()))?;
        let spec = RequestSpec::post(url).header("Cookie", cookie).json(payload);
        Ok(self.session.executor().execute(spec).await?.body)
    }
}
