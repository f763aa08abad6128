//! Device list fetch and the optional auto-update task

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::from_value;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::error::{Result, StarlineError};
use crate::request::RequestSpec;
use crate::session::SessionHandle;
use crate::types::{Device, UserInfo};

/// Cadence of the background refresh when auto-update is enabled
pub const AUTO_UPDATE_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// The account's device list, cached across refreshes.
///
/// `refresh()` replaces the cached list wholesale; with auto-update the
/// component owns a background task repeating the fetch every
/// [`AUTO_UPDATE_INTERVAL`]. The task waits for the session to become
/// ready once, then reschedules itself only after each successful fetch;
/// the first failure stops it. Dropping the inventory aborts the task.
pub struct DeviceInventory {
    session: SessionHandle,
    devices: Arc<RwLock<Vec<Device>>>,
    updater: Option<JoinHandle<()>>,
}

impl DeviceInventory {
    /// Inventory without background updates
    pub fn new(session: SessionHandle) -> Self {
        Self {
            session,
            devices: Arc::new(RwLock::new(Vec::new())),
            updater: None,
        }
    }

    /// Inventory that refreshes itself every [`AUTO_UPDATE_INTERVAL`]
    pub fn with_auto_update(session: SessionHandle) -> Self {
        Self::with_auto_update_every(session, AUTO_UPDATE_INTERVAL)
    }

    /// Auto-updating inventory with a custom cadence
    pub fn with_auto_update_every(session: SessionHandle, period: Duration) -> Self {
        let devices = Arc::new(RwLock::new(Vec::new()));
        let updater = tokio::spawn({
            let session = session.clone();
            let devices = Arc::clone(&devices);
            async move {
                if let Err(err) = session.wait_until_ready().await {
                    warn!(%err, "device auto-update never started");
                    return;
                }
                loop {
                    match Self::fetch(&session).await {
                        Ok(list) => {
                            debug!(count = list.len(), "device list updated");
                            *devices.write() = list;
                        }
                        Err(err) => {
                            warn!(%err, "device auto-update stopped");
                            break;
                        }
                    }
                    tokio::time::sleep(period).await;
                }
            }
        });

        Self {
            session,
            devices,
            updater: Some(updater),
        }
    }

    /// The most recently fetched device list; empty before the first
    /// successful refresh
    pub fn devices(&self) -> Vec<Device> {
        self.devices.read().clone()
    }

    /// Fetch the device list and replace the cache
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Vec<Device>> {
        let list = Self::fetch(&self.session).await?;
        *self.devices.write() = list.clone();
        Ok(list)
    }

    async fn fetch(session: &SessionHandle) -> Result<Vec<Device>> {
        let (cookie, user_id) = session.authorized()?;
        let url = session.routes().user_info(&user_id)?;
        let spec = RequestSpec::post(url).header("Cookie", cookie);
        let body = session.executor().execute(spec).await?.body;
        let info: UserInfo = from_value(body).map_err(|e| StarlineError::Parse(e.to_string()))?;
        Ok(info.devices)
    }
}

impl Drop for DeviceInventory {
    fn drop(&mut self) {
        if let Some(task) = &self.updater {
            task.abort();
        }
    }
}
