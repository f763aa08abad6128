//! Vendor endpoint components
//!
//! Each component composes a [`SessionHandle`] with the shared request
//! executor; there is no inheritance between them. Operations fail fast
//! with [`NotReady`] until the handshake has completed — they never await
//! readiness themselves.
//!
//! [`SessionHandle`]: crate::SessionHandle
//! [`NotReady`]: crate::StarlineError::NotReady

mod commands;
mod devices;
mod obd;
mod tracks;

pub use commands::DeviceCommands;
pub use devices::{DeviceInventory, AUTO_UPDATE_INTERVAL};
pub use obd::ObdSnapshot;
pub use tracks::TrackHistory;
