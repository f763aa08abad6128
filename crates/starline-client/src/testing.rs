//! Test utilities for starline-client
//!
//! Provides an in-process HTTP server for integration tests: hand it an
//! axum router that plays the vendor's identity and data services, then
//! point [`AuthConfig`] at [`TestServer::base_url`].
//!
//! [`AuthConfig`]: crate::AuthConfig

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::error::Result;

/// A mock vendor server that shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Bind an ephemeral port and serve the router
    ///
    /// # Example
    ///
    /// ```ignore
    /// let server = TestServer::start(vendor_router(state)).await?;
    /// let config = AuthConfig::new("id", "secret", "login", "pass")
    ///     .identity_base(format!("{}/apiV3/", server.base_url()))
    ///     .data_base(format!("{}/json/", server.base_url()));
    /// ```
    pub async fn start(router: axum::Router) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Base URL of the server, without a trailing slash
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Shutdown the server gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
