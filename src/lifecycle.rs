// src/lifecycle.rs

//! Session lifetime: the loopback listener and the shutdown signal.
//!
//! The tool assumes a single person looking at a single tab. When that tab's
//! update stream goes away the session is over, and `main` is told so through
//! a [`ShutdownSignal`] instead of the process being killed from inside a
//! request handler.

use crate::error::{PreviewError, Result};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

/// Owner of the shutdown signal. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Lifecycle {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Ends the session. Idempotent.
    pub fn end_session(&self) {
        if !self.tx.send_replace(true) {
            info!("Viewer session ended, shutting down.");
        }
    }

    pub fn is_ended(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Guard that ends the session when dropped.
    pub fn guard(&self) -> SessionGuard {
        SessionGuard {
            lifecycle: self.clone(),
        }
    }
}

/// Completes once the session has ended.
#[derive(Clone, Debug)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub async fn wait(&mut self) {
        // Err only if every Lifecycle handle is gone, which also means nobody
        // can end the session any more.
        let _ = self.rx.wait_for(|ended| *ended).await;
    }
}

/// Held by each update stream. Dropping it (the client hung up, or the stream
/// was torn down) ends the session.
#[derive(Debug)]
pub struct SessionGuard {
    lifecycle: Lifecycle,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.lifecycle.end_session();
    }
}

/// Binds an ephemeral port on loopback, IPv4 first, then IPv6.
///
/// # Errors
///
/// Returns [`PreviewError::Bind`] with the IPv6 error if both attempts fail.
pub async fn bind_loopback() -> Result<TcpListener> {
    match TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await {
        Ok(listener) => Ok(listener),
        Err(e) => {
            warn!("Could not bind 127.0.0.1 ({}), trying [::1]", e);
            TcpListener::bind((Ipv6Addr::LOCALHOST, 0))
                .await
                .map_err(PreviewError::Bind)
        }
    }
}
