// src/web.rs
use crate::artifact::ArtifactStore;
use crate::error::Result;
use crate::fanout::{UpdateFanout, UpdateSubscription};
use crate::lifecycle::{self, Lifecycle, SessionGuard, ShutdownSignal};
use crate::page::LIVE_RELOAD_SCRIPT;
use axum::{
    body::{Body, Bytes},
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures_util::stream::{self, Stream};
use serde::Deserialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, error, info};

/// Frame pushed to every viewer when the artifact changes.
pub const UPDATE_FRAME: &[u8] = b"data:update\n\n";

/// SSE comment line sent while no update is pending. Browsers ignore it;
/// it keeps idle proxies from timing the stream out.
pub const KEEP_ALIVE_FRAME: &[u8] = b":keep-alive\n\n";

pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Shared state for the request handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: ArtifactStore,
    pub fanout: UpdateFanout,
    pub lifecycle: Lifecycle,
    pub keep_alive: Duration,
}

impl AppState {
    pub fn new(store: ArtifactStore, fanout: UpdateFanout, lifecycle: Lifecycle) -> Self {
        Self {
            store,
            fanout,
            lifecycle,
            keep_alive: DEFAULT_KEEP_ALIVE,
        }
    }

    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }
}

#[derive(Debug, Default, Deserialize)]
struct SnapshotParams {
    nojs: Option<String>,
}

/// Serves the current artifact, prefixed with the live-reload script unless
/// the request carries `nojs=true`.
async fn serve_snapshot(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SnapshotParams>,
) -> Response {
    let artifact = state.store.read().await;
    let body = if params.nojs.as_deref() == Some("true") {
        artifact
    } else {
        let mut page = Vec::with_capacity(LIVE_RELOAD_SCRIPT.len() + artifact.len());
        page.extend_from_slice(LIVE_RELOAD_SCRIPT.as_bytes());
        page.extend_from_slice(&artifact);
        Bytes::from(page)
    };
    ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], body).into_response()
}

/// Opens an event stream for one viewer.
async fn serve_updates(State(state): State<Arc<AppState>>) -> Response {
    let viewer = ViewerConnection::open(&state);
    info!(
        "Viewer connected to update stream ({} subscribed).",
        state.fanout.subscriber_count()
    );
    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Body::from_stream(viewer.into_frames()),
    )
        .into_response()
}

/// One streaming client. Lives exactly as long as the response body: hyper
/// drops the body when the client goes away or a write fails, and the
/// session guard then ends the session.
struct ViewerConnection {
    subscription: UpdateSubscription,
    keep_alive: Interval,
    shutdown: ShutdownSignal,
    _guard: SessionGuard,
}

impl ViewerConnection {
    fn open(state: &AppState) -> Self {
        let mut keep_alive = interval(state.keep_alive);
        keep_alive.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            subscription: state.fanout.subscribe(),
            keep_alive,
            shutdown: state.lifecycle.signal(),
            _guard: state.lifecycle.guard(),
        }
    }

    /// Next frame to write, or `None` when the stream should end.
    async fn next_frame(&mut self) -> Option<Bytes> {
        tokio::select! {
            update = self.subscription.next() => {
                update.map(|_| {
                    debug!("Pushing update to viewer");
                    Bytes::from_static(UPDATE_FRAME)
                })
            }
            _ = self.keep_alive.tick() => Some(Bytes::from_static(KEEP_ALIVE_FRAME)),
            _ = self.shutdown.wait() => None,
        }
    }

    fn into_frames(self) -> impl Stream<Item = std::result::Result<Bytes, Infallible>> + Send {
        stream::unfold(self, |mut viewer| async move {
            let frame = viewer.next_frame().await?;
            Some((Ok(frame), viewer))
        })
    }
}

/// Builds the router: `/` for snapshots, `/updates` for the event stream.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_snapshot))
        .route("/updates", get(serve_updates))
        .with_state(Arc::new(state))
}

/// A running preview server.
pub struct PreviewServer {
    url: String,
    local_addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl PreviewServer {
    /// Base URL, e.g. `http://127.0.0.1:41234`.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Waits for the server task to finish after the session ended.
    pub async fn stopped(self) {
        if let Err(e) = self.handle.await {
            error!("Web server task failed: {}", e);
        }
    }
}

/// Binds a loopback listener and starts serving in a background task.
///
/// The server drains and stops once the session ends.
///
/// # Errors
/// Returns an error if no loopback address can be bound.
pub async fn start_server(state: AppState) -> Result<PreviewServer> {
    let listener = lifecycle::bind_loopback().await?;
    let local_addr = listener.local_addr()?;
    let url = format!("http://{}", local_addr);
    let mut shutdown = state.lifecycle.signal();
    let app = router(state);

    info!("Web server listening on {}", url);
    let handle = tokio::spawn(async move {
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.wait().await;
                info!("Web server shutting down gracefully.");
            })
            .await;
        if let Err(e) = served {
            error!("Web server exited with error: {}", e);
        }
        info!("Web server stopped.");
    });

    Ok(PreviewServer {
        url,
        local_addr,
        handle,
    })
}
