//! Throw-away HTTP listener that receives the OAuth redirect.
//!
//! The listener serves a single path and resolves once. It is a scoped
//! resource: `close()` stops it explicitly, and dropping it stops it on any
//! other exit path, so the port never stays bound after the flow ends.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::error::AuthError;

pub const CALLBACK_PATH: &str = "/callback";

/// How long `close()` waits for in-flight responses before aborting.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>tasklink - Authorized</title></head>
<body>
<h1>Authorization complete!</h1>
<p>You can close this window and return to the terminal.</p>
</body>
</html>"#;

const FAILURE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>tasklink - Authorization failed</title></head>
<body>
<h1>Authorization failed</h1>
<p>No authorization code was received. Return to the terminal and try again.</p>
</body>
</html>"#;

/// Query parameters of a successful redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: String,
    pub state: Option<String>,
}

type CallbackResult = Result<CallbackParams, AuthError>;

#[derive(Clone)]
struct CallbackState {
    result_tx: Arc<Mutex<Option<oneshot::Sender<CallbackResult>>>>,
    shutdown: Arc<Notify>,
}

/// A running callback listener bound to `127.0.0.1`.
pub struct CallbackListener {
    addr: SocketAddr,
    result_rx: Option<oneshot::Receiver<CallbackResult>>,
    shutdown: Arc<Notify>,
    server: Option<JoinHandle<()>>,
}

impl CallbackListener {
    /// Binds the listener; port 0 picks a free port.
    pub async fn bind(port: u16) -> Result<Self, AuthError> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .map_err(|e| AuthError::Listener(format!("cannot bind port {}: {}", port, e)))?;
        let addr = listener
            .local_addr()
            .map_err(|e| AuthError::Listener(e.to_string()))?;

        let (result_tx, result_rx) = oneshot::channel();
        let shutdown = Arc::new(Notify::new());
        let state = CallbackState {
            result_tx: Arc::new(Mutex::new(Some(result_tx))),
            shutdown: shutdown.clone(),
        };

        let app = Router::new()
            .route(CALLBACK_PATH, get(handle_callback))
            .with_state(state)
            .layer(TraceLayer::new_for_http());

        let signal = shutdown.clone();
        let server = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move { signal.notified().await })
                .await;
            if let Err(e) = served {
                tracing::warn!("Callback listener stopped with error: {}", e);
            }
        });

        tracing::debug!("Callback listener bound on {}", addr);
        Ok(Self {
            addr,
            result_rx: Some(result_rx),
            shutdown,
            server: Some(server),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Redirect URI to register with the authorization request.
    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}{}", self.addr.port(), CALLBACK_PATH)
    }

    /// Waits for the redirect, at most `timeout`.
    pub async fn wait_for_code(&mut self, timeout: Duration) -> Result<CallbackParams, AuthError> {
        let result_rx = self
            .result_rx
            .take()
            .ok_or_else(|| AuthError::Listener("callback already consumed".to_string()))?;

        match tokio::time::timeout(timeout, result_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(AuthError::Listener(
                "listener stopped before a redirect arrived".to_string(),
            )),
            Err(_) => Err(AuthError::Timeout),
        }
    }

    /// Stops the server and waits until the port is released.
    pub async fn close(mut self) {
        self.shutdown.notify_one();
        if let Some(mut server) = self.server.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut server)
                .await
                .is_err()
            {
                server.abort();
                let _ = server.await;
            }
        }
        tracing::debug!("Callback listener on {} closed", self.addr);
    }
}

impl Drop for CallbackListener {
    fn drop(&mut self) {
        if let Some(server) = self.server.take() {
            self.shutdown.notify_one();
            server.abort();
        }
    }
}

async fn handle_callback(
    State(state): State<CallbackState>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Html<&'static str>) {
    let result = match params.get("code").filter(|code| !code.is_empty()) {
        Some(code) => Ok(CallbackParams {
            code: code.clone(),
            state: params.get("state").cloned(),
        }),
        None => Err(AuthError::Denied(
            params
                .get("error")
                .cloned()
                .unwrap_or_else(|| "redirect carried no authorization code".to_string()),
        )),
    };
    let succeeded = result.is_ok();

    let pending = state.result_tx.lock().ok().and_then(|mut slot| slot.take());
    if let Some(result_tx) = pending {
        let _ = result_tx.send(result);
    }
    state.shutdown.notify_one();

    if succeeded {
        (StatusCode::OK, Html(SUCCESS_PAGE))
    } else {
        (StatusCode::BAD_REQUEST, Html(FAILURE_PAGE))
    }
}
