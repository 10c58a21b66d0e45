//! One-shot local listener that receives the OAuth redirect.

use crate::domain::error::DomainError;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{info, warn};

const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, serde::Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

type CodeSender = Arc<Mutex<Option<oneshot::Sender<Result<String, String>>>>>;

#[derive(Clone)]
struct CallbackState {
    expected_state: Arc<str>,
    sender: CodeSender,
}

async fn handle_callback(
    State(state): State<CallbackState>,
    Query(params): Query<CallbackParams>,
) -> (StatusCode, Html<String>) {
    let outcome = match (params.code, params.state, params.error) {
        (_, _, Some(error)) => Err(error),
        (Some(code), Some(s), None) if *s == *state.expected_state => Ok(code),
        (Some(_), _, None) => Err("state mismatch".to_string()),
        (None, _, None) => Err("no authorization code in callback".to_string()),
    };

    let response = match &outcome {
        Ok(_) => (
            StatusCode::OK,
            Html("<h1>Authorization successful</h1><p>You can close this window.</p>".into()),
        ),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Html(format!("<h1>Authorization failed</h1><p>{e}</p>")),
        ),
    };

    if let Ok(mut guard) = state.sender.lock() {
        if let Some(tx) = guard.take() {
            let _ = tx.send(outcome);
        }
    }

    response
}

/// Bound callback listener. Serves until the first callback arrives or the
/// wait times out, then shuts down.
pub struct CallbackListener {
    listener: TcpListener,
    path: String,
}

impl CallbackListener {
    /// Bind to the port and path of `redirect_uri`. Loopback hosts bind to
    /// 127.0.0.1, anything else to all interfaces.
    pub async fn bind(redirect_uri: &str) -> Result<Self, DomainError> {
        let url = reqwest::Url::parse(redirect_uri).map_err(|e| {
            DomainError::Configuration(format!("invalid redirect URI {redirect_uri}: {e}"))
        })?;
        let port = url.port_or_known_default().unwrap_or(DEFAULT_PORT);
        let ip = match url.host_str() {
            Some("localhost") | Some("127.0.0.1") => [127, 0, 0, 1],
            _ => [0, 0, 0, 0],
        };
        let path = match url.path() {
            "" => "/".to_string(),
            p => p.to_string(),
        };

        let listener = TcpListener::bind(SocketAddr::from((ip, port)))
            .await
            .map_err(|e| {
                DomainError::Authentication(format!("cannot listen for callback on port {port}: {e}"))
            })?;

        Ok(Self { listener, path })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, DomainError> {
        self.listener
            .local_addr()
            .map_err(|e| DomainError::Authentication(e.to_string()))
    }

    /// Wait for the redirect and return the authorization code.
    pub async fn wait_for_code(
        self,
        expected_state: &str,
        timeout: Duration,
    ) -> Result<String, DomainError> {
        let (code_tx, code_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let app = Router::new()
            .route(&self.path, get(handle_callback))
            .with_state(CallbackState {
                expected_state: Arc::from(expected_state),
                sender: Arc::new(Mutex::new(Some(code_tx))),
            });

        if let Ok(addr) = self.listener.local_addr() {
            info!("Waiting for callback on http://{addr}{}", self.path);
        }

        let listener = self.listener;
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        let received = tokio::time::timeout(timeout, code_rx).await;

        let _ = shutdown_tx.send(());
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("callback listener stopped with error: {e}"),
            Err(e) => warn!("callback listener task failed: {e}"),
        }

        match received {
            Ok(Ok(Ok(code))) => {
                info!("Authorization code received");
                Ok(code)
            }
            Ok(Ok(Err(reason))) => Err(DomainError::Authentication(format!(
                "authorization failed: {reason}"
            ))),
            Ok(Err(_)) => Err(DomainError::Authentication(
                "callback listener closed without a code".into(),
            )),
            Err(_) => Err(DomainError::Authentication(format!(
                "no authorization callback within {}s",
                timeout.as_secs()
            ))),
        }
    }
}
