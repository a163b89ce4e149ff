use axum::{
    extract::{FromRef, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tower_http::timeout::TimeoutLayer;

use crate::auth::JwtAuthenticator;
use crate::config::AppConfig;
use crate::database::{self, PreferenceStore, StoreError};
use crate::handlers;
use crate::middleware::{jwt_auth_middleware, recover_panics, request_logger, SharedAuthenticator};
use crate::services::PreferenceService;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to open store: {0}")]
    Store(#[from] StoreError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),

    #[error("server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Shared, immutable state behind every route.
#[derive(Clone)]
pub struct AppState {
    pub service: PreferenceService,
    pub authenticator: SharedAuthenticator,
}

impl AppState {
    pub fn new(store: Arc<dyn PreferenceStore>, authenticator: SharedAuthenticator) -> Self {
        Self {
            service: PreferenceService::new(store),
            authenticator,
        }
    }
}

impl FromRef<AppState> for PreferenceService {
    fn from_ref(state: &AppState) -> Self {
        state.service.clone()
    }
}

/// Build the router. `/query` runs the whole pipeline, `/health` skips
/// authentication.
pub fn app(state: AppState, request_timeout: Duration) -> Router {
    let protected = Router::new()
        .route("/query", post(handlers::query))
        .route_layer(middleware::from_fn_with_state(
            state.authenticator.clone(),
            jwt_auth_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(protected)
        // Last layer added runs first.
        .layer(middleware::from_fn(recover_panics))
        .layer(middleware::from_fn(request_logger))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

/// Open the store, serve until SIGINT/SIGTERM, then close the store.
pub async fn run(config: &AppConfig) -> Result<(), ServerError> {
    let store = database::connect(&config.database).await?;
    let authenticator: SharedAuthenticator = Arc::new(JwtAuthenticator::new(&config.auth.sign_key));
    if config.auth.sign_key.is_empty() {
        tracing::warn!("AUTH_SIGN_KEY is empty, every authenticated request will fail");
    }

    let state = AppState::new(store.clone(), authenticator);
    let router = app(state, Duration::from_secs(config.http.request_timeout_secs));

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;
    tracing::info!("Listening on http://{}", addr);

    let result = serve(
        listener,
        router,
        shutdown_signal(),
        Duration::from_secs(config.http.shutdown_timeout_secs),
    )
    .await;

    // serve returns only after every request has finished or been cancelled
    store.close().await;
    tracing::info!("Store closed");
    result
}

/// Requests currently being handled, and the switch that cancels them.
#[derive(Clone, Default)]
struct InFlight {
    tracker: TaskTracker,
    cancel: CancellationToken,
}

/// Outermost layer: every request is tracked, and dropped with a 503 once
/// the shutdown grace period has run out.
async fn track_in_flight(State(in_flight): State<InFlight>, request: Request, next: Next) -> Response {
    let cancel = in_flight.cancel.clone();
    in_flight
        .tracker
        .track_future(async move {
            tokio::select! {
                response = next.run(request) => response,
                _ = cancel.cancelled() => StatusCode::SERVICE_UNAVAILABLE.into_response(),
            }
        })
        .await
}

/// Serve `router` until `shutdown` resolves. In-flight requests then get
/// `grace` to finish; whatever is still running after that is cancelled.
/// Returns only once no request is being handled any more.
pub async fn serve<F>(
    listener: TcpListener,
    router: Router,
    shutdown: F,
    grace: Duration,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let in_flight = InFlight::default();
    let router = router.layer(middleware::from_fn_with_state(in_flight.clone(), track_in_flight));
    let (signalled_tx, signalled_rx) = tokio::sync::oneshot::channel::<()>();

    let mut server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                let _ = signalled_tx.send(());
            })
            .await
    });

    let result = tokio::select! {
        joined = &mut server => joined,
        _ = signalled_rx => {
            tracing::info!("Shutting down, waiting up to {:?} for in-flight requests", grace);
            match tokio::time::timeout(grace, &mut server).await {
                Ok(joined) => joined,
                Err(_) => {
                    tracing::warn!(
                        "Shutdown grace period elapsed, cancelling {} in-flight requests",
                        in_flight.tracker.len()
                    );
                    in_flight.cancel.cancel();
                    server.abort();
                    Ok(Ok(()))
                }
            }
        }
    };

    in_flight.tracker.close();
    in_flight.tracker.wait().await;

    Ok(result??)
}

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for SIGINT: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
