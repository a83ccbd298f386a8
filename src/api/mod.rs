//! HTTP surface: route table, shared layers and the server loop.

use crate::{
    api::handlers::{health, index, login, logout, register, reset},
    classify::Classifier,
    mail::OtpMailer,
    session::SessionStore,
    store::UserStore,
};
use anyhow::Result;
use axum::{
    Extension, Router,
    body::Body,
    extract::{DefaultBodyLimit, MatchedPath},
    http::{HeaderName, HeaderValue, Request},
    routing::get,
};
use std::sync::Arc;
use tokio::{net::TcpListener, signal::ctrl_c};
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;

pub(crate) mod handlers;
pub(crate) mod pages;

/// Uploads beyond this are cut off before they reach a handler.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Build the portal router with all routes and shared layers.
#[must_use]
pub fn router(
    store: Arc<dyn UserStore>,
    mailer: Arc<dyn OtpMailer>,
    classifier: Classifier,
    sessions: Arc<SessionStore>,
) -> Router {
    Router::new()
        .route("/", get(index::page).post(index::upload))
        .route("/login", get(login::page).post(login::submit))
        .route("/register", get(register::page).post(register::submit))
        .route("/forgot", get(reset::forgot_page).post(reset::forgot_submit))
        .route(
            "/verify_otp",
            get(reset::verify_otp_page).post(reset::verify_otp_submit),
        )
        .route(
            "/reset_password",
            get(reset::reset_password_page).post(reset::reset_password_submit),
        )
        .route("/logout", get(logout::logout))
        .route("/health", get(health::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(store))
                .layer(Extension(mailer))
                .layer(Extension(classifier))
                .layer(Extension(sessions)),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    store: Arc<dyn UserStore>,
    mailer: Arc<dyn OtpMailer>,
    classifier: Classifier,
    sessions: Arc<SessionStore>,
) -> Result<()> {
    let app = router(store, mailer, classifier, sessions);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
