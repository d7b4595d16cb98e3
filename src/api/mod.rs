use crate::cli::globals::GlobalArgs;
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::{get, post},
    Extension, Router,
};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa_swagger_ui::SwaggerUi;

pub(crate) mod frontend;
pub(crate) mod gate;
pub mod handlers;
mod openapi;
pub(crate) mod session;

pub use openapi::openapi;

/// Assemble the gated router: API routes, docs, the SPA fallback and the
/// shared layers. Every route, docs and fallback included, sits behind the
/// reputation gate.
#[must_use]
pub fn app(pool: SqlitePool, globals: Arc<GlobalArgs>) -> Router {
    let swagger = SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::openapi());

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/v1/account/create/totp",
            get(handlers::account::totp).post(handlers::account::totp),
        )
        .route(
            "/api/v1/account/create/salt",
            get(handlers::account::salt).post(handlers::account::salt),
        )
        .route("/api/v1/account/create", post(handlers::account::create))
        .route("/api/v1/account/login", post(handlers::account::login))
        .merge(swagger)
        .fallback(frontend::fallback)
        .layer(middleware::from_fn(gate::scan))
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
                .layer(Extension(globals))
                .layer(Extension(pool)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, dsn: String, globals: Arc<GlobalArgs>) -> Result<()> {
    // Connect to database
    let pool = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    sqlx::raw_sql(include_str!("../../resources/schema.sql"))
        .execute(&pool)
        .await
        .context("Failed to prepare schema")?;

    let app = app(pool, globals);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Gracefully shutdown");
    })
    .await?;

    Ok(())
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
