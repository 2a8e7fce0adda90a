//! floodwatch-server

use anyhow::Result;
use axum::{headers::HeaderName, Router};
use axum_server::Handle;
use floodwatch_server::{
    app_state::AppStateBuilder,
    db::{self, Pool},
    docs::ApiDoc,
    middleware::{request_ulid::MakeRequestUlid, runtime},
    models::password_reset::PasswordReset,
    router,
    settings::Settings,
    setups::prod::{MailgunCodeSender, ProdSetup},
};
use http::header;
use reqwest_middleware::ClientBuilder;
use reqwest_retry::RetryTransientMiddleware;
use retry_policies::policies::ExponentialBackoffBuilder;
use std::{
    io,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    process::exit,
    time::Duration,
};
use tokio::signal::{
    self,
    unix::{signal, SignalKind},
};
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer, sensitive_headers::SetSensitiveHeadersLayer,
    timeout::TimeoutLayer, trace::TraceLayer, ServiceBuilderExt,
};
use tracing::info;
use tracing_subscriber::{filter::EnvFilter, prelude::*};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Request identifier field.
const REQUEST_ID: &str = "request_id";

#[tokio::main]
async fn main() -> Result<()> {
    let (stdout_writer, _stdout_guard) = tracing_appender::non_blocking(io::stdout());

    setup_tracing(stdout_writer);

    let settings = Settings::load(None)?;

    info!(
        subject = "app_settings",
        category = "init",
        "starting with settings: {:?}",
        settings,
    );

    let db_pool = db::pool(
        &settings.database.url,
        settings.database.connect_timeout,
    )
    .await?;

    db::migrations::run(&settings.database.url).await?;

    let cancellation_token = CancellationToken::new();

    let app_server = tokio::spawn(serve_app(
        settings.clone(),
        db_pool.clone(),
        cancellation_token.clone(),
    ));

    let sweeper = tokio::spawn(sweep_expired_resets(
        db_pool,
        settings.server.reset_sweep_interval_ms,
        cancellation_token.clone(),
    ));

    tokio::spawn(async move {
        capture_sigterm().await;

        cancellation_token.cancel();
        println!("\nCtrl+C received, shutting down. Press Ctrl+C again to force shutdown.");

        capture_sigterm().await;

        exit(130)
    });

    let (app, sweep) = tokio::try_join!(app_server, sweeper)?;

    if let Err(e) = app {
        tracing::error!("app server crashed: {}", e);
    }

    if let Err(e) = sweep {
        tracing::error!("reset sweeper crashed: {}", e);
    }

    Ok(())
}

async fn serve_app(settings: Settings, db_pool: Pool, token: CancellationToken) -> Result<()> {
    let req_id = HeaderName::from_static(REQUEST_ID);

    // The storage root in the settings file is relative to the settings file
    let storage = floodwatch_server::settings::Storage {
        root: settings.relative_storage_root().display().to_string(),
    };

    let app_state = AppStateBuilder::<ProdSetup>::default()
        .with_db_pool(db_pool)
        .with_code_sender(MailgunCodeSender::new(settings.mailgun.clone()))
        .with_storage(storage)
        .finalize()?;

    let router = router::setup_app_router(app_state)
        // Request/response logging.
        .layer(TraceLayer::new_for_http())
        // Set and propagate "request_id" (as a ulid) per request.
        .layer(
            ServiceBuilder::new()
                .set_request_id(req_id.clone(), MakeRequestUlid)
                .propagate_request_id(req_id),
        )
        // Applies the `tower_http::timeout::Timeout` middleware which
        // applies a timeout to requests.
        .layer(TimeoutLayer::new(Duration::from_millis(
            settings.server.timeout_ms,
        )))
        // Catches runtime panics and converts them into
        // `500 Internal Server` responses.
        .layer(CatchPanicLayer::custom(runtime::catch_panic))
        // Mark headers as sensitive on both requests and responses.
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION]))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()));

    let (server, addr) = serve("Application", router, settings.server.port).await;

    if settings.healthcheck.is_enabled {
        tokio::spawn({
            let cancellation_token = token.clone();
            let settings = settings.healthcheck.clone();

            async move {
                let mut interval =
                    tokio::time::interval(Duration::from_millis(settings.interval_ms));

                let client = ClientBuilder::new(reqwest::Client::new())
                    .with(RetryTransientMiddleware::new_with_policy(
                        ExponentialBackoffBuilder::default()
                            .build_with_max_retries(settings.max_retries),
                    ))
                    .build();

                loop {
                    interval.tick().await;

                    if let Ok(response) = client
                        .get(&format!("http://{}/healthcheck", addr))
                        .send()
                        .await
                    {
                        if !response.status().is_success() {
                            break;
                        }
                    } else {
                        break;
                    }
                }

                cancellation_token.cancel();

                tracing::error!("Healthcheck failed, shutting down");
            }
        });
    }

    token.cancelled().await;
    server.graceful_shutdown(None);

    Ok(())
}

/// Periodically delete password reset rows whose every validity window has
/// passed. Request handling never purges; this task is the only collector.
async fn sweep_expired_resets(
    db_pool: Pool,
    interval_ms: u64,
    token: CancellationToken,
) -> Result<()> {
    let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match db::connect(&db_pool).await {
                    Ok(mut conn) => match PasswordReset::purge_expired(&mut conn).await {
                        Ok(0) => {}
                        Ok(purged) => info!(purged, "Swept expired password reset rows"),
                        Err(e) => tracing::warn!("Password reset sweep failed: {e}"),
                    },
                    Err(e) => tracing::warn!("Password reset sweep could not connect: {e}"),
                }
            }
            _ = token.cancelled() => break,
        }
    }

    Ok(())
}

async fn serve(name: &str, app: Router, port: u16) -> (Handle, SocketAddr) {
    let bind_addr: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
    info!(
        subject = "app_start",
        category = "init",
        "{} server listening on {}",
        name,
        bind_addr
    );

    let handle = Handle::new();

    tokio::spawn({
        let handle = handle.clone();
        async move {
            axum_server::bind(bind_addr)
                .handle(handle)
                .serve(app.into_make_service_with_connect_info::<SocketAddr>())
                .await
        }
    });

    let addr = handle.listening().await.expect("server failed to bind");

    (handle, addr)
}

/// Captures and waits for system signals.
async fn capture_sigterm() {
    #[cfg(unix)]
    let term = async {
        signal(SignalKind::terminate())
            .expect("Failed to listen for SIGTERM")
            .recv()
            .await
    };

    #[cfg(not(unix))]
    let term = std::future::pending::<()>();

    tokio::select! {
        _ = signal::ctrl_c() => {},
        _ = term => {}
    };
}

/// Setup [tracing][tracing] for logging.
fn setup_tracing(writer: tracing_appender::non_blocking::NonBlocking) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                    EnvFilter::new("floodwatch_server=info,tower_http=info")
                })),
        )
        .init();
}
