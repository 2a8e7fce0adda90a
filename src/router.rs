//! Main [axum::Router] interface for webserver.

use crate::{
    app_state::AppState,
    routes::{auth, email, fallback::notfound_404, health, password, ping, profile, sensor},
    setups::ServerSetup,
};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};

/// Setup main router for application.
pub fn setup_app_router<S: ServerSetup>(app_state: AppState<S>) -> Router {
    let mut router = Router::new()
        .route("/ping", get(ping::get))
        .fallback(notfound_404)
        .with_state(app_state.clone());

    let cors = CorsLayer::new()
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::PATCH,
        ])
        .allow_headers([
            http::header::AUTHORIZATION,
            http::header::CONTENT_TYPE,
            http::header::ACCEPT,
        ])
        // allow requests from any origin
        .allow_origin(Any);

    let api_router = Router::new()
        .route("/register", post(auth::register::<S>))
        .route("/login", post(auth::login::<S>))
        .route("/logout", post(auth::logout::<S>))
        .route("/email/send-code", post(email::send_code::<S>))
        .route("/email/verify", post(email::verify::<S>))
        .route("/email/status", get(email::status::<S>))
        .route("/password/send-reset-code", post(password::send_reset_code::<S>))
        .route("/password/verify-reset-code", post(password::verify_reset_code::<S>))
        .route("/password/reset", post(password::reset::<S>))
        .route("/password/change", post(password::change::<S>))
        .route("/profile", get(profile::get::<S>).patch(profile::update::<S>))
        .route("/profile/image", post(profile::upload_image::<S>))
        .route("/sensors/water-level", post(sensor::post_water_level::<S>).get(sensor::get_all_water_levels::<S>))
        .layer(cors)
        .with_state(app_state.clone())
        .fallback(notfound_404);

    router = router.nest("/api", api_router);

    // Uploaded profile images
    router = router.nest_service("/storage", ServeDir::new(&app_state.storage.root));

    // Healthcheck
    let healthcheck_router = Router::new()
        .route("/healthcheck", get(health::healthcheck::<S>))
        .with_state(app_state);

    Router::merge(router, healthcheck_router)
}
