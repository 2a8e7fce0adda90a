//! OpenAPI doc generation.

use crate::{
    error::{AppError, ErrorKind},
    models::{sensor_reading::SensorReading, user::User, user_profile::UserProfile},
    responses::{
        EmailResponse, LoginResponse, ProfileResponse, RegisterResponse, SuccessResponse,
        TokenResponse, UploadImageResponse, VerificationStatusResponse,
    },
    routes::{auth, email, health, password, ping, profile, sensor},
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

/// API documentation generator.
#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthcheck,
        ping::get,
        auth::register,
        auth::login,
        auth::logout,
        email::send_code,
        email::verify,
        email::status,
        password::send_reset_code,
        password::verify_reset_code,
        password::reset,
        password::change,
        profile::get,
        profile::update,
        profile::upload_image,
        sensor::post_water_level,
        sensor::get_all_water_levels,
    ),
    components(
        schemas(
            AppError,
            ErrorKind,
            auth::RegisterRequest,
            auth::LoginRequest,
            email::VerifyEmailRequest,
            password::SendResetCodeRequest,
            password::VerifyResetCodeRequest,
            password::ResetPasswordRequest,
            password::ChangePasswordRequest,
            profile::UpdateProfileRequest,
            sensor::WaterLevelRequest,
            SuccessResponse,
            EmailResponse,
            TokenResponse,
            VerificationStatusResponse,
            RegisterResponse,
            LoginResponse,
            ProfileResponse,
            UploadImageResponse,
            User,
            UserProfile,
            SensorReading,
            health::HealthcheckResponse,
        )
    ),
    modifiers(&BearerAddon),
)]

/// Tied to OpenAPI documentation.
#[derive(Debug)]
pub struct ApiDoc;

/// Registers the bearer-token security scheme referenced by the
/// authenticated routes.
#[derive(Debug)]
struct BearerAddon;

impl Modify for BearerAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}
