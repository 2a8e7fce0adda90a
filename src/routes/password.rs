//! Password reset & change routes
//!
//! The reset flow is a per-email state machine:
//! Idle → CodeIssued (`send_reset_code`) → TokenIssued (`verify_reset_code`)
//! → Idle again (`reset`, record deleted).

use crate::{
    app_state::AppState,
    db,
    error::{AppError, AppResult, ErrorKind},
    extract::authenticated::Authenticated,
    models::{password_reset::PasswordReset, user::UserRecord},
    password,
    responses::{EmailResponse, SuccessResponse, TokenResponse},
    setups::{CodeSender, ServerSetup},
};
use axum::{
    self,
    extract::{Json, State},
    http::StatusCode,
};
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

/// Payload for requesting a reset code
#[derive(Deserialize, Validate, Clone, Debug, ToSchema)]
pub struct SendResetCodeRequest {
    /// Email address of the account to reset
    #[validate(email(message = "The email must be a valid email address"))]
    pub email: String,
}

/// Payload for exchanging a reset code for a reset token
#[derive(Deserialize, Validate, Clone, Debug, ToSchema)]
pub struct VerifyResetCodeRequest {
    /// Email address the code was sent to
    #[validate(email(message = "The email must be a valid email address"))]
    pub email: String,
    /// The 6-digit code from the email
    pub code: String,
}

/// Payload for redeeming a reset token
#[derive(Deserialize, Clone, Debug, ToSchema)]
pub struct ResetPasswordRequest {
    /// The reset token from `verify-reset-code`
    pub token: String,
    /// The new password
    pub password: String,
    /// Must match `password`
    pub password_confirmation: String,
}

/// Payload for changing the password of an authenticated account
#[derive(Deserialize, Clone, Debug, ToSchema)]
pub struct ChangePasswordRequest {
    /// The current password
    pub current_password: String,
    /// The new password
    pub password: String,
    /// Must match `password`
    pub password_confirmation: String,
}

/// POST handler for starting a password reset.
///
/// Overwrites any prior reset state for the email; the previous code (and
/// token, if one was issued) stop working.
#[utoipa::path(
    post,
    path = "/api/password/send-reset-code",
    request_body = SendResetCodeRequest,
    responses(
        (status = 200, description = "Reset code sent", body = EmailResponse),
        (status = 404, description = "No account with this email", body = AppError),
        (status = 422, description = "Validation failure", body = AppError),
        (status = 500, description = "Email could not be delivered", body = AppError),
    )
)]
pub async fn send_reset_code<S: ServerSetup>(
    State(state): State<AppState<S>>,
    Json(request): Json<SendResetCodeRequest>,
) -> AppResult<(StatusCode, Json<EmailResponse>)> {
    request.validate()?;

    let conn = &mut db::connect(&state.db_pool).await?;

    let user = UserRecord::find_by_email(conn, &request.email)
        .await?
        .ok_or_else(AppError::account_not_found)?;

    let (record, code) = PasswordReset::request(conn, &user.email).await?;

    state
        .code_sender
        .send_reset_code(&record.email, &code)
        .await
        .map_err(|err| {
            tracing::error!(?err, "Failed to dispatch reset code email");
            AppError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorKind::Internal,
                Some("Could not deliver email"),
            )
        })?;

    Ok((
        StatusCode::OK,
        Json(EmailResponse {
            email: record.email,
        }),
    ))
}

/// POST handler for exchanging a verified code for a one-time reset token.
///
/// The token in the response is shown exactly once; only its hash survives
/// on the server.
#[utoipa::path(
    post,
    path = "/api/password/verify-reset-code",
    request_body = VerifyResetCodeRequest,
    responses(
        (status = 200, description = "Code verified, token issued", body = TokenResponse),
        (status = 400, description = "Wrong or expired code", body = AppError),
        (status = 422, description = "Validation failure", body = AppError),
    )
)]
pub async fn verify_reset_code<S: ServerSetup>(
    State(state): State<AppState<S>>,
    Json(request): Json<VerifyResetCodeRequest>,
) -> AppResult<(StatusCode, Json<TokenResponse>)> {
    request.validate()?;

    let conn = &mut db::connect(&state.db_pool).await?;

    let token = PasswordReset::verify_code(conn, &request.email, &request.code).await?;

    Ok((StatusCode::OK, Json(TokenResponse { token })))
}

/// POST handler for redeeming a reset token into a password change.
///
/// The token is single use: the reset record is deleted in the same
/// transaction that rewrites the password hash.
#[utoipa::path(
    post,
    path = "/api/password/reset",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = SuccessResponse),
        (status = 400, description = "Invalid or expired token", body = AppError),
        (status = 422, description = "Password policy failure", body = AppError),
    )
)]
pub async fn reset<S: ServerSetup>(
    State(state): State<AppState<S>>,
    Json(request): Json<ResetPasswordRequest>,
) -> AppResult<(StatusCode, Json<SuccessResponse>)> {
    password::check_policy(&request.password, &request.password_confirmation)
        .map_err(|rules| AppError::password_policy_violation(&rules))?;

    let password_hash = password::hash(&request.password)?;

    let conn = &mut db::connect(&state.db_pool).await?;
    conn.transaction(|conn| {
        async move {
            let record = PasswordReset::consume_token(conn, &request.token).await?;

            // The record can outlive its account (the row is keyed by email,
            // not a foreign key). Treat that like any other dead token.
            let user = UserRecord::find_by_email(conn, &record.email)
                .await?
                .ok_or_else(AppError::invalid_or_expired_token)?;

            UserRecord::set_password_hash(conn, user.id, &password_hash).await?;

            tracing::info!(user_id = user.id, "Password reset completed");

            Ok((StatusCode::OK, Json(SuccessResponse { success: true })))
        }
        .scope_boxed()
    })
    .await
}

/// POST handler for changing the password with the current one.
#[utoipa::path(
    post,
    path = "/api/password/change",
    request_body = ChangePasswordRequest,
    security(
        ("bearer" = []),
    ),
    responses(
        (status = 200, description = "Password changed", body = SuccessResponse),
        (status = 400, description = "Current password incorrect", body = AppError),
        (status = 401, description = "Unauthorized"),
        (status = 422, description = "Password policy failure", body = AppError),
    )
)]
pub async fn change<S: ServerSetup>(
    State(state): State<AppState<S>>,
    auth: Authenticated,
    Json(request): Json<ChangePasswordRequest>,
) -> AppResult<(StatusCode, Json<SuccessResponse>)> {
    if !password::verify(&request.current_password, &auth.user.password_hash) {
        return Err(AppError::incorrect_current_password());
    }

    password::check_policy(&request.password, &request.password_confirmation)
        .map_err(|rules| AppError::password_policy_violation(&rules))?;

    let password_hash = password::hash(&request.password)?;

    let conn = &mut db::connect(&state.db_pool).await?;

    UserRecord::set_password_hash(conn, auth.user.id, &password_hash).await?;

    Ok((StatusCode::OK, Json(SuccessResponse { success: true })))
}
