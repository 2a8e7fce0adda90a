//! Registration, login & logout routes

use crate::{
    app_state::AppState,
    db,
    error::{AppError, AppResult},
    extract::authenticated::Authenticated,
    models::{
        access_token::AccessToken,
        user::{NewUser, UserRecord},
        user_profile::UserProfileRecord,
    },
    password,
    responses::{LoginResponse, RegisterResponse, SuccessResponse},
    setups::ServerSetup,
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

/// Registration payload
#[derive(Deserialize, Validate, Clone, Debug, ToSchema)]
pub struct RegisterRequest {
    /// Display name, 6 to 25 characters
    #[validate(length(min = 6, max = 25, message = "Name must be 6 to 25 characters long"))]
    pub name: String,
    /// Email address
    #[validate(email(message = "The email must be a valid email address"))]
    pub email: String,
    /// Password, checked against the complexity contract
    pub password: String,
    /// Must match `password`
    pub password_confirmation: String,
}

/// Login payload
#[derive(Deserialize, Validate, Clone, Debug, ToSchema)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "The email must be a valid email address"))]
    pub email: String,
    /// Account password
    pub password: String,
}

/// POST handler for registering a new account
#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Successfully created account", body = RegisterResponse),
        (status = 409, description = "Email already registered", body = AppError),
        (status = 422, description = "Validation or password policy failure", body = AppError),
    )
)]
pub async fn register<S: ServerSetup>(
    State(state): State<AppState<S>>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    request.validate()?;

    password::check_policy(&request.password, &request.password_confirmation)
        .map_err(|rules| AppError::password_policy_violation(&rules))?;

    let password_hash = password::hash(&request.password)?;

    let new_user = NewUser {
        name: request.name,
        email: request.email,
        password_hash,
    };

    let conn = &mut db::connect(&state.db_pool).await?;
    conn.transaction(|conn| {
        async move {
            let user = UserRecord::create(conn, new_user).await?;

            UserProfileRecord::create(conn, user.id).await?;

            tracing::info!(user_id = user.id, "Registered new account");

            Ok((
                StatusCode::CREATED,
                Json(RegisterResponse {
                    user: user.to_user(),
                }),
            ))
        }
        .scope_boxed()
    })
    .await
}

/// POST handler for logging in
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Successfully logged in", body = LoginResponse),
        (status = 401, description = "Unknown email or wrong password", body = AppError),
        (status = 422, description = "Validation failure", body = AppError),
    )
)]
pub async fn login<S: ServerSetup>(
    State(state): State<AppState<S>>,
    Json(request): Json<LoginRequest>,
) -> AppResult<(StatusCode, Json<LoginResponse>)> {
    request.validate()?;

    let conn = &mut db::connect(&state.db_pool).await?;

    let user = UserRecord::find_by_email(conn, &request.email)
        .await?
        .ok_or_else(AppError::invalid_credentials)?;

    if !password::verify(&request.password, &user.password_hash) {
        return Err(AppError::invalid_credentials());
    }

    let token = AccessToken::issue(conn, user.id).await?;

    Ok((
        StatusCode::OK,
        Json(LoginResponse {
            user: user.to_user(),
            token,
        }),
    ))
}

/// POST handler for logging out. Revokes every token of the account.
#[utoipa::path(
    post,
    path = "/api/logout",
    security(
        ("bearer" = []),
    ),
    responses(
        (status = 200, description = "Successfully logged out", body = SuccessResponse),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn logout<S: ServerSetup>(
    State(state): State<AppState<S>>,
    auth: Authenticated,
) -> AppResult<(StatusCode, Json<SuccessResponse>)> {
    let conn = &mut db::connect(&state.db_pool).await?;

    AccessToken::revoke_all(conn, auth.user.id).await?;

    Ok((StatusCode::OK, Json(SuccessResponse { success: true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{ErrorKind, ErrorResponse},
        test_utils::{
            helpers::{register, register_and_login},
            route_builder::RouteBuilder,
            test_context::TestContext,
        },
    };
    use assert_matches::assert_matches;
    use http::Method;
    use serde_json::{json, Value};
    use testresult::TestResult;

    #[test_log::test(tokio::test)]
    async fn test_register_ok() -> TestResult {
        let ctx = TestContext::new().await;

        let (status, response) = register(&ctx, "oedipa maas", "oedipa@trystero.com", "Password1!").await?;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(response.user.name, "oedipa maas");
        assert_eq!(response.user.email, "oedipa@trystero.com");

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_register_weak_password_reports_rules() -> TestResult {
        let ctx = TestContext::new().await;

        let (status, body) = RouteBuilder::new(ctx.app(), Method::POST, "/api/register")
            .with_json_body(json!({
                "name": "oedipa maas",
                "email": "oedipa@trystero.com",
                "password": "password1",
                "password_confirmation": "password1",
            }))?
            .into_json_response::<ErrorResponse>()
            .await?;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_matches!(body.errors.as_slice(), [err] => {
            assert_eq!(err.kind(), ErrorKind::PasswordPolicyViolation);
        });

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_register_duplicate_email_conflict() -> TestResult {
        let ctx = TestContext::new().await;

        let (status, _) = register(&ctx, "oedipa maas", "oedipa@trystero.com", "Password1!").await?;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = RouteBuilder::new(ctx.app(), Method::POST, "/api/register")
            .with_json_body(json!({
                "name": "second oedipa",
                "email": "oedipa@trystero.com",
                "password": "Password1!",
                "password_confirmation": "Password1!",
            }))?
            .into_json_response::<Value>()
            .await?;

        assert_eq!(status, StatusCode::CONFLICT);

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_register_invalid_email() -> TestResult {
        let ctx = TestContext::new().await;

        let (status, _) = RouteBuilder::new(ctx.app(), Method::POST, "/api/register")
            .with_json_body(json!({
                "name": "oedipa maas",
                "email": "not-an-email",
                "password": "Password1!",
                "password_confirmation": "Password1!",
            }))?
            .into_json_response::<Value>()
            .await?;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_login_ok_and_wrong_password() -> TestResult {
        let ctx = TestContext::new().await;

        register(&ctx, "oedipa maas", "oedipa@trystero.com", "Password1!").await?;

        let (status, response) = RouteBuilder::new(ctx.app(), Method::POST, "/api/login")
            .with_json_body(json!({
                "email": "oedipa@trystero.com",
                "password": "Password1!",
            }))?
            .into_json_response::<LoginResponse>()
            .await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(response.user.email, "oedipa@trystero.com");
        assert!(!response.token.is_empty());

        let (status, body) = RouteBuilder::new(ctx.app(), Method::POST, "/api/login")
            .with_json_body(json!({
                "email": "oedipa@trystero.com",
                "password": "WrongPass1!",
            }))?
            .into_json_response::<ErrorResponse>()
            .await?;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_matches!(body.errors.as_slice(), [err] => {
            assert_eq!(err.kind(), ErrorKind::InvalidCredentials);
        });

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_login_unknown_email_same_error_as_wrong_password() -> TestResult {
        let ctx = TestContext::new().await;

        let (status, body) = RouteBuilder::new(ctx.app(), Method::POST, "/api/login")
            .with_json_body(json!({
                "email": "nobody@trystero.com",
                "password": "Password1!",
            }))?
            .into_json_response::<ErrorResponse>()
            .await?;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_matches!(body.errors.as_slice(), [err] => {
            assert_eq!(err.kind(), ErrorKind::InvalidCredentials);
        });

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_logout_revokes_tokens() -> TestResult {
        let ctx = TestContext::new().await;

        let (_, token) =
            register_and_login(&ctx, "oedipa maas", "oedipa@trystero.com", "Password1!").await?;

        let (status, response) = RouteBuilder::new(ctx.app(), Method::POST, "/api/logout")
            .with_bearer_token(&token)
            .into_json_response::<SuccessResponse>()
            .await?;

        assert_eq!(status, StatusCode::OK);
        assert!(response.success);

        // the token is gone now
        let (status, _) = RouteBuilder::new(ctx.app(), Method::POST, "/api/logout")
            .with_bearer_token(&token)
            .into_json_response::<Value>()
            .await?;

        assert_eq!(status, StatusCode::UNAUTHORIZED);

        Ok(())
    }
}
