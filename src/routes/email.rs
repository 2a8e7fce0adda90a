//! Email verification routes

use crate::{
    app_state::AppState,
    db,
    error::{AppError, AppResult, ErrorKind},
    extract::authenticated::Authenticated,
    models::email_verification::EmailVerification,
    responses::{SuccessResponse, VerificationStatusResponse},
    setups::{CodeSender, ServerSetup},
};
use axum::{
    self,
    extract::{Json, State},
    http::StatusCode,
};
use serde::Deserialize;
use utoipa::ToSchema;

/// Payload for confirming a verification code
#[derive(Deserialize, Clone, Debug, ToSchema)]
pub struct VerifyEmailRequest {
    /// The 6-digit code from the email
    pub code: String,
}

/// POST handler for requesting a fresh verification code.
///
/// The code goes out by email only; the response never contains it.
#[utoipa::path(
    post,
    path = "/api/email/send-code",
    security(
        ("bearer" = []),
    ),
    responses(
        (status = 200, description = "Verification code sent", body = SuccessResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Email could not be delivered", body = AppError),
    )
)]
pub async fn send_code<S: ServerSetup>(
    State(state): State<AppState<S>>,
    auth: Authenticated,
) -> AppResult<(StatusCode, Json<SuccessResponse>)> {
    let conn = &mut db::connect(&state.db_pool).await?;

    let (_, code) = EmailVerification::request(conn, auth.user.id).await?;

    state
        .code_sender
        .send_verification_code(&auth.user.email, &code)
        .await
        .map_err(|err| {
            tracing::error!(?err, "Failed to dispatch verification code email");
            AppError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorKind::Internal,
                Some("Could not deliver email"),
            )
        })?;

    Ok((StatusCode::OK, Json(SuccessResponse { success: true })))
}

/// POST handler for confirming a verification code
#[utoipa::path(
    post,
    path = "/api/email/verify",
    request_body = VerifyEmailRequest,
    security(
        ("bearer" = []),
    ),
    responses(
        (status = 200, description = "Email verified", body = SuccessResponse),
        (status = 400, description = "Wrong or expired code", body = AppError),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn verify<S: ServerSetup>(
    State(state): State<AppState<S>>,
    auth: Authenticated,
    Json(request): Json<VerifyEmailRequest>,
) -> AppResult<(StatusCode, Json<SuccessResponse>)> {
    let conn = &mut db::connect(&state.db_pool).await?;

    EmailVerification::confirm(conn, auth.user.id, &request.code).await?;

    tracing::info!(user_id = auth.user.id, "Email verified");

    Ok((StatusCode::OK, Json(SuccessResponse { success: true })))
}

/// GET handler for the email verification status
#[utoipa::path(
    get,
    path = "/api/email/status",
    security(
        ("bearer" = []),
    ),
    responses(
        (status = 200, description = "Verification status", body = VerificationStatusResponse),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn status<S: ServerSetup>(
    State(state): State<AppState<S>>,
    auth: Authenticated,
) -> AppResult<(StatusCode, Json<VerificationStatusResponse>)> {
    let conn = &mut db::connect(&state.db_pool).await?;

    let verified = EmailVerification::is_verified(conn, auth.user.id).await?;

    Ok((
        StatusCode::OK,
        Json(VerificationStatusResponse { verified }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::schema::email_verifications,
        error::ErrorResponse,
        test_utils::{
            helpers::register_and_login, route_builder::RouteBuilder, test_context::TestContext,
        },
    };
    use assert_matches::assert_matches;
    use chrono::{Duration, Utc};
    use diesel::ExpressionMethods;
    use diesel_async::RunQueryDsl;
    use http::Method;
    use serde_json::json;
    use testresult::TestResult;

    async fn send_code(ctx: &TestContext, token: &str) -> TestResult<String> {
        let (status, _) = RouteBuilder::new(ctx.app(), Method::POST, "/api/email/send-code")
            .with_bearer_token(token)
            .into_json_response::<SuccessResponse>()
            .await?;

        assert_eq!(status, StatusCode::OK);

        let (_, code) = ctx
            .code_sender()
            .get_verification_emails()
            .into_iter()
            .last()
            .expect("No email sent");

        Ok(code)
    }

    #[test_log::test(tokio::test)]
    async fn test_send_and_verify_code_ok() -> TestResult {
        let ctx = TestContext::new().await;
        let (_, token) =
            register_and_login(&ctx, "oedipa maas", "oedipa@trystero.com", "Password1!").await?;

        let code = send_code(&ctx, &token).await?;
        assert_eq!(code.len(), 6);

        let (status, response) = RouteBuilder::new(ctx.app(), Method::POST, "/api/email/verify")
            .with_bearer_token(&token)
            .with_json_body(json!({ "code": code }))?
            .into_json_response::<SuccessResponse>()
            .await?;

        assert_eq!(status, StatusCode::OK);
        assert!(response.success);

        let (status, response) = RouteBuilder::new(ctx.app(), Method::GET, "/api/email/status")
            .with_bearer_token(&token)
            .into_json_response::<VerificationStatusResponse>()
            .await?;

        assert_eq!(status, StatusCode::OK);
        assert!(response.verified);

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_status_starts_unverified() -> TestResult {
        let ctx = TestContext::new().await;
        let (_, token) =
            register_and_login(&ctx, "oedipa maas", "oedipa@trystero.com", "Password1!").await?;

        let (status, response) = RouteBuilder::new(ctx.app(), Method::GET, "/api/email/status")
            .with_bearer_token(&token)
            .into_json_response::<VerificationStatusResponse>()
            .await?;

        assert_eq!(status, StatusCode::OK);
        assert!(!response.verified);

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_verify_wrong_code() -> TestResult {
        let ctx = TestContext::new().await;
        let (_, token) =
            register_and_login(&ctx, "oedipa maas", "oedipa@trystero.com", "Password1!").await?;

        let code = send_code(&ctx, &token).await?;
        // off-by-one on the real code
        let wrong = if code == "100000" { "100001" } else { "100000" };

        let (status, body) = RouteBuilder::new(ctx.app(), Method::POST, "/api/email/verify")
            .with_bearer_token(&token)
            .with_json_body(json!({ "code": wrong }))?
            .into_json_response::<ErrorResponse>()
            .await?;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_matches!(body.errors.as_slice(), [err] => {
            assert_eq!(err.kind(), ErrorKind::InvalidCode);
        });

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_verify_expired_code() -> TestResult {
        let ctx = TestContext::new().await;
        let (_, token) =
            register_and_login(&ctx, "oedipa maas", "oedipa@trystero.com", "Password1!").await?;

        let code = send_code(&ctx, &token).await?;

        // push the code past its window
        let mut conn = ctx.get_db_conn().await;
        diesel::update(email_verifications::table)
            .set(
                email_verifications::code_expires_at
                    .eq(Utc::now().naive_utc() - Duration::seconds(1)),
            )
            .execute(&mut conn)
            .await?;

        let (status, body) = RouteBuilder::new(ctx.app(), Method::POST, "/api/email/verify")
            .with_bearer_token(&token)
            .with_json_body(json!({ "code": code }))?
            .into_json_response::<ErrorResponse>()
            .await?;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_matches!(body.errors.as_slice(), [err] => {
            assert_eq!(err.kind(), ErrorKind::CodeExpired);
        });

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_consumed_code_cannot_be_replayed() -> TestResult {
        let ctx = TestContext::new().await;
        let (_, token) =
            register_and_login(&ctx, "oedipa maas", "oedipa@trystero.com", "Password1!").await?;

        let code = send_code(&ctx, &token).await?;

        let (status, _) = RouteBuilder::new(ctx.app(), Method::POST, "/api/email/verify")
            .with_bearer_token(&token)
            .with_json_body(json!({ "code": code }))?
            .into_json_response::<SuccessResponse>()
            .await?;
        assert_eq!(status, StatusCode::OK);

        // the code was cleared on success
        let (status, body) = RouteBuilder::new(ctx.app(), Method::POST, "/api/email/verify")
            .with_bearer_token(&token)
            .with_json_body(json!({ "code": code }))?
            .into_json_response::<ErrorResponse>()
            .await?;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_matches!(body.errors.as_slice(), [err] => {
            assert_eq!(err.kind(), ErrorKind::InvalidCode);
        });

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_new_code_supersedes_old_one() -> TestResult {
        let ctx = TestContext::new().await;
        let (_, token) =
            register_and_login(&ctx, "oedipa maas", "oedipa@trystero.com", "Password1!").await?;

        let first = send_code(&ctx, &token).await?;
        let second = send_code(&ctx, &token).await?;

        if first != second {
            let (status, _) = RouteBuilder::new(ctx.app(), Method::POST, "/api/email/verify")
                .with_bearer_token(&token)
                .with_json_body(json!({ "code": first }))?
                .into_json_response::<ErrorResponse>()
                .await?;

            assert_eq!(status, StatusCode::BAD_REQUEST);
        }

        let (status, _) = RouteBuilder::new(ctx.app(), Method::POST, "/api/email/verify")
            .with_bearer_token(&token)
            .with_json_body(json!({ "code": second }))?
            .into_json_response::<SuccessResponse>()
            .await?;

        assert_eq!(status, StatusCode::OK);

        Ok(())
    }
}
