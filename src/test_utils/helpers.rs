//! Common register/login flows for route tests.
use crate::{
    models::user::User,
    responses::{LoginResponse, RegisterResponse},
    test_utils::{route_builder::RouteBuilder, test_context::TestContext},
};
use anyhow::Result;
use http::{Method, StatusCode};
use serde_json::{json, Value};

/// Register an account through the API.
pub(crate) async fn register(
    ctx: &TestContext,
    name: &str,
    email: &str,
    password: &str,
) -> Result<(StatusCode, RegisterResponse)> {
    RouteBuilder::new(ctx.app(), Method::POST, "/api/register")
        .with_json_body(json!({
            "name": name,
            "email": email,
            "password": password,
            "password_confirmation": password,
        }))?
        .into_json_response::<RegisterResponse>()
        .await
}

/// Attempt a login. Returns the raw JSON body so callers can assert on
/// failures as well as successes.
pub(crate) async fn login(
    ctx: &TestContext,
    email: &str,
    password: &str,
) -> Result<(StatusCode, Value)> {
    RouteBuilder::new(ctx.app(), Method::POST, "/api/login")
        .with_json_body(json!({
            "email": email,
            "password": password,
        }))?
        .into_json_response::<Value>()
        .await
}

/// Register an account and log it in, returning the account and a bearer
/// token.
pub(crate) async fn register_and_login(
    ctx: &TestContext,
    name: &str,
    email: &str,
    password: &str,
) -> Result<(User, String)> {
    let (status, _) = register(ctx, name, email, password).await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, response) = RouteBuilder::new(ctx.app(), Method::POST, "/api/login")
        .with_json_body(json!({
            "email": email,
            "password": password,
        }))?
        .into_json_response::<LoginResponse>()
        .await?;
    assert_eq!(status, StatusCode::OK);

    Ok((response.user, response.token))
}
