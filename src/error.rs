//! Generic result/error representation(s).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use validator::ValidationErrors;

use crate::password::PolicyRule;

/// Standard return type out of routes / handlers
pub type AppResult<T> = std::result::Result<T, AppError>;

/// Machine-readable error kind, stable across releases.
///
/// Clients are expected to branch on this rather than on the human-readable
/// `detail` text.
#[derive(ToSchema, Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No account matches the given email address
    AccountNotFound,
    /// Wrong or missing verification/reset code
    InvalidCode,
    /// The code exists but its validity window has passed
    CodeExpired,
    /// The reset token doesn't match any live record. Consumed and
    /// never-issued tokens are deliberately indistinguishable.
    InvalidOrExpiredToken,
    /// The new password fails the complexity contract; `meta.rules`
    /// carries the failed rule names
    PasswordPolicyViolation,
    /// The supplied current password doesn't verify
    IncorrectCurrentPassword,
    /// Unknown email or wrong password at login
    InvalidCredentials,
    /// Missing or invalid bearer token
    Unauthenticated,
    /// Request payload failed validation
    Validation,
    /// Unique constraint violation (e.g. email already registered)
    Conflict,
    /// Generic missing resource
    NotFound,
    /// Anything we can't recover from locally
    Internal,
}

/// Encodes [JSONAPI error object responses](https://jsonapi.org/examples/#error-objects).
///
/// JSONAPI error object -  ALL Fields are technically optional.
///
/// This struct uses the following guidelines:
///
/// 1. Always encode the StatusCode of the response
/// 2. Always encode a machine-readable error `kind` (§ the taxonomy above)
/// 3. Set the title to the `canonical_reason` of the status code.
///    According to spec, this should NOT change over time.
/// 4. Encode a human-readable hint as the detail
/// 5. `meta` carries structured extras, e.g. failed password policy rules
#[derive(ToSchema, thiserror::Error, PartialEq, Debug, Deserialize, Serialize)]
pub struct AppError {
    #[schema(value_type = u16, example = 404)]
    #[serde(with = "crate::error::serde_status_code")]
    pub(crate) status: StatusCode,
    /// Machine-readable error kind
    pub(crate) kind: ErrorKind,
    #[schema(example = "Not Found")]
    pub(crate) title: Option<String>,
    #[schema(example = "No account matches this email address")]
    pub(crate) detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub(crate) meta: Option<serde_json::Value>,
}

impl AppError {
    /// New instance of [AppError].
    pub fn new<M: ToString>(status_code: StatusCode, kind: ErrorKind, message: Option<M>) -> Self {
        Self {
            status: status_code,
            kind,
            title: Self::canonical_reason_to_string(&status_code),
            detail: message.map(|m| m.to_string()),
            meta: None,
        }
    }

    /// The machine-readable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// [AppError] for a reset/verification request against an unknown email.
    pub fn account_not_found() -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            ErrorKind::AccountNotFound,
            Some("No account matches this email address"),
        )
    }

    /// [AppError] for a wrong or missing code.
    pub fn invalid_code() -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            ErrorKind::InvalidCode,
            Some("The code is incorrect"),
        )
    }

    /// [AppError] for a correct but stale code.
    pub fn code_expired() -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            ErrorKind::CodeExpired,
            Some("The code has expired, request a new one"),
        )
    }

    /// [AppError] for a reset token that matches no live record.
    pub fn invalid_or_expired_token() -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            ErrorKind::InvalidOrExpiredToken,
            Some("The reset token is invalid or has expired"),
        )
    }

    /// [AppError] carrying the failed password policy rules.
    pub fn password_policy_violation(rules: &[PolicyRule]) -> Self {
        let hints = rules
            .iter()
            .map(|rule| rule.hint())
            .collect::<Vec<_>>()
            .join(" ");

        let mut error = Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::PasswordPolicyViolation,
            Some(hints),
        );
        error.meta = Some(json!({
            "rules": rules.iter().map(|rule| rule.as_str()).collect::<Vec<_>>(),
        }));
        error
    }

    /// [AppError] for a failed current-password check.
    pub fn incorrect_current_password() -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            ErrorKind::IncorrectCurrentPassword,
            Some("The current password is incorrect"),
        )
    }

    /// [AppError] for a failed login.
    pub fn invalid_credentials() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            ErrorKind::InvalidCredentials,
            Some("The email or password is incorrect"),
        )
    }

    /// [AppError] for requests without a usable bearer token.
    pub fn unauthenticated<M: ToString>(message: M) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            ErrorKind::Unauthenticated,
            Some(message),
        )
    }

    fn canonical_reason_to_string(status_code: &StatusCode) -> Option<String> {
        status_code.canonical_reason().map(|r| r.to_string())
    }
}

#[derive(Debug, Deserialize, Serialize)]
/// Error in JSON API response format.
pub struct ErrorResponse {
    pub(crate) errors: Vec<AppError>,
}

impl From<AppError> for ErrorResponse {
    fn from(e: AppError) -> Self {
        Self { errors: vec![e] }
    }
}

impl From<AppError> for (StatusCode, Json<ErrorResponse>) {
    fn from(app_error: AppError) -> Self {
        (app_error.status, Json(app_error.into()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_response: (StatusCode, Json<ErrorResponse>) = self.into();
        error_response.into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<diesel::result::Error>() {
            Ok(err) => return Self::from(err),
            Err(e) => e,
        };

        let err = match err.downcast::<ValidationErrors>() {
            Ok(err) => return Self::from(err),
            Err(e) => e,
        };

        Self::new(StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::Internal, Some(err))
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => Self::new(
                StatusCode::NOT_FOUND,
                ErrorKind::NotFound,
                Some("Resource Not Found"),
            ),
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                info,
            ) => Self::new(
                StatusCode::CONFLICT,
                ErrorKind::Conflict,
                Some(match info.details() {
                    Some(details) => format!("{} ({details})", info.message()),
                    None => info.message().to_string(),
                }),
            ),
            _ => Self::new(StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::Internal, Some(err)),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Validation,
            Some(err),
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::Internal, Some(err))
    }
}

/// Serialize/Deserializer for status codes.
///
/// This is needed because status code according to JSON API spec must
/// be the status code as a STRING.
///
/// We could have used http_serde, but it encodes the status code as a NUMBER.
pub mod serde_status_code {
    use http::StatusCode;
    use serde::{de::Unexpected, Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize [StatusCode]s.
    pub fn serialize<S: Serializer>(status: &StatusCode, ser: S) -> Result<S::Ok, S::Error> {
        String::serialize(&status.as_u16().to_string(), ser)
    }

    /// Deserialize [StatusCode]s.
    pub fn deserialize<'de, D>(de: D) -> Result<StatusCode, D::Error>
    where
        D: Deserializer<'de>,
    {
        let str = String::deserialize(de)?;
        StatusCode::from_bytes(str.as_bytes()).map_err(|_| {
            serde::de::Error::invalid_value(
                Unexpected::Str(str.as_str()),
                &"A valid http status code",
            )
        })
    }
}

// Needed to support thiserror::Error, outputs debug for AppError
impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
/// Parse the app error out of the json body
pub async fn parse_error(response: Response) -> AppError {
    let body_bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let mut err_response: ErrorResponse = serde_json::from_slice(&body_bytes).unwrap();
    err_response.errors.remove(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use testresult::TestResult;

    #[test]
    fn test_from_anyhow_error() {
        let err: AppError = anyhow::anyhow!("FAIL").into();
        assert_eq!(err.detail.unwrap(), "FAIL".to_string());
        assert_eq!(err.kind, ErrorKind::Internal);
        assert_eq!(
            err.title,
            StatusCode::INTERNAL_SERVER_ERROR
                .canonical_reason()
                .map(|r| r.to_string())
        );

        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_policy_violation_carries_rules() {
        let err = AppError::password_policy_violation(&[
            PolicyRule::MinLength,
            PolicyRule::Uppercase,
        ]);

        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.kind, ErrorKind::PasswordPolicyViolation);
        assert_eq!(
            err.meta.unwrap(),
            serde_json::json!({ "rules": ["min_length", "uppercase"] })
        );
    }

    #[tokio::test]
    async fn test_json_api_error_response() -> TestResult {
        // verify that our json api response complies with the standard
        let err = AppError::account_not_found();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let err = parse_error(response).await;

        // Check that the result is all good
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.kind, ErrorKind::AccountNotFound);
        assert_eq!(
            err.title,
            StatusCode::NOT_FOUND
                .canonical_reason()
                .map(|r| r.to_string())
        );

        Ok(())
    }
}
