//! Response bodies shared across routes.

use crate::models::{user::User, user_profile::UserProfile};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Generic "it worked" response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SuccessResponse {
    /// Whether the operation succeeded
    pub success: bool,
}

/// Response confirming which email a reset code was sent to
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EmailResponse {
    /// The email address. Never the code.
    pub email: String,
}

/// Response carrying a one-time plaintext secret (login or reset token).
/// The secret cannot be recovered later.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    /// The plaintext token
    pub token: String,
}

/// Email verification status
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerificationStatusResponse {
    /// Whether the account's email has been verified
    pub verified: bool,
}

/// Response to a successful registration
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    /// The freshly created account
    pub user: User,
}

/// Response to a successful login
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// The authenticated account
    pub user: User,
    /// Plaintext bearer token, shown exactly once
    pub token: String,
}

/// Account + profile, as returned by the profile routes
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    /// The account
    pub user: User,
    /// The profile
    pub profile: UserProfile,
}

/// Response to a profile image upload
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadImageResponse {
    /// URL path the uploaded image is served under
    pub path: String,
}
