//! Profile routes

use crate::{
    app_state::AppState,
    db,
    error::{AppError, AppResult, ErrorKind},
    extract::authenticated::Authenticated,
    models::{
        user::UserRecord,
        user_profile::{ProfileChanges, UserProfileRecord},
    },
    responses::{ProfileResponse, UploadImageResponse},
    setups::ServerSetup,
};
use axum::{
    self,
    extract::{Json, Multipart, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::path::PathBuf;
use ulid::Ulid;
use utoipa::ToSchema;
use validator::Validate;

/// Largest accepted profile image, in bytes.
const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;

/// Partial profile update payload. Omitted fields are left untouched.
#[derive(Deserialize, Validate, Clone, Debug, Default, ToSchema)]
pub struct UpdateProfileRequest {
    /// New display name
    #[validate(length(min = 6, max = 25, message = "Name must be 6 to 25 characters long"))]
    pub name: Option<String>,
    /// New postal address
    pub address: Option<String>,
    /// New phone number
    pub phone_number: Option<String>,
    /// New gender
    pub gender: Option<String>,
}

/// GET handler for the authenticated account's profile
#[utoipa::path(
    get,
    path = "/api/profile",
    security(
        ("bearer" = []),
    ),
    responses(
        (status = 200, description = "Account and profile", body = ProfileResponse),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn get<S: ServerSetup>(
    State(state): State<AppState<S>>,
    auth: Authenticated,
) -> AppResult<(StatusCode, Json<ProfileResponse>)> {
    let conn = &mut db::connect(&state.db_pool).await?;

    let profile = UserProfileRecord::find_by_user(conn, auth.user.id)
        .await?
        .ok_or_else(|| {
            AppError::new(
                StatusCode::NOT_FOUND,
                ErrorKind::NotFound,
                Some("Profile not found"),
            )
        })?;

    Ok((
        StatusCode::OK,
        Json(ProfileResponse {
            user: auth.user.to_user(),
            profile: profile.to_profile(),
        }),
    ))
}

/// PATCH handler for partially updating the profile
#[utoipa::path(
    patch,
    path = "/api/profile",
    request_body = UpdateProfileRequest,
    security(
        ("bearer" = []),
    ),
    responses(
        (status = 200, description = "Updated account and profile", body = ProfileResponse),
        (status = 401, description = "Unauthorized"),
        (status = 422, description = "Validation failure", body = AppError),
    )
)]
pub async fn update<S: ServerSetup>(
    State(state): State<AppState<S>>,
    auth: Authenticated,
    Json(request): Json<UpdateProfileRequest>,
) -> AppResult<(StatusCode, Json<ProfileResponse>)> {
    request.validate()?;

    let conn = &mut db::connect(&state.db_pool).await?;

    if let Some(name) = &request.name {
        UserRecord::set_name(conn, auth.user.id, name).await?;
    }

    let profile = UserProfileRecord::update(
        conn,
        auth.user.id,
        ProfileChanges {
            address: request.address,
            phone_number: request.phone_number,
            gender: request.gender,
        },
    )
    .await?;

    let user = UserRecord::find_by_id(conn, auth.user.id)
        .await?
        .unwrap_or(auth.user);

    Ok((
        StatusCode::OK,
        Json(ProfileResponse {
            user: user.to_user(),
            profile: profile.to_profile(),
        }),
    ))
}

/// POST handler for uploading a profile image.
///
/// Multipart upload with a single `profile_image` part. Accepts jpeg, png
/// and gif up to 2 MiB. Replaces (and deletes) any previous image.
#[utoipa::path(
    post,
    path = "/api/profile/image",
    security(
        ("bearer" = []),
    ),
    responses(
        (status = 200, description = "Image stored", body = UploadImageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 422, description = "Missing, oversized or non-image upload", body = AppError),
    )
)]
pub async fn upload_image<S: ServerSetup>(
    State(state): State<AppState<S>>,
    auth: Authenticated,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<UploadImageResponse>)> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| validation_error(e.to_string()))?
    {
        if field.name() != Some("profile_image") {
            continue;
        }

        let extension = match field.content_type() {
            Some("image/jpeg") => "jpg",
            Some("image/png") => "png",
            Some("image/gif") => "gif",
            _ => {
                return Err(validation_error(
                    "The profile image must be a jpeg, png or gif",
                ))
            }
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| validation_error(e.to_string()))?;

        if data.len() > MAX_IMAGE_BYTES {
            return Err(validation_error("The profile image must be 2MB or smaller"));
        }

        upload = Some((extension, data));
        break;
    }

    let (extension, data) = upload.ok_or_else(|| validation_error("No file uploaded"))?;

    let relative_path = format!("profile_images/{}.{extension}", Ulid::new());

    let image_dir = PathBuf::from(&state.storage.root).join("profile_images");
    tokio::fs::create_dir_all(&image_dir).await?;
    tokio::fs::write(PathBuf::from(&state.storage.root).join(&relative_path), &data).await?;

    let conn = &mut db::connect(&state.db_pool).await?;
    let previous = UserProfileRecord::set_image(conn, auth.user.id, &relative_path).await?;

    if let Some(previous) = previous {
        // losing the stale file is not worth failing the request over
        let _ = tokio::fs::remove_file(PathBuf::from(&state.storage.root).join(previous)).await;
    }

    tracing::info!(user_id = auth.user.id, %relative_path, "Stored new profile image");

    Ok((
        StatusCode::OK,
        Json(UploadImageResponse {
            path: format!("/storage/{relative_path}"),
        }),
    ))
}

fn validation_error(message: impl ToString) -> AppError {
    AppError::new(
        StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Validation,
        Some(message.to_string()),
    )
}
