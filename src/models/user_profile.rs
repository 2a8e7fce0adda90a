//! User Profile Model
use crate::db::{schema::user_profiles, Conn};
use chrono::NaiveDateTime;
use diesel::{
    pg::Pg, AsChangeset, ExpressionMethods, OptionalExtension, QueryDsl, Queryable, Selectable,
    SelectableHelper,
};
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User Profile Record
#[derive(Debug, Queryable, Selectable, Clone)]
#[diesel(table_name = user_profiles)]
#[diesel(check_for_backend(Pg))]
pub struct UserProfileRecord {
    /// Internal Database Identifier
    pub id: i32,

    /// Inserted at timestamp
    pub inserted_at: NaiveDateTime,
    /// Updated at timestamp
    pub updated_at: NaiveDateTime,

    /// Account this profile belongs to
    pub user_id: i32,

    /// Postal address
    pub address: Option<String>,
    /// Phone number
    pub phone_number: Option<String>,
    /// Gender
    pub gender: Option<String>,
    /// Path of the profile image relative to the storage root
    pub profile_image: Option<String>,
}

/// Partial profile update. `None` fields are left untouched.
#[derive(AsChangeset, Debug, Default, Clone)]
#[diesel(table_name = user_profiles)]
pub struct ProfileChanges {
    /// New postal address
    pub address: Option<String>,
    /// New phone number
    pub phone_number: Option<String>,
    /// New gender
    pub gender: Option<String>,
}

/// Public view of a profile.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    /// Postal address
    pub address: Option<String>,
    /// Phone number
    pub phone_number: Option<String>,
    /// Gender
    pub gender: Option<String>,
    /// URL path of the profile image, if one was uploaded
    pub profile_image: Option<String>,
}

impl UserProfileRecord {
    /// Create the (empty) profile row for a freshly registered account.
    pub async fn create(
        conn: &mut Conn<'_>,
        user_id: i32,
    ) -> Result<Self, diesel::result::Error> {
        diesel::insert_into(user_profiles::table)
            .values(user_profiles::user_id.eq(user_id))
            .returning(UserProfileRecord::as_select())
            .get_result(conn)
            .await
    }

    /// Look up the profile of an account.
    pub async fn find_by_user(
        conn: &mut Conn<'_>,
        user_id: i32,
    ) -> Result<Option<Self>, diesel::result::Error> {
        user_profiles::table
            .filter(user_profiles::user_id.eq(user_id))
            .select(UserProfileRecord::as_select())
            .first(conn)
            .await
            .optional()
    }

    /// Apply a partial update.
    pub async fn update(
        conn: &mut Conn<'_>,
        user_id: i32,
        changes: ProfileChanges,
    ) -> Result<Self, diesel::result::Error> {
        diesel::update(user_profiles::table.filter(user_profiles::user_id.eq(user_id)))
            .set((changes, user_profiles::updated_at.eq(diesel::dsl::now)))
            .returning(UserProfileRecord::as_select())
            .get_result(conn)
            .await
    }

    /// Store a new profile image path, returning the previous one (so the
    /// caller can delete the file).
    pub async fn set_image(
        conn: &mut Conn<'_>,
        user_id: i32,
        path: &str,
    ) -> Result<Option<String>, diesel::result::Error> {
        let previous: Option<Option<String>> = user_profiles::table
            .filter(user_profiles::user_id.eq(user_id))
            .select(user_profiles::profile_image)
            .first(conn)
            .await
            .optional()?;

        diesel::update(user_profiles::table.filter(user_profiles::user_id.eq(user_id)))
            .set((
                user_profiles::profile_image.eq(path),
                user_profiles::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .await?;

        Ok(previous.flatten())
    }

    /// The public view of this profile. The image path is rendered as the
    /// URL it is served under.
    pub fn to_profile(&self) -> UserProfile {
        UserProfile {
            address: self.address.clone(),
            phone_number: self.phone_number.clone(),
            gender: self.gender.clone(),
            profile_image: self
                .profile_image
                .as_ref()
                .map(|path| format!("/storage/{path}")),
        }
    }
}
