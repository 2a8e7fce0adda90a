//! User Account Model
use crate::db::{schema::users, Conn};
use chrono::NaiveDateTime;
use diesel::{
    pg::Pg, ExpressionMethods, Insertable, OptionalExtension, QueryDsl, Queryable, Selectable,
    SelectableHelper,
};
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// New user row (for registration)
#[derive(Insertable, Debug)]
#[diesel(table_name = users)]
pub struct NewUser {
    /// Display name
    pub name: String,
    /// Email address, unique across accounts
    pub email: String,
    /// argon2 PHC string, never the plaintext password
    pub password_hash: String,
}

/// User Account Record
#[derive(Debug, Queryable, Selectable, Clone)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(Pg))]
pub struct UserRecord {
    /// Internal Database Identifier
    pub id: i32,

    /// Inserted at timestamp
    pub inserted_at: NaiveDateTime,
    /// Updated at timestamp
    pub updated_at: NaiveDateTime,

    /// Display name
    pub name: String,
    /// Email address associated with the account
    pub email: String,
    /// argon2 PHC string of the account password
    pub password_hash: String,
}

/// Public view of a user account. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    /// Account identifier
    pub id: i32,
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
    /// Inserted at timestamp
    pub inserted_at: NaiveDateTime,
    /// Updated at timestamp
    pub updated_at: NaiveDateTime,
}

impl UserRecord {
    /// Create a new account row.
    pub async fn create(
        conn: &mut Conn<'_>,
        new_user: NewUser,
    ) -> Result<Self, diesel::result::Error> {
        tracing::debug!(email = %new_user.email, "Creating new user record");

        diesel::insert_into(users::table)
            .values(&new_user)
            .returning(UserRecord::as_select())
            .get_result(conn)
            .await
    }

    /// Look up an account by email.
    pub async fn find_by_email(
        conn: &mut Conn<'_>,
        email: &str,
    ) -> Result<Option<Self>, diesel::result::Error> {
        users::table
            .filter(users::email.eq(email))
            .select(UserRecord::as_select())
            .first(conn)
            .await
            .optional()
    }

    /// Look up an account by id.
    pub async fn find_by_id(
        conn: &mut Conn<'_>,
        user_id: i32,
    ) -> Result<Option<Self>, diesel::result::Error> {
        users::table
            .find(user_id)
            .select(UserRecord::as_select())
            .first(conn)
            .await
            .optional()
    }

    /// Overwrite the stored password hash.
    pub async fn set_password_hash(
        conn: &mut Conn<'_>,
        user_id: i32,
        password_hash: &str,
    ) -> Result<(), diesel::result::Error> {
        diesel::update(users::table.find(user_id))
            .set((
                users::password_hash.eq(password_hash),
                users::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Change the display name.
    pub async fn set_name(
        conn: &mut Conn<'_>,
        user_id: i32,
        name: &str,
    ) -> Result<(), diesel::result::Error> {
        diesel::update(users::table.find(user_id))
            .set((users::name.eq(name), users::updated_at.eq(diesel::dsl::now)))
            .execute(conn)
            .await?;

        Ok(())
    }

    /// The public view of this account.
    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            inserted_at: self.inserted_at,
            updated_at: self.updated_at,
        }
    }
}
