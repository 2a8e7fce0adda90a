//! Password Reset Model
//!
//! One row per email, moving through Idle → CodeIssued → TokenIssued and
//! back to Idle (row deleted) on a successful reset. The code and the token
//! have independent validity windows; the token exists only as a salted
//! argon2 hash from the moment it is issued.

use crate::db::{schema::password_resets, Conn};
use crate::error::{AppError, AppResult};
use crate::password;
use chrono::{Duration, NaiveDateTime, Utc};
use diesel::{
    pg::Pg, BoolExpressionMethods, ExpressionMethods, OptionalExtension, QueryDsl, Queryable,
    Selectable, SelectableHelper,
};
use diesel_async::RunQueryDsl;
use rand::{distributions::Alphanumeric, Rng};

/// How long a reset code stays valid, in minutes.
pub const CODE_TTL_MINUTES: i64 = 60;

/// How long a reset token stays valid, in minutes.
pub const TOKEN_TTL_MINUTES: i64 = 15;

const TOKEN_LENGTH: usize = 64;

/// Password Reset Record
#[derive(Debug, Queryable, Selectable, Clone)]
#[diesel(table_name = password_resets)]
#[diesel(check_for_backend(Pg))]
pub struct PasswordReset {
    /// Internal Database Identifier
    pub id: i32,

    /// Inserted at timestamp
    pub inserted_at: NaiveDateTime,
    /// Updated at timestamp
    pub updated_at: NaiveDateTime,

    /// Email address the reset was requested for
    pub email: String,

    /// The emailed code. Nulled once the token is issued.
    pub code: Option<String>,
    /// When the code stops being valid
    pub code_expires_at: Option<NaiveDateTime>,
    /// argon2 hash of the reset token. The plaintext token is never stored.
    pub token_hash: Option<String>,
    /// When the token stops being valid
    pub token_expires_at: Option<NaiveDateTime>,
}

impl PasswordReset {
    /// Start (or restart) a reset for an email: fresh code, fresh code
    /// window, any previously issued token cleared. Concurrent requests for
    /// the same email race benignly; the last writer wins.
    ///
    /// Returns the record and the plaintext code for the mail dispatch.
    pub async fn request(
        conn: &mut Conn<'_>,
        email: &str,
    ) -> Result<(Self, String), diesel::result::Error> {
        let code = generate_code();
        let code_expires_at = Utc::now().naive_utc() + Duration::minutes(CODE_TTL_MINUTES);

        tracing::debug!(email, "Issuing new password reset code");

        let record = diesel::insert_into(password_resets::table)
            .values((
                password_resets::email.eq(email),
                password_resets::code.eq(&code),
                password_resets::code_expires_at.eq(code_expires_at),
            ))
            .on_conflict(password_resets::email)
            .do_update()
            .set((
                password_resets::code.eq(&code),
                password_resets::code_expires_at.eq(code_expires_at),
                password_resets::token_hash.eq(None::<String>),
                password_resets::token_expires_at.eq(None::<NaiveDateTime>),
                password_resets::updated_at.eq(diesel::dsl::now),
            ))
            .returning(PasswordReset::as_select())
            .get_result(conn)
            .await?;

        Ok((record, code))
    }

    /// Exchange a verified code for a reset token.
    ///
    /// The plaintext token is returned exactly once; only its argon2 hash
    /// is persisted, and the code is superseded (nulled) in the same write.
    /// Validity is `now < code_expires_at`; exactly at expiry counts as
    /// expired.
    pub async fn verify_code(
        conn: &mut Conn<'_>,
        email: &str,
        submitted: &str,
    ) -> AppResult<String> {
        let record: Option<Self> = password_resets::table
            .filter(password_resets::email.eq(email))
            .select(PasswordReset::as_select())
            .first(conn)
            .await
            .optional()?;

        let record = record.ok_or_else(AppError::invalid_code)?;
        let code = record.code.as_deref().ok_or_else(AppError::invalid_code)?;

        if code != submitted {
            return Err(AppError::invalid_code());
        }

        let expires_at = record
            .code_expires_at
            .ok_or_else(AppError::invalid_code)?;

        if Utc::now().naive_utc() >= expires_at {
            return Err(AppError::code_expired());
        }

        let token = generate_token();
        let token_hash = password::hash(&token)?;
        let token_expires_at = Utc::now().naive_utc() + Duration::minutes(TOKEN_TTL_MINUTES);

        diesel::update(password_resets::table.find(record.id))
            .set((
                password_resets::code.eq(None::<String>),
                password_resets::code_expires_at.eq(None::<NaiveDateTime>),
                password_resets::token_hash.eq(&token_hash),
                password_resets::token_expires_at.eq(token_expires_at),
                password_resets::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .await?;

        Ok(token)
    }

    /// Redeem a reset token, deleting its record (single use).
    ///
    /// Candidates are the records whose token window is still open; the
    /// expiry predicate is evaluated once, inside the query. Because the
    /// stored hash is salted there is no index to look the token up by, so
    /// every candidate is verified in turn. O(n) over live resets, which is
    /// bounded by the 15 minute window, and the scan is what keeps the
    /// token out of the database in plaintext.
    ///
    /// A consumed, expired or never-issued token all fail identically.
    pub async fn consume_token(conn: &mut Conn<'_>, token: &str) -> AppResult<Self> {
        let candidates: Vec<Self> = password_resets::table
            .filter(password_resets::token_hash.is_not_null())
            .filter(password_resets::token_expires_at.gt(diesel::dsl::now))
            .select(PasswordReset::as_select())
            .load(conn)
            .await?;

        let record = candidates
            .into_iter()
            .find(|candidate| {
                candidate
                    .token_hash
                    .as_deref()
                    .map(|hash| password::verify(token, hash))
                    .unwrap_or(false)
            })
            .ok_or_else(AppError::invalid_or_expired_token)?;

        diesel::delete(password_resets::table.find(record.id))
            .execute(conn)
            .await?;

        Ok(record)
    }

    /// Delete rows whose every validity window has passed.
    ///
    /// Request handling never calls this; the periodic sweep in `main` does.
    pub async fn purge_expired(conn: &mut Conn<'_>) -> Result<usize, diesel::result::Error> {
        diesel::delete(
            password_resets::table
                .filter(
                    password_resets::code_expires_at
                        .is_null()
                        .or(password_resets::code_expires_at.le(diesel::dsl::now)),
                )
                .filter(
                    password_resets::token_expires_at
                        .is_null()
                        .or(password_resets::token_expires_at.le(diesel::dsl::now)),
                ),
        )
        .execute(conn)
        .await
    }
}

/// Generate a code that can be sent to the user.
fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    let code: u32 = rng.gen_range(100_000..=999_999);
    format!("{code}")
}

/// Generate an opaque reset token.
fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generated_tokens_differ() {
        assert_ne!(generate_token(), generate_token());
    }
}
