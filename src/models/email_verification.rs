//! Email Verification Model
use crate::db::{schema::email_verifications, Conn};
use crate::error::{AppError, AppResult};
use chrono::{Duration, NaiveDateTime, Utc};
use diesel::{
    pg::Pg, ExpressionMethods, OptionalExtension, QueryDsl, Queryable, Selectable,
    SelectableHelper,
};
use diesel_async::RunQueryDsl;
use rand::Rng;

/// How long a verification code stays valid, in minutes.
///
/// Same window as the reset code, so expiry is enforced uniformly across
/// both lifecycles.
pub const CODE_TTL_MINUTES: i64 = 60;

/// Email Verification Record
#[derive(Debug, Queryable, Selectable, Clone)]
#[diesel(table_name = email_verifications)]
#[diesel(check_for_backend(Pg))]
pub struct EmailVerification {
    /// Internal Database Identifier
    pub id: i32,

    /// Inserted at timestamp
    pub inserted_at: NaiveDateTime,
    /// Updated at timestamp
    pub updated_at: NaiveDateTime,

    /// Account this verification belongs to
    pub user_id: i32,

    /// The verification code. Cleared once consumed.
    pub code: Option<String>,
    /// When the code stops being valid
    pub code_expires_at: Option<NaiveDateTime>,
    /// When the email was verified, if it was
    pub verified_at: Option<NaiveDateTime>,
}

impl EmailVerification {
    /// Issue a fresh code for an account, replacing any prior unconsumed
    /// one. Returns the record and the plaintext code for the mail dispatch.
    pub async fn request(
        conn: &mut Conn<'_>,
        user_id: i32,
    ) -> Result<(Self, String), diesel::result::Error> {
        let code = generate_code();
        let code_expires_at = Utc::now().naive_utc() + Duration::minutes(CODE_TTL_MINUTES);

        tracing::debug!(user_id, "Issuing new email verification code");

        let record = diesel::insert_into(email_verifications::table)
            .values((
                email_verifications::user_id.eq(user_id),
                email_verifications::code.eq(&code),
                email_verifications::code_expires_at.eq(code_expires_at),
            ))
            .on_conflict(email_verifications::user_id)
            .do_update()
            .set((
                email_verifications::code.eq(&code),
                email_verifications::code_expires_at.eq(code_expires_at),
                email_verifications::updated_at.eq(diesel::dsl::now),
            ))
            .returning(EmailVerification::as_select())
            .get_result(conn)
            .await?;

        Ok((record, code))
    }

    /// Confirm a submitted code. On success the verified-at stamp is set
    /// and the code is cleared, so the same code can't be replayed.
    ///
    /// Validity is `now < code_expires_at`; exactly at expiry counts as
    /// expired.
    pub async fn confirm(conn: &mut Conn<'_>, user_id: i32, submitted: &str) -> AppResult<Self> {
        let record: Option<Self> = email_verifications::table
            .filter(email_verifications::user_id.eq(user_id))
            .select(EmailVerification::as_select())
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

        let record = diesel::update(email_verifications::table.find(record.id))
            .set((
                email_verifications::verified_at.eq(diesel::dsl::now),
                email_verifications::code.eq(None::<String>),
                email_verifications::code_expires_at.eq(None::<NaiveDateTime>),
                email_verifications::updated_at.eq(diesel::dsl::now),
            ))
            .returning(EmailVerification::as_select())
            .get_result(conn)
            .await?;

        Ok(record)
    }

    /// Whether the account's email has been verified.
    pub async fn is_verified(
        conn: &mut Conn<'_>,
        user_id: i32,
    ) -> Result<bool, diesel::result::Error> {
        let verified_at: Option<Option<NaiveDateTime>> = email_verifications::table
            .filter(email_verifications::user_id.eq(user_id))
            .select(email_verifications::verified_at)
            .first(conn)
            .await
            .optional()?;

        Ok(verified_at.flatten().is_some())
    }
}

/// Generate a code that can be sent to the user.
fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    let code: u32 = rng.gen_range(100_000..=999_999);
    format!("{code}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_code_is_six_digits() {
        for _ in 0..1000 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            let numeric: u32 = code.parse().unwrap();
            assert!((100_000..=999_999).contains(&numeric));
        }
    }
}
