//! Opaque bearer token model.
//!
//! Tokens are high-entropy random strings handed out at login and stored
//! only as keyed blake3 digests. Unlike passwords they don't need a salt,
//! which keeps the lookup a single indexed query.

use crate::db::{
    schema::{access_tokens, users},
    Conn,
};
use crate::models::user::UserRecord;
use chrono::NaiveDateTime;
use diesel::{
    pg::Pg, ExpressionMethods, OptionalExtension, QueryDsl, Queryable, Selectable,
    SelectableHelper,
};
use diesel_async::RunQueryDsl;
use hex::ToHex;
use rand::{distributions::Alphanumeric, Rng};

const TOKEN_LENGTH: usize = 64;

/// Access Token Record
#[derive(Debug, Queryable, Selectable, Clone)]
#[diesel(table_name = access_tokens)]
#[diesel(check_for_backend(Pg))]
pub struct AccessToken {
    /// Internal Database Identifier
    pub id: i32,
    /// Inserted at timestamp
    pub inserted_at: NaiveDateTime,
    /// Owning account
    pub user_id: i32,
    /// blake3 digest of the plaintext token
    pub token_hash: String,
}

impl AccessToken {
    /// Issue a fresh token for an account. The plaintext is returned to the
    /// caller exactly once and never stored.
    pub async fn issue(conn: &mut Conn<'_>, user_id: i32) -> Result<String, diesel::result::Error> {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect();

        diesel::insert_into(access_tokens::table)
            .values((
                access_tokens::user_id.eq(user_id),
                access_tokens::token_hash.eq(hash_token(&token)),
            ))
            .execute(conn)
            .await?;

        Ok(token)
    }

    /// Resolve a presented bearer token to its account, if any.
    pub async fn authenticate(
        conn: &mut Conn<'_>,
        token: &str,
    ) -> Result<Option<UserRecord>, diesel::result::Error> {
        access_tokens::table
            .inner_join(users::table)
            .filter(access_tokens::token_hash.eq(hash_token(token)))
            .select(UserRecord::as_select())
            .first(conn)
            .await
            .optional()
    }

    /// Delete every token of an account (logout).
    pub async fn revoke_all(
        conn: &mut Conn<'_>,
        user_id: i32,
    ) -> Result<usize, diesel::result::Error> {
        diesel::delete(access_tokens::table.filter(access_tokens::user_id.eq(user_id)))
            .execute(conn)
            .await
    }
}

/// Compute the storage digest of a plaintext token.
fn hash_token(token: &str) -> String {
    blake3::derive_key(
        "floodwatch-server 2024-10-24 access tokens",
        token.as_bytes(),
    )
    .encode_hex()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_is_deterministic() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_ne!(hash_token("abc"), hash_token("abd"));
    }
}
