//! Migration code

use anyhow::{anyhow, Result};
use diesel::{Connection, PgConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

/// Embed migrations into binary
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run pending migrations.
///
/// The migration harness is synchronous, so this runs on the blocking pool
/// against its own short-lived connection rather than one from the bb8 pool.
pub async fn run(database_url: &str) -> Result<()> {
    let url = database_url.to_string();

    tokio::task::spawn_blocking(move || {
        let mut conn = PgConnection::establish(&url)?;

        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| anyhow!("Could not run migrations: {e}"))?;

        Ok::<_, anyhow::Error>(())
    })
    .await??;

    Ok(())
}
