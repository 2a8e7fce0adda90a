//! The Axum Application State

use crate::{db::Pool, settings, setups::ServerSetup};
use anyhow::{anyhow, Result};
use std::sync::Arc;

#[derive(Clone)]
/// Global application route state.
pub struct AppState<S: ServerSetup> {
    /// The database pool
    pub db_pool: Pool,
    /// The service that sends verification & reset codes
    pub code_sender: S::CodeSender,
    /// File storage settings (profile images)
    pub storage: Arc<settings::Storage>,
}

/// Builder for [`AppState`]
#[derive(Debug)]
pub struct AppStateBuilder<S: ServerSetup> {
    db_pool: Option<Pool>,
    code_sender: Option<S::CodeSender>,
    storage: Option<settings::Storage>,
}

impl<S: ServerSetup> Default for AppStateBuilder<S> {
    fn default() -> Self {
        Self {
            db_pool: None,
            code_sender: None,
            storage: None,
        }
    }
}

impl<S: ServerSetup> AppStateBuilder<S> {
    /// Finalize the builder and return the [`AppState`]
    pub fn finalize(self) -> Result<AppState<S>> {
        let db_pool = self.db_pool.ok_or_else(|| anyhow!("db_pool is required"))?;

        let code_sender = self
            .code_sender
            .ok_or_else(|| anyhow!("code_sender is required"))?;

        let storage = Arc::new(
            self.storage
                .ok_or_else(|| anyhow!("storage settings are required"))?,
        );

        Ok(AppState {
            db_pool,
            code_sender,
            storage,
        })
    }

    /// Set the database pool
    pub fn with_db_pool(mut self, db_pool: Pool) -> Self {
        self.db_pool = Some(db_pool);
        self
    }

    /// Set the service that sends verification & reset codes
    pub fn with_code_sender(mut self, code_sender: S::CodeSender) -> Self {
        self.code_sender = Some(code_sender);
        self
    }

    /// Set the file storage settings
    pub fn with_storage(mut self, storage: settings::Storage) -> Self {
        self.storage = Some(storage);
        self
    }
}

impl<S> std::fmt::Debug for AppState<S>
where
    S: ServerSetup,
    S::CodeSender: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("db_pool", &self.db_pool)
            .field("code_sender", &self.code_sender)
            .field("storage", &self.storage)
            .finish()
    }
}
