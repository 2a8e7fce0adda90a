//! This abstracts floodwatch server side-effects into "setups".
//!
//! This module defines the trait, submodules define test & production
//! collections of implementations.
use anyhow::Result;
use async_trait::async_trait;

pub mod prod;

/// This trait groups type parameters to the server's `AppState` struct.
///
/// It captures the setup of the server, distinguishing between e.g.
/// unit testing & production setups.
pub trait ServerSetup: Clone + Send + Sync + 'static {
    /// Which implementation to use to send verification & reset codes
    type CodeSender: CodeSender;
}

/// The service that delivers verification and reset codes by email
#[async_trait]
pub trait CodeSender: Clone + Send + Sync + std::fmt::Debug + 'static {
    /// Send an email verification code
    async fn send_verification_code(&self, email: &str, code: &str) -> Result<()>;

    /// Send a password reset code
    async fn send_reset_code(&self, email: &str, code: &str) -> Result<()>;
}
