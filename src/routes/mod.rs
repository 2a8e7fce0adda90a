//! Routes for [axum::Router].

pub mod auth;
pub mod email;
pub mod fallback;
pub mod health;
pub mod password;
pub mod ping;
pub mod profile;
pub mod sensor;
