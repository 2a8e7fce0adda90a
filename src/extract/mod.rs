//! Custom axum extractors.

pub mod authenticated;
