//! Helpers for tests: isolated server instances, request building and
//! common register/login flows.
#![allow(missing_docs, unreachable_pub)]

pub(crate) mod helpers;
pub(crate) mod route_builder;
pub(crate) mod test_context;
