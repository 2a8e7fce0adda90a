//! This module contains all the models used in the application.
pub mod access_token;
pub mod email_verification;
pub mod password_reset;
pub mod sensor_reading;
pub mod user;
pub mod user_profile;
