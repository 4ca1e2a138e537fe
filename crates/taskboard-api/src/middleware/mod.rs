//! API Middleware
//!
//! Authentication layer that turns a session token into a [`taskboard_policy::Caller`].

pub mod auth;

pub use auth::{require_auth, SESSION_COOKIE};
