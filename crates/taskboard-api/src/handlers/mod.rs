//! HTTP handlers for API endpoints
//!
//! Handlers only translate between HTTP and the managers in `taskboard-core`;
//! every authorization decision is made below this layer.

pub mod auth;
pub mod health;
pub mod projects;
pub mod tasks;
pub mod users;
