//! Request handlers.

pub mod auth;
pub mod experiences;
