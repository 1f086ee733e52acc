//! # API Module
//!
//! HTTP endpoints for the local callback server that backs the
//! authorization flow:
//!
//! - [`callback`] - receives Spotify's OAuth redirect and stores the
//!   one-time authorization code for the driver to exchange.
//! - [`health`] - status and version for quick liveness checks.
//!
//! Built on [Axum](https://docs.rs/axum); the router lives in
//! [`crate::server`].

mod callback;
mod health;

pub use callback::callback;
pub use health::health;
