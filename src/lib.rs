//! mcn-auth - client-side auth session manager for the MCN operations platform
//!
//! Keeps the access/refresh token pair in local or session storage, refreshes
//! it before expiry, restores it on start and signs the user out when the
//! server rejects it.

pub mod auth;
pub mod cli;
pub mod config;
pub mod devserver;
pub mod error;
pub mod storage;

pub use auth::{SessionController, SessionState, SessionUser};
pub use config::Config;
pub use error::Error;
