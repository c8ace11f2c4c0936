//! Development auth server implementing the session's server contract

pub mod routes;
pub mod server;
pub mod tokens;

pub use server::*;
