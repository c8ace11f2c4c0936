//! Authentication session management

pub mod api;
pub mod controller;
pub mod guard;
pub mod http;
pub mod models;
pub mod token_store;
pub mod transport;
pub mod user_cache;
pub mod wire;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{AuthApi, LoginResponse, PermissionsResponse, RefreshResponse};
pub use controller::{Rehydration, SessionController};
pub use guard::{RefreshTiming, TransportGuard, UnauthorizedHandler, UnauthorizedHook};
pub use http::HttpAuthApi;
pub use models::{
    LoginRequest, LoginType, NewTokens, Role, SessionPhase, SessionState, SessionUser,
    StoragePreference, StoredTokens,
};
pub use token_store::TokenStore;
pub use transport::Transport;
pub use user_cache::UserCache;
