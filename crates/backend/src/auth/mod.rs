//! Google OAuth and browser sessions.
//!
//! This module provides:
//! - signed session cookies backed by an in-memory session store
//! - the consent, callback and re-consent handlers
//! - credential freshness checks and token refresh

pub mod credentials;
mod handlers;
mod jwt;
pub mod oauth_client;
pub mod session;
pub mod types;

pub use handlers::{authorize, index, oauth_callback, reauthorize};
pub use oauth_client::{GoogleOAuthClient, OAuthClient};
pub use session::{session_layer, SessionConfig, SessionContext, SessionStore};
