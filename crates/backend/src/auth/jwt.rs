//! Signed session tokens carried in the session cookie.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use super::session::SessionConfig;
use super::types::Claims;

/// Create a token naming the given session.
pub fn create_token(
    config: &SessionConfig,
    session_id: Uuid,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let exp = now + config.ttl;

    let claims = Claims {
        sub: session_id.to_string(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Validate a token and return the session id it names.
pub fn validate_token(config: &SessionConfig, token: &str) -> Option<Uuid> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )
    .ok()?;

    Uuid::parse_str(&token_data.claims.sub).ok()
}
