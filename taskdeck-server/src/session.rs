//! Session tokens and cookies.
//!
//! Login issues an HS256-signed JWT with a fixed one-hour validity, carried
//! in an `HttpOnly`, `SameSite=Strict` cookie. Verification collapses every
//! failure mode (malformed token, bad signature, expiry) into a single
//! "unauthenticated" outcome; the route guard in [`crate::server`] turns
//! that into a redirect to the login entry point.

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
pub use taskdeck_core::protocol::SESSION_COOKIE;
use thiserror::Error;

/// Fallback signing secret when none is configured. Carried over from the
/// original deployment; a real deployment must override it (the server
/// warns at startup when it is in effect).
pub const DEFAULT_JWT_SECRET: &str = "AAds89hfw843uifnn8w8rf28ndf920j9n";

/// Session validity in seconds (one hour).
pub const SESSION_TTL_SECS: i64 = 60 * 60;

/// Path prefixes that bypass the session guard entirely: the login page and
/// the auth API (login and logout submissions).
pub const PUBLIC_PREFIXES: &[&str] = &["/login", "/api/auth"];

/// Errors from session token handling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The token is missing, malformed, expired, or carries a bad
    /// signature. Deliberately undifferentiated.
    #[error("invalid session token")]
    Invalid,
    /// Token signing failed.
    #[error("failed to sign session token")]
    Sign,
}

/// JWT claims for a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username the session was issued for.
    pub sub: String,
    /// Expiry as seconds since epoch.
    pub exp: usize,
}

/// HS256 signing and verification keys derived from the shared secret.
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    default_secret: bool,
}

impl SessionKeys {
    /// Derives keys from the given secret.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            default_secret: secret == DEFAULT_JWT_SECRET,
        }
    }

    /// True when running on the compiled-in fallback secret.
    #[must_use]
    pub const fn is_default_secret(&self) -> bool {
        self.default_secret
    }

    /// Issues a signed token for the given username, valid for one hour.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Sign`] if encoding fails.
    pub fn issue(&self, username: &str) -> Result<String, SessionError> {
        let exp = chrono::Utc::now().timestamp().saturating_add(SESSION_TTL_SECS);
        let claims = Claims {
            sub: username.to_string(),
            exp: usize::try_from(exp).unwrap_or(usize::MAX),
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
            .map_err(|_| SessionError::Sign)
    }

    /// Verifies a token's signature and expiry.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Invalid`] for any failure; no distinction is
    /// surfaced between malformed, forged, and expired tokens.
    pub fn verify(&self, token: &str) -> Result<Claims, SessionError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| SessionError::Invalid)
    }
}

/// Builds the `Set-Cookie` value for a fresh session.
#[must_use]
pub fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; Max-Age={SESSION_TTL_SECS}; HttpOnly; SameSite=Strict")
}

/// Builds the `Set-Cookie` value that clears the session (already expired).
#[must_use]
pub fn expired_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; Max-Age=0; HttpOnly; SameSite=Strict")
}

/// Extracts the session token from a `Cookie:` request header value.
#[must_use]
pub fn token_from_cookie_header(header: &str) -> Option<&str> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
        .filter(|token| !token.is_empty())
}

/// True when the path bypasses the session guard.
#[must_use]
pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}
