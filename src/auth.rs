//! Identity resolution and the author-claim policy.
//!
//! Token format and issuance live in the auth service; this crate only asks
//! "who does this bearer token belong to" and "may they post as this author".

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::error::ApiError;
use crate::AppState;

/// Role granted unrestricted posting rights.
pub const ROLE_ADMIN: &str = "admin";

/// A resolved user identity.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: i64,
    pub username: String,
    pub role: String,
}

/// Token-validation boundary. An invalid or expired token resolves to `None`;
/// `Err` is reserved for the auth backend itself being unreachable.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Option<Identity>, ApiError>;
}

/// Whether `identity` may post under the claimed author name. Admins may post
/// as anyone; everyone else only as themselves.
pub fn can_post_as(identity: &Identity, claimed_author: &str) -> bool {
    identity.username == claimed_author || identity.role == ROLE_ADMIN
}

// ---------------------------------------------------------------------------
// Static token table (default composition root / tests)
// ---------------------------------------------------------------------------

/// In-memory token table. The production deployment swaps in a gateway backed
/// by the auth service.
#[derive(Default)]
pub struct StaticTokenAuth {
    tokens: Mutex<HashMap<String, Identity>>,
}

impl StaticTokenAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed tokens from `FORUM_API_TOKENS`, a comma-separated list of
    /// `token=username:role` entries.
    pub fn from_env() -> Self {
        let auth = Self::new();
        if let Ok(raw) = std::env::var("FORUM_API_TOKENS") {
            let mut next_id = 1;
            for entry in raw.split(',').filter(|e| !e.trim().is_empty()) {
                match entry.trim().split_once('=').and_then(|(token, rest)| {
                    rest.split_once(':').map(|(user, role)| (token, user, role))
                }) {
                    Some((token, username, role)) => {
                        auth.insert(
                            token,
                            Identity {
                                user_id: next_id,
                                username: username.to_string(),
                                role: role.to_string(),
                            },
                        );
                        next_id += 1;
                    }
                    None => {
                        tracing::warn!(entry, "malformed FORUM_API_TOKENS entry, skipping");
                    }
                }
            }
        }
        auth
    }

    pub fn insert(&self, token: &str, identity: Identity) {
        self.tokens
            .lock()
            .unwrap()
            .insert(token.to_string(), identity);
    }
}

#[async_trait]
impl AuthGateway for StaticTokenAuth {
    async fn resolve(&self, token: &str) -> Result<Option<Identity>, ApiError> {
        Ok(self.tokens.lock().unwrap().get(token).cloned())
    }
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// Authenticated user extracted from the `Authorization: Bearer <token>`
/// header. A missing or unresolvable token rejects the request outright;
/// there is no anonymous fallback.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header format"))?;

        let identity = state
            .auth
            .resolve(token)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Invalid or expired token"))?;

        Ok(AuthUser(identity))
    }
}
