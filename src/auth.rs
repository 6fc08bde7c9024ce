//! Authentication context, scope-to-permission mapping, and the session
//! cache, per spec.md §3 and §6.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthErrorKind {
    #[error("missing token")]
    MissingToken,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    TokenExpired,
    #[error("invalid issuer")]
    InvalidIssuer,
    #[error("invalid audience")]
    InvalidAudience,
    #[error("token revoked")]
    TokenRevoked,
    #[error("verification failed")]
    VerificationFailed,
    #[error("invalid token")]
    InvalidToken,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Permissions {
    pub exec: bool,
    pub admin: bool,
    pub allowed_commands: Option<Vec<String>>,
    pub blocked_commands: Option<Vec<String>>,
    pub allowed_paths: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthContext {
    pub authenticated: bool,
    pub user_id: Option<String>,
    pub permissions: Permissions,
    pub scopes: Vec<String>,
    /// Token expiry (seconds since epoch), used by the session cache's
    /// dual-expiry check. `None` means the token never expires.
    pub exp: Option<u64>,
}

impl AuthContext {
    pub fn unauthenticated() -> Self {
        Self::default()
    }

    /// Map scopes to permissions, honoring a verbatim `bashx:permissions`
    /// claim when present, else inferring from the `bash:exec`/`bash:admin`
    /// scope set.
    pub fn from_claims(
        user_id: Option<String>,
        scopes: Vec<String>,
        explicit_permissions: Option<Permissions>,
        exp: Option<u64>,
    ) -> Self {
        let permissions = explicit_permissions.unwrap_or_else(|| Permissions {
            exec: scopes.iter().any(|s| s == "bash:exec"),
            admin: scopes.iter().any(|s| s == "bash:admin"),
            allowed_commands: None,
            blocked_commands: None,
            allowed_paths: None,
        });
        Self { authenticated: true, user_id, permissions, scopes, exp }
    }
}

/// Payload produced by token verification, prior to permission mapping.
#[derive(Debug, Clone)]
pub struct VerifiedClaims {
    pub subject: Option<String>,
    pub scopes: Vec<String>,
    pub permissions: Option<Permissions>,
    pub exp: Option<u64>,
}

/// Consumed externally: JWKS fetching, signature verification, issuer and
/// audience checks, clock tolerance, and revocation are all the verifier's
/// responsibility. This crate only calls it and maps the outcome.
#[async_trait]
pub trait JwtVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedClaims, AuthErrorKind>;
}

/// Extracts a bearer token from an `Authorization` header, falling back to
/// a named cookie.
pub fn extract_token(authorization_header: Option<&str>, cookies: &HashMap<String, String>, cookie_name: Option<&str>) -> Option<String> {
    if let Some(header) = authorization_header {
        if let Some(rest) = header.strip_prefix("Bearer ") {
            return Some(rest.trim().to_string());
        }
    }
    cookie_name.and_then(|name| cookies.get(name).cloned())
}

pub async fn authenticate(
    verifier: &dyn JwtVerifier,
    authorization_header: Option<&str>,
    cookies: &HashMap<String, String>,
    cookie_name: Option<&str>,
) -> Result<AuthContext, AuthErrorKind> {
    let token = extract_token(authorization_header, cookies, cookie_name).ok_or(AuthErrorKind::MissingToken)?;
    let claims = verifier.verify(&token).await?;
    Ok(AuthContext::from_claims(claims.subject, claims.scopes, claims.permissions, claims.exp))
}

struct CacheEntry {
    context: AuthContext,
    cached_at: Instant,
    last_used: Instant,
}

/// Token fingerprint → cached `AuthContext`, with both a cache TTL and the
/// token's own `exp` enforced on read, and an LRU cap (an Open Question in
/// the distilled spec, resolved here — see DESIGN.md).
pub struct SessionCache {
    ttl: Duration,
    max_entries: usize,
    entries: std::sync::Mutex<HashMap<String, CacheEntry>>,
    hits: std::sync::atomic::AtomicU64,
    misses: std::sync::atomic::AtomicU64,
}

#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

impl SessionCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries,
            entries: std::sync::Mutex::new(HashMap::new()),
            hits: std::sync::atomic::AtomicU64::new(0),
            misses: std::sync::atomic::AtomicU64::new(0),
        }
    }

    pub fn get(&self, token_fingerprint: &str, now_epoch_seconds: u64) -> Option<AuthContext> {
        let mut guard = self.entries.lock().unwrap();
        let evict = match guard.get(token_fingerprint) {
            Some(entry) => {
                let ttl_ok = entry.cached_at.elapsed() < self.ttl;
                let exp_ok = entry.context.exp.map(|e| now_epoch_seconds < e).unwrap_or(true);
                !(ttl_ok && exp_ok)
            }
            None => {
                self.misses.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                return None;
            }
        };
        if evict {
            guard.remove(token_fingerprint);
            self.misses.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            return None;
        }
        self.hits.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let entry = guard.get_mut(token_fingerprint).unwrap();
        entry.last_used = Instant::now();
        Some(entry.context.clone())
    }

    pub fn put(&self, token_fingerprint: String, context: AuthContext) {
        let mut guard = self.entries.lock().unwrap();
        if guard.len() >= self.max_entries && !guard.contains_key(&token_fingerprint) {
            if let Some(oldest_key) = guard.iter().min_by_key(|(_, e)| e.last_used).map(|(k, _)| k.clone()) {
                guard.remove(&oldest_key);
            }
        }
        let now = Instant::now();
        guard.insert(token_fingerprint, CacheEntry { context, cached_at: now, last_used: now });
    }

    pub fn invalidate(&self, token_fingerprint: &str) {
        self.entries.lock().unwrap().remove(token_fingerprint);
    }

    pub fn invalidate_user(&self, user_id: &str) {
        self.entries.lock().unwrap().retain(|_, e| e.context.user_id.as_deref() != Some(user_id));
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(std::sync::atomic::Ordering::Relaxed),
            misses: self.misses.load(std::sync::atomic::Ordering::Relaxed),
            size: self.entries.lock().unwrap().len(),
        }
    }
}
