//! Authentication hook: turning a bearer token into a [`Uid`].

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use breachline_protocol::Uid;
use rand::Rng;

use crate::SessionError;

/// Resolves a client's bearer token to the identity provider's user id.
///
/// Called once per connection during the handshake. Implementations
/// must be shareable across connection tasks.
///
/// # Example
///
/// ```rust
/// use breachline_protocol::Uid;
/// use breachline_session::{Authenticator, SessionError};
///
/// /// Accepts `user:<uid>` tokens. Development only.
/// struct PrefixAuthenticator;
///
/// impl Authenticator for PrefixAuthenticator {
///     async fn authenticate(&self, token: &str) -> Result<Uid, SessionError> {
///         let raw = token
///             .strip_prefix("user:")
///             .ok_or_else(|| SessionError::AuthFailed("missing prefix".into()))?;
///         Uid::new(raw).map_err(|e| SessionError::AuthFailed(e.to_string()))
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Validates `token` and returns who it belongs to.
    ///
    /// # Errors
    /// Returns [`SessionError::AuthFailed`] if the token is not accepted.
    fn authenticate(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<Uid, SessionError>> + Send;
}

/// Bearer tokens issued in-process.
///
/// Tokens are 128-bit random hex strings. With
/// [`insecure_uid_tokens`](Self::insecure_uid_tokens) enabled, a token that
/// was never issued is accepted as a literal uid instead.
#[derive(Debug, Default)]
pub struct TokenAuthenticator {
    tokens: RwLock<HashMap<String, Uid>>,
    uid_tokens: bool,
}

impl TokenAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept any well-formed uid as its own token.
    pub fn insecure_uid_tokens(mut self) -> Self {
        self.uid_tokens = true;
        self
    }

    /// Issues a fresh token for `uid`.
    pub fn issue(&self, uid: Uid) -> String {
        let token = generate_token();
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.clone(), uid);
        token
    }

    /// Registers a caller-chosen token for `uid`, replacing any previous
    /// owner of that token.
    pub fn register(&self, token: impl Into<String>, uid: Uid) {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.into(), uid);
    }

    /// Revokes a token. Returns `true` if it was known.
    pub fn revoke(&self, token: &str) -> bool {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token)
            .is_some()
    }

    fn lookup(&self, token: &str) -> Option<Uid> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .cloned()
    }
}

impl Authenticator for TokenAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<Uid, SessionError> {
        if let Some(uid) = self.lookup(token) {
            return Ok(uid);
        }
        if self.uid_tokens {
            return Uid::new(token).map_err(|e| SessionError::AuthFailed(e.to_string()));
        }
        tracing::debug!("rejected unknown token");
        Err(SessionError::AuthFailed("unknown token".into()))
    }
}

/// 16 random bytes as 32 lowercase hex characters.
fn generate_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(raw: &str) -> Uid {
        Uid::new(raw).unwrap()
    }

    #[tokio::test]
    async fn test_authenticate_issued_token_returns_uid() {
        let auth = TokenAuthenticator::new();
        let token = auth.issue(uid("alice"));

        assert_eq!(auth.authenticate(&token).await.unwrap(), uid("alice"));
    }

    #[tokio::test]
    async fn test_authenticate_unknown_token_fails() {
        let auth = TokenAuthenticator::new();
        let result = auth.authenticate("alice").await;
        assert!(matches!(result, Err(SessionError::AuthFailed(_))));
    }

    #[tokio::test]
    async fn test_authenticate_revoked_token_fails() {
        let auth = TokenAuthenticator::new();
        let token = auth.issue(uid("alice"));

        assert!(auth.revoke(&token));
        assert!(auth.authenticate(&token).await.is_err());
        assert!(!auth.revoke(&token));
    }

    #[tokio::test]
    async fn test_authenticate_uid_tokens_accepts_raw_uid() {
        let auth = TokenAuthenticator::new().insecure_uid_tokens();
        assert_eq!(auth.authenticate("bob").await.unwrap(), uid("bob"));
        assert!(auth.authenticate("not/a/uid").await.is_err());
    }

    #[tokio::test]
    async fn test_register_prefers_table_over_uid_tokens() {
        let auth = TokenAuthenticator::new().insecure_uid_tokens();
        auth.register("bob", uid("carol"));
        assert_eq!(auth.authenticate("bob").await.unwrap(), uid("carol"));
    }

    #[test]
    fn test_generate_token_is_32_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }
}
