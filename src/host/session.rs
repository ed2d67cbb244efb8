// Session token capability
//
// Reads the bearer token the host stored under `token`. JWTs are checked for expiry only;
// the signature belongs to the backend. Opaque tokens are passed through unchanged.

use crate::error::WizardError;
use crate::host::storage::KeyValueStore;
use crate::security::crypto::token_fingerprint;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;

pub const TOKEN_KEY: &str = "token";

#[derive(Debug, Deserialize)]
struct ExpiryClaims {
    exp: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Missing,
    Expired,
    /// A JWT with a future (or absent) `exp`.
    Valid,
    /// Not a decodable JWT; left to the backend.
    Opaque,
}

#[derive(Clone)]
pub struct Session {
    store: Arc<dyn KeyValueStore>,
}

impl Session {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn token(&self) -> Option<String> {
        self.store
            .get(TOKEN_KEY)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }

    pub fn sign_in(&self, token: &str) -> anyhow::Result<()> {
        log::info!(
            "[PHASE: host] [STEP: session] storing token fp={}",
            token_fingerprint(token)
        );
        self.store.set(TOKEN_KEY, token)
    }

    pub fn sign_out(&self) -> anyhow::Result<()> {
        self.store.remove(TOKEN_KEY)
    }

    pub fn state(&self) -> TokenState {
        match self.token() {
            None => TokenState::Missing,
            Some(token) => classify(&token, chrono::Utc::now().timestamp()),
        }
    }

    /// Token for the `Authorization` header, or `AuthenticationRequired`.
    pub fn bearer_token(&self) -> Result<String, WizardError> {
        let token = self.token().ok_or_else(|| {
            log::warn!("[PHASE: host] [STEP: session] no token stored");
            WizardError::AuthenticationRequired
        })?;
        match classify(&token, chrono::Utc::now().timestamp()) {
            TokenState::Expired => {
                log::warn!(
                    "[PHASE: host] [STEP: session] token expired fp={}",
                    token_fingerprint(&token)
                );
                Err(WizardError::AuthenticationRequired)
            }
            _ => Ok(token),
        }
    }
}

fn classify(token: &str, now: i64) -> TokenState {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();

    match decode::<ExpiryClaims>(token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(data) => match data.claims.exp {
            Some(exp) if exp <= now => TokenState::Expired,
            _ => TokenState::Valid,
        },
        Err(e) => {
            log::debug!("[PHASE: host] [STEP: session] treating token as opaque: {}", e);
            TokenState::Opaque
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::storage::MemoryStore;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct Claims {
        sub: String,
        exp: i64,
    }

    fn jwt(exp: i64) -> String {
        encode(
            &Header::default(),
            &Claims {
                sub: "ops-user".to_string(),
                exp,
            },
            &EncodingKey::from_secret(b"backend-secret"),
        )
        .expect("encode")
    }

    fn session_with(token: Option<&str>) -> Session {
        let store = Arc::new(MemoryStore::new());
        if let Some(t) = token {
            store.set(TOKEN_KEY, t).expect("set");
        }
        Session::new(store)
    }

    #[test]
    fn missing_token_requires_authentication() {
        let s = session_with(None);
        assert_eq!(s.state(), TokenState::Missing);
        assert_eq!(s.bearer_token(), Err(WizardError::AuthenticationRequired));
    }

    #[test]
    fn expired_jwt_requires_authentication() {
        let s = session_with(Some(&jwt(chrono::Utc::now().timestamp() - 3600)));
        assert_eq!(s.state(), TokenState::Expired);
        assert!(s.bearer_token().unwrap_err().is_auth_required());
    }

    #[test]
    fn live_jwt_is_returned_regardless_of_signing_key() {
        let token = jwt(chrono::Utc::now().timestamp() + 3600);
        let s = session_with(Some(&token));
        assert_eq!(s.state(), TokenState::Valid);
        assert_eq!(s.bearer_token(), Ok(token));
    }

    #[test]
    fn opaque_token_passes_through() {
        let s = session_with(Some("  opaque-session-id  "));
        assert_eq!(s.state(), TokenState::Opaque);
        assert_eq!(s.bearer_token(), Ok("opaque-session-id".to_string()));
    }

    #[test]
    fn sign_out_clears_token() {
        let s = session_with(None);
        s.sign_in("abc").expect("sign in");
        assert!(s.token().is_some());
        s.sign_out().expect("sign out");
        assert!(s.token().is_none());
    }
}
