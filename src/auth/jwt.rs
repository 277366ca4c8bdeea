use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::state::AppState;

/// Signing and verification keys for session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: TimeDuration,
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        let auth = &state.config.auth;
        Self {
            encoding: EncodingKey::from_secret(auth.secret.as_bytes()),
            decoding: DecodingKey::from_secret(auth.secret.as_bytes()),
            ttl: TimeDuration::days(auth.token_ttl_days),
        }
    }
}

impl SessionKeys {
    /// Signs a session token for `user_id`, expiring after the configured
    /// lifetime (7 days unless overridden).
    pub fn sign(&self, user_id: Uuid) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: (now + self.ttl).unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "session token signed");
        Ok(token)
    }

    /// Verifies a session token and returns the embedded user ID. Fails
    /// closed: any parse, signature or expiry problem yields `None`. Only the
    /// failure class is logged, never the token or the secret.
    pub fn verify(&self, token: &str) -> Option<Uuid> {
        if token.is_empty() {
            debug!("session token empty");
            return None;
        }
        match decode::<Claims>(token, &self.decoding, &Validation::default()) {
            Ok(data) => {
                debug!(user_id = %data.claims.sub, "session token verified");
                Some(data.claims.sub)
            }
            Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => {
                debug!("session token expired");
                None
            }
            Err(_) => {
                warn!("session token invalid");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys() -> SessionKeys {
        SessionKeys::from_ref(&AppState::fake())
    }

    #[tokio::test]
    async fn sign_and_verify_roundtrip() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id).expect("sign");
        assert_eq!(keys.verify(&token), Some(user_id));
    }

    #[tokio::test]
    async fn verify_rejects_empty_and_garbage() {
        let keys = make_keys();
        assert_eq!(keys.verify(""), None);
        assert_eq!(keys.verify("not.a.token"), None);
    }

    #[tokio::test]
    async fn verify_rejects_wrong_secret() {
        let keys = make_keys();
        let other = SessionKeys {
            encoding: EncodingKey::from_secret(b"another-secret"),
            decoding: DecodingKey::from_secret(b"another-secret"),
            ttl: TimeDuration::days(7),
        };
        let token = other.sign(Uuid::new_v4()).expect("sign");
        assert_eq!(keys.verify(&token), None);
    }

    #[test]
    fn verify_rejects_expired_token() {
        let keys = SessionKeys {
            encoding: EncodingKey::from_secret(b"test-secret"),
            decoding: DecodingKey::from_secret(b"test-secret"),
            // negative TTL puts exp well past the default leeway
            ttl: TimeDuration::days(-1),
        };
        let token = keys.sign(Uuid::new_v4()).expect("sign");
        assert_eq!(keys.verify(&token), None);
    }
}
