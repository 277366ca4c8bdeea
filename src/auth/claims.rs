use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token payload. Self-contained: the token can be verified offline with
/// nothing but the signing secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // owner user ID
    pub iat: usize, // issued at (unix timestamp)
    pub exp: usize, // expires at (unix timestamp)
}
