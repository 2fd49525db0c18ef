use serde::{Deserialize, Serialize};

use crate::users::repo::Role;

/// JWT payload minted by the identity service and trusted here after
/// signature verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,     // user ID
    pub role: Role,   // caller role at issuance time
    pub iat: usize,   // issued at (unix timestamp)
    pub exp: usize,   // expires at (unix timestamp)
    pub iss: String,  // issuer
    pub aud: String,  // audience
}
