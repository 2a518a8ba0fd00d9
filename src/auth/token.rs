//! Signed auth tokens — HMAC-SHA256 over base64url header.claims.
//!
//! The token is the sole credential: opaque to clients, verifiable
//! offline (signature + expiry) with no server-side session store.
//! Verification failure is always a hard authentication failure.

use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::{AccessScope, AuthError};
use crate::models::Role;

type HmacSha256 = Hmac<Sha256>;

const B64: base64::engine::GeneralPurpose = base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Claims carried by every issued token. The role and site assignments
/// here are the sole basis for downstream authorization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i64,
    pub email: String,
    /// Display name ("First Last").
    pub name: String,
    pub role: Role,
    pub primary_site_id: i64,
    pub assigned_site_ids: Vec<i64>,
    /// Issued-at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
}

impl Claims {
    pub fn scope(&self) -> AccessScope {
        AccessScope::for_user(self.role, self.primary_site_id, &self.assigned_site_ids)
    }
}

#[derive(Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    typ: String,
}

/// Sign claims into a compact `header.claims.signature` token.
pub fn sign(secret: &[u8], claims: &Claims) -> Result<String, AuthError> {
    let header = TokenHeader {
        alg: "HS256".to_string(),
        typ: "JWT".to_string(),
    };

    let header_b64 = B64.encode(serde_json::to_string(&header)?.as_bytes());
    let claims_b64 = B64.encode(serde_json::to_string(claims)?.as_bytes());
    let message = format!("{header_b64}.{claims_b64}");

    let signature = mac_bytes(secret, message.as_bytes());
    Ok(format!("{message}.{}", B64.encode(signature)))
}

/// Verify signature and expiry, returning the decoded claims.
pub fn verify(secret: &[u8], token: &str) -> Result<Claims, AuthError> {
    let mut parts = token.split('.');
    let (Some(header), Some(claims), Some(signature)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::Malformed);
    };
    if parts.next().is_some() {
        return Err(AuthError::Malformed);
    }

    let message = format!("{header}.{claims}");
    let expected = mac_bytes(secret, message.as_bytes());
    let provided = B64.decode(signature).map_err(|_| AuthError::Malformed)?;
    if !bool::from(provided.ct_eq(&expected)) {
        return Err(AuthError::InvalidSignature);
    }

    let claims_json = B64.decode(claims).map_err(|_| AuthError::Malformed)?;
    let claims: Claims =
        serde_json::from_slice(&claims_json).map_err(|_| AuthError::Malformed)?;

    if claims.exp < Utc::now().timestamp() {
        return Err(AuthError::Expired);
    }

    Ok(claims)
}

fn mac_bytes(secret: &[u8], message: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .expect("HMAC accepts keys of any length");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_claims() -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            sub: 7,
            email: "nurse@example.com".into(),
            name: "Dana Reyes".into(),
            role: Role::Nurse,
            primary_site_id: 1,
            assigned_site_ids: vec![2, 3],
            iat: now,
            exp: now + 3600,
        }
    }

    #[test]
    fn sign_then_verify_round_trips() {
        let claims = test_claims();
        let token = sign(b"secret", &claims).unwrap();
        let decoded = verify(b"secret", &token).unwrap();
        assert_eq!(decoded, claims);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = sign(b"secret", &test_claims()).unwrap();
        let err = verify(b"other-secret", &token).unwrap_err();
        assert!(matches!(err, AuthError::InvalidSignature));
    }

    #[test]
    fn tampered_claims_are_rejected() {
        let token = sign(b"secret", &test_claims()).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();

        // Swap in claims with role escalated to admin
        let mut forged = test_claims();
        forged.role = Role::Admin;
        let forged_b64 = B64.encode(serde_json::to_string(&forged).unwrap().as_bytes());
        parts[1] = &forged_b64;
        let forged_token = parts.join(".");

        let err = verify(b"secret", &forged_token).unwrap_err();
        assert!(matches!(err, AuthError::InvalidSignature));
    }

    #[test]
    fn expired_token_is_rejected_distinctly() {
        let mut claims = test_claims();
        claims.exp = Utc::now().timestamp() - 10;
        let token = sign(b"secret", &claims).unwrap();
        let err = verify(b"secret", &token).unwrap_err();
        assert!(matches!(err, AuthError::Expired));
    }

    #[test]
    fn garbage_tokens_are_malformed() {
        for garbage in ["", "abc", "a.b", "a.b.c.d", "!!.!!.!!"] {
            let err = verify(b"secret", garbage).unwrap_err();
            assert!(
                matches!(err, AuthError::Malformed),
                "{garbage:?} should be malformed"
            );
        }
    }

    #[test]
    fn claims_scope_matches_role() {
        let claims = test_claims();
        assert!(!claims.scope().is_unrestricted());
        assert!(claims.scope().contains(1));
        assert!(claims.scope().contains(3));

        let mut admin = test_claims();
        admin.role = Role::Admin;
        assert!(admin.scope().is_unrestricted());
    }
}
