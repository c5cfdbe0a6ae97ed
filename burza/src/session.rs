//! Identity-provider session: bearer JWT plus the claims the client needs.
//!
//! The token is decoded without signature verification. The backend verifies
//! it on every call; the client only reads `sub`, the role, and `exp` so it can
//! address the right balance and hide admin commands.

use base64::Engine;
use chrono::Utc;
use zeroize::Zeroizing;

use crate::errors::{MarketError, Rejection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Client,
}

impl Role {
    pub fn from_claim(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "admin" => Role::Admin,
            _ => Role::Client,
        }
    }
}

/// Claims read from the identity provider's JWT.
#[derive(Debug, Clone)]
pub struct SessionClaims {
    pub sub: String,
    pub role: Role,
    pub exp: Option<i64>,
    pub email: Option<String>,
}

/// A signed-in user.
pub struct Session {
    bearer: Zeroizing<String>,
    claims: SessionClaims,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.claims.sub)
            .field("role", &self.claims.role)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn from_bearer(token: impl Into<String>) -> anyhow::Result<Self> {
        let bearer = Zeroizing::new(token.into());
        let claims = decode_claims(&bearer)?;
        Ok(Self { bearer, claims })
    }

    pub fn user_id(&self) -> &str {
        &self.claims.sub
    }

    pub fn role(&self) -> Role {
        self.claims.role
    }

    pub fn is_admin(&self) -> bool {
        self.claims.role == Role::Admin
    }

    pub fn claims(&self) -> &SessionClaims {
        &self.claims
    }

    /// The bearer credential, or an error once `exp` has passed.
    pub fn bearer(&self) -> Result<&str, MarketError> {
        if let Some(exp) = self.claims.exp {
            if exp < Utc::now().timestamp() {
                return Err(Rejection::SessionExpired.into());
            }
        }
        Ok(self.bearer.as_str())
    }
}

/// Decode JWT claims without cryptographic verification.
pub fn decode_claims(token: &str) -> anyhow::Result<SessionClaims> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(anyhow::anyhow!("Invalid JWT format: expected 3 parts"));
    }

    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let payload_bytes = engine
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| anyhow::anyhow!("JWT payload decode error: {}", e))?;
    let raw: serde_json::Value = serde_json::from_slice(&payload_bytes)?;

    let sub = raw
        .get("sub")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("JWT missing 'sub' claim"))?
        .to_string();

    // Identity providers put custom roles in different places.
    let role = raw
        .get("role")
        .or_else(|| raw.pointer("/metadata/role"))
        .or_else(|| raw.pointer("/public_metadata/role"))
        .and_then(|v| v.as_str())
        .map(Role::from_claim)
        .unwrap_or(Role::Client);

    Ok(SessionClaims {
        sub,
        role,
        exp: raw.get("exp").and_then(|v| v.as_i64()),
        email: raw.get("email").and_then(|v| v.as_str()).map(String::from),
    })
}

#[cfg(test)]
pub(crate) fn test_token(payload: &str) -> String {
    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let header = engine.encode(r#"{"alg":"RS256"}"#);
    let payload = engine.encode(payload);
    format!("{}.{}.signature", header, payload)
}
