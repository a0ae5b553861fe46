//! JWT payload decoding.

use std::time::Duration;

use {
    base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD},
    serde::{Deserialize, Deserializer, Serialize},
};

use crate::errors::AuthError;

/// The registered claims the client cares about.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Claims {
    /// Username the token was issued to.
    #[serde(default)]
    pub sub: Option<String>,
    /// Expiry, seconds since the epoch.
    #[serde(default, deserialize_with = "numeric_date")]
    pub exp: Option<i64>,
    #[serde(default, deserialize_with = "numeric_date")]
    pub iat: Option<i64>,
    #[serde(default)]
    pub jti: Option<String>,
}

impl Claims {
    /// Seconds until expiry (negative once expired). `None` without `exp`.
    pub fn expires_in(&self, now: i64) -> Option<i64> {
        self.exp.map(|exp| exp - now)
    }

    /// Whether fewer than `threshold` remain before expiry.
    ///
    /// A token without `exp` never needs renewal.
    pub fn needs_renewal(&self, now: i64, threshold: Duration) -> bool {
        let threshold = i64::try_from(threshold.as_secs()).unwrap_or(i64::MAX);
        self.expires_in(now).is_some_and(|left| left < threshold)
    }
}

/// NumericDate may legally carry a fractional part.
fn numeric_date<'de, D>(de: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Number>::deserialize(de)?;
    Ok(value.and_then(|n| n.as_i64().or_else(|| n.as_f64().map(|f| f.floor() as i64))))
}

/// Decode the payload segment of a JWT without verifying its signature.
pub fn decode_claims(token: &str) -> Result<Claims, AuthError> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload)) = (parts.next(), parts.next()) else {
        return Err(AuthError::MalformedToken("missing payload segment".into()));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| AuthError::MalformedToken(format!("payload is not base64url: {e}")))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::MalformedToken(format!("payload is not a claims object: {e}")))
}

/// Current time as seconds since the epoch.
pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Build an unsigned token carrying `claims`, for fixtures and local tooling.
pub fn unsigned_token(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.")
}
