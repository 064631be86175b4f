//! Signed access token encoding and verification.
//!
//! Access tokens are HS256 JWTs carrying the subject plus role/privilege
//! claims frozen at mint time. Refresh tokens are deliberately not JWTs:
//! they are opaque high-entropy random values used only as database lookup
//! keys, so revoking them never requires re-keying the signing secret.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Default access token lifetime: 10 minutes.
pub const DEFAULT_ACCESS_TTL_MS: u64 = 600_000;

/// Default refresh token lifetime: 15 minutes.
pub const DEFAULT_REFRESH_TTL_MS: u64 = 900_000;

/// Claims carried by an access token.
///
/// Roles and privileges are explicit fields; `extra` is a small extension
/// map kept for forward compatibility with claims this version does not
/// know about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (unique username)
    pub sub: String,
    /// Role names granted at mint time
    pub roles: BTreeSet<String>,
    /// Privilege names granted at mint time
    pub privileges: BTreeSet<String>,
    /// Issued at (Unix timestamp, seconds)
    pub iat: u64,
    /// Expiration time (Unix timestamp, seconds)
    pub exp: u64,
    /// Unrecognized claims, preserved on decode
    #[serde(flatten, default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A freshly minted access token with its timing metadata.
#[derive(Debug, Clone)]
pub struct IssuedAccess {
    /// The signed token string
    pub token: String,
    /// Issued at timestamp (Unix seconds)
    pub issued_at: u64,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
    /// Lifetime in seconds, used for cookie Max-Age
    pub max_age_secs: u64,
}

/// Token verification and issuance failures.
///
/// `Expired` and `SignatureInvalid` are distinct on purpose: the silent
/// refresh path needs to know "authentic but old" apart from "tampered or
/// garbage".
#[derive(Debug)]
pub enum TokenError {
    /// Token could not be parsed (not a JWT, bad base64, bad JSON)
    Malformed,
    /// Signature does not match the signing secret
    SignatureInvalid,
    /// Signature is valid but the token is past its expiry
    Expired,
    /// Error while encoding a new token
    Encoding(jsonwebtoken::errors::Error),
    /// System clock before Unix epoch
    Clock,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Malformed => write!(f, "Malformed token"),
            TokenError::SignatureInvalid => write!(f, "Token signature invalid"),
            TokenError::Expired => write!(f, "Token expired"),
            TokenError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            TokenError::Clock => write!(f, "System clock error"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Codec for signing and verifying access tokens.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
}

impl JwtConfig {
    /// Create a codec with the given signing secret and access token TTL.
    pub fn new(secret: &[u8], access_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl,
        }
    }

    /// Mint an access token for a subject with its current roles and
    /// privileges. Claims are not re-checked against the store until the
    /// next mint.
    pub fn issue_access(
        &self,
        subject: &str,
        roles: &BTreeSet<String>,
        privileges: &BTreeSet<String>,
    ) -> Result<IssuedAccess, TokenError> {
        let now = unix_now()?;
        let max_age_secs = self.access_ttl.as_secs();
        let exp = now + max_age_secs;

        let claims = AccessClaims {
            sub: subject.to_string(),
            roles: roles.clone(),
            privileges: privileges.clone(),
            iat: now,
            exp,
            extra: BTreeMap::new(),
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(TokenError::Encoding)?;

        Ok(IssuedAccess {
            token,
            issued_at: now,
            expires_at: exp,
            max_age_secs,
        })
    }

    /// Verify an access token: signature first, then expiry.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = jsonwebtoken::decode::<AccessClaims>(token, &self.decoding_key, &validation)
            .map_err(classify_decode_error)?;
        Ok(data.claims)
    }

    /// Decode a token whose signature must be valid but whose expiry is
    /// ignored. The silent refresh path uses this to recover a trustworthy
    /// subject from a stale token. Never returns `Expired`.
    pub fn decode_expired(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;

        let data = jsonwebtoken::decode::<AccessClaims>(token, &self.decoding_key, &validation)
            .map_err(classify_decode_error)?;
        Ok(data.claims)
    }
}

/// Generate an opaque refresh token value: 32 random bytes, base64url.
/// High entropy makes reuse across records statistically impossible.
pub fn issue_refresh_value() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Current Unix time in seconds.
pub fn unix_now() -> Result<u64, TokenError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| TokenError::Clock)?
        .as_secs())
}

fn classify_decode_error(e: jsonwebtoken::errors::Error) -> TokenError {
    use jsonwebtoken::errors::ErrorKind;
    match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
        _ => TokenError::Malformed,
    }
}
