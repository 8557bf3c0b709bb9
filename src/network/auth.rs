//! Session Credentials
//!
//! Mints and validates the HS256 JWTs handed out when a life is spent.
//! Unlike a third-party login token, these are issued by this server and
//! only this server holds the key.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::economy::record::PlayerId;

/// Default credential lifetime (5 minutes).
pub const DEFAULT_SESSION_TTL_SECS: i64 = 300;

/// Authentication configuration.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// HS256 signing secret.
    pub secret: Option<String>,
    /// Issuer claim ("iss") stamped on every credential and required on the way back.
    pub issuer: Option<String>,
    /// Credential lifetime.
    pub session_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: None,
            issuer: None,
            session_ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECS),
        }
    }
}

impl AuthConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            secret: std::env::var("SESSION_SECRET").ok().filter(|s| !s.is_empty()),
            issuer: std::env::var("SESSION_ISSUER").ok(),
            session_ttl: std::env::var("SESSION_TTL_SECS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|v| *v > 0)
                .map(Duration::seconds)
                .unwrap_or_else(|| Duration::seconds(DEFAULT_SESSION_TTL_SECS)),
        }
    }
}

/// Claims carried by a session credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject - the player identity the life was taken from.
    pub sub: String,
    /// Display name at issuance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Issued at (Unix seconds).
    pub iat: i64,
    /// Expiry (Unix seconds).
    pub exp: i64,
    /// Unique session id.
    pub jti: String,
    /// Issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl SessionClaims {
    /// Player identity named by the subject claim.
    pub fn player_id(&self) -> Result<PlayerId, AuthError> {
        PlayerId::parse(&self.sub).ok_or_else(|| AuthError::MissingClaim("sub".into()))
    }

    /// Issuance instant.
    pub fn issued_at(&self) -> Result<DateTime<Utc>, AuthError> {
        Utc.timestamp_opt(self.iat, 0)
            .single()
            .ok_or_else(|| AuthError::MissingClaim("iat".into()))
    }
}

/// A freshly minted credential.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    /// Encoded JWT.
    pub token: String,
    /// Claims inside it.
    pub claims: SessionClaims,
}

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No signing secret configured on server.
    #[error("authentication not configured")]
    NotConfigured,
    /// No bearer token was sent.
    #[error("missing bearer token")]
    MissingToken,
    /// Header or token format is invalid.
    #[error("invalid token format")]
    InvalidFormat,
    /// Token signature verification failed.
    #[error("invalid signature")]
    InvalidSignature,
    /// Token has expired.
    #[error("token expired")]
    Expired,
    /// Issuer claim doesn't match expected value.
    #[error("invalid issuer")]
    InvalidIssuer,
    /// Required claim is missing.
    #[error("missing required claim: {0}")]
    MissingClaim(String),
    /// JWT encoding error.
    #[error("encode error: {0}")]
    EncodeError(String),
    /// JWT decoding error.
    #[error("decode error: {0}")]
    DecodeError(String),
}

/// Extract the token from an `Authorization` header value.
///
/// The scheme is matched case-insensitively; the token must be non-empty
/// and contain no whitespace.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let value = header.ok_or(AuthError::MissingToken)?.trim();
    let (scheme, token) = value.split_once(' ').ok_or(AuthError::InvalidFormat)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidFormat);
    }
    let token = token.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(AuthError::InvalidFormat);
    }
    Ok(token)
}

/// Issues and verifies session credentials with one server-held key.
///
/// Built once at startup and shared read-only across requests.
#[derive(Clone)]
pub struct SessionSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: Option<String>,
    ttl: Duration,
}

impl SessionSigner {
    /// Build a signer from config.
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        let secret = config.secret.as_ref().ok_or(AuthError::NotConfigured)?;
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: config.issuer.clone(),
            ttl: config.session_ttl,
        })
    }

    /// Mint a credential for `identity`, valid from `now` for the configured lifetime.
    pub fn issue(
        &self,
        identity: &PlayerId,
        display_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<IssuedSession, AuthError> {
        let claims = SessionClaims {
            sub: identity.as_str().to_string(),
            username: display_name.map(str::to_string),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            iss: self.issuer.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::EncodeError(e.to_string()))?;

        Ok(IssuedSession { token, claims })
    }

    /// Validate a credential and extract its claims.
    ///
    /// A credential is live while `exp > now`. When an issuer is configured
    /// the `iss` claim must be present and match.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);

        // `exp` must be present but is checked against the caller's clock below
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        let mut required = vec!["exp", "sub"];
        if let Some(ref issuer) = self.issuer {
            required.push("iss");
            validation.set_issuer(&[issuer]);
        }
        validation.set_required_spec_claims(&required);

        let claims = decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(map_jwt_error)?
            .claims;

        if claims.sub.trim().is_empty() {
            return Err(AuthError::MissingClaim("sub".into()));
        }
        if claims.jti.is_empty() {
            return Err(AuthError::MissingClaim("jti".into()));
        }
        if now.timestamp() >= claims.exp {
            return Err(AuthError::Expired);
        }

        Ok(claims)
    }
}

/// Map JWT library errors to our error type.
fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
        ErrorKind::MissingRequiredClaim(claim) => AuthError::MissingClaim(claim.clone()),
        ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_) => AuthError::InvalidFormat,
        _ => AuthError::DecodeError(err.to_string()),
    }
}

// =============================================================================
// TESTS
// =============================================================================
