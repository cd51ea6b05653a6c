// ============================================================================
// Credential verification
// ============================================================================
//
// Self-contained HS256 verification against a shared secret: the gateway
// never calls back to the identity service per request, trading central
// revocation for lower latency and no coupling to the issuer's availability.
//
// ============================================================================

use anyhow::Result;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use ripple_config::Config;
use ripple_error::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Header carrying the verified subject id to upstream services.
///
/// The gateway is the single point of authentication; services sit behind it
/// and trust these headers. They must never be reachable from the internet
/// directly.
pub const HEADER_USER_ID: &str = "x-user-id";
pub const HEADER_USER_ROLE: &str = "x-user-role";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: user id
    pub sub: String,
    pub role: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiration (Unix seconds)
    pub exp: i64,
    pub iss: String,
}

pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_token_ttl_hours: i64,
    issuer: String,
}

impl AuthManager {
    pub fn new(config: &Config) -> Result<Self> {
        if config.jwt_secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.jwt_issuer.clone()]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            access_token_ttl_hours: config.access_token_ttl_hours,
            issuer: config.jwt_issuer.clone(),
        })
    }

    /// Create an access token for a user. Returns the token and its
    /// expiration timestamp.
    pub fn create_token(&self, user_id: &Uuid, role: &str) -> Result<(String, i64)> {
        let now = Utc::now();
        let exp = now + Duration::hours(self.access_token_ttl_hours);

        let claims = Claims {
            sub: user_id.to_string(),
            role: role.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.issuer.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok((token, exp.timestamp()))
    }

    /// Verify a bearer token and decode its claims.
    ///
    /// The precise rejection reason (malformed, bad signature, expired) is
    /// logged; callers surface a uniform 401 so the response leaks nothing
    /// about which check failed.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AppError> {
        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => {
                use jsonwebtoken::errors::ErrorKind;
                let reason = match e.kind() {
                    ErrorKind::ExpiredSignature => "token expired",
                    ErrorKind::InvalidSignature => "invalid signature",
                    ErrorKind::InvalidIssuer => "invalid issuer",
                    ErrorKind::InvalidToken => "malformed token",
                    _ => "token verification failed",
                };
                tracing::warn!(reason, error = %e, "rejected bearer token");
                Err(AppError::auth(reason))
            }
        }
    }
}

/// Strip the `Bearer ` scheme from an Authorization header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    header_value.strip_prefix("Bearer ").map(str::trim)
}

/// Identity propagated by the gateway after credential verification.
///
/// Usage:
/// ```ignore
/// async fn handler(user: AuthenticatedUser, ...) -> Result<...> {
///     let user_id = user.user_id;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(HEADER_USER_ID)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::auth("missing identity header"))?;

        let user_id = Uuid::parse_str(user_id)
            .map_err(|_| AppError::auth("malformed identity header"))?;

        let role = parts
            .headers
            .get(HEADER_USER_ROLE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("user")
            .to_string();

        Ok(Self { user_id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_config::Config;

    fn test_config(secret: &str) -> Config {
        // Built directly rather than through from_env so parallel tests never
        // race on process environment.
        std::env::set_var("JWT_SECRET", "placeholder");
        let mut config = Config::from_env().unwrap();
        config.jwt_secret = secret.to_string();
        config
    }

    #[test]
    fn create_and_verify_round_trip() {
        let manager = AuthManager::new(&test_config("test-secret")).unwrap();
        let user_id = Uuid::new_v4();

        let (token, expires_at) = manager.create_token(&user_id, "user").unwrap();
        assert!(expires_at > Utc::now().timestamp());

        let claims = manager.verify_token(&token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, "user");
    }

    #[test]
    fn expired_token_is_rejected() {
        let manager = AuthManager::new(&test_config("test-secret")).unwrap();

        let now = Utc::now();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            role: "user".to_string(),
            iat: (now - Duration::hours(2)).timestamp(),
            exp: (now - Duration::hours(1)).timestamp(),
            iss: "ripple".to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(manager.verify_token(&token).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let manager = AuthManager::new(&test_config("test-secret")).unwrap();
        let other = AuthManager::new(&test_config("other-secret")).unwrap();

        let (token, _) = other.create_token(&Uuid::new_v4(), "user").unwrap();
        assert!(manager.verify_token(&token).is_err());
    }

    #[test]
    fn malformed_token_is_rejected() {
        let manager = AuthManager::new(&test_config("test-secret")).unwrap();
        assert!(manager.verify_token("not-a-jwt").is_err());
    }

    #[test]
    fn bearer_scheme_stripping() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("abc.def.ghi"), None);
    }
}
