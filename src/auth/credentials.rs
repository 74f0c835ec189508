use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    app::config::AuthConfig,
    error::{AppError, AuthFailure},
};

const ACCESS_TOKEN_TYPE: &str = "access";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, TokenError> {
        self.sub.parse::<i64>().map_err(|_| TokenError::Invalid)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("token is invalid")]
    Invalid,
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AppError::Unauthenticated(AuthFailure::ExpiredToken),
            TokenError::Invalid => AppError::Unauthenticated(AuthFailure::InvalidToken),
        }
    }
}

/// Password hashing and session tokens.
#[derive(Clone)]
pub struct CredentialService {
    secret: String,
    validity_days: i64,
    issuer: Option<String>,
    audience: Option<String>,
}

impl CredentialService {
    pub fn new(secret: impl Into<String>, validity_days: i64) -> Self {
        Self {
            secret: secret.into(),
            validity_days,
            issuer: None,
            audience: None,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            ..Self::new(config.jwt_secret.clone(), config.expiration_days)
        }
    }

    /// Lifetime of an issued token, also used as the cookie Max-Age.
    pub fn validity(&self) -> Duration {
        Duration::days(self.validity_days)
    }

    pub fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
    }

    /// False for a wrong password and for a hash that cannot be parsed.
    pub fn verify_password(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    pub fn issue(&self, user_id: i64) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.validity()).timestamp(),
            typ: Some(ACCESS_TOKEN_TYPE.to_string()),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        self.encode_claims(&claims)
    }

    fn encode_claims(&self, claims: &Claims) -> Result<String, AppError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        if let Some(audience) = &self.audience {
            validation.set_audience(&[audience]);
        }

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|err| match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        })?;

        if let Some(typ) = &data.claims.typ
            && typ != ACCESS_TOKEN_TYPE
        {
            return Err(TokenError::Invalid);
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> CredentialService {
        CredentialService::new("secret", 30)
    }

    #[test]
    fn issued_token_decodes_to_subject() {
        let credentials = service();
        let token = credentials.issue(42).unwrap();
        let claims = credentials.decode(&token).unwrap();

        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.typ.as_deref(), Some("access"));
        assert_eq!(claims.exp - claims.iat, Duration::days(30).num_seconds());
    }

    #[test]
    fn expired_token_is_distinguished_from_invalid() {
        let credentials = service();
        let past = Utc::now() - Duration::days(2);
        let token = credentials
            .encode_claims(&Claims {
                sub: "1".to_string(),
                iat: past.timestamp(),
                exp: (past + Duration::days(1)).timestamp(),
                typ: Some("access".to_string()),
                iss: None,
                aud: None,
            })
            .unwrap();

        assert_eq!(credentials.decode(&token).unwrap_err(), TokenError::Expired);
        assert_eq!(credentials.decode("not-a-token").unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn token_signed_with_other_secret_is_invalid() {
        let token = CredentialService::new("other", 30).issue(1).unwrap();
        assert_eq!(service().decode(&token).unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn non_access_token_type_is_rejected() {
        let credentials = service();
        let now = Utc::now();
        let token = credentials
            .encode_claims(&Claims {
                sub: "1".to_string(),
                iat: now.timestamp(),
                exp: (now + Duration::hours(1)).timestamp(),
                typ: Some("email_verification".to_string()),
                iss: None,
                aud: None,
            })
            .unwrap();

        assert_eq!(credentials.decode(&token).unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn password_hash_verifies_only_the_original() {
        let credentials = service();
        let hash = credentials.hash_password("hunter22").unwrap();

        assert!(credentials.verify_password("hunter22", &hash));
        assert!(!credentials.verify_password("hunter23", &hash));
        assert!(!credentials.verify_password("hunter22", "not-a-hash"));
    }

    #[test]
    fn token_errors_map_to_auth_failures() {
        assert_eq!(
            AppError::from(TokenError::Expired).code(),
            "TOKEN_EXPIRED"
        );
        assert_eq!(
            AppError::from(TokenError::Invalid).code(),
            "TOKEN_INVALID"
        );
    }
}
