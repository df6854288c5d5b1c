use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::env;

const TOKEN_LIFETIME_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // owner id
    pub exp: usize,
    pub jti: String,
}

pub fn create_jwt(user_id: &str, secret: &str) -> Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(TOKEN_LIFETIME_HOURS))
        .context("token expiry out of range")?
        .timestamp();

    let claims = Claims {
        sub: user_id.to_owned(),
        exp: expiration as usize,
        jti: uuid::Uuid::new_v4().to_string(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?;

    Ok(token)
}

/// Verifies a bearer token. Uses RS256 against `JWT_PUBLIC_KEY` when that is
/// set, otherwise HS256 with `secret`.
pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims> {
    let (decoding_key, validation) = if let Ok(public_key) = env::var("JWT_PUBLIC_KEY") {
        let mut val = Validation::new(Algorithm::RS256);
        val.validate_aud = false;
        (DecodingKey::from_rsa_pem(public_key.as_bytes())?, val)
    } else {
        (
            DecodingKey::from_secret(secret.as_ref()),
            Validation::default(),
        )
    };

    let token_data = decode::<Claims>(token, &decoding_key, &validation)?;

    if token_data.claims.sub.is_empty() {
        anyhow::bail!("token has no subject");
    }

    Ok(token_data.claims)
}
