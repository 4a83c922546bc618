use std::collections::HashSet;

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::models::auth::SessionClaims;

#[derive(Debug, thiserror::Error)]
#[error("Invalid session token: {0}")]
pub struct DecodeError(#[from] jsonwebtoken::errors::Error);

/// Decodes session tokens issued by the GraphQL backend.
///
/// Without a secret the signature is not checked, only the payload is read;
/// with one, HS256 signatures are verified. `exp` is enforced when present.
#[derive(Clone)]
pub struct TokenDecoder {
    key: DecodingKey,
    validation: Validation,
}

impl TokenDecoder {
    pub fn new(secret: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        let key = match secret {
            Some(s) => DecodingKey::from_secret(s.as_bytes()),
            None => {
                validation.insecure_disable_signature_validation();
                DecodingKey::from_secret(&[])
            }
        };

        Self { key, validation }
    }

    pub fn decode(&self, token: &str) -> Result<SessionClaims, DecodeError> {
        let data = decode::<SessionClaims>(token.trim(), &self.key, &self.validation)?;
        Ok(data.claims.normalized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn sign(claims: &serde_json::Value, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn decodes_without_secret() {
        let token = sign(&serde_json::json!({ "clientId": "c1", "tenantId": "t1" }), "whatever");
        let claims = TokenDecoder::new(None).decode(&token).unwrap();
        assert_eq!(claims.client_id.as_deref(), Some("c1"));
        assert_eq!(claims.tenant_id.as_deref(), Some("t1"));
    }

    #[test]
    fn verifies_signature_when_secret_configured() {
        let token = sign(&serde_json::json!({ "email": "a@b.com" }), "right");
        assert!(TokenDecoder::new(Some("right")).decode(&token).is_ok());
        assert!(TokenDecoder::new(Some("wrong")).decode(&token).is_err());
    }

    #[test]
    fn rejects_expired_and_malformed_tokens() {
        let token = sign(&serde_json::json!({ "clientId": "c1", "exp": 1_000 }), "s");
        assert!(TokenDecoder::new(None).decode(&token).is_err());
        assert!(TokenDecoder::new(None).decode("not-a-token").is_err());
        assert!(TokenDecoder::new(None).decode("").is_err());
    }
}
