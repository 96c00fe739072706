use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    pub user_type: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

/// Claims of a session token issued by the hosted auth provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub email: Option<String>,
    pub exp: usize,
    pub aud: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

pub fn decode_session(
    token: &str,
    secret: &[u8],
    audience: &str,
) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[audience]);

    let decoded = decode::<SessionClaims>(token, &DecodingKey::from_secret(secret), &validation)?;

    Ok(decoded.claims)
}

#[cfg(test)]
pub fn create_session_token(
    sub: &str,
    email: &str,
    user_type: Option<&str>,
    secret: &[u8],
    expires_in_secs: i64,
) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let exp = (chrono::Utc::now().timestamp() + expires_in_secs) as usize;
    let claims = SessionClaims {
        sub: sub.to_string(),
        email: Some(email.to_string()),
        exp,
        aud: Some("authenticated".to_string()),
        user_metadata: UserMetadata {
            user_type: user_type.map(str::to_string),
            full_name: Some("Test User".to_string()),
            phone: None,
        },
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret)).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"session-secret";

    #[test]
    fn decodes_a_valid_session() {
        let token = create_session_token("user-1", "a@b.com", Some("provider"), SECRET, 600);
        let claims = decode_session(&token, SECRET, "authenticated").unwrap();

        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email.as_deref(), Some("a@b.com"));
        assert_eq!(claims.user_metadata.user_type.as_deref(), Some("provider"));
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = create_session_token("user-1", "a@b.com", None, SECRET, 600);
        assert!(decode_session(&token, b"other-secret", "authenticated").is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let token = create_session_token("user-1", "a@b.com", None, SECRET, -3600);
        assert!(decode_session(&token, SECRET, "authenticated").is_err());
    }

    #[test]
    fn rejects_wrong_audience() {
        let token = create_session_token("user-1", "a@b.com", None, SECRET, 600);
        assert!(decode_session(&token, SECRET, "service_role").is_err());
    }

    #[test]
    fn missing_metadata_defaults_to_empty() {
        use jsonwebtoken::{encode, EncodingKey, Header};

        let exp = (chrono::Utc::now().timestamp() + 600) as usize;
        let raw = serde_json::json!({ "sub": "u", "exp": exp, "aud": "authenticated" });
        let token = encode(&Header::default(), &raw, &EncodingKey::from_secret(SECRET)).unwrap();

        let claims = decode_session(&token, SECRET, "authenticated").unwrap();
        assert!(claims.email.is_none());
        assert!(claims.user_metadata.user_type.is_none());
    }
}
