use jsonwebtoken::{DecodingKey, Validation, decode};

use crate::models::{Claims, TokenType};

/// Decodes and validates an access token. Refresh tokens are rejected.
pub fn verify_access_token(token: &str, secret: &str) -> Result<Claims, String> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())?;

    if claims.token_type != TokenType::Access {
        return Err("not an access token".to_string());
    }
    Ok(claims)
}

#[cfg(test)]
pub fn issue_token(
    role: u8,
    employee_id: Option<u64>,
    token_type: TokenType,
    secret: &str,
) -> String {
    use jsonwebtoken::{EncodingKey, Header, encode};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;

    let claims = Claims {
        user_id: 1,
        sub: "tester".to_string(),
        role,
        exp: now + 900,
        jti: uuid::Uuid::new_v4().to_string(),
        token_type,
        employee_id,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_round_trip() {
        let token = issue_token(2, Some(7), TokenType::Access, "s3cret");
        let claims = verify_access_token(&token, "s3cret").unwrap();

        assert_eq!(claims.role, 2);
        assert_eq!(claims.employee_id, Some(7));
    }

    #[test]
    fn rejects_wrong_secret_and_refresh_tokens() {
        let token = issue_token(1, None, TokenType::Access, "s3cret");
        assert!(verify_access_token(&token, "other").is_err());

        let refresh = issue_token(1, None, TokenType::Refresh, "s3cret");
        assert!(verify_access_token(&refresh, "s3cret").is_err());
    }
}
