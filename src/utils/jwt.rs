use crate::config::AppConfig;
use crate::models::lti::entities::LaunchParams;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

// JWT Claims 结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (user ID)
    pub exp: usize,  // Expiration time (时间戳)
    pub iat: usize,  // Issued at (签发时间)
}

/// LTI 启动中转令牌
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchClaims {
    pub params: LaunchParams,
    pub exp: usize,
    pub iat: usize,
}

pub struct JwtUtils;

impl JwtUtils {
    // 获取 JWT 密钥
    fn get_secret() -> String {
        AppConfig::get().jwt.secret.clone()
    }

    fn get_lti_secret() -> String {
        AppConfig::get().jwt.lti_secret.clone()
    }

    // 生成 Access Token
    pub fn generate_access_token(user_id: i64) -> Result<String, jsonwebtoken::errors::Error> {
        let config = AppConfig::get();
        Self::generate_token_with_expiry(
            &Self::get_secret(),
            user_id,
            chrono::Duration::minutes(config.jwt.access_token_expiry),
        )
    }

    // 生成带自定义过期时间的 Token
    pub fn generate_token_with_expiry(
        secret: &str,
        user_id: i64,
        expiry_duration: chrono::Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = chrono::Utc::now();
        let expiration = now + expiry_duration;

        let claims = Claims {
            sub: user_id.to_string(),
            exp: expiration.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        let encoding_key = EncodingKey::from_secret(secret.as_ref());
        encode(&Header::new(Algorithm::HS256), &claims, &encoding_key)
    }

    // 验证 Access Token
    pub fn verify_access_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        Self::verify_token_with(&Self::get_secret(), token)
    }

    pub fn verify_token_with(
        secret: &str,
        token: &str,
    ) -> Result<Claims, jsonwebtoken::errors::Error> {
        let decoding_key = DecodingKey::from_secret(secret.as_ref());
        let validation = Validation::new(Algorithm::HS256);

        decode::<Claims>(token, &decoding_key, &validation).map(|token_data| token_data.claims)
    }

    /// 生成 LTI 启动令牌 (HS512)
    pub fn encode_launch(params: &LaunchParams) -> Result<String, jsonwebtoken::errors::Error> {
        let config = AppConfig::get();
        Self::encode_launch_with(&Self::get_lti_secret(), params, config.jwt.lti_launch_expiry)
    }

    pub fn encode_launch_with(
        secret: &str,
        params: &LaunchParams,
        expiry_secs: i64,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = chrono::Utc::now();
        let claims = LaunchClaims {
            params: params.clone(),
            exp: (now + chrono::Duration::seconds(expiry_secs)).timestamp() as usize,
            iat: now.timestamp() as usize,
        };
        encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(secret.as_ref()),
        )
    }

    /// 解析 LTI 启动令牌
    pub fn decode_launch(blob: &str) -> Result<LaunchParams, jsonwebtoken::errors::Error> {
        Self::decode_launch_with(&Self::get_lti_secret(), blob)
    }

    pub fn decode_launch_with(
        secret: &str,
        blob: &str,
    ) -> Result<LaunchParams, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS512);
        validation.leeway = 0;
        decode::<LaunchClaims>(blob, &DecodingKey::from_secret(secret.as_ref()), &validation)
            .map(|data| data.claims.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_access_token_roundtrip() {
        let token =
            JwtUtils::generate_token_with_expiry("k1", 42, chrono::Duration::minutes(5)).unwrap();
        let claims = JwtUtils::verify_token_with("k1", &token).unwrap();
        assert_eq!(claims.sub, "42");
        assert!(JwtUtils::verify_token_with("k2", &token).is_err());
    }

    #[test]
    fn test_expired_access_token() {
        let token =
            JwtUtils::generate_token_with_expiry("k1", 1, chrono::Duration::minutes(-10)).unwrap();
        assert!(JwtUtils::verify_token_with("k1", &token).is_err());
    }

    #[test]
    fn test_launch_blob_uses_lti_secret() {
        let mut map = BTreeMap::new();
        map.insert("user_id".to_string(), "abc".to_string());
        let params = LaunchParams(map);

        let blob = JwtUtils::encode_launch_with("lti", &params, 60).unwrap();
        assert_eq!(JwtUtils::decode_launch_with("lti", &blob).unwrap(), params);
        assert!(JwtUtils::decode_launch_with("other", &blob).is_err());
        // 普通 access token 校验不接受 HS512 令牌
        assert!(JwtUtils::verify_token_with("lti", &blob).is_err());
    }
}
