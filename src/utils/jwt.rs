//! JWT Token 管理
//!
//! 提供 JWT token 的生成和验证功能; 密钥与有效期来自配置

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::user::AuthError;

/// JWT Claims (载荷)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// 用户ID
    pub sub: String,

    /// 邮箱
    pub email: String,

    /// 签发时间 (Unix timestamp)
    pub iat: u64,

    /// 过期时间 (Unix timestamp)
    pub exp: u64,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl Claims {
    /// 创建新的 Claims
    pub fn new(user_id: String, email: String, ttl: Duration) -> Self {
        let now = now_secs();
        Self {
            sub: user_id,
            email,
            iat: now,
            exp: now + ttl.as_secs(),
        }
    }

    /// 检查 token 是否过期
    pub fn is_expired(&self) -> bool {
        self.exp < now_secs()
    }
}

/// Token 签发与校验
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    ttl: Duration,
}

impl JwtManager {
    /// # 参数
    /// - `secret`: HMAC 密钥
    /// - `algorithm`: 算法名 (如 `HS256`)
    /// - `ttl`: token 有效期
    pub fn new(secret: &str, algorithm: &str, ttl: Duration) -> Result<Self, AuthError> {
        let algorithm = Algorithm::from_str(algorithm)
            .map_err(|e| AuthError::Internal(format!("Unsupported JWT algorithm {}: {}", algorithm, e)))?;
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(AuthError::Internal(format!(
                "Only HMAC algorithms are supported, got {:?}",
                algorithm
            )));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            algorithm,
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 生成 JWT token
    pub fn generate_token(&self, user_id: &str, email: &str) -> Result<String, AuthError> {
        let claims = Claims::new(user_id.to_string(), email.to_string(), self.ttl);
        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Failed to generate JWT token: {}", e)))
    }

    /// 验证 JWT token 并返回 Claims
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            })?
            .claims;

        if claims.sub.is_empty() {
            return Err(AuthError::InvalidToken("missing subject".to_string()));
        }
        Ok(claims)
    }
}
