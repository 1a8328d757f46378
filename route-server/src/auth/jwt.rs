//! JWT 令牌服务
//!
//! HS256 bearer token 的签发与校验。服务只信任 `email` 声明，角色永远从存储查询。

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JWT 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// JWT 密钥 (生产环境至少 32 字节)
    pub secret: String,
    /// 令牌过期时间 (分钟)
    pub expiration_minutes: i64,
    pub issuer: String,
    pub audience: String,
}

/// 令牌声明
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (provider 侧用户 ID，仅用于日志)
    pub sub: String,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub aud: String,
}

/// JWT 错误
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("无效令牌: {0}")]
    InvalidToken(String),

    #[error("令牌已过期")]
    ExpiredToken,

    #[error("无效签名")]
    InvalidSignature,

    #[error("令牌生成失败: {0}")]
    GenerationFailed(String),

    #[error("密钥生成失败: {0}")]
    KeyGenerationFailed(String),
}

/// 生成可打印的随机密钥 (开发环境未配置 JWT_SECRET 时使用)
pub fn generate_printable_secret() -> Result<String, JwtError> {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

    let rng = SystemRandom::new();
    let mut bytes = [0u8; 64];
    rng.fill(&mut bytes)
        .map_err(|_| JwtError::KeyGenerationFailed("system RNG unavailable".to_string()))?;

    // 64 个字符，字母表长度 64，取模无偏
    Ok(bytes
        .iter()
        .map(|b| ALPHABET[(*b as usize) % ALPHABET.len()] as char)
        .collect())
}

/// JWT 令牌服务
#[derive(Clone)]
pub struct JwtService {
    pub config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("issuer", &self.config.issuer)
            .field("audience", &self.config.audience)
            .finish_non_exhaustive()
    }
}

impl JwtService {
    pub fn with_config(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// 为指定邮箱签发令牌 (开发工具和测试使用)
    pub fn generate_token(&self, subject: &str, email: &str) -> Result<String, JwtError> {
        let now = Utc::now();
        let expiration = now + Duration::minutes(self.config.expiration_minutes);

        let claims = Claims {
            sub: subject.to_string(),
            email: email.to_string(),
            exp: expiration.timestamp(),
            iat: now.timestamp(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::GenerationFailed(e.to_string()))
    }

    /// 验证并解码令牌
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.config.audience]);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss", "aud"]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
                ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                _ => JwtError::InvalidToken(e.to_string()),
            }
        })?;

        Ok(token_data.claims)
    }

    /// 从 Authorization 头提取令牌
    pub fn extract_from_header(header: &str) -> Option<&str> {
        header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::with_config(JwtConfig {
            secret: "0123456789abcdef0123456789abcdef".into(),
            expiration_minutes: 5,
            issuer: "read-route".into(),
            audience: "read-route-clients".into(),
        })
    }

    #[test]
    fn test_generate_and_validate() {
        let svc = service();
        let token = svc.generate_token("uid-1", "reader@example.com").unwrap();
        let claims = svc.validate_token(&token).unwrap();
        assert_eq!(claims.email, "reader@example.com");
        assert_eq!(claims.sub, "uid-1");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = service().generate_token("uid-1", "a@b.c").unwrap();
        let other = JwtService::with_config(JwtConfig {
            secret: "ffffffffffffffffffffffffffffffff".into(),
            ..service().config
        });
        assert!(matches!(
            other.validate_token(&token),
            Err(JwtError::InvalidSignature)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let svc = JwtService::with_config(JwtConfig {
            // 超过默认 60 秒 leeway
            expiration_minutes: -10,
            ..service().config
        });
        let token = svc.generate_token("uid-1", "a@b.c").unwrap();
        assert!(matches!(svc.validate_token(&token), Err(JwtError::ExpiredToken)));
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let token = service().generate_token("uid-1", "a@b.c").unwrap();
        let other = JwtService::with_config(JwtConfig {
            audience: "someone-else".into(),
            ..service().config
        });
        assert!(matches!(
            other.validate_token(&token),
            Err(JwtError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_extract_from_header() {
        assert_eq!(JwtService::extract_from_header("Bearer abc"), Some("abc"));
        assert_eq!(JwtService::extract_from_header("Bearer "), None);
        assert_eq!(JwtService::extract_from_header("Basic abc"), None);
        assert_eq!(JwtService::extract_from_header("abc"), None);
    }

    #[test]
    fn test_printable_secret() {
        let secret = generate_printable_secret().unwrap();
        assert_eq!(secret.len(), 64);
        assert!(secret.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
