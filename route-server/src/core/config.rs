use std::time::Duration;

use crate::auth::JwtConfig;
use crate::auth::jwt::generate_printable_secret;
use crate::core::BoxError;

/// 服务器配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | ENVIRONMENT | development | 运行环境 |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | DATABASE_PATH | ./data/read-route.db | SQLite 文件 |
/// | DB_MAX_CONNECTIONS | 5 | 连接池大小 |
/// | DB_BUSY_TIMEOUT_MS | 5000 | SQLite busy_timeout / 连接获取超时 |
/// | JWT_SECRET | 开发环境随机生成 | HS256 密钥 (至少 32 字符) |
/// | JWT_ISSUER | read-route | 令牌签发者 |
/// | JWT_AUDIENCE | read-route-clients | 令牌受众 |
/// | STRIPE_SECRET_KEY | 开发占位符 | Stripe 密钥 |
/// | STRIPE_WEBHOOK_SECRET | 未设置 | 设置后启用 webhook |
/// | STRIPE_API_BASE | https://api.stripe.com | 网关地址 |
/// | SITE_DOMAIN | http://localhost:5173 | 结账跳转前缀 |
/// | CHECKOUT_CURRENCY | bdt | 结账币种 |
/// | GATEWAY_TIMEOUT_MS | 10000 | 网关调用超时 |
/// | REQUEST_TIMEOUT_MS | 30000 | 请求超时 |
/// | LOG_LEVEL / LOG_JSON / LOG_DIR | info / false / 未设置 | 日志 |
#[derive(Debug, Clone)]
pub struct Config {
    /// 运行环境: development | staging | production
    pub environment: String,
    pub http_port: u16,
    pub database_path: String,
    pub db_max_connections: u32,
    pub db_busy_timeout_ms: u64,
    pub jwt: JwtConfig,
    pub stripe_secret_key: String,
    /// None 时 webhook 路由返回 404
    pub stripe_webhook_secret: Option<String>,
    pub stripe_api_base: String,
    pub site_domain: String,
    pub checkout_currency: String,
    pub gateway_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Require a secret env var: must be set and non-empty outside development.
    fn require_secret(name: &str, environment: &str) -> Result<Option<String>, BoxError> {
        match std::env::var(name) {
            Ok(v) if !v.is_empty() => Ok(Some(v)),
            _ if environment != "development" => {
                Err(format!("{name} must be set in {environment} environment").into())
            }
            _ => Ok(None),
        }
    }

    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = env_or("ENVIRONMENT", "development");

        let jwt_secret = match Self::require_secret("JWT_SECRET", &environment)? {
            Some(secret) => {
                if secret.len() < 32 && environment != "development" {
                    return Err("JWT_SECRET must be at least 32 characters long".into());
                }
                secret
            }
            None => {
                // 日志尚未初始化
                eprintln!("JWT_SECRET not set, generating a temporary development key");
                generate_printable_secret()?
            }
        };

        let stripe_secret_key = Self::require_secret("STRIPE_SECRET_KEY", &environment)?
            .unwrap_or_else(|| "dev-STRIPE_SECRET_KEY-not-for-production".into());

        Ok(Self {
            http_port: env_parse("HTTP_PORT", 3000),
            database_path: env_or("DATABASE_PATH", "./data/read-route.db"),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", 5),
            db_busy_timeout_ms: env_parse("DB_BUSY_TIMEOUT_MS", 5000),
            jwt: JwtConfig {
                secret: jwt_secret,
                expiration_minutes: env_parse("JWT_EXPIRATION_MINUTES", 1440),
                issuer: env_or("JWT_ISSUER", "read-route"),
                audience: env_or("JWT_AUDIENCE", "read-route-clients"),
            },
            stripe_secret_key,
            stripe_webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            stripe_api_base: env_or("STRIPE_API_BASE", "https://api.stripe.com"),
            site_domain: env_or("SITE_DOMAIN", "http://localhost:5173"),
            checkout_currency: env_or("CHECKOUT_CURRENCY", "bdt").to_ascii_lowercase(),
            gateway_timeout_ms: env_parse("GATEWAY_TIMEOUT_MS", 10_000),
            request_timeout_ms: env_parse("REQUEST_TIMEOUT_MS", 30_000),
            log_level: env_or("LOG_LEVEL", "info"),
            log_json: env_parse("LOG_JSON", false),
            log_dir: std::env::var("LOG_DIR").ok().filter(|s| !s.is_empty()),
            environment,
        })
    }

    /// 测试用配置: 指定数据库路径，其余取开发默认值，不读环境变量
    pub fn for_tests(database_path: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            environment: "development".into(),
            http_port: 0,
            database_path: database_path.into(),
            db_max_connections: 5,
            db_busy_timeout_ms: 5000,
            jwt: JwtConfig {
                secret: jwt_secret.into(),
                expiration_minutes: 60,
                issuer: "read-route".into(),
                audience: "read-route-clients".into(),
            },
            stripe_secret_key: "sk_test_placeholder".into(),
            stripe_webhook_secret: None,
            stripe_api_base: "http://127.0.0.1:9".into(),
            site_domain: "http://localhost:5173".into(),
            checkout_currency: "bdt".into(),
            gateway_timeout_ms: 2000,
            request_timeout_ms: 30_000,
            log_level: "info".into(),
            log_json: false,
            log_dir: None,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_millis(self.gateway_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn db_busy_timeout(&self) -> Duration {
        Duration::from_millis(self.db_busy_timeout_ms)
    }
}
