//! 配置管理模块
//!
//! 启动时从 TOML 文件构建一次 `AppConfig`, 之后按值传给各组件的构造函数。
//! 部分字段允许被环境变量覆盖 (见 `apply_env_overrides`)。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config/salesreport.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub data: DataConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 数据集配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Parquet 分区目录
    pub directory: PathBuf,
    /// 目录不存在时下载的 `.tar.zst` 归档地址
    #[serde(default)]
    pub archive_url: Option<String>,
}

/// 结果缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// 令牌配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub secret_key: String,
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            algorithm: default_algorithm(),
            token_ttl_minutes: default_token_ttl_minutes(),
        }
    }
}

impl AuthConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_minutes * 60)
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 额外写入的日志文件 (同时输出到 stderr)
    #[serde(default = "default_log_file")]
    pub file: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            level: default_log_level(),
        }
    }
}

// 默认值函数
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost".to_string(),
        "http://localhost:8000".to_string(),
    ]
}
fn default_max_entries() -> usize {
    128
}
fn default_ttl_secs() -> u64 {
    3600
}
fn default_algorithm() -> String {
    "HS256".to_string()
}
fn default_token_ttl_minutes() -> u64 {
    30
}
fn default_log_file() -> Option<PathBuf> {
    Some(PathBuf::from("app.log"))
}
fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// 只解析文件, 不应用环境变量
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse config file: {}", e))
    }

    /// 解析文件, 应用环境变量覆盖并校验
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// 应用环境变量覆盖
    ///
    /// `SECRET_KEY`, `DATA_DIRECTORY`, `DATA_ARCHIVE_URL`, `MAX_SIZE_CACHE`,
    /// `TTL_CACHE`, `ACCESS_TOKEN_EXPIRE_MINUTES`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup("SECRET_KEY") {
            self.auth.secret_key = secret;
        }
        if let Some(dir) = lookup("DATA_DIRECTORY") {
            self.data.directory = PathBuf::from(dir);
        }
        if let Some(url) = lookup("DATA_ARCHIVE_URL") {
            self.data.archive_url = Some(url).filter(|u| !u.is_empty());
        }
        if let Some(v) = lookup("MAX_SIZE_CACHE") {
            self.cache.max_entries = parse_env("MAX_SIZE_CACHE", &v)?;
        }
        if let Some(v) = lookup("TTL_CACHE") {
            self.cache.ttl_secs = parse_env("TTL_CACHE", &v)?;
        }
        if let Some(v) = lookup("ACCESS_TOKEN_EXPIRE_MINUTES") {
            self.auth.token_ttl_minutes = parse_env("ACCESS_TOKEN_EXPIRE_MINUTES", &v)?;
        }
        Ok(())
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), String> {
        if self.auth.secret_key.trim().is_empty() {
            return Err("auth.secret_key must be set (or SECRET_KEY)".to_string());
        }
        if self.data.directory.as_os_str().is_empty() {
            return Err("data.directory must be set (or DATA_DIRECTORY)".to_string());
        }
        if self.cache.max_entries == 0 {
            return Err("cache.max_entries must be greater than 0".to_string());
        }
        if self.cache.ttl_secs == 0 {
            return Err("cache.ttl_secs must be greater than 0".to_string());
        }
        if self.auth.token_ttl_minutes == 0 {
            return Err("auth.token_ttl_minutes must be greater than 0".to_string());
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("Invalid value for {}: {}", key, value))
}
