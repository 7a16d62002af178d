//! 用户管理模块
//!
//! 进程内身份提供者: 注册、登录 (签发访问令牌)、按令牌解析当前用户

pub mod user_manager;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 用户实体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// 用户ID (UUID)
    pub uid: String,

    /// 邮箱 (唯一, 登录名)
    pub email: String,

    /// 显示名称
    pub display_name: String,

    /// 密码哈希 (bcrypt)
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// 创建时间 (RFC 3339)
    pub created_at: String,
}

impl User {
    /// 创建新用户
    pub fn new(email: String, display_name: String, password_hash: String) -> Self {
        Self {
            uid: Uuid::new_v4().to_string(),
            email,
            display_name,
            password_hash,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    /// 验证密码
    pub fn verify_password(&self, password: &str) -> bool {
        bcrypt::verify(password, &self.password_hash).unwrap_or(false)
    }

    /// 对外展示的用户信息 (不含密码哈希)
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            uid: self.uid.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            created_at: self.created_at.clone(),
        }
    }
}

/// 用户信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    pub created_at: String,
}

/// 用户注册请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

/// 用户登录请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserLoginRequest {
    pub email: String,
    pub password: String,
}

/// 访问令牌响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
}

impl AccessToken {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

/// 认证与用户管理错误
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid registration: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// 身份提供者 (HTTP 层依赖此 trait)
pub trait IdentityProvider: Send + Sync {
    /// 注册新用户
    fn register(&self, req: UserRegisterRequest) -> Result<UserProfile, AuthError>;

    /// 校验邮箱和密码, 签发访问令牌
    fn login(&self, req: UserLoginRequest) -> Result<AccessToken, AuthError>;

    /// 校验访问令牌, 返回令牌所属的已注册用户
    fn verify_token(&self, token: &str) -> Result<UserProfile, AuthError>;
}

// 重新导出
pub use user_manager::UserManager;
