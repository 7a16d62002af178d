//! 用户管理器
//!
//! 负责用户的注册、登录与令牌校验

use super::{
    AccessToken, AuthError, IdentityProvider, User, UserLoginRequest, UserProfile,
    UserRegisterRequest,
};
use crate::utils::jwt::JwtManager;
use dashmap::DashMap;
use std::sync::Arc;

pub type Result<T> = std::result::Result<T, AuthError>;

/// 用户管理器
pub struct UserManager {
    /// 用户映射 (uid -> User)
    pub(crate) users: DashMap<String, Arc<User>>,

    /// 邮箱索引 (email -> uid)
    pub(crate) email_index: DashMap<String, String>,

    /// 令牌签发与校验
    jwt: JwtManager,

    /// bcrypt 代价因子
    hash_cost: u32,
}

impl UserManager {
    /// 创建用户管理器
    pub fn new(jwt: JwtManager) -> Self {
        Self::with_cost(jwt, bcrypt::DEFAULT_COST)
    }

    /// 指定 bcrypt 代价因子 (测试中使用较低的代价)
    pub fn with_cost(jwt: JwtManager, hash_cost: u32) -> Self {
        Self {
            users: DashMap::new(),
            email_index: DashMap::new(),
            jwt,
            hash_cost,
        }
    }

    fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }

    /// 注册新用户
    pub fn register(&self, req: UserRegisterRequest) -> Result<User> {
        let email = Self::normalize_email(&req.email);
        if email.is_empty() || !email.contains('@') {
            return Err(AuthError::InvalidRequest(format!("Invalid email: {}", req.email)));
        }
        if req.password.is_empty() {
            return Err(AuthError::InvalidRequest("Password must not be empty".to_string()));
        }

        // 密码加密
        let password_hash = bcrypt::hash(&req.password, self.hash_cost)
            .map_err(|e| AuthError::Internal(format!("Password hashing failed: {}", e)))?;

        let user = User::new(email.clone(), req.display_name, password_hash);
        let uid = user.uid.clone();

        // 邮箱索引占位, 并发注册同一邮箱只有一个成功
        match self.email_index.entry(email.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(AuthError::DuplicateEmail(email));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                self.users
                    .insert(uid.clone(), Arc::new(user.clone()));
                slot.insert(uid.clone());
            }
        }

        log::info!("User registered: {} ({})", user.email, user.uid);

        Ok(user)
    }

    /// 用户登录, 返回访问令牌
    pub fn login(&self, req: UserLoginRequest) -> Result<AccessToken> {
        let email = Self::normalize_email(&req.email);
        let user = self
            .get_user_by_email(&email)
            .map_err(|_| AuthError::InvalidCredentials)?;

        // 验证密码
        if !user.verify_password(&req.password) {
            log::warn!("Login failed for {}: invalid password", email);
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.jwt.generate_token(&user.uid, &user.email)?;

        log::info!("User {} logged in", user.uid);
        Ok(AccessToken::bearer(token))
    }

    /// 验证 JWT token 并返回用户信息
    pub fn verify_token(&self, token: &str) -> Result<UserProfile> {
        let claims = self.jwt.verify_token(token)?;

        // 令牌主体必须是已注册用户
        let user = self.get_user(&claims.sub)?;
        Ok(user.profile())
    }

    /// 获取用户
    pub fn get_user(&self, uid: &str) -> Result<User> {
        let user_arc = self
            .users
            .get(uid)
            .ok_or_else(|| AuthError::UserNotFound(uid.to_string()))?;

        let user = User::clone(&user_arc);
        Ok(user)
    }

    /// 通过邮箱获取用户
    pub fn get_user_by_email(&self, email: &str) -> Result<User> {
        let uid = self
            .email_index
            .get(&Self::normalize_email(email))
            .ok_or_else(|| AuthError::UserNotFound(email.to_string()))?
            .clone();

        self.get_user(&uid)
    }

    /// 获取用户数量
    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

impl IdentityProvider for UserManager {
    fn register(&self, req: UserRegisterRequest) -> Result<UserProfile> {
        UserManager::register(self, req).map(|user| user.profile())
    }

    fn login(&self, req: UserLoginRequest) -> Result<AccessToken> {
        UserManager::login(self, req)
    }

    fn verify_token(&self, token: &str) -> Result<UserProfile> {
        UserManager::verify_token(self, token)
    }
}
