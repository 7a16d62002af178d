//! 用户认证 HTTP API
//!
//! 提供注册、登录与 Bearer Token 校验 (`AuthenticatedUser` 提取器)

use actix_web::dev::Payload;
use actix_web::error::{ErrorInternalServerError, InternalError};
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest, HttpResponse, Result};
use futures::future::{ready, Ready};
use std::sync::Arc;

use super::handlers::{auth_error_response, blocking_error_response, ok_json, AppState};
use super::models::{ApiResponse, TokenForm};
use crate::user::{IdentityProvider, UserLoginRequest, UserProfile, UserRegisterRequest};

/// 通过 Bearer Token 认证的当前用户
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub UserProfile);

impl AuthenticatedUser {
    pub fn uid(&self) -> &str {
        &self.0.uid
    }
}

/// 解析 `Authorization: Bearer <token>`
fn bearer_token(req: &HttpRequest) -> Option<&str> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

fn unauthorized(req: &HttpRequest, message: String) -> actix_web::Error {
    log::error!("{}: Authorization invalid {}", req.path(), message);
    let response = HttpResponse::Unauthorized().json(ApiResponse::<()>::error(401, message.clone()));
    InternalError::from_response(message, response).into()
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser> {
    let state = req
        .app_data::<web::Data<Arc<AppState>>>()
        .ok_or_else(|| ErrorInternalServerError("application state not configured"))?;

    let token = bearer_token(req)
        .ok_or_else(|| unauthorized(req, "Missing bearer token".to_string()))?;

    state
        .identity
        .verify_token(token)
        .map(AuthenticatedUser)
        .map_err(|e| unauthorized(req, e.to_string()))
}

impl FromRequest for AuthenticatedUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

/// 用户注册
pub async fn register(
    req: web::Json<UserRegisterRequest>,
    state: web::Data<Arc<AppState>>,
) -> Result<HttpResponse> {
    let identity = state.identity.clone();
    let req = req.into_inner();

    match web::block(move || identity.register(req)).await {
        Ok(Ok(profile)) => Ok(ok_json(serde_json::json!({
            "message": "User registered",
            "uid": profile.uid,
        }))),
        Ok(Err(e)) => {
            log::error!("User registration failed: {}", e);
            Ok(auth_error_response(&e))
        }
        Err(e) => Ok(blocking_error_response(e)),
    }
}

async fn issue_token(state: &AppState, req: UserLoginRequest) -> HttpResponse {
    let identity = state.identity.clone();
    let email = req.email.clone();

    match web::block(move || identity.login(req)).await {
        Ok(Ok(token)) => ok_json(token),
        Ok(Err(e)) => {
            log::error!("Login failed for {}: {}", email, e);
            auth_error_response(&e)
        }
        Err(e) => blocking_error_response(e),
    }
}

/// 用户登录
pub async fn login(
    req: web::Json<UserLoginRequest>,
    state: web::Data<Arc<AppState>>,
) -> Result<HttpResponse> {
    Ok(issue_token(&state, req.into_inner()).await)
}

/// OAuth2 密码模式登录 (表单)
pub async fn token(
    form: web::Form<TokenForm>,
    state: web::Data<Arc<AppState>>,
) -> Result<HttpResponse> {
    let form = form.into_inner();
    let req = UserLoginRequest {
        email: form.username,
        password: form.password,
    };
    Ok(issue_token(&state, req).await)
}

/// 获取当前用户信息
pub async fn get_current_user(user: AuthenticatedUser) -> Result<HttpResponse> {
    Ok(ok_json(user.0))
}
