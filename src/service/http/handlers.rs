//! HTTP API 通用处理器

use actix_web::error::BlockingError;
use actix_web::{web, HttpResponse};
use serde::Serialize;
use std::sync::Arc;

use super::models::{ApiResponse, HealthResponse};
use crate::query::SaleService;
use crate::storage::SalesDataStore;
use crate::user::{AuthError, IdentityProvider};
use crate::StoreError;

/// 应用状态
pub struct AppState {
    pub sale_service: Arc<dyn SaleService>,
    pub store: Arc<SalesDataStore>,
    pub identity: Arc<dyn IdentityProvider>,
}

/// 健康检查
pub async fn health_check(state: web::Data<Arc<AppState>>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        dataset_loaded: state.store.is_loaded(),
        row_count: state.store.row_count(),
    })
}

/// 查询错误 → HTTP 响应
pub fn store_error_response(e: &StoreError) -> HttpResponse {
    match e {
        StoreError::CallerContract(_) => {
            HttpResponse::BadRequest().json(ApiResponse::<()>::error(400, e.to_string()))
        }
        StoreError::NotFound(_) | StoreError::EmptyDataset(_) => {
            HttpResponse::NotFound().json(ApiResponse::<()>::error(404, e.to_string()))
        }
        _ => {
            log::error!("Query failed: {}", e);
            HttpResponse::InternalServerError().json(ApiResponse::<()>::error(500, e.to_string()))
        }
    }
}

/// 认证错误 → HTTP 响应
pub fn auth_error_response(e: &AuthError) -> HttpResponse {
    match e {
        AuthError::DuplicateEmail(_) | AuthError::InvalidRequest(_) => {
            HttpResponse::BadRequest().json(ApiResponse::<()>::error(400, e.to_string()))
        }
        AuthError::Internal(_) => {
            log::error!("Auth failed: {}", e);
            HttpResponse::InternalServerError().json(ApiResponse::<()>::error(500, e.to_string()))
        }
        _ => HttpResponse::Unauthorized().json(ApiResponse::<()>::error(401, e.to_string())),
    }
}

/// 阻塞任务执行失败
pub fn blocking_error_response(e: BlockingError) -> HttpResponse {
    log::error!("Blocking task failed: {}", e);
    HttpResponse::InternalServerError().json(ApiResponse::<()>::error(500, e.to_string()))
}

/// 统一封装成功数据
pub fn ok_json<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::success(data))
}
