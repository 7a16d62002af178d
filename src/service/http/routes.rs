//! HTTP API 路由配置

use actix_web::error::InternalError;
use actix_web::{web, HttpResponse};

use super::auth;
use super::handlers;
use super::models::ApiResponse;
use super::sales;

fn bad_request(message: String) -> actix_web::Error {
    let response = HttpResponse::BadRequest().json(ApiResponse::<()>::error(400, message.clone()));
    InternalError::from_response(message, response).into()
}

/// 配置所有路由
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        // 请求体/查询参数解析失败统一返回 400
        .app_data(web::JsonConfig::default().error_handler(|err, _req| bad_request(err.to_string())))
        .app_data(web::QueryConfig::default().error_handler(|err, _req| bad_request(err.to_string())))
        .app_data(web::FormConfig::default().error_handler(|err, _req| bad_request(err.to_string())))

        // 健康检查
        .route("/health", web::get().to(handlers::health_check))

        .service(
            web::scope("/api/v1")
                // 销售查询 (需要 Bearer Token)
                .route("/sales/employee", web::post().to(sales::sales_by_employee))
                .route("/sales/product", web::post().to(sales::sales_by_product))
                .route("/sales/store", web::post().to(sales::sales_by_store))
                .route("/sales/store/total_avg", web::get().to(sales::total_avg_by_store))
                .route("/sales/product/total_avg", web::get().to(sales::total_avg_by_product))
                .route("/sales/employee/total_avg", web::get().to(sales::total_avg_by_employee))

                // 用户
                .route("/users/register", web::post().to(auth::register))
                .route("/users/login", web::post().to(auth::login))
                .route("/users/token", web::post().to(auth::token))
                .route("/users/me", web::get().to(auth::get_current_user))
        );
}
