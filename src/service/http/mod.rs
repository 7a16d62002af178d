//! HTTP API 服务模块
//!
//! 提供销售查询与用户认证的 RESTful API (前缀 `/api/v1`)

pub mod auth;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod sales;

use actix_web::{middleware, web, App, HttpServer as ActixHttpServer};
use std::io;
use std::sync::Arc;

use handlers::AppState;

/// HTTP 服务器
pub struct HttpServer {
    /// 应用状态
    app_state: Arc<AppState>,

    /// 监听地址
    bind_address: String,

    /// 允许跨域的来源
    cors_origins: Vec<String>,
}

impl HttpServer {
    /// 创建新的 HTTP 服务器
    pub fn new(app_state: Arc<AppState>, bind_address: String, cors_origins: Vec<String>) -> Self {
        Self {
            app_state,
            bind_address,
            cors_origins,
        }
    }

    /// 启动 HTTP 服务器
    pub async fn run(self) -> io::Result<()> {
        log::info!("Starting HTTP server at {}", self.bind_address);

        let app_state = self.app_state.clone();
        let cors_origins = self.cors_origins.clone();

        ActixHttpServer::new(move || {
            let cors = cors_origins
                .iter()
                .fold(actix_cors::Cors::default(), |cors, origin| {
                    cors.allowed_origin(origin)
                })
                .allow_any_method()
                .allow_any_header()
                .supports_credentials()
                .max_age(3600);

            App::new()
                // 应用状态
                .app_data(web::Data::new(app_state.clone()))
                // 中间件
                .wrap(middleware::Logger::default())
                .wrap(middleware::Compress::default())
                .wrap(cors)
                // 配置路由
                .configure(routes::configure)
        })
        .bind(&self.bind_address)?
        .run()
        .await
    }
}
