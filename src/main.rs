//! 销售报表服务
//!
//! 启动流程:
//! 1. 加载配置 (TOML + 环境变量)
//! 2. 初始化日志
//! 3. 构建 缓存 → 加载器 → 数据存储 → 查询服务
//! 4. 预加载数据集并物化销售记录 (失败则退出)
//! 5. 构建用户管理器并启动 HTTP 服务
//!
//! 运行: cargo run --bin salesreport-server [config/salesreport.toml]

use anyhow::Context;
use std::sync::Arc;

use salesreport::query::{SaleService, SalesQueryService};
use salesreport::service::http::handlers::AppState;
use salesreport::service::http::HttpServer;
use salesreport::storage::{ArchiveFetcher, DataLoader, ResultCache, SalesDataStore, TtlCache};
use salesreport::user::{IdentityProvider, UserManager};
use salesreport::utils::config::{AppConfig, DEFAULT_CONFIG_PATH};
use salesreport::utils::jwt::JwtManager;
use salesreport::utils::logging::init_logging;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // 1. 加载配置文件
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = AppConfig::load(&config_path)
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    // 2. 初始化日志
    init_logging(&config.logging).map_err(anyhow::Error::msg)?;
    log::info!("Configuration loaded from {}", config_path);
    log::info!("  Data directory: {}", config.data.directory.display());
    log::info!(
        "  Cache: max {} entries, ttl {}s",
        config.cache.max_entries,
        config.cache.ttl_secs
    );

    // 3. 数据层
    let cache: Arc<dyn ResultCache> =
        Arc::new(TtlCache::new(config.cache.max_entries, config.cache.ttl()));
    let loader = match &config.data.archive_url {
        Some(url) => DataLoader::with_fetcher(ArchiveFetcher::new(url.clone())),
        None => DataLoader::new(),
    };
    let store = Arc::new(SalesDataStore::new(
        Arc::new(loader),
        config.data.directory.clone(),
    ));
    let query_service = Arc::new(SalesQueryService::new(store.clone(), cache));

    // 4. 预加载: 读取分区、物化销售记录并写入缓存
    let warm_service = query_service.clone();
    let records = tokio::task::spawn_blocking(move || warm_service.sales_table())
        .await
        .context("Data loading task failed")?;
    match records {
        Ok(records) => log::info!("Dataset loaded: {} sales records", records.len()),
        Err(e) => {
            log::error!("Failed to load dataset during startup: {}", e);
            return Err(e).context("Dataset could not be loaded");
        }
    }

    // 5. 用户与 HTTP 服务
    let jwt = JwtManager::new(
        &config.auth.secret_key,
        &config.auth.algorithm,
        config.auth.token_ttl(),
    )
    .map_err(|e| anyhow::anyhow!("Invalid auth configuration: {}", e))?;
    let identity: Arc<dyn IdentityProvider> = Arc::new(UserManager::new(jwt));

    let sale_service: Arc<dyn SaleService> = query_service;
    let app_state = Arc::new(AppState {
        sale_service,
        store,
        identity,
    });

    HttpServer::new(
        app_state,
        config.server.bind_address(),
        config.server.cors_origins.clone(),
    )
    .run()
    .await
    .context("HTTP server failed")?;

    log::info!("Server stopped");
    Ok(())
}
