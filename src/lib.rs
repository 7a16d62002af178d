//! # SALESREPORT-RS
//!
//! 销售报表服务 - 基于 Parquet 分区文件的内存查询后端
//!
//! ## 核心能力
//!
//! - **数据加载**: 后台线程读取分区目录下全部 Parquet 文件并合并为统一表 (storage/loader)
//! - **结果缓存**: 带 TTL 与容量上限的派生结果缓存 (storage/cache)
//! - **数据存储**: 统一表的唯一持有者, 按类型物化记录 (storage/store)
//! - **销售查询**: 按维度 + 日期区间过滤、按维度分组聚合, 全部分页 (query/)
//! - **对外服务**: 带 Bearer Token 认证的 HTTP API (基于 Actix-web)
//!
//! ## 架构设计
//!
//! ```text
//! 客户端 (HTTP)
//!     ↓
//! Service Layer (service/)  ← Token 校验 (utils/jwt + user/)
//!     ↓
//! Sales Query Service (query/)
//!     ↓
//! Data Store (storage/store) ← Result Cache (storage/cache)
//!     ↓
//! Data Loader (storage/loader, 后台线程)
//!     ↓
//! Parquet 分区目录
//! ```

// ============================================================================
// 外部依赖
// ============================================================================

// Web 框架
pub use actix_web;

// 查询引擎
pub use polars;

// 时间
pub use chrono;

// 日志
pub use log;

// ============================================================================
// 内部模块
// ============================================================================

/// 领域模型 (销售记录 / 聚合结果)
pub mod domain;

/// 数据加载、缓存与存储
pub mod storage;

/// 销售查询服务
pub mod query;

/// 用户管理 (身份提供者)
pub mod user;

/// 对外服务层 (HTTP)
pub mod service;

/// 工具模块 (配置 / JWT / 日志)
pub mod utils;

// ============================================================================
// 重导出常用类型
// ============================================================================

pub use domain::{DimensionSales, EmployeeSales, ProductSales, SaleRecord, SalesDimension, StoreSales};
pub use query::{Page, SaleService, SalesQueryService};
pub use storage::{DataLoader, NoopCache, ResultCache, SalesDataStore, TtlCache};

// ============================================================================
// 全局错误类型
// ============================================================================

/// 数据存储错误类型
///
/// 需要 `Clone`: 一次失败的后台加载要交给所有等待者。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Data directory not found: {0}")]
    NotFound(String),

    #[error("No parquet partitions found in directory: {0}")]
    EmptyDataset(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Invalid parameter: {0}")]
    CallerContract(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Archive fetch failed: {0}")]
    Fetch(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
