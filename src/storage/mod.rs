//! 数据存储模块

// 派生结果缓存 (TTL + 容量上限)
pub mod cache;

// 远程归档下载
pub mod fetch;

// DataFrame → 类型化记录
pub mod frame;

// Parquet 分区后台加载
pub mod loader;

// 统一表持有者
pub mod store;

#[cfg(test)]
pub(crate) mod fixtures;

pub use cache::{CacheKey, CacheStatsSnapshot, NoopCache, ResultCache, TtlCache};
pub use fetch::ArchiveFetcher;
pub use frame::{parse_date, FromFrame};
pub use loader::{DataLoader, TableSource};
pub use store::SalesDataStore;
