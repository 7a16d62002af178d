//! 销售数据存储
//!
//! 进程内唯一的统一表持有者; 所有查询都经由 `query::<T>()` 物化为类型化记录。
//! 首次查询时触发加载, 也可由启动流程调用 `warm_up()` 提前加载。

use polars::prelude::DataFrame;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::frame::FromFrame;
use super::loader::TableSource;
use crate::Result;

/// 销售数据存储
pub struct SalesDataStore {
    source: Arc<dyn TableSource>,
    directory: PathBuf,
}

impl SalesDataStore {
    pub fn new(source: Arc<dyn TableSource>, directory: impl Into<PathBuf>) -> Self {
        Self {
            source,
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// 提前加载统一表, 返回行数
    pub fn warm_up(&self) -> Result<usize> {
        let table = self.table()?;
        log::info!(
            "Sales data store ready: {} rows from {}",
            table.height(),
            self.directory.display()
        );
        Ok(table.height())
    }

    /// 统一表 (未加载时阻塞直到加载完成)
    pub fn table(&self) -> Result<DataFrame> {
        self.source.load(&self.directory)
    }

    /// 将统一表物化为 `T` 的记录序列
    pub fn query<T: FromFrame>(&self) -> Result<Vec<T>> {
        let table = self.table()?;
        T::from_frame(&table)
    }

    /// 是否已完成加载 (不触发加载)
    pub fn is_loaded(&self) -> bool {
        self.source.is_loaded()
    }

    /// 已发布表的行数 (不触发加载)
    pub fn row_count(&self) -> usize {
        self.source.current_table().height()
    }
}
