//! Parquet 分区加载器
//!
//! 读取目录下全部 `*.parquet` 分区 (按文件名字典序), 纵向拼接为一张统一表。
//!
//! 加载流程:
//! ```text
//! load(dir) ──► 状态机 Idle ──► Loading{latch} ──► Loaded
//!                  │                 │
//!                  │           后台线程 "sales-loader"
//!                  │           列目录 → 并行读取 → 校验列集 → 拼接
//!                  │                 │
//!                  └── 调用方阻塞在 latch 上, 直到后台线程发布结果
//! ```
//!
//! 同一时刻最多一个加载在进行; 并发调用者共享同一个 latch。
//! 统一表在全部分区合并完成后才发布, 读者要么看到空表, 要么看到完整表。

use parking_lot::{Condvar, Mutex};
use polars::prelude::*;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::fs::File;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::fetch::ArchiveFetcher;
use crate::domain::SALE_COLUMNS;
use crate::{Result, StoreError};

/// 统一表来源
pub trait TableSource: Send + Sync {
    /// 加载目录 (阻塞直到完成)
    fn load(&self, directory: &Path) -> Result<DataFrame>;

    /// 当前已发布的表 (未加载时为空表)
    fn current_table(&self) -> DataFrame;

    /// 是否已完成加载 (零行数据集同样视为已加载)
    fn is_loaded(&self) -> bool;
}

/// 一次性完成信号
///
/// 后台线程写入结果后唤醒所有等待者; 失败结果同样分发给每个等待者。
struct LoadLatch {
    result: Mutex<Option<Result<DataFrame>>>,
    ready: Condvar,
}

impl LoadLatch {
    fn new() -> Self {
        Self {
            result: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    fn set(&self, result: Result<DataFrame>) {
        *self.result.lock() = Some(result);
        self.ready.notify_all();
    }

    fn wait(&self) -> Result<DataFrame> {
        let mut guard = self.result.lock();
        loop {
            if let Some(result) = guard.as_ref() {
                return result.clone();
            }
            self.ready.wait(&mut guard);
        }
    }
}

enum LoadState {
    Idle,
    Loading {
        directory: PathBuf,
        latch: Arc<LoadLatch>,
    },
    Loaded {
        directory: PathBuf,
    },
}

enum Next {
    Ready,
    Join(Arc<LoadLatch>),
    WaitOther(Arc<LoadLatch>),
    Start,
}

struct LoaderInner {
    state: Mutex<LoadState>,
    /// 已发布的统一表 (与 get_current_table 共用此锁)
    table: Mutex<DataFrame>,
    fetcher: Option<ArchiveFetcher>,
    load_count: AtomicUsize,
}

/// 后台分区加载器
#[derive(Clone)]
pub struct DataLoader {
    inner: Arc<LoaderInner>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// 数据目录不存在时从 `fetcher` 下载归档
    pub fn with_fetcher(fetcher: ArchiveFetcher) -> Self {
        Self::build(Some(fetcher))
    }

    fn build(fetcher: Option<ArchiveFetcher>) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                state: Mutex::new(LoadState::Idle),
                table: Mutex::new(DataFrame::empty()),
                fetcher,
                load_count: AtomicUsize::new(0),
            }),
        }
    }

    /// 加载目录下全部分区, 阻塞直到后台加载完成
    ///
    /// - 同一目录已加载: 直接返回已发布的表
    /// - 同一目录正在加载: 等待同一个 latch
    /// - 其它目录正在加载: 等其结束后再发起本次加载
    pub fn load(&self, directory: impl AsRef<Path>) -> Result<DataFrame> {
        let directory = directory.as_ref().to_path_buf();

        loop {
            let mut state = self.inner.state.lock();
            let next = match &*state {
                LoadState::Loaded { directory: loaded } if *loaded == directory => Next::Ready,
                LoadState::Loading {
                    directory: loading,
                    latch,
                } if *loading == directory => Next::Join(latch.clone()),
                LoadState::Loading { latch, .. } => Next::WaitOther(latch.clone()),
                _ => Next::Start,
            };

            match next {
                Next::Ready => return Ok(self.inner.table.lock().clone()),
                Next::Join(latch) => {
                    drop(state);
                    return latch.wait();
                }
                Next::WaitOther(latch) => {
                    drop(state);
                    // 其它目录的加载结束后重新检查状态
                    let _ = latch.wait();
                }
                Next::Start => {
                    let latch = Arc::new(LoadLatch::new());
                    self.spawn_worker(directory.clone(), latch.clone())?;
                    *state = LoadState::Loading {
                        directory: directory.clone(),
                        latch: latch.clone(),
                    };
                    drop(state);
                    return latch.wait();
                }
            }
        }
    }

    fn spawn_worker(&self, directory: PathBuf, latch: Arc<LoadLatch>) -> Result<()> {
        let inner = self.inner.clone();

        std::thread::Builder::new()
            .name("sales-loader".to_string())
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| run_load(&inner, &directory)))
                    .unwrap_or_else(|_| {
                        Err(StoreError::Io(format!(
                            "Loader worker panicked while reading {}",
                            directory.display()
                        )))
                    });

                match result {
                    Ok(df) => {
                        *inner.table.lock() = df.clone();
                        *inner.state.lock() = LoadState::Loaded {
                            directory: directory.clone(),
                        };
                        latch.set(Ok(df));
                    }
                    Err(e) => {
                        log::error!("Failed to load {}: {}", directory.display(), e);
                        *inner.state.lock() = LoadState::Idle;
                        latch.set(Err(e));
                    }
                }
            })
            .map_err(|e| StoreError::Io(format!("Failed to spawn loader thread: {}", e)))?;

        Ok(())
    }

    /// 当前已发布表的快照
    pub fn get_current_table(&self) -> DataFrame {
        self.inner.table.lock().clone()
    }

    pub fn is_loaded(&self) -> bool {
        matches!(&*self.inner.state.lock(), LoadState::Loaded { .. })
    }

    /// 后台加载执行次数
    pub fn load_count(&self) -> usize {
        self.inner.load_count.load(Ordering::SeqCst)
    }
}

impl TableSource for DataLoader {
    fn load(&self, directory: &Path) -> Result<DataFrame> {
        DataLoader::load(self, directory)
    }

    fn current_table(&self) -> DataFrame {
        self.get_current_table()
    }

    fn is_loaded(&self) -> bool {
        DataLoader::is_loaded(self)
    }
}

fn run_load(inner: &LoaderInner, directory: &Path) -> Result<DataFrame> {
    inner.load_count.fetch_add(1, Ordering::SeqCst);
    let start = Instant::now();

    let files = match (list_partitions(directory), &inner.fetcher) {
        (Err(StoreError::NotFound(_)), Some(fetcher)) => {
            fetcher.fetch_into(directory)?;
            list_partitions(directory)?
        }
        (result, _) => result?,
    };

    log::info!(
        "Loading {} partitions from {}",
        files.len(),
        directory.display()
    );

    let df = read_partitions(&files)?;

    log::info!(
        "Loaded {} rows from {} partitions in {:?}",
        df.height(),
        files.len(),
        start.elapsed()
    );
    Ok(df)
}

/// 列出目录下的分区文件 (按文件名字典序)
pub fn list_partitions(directory: &Path) -> Result<Vec<PathBuf>> {
    if !directory.is_dir() {
        return Err(StoreError::NotFound(format!(
            "Data directory {} does not exist",
            directory.display()
        )));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(directory)? {
        let path = entry?.path();
        let is_parquet = path.extension().map_or(false, |ext| ext == "parquet");
        if is_parquet && path.is_file() {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(StoreError::EmptyDataset(format!(
            "No parquet files found in {}",
            directory.display()
        )));
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn read_partition(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)?;
    ParquetReader::new(file)
        .finish()
        .map_err(|e| StoreError::Io(format!("Failed to read {}: {}", path.display(), e)))
}

fn column_set(df: &DataFrame) -> BTreeSet<String> {
    df.get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect()
}

/// 并行读取分区并按文件顺序拼接
///
/// 首个分区必须包含全部销售列, 其余分区的列集必须与首个分区一致。
fn read_partitions(files: &[PathBuf]) -> Result<DataFrame> {
    let frames = files
        .par_iter()
        .map(|path| read_partition(path))
        .collect::<Result<Vec<_>>>()?;

    let mut parts = frames.into_iter().zip(files);
    let (mut unified, first_path) = parts
        .next()
        .ok_or_else(|| StoreError::EmptyDataset("No partitions to merge".to_string()))?;

    let expected = column_set(&unified);
    let missing: Vec<&str> = SALE_COLUMNS
        .iter()
        .copied()
        .filter(|c| !expected.contains(*c))
        .collect();
    if !missing.is_empty() {
        return Err(StoreError::SchemaMismatch(format!(
            "{} lacks required columns: {}",
            first_path.display(),
            missing.join(", ")
        )));
    }

    let order: Vec<String> = unified
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    for (frame, path) in parts {
        let found = column_set(&frame);
        if found != expected {
            let missing: Vec<&String> = expected.difference(&found).collect();
            let extra: Vec<&String> = found.difference(&expected).collect();
            return Err(StoreError::SchemaMismatch(format!(
                "{} differs from {}: missing {:?}, unexpected {:?}",
                path.display(),
                first_path.display(),
                missing,
                extra
            )));
        }

        let aligned = frame
            .select(order.iter().map(|name| name.as_str()))
            .map_err(|e| StoreError::SchemaMismatch(format!("{}: {}", path.display(), e)))?;
        unified
            .vstack_mut(&aligned)
            .map_err(|e| StoreError::SchemaMismatch(format!("{}: {}", path.display(), e)))?;
    }

    Ok(unified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::fixtures::{sale_frame, write_partition, write_sales, SaleRow};
    use std::sync::Barrier;
    use tempfile::TempDir;

    fn row(key: &str) -> SaleRow {
        SaleRow::new(key, "2023-01-01", "S1", "P1", "E1", 10.0)
    }

    #[test]
    fn test_missing_directory_is_not_found() {
        let loader = DataLoader::new();
        let result = loader.load("/nonexistent/sales");

        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert!(!loader.is_loaded());
        assert_eq!(loader.get_current_table().height(), 0);
    }

    #[test]
    fn test_directory_without_parquet_is_empty_dataset() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "not a partition").unwrap();

        let result = DataLoader::new().load(tmp.path());
        assert!(matches!(result, Err(StoreError::EmptyDataset(_))));
    }

    #[test]
    fn test_partitions_concatenated_in_file_name_order() {
        let tmp = TempDir::new().unwrap();
        write_sales(tmp.path(), "part-b.parquet", &[row("b1"), row("b2")]);
        write_sales(tmp.path(), "part-a.parquet", &[row("a1")]);
        write_sales(tmp.path(), "part-c.parquet", &[]);

        let loader = DataLoader::new();
        let df = loader.load(tmp.path()).unwrap();

        assert_eq!(df.height(), 3);
        let keys: Vec<Option<&str>> = df.column("KeySale").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(keys, vec![Some("a1"), Some("b1"), Some("b2")]);
        assert!(loader.is_loaded());
        assert_eq!(loader.get_current_table().height(), 3);
    }

    #[test]
    fn test_schema_mismatch_leaves_loader_unloaded() {
        let tmp = TempDir::new().unwrap();
        write_sales(tmp.path(), "a.parquet", &[row("a1")]);
        let narrow = sale_frame(&[row("b1")]).drop("Cedis").unwrap();
        write_partition(tmp.path(), "b.parquet", &narrow);

        let loader = DataLoader::new();
        match loader.load(tmp.path()) {
            Err(StoreError::SchemaMismatch(msg)) => assert!(msg.contains("Cedis")),
            other => panic!("expected SchemaMismatch, got {:?}", other.map(|df| df.height())),
        }
        assert!(!loader.is_loaded());
        assert_eq!(loader.get_current_table().height(), 0);
    }

    #[test]
    fn test_required_column_missing_everywhere_fails_load() {
        let tmp = TempDir::new().unwrap();
        for name in ["a.parquet", "b.parquet"] {
            let frame = sale_frame(&[row(name)]).drop("Amount").unwrap();
            write_partition(tmp.path(), name, &frame);
        }

        let loader = DataLoader::new();
        match loader.load(tmp.path()) {
            Err(StoreError::SchemaMismatch(msg)) => assert!(msg.contains("Amount")),
            other => panic!("expected SchemaMismatch, got {:?}", other.map(|df| df.height())),
        }
        assert!(!loader.is_loaded());
        assert_eq!(loader.get_current_table().height(), 0);
    }

    #[test]
    fn test_reordered_columns_are_aligned() {
        let tmp = TempDir::new().unwrap();
        write_sales(tmp.path(), "a.parquet", &[row("a1")]);

        let df = sale_frame(&[row("b1")]);
        let mut names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
        names.reverse();
        let reversed = df.select(names).unwrap();
        write_partition(tmp.path(), "b.parquet", &reversed);

        let unified = DataLoader::new().load(tmp.path()).unwrap();
        assert_eq!(unified.height(), 2);
        assert_eq!(unified.get_column_names()[0].as_str(), "KeySale");
    }

    #[test]
    fn test_concurrent_loads_share_one_worker() {
        let tmp = TempDir::new().unwrap();
        for i in 0..4 {
            let rows: Vec<SaleRow> = (0..50).map(|j| row(&format!("s{}-{}", i, j))).collect();
            write_sales(tmp.path(), &format!("part-{}.parquet", i), &rows);
        }

        let loader = DataLoader::new();
        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let loader = loader.clone();
                let barrier = barrier.clone();
                let dir = tmp.path().to_path_buf();
                std::thread::spawn(move || {
                    barrier.wait();
                    loader.load(&dir).unwrap().height()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 200);
        }
        assert_eq!(loader.load_count(), 1);

        // 已加载目录不再重新读取
        assert_eq!(loader.load(tmp.path()).unwrap().height(), 200);
        assert_eq!(loader.load_count(), 1);
    }

    #[test]
    fn test_failed_load_can_be_retried() {
        let tmp = TempDir::new().unwrap();
        let loader = DataLoader::new();

        assert!(matches!(
            loader.load(tmp.path()),
            Err(StoreError::EmptyDataset(_))
        ));

        write_sales(tmp.path(), "a.parquet", &[row("a1")]);
        assert_eq!(loader.load(tmp.path()).unwrap().height(), 1);
        assert_eq!(loader.load_count(), 2);
    }

    #[test]
    fn test_missing_directory_fetches_archive() {
        let tmp = TempDir::new().unwrap();
        let fetcher = ArchiveFetcher::new("http://127.0.0.1:9/sales.tar.zst")
            .with_timeout(std::time::Duration::from_secs(2));
        let loader = DataLoader::with_fetcher(fetcher);

        // 下载失败必须上报, 不能被当作空目录
        let result = loader.load(tmp.path().join("sales"));
        assert!(matches!(result, Err(StoreError::Fetch(_))));
    }
}
