//! 派生结果缓存
//!
//! 按 (操作名, 位置参数, 关键字参数) 生成缓存键, 缓存昂贵计算的结果:
//! - TTL: 条目写入后固定时长过期, 访问时惰性剔除 (无后台清理线程)
//! - 容量: 超过上限时先清理过期条目, 再淘汰最久未访问的条目
//!
//! 缓存以 trait 对象注入, 测试中可替换为 `NoopCache`。

use dashmap::DashMap;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 缓存值 (类型擦除, 取出时向下转型)
pub type CachedValue = Arc<dyn Any + Send + Sync>;

/// 缓存键
///
/// 关键字参数使用 `BTreeMap`, 与传入顺序无关。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    operation: String,
    args: Vec<String>,
    kwargs: BTreeMap<String, String>,
}

impl CacheKey {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            args: Vec::new(),
            kwargs: BTreeMap::new(),
        }
    }

    /// 追加位置参数
    pub fn arg(mut self, value: impl fmt::Display) -> Self {
        self.args.push(value.to_string());
        self
    }

    /// 追加关键字参数
    pub fn kwarg(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.kwargs.insert(name.into(), value.to_string());
        self
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}", self.operation, self.args.join(", "))?;
        for (k, v) in &self.kwargs {
            write!(f, ", {}={}", k, v)?;
        }
        write!(f, ")")
    }
}

/// 结果缓存接口
pub trait ResultCache: Send + Sync {
    /// 读取未过期的条目
    fn get(&self, key: &CacheKey) -> Option<CachedValue>;

    /// 写入条目 (刷新过期时间)
    fn insert(&self, key: CacheKey, value: CachedValue);

    /// 使单个条目失效
    fn invalidate(&self, key: &CacheKey);

    /// 清空所有条目
    fn clear(&self);

    /// 当前条目数 (可能包含尚未被惰性剔除的过期条目)
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl dyn ResultCache {
    /// 命中则直接返回缓存值, 否则执行 `compute` 并写入缓存
    ///
    /// `compute` 失败时不写入缓存, 错误原样返回。
    pub fn get_or_compute<T, E, F>(&self, key: CacheKey, compute: F) -> Result<Arc<T>, E>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(cached) = self.get(&key) {
            match cached.downcast::<T>() {
                Ok(value) => return Ok(value),
                Err(_) => {
                    log::warn!("Cache entry {} holds an unexpected type, recomputing", key);
                }
            }
        }

        let value = Arc::new(compute()?);
        self.insert(key, value.clone());
        Ok(value)
    }
}

/// 缓存条目
struct CacheEntry {
    value: CachedValue,
    inserted_at: Instant,
    /// 最近访问序号 (LRU)
    last_access: AtomicU64,
}

/// 缓存统计
#[derive(Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub evictions: AtomicU64,
    pub expirations: AtomicU64,
}

/// 缓存统计快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub size: usize,
}

/// TTL + 容量上限缓存
pub struct TtlCache {
    entries: DashMap<CacheKey, CacheEntry>,
    max_entries: usize,
    ttl: Duration,
    /// 单调递增的访问时钟
    clock: AtomicU64,
    stats: CacheStats,
}

impl TtlCache {
    /// 创建新的缓存
    ///
    /// # 参数
    /// - `max_entries`: 最大条目数 (至少为 1)
    /// - `ttl`: 条目生存时间
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
            ttl,
            clock: AtomicU64::new(0),
            stats: CacheStats::default(),
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        entry.inserted_at.elapsed() >= self.ttl
    }

    /// 清理所有过期条目, 返回清理数量
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);
        let purged = before.saturating_sub(self.entries.len());
        self.stats
            .expirations
            .fetch_add(purged as u64, Ordering::Relaxed);
        purged
    }

    /// 为新条目腾出空间
    fn make_room(&self) {
        if self.entries.len() < self.max_entries {
            return;
        }

        self.purge_expired();

        while self.entries.len() >= self.max_entries {
            let victim = self
                .entries
                .iter()
                .min_by_key(|e| e.value().last_access.load(Ordering::Relaxed))
                .map(|e| e.key().clone());

            match victim {
                Some(key) => {
                    self.entries.remove(&key);
                    self.stats.evictions.fetch_add(1, Ordering::Relaxed);
                    log::debug!("Evicted cache entry {}", key);
                }
                None => break,
            }
        }
    }

    /// 获取缓存统计信息
    pub fn get_stats(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            evictions: self.stats.evictions.load(Ordering::Relaxed),
            expirations: self.stats.expirations.load(Ordering::Relaxed),
            size: self.entries.len(),
        }
    }

    /// 计算缓存命中率
    pub fn hit_rate(&self) -> f64 {
        let hits = self.stats.hits.load(Ordering::Relaxed);
        let misses = self.stats.misses.load(Ordering::Relaxed);

        if hits + misses == 0 {
            return 0.0;
        }

        hits as f64 / (hits + misses) as f64
    }
}

impl ResultCache for TtlCache {
    fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        if let Some(entry) = self.entries.get(key) {
            if !self.is_expired(&entry) {
                entry.last_access.store(self.tick(), Ordering::Relaxed);
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
            // 已过期, 删除
            drop(entry);
            self.entries.remove(key);
            self.stats.expirations.fetch_add(1, Ordering::Relaxed);
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn insert(&self, key: CacheKey, value: CachedValue) {
        if !self.entries.contains_key(&key) {
            self.make_room();
        }

        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
                last_access: AtomicU64::new(self.tick()),
            },
        );
    }

    fn invalidate(&self, key: &CacheKey) {
        self.entries.remove(key);
    }

    fn clear(&self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// 不缓存任何内容, 每次都重新计算
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

impl ResultCache for NoopCache {
    fn get(&self, _key: &CacheKey) -> Option<CachedValue> {
        None
    }

    fn insert(&self, _key: CacheKey, _value: CachedValue) {}

    fn invalidate(&self, _key: &CacheKey) {}

    fn clear(&self) {}

    fn len(&self) -> usize {
        0
    }
}
