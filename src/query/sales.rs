//! 销售查询服务
//!
//! 两类操作, 结果均分页:
//! - `filter_by`: 维度等值 + 日期闭区间过滤, 保持表内顺序
//! - `aggregate_by`: 按维度分组求 Amount 的和与均值, 分组按首次出现的顺序排列
//!
//! 只缓存完整物化的销售记录集 (`sales_table`), 单次查询结果不缓存。

use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;

use super::page::Page;
use crate::domain::{
    DimensionSales, EmployeeSales, ProductSales, SaleRecord, SalesDimension, StoreSales,
};
use crate::storage::cache::{CacheKey, ResultCache};
use crate::storage::SalesDataStore;
use crate::Result;

/// 销售查询接口 (HTTP 层依赖此 trait)
pub trait SaleService: Send + Sync {
    /// 员工在日期区间内的销售记录
    fn get_sales_by_employee(
        &self,
        key_employee: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        page: Page,
    ) -> Result<Vec<SaleRecord>>;

    /// 商品在日期区间内的销售记录
    fn get_sales_by_product(
        &self,
        key_product: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        page: Page,
    ) -> Result<Vec<SaleRecord>>;

    /// 门店在日期区间内的销售记录
    fn get_sales_by_store(
        &self,
        key_store: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        page: Page,
    ) -> Result<Vec<SaleRecord>>;

    /// 各门店的销售总额与均值
    fn get_total_avg_sales_by_store(&self, page: Page) -> Result<Vec<StoreSales>>;

    /// 各商品的销售总额与均值
    fn get_total_avg_sales_by_product(&self, page: Page) -> Result<Vec<ProductSales>>;

    /// 各员工的销售总额与均值
    fn get_total_avg_sales_by_employee(&self, page: Page) -> Result<Vec<EmployeeSales>>;
}

/// 基于统一表的销售查询服务
pub struct SalesQueryService {
    store: Arc<SalesDataStore>,
    cache: Arc<dyn ResultCache>,
}

impl SalesQueryService {
    pub fn new(store: Arc<SalesDataStore>, cache: Arc<dyn ResultCache>) -> Self {
        Self { store, cache }
    }

    pub fn store(&self) -> &Arc<SalesDataStore> {
        &self.store
    }

    /// 完整的销售记录集 (经缓存)
    pub fn sales_table(&self) -> Result<Arc<Vec<SaleRecord>>> {
        let key = CacheKey::new("sales_table").arg(self.store.directory().display());
        self.cache
            .get_or_compute(key, || self.store.query::<SaleRecord>())
    }

    /// 维度等值且 `start_date <= KeyDate <= end_date` 的记录
    pub fn filter_by(
        &self,
        dimension: SalesDimension,
        key_value: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        page: Page,
    ) -> Result<Vec<SaleRecord>> {
        let sales = self.sales_table()?;

        let rows = page.slice(
            sales
                .iter()
                .filter(|s| dimension.value_of(s) == key_value)
                .filter(|s| s.key_date >= start_date && s.key_date <= end_date)
                .cloned(),
        );

        log::debug!(
            "filter_by {}={} [{}, {}] page {} size {}: {} rows",
            dimension,
            key_value,
            start_date,
            end_date,
            page.number(),
            page.size(),
            rows.len()
        );
        Ok(rows)
    }

    /// 按维度分组的 Amount 总和与均值 (全表, 不限日期)
    pub fn aggregate_by(&self, dimension: SalesDimension, page: Page) -> Result<Vec<DimensionSales>> {
        let sales = self.sales_table()?;
        let groups = group_amounts(&sales, dimension);

        log::debug!(
            "aggregate_by {} page {} size {}: {} groups",
            dimension,
            page.number(),
            page.size(),
            groups.len()
        );
        Ok(page.slice(groups))
    }
}

/// 分组累加 (分组顺序 = 首次出现顺序)
fn group_amounts(sales: &[SaleRecord], dimension: SalesDimension) -> Vec<DimensionSales> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, f64, usize)> = Vec::new();

    for sale in sales {
        let key = dimension.value_of(sale);
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push((key, 0.0, 0));
            groups.len() - 1
        });
        let group = &mut groups[slot];
        group.1 += sale.amount;
        group.2 += 1;
    }

    groups
        .into_iter()
        .map(|(key, total, count)| DimensionSales {
            key: key.to_string(),
            total_sales: total,
            avg_sales: total / count as f64,
        })
        .collect()
}

impl SaleService for SalesQueryService {
    fn get_sales_by_employee(
        &self,
        key_employee: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        page: Page,
    ) -> Result<Vec<SaleRecord>> {
        self.filter_by(SalesDimension::Employee, key_employee, start_date, end_date, page)
    }

    fn get_sales_by_product(
        &self,
        key_product: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        page: Page,
    ) -> Result<Vec<SaleRecord>> {
        self.filter_by(SalesDimension::Product, key_product, start_date, end_date, page)
    }

    fn get_sales_by_store(
        &self,
        key_store: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        page: Page,
    ) -> Result<Vec<SaleRecord>> {
        self.filter_by(SalesDimension::Store, key_store, start_date, end_date, page)
    }

    fn get_total_avg_sales_by_store(&self, page: Page) -> Result<Vec<StoreSales>> {
        Ok(self
            .aggregate_by(SalesDimension::Store, page)?
            .into_iter()
            .map(StoreSales::from)
            .collect())
    }

    fn get_total_avg_sales_by_product(&self, page: Page) -> Result<Vec<ProductSales>> {
        Ok(self
            .aggregate_by(SalesDimension::Product, page)?
            .into_iter()
            .map(ProductSales::from)
            .collect())
    }

    fn get_total_avg_sales_by_employee(&self, page: Page) -> Result<Vec<EmployeeSales>> {
        Ok(self
            .aggregate_by(SalesDimension::Employee, page)?
            .into_iter()
            .map(EmployeeSales::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::fixtures::{write_sales, SaleRow};
    use crate::storage::{DataLoader, NoopCache, TtlCache};
    use crate::StoreError;
    use std::time::Duration;
    use tempfile::TempDir;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn service_over(dir: &TempDir, cache: Arc<dyn ResultCache>) -> SalesQueryService {
        let store = SalesDataStore::new(Arc::new(DataLoader::new()), dir.path());
        SalesQueryService::new(Arc::new(store), cache)
    }

    fn sample_dir() -> TempDir {
        let tmp = TempDir::new().unwrap();
        write_sales(
            tmp.path(),
            "2023-01.parquet",
            &[
                SaleRow::new("s1", "2023-01-01", "S1", "P1", "E1", 100.0),
                SaleRow::new("s2", "2023-01-02", "S2", "P2", "E2", 200.0),
                SaleRow::new("s3", "2023-01-05", "S1", "P1", "E1", 150.0),
            ],
        );
        tmp
    }

    #[test]
    fn test_filter_by_key_and_inclusive_date_range() {
        let tmp = sample_dir();
        let service = service_over(&tmp, Arc::new(NoopCache));

        let rows = service
            .filter_by(
                SalesDimension::Store,
                "S1",
                date("2023-01-01"),
                date("2023-01-05"),
                Page::default(),
            )
            .unwrap();
        let keys: Vec<&str> = rows.iter().map(|r| r.key_sale.as_str()).collect();
        assert_eq!(keys, vec!["s1", "s3"]);

        let rows = service
            .filter_by(
                SalesDimension::Store,
                "S1",
                date("2023-01-02"),
                date("2023-01-04"),
                Page::default(),
            )
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_unknown_key_is_empty_page() {
        let tmp = sample_dir();
        let service = service_over(&tmp, Arc::new(NoopCache));

        let rows = service
            .get_sales_by_employee("nobody", date("2000-01-01"), date("2100-01-01"), Page::default())
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_aggregate_in_first_seen_order() {
        let tmp = sample_dir();
        let service = service_over(&tmp, Arc::new(NoopCache));

        let stores = service.get_total_avg_sales_by_store(Page::default()).unwrap();
        assert_eq!(
            stores,
            vec![
                StoreSales {
                    key_store: "S1".to_string(),
                    total_sales: 250.0,
                    avg_sales: 125.0,
                },
                StoreSales {
                    key_store: "S2".to_string(),
                    total_sales: 200.0,
                    avg_sales: 200.0,
                },
            ]
        );

        let second = service
            .aggregate_by(SalesDimension::Store, Page::new(2, 1).unwrap())
            .unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].key, "S2");
    }

    #[test]
    fn test_pages_concatenate_to_full_result() {
        let tmp = TempDir::new().unwrap();
        let rows: Vec<SaleRow> = (0..7)
            .map(|i| SaleRow::new(&format!("s{}", i), "2023-02-01", "S1", "P1", "E1", i as f64))
            .collect();
        write_sales(tmp.path(), "a.parquet", &rows);
        let service = service_over(&tmp, Arc::new(NoopCache));

        let (start, end) = (date("2023-02-01"), date("2023-02-01"));
        let full = service
            .get_sales_by_product("P1", start, end, Page::new(1, 100).unwrap())
            .unwrap();
        assert_eq!(full.len(), 7);

        for size in 1..=4 {
            let mut collected = Vec::new();
            for number in 1..=(7 / size + 2) {
                let page = Page::new(number, size).unwrap();
                collected.extend(service.get_sales_by_product("P1", start, end, page).unwrap());
            }
            assert_eq!(collected, full, "page_size {}", size);
        }
    }

    #[test]
    fn test_sales_table_is_cached() {
        let tmp = sample_dir();
        let cache = Arc::new(TtlCache::new(8, Duration::from_secs(60)));
        let service = service_over(&tmp, cache.clone());

        let first = service.sales_table().unwrap();
        let second = service.sales_table().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_stats().hits, 1);
    }

    #[test]
    fn test_load_errors_surface_from_queries() {
        let store = SalesDataStore::new(Arc::new(DataLoader::new()), "/nonexistent/sales");
        let service = SalesQueryService::new(Arc::new(store), Arc::new(NoopCache));

        assert!(matches!(
            service.get_total_avg_sales_by_product(Page::default()),
            Err(StoreError::NotFound(_))
        ));
    }
}
