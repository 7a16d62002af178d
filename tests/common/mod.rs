// 集成测试公共夹具: 写入 Parquet 销售分区、构建查询服务
//
// 分区构造与单元测试共用同一份实现 (src/storage/fixtures.rs)

#![allow(dead_code)]

#[path = "../../src/storage/fixtures.rs"]
mod fixtures;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use salesreport::storage::{DataLoader, ResultCache, SalesDataStore, TtlCache};
use salesreport::SalesQueryService;

pub use fixtures::{sale_frame, write_partition, write_sales, SaleRow};

/// 测试行: (KeySale, KeyDate, KeyStore, KeyProduct, KeyEmployee, Amount)
pub type Row<'a> = (&'a str, &'a str, &'a str, &'a str, &'a str, f64);

/// 按元组写入一个销售分区
pub fn write_rows(dir: &Path, file_name: &str, rows: &[Row]) {
    let rows: Vec<SaleRow> = rows
        .iter()
        .map(|&(sale, date, store, product, employee, amount)| {
            SaleRow::new(sale, date, store, product, employee, amount)
        })
        .collect();
    write_sales(dir, file_name, &rows);
}

/// 三个分区的标准数据集
///
/// E1 在 2023-01-01 ~ 2023-01-03 内: part-a 1 行, part-b 2 行, part-c 0 行;
/// 另有区间外或其他员工的行。门店 S1: 100 + 150 (+ 0 区间外), S2: 200。
pub fn write_standard_dataset(dir: &Path) {
    write_rows(
        dir,
        "part-a.parquet",
        &[
            ("1", "2023-01-01", "S1", "P1", "E1", 100.0),
            ("2", "2022-12-31", "S3", "P2", "E1", 10.0),
        ],
    );
    write_rows(
        dir,
        "part-b.parquet",
        &[
            ("3", "2023-01-02", "S1", "P1", "E1", 150.0),
            ("4", "2023-01-02", "S2", "P2", "E2", 200.0),
            ("5", "2023-01-03", "S3", "P1", "E1", 20.0),
        ],
    );
    write_rows(
        dir,
        "part-c.parquet",
        &[("6", "2023-01-04", "S3", "P2", "E1", 30.0)],
    );
}

/// 构建目录上的查询服务, 同时返回加载器句柄以便检查加载次数
pub fn build_service(dir: &Path) -> (Arc<SalesQueryService>, DataLoader) {
    let loader = DataLoader::new();
    let store = Arc::new(SalesDataStore::new(Arc::new(loader.clone()), dir));
    let cache: Arc<dyn ResultCache> = Arc::new(TtlCache::new(16, Duration::from_secs(300)));
    (Arc::new(SalesQueryService::new(store, cache)), loader)
}
