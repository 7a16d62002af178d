//! 领域模型
//!
//! - `SaleRecord`: 单笔销售交易 (统一表的一行)
//! - `SalesDimension`: 可用于过滤/分组的标识维度
//! - `DimensionSales` 及其按维度命名的输出形态

pub mod outputs;
pub mod sale;

pub use outputs::{DimensionSales, EmployeeSales, ProductSales, StoreSales};
pub use sale::{Payload, SaleRecord, SalesDimension, SALE_COLUMNS};
