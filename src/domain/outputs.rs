//! 聚合结果输出

use serde::{Deserialize, Serialize};

/// 按维度分组的全历史销售聚合
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionSales {
    /// 分组键
    pub key: String,
    /// Amount 求和
    pub total_sales: f64,
    /// Amount 均值
    pub avg_sales: f64,
}

/// 门店维度聚合
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSales {
    #[serde(rename = "KeyStore")]
    pub key_store: String,
    pub total_sales: f64,
    pub avg_sales: f64,
}

/// 商品维度聚合
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSales {
    #[serde(rename = "KeyProduct")]
    pub key_product: String,
    pub total_sales: f64,
    pub avg_sales: f64,
}

/// 员工维度聚合
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeSales {
    #[serde(rename = "KeyEmployee")]
    pub key_employee: String,
    pub total_sales: f64,
    pub avg_sales: f64,
}

impl From<DimensionSales> for StoreSales {
    fn from(s: DimensionSales) -> Self {
        Self {
            key_store: s.key,
            total_sales: s.total_sales,
            avg_sales: s.avg_sales,
        }
    }
}

impl From<DimensionSales> for ProductSales {
    fn from(s: DimensionSales) -> Self {
        Self {
            key_product: s.key,
            total_sales: s.total_sales,
            avg_sales: s.avg_sales,
        }
    }
}

impl From<DimensionSales> for EmployeeSales {
    fn from(s: DimensionSales) -> Self {
        Self {
            key_employee: s.key,
            total_sales: s.total_sales,
            avg_sales: s.avg_sales,
        }
    }
}
