//! 销售记录模型

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::StoreError;

/// 维度载荷 (反范式化的维度属性, 对聚合逻辑不透明)
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// 分区文件必须包含的全部列
pub const SALE_COLUMNS: [&str; 24] = [
    "KeySale",
    "KeyDate",
    "KeyStore",
    "KeyWarehouse",
    "KeyCustomer",
    "KeyProduct",
    "KeyEmployee",
    "KeyCurrency",
    "KeyDivision",
    "KeyTicket",
    "KeyCedi",
    "TicketId",
    "Qty",
    "Amount",
    "CostAmount",
    "DiscAmount",
    "Tickets",
    "Products",
    "Customers",
    "Employees",
    "Stores",
    "Divisions",
    "Time",
    "Cedis",
];

/// 单笔销售交易
///
/// 加载后不可变; 整个记录集只会在冷启动时整体替换。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SaleRecord {
    pub key_sale: String,
    /// 交易日期 (序列化为 `YYYY-MM-DD`)
    pub key_date: NaiveDate,
    pub key_store: String,
    pub key_warehouse: String,
    pub key_customer: String,
    pub key_product: String,
    pub key_employee: String,
    pub key_currency: String,
    pub key_division: String,
    pub key_ticket: String,
    pub key_cedi: String,
    pub ticket_id: String,

    // 度量值, 允许为 0 或负数 (退货/折扣)
    pub qty: f64,
    pub amount: f64,
    pub cost_amount: f64,
    pub disc_amount: f64,

    pub tickets: Payload,
    pub products: Payload,
    pub customers: Payload,
    pub employees: Payload,
    pub stores: Payload,
    pub divisions: Payload,
    pub time: Payload,
    pub cedis: Payload,
}

/// 标识维度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SalesDimension {
    #[serde(rename = "KeySale")]
    Sale,
    #[serde(rename = "KeyStore")]
    Store,
    #[serde(rename = "KeyWarehouse")]
    Warehouse,
    #[serde(rename = "KeyCustomer")]
    Customer,
    #[serde(rename = "KeyProduct")]
    Product,
    #[serde(rename = "KeyEmployee")]
    Employee,
    #[serde(rename = "KeyCurrency")]
    Currency,
    #[serde(rename = "KeyDivision")]
    Division,
    #[serde(rename = "KeyTicket")]
    Ticket,
    #[serde(rename = "KeyCedi")]
    Cedi,
    #[serde(rename = "TicketId")]
    TicketId,
}

impl SalesDimension {
    /// 对应的列名
    pub fn column(&self) -> &'static str {
        match self {
            SalesDimension::Sale => "KeySale",
            SalesDimension::Store => "KeyStore",
            SalesDimension::Warehouse => "KeyWarehouse",
            SalesDimension::Customer => "KeyCustomer",
            SalesDimension::Product => "KeyProduct",
            SalesDimension::Employee => "KeyEmployee",
            SalesDimension::Currency => "KeyCurrency",
            SalesDimension::Division => "KeyDivision",
            SalesDimension::Ticket => "KeyTicket",
            SalesDimension::Cedi => "KeyCedi",
            SalesDimension::TicketId => "TicketId",
        }
    }

    /// 取记录在该维度上的取值
    pub fn value_of<'a>(&self, record: &'a SaleRecord) -> &'a str {
        match self {
            SalesDimension::Sale => &record.key_sale,
            SalesDimension::Store => &record.key_store,
            SalesDimension::Warehouse => &record.key_warehouse,
            SalesDimension::Customer => &record.key_customer,
            SalesDimension::Product => &record.key_product,
            SalesDimension::Employee => &record.key_employee,
            SalesDimension::Currency => &record.key_currency,
            SalesDimension::Division => &record.key_division,
            SalesDimension::Ticket => &record.key_ticket,
            SalesDimension::Cedi => &record.key_cedi,
            SalesDimension::TicketId => &record.ticket_id,
        }
    }

    pub fn all() -> [SalesDimension; 11] {
        [
            SalesDimension::Sale,
            SalesDimension::Store,
            SalesDimension::Warehouse,
            SalesDimension::Customer,
            SalesDimension::Product,
            SalesDimension::Employee,
            SalesDimension::Currency,
            SalesDimension::Division,
            SalesDimension::Ticket,
            SalesDimension::Cedi,
            SalesDimension::TicketId,
        ]
    }
}

impl fmt::Display for SalesDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for SalesDimension {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SalesDimension::all()
            .into_iter()
            .find(|d| d.column() == s)
            .ok_or_else(|| StoreError::CallerContract(format!("Unknown sales dimension: {}", s)))
    }
}
