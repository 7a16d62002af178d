//! 测试用销售分区构造

use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// 测试行 (其余列按 key_sale 派生)
#[derive(Debug, Clone)]
pub struct SaleRow {
    pub key_sale: String,
    pub key_date: String,
    pub key_store: String,
    pub key_product: String,
    pub key_employee: String,
    pub amount: f64,
}

impl SaleRow {
    pub fn new(
        key_sale: &str,
        key_date: &str,
        key_store: &str,
        key_product: &str,
        key_employee: &str,
        amount: f64,
    ) -> Self {
        Self {
            key_sale: key_sale.to_string(),
            key_date: key_date.to_string(),
            key_store: key_store.to_string(),
            key_product: key_product.to_string(),
            key_employee: key_employee.to_string(),
            amount,
        }
    }
}

/// 构造包含全部 24 列的销售表
pub fn sale_frame(rows: &[SaleRow]) -> DataFrame {
    let col = |f: &dyn Fn(&SaleRow) -> String| rows.iter().map(f).collect::<Vec<String>>();

    df!(
        "KeySale" => col(&|r| r.key_sale.clone()),
        "KeyDate" => col(&|r| r.key_date.clone()),
        "KeyStore" => col(&|r| r.key_store.clone()),
        "KeyWarehouse" => col(&|r| format!("wh-{}", r.key_sale)),
        "KeyCustomer" => col(&|r| format!("cust-{}", r.key_sale)),
        "KeyProduct" => col(&|r| r.key_product.clone()),
        "KeyEmployee" => col(&|r| r.key_employee.clone()),
        "KeyCurrency" => col(&|_| "COP".to_string()),
        "KeyDivision" => col(&|_| "div1".to_string()),
        "KeyTicket" => col(&|r| format!("ticket-{}", r.key_sale)),
        "KeyCedi" => col(&|_| "cedi1".to_string()),
        "TicketId" => col(&|r| format!("tid-{}", r.key_sale)),
        "Qty" => rows.iter().map(|_| 1.0f64).collect::<Vec<f64>>(),
        "Amount" => rows.iter().map(|r| r.amount).collect::<Vec<f64>>(),
        "CostAmount" => rows.iter().map(|r| r.amount / 2.0).collect::<Vec<f64>>(),
        "DiscAmount" => rows.iter().map(|_| 0.0f64).collect::<Vec<f64>>(),
        "Tickets" => col(&|r| format!(r#"{{"id":"{}"}}"#, r.key_sale)),
        "Products" => col(&|r| format!(r#"{{"name":"product {}"}}"#, r.key_sale)),
        "Customers" => col(&|_| "{}".to_string()),
        "Employees" => col(&|r| format!(r#"{{"code":"{}"}}"#, r.key_employee)),
        "Stores" => col(&|r| format!(r#"{{"code":"{}"}}"#, r.key_store)),
        "Divisions" => col(&|_| "{}".to_string()),
        "Time" => col(&|r| format!(r#"{{"date":"{}"}}"#, r.key_date)),
        "Cedis" => col(&|_| String::new()),
    )
    .expect("valid sale frame")
}

/// 写入一个 Parquet 分区
pub fn write_partition(dir: &Path, file_name: &str, df: &DataFrame) {
    let mut df = df.clone();
    let mut file = File::create(dir.join(file_name)).expect("create partition file");
    ParquetWriter::new(&mut file)
        .finish(&mut df)
        .expect("write partition");
}

/// 写入一个销售分区
pub fn write_sales(dir: &Path, file_name: &str, rows: &[SaleRow]) {
    write_partition(dir, file_name, &sale_frame(rows));
}
