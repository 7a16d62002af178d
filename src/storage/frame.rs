//! DataFrame → 类型化记录的物化
//!
//! 每种实体声明它需要的列; 列缺失、类型不符或含空值时返回 `TypeMismatch`。

use chrono::NaiveDate;
use polars::prelude::*;

use crate::domain::{Payload, SaleRecord, SALE_COLUMNS};
use crate::{Result, StoreError};

/// 可从统一表物化的实体
pub trait FromFrame: Sized + Send + Sync + 'static {
    /// 实体所需的列
    fn required_columns() -> &'static [&'static str];

    /// 将整张表映射为实体序列 (保持行序)
    fn from_frame(df: &DataFrame) -> Result<Vec<Self>>;
}

/// 检查表是否包含实体所需的全部列
pub fn ensure_columns<T: FromFrame>(df: &DataFrame) -> Result<()> {
    let present: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let missing: Vec<&str> = T::required_columns()
        .iter()
        .copied()
        .filter(|c| !present.iter().any(|p| p == c))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(StoreError::TypeMismatch(format!(
            "{} requires missing columns: {}",
            std::any::type_name::<T>(),
            missing.join(", ")
        )))
    }
}

fn column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column> {
    df.column(name)
        .map_err(|e| StoreError::TypeMismatch(format!("Column {} unavailable: {}", name, e)))
}

fn null_value(name: &str, row: usize) -> StoreError {
    StoreError::TypeMismatch(format!("Null value in column {} at row {}", name, row))
}

/// 读取字符串列
pub fn string_values(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let ca = column(df, name)?.str().map_err(|e| {
        StoreError::TypeMismatch(format!("Column {} is not a string column: {}", name, e))
    })?;

    ca.into_iter()
        .enumerate()
        .map(|(row, v)| v.map(str::to_string).ok_or_else(|| null_value(name, row)))
        .collect()
}

/// 读取数值列 (整数列按 f64 读取)
pub fn float_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let cast = column(df, name)?
        .cast(&DataType::Float64)
        .map_err(|e| StoreError::TypeMismatch(format!("Column {} is not numeric: {}", name, e)))?;
    let ca = cast
        .f64()
        .map_err(|e| StoreError::TypeMismatch(format!("Column {} is not numeric: {}", name, e)))?;

    ca.into_iter()
        .enumerate()
        .map(|(row, v)| v.ok_or_else(|| null_value(name, row)))
        .collect()
}

/// 读取日期列
///
/// 支持 Date、Datetime (丢弃时间部分) 与 ISO-8601 字符串。
pub fn date_values(df: &DataFrame, name: &str) -> Result<Vec<NaiveDate>> {
    let col = column(df, name)?;

    match col.dtype() {
        DataType::String => {
            let raw = string_values(df, name)?;
            raw.iter()
                .enumerate()
                .map(|(row, s)| {
                    parse_date(s).ok_or_else(|| {
                        StoreError::TypeMismatch(format!(
                            "Invalid date {:?} in column {} at row {}",
                            s, name, row
                        ))
                    })
                })
                .collect()
        }
        DataType::Date | DataType::Datetime(_, _) => {
            let days = col
                .cast(&DataType::Date)
                .and_then(|c| c.cast(&DataType::Int32))
                .map_err(|e| {
                    StoreError::TypeMismatch(format!("Column {} is not a date: {}", name, e))
                })?;
            let ca = days.i32().map_err(|e| {
                StoreError::TypeMismatch(format!("Column {} is not a date: {}", name, e))
            })?;

            ca.into_iter()
                .enumerate()
                .map(|(row, v)| {
                    let days = v.ok_or_else(|| null_value(name, row))?;
                    days_to_date(days).ok_or_else(|| {
                        StoreError::TypeMismatch(format!(
                            "Date out of range in column {} at row {}",
                            name, row
                        ))
                    })
                })
                .collect()
        }
        other => Err(StoreError::TypeMismatch(format!(
            "Column {} has type {:?}, expected a date",
            name, other
        ))),
    }
}

/// 读取维度载荷列 (JSON 对象字符串)
pub fn payload_values(df: &DataFrame, name: &str) -> Result<Vec<Payload>> {
    let raw = string_values(df, name)?;
    raw.iter()
        .enumerate()
        .map(|(row, s)| {
            parse_payload(s).ok_or_else(|| {
                StoreError::TypeMismatch(format!(
                    "Column {} at row {} is not a JSON object",
                    name, row
                ))
            })
        })
        .collect()
}

fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1970, 1, 1)?.checked_add_signed(chrono::Duration::days(days as i64))
}

/// 解析 `YYYY-MM-DD`, 或带时间部分的日期时间 (取日期部分)
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    // "2023-01-01T10:00:00" / "2023-01-01 10:00:00.000"
    s.get(..10)
        .filter(|_| matches!(s.as_bytes().get(10), Some(b'T') | Some(b' ')))
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

fn parse_payload(s: &str) -> Option<Payload> {
    if s.trim().is_empty() {
        return Some(Payload::new());
    }
    match serde_json::from_str::<serde_json::Value>(s) {
        Ok(serde_json::Value::Object(map)) => Some(map),
        _ => None,
    }
}

impl FromFrame for SaleRecord {
    fn required_columns() -> &'static [&'static str] {
        &SALE_COLUMNS
    }

    fn from_frame(df: &DataFrame) -> Result<Vec<Self>> {
        ensure_columns::<Self>(df)?;

        let mut key_sale = string_values(df, "KeySale")?;
        let key_date = date_values(df, "KeyDate")?;
        let mut key_store = string_values(df, "KeyStore")?;
        let mut key_warehouse = string_values(df, "KeyWarehouse")?;
        let mut key_customer = string_values(df, "KeyCustomer")?;
        let mut key_product = string_values(df, "KeyProduct")?;
        let mut key_employee = string_values(df, "KeyEmployee")?;
        let mut key_currency = string_values(df, "KeyCurrency")?;
        let mut key_division = string_values(df, "KeyDivision")?;
        let mut key_ticket = string_values(df, "KeyTicket")?;
        let mut key_cedi = string_values(df, "KeyCedi")?;
        let mut ticket_id = string_values(df, "TicketId")?;
        let qty = float_values(df, "Qty")?;
        let amount = float_values(df, "Amount")?;
        let cost_amount = float_values(df, "CostAmount")?;
        let disc_amount = float_values(df, "DiscAmount")?;
        let mut tickets = payload_values(df, "Tickets")?;
        let mut products = payload_values(df, "Products")?;
        let mut customers = payload_values(df, "Customers")?;
        let mut employees = payload_values(df, "Employees")?;
        let mut stores = payload_values(df, "Stores")?;
        let mut divisions = payload_values(df, "Divisions")?;
        let mut time = payload_values(df, "Time")?;
        let mut cedis = payload_values(df, "Cedis")?;

        // 所有列等长 (同一 DataFrame)
        let records = (0..df.height())
            .map(|row| SaleRecord {
                key_sale: std::mem::take(&mut key_sale[row]),
                key_date: key_date[row],
                key_store: std::mem::take(&mut key_store[row]),
                key_warehouse: std::mem::take(&mut key_warehouse[row]),
                key_customer: std::mem::take(&mut key_customer[row]),
                key_product: std::mem::take(&mut key_product[row]),
                key_employee: std::mem::take(&mut key_employee[row]),
                key_currency: std::mem::take(&mut key_currency[row]),
                key_division: std::mem::take(&mut key_division[row]),
                key_ticket: std::mem::take(&mut key_ticket[row]),
                key_cedi: std::mem::take(&mut key_cedi[row]),
                ticket_id: std::mem::take(&mut ticket_id[row]),
                qty: qty[row],
                amount: amount[row],
                cost_amount: cost_amount[row],
                disc_amount: disc_amount[row],
                tickets: std::mem::take(&mut tickets[row]),
                products: std::mem::take(&mut products[row]),
                customers: std::mem::take(&mut customers[row]),
                employees: std::mem::take(&mut employees[row]),
                stores: std::mem::take(&mut stores[row]),
                divisions: std::mem::take(&mut divisions[row]),
                time: std::mem::take(&mut time[row]),
                cedis: std::mem::take(&mut cedis[row]),
            })
            .collect();

        Ok(records)
    }
}
