//! HTTP API 请求/响应模型

use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::query::{Page, DEFAULT_PAGE_SIZE};
use crate::storage::parse_date;

/// 通用响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// API 错误
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: u32,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: u32, message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError { code, message }),
        }
    }
}

/// 接受 `YYYY-MM-DD` 或带时间部分的日期时间, 只保留日期
fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).ok_or_else(|| de::Error::custom(format!("invalid date: {}", raw)))
}

/// 员工销售查询
#[derive(Debug, Clone, Deserialize)]
pub struct EmployeeInput {
    #[serde(rename = "KeyEmployee")]
    pub key_employee: String,
    #[serde(rename = "StartDate", deserialize_with = "deserialize_date")]
    pub start_date: NaiveDate,
    #[serde(rename = "EndDate", deserialize_with = "deserialize_date")]
    pub end_date: NaiveDate,
}

/// 商品销售查询
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    #[serde(rename = "KeyProduct")]
    pub key_product: String,
    #[serde(rename = "StartDate", deserialize_with = "deserialize_date")]
    pub start_date: NaiveDate,
    #[serde(rename = "EndDate", deserialize_with = "deserialize_date")]
    pub end_date: NaiveDate,
}

/// 门店销售查询
#[derive(Debug, Clone, Deserialize)]
pub struct StoreInput {
    #[serde(rename = "KeyStore")]
    pub key_store: String,
    #[serde(rename = "StartDate", deserialize_with = "deserialize_date")]
    pub start_date: NaiveDate,
    #[serde(rename = "EndDate", deserialize_with = "deserialize_date")]
    pub end_date: NaiveDate,
}

/// 分页查询参数 (`?page=&page_size=`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl PageQuery {
    pub fn to_page(&self) -> crate::Result<Page> {
        Page::new(
            self.page.unwrap_or(1),
            self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
    }
}

/// OAuth2 密码模式表单 (`username` 为邮箱)
#[derive(Debug, Clone, Deserialize)]
pub struct TokenForm {
    pub username: String,
    pub password: String,
}

/// 健康检查响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub dataset_loaded: bool,
    pub row_count: usize,
}
