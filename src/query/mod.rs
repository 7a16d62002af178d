// 销售查询模块
//
// 架构：
// ┌───────────────────────────────────────────────┐
// │              SaleService (trait)              │
// │                      │                        │
// │            ┌─────────▼─────────┐              │
// │            │ SalesQueryService │              │
// │            │ filter / aggregate│              │
// │            └─────────┬─────────┘              │
// │         ┌────────────┴────────────┐           │
// │  ┌──────▼──────┐          ┌───────▼──────┐    │
// │  │ ResultCache │          │SalesDataStore│    │
// │  │(sales_table)│          │ query::<T>() │    │
// │  └─────────────┘          └──────────────┘    │
// └───────────────────────────────────────────────┘

pub mod page;
pub mod sales;

pub use page::{Page, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use sales::{SaleService, SalesQueryService};
