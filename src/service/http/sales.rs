//! 销售查询 HTTP API
//!
//! 查询在阻塞线程池上执行: 首次查询可能要等待后台加载完成。

use actix_web::{web, HttpResponse, Result};
use serde::Serialize;
use std::sync::Arc;

use super::auth::AuthenticatedUser;
use super::handlers::{blocking_error_response, ok_json, store_error_response, AppState};
use super::models::{EmployeeInput, PageQuery, ProductInput, StoreInput};
use crate::query::{Page, SaleService};

/// 校验分页参数后在阻塞线程池上执行查询
async fn run_query<T, F>(state: &AppState, query: &PageQuery, op: F) -> HttpResponse
where
    T: Serialize + Send + 'static,
    F: FnOnce(&dyn SaleService, Page) -> crate::Result<T> + Send + 'static,
{
    let page = match query.to_page() {
        Ok(page) => page,
        Err(e) => return store_error_response(&e),
    };

    let service = state.sale_service.clone();
    match web::block(move || op(service.as_ref(), page)).await {
        Ok(Ok(data)) => ok_json(data),
        Ok(Err(e)) => store_error_response(&e),
        Err(e) => blocking_error_response(e),
    }
}

/// 员工在区间内的销售
pub async fn sales_by_employee(
    user: AuthenticatedUser,
    input: web::Json<EmployeeInput>,
    query: web::Query<PageQuery>,
    state: web::Data<Arc<AppState>>,
) -> Result<HttpResponse> {
    let input = input.into_inner();
    log::info!(
        "User {} queried sales of employee {} [{}, {}]",
        user.uid(),
        input.key_employee,
        input.start_date,
        input.end_date
    );

    Ok(run_query(&state, &query, move |service, page| {
        service.get_sales_by_employee(&input.key_employee, input.start_date, input.end_date, page)
    })
    .await)
}

/// 商品在区间内的销售
pub async fn sales_by_product(
    user: AuthenticatedUser,
    input: web::Json<ProductInput>,
    query: web::Query<PageQuery>,
    state: web::Data<Arc<AppState>>,
) -> Result<HttpResponse> {
    let input = input.into_inner();
    log::info!(
        "User {} queried sales of product {} [{}, {}]",
        user.uid(),
        input.key_product,
        input.start_date,
        input.end_date
    );

    Ok(run_query(&state, &query, move |service, page| {
        service.get_sales_by_product(&input.key_product, input.start_date, input.end_date, page)
    })
    .await)
}

/// 门店在区间内的销售
pub async fn sales_by_store(
    user: AuthenticatedUser,
    input: web::Json<StoreInput>,
    query: web::Query<PageQuery>,
    state: web::Data<Arc<AppState>>,
) -> Result<HttpResponse> {
    let input = input.into_inner();
    log::info!(
        "User {} queried sales of store {} [{}, {}]",
        user.uid(),
        input.key_store,
        input.start_date,
        input.end_date
    );

    Ok(run_query(&state, &query, move |service, page| {
        service.get_sales_by_store(&input.key_store, input.start_date, input.end_date, page)
    })
    .await)
}

/// 各门店总额与均值
pub async fn total_avg_by_store(
    user: AuthenticatedUser,
    query: web::Query<PageQuery>,
    state: web::Data<Arc<AppState>>,
) -> Result<HttpResponse> {
    log::info!("User {} queried total/avg sales by store", user.uid());
    Ok(run_query(&state, &query, |service, page| service.get_total_avg_sales_by_store(page)).await)
}

/// 各商品总额与均值
pub async fn total_avg_by_product(
    user: AuthenticatedUser,
    query: web::Query<PageQuery>,
    state: web::Data<Arc<AppState>>,
) -> Result<HttpResponse> {
    log::info!("User {} queried total/avg sales by product", user.uid());
    Ok(run_query(&state, &query, |service, page| service.get_total_avg_sales_by_product(page)).await)
}

/// 各员工总额与均值
pub async fn total_avg_by_employee(
    user: AuthenticatedUser,
    query: web::Query<PageQuery>,
    state: web::Data<Arc<AppState>>,
) -> Result<HttpResponse> {
    log::info!("User {} queried total/avg sales by employee", user.uid());
    Ok(run_query(&state, &query, |service, page| service.get_total_avg_sales_by_employee(page)).await)
}
