// HTTP API 集成测试
//
// 注册 → 登录 → Bearer Token → 销售查询, 以及参数/认证错误的状态码

mod common;

use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use salesreport::service::http::handlers::AppState;
use salesreport::service::http::routes;
use salesreport::user::{IdentityProvider, UserManager};
use salesreport::utils::JwtManager;
use salesreport::SaleService;
use tempfile::TempDir;

fn app_state(dir: &std::path::Path) -> Arc<AppState> {
    let (service, _) = common::build_service(dir);
    let jwt = JwtManager::new("integration-secret", "HS256", Duration::from_secs(1800)).unwrap();
    let identity: Arc<dyn IdentityProvider> = Arc::new(UserManager::with_cost(jwt, 4));

    Arc::new(AppState {
        store: service.store().clone(),
        sale_service: service as Arc<dyn SaleService>,
        identity,
    })
}

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state.clone()))
                .configure(routes::configure),
        )
        .await
    };
}

#[actix_web::test]
async fn test_health_reports_dataset_state() {
    let dir = TempDir::new().unwrap();
    common::write_standard_dataset(dir.path());
    let state = app_state(dir.path());
    let app = init_app!(state);

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["dataset_loaded"], false);

    state.store.warm_up().unwrap();

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["dataset_loaded"], true);
    assert_eq!(body["row_count"], 6);
}

#[actix_web::test]
async fn test_health_reports_zero_row_dataset_as_loaded() {
    let dir = TempDir::new().unwrap();
    common::write_rows(dir.path(), "empty.parquet", &[]);
    let state = app_state(dir.path());
    let app = init_app!(state);

    assert_eq!(state.store.warm_up().unwrap(), 0);

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["dataset_loaded"], true);
    assert_eq!(body["row_count"], 0);
}

#[actix_web::test]
async fn test_sales_query_requires_token() {
    let dir = TempDir::new().unwrap();
    common::write_standard_dataset(dir.path());
    let state = app_state(dir.path());
    let app = init_app!(state);

    let req = test::TestRequest::get()
        .uri("/api/v1/sales/store/total_avg")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/v1/sales/store/total_avg")
        .insert_header((header::AUTHORIZATION, "Bearer not-a-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], 401);
}

#[actix_web::test]
async fn test_register_login_and_query() {
    let dir = TempDir::new().unwrap();
    common::write_standard_dataset(dir.path());
    let state = app_state(dir.path());
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/v1/users/register")
        .set_json(json!({
            "email": "analyst@example.com",
            "password": "s3cret-pass",
            "display_name": "Analyst"
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    let uid = body["data"]["uid"].as_str().unwrap().to_string();

    // 重复注册
    let req = test::TestRequest::post()
        .uri("/api/v1/users/register")
        .set_json(json!({
            "email": "Analyst@Example.com",
            "password": "another-pass",
            "display_name": "Copy"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // 错误密码
    let req = test::TestRequest::post()
        .uri("/api/v1/users/login")
        .set_json(json!({"email": "analyst@example.com", "password": "wrong"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/v1/users/login")
        .set_json(json!({"email": "analyst@example.com", "password": "s3cret-pass"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["token_type"], "bearer");
    let token = body["data"]["access_token"].as_str().unwrap().to_string();
    let bearer = format!("Bearer {}", token);

    let req = test::TestRequest::get()
        .uri("/api/v1/users/me")
        .insert_header((header::AUTHORIZATION, bearer.clone()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["uid"], uid.as_str());
    assert_eq!(body["data"]["email"], "analyst@example.com");

    let req = test::TestRequest::post()
        .uri("/api/v1/sales/employee?page=1&page_size=2")
        .insert_header((header::AUTHORIZATION, bearer.clone()))
        .set_json(json!({
            "KeyEmployee": "E1",
            "StartDate": "2023-01-01",
            "EndDate": "2023-01-03T00:00:00"
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["KeySale"], "1");
    assert_eq!(rows[1]["KeySale"], "3");
    assert_eq!(rows[0]["KeyDate"], "2023-01-01");

    let req = test::TestRequest::get()
        .uri("/api/v1/sales/store/total_avg")
        .insert_header((header::AUTHORIZATION, bearer))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let stores = body["data"].as_array().unwrap();
    assert_eq!(stores[0]["KeyStore"], "S1");
    assert_eq!(stores[0]["total_sales"], 250.0);
    assert_eq!(stores[0]["avg_sales"], 125.0);
}

#[actix_web::test]
async fn test_oauth2_form_token() {
    let dir = TempDir::new().unwrap();
    common::write_standard_dataset(dir.path());
    let state = app_state(dir.path());
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/v1/users/register")
        .set_json(json!({
            "email": "form@example.com",
            "password": "form-pass",
            "display_name": "Form"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/api/v1/users/token")
        .set_form([("username", "form@example.com"), ("password", "form-pass")])
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["data"]["access_token"].as_str().is_some());
}

#[actix_web::test]
async fn test_invalid_page_and_body_are_bad_request() {
    let dir = TempDir::new().unwrap();
    common::write_standard_dataset(dir.path());
    let state = app_state(dir.path());
    let app = init_app!(state);

    state
        .identity
        .register(salesreport::user::UserRegisterRequest {
            email: "pager@example.com".to_string(),
            password: "pager-pass".to_string(),
            display_name: "Pager".to_string(),
        })
        .unwrap();
    let token = state
        .identity
        .login(salesreport::user::UserLoginRequest {
            email: "pager@example.com".to_string(),
            password: "pager-pass".to_string(),
        })
        .unwrap()
        .access_token;
    let bearer = format!("Bearer {}", token);

    for uri in [
        "/api/v1/sales/product/total_avg?page_size=0",
        "/api/v1/sales/product/total_avg?page_size=101",
        "/api/v1/sales/product/total_avg?page=0",
        "/api/v1/sales/product/total_avg?page=abc",
    ] {
        let req = test::TestRequest::get()
            .uri(uri)
            .insert_header((header::AUTHORIZATION, bearer.clone()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", uri);
    }

    let req = test::TestRequest::post()
        .uri("/api/v1/sales/store")
        .insert_header((header::AUTHORIZATION, bearer))
        .set_json(json!({"KeyStore": "S1", "StartDate": "not-a-date", "EndDate": "2023-01-03"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
