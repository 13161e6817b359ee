//! Integration tests for the API server.

use std::sync::OnceLock;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use event_store::InMemoryEventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> axum::Router {
    let store = InMemoryEventStore::new();
    let (state, _processor) = api::create_default_state(store, Duration::from_millis(500));
    api::create_app(state, get_metrics_handle())
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_string(&json).unwrap())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn register_product(app: &axum::Router, code: &str, price: f64) -> String {
    let (status, json) = send(
        app,
        "POST",
        "/product/add",
        Some(serde_json::json!({
            "productCode": code,
            "material": "Brown",
            "byWeight": false,
            "price": price
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["id"].as_str().unwrap().to_string()
}

async fn register_customer(app: &axum::Router, name: &str, phone: &str) -> String {
    let (status, json) = send(
        app,
        "POST",
        "/customer/add",
        Some(serde_json::json!({ "name": name, "phoneNumber": phone })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["id"].as_str().unwrap().to_string()
}

async fn register_worker(app: &axum::Router, first: &str, phone: &str) -> String {
    let (status, json) = send(
        app,
        "POST",
        "/worker/register",
        Some(serde_json::json!({
            "firstName": first,
            "lastName": "Petrov",
            "phoneNumber": phone
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["id"].as_str().unwrap().to_string()
}

async fn log_production(app: &axum::Router, product_id: &str, quantity: f64) -> String {
    let (status, json) = send(
        app,
        "POST",
        "/production/add",
        Some(serde_json::json!({
            "productId": product_id,
            "quantity": quantity,
            "date": "2024-06-01"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["productionId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();

    let (status, json) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_register_and_list_workers() {
    let app = setup();

    register_worker(&app, "Ivan", "0888-100").await;
    register_worker(&app, "Maria", "0888-101").await;

    let (status, json) = send(&app, "GET", "/worker/all", None).await;
    assert_eq!(status, StatusCode::OK);
    let workers = json.as_array().unwrap();
    assert_eq!(workers.len(), 2);
    assert_eq!(workers[0]["daysOfLeave"], 0);
}

#[tokio::test]
async fn test_duplicate_worker_phone_conflicts() {
    let app = setup();

    register_worker(&app, "Ivan", "0888-100").await;

    let (status, _) = send(
        &app,
        "POST",
        "/worker/register",
        Some(serde_json::json!({
            "firstName": "Georgi",
            "lastName": "Dimitrov",
            "phoneNumber": "0888-100"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_production_then_sale_updates_stock_and_balance() {
    let app = setup();
    let product_id = register_product(&app, "B-100", 10.50).await;
    let customer_id = register_customer(&app, "Atanas", "0888-200").await;

    log_production(&app, &product_id, 10.0).await;

    let (status, sale) = send(
        &app,
        "POST",
        "/sale/add",
        Some(serde_json::json!({
            "customerId": customer_id,
            "productId": product_id,
            "quantity": 4.0,
            "date": "2024-06-02"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    // Cost defaults to quantity * price
    assert_eq!(sale["cost"], 42.0);
    assert_eq!(sale["stockOnHand"], 6.0);
    assert_eq!(sale["customerBalance"], 42.0);

    let (status, storage) = send(&app, "GET", "/storage/getAll", None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = storage.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["productCode"], "B-100");
    assert_eq!(rows[0]["quantity"], 6.0);

    let (status, customers) = send(&app, "GET", "/customer/all", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(customers[0]["debt"], 42.0);
    assert_eq!(customers[0]["balance"], 42.0);
}

#[tokio::test]
async fn test_oversell_is_rejected() {
    let app = setup();
    let product_id = register_product(&app, "B-100", 10.0).await;
    let customer_id = register_customer(&app, "Atanas", "0888-200").await;

    log_production(&app, &product_id, 3.0).await;

    let (status, json) = send(
        &app,
        "POST",
        "/sale/add",
        Some(serde_json::json!({
            "customerId": customer_id,
            "productId": product_id,
            "quantity": 5.0,
            "date": "2024-06-02"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("Insufficient stock"));

    // Stock and balance untouched
    let (_, storage) = send(&app, "GET", "/storage/getAll", None).await;
    assert_eq!(storage[0]["quantity"], 3.0);
    let (_, customers) = send(&app, "GET", "/customer/all", None).await;
    assert_eq!(customers[0]["debt"], 0.0);
}

#[tokio::test]
async fn test_edit_sale_adjusts_stock_and_debt() {
    let app = setup();
    let product_id = register_product(&app, "B-100", 10.0).await;
    let customer_id = register_customer(&app, "Atanas", "0888-200").await;

    log_production(&app, &product_id, 10.0).await;

    let (_, sale) = send(
        &app,
        "POST",
        "/sale/add",
        Some(serde_json::json!({
            "customerId": customer_id,
            "productId": product_id,
            "quantity": 4.0,
            "date": "2024-06-02"
        })),
    )
    .await;
    let sale_id = sale["saleId"].as_str().unwrap();

    let (status, edited) = send(
        &app,
        "PUT",
        "/sale/edit",
        Some(serde_json::json!({
            "saleId": sale_id,
            "customerId": customer_id,
            "productId": product_id,
            "quantity": 2.0,
            "date": "2024-06-02"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["stockOnHand"], 8.0);
    assert_eq!(edited["customerBalance"], 20.0);
}

#[tokio::test]
async fn test_delete_production_consumed_by_sale_conflicts() {
    let app = setup();
    let product_id = register_product(&app, "B-100", 10.0).await;
    let customer_id = register_customer(&app, "Atanas", "0888-200").await;

    let production_id = log_production(&app, &product_id, 5.0).await;

    let (status, _) = send(
        &app,
        "POST",
        "/sale/add",
        Some(serde_json::json!({
            "customerId": customer_id,
            "productId": product_id,
            "quantity": 4.0,
            "date": "2024-06-02"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Reversing the production would leave stock at -1
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/production/{production_id}/delete"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_returned_wax_credits_the_customer() {
    let app = setup();
    let customer_id = register_customer(&app, "Atanas", "0888-200").await;

    let (status, receipt) = send(
        &app,
        "POST",
        "/returned-wax",
        Some(serde_json::json!({
            "customerId": customer_id,
            "material": "Pure",
            "weight": 2.5,
            "returnDate": "2024-06-03",
            "note": "crumbled blocks"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    // Pure wax credits 3.20 per kg
    assert_eq!(receipt["totalValue"], 8.0);
    assert_eq!(receipt["customerBalance"], -8.0);

    let (status, returns) = send(&app, "GET", "/returned-wax", None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = returns.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["note"], "crumbled blocks");

    let return_id = rows[0]["returnId"].as_str().unwrap();
    let (status, _) = send(&app, "DELETE", &format!("/returned-wax/{return_id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, customers) = send(&app, "GET", "/customer/all", None).await;
    assert_eq!(customers[0]["credit"], 0.0);
}

#[tokio::test]
async fn test_delete_customer_with_sales_conflicts() {
    let app = setup();
    let product_id = register_product(&app, "B-100", 10.0).await;
    let customer_id = register_customer(&app, "Atanas", "0888-200").await;

    log_production(&app, &product_id, 10.0).await;
    let (_, sale) = send(
        &app,
        "POST",
        "/sale/add",
        Some(serde_json::json!({
            "customerId": customer_id,
            "productId": product_id,
            "quantity": 1.0,
            "date": "2024-06-02"
        })),
    )
    .await;
    let sale_id = sale["saleId"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/customer/{customer_id}/delete"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Deleting the sale unblocks the customer
    let (status, _) = send(&app, "DELETE", &format!("/sale/{sale_id}/delete"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/customer/{customer_id}/delete"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_leave_flow_and_day_board() {
    let app = setup();
    let ivan = register_worker(&app, "Ivan", "0888-100").await;
    register_worker(&app, "Maria", "0888-101").await;

    let (status, receipt) = send(
        &app,
        "POST",
        "/leave/add",
        Some(serde_json::json!({
            "workerId": ivan,
            "startDate": "2024-06-03",
            "endDate": "2024-06-05"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["days"], 3);
    assert_eq!(receipt["daysOfLeave"], 3);

    let (status, board) = send(&app, "GET", "/leave/day?date=2024-06-04", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board["absentWorkers"], 1);
    assert_eq!(board["availableWorkers"], 1);

    let (status, entries) = send(&app, "GET", &format!("/leave/{ivan}/worker"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entries.as_array().unwrap().len(), 1);

    let leave_id = entries[0]["leaveId"].as_str().unwrap();
    let (status, _) = send(
        &app,
        "DELETE",
        "/leave/delete",
        Some(serde_json::json!({ "leaveId": leave_id })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, workers) = send(&app, "GET", "/worker/all", None).await;
    let ivan_row = workers
        .as_array()
        .unwrap()
        .iter()
        .find(|w| w["id"] == ivan.as_str())
        .unwrap();
    assert_eq!(ivan_row["daysOfLeave"], 0);
}

#[tokio::test]
async fn test_leave_with_end_before_start_is_bad_request() {
    let app = setup();
    let ivan = register_worker(&app, "Ivan", "0888-100").await;

    let (status, _) = send(
        &app,
        "POST",
        "/leave/add",
        Some(serde_json::json!({
            "workerId": ivan,
            "startDate": "2024-06-05",
            "endDate": "2024-06-03"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_worker_cascades_leave() {
    let app = setup();
    let ivan = register_worker(&app, "Ivan", "0888-100").await;

    let (status, _) = send(
        &app,
        "POST",
        "/leave/add",
        Some(serde_json::json!({
            "workerId": ivan,
            "startDate": "2024-06-03",
            "endDate": "2024-06-05"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(&app, "DELETE", &format!("/worker/{ivan}/delete"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, board) = send(&app, "GET", "/leave/day?date=2024-06-04", None).await;
    assert_eq!(board["absentWorkers"], 0);
}

#[tokio::test]
async fn test_storage_adjust_close_reopen() {
    let app = setup();
    // Registering the product opens its stock record at zero
    let product_id = register_product(&app, "B-100", 10.0).await;

    let (status, storage) = send(&app, "GET", "/storage/getAll", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(storage[0]["quantity"], 0.0);

    let (status, adjusted) = send(
        &app,
        "PUT",
        &format!("/storage/{product_id}/edit?quantity=12.5"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(adjusted["quantity"], 12.5);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/storage/{product_id}/delete"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, storage) = send(&app, "GET", "/storage/getAll", None).await;
    assert!(storage.as_array().unwrap().is_empty());

    // A closed record can be reopened
    let (status, reopened) = send(
        &app,
        "POST",
        "/storage/add",
        Some(serde_json::json!({ "productId": product_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reopened["quantity"], 0.0);
}

#[tokio::test]
async fn test_soft_deleted_product_hidden_from_listing() {
    let app = setup();
    let product_id = register_product(&app, "B-100", 10.0).await;
    register_product(&app, "W-200", 12.0).await;

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/product/{product_id}/delete"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, products) = send(&app, "GET", "/product/getAll", None).await;
    let rows = products.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["productCode"], "W-200");
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let app = setup();
    let fake_id = uuid::Uuid::new_v4();

    let (status, _) = send(
        &app,
        "POST",
        "/production/add",
        Some(serde_json::json!({
            "productId": fake_id.to_string(),
            "quantity": 1.0,
            "date": "2024-06-01"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_id_format_is_bad_request() {
    let app = setup();

    let (status, _) = send(&app, "DELETE", "/sale/not-a-uuid/delete", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
