//! Router-level tests: the full middleware stack against a temp SQLite file

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use shared::models::ProductCreate;
use store_server::auth::{JwtConfig, Role};
use store_server::db::DbService;
use store_server::db::repository::product as product_repo;
use store_server::notify::{MemorySink, NotificationEvent};
use store_server::{Config, ServerState};
use tower::ServiceExt;

const SECRET: &str = "router-test-secret-with-more-than-32-chars";

struct TestApp {
    _dir: tempfile::TempDir,
    state: ServerState,
    sink: MemorySink,
}

impl TestApp {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let work_dir = dir.path().to_string_lossy().to_string();
        let mut config = Config::with_overrides(work_dir, 0);
        config.jwt = JwtConfig::with_secret(SECRET);
        config.allow_negative_stock = false;

        let db = DbService::new(&config.database_path).await.unwrap();
        let sink = MemorySink::new();
        let state = ServerState::with_sink(config, db.pool, Arc::new(sink.clone()));
        Self {
            _dir: dir,
            state,
            sink,
        }
    }

    fn app(&self) -> Router {
        store_server::api::build_app(&self.state).with_state(self.state.clone())
    }

    fn token(&self, user_id: i64, role: Role) -> String {
        self.state
            .jwt_service
            .generate_token(user_id, &format!("user{user_id}"), role)
            .unwrap()
    }

    async fn product(&self, price: f64, stock: i64) -> i64 {
        product_repo::create(
            &self.state.pool,
            ProductCreate {
                name: "Sketchbook A4".into(),
                description: None,
                price,
                stock: Some(stock),
                low_stock_threshold: Some(0),
                category_id: None,
            },
        )
        .await
        .unwrap()
        .id
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }
}

fn order_body(product_id: i64, quantity: i64) -> Value {
    json!({
        "items": [{ "id": product_id, "quantity": quantity }],
        "fullName": "Lucía Gómez",
        "phoneNumber": "600123123",
        "email": "lucia@example.com"
    })
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let (status, body) = app.send("GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let app = TestApp::new().await;
    let response = app
        .app()
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_anonymous_order_and_tracking() {
    let app = TestApp::new().await;
    let pid = app.product(12.5, 10).await;

    let (status, body) = app
        .send("POST", "/api/orders", None, Some(order_body(pid, 2)))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "PENDING");
    assert_eq!(body["totalAmount"], 25.0);
    assert!(body["userId"].is_null());
    let code = body["pickupCode"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 6);

    let (status, body) = app
        .send("GET", &format!("/api/orders/track/{}", code.to_lowercase()), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "PENDING");
    assert_eq!(body["itemCount"], 2);
    assert!(body.get("phoneNumber").is_none());

    let (status, _) = app.send("GET", "/api/orders/track/ZZZZZZ", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_update_requires_staff() {
    let app = TestApp::new().await;
    let pid = app.product(3.0, 5).await;
    let (_, order) = app
        .send("POST", "/api/orders", None, Some(order_body(pid, 2)))
        .await;
    let uri = format!("/api/orders/{}/status", order["id"]);
    let body = json!({ "status": "PREPARING" });

    let (status, _) = app.send("PUT", &uri, None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let customer = app.token(7, Role::Customer);
    let (status, _) = app
        .send("PUT", &uri, Some(&customer), Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send("PUT", &uri, Some("not-a-jwt"), Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let staff = app.token(1, Role::Staff);
    let (status, updated) = app.send("PUT", &uri, Some(&staff), Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "PREPARING");

    let product = product_repo::find_by_id(&app.state.pool, pid)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(product.stock, 3);

    // PREPARING -> COMPLETED skips READY
    let (status, err) = app
        .send("PUT", &uri, Some(&staff), Some(json!({ "status": "COMPLETED" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], 4010);

    let events = app.sink.events();
    assert!(events.iter().any(|e| matches!(
        e,
        NotificationEvent::OrderStatusChanged { status, .. } if status.as_str() == "PREPARING"
    )));
}

#[tokio::test]
async fn test_customer_orders_and_cancel() {
    let app = TestApp::new().await;
    let pid = app.product(2.0, 5).await;
    let owner = app.token(42, Role::Customer);
    let other = app.token(43, Role::Customer);

    let (status, order) = app
        .send("POST", "/api/orders", Some(&owner), Some(order_body(pid, 1)))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["userId"], 42);

    let (status, list) = app.send("GET", "/api/orders", Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, _) = app.send("GET", "/api/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let detail_uri = format!("/api/orders/{}", order["id"]);
    let (status, _) = app.send("GET", &detail_uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let cancel_uri = format!("/api/orders/{}/cancel", order["id"]);
    let (status, _) = app
        .send("PUT", &cancel_uri, Some(&other), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, cancelled) = app
        .send(
            "PUT",
            &cancel_uri,
            Some(&owner),
            Some(json!({ "reason": "changed my mind" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "CANCELLED");
    assert!(cancelled["cancelledAt"].is_i64());
}

#[tokio::test]
async fn test_verify_code_and_manage_list() {
    let app = TestApp::new().await;
    let pid = app.product(1.5, 5).await;
    let (_, order) = app
        .send("POST", "/api/orders", None, Some(order_body(pid, 1)))
        .await;
    let staff = app.token(1, Role::Admin);

    let (status, detail) = app
        .send(
            "POST",
            "/api/orders/verify-code",
            Some(&staff),
            Some(json!({ "pickupCode": order["pickupCode"] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["id"], order["id"]);
    assert_eq!(detail["phoneNumber"], "600123123");

    let (status, list) = app
        .send("GET", "/api/orders/manage?status=PENDING", Some(&staff), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, list) = app
        .send("GET", "/api/orders/manage?status=READY", Some(&staff), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_coupons_and_quote() {
    let app = TestApp::new().await;
    let pid = app.product(20.0, 10).await;
    let staff = app.token(1, Role::Staff);

    let coupon = json!({
        "code": "welcome5",
        "discountType": "FIXED",
        "discountValue": 5.0,
        "minOrderAmount": 30.0
    });
    let (status, created) = app
        .send("POST", "/api/coupons", Some(&staff), Some(coupon.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["code"], "WELCOME5");

    let (status, _) = app
        .send("POST", "/api/coupons", Some(&staff), Some(coupon))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, result) = app
        .send(
            "POST",
            "/api/coupons/validate",
            None,
            Some(json!({ "code": "Welcome5", "cartTotal": 40.0 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["valid"], true);
    assert_eq!(result["discountAmount"], 5.0);

    let (status, err) = app
        .send(
            "POST",
            "/api/coupons/validate",
            None,
            Some(json!({ "code": "WELCOME5", "cartTotal": 10.0 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], 5104);

    let (status, quote) = app
        .send(
            "POST",
            "/api/cart/quote",
            None,
            Some(json!({
                "items": [{ "id": pid, "quantity": 2 }],
                "couponCode": "welcome5"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["subtotal"], 40.0);
    assert_eq!(quote["discountAmount"], 5.0);
    assert_eq!(quote["totalAmount"], 35.0);
}

#[tokio::test]
async fn test_campaigns_public_list() {
    let app = TestApp::new().await;
    let staff = app.token(1, Role::Staff);
    let now = chrono::Utc::now().timestamp_millis();

    let campaign = json!({
        "name": "Back to school",
        "campaignType": "CATEGORY_DISCOUNT",
        "config": { "categoryId": 3, "discountPercent": 10.0 },
        "startDate": now - 60_000,
        "endDate": now + 3_600_000
    });
    let (status, _) = app
        .send("POST", "/api/campaigns", None, Some(campaign.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send("POST", "/api/campaigns", Some(&staff), Some(campaign))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, list) = app.send("GET", "/api/campaigns/public", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["name"], "Back to school");
}

#[tokio::test]
async fn test_stock_endpoints() {
    let app = TestApp::new().await;
    let pid = app.product(4.0, 0).await;
    let staff = app.token(1, Role::Staff);

    let (status, _) = app
        .send(
            "POST",
            &format!("/api/products/{pid}/back-in-stock"),
            None,
            Some(json!({ "phoneNumber": "611222333" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, movement) = app
        .send(
            "POST",
            &format!("/api/products/{pid}/stock"),
            Some(&staff),
            Some(json!({ "type": "IN", "quantity": 12, "reason": "delivery" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(movement["previousStock"], 0);
    assert_eq!(movement["newStock"], 12);
    assert_eq!(movement["createdBy"], 1);

    assert!(
        app.sink
            .events()
            .iter()
            .any(|e| matches!(e, NotificationEvent::BackInStock { .. }))
    );

    let (status, list) = app
        .send(
            "GET",
            &format!("/api/products/{pid}/stock-movements"),
            Some(&staff),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, _) = app
        .send(
            "GET",
            &format!("/api/products/{}/stock-movements", pid + 1),
            Some(&staff),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
