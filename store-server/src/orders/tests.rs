use std::sync::Arc;

use serde_json::json;
use shared::error::ErrorCode;
use shared::models::{
    CampaignCreate, CampaignType, CouponCreate, CreateOrderRequest, DiscountType, OrderItemInput,
    OrderStatus, ProductCreate, StockMovementType,
};
use sqlx::SqlitePool;

use super::*;
use crate::db::repository::{product as product_repo, stock_movement};
use crate::db::test_db;
use crate::inventory::{StockGuard, StockLedger};
use crate::notify::{DirectExecutor, Enqueuer, MemorySink, NotificationEvent};
use crate::promotions::{create_campaign, create_coupon};

const STAFF: i64 = 900;
const CUSTOMER: i64 = 42;

struct Fixture {
    _dir: tempfile::TempDir,
    pool: SqlitePool,
    sink: MemorySink,
    builder: OrderBuilder,
    service: OrderService,
}

async fn fixture_with_guard(guard: StockGuard) -> Fixture {
    let (dir, db) = test_db().await;
    let sink = MemorySink::new();
    let notifier: Arc<dyn Enqueuer> = Arc::new(DirectExecutor::new(Arc::new(sink.clone())));
    let ledger = StockLedger::new(db.pool.clone(), notifier.clone());
    Fixture {
        builder: OrderBuilder::new(db.pool.clone()),
        service: OrderService::new(db.pool.clone(), ledger, notifier, guard),
        pool: db.pool,
        sink,
        _dir: dir,
    }
}

async fn fixture() -> Fixture {
    fixture_with_guard(StockGuard::NonNegative).await
}

async fn product(pool: &SqlitePool, name: &str, price: f64, stock: i64, category: Option<i64>) -> i64 {
    product_repo::create(
        pool,
        ProductCreate {
            name: name.into(),
            description: None,
            price,
            stock: Some(stock),
            low_stock_threshold: Some(0),
            category_id: category,
        },
    )
    .await
    .unwrap()
    .id
}

async fn stock_of(pool: &SqlitePool, id: i64) -> i64 {
    product_repo::find_by_id(pool, id).await.unwrap().unwrap().stock
}

fn request(items: Vec<(i64, i64)>, coupon: Option<&str>) -> CreateOrderRequest {
    CreateOrderRequest {
        items: items
            .into_iter()
            .map(|(id, quantity)| OrderItemInput { id, quantity })
            .collect(),
        full_name: "Lucía Pérez".into(),
        phone_number: "600123456".into(),
        email: Some("lucia@example.com".into()),
        note: None,
        coupon_code: coupon.map(str::to_string),
    }
}

fn assert_total_integrity(detail: &shared::models::OrderDetail) {
    let o = &detail.order;
    let items: f64 = detail.items.iter().map(|i| i.price * i.quantity as f64).sum();
    assert!((items - o.subtotal).abs() < 0.005);
    let expected = o.subtotal - o.campaign_discount - o.discount_amount;
    assert!((expected - o.total_amount).abs() < 0.005, "{expected} != {}", o.total_amount);
}

#[tokio::test]
async fn test_end_to_end_order_flow() {
    let f = fixture().await;
    let notebook = product(&f.pool, "Notebook A5", 10.0, 5, None).await;
    let pen = product(&f.pool, "Gel pen", 25.5, 3, None).await;
    create_coupon(
        &f.pool,
        CouponCreate {
            code: "save10".into(),
            discount_type: DiscountType::Percentage,
            discount_value: 10.0,
            min_order_amount: None,
            expiration_date: None,
            is_active: None,
        },
    )
    .await
    .unwrap();

    // 2 × 10 + 1 × 25.5 = 45.5, 10% off = 4.55
    let detail = f
        .builder
        .create_order(request(vec![(notebook, 2), (pen, 1)], Some(" Save10 ")), Some(CUSTOMER))
        .await
        .unwrap();
    let order = &detail.order;
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.subtotal, 45.5);
    assert_eq!(order.discount_amount, 4.55);
    assert_eq!(order.total_amount, 40.95);
    assert_eq!(order.coupon_code.as_deref(), Some("SAVE10"));
    assert_eq!(order.status_history.len(), 1);
    assert!(super::pickup_code::is_valid_pickup_code(&order.pickup_code));
    assert_total_integrity(&detail);

    // 创建订单不扣库存
    assert_eq!(stock_of(&f.pool, notebook).await, 5);
    assert_eq!(stock_of(&f.pool, pen).await, 3);

    let id = order.id;
    let d = f
        .service
        .update_status(id, OrderStatus::Preparing, Some(STAFF), None)
        .await
        .unwrap();
    assert_eq!(d.order.status, OrderStatus::Preparing);
    assert_eq!(stock_of(&f.pool, notebook).await, 3);
    assert_eq!(stock_of(&f.pool, pen).await, 2);

    let d = f
        .service
        .update_status(id, OrderStatus::Ready, Some(STAFF), Some("Bag 4".into()))
        .await
        .unwrap();
    assert!(d.order.ready_at.is_some());

    let d = f
        .service
        .update_status(id, OrderStatus::Completed, Some(STAFF), None)
        .await
        .unwrap();
    assert!(d.order.completed_at.is_some());
    assert_eq!(d.order.total_amount, 40.95);
    assert_eq!(stock_of(&f.pool, notebook).await, 3);

    let statuses: Vec<_> = d.order.status_history.iter().map(|h| h.status).collect();
    assert_eq!(
        statuses,
        vec![
            OrderStatus::Pending,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Completed
        ]
    );
    assert_eq!(d.order.status_history[2].note.as_deref(), Some("Bag 4"));
    assert_eq!(d.order.status_history[1].old_status, Some(OrderStatus::Pending));
    assert_eq!(d.order.status_history[1].changed_by, Some(STAFF));

    let movements = stock_movement::list_by_order(&f.pool, id).await.unwrap();
    assert_eq!(movements.len(), 2);
    assert!(movements.iter().all(|m| m.movement_type == StockMovementType::Order));

    let status_events = f
        .sink
        .events()
        .into_iter()
        .filter(|e| matches!(e, NotificationEvent::OrderStatusChanged { .. }))
        .count();
    assert_eq!(status_events, 3);

    // 终态不可再变更
    let err = f
        .service
        .update_status(id, OrderStatus::Cancelled, Some(STAFF), None)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::OrderInvalidTransition);
}

#[tokio::test]
async fn test_illegal_transitions_rejected() {
    let f = fixture().await;
    let p = product(&f.pool, "Ruler", 2.0, 10, None).await;
    let d = f.builder.create_order(request(vec![(p, 1)], None), None).await.unwrap();

    for next in [OrderStatus::Ready, OrderStatus::Completed, OrderStatus::Pending] {
        let err = f
            .service
            .update_status(d.order.id, next, Some(STAFF), None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderInvalidTransition, "PENDING -> {next}");
    }
    let unchanged = f.service.get(d.order.id).await.unwrap();
    assert_eq!(unchanged.order.status, OrderStatus::Pending);
    assert_eq!(unchanged.order.status_history.len(), 1);
}

#[tokio::test]
async fn test_cancel_restores_stock() {
    let f = fixture().await;
    let p = product(&f.pool, "Stapler", 7.0, 4, None).await;
    let d = f.builder.create_order(request(vec![(p, 3)], None), None).await.unwrap();

    f.service
        .update_status(d.order.id, OrderStatus::Preparing, Some(STAFF), None)
        .await
        .unwrap();
    assert_eq!(stock_of(&f.pool, p).await, 1);

    let d = f
        .service
        .update_status(d.order.id, OrderStatus::Cancelled, Some(STAFF), Some("no-show".into()))
        .await
        .unwrap();
    assert!(d.order.cancelled_at.is_some());
    assert_eq!(stock_of(&f.pool, p).await, 4);
}

#[tokio::test]
async fn test_cancel_pending_does_not_touch_stock() {
    let f = fixture().await;
    let p = product(&f.pool, "Glue", 1.5, 2, None).await;
    let d = f.builder.create_order(request(vec![(p, 2)], None), None).await.unwrap();
    f.service
        .update_status(d.order.id, OrderStatus::Cancelled, Some(STAFF), None)
        .await
        .unwrap();
    assert_eq!(stock_of(&f.pool, p).await, 2);
    assert!(stock_movement::list_by_order(&f.pool, d.order.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_preparing_with_insufficient_stock_rolls_back() {
    let f = fixture().await;
    let a = product(&f.pool, "Marker", 3.0, 5, None).await;
    let b = product(&f.pool, "Folder", 1.0, 5, None).await;
    let d = f
        .builder
        .create_order(request(vec![(a, 2), (b, 5)], None), None)
        .await
        .unwrap();

    // 其它渠道卖掉了部分库存
    let mut tx = f.pool.begin().await.unwrap();
    product_repo::adjust_stock(&mut *tx, b, -3, false).await.unwrap();
    tx.commit().await.unwrap();

    let err = f
        .service
        .update_status(d.order.id, OrderStatus::Preparing, Some(STAFF), None)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InsufficientStock);

    let order = f.service.get(d.order.id).await.unwrap();
    assert_eq!(order.order.status, OrderStatus::Pending);
    assert_eq!(stock_of(&f.pool, a).await, 5);
    assert_eq!(stock_of(&f.pool, b).await, 2);
}

#[tokio::test]
async fn test_permissive_fulfilment_allows_negative_stock() {
    let f = fixture_with_guard(StockGuard::Permissive).await;
    let p = product(&f.pool, "Tape", 2.0, 2, None).await;
    let d = f.builder.create_order(request(vec![(p, 2)], None), None).await.unwrap();

    let mut tx = f.pool.begin().await.unwrap();
    product_repo::adjust_stock(&mut *tx, p, -2, false).await.unwrap();
    tx.commit().await.unwrap();

    f.service
        .update_status(d.order.id, OrderStatus::Preparing, Some(STAFF), None)
        .await
        .unwrap();
    assert_eq!(stock_of(&f.pool, p).await, -2);
}

#[tokio::test]
async fn test_concurrent_transitions_only_one_wins() {
    let f = fixture().await;
    let p = product(&f.pool, "Scissors", 4.0, 10, None).await;
    let d = f.builder.create_order(request(vec![(p, 1)], None), None).await.unwrap();
    let id = d.order.id;

    let (a, b) = tokio::join!(
        f.service.update_status(id, OrderStatus::Preparing, Some(STAFF), None),
        f.service.update_status(id, OrderStatus::Preparing, Some(STAFF), None),
    );
    assert!(a.is_ok() ^ b.is_ok(), "exactly one transition must apply");
    let loser = a.err().or(b.err()).unwrap();
    assert!(matches!(
        loser.code,
        ErrorCode::OrderStatusConflict | ErrorCode::OrderInvalidTransition
    ));

    let order = f.service.get(id).await.unwrap().order;
    assert_eq!(order.status, OrderStatus::Preparing);
    assert_eq!(order.status_history.len(), 2);
    // 只扣减一次库存
    assert_eq!(stock_of(&f.pool, p).await, 9);
}

#[tokio::test]
async fn test_customer_cancel_rules() {
    let f = fixture().await;
    let p = product(&f.pool, "Pencil case", 6.0, 10, None).await;
    let d = f
        .builder
        .create_order(request(vec![(p, 1)], None), Some(CUSTOMER))
        .await
        .unwrap();

    let err = f
        .service
        .cancel_by_customer(d.order.id, CUSTOMER + 1, None)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::PermissionDenied);

    let cancelled = f
        .service
        .cancel_by_customer(d.order.id, CUSTOMER, Some("changed my mind".into()))
        .await
        .unwrap();
    assert_eq!(cancelled.order.status, OrderStatus::Cancelled);
    assert_eq!(
        cancelled.order.status_history.last().and_then(|h| h.note.as_deref()),
        Some("changed my mind")
    );

    let d2 = f
        .builder
        .create_order(request(vec![(p, 1)], None), Some(CUSTOMER))
        .await
        .unwrap();
    f.service
        .update_status(d2.order.id, OrderStatus::Preparing, Some(STAFF), None)
        .await
        .unwrap();
    let err = f
        .service
        .cancel_by_customer(d2.order.id, CUSTOMER, None)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::OrderCancelNotAllowed);
}

#[tokio::test]
async fn test_create_order_validation() {
    let f = fixture().await;
    let p = product(&f.pool, "Compass", 5.0, 1, None).await;

    let err = f.builder.create_order(request(vec![], None), None).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::OrderEmpty);

    let err = f
        .builder
        .create_order(request(vec![(p, 2)], None), None)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InsufficientStock);

    let err = f
        .builder
        .create_order(request(vec![(123, 1)], None), None)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ProductNotFound);

    let mut req = request(vec![(p, 1)], None);
    req.full_name = "  ".into();
    let err = f.builder.create_order(req, None).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::RequiredField);

    // 软删除商品不可下单
    product_repo::delete(&f.pool, p).await.unwrap();
    let err = f
        .builder
        .create_order(request(vec![(p, 1)], None), None)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ProductNotFound);
}

#[tokio::test]
async fn test_duplicate_lines_merged() {
    let f = fixture().await;
    let p = product(&f.pool, "Eraser", 0.5, 10, None).await;
    let d = f
        .builder
        .create_order(request(vec![(p, 2), (p, 3)], None), None)
        .await
        .unwrap();
    assert_eq!(d.items.len(), 1);
    assert_eq!(d.items[0].quantity, 5);
    assert_eq!(d.order.subtotal, 2.5);
}

#[tokio::test]
async fn test_invalid_coupon_is_ignored() {
    let f = fixture().await;
    let p = product(&f.pool, "Highlighter", 10.0, 10, None).await;
    create_coupon(
        &f.pool,
        CouponCreate {
            code: "BIG".into(),
            discount_type: DiscountType::Fixed,
            discount_value: 5.0,
            min_order_amount: Some(100.0),
            expiration_date: None,
            is_active: None,
        },
    )
    .await
    .unwrap();

    for code in ["BIG", "NOPE"] {
        let d = f
            .builder
            .create_order(request(vec![(p, 1)], Some(code)), None)
            .await
            .unwrap();
        assert_eq!(d.order.discount_amount, 0.0);
        assert_eq!(d.order.coupon_code, None);
        assert_eq!(d.order.total_amount, 10.0);
    }
}

#[tokio::test]
async fn test_campaign_then_coupon() {
    let f = fixture().await;
    let now = shared::util::now_millis();
    let p = product(&f.pool, "Sketchbook", 20.0, 10, Some(3)).await;
    create_campaign(
        &f.pool,
        CampaignCreate {
            name: "Back to school".into(),
            description: None,
            campaign_type: CampaignType::CategoryDiscount,
            config: json!({"discountPercent": 25, "categoryId": 3}),
            start_date: now - 60_000,
            end_date: now + 3_600_000,
            is_active: None,
        },
    )
    .await
    .unwrap();
    create_coupon(
        &f.pool,
        CouponCreate {
            code: "FIVE".into(),
            discount_type: DiscountType::Fixed,
            discount_value: 5.0,
            min_order_amount: Some(25.0),
            expiration_date: None,
            is_active: None,
        },
    )
    .await
    .unwrap();

    // 40 - 25% = 30, coupon min 25 met → 25
    let d = f
        .builder
        .create_order(request(vec![(p, 2)], Some("five")), None)
        .await
        .unwrap();
    assert_eq!(d.order.subtotal, 40.0);
    assert_eq!(d.order.campaign_discount, 10.0);
    assert_eq!(d.order.discount_amount, 5.0);
    assert_eq!(d.order.total_amount, 25.0);
    assert_eq!(d.order.applied_campaigns.len(), 1);
    assert_total_integrity(&d);

    let quote = f
        .builder
        .quote(CartQuoteRequest {
            items: vec![OrderItemInput { id: p, quantity: 2 }],
            coupon_code: Some("FIVE".into()),
        })
        .await
        .unwrap();
    assert_eq!(quote.total_amount, 25.0);
    assert_eq!(quote.campaign_discount, 10.0);
}

#[tokio::test]
async fn test_track_and_verify_pickup_code() {
    let f = fixture().await;
    let p = product(&f.pool, "Crayons", 3.0, 10, None).await;
    let d = f.builder.create_order(request(vec![(p, 2)], None), None).await.unwrap();
    let code = d.order.pickup_code.clone();

    let tracking = f.service.track(&code.to_lowercase()).await.unwrap();
    assert_eq!(tracking.status, OrderStatus::Pending);
    assert_eq!(tracking.item_count, 2);
    assert_eq!(tracking.total_amount, 6.0);

    let verified = f.service.verify_pickup_code(&code).await.unwrap();
    assert_eq!(verified.order.id, d.order.id);

    let err = f.service.track("ZZZZZZ").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::PickupCodeNotFound);
}

#[tokio::test]
async fn test_pickup_codes_unique() {
    let f = fixture().await;
    let p = product(&f.pool, "Clip", 0.1, 1000, None).await;
    let mut codes = std::collections::HashSet::new();
    for _ in 0..50 {
        let d = f.builder.create_order(request(vec![(p, 1)], None), None).await.unwrap();
        assert!(codes.insert(d.order.pickup_code));
    }
}

#[tokio::test]
async fn test_pickup_code_retries_past_many_collisions() {
    let f = fixture().await;
    let p = product(&f.pool, "Pin", 0.2, 10, None).await;
    let taken = f
        .builder
        .create_order(request(vec![(p, 1)], None), None)
        .await
        .unwrap()
        .order
        .pickup_code;
    let free = if taken == "000000" { "000001" } else { "000000" };

    // 远超旧的 32 次上限
    let mut calls = 0;
    let code = super::pickup_code::unique_pickup_code_from(&f.pool, || {
        calls += 1;
        if calls <= 100 { taken.clone() } else { free.to_string() }
    })
    .await
    .unwrap();
    assert_eq!(code, free);
    assert_eq!(calls, 101);
}

#[tokio::test]
async fn test_many_line_order_create_and_prepare() {
    let f = fixture().await;
    let mut products = Vec::new();
    for i in 0..60 {
        products.push(product(&f.pool, &format!("Card {i}"), 1.0, 100, None).await);
    }

    for round in 1..=5 {
        let d = f
            .builder
            .create_order(request(products.iter().map(|&p| (p, 1)).collect(), None), None)
            .await
            .unwrap();
        assert_eq!(d.items.len(), 60);
        assert_eq!(d.order.subtotal, 60.0);
        let ids: std::collections::HashSet<_> = d.items.iter().map(|i| i.id).collect();
        assert_eq!(ids.len(), 60);
        assert!(d.items.iter().all(|i| i.order_id == d.order.id));

        let stored = f.service.get(d.order.id).await.unwrap();
        let mut stored_ids: Vec<_> = stored.items.iter().map(|i| i.id).collect();
        let mut created_ids: Vec<_> = ids.into_iter().collect();
        stored_ids.sort_unstable();
        created_ids.sort_unstable();
        assert_eq!(stored_ids, created_ids);

        f.service
            .update_status(d.order.id, OrderStatus::Preparing, Some(STAFF), None)
            .await
            .unwrap();
        let movements = stock_movement::list_by_order(&f.pool, d.order.id).await.unwrap();
        assert_eq!(movements.len(), 60);
        assert_eq!(stock_of(&f.pool, products[0]).await, 100 - round);
        assert_eq!(stock_of(&f.pool, products[59]).await, 100 - round);
    }
}

/// Legal steps from a fresh PENDING order to `target`
fn path_to(target: OrderStatus) -> &'static [OrderStatus] {
    use OrderStatus::*;
    match target {
        Pending => &[],
        Preparing => &[Preparing],
        Ready => &[Preparing, Ready],
        Completed => &[Preparing, Ready, Completed],
        Cancelled => &[Cancelled],
    }
}

#[tokio::test]
async fn test_transition_table() {
    use OrderStatus::*;
    let all = [Pending, Preparing, Ready, Completed, Cancelled];
    let legal = [
        (Pending, Preparing),
        (Pending, Cancelled),
        (Preparing, Ready),
        (Preparing, Cancelled),
        (Ready, Completed),
        (Ready, Cancelled),
    ];

    let f = fixture().await;
    let p = product(&f.pool, "Index cards", 1.0, 1000, None).await;

    for from in all {
        for to in all {
            let d = f.builder.create_order(request(vec![(p, 1)], None), None).await.unwrap();
            let id = d.order.id;
            for &step in path_to(from) {
                f.service.update_status(id, step, Some(STAFF), None).await.unwrap();
            }
            let before = f.service.get(id).await.unwrap().order;
            assert_eq!(before.status, from);

            let result = f.service.update_status(id, to, Some(STAFF), None).await;
            let after = f.service.get(id).await.unwrap().order;
            if legal.contains(&(from, to)) {
                let d = result.unwrap_or_else(|e| panic!("{from} -> {to}: {e}"));
                assert_eq!(d.order.status, to);
                assert_eq!(after.status, to);
                assert_eq!(after.status_history.len(), before.status_history.len() + 1);
            } else {
                let err = result.unwrap_err();
                assert_eq!(err.code, ErrorCode::OrderInvalidTransition, "{from} -> {to}");
                assert_eq!(after.status, from);
                assert_eq!(after.status_history.len(), before.status_history.len());
                assert_eq!(after.updated_at, before.updated_at);
            }
        }
    }
}

#[tokio::test]
async fn test_cancel_ready_restores_stock() {
    let f = fixture().await;
    let p = product(&f.pool, "Binder", 4.0, 6, None).await;
    let d = f.builder.create_order(request(vec![(p, 4)], None), None).await.unwrap();
    let id = d.order.id;

    f.service.update_status(id, OrderStatus::Preparing, Some(STAFF), None).await.unwrap();
    f.service.update_status(id, OrderStatus::Ready, Some(STAFF), None).await.unwrap();
    assert_eq!(stock_of(&f.pool, p).await, 2);

    let d = f
        .service
        .update_status(id, OrderStatus::Cancelled, Some(STAFF), None)
        .await
        .unwrap();
    assert_eq!(d.order.status, OrderStatus::Cancelled);
    assert_eq!(stock_of(&f.pool, p).await, 6);

    let movements = stock_movement::list_by_order(&f.pool, id).await.unwrap();
    let mut quantities: Vec<_> = movements.iter().map(|m| m.quantity).collect();
    quantities.sort_unstable();
    assert_eq!(quantities, vec![-4, 4]);
}

#[tokio::test]
async fn test_order_prices_frozen_after_product_price_change() {
    let f = fixture().await;
    let p = product(&f.pool, "Fountain pen", 12.5, 10, None).await;
    let d = f.builder.create_order(request(vec![(p, 2)], None), None).await.unwrap();
    assert_eq!(d.order.total_amount, 25.0);

    sqlx::query("UPDATE product SET price = ? WHERE id = ?")
        .bind(99.0)
        .bind(p)
        .execute(&f.pool)
        .await
        .unwrap();

    let stored = f.service.get(d.order.id).await.unwrap();
    assert_eq!(stored.items[0].price, 12.5);
    assert_eq!(stored.order.subtotal, 25.0);
    assert_eq!(stored.order.total_amount, 25.0);
    assert_total_integrity(&stored);

    let moved = f
        .service
        .update_status(d.order.id, OrderStatus::Preparing, Some(STAFF), None)
        .await
        .unwrap();
    assert_eq!(moved.items[0].price, 12.5);
    assert_eq!(moved.order.total_amount, 25.0);
}

#[tokio::test]
async fn test_reserve_then_cancel_scenario() {
    let f = fixture().await;
    let p = product(&f.pool, "Desk lamp", 100.0, 10, None).await;
    let d = f.builder.create_order(request(vec![(p, 2)], None), None).await.unwrap();
    assert_eq!(d.order.total_amount, 200.0);
    assert_eq!(stock_of(&f.pool, p).await, 10);

    f.service
        .update_status(d.order.id, OrderStatus::Preparing, Some(STAFF), None)
        .await
        .unwrap();
    assert_eq!(stock_of(&f.pool, p).await, 8);

    let d = f
        .service
        .update_status(d.order.id, OrderStatus::Cancelled, Some(STAFF), None)
        .await
        .unwrap();
    assert_eq!(stock_of(&f.pool, p).await, 10);
    assert_eq!(d.order.status_history.len(), 3);
}

#[tokio::test]
async fn test_transition_result_matches_stored_order() {
    let f = fixture().await;
    let p = product(&f.pool, "Easel", 30.0, 5, None).await;
    let d = f.builder.create_order(request(vec![(p, 1)], None), None).await.unwrap();
    let id = d.order.id;
    f.service.update_status(id, OrderStatus::Preparing, Some(STAFF), None).await.unwrap();

    let returned = f
        .service
        .update_status(id, OrderStatus::Ready, Some(STAFF), Some("Shelf B".into()))
        .await
        .unwrap();
    let stored = f.service.get(id).await.unwrap();
    assert_eq!(returned.order.status, stored.order.status);
    assert_eq!(returned.order.status_history, stored.order.status_history);
    assert_eq!(returned.order.updated_at, stored.order.updated_at);
    assert_eq!(returned.order.ready_at, stored.order.ready_at);
    assert_eq!(returned.order.changed_by, Some(STAFF));
    assert_eq!(stored.order.changed_by, Some(STAFF));
    assert_eq!(returned.items.len(), stored.items.len());

    let last = f.sink.events().into_iter().last().unwrap();
    match last {
        NotificationEvent::OrderStatusChanged {
            order_id,
            status,
            old_status,
            pickup_code,
            ..
        } => {
            assert_eq!(order_id, id);
            assert_eq!(status, OrderStatus::Ready);
            assert_eq!(old_status, OrderStatus::Preparing);
            assert_eq!(pickup_code, stored.order.pickup_code);
        }
        other => panic!("unexpected event {other:?}"),
    }
}
