use super::*;
use crate::controller::{Notice, ResourceListController};
use crate::request::MockHttpClient;
use crate::session::SessionGuard;
use crate::storage::MemoryTokenStore;
use bvs_shared::{Orders, PendingPricingOrders, Suppliers, SupportTickets};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const BASE: &str = "http://api.test";

// =========================================================
// 辅助函数
// =========================================================

fn url(path: &str) -> String {
    format!("{}{}", BASE, path)
}

fn create_api(client: &Arc<MockHttpClient>) -> AdminApi<MockHttpClient> {
    let session = Arc::new(SessionGuard::new(Box::new(MemoryTokenStore::new())));
    session.establish("abc");
    AdminApi::new(BASE, client.clone(), session)
}

fn sent_body(client: &MockHttpClient, index: usize) -> serde_json::Value {
    let requests = client.requests.lock();
    serde_json::from_str(requests[index].body.as_deref().unwrap()).unwrap()
}

// =========================================================
// 单个请求
// =========================================================

#[tokio::test]
async fn test_each_operation_sends_one_request() {
    let client = Arc::new(MockHttpClient::new());
    client.mock_response(HttpMethod::Post, &url("/api/admin/orders"), 201, json!({"id": 9}));
    client.mock_response(HttpMethod::Put, &url("/api/admin/orders/9"), 200, json!({}));
    client.mock_response(HttpMethod::Put, &url("/api/admin/orders/9/status"), 200, json!({}));
    client.mock_response(HttpMethod::Delete, &url("/api/admin/orders/9"), 200, json!({}));
    let executor = MutationExecutor::<Orders, _>::new(create_api(&client));
    let id = EntityId::from(9);

    executor.create(&json!({"hotel_name": "Sea View"})).await.unwrap();
    executor.update(&id, &json!({"notes": "morning"})).await.unwrap();
    executor.update_status(&id, "delivered").await.unwrap();
    executor.delete(&id).await.unwrap();

    assert_eq!(
        client.request_log(),
        vec![
            "POST http://api.test/api/admin/orders",
            "PUT http://api.test/api/admin/orders/9",
            "PUT http://api.test/api/admin/orders/9/status",
            "DELETE http://api.test/api/admin/orders/9",
        ]
    );
    assert_eq!(sent_body(&client, 2), json!({"status": "delivered"}));
    assert!(client.requests.lock()[3].body.is_none());
}

#[tokio::test]
async fn test_update_stock_patches_products() {
    let client = Arc::new(MockHttpClient::new());
    client.mock_response(HttpMethod::Patch, &url("/api/admin/products/4/stock"), 200, json!({}));
    let executor = MutationExecutor::<Products, _>::new(create_api(&client));

    executor.update_stock(&EntityId::from(4), 12.5).await.unwrap();

    assert_eq!(sent_body(&client, 0), json!({"stock_quantity": 12.5}));
}

#[tokio::test]
async fn test_negative_stock_is_refused_locally() {
    let client = Arc::new(MockHttpClient::new());
    let executor = MutationExecutor::<Products, _>::new(create_api(&client));

    let err = executor.update_stock(&EntityId::from(4), -1.0).await.unwrap_err();

    assert!(matches!(err, ClientError::Mutation(_)));
    assert!(client.requests.lock().is_empty());
}

#[tokio::test]
async fn test_row_without_id_is_refused_locally() {
    let client = Arc::new(MockHttpClient::new());
    let executor = MutationExecutor::<Orders, _>::new(create_api(&client));

    let err = executor.delete(&EntityId::default()).await.unwrap_err();

    assert_eq!(err, ClientError::Mutation("Cannot delete orders without an id".to_string()));
    assert!(client.requests.lock().is_empty());
}

#[tokio::test]
async fn test_failure_uses_server_message() {
    let client = Arc::new(MockHttpClient::new());
    client.mock_response(
        HttpMethod::Post,
        &url("/api/admin/suppliers"),
        400,
        json!({"message": "Email already exists"}),
    );
    let executor = MutationExecutor::<Suppliers, _>::new(create_api(&client));

    let err = executor.create(&json!({"name": "Farm Fresh"})).await.unwrap_err();

    assert_eq!(err, ClientError::Mutation("Email already exists".to_string()));
}

#[tokio::test]
async fn test_failure_without_message_falls_back() {
    let client = Arc::new(MockHttpClient::new());
    client.mock_response(HttpMethod::Delete, &url("/api/admin/products/7"), 500, json!({}));
    let executor = MutationExecutor::<Products, _>::new(create_api(&client));

    let err = executor.delete(&EntityId::from(7)).await.unwrap_err();

    assert_eq!(err, ClientError::Mutation("Failed to delete products".to_string()));
}

// =========================================================
// 定价与工单
// =========================================================

fn pending_order() -> Order {
    serde_json::from_value(json!({
        "id": 31,
        "hotel_name": "Sea View",
        "status": "pending_pricing",
        "items": [
            {"product_id": 5, "product_name": "Tomato", "quantity": 10, "unit_type": "kg"},
            {"product_id": 6, "product_name": "Onion", "quantity": 4, "unit_type": "kg"}
        ]
    }))
    .unwrap()
}

#[tokio::test]
async fn test_finalize_prices_sends_every_line() {
    let client = Arc::new(MockHttpClient::new());
    client.mock_response(
        HttpMethod::Put,
        &url("/api/admin/orders/31/finalize-prices"),
        200,
        json!({"message": "Prices finalized"}),
    );
    let executor = MutationExecutor::<PendingPricingOrders, _>::new(create_api(&client));
    let prices = HashMap::from([(EntityId::from(5), 42.5), (EntityId::from(6), 18.0)]);

    executor.finalize_prices(&pending_order(), &prices).await.unwrap();

    assert_eq!(
        client.request_log(),
        vec!["PUT http://api.test/api/admin/orders/31/finalize-prices"]
    );
    assert_eq!(
        sent_body(&client, 0),
        json!({"items": [
            {"product_id": 5, "price_per_unit": 42.5},
            {"product_id": 6, "price_per_unit": 18.0}
        ]})
    );
}

#[tokio::test]
async fn test_finalize_prices_validates_before_sending() {
    let client = Arc::new(MockHttpClient::new());
    let executor = MutationExecutor::<PendingPricingOrders, _>::new(create_api(&client));

    let missing = HashMap::from([(EntityId::from(5), 42.5)]);
    let err = executor.finalize_prices(&pending_order(), &missing).await.unwrap_err();
    assert_eq!(
        err,
        ClientError::Mutation("Please enter valid prices for: Onion (ID: 6)".to_string())
    );

    let zero = HashMap::from([(EntityId::from(5), 42.5), (EntityId::from(6), 0.0)]);
    let err = executor.finalize_prices(&pending_order(), &zero).await.unwrap_err();
    assert_eq!(
        err,
        ClientError::Mutation(
            "Price cannot be zero. Please enter valid amounts for all items.".to_string()
        )
    );

    assert!(client.requests.lock().is_empty());
}

#[tokio::test]
async fn test_finalize_prices_failure_falls_back() {
    let client = Arc::new(MockHttpClient::new());
    client.mock_response(
        HttpMethod::Put,
        &url("/api/admin/orders/31/finalize-prices"),
        500,
        json!({}),
    );
    let executor = MutationExecutor::<Orders, _>::new(create_api(&client));
    let prices = HashMap::from([(EntityId::from(5), 42.5), (EntityId::from(6), 18.0)]);

    let err = executor.finalize_prices(&pending_order(), &prices).await.unwrap_err();

    assert_eq!(err, ClientError::Mutation("Failed to finalize prices".to_string()));
}

#[tokio::test]
async fn test_ticket_reply_and_close() {
    let client = Arc::new(MockHttpClient::new());
    client.mock_response(
        HttpMethod::Post,
        &url("/api/admin/support/tickets/3/reply"),
        200,
        json!({"message": "reply added"}),
    );
    client.mock_response(
        HttpMethod::Patch,
        &url("/api/admin/support/tickets/3/close"),
        200,
        json!({"message": "ticket closed"}),
    );
    let executor = MutationExecutor::<SupportTickets, _>::new(create_api(&client));
    let id = EntityId::from(3);

    executor.reply(&id, "  Delivery moved to 7am  ").await.unwrap();
    executor.close(&id).await.unwrap();

    assert_eq!(
        client.request_log(),
        vec![
            "POST http://api.test/api/admin/support/tickets/3/reply",
            "PATCH http://api.test/api/admin/support/tickets/3/close",
        ]
    );
    assert_eq!(sent_body(&client, 0), json!({"message": "Delivery moved to 7am"}));
    assert!(client.requests.lock()[1].body.is_none());
}

#[tokio::test]
async fn test_ticket_reply_rules() {
    let client = Arc::new(MockHttpClient::new());
    client.mock_response(
        HttpMethod::Patch,
        &url("/api/admin/support/tickets/404/close"),
        404,
        json!({"error": "Ticket not found"}),
    );
    let executor = MutationExecutor::<SupportTickets, _>::new(create_api(&client));

    let err = executor.reply(&EntityId::from(3), "   ").await.unwrap_err();
    assert_eq!(err, ClientError::Mutation("Reply message is required".to_string()));
    assert!(client.requests.lock().is_empty());

    let err = executor.close(&EntityId::from(404)).await.unwrap_err();
    assert_eq!(err, ClientError::Mutation("Ticket not found".to_string()));
}

// =========================================================
// 增删改之后刷新
// =========================================================

#[tokio::test(start_paused = true)]
async fn test_delete_then_exactly_one_refetch() {
    let client = Arc::new(MockHttpClient::new());
    let products = url("/api/admin/products");
    client.mock_response(
        HttpMethod::Get,
        &products,
        200,
        json!([{"id": 7, "name": "Onion"}, {"id": 8, "name": "Apple"}]),
    );
    client.mock_delayed(
        HttpMethod::Get,
        &products,
        Duration::from_secs(1),
        200,
        json!([{"id": 8, "name": "Apple"}]),
    );
    client.mock_response(HttpMethod::Delete, &url("/api/admin/products/7"), 200, json!({}));

    let api = create_api(&client);
    let controller = ResourceListController::<Products, _>::new(api.clone());
    let executor = MutationExecutor::<Products, _>::new(api);
    controller.load().await;

    let c = controller.clone();
    let task = tokio::spawn(async move {
        c.refetch_after(executor.delete(&EntityId::from(7)), "Product deleted").await
    });

    // 刷新请求还没返回，列表保持原样
    tokio::time::sleep(Duration::from_millis(500)).await;
    let state = controller.state();
    assert!(state.loading);
    assert_eq!(state.items.len(), 2);

    task.await.unwrap().unwrap();

    assert_eq!(
        client.request_log(),
        vec![
            format!("GET {}", products),
            "DELETE http://api.test/api/admin/products/7".to_string(),
            format!("GET {}", products),
        ]
    );
    let state = controller.state();
    assert!(!state.loading);
    assert_eq!(state.items.len(), 1);
    assert_eq!(state.notice, Some(Notice::success("Product deleted")));
}

#[tokio::test]
async fn test_failed_mutation_keeps_items_and_skips_refetch() {
    let client = Arc::new(MockHttpClient::new());
    let hotels = url("/api/admin/hotels");
    client.mock_response(
        HttpMethod::Get,
        &hotels,
        200,
        json!([{"id": 1, "hotel_name": "Sea View"}]),
    );
    client.mock_response(
        HttpMethod::Put,
        &url("/api/admin/hotels/1"),
        422,
        json!({"error": "Phone is invalid"}),
    );

    let api = create_api(&client);
    let controller = ResourceListController::<bvs_shared::Hotels, _>::new(api.clone());
    let executor = MutationExecutor::<bvs_shared::Hotels, _>::new(api);
    controller.load().await;

    let err = controller
        .refetch_after(
            executor.update(&EntityId::from(1), &json!({"phone": "x"})),
            "Hotel updated",
        )
        .await
        .unwrap_err();

    assert_eq!(err, ClientError::Mutation("Phone is invalid".to_string()));
    assert_eq!(client.request_count(HttpMethod::Get, &hotels), 1);
    let state = controller.state();
    assert_eq!(state.items.len(), 1);
    assert_eq!(state.error, None);
    assert_eq!(state.notice, Some(Notice::error("Phone is invalid")));

    controller.clear_notice();
    assert_eq!(controller.state().notice, None);
}

#[tokio::test]
async fn test_create_then_load_shows_new_row() {
    let client = Arc::new(MockHttpClient::new());
    let suppliers = url("/api/admin/suppliers");
    client.mock_response(HttpMethod::Get, &suppliers, 200, json!([]));
    client.mock_response(
        HttpMethod::Get,
        &suppliers,
        200,
        json!({"suppliers": [{"id": "s1", "name": "Farm Fresh", "status": "active"}]}),
    );
    client.mock_response(HttpMethod::Post, &suppliers, 201, json!({"id": "s1"}));

    let api = create_api(&client);
    let controller = ResourceListController::<Suppliers, _>::new(api.clone());
    let executor = MutationExecutor::<Suppliers, _>::new(api);
    controller.load().await;
    assert!(controller.state().items.is_empty());

    controller
        .refetch_after(executor.create(&json!({"name": "Farm Fresh"})), "Supplier added")
        .await
        .unwrap();

    let state = controller.state();
    assert_eq!(state.items.len(), 1);
    assert_eq!(state.items[0].name.as_deref(), Some("Farm Fresh"));
    assert_eq!(sent_body(&client, 1), json!({"name": "Farm Fresh"}));
}

#[tokio::test(start_paused = true)]
async fn test_refetch_after_replaces_in_flight_request() {
    let client = Arc::new(MockHttpClient::new());
    let suppliers = url("/api/admin/suppliers");
    // 这个 GET 在新增之前发出，返回的是旧数据
    client.mock_delayed(
        HttpMethod::Get,
        &suppliers,
        Duration::from_secs(10),
        200,
        json!([{"id": 1, "name": "Farm Fresh"}]),
    );
    client.mock_response(
        HttpMethod::Get,
        &suppliers,
        200,
        json!([{"id": 1, "name": "Farm Fresh"}, {"id": 2, "name": "Green Valley"}]),
    );
    client.mock_response(HttpMethod::Post, &suppliers, 201, json!({"id": 2}));

    let api = create_api(&client);
    let controller = ResourceListController::<Suppliers, _>::new(api.clone());
    let executor = MutationExecutor::<Suppliers, _>::new(api);

    let c = controller.clone();
    let slow = tokio::spawn(async move { c.load().await });
    tokio::time::sleep(Duration::from_secs(1)).await;

    controller
        .refetch_after(executor.create(&json!({"name": "Green Valley"})), "Supplier added")
        .await
        .unwrap();

    assert_eq!(client.request_count(HttpMethod::Get, &suppliers), 2);
    let state = controller.state();
    assert!(!state.loading);
    assert_eq!(state.items.len(), 2);

    // 旧请求最终返回，但不会覆盖新数据
    slow.await.unwrap();
    let state = controller.state();
    assert!(!state.loading);
    assert_eq!(state.items.len(), 2);
    assert_eq!(state.notice, Some(Notice::success("Supplier added")));
}
