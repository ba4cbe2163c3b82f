use chrono::{Duration as ChronoDuration, Utc};
use fairmart_auth::{JwtClaims, PrincipalId, Role};
use fairmart_catalog::{Category, PriceBand, Subcategory};
use fairmart_core::{CategoryId, ItemId, Money};
use fairmart_infra::store::{InMemoryStore, Store};
use fairmart_infra::ServiceSettings;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::json;

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    item_id: ItemId,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Same router as prod over an in-memory store seeded with one item
    /// banded at 40..=60 taka, bound to an ephemeral port.
    async fn spawn() -> Self {
        let store = InMemoryStore::new();
        let category = Category {
            id: CategoryId::new(),
            name: "Rice".into(),
        };
        let item = Subcategory {
            id: ItemId::new(),
            category_id: category.id,
            name: "Miniket rice".into(),
            unit: "kg".into(),
            band: PriceBand::new(Some(Money::from_taka(40)), Some(Money::from_taka(60))),
        };
        store.put_subcategory(&category, &item).await.unwrap();

        let services = fairmart_api::app::AppServices::in_memory(store, ServiceSettings::default());
        let app = fairmart_api::app::build_app_with_services(JWT_SECRET, services);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            item_id: item.id,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(sub: PrincipalId, role: Role) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub,
        role,
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

struct Parties {
    shop_id: PrincipalId,
    shop: String,
    customer: String,
    other_customer: String,
}

fn parties() -> Parties {
    let shop_id = PrincipalId::new();
    Parties {
        shop_id,
        shop: mint_jwt(shop_id, Role::ShopOwner),
        customer: mint_jwt(PrincipalId::new(), Role::Customer),
        other_customer: mint_jwt(PrincipalId::new(), Role::Customer),
    }
}

async fn add_stock(
    client: &reqwest::Client,
    srv: &TestServer,
    token: &str,
    quantity: i64,
    unit_price: f64,
) -> reqwest::Response {
    client
        .post(srv.url("/inventory"))
        .bearer_auth(token)
        .json(&json!({
            "item_id": srv.item_id.to_string(),
            "quantity": quantity,
            "unit_price": unit_price,
        }))
        .send()
        .await
        .unwrap()
}

async fn place(
    client: &reqwest::Client,
    srv: &TestServer,
    p: &Parties,
    token: &str,
    quantity: i64,
) -> reqwest::Response {
    client
        .post(srv.url("/orders"))
        .bearer_auth(token)
        .json(&json!({
            "shop_id": p.shop_id.to_string(),
            "item_id": srv.item_id.to_string(),
            "quantity": quantity,
            "delivery_address": "House 12, Mirpur",
            "delivery_phone": "01712345678",
        }))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn principal_is_derived_from_token() {
    let srv = TestServer::spawn().await;
    let sub = PrincipalId::new();
    let token = mint_jwt(sub, Role::Wholesaler);

    let client = reqwest::Client::new();
    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["principal_id"].as_str().unwrap(), sub.to_string());
    assert_eq!(body["role"], "wholesaler");

    let res = client
        .get(srv.url("/catalog/items"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["items"][0]["min_price"], 40.0);
    assert_eq!(body["items"][0]["category_name"], "Rice");
}

#[tokio::test]
async fn roles_are_limited_to_their_permissions() {
    let srv = TestServer::spawn().await;
    let p = parties();
    let client = reqwest::Client::new();

    let res = add_stock(&client, &srv, &p.customer, 5, 50.0).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let wholesaler = mint_jwt(PrincipalId::new(), Role::Wholesaler);
    let res = client
        .get(srv.url("/orders"))
        .bearer_auth(&wholesaler)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = place(&client, &srv, &p, &p.shop, 1).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn band_is_enforced_on_stock_upsert() {
    let srv = TestServer::spawn().await;
    let p = parties();
    let client = reqwest::Client::new();

    let res = add_stock(&client, &srv, &p.shop, 5, 39.0).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "price_out_of_range");
    assert_eq!(body["bound"], "min");
    assert_eq!(body["limit"], 40.0);

    let res = add_stock(&client, &srv, &p.shop, 5, 40.0).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["quantity"], 5);
    assert_eq!(body["low_stock_threshold"], 10);

    let res = add_stock(&client, &srv, &p.shop, -1, 40.0).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn order_lifecycle_reserves_and_restores_stock() {
    let srv = TestServer::spawn().await;
    let p = parties();
    let client = reqwest::Client::new();

    let res = add_stock(&client, &srv, &p.shop, 10, 50.0).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = place(&client, &srv, &p, &p.customer, 7).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let order: serde_json::Value = res.json().await.unwrap();
    let order_id = order["id"].as_str().unwrap().to_string();
    assert!(order["order_number"].as_str().unwrap().starts_with("ORD-"));
    assert_eq!(order["status"], "pending");
    assert_eq!(order["total_amount"], 350.0);
    assert_eq!(order["item_name"], "Miniket rice");

    let res = place(&client, &srv, &p, &p.other_customer, 5).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "insufficient_stock");
    assert_eq!(body["available"], 3);

    let res = client
        .post(srv.url(&format!("/orders/{order_id}/cancel")))
        .bearer_auth(&p.customer)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "cancelled");
    assert_eq!(body["cancellation_reason"], "Cancelled by customer");

    let res = client
        .post(srv.url(&format!("/orders/{order_id}/cancel")))
        .bearer_auth(&p.customer)
        .json(&json!({ "reason": "again" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_transition");

    let res = client
        .get(srv.url("/inventory"))
        .bearer_auth(&p.shop)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["items"][0]["quantity"], 10);
}

#[tokio::test]
async fn shop_advances_status_and_history_is_recorded() {
    let srv = TestServer::spawn().await;
    let p = parties();
    let client = reqwest::Client::new();
    add_stock(&client, &srv, &p.shop, 10, 50.0).await;

    let res = place(&client, &srv, &p, &p.customer, 2).await;
    let order: serde_json::Value = res.json().await.unwrap();
    let order_id = order["id"].as_str().unwrap().to_string();

    let res = client
        .put(srv.url(&format!("/orders/{order_id}/status")))
        .bearer_auth(&p.shop)
        .json(&json!({ "new_status": "ready" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["allowed"], json!(["confirmed", "cancelled"]));

    let res = client
        .put(srv.url(&format!("/orders/{order_id}/status")))
        .bearer_auth(&p.shop)
        .json(&json!({ "new_status": "confirmed", "notes": "packing today" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(srv.url(&format!("/orders/{order_id}")))
        .bearer_auth(&p.customer)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "confirmed");
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1]["changed_by"], "shop_owner");
    assert_eq!(history[1]["notes"], "packing today");

    let res = client
        .get(srv.url(&format!("/orders/{order_id}")))
        .bearer_auth(&p.other_customer)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(srv.url("/shop/summary"))
        .bearer_auth(&p.shop)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["total_products"], 1);
    assert_eq!(body["low_stock_products"], 1);
    assert_eq!(body["pending_orders"], 0);
}

#[tokio::test]
async fn order_listing_is_paginated_per_customer() {
    let srv = TestServer::spawn().await;
    let p = parties();
    let client = reqwest::Client::new();
    add_stock(&client, &srv, &p.shop, 10, 50.0).await;
    for _ in 0..3 {
        place(&client, &srv, &p, &p.customer, 1).await;
    }
    place(&client, &srv, &p, &p.other_customer, 1).await;

    let res = client
        .get(srv.url("/orders?page=1&limit=2"))
        .bearer_auth(&p.customer)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["total"], 3);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["has_more"], true);

    let res = client
        .get(srv.url("/orders?status=pending"))
        .bearer_auth(&p.shop)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["total"], 4);

    let res = client
        .get(srv.url("/orders/stats"))
        .bearer_auth(&p.customer)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["total_orders"], 3);
    assert_eq!(body["total_spent"], 150.0);
}

#[tokio::test]
async fn decimal_prices_are_kept_to_the_paisa() {
    let srv = TestServer::spawn().await;
    let p = parties();
    let client = reqwest::Client::new();

    let res = add_stock(&client, &srv, &p.shop, 5, 40.00).await;
    assert_eq!(res.status(), StatusCode::OK);
    let res = add_stock(&client, &srv, &p.shop, 5, 60.00).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = add_stock(&client, &srv, &p.shop, 5, 39.99).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "price_out_of_range");
    assert_eq!(body["price"], 39.99);

    let res = add_stock(&client, &srv, &p.shop, 5, 42.505).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_request");

    let res = add_stock(&client, &srv, &p.shop, 0, 42.50).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["unit_price"], 42.5);
    assert_eq!(body["quantity"], 10);

    let res = place(&client, &srv, &p, &p.customer, 3).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let order: serde_json::Value = res.json().await.unwrap();
    assert_eq!(order["unit_price"], 42.5);
    assert_eq!(order["total_amount"], 127.5);
}

#[tokio::test]
async fn deactivated_stock_cannot_be_ordered() {
    let srv = TestServer::spawn().await;
    let p = parties();
    let client = reqwest::Client::new();
    add_stock(&client, &srv, &p.shop, 10, 50.0).await;

    let res = client
        .patch(srv.url(&format!("/inventory/items/{}", srv.item_id)))
        .bearer_auth(&p.shop)
        .json(&json!({ "is_active": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["is_active"], false);
    assert_eq!(body["quantity"], 10);

    let res = place(&client, &srv, &p, &p.customer, 1).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "product_unavailable");

    let res = client
        .patch(srv.url(&format!("/inventory/items/{}", ItemId::new())))
        .bearer_auth(&p.shop)
        .json(&json!({ "quantity": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
