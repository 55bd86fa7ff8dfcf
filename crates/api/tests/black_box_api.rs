use std::sync::Arc;
use std::time::Duration;

use kiln_api::app::{self, AppServices};
use kiln_broker::{Broker, BrokerConfig};
use kiln_orders::install_consumers;
use reqwest::StatusCode;
use serde_json::{Value, json};

struct TestServer {
    base_url: String,
    services: Arc<AppServices>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, short delivery delay, ephemeral port.
        let broker = Broker::new(BrokerConfig::default().with_delivery_delay(Duration::from_millis(5)))
            .expect("broker needs a runtime");
        install_consumers(&broker);
        let services = Arc::new(AppServices::new(broker));

        let app = app::build_app(services.clone());
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
            services,
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

async fn get_json(client: &reqwest::Client, url: String) -> (StatusCode, Value) {
    let res = client.get(url).send().await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

async fn create_order(client: &reqwest::Client, srv: &TestServer) -> Value {
    let res = client
        .post(srv.url("/api/orders"))
        .json(&json!({"userId": 1, "totalAmount": 6198.0}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "0000");
    body["data"].clone()
}

#[tokio::test]
async fn health_reports_broker_topics() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (status, body) = get_json(&client, srv.url("/actuator/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "UP");
    assert_eq!(body["components"]["broker"]["totalMessages"], 0);
    assert_eq!(
        body["components"]["broker"]["topics"],
        json!(["inventory-events", "notification-events", "order-events"])
    );
}

#[tokio::test]
async fn creating_an_order_cascades_derived_events() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let order = create_order(&client, &srv).await;
    assert_eq!(order["status"], "PENDING");
    assert_eq!(order["userId"], 1);

    srv.services.broker.drain().await;

    let (status, body) = get_json(&client, srv.url("/api/kafka/status")).await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["totalMessages"], 3);
    assert_eq!(data["topics"]["inventory-events"]["messageCount"], 1);
    assert_eq!(
        data["topics"]["notification-events"]["messages"][0]["value"]["eventType"],
        "ORDER_CONFIRMATION_EMAIL"
    );
    assert_eq!(data["consumers"].as_array().unwrap().len(), 3);
    assert_eq!(data["stats"]["succeeded"], 3);

    let (_, body) = get_json(&client, srv.url("/api/kafka/messages")).await;
    let first = &body["data"][0];
    assert_eq!(first["topic"], "order-events");
    assert_eq!(first["offset"], 0);
    assert_eq!(first["value"]["eventType"], "ORDER_CREATED");
}

#[tokio::test]
async fn status_update_and_delete_publish_events() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let order = create_order(&client, &srv).await;
    let id = order["id"].as_u64().unwrap();

    let res = client
        .put(srv.url(&format!("/api/orders/{id}/status?status=DELIVERED")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["status"], "DELIVERED");

    let res = client
        .delete(srv.url(&format!("/api/orders/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    srv.services.broker.drain().await;

    let (_, body) = get_json(&client, srv.url("/api/kafka/topics/order-events")).await;
    let types: Vec<&str> = body["data"]["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["value"]["eventType"].as_str().unwrap())
        .collect();
    assert_eq!(types, ["ORDER_CREATED", "ORDER_STATUS_CHANGED", "ORDER_DELETED"]);

    let (_, body) = get_json(&client, srv.url("/api/orders")).await;
    assert_eq!(body["data"]["totalElements"], 0);
}

#[tokio::test]
async fn missing_order_and_bad_input_use_error_codes() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .put(srv.url("/api/orders/999/status?status=SHIPPED"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "4001");
    assert_eq!(body["data"], Value::Null);

    let res = client.delete(srv.url("/api/orders/999")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let order = create_order(&client, &srv).await;
    let res = client
        .put(srv.url(&format!("/api/orders/{}/status?status=TELEPORTED", order["id"])))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "1001");

    let res = client
        .post(srv.url("/api/orders"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "1001");

    let (status, body) = get_json(&client, srv.url("/api/nothing-here")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "404");
}

#[tokio::test]
async fn batch_update_advances_each_open_order() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    create_order(&client, &srv).await;
    create_order(&client, &srv).await;

    let res = client
        .post(srv.url("/api/orders/batch-update"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let statuses: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, ["PROCESSING", "PROCESSING"]);

    srv.services.broker.drain().await;
    assert_eq!(srv.services.broker.topic_info("order-events").message_count, 4);
}

#[tokio::test]
async fn dead_letters_start_empty() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (status, body) = get_json(&client, srv.url("/api/kafka/dead-letters")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}
