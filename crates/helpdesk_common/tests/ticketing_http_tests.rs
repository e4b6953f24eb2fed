//! HttpTicketingClient against an in-process ticketing API.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use helpdesk_common::config::TicketingConfig;
use helpdesk_common::{HttpTicketingClient, TicketDraft, TicketingClient, TicketingError};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Seen = Arc<Mutex<Vec<(Option<String>, Value)>>>;

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/api/chamado", addr)
}

fn client_for(endpoint: String, timeout_secs: u64) -> HttpTicketingClient {
    let config = TicketingConfig {
        endpoint,
        api_key_header: "x-fluig-key".to_string(),
        api_key: "s3cret".to_string(),
        timeout_secs,
    };
    HttpTicketingClient::new(&config).unwrap()
}

fn draft() -> TicketDraft {
    TicketDraft::new("ana.souza@empresa.com.br", "Chamado Maria", "Furo\nna parede")
}

async fn record_ticket(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let key = headers
        .get("x-fluig-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    seen.lock().unwrap().push((key, body));
    (StatusCode::CREATED, Json(json!({ "id": 4711 })))
}

#[tokio::test]
async fn test_sends_secret_header_and_json_body() {
    let seen: Seen = Arc::default();
    let router = Router::new()
        .route("/api/chamado", post(record_ticket))
        .with_state(seen.clone());
    let client = client_for(serve(router).await, 5);

    let receipt = client.create_ticket(&draft()).await.unwrap();
    assert_eq!(receipt.data, json!({ "id": 4711 }));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0.as_deref(), Some("s3cret"));
    assert_eq!(
        seen[0].1,
        json!({
            "Usuario": "ana.souza@empresa.com.br",
            "Titulo": "Chamado Maria",
            "Descricao": "Furo\nna parede"
        })
    );
}

#[tokio::test]
async fn test_empty_success_body_is_empty_object() {
    let router = Router::new().route("/api/chamado", post(|| async { StatusCode::CREATED }));
    let client = client_for(serve(router).await, 5);

    let receipt = client.create_ticket(&draft()).await.unwrap();
    assert_eq!(receipt.data, json!({}));
}

#[tokio::test]
async fn test_non_json_success_body_is_kept_as_text() {
    let router = Router::new().route("/api/chamado", post(|| async { "chamado 12 aberto" }));
    let client = client_for(serve(router).await, 5);

    let receipt = client.create_ticket(&draft()).await.unwrap();
    assert_eq!(receipt.data, json!("chamado 12 aberto"));
}

#[tokio::test]
async fn test_error_status_is_failure() {
    let router = Router::new().route(
        "/api/chamado",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let client = client_for(serve(router).await, 5);

    let err = client.create_ticket(&draft()).await.unwrap_err();
    assert_eq!(
        err,
        TicketingError::Status {
            status: 500,
            body: "boom".to_string()
        }
    );
}

#[tokio::test]
async fn test_error_body_is_truncated() {
    let router = Router::new().route(
        "/api/chamado",
        post(|| async { (StatusCode::BAD_GATEWAY, "x".repeat(2000)) }),
    );
    let client = client_for(serve(router).await, 5);

    match client.create_ticket(&draft()).await {
        Err(TicketingError::Status { status, body }) => {
            assert_eq!(status, 502);
            assert_eq!(body.len(), 512);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_api_times_out() {
    let router = Router::new().route(
        "/api/chamado",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            StatusCode::CREATED
        }),
    );
    let client = client_for(serve(router).await, 1);

    let err = client.create_ticket(&draft()).await.unwrap_err();
    assert_eq!(err, TicketingError::Timeout(1));
}
