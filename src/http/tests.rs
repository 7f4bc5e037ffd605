use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use bytes::Bytes;
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::util::ServiceExt;

use crate::{http::build_router, service::HistoryService, store::StoreConfig};

const START: &str = "Mon Jan 2 15:04:05 MST 2006";
const END: &str = "Mon Jan 2 16:00:00 MST 2006";

fn configured_service(tmp: &TempDir) -> Arc<HistoryService> {
    let service = HistoryService::new();
    service
        .configure_with(StoreConfig {
            connection_string: tmp.path().join("history.db").display().to_string(),
            database_name: "history".to_string(),
        })
        .unwrap();
    Arc::new(service)
}

fn app(tmp: &TempDir) -> axum::Router {
    build_router(configured_service(tmp))
}

fn req(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn req_body(method: &str, uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

fn add_req(connection_id: &str, start_date: &str, end_date: &str) -> Request<Body> {
    let value = json!({
        "ConnectionId": connection_id,
        "StartDate": start_date,
        "EndDate": end_date,
    });
    req_body(
        "POST",
        "/api/history",
        serde_json::to_vec(&value).unwrap(),
    )
}

async fn body_bytes(res: axum::response::Response) -> Bytes {
    res.into_body().collect().await.unwrap().to_bytes()
}

async fn body_json(res: axum::response::Response) -> Value {
    let bytes = body_bytes(res).await;
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_configuration() {
    let tmp = TempDir::new().unwrap();
    let res = app(&tmp).oneshot(req("GET", "/api/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        body_json(res).await,
        json!({"status": "ok", "configured": true})
    );

    let res = build_router(Arc::new(HistoryService::new()))
        .oneshot(req("GET", "/api/health"))
        .await
        .unwrap();
    assert_eq!(body_json(res).await["configured"], json!(false));
}

#[tokio::test]
async fn empty_history_lists_no_items() {
    let tmp = TempDir::new().unwrap();
    let res = app(&tmp).oneshot(req("GET", "/api/history")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await, json!({"items": []}));
}

#[tokio::test]
async fn add_then_list_round_trips() {
    let tmp = TempDir::new().unwrap();
    let app = app(&tmp);

    let res = app
        .clone()
        .oneshot(add_req("conn-1", START, END))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await, json!({"result": "true"}));

    let later = "Mon Jan 2 18:00:00 MST 2006";
    let res = app
        .clone()
        .oneshot(add_req("conn-1", END, later))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app.oneshot(req("GET", "/api/history")).await.unwrap();
    assert_eq!(
        body_json(res).await,
        json!({
            "items": [{
                "ConnectionId": "conn-1",
                "UserId": "conn-1",
                "Stats": [
                    {"StartDate": START, "EndDate": END},
                    {"StartDate": END, "EndDate": later},
                ],
            }]
        })
    );
}

#[tokio::test]
async fn invalid_timestamp_is_bad_request_and_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let app = app(&tmp);

    let res = app
        .clone()
        .oneshot(add_req("conn-1", START, "2006-01-02"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = body_json(res).await;
    assert_eq!(body["error"]["code"], json!("invalid_timestamp"));
    assert!(
        body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("EndDate")
    );

    let res = app.oneshot(req("GET", "/api/history")).await.unwrap();
    assert_eq!(body_json(res).await, json!({"items": []}));
}

#[tokio::test]
async fn malformed_envelope_is_invalid_params() {
    let tmp = TempDir::new().unwrap();
    let res = app(&tmp)
        .oneshot(req_body("POST", "/api/history", "{\"ConnectionId\":"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(res).await["error"]["code"],
        json!("invalid_params")
    );
}

#[tokio::test]
async fn unconfigured_service_is_unavailable() {
    let app = build_router(Arc::new(HistoryService::new()));

    let res = app
        .clone()
        .oneshot(req("GET", "/api/history"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body_json(res).await["error"]["code"],
        json!("not_configured")
    );

    let res = app.oneshot(add_req("conn-1", START, END)).await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
}
