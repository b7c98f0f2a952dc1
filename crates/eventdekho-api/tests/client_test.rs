#![allow(clippy::unwrap_used)]
// Integration tests for `ApiClient` using wiremock.

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use eventdekho_api::{ApiClient, Error, Method, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let client = ApiClient::with_client(reqwest::Client::new(), &server.uri()).unwrap();
    (server, client)
}

fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect()
}

// ── Verb tests ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_with_query_params() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/events"))
        .and(query_param("category", "hackathon"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "_id": "e1", "title": "HackIndia" }],
            "pagination": { "totalPages": 4, "totalItems": 31 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let body = client
        .get("/events", &params(&[("category", "hackathon"), ("page", "2")]))
        .await
        .unwrap();

    assert_eq!(body["data"][0]["title"], "HackIndia");
    assert_eq!(body["pagination"]["totalPages"], 4);
}

#[tokio::test]
async fn test_post_sends_json_body() {
    let (server, client) = setup().await;
    let event = json!({ "title": "Code Sprint", "mode": "online" });

    Mock::given(method("POST"))
        .and(path("/events"))
        .and(body_json(&event))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "_id": "new1" })))
        .expect(1)
        .mount(&server)
        .await;

    let created = client.post("/events", &event).await.unwrap();
    assert_eq!(created["_id"], "new1");
}

#[tokio::test]
async fn test_delete_with_empty_body_yields_null() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/events/42"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let body = client.delete("/events/42").await.unwrap();
    assert!(body.is_null());
}

#[tokio::test]
async fn test_request_with_explicit_method() {
    let (server, client) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/events/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let body = client
        .request(Method::PATCH, "events/7", Some(&json!({ "seats": 10 })), &[])
        .await
        .unwrap();
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn test_patch_sends_partial_body() {
    let (server, client) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/events/7"))
        .and(body_json(json!({ "seats": 10 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "_id": "7", "seats": 10 })))
        .expect(1)
        .mount(&server)
        .await;

    let body = client.patch("/events/7", &json!({ "seats": 10 })).await.unwrap();
    assert_eq!(body["seats"], 10);
}

// ── Error tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_http_error_extracts_message() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/events/missing"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "Event not found" })),
        )
        .mount(&server)
        .await;

    let result = client.get("/events/missing", &[]).await;

    match result {
        Err(Error::Http {
            status, message, ..
        }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "Event not found");
        }
        other => panic!("expected Http error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_http_error_without_message_uses_status_text() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client.get("/events", &[]).await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.user_message(), "Internal Server Error");
}

#[tokio::test]
async fn test_network_error_when_server_unreachable() {
    // Port 1 is reserved and refuses connections on loopback.
    let client = ApiClient::with_client(reqwest::Client::new(), "http://127.0.0.1:1").unwrap();
    let result = client.get("/events", &[]).await;

    assert!(
        matches!(result, Err(Error::Network { .. })),
        "expected Network error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_invalid_json_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let result = client.get("/events", &[]).await;
    assert!(matches!(result, Err(Error::Deserialization { .. })));
}

// ── Credentials ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_session_cookie_is_sent() {
    let server = MockServer::start().await;
    let base = url::Url::parse(&server.uri()).unwrap();
    let transport = TransportConfig::default()
        .with_session_cookie("connect.sid=s%3Aabc".to_string().into());
    let client = ApiClient::new(&base, &transport).unwrap();

    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .and(header("cookie", "connect.sid=s%3Aabc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "Asha" })))
        .expect(1)
        .mount(&server)
        .await;

    let me = client.get("/auth/me", &[]).await.unwrap();
    assert_eq!(me["name"], "Asha");
}

// ── Streaming ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_open_stream_decodes_events() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/events/stream"))
        .and(header("accept", "text/event-stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string("data: {\"n\":1}\n\n: ping\n\ndata: {\"n\":2}\n\n"),
        )
        .mount(&server)
        .await;

    let mut stream = client.open_stream("/events/stream").await.unwrap();
    let first = stream.next_event().await.unwrap().unwrap();
    let second = stream.next_event().await.unwrap().unwrap();
    assert_eq!(first.data, "{\"n\":1}");
    assert_eq!(second.data, "{\"n\":2}");
    assert!(stream.next_event().await.is_none());
}

#[tokio::test]
async fn test_open_stream_rejects_error_status() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/events/stream"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = client.open_stream("/events/stream").await;
    assert!(matches!(result, Err(Error::Http { status: 503, .. })));
}

#[tokio::test]
async fn test_open_stream_rejects_unterminated_giant_line() {
    let (server, client) = setup().await;

    let body = format!("data: {}", "x".repeat(2 * 1024 * 1024));
    Mock::given(method("GET"))
        .and(path("/events/stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .mount(&server)
        .await;

    let mut stream = client.open_stream("/events/stream").await.unwrap();
    let err = stream.next_event().await.unwrap().unwrap_err();
    assert!(matches!(err, Error::Stream(_)));
    assert!(stream.next_event().await.is_none());
}
