#![allow(clippy::unwrap_used)]
// CRUD facade tests against a wiremock backend.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use eventdekho_core::{Backend, BackendConfig, CoreError, CrudOp, Params, ResourceCrud};

async fn setup() -> (MockServer, ResourceCrud) {
    let server = MockServer::start().await;
    let backend = Backend::new(BackendConfig::new(Url::parse(&server.uri()).unwrap())).unwrap();
    let crud = backend.crud("/events");
    (server, crud)
}

#[tokio::test]
async fn test_create_posts_body() {
    let (server, crud) = setup().await;
    let event = json!({ "title": "Hack Night", "city": "Pune" });

    Mock::given(method("POST"))
        .and(path("/events"))
        .and(body_json(&event))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "_id": "42", "title": "Hack Night" })))
        .expect(1)
        .mount(&server)
        .await;

    let created = crud.create(&event).await.unwrap();
    assert_eq!(created["_id"], "42");
    assert!(!crud.state().loading());
    assert!(crud.state().error().is_none());
}

#[tokio::test]
async fn test_create_failure_sets_error_and_returns_err() {
    let (server, crud) = setup().await;

    Mock::given(method("POST"))
        .and(path("/events"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "message": "Title is required" })),
        )
        .mount(&server)
        .await;

    let err = crud.create(&json!({})).await.unwrap_err();
    assert_eq!(err.to_string(), "Title is required");
    assert_eq!(err.status(), Some(400));

    let state = crud.state();
    assert_eq!(state.error(), Some("Title is required"));
    assert_eq!(state.failed_op(), Some(CrudOp::Create));
    assert_eq!(
        state.status(CrudOp::Create).error.as_deref(),
        Some("Title is required")
    );
    assert!(!state.loading());
}

#[tokio::test]
async fn test_read_gets_by_id() {
    let (server, crud) = setup().await;

    Mock::given(method("GET"))
        .and(path("/events/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "_id": "42" })))
        .mount(&server)
        .await;

    assert_eq!(crud.read("42").await.unwrap(), json!({ "_id": "42" }));
}

#[tokio::test]
async fn test_read_missing_is_not_found() {
    let (server, crud) = setup().await;

    Mock::given(method("GET"))
        .and(path("/events/nope"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "Event not found" })))
        .mount(&server)
        .await;

    let err = crud.read("nope").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(crud.state().error(), Some("Event not found"));
}

#[tokio::test]
async fn test_update_puts_body() {
    let (server, crud) = setup().await;
    let patch = json!({ "title": "Renamed" });

    Mock::given(method("PUT"))
        .and(path("/events/42"))
        .and(body_json(&patch))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "_id": "42", "title": "Renamed" })))
        .expect(1)
        .mount(&server)
        .await;

    let updated = crud.update("42", &patch).await.unwrap();
    assert_eq!(updated["title"], "Renamed");
}

#[tokio::test]
async fn test_remove_returns_body_unchanged() {
    let (server, crud) = setup().await;
    let body = json!({ "message": "Event deleted", "id": "42" });

    Mock::given(method("DELETE"))
        .and(path("/events/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(crud.remove("42").await.unwrap(), body);
}

#[tokio::test]
async fn test_remove_no_content_is_null() {
    let (server, crud) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/events/7"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    assert_eq!(crud.remove("7").await.unwrap(), serde_json::Value::Null);
}

#[tokio::test]
async fn test_list_sends_params() {
    let (server, crud) = setup().await;

    Mock::given(method("GET"))
        .and(path("/events"))
        .and(query_param("category", "hackathon"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "_id": "1" }])))
        .expect(1)
        .mount(&server)
        .await;

    let mut params = Params::new();
    params.insert("category".into(), "hackathon".into());
    assert_eq!(crud.list(&params).await.unwrap(), json!([{ "_id": "1" }]));
}

#[tokio::test]
async fn test_concurrent_operations_keep_separate_status() {
    let (server, crud) = setup().await;

    Mock::given(method("POST"))
        .and(path("/events"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "_id": "1" }))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/events/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Event not found" })))
        .mount(&server)
        .await;

    let body = json!({ "title": "x" });
    let (created, read) = tokio::join!(crud.create(&body), crud.read("missing"));

    assert!(created.is_ok());
    assert!(read.is_err());

    // the slower successful create must not wipe the read failure
    let state = crud.state();
    assert!(state.status(CrudOp::Create).error.is_none());
    assert_eq!(
        state.status(CrudOp::Read).error.as_deref(),
        Some("Event not found")
    );
    assert_eq!(state.failed_op(), Some(CrudOp::Read));
    assert!(!state.loading());
}

#[tokio::test]
async fn test_retry_falls_back_to_outstanding_failure() {
    let (server, crud) = setup().await;

    Mock::given(method("POST"))
        .and(path("/events"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "message": "Title required" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/events/1"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/events/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    crud.create(&json!({})).await.unwrap_err();
    crud.remove("1").await.unwrap_err();
    assert_eq!(crud.state().failed_op(), Some(CrudOp::Remove));

    crud.remove("1").await.unwrap();

    let state = crud.state();
    assert!(state.status(CrudOp::Remove).error.is_none());
    assert_eq!(state.failed_op(), Some(CrudOp::Create));
    assert_eq!(state.error(), Some("Title required"));
}

#[tokio::test]
async fn test_ids_are_sent_as_one_path_segment() {
    let (server, crud) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(2)
        .mount(&server)
        .await;

    crud.read("../users").await.unwrap();
    crud.read("a?x=1").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let targets: Vec<(&str, Option<&str>)> = requests
        .iter()
        .map(|r| (r.url.path(), r.url.query()))
        .collect();
    assert_eq!(
        targets,
        vec![("/events/..%2Fusers", None), ("/events/a%3Fx=1", None)]
    );
}

#[tokio::test]
async fn test_dot_ids_are_rejected_without_a_request() {
    let (server, crud) = setup().await;

    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    for id in ["", ".", ".."] {
        let err = crud.remove(id).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidId { .. }));
    }

    let state = crud.state();
    assert_eq!(state.failed_op(), Some(CrudOp::Remove));
    assert_eq!(state.error(), Some("Invalid resource id: \"..\""));
    assert!(!state.loading());
}
