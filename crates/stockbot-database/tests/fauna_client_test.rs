//! Fauna client against a local HTTP server standing in for the store.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use serde_json::{Value as Json, json};

use stockbot_core::config::FaunaConfig;
use stockbot_core::error::ErrorKind;
use stockbot_core::traits::{IdentityFactory, Repository};
use stockbot_core::types::PaginationOptions;
use stockbot_database::client::{FaunaClient, QueryError, StoreClient};
use stockbot_database::repositories::TodoRepository;

const SECRET: &str = "fnAE-test-secret";

#[derive(Clone, Default)]
struct FakeStore {
    responses: Arc<Mutex<VecDeque<(StatusCode, String)>>>,
    requests: Arc<Mutex<Vec<(HeaderMap, Json)>>>,
}

impl FakeStore {
    fn respond(&self, status: StatusCode, body: impl Into<String>) {
        self.responses
            .lock()
            .expect("responses lock")
            .push_back((status, body.into()));
    }

    fn requests(&self) -> Vec<(HeaderMap, Json)> {
        self.requests.lock().expect("requests lock").clone()
    }
}

async fn handle(
    State(store): State<FakeStore>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let parsed = serde_json::from_str(&body).unwrap_or(Json::Null);
    store
        .requests
        .lock()
        .expect("requests lock")
        .push((headers, parsed));
    store
        .responses
        .lock()
        .expect("responses lock")
        .pop_front()
        .unwrap_or((StatusCode::INTERNAL_SERVER_ERROR, "no response queued".to_string()))
}

async fn start() -> (FakeStore, FaunaClient) {
    let store = FakeStore::default();
    let app = Router::new()
        .route("/", post(handle))
        .with_state(store.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    let config = FaunaConfig {
        endpoint: format!("http://{addr}"),
        secret: SECRET.to_string(),
        timeout_seconds: 5,
        query_timeout_ms: Some(1500),
    };
    (store, FaunaClient::new(&config).expect("client"))
}

fn todo_ref(id: &str) -> Json {
    json!({
        "@ref": {
            "id": id,
            "collection": {
                "@ref": { "id": "todos", "collection": { "@ref": { "id": "collections" } } }
            }
        }
    })
}

fn todo_json(id: &str, text: &str) -> Json {
    json!({ "id": id, "text": text, "done": false, "created_at": "2024-03-01T10:00:00Z" })
}

#[tokio::test]
async fn test_find_sends_authenticated_query_and_decodes_data() {
    let (store, client) = start().await;
    store.respond(
        StatusCode::OK,
        json!({ "resource": todo_json("101", "buy milk") }).to_string(),
    );
    let repo = TodoRepository::new(Arc::new(client));

    let todo = repo.find("101").await.expect("find").expect("present");
    assert_eq!(todo.id, "101");
    assert_eq!(todo.text, "buy milk");

    let requests = store.requests();
    assert_eq!(requests.len(), 1);
    let (headers, body) = &requests[0];
    assert_eq!(headers["authorization"], format!("Bearer {SECRET}").as_str());
    assert_eq!(headers["x-faunadb-api-version"], "4");
    assert_eq!(headers["x-query-timeout"], "1500");
    assert_eq!(
        body,
        &json!({
            "select": "data",
            "from": { "get": { "ref": { "collection": "todos" }, "id": "101" } }
        })
    );
}

#[tokio::test]
async fn test_not_found_response_becomes_none() {
    let (store, client) = start().await;
    let not_found = json!({
        "errors": [{ "position": ["from"], "code": "instance not found", "description": "Document not found." }]
    })
    .to_string();
    store.respond(StatusCode::NOT_FOUND, not_found.clone());
    store.respond(StatusCode::NOT_FOUND, not_found);
    let repo = TodoRepository::new(Arc::new(client));

    assert!(repo.find("404").await.expect("find").is_none());
    assert!(repo.remove("404").await.expect("remove").is_none());

    let (_, delete) = &store.requests()[1];
    assert_eq!(delete["from"]["delete"]["id"], json!("404"));
}

#[tokio::test]
async fn test_html_404_from_wrong_endpoint_is_a_failure() {
    let (store, client) = start().await;
    store.respond(StatusCode::NOT_FOUND, "<html>404 page not found</html>");
    store.respond(StatusCode::NOT_FOUND, "<html>404 page not found</html>");
    let repo = TodoRepository::new(Arc::new(client));

    let err = repo.find("1").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Store);
    let cause = err
        .source
        .as_ref()
        .and_then(|s| s.downcast_ref::<QueryError>())
        .expect("query error cause");
    assert_eq!(cause.status, 404);

    assert!(repo.remove("1").await.is_err());
}

#[tokio::test]
async fn test_other_failures_keep_their_cause() {
    let (store, client) = start().await;
    store.respond(
        StatusCode::UNAUTHORIZED,
        json!({ "errors": [{ "code": "unauthorized", "description": "Unauthorized" }] }).to_string(),
    );
    let repo = TodoRepository::new(Arc::new(client));

    let err = repo.remove("1").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authentication);
    let cause = err
        .source
        .as_ref()
        .and_then(|s| s.downcast_ref::<QueryError>())
        .expect("query error cause");
    assert_eq!(cause.status, 401);
    assert_eq!(cause.code, "unauthorized");
}

#[tokio::test]
async fn test_non_json_error_body_is_store_failure() {
    let (store, client) = start().await;
    store.respond(StatusCode::INTERNAL_SERVER_ERROR, "internal error");

    let err = client.query(&stockbot_database::query::Expr::new_id()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Store);
}

#[tokio::test]
async fn test_find_all_decodes_page_and_cursors() {
    let (store, client) = start().await;
    store.respond(
        StatusCode::OK,
        json!({
            "resource": {
                "before": [todo_ref("1")],
                "after": [todo_ref("4")],
                "data": [todo_json("2", "two"), todo_json("3", "three")]
            }
        })
        .to_string(),
    );
    let repo = TodoRepository::new(Arc::new(client));

    let page = repo
        .find_all(&PaginationOptions::new().with_size(2).with_after("2"))
        .await
        .expect("page");
    assert_eq!(page.data.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(), ["2", "3"]);
    assert_eq!(page.before.as_deref(), Some("1"));
    assert_eq!(page.after.as_deref(), Some("4"));

    let (_, body) = &store.requests()[0];
    assert_eq!(body["collection"]["paginate"], json!({ "match": { "index": "all_todos" } }));
    assert_eq!(body["collection"]["size"], json!(2));
    assert_eq!(body["collection"]["after"]["id"], json!("2"));
    assert_eq!(body["map"]["lambda"], json!("nextRef"));
}

#[tokio::test]
async fn test_save_sends_upsert_and_returns_stored_entity() {
    let (store, client) = start().await;
    store.respond(
        StatusCode::OK,
        json!({ "resource": todo_json("9", "stored") }).to_string(),
    );
    let repo = TodoRepository::new(Arc::new(client));

    let todo: stockbot_entity::TodoEntity =
        serde_json::from_value(todo_json("9", "stored")).expect("todo");
    let saved = repo.save(&todo).await.expect("save");
    assert_eq!(saved, todo);

    let (_, body) = &store.requests()[0];
    let upsert = &body["from"];
    assert_eq!(upsert["if"]["exists"]["id"], json!("9"));
    assert_eq!(upsert["then"]["params"]["object"]["data"]["object"]["text"], json!("stored"));
    assert_eq!(upsert["else"]["create"]["ref"], json!({ "collection": "todos" }));
}

#[tokio::test]
async fn test_next_id_and_health_check() {
    let (store, client) = start().await;
    store.respond(StatusCode::OK, json!({ "resource": "291836472917364736" }).to_string());
    store.respond(StatusCode::OK, json!({ "resource": true }).to_string());
    let client = Arc::new(client);
    let repo = TodoRepository::new(client.clone());

    assert_eq!(repo.next_id().await.expect("next id"), "291836472917364736");
    assert!(client.health_check().await.expect("health"));

    let requests = store.requests();
    assert_eq!(requests[0].1, json!({ "new_id": null }));
    assert_eq!(requests[1].1, json!(true));
}

#[tokio::test]
async fn test_unreachable_store_is_service_unavailable() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let client = FaunaClient::new(&FaunaConfig {
        endpoint: format!("http://{addr}"),
        secret: SECRET.to_string(),
        timeout_seconds: 2,
        query_timeout_ms: None,
    })
    .expect("client");

    let err = client.query(&stockbot_database::query::Expr::new_id()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ServiceUnavailable);
}
