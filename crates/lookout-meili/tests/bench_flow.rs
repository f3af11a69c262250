//! Indexing benchmark against an axum stub of the index admin API.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use lookout_core::config::GatewayConfig;
use lookout_meili::admin::TaskWait;
use lookout_meili::bench::{self, BenchPlan};
use lookout_meili::MeiliAdmin;
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// One index. Tasks report `processing` for `polls_before_done` lookups.
#[derive(Default)]
struct Index {
    exists: bool,
    primary_key: Option<String>,
    documents: usize,
    next_task: u64,
    polls: HashMap<u64, u32>,
    polls_before_done: u32,
    calls: Vec<String>,
}

type Shared = Arc<Mutex<Index>>;

impl Index {
    fn enqueue(&mut self) -> Json<Value> {
        self.next_task += 1;
        Json(json!({"taskUid": self.next_task, "status": "enqueued"}))
    }
}

async fn delete_index(State(index): State<Shared>, Path(uid): Path<String>) -> (StatusCode, Json<Value>) {
    let mut index = index.lock().unwrap();
    index.calls.push(format!("DELETE {uid}"));
    if !index.exists {
        return (StatusCode::NOT_FOUND, Json(json!({"message": "Index not found.", "code": "index_not_found"})));
    }
    index.exists = false;
    index.documents = 0;
    (StatusCode::ACCEPTED, index.enqueue())
}

async fn create_index(State(index): State<Shared>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let mut index = index.lock().unwrap();
    index.calls.push(format!("CREATE {}", body["uid"].as_str().unwrap_or_default()));
    index.exists = true;
    index.primary_key = body["primaryKey"].as_str().map(str::to_string);
    (StatusCode::ACCEPTED, index.enqueue())
}

async fn add_documents(
    State(index): State<Shared>,
    Path(_uid): Path<String>,
    Json(documents): Json<Vec<Value>>,
) -> (StatusCode, Json<Value>) {
    let mut index = index.lock().unwrap();
    index.calls.push(format!("ADD {}", documents.len()));
    index.documents = documents.len();
    (StatusCode::ACCEPTED, index.enqueue())
}

async fn task(State(index): State<Shared>, Path(uid): Path<u64>) -> Json<Value> {
    let mut index = index.lock().unwrap();
    let limit = index.polls_before_done;
    let polls = index.polls.entry(uid).or_default();
    *polls += 1;
    let status = if *polls > limit { "succeeded" } else { "processing" };
    Json(json!({"uid": uid, "status": status, "error": null}))
}

async fn stats(State(index): State<Shared>, Path(_uid): Path<String>) -> Json<Value> {
    let index = index.lock().unwrap();
    Json(json!({
        "numberOfDocuments": index.documents,
        "rawDocumentDbSize": index.documents * 1024 * 1024,
        "isIndexing": false
    }))
}

async fn serve(index: Shared) -> String {
    let app = Router::new()
        .route("/indexes", post(create_index))
        .route("/indexes/{uid}", delete(delete_index))
        .route("/indexes/{uid}/documents", post(add_documents))
        .route("/indexes/{uid}/stats", get(stats))
        .route("/tasks/{task}", get(task))
        .with_state(index);
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind to ephemeral port");
    let addr = listener.local_addr().expect("get local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });
    format!("http://{addr}")
}

fn admin(endpoint: String) -> MeiliAdmin {
    MeiliAdmin::new(&GatewayConfig { endpoint, ..GatewayConfig::default() }).unwrap()
}

fn documents(n: u64) -> Vec<Value> {
    (1..=n).map(|id| json!({"geonameid": id, "name": format!("city {id}")})).collect()
}

fn quick_plan(percents: Vec<u32>) -> BenchPlan {
    BenchPlan {
        wait: TaskWait { timeout: Duration::from_secs(5), interval: Duration::from_millis(5) },
        grace: Duration::from_millis(1),
        ..BenchPlan::new("cities", "geonameid", percents)
    }
}

#[tokio::test]
async fn each_fraction_is_indexed_into_a_fresh_index() {
    let index: Shared = Arc::new(Mutex::new(Index { polls_before_done: 2, ..Index::default() }));
    let endpoint = serve(Arc::clone(&index)).await;

    let stats = bench::run(&admin(endpoint), &quick_plan(vec![50, 100]), &documents(10)).await.unwrap();

    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].fraction, 0.5);
    assert_eq!(stats[0].doc_count, 5);
    assert_eq!(stats[0].index_size_mb, 5.0);
    assert_eq!(stats[1].doc_count, 10);
    assert!(stats.iter().all(|s| s.indexing_time_s > 0.0));

    let index = index.lock().unwrap();
    assert_eq!(
        index.calls,
        vec!["DELETE cities", "CREATE cities", "ADD 5", "DELETE cities", "CREATE cities", "ADD 10"]
    );
    assert_eq!(index.primary_key.as_deref(), Some("geonameid"));
}

#[tokio::test]
async fn timed_out_indexing_still_reports_stats() {
    let index: Shared = Arc::new(Mutex::new(Index { polls_before_done: u32::MAX, ..Index::default() }));
    let endpoint = serve(Arc::clone(&index)).await;
    let plan = BenchPlan {
        wait: TaskWait { timeout: Duration::from_millis(30), interval: Duration::from_millis(10) },
        grace: Duration::from_millis(50),
        ..BenchPlan::new("cities", "geonameid", vec![100])
    };

    let stats = bench::run(&admin(endpoint), &plan, &documents(4)).await.unwrap();

    assert_eq!(stats[0].doc_count, 4);
    assert!(stats[0].indexing_time_s >= 0.05, "grace pause is part of the measured time");
}

#[tokio::test]
async fn rejected_upload_aborts_the_run() {
    let app = Router::new().route(
        "/indexes/{uid}",
        delete(|| async { (StatusCode::UNAUTHORIZED, Json(json!({"message": "The provided API key is invalid.", "code": "invalid_api_key"}))) }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind to ephemeral port");
    let addr = listener.local_addr().expect("get local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    let err = bench::run(&admin(format!("http://{addr}")), &quick_plan(vec![100]), &documents(2)).await.unwrap_err();
    assert!(err.to_string().contains("invalid"), "{err}");
}
