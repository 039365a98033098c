//! HTTP API served on a real socket

mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use common::engine;
use eqgen_api_http::{HttpServer, HttpServerConfig};
use eqgen_core::application::JobManager;
use eqgen_core::config::EngineConfig;
use eqgen_core::domain::Provider;
use eqgen_core::port::generation_backend::mocks::MockBackend;
use eqgen_core::port::BackendSet;
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct RunningServer {
    base_url: String,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<std::io::Result<()>>,
}

async fn serve(manager: Arc<JobManager>) -> RunningServer {
    let config = HttpServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
    };
    let server = HttpServer::bind(&config, manager).await.unwrap();
    let addr: SocketAddr = server.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.serve(async {
        let _ = stopped.await;
    }));
    RunningServer {
        base_url: format!("http://{}", addr),
        stop,
        handle,
    }
}

async fn poll_until_done(client: &reqwest::Client, base_url: &str, test_id: &str) -> Value {
    for _ in 0..2000 {
        let body: Value = client
            .get(format!("{}/status/{}", base_url, test_id))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if body["status"] != "generating" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("test {} did not finish in time", test_id);
}

#[tokio::test]
async fn test_generate_then_poll_until_completed() {
    let engine = engine(
        &EngineConfig::default(),
        BackendSet::new().with(Arc::new(
            MockBackend::new(Provider::Local).with_delay(Duration::from_millis(5)),
        )),
    );
    let server = serve(engine.manager.clone()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/generate", server.base_url))
        .json(&json!({"age": 15, "provider": "local"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 202);
    let created: Value = response.json().await.unwrap();
    assert_eq!(created["success"], true);
    assert_eq!(created["status"], "generating");
    assert_eq!(created["provider"], "local");
    let test_id = created["test_id"].as_str().unwrap().to_string();

    let done = poll_until_done(&client, &server.base_url, &test_id).await;
    assert_eq!(done["status"], "completed");
    assert_eq!(done["current_section"], "Completed");
    assert_eq!(done["age"], 15);
    let file_path = done["file_path"].as_str().unwrap();
    assert!(std::path::Path::new(file_path).exists());

    let listed: Value = client
        .get(format!("{}/tests", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed["tests"].as_array().unwrap().len(), 1);
    assert_eq!(listed["tests"][0]["test_id"], test_id.as_str());

    server.stop.send(()).unwrap();
    server.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_errors_use_common_body() {
    let engine = engine(
        &EngineConfig::default(),
        BackendSet::new().with(Arc::new(MockBackend::new(Provider::Local))),
    );
    let server = serve(engine.manager.clone()).await;
    let client = reqwest::Client::new();

    let bad_age = client
        .post(format!("{}/create-eq-test", server.base_url))
        .json(&json!({"age": 25}))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_age.status().as_u16(), 400);
    let body: Value = bad_age.json().await.unwrap();
    assert_eq!(body, json!({"success": false, "error": "Age must be between 12 and 18"}));

    let cloud = client
        .post(format!("{}/generate", server.base_url))
        .json(&json!({"provider": "cloud"}))
        .send()
        .await
        .unwrap();
    assert_eq!(cloud.status().as_u16(), 400);

    let missing = client
        .get(format!("{}/status/does-not-exist", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);
    let body: Value = missing.json().await.unwrap();
    assert_eq!(body["error"], "Test not found");

    assert!(engine.manager.list().await.unwrap().is_empty());

    let health: Value = client
        .get(format!("{}/health", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");

    server.stop.send(()).unwrap();
    server.handle.await.unwrap().unwrap();
}
