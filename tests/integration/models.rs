//! Models endpoint integration tests

use std::sync::Arc;

use serde_json::Value;

use crate::common::{FakeSource, TestApp};

#[tokio::test]
async fn test_models_list_alias_table() {
    let source = Arc::new(FakeSource::default());
    let app = TestApp::with_source(source.clone()).await;

    let response = app.server.get("/v1/models").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["object"], "list");

    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), puter_proxy::aliases::all().len());
    assert!(data.iter().all(|m| m["object"] == "model" && m["created"].is_i64()));

    let codestral = data.iter().find(|m| m["id"] == "codestral").unwrap();
    assert_eq!(codestral["owned_by"], "mistral");

    // Listing models never needs a session
    assert_eq!(source.acquired(), 0);
}
