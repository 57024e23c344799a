use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use gleam_docs_mcp::cache::{Cache, InMemoryCache, interface_key, unix_now};
use gleam_docs_mcp::hex_client::HexClient;
use gleam_docs_mcp::mcp::{DocsService, TokioSpawner};
use gleam_docs_mcp::server::router;
use mockito::{Matcher, Server, ServerGuard};
use serde_json::{Value, json};
use tempfile::tempdir;
use tower::ServiceExt;

const GLEAM_JSON_PACKAGE: &str = r#"{
    "name": "gleam_json",
    "html_url": "https://hex.pm/packages/gleam_json",
    "docs_html_url": "https://hexdocs.pm/gleam_json/",
    "meta": {
        "description": "Work with JSON in Gleam",
        "licenses": ["Apache-2.0"],
        "links": {"Repository": "https://github.com/gleam-lang/json"}
    },
    "downloads": {"all": 120000},
    "latest_version": "2.0.0",
    "latest_stable_version": "2.0.0",
    "releases": [
        {"version": "2.0.0", "inserted_at": "2024-06-01T00:00:00Z", "has_docs": true},
        {"version": "1.0.0", "inserted_at": "2023-01-01T00:00:00Z", "has_docs": true}
    ],
    "retirements": {"1.0.0": {"reason": "other", "message": "Use 2.x"}}
}"#;

const GLEAM_JSON_INTERFACE: &str = r#"{
    "name": "gleam_json",
    "version": "2.0.0",
    "gleam-version-constraint": ">= 1.0.0",
    "modules": {
        "gleam/json": {
            "documentation": [" Encoding and decoding JSON."],
            "types": {
                "Json": {"documentation": " A JSON value.", "parameters": 0, "opaque": true, "constructors": []},
                "DecodeError": {
                    "parameters": 0,
                    "opaque": false,
                    "constructors": [
                        {"name": "UnexpectedEndOfInput", "parameters": []},
                        {"name": "UnexpectedByte", "parameters": [{"label": null, "type": {"kind": "named", "name": "String", "module": "gleam", "package": "", "parameters": []}}]}
                    ]
                }
            },
            "functions": {
                "to_string": {
                    "documentation": " Convert a JSON value into a string.",
                    "parameters": [{"label": null, "type": {"kind": "named", "name": "Json", "module": "gleam/json", "package": "gleam_json", "parameters": []}}],
                    "return": {"kind": "named", "name": "String", "module": "gleam", "package": "", "parameters": []}
                },
                "array": {
                    "parameters": [
                        {"label": "from", "type": {"kind": "named", "name": "List", "module": "gleam", "package": "", "parameters": [{"kind": "variable", "id": 0}]}},
                        {"label": "of", "type": {"kind": "fn", "parameters": [{"kind": "variable", "id": 0}], "return": {"kind": "named", "name": "Json", "module": "gleam/json", "package": "gleam_json", "parameters": []}}}
                    ],
                    "return": {"kind": "named", "name": "Json", "module": "gleam/json", "package": "gleam_json", "parameters": []}
                }
            }
        }
    }
}"#;

fn service(server: &ServerGuard, cache: Arc<dyn Cache>) -> Arc<DocsService> {
    let client = HexClient::new_with_base_urls(&server.url(), &server.url());
    Arc::new(DocsService::new(Arc::new(client), cache, Arc::new(TokioSpawner)))
}

async fn post(service: &Arc<DocsService>, message: Value) -> Value {
    let request = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json")
        .body(Body::from(message.to_string()))
        .unwrap();
    let response = router(service.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn call_tool(service: &Arc<DocsService>, name: &str, arguments: Value) -> Value {
    post(
        service,
        json!({
            "jsonrpc": "2.0",
            "id": name,
            "method": "tools/call",
            "params": {"name": name, "arguments": arguments},
        }),
    )
    .await
}

/// Lets spawned cache writes run until `key` is cached.
async fn wait_for_cached(cache: &InMemoryCache, key: &str) {
    for _ in 0..100 {
        if cache.get(key, unix_now()).await.is_some() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("{key} was never cached");
}

#[tokio::test]
async fn test_browse_package_end_to_end() {
    let mut server = Server::new_async().await;
    let interface_mock = server
        .mock("GET", "/gleam_json/package-interface.json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(GLEAM_JSON_INTERFACE)
        .expect(1)
        .create_async()
        .await;

    let dir = tempdir().unwrap();
    let cache = Arc::new(InMemoryCache::new(dir.path().to_path_buf()));
    let service = service(&server, cache.clone());

    let modules = call_tool(&service, "get_modules", json!({"package_name": "gleam_json"})).await;
    assert_eq!(modules["id"], json!("get_modules"));
    assert_eq!(modules["result"]["data"]["modules"][0]["name"], json!("gleam/json"));
    assert_eq!(modules["result"]["data"]["modules"][0]["functionCount"], json!(2));
    wait_for_cached(&cache, &interface_key("gleam_json")).await;

    let module = call_tool(
        &service,
        "get_module_info",
        json!({"package_name": "gleam_json", "module_name": "gleam/json"}),
    )
    .await;
    let text = module["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("to_string(gleam_json/gleam/json.Json) -> String"));
    assert!(text.contains("array(from: List(a), of: fn(a) -> gleam_json/gleam/json.Json)"));
    assert!(text.contains("UnexpectedByte(String)"));

    let functions = call_tool(
        &service,
        "search_functions",
        json!({"package_name": "gleam_json", "query": "string"}),
    )
    .await;
    let hits = functions["result"]["data"]["functions"].as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["name"], json!("to_string"));

    let types = call_tool(&service, "search_types", json!({"package_name": "gleam_json", "query": "json"})).await;
    let hits = types["result"]["data"]["types"].as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["typeKind"], json!("opaque"));

    // every tool after the first was answered from the cache
    interface_mock.assert_async().await;
}

#[tokio::test]
async fn test_package_metadata_end_to_end() {
    let mut server = Server::new_async().await;
    let _package = server
        .mock("GET", "/packages/gleam_json")
        .with_status(200)
        .with_body(GLEAM_JSON_PACKAGE)
        .create_async()
        .await;
    let _search = server
        .mock("GET", "/packages")
        .match_query(Matcher::UrlEncoded("search".into(), "json".into()))
        .with_status(200)
        .with_body(format!("[{GLEAM_JSON_PACKAGE}]"))
        .create_async()
        .await;

    let dir = tempdir().unwrap();
    let service = service(&server, Arc::new(InMemoryCache::new(dir.path().to_path_buf())));

    let search = call_tool(&service, "search_packages", json!({"query": "json"})).await;
    let packages = search["result"]["data"]["packages"].as_array().unwrap();
    assert_eq!(packages[0]["name"], json!("gleam_json"));
    assert_eq!(packages[0]["downloads"], json!(120000));

    let info = call_tool(&service, "get_package_info", json!({"package_name": "gleam_json"})).await;
    let data = &info["result"]["data"];
    assert_eq!(data["latestVersion"], json!("2.0.0"));
    assert_eq!(data["repositoryUrl"], json!("https://github.com/gleam-lang/json"));
    assert_eq!(data["releaseCount"], json!(2));

    let releases = call_tool(&service, "get_package_releases", json!({"package_name": "gleam_json"})).await;
    let releases = releases["result"]["data"]["releases"].as_array().unwrap();
    assert!(releases[0].get("retirement").is_none());
    assert_eq!(releases[1]["retirement"]["message"], json!("Use 2.x"));
}

#[tokio::test]
async fn test_missing_package_is_internal_error() {
    let mut server = Server::new_async().await;
    let _missing = server
        .mock("GET", "/nope/package-interface.json")
        .with_status(404)
        .create_async()
        .await;

    let dir = tempdir().unwrap();
    let service = service(&server, Arc::new(InMemoryCache::new(dir.path().to_path_buf())));

    let response = call_tool(&service, "get_modules", json!({"package_name": "nope"})).await;
    assert_eq!(response["error"]["code"], json!(-32603));
    assert_eq!(response["error"]["data"]["kind"], json!("not_found"));
    assert!(response.get("result").is_none());
}

#[tokio::test]
async fn test_cache_survives_restart() {
    let dir = tempdir().unwrap();

    {
        let mut server = Server::new_async().await;
        let _interface = server
            .mock("GET", "/gleam_json/package-interface.json")
            .with_status(200)
            .with_body(GLEAM_JSON_INTERFACE)
            .create_async()
            .await;

        let cache = Arc::new(InMemoryCache::new(dir.path().to_path_buf()));
        let service = service(&server, cache.clone());
        let response = call_tool(&service, "get_modules", json!({"package_name": "gleam_json"})).await;
        assert!(response.get("result").is_some());

        wait_for_cached(&cache, &interface_key("gleam_json")).await;
        cache.save().await.unwrap();
    }

    // a server without mocks answers every request with 501
    let server = Server::new_async().await;
    let cache = Arc::new(InMemoryCache::new(dir.path().to_path_buf()));
    cache.load().await.unwrap();
    let service = service(&server, cache);

    let response = call_tool(
        &service,
        "get_module_info",
        json!({"package_name": "gleam_json", "module_name": "gleam/json"}),
    )
    .await;
    assert_eq!(response["result"]["data"]["name"], json!("gleam/json"));
}
