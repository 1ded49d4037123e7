//! Folder traversal against a mocked locations service.

mod common;

use common::client;
use ctms_client::{root_item_href, TraversalOptions, TreeTraverser};
use ctms_domain::config::ErrorPolicy;
use ctms_domain::error::Error;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn folder(id: &str) -> Value {
    json!({
        "common": { "name": id },
        "_links": {
            "self": { "href": format!("/loc/{id}") },
            "loc:collection": { "href": format!("/loc/{id}/items") }
        }
    })
}

fn leaf(id: &str) -> Value {
    json!({
        "common": { "name": id },
        "_links": { "self": { "href": format!("/loc/{id}") } }
    })
}

async fn serve(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_tree(server: &MockServer) {
    serve(
        server,
        "/loc/locations",
        json!({ "_links": { "loc:root-item": { "href": "/loc/root" } } }),
    )
    .await;
    serve(server, "/loc/root", folder("root")).await;
    serve(
        server,
        "/loc/root/items",
        json!({
            "_embedded": { "loc:item": [folder("A"), leaf("leaf1")] },
            "_links": { "next": { "href": "/loc/root/items/2" } }
        }),
    )
    .await;
    serve(
        server,
        "/loc/root/items/2",
        json!({ "_embedded": { "loc:item": [folder("B"), leaf("leaf2")] } }),
    )
    .await;
    serve(server, "/loc/A", folder("A")).await;
    serve(
        server,
        "/loc/A/items",
        json!({ "_embedded": { "loc:item": [leaf("a.clip")] } }),
    )
    .await;
    serve(server, "/loc/B", folder("B")).await;
}

fn names(items: &[ctms_client::HierarchicalItem]) -> Vec<(String, usize)> {
    items
        .iter()
        .map(|i| {
            (
                i.item.property_str("common.name").unwrap_or("?").to_owned(),
                i.depth,
            )
        })
        .collect()
}

#[tokio::test]
async fn root_item_then_folders_before_leaves() {
    let server = MockServer::start().await;
    mount_tree(&server).await;
    serve(
        &server,
        "/loc/B/items",
        json!({ "_embedded": { "loc:item": [leaf("b.clip")] } }),
    )
    .await;
    let client = client(&server);

    let root = root_item_href(&client, &format!("{}/loc/locations", server.uri()))
        .await
        .unwrap();
    assert_eq!(root, "/loc/root");

    let out = TreeTraverser::new(&client, TraversalOptions::default())
        .traverse(&root)
        .await
        .unwrap();
    let expected: Vec<(String, usize)> = [
        ("root", 0),
        ("A", 1),
        ("a.clip", 2),
        ("B", 1),
        ("b.clip", 2),
        ("leaf1", 1),
        ("leaf2", 1),
    ]
    .iter()
    .map(|(n, d)| (n.to_string(), *d))
    .collect();
    assert_eq!(names(&out.items), expected);
}

#[tokio::test]
async fn locations_without_root_item_is_not_found() {
    let server = MockServer::start().await;
    serve(&server, "/loc/locations", json!({ "_links": {} })).await;
    let client = client(&server);

    let err = root_item_href(&client, &format!("{}/loc/locations", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn unreadable_branch_fails_fast_by_default() {
    let server = MockServer::start().await;
    mount_tree(&server).await;
    Mock::given(method("GET"))
        .and(path("/loc/B/items"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let client = client(&server);

    let err = TreeTraverser::new(&client, TraversalOptions::default())
        .traverse("/loc/root")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn unreadable_branch_is_skipped_when_configured() {
    let server = MockServer::start().await;
    mount_tree(&server).await;
    Mock::given(method("GET"))
        .and(path("/loc/B/items"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    let client = client(&server);

    let options = TraversalOptions {
        on_error: ErrorPolicy::SkipBranch,
        ..Default::default()
    };
    let out = TreeTraverser::new(&client, options)
        .traverse("/loc/root")
        .await
        .unwrap();

    assert_eq!(out.skipped.len(), 1);
    assert_eq!(out.skipped[0].uri, "/loc/B");
    assert_eq!(out.skipped[0].error.status(), Some(403));
    // B itself is still listed; only its contents are missing.
    let names = names(&out.items);
    assert!(names.contains(&("B".to_string(), 1)));
    assert!(names.contains(&("leaf2".to_string(), 1)));
    assert!(!names.iter().any(|(n, _)| n == "b.clip"));
}

#[tokio::test]
async fn missing_root_always_fails() {
    let server = MockServer::start().await;
    let client = client(&server);
    let options = TraversalOptions {
        on_error: ErrorPolicy::SkipBranch,
        ..Default::default()
    };

    let err = TreeTraverser::new(&client, options)
        .traverse("/loc/nowhere")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
}
