//! Asset searches and process queries over HTTP.

mod common;

use common::client;
use ctms_client::{advanced_search, query_processes, simple_search, ItemSummary};
use ctms_domain::error::Error;
use futures_util::StreamExt;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEARCHES: &str = "/apis/avid.mam.assets.access;version=0;realm=BEEF/searches";
const PROCESS_QUERIES: &str = "/apis/avid.orchestration.ctc;version=0;realm=BEEF/process-queries/";

fn asset(id: &str, name: &str) -> Value {
    json!({ "base": { "id": id }, "common": { "name": name } })
}

async fn mount_searches(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(SEARCHES))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_links": {
                "search:simple-search": {
                    "href": format!("{SEARCHES}/simple?search={{search}}{{&offset,limit,sort}}"),
                    "templated": true
                },
                "search:advanced-search": {
                    "href": format!("{SEARCHES}/advanced{{?offset,limit,sort}}"),
                    "templated": true
                }
            }
        })))
        .mount(server)
        .await;
}

fn summaries(batches: &[ctms_domain::error::Result<ctms_client::ItemBatch>]) -> Vec<ItemSummary> {
    batches
        .iter()
        .flat_map(|b| b.as_ref().unwrap().items.iter())
        .map(ItemSummary::from_resource)
        .collect()
}

#[tokio::test]
async fn simple_search_sends_expression_and_follows_pages() {
    let server = MockServer::start().await;
    mount_searches(&server).await;
    Mock::given(method("GET"))
        .and(path(format!("{SEARCHES}/simple")))
        .and(query_param("search", "news clip"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_embedded": { "aa:asset": [asset("1", "Interview")] },
            "_links": { "next": { "href": format!("{SEARCHES}/simple/page/2") } }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{SEARCHES}/simple/page/2")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_embedded": { "aa:asset": asset("2", "B-roll") }
        })))
        .mount(&server)
        .await;
    let client = client(&server);

    let batches: Vec<_> = simple_search(&client, &format!("{}{SEARCHES}", server.uri()), "news clip")
        .await
        .unwrap()
        .collect()
        .await;
    let names: Vec<_> = summaries(&batches)
        .into_iter()
        .filter_map(|s| s.name)
        .collect();
    assert_eq!(names, ["Interview", "B-roll"]);
}

#[tokio::test]
async fn search_without_results_yields_one_empty_batch() {
    let server = MockServer::start().await;
    mount_searches(&server).await;
    Mock::given(method("GET"))
        .and(path(format!("{SEARCHES}/simple")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "_links": {} })))
        .mount(&server)
        .await;
    let client = client(&server);

    let batches: Vec<_> = simple_search(&client, SEARCHES, "nothing")
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(batches.len(), 1);
    assert!(!batches[0].as_ref().unwrap().found);
}

#[tokio::test]
async fn advanced_search_posts_the_description() {
    let server = MockServer::start().await;
    mount_searches(&server).await;
    let description = json!({
        "search": {
            "constraint": { "type": "TEXT", "text": "interview" }
        }
    });
    Mock::given(method("POST"))
        .and(path(format!("{SEARCHES}/advanced")))
        .and(body_json(description.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_embedded": { "aa:asset": [asset("7", "Interview take 2")] }
        })))
        .expect(1)
        .mount(&server)
        .await;
    let client = client(&server);

    let batches: Vec<_> = advanced_search(&client, SEARCHES, &description)
        .await
        .unwrap()
        .collect()
        .await;
    let found = summaries(&batches);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id.as_deref(), Some("7"));
    server.verify().await;
}

#[tokio::test]
async fn searches_resource_failure_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCHES))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let client = client(&server);

    let err = simple_search(&client, SEARCHES, "x").await.err().unwrap();
    assert!(matches!(err, Error::Status { status: 401, .. }));
}

#[tokio::test]
async fn process_query_posts_quick_search() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PROCESS_QUERIES))
        .and(body_json(json!({
            "query": "<query version='1.0'><search><quick>Export</quick></search></query>"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_embedded": {
                "orchestration:process": [
                    asset("P-1", "Export to archive"),
                    asset("P-2", "Export proxy")
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    let client = client(&server);

    let template = format!("{PROCESS_QUERIES}{{id}}{{?offset,limit,sort}}");
    let batches: Vec<_> = query_processes(&client, &template, "Export")
        .await
        .unwrap()
        .collect()
        .await;
    let ids: Vec<_> = summaries(&batches).into_iter().filter_map(|s| s.id).collect();
    assert_eq!(ids, ["P-1", "P-2"]);
    server.verify().await;
}
