//! In-memory transport for unit tests.

use std::collections::HashMap;

use async_trait::async_trait;
use ctms_domain::error::{Error, Result};
use parking_lot::Mutex;
use serde_json::Value;

use crate::transport::HalTransport;

/// Serves canned documents by exact URI and records every request.
/// Unknown URIs answer 404.
#[derive(Default)]
pub(crate) struct MapTransport {
    docs: HashMap<String, Value>,
    hits: Mutex<Vec<String>>,
}

impl MapTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(mut self, uri: impl Into<String>, doc: Value) -> Self {
        self.docs.insert(uri.into(), doc);
        self
    }

    pub(crate) fn hits(&self) -> Vec<String> {
        self.hits.lock().clone()
    }

    fn lookup(&self, method: &str, url: &str) -> Result<Value> {
        self.hits.lock().push(url.to_owned());
        self.docs.get(url).cloned().ok_or_else(|| Error::Status {
            method: method.into(),
            url: url.into(),
            status: 404,
            body: String::new(),
        })
    }
}

#[async_trait]
impl HalTransport for MapTransport {
    fn base_url(&self) -> &str {
        "mem://ctms"
    }

    async fn get_json(&self, url: &str, _accept: &str) -> Result<Value> {
        self.lookup("GET", url)
    }

    async fn post_json(&self, url: &str, _body: &Value) -> Result<Value> {
        self.lookup("POST", url)
    }
}
