//! Typed HAL+JSON representations.
//!
//! Every platform response is a HAL resource: `_links` maps a relation to
//! one link or an array of links, `_embedded` maps a relation to one
//! resource or an array of resources, and everything else is plain state.
//! The accessors here normalise the one-or-many shapes and turn a missing
//! required field into [`Error::Parse`] instead of a silent `null`.

use std::collections::BTreeMap;

use ctms_domain::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire shapes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A single HAL link object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templated: Option<bool>,
}

/// HAL allows a relation to carry either one value or an array of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::Many(v) => v,
            OneOrMany::One(t) => std::slice::from_ref(t),
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(v) => v,
            OneOrMany::One(t) => vec![t],
        }
    }
}

/// A HAL resource: links, embedded resources and the remaining state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HalResource {
    #[serde(rename = "_links", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub links: BTreeMap<String, OneOrMany<Link>>,
    /// `None` when the response has no `_embedded` section at all, which
    /// search endpoints use to signal "no results".
    #[serde(rename = "_embedded", default, skip_serializing_if = "Option::is_none")]
    pub embedded: Option<BTreeMap<String, OneOrMany<HalResource>>>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Accessors
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

impl HalResource {
    /// Interpret an arbitrary JSON document as a HAL resource.
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::Parse(format!(
                "expected a HAL object, got {}",
                json_kind(&value)
            )));
        }
        serde_json::from_value(value).map_err(|e| Error::Parse(format!("malformed HAL resource: {e}")))
    }

    /// All links for `rel`, in document order.
    pub fn links(&self, rel: &str) -> &[Link] {
        self.links.get(rel).map(OneOrMany::as_slice).unwrap_or(&[])
    }

    /// The first link for `rel`.
    pub fn link(&self, rel: &str) -> Option<&Link> {
        self.links(rel).first()
    }

    /// The link for `rel` whose `name` equals `name`.
    pub fn link_named(&self, rel: &str, name: &str) -> Option<&Link> {
        self.links(rel)
            .iter()
            .find(|l| l.name.as_deref() == Some(name))
    }

    pub fn has_link(&self, rel: &str) -> bool {
        !self.links(rel).is_empty()
    }

    /// Like [`HalResource::link`], failing with [`Error::Parse`].
    pub fn require_link(&self, rel: &str) -> Result<&Link> {
        self.link(rel)
            .ok_or_else(|| Error::Parse(format!("resource has no '{rel}' link")))
    }

    pub fn self_href(&self) -> Option<&str> {
        self.link("self").map(|l| l.href.as_str())
    }

    pub fn next_href(&self) -> Option<&str> {
        self.link("next").map(|l| l.href.as_str())
    }

    pub fn has_embedded(&self) -> bool {
        self.embedded.is_some()
    }

    /// Embedded resources under `rel`; a single object is presented as a
    /// one-element slice.
    pub fn embedded(&self, rel: &str) -> &[HalResource] {
        self.embedded
            .as_ref()
            .and_then(|e| e.get(rel))
            .map(OneOrMany::as_slice)
            .unwrap_or(&[])
    }

    pub fn embedded_one(&self, rel: &str) -> Option<&HalResource> {
        self.embedded(rel).first()
    }

    /// Remove and return the embedded resources under `rel`.
    pub fn take_embedded(&mut self, rel: &str) -> Vec<HalResource> {
        self.embedded
            .as_mut()
            .and_then(|e| e.remove(rel))
            .map(OneOrMany::into_vec)
            .unwrap_or_default()
    }

    /// Follow a dotted path through the resource state, e.g. `common.name`.
    pub fn property_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.properties.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// String value at a dotted path. Numbers and booleans are not coerced.
    pub fn property_str(&self, path: &str) -> Option<&str> {
        self.property_path(path).and_then(Value::as_str)
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
