//! Service registry lookups.
//!
//! The registry maps resource names (`search:searches`, `loc:locations`,
//! ...) to the URI templates of the services that provide them, one entry
//! per deployment. Each deployment lists the realms (`systemID`s) it
//! serves.
//!
//! Resolution rules:
//! - resource not registered: the caller's default template, verbatim.
//! - a deployment serves the requested realm: that deployment's href.
//! - otherwise: the first realm in registry order, with a warning. The
//!   registry's JSON array order is the only tie-break, so the choice is
//!   as stable as the registry's own ordering.
//!
//! The registry is fetched on every call; nothing is cached.

use std::collections::BTreeMap;

use ctms_domain::error::{Error, Result};
use ctms_domain::trace::TraceEvent;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::hal::OneOrMany;
use crate::transport::{HalTransport, HAL_JSON};

pub const REGISTRY_SERVICE_TYPE: &str = "avid.ctms.registry";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemRef {
    #[serde(rename = "systemID", default, skip_serializing_if = "Option::is_none")]
    pub system_id: Option<String>,
    #[serde(rename = "systemType", default, skip_serializing_if = "Option::is_none")]
    pub system_type: Option<String>,
}

/// One deployment of a registered resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    /// URI template of the resource on this deployment.
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub systems: Vec<SystemRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,
}

impl Deployment {
    pub fn serves(&self, realm: &str) -> bool {
        self.realms().any(|id| id == realm)
    }

    /// Realms this deployment serves, in registry order. Systems without a
    /// `systemID` are skipped.
    pub fn realms(&self) -> impl Iterator<Item = &str> {
        self.systems.iter().filter_map(|s| s.system_id.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEntry {
    pub name: String,
    /// Deployments in registry order.
    pub deployments: Vec<Deployment>,
}

/// The parsed `serviceroots` document.
///
/// Entries are parsed one by one. An entry that does not have the expected
/// shape is kept aside in `malformed` with its parse error, so it only
/// affects lookups of that resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceRoots {
    pub resources: BTreeMap<String, RegistryEntry>,
    pub malformed: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct ServiceRootsWire {
    #[serde(default)]
    resources: Option<BTreeMap<String, Value>>,
}

impl ServiceRoots {
    /// Parse a `serviceroots` document. A missing `resources` section means
    /// nothing is registered.
    pub fn from_value(value: Value) -> Result<Self> {
        let wire: ServiceRootsWire = serde_json::from_value(value)
            .map_err(|e| Error::Parse(format!("malformed service registry: {e}")))?;

        let mut roots = Self::default();
        for (name, raw) in wire.resources.unwrap_or_default() {
            match serde_json::from_value::<OneOrMany<Deployment>>(raw) {
                Ok(deployments) => {
                    let entry = RegistryEntry {
                        name: name.clone(),
                        deployments: deployments.into_vec(),
                    };
                    roots.resources.insert(name, entry);
                }
                Err(e) => {
                    tracing::warn!(resource = %name, error = %e, "skipping malformed registry entry");
                    roots.malformed.insert(name, e.to_string());
                }
            }
        }
        Ok(roots)
    }

    /// The well-formed entry for `resource`, if registered.
    ///
    /// A registered but malformed entry is a [`Error::Parse`] naming the
    /// resource.
    pub fn entry(&self, resource: &str) -> Result<Option<&RegistryEntry>> {
        if let Some(reason) = self.malformed.get(resource) {
            return Err(Error::Parse(format!(
                "registry entry '{resource}' is malformed: {reason}"
            )));
        }
        Ok(self.resources.get(resource))
    }

    pub fn get(&self, resource: &str) -> Option<&RegistryEntry> {
        self.resources.get(resource)
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.malformed.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.resources.values()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Queries and results
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryQuery {
    pub resource: String,
    pub realm: String,
    /// Only consider deployments whose href contains this service type.
    pub service_type: Option<String>,
    /// Returned verbatim when the resource is not registered.
    pub default_template: String,
}

impl RegistryQuery {
    pub fn new(
        resource: impl Into<String>,
        realm: impl Into<String>,
        default_template: impl Into<String>,
    ) -> Self {
        Self {
            resource: resource.into(),
            realm: realm.into(),
            service_type: None,
            default_template: default_template.into(),
        }
    }

    pub fn with_service_type(mut self, service_type: impl Into<String>) -> Self {
        self.service_type = Some(service_type.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A deployment serves the requested realm.
    Registered { href: String, realm: String },
    /// No deployment serves the requested realm; the first one listed was
    /// taken instead. `used_realm` is `None` when it lists no systems.
    Fallback {
        href: String,
        requested_realm: String,
        used_realm: Option<String>,
    },
    /// The resource is not registered.
    Default(String),
}

impl Resolution {
    pub fn href(&self) -> &str {
        match self {
            Resolution::Registered { href, .. } | Resolution::Fallback { href, .. } => href,
            Resolution::Default(template) => template,
        }
    }

    pub fn into_href(self) -> String {
        match self {
            Resolution::Registered { href, .. } | Resolution::Fallback { href, .. } => href,
            Resolution::Default(template) => template,
        }
    }

    pub fn outcome(&self) -> &'static str {
        match self {
            Resolution::Registered { .. } => "registered",
            Resolution::Fallback { .. } => "fallback",
            Resolution::Default(_) => "default",
        }
    }
}

/// Apply the resolution rules to an already-fetched registry.
///
/// Fails only when the requested resource's own entry is malformed.
pub fn select(roots: &ServiceRoots, query: &RegistryQuery) -> Result<Resolution> {
    let default = || Ok(Resolution::Default(query.default_template.clone()));

    let Some(entry) = roots.entry(&query.resource)? else {
        return default();
    };
    let candidates: Vec<&Deployment> = entry
        .deployments
        .iter()
        .filter(|d| {
            query
                .service_type
                .as_deref()
                .map_or(true, |st| d.href.contains(st))
        })
        .collect();
    let Some(first) = candidates.first() else {
        return default();
    };

    if let Some(d) = candidates.iter().find(|d| d.serves(&query.realm)) {
        return Ok(Resolution::Registered {
            href: d.href.clone(),
            realm: query.realm.clone(),
        });
    }

    let fallback = match candidates
        .iter()
        .find_map(|d| d.realms().next().map(|realm| (d, realm)))
    {
        Some((d, realm)) => Resolution::Fallback {
            href: d.href.clone(),
            requested_realm: query.realm.clone(),
            used_realm: Some(realm.to_owned()),
        },
        None => Resolution::Fallback {
            href: first.href.clone(),
            requested_realm: query.realm.clone(),
            used_realm: None,
        },
    };
    Ok(fallback)
}

/// Root of a service's API for a realm, the base of most default templates.
pub fn service_root(base_url: &str, service_type: &str, realm: &str) -> String {
    format!(
        "{}/apis/{service_type};version=0;realm={realm}",
        base_url.trim_end_matches('/')
    )
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Resolver
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct Registry<'a, T: HalTransport + ?Sized> {
    transport: &'a T,
    version: String,
}

impl<'a, T: HalTransport + ?Sized> Registry<'a, T> {
    pub fn new(transport: &'a T, version: impl Into<String>) -> Self {
        Self {
            transport,
            version: version.into(),
        }
    }

    pub fn service_roots_url(&self) -> String {
        format!(
            "{}/apis/{REGISTRY_SERVICE_TYPE};version={}/serviceroots",
            self.transport.base_url(),
            self.version
        )
    }

    /// Fetch and parse the whole registry.
    ///
    /// Transport failures and non-success statuses propagate unchanged.
    pub async fn fetch_service_roots(&self) -> Result<ServiceRoots> {
        let doc = self
            .transport
            .get_json(&self.service_roots_url(), HAL_JSON)
            .await?;
        ServiceRoots::from_value(doc)
    }

    /// Resolve `query` against a freshly fetched registry.
    ///
    /// A registry that cannot be reached is an error, not a reason to fall
    /// back to the default template.
    pub async fn resolve(&self, query: &RegistryQuery) -> Result<Resolution> {
        let roots = self.fetch_service_roots().await?;
        let resolution = select(&roots, query)?;

        match &resolution {
            Resolution::Fallback {
                requested_realm,
                used_realm,
                ..
            } => tracing::warn!(
                resource = %query.resource,
                requested_realm = %requested_realm,
                used_realm = used_realm.as_deref().unwrap_or("<none>"),
                "resource not available on the requested realm, falling back"
            ),
            Resolution::Default(_) => tracing::debug!(
                resource = %query.resource,
                "resource not registered, using default template"
            ),
            Resolution::Registered { .. } => {}
        }
        TraceEvent::RegistryResolved {
            resource: query.resource.clone(),
            realm: query.realm.clone(),
            outcome: resolution.outcome().to_owned(),
        }
        .emit();

        Ok(resolution)
    }
}
