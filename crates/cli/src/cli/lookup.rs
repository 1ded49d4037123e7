//! `ctms registry` and `ctms resolve`, plus the registry lookups the other
//! commands share.

use ctms_client::processes::{ORCHESTRATION_SERVICE_TYPE, PROCESS_QUERY_REL};
use ctms_client::search::SEARCHES_REL;
use ctms_client::tree::LOCATIONS_REL;
use ctms_client::{service_root, HalClient, Registry, RegistryQuery, Resolution};
use ctms_domain::config::Config;

/// Template used when the registry has no entry for `resource`.
pub fn default_template(config: &Config, resource: &str) -> String {
    let base = &config.platform.base_url;
    let realm = &config.search.realm;
    let assets = service_root(base, &config.search.service_type, realm);
    match resource {
        SEARCHES_REL => format!("{assets}/searches"),
        LOCATIONS_REL => format!("{assets}/locations"),
        PROCESS_QUERY_REL => format!(
            "{}/process-queries/{{id}}{{?offset,limit,sort}}",
            service_root(base, ORCHESTRATION_SERVICE_TYPE, realm)
        ),
        _ => assets,
    }
}

/// Registry query for `resource` in the configured realm.
pub fn query(config: &Config, resource: &str, default: Option<String>) -> RegistryQuery {
    let default = default.unwrap_or_else(|| default_template(config, resource));
    let service_type = match resource {
        PROCESS_QUERY_REL => ORCHESTRATION_SERVICE_TYPE,
        _ => config.search.service_type.as_str(),
    };
    RegistryQuery::new(resource, config.search.realm.clone(), default).with_service_type(service_type)
}

/// Resolve `resource` to a URI template.
pub async fn resolve_href(client: &HalClient, config: &Config, resource: &str) -> anyhow::Result<String> {
    let registry = Registry::new(client, config.platform.registry_version.clone());
    let resolution = registry.resolve(&query(config, resource, None)).await?;
    Ok(resolution.into_href())
}

/// `ctms registry`: one block per resource, one line per deployment.
pub async fn list(client: &HalClient, config: &Config) -> anyhow::Result<()> {
    let roots = Registry::new(client, config.platform.registry_version.clone())
        .fetch_service_roots()
        .await?;
    if roots.is_empty() {
        println!("(registry lists no resources)");
        return Ok(());
    }
    for entry in roots.entries() {
        println!("{}", entry.name);
        for d in &entry.deployments {
            let realms: Vec<&str> = d.realms().collect();
            if realms.is_empty() {
                println!("  {}", d.href);
            } else {
                println!("  {} [{}]", d.href, realms.join(", "));
            }
        }
    }
    for (name, reason) in &roots.malformed {
        eprintln!("{name}: malformed entry ({reason})");
    }
    Ok(())
}

/// `ctms resolve`: the template and how it was found.
pub async fn resolve(
    client: &HalClient,
    config: &Config,
    resource: &str,
    default: Option<String>,
) -> anyhow::Result<()> {
    let registry = Registry::new(client, config.platform.registry_version.clone());
    let resolution = registry.resolve(&query(config, resource, default)).await?;
    println!("{}", describe(&resolution));
    Ok(())
}

pub fn describe(resolution: &Resolution) -> String {
    match resolution {
        Resolution::Registered { href, realm } => format!("{href}\n(registered for realm {realm})"),
        Resolution::Fallback {
            href,
            requested_realm,
            used_realm,
        } => format!(
            "{href}\n(realm {requested_realm} not registered, using {})",
            used_realm.as_deref().unwrap_or("first listed deployment")
        ),
        Resolution::Default(template) => format!("{template}\n(not registered, default template)"),
    }
}
