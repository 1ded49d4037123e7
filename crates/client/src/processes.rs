//! Orchestration process queries.

use ctms_domain::error::Result;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde_json::{json, Value};

use crate::hal::HalResource;
use crate::pages::{walk_from, ItemBatch};
use crate::template::UriTemplate;
use crate::transport::HalTransport;

pub const ORCHESTRATION_SERVICE_TYPE: &str = "avid.orchestration.ctc";
pub const PROCESS_QUERY_REL: &str = "orchestration:process-query";
pub const PROCESS_REL: &str = "orchestration:process";

/// Wrap a quick-search expression in the query document the orchestration
/// service expects.
pub fn quick_query(expression: &str) -> Value {
    let escaped = expression
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    json!({
        "query": format!("<query version='1.0'><search><quick>{escaped}</quick></search></query>")
    })
}

/// Query process instances matching `expression` and walk the result pages.
///
/// `process_query_uri` may be the registry's template; unset variables
/// are dropped.
pub async fn query_processes<'a, T>(
    transport: &'a T,
    process_query_uri: &str,
    expression: &str,
) -> Result<BoxStream<'a, Result<ItemBatch>>>
where
    T: HalTransport + ?Sized,
{
    let url = UriTemplate::parse(process_query_uri)?.expand();
    let first = HalResource::from_value(transport.post_json(&url, &quick_query(expression)).await?)?;
    Ok(walk_from(transport, first, url, PROCESS_REL).boxed())
}
