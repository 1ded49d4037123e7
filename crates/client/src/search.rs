//! Asset searches.
//!
//! Both search flavours start at the service's `searches` resource, which
//! advertises the search kinds the service supports as links. A missing
//! link means the service does not offer that kind of search.

use ctms_domain::error::{Error, Result};
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde::Serialize;
use serde_json::Value;

use crate::hal::HalResource;
use crate::pages::{walk_from, walk_pages, ItemBatch};
use crate::template::UriTemplate;
use crate::transport::HalTransport;

pub const SEARCHES_REL: &str = "search:searches";
pub const SIMPLE_SEARCH_REL: &str = "search:simple-search";
pub const ADVANCED_SEARCH_REL: &str = "search:advanced-search";
pub const ASSET_REL: &str = "aa:asset";

/// Identity of a listed asset or process: `base.id` and `common.name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ItemSummary {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl ItemSummary {
    pub fn from_resource(res: &HalResource) -> Self {
        Self {
            id: res.property_str("base.id").map(str::to_owned),
            name: res.property_str("common.name").map(str::to_owned),
        }
    }
}

async fn searches_resource<T>(transport: &T, searches_uri: &str) -> Result<HalResource>
where
    T: HalTransport + ?Sized,
{
    let url = UriTemplate::parse(searches_uri)?.expand();
    transport.get_resource(&url).await
}

fn search_link<'r>(searches: &'r HalResource, rel: &str) -> Result<&'r str> {
    searches
        .link(rel)
        .map(|l| l.href.as_str())
        .ok_or_else(|| Error::NotFound(format!("service does not support '{rel}'")))
}

/// Run a simple (quick) search and walk its result pages.
pub async fn simple_search<'a, T>(
    transport: &'a T,
    searches_uri: &str,
    expression: &str,
) -> Result<BoxStream<'a, Result<ItemBatch>>>
where
    T: HalTransport + ?Sized,
{
    let searches = searches_resource(transport, searches_uri).await?;
    let mut template = UriTemplate::parse(search_link(&searches, SIMPLE_SEARCH_REL)?)?;
    let url = template.set("search", expression).expand();
    tracing::debug!(url = %url, "simple search");
    Ok(walk_pages(transport, &url, ASSET_REL).boxed())
}

/// POST an advanced search description and walk its result pages.
pub async fn advanced_search<'a, T>(
    transport: &'a T,
    searches_uri: &str,
    description: &Value,
) -> Result<BoxStream<'a, Result<ItemBatch>>>
where
    T: HalTransport + ?Sized,
{
    let searches = searches_resource(transport, searches_uri).await?;
    let url = UriTemplate::parse(search_link(&searches, ADVANCED_SEARCH_REL)?)?.expand();
    tracing::debug!(url = %url, "advanced search");

    let first = HalResource::from_value(transport.post_json(&url, description).await?)?;
    Ok(walk_from(transport, first, url, ASSET_REL).boxed())
}
