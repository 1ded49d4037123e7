//! Lazy walks over paginated HAL collections.
//!
//! A walk fetches a page, yields the resources embedded under the
//! requested relation as one [`ItemBatch`], and follows `_links.next`
//! until a page has none. Pages are fetched only as the stream is polled.

use ctms_domain::error::Result;
use ctms_domain::trace::TraceEvent;
use futures_core::Stream;
use futures_util::StreamExt;

use crate::hal::HalResource;
use crate::transport::HalTransport;

/// The items of one fetched page.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemBatch {
    /// 1-based position in the link chain.
    pub number: usize,
    /// URI the page was fetched from.
    pub source: String,
    pub items: Vec<HalResource>,
    /// `false` when the page had no `_embedded` section at all, which the
    /// platform uses for "nothing matched". Such a batch is always the last.
    pub found: bool,
}

/// Walk the page chain starting at `start_uri`.
///
/// A failed fetch is yielded as the stream's last item; batches yielded
/// before it stay valid.
pub fn walk_pages<'a, T>(
    transport: &'a T,
    start_uri: &str,
    items_rel: &str,
) -> impl Stream<Item = Result<ItemBatch>> + Send + 'a
where
    T: HalTransport + ?Sized,
{
    walk(transport, None, start_uri.to_owned(), items_rel.to_owned())
}

/// Walk the page chain from a page the caller already holds, e.g. the
/// response to a POSTed query or a collection embedded in its parent.
pub fn walk_from<'a, T>(
    transport: &'a T,
    first_page: HalResource,
    source: impl Into<String>,
    items_rel: &str,
) -> impl Stream<Item = Result<ItemBatch>> + Send + 'a
where
    T: HalTransport + ?Sized,
{
    walk(transport, Some(first_page), source.into(), items_rel.to_owned())
}

fn walk<'a, T>(
    transport: &'a T,
    seed: Option<HalResource>,
    source: String,
    items_rel: String,
) -> impl Stream<Item = Result<ItemBatch>> + Send + 'a
where
    T: HalTransport + ?Sized,
{
    async_stream::try_stream! {
        let mut page = match seed {
            Some(page) => page,
            None => transport.get_resource(&source).await?,
        };
        let mut source = source;
        let mut number = 0;

        loop {
            number += 1;
            let found = page.has_embedded();
            let items = page.take_embedded(&items_rel);
            let next = page.next_href().map(str::to_owned);

            TraceEvent::PageFetched {
                source: source.clone(),
                page: number,
                items: items.len(),
            }
            .emit();

            yield ItemBatch {
                number,
                source: source.clone(),
                items,
                found,
            };

            if !found {
                break;
            }
            match next {
                Some(href) => {
                    page = transport.get_resource(&href).await?;
                    source = href;
                }
                None => break,
            }
        }
    }
}

/// Drain a walk into one list, failing on the first error.
pub async fn collect_items<S>(stream: S) -> Result<Vec<HalResource>>
where
    S: Stream<Item = Result<ItemBatch>>,
{
    futures_util::pin_mut!(stream);
    let mut items = Vec::new();
    while let Some(batch) = stream.next().await {
        items.extend(batch?.items);
    }
    Ok(items)
}
