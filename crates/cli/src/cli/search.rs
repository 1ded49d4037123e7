//! `ctms search`, `ctms advanced-search` and `ctms processes`.

use std::path::Path;

use anyhow::Context;
use ctms_client::processes::PROCESS_QUERY_REL;
use ctms_client::search::SEARCHES_REL;
use ctms_client::{advanced_search, query_processes, simple_search, HalClient, ItemBatch, ItemSummary};
use ctms_domain::config::Config;
use ctms_domain::error::Result;
use futures_util::{Stream, StreamExt};

use super::lookup::resolve_href;

pub async fn search(client: &HalClient, config: &Config, expression: &str) -> anyhow::Result<()> {
    let searches = resolve_href(client, config, SEARCHES_REL).await?;
    let pages = simple_search(client, &searches, expression).await?;
    print_batches(pages, "asset").await
}

pub async fn advanced(client: &HalClient, config: &Config, file: &Path) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let description: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", file.display()))?;

    let searches = resolve_href(client, config, SEARCHES_REL).await?;
    let pages = advanced_search(client, &searches, &description).await?;
    print_batches(pages, "asset").await
}

pub async fn processes(client: &HalClient, config: &Config, expression: &str) -> anyhow::Result<()> {
    let template = resolve_href(client, config, PROCESS_QUERY_REL).await?;
    let pages = query_processes(client, &template, expression).await?;
    print_batches(pages, "process").await
}

/// Print one line per item as pages arrive, then the total.
async fn print_batches<S>(pages: S, noun: &str) -> anyhow::Result<()>
where
    S: Stream<Item = Result<ItemBatch>> + Unpin,
{
    let mut pages = pages;
    let mut total = 0;
    while let Some(batch) = pages.next().await {
        let batch = batch?;
        if !batch.found {
            println!("No {noun}s found.");
            return Ok(());
        }
        for item in &batch.items {
            println!("{}", format_item(batch.number, &ItemSummary::from_resource(item)));
        }
        total += batch.items.len();
    }
    println!("{total} {noun}(s)");
    Ok(())
}

pub fn format_item(page: usize, item: &ItemSummary) -> String {
    format!(
        "page {page}: {} {}",
        item.id.as_deref().unwrap_or("<no id>"),
        item.name.as_deref().unwrap_or("<unnamed>")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_lines_show_page_id_and_name() {
        let item = ItemSummary {
            id: Some("A1".into()),
            name: Some("Interview".into()),
        };
        assert_eq!(format_item(2, &item), "page 2: A1 Interview");
        assert_eq!(format_item(1, &ItemSummary::default()), "page 1: <no id> <unnamed>");
    }
}
