//! `ctms tree`: the folder hierarchy below the locations root.

use std::time::Instant;

use ctms_client::tree::LOCATIONS_REL;
use ctms_client::{root_item_href, HalClient, HierarchicalItem, TraversalOptions, TreeTraverser};
use ctms_domain::config::{Config, ErrorPolicy};

use super::lookup::resolve_href;

pub async fn run(
    client: &HalClient,
    config: &Config,
    root: Option<String>,
    skip_errors: bool,
) -> anyhow::Result<()> {
    let started = Instant::now();
    let root = match root {
        Some(root) => root,
        None => {
            let locations = resolve_href(client, config, LOCATIONS_REL).await?;
            root_item_href(client, &locations).await?
        }
    };

    let mut options = TraversalOptions::from(&config.traversal);
    if skip_errors {
        options.on_error = ErrorPolicy::SkipBranch;
    }
    let traversal = TreeTraverser::new(client, options).traverse(&root).await?;

    for item in &traversal.items {
        println!("{}", format_line(item));
    }
    for skipped in &traversal.skipped {
        eprintln!("skipped {} (depth {}): {}", skipped.uri, skipped.depth, skipped.error);
    }
    println!(
        "{} item(s) in {} ms",
        traversal.items.len(),
        started.elapsed().as_millis()
    );
    Ok(())
}

/// `depth: name`, indented two spaces per level, folders marked.
pub fn format_line(item: &HierarchicalItem) -> String {
    let name = item
        .item
        .property_str("common.name")
        .or_else(|| item.item.self_href())
        .unwrap_or("<unnamed>");
    let marker = if item.is_folder { " (collection)" } else { "" };
    format!("{}{}: {name}{marker}", "  ".repeat(item.depth), item.depth)
}
