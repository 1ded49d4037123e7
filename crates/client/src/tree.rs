//! Folder tree traversal.
//!
//! Emission order at every level:
//! 1. the node itself at its depth,
//! 2. each folder child's whole subtree, in the order the server lists
//!    the folders,
//! 3. the leaf children at `depth + 1`, in the order the server lists them.
//!
//! Leaves of a level therefore come out only after every folder of that
//! level has been fully expanded, wherever the server placed them among
//! their siblings. All children of a folder are fetched (across every
//! page) before any of them is descended into.

use std::time::Instant;

use ctms_domain::config::{ErrorPolicy, TraversalConfig};
use ctms_domain::error::{Error, Result};
use ctms_domain::trace::TraceEvent;

use crate::hal::HalResource;
use crate::pages::{collect_items, walk_from, walk_pages};
use crate::transport::HalTransport;

pub const LOCATIONS_REL: &str = "loc:locations";
pub const ROOT_ITEM_REL: &str = "loc:root-item";

#[derive(Debug, Clone, PartialEq)]
pub struct HierarchicalItem {
    pub item: HalResource,
    /// Distance from the traversal root, which is at 0.
    pub depth: usize,
    pub is_folder: bool,
}

/// A node that could not be fetched under [`ErrorPolicy::SkipBranch`].
#[derive(Debug)]
pub struct SkippedBranch {
    /// The folder's `self` href, or its name when it has none.
    pub uri: String,
    pub depth: usize,
    pub error: Error,
}

#[derive(Debug, Default)]
pub struct Traversal {
    pub items: Vec<HierarchicalItem>,
    pub skipped: Vec<SkippedBranch>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalOptions {
    pub collection_rel: String,
    pub item_rel: String,
    pub on_error: ErrorPolicy,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self::from(&TraversalConfig::default())
    }
}

impl From<&TraversalConfig> for TraversalOptions {
    fn from(cfg: &TraversalConfig) -> Self {
        Self {
            collection_rel: cfg.collection_rel.clone(),
            item_rel: cfg.item_rel.clone(),
            on_error: cfg.on_error,
        }
    }
}

enum Step {
    Visit { uri: String, depth: usize },
    Emit(HierarchicalItem),
}

pub struct TreeTraverser<'a, T: HalTransport + ?Sized> {
    transport: &'a T,
    options: TraversalOptions,
}

impl<'a, T: HalTransport + ?Sized> TreeTraverser<'a, T> {
    pub fn new(transport: &'a T, options: TraversalOptions) -> Self {
        Self { transport, options }
    }

    fn is_folder(&self, res: &HalResource) -> bool {
        let rel = &self.options.collection_rel;
        res.has_link(rel) || !res.embedded(rel).is_empty()
    }

    /// Traverse the tree below `root_uri`.
    ///
    /// Failing to fetch the root is always an error. Failures further down
    /// follow the configured [`ErrorPolicy`].
    pub async fn traverse(&self, root_uri: &str) -> Result<Traversal> {
        let started = Instant::now();
        let mut out = Traversal::default();
        let mut stack = vec![Step::Visit {
            uri: root_uri.to_owned(),
            depth: 0,
        }];

        while let Some(step) = stack.pop() {
            let (uri, depth) = match step {
                Step::Emit(item) => {
                    out.items.push(item);
                    continue;
                }
                Step::Visit { uri, depth } => (uri, depth),
            };

            let node = match self.transport.get_resource(&uri).await {
                Ok(node) => node,
                Err(e) if depth == 0 => return Err(e),
                Err(e) => {
                    self.on_failure(&mut out, uri, depth, e)?;
                    continue;
                }
            };

            let is_folder = self.is_folder(&node);
            let children = if is_folder {
                match self.children(&node, &uri).await {
                    Ok(children) => children,
                    Err(e) => {
                        out.items.push(HierarchicalItem {
                            item: node,
                            depth,
                            is_folder,
                        });
                        self.on_failure(&mut out, uri, depth, e)?;
                        continue;
                    }
                }
            } else {
                Vec::new()
            };

            out.items.push(HierarchicalItem {
                item: node,
                depth,
                is_folder,
            });

            let (folders, leaves): (Vec<_>, Vec<_>) =
                children.into_iter().partition(|c| self.is_folder(c));

            // Popped in reverse: every folder subtree, then the leaves.
            for leaf in leaves.into_iter().rev() {
                stack.push(Step::Emit(HierarchicalItem {
                    item: leaf,
                    depth: depth + 1,
                    is_folder: false,
                }));
            }
            for folder in folders.into_iter().rev() {
                match folder.self_href() {
                    Some(href) => stack.push(Step::Visit {
                        uri: href.to_owned(),
                        depth: depth + 1,
                    }),
                    None => {
                        let label = folder
                            .property_str("common.name")
                            .unwrap_or("<no self link>")
                            .to_owned();
                        let e = Error::Parse(format!(
                            "folder '{label}' listed under {uri} has no 'self' link"
                        ));
                        self.on_failure(&mut out, label, depth + 1, e)?;
                    }
                }
            }
        }

        TraceEvent::TraversalCompleted {
            root: root_uri.to_owned(),
            items: out.items.len(),
            skipped: out.skipped.len(),
            duration_ms: started.elapsed().as_millis() as u64,
        }
        .emit();
        Ok(out)
    }

    /// Every child of a folder, across all pages, in server order.
    async fn children(&self, node: &HalResource, uri: &str) -> Result<Vec<HalResource>> {
        let opts = &self.options;
        if let Some(collection) = node.embedded(&opts.collection_rel).first() {
            let first = collection.clone();
            return collect_items(walk_from(self.transport, first, uri, &opts.item_rel)).await;
        }
        let href = node.require_link(&opts.collection_rel)?.href.clone();
        collect_items(walk_pages(self.transport, &href, &opts.item_rel)).await
    }

    fn on_failure(&self, out: &mut Traversal, uri: String, depth: usize, error: Error) -> Result<()> {
        match self.options.on_error {
            ErrorPolicy::FailFast => Err(error),
            ErrorPolicy::SkipBranch => {
                tracing::warn!(uri = %uri, depth, error = %error, "skipping folder branch");
                out.skipped.push(SkippedBranch { uri, depth, error });
                Ok(())
            }
        }
    }
}

/// Follow `loc:root-item` from the locations resource.
pub async fn root_item_href<T: HalTransport + ?Sized>(
    transport: &T,
    locations_uri: &str,
) -> Result<String> {
    let locations = transport.get_resource(locations_uri).await?;
    locations
        .link(ROOT_ITEM_REL)
        .map(|l| l.href.clone())
        .ok_or_else(|| Error::NotFound(format!("{locations_uri} has no '{ROOT_ITEM_REL}' link")))
}
