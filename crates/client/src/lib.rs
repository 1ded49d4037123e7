//! `ctms-client`: hypermedia client for the CTMS platform API.
//!
//! The platform speaks HAL+JSON: clients discover endpoints through links
//! and a central service registry instead of hard-coding URLs. This crate
//! provides the pieces every caller needs:
//!
//! | Module      | Provides                                                   |
//! |-------------|------------------------------------------------------------|
//! | `session`   | [`Session`]: authorize, keep-alive, logout                 |
//! | `registry`  | [`Registry`]: resource lookup with realm fallback          |
//! | `pages`     | [`walk_pages`]: lazy `_links.next` walks                   |
//! | `tree`      | [`TreeTraverser`]: depth-tagged folder traversal           |
//! | `search`    | simple and advanced asset searches                         |
//! | `processes` | orchestration process queries                              |
//!
//! All network access goes through the [`HalTransport`] trait;
//! [`HalClient`] is the `reqwest` implementation a [`Session`] hands out.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use ctms_client::{walk_pages, Credentials, Registry, RegistryQuery, Session};
//! use ctms_domain::config::Config;
//! use futures_util::StreamExt;
//!
//! # async fn example() -> ctms_domain::error::Result<()> {
//! let cfg = Config::default();
//! let creds = Credentials::Mcux {
//!     username: "Administrator".into(),
//!     password: "secret".into(),
//! };
//! let session = Session::authorize(&cfg.platform, &cfg.session, &creds).await?;
//!
//! session
//!     .scope(|client| async move {
//!         let registry = Registry::new(&client, "0");
//!         let query = RegistryQuery::new("search:searches", "BEEF", "https://localhost/searches");
//!         let searches = registry.resolve(&query).await?.into_href();
//!
//!         let mut pages = Box::pin(walk_pages(&client, &searches, "aa:asset"));
//!         while let Some(batch) = pages.next().await {
//!             let batch = batch?;
//!             println!("page {}: {} items", batch.number, batch.items.len());
//!         }
//!         Ok::<_, ctms_domain::error::Error>(())
//!     })
//!     .await
//! # }
//! ```

pub mod hal;
pub mod keepalive;
pub mod pages;
pub mod processes;
pub mod registry;
pub mod search;
pub mod session;
pub mod template;
pub mod transport;
pub mod tree;

#[cfg(test)]
mod testing;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use hal::{HalResource, Link, OneOrMany};
pub use keepalive::{KeepAlive, KeepAliveTarget};
pub use pages::{collect_items, walk_from, walk_pages, ItemBatch};
pub use processes::{query_processes, quick_query};
pub use registry::{
    service_root, Deployment, Registry, RegistryEntry, RegistryQuery, Resolution, ServiceRoots,
    SystemRef,
};
pub use search::{advanced_search, simple_search, ItemSummary};
pub use session::{offered_providers, Credentials, Session};
pub use template::UriTemplate;
pub use transport::{from_reqwest, HalClient, HalTransport};
pub use tree::{
    root_item_href, HierarchicalItem, SkippedBranch, Traversal, TraversalOptions, TreeTraverser,
};
