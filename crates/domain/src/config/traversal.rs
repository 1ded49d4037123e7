use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Folder traversal
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// What the tree traverser does when fetching a node below the root fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Abort the whole traversal with the first error.
    #[default]
    FailFast,
    /// Record the failed branch, log it, and keep going.
    SkipBranch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraversalConfig {
    /// Link relation marking a folder and pointing at its child list.
    #[serde(default = "d_collection_rel")]
    pub collection_rel: String,
    /// Embedded relation holding the children on each child-list page.
    #[serde(default = "d_item_rel")]
    pub item_rel: String,
    #[serde(default)]
    pub on_error: ErrorPolicy,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            collection_rel: d_collection_rel(),
            item_rel: d_item_rel(),
            on_error: ErrorPolicy::FailFast,
        }
    }
}

fn d_collection_rel() -> String {
    "loc:collection".into()
}
fn d_item_rel() -> String {
    "loc:item".into()
}
