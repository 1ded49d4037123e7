pub mod config;
pub mod credentials;
pub mod doctor;
pub mod lookup;
pub mod search;
pub mod tree;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use ctms_domain::config::{AuthProvider, Config};

/// ctms: command-line client for the CTMS platform API.
#[derive(Debug, Parser)]
#[command(name = "ctms", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Flags that override the configuration file.
#[derive(Debug, Default, Args)]
pub struct GlobalArgs {
    /// Platform gateway, e.g. https://ctms.example.com.
    #[arg(long, global = true)]
    pub base_url: Option<String>,
    /// Realm to look resources up for.
    #[arg(long, global = true)]
    pub realm: Option<String>,
    /// Service type used to build default URI templates.
    #[arg(long, global = true)]
    pub service_type: Option<String>,
    /// User to log in as.
    #[arg(long, global = true)]
    pub username: Option<String>,
    /// Identity provider flow: mcux, oauth_password or oauth_client.
    #[arg(long, global = true)]
    pub provider: Option<AuthProvider>,
}

impl GlobalArgs {
    /// Apply the flags that were given on top of `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(ref url) = self.base_url {
            config.platform.base_url = url.trim_end_matches('/').to_owned();
        }
        if let Some(ref realm) = self.realm {
            config.search.realm = realm.clone();
        }
        if let Some(ref service_type) = self.service_type {
            config.search.service_type = service_type.clone();
        }
        if let Some(ref username) = self.username {
            config.auth.username = Some(username.clone());
        }
        if let Some(provider) = self.provider {
            config.auth.provider = provider;
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List every resource in the service registry.
    Registry,
    /// Resolve one registry resource for the configured realm.
    Resolve {
        /// Resource name, e.g. "search:searches".
        resource: String,
        /// Template to use when the registry has no entry.
        #[arg(long)]
        default: Option<String>,
    },
    /// Run a simple search and print the matching assets.
    Search {
        /// Quick search expression.
        expression: String,
    },
    /// Run an advanced search from a JSON description file.
    AdvancedSearch {
        /// Path to the search description.
        file: PathBuf,
    },
    /// Print the folder tree below the root item.
    Tree {
        /// Start at this item instead of the locations root.
        #[arg(long)]
        root: Option<String>,
        /// Skip folders that cannot be read instead of aborting.
        #[arg(long)]
        skip_errors: bool,
    },
    /// Query orchestration process instances.
    Processes {
        /// Quick search expression.
        expression: String,
    },
    /// Run diagnostic checks against the current configuration.
    Doctor,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path in `CTMS_CONFIG` (or `ctms.toml`
/// by default). Returns the parsed [`Config`] and the path that was used.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path = std::env::var("CTMS_CONFIG").unwrap_or_else(|_| "ctms.toml".into());
    let config = load_config_from(Path::new(&config_path))?;
    Ok((config, config_path))
}

/// Parse the config file at `path`. A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("reading {}: {e}", path.display()))?;
    toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {}: {e}", path.display()))
}
