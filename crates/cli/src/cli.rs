use std::path::PathBuf;

use clap::{Parser, Subcommand};
use momo_domain::Product;

/// Mobile-money API client: provisioning, tokens and operations
#[derive(Debug, Parser)]
#[command(name = "momo", version, about)]
pub struct Cli {
    /// JSON or TOML configuration file (default: environment, then probed files)
    #[arg(long, global = true, env = "MOMO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Ensure an API user and API key exist and print the user id
    Provision {
        /// Use this API user id instead of the configured or a generated one
        #[arg(long)]
        user_id: Option<String>,
        /// Also print the API key
        #[arg(long)]
        show_key: bool,
    },

    /// Obtain a bearer token for a product
    Token {
        product: Product,
        /// Print the token value instead of its expiry only
        #[arg(long)]
        show_value: bool,
    },

    /// Show the cached token state for every product
    TokenStatus,

    /// Fetch remote details of an API user (default: the configured one)
    UserInfo { user_id: Option<String> },

    /// List the known operations
    Operations {
        /// Only operations of this product
        #[arg(long)]
        product: Option<Product>,
    },

    /// Invoke an operation by name
    Call {
        /// Operation name, e.g. `collection.request_to_pay`
        name: String,
        /// Path parameter as `name=value`
        #[arg(long = "param", value_parser = parse_pair)]
        params: Vec<(String, String)>,
        /// Query parameter as `name=value`
        #[arg(long = "query", value_parser = parse_pair)]
        query: Vec<(String, String)>,
        /// JSON request body
        #[arg(long)]
        body: Option<String>,
        /// Reference id for a mutating call (default: freshly generated)
        #[arg(long)]
        reference_id: Option<String>,
    },
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    let (name, value) =
        raw.split_once('=').ok_or_else(|| format!("expected name=value, got `{raw}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing name in `{raw}`"));
    }
    Ok((name.to_string(), value.to_string()))
}
