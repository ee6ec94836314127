//! Command-line argument definitions.

use std::path::PathBuf;

use anw_acl::Role;
use clap::{Parser, Subcommand};

/// ANW access control and store administration
#[derive(Parser, Debug)]
#[command(name = "anw", author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Work against a JSON seed file instead of the live store
    #[arg(long, global = true, value_name = "SEED.json")]
    pub offline: Option<PathBuf>,

    /// Signed-in email for offline mode
    #[arg(long = "as", global = true, value_name = "EMAIL", requires = "offline")]
    pub as_email: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the signed-in user and resolved role
    Whoami,

    /// Check one permission key
    Check {
        /// Permission key, e.g. `page:admin`
        key: String,

        /// Evaluate as this role instead of the signed-in user
        #[arg(long, value_parser = parse_role)]
        role: Option<Role>,
    },

    /// Gate HTML pages and report what each role would see
    Audit {
        /// HTML files to scan
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Evaluate as this role instead of the signed-in user
        #[arg(long, value_parser = parse_role)]
        role: Option<Role>,
    },

    /// ACL matrix administration
    Acl {
        #[command(subcommand)]
        action: AclAction,
    },

    /// Raw store access
    Kv {
        #[command(subcommand)]
        action: KvAction,
    },

    /// Configuration file management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// `anw acl ...`
#[derive(Subcommand, Debug)]
pub enum AclAction {
    /// Print the effective matrix
    Show {
        /// Print the stored JSON shape
        #[arg(long)]
        json: bool,
    },
    /// Store a matrix read from a JSON file
    Set {
        /// JSON object of permission key to rule
        file: PathBuf,
    },
    /// Add a role to a key
    Grant {
        /// Permission key
        key: String,
        /// Role to add
        #[arg(value_parser = parse_role)]
        role: Role,
    },
    /// Remove a role from a key
    Revoke {
        /// Permission key
        key: String,
        /// Role to remove
        #[arg(value_parser = parse_role)]
        role: Role,
    },
    /// Label pages Public, Private or Exclusive
    Classify {
        /// Single page key; all page keys when omitted
        key: Option<String>,
    },
}

/// `anw kv ...`
#[derive(Subcommand, Debug)]
pub enum KvAction {
    /// Fetch a key
    Get {
        /// Store key
        key: String,
    },
    /// Replace a key with a JSON value
    Put {
        /// Store key
        key: String,
        /// JSON value
        value: String,
    },
    /// Delete a key
    Delete {
        /// Store key
        key: String,
    },
}

/// `anw config ...`
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the resolved config file path
    Path,
    /// Print a value by dotted key, e.g. `store.url`
    Get {
        /// Dotted key
        key: String,
    },
    /// Write a default config file
    Init {
        /// Target file (defaults to the standard location)
        #[arg(long)]
        file: Option<String>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the configuration as ANW_* environment variables
    Export,
}

fn parse_role(s: &str) -> Result<Role, String> {
    s.parse::<Role>().map_err(|e| e.to_string())
}
