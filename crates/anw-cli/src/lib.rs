//! # anw-cli
//!
//! Command-line tooling for the ANW access-control stack:
//! - inspect the signed-in session and resolved role
//! - check permission keys and audit HTML pages against the ACL matrix
//! - administer the ACL matrix with conflict-checked writes
//! - raw store access and configuration file management

#![forbid(unsafe_code)]

pub mod app;
pub mod cli;
pub mod commands;
pub mod config_handlers;

use std::io::Write;

use anyhow::Result;

use anw_core::AnwConfig;

use crate::app::App;
use crate::cli::{Cli, Command};

/// Run a parsed command line, writing results to `out`.
pub async fn run(cli: Cli, out: &mut dyn Write) -> Result<()> {
    if let Command::Config { action } = cli.command {
        config_handlers::handle_config_command(cli.config.as_deref(), action, out)?;
        return Ok(());
    }

    let config = AnwConfig::load(cli.config.as_deref())?;
    let app = match &cli.offline {
        Some(seed) => App::offline_from_file(&config, seed, cli.as_email.as_deref())?,
        None => App::connect(&config)?,
    };

    let result = commands::dispatch(&app, cli.command, out).await;

    let dirty = app.client().dirty_keys();
    if !dirty.is_empty() {
        log::warn!("Unconfirmed writes left in cache: {}", dirty.join(", "));
    }
    result
}
