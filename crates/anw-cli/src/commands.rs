//! Handlers for the store-backed commands.
//!
//! Handlers write to the given output so they can be exercised in tests.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde_json::Value;

use anw_acl::gate::{self, PageDecision};
use anw_acl::scan::scan_page;
use anw_acl::{AccessContext, AclMatrix, Decision, PageLabel, RecordingNavigator, Role, Session};

use crate::app::App;
use crate::cli::{AclAction, Command, KvAction};

/// Run a store-backed command.
pub async fn dispatch(app: &App, command: Command, out: &mut dyn Write) -> Result<()> {
    match command {
        Command::Whoami => whoami(app, out).await,
        Command::Check { key, role } => check(app, &key, role, out).await,
        Command::Audit { files, role } => audit(app, &files, role, out).await,
        Command::Acl { action } => acl(app, action, out).await,
        Command::Kv { action } => kv(app, action, out).await,
        Command::Config { .. } => bail!("config commands do not use the store"),
    }
}

/// Session with `role`, for evaluating as someone else.
fn session_as(role: Role) -> Session {
    match role {
        Role::Public => Session::anonymous(),
        role => Session {
            email: format!("<{role}>"),
            role,
        },
    }
}

async fn context(app: &App, role: Option<Role>) -> AccessContext {
    let mut ctx = app.guard.context().await;
    if let Some(role) = role {
        ctx.session = session_as(role);
    }
    ctx
}

/// `anw whoami`
pub async fn whoami(app: &App, out: &mut dyn Write) -> Result<()> {
    let ctx = app.guard.context().await;
    if !ctx.is_logged_in() {
        writeln!(out, "Not signed in (role: {})", ctx.role())?;
        return Ok(());
    }

    writeln!(out, "Email:  {}", ctx.session.email)?;
    writeln!(out, "Role:   {}", ctx.role())?;
    match app.guard.directory().lookup(&ctx.session.email) {
        Some(entry) => {
            writeln!(out, "Status: {:?}", entry.status)?;
            if let Some(eircode) = &entry.eircode {
                writeln!(out, "Eircode: {eircode}")?;
            }
        }
        None => writeln!(out, "Status: no directory record")?,
    }
    Ok(())
}

/// `anw check <key>`
pub async fn check(app: &App, key: &str, role: Option<Role>, out: &mut dyn Write) -> Result<()> {
    let ctx = context(app, role).await;
    let verdict = match ctx.decide(key) {
        Decision::Allow => "allow",
        Decision::Deny => "deny",
        Decision::Unlisted => "allow (no rule)",
    };
    let rule = ctx
        .matrix
        .get(key)
        .map(ToString::to_string)
        .unwrap_or_else(|| "-".to_string());
    writeln!(out, "{key}: {verdict} for {} [rule: {rule}]", ctx.role())?;
    Ok(())
}

/// `anw audit <files…>`
pub async fn audit(
    app: &App,
    files: &[PathBuf],
    role: Option<Role>,
    out: &mut dyn Write,
) -> Result<()> {
    let ctx = context(app, role).await;
    writeln!(out, "Auditing {} page(s) as {}", files.len(), ctx.role())?;

    for file in files {
        let html = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let mut page = scan_page(&page_location(file), &html);
        let mut navigator = RecordingNavigator::new();
        let outcome = gate::apply(
            &ctx,
            app.guard.config(),
            app.guard.routes(),
            &mut page,
            &mut navigator,
        );

        let decision = match &outcome.decision {
            PageDecision::Render => "render".to_string(),
            PageDecision::Redirect(target) => format!("redirect -> {target}"),
        };
        writeln!(
            out,
            "{}: key={} {decision}, {} locked link(s), {} hidden feature(s)",
            file.display(),
            page.page_key.as_deref().unwrap_or("-"),
            outcome.locked_links,
            outcome.hidden_features,
        )?;
    }
    Ok(())
}

fn page_location(file: &Path) -> String {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("/{name}")
}

/// `anw acl …`
pub async fn acl(app: &App, action: AclAction, out: &mut dyn Write) -> Result<()> {
    let guard = &app.guard;
    match action {
        AclAction::Show { json } => {
            let matrix = guard.acl_fresh().await;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&matrix.to_value())?)?;
            } else {
                print_matrix(&matrix, out)?;
            }
        }
        AclAction::Set { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let value: Value = serde_json::from_str(&content)
                .with_context(|| format!("{} is not valid JSON", file.display()))?;
            let matrix = AclMatrix::from_value(&value)?;
            // Fetch first so the write is checked against the current version.
            guard.acl_fresh().await;
            guard.set_acl(&matrix).await?;
            writeln!(out, "Stored {} rule(s)", matrix.len())?;
        }
        AclAction::Grant { key, role } => {
            let matrix = guard.grant(&key, role).await?;
            print_rule(&matrix, &key, out)?;
        }
        AclAction::Revoke { key, role } => {
            let matrix = guard.revoke(&key, role).await?;
            print_rule(&matrix, &key, out)?;
        }
        AclAction::Classify { key } => {
            let matrix = guard.acl_fresh().await;
            match key {
                Some(key) => writeln!(out, "{key}: {}", matrix.classify_page(&key))?,
                None => {
                    for (key, _) in matrix.iter().filter(|(k, _)| k.starts_with("page:")) {
                        writeln!(out, "{key:<24} {}", matrix.classify_page(key))?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn print_rule(matrix: &AclMatrix, key: &str, out: &mut dyn Write) -> Result<()> {
    let rule = matrix
        .get(key)
        .map(ToString::to_string)
        .unwrap_or_else(|| "-".to_string());
    writeln!(out, "{}: {rule}", key.trim())?;
    Ok(())
}

fn print_matrix(matrix: &AclMatrix, out: &mut dyn Write) -> Result<()> {
    for (key, rule) in matrix.iter() {
        if key.starts_with("page:") {
            let label = matrix.classify_page(key);
            let marker = if label == PageLabel::Public { "" } else { " *" };
            writeln!(out, "{key:<32} {rule} [{label}]{marker}")?;
        } else {
            writeln!(out, "{key:<32} {rule}")?;
        }
    }
    Ok(())
}

/// `anw kv …`
pub async fn kv(app: &App, action: KvAction, out: &mut dyn Write) -> Result<()> {
    let client = app.client();
    match action {
        KvAction::Get { key } => {
            let value = client.fetch(&key).await?.unwrap_or(Value::Null);
            writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
        }
        KvAction::Put { key, value } => {
            let value: Value = serde_json::from_str(&value).context("Value is not valid JSON")?;
            if !client.save(&key, value).await {
                bail!("Write of '{key}' was not confirmed by the store");
            }
            writeln!(out, "Saved '{key}'")?;
        }
        KvAction::Delete { key } => {
            client.delete(&key).await?;
            writeln!(out, "Deleted '{key}'")?;
        }
    }
    Ok(())
}
