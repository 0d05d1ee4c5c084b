//! `taskdeck profile show | list | edit`: work on the local cache.
//!
//! Edits stamp the cached record with the current time, so the next sync
//! pushes them to the backend.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Subcommand};
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use taskdeck_core::{timestamp, ProfileCache, ProfileRecord, SessionStore, UserId};

use super::home;

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// Show the signed-in user's cached profile.
    Show(ShowArgs),

    /// List every cached profile.
    List,

    /// Change the cached profile; the next sync pushes the edit.
    Edit(EditArgs),
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    #[arg(long)]
    pub username: Option<String>,

    #[arg(long)]
    pub display_name: Option<String>,

    /// Avatar reference; an empty value clears it.
    #[arg(long)]
    pub avatar: Option<String>,
}

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "username")]
    username: String,
    #[tabled(rename = "display name")]
    display_name: String,
    #[tabled(rename = "email")]
    email: String,
    #[tabled(rename = "updated")]
    updated_at: String,
}

impl From<&ProfileRecord> for ProfileRow {
    fn from(record: &ProfileRecord) -> Self {
        Self {
            id: record.id.to_string(),
            username: record.username.clone(),
            display_name: record.display_name.clone(),
            email: record.email.clone().unwrap_or_default(),
            updated_at: timestamp::format(&record.updated_at),
        }
    }
}

pub fn run(cmd: ProfileCommand) -> Result<()> {
    match cmd {
        ProfileCommand::Show(args) => show(args),
        ProfileCommand::List => list(),
        ProfileCommand::Edit(args) => edit(args),
    }
}

fn current_user(home: &std::path::Path) -> Result<UserId> {
    let Some(identity) = SessionStore::at(home)
        .load()
        .context("failed to read session")?
    else {
        bail!("not signed in; run `taskdeck auth login --email EMAIL`");
    };
    Ok(identity.user_id)
}

fn show(args: ShowArgs) -> Result<()> {
    let home = home()?;
    let user_id = current_user(&home)?;

    let record = ProfileCache::at(&home)
        .get(&user_id)
        .context("failed to read profile cache")?;
    let Some(record) = record else {
        println!("No cached profile for {user_id}. Run `taskdeck sync` first.");
        return Ok(());
    };

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&record).context("failed to serialize profile JSON")?
        );
        return Ok(());
    }

    println!("{}", record.display_name.bold());
    println!("  username: {}", record.username);
    if let Some(email) = &record.email {
        println!("  email:    {email}");
    }
    if let Some(avatar) = &record.avatar_ref {
        println!("  avatar:   {avatar}");
    }
    println!(
        "  updated:  {}",
        timestamp::format(&record.updated_at).bright_black()
    );
    Ok(())
}

fn edit(args: EditArgs) -> Result<()> {
    if args.username.is_none() && args.display_name.is_none() && args.avatar.is_none() {
        bail!("nothing to edit; pass --username, --display-name or --avatar");
    }

    let home = home()?;
    let user_id = current_user(&home)?;
    let cache = ProfileCache::at(&home);
    let Some(mut record) = cache.get(&user_id).context("failed to read profile cache")? else {
        bail!("no cached profile for {user_id}; run `taskdeck sync` first");
    };

    if let Some(username) = args.username {
        if username.trim().is_empty() {
            bail!("--username must not be empty");
        }
        record.username = username;
    }
    if let Some(display_name) = args.display_name {
        record.display_name = display_name;
    }
    if let Some(avatar) = args.avatar {
        record.avatar_ref = (!avatar.is_empty()).then_some(avatar);
    }
    record.updated_at = Utc::now();

    cache.upsert(&record).context("failed to save profile cache")?;
    println!("✓ Profile edited locally; run `taskdeck sync` to push it");
    Ok(())
}

fn list() -> Result<()> {
    let home = home()?;
    let records = ProfileCache::at(&home)
        .list()
        .context("failed to read profile cache")?;
    if records.is_empty() {
        println!("No cached profiles.");
        return Ok(());
    }

    let rows: Vec<ProfileRow> = records.iter().map(ProfileRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}
