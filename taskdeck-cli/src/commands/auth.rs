//! `taskdeck auth login | logout | whoami`

use std::io::{self, BufRead};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use taskdeck_core::SessionStore;

use super::{client, home};

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Sign in with email and password and store the session.
    Login(LoginArgs),

    /// Revoke the session on the backend and forget it locally.
    Logout,

    /// Show the signed-in user.
    Whoami,
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,

    /// Read from the first line of stdin when omitted.
    #[arg(long)]
    pub password: Option<String>,
}

pub fn run(cmd: AuthCommand) -> Result<()> {
    match cmd {
        AuthCommand::Login(args) => login(args),
        AuthCommand::Logout => logout(),
        AuthCommand::Whoami => whoami(),
    }
}

fn login(args: LoginArgs) -> Result<()> {
    let home = home()?;
    let password = match args.password {
        Some(password) => password,
        None => read_password()?,
    };

    let client = client(&home)?;
    let identity = client
        .sign_in(&args.email, &password)
        .with_context(|| format!("sign-in failed for {}", args.email))?;
    SessionStore::at(&home)
        .save(&identity)
        .context("failed to save session")?;

    println!("✓ Signed in as {} ({})", args.email, identity.user_id);
    println!("Run `taskdeck sync` to fetch your profile.");
    Ok(())
}

fn logout() -> Result<()> {
    let home = home()?;
    let session = SessionStore::at(&home);
    let Some(identity) = session.load().context("failed to read session")? else {
        println!("Not signed in.");
        return Ok(());
    };

    // Local sign-out succeeds even when the backend cannot be reached.
    match client(&home).and_then(|c| c.sign_out(&identity).map_err(Into::into)) {
        Ok(()) => {}
        Err(err) => eprintln!(
            "{} could not revoke session on backend: {err:#}",
            "warning:".yellow()
        ),
    }

    session.clear().context("failed to remove session")?;
    println!("✓ Signed out");
    Ok(())
}

fn whoami() -> Result<()> {
    let home = home()?;
    match SessionStore::at(&home)
        .load()
        .context("failed to read session")?
    {
        Some(identity) => {
            println!("user:      {}", identity.user_id);
            if let Some(email) = &identity.email {
                println!("email:     {email}");
            }
            println!("signed in: {}", identity.signed_in_at.to_rfc3339());
        }
        None => println!("Not signed in."),
    }
    Ok(())
}

fn read_password() -> Result<String> {
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("no password given; pass --password or pipe it on stdin");
    }
    Ok(password)
}
