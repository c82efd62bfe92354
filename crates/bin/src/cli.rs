//! CLI argument definitions for the Wicket binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use wicket::Options;

/// Invitation-based authentication server
#[derive(Parser, Debug)]
#[command(name = "wicket")]
#[command(about = "Wicket: invitation-based authentication with rotating session keys")]
#[command(version)]
pub struct Cli {
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the Wicket server
    Serve(ServeArgs),
    /// Print the bootstrap administrator invitation (only while no user exists)
    FirstRun(FirstRunArgs),
    /// Print a new invitation token
    Invite(InviteArgs),
    /// Rotate the key ring one step
    RotateKeys(StoreArgs),
    /// Regenerate every key, invalidating all sessions and invitations
    ResetKeys(StoreArgs),
}

/// Where state lives and how keys rotate. Shared by every command.
#[derive(clap::Args, Debug, Clone)]
pub struct StoreArgs {
    /// Data directory holding the key file and the user database
    #[arg(short = 'D', long, env = "WICKET_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Number of keys kept alive at once
    #[arg(long, env = "WICKET_NUMBER_OF_KEYS")]
    pub number_of_keys: Option<usize>,

    /// Hours between key rotations
    #[arg(long, env = "WICKET_KEY_ROTATION_INTERVAL_HOURS")]
    pub key_rotation_interval_hours: Option<f64>,

    /// Name of the session cookie
    #[arg(long, env = "WICKET_COOKIE_NAME")]
    pub cookie_name: Option<String>,

    /// File name of the user database inside the data directory
    #[arg(long, env = "WICKET_DB_NAME")]
    pub db_name: Option<String>,
}

impl StoreArgs {
    /// Library options from the arguments; anything unset takes its default.
    pub fn options(&self) -> Options {
        let mut options = Options {
            data_dir: self.data_dir.clone(),
            ..Options::default()
        };
        if let Some(n) = self.number_of_keys {
            options.number_of_keys = n;
        }
        if let Some(hours) = self.key_rotation_interval_hours {
            options.key_rotation_interval_hours = hours;
        }
        if let Some(name) = &self.cookie_name {
            options.cookie_name = name.clone();
        }
        if let Some(name) = &self.db_name {
            options.db_name = name.clone();
        }
        options.resolved()
    }
}

/// Arguments for the serve command
#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, default_value_t = 3000, env = "WICKET_PORT")]
    pub port: u16,

    /// Bind address
    #[arg(long, default_value = "0.0.0.0", env = "WICKET_HOST")]
    pub host: String,

    /// Minimum trust level for the /amigos area
    #[arg(long, default_value_t = 5, env = "WICKET_AMIGOS_TRUST")]
    pub amigos_trust: u32,

    #[command(flatten)]
    pub store: StoreArgs,
}

/// Arguments for the first-run command
#[derive(clap::Args, Debug)]
pub struct FirstRunArgs {
    /// Handle recorded on the administrator's pending record
    #[arg(long, default_value = "admin")]
    pub root: String,

    #[command(flatten)]
    pub store: StoreArgs,
}

/// Arguments for the invite command
#[derive(clap::Args, Debug)]
pub struct InviteArgs {
    /// Contact address recorded on the invitation
    #[arg(long)]
    pub email: String,

    /// Invite an administrator
    #[arg(long)]
    pub admin: bool,

    /// Trust level granted on acceptance
    #[arg(long, default_value_t = 1)]
    pub trust: u32,

    #[command(flatten)]
    pub store: StoreArgs,
}
