//! CLI entry point for skyauth.

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// skyauth CLI
#[derive(Parser, Debug)]
#[command(name = "skyauth", version, about = "OAuth session tooling for browser extensions")]
pub struct Cli {
    /// Config file (defaults to ~/.skyauth/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the OAuth client metadata document
    Metadata,
    /// Parse the OAuth parameters out of a redirect URL
    ParseCallback(ParseCallbackArgs),
    /// Show the resolved configuration
    Config,
}

/// Arguments for `skyauth parse-callback`.
#[derive(Parser, Debug)]
pub struct ParseCallbackArgs {
    /// Redirect URL as returned by the authorization server
    pub url: String,
}
