//! Command-line interface definition for devtron-client.
//!
//! This module defines the CLI structure using clap derive macros,
//! including all subcommands and their arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::client::RequestOptions;

/// devtron-client - Call the Devtron orchestrator API
///
/// Sends one request per invocation, prints the JSON envelope on success
/// and the structured error on failure.
#[derive(Debug, Parser)]
#[command(name = "devtron-client")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "DEVTRON_CONFIG")]
    pub config: Option<PathBuf>,

    /// Orchestrator root URL (overrides the configuration file)
    #[arg(long, global = true, env = "ORCHESTRATOR_ROOT")]
    pub root: Option<String>,

    /// Session token sent as the auth cookie
    #[arg(long, global = true, env = "DEVTRON_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Increase verbosity (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Returns the log level forced by the verbose/quiet flags, if any.
    pub fn log_level(&self) -> Option<&'static str> {
        if self.quiet {
            return Some("error");
        }

        match self.verbose {
            0 => None,
            1 => Some("debug"),
            _ => Some("trace"),
        }
    }
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Send a GET request
    Get(CallArgs),

    /// Send a POST request with a JSON body or a multipart form
    Post(PostArgs),

    /// Send a PUT request with a JSON body
    Put(BodyArgs),

    /// Send a DELETE request with an optional JSON body
    Delete(BodyArgs),

    /// Configuration file operations
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Arguments shared by every request subcommand.
#[derive(Debug, Args)]
pub struct CallArgs {
    /// API path relative to the root URL (e.g., "app/list")
    pub path: String,

    /// Timeout in milliseconds (defaults to api.timeout_ms)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_ms: Option<u64>,

    /// Return a 401 as data instead of failing
    #[arg(long)]
    pub prevent_auto_logout: bool,

    /// Write binary responses to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl CallArgs {
    /// Builds request options from the arguments.
    pub fn options(&self) -> RequestOptions {
        let mut options = RequestOptions::new().prevent_auto_logout(self.prevent_auto_logout);
        if let Some(ms) = self.timeout_ms {
            options = options.timeout_ms(ms);
        }
        options
    }
}

/// Arguments for subcommands carrying a JSON body.
#[derive(Debug, Args)]
pub struct BodyArgs {
    #[command(flatten)]
    pub call: CallArgs,

    /// JSON request body
    #[arg(short, long, conflicts_with = "data_file")]
    pub data: Option<String>,

    /// Read the JSON request body from a file
    #[arg(long)]
    pub data_file: Option<PathBuf>,
}

/// Arguments for the `post` subcommand.
#[derive(Debug, Args)]
pub struct PostArgs {
    #[command(flatten)]
    pub body: BodyArgs,

    /// Multipart text field (key=value, repeatable)
    #[arg(long, value_parser = parse_field, conflicts_with_all = ["data", "data_file"])]
    pub form: Vec<(String, String)>,

    /// Multipart file field (key=path, repeatable)
    #[arg(long, value_parser = parse_field, conflicts_with_all = ["data", "data_file"])]
    pub file: Vec<(String, String)>,
}

impl PostArgs {
    /// Returns true if the request is sent as a multipart form.
    pub fn is_multipart(&self) -> bool {
        !self.form.is_empty() || !self.file.is_empty()
    }
}

/// Configuration subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Validate the configuration file
    Validate,

    /// Show the current configuration
    Show,
}

/// Parse a `key=value` pair.
fn parse_field(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("Invalid field '{}'. Expected key=value", s)),
    }
}
