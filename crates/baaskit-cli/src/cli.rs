//! CLI argument definitions using clap

use baaskit_user::{Filter, Scope};
use clap::{Args, Parser, Subcommand};
use serde_json::Value as JsonValue;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "baaskit",
    about = "baaskit - account operations against a BaasBox server",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Client configuration file (YAML or JSON)
    #[arg(long, env = "BAASKIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Where the session is kept between runs; overrides the configuration
    #[arg(long, env = "BAASKIT_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// Priority of the submitted request; higher runs first
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub priority: i32,

    /// Output format
    #[arg(long, value_enum, default_value = "pretty")]
    pub format: OutputFormat,

    /// Disable colored output
    #[arg(long, help = "Disable colored output")]
    pub no_color: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Create an account and log in as it
    Signup {
        username: String,
        #[arg(long, env = "BAASKIT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Log in with username and password
    Login {
        username: String,
        #[arg(long, env = "BAASKIT_PASSWORD", hide_env_values = true)]
        password: String,
        /// Register this device for push notifications (`OS:DEVICE_ID`)
        #[arg(long)]
        device: Option<String>,
    },

    /// Log out the current user
    Logout {
        /// Push registration to drop along with the session
        #[arg(long)]
        registration: Option<String>,
    },

    /// Show the current user
    Whoami,

    /// Fetch a profile (the current user's when omitted)
    Fetch { user: Option<String> },

    /// List users
    Users {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// List followers of a user (the current user's when omitted)
    Followers {
        user: Option<String>,
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// List users followed by a user (the current user's when omitted)
    Following {
        user: Option<String>,
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Follow a user
    Follow { user: String },

    /// Stop following a user
    Unfollow { user: String },

    /// Change the current user's password
    ChangePassword {
        #[arg(long, env = "BAASKIT_NEW_PASSWORD", hide_env_values = true)]
        new_password: String,
    },

    /// Ask the server to mail a password reset link
    ResetPassword { user: String },

    /// Replace one visibility scope of the current user's profile
    Save {
        /// private, friend, registered or public
        #[arg(long)]
        scope: Scope,
        /// JSON object stored under the scope
        #[arg(long)]
        data: String,
    },
}

/// Server-side filtering for list commands
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct FilterArgs {
    /// Condition evaluated by the server, with `?` placeholders
    #[arg(long = "where")]
    pub where_clause: Option<String>,
    /// Value bound to the next `?` placeholder
    #[arg(long = "param")]
    pub params: Vec<String>,
    #[arg(long)]
    pub order_by: Option<String>,
    #[arg(long)]
    pub page: Option<u32>,
    #[arg(long)]
    pub per_page: Option<u32>,
    #[arg(long)]
    pub skip: Option<u32>,
}

impl From<FilterArgs> for Filter {
    fn from(args: FilterArgs) -> Self {
        Filter {
            where_clause: args.where_clause,
            params: args.params,
            order_by: args.order_by,
            page: args.page,
            records_per_page: args.per_page,
            skip: args.skip,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    Pretty,
    /// Compact JSON
    Json,
    /// YAML format
    Yaml,
}

impl OutputFormat {
    /// Format a JSON value according to the output format
    pub fn format_json(&self, value: &JsonValue) -> Result<String, serde_json::Error> {
        match self {
            Self::Pretty => serde_json::to_string_pretty(value),
            Self::Json => serde_json::to_string(value),
            Self::Yaml => serde_yaml::to_string(value).map_err(|e| {
                serde_json::Error::io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("YAML serialization error: {}", e),
                ))
            }),
        }
    }
}
