use std::{net::SocketAddr, path::PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

use crate::store::StoreConfig;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "conn-history",
    about = "Per-connection usage history store",
    version = crate::version::VERSION,
    disable_help_subcommand = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub config: Config,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve Add/GetList over HTTP (default).
    Run,

    /// Append one interval to a connection's history.
    Add(AddArgs),

    /// Print every recorded history as JSON.
    List,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    #[arg(long, value_name = "ID")]
    pub connection_id: String,

    #[arg(long, value_name = "ID", default_value = "")]
    pub user_id: String,

    /// Layout: "Mon Jan 2 15:04:05 MST 2006".
    #[arg(long, value_name = "TIMESTAMP")]
    pub start_date: String,

    /// Layout: "Mon Jan 2 15:04:05 MST 2006".
    #[arg(long, value_name = "TIMESTAMP")]
    pub end_date: String,
}

#[derive(Args, Debug, Clone)]
pub struct Config {
    #[arg(
        long,
        global = true,
        env = "CONN_HISTORY_BIND",
        value_name = "ADDR",
        default_value = "127.0.0.1:62480"
    )]
    pub bind: SocketAddr,

    /// Path of the database file.
    #[arg(
        long,
        global = true,
        env = "CONN_HISTORY_CONNECTION_STRING",
        value_name = "PATH",
        default_value = "history.db"
    )]
    pub connection_string: String,

    /// Bucket the history records live in.
    #[arg(
        long,
        global = true,
        env = "CONN_HISTORY_DATABASE_NAME",
        value_name = "NAME",
        default_value = "history"
    )]
    pub database_name: String,

    /// JSON file with `{"ConnectionString", "DatabaseName"}`; overrides the
    /// two flags above.
    #[arg(
        long,
        global = true,
        env = "CONN_HISTORY_CONFIG_FILE",
        value_name = "PATH"
    )]
    pub config_file: Option<PathBuf>,
}

impl Config {
    pub fn store_config(&self) -> anyhow::Result<StoreConfig> {
        let Some(path) = self.config_file.as_ref() else {
            return Ok(StoreConfig {
                connection_string: self.connection_string.clone(),
                database_name: self.database_name.clone(),
            });
        };

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?;
        let config = StoreConfig::from_json(&text)
            .with_context(|| format!("parse {}", path.display()))?;
        Ok(config)
    }
}
