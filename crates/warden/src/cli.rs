//! Command-line interface of the `warden` binary.
//!
//! Every flag except `--config` overrides a value from the configuration
//! file.

use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;

/// Command line arguments parsed from user input.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for `[proxy] id`
    pub proxy_id: Option<String>,
    /// Optional override for `[database] url`
    pub database_url: Option<String>,
    /// Optional override for `[redis] url`
    pub redis_url: Option<String>,
    /// Optional override for the log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
}

impl CliArgs {
    pub fn parse() -> Self {
        Self::parse_from(std::env::args_os())
    }

    pub fn parse_from<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = Self::command().get_matches_from(args);

        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("config.toml")),
            proxy_id: matches.get_one::<String>("proxy-id").cloned(),
            database_url: matches.get_one::<String>("database-url").cloned(),
            redis_url: matches.get_one::<String>("redis-url").cloned(),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
        }
    }

    fn command() -> Command {
        Command::new("Warden")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Moderation and cross-proxy coordination for Minecraft proxy networks")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path")
                    .default_value("config.toml"),
            )
            .arg(
                Arg::new("proxy-id")
                    .long("proxy-id")
                    .value_name("ID")
                    .help("Identifier of this proxy within the network"),
            )
            .arg(
                Arg::new("database-url")
                    .long("database-url")
                    .value_name("URL")
                    .help("Database URL (mysql://, mariadb:// or sqlite://)"),
            )
            .arg(
                Arg::new("redis-url")
                    .long("redis-url")
                    .value_name("URL")
                    .help("Redis URL enabling cross-proxy features"),
            )
            .arg(
                Arg::new("log-level")
                    .short('l')
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("Log level (trace, debug, info, warn, error)"),
            )
            .arg(
                Arg::new("json-logs")
                    .long("json-logs")
                    .help("Output logs in JSON format")
                    .action(ArgAction::SetTrue),
            )
    }
}
