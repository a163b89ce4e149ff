use clap::Parser;

use crate::config::AppConfig;

/// Command-line flags. Each one falls back to its environment variable; a
/// flag left unset keeps the value from the environment preset.
#[derive(Debug, Default, Parser)]
#[command(name = "notify-prefs")]
#[command(about = "Notification preferences API server")]
#[command(version)]
pub struct Cli {
    #[arg(long = "http.host", env = "HTTP_HOST", help = "Address to bind")]
    pub http_host: Option<String>,

    #[arg(long = "http.port", env = "HTTP_PORT", help = "Port to listen on")]
    pub http_port: Option<u16>,

    #[arg(
        long = "log.level",
        env = "LOG_LEVEL",
        value_parser = ["debug", "info", "warning", "error"],
        help = "Log level"
    )]
    pub log_level: Option<String>,

    #[arg(
        long = "auth.signkey",
        env = "AUTH_SIGN_KEY",
        hide_env_values = true,
        help = "HMAC key used to verify access tokens"
    )]
    pub auth_sign_key: Option<String>,

    #[arg(long = "database.uri", env = "DATABASE_URL", help = "Database server URI")]
    pub database_uri: Option<String>,

    #[arg(long = "database.name", env = "DATABASE_NAME", help = "Database name")]
    pub database_name: Option<String>,
}

impl Cli {
    /// Layer the flags over `config`.
    pub fn apply(self, mut config: AppConfig) -> AppConfig {
        if let Some(v) = self.http_host {
            config.http.host = v;
        }
        if let Some(v) = self.http_port {
            config.http.port = v;
        }
        if let Some(v) = self.log_level {
            config.log.level = v;
        }
        if let Some(v) = self.auth_sign_key {
            config.auth.sign_key = v;
        }
        if let Some(v) = self.database_uri {
            config.database.uri = v;
        }
        if let Some(v) = self.database_name {
            config.database.name = v;
        }
        config
    }
}

/// `tracing` filter directive for a configured level name.
pub fn filter_directive(level: &str) -> &'static str {
    match level {
        "error" => "error",
        "warning" | "warn" => "warn",
        "info" => "info",
        _ => "debug",
    }
}
