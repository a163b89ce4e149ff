use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub http: HttpConfig,
    pub log: LogConfig,
    pub auth: AuthConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// One of debug, info, warning, error.
    pub level: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC key shared with the token issuer.
    pub sign_key: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("sign_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Server URI; its path is replaced by `name`. `memory://` selects the in-process store.
    pub uri: String,
    pub name: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // HTTP overrides
        if let Ok(v) = env::var("HTTP_HOST") {
            self.http.host = v;
        }
        if let Ok(v) = env::var("HTTP_PORT") {
            self.http.port = v.parse().unwrap_or(self.http.port);
        }
        if let Ok(v) = env::var("HTTP_REQUEST_TIMEOUT_SECS") {
            self.http.request_timeout_secs = v.parse().unwrap_or(self.http.request_timeout_secs);
        }
        if let Ok(v) = env::var("HTTP_SHUTDOWN_TIMEOUT_SECS") {
            self.http.shutdown_timeout_secs = v.parse().unwrap_or(self.http.shutdown_timeout_secs);
        }

        // Logging overrides
        if let Ok(v) = env::var("LOG_LEVEL") {
            self.log.level = v;
        }

        // Auth overrides
        if let Ok(v) = env::var("AUTH_SIGN_KEY") {
            self.auth.sign_key = v;
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.uri = v;
        }
        if let Ok(v) = env::var("DATABASE_NAME") {
            self.database.name = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        self
    }

    /// `host:port` the server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.http.host, self.http.port)
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            http: HttpConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                request_timeout_secs: 30,
                shutdown_timeout_secs: 10,
            },
            log: LogConfig {
                level: "debug".to_string(),
            },
            auth: AuthConfig {
                sign_key: "changeme".to_string(),
            },
            database: DatabaseConfig {
                uri: "postgres://localhost:5432".to_string(),
                name: "notify_prefs".to_string(),
                max_connections: 10,
                connection_timeout: 10,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            log: LogConfig {
                level: "info".to_string(),
            },
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
                ..Self::development().database
            },
            ..Self::development()
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            http: HttpConfig {
                request_timeout_secs: 10,
                shutdown_timeout_secs: 30,
                ..Self::development().http
            },
            log: LogConfig {
                level: "info".to_string(),
            },
            // No usable default key outside development.
            auth: AuthConfig {
                sign_key: String::new(),
            },
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
                ..Self::development().database
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.auth.sign_key, "changeme");
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.log.level, "info");
        assert!(config.auth.sign_key.is_empty());
        assert_eq!(config.database.max_connections, 50);
        assert_eq!(config.database.name, "notify_prefs");
    }

    #[test]
    fn test_sign_key_is_redacted() {
        let config = AppConfig::development();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("changeme"));
        assert!(printed.contains("<redacted>"));
    }
}
