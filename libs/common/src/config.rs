//! Listen address and CORS configuration for the HTTP services

use serde::Deserialize;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::error::ConfigError;

/// Address an HTTP service binds to
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// Load the listen address from `<PREFIX>_HOST` and `<PREFIX>_PORT`
    ///
    /// Falls back to `0.0.0.0` and `default_port`.
    pub fn from_env(prefix: &str, default_port: u16) -> Result<Self, ConfigError> {
        let settings = ::config::Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", i64::from(default_port))?
            .add_source(::config::Environment::with_prefix(prefix).try_parsing(true))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// `host:port` string accepted by `TcpListener::bind`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Origins of the bundled frontend
pub const DEFAULT_CORS_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://127.0.0.1:8080"];

/// Browser origins allowed to call the services with credentials
#[derive(Debug, Clone, PartialEq)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
        }
    }
}

impl CorsConfig {
    /// Read `CORS_ALLOWED_ORIGINS`, a comma separated list of origins
    ///
    /// Falls back to the frontend origins when the variable is unset.
    pub fn from_env() -> Self {
        match std::env::var("CORS_ALLOWED_ORIGINS") {
            Ok(value) => Self {
                allowed_origins: value
                    .split(',')
                    .map(|origin| origin.trim().trim_end_matches('/'))
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect(),
            },
            Err(_) => Self::default(),
        }
    }

    /// Whether a request `Origin` header value is in the allow list
    pub fn allows(&self, origin: &[u8]) -> bool {
        self.allowed_origins
            .iter()
            .any(|allowed| allowed.as_bytes() == origin)
    }

    /// CORS layer for a router
    ///
    /// Credentials are allowed, so methods and headers mirror the preflight
    /// request instead of using wildcards.
    pub fn layer(&self) -> CorsLayer {
        let config = self.clone();
        CorsLayer::new()
            .allow_origin(AllowOrigin::predicate(move |origin, _| {
                config.allows(origin.as_bytes())
            }))
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_server_config_defaults() {
        unsafe {
            std::env::remove_var("PLANNERTEST_HOST");
            std::env::remove_var("PLANNERTEST_PORT");
        }

        let config = ServerConfig::from_env("PLANNERTEST", 3001).unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:3001");
    }

    #[test]
    #[serial]
    fn test_server_config_from_env() {
        unsafe {
            std::env::set_var("PLANNERTEST_HOST", "127.0.0.1");
            std::env::set_var("PLANNERTEST_PORT", "8080");
        }

        let config = ServerConfig::from_env("PLANNERTEST", 3001).unwrap();
        assert_eq!(
            config,
            ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            }
        );

        unsafe {
            std::env::remove_var("PLANNERTEST_HOST");
            std::env::remove_var("PLANNERTEST_PORT");
        }
    }

    #[test]
    #[serial]
    fn test_server_config_rejects_bad_port() {
        unsafe {
            std::env::set_var("PLANNERTEST_PORT", "not-a-port");
        }

        assert!(ServerConfig::from_env("PLANNERTEST", 3001).is_err());

        unsafe {
            std::env::remove_var("PLANNERTEST_PORT");
        }
    }

    #[test]
    #[serial]
    fn test_cors_config_defaults_to_frontend_origins() {
        unsafe {
            std::env::remove_var("CORS_ALLOWED_ORIGINS");
        }

        let config = CorsConfig::from_env();
        assert_eq!(config, CorsConfig::default());
        assert!(config.allows(b"http://localhost:3000"));
        assert!(config.allows(b"http://127.0.0.1:8080"));
        assert!(!config.allows(b"http://localhost:3001"));
        assert!(!config.allows(b"https://evil.example"));
    }

    #[test]
    #[serial]
    fn test_cors_config_from_env() {
        unsafe {
            std::env::set_var(
                "CORS_ALLOWED_ORIGINS",
                " https://planner.example/ ,,http://localhost:5173",
            );
        }

        let config = CorsConfig::from_env();
        assert_eq!(
            config.allowed_origins,
            vec!["https://planner.example", "http://localhost:5173"]
        );
        assert!(config.allows(b"https://planner.example"));
        assert!(!config.allows(b"http://localhost:3000"));

        unsafe {
            std::env::remove_var("CORS_ALLOWED_ORIGINS");
        }
    }
}
