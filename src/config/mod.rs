use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// JWT secret used when running in development without `JWT_SECRET`.
/// Staging and production refuse to sign or verify tokens without one.
const DEVELOPMENT_JWT_SECRET: &str = "spraycare-development-secret";

const MB: usize = 1024 * 1024;

/// Upper bound on token lifetime, whatever `SECURITY_JWT_EXPIRY_HOURS` says
const MAX_JWT_EXPIRY_HOURS: u64 = 24 * 365;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    fn from_env() -> Self {
        match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        }
    }
}

/// Where documents live. Development defaults to the in-process store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(StoreBackend::Postgres),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub url: Option<String>,
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub default_page_size: i64,
    pub max_page_size: i64,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub cors_origins: Vec<String>,
    /// Log every policy denial at warn level instead of debug
    pub enable_audit_logging: bool,
}

impl SecurityConfig {
    /// Token lifetime in hours, clamped into `1..=MAX_JWT_EXPIRY_HOURS`
    pub fn token_lifetime_hours(&self) -> i64 {
        self.jwt_expiry_hours.clamp(1, MAX_JWT_EXPIRY_HOURS) as i64
    }
}

/// Optional super admin created at startup when both values are present
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut config = Self::defaults(Environment::from_env());
        config.apply_env();
        config
    }

    /// Per-environment defaults before any variable is read
    fn defaults(environment: Environment) -> Self {
        let (backend, max_connections, connection_timeout) = match environment {
            Environment::Development => (StoreBackend::Memory, 10, 30),
            Environment::Staging => (StoreBackend::Postgres, 20, 10),
            Environment::Production => (StoreBackend::Postgres, 50, 5),
        };
        let (max_page_size, max_request_size_bytes) = match environment {
            Environment::Development => (1000, 10 * MB),
            Environment::Staging => (500, 5 * MB),
            Environment::Production => (100, 2 * MB),
        };
        let (jwt_secret, jwt_expiry_hours, cors_origins) = match environment {
            Environment::Development => (
                DEVELOPMENT_JWT_SECRET.to_string(),
                24 * 7,
                vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            ),
            Environment::Staging => (String::new(), 24, vec!["https://staging.totalspraycare.com".to_string()]),
            Environment::Production => (String::new(), 12, vec!["https://app.totalspraycare.com".to_string()]),
        };

        Self {
            environment,
            database: DatabaseConfig { backend, url: None, max_connections, connection_timeout },
            api: ApiConfig { port: 3000, default_page_size: 20, max_page_size, max_request_size_bytes },
            security: SecurityConfig {
                jwt_secret,
                jwt_expiry_hours,
                cors_origins,
                enable_audit_logging: environment != Environment::Development,
            },
            bootstrap: BootstrapConfig::default(),
        }
    }

    fn apply_env(&mut self) {
        self.database.url = non_empty("DATABASE_URL").or(self.database.url.take());
        override_from_env("STORE_BACKEND", &mut self.database.backend);
        override_from_env("DATABASE_MAX_CONNECTIONS", &mut self.database.max_connections);
        override_from_env("DATABASE_CONNECTION_TIMEOUT", &mut self.database.connection_timeout);

        override_from_env("PORT", &mut self.api.port);
        override_from_env("API_DEFAULT_PAGE_SIZE", &mut self.api.default_page_size);
        override_from_env("API_MAX_PAGE_SIZE", &mut self.api.max_page_size);
        override_from_env("API_MAX_REQUEST_SIZE_BYTES", &mut self.api.max_request_size_bytes);

        if let Some(secret) = non_empty("JWT_SECRET") {
            self.security.jwt_secret = secret;
        }
        override_from_env("SECURITY_JWT_EXPIRY_HOURS", &mut self.security.jwt_expiry_hours);
        override_from_env("SECURITY_ENABLE_AUDIT_LOGGING", &mut self.security.enable_audit_logging);
        if let Some(origins) = non_empty("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }

        self.bootstrap.admin_email = non_empty("SEED_ADMIN_EMAIL");
        self.bootstrap.admin_password = non_empty("SEED_ADMIN_PASSWORD");
    }

    /// Clamp a requested page size into `1..=max_page_size`
    pub fn page_size(&self, requested: Option<i64>) -> i64 {
        requested
            .unwrap_or(self.api.default_page_size)
            .clamp(1, self.api.max_page_size.max(1))
    }
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Replace `target` with the parsed variable; unparsable values keep the default
fn override_from_env<T>(name: &str, target: &mut T)
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = non_empty(name) else { return };
    match raw.trim().parse() {
        Ok(value) => *target = value,
        Err(e) => tracing::warn!("Ignoring {}={:?}: {}", name, raw, e),
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_development {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Development)
    };
}
