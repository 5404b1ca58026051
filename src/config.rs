use rocket::figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE_PATH: &str = "/api";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub cors: CorsConfig,
    pub api: ApiConfig,
    pub token: TokenConfig,
    pub session: SessionConfig,
    pub auth_action: AuthActionConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub address: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub json_format: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    pub base_path: String,
    pub enable_swagger: bool,
}

/// Settings for API token issuance.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TokenConfig {
    /// How many freshly generated token strings `issue` tries before giving up with a conflict.
    pub max_issue_attempts: u32,
}

/// Settings for user sessions.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    /// TTL used when a client opens a session without asking for one.
    pub default_ttl_seconds: i64,
    pub max_open_attempts: u32,
}

/// Where the auth action endpoint sends the browser.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthActionConfig {
    pub login_url: String,
    pub signup_url: String,
    /// Largest request body the action endpoint reads; anything bigger is an internal failure.
    pub max_body_bytes: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/auth_api_db".to_string(),
            max_connections: 16,
            min_connections: 1,
            acquire_timeout: 5,
            run_migrations: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            address: "127.0.0.1".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            allow_credentials: false,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_API_BASE_PATH.to_string(),
            enable_swagger: true,
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self { max_issue_attempts: 3 }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_ttl_seconds: 14 * 24 * 60 * 60,
            max_open_attempts: 3,
        }
    }
}

impl Default for AuthActionConfig {
    fn default() -> Self {
        Self {
            login_url: "/auth/login".to_string(),
            signup_url: "/auth/register".to_string(),
            max_body_bytes: 2_621_440,
        }
    }
}

impl Config {
    /// Load configuration from multiple sources in priority order:
    /// 1. AuthApi.toml (base configuration file)
    /// 2. Environment variables (prefixed with AUTH_API_)
    /// 3. DATABASE_URL environment variable
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    fn figment() -> Figment {
        Figment::new()
            .merge(rocket::figment::providers::Serialized::defaults(Config::default()))
            .merge(Toml::file("AuthApi.toml").nested())
            .merge(Env::prefixed("AUTH_API_").split("__"))
            .merge(Env::raw().only(&["DATABASE_URL"]).map(|_| "database.url".into()))
    }
}
