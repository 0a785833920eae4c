// src/config.rs

use std::env;
use std::str::FromStr;

use dotenvy::dotenv;

const DEFAULT_JWT_SECRET: &str = "secret";

/// Deployment environment. Controls whether internal error details reach clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub cors_origins: Vec<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let environment = env::var("APP_ENV")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(Environment::Development);

        let port = parse_or("PORT", 8080);

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://blog.db?mode=rwc".to_string());

        let database_max_connections = parse_or("DATABASE_MAX_CONNECTIONS", 5);

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| DEFAULT_JWT_SECRET.to_string());

        // 30 days
        let jwt_expiration = parse_or("JWT_EXPIRATION", 60 * 60 * 24 * 30);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| {
                vec![
                    "http://localhost:3000".to_string(),
                    "http://127.0.0.1:3000".to_string(),
                ]
            });

        Self {
            environment,
            port,
            database_url,
            database_max_connections,
            jwt_secret,
            jwt_expiration,
            rust_log,
            cors_origins,
            admin_email: env::var("ADMIN_EMAIL").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
        }
    }

    /// Configuration suitable for tests: in-memory database, fixed secret.
    pub fn for_tests() -> Self {
        Self {
            environment: Environment::Test,
            port: 0,
            database_url: "sqlite::memory:".to_string(),
            database_max_connections: 1,
            jwt_secret: "test_secret_for_integration_tests".to_string(),
            jwt_expiration: 600,
            rust_log: "error".to_string(),
            cors_origins: Vec::new(),
            admin_email: None,
            admin_password: None,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Returns the list of configuration problems. Empty means the config is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.is_production() && self.jwt_secret == DEFAULT_JWT_SECRET {
            issues.push("JWT_SECRET is using the default value in production".to_string());
        }
        if self.database_url.trim().is_empty() {
            issues.push("DATABASE_URL is required".to_string());
        }
        if self.database_max_connections == 0 {
            issues.push("DATABASE_MAX_CONNECTIONS must be at least 1".to_string());
        }

        issues
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!("Invalid value for {}: '{}', using default", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}
