use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Upstream mapping provider (OpenRouteService).
#[derive(Debug, Clone, Deserialize)]
pub struct MappingConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// `None` runs the server on in-memory stores.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub jwt: JwtConfig,
    pub mapping: MappingConfig,
    pub host: String,
    pub port: u16,
    pub cors_origin: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = non_empty_var("DATABASE_URL");
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "freightflow".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "freightflow-users".into()),
            ttl_minutes: parsed_var("JWT_TTL_MINUTES").unwrap_or(60),
        };
        let mapping = MappingConfig {
            base_url: std::env::var("ORS_BASE_URL")
                .unwrap_or_else(|_| "https://api.openrouteservice.org".into()),
            api_key: non_empty_var("ORS_API_KEY"),
            timeout_secs: parsed_var("MAPPING_TIMEOUT_SECS").unwrap_or(10),
        };
        Ok(Self {
            database_url,
            max_connections: parsed_var("DATABASE_MAX_CONNECTIONS").unwrap_or(10),
            jwt,
            mapping,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parsed_var("APP_PORT").unwrap_or(5000),
            cors_origin: non_empty_var("CORS_ORIGIN"),
        })
    }

    /// Local-only configuration for tests.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: None,
            max_connections: 1,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 60,
            },
            mapping: MappingConfig {
                base_url: "http://127.0.0.1:9".into(),
                api_key: None,
                timeout_secs: 1,
            },
            host: "127.0.0.1".into(),
            port: 0,
            cors_origin: None,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
