use std::env;

const DEFAULT_CORS_ORIGINS: &[&str] = &["https://meatsystem-79b63.web.app", "http://localhost:3000"];

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let cors_origins = env::var("CORS_ORIGINS")
            .ok()
            .map(|raw| parse_origins(&raw))
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect());
        Ok(Self {
            port,
            database_url,
            jwt_secret,
            host,
            cors_origins,
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}
