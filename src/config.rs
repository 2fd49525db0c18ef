use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub media: MediaConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "accounts".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "accounts-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
        };
        let media = MediaConfig {
            endpoint: std::env::var("MEDIA_ENDPOINT")?,
            bucket: std::env::var("MEDIA_BUCKET")?,
            access_key: std::env::var("MEDIA_ACCESS_KEY")?,
            secret_key: std::env::var("MEDIA_SECRET_KEY")?,
            region: std::env::var("MEDIA_REGION").unwrap_or_else(|_| "us-east-1".into()),
        };
        Ok(Self {
            database_url,
            jwt,
            media,
        })
    }
}
