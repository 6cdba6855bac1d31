use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Signing secret used when none is configured. Only acceptable locally.
pub const DEV_JWT_SECRET: &str = "catharsis-admin-secret-key";

/// Runtime configuration.
///
/// Layered, later wins: built-in defaults, an optional `catharsis.toml`,
/// `CATHARSIS_<SECTION>__<KEY>` variables, then the plain deployment
/// variables (`MONGODB_URI`, `JWT_SECRET`, `AWS_S3_BUCKET`, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public site origin allowed by CORS.
    pub frontend_url: String,
    /// Admin console origin allowed by CORS.
    pub admin_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub uri: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    /// Custom S3-compatible endpoint (MinIO, LocalStack).
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Overrides the virtual-hosted S3 URL handed out for uploads.
    #[serde(default)]
    pub public_url: Option<String>,
}

impl StorageConfig {
    /// Base URL that object keys are appended to.
    pub fn public_base_url(&self) -> String {
        match &self.public_url {
            Some(url) if !url.trim().is_empty() => url.trim_end_matches('/').to_string(),
            _ => format!("https://{}.s3.{}.amazonaws.com", self.bucket, self.region),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder(File::with_name("catharsis").required(false))?
            .build()?
            .try_deserialize()
    }

    fn builder(
        file: File<config::FileSourceFile, config::FileFormat>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let env = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 4000)?
            .set_default("server.frontend_url", "http://localhost:3000")?
            .set_default("server.admin_url", "http://localhost:5001")?
            .set_default("database.uri", "mongodb://localhost:27017")?
            .set_default("database.name", "catharsis")?
            .set_default("auth.jwt_secret", DEV_JWT_SECRET)?
            .set_default("auth.token_ttl_hours", 24)?
            .set_default("storage.bucket", "catharsis-image")?
            .set_default("storage.region", "ap-northeast-2")?
            .add_source(file)
            .add_source(Environment::with_prefix("CATHARSIS").separator("__"))
            .set_override_option("server.port", env("PORT"))?
            .set_override_option("server.frontend_url", env("FRONTEND_URL"))?
            .set_override_option("server.admin_url", env("ADMIN_URL"))?
            .set_override_option("database.uri", env("MONGODB_URI"))?
            .set_override_option("database.name", env("MONGODB_DATABASE"))?
            .set_override_option("auth.jwt_secret", env("JWT_SECRET"))?
            .set_override_option("storage.bucket", env("AWS_S3_BUCKET"))?
            .set_override_option("storage.region", env("AWS_REGION"))?
            .set_override_option("storage.endpoint", env("S3_ENDPOINT"))?
            .set_override_option("storage.public_url", env("S3_PUBLIC_URL"))
    }

    /// Whether the token signing secret is still the built-in development value.
    pub fn uses_dev_secret(&self) -> bool {
        self.auth.jwt_secret == DEV_JWT_SECRET
    }
}
