use std::path::PathBuf;

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// S3 / MinIO settings for the image object store.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    /// Origin + prefix under which objects are publicly readable; defaults to `{endpoint}/{bucket}`.
    pub public_base_url: Option<String>,
}

impl StorageConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: env_or("S3_ENDPOINT", "http://localhost:9000"),
            bucket: env_or("S3_BUCKET", "blog-assets"),
            region: env_or("S3_REGION", "us-east-1"),
            access_key: std::env::var("S3_ACCESS_KEY").unwrap_or_default(),
            secret_key: std::env::var("S3_SECRET_KEY").unwrap_or_default(),
            public_base_url: std::env::var("S3_PUBLIC_URL").ok(),
        }
    }

    pub fn public_origin(&self) -> String {
        let base = self
            .public_base_url
            .clone()
            .unwrap_or_else(|| self.endpoint.clone());
        match base.find("://") {
            Some(idx) => {
                let after = &base[idx + 3..];
                let host_end = after.find('/').map(|i| idx + 3 + i).unwrap_or(base.len());
                base[..host_end].to_string()
            }
            None => base,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdentityBackend {
    /// Hosted identity toolkit REST API.
    Hosted { api_key: String, endpoint: String },
    /// Local accounts kept in process memory (development only).
    InMemory,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub port: u16,
    pub frontend_url: String,
    pub data_dir: PathBuf,
    pub session_cache_path: PathBuf,
    pub database_url: Option<String>,
    pub identity: IdentityBackend,
    pub storage: StorageConfig,
    /// Passed to the provider as the continue URL of password reset emails.
    pub reset_continue_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let data_dir = PathBuf::from(env_or("BLOGDESK_DATA_DIR", "data"));
        let session_cache_path = std::env::var("SESSION_CACHE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("session.json"));
        let frontend_url = env_or("FRONTEND_URL", "http://localhost:5173");
        let identity = match std::env::var("IDENTITY_API_KEY") {
            Ok(api_key) if !api_key.is_empty() => IdentityBackend::Hosted {
                api_key,
                endpoint: env_or("IDENTITY_ENDPOINT", "https://identitytoolkit.googleapis.com/v1"),
            },
            _ => IdentityBackend::InMemory,
        };
        Self {
            bind_addr: env_or("BIND_ADDR", "127.0.0.1"),
            port: std::env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8080),
            reset_continue_url: format!("{}/", frontend_url.trim_end_matches('/')),
            frontend_url,
            data_dir,
            session_cache_path,
            database_url: std::env::var("DATABASE_URL").ok(),
            identity,
            storage: StorageConfig::from_env(),
        }
    }
}
