use actix_cors::Cors;
use actix_web::{middleware::Compress, web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use blogdesk::config::{AppConfig, IdentityBackend};
use blogdesk::identity::{inmem::InMemIdentityProvider, IdentityProvider, RestIdentityProvider};
use blogdesk::openapi::ApiDoc;
use blogdesk::rate_limit::{RateLimitConfig, RateLimiter};
use blogdesk::repo::Repo;
use blogdesk::routes::{self, config, AppState};
use blogdesk::security::SecurityHeaders;
use blogdesk::session::{SessionCache, SessionListener, SessionStore};
use blogdesk::storage::build_object_store;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env automatically only in debug builds to reduce manual setup overhead.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    info!("Bootstrapping blogdesk");
    let cfg = AppConfig::from_env();
    validate_config(&cfg)?;
    info!("Frontend URL: {}", cfg.frontend_url);

    let repo = build_repo(&cfg).await?;
    let identity: Arc<dyn IdentityProvider> = match &cfg.identity {
        IdentityBackend::Hosted { api_key, endpoint } => {
            info!("Using hosted identity provider at {endpoint}");
            Arc::new(RestIdentityProvider::new(endpoint, api_key))
        }
        IdentityBackend::InMemory => {
            warn!("IDENTITY_API_KEY not set; accounts live in process memory only");
            Arc::new(InMemIdentityProvider::new())
        }
    };
    let assets = build_object_store(&cfg.storage).await.context("object store unavailable")?;

    let session = SessionStore::new();
    let cache = SessionCache::new(cfg.session_cache_path.clone());
    let listener = SessionListener::start(session.clone(), identity.clone(), cache.clone());

    let state = AppState {
        repo,
        assets,
        identity,
        session,
        cache,
        rate_limiter: Some(RateLimiter::new(RateLimitConfig::from_env())),
        reset_continue_url: Some(cfg.reset_continue_url.clone()),
    };

    let openapi = ApiDoc::openapi();
    info!("OpenAPI spec generated");
    let frontend_url = cfg.frontend_url.clone();
    let image_origin = cfg.storage.public_origin();

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_url)
            .allow_any_header()
            .allowed_methods(["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(SecurityHeaders::from_env().with_image_origin(image_origin.clone()))
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .configure(config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", openapi.clone()))
            .default_service(web::route().to(routes::not_found))
    })
    .bind((cfg.bind_addr.as_str(), cfg.port))?;

    info!("Listening on http://{}:{}", cfg.bind_addr, cfg.port);

    let result = server.run().await;
    listener.shutdown();
    result?;
    Ok(())
}

#[cfg(all(feature = "inmem-store", not(feature = "postgres-store")))]
async fn build_repo(cfg: &AppConfig) -> anyhow::Result<Arc<dyn Repo>> {
    info!("Using in-memory repository backend ({})", cfg.data_dir.display());
    Ok(Arc::new(blogdesk::repo::inmem::InMemRepo::open(&cfg.data_dir)))
}

#[cfg(feature = "postgres-store")]
async fn build_repo(cfg: &AppConfig) -> anyhow::Result<Arc<dyn Repo>> {
    use sqlx::postgres::PgPoolOptions;
    let db_url = cfg.database_url.as_deref().context("DATABASE_URL must be set for postgres-store")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect_lazy(db_url)
        .context("failed to create Pg pool")?;
    let repo = blogdesk::repo::pg::PgRepo::new(pool);
    repo.migrate().await?;
    info!("Using Postgres repository backend");
    Ok(Arc::new(repo))
}

/// Reject settings that cannot work before anything connects.
fn validate_config(cfg: &AppConfig) -> anyhow::Result<()> {
    if cfg.storage.bucket.is_empty() {
        anyhow::bail!("S3_BUCKET must not be empty");
    }
    if !cfg.storage.endpoint.starts_with("http://") && !cfg.storage.endpoint.starts_with("https://") {
        anyhow::bail!("S3_ENDPOINT must be an http(s) URL, got '{}'", cfg.storage.endpoint);
    }
    if let IdentityBackend::Hosted { api_key, .. } = &cfg.identity {
        if api_key.trim().is_empty() {
            anyhow::bail!("IDENTITY_API_KEY is set but empty");
        }
    }
    if cfg.storage.access_key.is_empty() || cfg.storage.secret_key.is_empty() {
        warn!("S3_ACCESS_KEY/S3_SECRET_KEY not set; falling back to the default credential chain");
    }
    Ok(())
}
