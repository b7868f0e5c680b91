use anyhow::{Context, Result};
use shopapp::config::AppConfig;
use shopapp::server::{Collaborators, ServerBuilder};
use shopapp::service::MassIndexer;
use shopapp::storage::{InMemoryShopIndex, InMemoryShopStore};

/// Configuration file: first argument, then `SHOPAPP_CONFIG`, else defaults
fn load_config() -> Result<AppConfig> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SHOPAPP_CONFIG").ok());

    match path {
        Some(path) => AppConfig::from_yaml_file(&path)
            .with_context(|| format!("Failed to load configuration from {}", path)),
        None => {
            tracing::info!("No configuration file given, using defaults");
            Ok(AppConfig::default())
        }
    }
}

#[cfg(feature = "postgres")]
async fn connect(config: &AppConfig, index: InMemoryShopIndex) -> Result<Collaborators> {
    use shopapp::storage::{PgShopRepository, ensure_schema};
    use sqlx::postgres::PgPoolOptions;

    let Some(url) = config.database.url.as_deref() else {
        return Ok(Collaborators::in_memory(InMemoryShopStore::new(), index));
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(url)
        .await
        .context("Failed to connect to PostgreSQL")?;
    ensure_schema(&pool).await?;
    tracing::info!("Using PostgreSQL storage");

    Ok(Collaborators::postgres(PgShopRepository::new(pool), index))
}

#[cfg(not(feature = "postgres"))]
async fn connect(config: &AppConfig, index: InMemoryShopIndex) -> Result<Collaborators> {
    if config.database.url.is_some() {
        tracing::warn!("database.url is set but the postgres feature is disabled");
    }
    Ok(Collaborators::in_memory(InMemoryShopStore::new(), index))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shopapp=info,tower_http=info".into()),
        )
        .init();

    let config = load_config()?;
    let collaborators = connect(&config, InMemoryShopIndex::new()).await?;

    if config.indexing.enabled {
        MassIndexer::new(
            collaborators.shops.clone(),
            collaborators.index.clone(),
            config.indexing.clone(),
        )
        .start_and_wait()
        .await
        .context("Startup indexing failed")?;
    }

    ServerBuilder::new()
        .with_config(config)
        .with_collaborators(collaborators)
        .serve()
        .await
}
