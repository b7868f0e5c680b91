//! ServerBuilder for fluent API to build HTTP servers

use super::handlers::AppState;
use super::router::{build_shop_routes, health_routes};
use crate::config::{AppConfig, SearchBackendKind};
use crate::core::service::{
    ProductRepository, SearchBackend, ShopIndex, ShopRepository, ShopSearchFunction,
};
use crate::service::{
    IndexSearchBackend, ShopSearchService, ShopService, StoreFunctionSearchBackend,
};
use crate::storage::{InMemoryShopIndex, InMemoryShopStore};
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// The storage side of the application
#[derive(Clone)]
pub struct Collaborators {
    pub shops: Arc<dyn ShopRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub index: Arc<dyn ShopIndex>,
    pub search_function: Arc<dyn ShopSearchFunction>,
}

impl Collaborators {
    /// Everything backed by one in-memory store and index
    pub fn in_memory(store: InMemoryShopStore, index: InMemoryShopIndex) -> Self {
        let store = Arc::new(store);
        Self {
            shops: store.clone(),
            products: store.clone(),
            index: Arc::new(index),
            search_function: store,
        }
    }

    /// PostgreSQL for shops and products, with an in-process index
    #[cfg(feature = "postgres")]
    pub fn postgres(repo: crate::storage::PgShopRepository, index: InMemoryShopIndex) -> Self {
        let repo = Arc::new(repo);
        Self {
            shops: repo.clone(),
            products: repo.clone(),
            index: Arc::new(index),
            search_function: repo,
        }
    }
}

/// Builder for the shop HTTP server
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_config(config)
///     .with_collaborators(Collaborators::in_memory(store, index))
///     .build()?;
/// ```
pub struct ServerBuilder {
    config: AppConfig,
    collaborators: Option<Collaborators>,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder with default configuration
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            collaborators: None,
            custom_routes: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the storage collaborators (required)
    pub fn with_collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = Some(collaborators);
        self
    }

    /// Add custom routes to the server
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Wire the services according to the configuration
    pub fn build_state(&self) -> Result<AppState> {
        let c = self.collaborators.as_ref().ok_or_else(|| {
            anyhow::anyhow!("Storage is required. Call .with_collaborators()")
        })?;

        let shops = ShopService::new(c.shops.clone(), c.products.clone())
            .with_index(c.index.clone())
            .with_pagination(self.config.pagination.clone());

        let backend: Arc<dyn SearchBackend> = match self.config.search.backend {
            SearchBackendKind::Index => Arc::new(IndexSearchBackend::new(
                c.index.clone(),
                self.config.search.max_hits,
            )),
            SearchBackendKind::StoreFunction => {
                Arc::new(StoreFunctionSearchBackend::new(c.search_function.clone()))
            }
        };
        tracing::debug!(backend = ?self.config.search.backend, "search backend selected");

        Ok(AppState {
            shops,
            search: ShopSearchService::new(backend),
        })
    }

    /// Build the final router with health, shop and custom routes
    pub fn build(mut self) -> Result<Router> {
        let state = self.build_state()?;

        let mut app = health_routes().merge(build_shop_routes(state));
        for custom_router in std::mem::take(&mut self.custom_routes) {
            app = app.merge(custom_router);
        }

        Ok(app.layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        ))
    }

    /// Serve the application with graceful shutdown
    ///
    /// Binds to `server.host:server.port` from the configuration and stops on
    /// SIGTERM or Ctrl+C.
    pub async fn serve(self) -> Result<()> {
        let addr = self.config.server.address();
        let app = self.build()?;
        let listener = TcpListener::bind(&addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for Ctrl+C or SIGTERM
///
/// A handler that cannot be installed never fires; the other one still does.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
