//! # Shop App
//!
//! A shop management backend: CRUD over shops with their weekly opening
//! hours, a paginated listing with sorting and date/vacation filters, and an
//! attribute search served either by a text index or by a stored function.
//!
//! ## Features
//!
//! - **Validated mutations**: overlapping or inverted opening hours are rejected before any write
//! - **Listing precedence**: a sort key wins over filters, filters over the default id order
//! - **Pluggable search**: index query with a hard hit cap, or stored-function pass-through
//! - **Startup indexing**: batched, bounded-concurrency rebuild of the search index
//! - **Storage backends**: in-memory by default, PostgreSQL behind the `postgres` feature
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shopapp::prelude::*;
//!
//! let app = ServerBuilder::new()
//!     .with_config(AppConfig::default())
//!     .with_collaborators(Collaborators::in_memory(
//!         InMemoryShopStore::new(),
//!         InMemoryShopIndex::new(),
//!     ))
//!     .build()?;
//! ```

pub mod config;
pub mod core;
pub mod server;
pub mod service;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    pub use crate::config::{AppConfig, SearchBackendKind};
    pub use crate::core::{
        OpeningHoursShop, Page, PageRequest, PaginatedResponse, Product, ProductRepository,
        SearchBackend, SearchCriteria, SearchParams, Shop, ShopAppError, ShopAppResult,
        ShopIndex, ShopInput, ShopListParams, ShopRepository, ShopSearchFunction,
    };
    pub use crate::server::{AppState, Collaborators, ServerBuilder};
    pub use crate::service::{
        IndexingReport, MassIndexer, ShopSearchService, ShopService, UpsertMode,
    };
    pub use crate::storage::{InMemoryShopIndex, InMemoryShopStore};

    #[cfg(feature = "postgres")]
    pub use crate::storage::PgShopRepository;
}
