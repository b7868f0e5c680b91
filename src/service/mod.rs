//! Shop services: listing, mutations, search and startup indexing

pub mod indexing;
pub mod search;
pub mod shops;

pub use indexing::{IndexingError, IndexingReport, MassIndexer};
pub use search::{IndexSearchBackend, ShopSearchService, StoreFunctionSearchBackend};
pub use shops::{ShopService, UpsertMode};
