//! Collaborator traits
//!
//! The shop services talk to the outside world only through these traits:
//! a relational store ([`ShopRepository`], [`ProductRepository`]) and a
//! search side, either a text index ([`ShopIndex`]) or a stored function
//! ([`ShopSearchFunction`]), both hidden behind [`SearchBackend`].
//! Implementations return `anyhow::Result`; the services wrap failures into
//! typed errors while keeping the original cause.

use crate::core::filter::ShopQuery;
use crate::core::model::{Product, Shop, ShopInput};
use crate::core::query::{Page, PageRequest};
use crate::core::search::{SearchCriteria, SearchQuery};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Persistence of shops
///
/// Returned shops always carry their opening hours and product count.
#[async_trait]
pub trait ShopRepository: Send + Sync {
    /// Get a shop by id
    async fn find_by_id(&self, id: i64) -> Result<Option<Shop>>;

    /// Insert (no id, or an unknown id) or overwrite a shop, returning its id
    ///
    /// Opening hours are replaced as a whole. An absent `created_at` keeps
    /// the stored date, or defaults to today on insert.
    async fn save(&self, shop: ShopInput) -> Result<i64>;

    /// Delete a shop row and its opening hours
    async fn delete_by_id(&self, id: i64) -> Result<()>;

    /// Run one listing query and return the requested page
    async fn find_page(&self, query: &ShopQuery, page: PageRequest) -> Result<Page<Shop>>;

    /// Ids greater than `after`, ascending, at most `limit`
    async fn find_ids_after(&self, after: Option<i64>, limit: usize) -> Result<Vec<i64>>;

    /// Load several shops at once; unknown ids are skipped
    async fn find_all_by_ids(&self, ids: &[i64]) -> Result<Vec<Shop>>;
}

/// Persistence of the products attached to shops
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Products whose shop reference is `shop_id`
    async fn find_by_shop(&self, shop_id: i64) -> Result<Vec<Product>>;

    /// Persist one product
    async fn save(&self, product: Product) -> Result<Product>;
}

/// A text-search index over shops
#[async_trait]
pub trait ShopIndex: Send + Sync {
    /// Run a structured query, returning at most `query.max_hits` shops
    async fn execute(&self, query: &SearchQuery) -> Result<Vec<Shop>>;

    /// Add or replace documents
    async fn index(&self, shops: &[Shop]) -> Result<()>;

    /// Remove one document (no-op when absent)
    async fn remove(&self, id: i64) -> Result<()>;

    /// Drop every document
    async fn purge(&self) -> Result<()>;
}

/// A server-side function performing the whole search
#[async_trait]
pub trait ShopSearchFunction: Send + Sync {
    /// Same four inputs as the search endpoint, passed through unchanged
    async fn search_shops(
        &self,
        in_vacations: Option<bool>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        name: Option<&str>,
    ) -> Result<Vec<Shop>>;
}

/// The single entry point of shop search, whatever executes it
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<Shop>>;
}
