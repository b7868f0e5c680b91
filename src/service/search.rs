//! Shop search over a pluggable backend

use crate::core::error::{ShopAppResult, StorageError};
use crate::core::model::Shop;
use crate::core::search::{SearchCriteria, SearchParams, build_search_query};
use crate::core::service::{SearchBackend, ShopIndex, ShopSearchFunction};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Search through a text index with a hard hit cap
pub struct IndexSearchBackend {
    index: Arc<dyn ShopIndex>,
    max_hits: usize,
}

impl IndexSearchBackend {
    pub fn new(index: Arc<dyn ShopIndex>, max_hits: usize) -> Self {
        Self { index, max_hits }
    }
}

#[async_trait]
impl SearchBackend for IndexSearchBackend {
    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<Shop>> {
        // One extra hit tells a full result set apart from a truncated one
        let query = build_search_query(criteria, self.max_hits.saturating_add(1));
        let mut hits = self.index.execute(&query).await?;

        if hits.len() > self.max_hits {
            hits.truncate(self.max_hits);
            tracing::debug!(max_hits = self.max_hits, "search results truncated");
        }

        Ok(hits)
    }
}

/// Delegate the whole search to a stored function
pub struct StoreFunctionSearchBackend {
    function: Arc<dyn ShopSearchFunction>,
}

impl StoreFunctionSearchBackend {
    pub fn new(function: Arc<dyn ShopSearchFunction>) -> Self {
        Self { function }
    }
}

#[async_trait]
impl SearchBackend for StoreFunctionSearchBackend {
    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<Shop>> {
        self.function
            .search_shops(
                criteria.in_vacations,
                criteria.start_date,
                criteria.end_date,
                criteria.name.as_deref(),
            )
            .await
    }
}

#[derive(Clone)]
pub struct ShopSearchService {
    backend: Arc<dyn SearchBackend>,
}

impl ShopSearchService {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self { backend }
    }

    /// Parse the raw parameters and run the search
    pub async fn search_shops(&self, params: SearchParams) -> ShopAppResult<Vec<Shop>> {
        let criteria = params.into_criteria()?;
        tracing::debug!(?criteria, "searching shops");

        self.backend
            .search(&criteria)
            .await
            .map_err(StorageError::wrap("search shops"))
    }
}
