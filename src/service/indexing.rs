//! Startup rebuild of the search index
//!
//! The indexer purges the index, pages through every shop id, then loads and
//! indexes batches of shops with bounded concurrency. Any failure aborts the
//! whole run.

use crate::config::IndexingConfig;
use crate::core::service::{ShopIndex, ShopRepository};
use futures::{StreamExt, TryStreamExt, stream};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexingError {
    #[error("Mass indexing failed during {operation}: {source}")]
    Backend {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Indexing batch starting at shop {first_id} timed out after {seconds}s")]
    Timeout { first_id: i64, seconds: u64 },
}

impl IndexingError {
    fn backend(operation: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| IndexingError::Backend { operation, source }
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexingReport {
    pub shops_indexed: usize,
    pub batches: usize,
}

pub struct MassIndexer {
    shops: Arc<dyn ShopRepository>,
    index: Arc<dyn ShopIndex>,
    config: IndexingConfig,
}

impl MassIndexer {
    pub fn new(
        shops: Arc<dyn ShopRepository>,
        index: Arc<dyn ShopIndex>,
        config: IndexingConfig,
    ) -> Self {
        Self {
            shops,
            index,
            config,
        }
    }

    /// Rebuild the whole index and wait for completion
    pub async fn start_and_wait(&self) -> Result<IndexingReport, IndexingError> {
        tracing::info!(
            workers = self.config.threads_to_load_objects,
            batch_size = self.config.batch_size_to_load_objects,
            "Starting mass indexing..."
        );

        match self.run().await {
            Ok(report) => {
                tracing::info!(
                    shops = report.shops_indexed,
                    batches = report.batches,
                    "Mass indexing completed successfully"
                );
                Ok(report)
            }
            Err(e) => {
                tracing::error!(error = %e, "Mass indexing failed");
                Err(e)
            }
        }
    }

    async fn run(&self) -> Result<IndexingReport, IndexingError> {
        self.index
            .purge()
            .await
            .map_err(IndexingError::backend("purge index"))?;

        let ids = self.collect_ids().await?;
        let batch_size = self.config.batch_size_to_load_objects.max(1);
        let workers = self.config.threads_to_load_objects.max(1);

        let batches: Vec<Vec<i64>> = ids.chunks(batch_size).map(<[i64]>::to_vec).collect();
        let batch_count = batches.len();

        let shops_indexed = stream::iter(batches)
            .map(|batch| self.index_batch(batch))
            .buffer_unordered(workers)
            .try_fold(0usize, |total, n| async move { Ok(total + n) })
            .await?;

        Ok(IndexingReport {
            shops_indexed,
            batches: batch_count,
        })
    }

    async fn collect_ids(&self) -> Result<Vec<i64>, IndexingError> {
        let fetch_size = self.config.id_fetch_size.max(1);
        let mut ids = Vec::new();
        let mut after = None;

        loop {
            let chunk = self
                .shops
                .find_ids_after(after, fetch_size)
                .await
                .map_err(IndexingError::backend("fetch shop ids"))?;
            let done = chunk.len() < fetch_size;
            after = chunk.last().copied().or(after);
            ids.extend(chunk);
            if done {
                break;
            }
        }

        tracing::debug!(count = ids.len(), "collected shop ids");
        Ok(ids)
    }

    async fn index_batch(&self, ids: Vec<i64>) -> Result<usize, IndexingError> {
        let first_id = ids.first().copied().unwrap_or_default();
        let work = async {
            let shops = self
                .shops
                .find_all_by_ids(&ids)
                .await
                .map_err(IndexingError::backend("load shops"))?;
            self.index
                .index(&shops)
                .await
                .map_err(IndexingError::backend("index shops"))?;
            Ok::<_, IndexingError>(shops.len())
        };

        let seconds = self.config.transaction_timeout_secs;
        if seconds == 0 {
            return work.await;
        }

        tokio::time::timeout(Duration::from_secs(seconds), work)
            .await
            .map_err(|_| IndexingError::Timeout { first_id, seconds })?
    }
}
