//! Shop listing and mutations

use crate::config::PaginationConfig;
use crate::core::error::{EntityError, ShopAppResult, StorageError, ValidationError};
use crate::core::filter::{ShopQuery, resolve_shop_query};
use crate::core::model::{Product, Shop, ShopInput};
use crate::core::query::{Page, ShopListParams};
use crate::core::service::{ProductRepository, ShopIndex, ShopRepository};
use crate::core::validation::validate_opening_hours;
use std::sync::Arc;
use validator::Validate;

/// Precondition of [`ShopService::upsert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertMode {
    /// Always insert a new shop; a supplied id is ignored
    Create,
    /// Overwrite a shop that must already exist
    RequireExisting,
}

/// Orchestrates shop listing, lookup and mutations
///
/// When an index is attached, every saved shop is (re)indexed and every
/// deleted shop is removed from it. Index failures are logged and never undo
/// a committed store write; the startup reindex repairs the index.
#[derive(Clone)]
pub struct ShopService {
    shops: Arc<dyn ShopRepository>,
    products: Arc<dyn ProductRepository>,
    index: Option<Arc<dyn ShopIndex>>,
    pagination: PaginationConfig,
}

impl ShopService {
    pub fn new(shops: Arc<dyn ShopRepository>, products: Arc<dyn ProductRepository>) -> Self {
        Self {
            shops,
            products,
            index: None,
            pagination: PaginationConfig::default(),
        }
    }

    /// Keep `index` in sync with mutations
    pub fn with_index(mut self, index: Arc<dyn ShopIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_pagination(mut self, pagination: PaginationConfig) -> Self {
        self.pagination = pagination;
        self
    }

    /// List shops: sort key first, then filters, then id order
    pub async fn list_shops(&self, params: &ShopListParams) -> ShopAppResult<Page<Shop>> {
        let query = resolve_shop_query(params)?;
        let page = params.page_request(&self.pagination);

        match &query {
            ShopQuery::Ordered(order) => {
                tracing::debug!(?order, page = page.page, size = page.size, "listing shops")
            }
            ShopQuery::Filtered(filter) => {
                tracing::debug!(filter = filter.name(), page = page.page, size = page.size, "listing shops")
            }
        }

        self.shops
            .find_page(&query, page)
            .await
            .map_err(StorageError::wrap("list shops"))
    }

    pub async fn get_shop(&self, id: i64) -> ShopAppResult<Shop> {
        self.shops
            .find_by_id(id)
            .await
            .map_err(StorageError::wrap("load shop"))?
            .ok_or_else(|| EntityError::shop_not_found(id).into())
    }

    pub async fn create_shop(&self, input: ShopInput) -> ShopAppResult<Shop> {
        self.upsert(input, UpsertMode::Create).await
    }

    pub async fn update_shop(&self, input: ShopInput) -> ShopAppResult<Shop> {
        self.upsert(input, UpsertMode::RequireExisting).await
    }

    /// Validate, check the precondition, persist, then reload the shop
    ///
    /// Nothing is written when validation or the precondition fails. The
    /// returned shop is read back from the store, so generated and derived
    /// fields (id, creation date, product count) are populated.
    pub async fn upsert(&self, mut input: ShopInput, mode: UpsertMode) -> ShopAppResult<Shop> {
        input.validate()?;
        if let Err(e) = validate_opening_hours(&input.opening_hours) {
            tracing::warn!(error = %e, "rejected opening hours");
            return Err(e.into());
        }

        match mode {
            UpsertMode::Create => input.id = None,
            UpsertMode::RequireExisting => {
                let id = input.id.ok_or_else(|| ValidationError::MissingArgument {
                    argument: "id".to_string(),
                })?;
                self.get_shop(id).await?;
            }
        }

        let id = self
            .shops
            .save(input)
            .await
            .map_err(StorageError::wrap("save shop"))?;
        let shop = self.get_shop(id).await?;

        if let Some(index) = &self.index {
            if let Err(e) = index.index(std::slice::from_ref(&shop)).await {
                tracing::warn!(shop_id = id, error = %e, "shop saved but not indexed");
            }
        }

        tracing::info!(shop_id = id, ?mode, "shop saved");
        Ok(shop)
    }

    /// Delete a shop after detaching its products one by one
    ///
    /// If a detach or the final delete fails, the products detached so far
    /// are attached back before the error is returned. A failure to drop the
    /// shop from the index is only logged.
    pub async fn delete_shop(&self, id: i64) -> ShopAppResult<()> {
        self.get_shop(id).await?;

        let products = self
            .products
            .find_by_shop(id)
            .await
            .map_err(StorageError::wrap("load shop products"))?;

        let mut detached = Vec::with_capacity(products.len());
        for product in products {
            let mut orphan = product.clone();
            orphan.shop_id = None;
            if let Err(e) = self.products.save(orphan).await {
                self.reattach(detached).await;
                return Err(StorageError::wrap("detach product")(e));
            }
            detached.push(product);
        }

        if let Err(e) = self.shops.delete_by_id(id).await {
            self.reattach(detached).await;
            return Err(StorageError::wrap("delete shop")(e));
        }

        if let Some(index) = &self.index {
            if let Err(e) = index.remove(id).await {
                tracing::warn!(shop_id = id, error = %e, "shop deleted but still indexed");
            }
        }

        tracing::info!(shop_id = id, detached = detached.len(), "shop deleted");
        Ok(())
    }

    async fn reattach(&self, products: Vec<Product>) {
        for product in products {
            let product_id = product.id;
            if let Err(e) = self.products.save(product).await {
                tracing::error!(product_id, error = %e, "failed to reattach product");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ShopAppError;
    use crate::core::filter::ShopQuery;
    use crate::core::model::OpeningHoursShop;
    use crate::core::query::PageRequest;
    use crate::core::search::{SearchCriteria, SearchQuery, build_search_query};
    use crate::storage::in_memory::{InMemoryShopIndex, InMemoryShopStore, WriteOp};
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveTime};

    /// Index whose every call fails
    struct OfflineIndex;

    #[async_trait]
    impl ShopIndex for OfflineIndex {
        async fn execute(&self, _query: &SearchQuery) -> Result<Vec<Shop>> {
            Err(anyhow!("index offline"))
        }

        async fn index(&self, _shops: &[Shop]) -> Result<()> {
            Err(anyhow!("index offline"))
        }

        async fn remove(&self, _id: i64) -> Result<()> {
            Err(anyhow!("index offline"))
        }

        async fn purge(&self) -> Result<()> {
            Err(anyhow!("index offline"))
        }
    }

    /// Shop store that cannot delete
    struct LockedShops(InMemoryShopStore);

    #[async_trait]
    impl ShopRepository for LockedShops {
        async fn find_by_id(&self, id: i64) -> Result<Option<Shop>> {
            self.0.find_by_id(id).await
        }

        async fn save(&self, shop: ShopInput) -> Result<i64> {
            ShopRepository::save(&self.0, shop).await
        }

        async fn delete_by_id(&self, _id: i64) -> Result<()> {
            Err(anyhow!("shops table locked"))
        }

        async fn find_page(&self, query: &ShopQuery, page: PageRequest) -> Result<Page<Shop>> {
            self.0.find_page(query, page).await
        }

        async fn find_ids_after(&self, after: Option<i64>, limit: usize) -> Result<Vec<i64>> {
            self.0.find_ids_after(after, limit).await
        }

        async fn find_all_by_ids(&self, ids: &[i64]) -> Result<Vec<Shop>> {
            self.0.find_all_by_ids(ids).await
        }
    }

    fn t(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn service() -> (ShopService, InMemoryShopStore, InMemoryShopIndex) {
        let store = InMemoryShopStore::new();
        let index = InMemoryShopIndex::new();
        let service = ShopService::new(Arc::new(store.clone()), Arc::new(store.clone()))
            .with_index(Arc::new(index.clone()));
        (service, store, index)
    }

    #[tokio::test]
    async fn test_create_returns_reloaded_shop() {
        let (service, _, _) = service();
        let shop = service
            .create_shop(
                ShopInput::new("Bakery")
                    .with_hours(OpeningHoursShop::new(1, t(9), t(12)))
                    .with_hours(OpeningHoursShop::new(1, t(13), t(17))),
            )
            .await
            .unwrap();

        assert_eq!(shop.id, 1);
        assert_eq!(shop.opening_hours.len(), 2);
        assert_eq!(shop.nb_products, 0);
    }

    #[tokio::test]
    async fn test_create_ignores_supplied_id() {
        let (service, _, _) = service();
        service.create_shop(ShopInput::new("First")).await.unwrap();
        let second = service
            .create_shop(ShopInput::new("Second").with_id(1))
            .await
            .unwrap();
        assert_eq!(second.id, 2);
        assert_eq!(service.get_shop(1).await.unwrap().name, "First");
    }

    #[tokio::test]
    async fn test_create_with_overlapping_hours_writes_nothing() {
        let (service, store, _) = service();
        let err = service
            .create_shop(
                ShopInput::new("Overlap")
                    .with_hours(OpeningHoursShop::new(1, t(9), t(12)))
                    .with_hours(OpeningHoursShop::new(1, t(11), t(14))),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ShopAppError::Validation(ValidationError::OverlappingHours { day: 1, .. })
        ));
        assert!(store.journal().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_missing_shop_fails_without_writes() {
        let (service, store, _) = service();
        let err = service
            .update_shop(ShopInput::new("Ghost").with_id(42))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ShopAppError::Entity(EntityError::NotFound { id: 42, .. })
        ));
        assert!(store.journal().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_without_id_is_rejected() {
        let (service, _, _) = service();
        let err = service.update_shop(ShopInput::new("No id")).await.unwrap_err();
        assert!(matches!(
            err,
            ShopAppError::Validation(ValidationError::MissingArgument { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_existing_overwrites_and_reindexes() {
        let (service, _, index) = service();
        let created = service
            .create_shop(ShopInput::new("Old name").created_at(d("2024-01-01")))
            .await
            .unwrap();

        let updated = service
            .update_shop(
                ShopInput::new("New name")
                    .with_id(created.id)
                    .in_vacations(true),
            )
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "New name");
        assert!(updated.in_vacations);
        assert_eq!(updated.created_at, d("2024-01-01"));

        let hits = index
            .execute(&build_search_query(
                &SearchCriteria {
                    name: Some("New".to_string()),
                    ..Default::default()
                },
                10,
            ))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_detaches_every_product_before_removing_shop() {
        let (service, store, index) = service();
        let shop = service.create_shop(ShopInput::new("Doomed")).await.unwrap();
        let p1 = store.add_product("a", Some(shop.id)).unwrap();
        let p2 = store.add_product("b", Some(shop.id)).unwrap();
        let p3 = store.add_product("c", Some(shop.id)).unwrap();

        service.delete_shop(shop.id).await.unwrap();

        let journal = store.journal().unwrap();
        assert_eq!(
            journal,
            vec![
                WriteOp::SaveShop(shop.id),
                WriteOp::SaveProduct(p1.id),
                WriteOp::SaveProduct(p2.id),
                WriteOp::SaveProduct(p3.id),
                WriteOp::DeleteShop(shop.id),
            ]
        );
        for p in [p1, p2, p3] {
            assert_eq!(store.product(p.id).unwrap().unwrap().shop_id, None);
        }
        assert!(index.is_empty().unwrap());
        assert!(matches!(
            service.get_shop(shop.id).await,
            Err(ShopAppError::Entity(EntityError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_delete_missing_shop_fails_without_writes() {
        let (service, store, _) = service();
        let err = service.delete_shop(9).await.unwrap_err();
        assert_eq!(err.to_string(), "Shop with id 9 not found");
        assert!(store.journal().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_sort_ignores_filters() {
        let (service, _, _) = service();
        for (name, vac) in [("Zulu", true), ("Alpha", false), ("Mike", true)] {
            service
                .create_shop(ShopInput::new(name).in_vacations(vac))
                .await
                .unwrap();
        }

        let page = service
            .list_shops(&ShopListParams {
                sort_by: Some("name".to_string()),
                in_vacations: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        let names: Vec<&str> = page.items.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Mike", "Zulu"]);
    }

    #[tokio::test]
    async fn test_list_with_bad_date_is_validation_error() {
        let (service, _, _) = service();
        let err = service
            .list_shops(&ShopListParams {
                created_before: Some("31/12/2024".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DATE");
    }

    #[tokio::test]
    async fn test_index_failure_does_not_fail_committed_writes() {
        let store = InMemoryShopStore::new();
        let service = ShopService::new(Arc::new(store.clone()), Arc::new(store.clone()))
            .with_index(Arc::new(OfflineIndex));

        let shop = service.create_shop(ShopInput::new("Ghost")).await.unwrap();
        assert_eq!(service.get_shop(shop.id).await.unwrap().name, "Ghost");

        service
            .update_shop(ShopInput::new("Renamed").with_id(shop.id))
            .await
            .unwrap();
        service.delete_shop(shop.id).await.unwrap();

        assert_eq!(
            store.journal().unwrap(),
            vec![
                WriteOp::SaveShop(shop.id),
                WriteOp::SaveShop(shop.id),
                WriteOp::DeleteShop(shop.id),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_delete_reattaches_products() {
        let store = InMemoryShopStore::new();
        let service = ShopService::new(
            Arc::new(LockedShops(store.clone())),
            Arc::new(store.clone()),
        );
        let shop = service.create_shop(ShopInput::new("Kept")).await.unwrap();
        let p1 = store.add_product("a", Some(shop.id)).unwrap();
        let p2 = store.add_product("b", Some(shop.id)).unwrap();

        let err = service.delete_shop(shop.id).await.unwrap_err();
        assert_eq!(err.error_code(), "STORAGE_ERROR");

        for p in [p1, p2] {
            assert_eq!(store.product(p.id).unwrap().unwrap().shop_id, Some(shop.id));
        }
        assert_eq!(service.get_shop(shop.id).await.unwrap().nb_products, 2);
    }
}
