//! In-memory storage for testing and development
//!
//! [`InMemoryShopStore`] plays the relational store (shops, opening hours,
//! products and the `search_shops` function); [`InMemoryShopIndex`] plays the
//! text-search index. Both use `RwLock` for thread-safe access.

use crate::core::filter::ShopQuery;
use crate::core::model::{OpeningHoursShop, Product, Shop, ShopInput};
use crate::core::query::{Page, PageRequest};
use crate::core::search::{DateRange, SearchQuery};
use crate::core::service::{ProductRepository, ShopIndex, ShopRepository, ShopSearchFunction};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// A write performed against the in-memory store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    SaveShop(i64),
    DeleteShop(i64),
    SaveProduct(i64),
}

#[derive(Debug, Clone)]
struct ShopRow {
    name: String,
    in_vacations: bool,
    created_at: NaiveDate,
    opening_hours: Vec<OpeningHoursShop>,
}

#[derive(Default)]
struct StoreState {
    shops: BTreeMap<i64, ShopRow>,
    products: BTreeMap<i64, Product>,
    last_shop_id: i64,
    last_product_id: i64,
    journal: Vec<WriteOp>,
}

impl StoreState {
    fn materialize(&self, id: i64, row: &ShopRow) -> Shop {
        let nb_products = self
            .products
            .values()
            .filter(|p| p.shop_id == Some(id))
            .count() as i64;

        Shop {
            id,
            name: row.name.clone(),
            in_vacations: row.in_vacations,
            created_at: row.created_at,
            opening_hours: row.opening_hours.clone(),
            nb_products,
        }
    }

    fn all_shops(&self) -> Vec<Shop> {
        self.shops
            .iter()
            .map(|(id, row)| self.materialize(*id, row))
            .collect()
    }
}

/// In-memory relational store
///
/// Ids are generated sequentially starting at 1. Every write is recorded in
/// a journal, readable through [`InMemoryShopStore::journal`].
#[derive(Clone, Default)]
pub struct InMemoryShopStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryShopStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))
    }

    /// Create a product, optionally attached to a shop
    pub fn add_product(&self, name: &str, shop_id: Option<i64>) -> Result<Product> {
        let mut state = self.write()?;
        if let Some(shop_id) = shop_id {
            if !state.shops.contains_key(&shop_id) {
                return Err(anyhow!("Shop {} does not exist", shop_id));
            }
        }

        state.last_product_id += 1;
        let product = Product {
            id: state.last_product_id,
            name: name.to_string(),
            shop_id,
        };
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    /// Get a product by id
    pub fn product(&self, id: i64) -> Result<Option<Product>> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    /// Writes performed so far, in order
    pub fn journal(&self) -> Result<Vec<WriteOp>> {
        Ok(self.read()?.journal.clone())
    }
}

#[async_trait]
impl ShopRepository for InMemoryShopStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Shop>> {
        let state = self.read()?;
        Ok(state.shops.get(&id).map(|row| state.materialize(id, row)))
    }

    async fn save(&self, shop: ShopInput) -> Result<i64> {
        let mut state = self.write()?;

        let id = match shop.id {
            Some(id) => id,
            None => state.last_shop_id + 1,
        };
        state.last_shop_id = state.last_shop_id.max(id);

        let created_at = shop
            .created_at
            .or_else(|| state.shops.get(&id).map(|row| row.created_at))
            .unwrap_or_else(|| Utc::now().date_naive());

        state.shops.insert(
            id,
            ShopRow {
                name: shop.name,
                in_vacations: shop.in_vacations,
                created_at,
                opening_hours: shop.opening_hours,
            },
        );
        state.journal.push(WriteOp::SaveShop(id));

        Ok(id)
    }

    async fn delete_by_id(&self, id: i64) -> Result<()> {
        let mut state = self.write()?;
        if state.products.values().any(|p| p.shop_id == Some(id)) {
            return Err(anyhow!("Shop {} is still referenced by products", id));
        }
        state.shops.remove(&id);
        state.journal.push(WriteOp::DeleteShop(id));
        Ok(())
    }

    async fn find_page(&self, query: &ShopQuery, page: PageRequest) -> Result<Page<Shop>> {
        let mut shops = self.read()?.all_shops();

        match query {
            ShopQuery::Ordered(order) => shops.sort_by(|a, b| order.compare(a, b)),
            ShopQuery::Filtered(filter) => shops.retain(|s| filter.matches(s)),
        }

        Ok(Page::from_sorted(shops, page))
    }

    async fn find_ids_after(&self, after: Option<i64>, limit: usize) -> Result<Vec<i64>> {
        let state = self.read()?;
        let lower = after.map_or(i64::MIN, |a| a.saturating_add(1));
        Ok(state.shops.range(lower..).map(|(id, _)| *id).take(limit).collect())
    }

    async fn find_all_by_ids(&self, ids: &[i64]) -> Result<Vec<Shop>> {
        let state = self.read()?;
        Ok(ids
            .iter()
            .filter_map(|id| state.shops.get(id).map(|row| state.materialize(*id, row)))
            .collect())
    }
}

#[async_trait]
impl ProductRepository for InMemoryShopStore {
    async fn find_by_shop(&self, shop_id: i64) -> Result<Vec<Product>> {
        Ok(self
            .read()?
            .products
            .values()
            .filter(|p| p.shop_id == Some(shop_id))
            .cloned()
            .collect())
    }

    async fn save(&self, product: Product) -> Result<Product> {
        let mut state = self.write()?;
        state.last_product_id = state.last_product_id.max(product.id);
        state.products.insert(product.id, product.clone());
        state.journal.push(WriteOp::SaveProduct(product.id));
        Ok(product)
    }
}

#[async_trait]
impl ShopSearchFunction for InMemoryShopStore {
    /// Mirrors the SQL function: case-insensitive "contains" on the name,
    /// inclusive date bounds, results ordered by id
    async fn search_shops(
        &self,
        in_vacations: Option<bool>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        name: Option<&str>,
    ) -> Result<Vec<Shop>> {
        let needle = name.filter(|n| !n.is_empty()).map(str::to_lowercase);
        let range = DateRange::from_bounds(start_date, end_date);

        Ok(self
            .read()?
            .all_shops()
            .into_iter()
            .filter(|s| in_vacations.is_none_or(|v| s.in_vacations == v))
            .filter(|s| range.is_none_or(|r| r.contains(s.created_at)))
            .filter(|s| {
                needle
                    .as_deref()
                    .is_none_or(|n| s.name.to_lowercase().contains(n))
            })
            .collect())
    }
}

/// In-memory search index
///
/// Documents are snapshots of shops taken at indexing time; hits come back
/// in id order.
#[derive(Clone, Default)]
pub struct InMemoryShopIndex {
    documents: Arc<RwLock<BTreeMap<i64, Shop>>>,
}

impl InMemoryShopIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed documents
    pub fn len(&self) -> Result<usize> {
        Ok(self
            .documents
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?
            .len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl ShopIndex for InMemoryShopIndex {
    async fn execute(&self, query: &SearchQuery) -> Result<Vec<Shop>> {
        let matcher = query.compile()?;
        let documents = self
            .documents
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(documents
            .values()
            .filter(|s| matcher.matches(s))
            .take(query.max_hits)
            .cloned()
            .collect())
    }

    async fn index(&self, shops: &[Shop]) -> Result<()> {
        let mut documents = self
            .documents
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;
        for shop in shops {
            documents.insert(shop.id, shop.clone());
        }
        Ok(())
    }

    async fn remove(&self, id: i64) -> Result<()> {
        self.documents
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?
            .remove(&id);
        Ok(())
    }

    async fn purge(&self) -> Result<()> {
        self.documents
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?
            .clear();
        Ok(())
    }
}
