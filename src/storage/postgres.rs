//! PostgreSQL storage backend using sqlx.
//!
//! Provides [`PgShopRepository`], which implements the shop, product and
//! search-function collaborators on top of a `sqlx::PgPool`.
//!
//! # Feature flag
//!
//! This module is gated behind the `postgres` feature flag.

use crate::core::filter::{ShopFilter, ShopOrder, ShopQuery};
use crate::core::model::{OpeningHoursShop, Product, Shop, ShopInput};
use crate::core::query::{Page, PageRequest};
use crate::core::service::{ProductRepository, ShopRepository, ShopSearchFunction};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Schema management
// ---------------------------------------------------------------------------

/// Apply the required tables and the search function (idempotent).
///
/// This creates:
/// - `shops`, `opening_hours` and `products` tables
/// - `search_shops(boolean, date, date, text)`, returning matching shop ids
///
/// Safe to call on every startup.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS shops (
            id BIGSERIAL PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            in_vacations BOOLEAN NOT NULL DEFAULT FALSE,
            created_at DATE NOT NULL DEFAULT CURRENT_DATE
        )",
    )
    .execute(pool)
    .await
    .map_err(|e| anyhow!("Failed to create shops table: {}", e))?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS opening_hours (
            id BIGSERIAL PRIMARY KEY,
            shop_id BIGINT NOT NULL REFERENCES shops(id) ON DELETE CASCADE,
            day BIGINT NOT NULL,
            open_at TIME NOT NULL,
            close_at TIME NOT NULL
        )",
    )
    .execute(pool)
    .await
    .map_err(|e| anyhow!("Failed to create opening_hours table: {}", e))?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_opening_hours_shop ON opening_hours (shop_id)")
        .execute(pool)
        .await
        .map_err(|e| anyhow!("Failed to create opening_hours index: {}", e))?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS products (
            id BIGSERIAL PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            shop_id BIGINT NULL REFERENCES shops(id)
        )",
    )
    .execute(pool)
    .await
    .map_err(|e| anyhow!("Failed to create products table: {}", e))?;

    sqlx::query(
        "CREATE OR REPLACE FUNCTION search_shops(
            p_in_vacations BOOLEAN,
            p_start_date DATE,
            p_end_date DATE,
            p_name TEXT
        ) RETURNS TABLE (id BIGINT)
        LANGUAGE sql STABLE AS $$
            SELECT s.id FROM shops s
            WHERE (p_in_vacations IS NULL OR s.in_vacations = p_in_vacations)
              AND (p_start_date IS NULL OR s.created_at >= p_start_date)
              AND (p_end_date IS NULL OR s.created_at <= p_end_date)
              AND (p_name IS NULL OR p_name = ''
                   OR s.name ILIKE '%' || replace(replace(replace(p_name, '\\', '\\\\'), '%', '\\%'), '_', '\\_') || '%' ESCAPE '\\')
            ORDER BY s.id
        $$",
    )
    .execute(pool)
    .await
    .map_err(|e| anyhow!("Failed to create search_shops function: {}", e))?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Query building
// ---------------------------------------------------------------------------

const SHOP_COLUMNS: &str = "SELECT s.id, s.name, s.in_vacations, s.created_at, \
     (SELECT COUNT(*) FROM products p WHERE p.shop_id = s.id) AS nb_products \
     FROM shops s";

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ShopFilter) {
    match *filter {
        ShopFilter::VacationsCreatedWithin {
            in_vacations,
            after,
            before,
        } => {
            qb.push(" WHERE s.in_vacations = ").push_bind(in_vacations);
            qb.push(" AND s.created_at > ").push_bind(after);
            qb.push(" AND s.created_at < ").push_bind(before);
        }
        ShopFilter::VacationsCreatedBefore {
            in_vacations,
            before,
        } => {
            qb.push(" WHERE s.in_vacations = ").push_bind(in_vacations);
            qb.push(" AND s.created_at < ").push_bind(before);
        }
        ShopFilter::VacationsCreatedAfter {
            in_vacations,
            after,
        } => {
            qb.push(" WHERE s.in_vacations = ").push_bind(in_vacations);
            qb.push(" AND s.created_at > ").push_bind(after);
        }
        ShopFilter::Vacations { in_vacations } => {
            qb.push(" WHERE s.in_vacations = ").push_bind(in_vacations);
        }
        ShopFilter::CreatedBetween { after, before } => {
            qb.push(" WHERE s.created_at BETWEEN ")
                .push_bind(after)
                .push(" AND ")
                .push_bind(before);
        }
        ShopFilter::CreatedBefore { before } => {
            qb.push(" WHERE s.created_at < ").push_bind(before);
        }
        ShopFilter::CreatedAfter { after } => {
            qb.push(" WHERE s.created_at > ").push_bind(after);
        }
    }
}

fn order_clause(order: ShopOrder) -> &'static str {
    match order {
        ShopOrder::Id => " ORDER BY s.id",
        ShopOrder::Name => " ORDER BY s.name, s.id",
        ShopOrder::CreatedAt => " ORDER BY s.created_at, s.id",
        ShopOrder::ProductCount => " ORDER BY nb_products, s.id",
    }
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn row_to_shop(row: &PgRow) -> Result<Shop> {
    Ok(Shop {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        in_vacations: row.try_get("in_vacations")?,
        created_at: row.try_get("created_at")?,
        opening_hours: Vec::new(),
        nb_products: row.try_get("nb_products")?,
    })
}

fn row_to_product(row: &PgRow) -> Result<Product> {
    Ok(Product {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        shop_id: row.try_get("shop_id")?,
    })
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

/// Shop, product and search-function storage backed by PostgreSQL.
///
/// Opening hours live in their own table and are replaced as a whole on
/// save; the product count is computed on read.
#[derive(Clone, Debug)]
pub struct PgShopRepository {
    pool: PgPool,
}

impl PgShopRepository {
    /// Create a new `PgShopRepository` with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create a product, optionally attached to a shop
    pub async fn add_product(&self, name: &str, shop_id: Option<i64>) -> Result<Product> {
        let row = sqlx::query(
            "INSERT INTO products (name, shop_id) VALUES ($1, $2) RETURNING id, name, shop_id",
        )
        .bind(name)
        .bind(shop_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| anyhow!("Failed to create product: {}", e))?;

        row_to_product(&row)
    }

    /// Run a shop select and attach opening hours to every row
    async fn fetch_shops(&self, mut qb: QueryBuilder<'_, Postgres>) -> Result<Vec<Shop>> {
        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| anyhow!("Failed to load shops: {}", e))?;

        let mut shops = rows.iter().map(row_to_shop).collect::<Result<Vec<_>>>()?;
        if shops.is_empty() {
            return Ok(shops);
        }

        let ids: Vec<i64> = shops.iter().map(|s| s.id).collect();
        let hour_rows = sqlx::query(
            "SELECT shop_id, day, open_at, close_at FROM opening_hours
             WHERE shop_id = ANY($1) ORDER BY shop_id, day, open_at",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!("Failed to load opening hours: {}", e))?;

        let mut hours: HashMap<i64, Vec<OpeningHoursShop>> = HashMap::new();
        for row in &hour_rows {
            let shop_id: i64 = row.try_get("shop_id")?;
            hours.entry(shop_id).or_default().push(OpeningHoursShop {
                day: row.try_get("day")?,
                open_at: row.try_get("open_at")?,
                close_at: row.try_get("close_at")?,
            });
        }

        for shop in &mut shops {
            shop.opening_hours = hours.remove(&shop.id).unwrap_or_default();
        }
        Ok(shops)
    }

    async fn count(&self, filter: Option<&ShopFilter>) -> Result<usize> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM shops s");
        if let Some(filter) = filter {
            push_filter(&mut qb, filter);
        }

        let total: i64 = qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| anyhow!("Failed to count shops: {}", e))?;
        Ok(usize::try_from(total).unwrap_or_default())
    }
}

#[async_trait]
impl ShopRepository for PgShopRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Shop>> {
        let mut qb = QueryBuilder::new(SHOP_COLUMNS);
        qb.push(" WHERE s.id = ").push_bind(id);
        Ok(self.fetch_shops(qb).await?.into_iter().next())
    }

    async fn save(&self, shop: ShopInput) -> Result<i64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| anyhow!("Failed to begin transaction: {}", e))?;

        let id: i64 = match shop.id {
            Some(id) => sqlx::query_scalar(
                "INSERT INTO shops (id, name, in_vacations, created_at)
                 VALUES ($1, $2, $3, COALESCE($4, CURRENT_DATE))
                 ON CONFLICT (id) DO UPDATE SET
                    name = EXCLUDED.name,
                    in_vacations = EXCLUDED.in_vacations,
                    created_at = COALESCE($4, shops.created_at)
                 RETURNING id",
            )
            .bind(id)
            .bind(&shop.name)
            .bind(shop.in_vacations)
            .bind(shop.created_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| anyhow!("Failed to save shop: {}", e))?,
            None => sqlx::query_scalar(
                "INSERT INTO shops (name, in_vacations, created_at)
                 VALUES ($1, $2, COALESCE($3, CURRENT_DATE))
                 RETURNING id",
            )
            .bind(&shop.name)
            .bind(shop.in_vacations)
            .bind(shop.created_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| anyhow!("Failed to insert shop: {}", e))?,
        };

        // Explicit ids bypass the sequence
        if shop.id.is_some() {
            sqlx::query(
                "SELECT setval(pg_get_serial_sequence('shops', 'id'),
                               GREATEST((SELECT MAX(id) FROM shops), 1))",
            )
            .execute(&mut *tx)
            .await
            .map_err(|e| anyhow!("Failed to advance shop id sequence: {}", e))?;
        }

        sqlx::query("DELETE FROM opening_hours WHERE shop_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| anyhow!("Failed to clear opening hours: {}", e))?;

        for hours in &shop.opening_hours {
            sqlx::query(
                "INSERT INTO opening_hours (shop_id, day, open_at, close_at)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(id)
            .bind(hours.day)
            .bind(hours.open_at)
            .bind(hours.close_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| anyhow!("Failed to insert opening hours: {}", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| anyhow!("Failed to commit shop: {}", e))?;

        Ok(id)
    }

    async fn delete_by_id(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM shops WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| anyhow!("Failed to delete shop: {}", e))?;
        Ok(())
    }

    async fn find_page(&self, query: &ShopQuery, page: PageRequest) -> Result<Page<Shop>> {
        let mut qb = QueryBuilder::new(SHOP_COLUMNS);
        let (filter, order) = match query {
            ShopQuery::Ordered(order) => (None, *order),
            ShopQuery::Filtered(filter) => (Some(filter), ShopOrder::Id),
        };

        if let Some(filter) = filter {
            push_filter(&mut qb, filter);
        }
        qb.push(order_clause(order));
        qb.push(" LIMIT ").push_bind(to_i64(page.size));
        qb.push(" OFFSET ").push_bind(to_i64(page.offset()));

        let items = self.fetch_shops(qb).await?;
        let total = self.count(filter).await?;

        Ok(Page {
            items,
            total,
            request: page,
        })
    }

    async fn find_ids_after(&self, after: Option<i64>, limit: usize) -> Result<Vec<i64>> {
        sqlx::query_scalar("SELECT id FROM shops WHERE id > $1 ORDER BY id LIMIT $2")
            .bind(after.unwrap_or(i64::MIN))
            .bind(to_i64(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| anyhow!("Failed to fetch shop ids: {}", e))
    }

    async fn find_all_by_ids(&self, ids: &[i64]) -> Result<Vec<Shop>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::new(SHOP_COLUMNS);
        qb.push(" WHERE s.id = ANY(").push_bind(ids.to_vec()).push(")");

        let mut by_id: HashMap<i64, Shop> = self
            .fetch_shops(qb)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }
}

#[async_trait]
impl ProductRepository for PgShopRepository {
    async fn find_by_shop(&self, shop_id: i64) -> Result<Vec<Product>> {
        let rows = sqlx::query("SELECT id, name, shop_id FROM products WHERE shop_id = $1 ORDER BY id")
            .bind(shop_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| anyhow!("Failed to load products: {}", e))?;

        rows.iter().map(row_to_product).collect()
    }

    async fn save(&self, product: Product) -> Result<Product> {
        sqlx::query(
            "INSERT INTO products (id, name, shop_id) VALUES ($1, $2, $3)
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, shop_id = EXCLUDED.shop_id",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(product.shop_id)
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow!("Failed to save product: {}", e))?;

        Ok(product)
    }
}

#[async_trait]
impl ShopSearchFunction for PgShopRepository {
    async fn search_shops(
        &self,
        in_vacations: Option<bool>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        name: Option<&str>,
    ) -> Result<Vec<Shop>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM search_shops($1, $2, $3, $4)")
            .bind(in_vacations)
            .bind(start_date)
            .bind(end_date)
            .bind(name)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| anyhow!("Failed to call search_shops: {}", e))?;

        self.find_all_by_ids(&ids).await
    }
}
