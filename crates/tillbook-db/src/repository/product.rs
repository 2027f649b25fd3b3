//! # Product Repository
//!
//! Database operations for products and their stock ledger.
//!
//! ## Key Operations
//! - Catalog reads (pool-level, any connection)
//! - Stock movements inside a unit of work
//! - Reconciliation corrections tagged with a reason
//!
//! ## Stock Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    How a Stock Movement Is Written                      │
//! │                                                                         │
//! │  uow.products().decrement_stock(id, 3)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SELECT ... FROM products WHERE id = ?   (inside the unit)             │
//! │       │                                                                 │
//! │       ├── stock < 3 → Err(Domain(InsufficientStock)) → unit rolls back │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  new_stock = stock - 3        (Decimal, in Rust)                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE products SET stock = ?, version = version + 1                  │
//! │  WHERE id = ? AND version = ?                                          │
//! │       │                                                                 │
//! │       └── 0 rows → Err(CommitConflict)                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stock is stored as decimal TEXT, so the arithmetic happens in Rust and
//! the version check guards the read-modify-write.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tillbook_core::{CoreError, Product, Quantity, ValidationError};

macro_rules! select_products {
    ($tail:literal) => {
        concat!(
            "SELECT id, branch_id, sku, name, unit, unit_price, stock, min_stock_level, ",
            "is_active, last_correction_reason, last_corrected_at, created_at, updated_at, version ",
            "FROM products ",
            $tail
        )
    };
}

// =============================================================================
// Pool-level repository
// =============================================================================

/// Repository for product reads and catalog maintenance.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let product = repo.get_by_id("uuid-here").await?;
/// let shelf = repo.list_for_branch(Some("branch-lagos")).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        ProductStore::new(&mut conn).find(id).await
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product
    /// * `Err(DbError::UniqueViolation)` - SKU already exists in the branch
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        let mut conn = self.pool.acquire().await?;
        ProductStore::new(&mut conn).insert(product).await?;
        Ok(product.clone())
    }

    /// Lists active products, optionally restricted to one branch,
    /// ordered by name.
    pub async fn list_for_branch(&self, branch_id: Option<&str>) -> DbResult<Vec<Product>> {
        let mut conn = self.pool.acquire().await?;
        ProductStore::new(&mut conn).list_active(branch_id).await
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit-scoped store
// =============================================================================

/// Product operations bound to one connection, usually a unit of work's.
pub struct ProductStore<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> ProductStore<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        ProductStore { conn }
    }

    pub async fn find(&mut self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(select_products!("WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(product)
    }

    /// Like [`find`](Self::find) but a missing row is `NotFound`.
    pub async fn get(&mut self, id: &str) -> DbResult<Product> {
        self.find(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    pub async fn insert(&mut self, product: &Product) -> DbResult<()> {
        debug!(sku = %product.sku, branch = %product.branch_id, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, branch_id, sku, name, unit, unit_price, stock, min_stock_level,
                is_active, last_correction_reason, last_corrected_at,
                created_at, updated_at, version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&product.id)
        .bind(&product.branch_id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.unit)
        .bind(product.unit_price)
        .bind(product.stock)
        .bind(product.min_stock_level)
        .bind(product.is_active)
        .bind(&product.last_correction_reason)
        .bind(product.last_corrected_at)
        .bind(product.created_at)
        .bind(product.updated_at)
        .bind(product.version)
        .execute(&mut *self.conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } if field.contains("sku") => {
                DbError::duplicate("sku", &product.sku)
            }
            other => other,
        })?;

        Ok(())
    }

    pub async fn list_active(&mut self, branch_id: Option<&str>) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(select_products!(
            "WHERE is_active = 1 AND (?1 IS NULL OR branch_id = ?1) ORDER BY name, id"
        ))
        .bind(branch_id)
        .fetch_all(&mut *self.conn)
        .await?;

        debug!(count = products.len(), branch = ?branch_id, "Listed active products");
        Ok(products)
    }

    /// Takes `quantity` off the shelf.
    ///
    /// The stock check runs against the row as read inside this unit, so two
    /// units racing for the last item cannot both pass it.
    pub async fn decrement_stock(
        &mut self,
        id: &str,
        quantity: Quantity,
        now: DateTime<Utc>,
    ) -> DbResult<Product> {
        ensure_positive(quantity)?;
        let product = self.get(id).await?;

        if !product.can_sell(quantity) {
            return Err(CoreError::InsufficientStock {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                available: product.stock,
                requested: quantity,
            }
            .into());
        }

        let stock = product.stock - quantity;
        debug!(id = %id, from = %product.stock, to = %stock, "Decrementing stock");
        self.write_stock(&product, stock, None, now).await
    }

    /// Puts `quantity` back on the shelf (returns).
    pub async fn increment_stock(
        &mut self,
        id: &str,
        quantity: Quantity,
        now: DateTime<Utc>,
    ) -> DbResult<Product> {
        ensure_positive(quantity)?;
        let product = self.get(id).await?;

        let stock = product.stock + quantity;
        debug!(id = %id, from = %product.stock, to = %stock, "Incrementing stock");
        self.write_stock(&product, stock, None, now).await
    }

    /// Sets stock to an absolute figure and tags the row with `reason`.
    ///
    /// Only reconciliation corrections go through here.
    pub async fn correct_stock(
        &mut self,
        id: &str,
        stock: Quantity,
        reason: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Product> {
        if stock.is_negative() {
            return Err(CoreError::from(ValidationError::Negative {
                field: "stock".to_string(),
            })
            .into());
        }
        let product = self.get(id).await?;

        debug!(id = %id, from = %product.stock, to = %stock, reason = %reason, "Correcting stock");
        self.write_stock(&product, stock, Some(reason), now).await
    }

    async fn write_stock(
        &mut self,
        product: &Product,
        stock: Quantity,
        correction: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<Product> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET
                stock = ?1,
                last_correction_reason = COALESCE(?2, last_correction_reason),
                last_corrected_at = CASE WHEN ?2 IS NULL THEN last_corrected_at ELSE ?3 END,
                updated_at = ?3,
                version = version + 1
            WHERE id = ?4 AND version = ?5
            "#,
        )
        .bind(stock)
        .bind(correction)
        .bind(now)
        .bind(&product.id)
        .bind(product.version)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict(format!(
                "product {} changed since version {}",
                product.id, product.version
            )));
        }

        let mut updated = product.clone();
        updated.stock = stock;
        updated.updated_at = now;
        updated.version += 1;
        if let Some(reason) = correction {
            updated.last_correction_reason = Some(reason.to_string());
            updated.last_corrected_at = Some(now);
        }
        Ok(updated)
    }
}

fn ensure_positive(quantity: Quantity) -> DbResult<()> {
    if quantity.is_positive() {
        Ok(())
    } else {
        Err(CoreError::from(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        })
        .into())
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
