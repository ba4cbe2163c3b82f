//! Postgres-backed store.
//!
//! Each [`PostgresUnitOfWork`] wraps one transaction with a short
//! `lock_timeout`, so contention on a hot `(shop, item)` row surfaces as a
//! transient error instead of a stalled request.
//!
//! ## Error Mapping
//!
//! | SQLx error | SQLSTATE | StoreError |
//! |------------|----------|------------|
//! | Database (serialization failure) | `40001` | `Transient` |
//! | Database (deadlock detected) | `40P01` | `Transient` |
//! | Database (lock not available) | `55P03` | `Transient` |
//! | Database (query canceled) | `57014` | `Transient` |
//! | PoolTimedOut / Io | N/A | `Transient` |
//! | Anything else | any | `Backend` |
//!
//! ## Atomic Stock Updates
//!
//! Reservation is a single conditional `UPDATE ... WHERE quantity >= $n`; the
//! row lock it takes serializes concurrent reservations on one pair while
//! other pairs proceed in parallel.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use tracing::{instrument, Span};
use uuid::Uuid;

use fairmart_catalog::{Category, PriceBand, Subcategory};
use fairmart_core::{CategoryId, CustomerId, ItemId, Money, OrderId, ShopId};
use fairmart_inventory::{InventoryKey, InventoryRecord};
use fairmart_orders::{Order, OrderParts, OrderStatusEvent};

use crate::config::DatabaseConfig;
use crate::error::StoreError;
use crate::store::{
    CatalogEntry, CustomerProfile, InventoryView, OrderPage, OrderQuery, OrderScope, OrderView,
    ReserveOutcome, ShopProfile, Store, UnitOfWork,
};

const MIGRATION: &str = include_str!("../../migrations/0001_marketplace.sql");

const INVENTORY_COLUMNS: &str = "i.shop_id, i.item_id, i.quantity, i.unit_price, \
     i.low_stock_threshold, i.is_active, i.created_at, i.updated_at";

const ORDER_COLUMNS: &str = "o.id, o.order_number, o.customer_id, o.shop_id, o.item_id, \
     o.quantity, o.unit_price, o.total_amount, o.delivery_address, o.delivery_phone, o.notes, \
     o.status, o.cancellation_reason, o.estimated_delivery, o.created_at, o.updated_at";

const ORDER_VIEW_JOINS: &str = "LEFT JOIN subcategories s ON s.id = o.item_id \
     LEFT JOIN shops sh ON sh.id = o.shop_id \
     LEFT JOIN customers c ON c.id = o.customer_id";

const ORDER_VIEW_COLUMNS: &str = "s.name AS item_name, s.unit AS item_unit, \
     sh.name AS shop_name, sh.phone AS shop_phone, sh.address AS shop_address, \
     c.name AS customer_name, c.phone AS customer_phone";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PostgresStore {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool, config.lock_timeout))
    }

    /// Apply the embedded schema. Statements are idempotent.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(MIGRATION)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

pub struct PostgresUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    async fn subcategory(&mut self, id: ItemId) -> Result<Option<Subcategory>, StoreError> {
        let row = sqlx::query(
            "SELECT id, category_id, name, unit, min_price, max_price FROM subcategories WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("subcategory", e))?;
        row.as_ref().map(subcategory_from_row).transpose()
    }

    #[instrument(skip(self), fields(shop_id = %key.shop_id, item_id = %key.item_id), err)]
    async fn lock_inventory_record(
        &mut self,
        key: InventoryKey,
    ) -> Result<Option<InventoryRecord>, StoreError> {
        let sql = format!(
            "SELECT {INVENTORY_COLUMNS} FROM shop_inventory i \
             WHERE i.shop_id = $1 AND i.item_id = $2 FOR UPDATE"
        );
        let row = sqlx::query(&sql)
            .bind(key.shop_id.as_uuid())
            .bind(key.item_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("lock_inventory_record", e))?;
        row.as_ref().map(inventory_from_row).transpose()
    }

    async fn insert_inventory_record(&mut self, record: &InventoryRecord) -> Result<bool, StoreError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO shop_inventory (
                shop_id, item_id, quantity, unit_price, low_stock_threshold,
                is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (shop_id, item_id) DO NOTHING
            "#,
        )
        .bind(record.shop_id().as_uuid())
        .bind(record.item_id().as_uuid())
        .bind(i64::from(record.quantity()))
        .bind(money_to_db(record.unit_price())?)
        .bind(i64::from(record.low_stock_threshold()))
        .bind(record.is_active())
        .bind(record.created_at())
        .bind(record.updated_at())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_inventory_record", e))?;
        Ok(inserted.rows_affected() == 1)
    }

    async fn update_inventory_record(&mut self, record: &InventoryRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE shop_inventory
            SET quantity = $3, unit_price = $4, low_stock_threshold = $5,
                is_active = $6, updated_at = $7
            WHERE shop_id = $1 AND item_id = $2
            "#,
        )
        .bind(record.shop_id().as_uuid())
        .bind(record.item_id().as_uuid())
        .bind(i64::from(record.quantity()))
        .bind(money_to_db(record.unit_price())?)
        .bind(i64::from(record.low_stock_threshold()))
        .bind(record.is_active())
        .bind(record.updated_at())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_inventory_record", e))?;
        Ok(())
    }

    #[instrument(skip(self, now), fields(shop_id = %key.shop_id, item_id = %key.item_id), err)]
    async fn reserve_stock(
        &mut self,
        key: InventoryKey,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<ReserveOutcome, StoreError> {
        let sql = format!(
            "UPDATE shop_inventory i SET quantity = i.quantity - $3, updated_at = $4 \
             WHERE i.shop_id = $1 AND i.item_id = $2 AND i.is_active AND i.quantity >= $3 \
             RETURNING {INVENTORY_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(key.shop_id.as_uuid())
            .bind(key.item_id.as_uuid())
            .bind(i64::from(quantity))
            .bind(now)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("reserve_stock", e))?;

        if let Some(row) = row {
            return Ok(ReserveOutcome::Reserved(inventory_from_row(&row)?));
        }

        let current = sqlx::query(
            "SELECT quantity, is_active FROM shop_inventory WHERE shop_id = $1 AND item_id = $2",
        )
        .bind(key.shop_id.as_uuid())
        .bind(key.item_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("reserve_stock", e))?;

        match current {
            Some(row) if get::<bool>(&row, "is_active")? => Ok(ReserveOutcome::Insufficient {
                available: count_from_db(get(&row, "quantity")?)?,
            }),
            _ => Ok(ReserveOutcome::Unavailable),
        }
    }

    async fn release_stock(
        &mut self,
        key: InventoryKey,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE shop_inventory SET quantity = quantity + $3, updated_at = $4 \
             WHERE shop_id = $1 AND item_id = $2 AND quantity + $3 <= $5",
        )
        .bind(key.shop_id.as_uuid())
        .bind(key.item_id.as_uuid())
        .bind(i64::from(quantity))
        .bind(now)
        .bind(i64::from(u32::MAX))
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("release_stock", e))?;
        if result.rows_affected() == 1 {
            return Ok(true);
        }

        let exists = sqlx::query("SELECT 1 FROM shop_inventory WHERE shop_id = $1 AND item_id = $2")
            .bind(key.shop_id.as_uuid())
            .bind(key.item_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("release_stock", e))?
            .is_some();
        if exists {
            return Err(StoreError::backend("release_stock", "released quantity overflows"));
        }
        Ok(false)
    }

    async fn last_order_sequence(&mut self, year: i32) -> Result<u32, StoreError> {
        let row = sqlx::query(
            "SELECT COALESCE(MAX(order_sequence), 0) AS last FROM customer_orders WHERE order_year = $1",
        )
        .bind(year)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("last_order_sequence", e))?;
        let last: i32 = get(&row, "last")?;
        u32::try_from(last).map_err(|_| StoreError::corrupt("last_order_sequence", "negative sequence"))
    }

    #[instrument(skip(self, order), fields(order_id = %order.id(), order_number = %order.order_number()), err)]
    async fn insert_order(&mut self, order: &Order) -> Result<bool, StoreError> {
        let number = order.order_number();
        let sequence = i32::try_from(number.sequence())
            .map_err(|_| StoreError::backend("insert_order", "sequence out of range"))?;
        let row = sqlx::query(
            r#"
            INSERT INTO customer_orders (
                id, order_number, order_year, order_sequence, customer_id, shop_id, item_id,
                quantity, unit_price, total_amount, delivery_address, delivery_phone, notes,
                status, cancellation_reason, estimated_delivery, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            ON CONFLICT (order_number) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(number.to_string())
        .bind(number.year())
        .bind(sequence)
        .bind(order.customer_id().as_uuid())
        .bind(order.shop_id().as_uuid())
        .bind(order.item_id().as_uuid())
        .bind(i64::from(order.quantity()))
        .bind(money_to_db(order.unit_price())?)
        .bind(money_to_db(order.total_amount())?)
        .bind(order.delivery_address())
        .bind(order.delivery_phone())
        .bind(order.notes())
        .bind(order.status().as_str())
        .bind(order.cancellation_reason())
        .bind(order.estimated_delivery())
        .bind(order.created_at())
        .bind(order.updated_at())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;
        Ok(row.is_some())
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM customer_orders o WHERE o.id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("lock_order", e))?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn update_order_status(&mut self, order: &Order) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE customer_orders SET status = $2, cancellation_reason = $3, updated_at = $4 \
             WHERE id = $1",
        )
        .bind(order.id().as_uuid())
        .bind(order.status().as_str())
        .bind(order.cancellation_reason())
        .bind(order.updated_at())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_order_status", e))?;
        Ok(())
    }

    async fn append_status_event(&mut self, event: &OrderStatusEvent) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO order_status_history (order_id, old_status, new_status, changed_by, notes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event.order_id.as_uuid())
        .bind(event.old_status.map(|s| s.as_str()))
        .bind(event.new_status.as_str())
        .bind(event.changed_by.as_str())
        .bind(event.notes.as_deref())
        .bind(event.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("append_status_event", e))?;
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

#[async_trait]
impl Store for PostgresStore {
    type Tx = PostgresUnitOfWork;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        let set_timeout = format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout.as_millis());
        sqlx::query(&set_timeout)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(PostgresUnitOfWork { tx })
    }

    async fn subcategory(&self, id: ItemId) -> Result<Option<CatalogEntry>, StoreError> {
        let row = sqlx::query(
            "SELECT s.id, s.category_id, s.name, s.unit, s.min_price, s.max_price, \
             c.name AS category_name \
             FROM subcategories s LEFT JOIN categories c ON c.id = s.category_id WHERE s.id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("subcategory", e))?;
        row.as_ref().map(catalog_entry_from_row).transpose()
    }

    async fn list_subcategories(&self) -> Result<Vec<CatalogEntry>, StoreError> {
        let rows = sqlx::query(
            "SELECT s.id, s.category_id, s.name, s.unit, s.min_price, s.max_price, \
             c.name AS category_name \
             FROM subcategories s LEFT JOIN categories c ON c.id = s.category_id \
             ORDER BY c.name ASC, s.name ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_subcategories", e))?;
        rows.iter().map(catalog_entry_from_row).collect()
    }

    #[instrument(skip(self, category, item), fields(item_id = %item.id), err)]
    async fn put_subcategory(&self, category: &Category, item: &Subcategory) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("put_subcategory", e))?;
        sqlx::query(
            "INSERT INTO categories (id, name) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name",
        )
        .bind(category.id.as_uuid())
        .bind(&category.name)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("put_subcategory", e))?;
        sqlx::query(
            r#"
            INSERT INTO subcategories (id, category_id, name, unit, min_price, max_price)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                category_id = EXCLUDED.category_id,
                name = EXCLUDED.name,
                unit = EXCLUDED.unit,
                min_price = EXCLUDED.min_price,
                max_price = EXCLUDED.max_price
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(item.category_id.as_uuid())
        .bind(&item.name)
        .bind(&item.unit)
        .bind(item.band.min_price.map(money_to_db).transpose()?)
        .bind(item.band.max_price.map(money_to_db).transpose()?)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("put_subcategory", e))?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("put_subcategory", e))
    }

    async fn list_inventory(
        &self,
        shop_id: ShopId,
        low_stock_only: bool,
    ) -> Result<Vec<InventoryView>, StoreError> {
        let sql = format!(
            "SELECT {INVENTORY_COLUMNS}, s.name AS item_name, s.unit AS item_unit, \
             c.name AS category_name \
             FROM shop_inventory i \
             JOIN subcategories s ON s.id = i.item_id \
             LEFT JOIN categories c ON c.id = s.category_id \
             WHERE i.shop_id = $1 \
               AND (NOT $2 OR (i.is_active AND i.quantity <= i.low_stock_threshold)) \
             ORDER BY CASE WHEN $2 \
                 THEN i.quantity::float8 / GREATEST(i.low_stock_threshold, 1) END ASC, \
               s.name ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(shop_id.as_uuid())
            .bind(low_stock_only)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_inventory", e))?;
        rows.iter()
            .map(|row| {
                Ok(InventoryView {
                    record: inventory_from_row(row)?,
                    item_name: get(row, "item_name")?,
                    unit: get(row, "item_unit")?,
                    category_name: get(row, "category_name")?,
                })
            })
            .collect()
    }

    async fn order_view(&self, id: OrderId) -> Result<Option<OrderView>, StoreError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS}, {ORDER_VIEW_COLUMNS} FROM customer_orders o {ORDER_VIEW_JOINS} \
             WHERE o.id = $1"
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("order_view", e))?;
        row.as_ref().map(order_view_from_row).transpose()
    }

    #[instrument(
        skip(self, query),
        fields(status = ?query.status, page = query.page.page, returned = tracing::field::Empty),
        err
    )]
    async fn list_orders(&self, query: &OrderQuery) -> Result<OrderPage, StoreError> {
        let span = Span::current();
        let (customer, shop): (Option<Uuid>, Option<Uuid>) = match query.scope {
            OrderScope::Customer(id) => (Some(id.into()), None),
            OrderScope::Shop(id) => (None, Some(id.into())),
            OrderScope::All => (None, None),
        };
        let status = query.status.map(|s| s.as_str());
        let filter = "($1::uuid IS NULL OR o.customer_id = $1) \
             AND ($2::uuid IS NULL OR o.shop_id = $2) \
             AND ($3::text IS NULL OR o.status = $3)";

        let count_sql = format!("SELECT COUNT(*) AS total FROM customer_orders o WHERE {filter}");
        let total_row = sqlx::query(&count_sql)
            .bind(customer)
            .bind(shop)
            .bind(status)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_orders", e))?;
        let total: i64 = get(&total_row, "total")?;

        let offset = i64::try_from(query.page.offset())
            .map_err(|_| StoreError::backend("list_orders", "offset out of range"))?;
        let page_sql = format!(
            "SELECT {ORDER_COLUMNS}, {ORDER_VIEW_COLUMNS} FROM customer_orders o {ORDER_VIEW_JOINS} \
             WHERE {filter} ORDER BY o.created_at DESC, o.id DESC LIMIT $4 OFFSET $5"
        );
        let rows = sqlx::query(&page_sql)
            .bind(customer)
            .bind(shop)
            .bind(status)
            .bind(i64::from(query.page.limit))
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_orders", e))?;

        let items = rows
            .iter()
            .map(order_view_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        span.record("returned", items.len());
        Ok(OrderPage::new(items, query.page, u64::try_from(total).unwrap_or(0)))
    }

    async fn status_history(&self, id: OrderId) -> Result<Vec<OrderStatusEvent>, StoreError> {
        let rows = sqlx::query(
            "SELECT order_id, old_status, new_status, changed_by, notes, created_at \
             FROM order_status_history WHERE order_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("status_history", e))?;
        rows.iter().map(event_from_row).collect()
    }

    async fn customer_orders(&self, customer_id: CustomerId) -> Result<Vec<Order>, StoreError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM customer_orders o WHERE o.customer_id = $1 \
             ORDER BY o.created_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(customer_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("customer_orders", e))?;
        rows.iter().map(order_from_row).collect()
    }

    async fn put_customer(&self, profile: &CustomerProfile) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO customers (id, name, phone) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, phone = EXCLUDED.phone",
        )
        .bind(profile.id.as_uuid())
        .bind(&profile.name)
        .bind(profile.phone.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("put_customer", e))?;
        Ok(())
    }

    async fn put_shop(&self, profile: &ShopProfile) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO shops (id, name, phone, address) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO UPDATE SET \
               name = EXCLUDED.name, phone = EXCLUDED.phone, address = EXCLUDED.address",
        )
        .bind(profile.id.as_uuid())
        .bind(&profile.name)
        .bind(profile.phone.as_deref())
        .bind(profile.address.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("put_shop", e))?;
        Ok(())
    }
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column)
        .map_err(|e| StoreError::corrupt("decode_row", format!("{column}: {e}")))
}

fn money_to_db(money: Money) -> Result<i64, StoreError> {
    i64::try_from(money.amount()).map_err(|_| StoreError::backend("encode_money", "amount exceeds BIGINT"))
}

fn money_from_db(raw: i64) -> Result<Money, StoreError> {
    u64::try_from(raw)
        .map(Money::new)
        .map_err(|_| StoreError::corrupt("decode_money", format!("negative amount {raw}")))
}

fn count_from_db(raw: i64) -> Result<u32, StoreError> {
    u32::try_from(raw).map_err(|_| StoreError::corrupt("decode_count", format!("count {raw} out of range")))
}

fn subcategory_from_row(row: &PgRow) -> Result<Subcategory, StoreError> {
    let min: Option<i64> = get(row, "min_price")?;
    let max: Option<i64> = get(row, "max_price")?;
    Ok(Subcategory {
        id: ItemId::from_uuid(get(row, "id")?),
        category_id: CategoryId::from_uuid(get(row, "category_id")?),
        name: get(row, "name")?,
        unit: get(row, "unit")?,
        band: PriceBand::new(
            min.map(money_from_db).transpose()?,
            max.map(money_from_db).transpose()?,
        ),
    })
}

fn catalog_entry_from_row(row: &PgRow) -> Result<CatalogEntry, StoreError> {
    Ok(CatalogEntry {
        item: subcategory_from_row(row)?,
        category_name: get(row, "category_name")?,
    })
}

fn inventory_from_row(row: &PgRow) -> Result<InventoryRecord, StoreError> {
    Ok(InventoryRecord::rehydrate(
        InventoryKey::new(
            ShopId::from_uuid(get(row, "shop_id")?),
            ItemId::from_uuid(get(row, "item_id")?),
        ),
        count_from_db(get(row, "quantity")?)?,
        money_from_db(get(row, "unit_price")?)?,
        count_from_db(get(row, "low_stock_threshold")?)?,
        get(row, "is_active")?,
        get(row, "created_at")?,
        get(row, "updated_at")?,
    ))
}

fn order_from_row(row: &PgRow) -> Result<Order, StoreError> {
    let number: String = get(row, "order_number")?;
    let status: String = get(row, "status")?;
    Ok(Order::rehydrate(OrderParts {
        id: OrderId::from_uuid(get(row, "id")?),
        order_number: number
            .parse()
            .map_err(|e: fairmart_orders::OrderNumberError| StoreError::corrupt("decode_order", e.to_string()))?,
        customer_id: CustomerId::from_uuid(get(row, "customer_id")?),
        shop_id: ShopId::from_uuid(get(row, "shop_id")?),
        item_id: ItemId::from_uuid(get(row, "item_id")?),
        quantity: count_from_db(get(row, "quantity")?)?,
        unit_price: money_from_db(get(row, "unit_price")?)?,
        total_amount: money_from_db(get(row, "total_amount")?)?,
        delivery_address: get(row, "delivery_address")?,
        delivery_phone: get(row, "delivery_phone")?,
        notes: get(row, "notes")?,
        status: status
            .parse()
            .map_err(|e: fairmart_core::DomainError| StoreError::corrupt("decode_order", e.to_string()))?,
        cancellation_reason: get(row, "cancellation_reason")?,
        estimated_delivery: get(row, "estimated_delivery")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    }))
}

fn order_view_from_row(row: &PgRow) -> Result<OrderView, StoreError> {
    let order = order_from_row(row)?;
    let shop_name: Option<String> = get(row, "shop_name")?;
    let customer_name: Option<String> = get(row, "customer_name")?;
    let shop = match shop_name {
        Some(name) => Some(ShopProfile {
            id: order.shop_id(),
            name,
            phone: get(row, "shop_phone")?,
            address: get(row, "shop_address")?,
        }),
        None => None,
    };
    let customer = match customer_name {
        Some(name) => Some(CustomerProfile {
            id: order.customer_id(),
            name,
            phone: get(row, "customer_phone")?,
        }),
        None => None,
    };
    Ok(OrderView {
        item_name: get(row, "item_name")?,
        unit: get(row, "item_unit")?,
        shop,
        customer,
        order,
    })
}

fn event_from_row(row: &PgRow) -> Result<OrderStatusEvent, StoreError> {
    let decode = |e: fairmart_core::DomainError| StoreError::corrupt("decode_status_event", e.to_string());
    let old: Option<String> = get(row, "old_status")?;
    let new: String = get(row, "new_status")?;
    let changed_by: String = get(row, "changed_by")?;
    Ok(OrderStatusEvent {
        order_id: OrderId::from_uuid(get(row, "order_id")?),
        old_status: old.map(|s| s.parse()).transpose().map_err(decode)?,
        new_status: new.parse().map_err(decode)?,
        changed_by: changed_by.parse().map_err(decode)?,
        notes: get(row, "notes")?,
        created_at: get(row, "created_at")?,
    })
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message().to_string();
            match db_err.code().as_deref() {
                Some("40001") | Some("40P01") | Some("55P03") | Some("57014") => {
                    StoreError::transient(operation, message)
                }
                _ => StoreError::backend(operation, message),
            }
        }
        sqlx::Error::PoolTimedOut => StoreError::transient(operation, "connection pool timed out"),
        sqlx::Error::Io(e) => StoreError::transient(operation, e.to_string()),
        sqlx::Error::PoolClosed => StoreError::backend(operation, "connection pool closed"),
        other => StoreError::backend(operation, other.to_string()),
    }
}
