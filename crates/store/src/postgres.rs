use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CartLineId, OrderId, ProductId, UserId};
use domain::{CartLine, Money, Order, OrderLine, OrderStatus, Product, ProductPatch};
use sqlx::types::Json;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    store::{CartStore, OrderStore, ProductStore},
};

/// PostgreSQL-backed store implementation.
///
/// Stock guards are expressed in the `WHERE` clause of a single `UPDATE`,
/// so concurrent checkouts are arbitrated by the database row lock.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            stock: from_db_count("stock", row.try_get("stock")?)?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_cart_line(row: PgRow) -> Result<CartLine> {
        Ok(CartLine {
            id: CartLineId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::new(row.try_get::<String, _>("user_id")?),
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            quantity: from_db_count("quantity", row.try_get("quantity")?)?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let status: String = row.try_get("status")?;
        let lines: Json<Vec<OrderLine>> = row.try_get("lines")?;

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::new(row.try_get::<String, _>("user_id")?),
            lines: lines.0,
            total: Money::from_cents(row.try_get("total_cents")?),
            status: status
                .parse()
                .map_err(|e: domain::DomainError| StoreError::Corrupt(e.to_string()))?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

fn to_db_count(field: &str, value: u32) -> Result<i32> {
    i32::try_from(value).map_err(|_| StoreError::OutOfRange(format!("{field} = {value}")))
}

fn from_db_count(field: &str, value: i32) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative {field}: {value}")))
}

fn uuids(ids: &[ProductId]) -> Vec<Uuid> {
    ids.iter().map(ProductId::as_uuid).collect()
}

#[async_trait]
impl ProductStore for PostgresStore {
    async fn insert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price_cents, stock, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(to_db_count("stock", product.stock)?)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, price_cents, stock, created_at, updated_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, description, price_cents, stock, created_at, updated_at
            FROM products
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn update_product(
        &self,
        id: ProductId,
        patch: &ProductPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Product>> {
        patch.validate()?;
        let stock = patch
            .stock
            .map(|s| to_db_count("stock", s))
            .transpose()?;

        let row = sqlx::query(
            r#"
            UPDATE products
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                price_cents = COALESCE($4, price_cents),
                stock = COALESCE($5, stock),
                updated_at = $6
            WHERE id = $1
            RETURNING id, name, description, price_cents, stock, created_at, updated_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(patch.name.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.price.map(|p| p.cents()))
        .bind(stock)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn conditional_decrement_stock(
        &self,
        id: ProductId,
        amount: u32,
    ) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - $2, updated_at = NOW()
            WHERE id = $1 AND stock >= $2
            RETURNING id, name, description, price_cents, stock, created_at, updated_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(to_db_count("amount", amount)?)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn increment_stock(&self, id: ProductId, amount: u32) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(to_db_count("amount", amount)?)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CartStore for PostgresStore {
    async fn find_cart_lines(
        &self,
        user_id: &UserId,
        product_ids: &[ProductId],
    ) -> Result<Vec<CartLine>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, product_id, quantity, created_at
            FROM cart_lines
            WHERE user_id = $1 AND product_id = ANY($2)
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id.as_str())
        .bind(uuids(product_ids))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_cart_line).collect()
    }

    async fn delete_cart_lines(
        &self,
        user_id: &UserId,
        product_ids: &[ProductId],
    ) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM cart_lines WHERE user_id = $1 AND product_id = ANY($2)")
                .bind(user_id.as_str())
                .bind(uuids(product_ids))
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }

    async fn list_cart(&self, user_id: &UserId) -> Result<Vec<CartLine>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, product_id, quantity, created_at
            FROM cart_lines
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_cart_line).collect()
    }

    async fn upsert_cart_line(&self, line: &CartLine) -> Result<CartLine> {
        let row = sqlx::query(
            r#"
            INSERT INTO cart_lines (id, user_id, product_id, quantity, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT ON CONSTRAINT unique_cart_line
            DO UPDATE SET quantity = EXCLUDED.quantity
            RETURNING id, user_id, product_id, quantity, created_at
            "#,
        )
        .bind(line.id.as_uuid())
        .bind(line.user_id.as_str())
        .bind(line.product_id.as_uuid())
        .bind(to_db_count("quantity", line.quantity)?)
        .bind(line.created_at)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_cart_line(row)
    }

    async fn set_cart_quantity(
        &self,
        user_id: &UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Option<CartLine>> {
        let row = sqlx::query(
            r#"
            UPDATE cart_lines
            SET quantity = $3
            WHERE user_id = $1 AND product_id = $2
            RETURNING id, user_id, product_id, quantity, created_at
            "#,
        )
        .bind(user_id.as_str())
        .bind(product_id.as_uuid())
        .bind(to_db_count("quantity", quantity)?)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_cart_line).transpose()
    }

    async fn remove_cart_line(&self, user_id: &UserId, product_id: ProductId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE user_id = $1 AND product_id = $2")
            .bind(user_id.as_str())
            .bind(product_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, lines, total_cents, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_str())
        .bind(Json(&order.lines))
        .bind(order.total.cents())
        .bind(order.status.as_str())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, lines, total_cents, status, created_at, updated_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn list_orders_for_user(&self, user_id: &UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, lines, total_cents, status, created_at, updated_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, lines, total_cents, status, created_at, updated_at
            FROM orders
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        allowed_current: &[OrderStatus],
        owner: Option<&UserId>,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>> {
        let allowed: Vec<&str> = allowed_current.iter().map(OrderStatus::as_str).collect();

        let row = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, updated_at = $3
            WHERE id = $1
              AND status = ANY($4)
              AND ($5::TEXT IS NULL OR user_id = $5)
            RETURNING id, user_id, lines, total_cents, status, created_at, updated_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(status.as_str())
        .bind(now)
        .bind(allowed)
        .bind(owner.map(UserId::as_str))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }
}
