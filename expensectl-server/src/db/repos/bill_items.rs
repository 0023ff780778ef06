//! Bill item repository
//!
//! Every change to a bill's items recalculates the bill total and its
//! automatic description in the same transaction.

use chrono::{DateTime, Utc};
use expensectl_core::line_amount;
use expensectl_core::sync::SyncModel;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};

use super::{deletions, expenses, DbError, Expense};
use crate::models::{validate_count, validate_money, validate_serving, Product, ValidationError};

/// Bill item record from database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BillItem {
    pub id: i64,
    #[serde(skip)]
    pub user_id: i64,
    pub bill_id: i64,
    pub product: String,
    pub serving: Option<Decimal>,
    pub count: Decimal,
    pub unit_price: Decimal,
    pub date_added: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
}

impl BillItem {
    /// Line amount: count times unit price, truncated to cents.
    pub fn amount(&self) -> Decimal {
        line_amount(self.count, self.unit_price)
    }
}

/// Validated bill item fields
#[derive(Debug, Clone)]
pub struct BillItemFields {
    pub product: Product,
    pub serving: Option<Decimal>,
    pub count: Decimal,
    pub unit_price: Decimal,
}

impl BillItemFields {
    pub fn new(
        product: &str,
        serving: Option<Decimal>,
        count: Decimal,
        unit_price: Decimal,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            product: Product::new(product)?,
            serving: serving.map(validate_serving).transpose()?,
            count: validate_count(count)?,
            unit_price: validate_money("unit price", unit_price)?,
        })
    }
}

/// One row of the bulk item editor. Rows without an id are additions; rows
/// with an id edit the fields they carry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkItem {
    pub id: Option<i64>,
    pub product: Option<String>,
    pub serving: Option<Decimal>,
    pub count: Option<Decimal>,
    pub unit_price: Option<Decimal>,
}

/// Bulk item editor payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkItemEdit {
    #[serde(default)]
    pub items: Vec<BulkItem>,
    #[serde(default)]
    pub delete: Vec<i64>,
}

/// Bulk editor outcome
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkItemResult {
    pub ok: usize,
    pub err: usize,
    pub bill: Option<Decimal>,
}

const COLUMNS: &str = "id, user_id, bill_id, product, serving, count, unit_price, date_added, date_modified";

/// Lock a bill that items are being attached to.
pub(crate) async fn bill_in(
    conn: &mut PgConnection,
    user_id: i64,
    bill_id: i64,
) -> Result<Expense, DbError> {
    let bill = expenses::get_in(conn, user_id, bill_id).await?;
    if !bill.is_bill {
        return Err(DbError::invalid(format!("expense {bill_id} is not a bill")));
    }
    Ok(bill)
}

pub(crate) async fn get_in(
    conn: &mut PgConnection,
    user_id: i64,
    id: i64,
) -> Result<BillItem, DbError> {
    sqlx::query_as::<_, BillItem>(&format!(
        "SELECT {COLUMNS} FROM bill_items WHERE id = $1 AND user_id = $2 FOR UPDATE"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("bill item", id))
}

/// Insert an item without recalculating the bill.
pub(crate) async fn insert_in(
    conn: &mut PgConnection,
    user_id: i64,
    bill_id: i64,
    fields: &BillItemFields,
) -> Result<BillItem, DbError> {
    bill_in(conn, user_id, bill_id).await?;
    let item = sqlx::query_as::<_, BillItem>(&format!(
        r#"
        INSERT INTO bill_items (user_id, bill_id, product, serving, count, unit_price)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(bill_id)
    .bind(fields.product.as_str())
    .bind(fields.serving)
    .bind(fields.count)
    .bind(fields.unit_price)
    .fetch_one(&mut *conn)
    .await?;
    Ok(item)
}

/// Overwrite an item, possibly moving it to another bill, without recalculating.
pub(crate) async fn overwrite_in(
    conn: &mut PgConnection,
    user_id: i64,
    id: i64,
    bill_id: i64,
    fields: &BillItemFields,
) -> Result<BillItem, DbError> {
    bill_in(conn, user_id, bill_id).await?;
    sqlx::query_as::<_, BillItem>(&format!(
        r#"
        UPDATE bill_items
        SET bill_id = $3, product = $4, serving = $5, count = $6, unit_price = $7,
            date_modified = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(user_id)
    .bind(bill_id)
    .bind(fields.product.as_str())
    .bind(fields.serving)
    .bind(fields.count)
    .bind(fields.unit_price)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("bill item", id))
}

/// Records modified in `(after, until]`, or up to `until` without a lower bound.
pub(crate) async fn modified_in(
    conn: &mut PgConnection,
    user_id: i64,
    after: Option<DateTime<Utc>>,
    until: DateTime<Utc>,
) -> Result<Vec<BillItem>, sqlx::Error> {
    sqlx::query_as::<_, BillItem>(&format!(
        r#"
        SELECT {COLUMNS}
        FROM bill_items
        WHERE user_id = $1
          AND ($2::TIMESTAMPTZ IS NULL OR date_modified > $2)
          AND date_modified <= $3
        ORDER BY id
        "#
    ))
    .bind(user_id)
    .bind(after)
    .bind(until)
    .fetch_all(&mut *conn)
    .await
}

/// Delete an item with a tombstone, returning the bill it belonged to.
pub(crate) async fn delete_in(
    conn: &mut PgConnection,
    user_id: i64,
    id: i64,
) -> Result<i64, DbError> {
    let bill_id: i64 =
        sqlx::query_scalar("DELETE FROM bill_items WHERE id = $1 AND user_id = $2 RETURNING bill_id")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found("bill item", id))?;
    deletions::record(conn, user_id, SyncModel::BillItem, id).await?;
    Ok(bill_id)
}

/// Bill item repository
pub struct BillItemRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> BillItemRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Items of a bill in the order they were added.
    pub async fn list_for_bill(&self, user_id: i64, bill_id: i64) -> Result<Vec<BillItem>, DbError> {
        let items = sqlx::query_as::<_, BillItem>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM bill_items
            WHERE bill_id = $1 AND user_id = $2
            ORDER BY date_added, id
            "#
        ))
        .bind(bill_id)
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }

    pub async fn create(
        &self,
        user_id: i64,
        bill_id: i64,
        fields: &BillItemFields,
    ) -> Result<(BillItem, Expense), DbError> {
        let mut tx = self.pool.begin().await?;
        let item = insert_in(&mut tx, user_id, bill_id, fields).await?;
        let bill = expenses::recalculate_in(&mut tx, user_id, bill_id).await?;
        tx.commit().await?;
        Ok((item, bill))
    }

    pub async fn update(
        &self,
        user_id: i64,
        bill_id: i64,
        id: i64,
        fields: &BillItemFields,
    ) -> Result<(BillItem, Expense), DbError> {
        let mut tx = self.pool.begin().await?;
        let current = get_in(&mut tx, user_id, id).await?;
        if current.bill_id != bill_id {
            return Err(DbError::not_found("bill item", id));
        }
        let item = overwrite_in(&mut tx, user_id, id, bill_id, fields).await?;
        let bill = expenses::recalculate_in(&mut tx, user_id, bill_id).await?;
        tx.commit().await?;
        Ok((item, bill))
    }

    pub async fn delete(&self, user_id: i64, bill_id: i64, id: i64) -> Result<Expense, DbError> {
        let mut tx = self.pool.begin().await?;
        let current = get_in(&mut tx, user_id, id).await?;
        if current.bill_id != bill_id {
            return Err(DbError::not_found("bill item", id));
        }
        delete_in(&mut tx, user_id, id).await?;
        let bill = expenses::recalculate_in(&mut tx, user_id, bill_id).await?;
        tx.commit().await?;
        Ok(bill)
    }

    /// Apply a batch of additions, edits and deletions to one bill.
    ///
    /// Rows that fail validation or don't belong to the bill count as `err`
    /// and are skipped; the rest are applied and the bill recalculated once.
    pub async fn bulk_edit(
        &self,
        user_id: i64,
        bill_id: i64,
        edit: &BulkItemEdit,
    ) -> Result<BulkItemResult, DbError> {
        let mut result = BulkItemResult::default();
        let mut tx = self.pool.begin().await?;
        bill_in(&mut tx, user_id, bill_id).await?;

        for row in &edit.items {
            let fields = match row.id {
                None => new_fields(row),
                Some(id) => match get_in(&mut tx, user_id, id).await {
                    Ok(current) if current.bill_id == bill_id => merged_fields(&current, row),
                    Ok(_) | Err(DbError::NotFound { .. }) => {
                        result.err += 1;
                        continue;
                    }
                    Err(e) => return Err(e),
                },
            };
            let Ok(fields) = fields else {
                result.err += 1;
                continue;
            };
            match row.id {
                None => insert_in(&mut tx, user_id, bill_id, &fields).await?,
                Some(id) => overwrite_in(&mut tx, user_id, id, bill_id, &fields).await?,
            };
            result.ok += 1;
        }

        for &id in &edit.delete {
            match get_in(&mut tx, user_id, id).await {
                Ok(current) if current.bill_id == bill_id => {
                    delete_in(&mut tx, user_id, id).await?;
                    result.ok += 1;
                }
                Ok(_) | Err(DbError::NotFound { .. }) => result.err += 1,
                Err(e) => return Err(e),
            }
        }

        let bill = expenses::recalculate_in(&mut tx, user_id, bill_id).await?;
        tx.commit().await?;

        result.bill = Some(bill.amount);
        tracing::info!(user_id, bill_id, ok = result.ok, err = result.err, "bulk item edit");
        Ok(result)
    }
}

fn new_fields(row: &BulkItem) -> Result<BillItemFields, ValidationError> {
    let product = row.product.as_deref().unwrap_or_default();
    let unit_price = row
        .unit_price
        .ok_or(ValidationError::Empty { field: "unit price" })?;
    BillItemFields::new(product, row.serving, row.count.unwrap_or(Decimal::ONE), unit_price)
}

fn merged_fields(current: &BillItem, row: &BulkItem) -> Result<BillItemFields, ValidationError> {
    BillItemFields::new(
        row.product.as_deref().unwrap_or(&current.product),
        row.serving.or(current.serving),
        row.count.unwrap_or(current.count),
        row.unit_price.unwrap_or(current.unit_price),
    )
}
