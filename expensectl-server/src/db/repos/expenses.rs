//! Expense repository
//!
//! An expense is either simple (amount entered directly) or a bill, whose
//! amount is the total of its items. `description_cache` holds what listings
//! and search show: the description for simple expenses, the automatic
//! description for bills.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use expensectl_core::bills::{auto_description, bill_total, Line};
use expensectl_core::sync::SyncModel;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool, Row};

use super::{deletions, DbError};
use crate::models::{Description, Paginated, Pagination, Product, Vendor};

/// Expense record from database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Expense {
    pub id: i64,
    #[serde(skip)]
    pub user_id: i64,
    pub date: NaiveDate,
    pub vendor: String,
    pub category_id: i64,
    pub amount: Decimal,
    pub description: String,
    pub description_cache: String,
    pub is_bill: bool,
    pub date_added: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
}

/// Expense joined with its category for list display
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExpenseListItem {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub expense: Expense,
    pub category_name: String,
    pub category_slug: String,
}

/// Validated expense fields
#[derive(Debug, Clone)]
pub struct ExpenseFields {
    pub date: NaiveDate,
    pub vendor: Vendor,
    pub category_id: i64,
    pub amount: Decimal,
    pub description: Description,
}

/// Spending on one day
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DaySum {
    pub date: NaiveDate,
    pub sum: Decimal,
}

/// All-time spending in one category
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CategorySpending {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub sum: Decimal,
}

/// Dashboard aggregates
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub recent: Vec<ExpenseListItem>,
    pub last_days: Vec<DaySum>,
    pub last_days_sum: Decimal,
    pub current_month: Decimal,
    pub previous_month: Decimal,
    pub categories: Vec<CategorySpending>,
}

const COLUMNS: &str = "e.id, e.user_id, e.date, e.vendor, e.category_id, e.amount, e.description, \
                       e.description_cache, e.is_bill, e.date_added, e.date_modified";

const ORDER: &str = "ORDER BY e.date DESC, e.date_added DESC, e.id DESC";

/// Number of most recent spending days shown on the dashboard
const DASHBOARD_DAYS: i64 = 3;

/// First day of the month containing `date` and of the month after it.
pub fn month_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = date.with_day(1).unwrap_or(date);
    let (year, month) = if start.month() == 12 {
        (start.year() + 1, 1)
    } else {
        (start.year(), start.month() + 1)
    };
    let next = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(start);
    (start, next)
}

/// First day of the month before the one containing `date`.
pub fn previous_month_start(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 1 {
        (date.year() - 1, 12)
    } else {
        (date.year(), date.month() - 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date)
}

pub(crate) async fn get_in(
    conn: &mut PgConnection,
    user_id: i64,
    id: i64,
) -> Result<Expense, DbError> {
    sqlx::query_as::<_, Expense>(&format!(
        "SELECT {COLUMNS} FROM expenses e WHERE e.id = $1 AND e.user_id = $2 FOR UPDATE"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("expense", id))
}

/// Insert an expense; the category must belong to the same user.
pub(crate) async fn insert_in(
    conn: &mut PgConnection,
    user_id: i64,
    fields: &ExpenseFields,
    is_bill: bool,
) -> Result<Expense, DbError> {
    let description = fields.description.as_str();
    let cache = if is_bill {
        auto_description(description, &[] as &[&str])
    } else {
        description.to_owned()
    };

    sqlx::query_as::<_, Expense>(&format!(
        r#"
        WITH inserted AS (
            INSERT INTO expenses (user_id, date, vendor, category_id, amount,
                                  description, description_cache, is_bill)
            SELECT $1, $2, $3, c.id, $5, $6, $7, $8
            FROM categories c
            WHERE c.id = $4 AND c.user_id = $1
            RETURNING *
        )
        SELECT {COLUMNS} FROM inserted e
        "#
    ))
    .bind(user_id)
    .bind(fields.date)
    .bind(fields.vendor.as_str())
    .bind(fields.category_id)
    .bind(fields.amount)
    .bind(description)
    .bind(cache)
    .bind(is_bill)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("category", fields.category_id))
}

/// Overwrite every field of an expense. Bills get their total recalculated.
pub(crate) async fn overwrite_in(
    conn: &mut PgConnection,
    user_id: i64,
    id: i64,
    fields: &ExpenseFields,
    is_bill: bool,
) -> Result<Expense, DbError> {
    let description = fields.description.as_str();
    let updated = sqlx::query(
        r#"
        UPDATE expenses e
        SET date = $3, vendor = $4, category_id = c.id, amount = $6,
            description = $7, description_cache = $7, is_bill = $8, date_modified = NOW()
        FROM categories c
        WHERE e.id = $1 AND e.user_id = $2 AND c.id = $5 AND c.user_id = $2
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(fields.date)
    .bind(fields.vendor.as_str())
    .bind(fields.category_id)
    .bind(fields.amount)
    .bind(description)
    .bind(is_bill)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if updated == 0 {
        get_in(conn, user_id, id).await?;
        return Err(DbError::not_found("category", fields.category_id));
    }
    if is_bill {
        return recalculate_in(conn, user_id, id).await;
    }

    // a simple expense has no items
    let item_ids: Vec<i64> =
        sqlx::query_scalar("DELETE FROM bill_items WHERE bill_id = $1 RETURNING id")
            .bind(id)
            .fetch_all(&mut *conn)
            .await?;
    deletions::record_many(conn, user_id, SyncModel::BillItem, &item_ids).await?;
    get_in(conn, user_id, id).await
}

/// Recompute a bill's amount and cached description from its items.
pub(crate) async fn recalculate_in(
    conn: &mut PgConnection,
    user_id: i64,
    bill_id: i64,
) -> Result<Expense, DbError> {
    let bill = get_in(conn, user_id, bill_id).await?;
    if !bill.is_bill {
        return Ok(bill);
    }

    let rows = sqlx::query(
        r#"
        SELECT product, count, unit_price
        FROM bill_items
        WHERE bill_id = $1
        ORDER BY date_added, id
        "#,
    )
    .bind(bill_id)
    .fetch_all(&mut *conn)
    .await?;

    let products: Vec<String> = rows.iter().map(|r| r.get("product")).collect();
    let total = bill_total(rows.iter().map(|r| Line {
        count: r.get("count"),
        unit_price: r.get("unit_price"),
    }));
    let cache = auto_description(&bill.description, &products);

    let bill = sqlx::query_as::<_, Expense>(&format!(
        r#"
        UPDATE expenses e
        SET amount = $3, description_cache = $4, date_modified = NOW()
        WHERE e.id = $1 AND e.user_id = $2
        RETURNING {COLUMNS}
        "#
    ))
    .bind(bill_id)
    .bind(user_id)
    .bind(total)
    .bind(cache)
    .fetch_one(&mut *conn)
    .await?;

    tracing::debug!(bill_id, items = rows.len(), total = %bill.amount, "bill recalculated");
    Ok(bill)
}

/// Records modified in `(after, until]`, or up to `until` without a lower bound.
pub(crate) async fn modified_in(
    conn: &mut PgConnection,
    user_id: i64,
    after: Option<DateTime<Utc>>,
    until: DateTime<Utc>,
) -> Result<Vec<Expense>, sqlx::Error> {
    sqlx::query_as::<_, Expense>(&format!(
        r#"
        SELECT {COLUMNS}
        FROM expenses e
        WHERE e.user_id = $1
          AND ($2::TIMESTAMPTZ IS NULL OR e.date_modified > $2)
          AND e.date_modified <= $3
        ORDER BY e.id
        "#
    ))
    .bind(user_id)
    .bind(after)
    .bind(until)
    .fetch_all(&mut *conn)
    .await
}

/// Delete an expense, leaving tombstones for it and its items.
pub(crate) async fn delete_in(
    conn: &mut PgConnection,
    user_id: i64,
    id: i64,
) -> Result<(), DbError> {
    get_in(conn, user_id, id).await?;

    let item_ids: Vec<i64> =
        sqlx::query_scalar("DELETE FROM bill_items WHERE bill_id = $1 RETURNING id")
            .bind(id)
            .fetch_all(&mut *conn)
            .await?;
    sqlx::query("DELETE FROM expenses WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    deletions::record_many(conn, user_id, SyncModel::BillItem, &item_ids).await?;
    deletions::record(conn, user_id, SyncModel::Expense, id).await?;
    Ok(())
}

/// Expense repository
pub struct ExpenseRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ExpenseRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    async fn list_where(
        &self,
        user_id: i64,
        category_id: Option<i64>,
        bills_only: bool,
        page: Pagination,
    ) -> Result<Paginated<ExpenseListItem>, DbError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {COLUMNS}, c.name AS category_name, c.slug AS category_slug,
                   COUNT(*) OVER() AS total
            FROM expenses e
            JOIN categories c ON c.id = e.category_id
            WHERE e.user_id = $1
              AND ($2::BIGINT IS NULL OR e.category_id = $2)
              AND (NOT $3 OR e.is_bill)
            {ORDER}
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(user_id)
        .bind(category_id)
        .bind(bills_only)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total = rows.first().map(|r| r.get::<i64, _>("total")).unwrap_or(0);
        let items = rows
            .iter()
            .map(ExpenseListItem::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Paginated::from_page(items, total, page))
    }

    /// All expenses, newest first.
    pub async fn list(&self, user_id: i64, page: Pagination) -> Result<Paginated<ExpenseListItem>, DbError> {
        self.list_where(user_id, None, false, page).await
    }

    /// Bills only, newest first.
    pub async fn list_bills(
        &self,
        user_id: i64,
        page: Pagination,
    ) -> Result<Paginated<ExpenseListItem>, DbError> {
        self.list_where(user_id, None, true, page).await
    }

    pub async fn list_for_category(
        &self,
        user_id: i64,
        category_id: i64,
        page: Pagination,
    ) -> Result<Paginated<ExpenseListItem>, DbError> {
        self.list_where(user_id, Some(category_id), false, page).await
    }

    pub async fn get(&self, user_id: i64, id: i64) -> Result<ExpenseListItem, DbError> {
        sqlx::query_as::<_, ExpenseListItem>(&format!(
            r#"
            SELECT {COLUMNS}, c.name AS category_name, c.slug AS category_slug
            FROM expenses e
            JOIN categories c ON c.id = e.category_id
            WHERE e.id = $1 AND e.user_id = $2
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("expense", id))
    }

    /// Create a simple expense.
    pub async fn create(&self, user_id: i64, fields: &ExpenseFields) -> Result<Expense, DbError> {
        let mut conn = self.pool.acquire().await?;
        let expense = insert_in(&mut conn, user_id, fields, false).await?;
        tracing::info!(user_id, id = expense.id, amount = %expense.amount, "expense created");
        Ok(expense)
    }

    /// Create an empty bill; its amount comes from the items added later.
    pub async fn create_bill(&self, user_id: i64, fields: &ExpenseFields) -> Result<Expense, DbError> {
        let fields = ExpenseFields {
            amount: Decimal::ZERO,
            ..fields.clone()
        };
        let mut conn = self.pool.acquire().await?;
        let bill = insert_in(&mut conn, user_id, &fields, true).await?;
        tracing::info!(user_id, id = bill.id, "bill created");
        Ok(bill)
    }

    /// Update an expense. For bills the amount is ignored and recalculated.
    pub async fn update(&self, user_id: i64, id: i64, fields: &ExpenseFields) -> Result<Expense, DbError> {
        let mut tx = self.pool.begin().await?;
        let current = get_in(&mut tx, user_id, id).await?;
        let expense = overwrite_in(&mut tx, user_id, id, fields, current.is_bill).await?;
        tx.commit().await?;
        Ok(expense)
    }

    pub async fn delete(&self, user_id: i64, id: i64) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        delete_in(&mut tx, user_id, id).await?;
        tx.commit().await?;

        tracing::info!(user_id, id, "expense deleted");
        Ok(())
    }

    /// Turn a simple expense into a bill, or a bill back into a simple expense.
    ///
    /// A converted expense becomes a bill with one item carrying its amount.
    /// A converted bill keeps its amount, takes its automatic description and
    /// loses its items.
    pub async fn convert(&self, user_id: i64, id: i64) -> Result<Expense, DbError> {
        let mut tx = self.pool.begin().await?;
        let current = get_in(&mut tx, user_id, id).await?;

        let converted = if current.is_bill {
            let item_ids: Vec<i64> =
                sqlx::query_scalar("DELETE FROM bill_items WHERE bill_id = $1 RETURNING id")
                    .bind(id)
                    .fetch_all(&mut *tx)
                    .await?;
            deletions::record_many(&mut tx, user_id, SyncModel::BillItem, &item_ids).await?;

            sqlx::query_as::<_, Expense>(&format!(
                r#"
                UPDATE expenses e
                SET is_bill = FALSE, description = e.description_cache, date_modified = NOW()
                WHERE e.id = $1
                RETURNING {COLUMNS}
                "#
            ))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?
        } else {
            let product = Product::truncated(&current.description)
                .or_else(|_| Product::truncated(&current.vendor))?;
            sqlx::query(
                r#"
                INSERT INTO bill_items (user_id, bill_id, product, serving, count, unit_price)
                VALUES ($1, $2, $3, 1, 1, $4)
                "#,
            )
            .bind(user_id)
            .bind(id)
            .bind(product.as_str())
            .bind(current.amount)
            .execute(&mut *tx)
            .await?;

            sqlx::query("UPDATE expenses SET is_bill = TRUE, description = '' WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            recalculate_in(&mut tx, user_id, id).await?
        };

        tx.commit().await?;
        tracing::info!(user_id, id, is_bill = converted.is_bill, "expense converted");
        Ok(converted)
    }

    /// Aggregates for the landing page.
    pub async fn dashboard(
        &self,
        user_id: i64,
        today: NaiveDate,
        recent_count: u32,
    ) -> Result<Dashboard, DbError> {
        let recent = sqlx::query_as::<_, ExpenseListItem>(&format!(
            r#"
            SELECT {COLUMNS}, c.name AS category_name, c.slug AS category_slug
            FROM expenses e
            JOIN categories c ON c.id = e.category_id
            WHERE e.user_id = $1
            {ORDER}
            LIMIT $2
            "#
        ))
        .bind(user_id)
        .bind(i64::from(recent_count))
        .fetch_all(self.pool)
        .await?;

        let mut last_days = sqlx::query_as::<_, DaySum>(
            r#"
            SELECT date, SUM(amount) AS sum
            FROM expenses
            WHERE user_id = $1
            GROUP BY date
            ORDER BY date DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(DASHBOARD_DAYS)
        .fetch_all(self.pool)
        .await?;
        last_days.reverse();
        let last_days_sum: Decimal = last_days.iter().map(|d| d.sum).sum();

        let (month_start, next_month) = month_bounds(today);
        let previous_start = previous_month_start(today);
        let totals = sqlx::query(
            r#"
            SELECT COALESCE(SUM(amount) FILTER (WHERE date >= $2 AND date < $3), 0) AS current_month,
                   COALESCE(SUM(amount) FILTER (WHERE date >= $4 AND date < $2), 0) AS previous_month
            FROM expenses
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(month_start)
        .bind(next_month)
        .bind(previous_start)
        .fetch_one(self.pool)
        .await?;

        let categories = sqlx::query_as::<_, CategorySpending>(
            r#"
            SELECT c.id, c.name, c.slug, SUM(e.amount) AS sum
            FROM categories c
            JOIN expenses e ON e.category_id = c.id
            WHERE c.user_id = $1
            GROUP BY c.id, c.name, c.slug
            ORDER BY sum DESC, c.name
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(Dashboard {
            recent,
            last_days,
            last_days_sum,
            current_month: totals.get("current_month"),
            previous_month: totals.get("previous_month"),
            categories,
        })
    }
}
