//! Expense template repository
//!
//! Running a template evaluates it with the user's input and records the
//! resulting expense.

use chrono::{DateTime, NaiveDate, Utc};
use expensectl_core::sync::SyncModel;
use expensectl_core::templates::validate_template;
use expensectl_core::{run_template, TemplateInput, TemplateKind};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool, Row};

use super::{deletions, expenses, DbError, Expense, ExpenseFields};
use crate::models::{Comment, Description, Paginated, Pagination, TemplateDescription, TemplateName, Vendor};

/// Expense template record from database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExpenseTemplate {
    pub id: i64,
    #[serde(skip)]
    pub user_id: i64,
    pub name: String,
    pub vendor: String,
    pub category_id: i64,
    #[sqlx(rename = "type", try_from = "String")]
    #[serde(rename = "type")]
    pub kind: TemplateKind,
    pub amount: Option<Decimal>,
    pub description: String,
    pub comment: String,
    pub date_added: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
}

/// Validated template fields
#[derive(Debug, Clone)]
pub struct TemplateFields {
    pub name: TemplateName,
    pub vendor: Vendor,
    pub category_id: i64,
    pub kind: TemplateKind,
    pub amount: Option<Decimal>,
    pub description: TemplateDescription,
    pub comment: Comment,
}

const COLUMNS: &str = "t.id, t.user_id, t.name, t.vendor, t.category_id, t.type, t.amount, \
                       t.description, t.comment, t.date_added, t.date_modified";

pub(crate) async fn insert_in(
    conn: &mut PgConnection,
    user_id: i64,
    fields: &TemplateFields,
) -> Result<ExpenseTemplate, DbError> {
    validate_template(fields.kind, fields.amount)?;
    sqlx::query_as::<_, ExpenseTemplate>(&format!(
        r#"
        WITH inserted AS (
            INSERT INTO expense_templates (user_id, name, vendor, category_id, type, amount,
                                           description, comment)
            SELECT $1, $2, $3, c.id, $5, $6, $7, $8
            FROM categories c
            WHERE c.id = $4 AND c.user_id = $1
            RETURNING *
        )
        SELECT {COLUMNS} FROM inserted t
        "#
    ))
    .bind(user_id)
    .bind(fields.name.as_str())
    .bind(fields.vendor.as_str())
    .bind(fields.category_id)
    .bind(fields.kind.as_str())
    .bind(fields.amount)
    .bind(fields.description.as_str())
    .bind(fields.comment.as_str())
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("category", fields.category_id))
}

pub(crate) async fn overwrite_in(
    conn: &mut PgConnection,
    user_id: i64,
    id: i64,
    fields: &TemplateFields,
) -> Result<ExpenseTemplate, DbError> {
    validate_template(fields.kind, fields.amount)?;
    let updated = sqlx::query_as::<_, ExpenseTemplate>(&format!(
        r#"
        UPDATE expense_templates t
        SET name = $3, vendor = $4, category_id = c.id, type = $6, amount = $7,
            description = $8, comment = $9, date_modified = NOW()
        FROM categories c
        WHERE t.id = $1 AND t.user_id = $2 AND c.id = $5 AND c.user_id = $2
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(user_id)
    .bind(fields.name.as_str())
    .bind(fields.vendor.as_str())
    .bind(fields.category_id)
    .bind(fields.kind.as_str())
    .bind(fields.amount)
    .bind(fields.description.as_str())
    .bind(fields.comment.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    match updated {
        Some(template) => Ok(template),
        None => {
            get_in(conn, user_id, id).await?;
            Err(DbError::not_found("category", fields.category_id))
        }
    }
}

pub(crate) async fn get_in(
    conn: &mut PgConnection,
    user_id: i64,
    id: i64,
) -> Result<ExpenseTemplate, DbError> {
    sqlx::query_as::<_, ExpenseTemplate>(&format!(
        "SELECT {COLUMNS} FROM expense_templates t WHERE t.id = $1 AND t.user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("template", id))
}

/// Records modified in `(after, until]`, or up to `until` without a lower bound.
pub(crate) async fn modified_in(
    conn: &mut PgConnection,
    user_id: i64,
    after: Option<DateTime<Utc>>,
    until: DateTime<Utc>,
) -> Result<Vec<ExpenseTemplate>, sqlx::Error> {
    sqlx::query_as::<_, ExpenseTemplate>(&format!(
        r#"
        SELECT {COLUMNS}
        FROM expense_templates t
        WHERE t.user_id = $1
          AND ($2::TIMESTAMPTZ IS NULL OR t.date_modified > $2)
          AND t.date_modified <= $3
        ORDER BY t.id
        "#
    ))
    .bind(user_id)
    .bind(after)
    .bind(until)
    .fetch_all(&mut *conn)
    .await
}

pub(crate) async fn delete_in(
    conn: &mut PgConnection,
    user_id: i64,
    id: i64,
) -> Result<(), DbError> {
    let deleted = sqlx::query("DELETE FROM expense_templates WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(DbError::not_found("template", id));
    }
    deletions::record(conn, user_id, SyncModel::ExpenseTemplate, id).await?;
    Ok(())
}

/// Expense template repository
pub struct TemplateRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> TemplateRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    async fn list_where(
        &self,
        user_id: i64,
        category_id: Option<i64>,
        page: Pagination,
    ) -> Result<Paginated<ExpenseTemplate>, DbError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {COLUMNS}, COUNT(*) OVER() AS total
            FROM expense_templates t
            WHERE t.user_id = $1 AND ($2::BIGINT IS NULL OR t.category_id = $2)
            ORDER BY t.name, t.id
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(user_id)
        .bind(category_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total = rows.first().map(|r| r.get::<i64, _>("total")).unwrap_or(0);
        let items = rows
            .iter()
            .map(ExpenseTemplate::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Paginated::from_page(items, total, page))
    }

    /// Templates ordered by name.
    pub async fn list(&self, user_id: i64, page: Pagination) -> Result<Paginated<ExpenseTemplate>, DbError> {
        self.list_where(user_id, None, page).await
    }

    pub async fn list_for_category(
        &self,
        user_id: i64,
        category_id: i64,
        page: Pagination,
    ) -> Result<Paginated<ExpenseTemplate>, DbError> {
        self.list_where(user_id, Some(category_id), page).await
    }

    pub async fn get(&self, user_id: i64, id: i64) -> Result<ExpenseTemplate, DbError> {
        let mut conn = self.pool.acquire().await?;
        get_in(&mut conn, user_id, id).await
    }

    pub async fn create(&self, user_id: i64, fields: &TemplateFields) -> Result<ExpenseTemplate, DbError> {
        let mut conn = self.pool.acquire().await?;
        let template = insert_in(&mut conn, user_id, fields).await?;
        tracing::info!(user_id, id = template.id, kind = %template.kind, "template created");
        Ok(template)
    }

    pub async fn update(
        &self,
        user_id: i64,
        id: i64,
        fields: &TemplateFields,
    ) -> Result<ExpenseTemplate, DbError> {
        let mut conn = self.pool.acquire().await?;
        overwrite_in(&mut conn, user_id, id, fields).await
    }

    pub async fn delete(&self, user_id: i64, id: i64) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        delete_in(&mut tx, user_id, id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Evaluate a template and record the resulting expense on `date`.
    pub async fn run(
        &self,
        user_id: i64,
        id: i64,
        date: NaiveDate,
        input: &TemplateInput,
    ) -> Result<Expense, DbError> {
        let mut conn = self.pool.acquire().await?;
        let template = get_in(&mut conn, user_id, id).await?;
        let outcome = run_template(template.kind, template.amount, &template.description, input)?;

        let description: String = outcome.description.chars().take(Description::MAX_LEN).collect();
        let fields = ExpenseFields {
            date,
            vendor: Vendor::new(&template.vendor)?,
            category_id: template.category_id,
            amount: outcome.amount,
            description: Description::new(&description)?,
        };
        let expense = expenses::insert_in(&mut conn, user_id, &fields, false).await?;

        tracing::info!(user_id, template_id = id, expense_id = expense.id, "template run");
        Ok(expense)
    }
}
