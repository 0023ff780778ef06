//! Category repository
//!
//! Slugs are unique per user. Deleting a category that still has expenses or
//! templates requires a destination to move them to.

use chrono::{DateTime, Utc};
use expensectl_core::slug::{ExistingSlug, SlugAssignment};
use expensectl_core::sync::SyncModel;
use expensectl_core::{assign_slug, slugify};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool, Row};

use super::{deletions, is_unique_violation, like_prefix, DbError};
use crate::models::{CategoryName, Paginated, Pagination};

/// Category record from database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Category {
    pub id: i64,
    #[serde(skip)]
    pub user_id: i64,
    pub name: String,
    pub slug: String,
    #[serde(skip)]
    pub slugbase: String,
    #[sqlx(rename = "sort_order")]
    pub order: i32,
    pub date_added: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
}

/// Category with usage counts for list display
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CategoryWithCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub category: Category,
    pub expense_count: i64,
    pub template_count: i64,
}

impl CategoryWithCount {
    /// Expenses and templates that reference the category.
    pub fn total_count(&self) -> i64 {
        self.expense_count + self.template_count
    }
}

/// Rename or reorder of an existing category
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryChange {
    pub id: i64,
    pub name: String,
    #[serde(default = "default_order")]
    pub order: i32,
}

/// Category to add
#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default = "default_order")]
    pub order: i32,
}

pub(crate) fn default_order() -> i32 {
    1
}

/// Outcome of a bulk edit
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkEditSummary {
    pub changed: usize,
    pub added: usize,
    pub failed: Vec<String>,
}

const COLUMNS: &str =
    "c.id, c.user_id, c.name, c.slug, c.slugbase, c.sort_order, c.date_added, c.date_modified";

fn counted_select(filter: &str) -> String {
    format!(
        r#"
        SELECT {COLUMNS},
               (SELECT COUNT(*) FROM expenses e WHERE e.category_id = c.id) AS expense_count,
               (SELECT COUNT(*) FROM expense_templates t WHERE t.category_id = c.id) AS template_count
        FROM categories c
        WHERE c.user_id = $1 {filter}
        ORDER BY c.sort_order, c.name, c.id
        "#
    )
}

fn map_unique(err: sqlx::Error, name: &str) -> DbError {
    if is_unique_violation(&err) {
        DbError::conflict(format!("category '{name}' already exists"))
    } else {
        DbError::Sqlx(err)
    }
}

async fn same_base(
    conn: &mut PgConnection,
    user_id: i64,
    slugbase: &str,
) -> Result<Vec<ExistingSlug>, sqlx::Error> {
    let rows = sqlx::query("SELECT id, slug FROM categories WHERE user_id = $1 AND slugbase = $2")
        .bind(user_id)
        .bind(slugbase)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows
        .into_iter()
        .map(|row| ExistingSlug {
            id: row.get("id"),
            slug: row.get("slug"),
        })
        .collect())
}

/// Slugs of the user's other categories equal to `slugbase` or `slugbase-*`.
async fn taken_slugs(
    conn: &mut PgConnection,
    user_id: i64,
    slugbase: &str,
    self_id: Option<i64>,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT slug FROM categories
        WHERE user_id = $1
          AND (slug = $2 OR slug LIKE $3)
          AND ($4::BIGINT IS NULL OR id <> $4)
        "#,
    )
    .bind(user_id)
    .bind(slugbase)
    .bind(like_prefix(&format!("{slugbase}-")))
    .bind(self_id)
    .fetch_all(&mut *conn)
    .await
}

pub(crate) async fn get_in(
    conn: &mut PgConnection,
    user_id: i64,
    id: i64,
) -> Result<Category, DbError> {
    sqlx::query_as::<_, Category>(&format!(
        "SELECT {COLUMNS} FROM categories c WHERE c.id = $1 AND c.user_id = $2 FOR UPDATE"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("category", id))
}

pub(crate) async fn create_in(
    conn: &mut PgConnection,
    user_id: i64,
    name: &CategoryName,
    order: i32,
) -> Result<Category, DbError> {
    let base = slugify(name.as_str());
    let existing = same_base(conn, user_id, &base).await?;
    let taken = taken_slugs(conn, user_id, &base, None).await?;
    let SlugAssignment { slug, slugbase } =
        assign_slug(name.as_str(), None, &existing, &taken, None)
        .unwrap_or_else(|| SlugAssignment {
            slug: base.clone(),
            slugbase: base,
        });

    sqlx::query_as::<_, Category>(&format!(
        r#"
        INSERT INTO categories AS c (user_id, name, slug, slugbase, sort_order)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(name.as_str())
    .bind(&slug)
    .bind(&slugbase)
    .bind(order)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| map_unique(e, name.as_str()))
}

pub(crate) async fn update_in(
    conn: &mut PgConnection,
    user_id: i64,
    id: i64,
    name: &CategoryName,
    order: i32,
) -> Result<Category, DbError> {
    let current = get_in(conn, user_id, id).await?;
    let base = slugify(name.as_str());
    let existing = same_base(conn, user_id, &base).await?;
    let taken = taken_slugs(conn, user_id, &base, Some(id)).await?;
    let (slug, slugbase) = match assign_slug(
        name.as_str(),
        Some((&current.slug, &current.slugbase)),
        &existing,
        &taken,
        Some(id),
    ) {
        Some(assignment) => (assignment.slug, assignment.slugbase),
        None => (current.slug, current.slugbase),
    };

    sqlx::query_as::<_, Category>(&format!(
        r#"
        UPDATE categories AS c
        SET name = $3, slug = $4, slugbase = $5, sort_order = $6, date_modified = NOW()
        WHERE c.id = $1 AND c.user_id = $2
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(user_id)
    .bind(name.as_str())
    .bind(&slug)
    .bind(&slugbase)
    .bind(order)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| map_unique(e, name.as_str()))
}

pub(crate) async fn total_count_in(
    conn: &mut PgConnection,
    category_id: i64,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT (SELECT COUNT(*) FROM expenses WHERE category_id = $1)
             + (SELECT COUNT(*) FROM expense_templates WHERE category_id = $1) AS total
        "#,
    )
    .bind(category_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row.get("total"))
}

/// Records modified in `(after, until]`, or up to `until` without a lower bound.
pub(crate) async fn modified_in(
    conn: &mut PgConnection,
    user_id: i64,
    after: Option<DateTime<Utc>>,
    until: DateTime<Utc>,
) -> Result<Vec<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(&format!(
        r#"
        SELECT {COLUMNS}
        FROM categories c
        WHERE c.user_id = $1
          AND ($2::TIMESTAMPTZ IS NULL OR c.date_modified > $2)
          AND c.date_modified <= $3
        ORDER BY c.id
        "#
    ))
    .bind(user_id)
    .bind(after)
    .bind(until)
    .fetch_all(&mut *conn)
    .await
}

/// Delete a category, first moving its expenses and templates when it has any.
pub(crate) async fn delete_in(
    conn: &mut PgConnection,
    user_id: i64,
    id: i64,
    move_to: Option<i64>,
) -> Result<(), DbError> {
    get_in(conn, user_id, id).await?;

    let total = total_count_in(conn, id).await?;
    if total > 0 {
        let destination = move_to.ok_or_else(|| {
            DbError::conflict(format!(
                "category is used by {total} expenses and templates; a move destination is required"
            ))
        })?;
        if destination == id {
            return Err(DbError::invalid("cannot move a category into itself"));
        }
        get_in(conn, user_id, destination).await?;

        let moved = sqlx::query(
            r#"
            UPDATE expenses SET category_id = $2, date_modified = NOW()
            WHERE category_id = $1 AND user_id = $3
            "#,
        )
        .bind(id)
        .bind(destination)
        .bind(user_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        sqlx::query(
            r#"
            UPDATE expense_templates SET category_id = $2, date_modified = NOW()
            WHERE category_id = $1 AND user_id = $3
            "#,
        )
        .bind(id)
        .bind(destination)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

        tracing::info!(user_id, from = id, to = destination, moved, "moved category contents");
    }

    sqlx::query("DELETE FROM categories WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    deletions::record(conn, user_id, SyncModel::Category, id).await?;
    Ok(())
}

/// Category repository
pub struct CategoryRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories of a user with usage counts, in display order.
    pub async fn list(&self, user_id: i64) -> Result<Vec<CategoryWithCount>, DbError> {
        let categories = sqlx::query_as::<_, CategoryWithCount>(&counted_select(""))
            .bind(user_id)
            .fetch_all(self.pool)
            .await?;
        Ok(categories)
    }

    pub async fn list_paginated(
        &self,
        user_id: i64,
        page: Pagination,
    ) -> Result<Paginated<CategoryWithCount>, DbError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {COLUMNS},
                   (SELECT COUNT(*) FROM expenses e WHERE e.category_id = c.id) AS expense_count,
                   (SELECT COUNT(*) FROM expense_templates t WHERE t.category_id = c.id) AS template_count,
                   COUNT(*) OVER() AS total
            FROM categories c
            WHERE c.user_id = $1
            ORDER BY c.sort_order, c.name, c.id
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total = rows.first().map(|r| r.get::<i64, _>("total")).unwrap_or(0);
        let items = rows
            .iter()
            .map(CategoryWithCount::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Paginated::from_page(items, total, page))
    }

    /// Number of expenses and templates in the category.
    pub async fn total_count(&self, user_id: i64, id: i64) -> Result<i64, DbError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("SELECT 1 FROM categories WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found("category", id))?;
        Ok(total_count_in(&mut conn, id).await?)
    }

    pub async fn get(&self, user_id: i64, id: i64) -> Result<CategoryWithCount, DbError> {
        sqlx::query_as::<_, CategoryWithCount>(&counted_select("AND c.id = $2"))
            .bind(user_id)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("category", id))
    }

    pub async fn get_by_slug(&self, user_id: i64, slug: &str) -> Result<CategoryWithCount, DbError> {
        sqlx::query_as::<_, CategoryWithCount>(&counted_select("AND c.slug = $2"))
            .bind(user_id)
            .bind(slug)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("category", slug))
    }

    pub async fn create(
        &self,
        user_id: i64,
        name: &CategoryName,
        order: i32,
    ) -> Result<Category, DbError> {
        let mut tx = self.pool.begin().await?;
        let category = create_in(&mut tx, user_id, name, order).await?;
        tx.commit().await?;

        tracing::info!(user_id, id = category.id, slug = %category.slug, "category created");
        Ok(category)
    }

    pub async fn update(
        &self,
        user_id: i64,
        id: i64,
        name: &CategoryName,
        order: i32,
    ) -> Result<Category, DbError> {
        let mut tx = self.pool.begin().await?;
        let category = update_in(&mut tx, user_id, id, name, order).await?;
        tx.commit().await?;
        Ok(category)
    }

    /// Delete a category, moving its contents to `move_to` when it has any.
    pub async fn delete(&self, user_id: i64, id: i64, move_to: Option<i64>) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        delete_in(&mut tx, user_id, id, move_to).await?;
        tx.commit().await?;

        tracing::info!(user_id, id, ?move_to, "category deleted");
        Ok(())
    }

    /// Apply renames, reorders and additions in one transaction.
    ///
    /// Entries that fail validation are reported in `failed` and skipped;
    /// a database error aborts the whole edit.
    pub async fn bulk_edit(
        &self,
        user_id: i64,
        changes: &[CategoryChange],
        additions: &[NewCategory],
    ) -> Result<BulkEditSummary, DbError> {
        let mut summary = BulkEditSummary::default();
        let mut tx = self.pool.begin().await?;

        for change in changes {
            let name = match CategoryName::new(&change.name) {
                Ok(name) => name,
                Err(e) => {
                    summary.failed.push(format!("category {}: {e}", change.id));
                    continue;
                }
            };
            let current = match get_in(&mut tx, user_id, change.id).await {
                Ok(current) => current,
                Err(DbError::NotFound { .. }) => {
                    summary.failed.push(format!("category {}: not found", change.id));
                    continue;
                }
                Err(e) => return Err(e),
            };
            if current.name == name.as_str() && current.order == change.order {
                continue;
            }
            update_in(&mut tx, user_id, change.id, &name, change.order).await?;
            summary.changed += 1;
        }

        for addition in additions {
            if addition.name.trim().is_empty() {
                continue;
            }
            match CategoryName::new(&addition.name) {
                Ok(name) => {
                    create_in(&mut tx, user_id, &name, addition.order).await?;
                    summary.added += 1;
                }
                Err(e) => summary.failed.push(format!("new category '{}': {e}", addition.name)),
            }
        }

        tx.commit().await?;
        tracing::info!(
            user_id,
            changed = summary.changed,
            added = summary.added,
            failed = summary.failed.len(),
            "category bulk edit"
        );
        Ok(summary)
    }
}
