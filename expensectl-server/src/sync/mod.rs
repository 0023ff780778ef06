//! Sync engine
//!
//! One run is one transaction. `now` is the transaction timestamp, so every
//! row written during the run carries `date_modified = now` and the next
//! run's window `(last_sync, now]` starts exactly where this one ended.

mod records;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use expensectl_core::sync::{Ack, ChangeRecord, DeletionRef, SyncModel, SyncRequest, SyncResponse};
use serde_json::Value;
use sqlx::{PgConnection, PgPool};

use crate::db::repos::{bill_items, categories, deletions, expenses, templates};
use crate::db::DbError;

/// Sync failure
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("invalid {model} record: {reason}")]
    Malformed { model: SyncModel, reason: String },
}

impl From<sqlx::Error> for SyncError {
    fn from(err: sqlx::Error) -> Self {
        Self::Db(DbError::Sqlx(err))
    }
}

fn table(model: SyncModel) -> &'static str {
    match model {
        SyncModel::Category => "categories",
        SyncModel::Expense => "expenses",
        SyncModel::BillItem => "bill_items",
        SyncModel::ExpenseTemplate => "expense_templates",
    }
}

async fn exists(
    conn: &mut PgConnection,
    user_id: i64,
    model: SyncModel,
    id: i64,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(&format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1 AND user_id = $2)",
        table(model)
    ))
    .bind(id)
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await
}

/// Runs the reconciliation protocol for one user
pub struct SyncEngine<'a> {
    pool: &'a PgPool,
}

impl<'a> SyncEngine<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn run(&self, user_id: i64, request: &SyncRequest) -> Result<SyncResponse, SyncError> {
        let mut tx = self.pool.begin().await?;
        let now: DateTime<Utc> = sqlx::query_scalar("SELECT NOW()").fetch_one(&mut *tx).await?;
        let mut response = SyncResponse::empty(now);

        let Some(last_sync) = request.last_sync else {
            collect_changes(&mut tx, user_id, None, now, &mut response).await?;
            tx.commit().await?;
            tracing::info!(user_id, "initial sync");
            return Ok(response);
        };

        response.deletions.new = deletions::between(&mut tx, user_id, Some(last_sync), now).await?;

        for deletion in &request.deletions {
            let outcome = apply_deletion(&mut tx, user_id, *deletion).await?;
            match outcome {
                DeletionOutcome::Ack => response.deletions.ack.push(*deletion),
                DeletionOutcome::NotFound => response.deletions.not_found.push(*deletion),
            }
        }

        let mut touched_bills = BTreeSet::new();
        for model in SyncModel::ALL {
            let Some(changes) = request.changes.get(&model) else {
                continue;
            };
            if !model.accepts_uploads() {
                if !changes.is_empty() {
                    tracing::warn!(user_id, %model, count = changes.len(), "ignoring uploads of download-only model");
                }
                continue;
            }

            for change in changes {
                match apply_change(&mut tx, user_id, model, change, &mut touched_bills).await? {
                    ChangeOutcome::Saved(id) => {
                        response.changes.ack.entry(model).or_default().push(Ack {
                            local_id: change.local_id.clone(),
                            id,
                        });
                    }
                    ChangeOutcome::Deleted(id) => response.changes.deleted.push(DeletionRef { model, id }),
                    ChangeOutcome::NotFound(id) => response.changes.not_found.push(DeletionRef { model, id }),
                }
            }
        }

        for bill_id in touched_bills {
            match expenses::recalculate_in(&mut tx, user_id, bill_id).await {
                Ok(_) | Err(DbError::NotFound { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }

        collect_changes(&mut tx, user_id, Some(last_sync), now, &mut response).await?;
        tx.commit().await?;

        tracing::info!(
            user_id,
            deletions_in = request.deletions.len(),
            deletions_out = response.deletions.new.len(),
            acks = response.changes.ack.values().map(Vec::len).sum::<usize>(),
            "sync run"
        );
        Ok(response)
    }
}

enum DeletionOutcome {
    Ack,
    NotFound,
}

async fn apply_deletion(
    conn: &mut PgConnection,
    user_id: i64,
    deletion: DeletionRef,
) -> Result<DeletionOutcome, SyncError> {
    let DeletionRef { model, id } = deletion;

    if exists(conn, user_id, model, id).await? {
        let result = match model {
            SyncModel::Category => categories::delete_in(conn, user_id, id, None).await,
            SyncModel::Expense => expenses::delete_in(conn, user_id, id).await,
            SyncModel::BillItem => match bill_items::delete_in(conn, user_id, id).await {
                Ok(bill_id) => expenses::recalculate_in(conn, user_id, bill_id).await.map(|_| ()),
                Err(e) => Err(e),
            },
            SyncModel::ExpenseTemplate => templates::delete_in(conn, user_id, id).await,
        };
        return match result {
            Ok(()) => Ok(DeletionOutcome::Ack),
            Err(DbError::Conflict { reason }) => {
                tracing::warn!(user_id, %model, id, %reason, "deletion refused");
                Ok(DeletionOutcome::NotFound)
            }
            Err(e) => Err(e.into()),
        };
    }

    if deletions::exists(conn, user_id, model, id).await? {
        Ok(DeletionOutcome::Ack)
    } else {
        Ok(DeletionOutcome::NotFound)
    }
}

enum ChangeOutcome {
    Saved(i64),
    Deleted(i64),
    NotFound(i64),
}

async fn apply_change(
    conn: &mut PgConnection,
    user_id: i64,
    model: SyncModel,
    change: &ChangeRecord,
    touched_bills: &mut BTreeSet<i64>,
) -> Result<ChangeOutcome, SyncError> {
    if let Some(id) = change.id {
        if !exists(conn, user_id, model, id).await? {
            return if deletions::exists(conn, user_id, model, id).await? {
                Ok(ChangeOutcome::Deleted(id))
            } else {
                Ok(ChangeOutcome::NotFound(id))
            };
        }
    }

    let saved = match model {
        SyncModel::Expense => {
            let parsed = records::expense_change(change)?;
            let expense = match change.id {
                None => expenses::insert_in(conn, user_id, &parsed.fields, parsed.is_bill).await,
                Some(id) => expenses::overwrite_in(conn, user_id, id, &parsed.fields, parsed.is_bill).await,
            };
            expense.map(|e| e.id)
        }
        SyncModel::BillItem => {
            let parsed = records::bill_item_change(change)?;
            let item = match change.id {
                None => bill_items::insert_in(conn, user_id, parsed.bill_id, &parsed.fields).await,
                Some(id) => {
                    let previous = bill_items::get_in(conn, user_id, id).await?;
                    touched_bills.insert(previous.bill_id);
                    bill_items::overwrite_in(conn, user_id, id, parsed.bill_id, &parsed.fields).await
                }
            };
            touched_bills.insert(parsed.bill_id);
            item.map(|i| i.id)
        }
        SyncModel::ExpenseTemplate => {
            let fields = records::template_change(change)?;
            let template = match change.id {
                None => templates::insert_in(conn, user_id, &fields).await,
                Some(id) => templates::overwrite_in(conn, user_id, id, &fields).await,
            };
            template.map(|t| t.id)
        }
        SyncModel::Category => {
            return Err(SyncError::Malformed {
                model,
                reason: "categories are download-only".into(),
            })
        }
    };

    match saved {
        Ok(id) => Ok(ChangeOutcome::Saved(id)),
        // references to missing categories or bills, or non-bill parents
        Err(e @ (DbError::NotFound { .. } | DbError::Invalid { .. } | DbError::Template(_))) => {
            Err(SyncError::Malformed {
                model,
                reason: e.to_string(),
            })
        }
        Err(e) => Err(e.into()),
    }
}

async fn collect_changes(
    conn: &mut PgConnection,
    user_id: i64,
    after: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    response: &mut SyncResponse,
) -> Result<(), SyncError> {
    let new = &mut response.changes.new;

    let categories = categories::modified_in(conn, user_id, after, now).await?;
    new.insert(
        SyncModel::Category,
        categories
            .iter()
            .map(|c| records::to_json(SyncModel::Category, c))
            .collect::<Result<Vec<Value>, _>>()?,
    );

    let expenses = expenses::modified_in(conn, user_id, after, now).await?;
    new.insert(
        SyncModel::Expense,
        expenses
            .iter()
            .map(|e| records::to_json(SyncModel::Expense, e))
            .collect::<Result<Vec<Value>, _>>()?,
    );

    let items = bill_items::modified_in(conn, user_id, after, now).await?;
    new.insert(
        SyncModel::BillItem,
        items
            .iter()
            .map(records::bill_item_json)
            .collect::<Result<Vec<Value>, _>>()?,
    );

    let templates = templates::modified_in(conn, user_id, after, now).await?;
    new.insert(
        SyncModel::ExpenseTemplate,
        templates
            .iter()
            .map(|t| records::to_json(SyncModel::ExpenseTemplate, t))
            .collect::<Result<Vec<Value>, _>>()?,
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repos::test_support::setup;
    use crate::db::{CategoryRepo, ExpenseRepo};
    use crate::models::CategoryName;
    use serde_json::json;

    fn request(value: Value) -> SyncRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn every_model_has_a_table() {
        for model in SyncModel::ALL {
            assert!(!table(model).is_empty());
        }
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn initial_sync_returns_everything() {
        let (pool, user_id) = setup().await;
        CategoryRepo::new(&pool)
            .create(user_id, &CategoryName::new("Food").unwrap(), 1)
            .await
            .unwrap();

        let response = SyncEngine::new(&pool)
            .run(user_id, &request(json!({"last_sync": null})))
            .await
            .unwrap();

        assert_eq!(response.changes.new[&SyncModel::Category].len(), 1);
        assert!(response.changes.new[&SyncModel::Expense].is_empty());
        assert!(response.deletions.new.is_empty());
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn uploads_are_acked_and_echoed() {
        let (pool, user_id) = setup().await;
        let category = CategoryRepo::new(&pool)
            .create(user_id, &CategoryName::new("Food").unwrap(), 1)
            .await
            .unwrap();
        let engine = SyncEngine::new(&pool);
        let first = engine.run(user_id, &request(json!({"last_sync": null}))).await.unwrap();

        let second = engine
            .run(
                user_id,
                &request(json!({
                    "last_sync": first.sync_date,
                    "deletions": [{"model": "expense", "id": 987654321}],
                    "changes": {
                        "expense": [{
                            "local_id": "tmp-1",
                            "date": "2024-05-01",
                            "vendor": "Bakery",
                            "category_id": category.id,
                            "amount": "3.20",
                            "description": "Rolls"
                        }]
                    }
                })),
            )
            .await
            .unwrap();

        let acks = &second.changes.ack[&SyncModel::Expense];
        assert_eq!(acks.len(), 1);
        assert_eq!(acks[0].local_id, json!("tmp-1"));
        assert_eq!(second.deletions.not_found.len(), 1);
        assert_eq!(second.changes.new[&SyncModel::Expense].len(), 1);

        let expense = ExpenseRepo::new(&pool).get(user_id, acks[0].id).await.unwrap();
        assert_eq!(expense.expense.description, "Rolls");
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn deleted_records_are_reported() {
        let (pool, user_id) = setup().await;
        let category = CategoryRepo::new(&pool)
            .create(user_id, &CategoryName::new("Food").unwrap(), 1)
            .await
            .unwrap();
        let engine = SyncEngine::new(&pool);
        let first = engine.run(user_id, &request(json!({"last_sync": null}))).await.unwrap();

        CategoryRepo::new(&pool).delete(user_id, category.id, None).await.unwrap();

        let second = engine
            .run(
                user_id,
                &request(json!({
                    "last_sync": first.sync_date,
                    "changes": {
                        "expensetemplate": [{
                            "id": 123456789,
                            "local_id": 1,
                            "name": "x", "vendor": "y", "category_id": category.id,
                            "amount": 1, "description": "z"
                        }]
                    }
                })),
            )
            .await
            .unwrap();

        assert_eq!(
            second.deletions.new,
            vec![DeletionRef { model: SyncModel::Category, id: category.id }]
        );
        assert_eq!(second.changes.not_found.len(), 1);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn malformed_upload_rolls_back() {
        let (pool, user_id) = setup().await;
        let err = SyncEngine::new(&pool)
            .run(
                user_id,
                &request(json!({
                    "last_sync": "2024-01-01T00:00:00Z",
                    "changes": {"expense": [{"local_id": 1, "vendor": "no date"}]}
                })),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Malformed { model: SyncModel::Expense, .. }));
    }
}
