//! Search over expenses, bill items and purchases
//!
//! Purchases are the union of simple expenses (description as product,
//! amount as unit price) and bill items, so one query answers "when did I
//! buy this and for how much".

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row};

use super::{like_contains, BillItem, DbError, ExpenseListItem};
use crate::models::{Paginated, Pagination};

/// What to search for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchFor {
    Expenses,
    #[serde(rename = "billitems")]
    BillItems,
    #[default]
    Purchases,
}

/// Search filters
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub search_for: SearchFor,
    /// Matched against descriptions or products
    pub q: String,
    pub vendor: String,
    pub include_expenses: bool,
    pub include_bills: bool,
    /// `None` searches every category
    pub categories: Option<Vec<i64>>,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
}

/// Bill item hit with its bill's date and vendor
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BillItemHit {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub item: BillItem,
    pub date: NaiveDate,
    pub vendor: String,
}

/// One purchase: a simple expense or a bill item
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PurchaseRow {
    pub date: NaiveDate,
    pub vendor: String,
    pub product: String,
    pub unit_price: Decimal,
}

/// Search results, tagged by what was searched
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "for", content = "results", rename_all = "lowercase")]
pub enum SearchResults {
    Expenses(Paginated<ExpenseListItem>),
    #[serde(rename = "billitems")]
    BillItems(Paginated<BillItemHit>),
    Purchases(Paginated<PurchaseRow>),
}

/// Column names the shared filters apply to
struct FilterColumns {
    text: &'static str,
    vendor: &'static str,
    category: &'static str,
    date: &'static str,
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &SearchQuery, cols: &FilterColumns) {
    if !query.q.is_empty() {
        qb.push(format!(" AND {} ILIKE ", cols.text))
            .push_bind(like_contains(&query.q));
    }
    if !query.vendor.is_empty() {
        qb.push(format!(" AND {} ILIKE ", cols.vendor))
            .push_bind(like_contains(&query.vendor));
    }
    if let Some(categories) = &query.categories {
        qb.push(format!(" AND {} = ANY(", cols.category))
            .push_bind(categories.clone())
            .push(")");
    }
    if let Some(start) = query.date_start {
        qb.push(format!(" AND {} >= ", cols.date)).push_bind(start);
    }
    if let Some(end) = query.date_end {
        qb.push(format!(" AND {} <= ", cols.date)).push_bind(end);
    }
}

fn push_page(qb: &mut QueryBuilder<'_, Postgres>, page: Pagination) {
    qb.push(" LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());
}

fn paginate<T>(rows: &[sqlx::postgres::PgRow], page: Pagination) -> Result<Paginated<T>, DbError>
where
    T: for<'r> FromRow<'r, sqlx::postgres::PgRow>,
{
    let total = rows.first().map(|r| r.get::<i64, _>("total")).unwrap_or(0);
    let items = rows.iter().map(T::from_row).collect::<Result<Vec<_>, _>>()?;
    Ok(Paginated::from_page(items, total, page))
}

/// Search repository
pub struct SearchRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> SearchRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn search(
        &self,
        user_id: i64,
        query: &SearchQuery,
        page: Pagination,
    ) -> Result<SearchResults, DbError> {
        tracing::debug!(user_id, search_for = ?query.search_for, q = %query.q, "search");
        match query.search_for {
            SearchFor::Expenses => self.expenses(user_id, query, page).await.map(SearchResults::Expenses),
            SearchFor::BillItems => self.bill_items(user_id, query, page).await.map(SearchResults::BillItems),
            SearchFor::Purchases => self.purchases(user_id, query, page).await.map(SearchResults::Purchases),
        }
    }

    async fn expenses(
        &self,
        user_id: i64,
        query: &SearchQuery,
        page: Pagination,
    ) -> Result<Paginated<ExpenseListItem>, DbError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT e.id, e.user_id, e.date, e.vendor, e.category_id, e.amount, e.description,
                   e.description_cache, e.is_bill, e.date_added, e.date_modified,
                   c.name AS category_name, c.slug AS category_slug,
                   COUNT(*) OVER() AS total
            FROM expenses e
            JOIN categories c ON c.id = e.category_id
            WHERE e.user_id = "#,
        );
        qb.push_bind(user_id);
        push_filters(
            &mut qb,
            query,
            &FilterColumns {
                text: "e.description_cache",
                vendor: "e.vendor",
                category: "e.category_id",
                date: "e.date",
            },
        );
        match (query.include_expenses, query.include_bills) {
            (true, false) => {
                qb.push(" AND NOT e.is_bill");
            }
            (false, true) => {
                qb.push(" AND e.is_bill");
            }
            _ => {}
        }
        qb.push(" ORDER BY e.date DESC, e.date_added DESC, e.id DESC");
        push_page(&mut qb, page);

        let rows = qb.build().fetch_all(self.pool).await?;
        paginate(&rows, page)
    }

    async fn bill_items(
        &self,
        user_id: i64,
        query: &SearchQuery,
        page: Pagination,
    ) -> Result<Paginated<BillItemHit>, DbError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT i.id, i.user_id, i.bill_id, i.product, i.serving, i.count, i.unit_price,
                   i.date_added, i.date_modified, e.date, e.vendor,
                   COUNT(*) OVER() AS total
            FROM bill_items i
            JOIN expenses e ON e.id = i.bill_id
            WHERE i.user_id = "#,
        );
        qb.push_bind(user_id);
        push_filters(
            &mut qb,
            query,
            &FilterColumns {
                text: "i.product",
                vendor: "e.vendor",
                category: "e.category_id",
                date: "e.date",
            },
        );
        qb.push(" ORDER BY i.date_added DESC, i.id DESC");
        push_page(&mut qb, page);

        let rows = qb.build().fetch_all(self.pool).await?;
        paginate(&rows, page)
    }

    async fn purchases(
        &self,
        user_id: i64,
        query: &SearchQuery,
        page: Pagination,
    ) -> Result<Paginated<PurchaseRow>, DbError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT d.date, d.vendor, d.product, d.unit_price, COUNT(*) OVER() AS total
            FROM (
                SELECT date, vendor, description AS product, amount AS unit_price,
                       category_id, date_added
                FROM expenses
                WHERE NOT is_bill AND user_id = "#,
        );
        qb.push_bind(user_id);
        qb.push(
            r#"
                UNION ALL
                SELECT e.date, e.vendor, i.product, i.unit_price, e.category_id, i.date_added
                FROM bill_items i
                JOIN expenses e ON e.id = i.bill_id
                WHERE i.user_id = "#,
        );
        qb.push_bind(user_id);
        qb.push(") AS d WHERE TRUE");
        push_filters(
            &mut qb,
            query,
            &FilterColumns {
                text: "d.product",
                vendor: "d.vendor",
                category: "d.category_id",
                date: "d.date",
            },
        );
        qb.push(" ORDER BY d.date DESC, d.date_added DESC");
        push_page(&mut qb, page);

        let rows = qb.build().fetch_all(self.pool).await?;
        paginate(&rows, page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_for_names() {
        assert_eq!(serde_json::from_str::<SearchFor>("\"billitems\"").unwrap(), SearchFor::BillItems);
        assert_eq!(serde_json::from_str::<SearchFor>("\"expenses\"").unwrap(), SearchFor::Expenses);
        assert_eq!(SearchFor::default(), SearchFor::Purchases);
    }

    #[test]
    fn filters_bind_in_order() {
        let query = SearchQuery {
            q: "milk".into(),
            vendor: "aldi".into(),
            categories: Some(vec![1, 2]),
            date_start: NaiveDate::from_ymd_opt(2024, 1, 1),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM x WHERE TRUE");
        push_filters(
            &mut qb,
            &query,
            &FilterColumns {
                text: "p",
                vendor: "v",
                category: "c",
                date: "d",
            },
        );
        assert_eq!(
            qb.sql(),
            "SELECT 1 FROM x WHERE TRUE AND p ILIKE $1 AND v ILIKE $2 AND c = ANY($3) AND d >= $4"
        );
    }

    mod db {
        use super::*;
        use crate::db::repos::test_support::{seed_shopping, setup};

        fn milk(search_for: SearchFor) -> SearchQuery {
            SearchQuery {
                search_for,
                q: "milk".into(),
                ..Default::default()
            }
        }

        #[tokio::test]
        #[ignore = "requires database"]
        async fn each_mode_sees_only_own_records() {
            let (pool, user_id) = setup().await;
            let (_, other_user) = setup().await;
            seed_shopping(&pool, user_id, "Aldi").await;
            seed_shopping(&pool, other_user, "Auchan").await;
            let repo = SearchRepo::new(&pool);

            let SearchResults::Expenses(expenses) =
                repo.search(user_id, &milk(SearchFor::Expenses), Pagination::default()).await.unwrap()
            else {
                panic!("expected expenses");
            };
            // two simple expenses plus the bill whose items mention milk
            assert_eq!(expenses.total, 3);
            assert!(expenses.items.iter().all(|e| e.expense.user_id == user_id));
            assert!(expenses.items.iter().all(|e| e.expense.vendor.starts_with("Aldi")));

            let SearchResults::BillItems(items) =
                repo.search(user_id, &milk(SearchFor::BillItems), Pagination::default()).await.unwrap()
            else {
                panic!("expected bill items");
            };
            assert_eq!(items.total, 1);
            assert_eq!(items.items[0].vendor, "Aldi Express");
            assert_eq!(items.items[0].item.user_id, user_id);

            let SearchResults::Purchases(purchases) =
                repo.search(user_id, &milk(SearchFor::Purchases), Pagination::default()).await.unwrap()
            else {
                panic!("expected purchases");
            };
            assert_eq!(purchases.total, 3);
            let prices: Vec<String> = purchases.items.iter().map(|p| p.unit_price.to_string()).collect();
            assert_eq!(prices, ["1.99", "3.80", "3.50"]);
            assert!(purchases.items.iter().all(|p| !p.vendor.contains("Auchan")));
        }

        #[tokio::test]
        #[ignore = "requires database"]
        async fn filters_narrow_results() {
            let (pool, user_id) = setup().await;
            let shopping = seed_shopping(&pool, user_id, "Aldi").await;
            let repo = SearchRepo::new(&pool);

            let bills_only = SearchQuery {
                include_bills: true,
                ..milk(SearchFor::Expenses)
            };
            let SearchResults::Expenses(bills) =
                repo.search(user_id, &bills_only, Pagination::default()).await.unwrap()
            else {
                panic!("expected expenses");
            };
            assert_eq!(bills.total, 1);
            assert_eq!(bills.items[0].expense.id, shopping.bill_id);

            let february = SearchQuery {
                date_start: NaiveDate::from_ymd_opt(2024, 2, 1),
                date_end: NaiveDate::from_ymd_opt(2024, 2, 29),
                categories: Some(vec![shopping.category_id]),
                ..milk(SearchFor::Purchases)
            };
            let SearchResults::Purchases(purchases) =
                repo.search(user_id, &february, Pagination::default()).await.unwrap()
            else {
                panic!("expected purchases");
            };
            assert_eq!(purchases.total, 2);

            let elsewhere = SearchQuery {
                vendor: "Auchan".into(),
                ..milk(SearchFor::Purchases)
            };
            let SearchResults::Purchases(none) =
                repo.search(user_id, &elsewhere, Pagination::default()).await.unwrap()
            else {
                panic!("expected purchases");
            };
            assert_eq!(none.total, 0);
            assert!(none.items.is_empty());

            let SearchResults::Purchases(paged) =
                repo.search(user_id, &milk(SearchFor::Purchases), Pagination::new(2, 2)).await.unwrap()
            else {
                panic!("expected purchases");
            };
            assert_eq!(paged.total, 3);
            assert_eq!(paged.items.len(), 1);
        }
    }
}
