//! Average spending per day, week, month and year.
//!
//! Two divisors are used: `dE`, the number of distinct days with expenses,
//! and `dA`, the span in days between the first and the last expense.

use rust_decimal::Decimal;
use std::collections::HashMap;

use super::{Align, CategoryRef, Cell, Column, ReportError, ReportOutput, ReportTable};
use crate::money::{round_money, MoneyFormat};

const TIMESCALES: [(i64, &str); 4] = [
    (1, "Per 1 day"),
    (7, "Per week (7 days)"),
    (30, "Per month (30 days)"),
    (365, "Per year (365 days)"),
];

const ALL_TIME: &str = "All time";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCounts {
    pub expense_days: i64,
    pub all_days: i64,
}

/// Expense count and sum of one category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryActivity {
    pub category_id: i64,
    pub count: i64,
    pub sum: Decimal,
}

fn scaled(value: Decimal, timescale: i64, days: i64) -> Decimal {
    value * Decimal::from(timescale) / Decimal::from(days)
}

fn count_cell(count: i64, timescale: i64, days: i64) -> Cell {
    Cell::from(round_money(scaled(Decimal::from(count), timescale, days)).normalize().to_string())
}

pub fn daily_spending(
    days: DayCounts,
    categories: &[CategoryRef],
    activity: &[CategoryActivity],
    money: &MoneyFormat,
) -> Result<ReportOutput, ReportError> {
    if days.all_days <= 0 || days.expense_days <= 0 {
        return Ok(ReportOutput::empty());
    }

    let divisors = [days.expense_days, days.all_days];
    let all_count: i64 = activity.iter().map(|a| a.count).sum();
    let all_sum: Decimal = activity.iter().map(|a| a.sum).sum();

    let mut overall = ReportTable::new(vec![
        Column::new("", Align::Left),
        Column::new("Count (dE)", Align::Right),
        Column::new("Sum (dE)", Align::Right),
        Column::new("Count (dA)", Align::Right),
        Column::new("Sum (dA)", Align::Right),
    ]);
    for (timescale, label) in TIMESCALES {
        let mut row = vec![Cell::from(label)];
        for divisor in divisors {
            row.push(count_cell(all_count, timescale, divisor));
            row.push(Cell::from(money.format(scaled(all_sum, timescale, divisor))));
        }
        overall.push_row(row)?;
    }
    let all_time = [Cell::from(all_count.to_string()), Cell::from(money.format(all_sum))];
    let mut row = vec![Cell::from(ALL_TIME)];
    row.extend(all_time.iter().cloned());
    row.extend(all_time.iter().cloned());
    overall.push_row(row)?;

    let per_category: HashMap<i64, (i64, Decimal)> = activity
        .iter()
        .map(|a| (a.category_id, (a.count, a.sum)))
        .collect();
    let lookup = |id: i64| per_category.get(&id).copied().unwrap_or((0, Decimal::ZERO));

    let captions = [
        format!("Category spending per expense-day (dE = {})", days.expense_days),
        format!("Category spending per day (dA = {})", days.all_days),
    ];

    let mut tables = vec![overall];
    for (caption, divisor) in captions.into_iter().zip(divisors) {
        let mut headers = vec![Column::new("", Align::Left)];
        for category in categories {
            headers.push(Column::new(
                Cell::link(format!("{} (count)", category.name), super::category_href(&category.slug)),
                Align::Right,
            ));
            headers.push(Column::new(format!("{} (sum)", category.name), Align::Right));
        }
        let mut table = ReportTable::new(headers).with_caption(caption);

        for (timescale, label) in TIMESCALES {
            let mut row = vec![Cell::from(label)];
            for category in categories {
                let (count, sum) = lookup(category.id);
                row.push(count_cell(count, timescale, divisor));
                row.push(Cell::from(money.format(scaled(sum, timescale, divisor))));
            }
            table.push_row(row)?;
        }

        let mut row = vec![Cell::from(ALL_TIME)];
        for category in categories {
            let (count, sum) = lookup(category.id);
            row.push(Cell::from(count.to_string()));
            row.push(Cell::from(money.format(sum)));
        }
        table.push_row(row)?;
        tables.push(table);
    }

    Ok(ReportOutput {
        notes: vec![
            format!("dE (days with expenses) = {}", days.expense_days),
            format!("dA (all days) = {}", days.all_days),
        ],
        tables,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn categories() -> Vec<CategoryRef> {
        vec![
            CategoryRef {
                id: 1,
                name: "Food".into(),
                slug: "food".into(),
            },
            CategoryRef {
                id: 2,
                name: "Fun".into(),
                slug: "fun".into(),
            },
        ]
    }

    #[test]
    fn zero_span_means_no_results() {
        let out = daily_spending(
            DayCounts {
                expense_days: 1,
                all_days: 0,
            },
            &categories(),
            &[],
            &MoneyFormat::dollars(),
        )
        .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn scales_by_both_divisors() {
        let activity = [CategoryActivity {
            category_id: 1,
            count: 10,
            sum: d("70"),
        }];
        let out = daily_spending(
            DayCounts {
                expense_days: 7,
                all_days: 14,
            },
            &categories(),
            &activity,
            &MoneyFormat::dollars(),
        )
        .unwrap();

        assert_eq!(out.tables.len(), 3);
        let overall = &out.tables[0];
        let per_day: Vec<&str> = overall.rows[0].iter().map(|c| c.text.as_str()).collect();
        assert_eq!(per_day, ["Per 1 day", "1.43", "$10.00", "0.71", "$5.00"]);
        let all_time: Vec<&str> = overall.rows[4].iter().map(|c| c.text.as_str()).collect();
        assert_eq!(all_time, ["All time", "10", "$70.00", "10", "$70.00"]);

        let by_category = &out.tables[2];
        assert_eq!(by_category.caption.as_deref(), Some("Category spending per day (dA = 14)"));
        // Fun has no expenses and is zero-filled
        let week: Vec<&str> = by_category.rows[1].iter().map(|c| c.text.as_str()).collect();
        assert_eq!(week, ["Per week (7 days)", "5", "$35.00", "0", "$0.00"]);
    }
}
