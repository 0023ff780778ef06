//! Month/category breakdown tables.

use rust_decimal::Decimal;
use std::collections::HashMap;

use super::{Align, CategoryRef, Cell, Column, ReportError, ReportOutput, ReportTable, GRAND_TOTAL};
use crate::money::{format_yearmonth, MoneyFormat};

/// One `(month, category, sum)` row, ordered by month then category order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthCategorySum {
    pub yearmonth: String,
    pub category_id: i64,
    pub sum: Decimal,
}

/// Month rows with a zero-filled column per category, plus a grand total row.
pub fn month_category_table(
    categories: &[CategoryRef],
    rows: &[MonthCategorySum],
    money: &MoneyFormat,
) -> Result<ReportOutput, ReportError> {
    if rows.is_empty() {
        return Ok(ReportOutput::empty());
    }

    let position: HashMap<i64, usize> = categories
        .iter()
        .enumerate()
        .map(|(n, c)| (c.id, n))
        .collect();

    let mut headers = vec![Column::new("Month", Align::Right)];
    headers.extend(categories.iter().map(|c| Column::new(c.link(), Align::Right)));
    headers.push(Column::new("Total", Align::Right));
    let mut table = ReportTable::new(headers);

    let mut category_totals = vec![Decimal::ZERO; categories.len()];
    let mut rows = rows.iter().peekable();

    while let Some(first) = rows.peek() {
        let yearmonth = first.yearmonth.clone();
        let mut sums = vec![Decimal::ZERO; categories.len()];
        let mut row_total = Decimal::ZERO;

        while let Some(row) = rows.next_if(|r| r.yearmonth == yearmonth) {
            let Some(&n) = position.get(&row.category_id) else {
                continue;
            };
            sums[n] += row.sum;
            category_totals[n] += row.sum;
            row_total += row.sum;
        }

        let mut cells = vec![Cell::from(format_yearmonth(&yearmonth))];
        cells.extend(sums.iter().map(|s| Cell::from(money.format(*s))));
        cells.push(Cell::from(money.format(row_total)));
        table.push_row(cells)?;
    }

    let grand_total: Decimal = category_totals.iter().copied().sum();
    let mut cells = vec![Cell::from(GRAND_TOTAL)];
    cells.extend(category_totals.iter().map(|s| Cell::from(money.format(*s))));
    cells.push(Cell::from(money.format(grand_total)));
    table.push_row(cells)?;

    Ok(ReportOutput::single(table))
}

/// One row per month with its total.
pub fn month_table(rows: &[(String, Decimal)], money: &MoneyFormat) -> Result<ReportOutput, ReportError> {
    if rows.is_empty() {
        return Ok(ReportOutput::empty());
    }

    let mut table = ReportTable::new(vec![
        Column::new("Month", Align::Right),
        Column::new("Total", Align::Right),
    ]);
    let mut total = Decimal::ZERO;
    for (yearmonth, sum) in rows {
        table.push_row(vec![
            Cell::from(format_yearmonth(yearmonth)),
            Cell::from(money.format(*sum)),
        ])?;
        total += *sum;
    }
    table.push_row(vec![Cell::from(GRAND_TOTAL), Cell::from(money.format(total))])?;

    Ok(ReportOutput::single(table))
}

/// One row per category (linked) with its total.
pub fn category_table(
    categories: &[CategoryRef],
    rows: &[(i64, Decimal)],
    money: &MoneyFormat,
) -> Result<ReportOutput, ReportError> {
    if rows.is_empty() {
        return Ok(ReportOutput::empty());
    }

    let by_id: HashMap<i64, &CategoryRef> = categories.iter().map(|c| (c.id, c)).collect();
    let mut table = ReportTable::new(vec![
        Column::new("Category", Align::Left),
        Column::new("Total", Align::Right),
    ]);
    let mut total = Decimal::ZERO;
    for (category_id, sum) in rows {
        let label = match by_id.get(category_id) {
            Some(category) => category.link(),
            None => Cell::from(category_id.to_string()),
        };
        table.push_row(vec![label, Cell::from(money.format(*sum))])?;
        total += *sum;
    }
    table.push_row(vec![Cell::from(GRAND_TOTAL), Cell::from(money.format(total))])?;

    Ok(ReportOutput::single(table))
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
                id: 10,
                name: "Food".into(),
                slug: "food".into(),
            },
            CategoryRef {
                id: 20,
                name: "Travel".into(),
                slug: "travel".into(),
            },
        ]
    }

    fn sum(yearmonth: &str, category_id: i64, amount: &str) -> MonthCategorySum {
        MonthCategorySum {
            yearmonth: yearmonth.into(),
            category_id,
            sum: d(amount),
        }
    }

    fn texts(row: &[Cell]) -> Vec<&str> {
        row.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn month_category_zero_fills_and_totals() {
        let money = MoneyFormat::dollars();
        let out = month_category_table(
            &categories(),
            &[sum("2024-01", 10, "10"), sum("2024-01", 20, "5.50"), sum("2024-02", 20, "4")],
            &money,
        )
        .unwrap();

        let table = &out.tables[0];
        assert_eq!(table.headers.len(), 4);
        assert_eq!(table.headers[1].title.href.as_deref(), Some("/api/categories/food"));
        assert_eq!(texts(&table.rows[0]), ["January 2024", "$10.00", "$5.50", "$15.50"]);
        assert_eq!(texts(&table.rows[1]), ["February 2024", "$0.00", "$4.00", "$4.00"]);
        assert_eq!(texts(&table.rows[2]), ["Grand Total", "$10.00", "$9.50", "$19.50"]);
    }

    #[test]
    fn empty_rows_mean_no_results() {
        let money = MoneyFormat::dollars();
        assert!(month_category_table(&categories(), &[], &money).unwrap().is_empty());
        assert!(month_table(&[], &money).unwrap().is_empty());
        assert!(category_table(&categories(), &[], &money).unwrap().is_empty());
    }

    #[test]
    fn month_totals() {
        let money = MoneyFormat::dollars();
        let out = month_table(&[("2023-12".into(), d("1")), ("2024-01".into(), d("2.25"))], &money).unwrap();
        let rows = &out.tables[0].rows;
        assert_eq!(texts(&rows[0]), ["December 2023", "$1.00"]);
        assert_eq!(texts(&rows[2]), ["Grand Total", "$3.25"]);
    }

    #[test]
    fn category_rows_are_linked() {
        let money = MoneyFormat::dollars();
        let out = category_table(&categories(), &[(20, d("7")), (10, d("3"))], &money).unwrap();
        let rows = &out.tables[0].rows;
        assert_eq!(rows[0][0].text, "Travel");
        assert_eq!(rows[0][0].href.as_deref(), Some("/api/categories/travel"));
        assert_eq!(texts(&rows[2]), ["Grand Total", "$10.00"]);
    }
}
