//! Unit price history of products bought more than once.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::{Align, Cell, Column, ReportError, ReportOutput, ReportTable, SEARCH_URL};
use crate::money::{round_money, MoneyFormat};

/// A single purchase: a simple expense or a bill item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Purchase {
    pub product: String,
    pub date: NaiveDate,
    pub unit_price: Decimal,
}

/// Price summary for one product
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceSummary {
    pub product: String,
    pub count: usize,
    pub min: Decimal,
    pub max: Decimal,
    pub avg: Decimal,
    pub first: (NaiveDate, Decimal),
    pub last: (NaiveDate, Decimal),
}

impl PriceSummary {
    /// Percent change from the first to the last price, one decimal place
    pub fn change_percent(&self) -> Option<Decimal> {
        let (_, first) = self.first;
        let (_, last) = self.last;
        if first.is_zero() {
            return None;
        }
        Some(((last - first) / first * Decimal::ONE_HUNDRED).round_dp(1))
    }
}

pub fn product_search_href(product: &str) -> String {
    format!("{SEARCH_URL}?for=purchases&q={}", urlencoding::encode(product))
}

/// Group purchases by product, ignoring case, keeping products bought at
/// least twice. Purchases are expected in date order.
pub fn summarize(purchases: &[Purchase]) -> Vec<PriceSummary> {
    let mut grouped: BTreeMap<String, Vec<&Purchase>> = BTreeMap::new();
    for purchase in purchases {
        grouped
            .entry(purchase.product.trim().to_lowercase())
            .or_default()
            .push(purchase);
    }

    grouped
        .into_values()
        .filter(|group| group.len() >= 2)
        .map(|mut group| {
            group.sort_by_key(|p| p.date);
            let prices: Vec<Decimal> = group.iter().map(|p| p.unit_price).collect();
            let sum: Decimal = prices.iter().copied().sum();
            let first = group[0];
            let last = group[group.len() - 1];
            PriceSummary {
                product: last.product.trim().to_string(),
                count: group.len(),
                min: prices.iter().copied().min().unwrap_or_default(),
                max: prices.iter().copied().max().unwrap_or_default(),
                avg: round_money(sum / Decimal::from(group.len())),
                first: (first.date, first.unit_price),
                last: (last.date, last.unit_price),
            }
        })
        .collect()
}

pub fn price_table(purchases: &[Purchase], money: &MoneyFormat) -> Result<ReportOutput, ReportError> {
    let summaries = summarize(purchases);
    if summaries.is_empty() {
        return Ok(ReportOutput::empty());
    }

    let mut table = ReportTable::new(vec![
        Column::new("Product", Align::Left),
        Column::new("Purchases", Align::Right),
        Column::new("Min", Align::Right),
        Column::new("Max", Align::Right),
        Column::new("Average", Align::Right),
        Column::new("First", Align::Right),
        Column::new("Last", Align::Right),
        Column::new("Change", Align::Right),
    ]);

    for summary in &summaries {
        let change = match summary.change_percent() {
            Some(pct) if pct.is_sign_positive() && !pct.is_zero() => format!("+{pct:.1}%"),
            Some(pct) => format!("{pct:.1}%"),
            None => "n/a".to_string(),
        };
        table.push_row(vec![
            Cell::link(&summary.product, product_search_href(&summary.product)),
            Cell::from(summary.count.to_string()),
            Cell::from(money.format(summary.min)),
            Cell::from(money.format(summary.max)),
            Cell::from(money.format(summary.avg)),
            Cell::from(format!("{} ({})", money.format(summary.first.1), summary.first.0)),
            Cell::from(format!("{} ({})", money.format(summary.last.1), summary.last.0)),
            Cell::from(change),
        ])?;
    }

    Ok(ReportOutput::single(table))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buy(product: &str, date: &str, price: &str) -> Purchase {
        Purchase {
            product: product.into(),
            date: date.parse().unwrap(),
            unit_price: price.parse().unwrap(),
        }
    }

    #[test]
    fn single_purchases_are_skipped() {
        assert!(summarize(&[buy("Milk", "2024-01-01", "1")]).is_empty());
    }

    #[test]
    fn groups_case_insensitively() {
        let summaries = summarize(&[
            buy("Milk", "2024-01-01", "2.00"),
            buy("bread", "2024-01-01", "3.00"),
            buy("milk ", "2024-02-01", "2.50"),
            buy("MILK", "2024-03-01", "2.20"),
        ]);
        assert_eq!(summaries.len(), 1);
        let milk = &summaries[0];
        assert_eq!(milk.product, "MILK");
        assert_eq!(milk.count, 3);
        assert_eq!(milk.min, "2.00".parse::<Decimal>().unwrap());
        assert_eq!(milk.max, "2.50".parse::<Decimal>().unwrap());
        assert_eq!(milk.avg, "2.23".parse::<Decimal>().unwrap());
        assert_eq!(milk.change_percent(), Some("10.0".parse().unwrap()));
    }

    #[test]
    fn table_formats_change() {
        let out = price_table(
            &[buy("Eggs", "2024-01-01", "4"), buy("Eggs", "2024-01-08", "3")],
            &MoneyFormat::dollars(),
        )
        .unwrap();
        let row = &out.tables[0].rows[0];
        assert_eq!(row[0].href.as_deref(), Some("/api/search?for=purchases&q=Eggs"));
        assert_eq!(row[5].text, "$4.00 (2024-01-01)");
        assert_eq!(row[7].text, "-25.0%");
    }
}
