//! Per-vendor spending statistics.

use rust_decimal::Decimal;

use super::{Align, Cell, Column, ReportError, ReportOutput, ReportTable, GRAND_TOTAL, SEARCH_URL};
use crate::money::MoneyFormat;

/// Aggregates for one vendor with at least two expenses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorRow {
    pub vendor: String,
    pub count: i64,
    pub sum: Decimal,
    pub avg: Decimal,
}

/// Search URL listing every expense and bill from `vendor`
pub fn vendor_search_href(vendor: &str) -> String {
    format!(
        "{SEARCH_URL}?for=expenses&include=expenses,bills&q={}",
        urlencoding::encode(vendor)
    )
}

pub fn vendor_table(rows: &[VendorRow], money: &MoneyFormat) -> Result<ReportOutput, ReportError> {
    if rows.is_empty() {
        return Ok(ReportOutput::empty());
    }

    let mut table = ReportTable::new(vec![
        Column::new("Vendor", Align::Left),
        Column::new("Count", Align::Right),
        Column::new("Sum", Align::Right),
        Column::new("Average", Align::Right),
    ]);

    let mut total_count = 0i64;
    let mut total_sum = Decimal::ZERO;
    for row in rows {
        total_count += row.count;
        total_sum += row.sum;
        table.push_row(vec![
            Cell::link(&row.vendor, vendor_search_href(&row.vendor)),
            Cell::from(row.count.to_string()),
            Cell::from(money.format(row.sum)),
            Cell::from(money.format(row.avg)),
        ])?;
    }

    if total_count > 0 {
        table.push_row(vec![
            Cell::from(GRAND_TOTAL),
            Cell::from(total_count.to_string()),
            Cell::from(money.format(total_sum)),
            Cell::from(money.format(total_sum / Decimal::from(total_count))),
        ])?;
    }

    Ok(ReportOutput::single(table))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(vendor: &str, count: i64, sum: &str) -> VendorRow {
        let sum: Decimal = sum.parse().unwrap();
        VendorRow {
            vendor: vendor.into(),
            count,
            sum,
            avg: sum / Decimal::from(count),
        }
    }

    #[test]
    fn search_link_is_encoded() {
        assert_eq!(
            vendor_search_href("Tom & Co"),
            "/api/search?for=expenses&include=expenses,bills&q=Tom%20%26%20Co"
        );
    }

    #[test]
    fn grand_total_averages_over_all_purchases() {
        let money = MoneyFormat::dollars();
        let out = vendor_table(&[row("Aldi", 3, "30"), row("Lidl", 2, "10")], &money).unwrap();
        let rows = &out.tables[0].rows;
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0].text, "Aldi");
        assert_eq!(rows[0][3].text, "$10.00");
        let total: Vec<&str> = rows[2].iter().map(|c| c.text.as_str()).collect();
        assert_eq!(total, ["Grand Total", "5", "$40.00", "$8.00"]);
    }

    #[test]
    fn no_vendors_no_results() {
        assert!(vendor_table(&[], &MoneyFormat::dollars()).unwrap().is_empty());
    }
}
