//! Bill totals and automatic bill descriptions.

use rust_decimal::Decimal;

use crate::money::line_amount;

/// Longest description shown for a bill
pub const MAX_DESCRIPTION_CHARS: usize = 80;

/// Description shown for a bill with no description and no items
pub const EMPTY_BILL_DESCRIPTION: &str = "(empty)";

/// A bill line, reduced to what the total needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line {
    pub count: Decimal,
    pub unit_price: Decimal,
}

/// Total of a bill: the sum of its truncated line amounts.
pub fn bill_total<I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = Line>,
{
    lines
        .into_iter()
        .map(|line| line_amount(line.count, line.unit_price))
        .sum()
}

/// Description used for listings and search.
///
/// An explicit description wins; otherwise the product names are joined
/// and truncated to 80 characters, ending in an ellipsis when cut.
pub fn auto_description<S: AsRef<str>>(description: &str, products: &[S]) -> String {
    if !description.is_empty() {
        return description.to_string();
    }
    if products.is_empty() {
        return EMPTY_BILL_DESCRIPTION.to_string();
    }

    let joined = products
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(", ");
    truncate_chars(&joined, MAX_DESCRIPTION_CHARS)
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max - 1).collect();
    out.push('…');
    out
}
