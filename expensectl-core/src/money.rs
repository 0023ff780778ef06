//! Money arithmetic and display.
//!
//! All amounts are `rust_decimal::Decimal`. Bill line amounts truncate to
//! cents, everything else rounds half away from zero.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Round money to cents, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Amount of a bill line: `count × unit_price`, truncated to cents.
pub fn line_amount(count: Decimal, unit_price: Decimal) -> Decimal {
    (count * unit_price).round_dp_with_strategy(2, RoundingStrategy::ToZero)
}

/// Parse an amount typed by a user.
///
/// Accepts `12.50`, `12,50`, `1 234,5` and surrounding whitespace.
/// Returns `None` for anything that is not a plain decimal number.
pub fn parse_amount_input(input: &str) -> Option<Decimal> {
    let cleaned: String = input
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    cleaned.parse::<Decimal>().ok()
}

/// Where the currency symbol goes relative to the number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolPosition {
    Prefix,
    Suffix,
}

/// Locale-style money formatting rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoneyFormat {
    pub symbol: String,
    pub position: SymbolPosition,
    pub group_separator: String,
    pub decimal_separator: String,
}

impl Default for MoneyFormat {
    fn default() -> Self {
        Self {
            symbol: "zł".to_string(),
            position: SymbolPosition::Suffix,
            group_separator: "\u{a0}".to_string(),
            decimal_separator: ",".to_string(),
        }
    }
}

impl MoneyFormat {
    /// US-style formatting (`$1,234.56`), handy in tests and configs.
    pub fn dollars() -> Self {
        Self {
            symbol: "$".to_string(),
            position: SymbolPosition::Prefix,
            group_separator: ",".to_string(),
            decimal_separator: ".".to_string(),
        }
    }

    /// Format an amount for display.
    pub fn format(&self, amount: Decimal) -> String {
        let rounded = round_money(amount);
        let negative = rounded.is_sign_negative() && !rounded.is_zero();
        let digits = format!("{:.2}", rounded.abs());
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

        let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
        for (i, ch) in int_part.chars().enumerate() {
            if i > 0 && (int_part.len() - i) % 3 == 0 {
                grouped.push_str(&self.group_separator);
            }
            grouped.push(ch);
        }

        let number = format!("{}{}{}", grouped, self.decimal_separator, frac_part);
        let sign = if negative { "-" } else { "" };

        match self.position {
            SymbolPosition::Prefix => format!("{sign}{}{number}", self.symbol),
            SymbolPosition::Suffix => format!("{sign}{number}\u{a0}{}", self.symbol),
        }
    }

    /// Format an optional amount; absent sums display as zero.
    pub fn format_opt(&self, amount: Option<Decimal>) -> String {
        self.format(amount.unwrap_or(Decimal::ZERO))
    }
}

/// Turn a `YYYY-MM` key into `January 2024`.
///
/// Unparseable keys are returned unchanged.
pub fn format_yearmonth(yearmonth: &str) -> String {
    let parsed = yearmonth.split_once('-').and_then(|(y, m)| {
        let year = y.parse::<i32>().ok()?;
        let month = m.parse::<u32>().ok()?;
        NaiveDate::from_ymd_opt(year, month, 1)
    });

    match parsed {
        Some(date) => date.format("%B %Y").to_string(),
        None => yearmonth.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_money(d("1.005")), d("1.01"));
        assert_eq!(round_money(d("1.004")), d("1.00"));
        assert_eq!(round_money(d("-1.005")), d("-1.01"));
    }

    #[test]
    fn line_amount_truncates() {
        // 0.333 kg at 9.99 = 3.32667
        assert_eq!(line_amount(d("0.333"), d("9.99")), d("3.32"));
        assert_eq!(line_amount(d("2"), d("1.50")), d("3.00"));
    }

    #[test]
    fn parses_user_amounts() {
        assert_eq!(parse_amount_input("12.50"), Some(d("12.50")));
        assert_eq!(parse_amount_input(" 12,5 "), Some(d("12.5")));
        assert_eq!(parse_amount_input("1 234,56"), Some(d("1234.56")));
        assert_eq!(parse_amount_input(""), None);
        assert_eq!(parse_amount_input("abc"), None);
        assert_eq!(parse_amount_input("1,2,3"), None);
    }

    #[test]
    fn formats_polish_style() {
        let fmt = MoneyFormat::default();
        assert_eq!(fmt.format(d("1234.5")), "1\u{a0}234,50\u{a0}zł");
        assert_eq!(fmt.format(d("0")), "0,00\u{a0}zł");
        assert_eq!(fmt.format(d("-12.345")), "-12,35\u{a0}zł");
    }

    #[test]
    fn formats_dollars() {
        let fmt = MoneyFormat::dollars();
        assert_eq!(fmt.format(d("1234567.891")), "$1,234,567.89");
        assert_eq!(fmt.format(d("999")), "$999.00");
        assert_eq!(fmt.format_opt(None), "$0.00");
    }

    #[test]
    fn yearmonth_labels() {
        assert_eq!(format_yearmonth("2024-01"), "January 2024");
        assert_eq!(format_yearmonth("2023-12"), "December 2023");
        assert_eq!(format_yearmonth("garbage"), "garbage");
    }
}
