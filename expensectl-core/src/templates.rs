//! Expense templates: reusable recipes that turn into expenses.
//!
//! A template carries a vendor, category, optional amount and a
//! description whose meaning depends on the template kind:
//!
//! - `simple`: used verbatim
//! - `count`: amount multiplied by a count, `!count!` substituted, with
//!   one to four description lines picked by plural form
//! - `description`: `!description!` substituted with caller text
//! - `desc_select`: first line is a pattern, the rest are choices
//! - `menu`: each line is `<amount> <description>`

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::money::{parse_amount_input, round_money};

const COUNT_TAG: &str = "!count!";
const DESCRIPTION_TAG: &str = "!description!";

/// Template kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    #[default]
    Simple,
    Count,
    Description,
    DescSelect,
    Menu,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 5] = [
        Self::Simple,
        Self::Count,
        Self::Description,
        Self::DescSelect,
        Self::Menu,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Count => "count",
            Self::Description => "description",
            Self::DescSelect => "desc_select",
            Self::Menu => "menu",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Simple => "Simple",
            Self::Count => "Multiplied by count",
            Self::Description => "With custom description",
            Self::DescSelect => "With description selected from list",
            Self::Menu => "Menu (amount and description selected from list)",
        }
    }

    /// Whether the template needs a stored amount
    pub fn requires_amount(&self) -> bool {
        !matches!(self, Self::Menu)
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateKind {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| TemplateError::UnknownKind(s.to_string()))
    }
}

impl TryFrom<String> for TemplateKind {
    type Error = TemplateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Errors raised while validating or running a template
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown template kind '{0}'")]
    UnknownKind(String),

    #[error("amount is required for this template type")]
    AmountRequired,

    #[error("invalid count '{0}'")]
    InvalidCount(String),

    #[error("a description is required for this template")]
    DescriptionRequired,

    #[error("a description choice is required for this template")]
    ChoiceRequired,

    #[error("description choice {0} does not exist")]
    ChoiceOutOfRange(usize),

    #[error("menu line '{0}' does not start with an amount")]
    InvalidMenuLine(String),
}

/// Caller-supplied values for running a template
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateInput {
    pub count: Option<String>,
    pub description: Option<String>,
    pub desc_id: Option<usize>,
}

/// Amount and description of the expense a template produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateOutcome {
    pub amount: Decimal,
    pub description: String,
}

/// Check a template before it is stored.
pub fn validate_template(kind: TemplateKind, amount: Option<Decimal>) -> Result<(), TemplateError> {
    if kind.requires_amount() && amount.map_or(true, |a| a.is_zero()) {
        return Err(TemplateError::AmountRequired);
    }
    Ok(())
}

/// Evaluate a template into an expense amount and description.
pub fn run_template(
    kind: TemplateKind,
    amount: Option<Decimal>,
    description: &str,
    input: &TemplateInput,
) -> Result<TemplateOutcome, TemplateError> {
    match kind {
        TemplateKind::Simple => Ok(TemplateOutcome {
            amount: amount.ok_or(TemplateError::AmountRequired)?,
            description: description.to_string(),
        }),
        TemplateKind::Count => run_count(amount.ok_or(TemplateError::AmountRequired)?, description, input),
        TemplateKind::Description => {
            let text = input
                .description
                .as_deref()
                .ok_or(TemplateError::DescriptionRequired)?;
            Ok(TemplateOutcome {
                amount: amount.ok_or(TemplateError::AmountRequired)?,
                description: description.replace(DESCRIPTION_TAG, text),
            })
        }
        TemplateKind::DescSelect => {
            let mut lines = description.trim().lines();
            let pattern = lines.next().unwrap_or_default().trim();
            let options: Vec<&str> = lines.collect();
            let choice = pick(&options, input.desc_id)?;
            Ok(TemplateOutcome {
                amount: amount.ok_or(TemplateError::AmountRequired)?,
                description: pattern.replace(DESCRIPTION_TAG, choice.trim()),
            })
        }
        TemplateKind::Menu => {
            let options: Vec<&str> = description.trim().lines().collect();
            let line = pick(&options, input.desc_id)?.trim();
            let (amount_text, desc) = line
                .split_once(' ')
                .ok_or_else(|| TemplateError::InvalidMenuLine(line.to_string()))?;
            let amount = parse_amount_input(amount_text)
                .ok_or_else(|| TemplateError::InvalidMenuLine(line.to_string()))?;
            Ok(TemplateOutcome {
                amount,
                description: desc.trim().to_string(),
            })
        }
    }
}

fn pick<'a>(options: &[&'a str], desc_id: Option<usize>) -> Result<&'a str, TemplateError> {
    let id = desc_id.ok_or(TemplateError::ChoiceRequired)?;
    options
        .get(id)
        .copied()
        .ok_or(TemplateError::ChoiceOutOfRange(id))
}

fn run_count(
    amount: Decimal,
    description: &str,
    input: &TemplateInput,
) -> Result<TemplateOutcome, TemplateError> {
    let (count, count_text) = match input.count.as_deref().map(str::trim) {
        None | Some("") => (Decimal::ONE, "1".to_string()),
        Some(raw) => {
            let count =
                parse_amount_input(raw).ok_or_else(|| TemplateError::InvalidCount(raw.to_string()))?;
            (count, count.to_string())
        }
    };

    let lines: Vec<&str> = description.trim().lines().collect();
    let line = plural_line(&lines, count);

    Ok(TemplateOutcome {
        amount: round_money(amount * count),
        description: line.replace(COUNT_TAG, &count_text),
    })
}

/// Pick the description line matching the plural form of `count`.
///
/// Two lines follow the English rule (one / other). Three or four lines
/// follow the Polish rule (one / few / many). Fractional counts always use
/// the last line.
fn plural_line<'a>(lines: &[&'a str], count: Decimal) -> &'a str {
    let Some(first) = lines.first().copied() else {
        return "";
    };
    let last = lines[lines.len() - 1];

    if !count.fract().is_zero() {
        return last;
    }

    let n = count.trunc().abs();
    match lines.len() {
        2 => lines[usize::from(n != Decimal::ONE)],
        3 | 4 => {
            if n == Decimal::ONE {
                first
            } else {
                let ten = Decimal::TEN;
                let hundred = Decimal::ONE_HUNDRED;
                let mod10 = n % ten;
                let mod100 = n % hundred;
                let few = mod10 >= Decimal::TWO
                    && mod10 <= Decimal::from(4)
                    && (mod100 < ten || mod100 >= Decimal::from(20));
                lines[if few { 1 } else { 2 }]
            }
        }
        _ => first,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn count(c: &str) -> TemplateInput {
        TemplateInput {
            count: Some(c.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn kind_round_trips_through_str() {
        for kind in TemplateKind::ALL {
            assert_eq!(kind.as_str().parse::<TemplateKind>().unwrap(), kind);
        }
        assert!(matches!(
            "weird".parse::<TemplateKind>(),
            Err(TemplateError::UnknownKind(_))
        ));
    }

    #[test]
    fn kind_defaults_to_simple() {
        assert_eq!(TemplateKind::default(), TemplateKind::Simple);
        let kind: TemplateKind = serde_json::from_str("\"desc_select\"").unwrap();
        assert_eq!(kind, TemplateKind::DescSelect);
    }

    #[test]
    fn amount_required_except_menu() {
        assert_eq!(
            validate_template(TemplateKind::Simple, None),
            Err(TemplateError::AmountRequired)
        );
        assert!(validate_template(TemplateKind::Menu, None).is_ok());
        assert!(validate_template(TemplateKind::Count, Some(d("2.50"))).is_ok());
    }

    #[test]
    fn simple_template() {
        let out = run_template(TemplateKind::Simple, Some(d("3.20")), "Coffee", &TemplateInput::default())
            .unwrap();
        assert_eq!(out.amount, d("3.20"));
        assert_eq!(out.description, "Coffee");
    }

    #[test]
    fn count_defaults_to_one() {
        let out = run_template(
            TemplateKind::Count,
            Some(d("2.80")),
            "!count! ticket\n!count! tickets",
            &TemplateInput::default(),
        )
        .unwrap();
        assert_eq!(out.amount, d("2.80"));
        assert_eq!(out.description, "1 ticket");
    }

    #[test]
    fn count_english_plural() {
        let out = run_template(
            TemplateKind::Count,
            Some(d("2.80")),
            "!count! ticket\n!count! tickets",
            &count("3"),
        )
        .unwrap();
        assert_eq!(out.amount, d("8.40"));
        assert_eq!(out.description, "3 tickets");
    }

    #[test]
    fn count_polish_plural() {
        let desc = "!count! bilet\n!count! bilety\n!count! biletów";
        let run = |c: &str| {
            run_template(TemplateKind::Count, Some(d("1")), desc, &count(c))
                .unwrap()
                .description
        };
        assert_eq!(run("1"), "1 bilet");
        assert_eq!(run("3"), "3 bilety");
        assert_eq!(run("5"), "5 biletów");
        assert_eq!(run("12"), "12 biletów");
        assert_eq!(run("22"), "22 bilety");
    }

    #[test]
    fn fractional_count_uses_last_line() {
        let out = run_template(
            TemplateKind::Count,
            Some(d("4.99")),
            "!count! kg\n!count! kgs",
            &count("0,5"),
        )
        .unwrap();
        assert_eq!(out.description, "0.5 kgs");
        assert_eq!(out.amount, d("2.50"));
    }

    #[test]
    fn invalid_count_is_rejected() {
        assert_eq!(
            run_template(TemplateKind::Count, Some(d("1")), "x", &count("lots")),
            Err(TemplateError::InvalidCount("lots".to_string()))
        );
    }

    #[test]
    fn description_substitution() {
        let input = TemplateInput {
            description: Some("to Warsaw".to_string()),
            ..Default::default()
        };
        let out = run_template(TemplateKind::Description, Some(d("50")), "Train !description!", &input)
            .unwrap();
        assert_eq!(out.description, "Train to Warsaw");

        assert_eq!(
            run_template(
                TemplateKind::Description,
                Some(d("50")),
                "Train !description!",
                &TemplateInput::default()
            ),
            Err(TemplateError::DescriptionRequired)
        );
    }

    #[test]
    fn desc_select_picks_option() {
        let input = TemplateInput {
            desc_id: Some(1),
            ..Default::default()
        };
        let out = run_template(
            TemplateKind::DescSelect,
            Some(d("9")),
            "Lunch: !description!\n soup \n salad ",
            &input,
        )
        .unwrap();
        assert_eq!(out.description, "Lunch: salad");

        let bad = TemplateInput {
            desc_id: Some(5),
            ..Default::default()
        };
        assert_eq!(
            run_template(TemplateKind::DescSelect, Some(d("9")), "x\ny", &bad),
            Err(TemplateError::ChoiceOutOfRange(5))
        );
    }

    #[test]
    fn menu_reads_amount_from_line() {
        let input = TemplateInput {
            desc_id: Some(1),
            ..Default::default()
        };
        let out = run_template(TemplateKind::Menu, None, "12,50 Pizza\n8 Pasta", &input).unwrap();
        assert_eq!(out.amount, d("8"));
        assert_eq!(out.description, "Pasta");

        let first = TemplateInput {
            desc_id: Some(0),
            ..Default::default()
        };
        let out = run_template(TemplateKind::Menu, None, "12,50 Pizza\n8 Pasta", &first).unwrap();
        assert_eq!(out.amount, d("12.50"));
    }

    #[test]
    fn menu_line_without_amount() {
        let input = TemplateInput {
            desc_id: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            run_template(TemplateKind::Menu, None, "Pizza", &input),
            Err(TemplateError::InvalidMenuLine(_))
        ));
    }
}
