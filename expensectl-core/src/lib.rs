//! expensectl-core: domain logic shared by the server and the CLI.
//!
//! Everything in here is free of I/O except configuration loading, so the
//! arithmetic, slug, template and report rules can be tested in isolation.

pub mod bills;
pub mod config;
pub mod error;
pub mod money;
pub mod pagination;
pub mod reports;
pub mod slug;
pub mod sync;
pub mod templates;

pub use config::ExpensesConfig;
pub use error::{CoreError, Result};
pub use money::{format_yearmonth, line_amount, parse_amount_input, round_money, MoneyFormat};
pub use pagination::{page_range, PageItem};
pub use slug::{assign_slug, slugify, SlugAssignment};
pub use templates::{run_template, TemplateError, TemplateInput, TemplateKind, TemplateOutcome};
