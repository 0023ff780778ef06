//! Route handlers organized by resource

pub mod autocomplete;
pub mod bills;
pub mod categories;
pub mod dashboard;
pub mod expenses;
pub mod health;
pub mod item_templates;
pub mod lite;
pub mod reports;
pub mod search;
pub mod sync;
pub mod templates;
