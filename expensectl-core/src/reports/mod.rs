//! Report framework: option model, settings parsing, tables and renderers.
//!
//! Reports describe their options as [`OptionGroup`]s. The HTTP layer hands
//! the submitted key/value pairs to [`settings_from_input`], the report runs
//! its SQL, and the pure row-processing functions in the submodules turn the
//! result rows into [`ReportTable`]s that render to HTML or CSV.

pub mod breakdown;
pub mod daily_spending;
pub mod price_history;
pub mod table;
pub mod vendor_stats;

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

pub use table::{render_csv, render_html, render_print, Align, Cell, Column, ReportOutput, ReportTable};

/// Label used for the summary row at the bottom of a table
pub const GRAND_TOTAL: &str = "Grand Total";

/// Where category links in report output point
pub const CATEGORY_URL_PREFIX: &str = "/api/categories/";

/// Where vendor and product links in report output point
pub const SEARCH_URL: &str = "/api/search";

/// Link to a category page
pub fn category_href(slug: &str) -> String {
    format!("{CATEGORY_URL_PREFIX}{slug}")
}

/// A user category as seen by reports, in display order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRef {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl CategoryRef {
    pub fn link(&self) -> Cell {
        Cell::link(&self.name, category_href(&self.slug))
    }
}

/// Errors raised while configuring or rendering a report
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("missing value for '{0}'")]
    MissingField(String),

    #[error("unknown choice '{value}' for '{group}'")]
    UnknownChoice { group: String, value: String },

    #[error("row has {found} columns, expected {expected}")]
    ColumnMismatch { expected: usize, found: usize },

    #[error("CSV output failed: {0}")]
    Csv(#[from] csv::Error),
}

/// How options in a group are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Radio,
    Check,
    Text,
}

/// Extra behavior of a free-text option
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextOption {
    pub required: bool,
    /// Input key of a checkbox that must be set for the text to count
    pub enabler: Option<String>,
    pub enabled_by_default: bool,
}

/// A single report option
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportOption {
    pub name: String,
    pub option_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<TextOption>,
}

impl ReportOption {
    pub fn check(name: &str, option_id: &str) -> Self {
        Self {
            name: name.to_string(),
            option_id: option_id.to_string(),
            text: None,
        }
    }

    pub fn text(name: &str, option_id: &str, text: TextOption) -> Self {
        Self {
            name: name.to_string(),
            option_id: option_id.to_string(),
            text: Some(text),
        }
    }
}

/// A group of options shown together on the setup form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionGroup {
    pub name: String,
    pub option_id: String,
    pub kind: OptionKind,
    pub options: Vec<ReportOption>,
}

impl OptionGroup {
    pub fn new(name: &str, option_id: &str, kind: OptionKind, options: Vec<ReportOption>) -> Self {
        Self {
            name: name.to_string(),
            option_id: option_id.to_string(),
            kind,
            options,
        }
    }
}

/// Name, slug, description and options of a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportMeta {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub options: Vec<OptionGroup>,
}

/// Value chosen for one option
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SettingValue {
    Flag(bool),
    Text(String),
}

/// Parsed report settings, keyed by option id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSettings {
    values: BTreeMap<String, SettingValue>,
}

impl ReportSettings {
    pub fn insert(&mut self, option_id: &str, value: SettingValue) {
        self.values.insert(option_id.to_string(), value);
    }

    /// Whether a radio/check option is selected
    pub fn is_set(&self, option_id: &str) -> bool {
        matches!(self.values.get(option_id), Some(SettingValue::Flag(true)))
    }

    /// Non-empty text value of a text option
    pub fn text(&self, option_id: &str) -> Option<&str> {
        match self.values.get(option_id) {
            Some(SettingValue::Text(text)) if !text.trim().is_empty() => Some(text.trim()),
            _ => None,
        }
    }

    /// First selected option of a group
    pub fn selected<'a>(&self, group: &'a OptionGroup) -> Option<&'a str> {
        group
            .options
            .iter()
            .find(|opt| self.is_set(&opt.option_id))
            .map(|opt| opt.option_id.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Turn submitted form values into report settings.
///
/// Radio groups need a value naming one of their options. Check groups
/// select every option whose id was submitted. Text groups take the
/// submitted text; missing text options become `""`, and a text option with
/// an enabler counts only when the enabler was submitted too.
pub fn settings_from_input(
    groups: &[OptionGroup],
    input: &BTreeMap<String, String>,
) -> Result<ReportSettings, ReportError> {
    let mut settings = ReportSettings::default();

    for group in groups {
        match group.kind {
            OptionKind::Radio => {
                let value = input
                    .get(&group.option_id)
                    .filter(|v| !v.is_empty())
                    .ok_or_else(|| ReportError::MissingField(group.option_id.clone()))?;
                let option = group
                    .options
                    .iter()
                    .find(|opt| &opt.option_id == value)
                    .ok_or_else(|| ReportError::UnknownChoice {
                        group: group.option_id.clone(),
                        value: value.clone(),
                    })?;
                settings.insert(&option.option_id, SettingValue::Flag(true));
            }
            OptionKind::Check => {
                for opt in &group.options {
                    if input.contains_key(&opt.option_id) {
                        settings.insert(&opt.option_id, SettingValue::Flag(true));
                    }
                }
            }
            OptionKind::Text => {
                for opt in &group.options {
                    let value = match (&opt.text, input.get(&opt.option_id)) {
                        (Some(text), Some(value)) => {
                            let enabled = text
                                .enabler
                                .as_ref()
                                .map_or(true, |enabler| input.contains_key(enabler));
                            if !enabled {
                                SettingValue::Text(String::new())
                            } else if text.required && value.trim().is_empty() {
                                return Err(ReportError::MissingField(opt.option_id.clone()));
                            } else {
                                SettingValue::Text(value.clone())
                            }
                        }
                        (None, Some(value)) => SettingValue::Text(value.clone()),
                        (Some(_), None) => SettingValue::Text(String::new()),
                        (None, None) => SettingValue::Flag(false),
                    };
                    settings.insert(&opt.option_id, value);
                }
            }
        }
    }

    Ok(settings)
}
