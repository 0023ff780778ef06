//! Report tables and their HTML/CSV renderings.

use serde::Serialize;

use super::ReportError;

const EMPTY_HTML: &str = r#"<p class="expenses-empty">No results to show.</p>"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Right,
}

impl Align {
    fn class(self) -> &'static str {
        match self {
            Self::Left => "text-left",
            Self::Right => "text-right",
        }
    }
}

/// A table cell: text, optionally linked
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl Cell {
    pub fn link(text: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            href: Some(href.into()),
        }
    }
}

impl From<String> for Cell {
    fn from(text: String) -> Self {
        Self { text, href: None }
    }
}

impl From<&str> for Cell {
    fn from(text: &str) -> Self {
        Self::from(text.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub title: Cell,
    pub align: Align,
}

impl Column {
    pub fn new(title: impl Into<Cell>, align: Align) -> Self {
        Self {
            title: title.into(),
            align,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportTable {
    pub caption: Option<String>,
    pub headers: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
}

impl ReportTable {
    pub fn new(headers: Vec<Column>) -> Self {
        Self {
            caption: None,
            headers,
            rows: Vec::new(),
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Append a row, rejecting rows that do not match the header width.
    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<(), ReportError> {
        if row.len() != self.headers.len() {
            return Err(ReportError::ColumnMismatch {
                expected: self.headers.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }
}

/// Everything a report produced. No tables means no results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportOutput {
    /// Paragraphs shown above the tables
    pub notes: Vec<String>,
    pub tables: Vec<ReportTable>,
}

impl ReportOutput {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(table: ReportTable) -> Self {
        Self {
            notes: Vec::new(),
            tables: vec![table],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

pub(crate) fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn push_cell(html: &mut String, tag: &str, cell: &Cell, align: Align) {
    html.push_str(&format!("<{tag} class=\"{}\">", align.class()));
    match &cell.href {
        Some(href) => html.push_str(&format!(
            "<a href=\"{}\">{}</a>",
            escape_html(href),
            escape_html(&cell.text)
        )),
        None => html.push_str(&escape_html(&cell.text)),
    }
    html.push_str(&format!("</{tag}>"));
}

/// Render report output as an HTML fragment.
pub fn render_html(output: &ReportOutput) -> String {
    if output.is_empty() {
        return EMPTY_HTML.to_string();
    }

    let mut html = String::new();
    for note in &output.notes {
        html.push_str(&format!("<p>{}</p>\n", escape_html(note)));
    }

    for table in &output.tables {
        html.push_str("<table class=\"table expenses-report\">\n");
        if let Some(caption) = &table.caption {
            html.push_str(&format!("<caption>{}</caption>\n", escape_html(caption)));
        }

        html.push_str("<thead><tr>");
        for column in &table.headers {
            push_cell(&mut html, "th", &column.title, column.align);
        }
        html.push_str("</tr></thead>\n<tbody>\n");

        for row in &table.rows {
            html.push_str("<tr>");
            for (cell, column) in row.iter().zip(&table.headers) {
                push_cell(&mut html, "td", cell, column.align);
            }
            html.push_str("</tr>\n");
        }
        html.push_str("</tbody>\n</table>\n");
    }

    html
}

/// Render report output as a standalone printable page.
pub fn render_print(title: &str, output: &ReportOutput) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n\
         <body onload=\"window.print()\">\n<h1>{title}</h1>\n{body}</body>\n</html>\n",
        title = escape_html(title),
        body = render_html(output),
    )
}

fn table_csv(table: &ReportTable) -> Result<String, ReportError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    if let Some(caption) = &table.caption {
        writer.write_record([caption.as_str()])?;
    }
    writer.write_record(table.headers.iter().map(|c| c.title.text.as_str()))?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|c| c.text.as_str()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ReportError::Csv(e.into_error().into()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Render report output as CSV, one block per table separated by a blank line.
pub fn render_csv(output: &ReportOutput) -> Result<String, ReportError> {
    let blocks = output
        .tables
        .iter()
        .map(table_csv)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(blocks.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vendor_table() -> ReportTable {
        let mut table = ReportTable::new(vec![
            Column::new("Vendor", Align::Left),
            Column::new("Count", Align::Right),
        ]);
        table
            .push_row(vec![Cell::link("Tom & Jerry's", "/s?q=Tom+%26"), Cell::from("2")])
            .unwrap();
        table
    }

    #[test]
    fn empty_output_renders_message() {
        assert_eq!(
            render_html(&ReportOutput::empty()),
            r#"<p class="expenses-empty">No results to show.</p>"#
        );
        assert_eq!(render_csv(&ReportOutput::empty()).unwrap(), "");
    }

    #[test]
    fn html_escapes_and_links() {
        let html = render_html(&ReportOutput::single(vendor_table()));
        assert!(html.contains(r#"<th class="text-left">Vendor</th>"#));
        assert!(html.contains(r#"<a href="/s?q=Tom+%26">Tom &amp; Jerry&#x27;s</a>"#));
        assert!(html.contains(r#"<td class="text-right">2</td>"#));
    }

    #[test]
    fn width_mismatch_is_rejected() {
        let mut table = vendor_table();
        let err = table.push_row(vec![Cell::from("only one")]).unwrap_err();
        assert!(matches!(err, ReportError::ColumnMismatch { expected: 2, found: 1 }));
    }

    #[test]
    fn csv_blocks_are_separated() {
        let output = ReportOutput {
            notes: Vec::new(),
            tables: vec![vendor_table().with_caption("Vendors"), vendor_table()],
        };
        let csv = render_csv(&output).unwrap();
        assert_eq!(
            csv,
            "Vendors\nVendor,Count\nTom & Jerry's,2\n\nVendor,Count\nTom & Jerry's,2\n"
        );
    }

    #[test]
    fn print_page_wraps_fragment() {
        let page = render_print("Vendor <stats>", &ReportOutput::empty());
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<h1>Vendor &lt;stats&gt;</h1>"));
        assert!(page.contains("No results to show."));
    }
}
