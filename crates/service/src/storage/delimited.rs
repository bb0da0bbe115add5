//! Comma-delimited text with optional double-quoted fields.
//!
//! The dialect is small: a `"` toggles quoted mode and is dropped,
//! commas inside quotes are literal, and there is no `""` escape and no
//! multi-line field. The reader is hand-rolled for that toggle rule; writing
//! goes through the `csv` writer. A value containing a quote will not survive
//! a round trip.

use tracing::warn;

use crate::errors::ServiceError;

/// How fields are written by [`render_document`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quoting {
    /// `"a","b"`
    Always,
    /// `a,b`
    Never,
    /// `a,b`, quoting only values that carry a comma: `"Doe, Jane",b`
    Necessary,
}

/// One data line of a document: its index among the split lines (header is 0)
/// and its fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    pub line_no: usize,
    pub fields: Vec<String>,
}

impl Row {
    /// Field at `idx`, or `""` when the line was short.
    pub fn field(&self, idx: usize) -> &str {
        self.fields.get(idx).map(String::as_str).unwrap_or("")
    }
}

/// Split one line into fields.
pub fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(clean_field(&std::mem::take(&mut current))),
            _ => current.push(ch),
        }
    }
    fields.push(clean_field(&current));
    fields
}

fn clean_field(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('"').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('"').unwrap_or(trimmed);
    trimmed.trim().to_string()
}

/// First line of the document, trimmed; `None` for an empty document.
pub fn header_line(text: &str) -> Option<&str> {
    text.trim().lines().next().map(str::trim)
}

/// Parse every data line of `text`, skipping the header and blank lines.
pub fn parse_rows(text: &str) -> Vec<Row> {
    text.trim()
        .split('\n')
        .enumerate()
        .skip(1)
        .filter_map(|(line_no, line)| {
            let line = line.trim();
            (!line.is_empty()).then(|| Row { line_no, fields: split_fields(line) })
        })
        .collect()
}

/// Render `header` followed by one line per row, each terminated by `\n`.
pub fn render_document<I, R>(header: &str, rows: I, quoting: Quoting) -> Result<String, ServiceError>
where
    I: IntoIterator<Item = R>,
    R: AsRef<[String]>,
{
    let style = match quoting {
        Quoting::Always => csv::QuoteStyle::Always,
        Quoting::Never => csv::QuoteStyle::Never,
        Quoting::Necessary => csv::QuoteStyle::Necessary,
    };
    let mut out = Vec::with_capacity(header.len() + 1);
    out.extend_from_slice(header.as_bytes());
    out.push(b'\n');

    let mut writer = csv::WriterBuilder::new()
        .quote_style(style)
        .double_quote(false)
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(out);
    for row in rows {
        let fields = row.as_ref();
        for field in fields {
            if field.contains(&['"', '\n', '\r'][..]) || (quoting == Quoting::Never && field.contains(',')) {
                warn!(field = %field, "value contains a delimiter and will not round-trip");
            }
        }
        writer.write_record(fields).map_err(render_error)?;
    }
    let bytes = writer.into_inner().map_err(|e| render_error(e.into_error()))?;
    String::from_utf8(bytes).map_err(render_error)
}

fn render_error(e: impl std::fmt::Display) -> ServiceError {
    ServiceError::Storage(format!("cannot render document: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn comma_inside_quotes_is_literal() {
        let fields = split_fields(r#""A, B","3","ok","general","","Jane","2024-01-01""#);
        assert_eq!(
            fields,
            strings(&["A, B", "3", "ok", "general", "", "Jane", "2024-01-01"])
        );
    }

    #[test]
    fn unquoted_fields_are_trimmed() {
        assert_eq!(split_fields(" Jane Doe , jane@x.io "), strings(&["Jane Doe", "jane@x.io"]));
    }

    #[test]
    fn trailing_comma_yields_empty_field() {
        assert_eq!(split_fields("a,"), strings(&["a", ""]));
    }

    #[test]
    fn doubled_quotes_are_not_an_escape() {
        // `""` toggles twice and vanishes; the inner text is kept without quotes
        assert_eq!(split_fields(r#""say ""hi""""#), strings(&["say hi"]));
    }

    #[test]
    fn parse_skips_header_and_blank_lines() {
        let text = "Name,Email\r\nJane,jane@x.io\r\n\r\n  \nBob,bob@x.io\n\n";
        let rows = parse_rows(text);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line_no, 1);
        assert_eq!(rows[0].fields, strings(&["Jane", "jane@x.io"]));
        assert_eq!(rows[1].line_no, 4);
        assert_eq!(rows[1].field(1), "bob@x.io");
        assert_eq!(rows[1].field(7), "");
    }

    #[test]
    fn header_only_or_empty_has_no_rows() {
        assert!(parse_rows("").is_empty());
        assert!(parse_rows("Name,Email\n").is_empty());
        assert_eq!(header_line("\n Name,Email \nJane,j@x.io"), Some("Name,Email"));
        assert_eq!(header_line("   "), None);
    }

    #[test]
    fn render_quotes_every_field() -> anyhow::Result<()> {
        let out = render_document("A,B", [strings(&["x, y", ""])], Quoting::Always)?;
        assert_eq!(out, "A,B\n\"x, y\",\"\"\n");
        Ok(())
    }

    #[test]
    fn render_unquoted_writes_values_verbatim() -> anyhow::Result<()> {
        let out = render_document("Name,Email", [strings(&["Jane", "jane@x.io"])], Quoting::Never)?;
        assert_eq!(out, "Name,Email\nJane,jane@x.io\n");
        assert_eq!(render_document("Name,Email", Vec::<Vec<String>>::new(), Quoting::Never)?, "Name,Email\n");
        Ok(())
    }

    #[test]
    fn render_necessary_quotes_only_comma_values() -> anyhow::Result<()> {
        let rows = vec![strings(&["Doe, Jane", "jane@x.io"]), strings(&["Bob", "bob@x.io"])];
        let text = render_document("Name,Email", &rows, Quoting::Necessary)?;
        assert_eq!(text, "Name,Email\n\"Doe, Jane\",jane@x.io\nBob,bob@x.io\n");
        let parsed: Vec<Vec<String>> = parse_rows(&text).into_iter().map(|r| r.fields).collect();
        assert_eq!(parsed, rows);
        Ok(())
    }

    #[test]
    fn render_then_parse_returns_the_rows() -> anyhow::Result<()> {
        let rows = vec![strings(&["t1", "5", "fine, really"]), strings(&["t2", "1", ""])];
        let text = render_document("T,R,C", &rows, Quoting::Always)?;
        let parsed: Vec<Vec<String>> = parse_rows(&text).into_iter().map(|r| r.fields).collect();
        assert_eq!(parsed, rows);
        Ok(())
    }
}
