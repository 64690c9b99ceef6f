//! Output formatting for bruv.
//!
//! Provides JSON, concise text, and terminal table output.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::io::{self, Write};

use bruv_core::pipeline::AnnotatedChange;
use bruv_core::store::ReadStateRecord;
use bruv_core::text::{fit_width, terminal_size};

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON format - machine-readable output
    Json,
    /// Plain text format - one `key:value` line per item
    Text,
    /// Table format - one row per change, fitted to the terminal
    #[default]
    Table,
}

const NUMBER_WIDTH: usize = 7;
const FLAGS_WIDTH: usize = 3;
const PROJECT_WIDTH: usize = 24;
const OWNER_WIDTH: usize = 12;
const MIN_SUBJECT_WIDTH: usize = 10;

/// Formatter that can output data in JSON, text, or table format
#[derive(Debug, Clone)]
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Format data according to the configured output format.
    ///
    /// Tables only exist for changes and read state; other data renders as text.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
            OutputFormat::Text | OutputFormat::Table => {
                let json_value = serde_json::to_value(data)?;
                Ok(render_text(&json_value))
            }
        }
    }

    /// Format annotated changes; an empty list renders `empty_message` outside JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn format_changes(&self, changes: &[AnnotatedChange], empty_message: &str) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.format(&changes),
            _ if changes.is_empty() => Ok(empty_message.to_string()),
            OutputFormat::Text => self.format(&changes),
            OutputFormat::Table => Ok(render_table(changes, usize::from(terminal_size().0))),
        }
    }

    /// Format read-state records.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn format_records(&self, records: &[ReadStateRecord], empty_message: &str) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.format(&records),
            _ if records.is_empty() => Ok(empty_message.to_string()),
            OutputFormat::Text => self.format(&records),
            OutputFormat::Table => Ok(records
                .iter()
                .map(|record| {
                    format!(
                        "{:>NUMBER_WIDTH$}  {}",
                        record.number,
                        render_last_read(record.last_read)
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")),
        }
    }

    /// Format and print data to stdout
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn print<T: Serialize>(&self, data: &T) -> Result<()> {
        write_line(&self.format(data)?)
    }

    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn print_changes(&self, changes: &[AnnotatedChange], empty_message: &str) -> Result<()> {
        write_line(&self.format_changes(changes, empty_message)?)
    }

    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn print_records(&self, records: &[ReadStateRecord], empty_message: &str) -> Result<()> {
        write_line(&self.format_records(records, empty_message)?)
    }
}

fn write_line(output: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{output}")?;
    Ok(())
}

/// `*` unread, `B` blueprint, `#` linked to a bug.
fn change_flags(change: &AnnotatedChange) -> String {
    [
        (!change.is_read, '*'),
        (change.is_blueprint, 'B'),
        (!change.related_bugs.is_empty(), '#'),
    ]
    .iter()
    .map(|&(set, flag)| if set { flag } else { ' ' })
    .collect()
}

fn owner_name(change: &AnnotatedChange) -> &str {
    let owner = &change.change.owner;
    owner
        .username
        .as_deref()
        .or(owner.name.as_deref())
        .or(owner.email.as_deref())
        .unwrap_or("")
}

/// One row per change, each exactly `width` columns (subject never narrower
/// than [`MIN_SUBJECT_WIDTH`]).
fn render_table(changes: &[AnnotatedChange], width: usize) -> String {
    let fixed = NUMBER_WIDTH + FLAGS_WIDTH + PROJECT_WIDTH + OWNER_WIDTH + 4;
    let subject_width = width.saturating_sub(fixed).max(MIN_SUBJECT_WIDTH);

    changes
        .iter()
        .map(|change| {
            format!(
                "{:>NUMBER_WIDTH$} {} {} {} {}",
                change.change.number,
                change_flags(change),
                fit_width(&change.change.project, PROJECT_WIDTH),
                fit_width(owner_name(change), OWNER_WIDTH),
                fit_width(&change.change.subject, subject_width),
            )
            .trim_end()
            .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_last_read(last_read: DateTime<Utc>) -> String {
    if last_read == DateTime::<Utc>::UNIX_EPOCH {
        "unread".to_string()
    } else {
        last_read.format("%Y-%m-%d %H:%M:%S UTC").to_string()
    }
}

/// Keys printed bare at the start of a text line.
const LEAD_KEYS: [&str; 2] = ["number", "name"];

/// One line per item: lead keys bare, then `key:value` for every field that
/// carries something.
fn render_text(value: &Value) -> String {
    match value {
        Value::Array(items) => items.iter().map(render_text).collect::<Vec<_>>().join("\n"),
        Value::Object(fields) => {
            let lead = LEAD_KEYS
                .iter()
                .filter_map(|key| fields.get(*key))
                .map(inline_value);
            let rest = fields
                .iter()
                .filter(|(key, value)| !LEAD_KEYS.contains(&key.as_str()) && !is_blank(value))
                .map(|(key, value)| format!("{key}:{}", inline_value(value)));
            lead.chain(rest).collect::<Vec<_>>().join("  ")
        }
        scalar => inline_value(scalar),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// A value on a single line. Strings with whitespace keep their JSON quoting.
fn inline_value(value: &Value) -> String {
    match value {
        Value::String(s) if !s.contains(char::is_whitespace) => s.clone(),
        Value::Array(items) => {
            format!("[{}]", items.iter().map(inline_value).collect::<Vec<_>>().join(","))
        }
        Value::Object(fields) => {
            let inner = fields
                .iter()
                .filter(|(_, value)| !value.is_null())
                .map(|(key, value)| format!("{key}:{}", inline_value(value)))
                .collect::<Vec<_>>()
                .join(",");
            format!("{{{inner}}}")
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bruv_core::gerrit::{Account, Change};
    use chrono::TimeZone;

    fn change(number: u64, subject: &str) -> AnnotatedChange {
        AnnotatedChange::from(Change {
            number,
            id: format!("I{number}"),
            project: "openstack/nova".to_string(),
            branch: "master".to_string(),
            topic: None,
            subject: subject.to_string(),
            owner: Account {
                name: Some("Alice Smith".to_string()),
                email: None,
                username: Some("alice".to_string()),
            },
            url: format!("https://review.example.org/{number}"),
            status: "NEW".to_string(),
            open: true,
            commit_message: String::new(),
            last_updated: Utc.timestamp_opt(1000, 0).single().expect("timestamp"),
            comments: Vec::new(),
            current_patch_set: None,
        })
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Table);
    }

    #[test]
    fn test_formatter_json_output() {
        let formatter = Formatter::new(OutputFormat::Json);
        let output = formatter
            .format_changes(&[change(42, "Fix it")], "none")
            .expect("JSON formatting failed");

        let parsed: serde_json::Value =
            serde_json::from_str(&output).expect("Output is not valid JSON");
        assert_eq!(parsed[0]["number"], 42);
        assert_eq!(parsed[0]["last_checked_patch_set"], -1);
        assert_eq!(parsed[0]["is_read"], false);
    }

    #[test]
    fn test_json_empty_list_is_empty_array() {
        let formatter = Formatter::new(OutputFormat::Json);
        let output = formatter.format_changes(&[], "Nothing to review").expect("format");
        assert_eq!(output.trim(), "[]");
    }

    #[test]
    fn test_empty_message_outside_json() {
        for format in [OutputFormat::Text, OutputFormat::Table] {
            let output = Formatter::new(format)
                .format_changes(&[], "Nothing to review")
                .expect("format");
            assert_eq!(output, "Nothing to review");
        }
    }

    #[test]
    fn test_text_output_starts_with_number() {
        let formatter = Formatter::new(OutputFormat::Text);
        let output = formatter
            .format_changes(&[change(42, "Fix it"), change(43, "Other")], "none")
            .expect("format");

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("42  "));
        assert!(lines[0].contains("subject:\"Fix it\""));
        assert!(lines[1].starts_with("43  "));
        assert!(!lines[0].contains("topic"));
    }

    #[test]
    fn test_flags() {
        let mut c = change(1, "x");
        assert_eq!(change_flags(&c), "*  ");

        c.is_read = true;
        c.is_blueprint = true;
        c.related_bugs.insert("123".to_string());
        assert_eq!(change_flags(&c), " B#");
    }

    #[test]
    fn test_table_rows_fit_width() {
        let long_subject = "A very long subject line that will certainly not fit in the table";
        let output = render_table(&[change(42, long_subject)], 80);

        assert_eq!(output.chars().count(), 80);
        assert!(output.starts_with("     42 *   openstack/nova"));
        assert!(output.contains("alice"));
        assert!(output.ends_with("..."));
    }

    #[test]
    fn test_table_keeps_minimum_subject_width() {
        let output = render_table(&[change(1, "Short")], 20);
        assert!(output.ends_with("Short"));
    }

    #[test]
    fn test_table_row_with_tab_in_subject_fits_width() {
        let output = render_table(&[change(42, "Fix\tthe race in the scheduler retry path")], 80);
        assert_eq!(output.chars().count(), 80);
        assert!(!output.contains('\t'));
    }

    #[test]
    fn test_text_keeps_each_change_on_one_line() {
        let mut c = change(42, "Fix it");
        c.change.commit_message = "Fix it\n\nCloses-Bug: 1\n".to_string();
        let output = Formatter::new(OutputFormat::Text)
            .format_changes(&[c], "none")
            .expect("format");

        assert_eq!(output.lines().count(), 1);
        assert!(output.contains(r#"commitMessage:"Fix it\n\nCloses-Bug: 1\n""#));
        assert!(!output.contains("bug_base_url"));
    }

    #[test]
    fn test_records_table() {
        let records = [
            ReadStateRecord::new(7, DateTime::<Utc>::UNIX_EPOCH),
            ReadStateRecord::new(
                42,
                Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).single().expect("time"),
            ),
        ];
        let output = Formatter::new(OutputFormat::Table)
            .format_records(&records, "none")
            .expect("format");
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "      7  unread");
        assert_eq!(lines[1], "     42  2024-05-01 12:30:00 UTC");
    }

    #[test]
    fn test_text_format_nested_object() {
        let value = serde_json::json!({
            "queries": {"mine": "owner:self"},
            "default_queries": ["mine"],
        });
        let output = render_text(&value);
        assert!(output.contains("queries:{mine:owner:self}"));
        assert!(output.contains("default_queries:[mine]"));
    }
}
