//! Implementation of `bruv shell`, a line-oriented triage session.

use anyhow::Result;
use std::io::{self, BufRead, Write};
use std::path::Path;

use bruv_core::core::{Bruv, CoreResult};
use bruv_core::pipeline::PipelineOptions;
use bruv_core::store::parse_change_number;
use tracing::warn;

use crate::cli::commands::helpers::open_bruv;
use crate::cli::FilterArgs;
use crate::output::{Formatter, OutputFormat};

const PROMPT: &str = "bruv> ";

const HELP: &str = "\
Commands:
  list [NAME]        run a saved query, or the default query
  query <QUERY>      run a literal Gerrit query
  read <NUMBER>...   mark changes read
  unread <NUMBER>... mark changes unread
  queries            show saved query names
  help               show this help
  quit               leave the shell";

enum Outcome {
    Print(String),
    Quit,
}

/// Run an interactive session on stdin/stdout.
#[tracing::instrument(skip(config_path, format))]
pub fn run_shell(config_path: Option<&Path>, filter: &FilterArgs, format: OutputFormat) -> Result<()> {
    let options = filter.options()?;
    let bruv = open_bruv(config_path)?;
    let formatter = Formatter::new(format);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    run_session(&bruv, &options, &formatter, stdin.lock(), &mut stdout)
}

/// Read commands from `input` until `quit` or end of input.
///
/// Recoverable errors are written to `output` and the session continues;
/// anything else ends the session with that error.
fn run_session<R: BufRead, W: Write>(
    bruv: &Bruv,
    options: &PipelineOptions,
    formatter: &Formatter,
    input: R,
    output: &mut W,
) -> Result<()> {
    write!(output, "{PROMPT}")?;
    output.flush()?;

    for line in input.lines() {
        match execute(bruv, options, formatter, line?.trim()) {
            Ok(Outcome::Quit) => return Ok(()),
            Ok(Outcome::Print(text)) => {
                if !text.is_empty() {
                    writeln!(output, "{text}")?;
                }
            }
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "shell command failed");
                writeln!(output, "error: {e}")?;
            }
            Err(e) => return Err(e.into()),
        }

        write!(output, "{PROMPT}")?;
        output.flush()?;
    }

    writeln!(output)?;
    Ok(())
}

fn execute(
    bruv: &Bruv,
    options: &PipelineOptions,
    formatter: &Formatter,
    line: &str,
) -> CoreResult<Outcome> {
    let (command, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(command, rest)| (command, rest.trim()));

    let text = match command {
        "" => String::new(),
        "help" | "?" => HELP.to_string(),
        "quit" | "exit" | "q" => return Ok(Outcome::Quit),
        "list" => {
            let changes = if rest.is_empty() {
                bruv.get_default(options)?
            } else {
                bruv.get_saved(rest, options)?
            };
            formatter.format_changes(&changes, "Nothing to review.")?
        }
        "query" => {
            let changes = bruv.get_changes(rest, options)?;
            formatter.format_changes(&changes, "Nothing to review.")?
        }
        "read" | "unread" => {
            let numbers = rest
                .split_whitespace()
                .map(parse_change_number)
                .collect::<CoreResult<Vec<u64>>>()?;
            let records = numbers
                .into_iter()
                .map(|number| {
                    if command == "read" {
                        bruv.mark_read(number)
                    } else {
                        bruv.mark_unread(number)
                    }
                })
                .collect::<CoreResult<Vec<_>>>()?;
            formatter.format_records(&records, "")?
        }
        "queries" => bruv
            .saved_queries()
            .iter()
            .map(|(name, query)| format!("{name}: {query}"))
            .collect::<Vec<_>>()
            .join("\n"),
        other => format!("unknown command '{other}', try 'help'"),
    };

    Ok(Outcome::Print(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bruv_core::config::Config;
    use bruv_core::gerrit::{parse_query_output, Change, GerritClient, QueryOptions};
    use bruv_core::store::ReadStateStore;
    use std::io::Cursor;

    struct OneChange;

    impl GerritClient for OneChange {
        fn query(&self, _query: &str, _options: &QueryOptions) -> CoreResult<Vec<Change>> {
            parse_query_output(
                r#"{"project":"openstack/nova","number":"42","subject":"Fix it","lastUpdated":1000}"#,
            )
        }
    }

    fn bruv() -> Bruv {
        let config = Config::from_json(
            r#"{"username": "me", "query": "status:open", "queries": {"mine": "owner:self"}}"#,
            "test",
        )
        .expect("config");
        let store = ReadStateStore::open_in_memory().expect("store");
        Bruv::with_client(config, store, Box::new(OneChange))
    }

    fn session(bruv: &Bruv, input: &str) -> String {
        let mut output = Vec::new();
        run_session(
            bruv,
            &PipelineOptions::default(),
            &Formatter::new(OutputFormat::Text),
            Cursor::new(input.to_string()),
            &mut output,
        )
        .expect("session");
        String::from_utf8(output).expect("utf8")
    }

    #[test]
    fn test_list_read_then_list_again() {
        let bruv = bruv();
        let output = session(&bruv, "list\nread 42\nlist\nquit\n");

        assert_eq!(output.matches("subject:\"Fix it\"").count(), 1);
        assert!(output.contains("Nothing to review."));
        assert!(bruv.store().get(42).expect("get").is_some());
    }

    #[test]
    fn test_recoverable_errors_keep_the_session_alive() {
        let bruv = bruv();
        let output = session(&bruv, "list nope\nread abc\nquery   \nlist mine\nquit\n");

        assert!(output.contains("error: Unknown saved query: nope"));
        assert!(output.contains("error: Invalid change number: 'abc'"));
        assert!(output.contains("error: Gerrit query failed"));
        assert!(output.contains("subject:\"Fix it\""));
    }

    #[test]
    fn test_quit_stops_reading() {
        let bruv = bruv();
        let output = session(&bruv, "quit\nread 42\n");
        assert!(bruv.store().get(42).expect("get").is_none());
        assert_eq!(output, PROMPT);
    }

    #[test]
    fn test_end_of_input_ends_session() {
        let output = session(&bruv(), "help\n");
        assert!(output.contains("unread <NUMBER>..."));
        assert!(output.ends_with(&format!("{PROMPT}\n")));
    }

    #[test]
    fn test_unknown_command_is_reported() {
        let output = session(&bruv(), "frobnicate\nqueries\n");
        assert!(output.contains("unknown command 'frobnicate'"));
        assert!(output.contains("mine: owner:self"));
    }
}
