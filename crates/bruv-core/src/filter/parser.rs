//! Filter expression parser.
//!
//! # Syntax
//!
//! ```text
//! filter_expr  := field_filter (operator? field_filter)*
//! field_filter := ['-'] field_name ':' value | ['-'] field_name ':' '"' quoted value '"'
//! operator     := AND | OR (case-insensitive)
//! ```
//!
//! Without an explicit operator, a term is OR'd with the previous one when
//! both test the same field and AND'd otherwise:
//! `project:nova project:neutron unread:true` reads as
//! `(project:nova OR project:neutron) AND unread:true`.

use std::iter::Peekable;
use std::str::Chars;

use crate::core::{CoreError, CoreResult};

use super::ast::{FieldFilter, FilterExpr, FilterField, FilterOperator};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Term(FieldFilter),
    And,
    Or,
}

fn filter_error(message: impl Into<String>) -> CoreError {
    CoreError::Filter {
        message: message.into(),
    }
}

/// Parse a filter expression.
pub fn parse_filter(input: &str) -> CoreResult<FilterExpr> {
    let tokens = tokenize(input)?;
    let mut expr = FilterExpr::new();
    let mut pending: Option<FilterOperator> = None;

    for token in tokens {
        match token {
            Token::And | Token::Or => {
                if expr.is_empty() {
                    return Err(filter_error("expression cannot start with an operator"));
                }
                if pending.is_some() {
                    return Err(filter_error("two operators in a row"));
                }
                pending = Some(if token == Token::And {
                    FilterOperator::And
                } else {
                    FilterOperator::Or
                });
            }
            Token::Term(filter) => {
                if let Some(previous) = expr.filters.last() {
                    let operator = pending.take().unwrap_or(if previous.field == filter.field {
                        FilterOperator::Or
                    } else {
                        FilterOperator::And
                    });
                    expr.add_operator(operator);
                }
                expr.add_filter(filter);
            }
        }
    }

    if pending.is_some() {
        return Err(filter_error("expression cannot end with an operator"));
    }

    Ok(expr)
}

fn tokenize(input: &str) -> CoreResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        let word = read_word(&mut chars);
        match word.to_ascii_uppercase().as_str() {
            "AND" => tokens.push(Token::And),
            "OR" => tokens.push(Token::Or),
            _ => tokens.push(Token::Term(parse_term(&word, &mut chars)?)),
        }
    }

    Ok(tokens)
}

fn read_word(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut word = String::new();
    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            break;
        }
        word.push(ch);
        chars.next();
    }
    word
}

fn parse_term(word: &str, chars: &mut Peekable<Chars<'_>>) -> CoreResult<FieldFilter> {
    let (negated, body) = word
        .strip_prefix('-')
        .map_or((false, word), |rest| (true, rest));

    let (name, value) = body.split_once(':').ok_or_else(|| {
        filter_error(format!("invalid term '{word}' (expected field:value or AND/OR)"))
    })?;

    let field = FilterField::from_name(name)
        .ok_or_else(|| filter_error(format!("unknown field '{name}'")))?;

    let value = if value.starts_with('"') {
        read_quoted_value(chars, value)?
    } else {
        value.to_string()
    };

    if value.is_empty() {
        return Err(filter_error(format!("missing value for '{name}'")));
    }
    if field.is_flag() && parse_flag(&value).is_none() {
        return Err(filter_error(format!(
            "'{name}' takes true/false, got '{value}'"
        )));
    }

    let filter = FieldFilter::new(field, value);
    Ok(if negated { filter.negate() } else { filter })
}

/// Finish a quoted value that may continue past whitespace.
fn read_quoted_value(chars: &mut Peekable<Chars<'_>>, start: &str) -> CoreResult<String> {
    let mut value = start[1..].to_string();

    if !value.is_empty() && value.ends_with('"') {
        value.pop();
        return Ok(value);
    }

    for ch in chars.by_ref() {
        if ch == '"' {
            return Ok(value);
        }
        value.push(ch);
    }

    Err(filter_error("unterminated quoted value"))
}

/// Boolean value of a flag term.
#[must_use]
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" => Some(true),
        "false" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_term() {
        let expr = parse_filter("project:openstack/nova").expect("parse");
        assert_eq!(
            expr.filters,
            vec![FieldFilter::new(
                FilterField::Project,
                "openstack/nova".to_string()
            )]
        );
        assert!(expr.operators.is_empty());
    }

    #[test]
    fn test_implicit_operators() {
        let expr = parse_filter("project:a project:b unread:true").expect("parse");
        assert_eq!(
            expr.operators,
            vec![FilterOperator::Or, FilterOperator::And]
        );
    }

    #[test]
    fn test_explicit_operators_override() {
        let expr = parse_filter("project:a AND project:b or bug:any").expect("parse");
        assert_eq!(
            expr.operators,
            vec![FilterOperator::And, FilterOperator::Or]
        );
    }

    #[test]
    fn test_negated_term() {
        let expr = parse_filter("-bug:any").expect("parse");
        assert!(expr.filters[0].negated);
        assert_eq!(expr.filters[0].field, FilterField::Bug);
    }

    #[test]
    fn test_quoted_value_with_spaces() {
        let expr = parse_filter(r#"subject:"fix the thing" owner:alice"#).expect("parse");
        assert_eq!(expr.filters[0].value, "fix the thing");
        assert_eq!(expr.filters[1].value, "alice");
    }

    #[test]
    fn test_quoted_value_without_spaces() {
        let expr = parse_filter(r#"topic:"bp""#).expect("parse");
        assert_eq!(expr.filters[0].value, "bp");
    }

    #[test]
    fn test_empty_input_is_empty_expr() {
        assert!(parse_filter("   ").expect("parse").is_empty());
    }

    #[test]
    fn test_rejects_bad_input() {
        for input in [
            "AND project:a",
            "project:a OR",
            "project:a AND OR project:b",
            "project",
            "reviewer:bob",
            "project:",
            "unread:maybe",
            r#"subject:"never closed"#,
        ] {
            assert!(
                matches!(parse_filter(input), Err(CoreError::Filter { .. })),
                "expected filter error for {input:?}"
            );
        }
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("YES"), Some(true));
        assert_eq!(parse_flag("false"), Some(false));
        assert_eq!(parse_flag("1"), None);
    }
}
