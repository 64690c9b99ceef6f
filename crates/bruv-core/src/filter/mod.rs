//! Declarative filters over annotated changes.
//!
//! Users narrow a listing with expressions such as
//! `project:openstack/nova -bug:any unread:true`. Expressions are parsed
//! into a [`FilterExpr`] and evaluated here; nothing user-supplied is ever
//! executed.

pub mod ast;
pub mod parser;

pub use ast::{FieldFilter, FilterExpr, FilterField, FilterOperator};
pub use parser::parse_filter;

use crate::pipeline::AnnotatedChange;

use parser::parse_flag;

impl FilterExpr {
    /// Parse an expression. See [`parser`] for the syntax.
    pub fn parse(input: &str) -> crate::core::CoreResult<Self> {
        parse_filter(input)
    }

    /// Evaluate the expression left to right. An empty expression matches everything.
    #[must_use]
    pub fn matches(&self, change: &AnnotatedChange) -> bool {
        let Some((first, rest)) = self.filters.split_first() else {
            return true;
        };

        rest.iter()
            .zip(&self.operators)
            .fold(first.matches(change), |result, (filter, operator)| {
                match operator {
                    FilterOperator::And => result && filter.matches(change),
                    FilterOperator::Or => result || filter.matches(change),
                }
            })
    }
}

impl FieldFilter {
    /// Evaluate this term, honoring negation.
    #[must_use]
    pub fn matches(&self, change: &AnnotatedChange) -> bool {
        self.matches_field(change) != self.negated
    }

    fn matches_field(&self, change: &AnnotatedChange) -> bool {
        let value = self.value.as_str();
        let raw = &change.change;

        match self.field {
            FilterField::Project => raw.project.eq_ignore_ascii_case(value),
            FilterField::Branch => raw.branch.eq_ignore_ascii_case(value),
            FilterField::Status => raw.status.eq_ignore_ascii_case(value),
            FilterField::Owner => [&raw.owner.username, &raw.owner.name, &raw.owner.email]
                .into_iter()
                .flatten()
                .any(|id| id.eq_ignore_ascii_case(value)),
            FilterField::Topic => raw
                .topic
                .as_deref()
                .is_some_and(|topic| contains_ignore_case(topic, value)),
            FilterField::Subject => contains_ignore_case(&raw.subject, value),
            FilterField::Bug => {
                if value.eq_ignore_ascii_case("any") {
                    !change.related_bugs.is_empty()
                } else {
                    change.related_bugs.contains(value)
                }
            }
            FilterField::Unread => parse_flag(value) == Some(!change.is_read),
            FilterField::Blueprint => parse_flag(value) == Some(change.is_blueprint),
            FilterField::Changed => parse_flag(value) == Some(change.change_since_last_comment),
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
