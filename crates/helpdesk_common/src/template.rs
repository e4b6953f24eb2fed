//! Placeholder expansion for ticket titles and descriptions.
//!
//! A placeholder is `<` + letters + `>` (`<A>`, `<b>`, `<AB>`), naming a
//! spreadsheet column in any letter case. Expansion is a single pass over the
//! template: substituted values are never scanned again.

use crate::row_store::Row;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([A-Za-z]+)>").expect("placeholder pattern is valid"));

/// A placeholder whose column has no value in the row. Advisory only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderWarning {
    /// Token as written in the template, e.g. `<Z>`.
    pub token: String,
    /// Column looked up, lower-cased.
    pub column: String,
}

/// Expanded text plus the placeholders that could not be filled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub text: String,
    pub warnings: Vec<PlaceholderWarning>,
}

/// Substitute every placeholder in `template` with the row's column value.
///
/// Placeholders for columns the row lacks stay verbatim and produce one
/// warning per distinct column.
pub fn resolve(template: &str, row: &Row) -> Resolution {
    let mut warnings: Vec<PlaceholderWarning> = Vec::new();
    let mut missing: HashSet<String> = HashSet::new();

    let text = PLACEHOLDER.replace_all(template, |caps: &Captures| {
        let column = caps[1].to_ascii_lowercase();
        match row.get(&column) {
            Some(value) => value.to_string(),
            None => {
                if missing.insert(column.clone()) {
                    warnings.push(PlaceholderWarning {
                        token: caps[0].to_string(),
                        column,
                    });
                }
                caps[0].to_string()
            }
        }
    });

    for w in &warnings {
        warn!(
            "Column '{}' has no value; placeholder {} left unresolved",
            w.column, w.token
        );
    }

    Resolution {
        text: text.into_owned(),
        warnings,
    }
}

/// Distinct columns referenced by `template`, lower-cased, in order of first use.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    PLACEHOLDER
        .captures_iter(template)
        .map(|caps| caps[1].to_ascii_lowercase())
        .filter(|column| seen.insert(column.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Row {
        Row::from_pairs([("a", "Maria"), ("b", "Furo"), ("ab", "wide")])
    }

    #[test]
    fn test_no_placeholders_unchanged() {
        for t in ["", "plain text", "a < b > c", "<>", "<1>", "<A B>", "x<_>y"] {
            let r = resolve(t, &row());
            assert_eq!(r.text, t);
            assert!(r.warnings.is_empty());
        }
    }

    #[test]
    fn test_replaces_every_occurrence_in_any_case() {
        let r = resolve("<A> and <a> then <B>!", &row());
        assert_eq!(r.text, "Maria and Maria then Furo!");
        assert!(r.warnings.is_empty());
    }

    #[test]
    fn test_multi_letter_columns() {
        assert_eq!(resolve("<AB>/<Ab>", &row()).text, "wide/wide");
    }

    #[test]
    fn test_missing_column_left_verbatim() {
        let r = resolve("Ticket <Z> for <A> <z>", &row());
        assert_eq!(r.text, "Ticket <Z> for Maria <z>");
        assert_eq!(
            r.warnings,
            vec![PlaceholderWarning {
                token: "<Z>".to_string(),
                column: "z".to_string()
            }]
        );
    }

    #[test]
    fn test_values_are_not_reexpanded() {
        let row = Row::from_pairs([("a", "<B>"), ("b", "nope")]);
        assert_eq!(resolve("<A>", &row).text, "<B>");
    }

    #[test]
    fn test_dollar_signs_in_values_are_literal() {
        let row = Row::from_pairs([("a", "$1 cost ${b}")]);
        assert_eq!(resolve("<A>", &row).text, "$1 cost ${b}");
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let once = resolve("Chamado <A> - <C>", &row());
        let twice = resolve(&once.text, &row());
        assert_eq!(once.text, twice.text);
    }

    #[test]
    fn test_placeholders_listed_once() {
        assert_eq!(placeholders("<A> <b> <a> <AB>"), vec!["a", "b", "ab"]);
        assert!(placeholders("none").is_empty());
    }
}
