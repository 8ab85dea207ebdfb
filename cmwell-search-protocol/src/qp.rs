//! Parser for the `qp` query-parameter expression grammar.
//!
//! Clauses are comma-separated and conjoined. Each clause is
//! `[prefix]field[comparator value]`:
//!
//! - prefix `-` marks the clause must-not, `*` marks it should
//!   (should-siblings form a disjunction), no prefix marks it must;
//! - comparators: `::` equals, `:` contains, `>` / `<` strict,
//!   `>>` / `<<` or-equal; a bare field name is an existence test.
//!
//! ```rust
//! use cmwell_search_protocol::qp::parse_qp;
//!
//! let filter = parse_qp("type::article,-status::draft,*lang::en,*lang::fr").unwrap();
//! ```

use thiserror::Error;

use crate::filter::{Comparator, FieldFilter, FieldOp};

/// Failure to parse a `qp` expression.
#[derive(Debug, Error)]
pub enum QpParseError {
    #[error("empty clause at position {position} in qp expression")]
    EmptyClause { position: usize },
    #[error("clause '{clause}' has no field name")]
    MissingField { clause: String },
}

/// Parse a `qp` expression into a field filter.
pub fn parse_qp(input: &str) -> Result<FieldFilter, QpParseError> {
    let mut filters = Vec::new();
    for (position, raw) in input.split(',').enumerate() {
        let clause = raw.trim();
        if clause.is_empty() {
            return Err(QpParseError::EmptyClause { position });
        }
        filters.push(parse_clause(clause)?);
    }
    Ok(match filters.len() {
        1 => filters.remove(0),
        _ => FieldFilter::conjunction(filters),
    })
}

fn parse_clause(clause: &str) -> Result<FieldFilter, QpParseError> {
    let (op, rest) = match clause.strip_prefix('-') {
        Some(rest) => (FieldOp::MustNot, rest),
        None => match clause.strip_prefix('*') {
            Some(rest) => (FieldOp::Should, rest),
            None => (FieldOp::Must, clause),
        },
    };

    // Longest comparators first so `::` is not read as two `:`.
    for (token, comparator) in [
        ("::", Comparator::Equals),
        (">>", Comparator::GreaterThanOrEquals),
        ("<<", Comparator::LessThanOrEquals),
        (">", Comparator::GreaterThan),
        ("<", Comparator::LessThan),
        (":", Comparator::Contains),
    ] {
        if let Some((field, value)) = rest.split_once(token) {
            if field.is_empty() {
                return Err(QpParseError::MissingField {
                    clause: clause.to_string(),
                });
            }
            return Ok(FieldFilter::single(
                op,
                field,
                comparator,
                Some(value.to_string()),
            ));
        }
    }

    if rest.is_empty() {
        return Err(QpParseError::MissingField {
            clause: clause.to_string(),
        });
    }
    Ok(FieldFilter::single(op, rest, Comparator::Exists, None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_equals_clause() {
        let f = parse_qp("type::article").unwrap();
        assert_eq!(
            f,
            FieldFilter::single(
                FieldOp::Must,
                "type",
                Comparator::Equals,
                Some("article".to_string())
            )
        );
    }

    #[test]
    fn test_prefixes_and_comparators() {
        let f = parse_qp("-status::draft,*score>>10,year<2020,title:rust").unwrap();
        let FieldFilter::Multi { op, filters } = f else {
            panic!("expected conjunction");
        };
        assert_eq!(op, FieldOp::Must);
        assert_eq!(filters.len(), 4);
        assert_eq!(filters[0].op(), FieldOp::MustNot);
        assert_eq!(filters[1].op(), FieldOp::Should);
        assert_eq!(
            filters[2],
            FieldFilter::single(
                FieldOp::Must,
                "year",
                Comparator::LessThan,
                Some("2020".to_string())
            )
        );
        assert_eq!(
            filters[3],
            FieldFilter::single(
                FieldOp::Must,
                "title",
                Comparator::Contains,
                Some("rust".to_string())
            )
        );
    }

    #[test]
    fn test_bare_field_is_existence() {
        let f = parse_qp("author").unwrap();
        assert_eq!(
            f,
            FieldFilter::single(FieldOp::Must, "author", Comparator::Exists, None)
        );
    }

    #[test]
    fn test_malformed_expressions() {
        assert!(matches!(
            parse_qp("a::1,,b::2"),
            Err(QpParseError::EmptyClause { position: 1 })
        ));
        assert!(matches!(
            parse_qp("::value"),
            Err(QpParseError::MissingField { .. })
        ));
        assert!(matches!(parse_qp("-"), Err(QpParseError::MissingField { .. })));
    }
}
