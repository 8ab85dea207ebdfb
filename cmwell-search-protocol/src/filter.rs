//! Field filter combinators.
//!
//! A [`FieldFilter`] is a tree of `Must` / `Should` / `MustNot` combinators
//! over leaf predicates of the form `(field, comparator, value?)`. The
//! coordinator treats filters as opaque except for one operation: conjoining
//! a filter with an `indexTime` interval. That operation has a correctness
//! hazard around top-level disjunctions, handled in
//! [`with_index_time_range`].

use serde::{Deserialize, Serialize};

use crate::record::IndexedRecord;
use crate::{IndexTime, INDEX_TIME_FIELD};

/// Combinator applied to a filter node by its enclosing conjunction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldOp {
    /// The clause must match.
    Must,
    /// At least one of the `Should` siblings must match.
    Should,
    /// The clause must not match.
    MustNot,
}

/// Comparison applied by a leaf predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    Equals,
    Contains,
    GreaterThan,
    GreaterThanOrEquals,
    LessThan,
    LessThanOrEquals,
    /// Field presence test; carries no value.
    Exists,
}

/// A recursive predicate over record fields.
///
/// The `kind` field is the JSON discriminator for tagged serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldFilter {
    /// Leaf predicate on a single field.
    Single {
        op: FieldOp,
        field: String,
        comparator: Comparator,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        value: Option<String>,
    },
    /// Combinator node over child filters.
    Multi {
        op: FieldOp,
        filters: Vec<FieldFilter>,
    },
}

impl FieldFilter {
    /// Build a leaf predicate.
    pub fn single(
        op: FieldOp,
        field: impl Into<String>,
        comparator: Comparator,
        value: Option<String>,
    ) -> Self {
        FieldFilter::Single {
            op,
            field: field.into(),
            comparator,
            value,
        }
    }

    /// Build a `Must` conjunction over `filters`.
    pub fn conjunction(filters: Vec<FieldFilter>) -> Self {
        FieldFilter::Multi {
            op: FieldOp::Must,
            filters,
        }
    }

    /// The combinator this node presents to its parent.
    pub fn op(&self) -> FieldOp {
        match self {
            FieldFilter::Single { op, .. } | FieldFilter::Multi { op, .. } => *op,
        }
    }

    /// Evaluate the filter against a record.
    ///
    /// Leaf comparisons are numeric when both sides parse as integers
    /// (which covers `indexTime` bounds) and lexicographic otherwise.
    pub fn matches(&self, record: &IndexedRecord) -> bool {
        match self {
            FieldFilter::Single { op, .. } => {
                let hit = self.leaf_matches(record);
                match op {
                    FieldOp::MustNot => !hit,
                    _ => hit,
                }
            }
            FieldFilter::Multi { op, filters } => {
                let hit = combine(filters, record);
                match op {
                    FieldOp::MustNot => !hit,
                    _ => hit,
                }
            }
        }
    }

    fn leaf_matches(&self, record: &IndexedRecord) -> bool {
        let FieldFilter::Single {
            field,
            comparator,
            value,
            ..
        } = self
        else {
            return false;
        };

        let values = record_values(record, field);
        match comparator {
            Comparator::Exists => !values.is_empty(),
            Comparator::Equals => values.iter().any(|v| Some(v) == value.as_ref()),
            Comparator::Contains => values
                .iter()
                .any(|v| value.as_ref().is_some_and(|needle| v.contains(needle))),
            Comparator::GreaterThan
            | Comparator::GreaterThanOrEquals
            | Comparator::LessThan
            | Comparator::LessThanOrEquals => {
                let Some(bound) = value.as_ref() else {
                    return false;
                };
                values.iter().any(|v| ordered_matches(v, bound, *comparator))
            }
        }
    }
}

/// Combine sibling verdicts: all `Must` clauses hold, no `MustNot` clause
/// holds, and at least one `Should` clause holds when any are present.
fn combine(filters: &[FieldFilter], record: &IndexedRecord) -> bool {
    let mut shoulds = 0usize;
    let mut should_hit = false;

    for f in filters {
        let hit = match f {
            FieldFilter::Single { .. } => f.leaf_matches(record),
            FieldFilter::Multi { filters, .. } => combine(filters, record),
        };
        match f.op() {
            FieldOp::Must => {
                if !hit {
                    return false;
                }
            }
            FieldOp::MustNot => {
                if hit {
                    return false;
                }
            }
            FieldOp::Should => {
                shoulds += 1;
                should_hit |= hit;
            }
        }
    }

    shoulds == 0 || should_hit
}

fn record_values(record: &IndexedRecord, field: &str) -> Vec<String> {
    if field == INDEX_TIME_FIELD {
        return record.index_time.iter().map(|t| t.to_string()).collect();
    }
    record.fields.get(field).cloned().unwrap_or_default()
}

fn ordered_matches(value: &str, bound: &str, comparator: Comparator) -> bool {
    let ord = match (value.parse::<i64>(), bound.parse::<i64>()) {
        (Ok(v), Ok(b)) => v.cmp(&b),
        _ => value.cmp(bound),
    };
    match comparator {
        Comparator::GreaterThan => ord.is_gt(),
        Comparator::GreaterThanOrEquals => ord.is_ge(),
        Comparator::LessThan => ord.is_lt(),
        Comparator::LessThanOrEquals => ord.is_le(),
        _ => false,
    }
}

/// Intersect `filter` with `indexTime >= from && indexTime < to`.
///
/// A top-level `Should` is a disjunction; it must be wrapped in a
/// conjunction before the time clauses are added, otherwise the time bound
/// itself would become one optional alternative among the `Should`
/// branches.
pub fn with_index_time_range(
    filter: Option<FieldFilter>,
    from: IndexTime,
    to: IndexTime,
) -> FieldFilter {
    let mut clauses = vec![
        index_time_bound(Comparator::GreaterThanOrEquals, from),
        index_time_bound(Comparator::LessThan, to),
    ];
    push_wrapped(&mut clauses, filter);
    FieldFilter::conjunction(clauses)
}

/// Intersect `filter` with `indexTime >= from` only (seed probes carry no
/// upper bound).
pub fn with_index_time_floor(filter: Option<FieldFilter>, from: IndexTime) -> FieldFilter {
    let mut clauses = vec![index_time_bound(Comparator::GreaterThanOrEquals, from)];
    push_wrapped(&mut clauses, filter);
    FieldFilter::conjunction(clauses)
}

fn push_wrapped(clauses: &mut Vec<FieldFilter>, filter: Option<FieldFilter>) {
    match filter {
        None => {}
        Some(f) if f.op() == FieldOp::Should => {
            clauses.push(FieldFilter::conjunction(vec![f]));
        }
        Some(f) => clauses.push(f),
    }
}

fn index_time_bound(comparator: Comparator, value: IndexTime) -> FieldFilter {
    FieldFilter::single(
        FieldOp::Must,
        INDEX_TIME_FIELD,
        comparator,
        Some(value.to_string()),
    )
}
