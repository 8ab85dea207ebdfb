//! Search parameter types: path filtering, pagination, sorting, and the
//! invariant selection criteria of an iteration session.

use serde::{Deserialize, Serialize};

use crate::filter::{with_index_time_floor, with_index_time_range, FieldFilter};
use crate::IndexTime;

/// Restriction of a search to a subtree (or one level) of the path space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathFilter {
    pub path: String,
    pub recursive: bool,
}

impl PathFilter {
    /// Canonicalize a `(path, recursive)` pair.
    ///
    /// `("/", recursive = true)` matches everything and canonicalizes to
    /// no filter at all.
    pub fn normalized(path: &str, recursive: bool) -> Option<PathFilter> {
        if path == "/" && recursive {
            return None;
        }
        Some(PathFilter {
            path: path.to_string(),
            recursive,
        })
    }

    /// Whether `candidate` (an absolute path) falls under this filter.
    pub fn matches(&self, candidate: &str) -> bool {
        let base = if self.path == "/" {
            ""
        } else {
            self.path.trim_end_matches('/')
        };
        if self.recursive {
            candidate == self.path || candidate.starts_with(&format!("{}/", base))
        } else {
            match candidate.rsplit_once('/') {
                Some(("", _)) => self.path == "/" || base.is_empty(),
                Some((parent, _)) => parent == base,
                None => false,
            }
        }
    }
}

/// Result-window of a thin search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

/// Sort order of a thin search. Count probes do not sort; seed probes sort
/// by `indexTime` ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    None,
    IndexTimeAsc,
}

/// The invariant selection criteria of an iteration session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThinSearchParams {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub path_filter: Option<PathFilter>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub field_filter: Option<FieldFilter>,
    pub with_history: bool,
    pub with_deleted: bool,
}

impl ThinSearchParams {
    pub fn new(
        path_filter: Option<PathFilter>,
        field_filter: Option<FieldFilter>,
        with_history: bool,
        with_deleted: bool,
    ) -> Self {
        Self {
            path_filter,
            field_filter,
            with_history,
            with_deleted,
        }
    }

    /// The same session narrowed to `indexTime ∈ [from, to)`.
    pub fn bounded(&self, from: IndexTime, to: IndexTime) -> Self {
        Self {
            field_filter: Some(with_index_time_range(self.field_filter.clone(), from, to)),
            ..self.clone()
        }
    }

    /// The same session narrowed to `indexTime >= from` with no upper
    /// bound (seed-probe shape).
    pub fn floored(&self, from: IndexTime) -> Self {
        Self {
            field_filter: Some(with_index_time_floor(self.field_filter.clone(), from)),
            ..self.clone()
        }
    }
}
