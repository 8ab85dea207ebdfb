//! Thin-search protocol types for the bulk consume coordinator.
//!
//! This crate defines the contract between the coordinator and the backing
//! index. These types are used by:
//!
//! - The range-discovery probes (count-only "thin" searches)
//! - The scroll sources that stream a resolved chunk
//! - The `qp` query-parameter expression parser
//!
//! # Protocol Overview
//!
//! An iteration session is identified by a [`ThinSearchParams`]: an optional
//! [`PathFilter`], an optional [`FieldFilter`] combinator tree, and the
//! `with_history` / `with_deleted` visibility flags. The coordinator narrows
//! a session to a half-open `indexTime` interval by conjoining the session's
//! field filter with two range predicates on [`INDEX_TIME_FIELD`] — see
//! [`with_index_time_range`] for the top-level `Should` hazard this has to
//! handle.
//!
//! # Example
//!
//! ```rust
//! use cmwell_search_protocol::{PathFilter, ThinSearchParams};
//!
//! let params = ThinSearchParams::new(PathFilter::normalized("/news", true), None, false, false);
//! let bounded = params.bounded(1_000_000, 2_000_000);
//! assert!(bounded.field_filter.is_some());
//! ```

mod filter;
mod params;
pub mod qp;
mod record;

pub use filter::{with_index_time_floor, with_index_time_range, Comparator, FieldFilter, FieldOp};
pub use params::{Pagination, PathFilter, SortBy, ThinSearchParams};
pub use record::{IndexedRecord, ThinResults};

/// Milliseconds since the Unix epoch at which a record became visible to
/// the index. The axis the bulk consume iteration is partitioned over.
pub type IndexTime = i64;

/// Name of the indexed ingest-time field every record carries.
pub const INDEX_TIME_FIELD: &str = "system.indexTime";
