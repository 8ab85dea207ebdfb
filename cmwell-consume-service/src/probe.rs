//! Thin-search probes.
//!
//! The backing index is consumed through a single count-and-peek
//! operation; the coordinator only ever issues three shapes of it:
//!
//! - **seed probe** — offset 1000, limit 1, sorted by `indexTime`
//!   ascending, lower time bound only. Returns the 1001st record so the
//!   first expansion step starts near the right magnitude.
//! - **count probe** — offset 0, limit 1, unsorted, field filter conjoined
//!   with a half-open time interval. Only `total` is consumed.
//! - **first-record probe** — like the seed probe but offset 0; used once
//!   per session to discover where the corpus actually starts.

use async_trait::async_trait;

use cmwell_search_protocol::{IndexTime, Pagination, SortBy, ThinSearchParams, ThinResults};

use crate::error::Result;

/// Offset of the seed probe: a non-trivial lower bound on the initial
/// upper bound of the discovery window.
pub const SEED_PROBE_OFFSET: u64 = 1000;

/// Count-only search against the backing index.
#[async_trait]
pub trait ThinSearch: Send + Sync {
    async fn thin_search(
        &self,
        params: &ThinSearchParams,
        pagination: Pagination,
        sort: SortBy,
    ) -> Result<ThinResults>;
}

/// The probe shapes, over any [`ThinSearch`] implementation.
pub struct Prober<'a> {
    search: &'a dyn ThinSearch,
}

impl<'a> Prober<'a> {
    pub fn new(search: &'a dyn ThinSearch) -> Self {
        Self { search }
    }

    /// `indexTime` of the 1001st record at or after `from`, if any.
    pub async fn seed(
        &self,
        params: &ThinSearchParams,
        from: IndexTime,
    ) -> Result<Option<IndexTime>> {
        let results = self
            .search
            .thin_search(
                &params.floored(from),
                Pagination {
                    offset: SEED_PROBE_OFFSET,
                    limit: 1,
                },
                SortBy::IndexTimeAsc,
            )
            .await?;
        Ok(results.records.first().and_then(|r| r.index_time))
    }

    /// `indexTime` of the earliest record at or after `from`, if any.
    pub async fn first(
        &self,
        params: &ThinSearchParams,
        from: IndexTime,
    ) -> Result<Option<IndexTime>> {
        let results = self
            .search
            .thin_search(
                &params.floored(from),
                Pagination { offset: 0, limit: 1 },
                SortBy::IndexTimeAsc,
            )
            .await?;
        Ok(results.records.first().and_then(|r| r.index_time))
    }

    /// Number of records with `indexTime ∈ [from, to)`.
    pub async fn count(
        &self,
        params: &ThinSearchParams,
        from: IndexTime,
        to: IndexTime,
    ) -> Result<u64> {
        let results = self
            .search
            .thin_search(
                &params.bounded(from, to),
                Pagination { offset: 0, limit: 1 },
                SortBy::None,
            )
            .await?;
        Ok(results.total)
    }
}
