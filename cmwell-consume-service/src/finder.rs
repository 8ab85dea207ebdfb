//! Adaptive time-range discovery.
//!
//! Given a starting `from`, a target chunk size and a deadline, the finder
//! produces an upper bound `to` such that the number of records with
//! `indexTime ∈ [from, to)` lands in the acceptance band
//! `[threshold/2, 3·threshold/2)`. The corpus distribution over time is
//! arbitrary and non-stationary, so the bound is discovered per chunk:
//!
//! 1. **seed** — the 1001st record's `indexTime` (or the settled wall
//!    clock when the corpus is short) gives the initial window;
//! 2. **expand** — the window doubles until its count reaches the band or
//!    overshoots it;
//! 3. **shrink** — a shrinking-step binary search walks the bound into the
//!    band.
//!
//! The pipeline is a loop over small state records rather than deep
//! recursion. The deadline is polled at every iteration entry; on expiry
//! the finder returns the best bound not known to overshoot.

use chrono::Utc;

use cmwell_search_protocol::{IndexTime, ThinSearchParams};

use crate::deadline::Deadline;
use crate::error::Result;
use crate::probe::{Prober, ThinSearch};

/// Margin subtracted from the wall clock before it is used as an upper
/// bound: records indexed in the last 30 seconds may not be visible yet.
const INDEX_SETTLE_MARGIN_MS: i64 = 30_000;

/// Floor on `toSeed - from`. More than a seed probe's offset worth of
/// records can share the starting `indexTime`; without the floor the seed
/// window would be empty and expansion would never leave zero.
const SEED_FLOOR_MS: i64 = 1729;

/// The wall clock in epoch milliseconds, pulled back by the settle margin.
pub fn settled_now() -> IndexTime {
    Utc::now().timestamp_millis() - INDEX_SETTLE_MARGIN_MS
}

/// Resolved half-open range for one chunk, optionally carrying a
/// cheaply-learned upper bound for the next chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrRange {
    pub from: IndexTime,
    pub to: IndexTime,
    pub next_to_hint: Option<IndexTime>,
}

/// State of the shrinking-step binary search.
struct ShrinkState {
    position: IndexTime,
    step: IndexTime,
    /// Greatest bound whose count came back under the band. The expiry
    /// fallback never drops below it.
    undershoot: IndexTime,
    hint: Option<IndexTime>,
}

pub struct RangeFinder<'a> {
    probes: Prober<'a>,
}

impl<'a> RangeFinder<'a> {
    pub fn new(search: &'a dyn ThinSearch) -> Self {
        Self {
            probes: Prober::new(search),
        }
    }

    /// Discover an upper bound for the chunk starting at `from`.
    pub async fn find(
        &self,
        params: &ThinSearchParams,
        from: IndexTime,
        threshold: u64,
        deadline: &Deadline,
    ) -> Result<CurrRange> {
        self.find_bounded(params, from, threshold, deadline, settled_now())
            .await
    }

    /// As [`find`](Self::find) with an explicit `now`, fixed for the whole
    /// discovery.
    pub async fn find_bounded(
        &self,
        params: &ThinSearchParams,
        from: IndexTime,
        threshold: u64,
        deadline: &Deadline,
        now: IndexTime,
    ) -> Result<CurrRange> {
        let to_seed = match self.probes.seed(params, from).await? {
            Some(first) => first.max(from + SEED_FLOOR_MS),
            None => now,
        };
        self.expand(params, from, to_seed, threshold, deadline, now)
            .await
    }

    async fn expand(
        &self,
        params: &ThinSearchParams,
        from: IndexTime,
        to_seed: IndexTime,
        threshold: u64,
        deadline: &Deadline,
        now: IndexTime,
    ) -> Result<CurrRange> {
        let mut to = to_seed;
        // Last upper bound whose count came back under the band.
        let mut range_start = from;
        loop {
            let step = to - from;
            if deadline.expired() {
                return Ok(CurrRange {
                    from,
                    to: from + step / 2,
                    next_to_hint: None,
                });
            }
            if to >= now {
                return self
                    .finish_at_now(params, from, range_start, threshold, deadline, now)
                    .await;
            }
            let total = self.probes.count(params, from, to).await?;
            tracing::debug!(from, to, total, threshold, "expand probe");
            if 2 * total < threshold {
                range_start = to;
                to += step;
            } else if 2 * total < 3 * threshold {
                return Ok(CurrRange {
                    from,
                    to,
                    next_to_hint: None,
                });
            } else {
                let hint = (total < 3 * threshold).then_some(to);
                return self
                    .shrink(
                        params,
                        from,
                        ShrinkState {
                            position: to - step / 4,
                            step: step / 4,
                            undershoot: range_start,
                            hint,
                        },
                        threshold,
                        deadline,
                    )
                    .await;
            }
        }
    }

    /// The window has reached the settled wall clock: accept `[from, now)`
    /// outright if it is not oversized, otherwise binary-search between the
    /// last undershooting bound and `now`.
    async fn finish_at_now(
        &self,
        params: &ThinSearchParams,
        from: IndexTime,
        range_start: IndexTime,
        threshold: u64,
        deadline: &Deadline,
        now: IndexTime,
    ) -> Result<CurrRange> {
        let total = self.probes.count(params, from, now).await?;
        if 2 * total <= 3 * threshold {
            return Ok(CurrRange {
                from,
                to: now,
                next_to_hint: None,
            });
        }
        let hint = (total < 3 * threshold).then_some(now);
        self.shrink(
            params,
            from,
            ShrinkState {
                position: (range_start + now) / 2,
                step: (now - range_start) / 4,
                undershoot: range_start,
                hint,
            },
            threshold,
            deadline,
        )
        .await
    }

    async fn shrink(
        &self,
        params: &ThinSearchParams,
        from: IndexTime,
        mut state: ShrinkState,
        threshold: u64,
        deadline: &Deadline,
    ) -> Result<CurrRange> {
        loop {
            if deadline.expired() {
                // The bound two halvings back: equal to the last
                // undershooting position when the previous probe came up
                // short, and never beyond a bound known to be acceptable.
                let fallback = (state.position - 2 * state.step).max(state.undershoot);
                tracing::debug!(from, to = fallback, "discovery budget spent mid-shrink");
                return Ok(CurrRange {
                    from,
                    to: fallback,
                    next_to_hint: state.hint,
                });
            }
            if state.step == 0 {
                // Sub-millisecond convergence: the count can jump over the
                // band entirely when many records share one indexTime.
                return Ok(CurrRange {
                    from,
                    to: state.position,
                    next_to_hint: state.hint,
                });
            }
            let total = self.probes.count(params, from, state.position).await?;
            tracing::debug!(
                from,
                position = state.position,
                step = state.step,
                total,
                "shrink probe"
            );
            if 2 * total < threshold {
                state.undershoot = state.undershoot.max(state.position);
                state.position += state.step;
                state.step /= 2;
            } else if 2 * total < 3 * threshold {
                return Ok(CurrRange {
                    from,
                    to: state.position,
                    next_to_hint: state.hint,
                });
            } else {
                if state.hint.is_none() && total < 3 * threshold {
                    state.hint = Some(state.position);
                }
                state.position -= state.step;
                state.step /= 2;
            }
        }
    }
}
