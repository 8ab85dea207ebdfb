//! One-shot discovery budget.

use std::time::Duration;
use tokio::time::Instant;

/// Deadline observed by the range finder between probes.
///
/// Expiry never cancels an in-flight probe; the finder polls [`expired`]
/// at each iteration entry and falls back to a possibly-shrunken range.
///
/// [`expired`]: Deadline::expired
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    expires_at: Option<Instant>,
}

impl Deadline {
    /// A deadline that never expires.
    pub fn never() -> Self {
        Self { expires_at: None }
    }

    /// A deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self {
            expires_at: Some(Instant::now() + budget),
        }
    }

    pub fn expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}
