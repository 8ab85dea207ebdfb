//! Collaborator seams consumed by the chunk dispatcher.
//!
//! All collaborators are supplied at construction, never resolved
//! globally, so tests can inject deterministic implementations.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{stream, Stream, StreamExt};

use cmwell_search_protocol::{FieldFilter, IndexedRecord, ThinSearchParams};

use crate::error::Result;

/// Stream of records for one resolved chunk.
pub type RecordStream = Pin<Box<dyn Stream<Item = Result<IndexedRecord>> + Send>>;

/// Scroll source: streams every record matching the (time-bounded)
/// session criteria, in unspecified order.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Returns the total hit count up front and a stream of the hits.
    async fn scroll(&self, params: &ThinSearchParams) -> Result<(u64, RecordStream)>;
}

/// Optional post-processing that attaches record payloads and backfills
/// missing `indexTime` values from a `{uuid -> indexTime}` map.
#[async_trait]
pub trait RecordBodyResolver: Send + Sync {
    async fn resolve(&self, records: Vec<IndexedRecord>) -> Result<Vec<IndexedRecord>>;
}

/// Parses a `qp` expression and resolves field names against a types
/// cache.
#[async_trait]
pub trait FieldFilterParser: Send + Sync {
    async fn parse(&self, qp: &str) -> Result<FieldFilter>;
}

/// Pipe a record stream through a body resolver in batches, preserving
/// streaming semantics for the response body.
pub fn resolved_stream(
    inner: RecordStream,
    resolver: Arc<dyn RecordBodyResolver>,
    batch_size: usize,
) -> RecordStream {
    struct State {
        inner: RecordStream,
        resolver: Arc<dyn RecordBodyResolver>,
        batch_size: usize,
        ready: VecDeque<IndexedRecord>,
        done: bool,
    }

    let state = State {
        inner,
        resolver,
        batch_size: batch_size.max(1),
        ready: VecDeque::new(),
        done: false,
    };

    Box::pin(stream::unfold(state, |mut st| async move {
        loop {
            if let Some(record) = st.ready.pop_front() {
                return Some((Ok(record), st));
            }
            if st.done {
                return None;
            }
            let mut batch = Vec::with_capacity(st.batch_size);
            while batch.len() < st.batch_size {
                match st.inner.next().await {
                    Some(Ok(record)) => batch.push(record),
                    Some(Err(e)) => return Some((Err(e), st)),
                    None => {
                        st.done = true;
                        break;
                    }
                }
            }
            if batch.is_empty() {
                return None;
            }
            match st.resolver.resolve(batch).await {
                Ok(records) => st.ready.extend(records),
                Err(e) => return Some((Err(e), st)),
            }
        }
    }))
}
