//! Application state: configuration plus the injected collaborators.
//!
//! Collaborators are supplied at construction, not resolved globally, so
//! tests can inject deterministic probes and scroll sources.

use std::sync::Arc;
use std::time::Duration;

use cmwell_consume_service::{
    FieldFilterParser, MemoryIndex, QpFieldFilterParser, RecordBodyResolver, RecordSource,
    ThinSearch,
};

/// Runtime configuration of the consume endpoints.
#[derive(Debug, Clone)]
pub struct ConsumeConfig {
    /// Advertised authority used by subject-producing formatters.
    pub host: String,
    /// Discovery budget for a single chunk's range search.
    pub bulk_binary_search_timeout: Duration,
    /// Chunk size target when the client supplies no `length-hint`.
    pub default_length_hint: u64,
}

impl Default for ConsumeConfig {
    fn default() -> Self {
        Self {
            host: "localhost:9000".to_string(),
            bulk_binary_search_timeout: Duration::from_millis(8000),
            default_length_hint: 100,
        }
    }
}

/// Application state shared across handlers.
pub struct AppState {
    pub config: ConsumeConfig,
    /// Count-only probes for range discovery.
    pub search: Arc<dyn ThinSearch>,
    /// High-throughput scroll source (default).
    pub scroll: Arc<dyn RecordSource>,
    /// Non-parallelised scroll source, selected by `slow-bulk`.
    pub slow_scroll: Arc<dyn RecordSource>,
    /// Payload attachment and `indexTime` backfill for `with-data`.
    pub body_resolver: Arc<dyn RecordBodyResolver>,
    /// `qp` expression parser + field-name resolution.
    pub filter_parser: Arc<dyn FieldFilterParser>,
}

impl AppState {
    pub fn new(
        config: ConsumeConfig,
        search: Arc<dyn ThinSearch>,
        scroll: Arc<dyn RecordSource>,
        slow_scroll: Arc<dyn RecordSource>,
        body_resolver: Arc<dyn RecordBodyResolver>,
        filter_parser: Arc<dyn FieldFilterParser>,
    ) -> Self {
        Self {
            config,
            search,
            scroll,
            slow_scroll,
            body_resolver,
            filter_parser,
        }
    }

    /// Wire every collaborator to one in-memory index (demo server and
    /// tests).
    pub fn with_memory_index(config: ConsumeConfig, index: Arc<MemoryIndex>) -> Self {
        Self::new(
            config,
            index.clone(),
            index.clone(),
            index.clone(),
            index,
            Arc::new(QpFieldFilterParser::new()),
        )
    }
}
