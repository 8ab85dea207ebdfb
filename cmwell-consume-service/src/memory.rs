//! In-memory index backend.
//!
//! Implements the collaborator traits over a plain vector of records:
//! enough for the demo binary and for deterministic end-to-end tests.
//! Inserting a record at an existing path demotes the previous version to
//! history.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use futures::stream;

use cmwell_search_protocol::{
    IndexedRecord, IndexTime, Pagination, SortBy, ThinResults, ThinSearchParams,
};

use crate::error::{Result, ServiceError};
use crate::probe::ThinSearch;
use crate::scroll::{RecordBodyResolver, RecordSource, RecordStream};

#[derive(Debug, Default)]
pub struct MemoryIndex {
    records: RwLock<Vec<IndexedRecord>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, demoting any current version at the same path.
    pub fn insert(&self, record: IndexedRecord) {
        let mut records = self.records.write().expect("memory index lock poisoned");
        for existing in records.iter_mut() {
            if existing.path == record.path && existing.current {
                existing.current = false;
            }
        }
        records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.read().expect("memory index lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn matching(&self, params: &ThinSearchParams) -> Vec<IndexedRecord> {
        let records = self.records.read().expect("memory index lock poisoned");
        records
            .iter()
            .filter(|r| params.with_history || r.current)
            .filter(|r| params.with_deleted || !r.deleted)
            .filter(|r| {
                params
                    .path_filter
                    .as_ref()
                    .map_or(true, |pf| pf.matches(&r.path))
            })
            .filter(|r| {
                params
                    .field_filter
                    .as_ref()
                    .map_or(true, |ff| ff.matches(r))
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ThinSearch for MemoryIndex {
    async fn thin_search(
        &self,
        params: &ThinSearchParams,
        pagination: Pagination,
        sort: SortBy,
    ) -> Result<ThinResults> {
        let mut hits = self.matching(params);
        if sort == SortBy::IndexTimeAsc {
            hits.sort_by_key(|r| r.index_time);
        }
        let total = hits.len() as u64;
        let records = hits
            .into_iter()
            .skip(pagination.offset as usize)
            .take(pagination.limit as usize)
            .collect();
        Ok(ThinResults { total, records })
    }
}

#[async_trait]
impl RecordSource for MemoryIndex {
    async fn scroll(&self, params: &ThinSearchParams) -> Result<(u64, RecordStream)> {
        let hits = self.matching(params);
        let total = hits.len() as u64;
        let stream: RecordStream = Box::pin(stream::iter(hits.into_iter().map(Ok)));
        Ok((total, stream))
    }
}

#[async_trait]
impl RecordBodyResolver for MemoryIndex {
    async fn resolve(&self, records: Vec<IndexedRecord>) -> Result<Vec<IndexedRecord>> {
        let index_times: HashMap<String, Option<IndexTime>> = {
            let all = self.records.read().map_err(|_| ServiceError::Resolve {
                message: "memory index lock poisoned".to_string(),
            })?;
            all.iter()
                .map(|r| (r.uuid.clone(), r.index_time))
                .collect()
        };
        Ok(records
            .into_iter()
            .map(|mut r| {
                if r.index_time.is_none() {
                    r.index_time = index_times.get(&r.uuid).copied().flatten();
                }
                if r.payload.is_none() {
                    r.payload = serde_json::to_string(&r.fields).ok();
                }
                r
            })
            .collect())
    }
}
