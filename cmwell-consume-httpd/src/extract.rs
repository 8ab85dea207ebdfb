//! Query-parameter extraction for the consume endpoints.
//!
//! The extractor keeps track of which session-frozen parameters were
//! actually present in the request, because a request that carries a
//! position token must not also carry any of them — they were fixed when
//! the iteration began and silently honoring them would change what the
//! cursor means.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;

use cmwell_search_protocol::IndexTime;

use crate::error::ServerError;

/// Parsed query parameters of a consume request.
#[derive(Debug, Clone, Default)]
pub struct ConsumeParams {
    pub position: Option<String>,
    pub path: Option<String>,
    pub qp: Option<String>,
    pub index_time: Option<IndexTime>,
    pub recursive: Option<bool>,
    pub with_history: Option<bool>,
    pub with_deleted: Option<bool>,
    pub length_hint: Option<u64>,
    pub to_hint: Option<IndexTime>,
    pub format: Option<String>,
    pub with_data: bool,
    pub slow_bulk: bool,
    pub debug_info: bool,
    /// Session-frozen parameters present in this request, by the name the
    /// client used.
    frozen: Vec<&'static str>,
}

impl ConsumeParams {
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, ServerError> {
        let mut frozen = Vec::new();

        let path = map.get("path").cloned();
        if path.is_some() {
            frozen.push("path");
        }

        let qp = map.get("qp").cloned();
        if qp.is_some() {
            frozen.push("qp");
        }

        let index_time = int_param(map, "index-time")?;
        if index_time.is_some() {
            frozen.push("index-time");
        }

        let recursive = match flag_param(map, "recursive")? {
            Some(v) => {
                frozen.push("recursive");
                Some(v)
            }
            None => {
                let v = flag_param(map, "with-descendants")?;
                if v.is_some() {
                    frozen.push("with-descendants");
                }
                v
            }
        };

        let with_history = flag_param(map, "with-history")?;
        if with_history.is_some() {
            frozen.push("with-history");
        }

        let with_deleted = flag_param(map, "with-deleted")?;
        if with_deleted.is_some() {
            frozen.push("with-deleted");
        }

        let length_hint = match int_param(map, "length-hint")? {
            Some(v) if v <= 0 => {
                return Err(ServerError::bad_request("length-hint must be positive"));
            }
            Some(v) => {
                frozen.push("length-hint");
                Some(v as u64)
            }
            None => None,
        };

        Ok(Self {
            position: map.get("position").cloned(),
            path,
            qp,
            index_time,
            recursive,
            with_history,
            with_deleted,
            length_hint,
            to_hint: int_param(map, "to-hint")?,
            format: map.get("format").cloned(),
            with_data: flag_param(map, "with-data")?.unwrap_or(false),
            slow_bulk: flag_param(map, "slow-bulk")?.unwrap_or(false),
            debug_info: flag_param(map, "debug-info")?.unwrap_or(false),
            frozen,
        })
    }

    /// Whether any session-defining parameter was supplied (marks a first
    /// request when no position is present).
    pub fn has_session_params(&self) -> bool {
        !self.frozen.is_empty()
    }

    /// Reject session-frozen parameters supplied next to a position
    /// token, naming the offender.
    pub fn ensure_position_compatible(&self) -> Result<(), ServerError> {
        if self.position.is_some() {
            if let Some(name) = self.frozen.first() {
                return Err(ServerError::bad_request(format!(
                    "`{name}` is determined in the beginning of the iteration"
                )));
            }
        }
        Ok(())
    }
}

/// Presence-style boolean: a bare `?flag` or `?flag=true` enables it.
fn flag_param(map: &HashMap<String, String>, name: &str) -> Result<Option<bool>, ServerError> {
    match map.get(name).map(String::as_str) {
        None => Ok(None),
        Some("" | "true" | "1") => Ok(Some(true)),
        Some("false" | "0") => Ok(Some(false)),
        Some(other) => Err(ServerError::bad_request(format!(
            "illegal value for {name}: {other}"
        ))),
    }
}

fn int_param(map: &HashMap<String, String>, name: &str) -> Result<Option<i64>, ServerError> {
    match map.get(name) {
        None => Ok(None),
        Some(raw) => raw.parse::<i64>().map(Some).map_err(|_| {
            ServerError::bad_request(format!("illegal value for {name}: {raw}"))
        }),
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ConsumeParams
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(map) = Query::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|e| ServerError::bad_request(e.to_string()))?;
        Self::from_map(&map)
    }
}
