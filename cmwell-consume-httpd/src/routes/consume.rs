//! Chunk dispatcher: `GET /v1/bulk-consume` and `GET /v1/create-consumer`.
//!
//! One consume request resolves one `[from, to)` interval on the
//! `indexTime` axis, streams the records inside it, and returns the next
//! position token as a header. The interval either comes pre-resolved
//! from the cursor (or a `to-hint`), or is discovered by the range finder
//! under the configured time budget.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::Response;
use futures::{StreamExt, TryStreamExt};

use cmwell_consume_service::{
    resolved_stream, BulkConsumeState, CurrRange, Deadline, Prober, RangeFinder, settled_now,
};
use cmwell_record_format::{group_by_subject, FormatterFactory, OutputFormat};
use cmwell_search_protocol::{IndexedRecord, ThinSearchParams};

use crate::error::{Result, ServerError};
use crate::extract::ConsumeParams;
use crate::state::AppState;

/// Number of records in this chunk, as ASCII decimal.
pub const HEADER_N: &str = "X-CM-WELL-N";
/// The opaque position token to resume from.
pub const HEADER_POSITION: &str = "X-CM-WELL-POSITION";
/// The resolved upper bound of this chunk, as ASCII decimal milliseconds.
pub const HEADER_TO: &str = "X-CM-WELL-TO";

/// Batch size for piping a chunk through the record-body resolver.
const RESOLVE_BATCH: usize = 128;

/// Consume one chunk.
///
/// `GET /v1/bulk-consume`
pub async fn bulk_consume(
    State(state): State<Arc<AppState>>,
    params: ConsumeParams,
) -> Result<Response> {
    let (cursor, received_token) = match session_state(&state, &params).await {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(error = %e, position = ?params.position, "bulk consume rejected");
            return Err(e);
        }
    };

    match consume_chunk(&state, &params, &cursor, received_token.as_deref()).await {
        Ok(response) => Ok(response),
        Err(e) => {
            tracing::error!(
                error = %e,
                field_filter = ?cursor.field_filter,
                from = cursor.from,
                recursive = cursor.recursive,
                with_history = cursor.with_history,
                with_deleted = cursor.with_deleted,
                path = ?cursor.path,
                chunk_size_hint = cursor.chunk_size_hint,
                "bulk consume failed"
            );
            Err(e)
        }
    }
}

/// Mint an initial position token without consuming.
///
/// `GET /v1/create-consumer`
pub async fn create_consumer(
    State(state): State<Arc<AppState>>,
    params: ConsumeParams,
) -> Result<Response> {
    if params.position.is_some() {
        return Err(ServerError::bad_request(
            "position cannot be supplied when creating a consumer",
        ));
    }
    let cursor = initial_state(&state, &params).await?;
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(HEADER_POSITION, cursor.encode())
        .body(Body::empty())
        .expect("response builder cannot fail"))
}

/// Decode the position token, or mint a fresh session from first-request
/// parameters.
async fn session_state(
    state: &AppState,
    params: &ConsumeParams,
) -> Result<(BulkConsumeState, Option<String>)> {
    if let Some(token) = &params.position {
        params.ensure_position_compatible()?;
        let mut cursor = BulkConsumeState::decode(token)?;
        // `to-hint` only fills an upper bound the cursor does not already
        // carry; a hint at or below `from` is useless and dropped.
        if cursor.to.is_none() {
            if let Some(hint) = params.to_hint {
                if hint > cursor.from {
                    cursor.to = Some(hint);
                }
            }
        }
        return Ok((cursor, Some(token.clone())));
    }
    if params.has_session_params() {
        return Ok((initial_state(state, params).await?, None));
    }
    Err(ServerError::bad_request("position param is mandatory"))
}

/// Build the session state of a first request.
async fn initial_state(state: &AppState, params: &ConsumeParams) -> Result<BulkConsumeState> {
    let field_filter = match &params.qp {
        Some(qp) => Some(state.filter_parser.parse(qp).await?),
        None => None,
    };
    Ok(BulkConsumeState {
        from: params.index_time.unwrap_or(0).max(0),
        to: None,
        path: Some(params.path.clone().unwrap_or_else(|| "/".to_string())),
        with_history: params.with_history.unwrap_or(false),
        with_deleted: params.with_deleted.unwrap_or(false),
        recursive: params.recursive.unwrap_or(true),
        chunk_size_hint: params.length_hint.unwrap_or(state.config.default_length_hint),
        field_filter,
    })
}

async fn consume_chunk(
    state: &AppState,
    params: &ConsumeParams,
    cursor: &BulkConsumeState,
    received_token: Option<&str>,
) -> Result<Response> {
    let format = OutputFormat::parse(params.format.as_deref().unwrap_or("text"))?;
    let thin = cursor.thin_params();

    let deadline = Deadline::after(state.config.bulk_binary_search_timeout);
    let range = resolve_range(state, cursor, &thin, &deadline).await?;

    if params.debug_info {
        tracing::info!(
            from = range.from,
            to = range.to,
            next_to_hint = ?range.next_to_hint,
            pre_resolved = cursor.to.is_some(),
            "resolved consume range"
        );
    }

    let bounded = thin.bounded(range.from, range.to);
    let source = if params.slow_bulk {
        &state.slow_scroll
    } else {
        &state.scroll
    };
    let (hits, records) = source.scroll(&bounded).await?;

    if hits == 0 {
        // Quiescence: the client has caught up. The position must not
        // advance; echo the received token, or on a first request mint
        // one that pins the probed range.
        let token = match received_token {
            Some(token) => token.to_string(),
            None => {
                let quiescent_to = (range.to > cursor.from).then_some(range.to);
                cursor.with_to(quiescent_to).encode()
            }
        };
        return Ok(Response::builder()
            .status(StatusCode::NO_CONTENT)
            .header(HEADER_N, "0")
            .header(HEADER_POSITION, token)
            .body(Body::empty())
            .expect("response builder cannot fail"));
    }

    let next_token = cursor.advanced(range.to, range.next_to_hint).encode();
    let formatter = FormatterFactory::create(&format, &state.config.host, params.with_data);

    let records = if params.with_data {
        resolved_stream(records, state.body_resolver.clone(), RESOLVE_BATCH)
    } else {
        records
    };

    let body = if format.requires_subject_grouping(cursor.with_history) {
        // Chunk sizes are bounded by the acceptance band; buffering the
        // chunk to keep each subject's versions adjacent is affordable.
        let collected: Vec<IndexedRecord> = records.try_collect().await?;
        let mut buf = Vec::new();
        for record in group_by_subject(collected) {
            buf.extend_from_slice(&formatter.format_record(&record));
        }
        Body::from(buf)
    } else {
        Body::from_stream(records.map(move |item| match item {
            Ok(record) => Ok(formatter.format_record(&record)),
            Err(e) => Err(std::io::Error::other(e.to_string())),
        }))
    };

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, format.content_type())
        .header(HEADER_N, hits.to_string())
        .header(HEADER_POSITION, next_token)
        .header(HEADER_TO, range.to.to_string())
        .body(body)
        .expect("response builder cannot fail"))
}

/// Resolve the chunk's interval: use the cursor's pre-resolved bound when
/// present, otherwise discover one. A session starting at zero first
/// locates where the corpus actually begins.
async fn resolve_range(
    state: &AppState,
    cursor: &BulkConsumeState,
    thin: &ThinSearchParams,
    deadline: &Deadline,
) -> Result<CurrRange> {
    if let Some(to) = cursor.to {
        return Ok(CurrRange {
            from: cursor.from,
            to,
            next_to_hint: None,
        });
    }

    let finder = RangeFinder::new(state.search.as_ref());
    if cursor.from == 0 {
        let prober = Prober::new(state.search.as_ref());
        return match prober.first(thin, 0).await? {
            None => Ok(CurrRange {
                from: 0,
                to: settled_now(),
                next_to_hint: None,
            }),
            Some(first) => Ok(finder
                .find(thin, first, cursor.chunk_size_hint, deadline)
                .await?),
        };
    }
    Ok(finder
        .find(thin, cursor.from, cursor.chunk_size_hint, deadline)
        .await?)
}
