//! End-to-end tests for the bulk consume endpoints.
//!
//! These drive the full router over an in-memory index and verify:
//! 1. Cursor minting, advancement, and quiescence behaviour
//! 2. The partition law across a whole iteration
//! 3. Request validation for cursor-owned parameters and formats

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::Router;
use chrono::Utc;
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use cmwell_consume_httpd::{
    build_router, AppState, ConsumeConfig, HEADER_N, HEADER_POSITION, HEADER_TO,
};
use cmwell_consume_service::{
    BulkConsumeState, MemoryIndex, QpFieldFilterParser, RecordSource, RecordStream,
};
use cmwell_search_protocol::{IndexedRecord, ThinSearchParams};

// =============================================================================
// Test utilities
// =============================================================================

fn test_config() -> ConsumeConfig {
    ConsumeConfig {
        host: "example.org".to_string(),
        ..ConsumeConfig::default()
    }
}

fn router_over(index: Arc<MemoryIndex>) -> Router {
    build_router(Arc::new(AppState::with_memory_index(test_config(), index)))
}

async fn send(router: &Router, uri: &str) -> http::Response<Body> {
    router
        .clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("infallible router")
}

fn header(resp: &http::Response<Body>, name: &str) -> Option<String> {
    resp.headers()
        .get(name)
        .map(|v| v.to_str().expect("ascii header").to_string())
}

async fn body_string(resp: http::Response<Body>) -> String {
    let bytes = resp
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

/// A base index time safely in the past of the server's settled clock.
fn past_base() -> i64 {
    Utc::now().timestamp_millis() - 1_000_000_000
}

// =============================================================================
// Cursor minting and quiescence
// =============================================================================

#[tokio::test]
async fn test_bare_request_requires_position() {
    let router = router_over(Arc::new(MemoryIndex::new()));
    let resp = send(&router, "/v1/bulk-consume").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(resp).await.contains("position param is mandatory"));
}

#[tokio::test]
async fn test_first_request_on_empty_corpus_quiesces() {
    let router = router_over(Arc::new(MemoryIndex::new()));
    let resp = send(
        &router,
        "/v1/bulk-consume?path=/&recursive=true&length-hint=100",
    )
    .await;

    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(header(&resp, HEADER_N).as_deref(), Some("0"));
    assert!(header(&resp, HEADER_TO).is_none());

    let state =
        BulkConsumeState::decode(&header(&resp, HEADER_POSITION).expect("position header"))
            .expect("decodable position");
    assert_eq!(state.from, 0);
    let to = state.to.expect("quiescent cursor pins the probed range");
    assert!(to > 0 && to <= Utc::now().timestamp_millis());
    assert_eq!(state.chunk_size_hint, 100);
    assert_eq!(state.path.as_deref(), Some("/"));
    assert!(state.recursive);
    assert!(!state.with_history);
    assert!(!state.with_deleted);
}

#[tokio::test]
async fn test_quiescent_position_echoes_on_reuse() {
    let router = router_over(Arc::new(MemoryIndex::new()));
    let first = send(&router, "/v1/bulk-consume?path=/&recursive=true").await;
    let token = header(&first, HEADER_POSITION).expect("position header");

    let again = send(&router, &format!("/v1/bulk-consume?position={token}")).await;
    assert_eq!(again.status(), StatusCode::NO_CONTENT);
    assert_eq!(header(&again, HEADER_POSITION).as_deref(), Some(token.as_str()));
}

#[tokio::test]
async fn test_create_consumer_mints_session() {
    let router = router_over(Arc::new(MemoryIndex::new()));
    let resp = send(
        &router,
        "/v1/create-consumer?path=/news&recursive=true&length-hint=50&qp=type::article&with-history=true",
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let state =
        BulkConsumeState::decode(&header(&resp, HEADER_POSITION).expect("position header"))
            .expect("decodable position");
    assert_eq!(state.from, 0);
    assert_eq!(state.to, None);
    assert_eq!(state.path.as_deref(), Some("/news"));
    assert_eq!(state.chunk_size_hint, 50);
    assert!(state.with_history);
    assert!(state.field_filter.is_some());
}

// =============================================================================
// Request validation
// =============================================================================

#[tokio::test]
async fn test_cursor_owned_parameter_conflict() {
    let router = router_over(Arc::new(MemoryIndex::new()));
    let minted = send(&router, "/v1/create-consumer?path=/&recursive=true").await;
    let token = header(&minted, HEADER_POSITION).expect("position header");

    let resp = send(
        &router,
        &format!("/v1/bulk-consume?position={token}&with-history=true"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(resp)
        .await
        .contains("`with-history` is determined in the beginning of the iteration"));
}

#[tokio::test]
async fn test_invalid_format_selector() {
    let router = router_over(Arc::new(MemoryIndex::new()));
    let resp = send(
        &router,
        "/v1/bulk-consume?path=/&recursive=true&format=rdfxml",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(resp)
        .await
        .contains("requested format (rdfxml) is invalid for as streamable response."));
}

#[tokio::test]
async fn test_undecodable_position() {
    let router = router_over(Arc::new(MemoryIndex::new()));
    let resp = send(&router, "/v1/bulk-consume?position=!!garbage!!").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_qp() {
    let router = router_over(Arc::new(MemoryIndex::new()));
    let resp = send(&router, "/v1/bulk-consume?path=/&qp=::oops").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(resp).await.contains("invalid field filter"));
}

// =============================================================================
// Iteration
// =============================================================================

#[tokio::test]
async fn test_full_iteration_partitions_corpus() {
    let index = Arc::new(MemoryIndex::new());
    let base = past_base();
    let total = 600usize;
    for i in 0..total {
        index.insert(IndexedRecord::new(
            format!("uuid-{i}"),
            format!("/data/{i}"),
            Some(base + (i as i64) * 1_000),
        ));
    }
    let router = router_over(index);

    let mut seen: Vec<String> = Vec::new();
    let mut resp = send(
        &router,
        "/v1/bulk-consume?path=/&recursive=true&length-hint=100&format=text",
    )
    .await;
    let mut session: Option<BulkConsumeState> = None;

    for _ in 0..50 {
        match resp.status() {
            StatusCode::NO_CONTENT => {
                assert_eq!(header(&resp, HEADER_N).as_deref(), Some("0"));
                assert_eq!(seen.len(), total, "iteration ended before the corpus did");
                let mut expected: Vec<String> =
                    (0..total).map(|i| format!("/data/{i}")).collect();
                expected.sort();
                seen.sort();
                assert_eq!(seen, expected, "gaps or overlaps in the partition");
                return;
            }
            StatusCode::OK => {
                let to: i64 = header(&resp, HEADER_TO)
                    .expect("to header")
                    .parse()
                    .expect("numeric to");
                let n: usize = header(&resp, HEADER_N)
                    .expect("n header")
                    .parse()
                    .expect("numeric n");
                // Acceptance band: chunks stay below 1.5x the hint.
                assert!(n <= 150, "chunk of {n} records exceeds the band");

                let token = header(&resp, HEADER_POSITION).expect("position header");
                let state = BulkConsumeState::decode(&token).expect("decodable position");
                // The next chunk starts exactly where this one ended.
                assert_eq!(state.from, to);
                assert!(state.from <= Utc::now().timestamp_millis());

                // Session identity is frozen across cursors.
                if let Some(prev) = &session {
                    assert_eq!(state.path, prev.path);
                    assert_eq!(state.recursive, prev.recursive);
                    assert_eq!(state.with_history, prev.with_history);
                    assert_eq!(state.with_deleted, prev.with_deleted);
                    assert_eq!(state.chunk_size_hint, prev.chunk_size_hint);
                    assert_eq!(state.field_filter, prev.field_filter);
                    assert!(state.from >= prev.from);
                }
                session = Some(state);

                let body = body_string(resp).await;
                let lines: Vec<&str> = body.lines().collect();
                assert_eq!(lines.len(), n, "body line count disagrees with X-CM-WELL-N");
                seen.extend(lines.iter().map(|l| l.to_string()));

                resp = send(
                    &router,
                    &format!("/v1/bulk-consume?position={token}&format=text"),
                )
                .await;
            }
            other => panic!("unexpected status {other}"),
        }
    }
    panic!("iteration did not quiesce within 50 chunks");
}

#[tokio::test]
async fn test_qp_filter_restricts_iteration() {
    let index = Arc::new(MemoryIndex::new());
    let base = past_base();
    for i in 0..20 {
        let kind = if i % 2 == 0 { "article" } else { "draft" };
        index.insert(
            IndexedRecord::new(format!("u{i}"), format!("/doc/{i}"), Some(base + i))
                .with_field("type", kind),
        );
    }
    let router = router_over(index);

    let resp = send(
        &router,
        "/v1/bulk-consume?path=/&recursive=true&qp=type::article&format=text",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header(&resp, HEADER_N).as_deref(), Some("10"));
    let body = body_string(resp).await;
    assert!(body.lines().all(|l| {
        let i: usize = l.rsplit('/').next().unwrap().parse().unwrap();
        i % 2 == 0
    }));
}

#[tokio::test]
async fn test_to_hint_fills_missing_upper_bound() {
    let index = Arc::new(MemoryIndex::new());
    let base = past_base();
    for i in 0..1_000 {
        index.insert(IndexedRecord::new(
            format!("u{i}"),
            format!("/d/{i}"),
            Some(base + i),
        ));
    }
    let router = router_over(index);

    let cursor = BulkConsumeState {
        from: base,
        to: None,
        path: Some("/".to_string()),
        with_history: false,
        with_deleted: false,
        recursive: true,
        chunk_size_hint: 100,
        field_filter: None,
    };
    let hint = base + 500;
    let resp = send(
        &router,
        &format!(
            "/v1/bulk-consume?position={}&to-hint={hint}",
            cursor.encode()
        ),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    // The hint is honored verbatim: no range discovery, no band clamping.
    assert_eq!(header(&resp, HEADER_TO), Some(hint.to_string()));
    assert_eq!(header(&resp, HEADER_N).as_deref(), Some("500"));

    let next = BulkConsumeState::decode(&header(&resp, HEADER_POSITION).unwrap()).unwrap();
    assert_eq!(next.from, hint);
    assert_eq!(next.to, None);
}

#[tokio::test]
async fn test_history_ntriples_groups_subjects() {
    let index = Arc::new(MemoryIndex::new());
    let base = past_base();
    // Two versions each of /a and /b, interleaved in time.
    index.insert(IndexedRecord::new("a1", "/a", Some(base + 1)).with_field("v", "1"));
    index.insert(IndexedRecord::new("b1", "/b", Some(base + 2)).with_field("v", "1"));
    index.insert(IndexedRecord::new("a2", "/a", Some(base + 3)).with_field("v", "2"));
    index.insert(IndexedRecord::new("b2", "/b", Some(base + 4)).with_field("v", "2"));
    let router = router_over(index);

    let resp = send(
        &router,
        "/v1/bulk-consume?path=/&recursive=true&with-history=true&format=nt",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header(&resp, HEADER_N).as_deref(), Some("4"));

    let body = body_string(resp).await;
    let subjects: Vec<&str> = body
        .lines()
        .map(|l| l.split_whitespace().next().unwrap())
        .collect();
    // Once a subject's run ends it must not reappear.
    let mut finished: Vec<&str> = Vec::new();
    let mut current: Option<&str> = None;
    for s in subjects {
        if current != Some(s) {
            assert!(!finished.contains(&s), "subject {s} reappeared mid-chunk");
            if let Some(prev) = current {
                finished.push(prev);
            }
            current = Some(s);
        }
    }
}

#[tokio::test]
async fn test_with_data_attaches_payload() {
    let index = Arc::new(MemoryIndex::new());
    index.insert(
        IndexedRecord::new("u1", "/doc/1", Some(past_base())).with_field("type", "article"),
    );
    let router = router_over(index);

    let plain = send(
        &router,
        "/v1/bulk-consume?path=/&recursive=true&format=json",
    )
    .await;
    assert_eq!(plain.status(), StatusCode::OK);
    assert!(!body_string(plain).await.contains("payload"));

    let with_data = send(
        &router,
        "/v1/bulk-consume?path=/&recursive=true&format=json&with-data=true",
    )
    .await;
    assert_eq!(with_data.status(), StatusCode::OK);
    let body = body_string(with_data).await;
    assert!(body.contains("payload"));
    assert!(body.contains("article"));
}

// =============================================================================
// Scroll source selection
// =============================================================================

/// Marks whether it was used, then delegates to the memory index.
struct MarkingSource {
    inner: Arc<MemoryIndex>,
    used: Arc<AtomicBool>,
}

#[async_trait]
impl RecordSource for MarkingSource {
    async fn scroll(
        &self,
        params: &ThinSearchParams,
    ) -> cmwell_consume_service::Result<(u64, RecordStream)> {
        self.used.store(true, Ordering::SeqCst);
        self.inner.scroll(params).await
    }
}

#[tokio::test]
async fn test_slow_bulk_selects_slow_source() {
    let index = Arc::new(MemoryIndex::new());
    index.insert(IndexedRecord::new("u1", "/doc", Some(past_base())));

    let fast_used = Arc::new(AtomicBool::new(false));
    let slow_used = Arc::new(AtomicBool::new(false));
    let state = AppState::new(
        test_config(),
        index.clone(),
        Arc::new(MarkingSource {
            inner: index.clone(),
            used: fast_used.clone(),
        }),
        Arc::new(MarkingSource {
            inner: index.clone(),
            used: slow_used.clone(),
        }),
        index.clone(),
        Arc::new(QpFieldFilterParser::new()),
    );
    let router = build_router(Arc::new(state));

    let resp = send(
        &router,
        "/v1/bulk-consume?path=/&recursive=true&slow-bulk=true",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(slow_used.load(Ordering::SeqCst));
    assert!(!fast_used.load(Ordering::SeqCst));
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health() {
    let router = router_over(Arc::new(MemoryIndex::new()));
    let resp = send(&router, "/v1/health").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json: HashMap<String, String> =
        serde_json::from_str(&body_string(resp).await).expect("health json");
    assert_eq!(json.get("status").map(String::as_str), Some("ok"));
}
