//! Bulk Consume HTTP Server binary.
//!
//! Serves the consume endpoints over an in-memory index, optionally
//! preloaded from an NDJSON file of records.
//!
//! # Example
//!
//! ```bash
//! cmwell-consume-httpd \
//!   --listen 0.0.0.0:9000 \
//!   --data-file /var/data/records.ndjson
//! ```

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use cmwell_consume_httpd::{build_router, AppState, Args};
use cmwell_consume_service::MemoryIndex;
use cmwell_search_protocol::IndexedRecord;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cmwell_consume_httpd=info".parse().unwrap())
                .add_directive("cmwell_consume_service=info".parse().unwrap())
                .add_directive("tower_http=info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    info!(
        listen = %args.listen,
        host = %args.host,
        bulk_binary_search_timeout_ms = args.bulk_binary_search_timeout_ms,
        "Starting bulk consume server"
    );

    let index = Arc::new(MemoryIndex::new());
    if let Some(path) = &args.data_file {
        let loaded = load_records(&index, path).expect("Failed to load data file");
        info!(records = loaded, path = %path.display(), "Preloaded index");
    }

    let state = Arc::new(AppState::with_memory_index(args.consume_config(), index));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .expect("Failed to bind address");

    info!(address = %args.listen, "Server listening");

    axum::serve(listener, app).await.expect("Server error");
}

/// Load NDJSON records, one per line, into the index.
fn load_records(index: &MemoryIndex, path: &std::path::Path) -> std::io::Result<usize> {
    let content = std::fs::read_to_string(path)?;
    let mut loaded = 0;
    for (lineno, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: IndexedRecord = serde_json::from_str(line).map_err(|e| {
            std::io::Error::other(format!("line {}: {e}", lineno + 1))
        })?;
        index.insert(record);
        loaded += 1;
    }
    Ok(loaded)
}
