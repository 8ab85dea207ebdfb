//! Bulk Consume HTTP Server
//!
//! A thin HTTP wrapper around `cmwell-consume-service`, exposing an
//! endpoint that iterates a large, growing indexed corpus in opaque
//! chunks resumable from a stateless position token.
//!
//! # Endpoints
//!
//! - `GET /v1/bulk-consume` - Consume one chunk; mints or advances the
//!   position token returned in `X-CM-WELL-POSITION`
//! - `GET /v1/create-consumer` - Mint an initial position token without
//!   consuming
//! - `GET /v1/health` - Health check
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use cmwell_consume_httpd::{build_router, AppState, ConsumeConfig};
//! use cmwell_consume_service::MemoryIndex;
//!
//! let state = AppState::with_memory_index(ConsumeConfig::default(), Arc::new(MemoryIndex::new()));
//! let router = build_router(Arc::new(state));
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

pub use config::Args;
pub use error::{Result, ServerError};
pub use routes::consume::{HEADER_N, HEADER_POSITION, HEADER_TO};
pub use routes::build_router;
pub use state::{AppState, ConsumeConfig};
