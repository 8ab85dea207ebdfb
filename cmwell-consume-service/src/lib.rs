//! Bulk consume coordination for an append-mostly indexed corpus.
//!
//! This crate implements the parts of the coordinator that are independent
//! of HTTP framing:
//!
//! - [`BulkConsumeState`] and its opaque position-token codec
//! - [`RangeFinder`]: the adaptive seed → expand → binary-shrink discovery
//!   of a `[from, to)` interval on the `indexTime` axis whose record count
//!   lands near a client-supplied target
//! - [`Deadline`]: the one-shot discovery budget the finder polls between
//!   probes
//! - The collaborator traits the dispatcher is constructed with
//!   ([`ThinSearch`], [`RecordSource`], [`RecordBodyResolver`],
//!   [`FieldFilterParser`])
//! - [`MemoryIndex`]: an in-memory backend implementing the collaborator
//!   traits, used by the demo binary and deterministic tests
//!
//! # Architecture
//!
//! Probes are issued strictly sequentially: each probe's result decides the
//! next interval. Nothing here holds locks across suspension points and no
//! state is shared between requests; a request carries its own
//! [`Deadline`] and its own cursor.

pub mod cursor;
pub mod deadline;
pub mod error;
pub mod finder;
pub mod memory;
pub mod parser;
pub mod probe;
pub mod scroll;

pub use cursor::{BulkConsumeState, CursorError};
pub use deadline::Deadline;
pub use error::{Result, ServiceError};
pub use finder::{settled_now, CurrRange, RangeFinder};
pub use memory::MemoryIndex;
pub use parser::QpFieldFilterParser;
pub use probe::{Prober, ThinSearch, SEED_PROBE_OFFSET};
pub use scroll::{resolved_stream, FieldFilterParser, RecordBodyResolver, RecordSource, RecordStream};
