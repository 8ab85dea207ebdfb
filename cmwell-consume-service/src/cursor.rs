//! The opaque position token.
//!
//! A cursor carries the full session state of an iteration: the next
//! starting `from`, an optional pre-resolved `to`, and the selection
//! criteria frozen at the first request. Clients hold it, never inspect
//! it, and hand it back unchanged; only the server mints new ones.
//!
//! The encoding is deterministic and URL-safe: a `v1:` version prefix over
//! a JSON payload, base64url without padding. It is not a security
//! boundary — it only has to fail loudly on corrupt or mismatched input
//! rather than misinterpret it.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use cmwell_search_protocol::{FieldFilter, IndexTime, PathFilter, ThinSearchParams};

/// Version prefix of the token plaintext. Bump when the payload shape
/// changes; decoding rejects anything else.
const CURSOR_VERSION: &str = "v1";

/// Failure to decode a position token.
#[derive(Debug, Error)]
pub enum CursorError {
    #[error("position is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("position payload is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("unsupported position version '{found}'")]
    UnsupportedVersion { found: String },

    #[error("malformed position payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("inconsistent position state: {message}")]
    State { message: String },
}

/// Session state carried by a position token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkConsumeState {
    pub from: IndexTime,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub to: Option<IndexTime>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub path: Option<String>,
    pub with_history: bool,
    pub with_deleted: bool,
    pub recursive: bool,
    pub chunk_size_hint: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub field_filter: Option<FieldFilter>,
}

impl BulkConsumeState {
    /// Encode as an opaque URL-safe token.
    pub fn encode(&self) -> String {
        let payload =
            serde_json::to_string(self).expect("cursor state serialization cannot fail");
        URL_SAFE_NO_PAD.encode(format!("{CURSOR_VERSION}:{payload}"))
    }

    /// Decode a token, validating the version tag and the state invariants.
    pub fn decode(token: &str) -> Result<Self, CursorError> {
        let plaintext = String::from_utf8(URL_SAFE_NO_PAD.decode(token)?)?;
        let (version, payload) = plaintext.split_once(':').ok_or_else(|| {
            CursorError::UnsupportedVersion {
                found: plaintext.chars().take(8).collect(),
            }
        })?;
        if version != CURSOR_VERSION {
            return Err(CursorError::UnsupportedVersion {
                found: version.to_string(),
            });
        }
        let state: BulkConsumeState = serde_json::from_str(payload)?;
        state.validate()?;
        Ok(state)
    }

    fn validate(&self) -> Result<(), CursorError> {
        if self.from < 0 {
            return Err(CursorError::State {
                message: format!("from must be non-negative, got {}", self.from),
            });
        }
        if let Some(to) = self.to {
            if to <= self.from {
                return Err(CursorError::State {
                    message: format!("to ({to}) must be greater than from ({})", self.from),
                });
            }
        }
        if self.chunk_size_hint == 0 {
            return Err(CursorError::State {
                message: "chunk size hint must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// The successor state after a chunk with resolved upper bound `to`:
    /// `from` advances to `to`, the optional `to` becomes the next-to
    /// hint, everything else is preserved.
    pub fn advanced(&self, to: IndexTime, next_to_hint: Option<IndexTime>) -> Self {
        Self {
            from: to,
            to: next_to_hint,
            ..self.clone()
        }
    }

    /// The same state with a different pre-resolved `to`.
    pub fn with_to(&self, to: Option<IndexTime>) -> Self {
        Self { to, ..self.clone() }
    }

    /// The selection criteria this session freezes, as thin-search params.
    pub fn thin_params(&self) -> ThinSearchParams {
        let path_filter = self
            .path
            .as_deref()
            .and_then(|p| PathFilter::normalized(p, self.recursive));
        ThinSearchParams::new(
            path_filter,
            self.field_filter.clone(),
            self.with_history,
            self.with_deleted,
        )
    }
}
