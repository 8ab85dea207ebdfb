//! Output format selection.

use thiserror::Error;

/// A requested format that cannot be streamed.
#[derive(Debug, Error)]
#[error("requested format ({name}) is invalid for as streamable response.")]
pub struct FormatError {
    pub name: String,
}

/// Streamable output formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Path,
    Tsv,
    NTriples,
    NQuads,
    /// Any selector beginning with `json`; the original selector is kept
    /// for logging.
    Json(String),
}

impl OutputFormat {
    /// Parse a format selector. Unknown selectors are rejected with the
    /// client-facing message.
    pub fn parse(name: &str) -> Result<OutputFormat, FormatError> {
        match name {
            "text" => Ok(OutputFormat::Text),
            "path" => Ok(OutputFormat::Path),
            "tsv" | "tab" => Ok(OutputFormat::Tsv),
            "nt" | "ntriples" => Ok(OutputFormat::NTriples),
            "nq" | "nquads" => Ok(OutputFormat::NQuads),
            _ if name.starts_with("json") => Ok(OutputFormat::Json(name.to_string())),
            _ => Err(FormatError {
                name: name.to_string(),
            }),
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Text | OutputFormat::Path => "text/plain; charset=utf-8",
            OutputFormat::Tsv => "text/tab-separated-values; charset=utf-8",
            OutputFormat::NTriples => "application/n-triples",
            OutputFormat::NQuads => "application/n-quads",
            OutputFormat::Json(_) => "application/x-ndjson",
        }
    }

    /// Triple-producing formats must keep all triples of one subject
    /// together when a chunk can carry several versions of it.
    pub fn requires_subject_grouping(&self, with_history: bool) -> bool {
        with_history && matches!(self, OutputFormat::NTriples | OutputFormat::NQuads)
    }
}
