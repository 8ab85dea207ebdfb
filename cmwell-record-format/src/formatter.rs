//! Per-record formatters and the factory that builds them per request.

use bytes::Bytes;

use cmwell_search_protocol::IndexedRecord;

use crate::selector::OutputFormat;

/// Converts one record into its response-body bytes (including the
/// trailing newline).
pub trait RecordFormatter: Send + Sync {
    fn format_record(&self, record: &IndexedRecord) -> Bytes;
}

/// Builds a formatter for one request.
pub struct FormatterFactory;

impl FormatterFactory {
    /// `host` is the advertised authority used to mint subject IRIs;
    /// `with_data` controls whether resolved payloads are emitted.
    pub fn create(
        format: &OutputFormat,
        host: &str,
        with_data: bool,
    ) -> Box<dyn RecordFormatter> {
        match format {
            OutputFormat::Text | OutputFormat::Path => Box::new(PathLines),
            OutputFormat::Tsv => Box::new(TsvLines),
            OutputFormat::NTriples => Box::new(TripleLines {
                host: host.to_string(),
                graph: None,
                with_data,
            }),
            OutputFormat::NQuads => Box::new(TripleLines {
                host: host.to_string(),
                graph: Some(format!("<http://{host}>")),
                with_data,
            }),
            OutputFormat::Json(_) => Box::new(JsonLines { with_data }),
        }
    }
}

/// Keep all versions of one subject adjacent. Uses a stable sort so the
/// relative order of a subject's versions is preserved; cross-subject
/// order is unspecified anyway.
pub fn group_by_subject(mut records: Vec<IndexedRecord>) -> Vec<IndexedRecord> {
    records.sort_by(|a, b| a.path.cmp(&b.path));
    records
}

struct PathLines;

impl RecordFormatter for PathLines {
    fn format_record(&self, record: &IndexedRecord) -> Bytes {
        Bytes::from(format!("{}\n", record.path))
    }
}

struct TsvLines;

impl RecordFormatter for TsvLines {
    fn format_record(&self, record: &IndexedRecord) -> Bytes {
        let last_modified = record
            .last_modified
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        let index_time = record
            .index_time
            .map(|t| t.to_string())
            .unwrap_or_default();
        Bytes::from(format!(
            "{}\t{}\t{}\t{}\n",
            record.path, last_modified, record.uuid, index_time
        ))
    }
}

struct TripleLines {
    host: String,
    /// Fourth term for quads, absent for triples.
    graph: Option<String>,
    with_data: bool,
}

impl TripleLines {
    fn line(&self, subject: &str, predicate: &str, object: &str) -> String {
        match &self.graph {
            Some(graph) => format!("{subject} {predicate} {object} {graph} .\n"),
            None => format!("{subject} {predicate} {object} .\n"),
        }
    }
}

impl RecordFormatter for TripleLines {
    fn format_record(&self, record: &IndexedRecord) -> Bytes {
        let subject = format!("<http://{}{}>", self.host, record.path);
        let mut out = String::new();

        out.push_str(&self.line(
            &subject,
            "<cmwell://meta.sys#uuid>",
            &literal(&record.uuid),
        ));
        if let Some(t) = record.index_time {
            out.push_str(&self.line(
                &subject,
                "<cmwell://meta.sys#indexTime>",
                &format!(
                    "\"{t}\"^^<http://www.w3.org/2001/XMLSchema#long>"
                ),
            ));
        }
        for (field, values) in &record.fields {
            let predicate = format!("<cmwell://meta.nir#{field}>");
            for value in values {
                out.push_str(&self.line(&subject, &predicate, &literal(value)));
            }
        }
        if self.with_data {
            if let Some(payload) = &record.payload {
                out.push_str(&self.line(
                    &subject,
                    "<cmwell://meta.sys#data>",
                    &literal(payload),
                ));
            }
        }

        Bytes::from(out)
    }
}

struct JsonLines {
    with_data: bool,
}

impl RecordFormatter for JsonLines {
    fn format_record(&self, record: &IndexedRecord) -> Bytes {
        let mut record = record.clone();
        if !self.with_data {
            record.payload = None;
        }
        let mut line = serde_json::to_string(&record)
            .unwrap_or_else(|_| "{}".to_string());
        line.push('\n');
        Bytes::from(line)
    }
}

fn literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('"');
    for c in value.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(c),
        }
    }
    escaped.push('"');
    escaped
}
