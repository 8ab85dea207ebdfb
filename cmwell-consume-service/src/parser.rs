//! Default `qp` field-filter parser with field-name resolution.

use std::collections::HashMap;

use async_trait::async_trait;

use cmwell_search_protocol::qp::parse_qp;
use cmwell_search_protocol::FieldFilter;

use crate::error::{Result, ServiceError};
use crate::scroll::FieldFilterParser;

/// Parses `qp` expressions and resolves field names through an alias
/// table (the stand-in for a field-types cache: user-facing names map to
/// the names the index stores).
#[derive(Debug, Default)]
pub struct QpFieldFilterParser {
    aliases: HashMap<String, String>,
}

impl QpFieldFilterParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alias(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.aliases.insert(from.into(), to.into());
        self
    }

    fn resolve(&self, filter: FieldFilter) -> FieldFilter {
        match filter {
            FieldFilter::Single {
                op,
                field,
                comparator,
                value,
            } => {
                let field = self.aliases.get(&field).cloned().unwrap_or(field);
                FieldFilter::Single {
                    op,
                    field,
                    comparator,
                    value,
                }
            }
            FieldFilter::Multi { op, filters } => FieldFilter::Multi {
                op,
                filters: filters.into_iter().map(|f| self.resolve(f)).collect(),
            },
        }
    }
}

#[async_trait]
impl FieldFilterParser for QpFieldFilterParser {
    async fn parse(&self, qp: &str) -> Result<FieldFilter> {
        let filter = parse_qp(qp).map_err(|e| ServiceError::invalid_filter(e.to_string()))?;
        Ok(self.resolve(filter))
    }
}
