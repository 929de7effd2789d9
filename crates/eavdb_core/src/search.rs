//! Paged search with a total count.

use crate::criteria::{Criteria, OrderBy};
use crate::error::{StoreError, StoreResult};
use crate::query::{compile, CompiledQuery};
use crate::types::{ObjectHeader, Stamp};
use eavdb_codec::Precision;
use eavdb_storage::Connection;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One page of matching headers and the number of matches overall.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchResult {
    /// Headers in the requested order, at most `take` of them.
    pub headers: Vec<ObjectHeader>,
    /// Number of matches ignoring the window.
    pub total_count: i64,
}

/// Validates the window and compiles the query. Issues nothing.
pub(crate) fn prepare(
    type_name: &str,
    criteria: Option<&Criteria>,
    order: Option<&OrderBy>,
    skip: i64,
    take: i64,
    precision: Precision,
) -> StoreResult<CompiledQuery> {
    if skip < 0 {
        return Err(StoreError::invalid_argument(format!("skip must not be negative, got {skip}")));
    }
    if take < 0 {
        return Err(StoreError::invalid_argument(format!("take must not be negative, got {take}")));
    }
    compile(criteria, order, type_name, precision)
}

/// Runs a prepared search. Callers hold one bracket around both queries.
pub(crate) fn execute(conn: &mut dyn Connection, query: &CompiledQuery, skip: i64, take: i64) -> StoreResult<SearchResult> {
    let total_count = conn
        .query_scalar(&query.count_command())?
        .and_then(|v| v.as_i64())
        .unwrap_or(0);

    let mut headers = Vec::new();
    if take > 0 && skip < total_count {
        for row in conn.query(&query.page_command(skip, take))? {
            headers.push(ObjectHeader {
                id: row.get_i64(0)?,
                type_name: row.get_str(1)?.to_string(),
                name: row.get_str(2)?.to_string(),
                stamp: Stamp::new(row.get_i64(3)?),
            });
        }
    }
    debug!(count = headers.len(), total_count, skip, take, "search executed");
    Ok(SearchResult { headers, total_count })
}
