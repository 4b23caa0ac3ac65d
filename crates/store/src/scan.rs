//! Paged, deduplicated prefix enumeration

use crate::error::{Result, StoreError};
use std::collections::HashSet;
use streamline_engine::LogEngine;

/// Enumerate keys under a prefix via a paged cursor scan.
///
/// The scan may revisit keys between pages, so results are deduplicated as
/// they accumulate. Stops when the cursor wraps to the origin or the
/// accumulated count reaches `max_keys`; in the latter case the result is a
/// partial, not-guaranteed-complete set. Ordering is unspecified.
pub(crate) async fn list_prefix<E: LogEngine>(
    engine: &E,
    prefix: &str,
    page_size: usize,
    max_keys: usize,
) -> Result<Vec<String>> {
    let mut keys = Vec::new();
    if prefix.is_empty() {
        return Ok(keys);
    }

    let mut seen = HashSet::new();
    let mut cursor = 0;
    loop {
        let page = engine
            .scan(cursor, prefix, page_size)
            .await
            .map_err(|e| StoreError::engine("scan", prefix, e))?;
        cursor = page.cursor;

        for key in page.keys {
            if seen.insert(key.clone()) {
                keys.push(key);
            }
        }

        if cursor == 0 || keys.len() >= max_keys {
            break;
        }
    }

    keys.truncate(max_keys);
    Ok(keys)
}
