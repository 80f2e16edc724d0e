use serde_json::Value;

use qurse_models::sources::{record_from_raw, scan_for_source_arrays};
use qurse_models::SourceRecord;
use qurse_tools::SearchSession;

/// Collect the sources for a finished tool run. Priority order, first match
/// wins:
///
/// 1. the request-scoped search session populated by tool execution
/// 2. an explicit `sources` array on the raw completion response
/// 3. best-effort scan of the raw body for known result-array field names
pub(crate) fn collect_sources(session: &SearchSession, raw: Option<&Value>) -> Vec<SourceRecord> {
    let captured = session.sources();
    if !captured.is_empty() {
        return captured;
    }

    let Some(raw) = raw else {
        return Vec::new();
    };

    if let Some(items) = raw.get("sources").and_then(|v| v.as_array()) {
        let records: Vec<SourceRecord> = items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| record_from_raw(item, i))
            .collect();
        if !records.is_empty() {
            return records;
        }
    }

    scan_for_source_arrays(raw)
}
