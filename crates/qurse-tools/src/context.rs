use std::sync::{Arc, Mutex};

use qurse_models::{Geolocation, SourceRecord};

/// Request-scoped accumulator bridging tool execution output to the
/// completion handler.
///
/// Tools run inside the provider's tool-calling loop and their raw output is
/// not always surfaced cleanly on the completion event, so each execution
/// records its mapped source records here. One session per request; never
/// shared across requests.
#[derive(Clone, Default)]
pub struct SearchSession {
    inner: Arc<Mutex<Vec<SourceRecord>>>,
}

impl SearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sources(&self, records: Vec<SourceRecord>) {
        let mut sources = self.inner.lock().expect("search session lock poisoned");
        sources.extend(records);
    }

    pub fn sources(&self) -> Vec<SourceRecord> {
        self.inner
            .lock()
            .expect("search session lock poisoned")
            .clone()
    }
}

/// Tool execution context
///
/// Carries the per-request search session, the caller's geolocation for the
/// utility tools, and the query/result caps from the active tool budget.
#[derive(Clone, Default)]
pub struct ToolContext {
    pub session: SearchSession,
    pub geolocation: Option<Geolocation>,
    pub max_queries: Option<usize>,
    pub max_results: Option<usize>,
}

impl ToolContext {
    pub fn new(session: SearchSession) -> Self {
        Self {
            session,
            geolocation: None,
            max_queries: None,
            max_results: None,
        }
    }

    pub fn with_geolocation(mut self, geolocation: Option<Geolocation>) -> Self {
        self.geolocation = geolocation;
        self
    }

    pub fn with_query_caps(mut self, max_queries: Option<usize>, max_results: Option<usize>) -> Self {
        self.max_queries = max_queries;
        self.max_results = max_results;
        self
    }
}
