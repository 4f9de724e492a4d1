//! Test history boundary.
//!
//! Storage lives outside this crate; [`HistoryRecorder`] is the contract. Recording is
//! append-only and entries are listed most recent first, ordered by the timestamp assigned at
//! record time (a per-recorder sequence number breaks ties).

use crate::error::HistoryError;
use crate::model::{ResolvedRequest, TestResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub api_id: String,
    pub recorded_at: DateTime<Utc>,
    #[serde(default)]
    pub sequence: u64,
    pub request: ResolvedRequest,
    pub result: TestResult,
}

impl HistoryEntry {
    /// Stamp a new entry with the current time.
    #[must_use]
    pub fn new(api_id: &str, request: &ResolvedRequest, result: &TestResult, sequence: u64) -> Self {
        Self {
            api_id: api_id.to_string(),
            recorded_at: Utc::now(),
            sequence,
            request: request.clone(),
            result: result.clone(),
        }
    }
}

/// Most recent first.
pub fn sort_most_recent_first(entries: &mut [HistoryEntry]) {
    entries.sort_by(|a, b| {
        b.recorded_at
            .cmp(&a.recorded_at)
            .then_with(|| b.sequence.cmp(&a.sequence))
    });
}

#[async_trait]
pub trait HistoryRecorder: Send + Sync {
    /// Append one executed test. Never mutates or removes earlier entries.
    async fn record(
        &self,
        api_id: &str,
        request: &ResolvedRequest,
        result: &TestResult,
    ) -> Result<(), HistoryError>;

    /// All entries for one API, most recent first.
    async fn entries_by_api(&self, api_id: &str) -> Result<Vec<HistoryEntry>, HistoryError>;

    /// Results for one API, most recent first.
    async fn list_by_api(&self, api_id: &str) -> Result<Vec<TestResult>, HistoryError> {
        Ok(self
            .entries_by_api(api_id)
            .await?
            .into_iter()
            .map(|e| e.result)
            .collect())
    }
}

/// Process-local history, mostly useful for tests and short-lived tools.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    entries: RwLock<HashMap<String, Vec<HistoryEntry>>>,
    sequence: AtomicU64,
}

impl InMemoryHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl HistoryRecorder for InMemoryHistory {
    async fn record(
        &self,
        api_id: &str,
        request: &ResolvedRequest,
        result: &TestResult,
    ) -> Result<(), HistoryError> {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let entry = HistoryEntry::new(api_id, request, result, sequence);
        self.entries
            .write()
            .entry(api_id.to_string())
            .or_default()
            .push(entry);
        Ok(())
    }

    async fn entries_by_api(&self, api_id: &str) -> Result<Vec<HistoryEntry>, HistoryError> {
        let mut entries = self.entries.read().get(api_id).cloned().unwrap_or_default();
        sort_most_recent_first(&mut entries);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;
    use std::sync::Arc;

    fn sample(status: u16) -> (ResolvedRequest, TestResult) {
        let req = ResolvedRequest::new(Method::GET, format!("http://h.test/{status}"));
        let mut result = TestResult::failure(&req, 5, "x");
        result.success = true;
        result.status = status;
        result.error = None;
        (req, result)
    }

    #[tokio::test]
    async fn lists_most_recent_first_per_api() {
        let history = InMemoryHistory::new();
        for status in [200, 201, 202] {
            let (req, res) = sample(status);
            history.record("a", &req, &res).await.expect("record");
        }
        let (req, res) = sample(500);
        history.record("b", &req, &res).await.expect("record");

        let a = history.list_by_api("a").await.expect("list");
        let statuses: Vec<u16> = a.iter().map(|r| r.status).collect();
        assert_eq!(statuses, vec![202, 201, 200]);

        let b = history.entries_by_api("b").await.expect("list");
        assert_eq!(b.len(), 1);
        assert_eq!(b[0].api_id, "b");
        assert_eq!(b[0].request.url, "http://h.test/500");

        assert!(history.list_by_api("missing").await.expect("list").is_empty());
        assert_eq!(history.len(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_records_all_land() {
        let history = Arc::new(InMemoryHistory::new());
        let mut handles = Vec::new();
        for i in 0..32u16 {
            let history = Arc::clone(&history);
            handles.push(tokio::spawn(async move {
                let api = if i % 2 == 0 { "even" } else { "odd" };
                let (req, res) = sample(200 + i);
                history.record(api, &req, &res).await.expect("record");
            }));
        }
        for h in handles {
            h.await.expect("join");
        }

        let even = history.entries_by_api("even").await.expect("list");
        let odd = history.entries_by_api("odd").await.expect("list");
        assert_eq!(even.len(), 16);
        assert_eq!(odd.len(), 16);
        assert!(even.windows(2).all(|w| (w[0].recorded_at, w[0].sequence)
            >= (w[1].recorded_at, w[1].sequence)));
    }
}
