use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use chrono::Utc;
use tracing::warn;

use super::types::{RunRecord, RunStatus};
use crate::prompts::ComparisonRequest;

static COUNTER: AtomicUsize = AtomicUsize::new(1);

/// Ledger of comparison runs. Written to `path` as JSON after every change
/// when one is configured.
pub struct RunStore {
    path: Option<PathBuf>,
    runs: RwLock<HashMap<String, RunRecord>>,
}

impl RunStore {
    pub fn new(path: Option<PathBuf>) -> Self {
        let runs = path
            .clone()
            .and_then(Self::load_from_disk)
            .map(|records| records.into_iter().map(|r| (r.id.clone(), r)).collect())
            .unwrap_or_default();
        Self {
            path,
            runs: RwLock::new(runs),
        }
    }

    pub fn create(&self, request: &ComparisonRequest) -> RunRecord {
        let id = next_id();
        let record = RunRecord {
            id: id.clone(),
            ticker_a: request.ticker_a.clone(),
            ticker_b: request.ticker_b.clone(),
            period: request.period.clone(),
            status: RunStatus::Pending,
            summary: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        if let Ok(mut map) = self.runs.write() {
            map.insert(id, record.clone());
        }
        self.save_if_needed();
        record
    }

    pub fn update(
        &self,
        id: &str,
        status: RunStatus,
        summary: Option<String>,
        error: Option<String>,
    ) -> Option<RunRecord> {
        let mut updated = None;
        if let Ok(mut map) = self.runs.write() {
            if let Some(record) = map.get_mut(id) {
                record.status = status;
                if summary.is_some() {
                    record.summary = summary;
                }
                if error.is_some() {
                    record.error = error;
                }
                if status.is_terminal() {
                    record.completed_at = Some(Utc::now());
                }
                updated = Some(record.clone());
            }
        }
        self.save_if_needed();
        updated
    }

    pub fn get(&self, id: &str) -> Option<RunRecord> {
        let map = self.runs.read().ok()?;
        map.get(id).cloned()
    }

    /// Newest first.
    pub fn list(&self, limit: usize) -> Vec<RunRecord> {
        let map = match self.runs.read() {
            Ok(lock) => lock,
            Err(_) => return vec![],
        };
        let mut items: Vec<RunRecord> = map.values().cloned().collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        items.truncate(limit);
        items
    }

    fn save_if_needed(&self) {
        let path = match &self.path {
            Some(path) => path,
            None => return,
        };
        let map = match self.runs.read() {
            Ok(lock) => lock,
            Err(_) => return,
        };
        let list: Vec<&RunRecord> = map.values().collect();
        match serde_json::to_string_pretty(&list) {
            Ok(serialized) => {
                if let Err(err) = fs::write(path, serialized) {
                    warn!(path = %path.display(), error = %err, "could not persist run ledger");
                }
            }
            Err(err) => warn!(error = %err, "could not serialize run ledger"),
        }
    }

    pub fn load_from_disk(path: PathBuf) -> Option<Vec<RunRecord>> {
        let data = fs::read_to_string(path).ok()?;
        serde_json::from_str::<Vec<RunRecord>>(&data).ok()
    }
}

fn next_id() -> String {
    let count = COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("run_{}_{}", Utc::now().timestamp_millis(), count)
}
