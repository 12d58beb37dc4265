use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Utc;
use sentineldesk_common::config::DlqConfig;
use serde::Serialize;

/// One dead-lettered item: enough to reproduce and re-drive the failure
/// without re-running the whole node.
#[derive(Debug, Serialize)]
struct DlqEntry<'a> {
    node: &'a str,
    item_id: &'a str,
    error: &'a str,
    timestamp: chrono::DateTime<Utc>,
    payload: serde_json::Value,
}

/// Writes per-item failures to `<dlq_root>/<node>/<timestamp>_<item>.json`.
/// A counter suffix disambiguates two failures landing in the same
/// second for the same node.
pub struct Dlq {
    config: DlqConfig,
    counters: Mutex<HashMap<String, u32>>,
}

impl Dlq {
    pub fn new(config: DlqConfig) -> Self {
        Self { config, counters: Mutex::new(HashMap::new()) }
    }

    pub fn write(&self, node: &str, item_id: &str, error: &str, payload: serde_json::Value) {
        if !self.config.enabled {
            return;
        }

        let node_dir = self.config.dir.join(sanitize_filename(node));
        if let Err(e) = fs::create_dir_all(&node_dir) {
            tracing::error!(node, error = %e, "failed to create DLQ directory");
            return;
        }

        let now = Utc::now();
        let stamp = now.format("%Y%m%d_%H%M%S").to_string();
        let counter = self.next_counter(node, &stamp);

        let base = format!("{stamp}_{}", sanitize_filename(item_id));
        let filename = if counter == 0 { format!("{base}.json") } else { format!("{base}_{counter}.json") };
        let path: PathBuf = node_dir.join(filename);

        let entry = DlqEntry { node, item_id, error, timestamp: now, payload };
        match serde_json::to_vec_pretty(&entry) {
            Ok(bytes) => {
                if let Err(e) = fs::write(&path, bytes) {
                    tracing::error!(path = %path.display(), error = %e, "failed to write DLQ entry");
                }
            }
            Err(e) => tracing::error!(error = %e, "failed to serialize DLQ entry"),
        }
    }

    fn next_counter(&self, node: &str, stamp: &str) -> u32 {
        let key = format!("{node}:{stamp}");
        let mut counters = self.counters.lock().expect("dlq counters mutex poisoned");
        let slot = counters.entry(key).or_insert(0);
        let value = *slot;
        *slot += 1;
        value
    }
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '.' || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn disabled_dlq_writes_nothing() {
        let dir = tempdir().unwrap();
        let config = DlqConfig { enabled: false, dir: dir.path().to_path_buf() };
        let dlq = Dlq::new(config);
        dlq.write("p2_relevance", "item-1", "boom", serde_json::json!({}));
        assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn enabled_dlq_writes_one_file_per_item() {
        let dir = tempdir().unwrap();
        let config = DlqConfig { enabled: true, dir: dir.path().to_path_buf() };
        let dlq = Dlq::new(config);
        dlq.write("p2_relevance", "item-1", "boom", serde_json::json!({"a": 1}));

        let node_dir = dir.path().join("p2_relevance");
        let entries: Vec<_> = fs::read_dir(&node_dir).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn collisions_in_the_same_second_get_distinct_filenames() {
        let dir = tempdir().unwrap();
        let config = DlqConfig { enabled: true, dir: dir.path().to_path_buf() };
        let dlq = Dlq::new(config);
        dlq.write("p2_relevance", "item-1", "boom", serde_json::json!({}));
        dlq.write("p2_relevance", "item-1", "boom again", serde_json::json!({}));

        let node_dir = dir.path().join("p2_relevance");
        let entries: Vec<_> = fs::read_dir(&node_dir).unwrap().collect();
        assert_eq!(entries.len(), 2);
    }
}
