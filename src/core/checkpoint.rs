//! 检查点：按运行 ID 保存 / 恢复完整会话状态
//!
//! - InMemoryCheckpointStore：进程内的不透明 JSON 数据块
//! - FileCheckpointStore：`<dir>/<run_id>.json`，外层信封附保存时间

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::core::SessionState;

pub trait CheckpointStore: Send + Sync {
    fn save(&self, run_id: &str, state: &SessionState) -> anyhow::Result<()>;

    /// 不存在时返回 None
    fn load(&self, run_id: &str) -> anyhow::Result<Option<SessionState>>;
}

#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CheckpointStore for InMemoryCheckpointStore {
    fn save(&self, run_id: &str, state: &SessionState) -> anyhow::Result<()> {
        let blob = serde_json::to_vec(state)?;
        self.blobs
            .lock()
            .map_err(|e| anyhow::anyhow!("checkpoint lock poisoned: {e}"))?
            .insert(run_id.to_string(), blob);
        Ok(())
    }

    fn load(&self, run_id: &str) -> anyhow::Result<Option<SessionState>> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|e| anyhow::anyhow!("checkpoint lock poisoned: {e}"))?;
        match blobs.get(run_id) {
            Some(blob) => Ok(Some(serde_json::from_slice(blob)?)),
            None => Ok(None),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    run_id: String,
    /// RFC 3339
    saved_at: String,
    state: SessionState,
}

/// 文件检查点：目录不存在时自动创建
#[derive(Debug)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, run_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", run_id))
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn save(&self, run_id: &str, state: &SessionState) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let envelope = Envelope {
            run_id: run_id.to_string(),
            saved_at: chrono::Utc::now().to_rfc3339(),
            state: state.clone(),
        };
        std::fs::write(self.path_for(run_id), serde_json::to_string_pretty(&envelope)?)?;
        Ok(())
    }

    fn load(&self, run_id: &str) -> anyhow::Result<Option<SessionState>> {
        let path = self.path_for(run_id);
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&path)?;
        let envelope: Envelope = serde_json::from_str(&data)?;
        Ok(Some(envelope.state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::react::{Action, Plan};

    fn state() -> SessionState {
        let mut state = SessionState::new("fever and cough");
        state.plan = Some(Plan::new(vec!["a".into(), "b".into()], "r"));
        state.push_final_answer(Action::final_answer("Pneumonia"));
        state.steps = 3;
        state
    }

    #[test]
    fn test_in_memory_round_trip() {
        let store = InMemoryCheckpointStore::new();
        store.save("run-1", &state()).unwrap();
        assert_eq!(store.load("run-1").unwrap(), Some(state()));
        assert_eq!(store.load("missing").unwrap(), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_file_store_writes_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path().join("checkpoints"));
        store.save("run-1", &state()).unwrap();

        let raw = std::fs::read_to_string(store.path_for("run-1")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["run_id"], "run-1");
        assert!(value["saved_at"].is_string());

        assert_eq!(store.load("run-1").unwrap(), Some(state()));
        assert_eq!(store.load("run-2").unwrap(), None);
    }
}
