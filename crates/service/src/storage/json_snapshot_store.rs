use std::{collections::BTreeMap, marker::PhantomData, path::PathBuf};
use tokio::{fs, sync::Mutex};
use tracing::warn;

use crate::errors::ServiceError;

/// The full mapping of record ids to records at a point in time.
pub type Snapshot<V> = BTreeMap<u64, V>;

/// JSON file-backed snapshot store keyed by `u64`.
///
/// The whole mapping is read and written in one piece; there is no cache
/// between requests, the file is the single source of truth. On disk the
/// keys are decimal strings (JSON object keys must be text) and `load`
/// parses them back to integers.
///
/// `save` holds the store's write mutex for the duration of the write, so
/// two saves never interleave and each save fully replaces the file.
/// `load` takes no lock: a mutation that loads while another save is in
/// flight can base its own save on a stale snapshot, and the last save wins.
pub struct JsonSnapshotStore<V> {
    file_path: PathBuf,
    write_lock: Mutex<()>,
    _value: PhantomData<fn() -> V>,
}

/// Integer keys to decimal-string keys, pretty-printed.
fn encode<V: serde::Serialize>(snapshot: &Snapshot<V>) -> serde_json::Result<Vec<u8>> {
    let text_keyed: BTreeMap<String, &V> =
        snapshot.iter().map(|(id, record)| (id.to_string(), record)).collect();
    serde_json::to_vec_pretty(&text_keyed)
}

/// Decimal-string keys back to integer keys. Any key that does not parse as
/// an integer makes the whole file malformed and yields `None`.
fn decode<V: serde::de::DeserializeOwned>(bytes: &[u8]) -> Option<Snapshot<V>> {
    let text_keyed: BTreeMap<String, V> = serde_json::from_slice(bytes).ok()?;
    let mut snapshot = Snapshot::new();
    for (key, record) in text_keyed {
        snapshot.insert(key.parse::<u64>().ok()?, record);
    }
    Some(snapshot)
}

impl<V> JsonSnapshotStore<V>
where
    V: serde::Serialize + serde::de::DeserializeOwned,
{
    /// Create a store over the given file path. The file itself is only
    /// touched by `load`/`save`; a missing file reads as an empty snapshot.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        let file_path = path.into();
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        Self { file_path, write_lock: Mutex::new(()), _value: PhantomData }
    }

    /// Read the full snapshot from disk. A missing or malformed file is the
    /// empty snapshot, not an error.
    pub async fn load(&self) -> Snapshot<V> {
        match fs::read(&self.file_path).await {
            Ok(bytes) => match decode(&bytes) {
                Some(snapshot) => snapshot,
                None => {
                    warn!(path = %self.file_path.display(), "snapshot file malformed, starting from an empty snapshot");
                    Snapshot::new()
                }
            },
            Err(_) => Snapshot::new(),
        }
    }

    /// Replace the file contents with the given snapshot, under the write
    /// mutex. Serialization or I/O failure surfaces as `Storage`.
    pub async fn save(&self, snapshot: &Snapshot<V>) -> Result<(), ServiceError> {
        let _guard = self.write_lock.lock().await;
        let data = encode(snapshot).map_err(|e| ServiceError::Storage(e.to_string()))?;
        fs::write(&self.file_path, data)
            .await
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        Ok(())
    }
}
