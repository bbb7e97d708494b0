//! Room snapshot persistence.
//!
//! A snapshot is keyed by `(room, window)` and holds the room's state at the
//! end of that window. The transport boundary rewrites the previous window's
//! snapshots in place; the next window then starts from them.
//!
//! [`DirectoryStore`] lays snapshots out as
//! `<root>/room{NN}_c{WWWW}/restart.bin`, bincode-encoded with a format
//! version header.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use roomair_logic::topology::RoomId;
use roomair_logic::transport::RoomSnapshot;

use crate::error::{EngineError, EngineResult};

/// Version of the on-disk snapshot format (increment when it changes).
const SNAPSHOT_VERSION: u32 = 1;

const SNAPSHOT_FILE: &str = "restart.bin";

pub trait SnapshotStore: Send {
    fn save(&mut self, snapshot: &RoomSnapshot) -> EngineResult<()>;

    fn load(&self, room: RoomId, window: usize) -> EngineResult<RoomSnapshot>;

    fn contains(&self, room: RoomId, window: usize) -> bool;

    /// Save a whole window, e.g. after the barrier or after transport.
    fn save_all(&mut self, snapshots: &[RoomSnapshot]) -> EngineResult<()> {
        for snapshot in snapshots {
            self.save(snapshot)?;
        }
        Ok(())
    }

    /// Load rooms `1..=nroom` of a window, in room order.
    fn load_window(&self, nroom: usize, window: usize) -> EngineResult<Vec<RoomSnapshot>> {
        (1..=nroom).map(|room| self.load(room, window)).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    snapshots: BTreeMap<(RoomId, usize), RoomSnapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl SnapshotStore for MemoryStore {
    fn save(&mut self, snapshot: &RoomSnapshot) -> EngineResult<()> {
        self.snapshots
            .insert((snapshot.room, snapshot.window), snapshot.clone());
        Ok(())
    }

    fn load(&self, room: RoomId, window: usize) -> EngineResult<RoomSnapshot> {
        self.snapshots
            .get(&(room, window))
            .cloned()
            .ok_or(EngineError::MissingSnapshot { room, window })
    }

    fn contains(&self, room: RoomId, window: usize) -> bool {
        self.snapshots.contains_key(&(room, window))
    }
}

#[derive(Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    snapshot: RoomSnapshot,
}

/// Snapshots as files under a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Use `root`, creating it if needed.
    pub fn open(root: impl Into<PathBuf>) -> EngineResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of one room's snapshot for one window.
    pub fn snapshot_dir(&self, room: RoomId, window: usize) -> PathBuf {
        self.root.join(format!("room{:02}_c{:04}", room, window))
    }

    pub fn snapshot_path(&self, room: RoomId, window: usize) -> PathBuf {
        self.snapshot_dir(room, window).join(SNAPSHOT_FILE)
    }
}

impl SnapshotStore for DirectoryStore {
    fn save(&mut self, snapshot: &RoomSnapshot) -> EngineResult<()> {
        let dir = self.snapshot_dir(snapshot.room, snapshot.window);
        fs::create_dir_all(&dir)?;
        let file = fs::File::create(dir.join(SNAPSHOT_FILE))?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(
            &mut writer,
            &SnapshotFile {
                version: SNAPSHOT_VERSION,
                snapshot: snapshot.clone(),
            },
        )?;
        writer.flush()?;
        Ok(())
    }

    fn load(&self, room: RoomId, window: usize) -> EngineResult<RoomSnapshot> {
        let path = self.snapshot_path(room, window);
        if !path.exists() {
            return Err(EngineError::MissingSnapshot { room, window });
        }
        let reader = BufReader::new(fs::File::open(path)?);
        let file: SnapshotFile = bincode::deserialize_from(reader)?;
        if file.version != SNAPSHOT_VERSION {
            return Err(EngineError::SnapshotVersion {
                expected: SNAPSHOT_VERSION,
                found: file.version,
            });
        }
        Ok(file.snapshot)
    }

    fn contains(&self, room: RoomId, window: usize) -> bool {
        self.snapshot_path(room, window).exists()
    }
}

/// Write every stored snapshot of a room, window by window, as a JSON array.
///
/// Stops at the first window with no snapshot.
pub fn export_room_history<W: Write>(
    store: &dyn SnapshotStore,
    room: RoomId,
    writer: W,
) -> EngineResult<usize> {
    let mut history = Vec::new();
    let mut window = 0;
    while store.contains(room, window) {
        history.push(store.load(room, window)?);
        window += 1;
    }
    serde_json::to_writer_pretty(writer, &history)?;
    Ok(history.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomair_logic::transport::SpeciesState;

    fn snapshot(room: RoomId, window: usize, o3: f64) -> RoomSnapshot {
        let mut state = SpeciesState::new();
        state.insert("O3".into(), o3);
        state.insert("J4".into(), 1e-5);
        RoomSnapshot::new(room, window, state)
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new();
        store.save_all(&[snapshot(1, 0, 1.0), snapshot(2, 0, 2.0)]).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.load(2, 0).unwrap().get("O3"), 2.0);
        assert!(matches!(
            store.load(3, 0),
            Err(EngineError::MissingSnapshot { room: 3, window: 0 })
        ));
        let window = store.load_window(2, 0).unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].room, 1);
    }

    #[test]
    fn test_directory_layout_and_overwrite() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut store = DirectoryStore::open(dir.path().join("output")).unwrap();
        store.save(&snapshot(3, 12, 5.0)).unwrap();
        assert!(dir.path().join("output/room03_c0012/restart.bin").exists());

        store.save(&snapshot(3, 12, 6.0)).unwrap();
        assert_eq!(store.load(3, 12).unwrap(), snapshot(3, 12, 6.0));
        assert!(store.contains(3, 12));
        assert!(!store.contains(3, 13));
    }

    #[test]
    fn test_directory_missing_snapshot() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = DirectoryStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.load(1, 0),
            Err(EngineError::MissingSnapshot { room: 1, window: 0 })
        ));
    }

    #[test]
    fn test_directory_rejects_other_version() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = DirectoryStore::open(dir.path()).unwrap();
        fs::create_dir_all(store.snapshot_dir(1, 0)).unwrap();
        let bytes = bincode::serialize(&SnapshotFile {
            version: SNAPSHOT_VERSION + 1,
            snapshot: snapshot(1, 0, 1.0),
        })
        .unwrap();
        fs::write(store.snapshot_path(1, 0), bytes).unwrap();
        assert!(matches!(
            store.load(1, 0),
            Err(EngineError::SnapshotVersion { found: 2, .. })
        ));
    }

    #[test]
    fn test_history_export() {
        let mut store = MemoryStore::new();
        for w in 0..3 {
            store.save(&snapshot(1, w, w as f64)).unwrap();
        }
        let mut out = Vec::new();
        let n = export_room_history(&store, 1, &mut out).unwrap();
        assert_eq!(n, 3);
        let parsed: Vec<RoomSnapshot> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed[2].get("O3"), 2.0);
        assert_eq!(parsed[1].window, 1);
    }
}
