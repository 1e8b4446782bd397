//! Shard table and peer list, persisted as two JSON files and guarded by a
//! single exclusive lock -- a hot, short-critical-section lock with no
//! `.await` ever held across it, hence `parking_lot` rather than the async
//! mutex the rest of the workspace reaches for.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{RouterError, RouterResult};
use crate::types::{Peer, Shard};

struct State {
    peers: Vec<Peer>,
    shards: Vec<Shard>,
}

pub struct MetaStore {
    peers_path: PathBuf,
    shards_path: PathBuf,
    state: Mutex<State>,
}

impl MetaStore {
    pub fn open(dir: impl AsRef<Path>) -> RouterResult<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let peers_path = dir.join("peers.json");
        let shards_path = dir.join("shards.json");

        let peers = read_json_or_default(&peers_path)?;
        let shards = read_json_or_default(&shards_path)?;

        Ok(Self { peers_path, shards_path, state: Mutex::new(State { peers, shards }) })
    }

    pub fn list_peers(&self) -> Vec<Peer> {
        self.state.lock().peers.clone()
    }

    pub fn save_peers(&self, peers: Vec<Peer>) -> RouterResult<()> {
        let mut state = self.state.lock();
        state.peers = peers;
        write_json(&self.peers_path, &state.peers)
    }

    /// Returns the current shard mapping. If none has ever been persisted,
    /// lazily initializes a single shard spanning the whole keyspace,
    /// populated with every currently-known peer address.
    pub fn list_shards(&self) -> RouterResult<Vec<Shard>> {
        let mut state = self.state.lock();
        if state.shards.is_empty() {
            let nodes = state.peers.iter().map(|p| p.address.clone()).collect();
            state.shards = vec![Shard {
                id: "shard-0".to_string(),
                min_key: String::new(),
                max_key: String::new(),
                nodes,
            }];
            write_json(&self.shards_path, &state.shards)?;
        }
        Ok(state.shards.clone())
    }

    pub fn save_shards(&self, shards: Vec<Shard>) -> RouterResult<()> {
        let mut state = self.state.lock();
        state.shards = shards;
        write_json(&self.shards_path, &state.shards)
    }

    pub fn route(&self, key: &str) -> RouterResult<Shard> {
        let shards = self.list_shards()?;
        shards
            .into_iter()
            .find(|shard| shard.contains(key))
            .ok_or(RouterError::NoShard)
    }

    /// Atomically replaces `shard_id` with two adjacent shards split at
    /// `split_key`, each inheriting the parent's node list. Data isn't
    /// moved -- only routing is partitioned.
    pub fn split(&self, shard_id: &str, split_key: &str) -> RouterResult<Vec<Shard>> {
        let mut state = self.state.lock();
        if state.shards.is_empty() {
            drop(state);
            self.list_shards()?;
            state = self.state.lock();
        }

        let index = state
            .shards
            .iter()
            .position(|s| s.id == shard_id)
            .ok_or_else(|| RouterError::UnknownShard(shard_id.to_string()))?;

        let parent = state.shards[index].clone();
        let below_min = parent.min_key.is_empty() || split_key >= parent.min_key.as_str();
        let above_max = parent.max_key.is_empty() || split_key < parent.max_key.as_str();
        if !(below_min && above_max) {
            return Err(RouterError::InvalidSplit(format!(
                "split_key {split_key} is not within [{}, {})",
                parent.min_key, parent.max_key
            )));
        }

        let a = Shard {
            id: format!("{shard_id}-a"),
            min_key: parent.min_key.clone(),
            max_key: split_key.to_string(),
            nodes: parent.nodes.clone(),
        };
        let b = Shard {
            id: format!("{shard_id}-b"),
            min_key: split_key.to_string(),
            max_key: parent.max_key.clone(),
            nodes: parent.nodes.clone(),
        };

        state.shards.splice(index..=index, [a, b]);
        write_json(&self.shards_path, &state.shards)?;
        Ok(state.shards.clone())
    }
}

fn read_json_or_default<T: serde::de::DeserializeOwned + Default>(path: &Path) -> RouterResult<T> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(err) => Err(err.into()),
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> RouterResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MetaStore {
        MetaStore::open(tempfile::tempdir().unwrap().into_path()).unwrap()
    }

    #[test]
    fn lazily_initializes_a_single_covering_shard() {
        let store = store();
        store
            .save_peers(vec![Peer { id: "n1".into(), address: "127.0.0.1:9001".into() }])
            .unwrap();

        let shards = store.list_shards().unwrap();
        assert_eq!(shards.len(), 1);
        assert_eq!(shards[0].min_key, "");
        assert_eq!(shards[0].max_key, "");
        assert_eq!(shards[0].nodes, vec!["127.0.0.1:9001".to_string()]);
    }

    #[test]
    fn route_finds_the_unique_covering_shard() {
        let store = store();
        store.list_shards().unwrap();
        let shard = store.route("anything").unwrap();
        assert_eq!(shard.id, "shard-0");
    }

    #[test]
    fn split_produces_two_adjacent_shards_inheriting_nodes() {
        let store = store();
        store
            .save_peers(vec![Peer { id: "n1".into(), address: "127.0.0.1:9001".into() }])
            .unwrap();
        store.list_shards().unwrap();

        let shards = store.split("shard-0", "m").unwrap();
        assert_eq!(shards.len(), 2);
        assert_eq!(shards[0].max_key, "m");
        assert_eq!(shards[1].min_key, "m");
        assert!(shards.iter().all(|s| s.nodes == vec!["127.0.0.1:9001".to_string()]));

        assert_eq!(store.route("a").unwrap().id, "shard-0-a");
        assert_eq!(store.route("z").unwrap().id, "shard-0-b");
    }

    #[test]
    fn split_rejects_a_key_outside_the_target_range() {
        let store = store();
        store.list_shards().unwrap();
        store.split("shard-0", "m").unwrap();

        assert!(store.split("shard-0-a", "z").is_err());
    }
}
