use serde_derive::{Deserialize, Serialize};

/// `nodes[0]` is the preferred leader address for cross-shard coordination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shard {
    pub id: String,
    /// Empty denotes the unbounded lower end.
    pub min_key: String,
    /// Empty denotes the unbounded upper end.
    pub max_key: String,
    pub nodes: Vec<String>,
}

impl Shard {
    /// Half-open containment: `[min_key, max_key)`, with an empty bound
    /// meaning unbounded on that side.
    pub fn contains(&self, key: &str) -> bool {
        let above_min = self.min_key.is_empty() || key >= self.min_key.as_str();
        let below_max = self.max_key.is_empty() || key < self.max_key.as_str();
        above_min && below_max
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    pub id: String,
    pub address: String,
}
