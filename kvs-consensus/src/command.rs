//! Wire form of a consensus log entry. This is the payload the replicated
//! log carries and delivers to [`crate::fsm::CommandFsm::apply`] -- distinct
//! from the client-facing RPC protocol.

use kvs_hlc::Timestamp;
use kvs_store::Tx;
use serde_derive::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Command {
    Write { key: Vec<u8>, value: Vec<u8>, tx_id: Tx, ts: Timestamp },
    Commit { tx_id: Tx },
    Abort { tx_id: Tx },
}

impl Command {
    pub fn encode(&self) -> Vec<u8> {
        bincode::serialize(self).expect("Command serialization is infallible")
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn roundtrips_through_bincode() {
        let cmd = Command::Write {
            key: b"k".to_vec(),
            value: b"v".to_vec(),
            tx_id: Uuid::new_v4(),
            ts: kvs_hlc::Clock::new().now(),
        };
        let bytes = cmd.encode();
        assert_eq!(Command::decode(&bytes).unwrap(), cmd);
    }
}
