//! Keys used within the raw storage engine's namespace. Two families:
//! `Version(key, ts)` holds a single version record, and `TxnWrite(tx_id,
//! key, ts)` indexes every record a transaction produced, so Commit/Abort
//! can locate them without a full scan.

use crate::error::{CResult, Error};
use crate::keycode;
use kvs_hlc::Timestamp;
use uuid::Uuid;

const TAG_VERSION: u8 = 0x01;
const TAG_TXN_WRITE: u8 = 0x02;

pub enum Key {
    Version(Vec<u8>, Timestamp),
    TxnWrite(Uuid, Vec<u8>, Timestamp),
}

impl Key {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            Key::Version(key, ts) => {
                out.push(TAG_VERSION);
                keycode::encode_bytes(key, &mut out);
                out.extend_from_slice(ts.as_str().as_bytes());
            }
            Key::TxnWrite(tx_id, key, ts) => {
                out.push(TAG_TXN_WRITE);
                out.extend_from_slice(tx_id.as_bytes());
                keycode::encode_bytes(key, &mut out);
                out.extend_from_slice(ts.as_str().as_bytes());
            }
        }
        out
    }

    pub fn decode(bytes: &[u8]) -> CResult<Self> {
        let (&tag, rest) =
            bytes.split_first().ok_or_else(|| Error::Parse("empty engine key".into()))?;
        match tag {
            TAG_VERSION => {
                let (key, rest) = keycode::decode_bytes(rest)?;
                let ts = decode_timestamp(rest)?;
                Ok(Key::Version(key, ts))
            }
            TAG_TXN_WRITE => {
                if rest.len() < 16 {
                    return Err(Error::Parse("truncated tx_id in engine key".into()));
                }
                let tx_id = Uuid::from_slice(&rest[..16])
                    .map_err(|err| Error::Parse(format!("invalid tx_id: {err}")))?;
                let (key, rest) = keycode::decode_bytes(&rest[16..])?;
                let ts = decode_timestamp(rest)?;
                Ok(Key::TxnWrite(tx_id, key, ts))
            }
            other => Err(Error::Parse(format!("unknown engine key tag {other}"))),
        }
    }

    /// The prefix matching every `Version(key, _)` entry for `key`.
    pub fn version_prefix(key: &[u8]) -> Vec<u8> {
        let mut out = vec![TAG_VERSION];
        keycode::encode_bytes(key, &mut out);
        out
    }

    /// The prefix matching every `TxnWrite(tx_id, _, _)` entry for `tx_id`.
    pub fn txn_write_prefix(tx_id: Uuid) -> Vec<u8> {
        let mut out = vec![TAG_TXN_WRITE];
        out.extend_from_slice(tx_id.as_bytes());
        out
    }
}

fn decode_timestamp(bytes: &[u8]) -> CResult<Timestamp> {
    let s = std::str::from_utf8(bytes)
        .map_err(|err| Error::Parse(format!("non-utf8 timestamp: {err}")))?;
    Timestamp::parse(s).ok_or_else(|| Error::Parse(format!("malformed timestamp {s:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvs_hlc::Clock;

    #[test]
    fn version_key_roundtrips() {
        let clock = Clock::new();
        let ts = clock.now();
        let key = Key::Version(b"order_1".to_vec(), ts.clone());
        let encoded = key.encode();
        match Key::decode(&encoded).unwrap() {
            Key::Version(k, t) => {
                assert_eq!(k, b"order_1");
                assert_eq!(t, ts);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn txn_write_key_roundtrips() {
        let clock = Clock::new();
        let ts = clock.now();
        let tx_id = Uuid::new_v4();
        let key = Key::TxnWrite(tx_id, b"k".to_vec(), ts.clone());
        let encoded = key.encode();
        match Key::decode(&encoded).unwrap() {
            Key::TxnWrite(id, k, t) => {
                assert_eq!(id, tx_id);
                assert_eq!(k, b"k");
                assert_eq!(t, ts);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn version_prefix_groups_all_versions_of_a_key() {
        let clock = Clock::new();
        let ts1 = clock.now();
        let ts2 = clock.now();
        let a = Key::Version(b"x".to_vec(), ts1).encode();
        let b = Key::Version(b"x".to_vec(), ts2).encode();
        let prefix = Key::version_prefix(b"x");
        assert!(a.starts_with(&prefix[..]));
        assert!(b.starts_with(&prefix[..]));

        let other = Key::Version(b"xy".to_vec(), Clock::new().now()).encode();
        assert!(!other.starts_with(&prefix[..]) || prefix.len() > other.len());
    }
}
