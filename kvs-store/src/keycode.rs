//! Order-preserving encoding for the raw byte-string keys the storage engine
//! sorts on. Variable-length byte strings are escaped so that a key never
//! becomes a prefix of another key that should sort after it, and so a
//! terminator can mark the end of the variable-length segment within a
//! composite key (e.g. `Version(key, ts)`).
//!
//! Escaping rule: `0x00` is escaped as `0x00 0xff`, and the unescaped
//! sequence is terminated by `0x00 0x00`.

use crate::error::{CResult, Error};

/// Appends the order-preserving encoding of `bytes` (including its
/// terminator) to `out`.
pub fn encode_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    out.reserve(bytes.len() + 2);
    for &b in bytes {
        if b == 0x00 {
            out.push(0x00);
            out.push(0xff);
        } else {
            out.push(b);
        }
    }
    out.push(0x00);
    out.push(0x00);
}

/// Decodes a single order-preserving byte string from the front of `input`,
/// returning the decoded bytes and the remaining input.
pub fn decode_bytes(input: &[u8]) -> CResult<(Vec<u8>, &[u8])> {
    let mut decoded = Vec::new();
    let mut i = 0;
    loop {
        match input.get(i) {
            Some(0x00) => match input.get(i + 1) {
                Some(0x00) => return Ok((decoded, &input[i + 2..])),
                Some(0xff) => {
                    decoded.push(0x00);
                    i += 2;
                }
                _ => return Err(Error::Parse("invalid keycode escape sequence".into())),
            },
            Some(b) => {
                decoded.push(*b);
                i += 1;
            }
            None => return Err(Error::Parse("truncated keycode byte string".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        for case in [&b""[..], b"a", b"hello world", b"\x00", b"\x00\x00", b"a\x00b"] {
            let mut buf = Vec::new();
            encode_bytes(case, &mut buf);
            let (decoded, rest) = decode_bytes(&buf).unwrap();
            assert_eq!(decoded, case);
            assert!(rest.is_empty());
        }
    }

    #[test]
    fn ordering_preserved() {
        let pairs: Vec<(&[u8], &[u8])> =
            vec![(b"a", b"b"), (b"a", b"aa"), (b"", b"a"), (b"a\x00", b"a\x00a")];
        for (a, b) in pairs {
            let mut ea = Vec::new();
            let mut eb = Vec::new();
            encode_bytes(a, &mut ea);
            encode_bytes(b, &mut eb);
            assert!(ea < eb, "{:?} should sort before {:?}", a, b);
        }
    }
}
