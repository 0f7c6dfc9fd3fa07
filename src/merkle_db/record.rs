//! On-disk record encoding.
//!
//! A record value is either a leaf record, `0x00 ++ slot(u64 LE)`, or a
//! pair record, `0x01 ++ slot(u64 LE) ++ left_root(32) ++ right_root(32)`.
//! The node's own root is never stored in the value; it already lives in
//! the key.

use crate::primitives::Root;

/// Tag byte of a leaf record.
pub const LEAF_TAG: u8 = 0x00;
/// Tag byte of a pair record.
pub const PAIR_TAG: u8 = 0x01;
/// Encoded length of a leaf record.
pub const LEAF_RECORD_LEN: usize = 1 + 8;
/// Encoded length of a pair record.
pub const PAIR_RECORD_LEN: usize = 1 + 8 + 32 + 32;

/// Reasons a stored value fails to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// Shorter than the smallest record.
    #[error("value too short ({len} bytes)")]
    TooShort { len: usize },

    /// The tag byte is not a known record shape.
    #[error("unrecognized record tag {tag:#04x}")]
    UnknownTag { tag: u8 },

    /// A leaf record of the wrong length.
    #[error("invalid leaf record length ({len} bytes)")]
    LeafLength { len: usize },

    /// A pair record of the wrong length.
    #[error("invalid pair record length ({len} bytes)")]
    PairLength { len: usize },

    /// A scanned key does not match the record key layout.
    #[error("key length {len} does not match the record key layout")]
    KeyLength { len: usize },
}

/// A decoded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record {
    Leaf { slot: u64 },
    Pair { slot: u64, left: Root, right: Root },
}

impl Record {
    /// Encode a leaf record for `slot`.
    pub fn encode_leaf(slot: u64) -> [u8; LEAF_RECORD_LEN] {
        let mut value = [0u8; LEAF_RECORD_LEN];
        value[0] = LEAF_TAG;
        value[1..].copy_from_slice(&slot.to_le_bytes());
        value
    }

    /// Encode a pair record for `slot` referencing the two child roots.
    pub fn encode_pair(slot: u64, left: &Root, right: &Root) -> [u8; PAIR_RECORD_LEN] {
        let mut value = [0u8; PAIR_RECORD_LEN];
        value[0] = PAIR_TAG;
        value[1..9].copy_from_slice(&slot.to_le_bytes());
        value[9..41].copy_from_slice(left.as_slice());
        value[41..73].copy_from_slice(right.as_slice());
        value
    }

    /// Decode a stored value, rejecting anything that is not exactly a
    /// leaf or pair record.
    pub fn decode(value: &[u8]) -> Result<Self, RecordError> {
        if value.len() < LEAF_RECORD_LEN {
            return Err(RecordError::TooShort { len: value.len() });
        }
        let mut slot_raw = [0u8; 8];
        slot_raw.copy_from_slice(&value[1..9]);
        let slot = u64::from_le_bytes(slot_raw);

        match value[0] {
            LEAF_TAG => {
                if value.len() != LEAF_RECORD_LEN {
                    return Err(RecordError::LeafLength { len: value.len() });
                }
                Ok(Record::Leaf { slot })
            }
            PAIR_TAG => {
                if value.len() != PAIR_RECORD_LEN {
                    return Err(RecordError::PairLength { len: value.len() });
                }
                Ok(Record::Pair {
                    slot,
                    left: Root::from_slice(&value[9..41]),
                    right: Root::from_slice(&value[41..73]),
                })
            }
            tag => Err(RecordError::UnknownTag { tag }),
        }
    }

    /// The slot this record was inserted at.
    pub fn slot(&self) -> u64 {
        match self {
            Record::Leaf { slot } | Record::Pair { slot, .. } => *slot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_round_trip() {
        let value = Record::encode_leaf(0x0102030405060708);
        assert_eq!(value.len(), 9);
        assert_eq!(value[0], LEAF_TAG);
        assert_eq!(&value[1..], &[0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]);
        assert_eq!(
            Record::decode(&value).unwrap(),
            Record::Leaf { slot: 0x0102030405060708 }
        );
    }

    #[test]
    fn test_pair_round_trip() {
        let left = Root::repeat_byte(0xBB);
        let right = Root::repeat_byte(0xCC);
        let value = Record::encode_pair(1, &left, &right);
        assert_eq!(value.len(), 73);
        assert_eq!(value[0], PAIR_TAG);
        assert_eq!(
            Record::decode(&value).unwrap(),
            Record::Pair { slot: 1, left, right }
        );
    }

    #[test]
    fn test_decode_rejects_short_values() {
        for len in 0..9 {
            let value = vec![0u8; len];
            assert_eq!(
                Record::decode(&value).unwrap_err(),
                RecordError::TooShort { len }
            );
        }
    }

    #[test]
    fn test_decode_rejects_unknown_tag() {
        let mut value = [0u8; 9];
        value[0] = 0x02;
        assert_eq!(
            Record::decode(&value).unwrap_err(),
            RecordError::UnknownTag { tag: 0x02 }
        );
    }

    #[test]
    fn test_decode_rejects_mismatched_lengths() {
        let mut long_leaf = vec![0u8; 10];
        long_leaf[0] = LEAF_TAG;
        assert_eq!(
            Record::decode(&long_leaf).unwrap_err(),
            RecordError::LeafLength { len: 10 }
        );

        let mut short_pair = vec![0u8; 72];
        short_pair[0] = PAIR_TAG;
        assert_eq!(
            Record::decode(&short_pair).unwrap_err(),
            RecordError::PairLength { len: 72 }
        );
    }
}
