//! Rotating cache of remote calldata public keys, indexed by epoch.

use serde_json::Value;
use veilcall_proto::PUBLIC_KEY_SIZE;

use crate::error::ClientError;

/// Number of key epochs retained; the remote rejects envelopes encrypted
/// under keys older than its own acceptance window, so holding more is
/// pointless.
pub const EPOCH_LIMIT: u64 = 5;

/// A remote-issued calldata public key, valid for one epoch window.
///
/// Immutable once received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalldataPublicKey {
    /// Validity epoch.
    pub epoch: u64,
    /// X25519 public key (32 bytes).
    pub key: [u8; PUBLIC_KEY_SIZE],
    /// Checksum of the remote key-manager state the key came from.
    pub checksum: Vec<u8>,
    /// Remote signature over key and checksum.
    pub signature: Vec<u8>,
}

impl CalldataPublicKey {
    /// Parse the JSON result of a key-fetch call.
    ///
    /// Expects `{key, checksum, signature}` as `0x`-prefixed hex strings
    /// and `epoch` as an unsigned integer.
    pub fn from_rpc(value: &Value) -> Result<Self, ClientError> {
        let epoch = value
            .get("epoch")
            .and_then(Value::as_u64)
            .ok_or_else(|| ClientError::MalformedKey("missing or non-integer `epoch`".into()))?;

        let key_bytes = decode_hex_field(value, "key")?;
        let key: [u8; PUBLIC_KEY_SIZE] = key_bytes.as_slice().try_into().map_err(|_| {
            ClientError::MalformedKey(format!(
                "`key` must be {PUBLIC_KEY_SIZE} bytes, got {}",
                key_bytes.len()
            ))
        })?;

        Ok(Self {
            epoch,
            key,
            checksum: decode_hex_field(value, "checksum")?,
            signature: decode_hex_field(value, "signature")?,
        })
    }
}

fn decode_hex_field(value: &Value, field: &'static str) -> Result<Vec<u8>, ClientError> {
    let text = value
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| ClientError::MalformedKey(format!("missing `{field}`")))?;
    let stripped = text
        .strip_prefix("0x")
        .ok_or_else(|| ClientError::MalformedKey(format!("`{field}` is not 0x-prefixed hex")))?;
    hex::decode(stripped).map_err(|e| ClientError::MalformedKey(format!("`{field}`: {e}")))
}

/// Bounded cache of recently observed keys, ascending by epoch.
///
/// Epochs observed from the network are non-decreasing, and trimming is
/// idempotent, so a last-writer-wins race between concurrent `add` calls
/// cannot violate the invariants.
#[derive(Debug, Default)]
pub struct KeyEpochCache {
    keys: Vec<CalldataPublicKey>,
}

impl KeyEpochCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent key, if any.
    pub fn newest(&self) -> Option<&CalldataPublicKey> {
        self.keys.last()
    }

    /// Number of cached keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the cache holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Cached epochs, ascending.
    pub fn epochs(&self) -> impl Iterator<Item = u64> + '_ {
        self.keys.iter().map(|k| k.epoch)
    }

    /// Record an observed key.
    ///
    /// Appends only when strictly newer than the current newest (first
    /// insert is unconditional), then re-trims to the [`EPOCH_LIMIT`] most
    /// recent epochs within the acceptance window.
    pub fn add(&mut self, pk: CalldataPublicKey) {
        match self.keys.last() {
            None => {
                self.keys.push(pk);
                return;
            },
            Some(newest) => {
                if pk.epoch > newest.epoch {
                    self.keys.push(pk);
                }
            },
        }
        if let Some(newest_epoch) = self.keys.last().map(|k| k.epoch) {
            self.trim(newest_epoch);
        }
    }

    fn trim(&mut self, newest_epoch: u64) {
        let floor = newest_epoch.saturating_sub(EPOCH_LIMIT);
        self.keys.retain(|k| k.epoch >= floor);
        self.keys.sort_by_key(|k| k.epoch);
        if self.keys.len() > EPOCH_LIMIT as usize {
            let excess = self.keys.len() - EPOCH_LIMIT as usize;
            self.keys.drain(..excess);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn key(epoch: u64) -> CalldataPublicKey {
        CalldataPublicKey {
            epoch,
            key: [epoch as u8; PUBLIC_KEY_SIZE],
            checksum: vec![],
            signature: vec![],
        }
    }

    #[test]
    fn first_insert_is_unconditional() {
        let mut cache = KeyEpochCache::new();
        cache.add(key(100));
        assert_eq!(cache.newest().map(|k| k.epoch), Some(100));
    }

    #[test]
    fn retains_the_five_most_recent_epochs() {
        let mut cache = KeyEpochCache::new();
        for epoch in 1..=6 {
            cache.add(key(epoch));
        }

        assert_eq!(cache.epochs().collect::<Vec<_>>(), vec![2, 3, 4, 5, 6]);
        assert_eq!(cache.newest().map(|k| k.epoch), Some(6));
    }

    #[test]
    fn out_of_order_older_epoch_does_not_change_newest() {
        let mut cache = KeyEpochCache::new();
        for epoch in 2..=6 {
            cache.add(key(epoch));
        }
        cache.add(key(3));

        assert_eq!(cache.newest().map(|k| k.epoch), Some(6));
        assert_eq!(cache.len(), 5);
    }

    #[test]
    fn duplicate_epoch_is_not_appended() {
        let mut cache = KeyEpochCache::new();
        cache.add(key(4));
        cache.add(key(4));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn far_newer_epoch_evicts_everything_stale() {
        let mut cache = KeyEpochCache::new();
        cache.add(key(1));
        cache.add(key(2));
        cache.add(key(100));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.newest().map(|k| k.epoch), Some(100));
    }

    #[test]
    fn parses_a_well_formed_rpc_key() {
        let value = json!({
            "key": format!("0x{}", "11".repeat(32)),
            "checksum": "0xdead",
            "signature": "0xbeef",
            "epoch": 42,
        });

        let pk = CalldataPublicKey::from_rpc(&value).unwrap();
        assert_eq!(pk.epoch, 42);
        assert_eq!(pk.key, [0x11; 32]);
        assert_eq!(pk.checksum, vec![0xDE, 0xAD]);
        assert_eq!(pk.signature, vec![0xBE, 0xEF]);
    }

    #[test]
    fn rejects_a_short_key() {
        let value = json!({
            "key": "0x1111",
            "checksum": "0x",
            "signature": "0x",
            "epoch": 1,
        });

        assert!(matches!(
            CalldataPublicKey::from_rpc(&value),
            Err(ClientError::MalformedKey(_))
        ));
    }

    #[test]
    fn rejects_missing_epoch() {
        let value = json!({
            "key": format!("0x{}", "11".repeat(32)),
            "checksum": "0x",
            "signature": "0x",
        });

        assert!(matches!(
            CalldataPublicKey::from_rpc(&value),
            Err(ClientError::MalformedKey(_))
        ));
    }
}
