//! Checksummed ledger snapshots
//!
//! A snapshot is a bincode envelope around the bincode-encoded
//! [`LedgerState`], guarded by a BLAKE3 checksum of the payload. The id
//! counter travels with the state, so ids stay unique across restarts.
//!
//! Files are written to a sibling temp file first and renamed into place.

use crate::{
    error::{Error, Result},
    state::LedgerState,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current on-disk format
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEnvelope {
    format_version: u32,
    checksum: [u8; 32],
    payload: Vec<u8>,
}

/// Encode state into snapshot bytes
pub fn encode(state: &LedgerState) -> Result<Vec<u8>> {
    let payload = bincode::serialize(state)?;
    let envelope = SnapshotEnvelope {
        format_version: SNAPSHOT_FORMAT_VERSION,
        checksum: *blake3::hash(&payload).as_bytes(),
        payload,
    };
    Ok(bincode::serialize(&envelope)?)
}

/// Decode and verify snapshot bytes
pub fn decode(bytes: &[u8]) -> Result<LedgerState> {
    let envelope: SnapshotEnvelope = bincode::deserialize(bytes)
        .map_err(|e| Error::CorruptSnapshot(format!("unreadable envelope: {}", e)))?;

    if envelope.format_version != SNAPSHOT_FORMAT_VERSION {
        return Err(Error::CorruptSnapshot(format!(
            "unsupported format version {}",
            envelope.format_version
        )));
    }
    if blake3::hash(&envelope.payload).as_bytes() != &envelope.checksum {
        return Err(Error::CorruptSnapshot("checksum mismatch".to_string()));
    }

    let state: LedgerState = bincode::deserialize(&envelope.payload)?;
    if !state.tokens().records_well_formed() {
        return Err(Error::CorruptSnapshot(
            "token stored under a foreign id or owned by the null principal".to_string(),
        ));
    }
    if !state.tokens().ownership_index_consistent() {
        return Err(Error::CorruptSnapshot(
            "ownership index disagrees with token table".to_string(),
        ));
    }
    if !state.tokens().counter_ahead_of_ids() {
        return Err(Error::CorruptSnapshot(
            "id counter behind live token ids".to_string(),
        ));
    }
    Ok(state)
}

/// Write a snapshot file
pub fn save(state: &LedgerState, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let bytes = encode(state)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, &bytes)?;
    std::fs::rename(&tmp, path)?;

    tracing::info!(
        path = %path.display(),
        tokens = state.total_supply(),
        bytes = bytes.len(),
        "Wrote ledger snapshot"
    );
    Ok(())
}

/// Read a snapshot file
pub fn load(path: impl AsRef<Path>) -> Result<LedgerState> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let state = decode(&bytes)?;

    tracing::info!(
        path = %path.display(),
        tokens = state.total_supply(),
        "Restored ledger snapshot"
    );
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Principal, Slot, TokenId};

    fn populated() -> LedgerState {
        let alice = Principal::new("alice");
        let mut state = LedgerState::new();
        let id = state.mint(alice.clone(), Slot::new(1), 10_000).unwrap().value;
        state
            .approve_value(&alice, id, Principal::new("bob"), 400)
            .unwrap();
        state
            .transfer_value(&alice, id, Principal::new("carol"), 1)
            .unwrap();
        state.burn(&alice, id).unwrap();
        state
    }

    #[test]
    fn test_file_restore_keeps_counter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.snapshot");
        let state = populated();

        save(&state, &path).unwrap();
        let mut restored = load(&path).unwrap();

        assert_eq!(restored, state);
        let next = restored
            .mint(Principal::new("dave"), Slot::new(1), 1)
            .unwrap()
            .value;
        assert_eq!(next, TokenId::new(3));
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut bytes = encode(&populated()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;

        assert!(matches!(decode(&bytes), Err(Error::CorruptSnapshot(_))));
    }

    #[test]
    fn test_unsupported_format_version() {
        let payload = bincode::serialize(&populated()).unwrap();
        let envelope = SnapshotEnvelope {
            format_version: SNAPSHOT_FORMAT_VERSION + 1,
            checksum: *blake3::hash(&payload).as_bytes(),
            payload,
        };
        let bytes = bincode::serialize(&envelope).unwrap();

        match decode(&bytes) {
            Err(Error::CorruptSnapshot(reason)) => assert!(reason.contains("format version")),
            other => panic!("expected CorruptSnapshot, got {:?}", other),
        }
    }

    #[test]
    fn test_null_owner_rejected() {
        let mut state = populated();
        let id = state.tokens_of(&Principal::new("carol"))[0];
        state.tokens.set_owner(id, Principal::null()).unwrap();

        let bytes = encode(&state).unwrap();
        assert!(matches!(decode(&bytes), Err(Error::CorruptSnapshot(_))));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(decode(b"not a snapshot"), Err(Error::CorruptSnapshot(_))));
    }
}
