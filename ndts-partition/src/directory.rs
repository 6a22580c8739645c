//! Partition directory: per-partition row/byte/key-range metadata, reconstructed
//! from a filesystem scan on open and fast-pathed by a `.ndts-directory.json`
//! sidecar the manager writes on flush.
//!
//! The sidecar is always revalidated against the file it describes (a byte
//! size comparison) before being trusted; a missing or stale entry falls
//! back to a full decode of that one partition. It is a trusted-but-
//! reconstructable index rather than an unconditionally authoritative one.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const SIDECAR_FILE_NAME: &str = ".ndts-directory.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionStats {
    pub row_count: u64,
    pub byte_size: u64,
    pub min_key: i64,
    pub max_key: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartitionDirectory {
    pub partitions: HashMap<String, PartitionStats>,
}

impl PartitionDirectory {
    pub fn load_sidecar(dir: &Path) -> Option<Self> {
        let bytes = fs::read(dir.join(SIDECAR_FILE_NAME)).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    pub fn save_sidecar(&self, dir: &Path) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        fs::write(dir.join(SIDECAR_FILE_NAME), bytes)?;
        Ok(())
    }

    /// A cached entry is trusted only if its recorded byte size still
    /// matches the file currently on disk.
    pub fn is_fresh(&self, name: &str, file_len: u64) -> bool {
        self.partitions.get(name).map(|s| s.byte_size == file_len).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sidecar_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut directory = PartitionDirectory::default();
        directory.partitions.insert(
            "p_000".to_string(),
            PartitionStats { row_count: 10, byte_size: 512, min_key: 1, max_key: 100 },
        );
        directory.save_sidecar(dir.path()).unwrap();

        let loaded = PartitionDirectory::load_sidecar(dir.path()).unwrap();
        assert_eq!(loaded.partitions["p_000"], directory.partitions["p_000"]);
    }

    #[test]
    fn missing_sidecar_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PartitionDirectory::load_sidecar(dir.path()).is_none());
    }

    #[test]
    fn staleness_is_detected_by_size_mismatch() {
        let mut directory = PartitionDirectory::default();
        directory.partitions.insert(
            "p_000".to_string(),
            PartitionStats { row_count: 10, byte_size: 512, min_key: 1, max_key: 100 },
        );
        assert!(directory.is_fresh("p_000", 512));
        assert!(!directory.is_fresh("p_000", 600));
        assert!(!directory.is_fresh("p_001", 512));
    }
}
