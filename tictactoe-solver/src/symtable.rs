//! Precomputed canonical form of every pattern in the keyspace.
//!
//! Slot `n` holds the orbit representative of pattern `n` (its smallest
//! encoding under the 8 symmetries) and the operation taking the
//! representative to `n`.

use std::path::Path;

use tictactoe_core::{decode, Pattern, Symmetry, KEYSPACE};
use tracing::{debug, info};

use crate::checkpoint::{Checkpoint, Format};
use crate::error::{Result, SolverError};

const FORMAT: Format = Format {
    magic: *b"TTS1",
    version: 1,
    record_size: 8,
};

/// Canonical form of one pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SymEntry {
    /// Smallest encoding in the orbit.
    pub representative: u16,
    /// Maps the representative onto the looked-up pattern.
    pub op: Symmetry,
}

impl SymEntry {
    /// Whether the looked-up pattern is its own representative.
    pub fn is_canonical(&self, n: u16) -> bool {
        self.representative == n
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymmetryTable {
    entries: Vec<SymEntry>,
}

impl SymmetryTable {
    /// Fill every slot, visiting each orbit once.
    ///
    /// When several operations map the representative onto the same image,
    /// the lowest-indexed one is stored.
    pub fn build() -> SymmetryTable {
        let mut slots: Vec<Option<SymEntry>> = vec![None; KEYSPACE as usize];
        let mut orbits = 0usize;

        for (n, pattern) in Pattern::all() {
            if slots[n as usize].is_some() {
                continue;
            }
            orbits += 1;

            let variants = pattern.variants();
            let representative = variants.iter().map(Pattern::encode).min().unwrap_or(n);
            let rep_variants = match variants.iter().find(|v| v.encode() == representative) {
                Some(rep_pattern) => rep_pattern.variants(),
                None => variants,
            };

            for op in Symmetry::all() {
                let slot = &mut slots[rep_variants[op.index() as usize].encode() as usize];
                if slot.is_none() {
                    *slot = Some(SymEntry { representative, op });
                }
            }
        }

        let entries: Vec<SymEntry> = slots.into_iter().flatten().collect();
        debug_assert_eq!(entries.len(), KEYSPACE as usize);
        debug!(orbits, "built symmetry table");
        SymmetryTable { entries }
    }

    /// Canonical form of pattern `n`.
    pub fn lookup(&self, n: u16) -> Result<SymEntry> {
        self.entries
            .get(n as usize)
            .copied()
            .ok_or(SolverError::LookupNotFound {
                table: "symmetry table",
                key: u32::from(n),
            })
    }

    /// Number of slots (the full keyspace once built).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct representatives.
    pub fn orbit_count(&self) -> usize {
        self.entries
            .iter()
            .enumerate()
            .filter(|&(n, entry)| usize::from(entry.representative) == n)
            .count()
    }

    /// Write the table as (representative i32 LE, op i32 LE) records.
    pub fn save(&self, path: &Path) -> Result<usize> {
        let mut data = Vec::with_capacity(self.entries.len() * FORMAT.record_size);
        for entry in &self.entries {
            data.extend_from_slice(&i32::from(entry.representative).to_le_bytes());
            data.extend_from_slice(&i32::from(entry.op.index()).to_le_bytes());
        }
        let count = Checkpoint::save(path, &FORMAT, &data)?;
        info!(path = %path.display(), entries = count, "saved symmetry table");
        Ok(count)
    }

    /// Read a table written by [`save`](Self::save), checking every slot.
    pub fn load(path: &Path) -> Result<SymmetryTable> {
        let checkpoint = Checkpoint::load(path, &FORMAT)?;
        if checkpoint.len() != KEYSPACE as usize {
            return Err(SolverError::corrupt(
                "symmetry table",
                format!("{} entries, expected {}", checkpoint.len(), KEYSPACE),
            ));
        }

        let mut entries = Vec::with_capacity(checkpoint.len());
        for (n, record) in checkpoint.records().enumerate() {
            let representative = i32::from_le_bytes([record[0], record[1], record[2], record[3]]);
            let op = i32::from_le_bytes([record[4], record[5], record[6], record[7]]);
            let entry = Self::validate(n, representative, op)?;
            entries.push(entry);
        }

        debug!(path = %path.display(), "loaded symmetry table");
        Ok(SymmetryTable { entries })
    }

    fn validate(n: usize, representative: i32, op: i32) -> Result<SymEntry> {
        let bad = |detail: String| SolverError::corrupt("symmetry table", format!("slot {n}: {detail}"));

        let representative = u16::try_from(representative)
            .ok()
            .filter(|&r| r < KEYSPACE && usize::from(r) <= n)
            .ok_or_else(|| bad(format!("representative {representative} out of range")))?;
        let op = u8::try_from(op)
            .ok()
            .and_then(Symmetry::from_index)
            .ok_or_else(|| bad(format!("operation {op} out of range")))?;

        let (canonical, canonical_op) = decode(n as u16)?.canonical();
        if representative != canonical {
            return Err(bad(format!(
                "representative {representative} is not the orbit minimum {canonical}"
            )));
        }
        if op != canonical_op {
            return Err(bad(format!(
                "operation {} stored, {} maps {representative} onto it",
                op.index(),
                canonical_op.index()
            )));
        }
        Ok(SymEntry { representative, op })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_covers_keyspace() {
        let table = SymmetryTable::build();
        assert_eq!(table.len(), KEYSPACE as usize);
        assert!(table.lookup(KEYSPACE).is_err());
    }

    #[test]
    fn test_build_matches_direct_canonicalization() {
        let table = SymmetryTable::build();
        for (n, pattern) in Pattern::all() {
            let entry = table.lookup(n).unwrap();
            let (representative, op) = pattern.canonical();
            assert_eq!(entry, SymEntry { representative, op }, "pattern {n}");
            assert_eq!(entry.op.apply_pattern(&decode(representative).unwrap()), pattern);
        }
    }

    #[test]
    fn test_first_moves() {
        let table = SymmetryTable::build();
        assert_eq!(table.lookup(81).unwrap().representative, 81);
        assert!(table.lookup(81).unwrap().is_canonical(81));
        // X on cell 8 is the corner at cell 0 turned 180°.
        let corner = table.lookup(6561).unwrap();
        assert_eq!(corner.representative, 1);
        assert_eq!(corner.op.new_index(0), 8);
        assert_eq!(table.lookup(3 * 3 * 3).unwrap().representative, 3);
    }

    #[test]
    fn test_lookup_missing_slot() {
        let table = SymmetryTable { entries: Vec::new() };
        match table.lookup(0) {
            Err(SolverError::LookupNotFound { key, .. }) => assert_eq!(key, 0),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_save_load_roundtrip() {
        let path = std::env::temp_dir().join(format!("tictactoe-symtable-{}.bin", std::process::id()));
        let table = SymmetryTable::build();
        assert_eq!(table.save(&path).unwrap(), KEYSPACE as usize);
        let loaded = SymmetryTable::load(&path).unwrap();
        assert_eq!(loaded, table);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_rejects_bad_operation() {
        let path = std::env::temp_dir().join(format!("tictactoe-symtable-bad-{}.bin", std::process::id()));
        let mut table = SymmetryTable::build();
        // Pattern 1 (X on cell 0) is not fixed by a quarter turn.
        table.entries[1].op = Symmetry::from_index(1).unwrap();
        table.save(&path).unwrap();
        match SymmetryTable::load(&path) {
            Err(SolverError::Corrupt { what, .. }) => assert_eq!(what, "symmetry table"),
            other => panic!("unexpected {other:?}"),
        }
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_rejects_non_minimal_representative() {
        let path = std::env::temp_dir().join(format!("tictactoe-symtable-rep-{}.bin", std::process::id()));
        let mut table = SymmetryTable::build();
        // X on cell 2 claims to be its own representative; the orbit minimum is 1.
        table.entries[9] = SymEntry {
            representative: 9,
            op: Symmetry::IDENTITY,
        };
        table.save(&path).unwrap();
        match SymmetryTable::load(&path) {
            Err(SolverError::Corrupt { what, detail }) => {
                assert_eq!(what, "symmetry table");
                assert!(detail.starts_with("slot 9"), "{detail}");
            }
            other => panic!("unexpected {other:?}"),
        }
        std::fs::remove_file(&path).ok();
    }
}
