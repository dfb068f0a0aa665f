//! Solved positions keyed by canonical encoding.
//!
//! Each entry stores the value for the side to move and every move reaching
//! it, in the representative's orientation. Finished positions have no entry.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use tictactoe_core::{decode, walk_continuations, MoveEvals, MoveSet, Outcome, Position, KEYSPACE};
use tracing::{debug, info};

use crate::checkpoint::{Checkpoint, Format};
use crate::error::{Result, SolverError};
use crate::stats::BuildStats;
use crate::symtable::SymmetryTable;

const FORMAT: Format = Format {
    magic: *b"TTB1",
    version: 1,
    record_size: 5,
};

/// Best result for the side to move and the moves achieving it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Entry {
    pub outcome: Outcome,
    pub moves: MoveSet,
}

impl Entry {
    /// `[outcome, move, move, ...]`, the text form of an entry.
    pub fn to_values(self) -> Vec<i8> {
        let mut values = Vec::with_capacity(1 + self.moves.len());
        values.push(self.outcome.as_i8());
        values.extend(self.moves.iter().map(|cell| cell as i8));
        values
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tablebase {
    entries: HashMap<u16, Entry>,
}

impl Tablebase {
    /// Walk the game tree from the empty board and record every canonical,
    /// unfinished position once.
    pub fn build(symmetry: &SymmetryTable) -> Result<(Tablebase, BuildStats)> {
        let mut entries = HashMap::new();
        let mut stats = BuildStats::new();
        let mut failure = None;

        let mut position = Position::new();
        walk_continuations(&mut position, &mut |node: &Position, evals: &MoveEvals| {
            stats.nodes_visited += 1;
            if failure.is_some() {
                return;
            }

            let n = node.encode();
            let canonical = match symmetry.lookup(n) {
                Ok(entry) => entry.is_canonical(n),
                Err(err) => {
                    failure = Some(err);
                    return;
                }
            };
            if !canonical {
                stats.non_canonical += 1;
                return;
            }
            if entries.contains_key(&n) {
                stats.duplicates_skipped += 1;
                return;
            }
            if let Some((outcome, moves)) = evals.best_moves() {
                entries.insert(n, Entry { outcome, moves });
                stats.record_entry(outcome);
            }
        });

        if let Some(err) = failure {
            return Err(err);
        }
        stats.finish();
        info!(entries = entries.len(), "built tablebase");
        Ok((Tablebase { entries }, stats))
    }

    /// Entry for canonical encoding `n`.
    pub fn lookup(&self, n: u16) -> Result<Entry> {
        self.entries
            .get(&n)
            .copied()
            .ok_or(SolverError::LookupNotFound {
                table: "tablebase",
                key: u32::from(n),
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by key.
    pub fn iter(&self) -> impl Iterator<Item = (u16, Entry)> + '_ {
        let sorted: BTreeMap<u16, Entry> = self.entries.iter().map(|(&k, &v)| (k, v)).collect();
        sorted.into_iter()
    }

    /// Check one entry against the pattern it claims to describe.
    pub fn validate(n: u16, entry: &Entry) -> Result<()> {
        let bad = |detail: String| SolverError::corrupt("tablebase", format!("entry {n}: {detail}"));
        if n >= KEYSPACE {
            return Err(bad("key outside the keyspace".to_string()));
        }
        if entry.moves.is_empty() {
            return Err(bad("no moves".to_string()));
        }
        let pattern = decode(n)?;
        let (canonical, _) = pattern.canonical();
        if canonical != n {
            return Err(bad(format!("key is not canonical, its orbit is stored under {canonical}")));
        }
        if pattern.winner().is_some() {
            return Err(bad("position is already won".to_string()));
        }
        let empty = pattern.empty_cells();
        if let Some(cell) = entry.moves.iter().find(|&cell| !empty.contains(cell)) {
            return Err(bad(format!("move {cell} is not an empty cell")));
        }
        Ok(())
    }

    fn from_record(n: u16, values: &[i8]) -> Result<Entry> {
        let bad = |detail: String| SolverError::corrupt("tablebase", format!("entry {n}: {detail}"));
        let (&outcome, moves) = values
            .split_first()
            .ok_or_else(|| bad("empty record".to_string()))?;
        let outcome = Outcome::from_i8(outcome).ok_or_else(|| bad(format!("outcome {outcome}")))?;

        let mut set = MoveSet::EMPTY;
        for &cell in moves {
            if !(0..9).contains(&cell) {
                return Err(bad(format!("move {cell} out of range")));
            }
            set.insert(cell as usize);
        }
        let entry = Entry {
            outcome,
            moves: set,
        };
        Self::validate(n, &entry)?;
        Ok(entry)
    }

    /// Write `{"<id>": [outcome, move, ...], ...}` sorted by id.
    pub fn save_json(&self, path: &Path) -> Result<usize> {
        let table: BTreeMap<u16, Vec<i8>> = self
            .entries
            .iter()
            .map(|(&n, entry)| (n, entry.to_values()))
            .collect();

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &table)?;
        writer.flush()?;

        info!(path = %path.display(), entries = table.len(), "saved tablebase");
        Ok(table.len())
    }

    /// Read a table written by [`save_json`](Self::save_json). Keys come back as integers.
    pub fn load_json(path: &Path) -> Result<Tablebase> {
        let start = Instant::now();
        let file = File::open(path)?;
        let table: BTreeMap<u16, Vec<i8>> = serde_json::from_reader(BufReader::new(file))?;

        let mut entries = HashMap::with_capacity(table.len());
        for (n, values) in table {
            entries.insert(n, Self::from_record(n, &values)?);
        }

        debug!(
            path = %path.display(),
            entries = entries.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "loaded tablebase"
        );
        Ok(Tablebase { entries })
    }

    /// Write (canonical u16 LE, outcome i8, move mask u16 LE) records sorted by key.
    pub fn save_binary(&self, path: &Path) -> Result<usize> {
        let mut data = Vec::with_capacity(self.entries.len() * FORMAT.record_size);
        for (n, entry) in self.iter() {
            data.extend_from_slice(&n.to_le_bytes());
            data.push(entry.outcome.as_i8() as u8);
            data.extend_from_slice(&entry.moves.bits().to_le_bytes());
        }
        let count = Checkpoint::save(path, &FORMAT, &data)?;
        info!(path = %path.display(), entries = count, "saved tablebase");
        Ok(count)
    }

    pub fn load_binary(path: &Path) -> Result<Tablebase> {
        let checkpoint = Checkpoint::load(path, &FORMAT)?;
        let mut entries = HashMap::with_capacity(checkpoint.len());
        for record in checkpoint.records() {
            let n = u16::from_le_bytes([record[0], record[1]]);
            let outcome = record[2] as i8;
            let bits = u16::from_le_bytes([record[3], record[4]]);
            if bits != MoveSet::from_bits(bits).bits() {
                return Err(SolverError::corrupt("tablebase", format!("entry {n}: move mask {bits:#x}")));
            }
            let outcome = Outcome::from_i8(outcome)
                .ok_or_else(|| SolverError::corrupt("tablebase", format!("entry {n}: outcome {outcome}")))?;
            let entry = Entry {
                outcome,
                moves: MoveSet::from_bits(bits),
            };
            Self::validate(n, &entry)?;
            if entries.insert(n, entry).is_some() {
                return Err(SolverError::corrupt("tablebase", format!("entry {n} appears twice")));
            }
        }
        debug!(path = %path.display(), entries = entries.len(), "loaded tablebase");
        Ok(Tablebase { entries })
    }

    /// Load by extension: `.bin` is the binary framing, anything else is JSON.
    pub fn load(path: &Path) -> Result<Tablebase> {
        if path.extension().is_some_and(|ext| ext == "bin") {
            Self::load_binary(path)
        } else {
            Self::load_json(path)
        }
    }

    /// Save by extension, like [`load`](Self::load).
    pub fn save(&self, path: &Path) -> Result<usize> {
        if path.extension().is_some_and(|ext| ext == "bin") {
            self.save_binary(path)
        } else {
            self.save_json(path)
        }
    }
}

impl FromIterator<(u16, Entry)> for Tablebase {
    fn from_iter<I: IntoIterator<Item = (u16, Entry)>>(iter: I) -> Self {
        Tablebase {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("tictactoe-{}-{}", std::process::id(), name))
    }

    fn small() -> Tablebase {
        [
            (
                0,
                Entry {
                    outcome: Outcome::Draw,
                    moves: MoveSet::from_bits(0b1_1111_1111),
                },
            ),
            (
                1,
                Entry {
                    outcome: Outcome::Draw,
                    moves: MoveSet::from_bits(1 << 4),
                },
            ),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_entry_values() {
        let entry = Entry {
            outcome: Outcome::Loss,
            moves: [2, 3, 8].into_iter().collect(),
        };
        assert_eq!(entry.to_values(), vec![-1, 2, 3, 8]);
    }

    #[test]
    fn test_json_layout() {
        let path = temp_path("tablebase_layout.json");
        small().save_json(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, r#"{"0":[0,0,1,2,3,4,5,6,7,8],"1":[0,4]}"#);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_json_roundtrip() {
        let path = temp_path("tablebase_roundtrip.json");
        let table = small();
        assert_eq!(table.save(&path).unwrap(), 2);
        assert_eq!(Tablebase::load(&path).unwrap(), table);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_binary_roundtrip() {
        let path = temp_path("tablebase_roundtrip.bin");
        let table = small();
        assert_eq!(table.save(&path).unwrap(), 2);
        assert_eq!(Tablebase::load(&path).unwrap(), table);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_json_rejects_occupied_move() {
        let path = temp_path("tablebase_occupied.json");
        // Pattern 1 has X on cell 0.
        std::fs::write(&path, r#"{"1":[0,0]}"#).unwrap();
        assert!(matches!(Tablebase::load_json(&path), Err(SolverError::Corrupt { .. })));

        std::fs::write(&path, r#"{"1":[2,4]}"#).unwrap();
        assert!(matches!(Tablebase::load_json(&path), Err(SolverError::Corrupt { .. })));

        std::fs::write(&path, r#"{"1":[]}"#).unwrap();
        assert!(matches!(Tablebase::load_json(&path), Err(SolverError::Corrupt { .. })));

        std::fs::write(&path, r#"{"x":[0,4]}"#).unwrap();
        assert!(matches!(Tablebase::load_json(&path), Err(SolverError::Json(_))));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_json_rejects_non_canonical_key() {
        let path = temp_path("tablebase_non_canonical.json");
        // X on cell 8 belongs to the orbit stored under 1.
        std::fs::write(&path, r#"{"6561":[0,4]}"#).unwrap();
        match Tablebase::load_json(&path) {
            Err(SolverError::Corrupt { what, detail }) => {
                assert_eq!(what, "tablebase");
                assert!(detail.contains("not canonical"), "{detail}");
            }
            other => panic!("unexpected {other:?}"),
        }
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_lookup_missing() {
        let table = small();
        assert!(table.lookup(0).is_ok());
        match table.lookup(81) {
            Err(SolverError::LookupNotFound { table, key }) => {
                assert_eq!(table, "tablebase");
                assert_eq!(key, 81);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_build_small_facts() {
        let symmetry = SymmetryTable::build();
        let (table, stats) = Tablebase::build(&symmetry).unwrap();
        assert_eq!(table.len(), 627);
        assert_eq!(stats.nodes_visited, 294_778);

        let root = table.lookup(0).unwrap();
        assert_eq!(root.outcome, Outcome::Draw);
        assert_eq!(root.moves.len(), 9);

        // X in the corner: O must answer in the center.
        let corner = table.lookup(1).unwrap();
        assert_eq!(corner.outcome, Outcome::Draw);
        assert_eq!(corner.moves.to_vec(), vec![4]);
    }
}
