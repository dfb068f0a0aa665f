//! Cross-checks between the tables and direct search.

use std::collections::HashMap;

use tictactoe_core::search::evaluate;
use tictactoe_core::{decode, Algorithm, Evaluator, Pattern, Position};
use tracing::{debug, warn};

use crate::engine::{Engine, MinimaxEngine, TablebaseEngine};
use crate::error::Result;
use crate::symtable::SymmetryTable;
use crate::tablebase::Tablebase;

/// Mismatches kept in a report; the count keeps going past this.
const MAX_DETAILS: usize = 20;

/// Outcome of one check.
#[derive(Debug, Default)]
pub struct Report {
    pub name: &'static str,
    pub checked: u64,
    pub failures: u64,
    pub details: Vec<String>,
}

impl Report {
    fn new(name: &'static str) -> Self {
        Report {
            name,
            ..Default::default()
        }
    }

    fn fail(&mut self, detail: String) {
        self.failures += 1;
        if self.details.len() < MAX_DETAILS {
            warn!(check = self.name, "{detail}");
            self.details.push(detail);
        }
    }

    pub fn passed(&self) -> bool {
        self.failures == 0
    }
}

/// Every distinct position reachable from the empty board, by encoding.
pub fn reachable_positions() -> HashMap<u16, Position> {
    fn walk(position: &mut Position, seen: &mut HashMap<u16, Position>) {
        if seen.insert(position.encode(), *position).is_some() || position.is_terminal() {
            return;
        }
        for cell in position.legal_moves() {
            if let Ok(mut child) = position.scoped_move(cell) {
                walk(&mut child, seen);
            }
        }
    }

    let mut seen = HashMap::new();
    walk(&mut Position::new(), &mut seen);
    debug!(positions = seen.len(), "enumerated reachable positions");
    seen
}

/// Every slot agrees with direct canonicalization.
pub fn check_symmetry_table(table: &SymmetryTable) -> Report {
    let mut report = Report::new("symmetry table");
    for (n, pattern) in Pattern::all() {
        report.checked += 1;
        let expected = pattern.canonical();
        match table.lookup(n) {
            Ok(entry) if (entry.representative, entry.op) == expected => {
                match decode(entry.representative) {
                    Ok(rep) if entry.op.apply_pattern(&rep) == pattern => {}
                    _ => report.fail(format!("slot {n}: op does not reach the pattern")),
                }
            }
            Ok(entry) => report.fail(format!(
                "slot {n}: stored ({}, {}), expected ({}, {})",
                entry.representative,
                entry.op.index(),
                expected.0,
                expected.1.index()
            )),
            Err(err) => report.fail(format!("slot {n}: {err}")),
        }
    }
    report
}

/// Pruned and exhaustive search agree on every reachable position.
pub fn check_search_agreement(positions: &HashMap<u16, Position>) -> Report {
    let mut report = Report::new("pruned vs exhaustive");
    for (&n, position) in positions {
        report.checked += 1;
        let mut position = *position;
        let full = evaluate(&mut position, Algorithm::Exhaustive).outcome;
        let cut = evaluate(&mut position, Algorithm::Pruned).outcome;
        if full != cut {
            report.fail(format!("position {n}: exhaustive {full}, pruned {cut}"));
        }
    }
    report
}

/// The evaluator backend agrees with the pure search.
pub fn check_evaluator(evaluator: &Evaluator, positions: &HashMap<u16, Position>) -> Result<Report> {
    let mut report = Report::new("evaluator backend");
    for (&n, position) in positions {
        report.checked += 1;
        let mut position = *position;
        let expected = evaluate(&mut position, evaluator.algorithm()).outcome;
        let actual = evaluator.evaluate(&mut position)?.outcome;
        if expected != actual {
            report.fail(format!("position {n}: backend {actual}, search {expected}"));
        }
    }
    Ok(report)
}

/// Tablebase answers match search-backed answers on every unfinished position.
pub fn check_tablebase(
    symmetry: &SymmetryTable,
    tablebase: &Tablebase,
    evaluator: &Evaluator,
    positions: &HashMap<u16, Position>,
) -> Report {
    let mut report = Report::new("tablebase vs search");
    let lookup = TablebaseEngine::new(symmetry, tablebase);
    let search = MinimaxEngine::new(evaluator);

    for (&n, position) in positions {
        if position.is_terminal() {
            continue;
        }
        report.checked += 1;
        match (lookup.best_moves(position), search.best_moves(position)) {
            (Ok(stored), Ok(searched)) if stored == searched => {}
            (Ok(stored), Ok(searched)) => {
                report.fail(format!("position {n}: tablebase {stored:?}, search {searched:?}"))
            }
            (Err(err), _) | (_, Err(err)) => report.fail(format!("position {n}: {err}")),
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use tictactoe_core::Outcome;

    #[test]
    fn test_reachable_positions() {
        let positions = reachable_positions();
        assert_eq!(positions.len(), 5478);
        assert_eq!(positions.values().filter(|p| !p.is_terminal()).count(), 4520);
    }

    #[test]
    fn test_symmetry_check_passes_on_built_table() {
        let report = check_symmetry_table(&SymmetryTable::build());
        assert!(report.passed(), "{:?}", report.details);
        assert_eq!(report.checked, 19_683);
    }

    #[test]
    fn test_tablebase_check_flags_wrong_entry() {
        let symmetry = SymmetryTable::build();
        let (table, _) = Tablebase::build(&symmetry).unwrap();
        let mut entries: Vec<_> = table.iter().collect();
        for (n, entry) in &mut entries {
            if *n == 1 {
                entry.outcome = Outcome::Win;
            }
        }
        let broken: Tablebase = entries.into_iter().collect();

        let positions = reachable_positions();
        let evaluator = Evaluator::pure(Algorithm::Pruned);
        let report = check_tablebase(&symmetry, &broken, &evaluator, &positions);
        // X on any of the four corners maps to entry 1.
        assert_eq!(report.failures, 4);
        assert!(!report.passed());
    }
}
