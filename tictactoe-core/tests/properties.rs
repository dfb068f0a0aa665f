//! Properties checked over every position reachable in legal play.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use tictactoe_core::search::evaluate;
use tictactoe_core::{decode, Algorithm, Pattern, Position, Symmetry};

/// Every distinct reachable pattern, keyed by encoding, with one history that reaches it.
fn reachable() -> HashMap<u16, Position> {
    fn walk(position: &mut Position, seen: &mut HashMap<u16, Position>) {
        if seen.insert(position.encode(), *position).is_some() {
            return;
        }
        if position.is_terminal() {
            return;
        }
        for cell in position.legal_moves() {
            position.apply_move(cell).unwrap();
            walk(position, seen);
            position.undo_last_move().unwrap();
        }
    }

    let mut seen = HashMap::new();
    walk(&mut Position::new(), &mut seen);
    seen
}

#[test]
fn test_reachable_count() {
    let positions = reachable();
    assert_eq!(positions.len(), 5478);

    let terminal = positions.values().filter(|p| p.is_terminal()).count();
    assert_eq!(terminal, 958);
}

#[test]
fn test_pruned_agrees_with_exhaustive() {
    for (n, position) in reachable() {
        let mut position = position;
        let full = evaluate(&mut position, Algorithm::Exhaustive);
        let cut = evaluate(&mut position, Algorithm::Pruned);
        assert_eq!(full.outcome, cut.outcome, "position {n}");
        assert!(cut.nodes <= full.nodes, "position {n}");
    }
}

#[test]
fn test_encoding_roundtrip() {
    for (n, position) in reachable() {
        assert_eq!(decode(n).unwrap(), *position.pattern());
        assert_eq!(Position::from_pattern(*position.pattern()).unwrap().encode(), n);
    }
}

#[test]
fn test_symmetry_inverse_restores() {
    for (_, position) in reachable() {
        for op in Symmetry::all() {
            let moved = op.apply(&position);
            assert_eq!(op.inverse().apply(&moved), position);
            assert_eq!(moved.next_player(), position.next_player());
            assert_eq!(moved.check_winner(), position.check_winner());
        }
    }
}

#[test]
fn test_symmetric_positions_share_outcome() {
    for (n, position) in reachable() {
        let (representative, op) = position.pattern().canonical();
        let rep_pattern = decode(representative).unwrap();
        assert_eq!(op.apply_pattern(&rep_pattern), *position.pattern());

        let mut original = position;
        let mut image = Position::from_pattern(rep_pattern).unwrap();
        assert_eq!(
            evaluate(&mut original, Algorithm::Pruned).outcome,
            evaluate(&mut image, Algorithm::Pruned).outcome,
            "position {n}"
        );
    }
}

#[test]
fn test_canonical_orbit_count() {
    let positions = reachable();
    let mut canonical: Vec<u16> = positions
        .values()
        .map(|position| position.pattern().canonical().0)
        .collect();
    canonical.sort_unstable();
    canonical.dedup();
    assert_eq!(canonical.len(), 765);

    for n in canonical {
        assert!(positions.contains_key(&n), "representative {n} must be reachable");
    }
}

#[test]
fn test_apply_undo_random_playouts() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..500 {
        let mut position = Position::new();
        let mut snapshots = vec![position];
        while !position.is_terminal() {
            let moves = position.legal_moves().to_vec();
            let &cell = moves.choose(&mut rng).unwrap();
            position.apply_move(cell).unwrap();
            snapshots.push(position);
        }
        while let Some(expected) = snapshots.pop() {
            assert_eq!(position, expected);
            if !snapshots.is_empty() {
                position.undo_last_move().unwrap();
            }
        }
        assert_eq!(position, Position::new());
    }
}

#[test]
fn test_unique_variants_divide_group() {
    for (_, position) in reachable() {
        let orbit = position.pattern().unique_variants();
        assert_eq!(Symmetry::COUNT % orbit.len(), 0);
        assert!(orbit.contains(position.pattern()));
        let (representative, _) = position.pattern().canonical();
        let min = orbit.iter().map(Pattern::encode).min().unwrap();
        assert_eq!(representative, min);
    }
}
