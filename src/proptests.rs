//! Structural-invariant and idempotence tests. Unlike the black-box
//! scenarios under `tests/`, this module lives inside the crate so it can
//! read the arena directly — the structural invariants in the engine's
//! testable-properties list (nextcount, `better` chains, the hash index)
//! aren't things a caller ever needs through the public API, only things a
//! test needs to check.

use proptest::prelude::*;

use crate::hash::meiyan16;
use crate::session::{CheckMode, GraftMode, Session};

const STATESIZE: usize = 17;
const CMPSIZE: usize = 16;

fn check_invariants(session: &Session) {
    for (pid, rec) in session.positions.iter() {
        // I2/I3: nextcount matches the branch list length, and every move
        // label in it is distinct.
        let mut seen_moves = std::collections::HashSet::new();
        let mut count = 0u32;
        let mut branch = rec.next;
        while let Some(bid) = branch {
            let b = session.branches.get(bid).unwrap();
            assert!(seen_moves.insert(b.mv), "duplicate move label at {pid:?}");
            // I2: the branch's target's `prev` is this position.
            let child = session.positions.get(b.target).unwrap();
            assert_eq!(child.prev, Some(pid), "child prev mismatch under {pid:?}");
            count += 1;
            branch = b.sibling;
        }
        assert_eq!(count, rec.nextcount, "nextcount mismatch at {pid:?}");

        // I4: movecount is parent's movecount + 1, or 0 at the root.
        match rec.prev {
            Some(parent) => {
                let parent_movecount = session.positions.get(parent).unwrap().movecount;
                assert_eq!(rec.movecount, parent_movecount + 1);
            }
            None => assert_eq!(rec.movecount, 0),
        }

        // I5: a `better` link points at a strictly-shorter, byte-equal state.
        if let Some(better) = rec.better {
            let target = session.positions.get(better).unwrap();
            assert_eq!(&target.state[..session.cmpsize], &rec.state[..session.cmpsize]);
            assert!(target.movecount < rec.movecount);
        }

        // the hash is reproducible from the comparing prefix.
        assert_eq!(rec.hashvalue, meiyan16(&rec.state[..session.cmpsize]));
    }

    // I7: every live position's hash bit is set in the index.
    if let Some(index) = &session.index {
        for (_, rec) in session.positions.iter() {
            assert!(index.maybe_present(rec.hashvalue));
        }
    }

    // I6: solutionsize/solutionend is the minimum-movecount, highest-endpoint
    // descendant, recomputed independently of the cached fields.
    for (pid, _) in session.positions.iter() {
        let (end, size) = best_solution_in_subtree(session, pid);
        let rec = session.positions.get(pid).unwrap();
        assert_eq!(rec.solutionend, end, "solutionend mismatch at {pid:?}");
        assert_eq!(rec.solutionsize, size, "solutionsize mismatch at {pid:?}");
    }
}

fn best_solution_in_subtree(session: &Session, pid: crate::PositionId) -> (crate::Endpoint, u32) {
    let rec = session.positions.get(pid).unwrap();
    let mut best = if rec.is_endpoint() {
        (rec.endpoint, rec.movecount)
    } else {
        (0, 0)
    };
    let mut branch = rec.next;
    while let Some(bid) = branch {
        let b = session.branches.get(bid).unwrap();
        let (end, size) = best_solution_in_subtree(session, b.target);
        if size != 0 && (end > best.0 || (end == best.0 && (best.1 == 0 || size < best.1))) {
            best = (end, size);
        }
        branch = b.sibling;
    }
    best
}

#[test]
fn add_then_drop_restores_session_size() {
    let mut session = Session::begin_session(&[0u8; STATESIZE], STATESIZE, CMPSIZE).unwrap();
    let root = session.root();
    let before = session.session_size();
    session.clear_changed();

    let mut state = vec![0u8; STATESIZE];
    state[0] = 1;
    let leaf = session
        .add_position(Some(root), 1, &state, 0, CheckMode::NoCheck)
        .unwrap();
    assert!(session.has_changed());
    check_invariants(&session);

    session.clear_changed();
    let parent = session.drop_position(leaf);
    assert_eq!(parent, root);
    assert!(session.has_changed());
    assert_eq!(session.session_size(), before);
    check_invariants(&session);
}

#[test]
fn readding_same_move_is_a_pure_lookup() {
    let mut session = Session::begin_session(&[0u8; STATESIZE], STATESIZE, CMPSIZE).unwrap();
    let root = session.root();
    let mut state = vec![0u8; STATESIZE];
    state[0] = 9;

    let first = session
        .add_position(Some(root), 42, &state, 0, CheckMode::NoCheck)
        .unwrap();
    session.clear_changed();

    let again = session
        .add_position(Some(root), 42, &state, 0, CheckMode::NoCheck)
        .unwrap();
    assert_eq!(first, again);
    assert!(!session.has_changed(), "re-adding an existing move must not set the change flag");
}

#[test]
fn resolving_deferred_betters_twice_is_idempotent() {
    let mut session = Session::begin_session(&[0u8; STATESIZE], STATESIZE, CMPSIZE).unwrap();
    let root = session.root();

    let mut state_a = vec![0u8; STATESIZE];
    state_a[0] = 1;
    let mut state_b = vec![0u8; STATESIZE];
    state_b[0] = 1; // same comparing bytes as state_a, reached via a longer path

    session
        .add_position(Some(root), 1, &state_a, 0, CheckMode::CheckLater)
        .unwrap();
    let mid = session
        .add_position(Some(root), 2, &vec![2u8; STATESIZE], 0, CheckMode::CheckLater)
        .unwrap();
    session
        .add_position(Some(mid), 3, &state_b, 0, CheckMode::CheckLater)
        .unwrap();

    let first_pass = session.resolve_deferred_betters();
    assert!(first_pass > 0);
    let second_pass = session.resolve_deferred_betters();
    assert_eq!(second_pass, 0, "nothing left to resolve on the second pass");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Random sequences of add/drop/graft-toggle/cycle-suppress operations
    /// must never violate the structural invariants.
    #[test]
    fn random_operations_preserve_invariants(ops in prop::collection::vec(0u8..5, 1..40)) {
        let mut session = Session::begin_session(&[0u8; STATESIZE], STATESIZE, CMPSIZE).unwrap();
        let mut frontier = vec![session.root()];

        for (i, op) in ops.into_iter().enumerate() {
            match op {
                0 | 1 => {
                    let parent = frontier[i % frontier.len()];
                    let mut state = vec![0u8; STATESIZE];
                    state[0] = (i % 7) as u8;
                    state[1] = ((i / 7) % 5) as u8;
                    if let Some(id) = session.add_position(
                        Some(parent),
                        i as i64,
                        &state,
                        i8::try_from(i % 3).unwrap() as i16,
                        CheckMode::Check,
                    ) {
                        frontier.push(id);
                    }
                }
                2 => {
                    let leaf = frontier[i % frontier.len()];
                    session.drop_position(leaf);
                }
                3 => {
                    let mode = match i % 4 {
                        0 => GraftMode::NoGraft,
                        1 => GraftMode::Graft,
                        2 => GraftMode::CopyPath,
                        _ => GraftMode::GraftAndCopy,
                    };
                    session.set_grafting(mode);
                }
                _ => {
                    let mut current = frontier[i % frontier.len()];
                    let mut state = vec![0u8; STATESIZE];
                    state[0] = (i % 7) as u8;
                    session.suppress_cycle(&mut current, &state, 2);
                }
            }
            check_invariants(&session);
        }
    }
}
