//! The end-to-end scenarios from the engine's testable-properties list,
//! each exercised purely through the public API.

use history_tree::{CheckMode, GraftMode, Session};

const STATESIZE: usize = 33;
const CMPSIZE: usize = 32;

fn state(byte: u8) -> Vec<u8> {
    let mut buf = vec![byte; CMPSIZE];
    buf.push(0);
    buf
}

#[test_log::test]
fn smoke() {
    let session = Session::begin_session(&[0u8], 1, 0).expect("valid session");
    let root = session.root();
    assert_eq!(session.session_size(), 1);
    let view = session.get_state(root).unwrap();
    assert_eq!(view.as_bytes(), &[0u8]);
}

#[test_log::test]
fn distinct_moves_create_siblings() {
    let mut session = Session::begin_session(&state(0), STATESIZE, CMPSIZE).unwrap();
    let root = session.root();

    let s1 = state(1);
    let s2 = state(2);
    let a = session
        .add_position(Some(root), b'a' as i64, &s1, 0, CheckMode::Check)
        .unwrap();
    let b = session
        .add_position(Some(root), b'b' as i64, &s2, 0, CheckMode::Check)
        .unwrap();

    assert_ne!(a, b);
    assert_eq!(session.session_size(), 3);
    assert_eq!(session.get_state(a).unwrap().as_bytes(), s1.as_slice());
    assert_eq!(session.get_state(b).unwrap().as_bytes(), s2.as_slice());
    assert_eq!(session.nextcount(root), Some(2));
    assert_eq!(session.movecount(a), Some(1));
    assert_eq!(session.movecount(b), Some(1));
}

#[test_log::test]
fn equivalence_links_the_longer_path_to_the_shorter_one() {
    let mut session = Session::begin_session(&state(0), STATESIZE, CMPSIZE).unwrap();
    session.set_grafting(GraftMode::NoGraft);
    let root = session.root();

    let s_mid = state(1);
    let s_target = state(2);

    // root --a--> mid --a--> target (depth 2)
    let mid = session
        .add_position(Some(root), 1, &s_mid, 0, CheckMode::Check)
        .unwrap();
    let deep = session
        .add_position(Some(mid), 1, &s_target, 0, CheckMode::Check)
        .unwrap();

    // root --c--> target (depth 1, same state, shorter path)
    let shallow = session
        .add_position(Some(root), 3, &s_target, 0, CheckMode::Check)
        .unwrap();

    assert_eq!(session.session_size(), 4);
    assert_ne!(deep, shallow);
    // the deeper path is linked to the shallower one, not the reverse.
    assert_eq!(session.better(deep), Some(shallow));
    assert_eq!(session.better(shallow), None);
    assert_eq!(session.movecount(deep), Some(2));
    assert_eq!(session.movecount(shallow), Some(1));
}

#[test_log::test]
fn graft_promotes_a_shorter_path_and_transplants_the_subtree() {
    let mut session = Session::begin_session(&state(0), STATESIZE, CMPSIZE).unwrap();
    session.set_grafting(GraftMode::Graft);
    let root = session.root();

    // root --c--> n1 --c--> n2 --c--> n3, n3 has two children: 'a' and an
    // endpoint 'c'.
    let n1 = session
        .add_position(Some(root), 3, &state(1), 0, CheckMode::Check)
        .unwrap();
    let n2 = session
        .add_position(Some(n1), 3, &state(2), 0, CheckMode::Check)
        .unwrap();
    let n3 = session
        .add_position(Some(n2), 3, &state(3), 0, CheckMode::Check)
        .unwrap();
    let n3a = session
        .add_position(Some(n3), 1, &state(4), 0, CheckMode::Check)
        .unwrap();
    let n3c_endpoint = session
        .add_position(Some(n3), 3, &state(5), 1, CheckMode::Check)
        .unwrap();

    assert_eq!(session.session_size(), 6);

    // root --d--> n3_equivalent, the same state as n3 but one move deep.
    let new_n3 = session
        .add_position(Some(root), 4, &state(3), 0, CheckMode::Check)
        .unwrap();

    assert_eq!(session.session_size(), 7);
    assert_ne!(new_n3, n3);

    // n3 becomes a leaf; its former children now live under new_n3.
    assert_eq!(session.nextcount(n3), Some(0));
    assert_eq!(session.better(n3), Some(new_n3));
    assert_eq!(session.nextcount(new_n3), Some(2));
    assert_eq!(session.get_next(new_n3, 1), Some(n3a));
    assert_eq!(session.get_next(new_n3, 3), Some(n3c_endpoint));

    // the promoted, shorter path to the endpoint is now visible at the root.
    assert_eq!(session.solution_info(root), Some((1, 2)));
}

#[test_log::test]
fn endpoint_value_dominates_solution_length() {
    let mut session = Session::begin_session(&state(0), STATESIZE, CMPSIZE).unwrap();
    session.set_grafting(GraftMode::NoGraft);
    let root = session.root();

    // a length-4 solution with endpoint value 2.
    let mut cur = root;
    for i in 0u8..3 {
        let mv = i64::from(10 + i);
        cur = session
            .add_position(Some(cur), mv, &state(10 + i), 0, CheckMode::NoCheck)
            .unwrap();
    }
    session
        .add_position(Some(cur), 13, &state(13), 2, CheckMode::NoCheck)
        .unwrap();

    // a length-5 solution with endpoint value 3, branching from the root
    // on a different first move so the two paths don't collide.
    let mut cur = root;
    for i in 0u8..4 {
        let mv = i64::from(20 + i);
        cur = session
            .add_position(Some(cur), mv, &state(20 + i), 0, CheckMode::NoCheck)
            .unwrap();
    }
    session
        .add_position(Some(cur), 24, &state(24), 3, CheckMode::NoCheck)
        .unwrap();

    // the longer but higher-valued solution wins the root's cached record.
    assert_eq!(session.solution_info(root), Some((3, 5)));
}

#[test_log::test]
fn cycle_suppression_prunes_the_redundant_chain() {
    let mut session = Session::begin_session(&state(0), STATESIZE, CMPSIZE).unwrap();
    let root = session.root();

    let a = session
        .add_position(Some(root), 1, &state(1), 0, CheckMode::NoCheck)
        .unwrap();
    let b = session
        .add_position(Some(a), 2, &state(2), 0, CheckMode::NoCheck)
        .unwrap();
    let mut current = session
        .add_position(Some(b), 3, &state(3), 0, CheckMode::NoCheck)
        .unwrap();

    assert_eq!(session.session_size(), 4);

    let found = session.suppress_cycle(&mut current, &state(0), 3);
    assert!(found);
    assert_eq!(current, root);
    assert_eq!(session.session_size(), 1);
}
