use halcyon::board::Position;
use halcyon::moves::execute::{make, unmake};
use halcyon::moves::types::move_from_uci;
use std::collections::HashSet;
use std::str::FromStr;

#[test]
fn different_positions_hash_differently() {
    // A handful of related positions; all keys must be pairwise distinct.
    let fens = [
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0 1",
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w Qkq - 0 1",
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQk - 0 1",
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w - - 0 1",
        "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1",
    ];
    let keys: HashSet<u64> = fens
        .iter()
        .map(|fen| Position::from_str(fen).unwrap().key)
        .collect();
    assert_eq!(keys.len(), fens.len());
}

#[test]
fn transpositions_reach_the_same_key() {
    let line_a = ["g1f3", "g8f6", "b1c3", "b8c6"];
    let line_b = ["b1c3", "b8c6", "g1f3", "g8f6"];

    let play = |line: &[&str]| {
        let mut pos = Position::startpos();
        for uci in line {
            let m = move_from_uci(&pos, uci).unwrap();
            make(&mut pos, m);
        }
        pos.key
    };

    assert_eq!(play(&line_a), play(&line_b));
}

#[test]
fn ep_opportunity_separates_otherwise_equal_positions() {
    // Same piece placement; one arrived by double push with a capturer in
    // place, the other cannot take en passant.
    let with_ep = Position::from_str("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1").unwrap();
    let without = Position::from_str("4k3/8/8/3pP3/8/8/8/4K3 w - - 0 1").unwrap();
    assert_ne!(with_ep.key, without.key);
}

#[test]
fn incremental_key_tracks_full_recompute_through_a_game() {
    let mut pos = Position::startpos();
    let line = [
        "e2e4", "c7c5", "g1f3", "d7d6", "d2d4", "c5d4", "f3d4", "g8f6", "b1c3", "a7a6", "c1g5",
        "e7e6", "f2f4", "f8e7", "d1f3", "d8c7", "e1c1", "b8d7",
    ];
    for uci in line {
        let m = move_from_uci(&pos, uci).unwrap();
        make(&mut pos, m);
        assert_eq!(pos.key, pos.compute_key_full(), "drift after {uci}");
    }

    // Walk the whole line back down.
    let mut replay = Position::startpos();
    let mut undos = Vec::new();
    for uci in line {
        let m = move_from_uci(&replay, uci).unwrap();
        let undo = make(&mut replay, m);
        undos.push((m, undo));
    }
    for (m, undo) in undos.into_iter().rev() {
        unmake(&mut replay, m, &undo);
        assert_eq!(replay.key, replay.compute_key_full());
    }
    assert_eq!(replay.key, Position::startpos().key);
}

#[test]
fn castling_key_uses_the_whole_mask() {
    // Removing one right at a time produces four further distinct keys.
    let masks = ["KQkq", "Qkq", "Kkq", "KQq", "KQk"];
    let keys: HashSet<u64> = masks
        .iter()
        .map(|m| {
            Position::from_str(&format!("r3k2r/8/8/8/8/8/8/R3K2R w {m} - 0 1"))
                .unwrap()
                .key
        })
        .collect();
    assert_eq!(keys.len(), masks.len());
}
