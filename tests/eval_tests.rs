use halcyon::board::Position;
use halcyon::eval::evaluate;
use halcyon::moves::execute::{make, unmake};
use halcyon::moves::types::move_from_uci;
use halcyon::search::search::MATE_IN_MAX;
use halcyon::search::tt::PawnHashTable;
use std::str::FromStr;

fn eval_fen(fen: &str) -> i32 {
    let pos = Position::from_str(fen).unwrap();
    let mut cache = PawnHashTable::new();
    evaluate(&pos, &mut cache)
}

#[test]
fn mirrored_positions_score_identically() {
    for (white_fen, black_fen) in [
        (
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0 1",
        ),
        (
            // White knight out vs the mirrored black knight out.
            "rnbqkbnr/pppppppp/8/8/8/5N2/PPPPPPPP/RNBQKB1R w KQkq - 0 1",
            "rnbqkb1r/pppppppp/5n2/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0 1",
        ),
    ] {
        assert_eq!(eval_fen(white_fen), eval_fen(black_fen));
    }
}

#[test]
fn material_dominates_positional_noise() {
    assert!(eval_fen("4k3/8/8/8/8/8/8/3QK3 w - - 0 1") > 900);
    assert!(eval_fen("4k3/8/8/8/8/8/8/3QK3 b - - 0 1") < -900);
    assert!(eval_fen("3rk3/8/8/8/8/8/8/4K3 w - - 0 1") < -400);
}

#[test]
fn bishop_pair_is_worth_something() {
    let pair = eval_fen("4k3/8/8/8/8/8/8/2B1KB2 w - - 0 1");
    let knight_and_bishop = eval_fen("4k3/8/8/8/8/8/8/2B1KN2 w - - 0 1");
    assert!(pair > knight_and_bishop - 40, "{pair} vs {knight_and_bishop}");
}

#[test]
fn rook_prefers_the_open_file() {
    // Rook on an open e-file vs buried behind its own pawn.
    let open = eval_fen("4k3/3p4/8/8/8/8/3P4/4RK2 w - - 0 1");
    let closed = eval_fen("4k3/3p4/8/8/8/8/4P3/4RK2 w - - 0 1");
    assert!(open > closed, "{open} vs {closed}");
}

#[test]
fn advanced_passer_outscores_a_fresh_one() {
    let far = eval_fen("4k3/8/2P5/8/8/8/8/4K3 w - - 0 1");
    let near = eval_fen("4k3/8/8/8/8/2P5/8/4K3 w - - 0 1");
    assert!(far > near, "{far} vs {near}");
}

#[test]
fn scores_are_bounded_by_mate_window() {
    for fen in [
        "QQQQk3/8/8/8/8/8/8/QQQQK3 w - - 0 1",
        "4k3/8/8/8/8/8/8/4K3 w - - 0 1",
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    ] {
        assert!(eval_fen(fen).abs() < MATE_IN_MAX);
    }
}

/// The spec's horizon scenario: the static eval before and after NxE5 must
/// differ, and quiescence must not trust the one-ply pawn grab.
#[test]
fn static_eval_moves_with_the_capture() {
    let mut pos = Position::from_str(
        "r1bqkb1r/pppp1ppp/2n2n2/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 4 4",
    )
    .unwrap();
    let mut cache = PawnHashTable::new();

    let before = evaluate(&pos, &mut cache);
    let nxe5 = move_from_uci(&pos, "f3e5").unwrap();
    let undo = make(&mut pos, nxe5);
    let after = evaluate(&pos, &mut cache);
    unmake(&mut pos, nxe5, &undo);

    assert_ne!(before, after);
    // After NxE5 black is to move and a pawn down on raw material.
    assert!(after < before, "{after} should read worse for black than {before} for white");
}
