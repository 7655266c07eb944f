//! Staged move picker. The hash move goes out before anything is generated;
//! a cutoff on it skips generation entirely. After that the full pseudo-legal
//! list is scored once, sorted, and yielded in order.

use crate::board::Position;
use crate::moves::execute::is_pseudo_legal;
use crate::moves::movegen::generate_all;
use crate::moves::types::{MAX_MOVES, Move, MoveList};
use crate::search::info::SearchInfo;
use crate::search::ordering::score_move;
use arrayvec::ArrayVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    HashMove,
    Generate,
    Pick,
    Done,
}

pub struct MovePicker {
    stage: Stage,
    hash_move: Move,
    ply: usize,
    moves: ArrayVec<(Move, i32), MAX_MOVES>,
    index: usize,
}

impl MovePicker {
    pub fn new(hash_move: Move, ply: usize) -> Self {
        MovePicker {
            stage: Stage::HashMove,
            hash_move,
            ply,
            moves: ArrayVec::new(),
            index: 0,
        }
    }

    /// Next pseudo-legal move in order, or the null sentinel when exhausted.
    /// Legality is the caller's problem (filtered after make).
    pub fn next(&mut self, pos: &Position, si: &SearchInfo) -> Move {
        loop {
            match self.stage {
                Stage::HashMove => {
                    self.stage = Stage::Generate;
                    // The stored move is validated before use so that a tag
                    // collision cannot smuggle in a corrupting move.
                    if !self.hash_move.is_null() && is_pseudo_legal(pos, self.hash_move) {
                        return self.hash_move;
                    }
                }
                Stage::Generate => {
                    let mut list = MoveList::new();
                    generate_all(pos, &mut list);
                    for &m in list.iter() {
                        let score = score_move(pos, si, m, self.ply, self.hash_move);
                        self.moves.push((m, score));
                    }
                    self.moves.sort_unstable_by_key(|&(_, score)| -(score as i64));
                    self.stage = Stage::Pick;
                }
                Stage::Pick => {
                    while self.index < self.moves.len() {
                        let (m, _) = self.moves[self.index];
                        self.index += 1;
                        // Already tried in the hash stage.
                        if m == self.hash_move {
                            continue;
                        }
                        return m;
                    }
                    self.stage = Stage::Done;
                }
                Stage::Done => return Move::NULL,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::execute::generate_legal;
    use crate::moves::types::move_from_uci;
    use std::str::FromStr;

    #[test]
    fn picker_yields_each_pseudo_legal_move_once() {
        let pos = Position::startpos();
        let si = SearchInfo::new();
        let mut picker = MovePicker::new(Move::NULL, 0);

        let mut seen = Vec::new();
        loop {
            let m = picker.next(&pos, &si);
            if m.is_null() {
                break;
            }
            assert!(!seen.contains(&m), "duplicate {m}");
            seen.push(m);
        }
        assert_eq!(seen.len(), 20);
    }

    #[test]
    fn hash_move_comes_first_and_is_not_repeated() {
        let pos = Position::startpos();
        let si = SearchInfo::new();
        let hash = move_from_uci(&pos, "e2e4").unwrap();
        let mut picker = MovePicker::new(hash, 0);

        assert_eq!(picker.next(&pos, &si), hash);
        loop {
            let m = picker.next(&pos, &si);
            if m.is_null() {
                break;
            }
            assert_ne!(m, hash);
        }
    }

    #[test]
    fn corrupt_hash_move_is_ignored() {
        let pos = Position::startpos();
        let si = SearchInfo::new();
        // A move with an empty origin square: must fail pseudo-legality.
        let garbage = Move::from_u16(0x0FFF);
        let mut picker = MovePicker::new(garbage, 0);
        let first = picker.next(&pos, &si);
        assert_ne!(first, garbage);
        assert!(!first.is_null());
    }

    #[test]
    fn picker_covers_all_legal_moves() {
        let mut pos =
            Position::from_str("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1")
                .unwrap();
        let si = SearchInfo::new();

        let mut legal = MoveList::new();
        generate_legal(&mut pos, &mut legal);

        let mut picker = MovePicker::new(Move::NULL, 0);
        let mut yielded = Vec::new();
        loop {
            let m = picker.next(&pos, &si);
            if m.is_null() {
                break;
            }
            yielded.push(m);
        }
        for m in legal.iter() {
            assert!(yielded.contains(m), "picker missed {m}");
        }
    }
}
