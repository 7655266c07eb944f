//! Move scoring for the staged picker and the quiescence sort.
//!
//! The score bands, top to bottom: hash move, winning/even noisy moves
//! (MVV-LVA), killers, quiets by history, losing captures.

use crate::board::{EMPTY, Position, piece_type};
use crate::moves::types::Move;
use crate::search::info::{HISTORY_MAX, SearchInfo};
use crate::search::see::{SEE_VALUES, SeeExt};

pub const HASH_MOVE_SCORE: i32 = i32::MAX - 1;
pub const BAD_CAPTURE_SCORE: i32 = i32::MIN + 1;
const KILLER_SCORES: [i32; 4] = [-1, -2, -3, -4];
/// Keeps every quiet strictly below the worst killer score.
const QUIET_BASE: i32 = -HISTORY_MAX - 5;

#[inline]
pub fn is_noisy(pos: &Position, m: Move) -> bool {
    pos.piece_code_at(m.to()) != EMPTY || m.is_en_passant() || m.is_promotion()
}

/// MVV-LVA with the SEE value table; knight and bishop share an attacker
/// index so minor-for-minor trades tie.
pub fn score_noisy(pos: &Position, m: Move) -> i32 {
    let attacker = piece_type(pos.piece_code_at(m.from()));
    let attacker_index = match attacker {
        crate::board::PieceType::Bishop => crate::board::PieceType::Knight.index() as i32,
        other => other.index() as i32,
    };

    let victim_value = if m.is_en_passant() {
        SEE_VALUES[0]
    } else {
        match pos.piece_type_at(m.to()) {
            Some(victim) => SEE_VALUES[victim.index()],
            None => 0,
        }
    };

    let mut score = victim_value - attacker_index;
    if let Some(promo) = m.promotion() {
        score += SEE_VALUES[promo.index()];
    }
    score * 100
}

pub fn score_move(pos: &Position, si: &SearchInfo, m: Move, ply: usize, hash_move: Move) -> i32 {
    if m == hash_move {
        return HASH_MOVE_SCORE;
    }

    if is_noisy(pos, m) {
        return if pos.see(m, 0) {
            score_noisy(pos, m)
        } else {
            BAD_CAPTURE_SCORE
        };
    }

    if si.killer(0, ply) == m {
        return KILLER_SCORES[0];
    }
    if si.killer(1, ply) == m {
        return KILLER_SCORES[1];
    }
    if ply >= 2 {
        if si.killer(0, ply - 2) == m {
            return KILLER_SCORES[2];
        }
        if si.killer(1, ply - 2) == m {
            return KILLER_SCORES[3];
        }
    }

    let mover = piece_type(pos.piece_code_at(m.from()));
    QUIET_BASE + si.history_score(pos.side_to_move, mover, m.to().index())
}
