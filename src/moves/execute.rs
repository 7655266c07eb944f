//! Move application. `make` mutates the position and returns the undo record;
//! `unmake` restores it byte-for-byte. Calls must nest in strict LIFO order.

use crate::bitboard::{BitboardExt, FILE_A, FILE_H};
use crate::board::{
    CASTLE_BK, CASTLE_BQ, CASTLE_WK, CASTLE_WQ, Color, EMPTY, NO_COLOR, PieceType, Position,
    make_piece, piece_color, piece_type,
};
use crate::eval::psqt;
use crate::hash::zobrist;
use crate::moves::attacks::{self, in_check, square_is_attacked};
use crate::moves::magic;
use crate::moves::movegen::generate_all;
use crate::moves::types::{
    FLAG_CASTLE, FLAG_EN_PASSANT, FLAG_NORMAL, FLAG_PROMO_KNIGHT, Move, MoveList, NullUndo, Undo,
};
use crate::square::Square;

/// Mailbox + bitboard placement only; key and PSQT are untouched. Unmake
/// reverses placement with these and restores everything else wholesale.
#[inline(always)]
fn raw_place(pos: &mut Position, code: u8, sq: Square) {
    let idx = sq.index();
    debug_assert!(pos.squares[idx as usize] == EMPTY);
    pos.squares[idx as usize] = code;
    pos.pieces[piece_type(code).index()].set_bit(idx);
    pos.colors[piece_color(code).index()].set_bit(idx);
    pos.colors[NO_COLOR].clear_bit(idx);
}

#[inline(always)]
fn raw_remove(pos: &mut Position, sq: Square) -> u8 {
    let idx = sq.index();
    let code = pos.squares[idx as usize];
    debug_assert!(code != EMPTY);
    pos.squares[idx as usize] = EMPTY;
    pos.pieces[piece_type(code).index()].clear_bit(idx);
    pos.colors[piece_color(code).index()].clear_bit(idx);
    pos.colors[NO_COLOR].set_bit(idx);
    code
}

/// Placement plus incremental zobrist and PSQT accumulator updates.
#[inline(always)]
fn place_piece(pos: &mut Position, code: u8, sq: Square) {
    raw_place(pos, code, sq);
    pos.key ^= zobrist::keys().piece[code as usize][sq.index() as usize];
    let (mg, eg) = psqt::psqt_score(piece_type(code), psqt::psqt_square(sq, piece_color(code)));
    if piece_color(code) == Color::White {
        pos.psqt_mg += mg;
        pos.psqt_eg += eg;
    } else {
        pos.psqt_mg -= mg;
        pos.psqt_eg -= eg;
    }
}

#[inline(always)]
fn remove_piece(pos: &mut Position, sq: Square) -> u8 {
    let code = raw_remove(pos, sq);
    pos.key ^= zobrist::keys().piece[code as usize][sq.index() as usize];
    let (mg, eg) = psqt::psqt_score(piece_type(code), psqt::psqt_square(sq, piece_color(code)));
    if piece_color(code) == Color::White {
        pos.psqt_mg -= mg;
        pos.psqt_eg -= eg;
    } else {
        pos.psqt_mg += mg;
        pos.psqt_eg += eg;
    }
    code
}

/// Rook companion squares for a castling king destination.
#[inline(always)]
fn castle_rook_squares(king_to: Square) -> (Square, Square) {
    match king_to.index() {
        6 => (Square::H1, Square::F1),
        2 => (Square::A1, Square::D1),
        62 => (Square::H8, Square::F8),
        58 => (Square::A8, Square::D8),
        _ => unreachable!("castle flag with king destination {king_to}"),
    }
}

/// The castling right lost when a rook of `color` leaves or is captured on
/// `sq`. Zero when `sq` is not that color's rook home.
#[inline(always)]
fn rook_home_right(color: Color, sq: Square) -> u8 {
    match (color, sq.index()) {
        (Color::White, 0) => CASTLE_WQ,
        (Color::White, 7) => CASTLE_WK,
        (Color::Black, 56) => CASTLE_BQ,
        (Color::Black, 63) => CASTLE_BK,
        _ => 0,
    }
}

fn snapshot(pos: &Position, captured: u8) -> Undo {
    Undo {
        key: pos.key,
        ep_square: pos.ep_square,
        castling_rights: pos.castling_rights,
        halfmove_clock: pos.halfmove_clock,
        psqt_mg: pos.psqt_mg,
        psqt_eg: pos.psqt_eg,
        captured,
    }
}

/// XOR the old ep file out of the key and clear the square. Invariant: the
/// key contains an ep-file key exactly when `ep_square` is set.
#[inline(always)]
fn clear_ep(pos: &mut Position) {
    if let Some(ep) = pos.ep_square.take() {
        pos.key ^= zobrist::keys().ep_file[ep.file() as usize];
    }
}

#[inline(always)]
fn update_castling_rights(pos: &mut Position, mask_to_clear: u8) {
    let old = pos.castling_rights;
    let new = old & !mask_to_clear;
    if new != old {
        let keys = zobrist::keys();
        pos.key ^= keys.castling[old as usize] ^ keys.castling[new as usize];
        pos.castling_rights = new;
    }
}

pub fn make(pos: &mut Position, m: Move) -> Undo {
    debug_assert!(!m.is_null());

    let undo = match m.flag() {
        FLAG_NORMAL => make_normal(pos, m),
        FLAG_CASTLE => make_castle(pos, m),
        FLAG_EN_PASSANT => make_en_passant(pos, m),
        _ => make_promotion(pos, m),
    };

    pos.side_to_move = pos.side_to_move.opposite();
    pos.key ^= zobrist::keys().side_to_move;
    pos.move_num += 1;
    pos.history[pos.move_num] = pos.key;

    #[cfg(debug_assertions)]
    pos.assert_coherent();

    undo
}

fn make_normal(pos: &mut Position, m: Move) -> Undo {
    let us = pos.side_to_move;
    let from = m.from();
    let to = m.to();
    let mover = pos.piece_code_at(from);
    debug_assert!(mover != EMPTY && piece_color(mover) == us);

    let captured = pos.piece_code_at(to);
    let undo = snapshot(pos, captured);
    clear_ep(pos);

    if captured != EMPTY {
        remove_piece(pos, to);
    }
    remove_piece(pos, from);
    place_piece(pos, mover, to);

    let is_pawn = piece_type(mover) == PieceType::Pawn;
    pos.halfmove_clock = if is_pawn || captured != EMPTY {
        0
    } else {
        pos.halfmove_clock + 1
    };

    // A double push only leaves an ep square behind when an enemy pawn stands
    // next to the destination; otherwise the ep file would hash positions
    // apart that can never differ.
    if is_pawn && from.index().abs_diff(to.index()) == 16 {
        let to_bb = to.bb();
        let adjacent = ((to_bb << 1) & !FILE_A) | ((to_bb >> 1) & !FILE_H);
        let enemy_pawns = pos.pieces_of(PieceType::Pawn, us.opposite());
        if adjacent & enemy_pawns != 0 {
            let ep = Square::from_index((from.index() + to.index()) / 2);
            pos.ep_square = Some(ep);
            pos.key ^= zobrist::keys().ep_file[ep.file() as usize];
        }
    }

    let mut rights = 0u8;
    if piece_type(mover) == PieceType::King {
        rights |= match us {
            Color::White => CASTLE_WK | CASTLE_WQ,
            Color::Black => CASTLE_BK | CASTLE_BQ,
        };
    }
    if piece_type(mover) == PieceType::Rook {
        rights |= rook_home_right(us, from);
    }
    if captured != EMPTY && piece_type(captured) == PieceType::Rook {
        rights |= rook_home_right(us.opposite(), to);
    }
    update_castling_rights(pos, rights);

    undo
}

fn make_en_passant(pos: &mut Position, m: Move) -> Undo {
    let us = pos.side_to_move;
    let to = m.to();
    debug_assert!(pos.ep_square == Some(to));

    // The captured pawn sits behind the destination square.
    let cap_sq = Square::from_index(match us {
        Color::White => to.index() - 8,
        Color::Black => to.index() + 8,
    });
    let cap_code = pos.piece_code_at(cap_sq);
    debug_assert!(cap_code == make_piece(PieceType::Pawn, us.opposite()));

    let undo = snapshot(pos, cap_code);
    clear_ep(pos);

    remove_piece(pos, cap_sq);
    let pawn = remove_piece(pos, m.from());
    place_piece(pos, pawn, to);
    pos.halfmove_clock = 0;

    undo
}

fn make_castle(pos: &mut Position, m: Move) -> Undo {
    let us = pos.side_to_move;
    let undo = snapshot(pos, EMPTY);
    clear_ep(pos);

    let king = remove_piece(pos, m.from());
    place_piece(pos, king, m.to());

    let (rook_from, rook_to) = castle_rook_squares(m.to());
    let rook = remove_piece(pos, rook_from);
    place_piece(pos, rook, rook_to);

    pos.halfmove_clock += 1;
    update_castling_rights(
        pos,
        match us {
            Color::White => CASTLE_WK | CASTLE_WQ,
            Color::Black => CASTLE_BK | CASTLE_BQ,
        },
    );

    undo
}

fn make_promotion(pos: &mut Position, m: Move) -> Undo {
    let us = pos.side_to_move;
    let to = m.to();
    let promoted = make_piece(m.promotion().expect("promotion flag"), us);

    let captured = pos.piece_code_at(to);
    let undo = snapshot(pos, captured);
    clear_ep(pos);

    if captured != EMPTY {
        remove_piece(pos, to);
    }
    let pawn = remove_piece(pos, m.from());
    debug_assert!(piece_type(pawn) == PieceType::Pawn);
    place_piece(pos, promoted, to);
    pos.halfmove_clock = 0;

    if captured != EMPTY && piece_type(captured) == PieceType::Rook {
        update_castling_rights(pos, rook_home_right(us.opposite(), to));
    }

    undo
}

pub fn unmake(pos: &mut Position, m: Move, undo: &Undo) {
    pos.side_to_move = pos.side_to_move.opposite();
    let us = pos.side_to_move;

    pos.key = undo.key;
    pos.ep_square = undo.ep_square;
    pos.castling_rights = undo.castling_rights;
    pos.halfmove_clock = undo.halfmove_clock;
    pos.psqt_mg = undo.psqt_mg;
    pos.psqt_eg = undo.psqt_eg;
    pos.history[pos.move_num] = 0;
    pos.move_num -= 1;

    let from = m.from();
    let to = m.to();

    match m.flag() {
        FLAG_EN_PASSANT => {
            let pawn = raw_remove(pos, to);
            raw_place(pos, pawn, from);
            let cap_sq = Square::from_index(match us {
                Color::White => to.index() - 8,
                Color::Black => to.index() + 8,
            });
            raw_place(pos, undo.captured, cap_sq);
        }
        FLAG_CASTLE => {
            let king = raw_remove(pos, to);
            raw_place(pos, king, from);
            let (rook_from, rook_to) = castle_rook_squares(to);
            let rook = raw_remove(pos, rook_to);
            raw_place(pos, rook, rook_from);
        }
        FLAG_NORMAL => {
            let mover = raw_remove(pos, to);
            raw_place(pos, mover, from);
            if undo.captured != EMPTY {
                raw_place(pos, undo.captured, to);
            }
        }
        _ => {
            raw_remove(pos, to);
            raw_place(pos, make_piece(PieceType::Pawn, us), from);
            if undo.captured != EMPTY {
                raw_place(pos, undo.captured, to);
            }
        }
    }

    #[cfg(debug_assertions)]
    pos.assert_coherent();
}

/// Flip the side to move without touching any piece. Used by null-move
/// pruning; a set ep square leaves the key along with the square.
pub fn make_null(pos: &mut Position) -> NullUndo {
    let undo = NullUndo {
        key: pos.key,
        ep_square: pos.ep_square,
    };
    clear_ep(pos);
    pos.side_to_move = pos.side_to_move.opposite();
    pos.key ^= zobrist::keys().side_to_move;
    undo
}

pub fn unmake_null(pos: &mut Position, undo: &NullUndo) {
    pos.side_to_move = pos.side_to_move.opposite();
    pos.key = undo.key;
    pos.ep_square = undo.ep_square;
}

/// Cheap validation of a move pulled from the transposition table before it
/// is made, so a tag collision cannot corrupt the position.
pub fn is_pseudo_legal(pos: &Position, m: Move) -> bool {
    if m.is_null() {
        return false;
    }

    let us = pos.side_to_move;
    let from = m.from();
    let to = m.to();
    let mover = pos.piece_code_at(from);
    if mover == EMPTY || piece_color(mover) != us {
        return false;
    }
    let pt = piece_type(mover);

    let to_bb = to.bb();
    if pos.colors[us.index()] & to_bb != 0 {
        return false;
    }
    if pos.pieces_of(PieceType::King, us.opposite()) & to_bb != 0 {
        return false;
    }

    match m.flag() {
        FLAG_CASTLE => is_pseudo_legal_castle(pos, m, pt),
        FLAG_EN_PASSANT => {
            pt == PieceType::Pawn
                && pos.ep_square == Some(to)
                && attacks::tables().pawn[us.index()][from.index() as usize] & to_bb != 0
        }
        flag => {
            if pt == PieceType::Pawn {
                let last_rank = to.rank() == 0 || to.rank() == 7;
                if (flag >= FLAG_PROMO_KNIGHT) != last_rank {
                    return false;
                }
                is_pseudo_legal_pawn(pos, from, to)
            } else {
                if flag >= FLAG_PROMO_KNIGHT {
                    return false;
                }
                let occ = pos.occupied();
                let reach = match pt {
                    PieceType::Knight => attacks::tables().knight[from.index() as usize],
                    PieceType::Bishop => magic::tables().bishop_attacks(from.index() as usize, occ),
                    PieceType::Rook => magic::tables().rook_attacks(from.index() as usize, occ),
                    PieceType::Queen => magic::tables().queen_attacks(from.index() as usize, occ),
                    PieceType::King => attacks::tables().king[from.index() as usize],
                    PieceType::Pawn => unreachable!(),
                };
                reach & to_bb != 0
            }
        }
    }
}

fn is_pseudo_legal_pawn(pos: &Position, from: Square, to: Square) -> bool {
    let us = pos.side_to_move;
    let to_bb = to.bb();
    let diff = to.index() as i16 - from.index() as i16;
    let (push, double): (i16, i16) = match us {
        Color::White => (8, 16),
        Color::Black => (-8, -16),
    };

    if attacks::tables().pawn[us.index()][from.index() as usize] & to_bb != 0 {
        // Diagonal: must capture an enemy piece.
        return pos.colors[us.opposite().index()] & to_bb != 0;
    }
    if diff == push {
        return pos.colors[NO_COLOR] & to_bb != 0;
    }
    if diff == double {
        let start_rank = if us == Color::White { 1 } else { 6 };
        let middle = Square::from_index(((from.index() as i16 + push) as u8).min(63));
        return from.rank() == start_rank
            && pos.colors[NO_COLOR] & middle.bb() != 0
            && pos.colors[NO_COLOR] & to_bb != 0;
    }
    false
}

fn is_pseudo_legal_castle(pos: &Position, m: Move, pt: PieceType) -> bool {
    let us = pos.side_to_move;
    if pt != PieceType::King {
        return false;
    }
    let home = if us == Color::White { Square::E1 } else { Square::E8 };
    if m.from() != home {
        return false;
    }

    let (right, rook_home, empties, transit): (u8, Square, &[Square], [Square; 2]) =
        match (us, m.to().index()) {
            (Color::White, 6) => (
                CASTLE_WK,
                Square::H1,
                &[Square::F1, Square::G1],
                [Square::F1, Square::G1],
            ),
            (Color::White, 2) => (
                CASTLE_WQ,
                Square::A1,
                &[Square::B1, Square::C1, Square::D1],
                [Square::D1, Square::C1],
            ),
            (Color::Black, 62) => (
                CASTLE_BK,
                Square::H8,
                &[Square::F8, Square::G8],
                [Square::F8, Square::G8],
            ),
            (Color::Black, 58) => (
                CASTLE_BQ,
                Square::A8,
                &[Square::B8, Square::C8, Square::D8],
                [Square::D8, Square::C8],
            ),
            _ => return false,
        };

    pos.castling_rights & right != 0
        && pos.piece_code_at(rook_home) == make_piece(PieceType::Rook, us)
        && empties.iter().all(|&sq| pos.piece_code_at(sq) == EMPTY)
        && !in_check(pos, us)
        && transit.iter().all(|&sq| !square_is_attacked(pos, us, sq))
}

/// Pseudo-legal generation followed by the make/unmake legality filter.
/// Convenience for perft, game-end detection and tests; the search filters
/// inline instead.
pub fn generate_legal(pos: &mut Position, moves: &mut MoveList) {
    let mut pseudo = MoveList::new();
    generate_all(pos, &mut pseudo);
    moves.clear();
    for &m in pseudo.iter() {
        let mover = pos.side_to_move;
        let undo = make(pos, m);
        let legal = !in_check(pos, mover);
        unmake(pos, m, &undo);
        if legal {
            moves.push(m);
        }
    }
}
