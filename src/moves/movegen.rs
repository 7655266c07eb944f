//! Pseudo-legal move generation. Leaving the own king in check is not
//! filtered here; callers reject such moves after make. Two modes: all moves,
//! and noisy only (captures, en passant, promotions) for quiescence.

use crate::bitboard::{BitboardExt, FILE_A, FILE_H, RANK_1, RANK_3, RANK_6, RANK_8};
use crate::board::{
    CASTLE_BK, CASTLE_BQ, CASTLE_WK, CASTLE_WQ, Color, EMPTY, NO_COLOR, PieceType, Position,
    make_piece,
};
use crate::moves::attacks::{self, square_is_attacked};
use crate::moves::magic;
use crate::moves::types::{FLAG_CASTLE, FLAG_EN_PASSANT, FLAG_NORMAL, Move, MoveList, push_promotions};
use crate::square::Square;

pub fn generate_all(pos: &Position, moves: &mut MoveList) {
    generate(pos, moves, false);
}

pub fn generate_noisy(pos: &Position, moves: &mut MoveList) {
    generate(pos, moves, true);
}

fn generate(pos: &Position, moves: &mut MoveList, noisy_only: bool) {
    gen_pawn_moves(pos, moves, noisy_only);
    gen_piece_moves(pos, moves, PieceType::Knight, noisy_only);
    gen_piece_moves(pos, moves, PieceType::Bishop, noisy_only);
    gen_piece_moves(pos, moves, PieceType::Rook, noisy_only);
    gen_piece_moves(pos, moves, PieceType::Queen, noisy_only);
    gen_king_moves(pos, moves, noisy_only);
}

/// Push every destination in `bb` as a move from `to - shift`, expanding
/// last-rank destinations into the four promotions.
fn add_pawn_moves(moves: &mut MoveList, mut bb: u64, shift: i8) {
    while bb != 0 {
        let to = bb.pop_lsb();
        let from = Square::from_index((to as i8 - shift) as u8);
        let to = Square::from_index(to);
        if to.rank() == 0 || to.rank() == 7 {
            push_promotions(moves, from, to);
        } else {
            moves.push(Move::new(from, to, FLAG_NORMAL));
        }
    }
}

fn add_piece_moves(moves: &mut MoveList, from: Square, mut bb: u64) {
    while bb != 0 {
        moves.push(Move::new(from, Square::from_index(bb.pop_lsb()), FLAG_NORMAL));
    }
}

fn gen_pawn_moves(pos: &Position, moves: &mut MoveList, noisy_only: bool) {
    let us = pos.side_to_move;
    let them = us.opposite();
    let pawns = pos.pieces_of(PieceType::Pawn, us);
    let empty = pos.colors[NO_COLOR];

    let (push_shift, left_shift, right_shift): (i8, i8, i8) = match us {
        Color::White => (8, 7, 9),
        Color::Black => (-8, -9, -7),
    };

    let pushes = match us {
        Color::White => (pawns << 8) & empty,
        Color::Black => (pawns >> 8) & empty,
    };
    if noisy_only {
        // Only pushes that promote count as noisy.
        add_pawn_moves(moves, pushes & (RANK_1 | RANK_8), push_shift);
    } else {
        add_pawn_moves(moves, pushes, push_shift);
        let doubles = match us {
            Color::White => ((pushes & RANK_3) << 8) & empty,
            Color::Black => ((pushes & RANK_6) >> 8) & empty,
        };
        add_pawn_moves(moves, doubles, push_shift * 2);
    }

    // Captures; the enemy king is never a capture target.
    let targets = pos.colors[them.index()] & !pos.pieces[PieceType::King.index()];
    let (left, right) = match us {
        Color::White => (((pawns << 7) & !FILE_H), ((pawns << 9) & !FILE_A)),
        Color::Black => (((pawns >> 9) & !FILE_H), ((pawns >> 7) & !FILE_A)),
    };
    add_pawn_moves(moves, left & targets, left_shift);
    add_pawn_moves(moves, right & targets, right_shift);

    if let Some(ep) = pos.ep_square {
        let mut ep_attackers = attacks::tables().pawn[them.index()][ep.index() as usize] & pawns;
        while ep_attackers != 0 {
            let from = Square::from_index(ep_attackers.pop_lsb());
            moves.push(Move::new(from, ep, FLAG_EN_PASSANT));
        }
    }
}

fn gen_piece_moves(pos: &Position, moves: &mut MoveList, pt: PieceType, noisy_only: bool) {
    let us = pos.side_to_move;
    let occ = pos.occupied();
    let valid = !pos.colors[us.index()] & !pos.pieces[PieceType::King.index()];

    let mut pieces = pos.pieces_of(pt, us);
    while pieces != 0 {
        let from = Square::from_index(pieces.pop_lsb());
        let idx = from.index() as usize;
        let mut bb = match pt {
            PieceType::Knight => attacks::tables().knight[idx],
            PieceType::Bishop => magic::tables().bishop_attacks(idx, occ),
            PieceType::Rook => magic::tables().rook_attacks(idx, occ),
            PieceType::Queen => magic::tables().queen_attacks(idx, occ),
            _ => unreachable!("pawns and kings have dedicated generators"),
        } & valid;
        if noisy_only {
            bb &= pos.colors[us.opposite().index()];
        }
        add_piece_moves(moves, from, bb);
    }
}

fn gen_king_moves(pos: &Position, moves: &mut MoveList, noisy_only: bool) {
    let us = pos.side_to_move;
    let from = pos.king_square(us);
    let mut bb = attacks::tables().king[from.index() as usize]
        & !pos.colors[us.index()]
        & !pos.pieces[PieceType::King.index()];
    if noisy_only {
        bb &= pos.colors[us.opposite().index()];
    }
    add_piece_moves(moves, from, bb);

    if noisy_only || attacks::in_check(pos, us) {
        return;
    }

    // Castling: right intact, rook home, path empty, king transit unattacked.
    let rook = make_piece(PieceType::Rook, us);
    match us {
        Color::White => {
            if pos.squares[Square::E1.index() as usize] == make_piece(PieceType::King, us) {
                if pos.castling_rights & CASTLE_WK != 0
                    && pos.piece_code_at(Square::F1) == EMPTY
                    && pos.piece_code_at(Square::G1) == EMPTY
                    && pos.piece_code_at(Square::H1) == rook
                    && !square_is_attacked(pos, us, Square::F1)
                    && !square_is_attacked(pos, us, Square::G1)
                {
                    moves.push(Move::new(Square::E1, Square::G1, FLAG_CASTLE));
                }
                if pos.castling_rights & CASTLE_WQ != 0
                    && pos.piece_code_at(Square::D1) == EMPTY
                    && pos.piece_code_at(Square::C1) == EMPTY
                    && pos.piece_code_at(Square::B1) == EMPTY
                    && pos.piece_code_at(Square::A1) == rook
                    && !square_is_attacked(pos, us, Square::D1)
                    && !square_is_attacked(pos, us, Square::C1)
                {
                    moves.push(Move::new(Square::E1, Square::C1, FLAG_CASTLE));
                }
            }
        }
        Color::Black => {
            if pos.squares[Square::E8.index() as usize] == make_piece(PieceType::King, us) {
                if pos.castling_rights & CASTLE_BK != 0
                    && pos.piece_code_at(Square::F8) == EMPTY
                    && pos.piece_code_at(Square::G8) == EMPTY
                    && pos.piece_code_at(Square::H8) == rook
                    && !square_is_attacked(pos, us, Square::F8)
                    && !square_is_attacked(pos, us, Square::G8)
                {
                    moves.push(Move::new(Square::E8, Square::G8, FLAG_CASTLE));
                }
                if pos.castling_rights & CASTLE_BQ != 0
                    && pos.piece_code_at(Square::D8) == EMPTY
                    && pos.piece_code_at(Square::C8) == EMPTY
                    && pos.piece_code_at(Square::B8) == EMPTY
                    && pos.piece_code_at(Square::A8) == rook
                    && !square_is_attacked(pos, us, Square::D8)
                    && !square_is_attacked(pos, us, Square::C8)
                {
                    moves.push(Move::new(Square::E8, Square::C8, FLAG_CASTLE));
                }
            }
        }
    }
}
