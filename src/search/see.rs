//! Static exchange evaluation: does the side to move come out of the capture
//! sequence on `m.to()` at least `threshold` centipawns ahead?

use crate::bitboard::BitboardExt;
use crate::board::{Color, PieceType, Position};
use crate::moves::attacks::{attackers_to, smallest_attacker};
use crate::moves::magic;
use crate::moves::types::Move;
use crate::square::Square;

/// Exchange values; knight and bishop count the same so that NxB, BxN swaps
/// read as even. The king's entry only matters when it is the first mover:
/// it makes any capture into a defended square fail.
pub const SEE_VALUES: [i32; 6] = [100, 400, 400, 650, 1350, 20_000];

pub trait SeeExt {
    fn see(&self, m: Move, threshold: i32) -> bool;
    fn see_move_value(&self, m: Move) -> i32;
}

impl SeeExt for Position {
    /// Immediate material swing of the move before any recapture: the victim,
    /// plus the promotion upgrade, plus the ep pawn.
    fn see_move_value(&self, m: Move) -> i32 {
        let mut value = match self.piece_type_at(m.to()) {
            Some(pt) => SEE_VALUES[pt.index()],
            None => 0,
        };
        if let Some(promo) = m.promotion() {
            value += SEE_VALUES[promo.index()] - SEE_VALUES[PieceType::Pawn.index()];
        }
        if m.is_en_passant() {
            value += SEE_VALUES[PieceType::Pawn.index()];
        }
        value
    }

    fn see(&self, m: Move, threshold: i32) -> bool {
        let us = self.side_to_move;
        let from = m.from();
        let to = m.to();

        // The piece standing on the target after the first capture.
        let mut next_victim = match m.promotion() {
            Some(promo) => promo,
            None => self
                .piece_type_at(from)
                .expect("SEE probed with an empty origin square"),
        };

        let mut balance = self.see_move_value(m) - threshold;
        if balance < 0 {
            return false;
        }
        // Winning the exchange even if the capturer is lost for nothing.
        balance -= SEE_VALUES[next_victim.index()];
        if balance >= 0 {
            return true;
        }

        let diag_sliders =
            self.pieces[PieceType::Bishop.index()] | self.pieces[PieceType::Queen.index()];
        let orth_sliders =
            self.pieces[PieceType::Rook.index()] | self.pieces[PieceType::Queen.index()];

        let mut occupied = self.occupied() ^ from.bb() ^ to.bb();
        if m.is_en_passant() {
            let cap_sq = match us {
                Color::White => to.index() - 8,
                Color::Black => to.index() + 8,
            };
            occupied ^= Square::from_index(cap_sq).bb();
        }

        let mut attackers = attackers_to(self, to, occupied);
        let mut side = us.opposite();

        loop {
            let our_attackers = attackers & self.colors[side.index()];
            if our_attackers == 0 {
                break;
            }
            let attacker = smallest_attacker(self, our_attackers)
                .expect("nonempty attacker set has a smallest piece");

            occupied ^= 1u64
                << (our_attackers & self.pieces[attacker.index()]).lsb();

            // Captures may uncover sliders stacked behind the attacker.
            if matches!(attacker, PieceType::Pawn | PieceType::Bishop | PieceType::Queen) {
                attackers |=
                    magic::tables().bishop_attacks(to.index() as usize, occupied) & diag_sliders;
            }
            if matches!(attacker, PieceType::Rook | PieceType::Queen) {
                attackers |=
                    magic::tables().rook_attacks(to.index() as usize, occupied) & orth_sliders;
            }

            side = side.opposite();
            attackers &= occupied;

            balance = -balance - 1 - SEE_VALUES[attacker.index()];
            next_victim = attacker;
            if balance >= 0 {
                // A king cannot profitably capture into defended territory.
                if next_victim == PieceType::King
                    && attackers & self.colors[side.index()] != 0
                {
                    side = side.opposite();
                }
                break;
            }
        }

        // Whoever is to move when the sequence stops has run out of profit.
        us != side
    }
}
