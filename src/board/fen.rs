//! FEN parsing and emission.

use super::{CASTLE_BK, CASTLE_BQ, CASTLE_WK, CASTLE_WQ, Color, EMPTY, PIECE_CHARS, Position};
use crate::square::Square;

impl Position {
    /// Reset and populate the whole position from a six-field FEN string.
    /// The halfmove clock defaults to 0 when missing; the fullmove field is
    /// accepted and ignored (the history ring restarts at the parsed
    /// position).
    pub fn set_fen(&mut self, fen: &str) -> Result<(), String> {
        let mut fields = fen.split_whitespace();
        let placement = fields.next().ok_or("empty FEN")?;
        let turn = fields.next().ok_or("FEN missing side to move")?;
        let castling = fields.next().ok_or("FEN missing castling field")?;
        let ep = fields.next().ok_or("FEN missing en-passant field")?;
        let halfmove = fields.next();

        self.clear();

        let mut rank = 7i32;
        let mut file = 0i32;
        for chr in placement.chars() {
            match chr {
                '/' => {
                    if file != 8 {
                        return Err(format!("short rank in FEN placement: {placement}"));
                    }
                    rank -= 1;
                    file = 0;
                }
                '1'..='8' => file += chr as i32 - '0' as i32,
                _ => {
                    let code = PIECE_CHARS
                        .iter()
                        .position(|&c| c == chr)
                        .filter(|&c| c < EMPTY as usize)
                        .ok_or_else(|| format!("bad piece char {chr:?} in FEN"))?;
                    if !(0..8).contains(&rank) || !(0..8).contains(&file) {
                        return Err(format!("FEN placement overflows the board: {placement}"));
                    }
                    self.set_square(code as u8, Square::from_coords(rank as u8, file as u8));
                    file += 1;
                }
            }
            if file > 8 {
                return Err(format!("long rank in FEN placement: {placement}"));
            }
        }
        if rank != 0 || file != 8 {
            return Err(format!("FEN placement has wrong shape: {placement}"));
        }

        // One king per side, no pawns on the back ranks; the evaluation and
        // move generator both rely on this.
        use super::PieceType;
        for color in [Color::White, Color::Black] {
            if self.pieces_of(PieceType::King, color).count_ones() != 1 {
                return Err(format!("FEN must have exactly one {color:?} king"));
            }
        }
        let back_ranks = crate::bitboard::RANK_1 | crate::bitboard::RANK_8;
        if self.pieces[PieceType::Pawn.index()] & back_ranks != 0 {
            return Err("FEN places a pawn on a back rank".to_string());
        }

        self.side_to_move = match turn {
            "w" => Color::White,
            "b" => Color::Black,
            _ => return Err(format!("bad side to move {turn:?}")),
        };
        if self.side_to_move == Color::Black {
            self.key ^= crate::hash::zobrist::keys().side_to_move;
        }

        if castling != "-" {
            for chr in castling.chars() {
                self.castling_rights |= match chr {
                    'K' => CASTLE_WK,
                    'Q' => CASTLE_WQ,
                    'k' => CASTLE_BK,
                    'q' => CASTLE_BQ,
                    _ => return Err(format!("bad castling char {chr:?}")),
                };
            }
        }
        self.key ^= crate::hash::zobrist::keys().castling[self.castling_rights as usize];

        if ep != "-" {
            let sq = Square::parse(ep).ok_or_else(|| format!("bad ep square {ep:?}"))?;
            self.ep_square = Some(sq);
            self.key ^= crate::hash::zobrist::keys().ep_file[sq.file() as usize];
        }

        self.halfmove_clock = match halfmove {
            Some(text) => text
                .parse()
                .map_err(|_| format!("bad halfmove clock {text:?}"))?,
            None => 0,
        };

        self.move_num = 0;
        self.history[0] = self.key;
        Ok(())
    }

    pub fn to_fen(&self) -> String {
        let mut fen = String::with_capacity(80);
        for rank in (0..8).rev() {
            let mut empties = 0;
            for file in 0..8 {
                let code = self.squares[(rank * 8 + file) as usize];
                if code == EMPTY {
                    empties += 1;
                } else {
                    if empties > 0 {
                        fen.push((b'0' + empties) as char);
                        empties = 0;
                    }
                    fen.push(PIECE_CHARS[code as usize]);
                }
            }
            if empties > 0 {
                fen.push((b'0' + empties) as char);
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(if self.side_to_move == Color::White { 'w' } else { 'b' });

        fen.push(' ');
        if self.castling_rights == 0 {
            fen.push('-');
        } else {
            for (bit, chr) in [
                (CASTLE_WK, 'K'),
                (CASTLE_WQ, 'Q'),
                (CASTLE_BK, 'k'),
                (CASTLE_BQ, 'q'),
            ] {
                if self.castling_rights & bit != 0 {
                    fen.push(chr);
                }
            }
        }

        fen.push(' ');
        match self.ep_square {
            Some(sq) => fen.push_str(&sq.to_string()),
            None => fen.push('-'),
        }

        fen.push_str(&format!(" {} 1", self.halfmove_clock));
        fen
    }
}
