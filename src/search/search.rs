//! Iterative-deepening alpha-beta search with aspiration windows, null-move
//! pruning, late-move reductions, futility pruning and a SEE-gated
//! quiescence tail.

use crate::board::{PieceType, Position, piece_type};
use crate::eval::evaluate;
use crate::moves::attacks::in_check;
use crate::moves::execute::{make, make_null, unmake, unmake_null};
use crate::moves::movegen::generate_noisy;
use crate::moves::types::{MAX_MOVES, Move};
use crate::search::info::SearchInfo;
use crate::search::ordering::{is_noisy, score_noisy};
use crate::search::picker::MovePicker;
use crate::search::see::{SEE_VALUES, SeeExt};
use crate::search::tt::{Bound, EvalHashTable, PawnHashTable, TranspositionTable};
use arrayvec::ArrayVec;
use once_cell::sync::Lazy;
use std::time::Duration;
use tracing::debug;

pub const MAX_PLY: usize = 64;

pub const MATE_SCORE: i32 = 64_000;
pub const MATE_IN_MAX: i32 = MATE_SCORE - MAX_PLY as i32;
pub const MATED_IN_MAX: i32 = -MATE_SCORE + MAX_PLY as i32;

const ASPIRATION_MIN_DEPTH: i32 = 5;
const ASPIRATION_WINDOW: i32 = 40;

const NULL_MOVE_MIN_DEPTH: i32 = 3;

const FUTILITY_MAX_DEPTH: i32 = 3;
const FUTILITY_MARGIN: i32 = 150;
const DELTA_MARGIN: i32 = 125;

const LMR_MIN_DEPTH: i32 = 3;
const LMP_MAX_DEPTH: i32 = 3;
const LMP_MOVES_PER_DEPTH: i32 = 7;

/// Reduction by (depth, moves searched), shaped 0.5 + ln(d)·ln(m)/2.
pub fn lmr_table() -> &'static [[i32; 64]; 64] {
    static TABLE: Lazy<[[i32; 64]; 64]> = Lazy::new(|| {
        let mut table = [[0i32; 64]; 64];
        for (depth, row) in table.iter_mut().enumerate().skip(1) {
            for (moves, r) in row.iter_mut().enumerate().skip(1) {
                *r = (0.5 + (depth as f64).ln() * (moves as f64).ln() / 2.0) as i32;
            }
        }
        table
    });
    &TABLE
}

/// Quiet pawn moves that must not be futility- or late-move-pruned: passed
/// pawns, and pushes deep into enemy territory.
fn is_dangerous_pawn_move(pos: &Position, m: Move) -> bool {
    let code = pos.piece_code_at(m.from());
    if piece_type(code) != PieceType::Pawn {
        return false;
    }
    let us = pos.side_to_move;
    let rel_to_rank = match us {
        crate::board::Color::White => m.to().rank(),
        crate::board::Color::Black => 7 - m.to().rank(),
    };
    if rel_to_rank >= 5 {
        return true;
    }
    let enemy_pawns = pos.pieces_of(PieceType::Pawn, us.opposite());
    crate::moves::attacks::tables().passed_pawn[us.index()][m.from().index() as usize]
        & enemy_pawns
        == 0
}

/// Largest swing a single noisy move could produce: the best enemy piece
/// still on the board, plus the promotion upgrade when one is in reach.
fn greatest_possible_gain(pos: &Position) -> i32 {
    let them = pos.side_to_move.opposite();
    let mut best = 0;
    for pt in [PieceType::Queen, PieceType::Rook, PieceType::Bishop, PieceType::Knight, PieceType::Pawn] {
        if pos.pieces_of(pt, them) != 0 {
            best = SEE_VALUES[pt.index()];
            break;
        }
    }
    let pre_promo = match pos.side_to_move {
        crate::board::Color::White => crate::bitboard::RANK_7,
        crate::board::Color::Black => crate::bitboard::RANK_2,
    };
    if pos.pieces_of(PieceType::Pawn, pos.side_to_move) & pre_promo != 0 {
        best += SEE_VALUES[PieceType::Queen.index()] - SEE_VALUES[PieceType::Pawn.index()];
    }
    best
}

/// All search state that persists across `go` commands within one game: the
/// transposition table, the small caches, and the killer/history tables.
pub struct Searcher {
    pub tt: TranspositionTable,
    pub pawn_hash: PawnHashTable,
    pub eval_hash: EvalHashTable,
    pub si: SearchInfo,
}

impl Searcher {
    pub fn new(tt_mb: usize) -> Self {
        Searcher {
            tt: TranspositionTable::new(tt_mb),
            pawn_hash: PawnHashTable::new(),
            eval_hash: EvalHashTable::new(),
            si: SearchInfo::new(),
        }
    }

    /// `ucinewgame`: drop everything learned from the previous game.
    pub fn reset(&mut self) {
        self.tt.clear();
        self.si = SearchInfo::new();
    }

    /// Iterative deepening driver. Emits one `info` line per completed
    /// iteration and returns the best move of the last completed one.
    pub fn iterative_deepening(
        &mut self,
        pos: &mut Position,
        limit: Duration,
        max_depth: i32,
    ) -> Move {
        self.si.new_search();
        self.si.start_clock(limit);

        let mut alpha = -MATE_SCORE;
        let mut beta = MATE_SCORE;
        let mut best_move = Move::NULL;
        let mut best_score = 0;

        let mut depth = 1;
        while depth <= max_depth.min(MAX_PLY as i32 - 1) {
            self.si.depth = depth;
            let score = self.search(pos, depth, 0, alpha, beta, true);

            // A partial iteration may be built on cut-off subtrees; discard.
            if self.si.aborted {
                break;
            }

            // Aspiration failed: reopen the window and redo the same depth.
            if score <= alpha || score >= beta {
                alpha = -MATE_SCORE;
                beta = MATE_SCORE;
                continue;
            }

            best_score = score;
            best_move = self.si.best_move;
            self.print_info(depth);
            debug!(
                depth,
                score,
                nodes = self.si.nodes + self.si.qnodes,
                fail_high = self.si.fail_high,
                fail_high_first = self.si.fail_high_first,
                "iteration complete"
            );

            if depth >= ASPIRATION_MIN_DEPTH {
                alpha = score - ASPIRATION_WINDOW;
                beta = score + ASPIRATION_WINDOW;
            }
            if score.abs() >= MATE_IN_MAX {
                break;
            }
            depth += 1;
        }

        self.si.score = best_score;
        self.si.best_move = best_move;
        self.tt.age_entries();
        best_move
    }

    fn print_info(&self, depth: i32) {
        let score = self.si.score;
        let score_text = if score > MATED_IN_MAX && score < MATE_IN_MAX {
            format!("cp {score}")
        } else if score > 0 {
            format!("mate {}", (MATE_SCORE - score + 1) / 2)
        } else {
            format!("mate -{}", (MATE_SCORE + score) / 2)
        };

        let pv: Vec<String> = self.si.pv_line().iter().map(|m| m.to_string()).collect();
        println!(
            "info score {score_text} depth {depth} seldepth {} nodes {} time {} pv {}",
            self.si.seldepth,
            self.si.nodes + self.si.qnodes,
            self.si.elapsed_ms(),
            pv.join(" ")
        );
    }

    #[inline]
    fn check_time(&mut self) {
        if self.si.depth > 1
            && (self.si.nodes + self.si.qnodes) & 1023 == 0
            && self.si.time_over()
        {
            self.si.aborted = true;
        }
    }

    fn search(
        &mut self,
        pos: &mut Position,
        mut depth: i32,
        ply: usize,
        mut alpha: i32,
        mut beta: i32,
        allow_null: bool,
    ) -> i32 {
        self.check_time();
        if self.si.aborted {
            return alpha;
        }

        let is_root = ply == 0;
        let is_pv = beta > alpha + 1;
        self.si.seldepth = self.si.seldepth.max(ply as i32);
        self.si.pv_reset(ply);

        let us = pos.side_to_move;
        let in_check_now = in_check(pos, us);

        // Check extension, or the quiescence tail at the frontier.
        if depth <= 0 {
            if in_check_now {
                depth = 1;
            } else {
                return self.qsearch(pos, ply, alpha, beta);
            }
        }

        if ply >= MAX_PLY - 1 {
            return evaluate(pos, &mut self.pawn_hash);
        }

        if !is_root {
            if pos.is_drawn_by_repetition() || pos.halfmove_clock >= 100 {
                return 0;
            }

            // Mate distance pruning: a shorter mate elsewhere bounds us.
            alpha = alpha.max(-MATE_SCORE + ply as i32);
            beta = beta.min(MATE_SCORE - ply as i32 - 1);
            if alpha >= beta {
                return alpha;
            }
        }

        // Probed even at the root: the cutoff is ignored there, but the
        // stored move seeds the ordering for the next iteration.
        let probe = self.tt.probe(pos.key, depth, alpha, beta, ply as i32);
        if let Some(score) = probe.score {
            if !is_pv && !is_root {
                return score;
            }
        }
        let hash_move = probe.mv;

        let eval = match probe.eval {
            Some(eval) => eval,
            None => evaluate(pos, &mut self.pawn_hash),
        };

        // Reverse futility: a static eval far above beta at shallow depth.
        if depth <= FUTILITY_MAX_DEPTH
            && !in_check_now
            && !is_root
            && eval - FUTILITY_MARGIN * depth > beta
        {
            return eval - FUTILITY_MARGIN * depth;
        }

        // Null move: hand over the turn; a reduced refutation search that
        // still clears beta means the real position is too good. Skipped
        // without minor/major material, where zugzwang lies.
        if allow_null
            && depth >= NULL_MOVE_MIN_DEPTH
            && !in_check_now
            && pos.has_non_pawn_material(us)
        {
            let r = (2 + depth / 6).min(4);
            let undo = make_null(pos);
            let score = -self.search(pos, depth - 1 - r, ply + 1, -beta, -beta + 1, false);
            unmake_null(pos, &undo);
            if self.si.aborted {
                return alpha;
            }
            if score >= beta {
                return score;
            }
        }

        let futile = depth <= FUTILITY_MAX_DEPTH
            && !in_check_now
            && !is_root
            && eval + FUTILITY_MARGIN * depth <= alpha;

        let mut picker = MovePicker::new(hash_move, ply);
        let mut best_move = Move::NULL;
        let mut bound = Bound::Upper;
        let mut moves_searched: i32 = 0;
        let mut quiet_count: i32 = 0;
        let mut quiets_tried: ArrayVec<(PieceType, u8), MAX_MOVES> = ArrayVec::new();

        loop {
            let m = picker.next(pos, &self.si);
            if m.is_null() {
                break;
            }

            let noisy = is_noisy(pos, m);
            let killer = self.si.is_killer(ply, m);
            let dangerous = !noisy && is_dangerous_pawn_move(pos, m);
            let mover_pt = piece_type(pos.piece_code_at(m.from()));

            let undo = make(pos, m);
            if in_check(pos, us) {
                unmake(pos, m, &undo);
                continue;
            }
            let gives_check = in_check(pos, pos.side_to_move);

            // Shallow pruning of quiet moves that cannot raise alpha.
            let prunable =
                !is_root && !noisy && !killer && !dangerous && !gives_check && moves_searched > 0;
            if prunable && futile {
                unmake(pos, m, &undo);
                continue;
            }
            if prunable
                && depth <= LMP_MAX_DEPTH
                && quiet_count > LMP_MOVES_PER_DEPTH * depth
            {
                unmake(pos, m, &undo);
                continue;
            }

            self.si.nodes += 1;

            let mut score = alpha + 1;
            if depth >= LMR_MIN_DEPTH
                && moves_searched >= 1
                && !in_check_now
                && !noisy
                && !gives_check
                && m != hash_move
            {
                let mut r = lmr_table()[depth.min(63) as usize][moves_searched.min(63) as usize];
                if killer {
                    r -= 1;
                }
                let r = r.clamp(0, depth - 1);
                if r > 0 {
                    score = -self.search(pos, depth - 1 - r, ply + 1, -alpha - 1, -alpha, true);
                }
            }
            if score > alpha {
                score = -self.search(pos, depth - 1, ply + 1, -beta, -alpha, true);
            }

            unmake(pos, m, &undo);
            if self.si.aborted {
                return alpha;
            }

            moves_searched += 1;
            if !noisy && !killer {
                quiet_count += 1;
            }

            if score >= beta {
                self.tt.store(pos.key, depth, score, Bound::Lower, eval, ply as i32, m);

                if !noisy {
                    self.si.push_killer(ply, m);
                    self.si.history_update(us, mover_pt, m.to().index(), depth * depth);
                    // Quiets tried earlier at this node failed to cut; push
                    // their history down.
                    for &(pt, to) in quiets_tried.iter() {
                        self.si.history_update(us, pt, to, -(depth * depth) / 2);
                    }
                }

                self.si.fail_high += 1;
                if moves_searched == 1 {
                    self.si.fail_high_first += 1;
                }
                return beta;
            }

            if !noisy && !quiets_tried.is_full() {
                quiets_tried.push((mover_pt, m.to().index()));
            }

            if score > alpha {
                alpha = score;
                best_move = m;
                bound = Bound::Exact;
                self.si.pv_update(ply, m);
            }
        }

        if moves_searched == 0 {
            return if in_check_now {
                -MATE_SCORE + ply as i32
            } else {
                0
            };
        }

        self.tt.store(pos.key, depth, alpha, bound, eval, ply as i32, best_move);

        if is_root {
            self.si.score = alpha;
            self.si.best_move = best_move;
        }
        alpha
    }

    fn qsearch(&mut self, pos: &mut Position, ply: usize, mut alpha: i32, beta: i32) -> i32 {
        self.si.qnodes += 1;
        self.check_time();
        if self.si.aborted {
            return alpha;
        }
        self.si.seldepth = self.si.seldepth.max(ply as i32);

        if pos.is_drawn_by_repetition() {
            return 0;
        }

        let eval = match self.eval_hash.probe(pos.key) {
            Some(eval) => eval,
            None => {
                let eval = evaluate(pos, &mut self.pawn_hash);
                self.eval_hash.store(pos.key, eval);
                eval
            }
        };

        if ply >= MAX_PLY {
            return eval;
        }

        // Stand pat: the side to move may simply decline to capture.
        if eval >= beta {
            return beta;
        }
        if eval > alpha {
            alpha = eval;
        }

        // Even the best available swing cannot reach alpha.
        if eval + greatest_possible_gain(pos) + DELTA_MARGIN < alpha {
            return eval;
        }

        let mut list = crate::moves::types::MoveList::new();
        generate_noisy(pos, &mut list);
        let mut scored: ArrayVec<(Move, i32), MAX_MOVES> = ArrayVec::new();
        for &m in list.iter() {
            scored.push((m, score_noisy(pos, m)));
        }
        scored.sort_unstable_by_key(|&(_, s)| -(s as i64));

        let us = pos.side_to_move;
        for &(m, _) in scored.iter() {
            // Per-move delta pruning; promotions swing too much to prune.
            if !m.is_promotion() {
                let victim = if m.is_en_passant() {
                    SEE_VALUES[PieceType::Pawn.index()]
                } else {
                    match pos.piece_type_at(m.to()) {
                        Some(pt) => SEE_VALUES[pt.index()],
                        None => 0,
                    }
                };
                if eval + DELTA_MARGIN + victim < alpha {
                    continue;
                }
            }

            if !pos.see(m, 0) {
                continue;
            }

            let undo = make(pos, m);
            if in_check(pos, us) {
                unmake(pos, m, &undo);
                continue;
            }
            let score = -self.qsearch(pos, ply + 1, -beta, -alpha);
            unmake(pos, m, &undo);
            if self.si.aborted {
                return alpha;
            }

            if score >= beta {
                return beta;
            }
            if score > alpha {
                alpha = score;
            }
        }

        alpha
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn best_move_at_depth(fen: &str, depth: i32) -> (Move, i32) {
        let mut pos = Position::from_str(fen).unwrap();
        let mut searcher = Searcher::new(16);
        let mv = searcher.iterative_deepening(&mut pos, Duration::MAX, depth);
        (mv, searcher.si.score)
    }

    #[test]
    fn finds_mate_in_one() {
        let (mv, score) = best_move_at_depth("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1", 4);
        assert_eq!(mv.to_string(), "a1a8");
        assert_eq!(score, MATE_SCORE - 1);
    }

    #[test]
    fn finds_scholars_mate() {
        // Qxf7 is mate on the spot: the bishop on c4 guards the queen and
        // the black king has no flight square.
        let (mv, score) = best_move_at_depth(
            "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4",
            5,
        );
        assert_eq!(mv.to_string(), "h5f7");
        assert_eq!(score, MATE_SCORE - 1);
    }

    #[test]
    fn stalemate_returns_zero_and_null_move() {
        let (mv, score) = best_move_at_depth("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1", 4);
        assert!(mv.is_null());
        assert_eq!(score, 0);
    }

    #[test]
    fn hanging_queen_gets_taken() {
        let (mv, _) = best_move_at_depth("4k3/8/8/3q4/4P3/8/8/4K3 w - - 0 1", 4);
        assert_eq!(mv.to_string(), "e4d5");
    }

    #[test]
    fn quiescence_sees_the_recapture() {
        // After Nxe5 the knight is lost to Nxe5; the static eval of the
        // parent must not equal a one-ply greedy capture line.
        let mut pos = Position::from_str(
            "r1bqkb1r/pppp1ppp/2n2n2/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 4 4",
        )
        .unwrap();
        let mut searcher = Searcher::new(16);
        let static_eval = evaluate(&pos, &mut searcher.pawn_hash);

        let nxe5 = crate::moves::types::move_from_uci(&pos, "f3e5").unwrap();
        let undo = make(&mut pos, nxe5);
        let after_capture = evaluate(&pos, &mut searcher.pawn_hash);
        unmake(&mut pos, nxe5, &undo);

        // One pawn up at face value.
        assert!(after_capture < -50, "black is a pawn down on material");

        let qscore = searcher.qsearch(&mut pos, 0, -MATE_SCORE, MATE_SCORE);
        assert!(
            qscore < static_eval + 50,
            "qsearch must not believe the pawn grab: {qscore} vs {static_eval}"
        );
    }

    #[test]
    fn depth_limited_search_is_deterministic() {
        let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        let run = || {
            let mut pos = Position::from_str(fen).unwrap();
            let mut searcher = Searcher::new(16);
            let mv = searcher.iterative_deepening(&mut pos, Duration::MAX, 5);
            (mv, searcher.si.nodes + searcher.si.qnodes)
        };
        let (mv_a, nodes_a) = run();
        let (mv_b, nodes_b) = run();
        assert_eq!(mv_a, mv_b);
        assert_eq!(nodes_a, nodes_b, "fixed-depth search may not depend on the clock");
    }

    #[test]
    fn search_scores_stay_bounded() {
        let (_, score) = best_move_at_depth("4k3/8/8/8/8/8/8/QQQ1K3 w - - 0 1", 4);
        assert!(score.abs() <= MATE_SCORE);
    }
}
