//! UCI front end: line-oriented command handling, time allocation and the
//! long-algebraic move codec. Malformed input is dropped silently per UCI
//! convention; the engine never crashes on a bad line.

use crate::board::{Color, Position};
use crate::moves::attacks::in_check;
use crate::moves::execute::{generate_legal, is_pseudo_legal, make};
use crate::moves::perft::perft_divide;
use crate::moves::types::{MoveList, move_from_uci};
use crate::search::search::{MAX_PLY, Searcher};
use std::io::BufRead;
use std::time::Duration;
use tracing::warn;

const ENGINE_NAME: &str = "Halcyon 0.1";
const DEFAULT_TT_MB: usize = 64;

/// Safety buffer held back from every allocation so the engine cannot flag.
const TIME_BUFFER_MS: i64 = 50;

#[derive(Debug, Default, Clone, Copy)]
pub struct GoParams {
    pub wtime: Option<i64>,
    pub btime: Option<i64>,
    pub winc: Option<i64>,
    pub binc: Option<i64>,
    pub movestogo: Option<i64>,
    pub movetime: Option<i64>,
    pub depth: Option<i32>,
}

impl GoParams {
    pub fn parse(parts: &[&str]) -> Self {
        let mut params = GoParams::default();
        let mut iter = parts.iter().peekable();
        while let Some(&token) = iter.next() {
            let value = iter.peek().and_then(|v| v.parse::<i64>().ok());
            match token {
                "wtime" => params.wtime = value,
                "btime" => params.btime = value,
                "winc" => params.winc = value,
                "binc" => params.binc = value,
                "movestogo" => params.movestogo = value,
                "movetime" => params.movetime = value,
                "depth" => params.depth = value.map(|v| v as i32),
                _ => {}
            }
        }
        params
    }

    /// Compute the move budget for `side`, or None when nothing bounds the
    /// search (`go depth N` alone, or a bare `go`).
    pub fn allocate_time(&self, side: Color) -> Option<Duration> {
        let (time, inc) = match side {
            Color::White => (self.wtime, self.winc.unwrap_or(0)),
            Color::Black => (self.btime, self.binc.unwrap_or(0)),
        };

        if let Some(movetime) = self.movetime {
            return Some(clamp_ms(movetime - TIME_BUFFER_MS));
        }

        let time = time?;
        let alloc = match self.movestogo {
            Some(movestogo) => {
                time * 9 / (10 * (movestogo.max(1) + 5)) + inc * 9 / 10 - TIME_BUFFER_MS
            }
            None => (time + 20 * inc) / 35 - TIME_BUFFER_MS,
        };

        // Never budget more than the clock actually holds.
        Some(clamp_ms(alloc.min(time - TIME_BUFFER_MS)))
    }
}

fn clamp_ms(ms: i64) -> Duration {
    Duration::from_millis(ms.max(1) as u64)
}

/// Apply a `position` command. Returns the parsed position, or None when the
/// line is malformed (caller keeps the previous position).
pub fn parse_position(parts: &[&str]) -> Option<Position> {
    let mut pos = match parts.first() {
        Some(&"startpos") => Position::startpos(),
        Some(&"fen") => {
            let end = parts
                .iter()
                .position(|&p| p == "moves")
                .unwrap_or(parts.len());
            let fen = parts[1..end].join(" ");
            fen.parse().ok()?
        }
        _ => return None,
    };

    if let Some(idx) = parts.iter().position(|&p| p == "moves") {
        for text in &parts[idx + 1..] {
            match move_from_uci(&pos, text) {
                Some(m) if !m.is_null() && is_pseudo_legal(&pos, m) => {
                    make(&mut pos, m);
                }
                _ => {
                    // A bogus move invalidates everything after it; keep what
                    // was applied so far.
                    warn!("dropping unparseable move {text:?} in position command");
                    break;
                }
            }
        }
    }
    Some(pos)
}

fn handle_go(parts: &[&str], pos: &mut Position, searcher: &mut Searcher) {
    let params = GoParams::parse(parts);
    let limit = params
        .allocate_time(pos.side_to_move)
        .unwrap_or(Duration::MAX);
    let depth = params.depth.unwrap_or(MAX_PLY as i32 - 1);

    let best = searcher.iterative_deepening(pos, limit, depth);
    println!("bestmove {best}");
}

fn handle_perft(parts: &[&str], pos: &mut Position) {
    let Some(depth) = parts.first().and_then(|d| d.parse::<u32>().ok()) else {
        return;
    };
    let (rows, total) = perft_divide(pos, depth);
    for (m, nodes) in rows {
        println!("{m} {nodes}");
    }
    println!("Nodes: {total}");
}

/// The blocking UCI loop. Returns on `quit` or closed stdin.
pub fn run() {
    let mut pos = Position::startpos();
    let mut searcher = Searcher::new(DEFAULT_TT_MB);

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(&command) = parts.first() else {
            continue;
        };

        match command {
            "uci" => {
                println!("id name {ENGINE_NAME}");
                println!("id author the Halcyon developers");
                println!("uciok");
            }
            "isready" => println!("readyok"),
            "ucinewgame" => {
                pos = Position::startpos();
                searcher.reset();
            }
            "position" => {
                if let Some(new_pos) = parse_position(&parts[1..]) {
                    pos = new_pos;
                }
            }
            "go" => handle_go(&parts[1..], &mut pos, &mut searcher),
            "perft" => handle_perft(&parts[1..], &mut pos),
            "d" => println!("{pos}"),
            "quit" => break,
            _ => {}
        }
    }
}

/// True when the game is over for the side to move (no legal moves).
pub fn no_legal_moves(pos: &mut Position) -> bool {
    let mut moves = MoveList::new();
    generate_legal(pos, &mut moves);
    moves.is_empty()
}

/// Game verdict for a finished position; drives nothing in the engine but is
/// handy for harnesses built on the library.
pub fn terminal_verdict(pos: &mut Position) -> Option<&'static str> {
    if !no_legal_moves(pos) {
        return None;
    }
    if in_check(pos, pos.side_to_move) {
        Some("checkmate")
    } else {
        Some("stalemate")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn go_params_parse_mixed_tokens() {
        let params =
            GoParams::parse(&["wtime", "60000", "btime", "55000", "winc", "500", "depth", "9"]);
        assert_eq!(params.wtime, Some(60_000));
        assert_eq!(params.btime, Some(55_000));
        assert_eq!(params.winc, Some(500));
        assert_eq!(params.depth, Some(9));
        assert_eq!(params.movestogo, None);
    }

    #[test]
    fn movetime_is_used_directly() {
        let params = GoParams::parse(&["movetime", "2000"]);
        let alloc = params.allocate_time(Color::White).unwrap();
        assert_eq!(alloc, Duration::from_millis(1950));
    }

    #[test]
    fn movestogo_divides_the_clock() {
        let params = GoParams::parse(&["wtime", "60000", "winc", "1000", "movestogo", "20"]);
        let alloc = params.allocate_time(Color::White).unwrap().as_millis() as i64;
        // 0.9 * 60000 / 25 + 0.9 * 1000 - 50
        assert_eq!(alloc, 60_000 * 9 / 250 + 900 - 50);
    }

    #[test]
    fn sudden_death_formula() {
        let params = GoParams::parse(&["btime", "30000", "binc", "2000"]);
        let alloc = params.allocate_time(Color::Black).unwrap().as_millis() as i64;
        assert_eq!(alloc, (30_000 + 40_000) / 35 - 50);
    }

    #[test]
    fn allocation_never_exceeds_the_clock() {
        let params = GoParams::parse(&["wtime", "300", "winc", "10000"]);
        let alloc = params.allocate_time(Color::White).unwrap().as_millis() as i64;
        assert!(alloc <= 300 - TIME_BUFFER_MS);
        assert!(alloc >= 1);
    }

    #[test]
    fn depth_only_search_has_no_clock() {
        let params = GoParams::parse(&["depth", "6"]);
        assert!(params.allocate_time(Color::White).is_none());
    }

    #[test]
    fn position_startpos_with_moves() {
        let pos = parse_position(&["startpos", "moves", "e2e4", "e7e5", "g1f3"]).unwrap();
        assert_eq!(pos.side_to_move, Color::Black);
        assert_eq!(pos.move_num, 3);
    }

    #[test]
    fn position_fen_roundtrip() {
        let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        let parts: Vec<&str> = ["fen"].into_iter().chain(fen.split(' ')).collect();
        let pos = parse_position(&parts).unwrap();
        assert_eq!(pos.to_fen(), fen);
    }

    #[test]
    fn bad_moves_are_dropped_not_fatal() {
        // "e9e4" cannot parse; the applied prefix survives.
        let pos = parse_position(&["startpos", "moves", "e2e4", "e9e4", "d7d5"]).unwrap();
        assert_eq!(pos.move_num, 1);

        // A pseudo-illegal move (rook through pawns) is also dropped.
        let pos = parse_position(&["startpos", "moves", "a1a5"]).unwrap();
        assert_eq!(pos.move_num, 0);
    }

    #[test]
    fn verdicts() {
        let mut mate: Position = "6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1".parse().unwrap();
        assert_eq!(terminal_verdict(&mut mate), None);

        let mut stalemate: Position = "7k/5Q2/6K1/8/8/8/8/8 b - - 0 1".parse().unwrap();
        assert_eq!(terminal_verdict(&mut stalemate), Some("stalemate"));

        let mut mated: Position =
            "R5k1/5ppp/8/8/8/8/5PPP/6K1 b - - 0 1".parse().unwrap();
        assert_eq!(terminal_verdict(&mut mated), Some("checkmate"));
    }
}
