//! Perft: exact legal-move tree counts for movegen/make validation.

use crate::board::Position;
use crate::moves::attacks::in_check;
use crate::moves::execute::{make, unmake};
use crate::moves::movegen::generate_all;
use crate::moves::types::{Move, MoveList};
use tracing::info;

/// Node-count cache keyed by (zobrist key, depth). Always-replace; only used
/// by perft, never by the search.
pub struct PerftTable {
    entries: Vec<PerftEntry>,
    mask: usize,
}

#[derive(Clone, Copy)]
struct PerftEntry {
    key: u64,
    depth: u32,
    nodes: u64,
}

impl PerftTable {
    pub fn new() -> Self {
        let size = 1 << 20;
        PerftTable {
            entries: vec![
                PerftEntry {
                    key: 0,
                    depth: u32::MAX,
                    nodes: 0,
                };
                size
            ],
            mask: size - 1,
        }
    }

    #[inline]
    fn probe(&self, key: u64, depth: u32) -> Option<u64> {
        let entry = &self.entries[key as usize & self.mask];
        (entry.key == key && entry.depth == depth).then_some(entry.nodes)
    }

    #[inline]
    fn store(&mut self, key: u64, depth: u32, nodes: u64) {
        self.entries[key as usize & self.mask] = PerftEntry { key, depth, nodes };
    }
}

impl Default for PerftTable {
    fn default() -> Self {
        PerftTable::new()
    }
}

pub fn perft(pos: &mut Position, depth: u32) -> u64 {
    let mut cache = PerftTable::new();
    perft_inner(pos, depth, &mut cache)
}

fn perft_inner(pos: &mut Position, depth: u32, cache: &mut PerftTable) -> u64 {
    if depth == 0 {
        return 1;
    }
    if let Some(nodes) = cache.probe(pos.key, depth) {
        return nodes;
    }

    let mut moves = MoveList::new();
    generate_all(pos, &mut moves);

    let mut nodes = 0u64;
    for &m in moves.iter() {
        let mover = pos.side_to_move;
        let undo = make(pos, m);
        if !in_check(pos, mover) {
            nodes += perft_inner(pos, depth - 1, cache);
        }
        unmake(pos, m, &undo);
    }

    cache.store(pos.key, depth, nodes);
    nodes
}

/// Root perft with per-move subtotals, as printed by the `perft` command.
pub fn perft_divide(pos: &mut Position, depth: u32) -> (Vec<(Move, u64)>, u64) {
    let start = std::time::Instant::now();
    let mut cache = PerftTable::new();
    let mut moves = MoveList::new();
    generate_all(pos, &mut moves);

    let mut rows = Vec::with_capacity(moves.len());
    let mut total = 0u64;
    for &m in moves.iter() {
        let mover = pos.side_to_move;
        let undo = make(pos, m);
        if !in_check(pos, mover) {
            let nodes = if depth == 0 {
                1
            } else {
                perft_inner(pos, depth - 1, &mut cache)
            };
            rows.push((m, nodes));
            total += nodes;
        }
        unmake(pos, m, &undo);
    }

    info!(
        depth,
        total,
        ms = start.elapsed().as_millis() as u64,
        "perft divide finished"
    );
    (rows, total)
}
