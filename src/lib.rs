pub mod bitboard;
pub mod board;
pub mod eval;
pub mod hash;
#[cfg(feature = "cli")]
pub mod logger;
pub mod moves;
pub mod search;
pub mod square;
pub mod uci;

/// Force every process-lifetime table before the first command is handled:
/// zobrist keys, non-slider attack tables, magic tables, pawn masks and the
/// LMR reduction table. Search and movegen assume these are already built.
pub fn init() {
    hash::zobrist::keys();
    moves::attacks::tables();
    moves::magic::tables();
    search::search::lmr_table();
}
