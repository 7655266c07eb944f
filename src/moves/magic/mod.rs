//! Magic bitboards for sliding attacks: per square a blocker mask, a
//! multiplier and a shift map any occupancy to a precomputed attack set.

pub mod loader;
pub mod rays;
pub mod search;
pub mod structs;

pub use loader::tables;
pub use structs::{MagicEntry, MagicTable, MagicTables};
