//! Builds the process-lifetime magic tables, optionally caching them on disk.

use super::rays;
use super::search::find_magic;
use super::structs::{MagicEntry, MagicTable, MagicTables};
use once_cell::sync::OnceCell;
use rand::{RngCore, SeedableRng, rngs::StdRng};

#[cfg(feature = "deterministic_magic")]
const MAGIC_SEED: u64 = 0x45;

#[cfg(feature = "load_magic")]
const MAGIC_CACHE_PATH: &str = "magic.bin";

fn make_rng() -> StdRng {
    #[cfg(feature = "deterministic_magic")]
    {
        StdRng::seed_from_u64(MAGIC_SEED)
    }
    #[cfg(not(feature = "deterministic_magic"))]
    {
        let mut seed = [0u8; 32];
        rand::rng().fill_bytes(&mut seed);
        StdRng::from_seed(seed)
    }
}

/// Global accessor; first call builds (or loads) the tables.
pub fn tables() -> &'static MagicTables {
    static TABLES: OnceCell<MagicTables> = OnceCell::new();
    TABLES.get_or_init(load_or_generate)
}

fn load_or_generate() -> MagicTables {
    #[cfg(feature = "load_magic")]
    {
        if let Some(tables) = load_from_cache() {
            return tables;
        }
        let tables = generate();
        save_to_cache(&tables);
        return tables;
    }
    #[cfg(not(feature = "load_magic"))]
    generate()
}

#[cfg(feature = "load_magic")]
fn load_from_cache() -> Option<MagicTables> {
    let bytes = std::fs::read(MAGIC_CACHE_PATH).ok()?;
    bincode::deserialize(&bytes).ok()
}

#[cfg(feature = "load_magic")]
fn save_to_cache(tables: &MagicTables) {
    if let Ok(bytes) = bincode::serialize(tables) {
        let _ = std::fs::write(MAGIC_CACHE_PATH, bytes);
    }
}

pub fn generate() -> MagicTables {
    let mut rng = make_rng();

    #[cfg(feature = "cli")]
    let progress = indicatif::ProgressBar::new(128).with_message("building magic tables");
    #[cfg(feature = "cli")]
    progress.set_style(
        indicatif::ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
            .expect("static progress template"),
    );

    let mut build = |slider_attacks: fn(usize, u64) -> u64,
                     blocker_mask: fn(usize) -> u64|
     -> MagicTable {
        let mut entries = Vec::with_capacity(64);
        for sq in 0..64 {
            entries.push(build_entry(sq, blocker_mask(sq), slider_attacks, &mut rng));
            #[cfg(feature = "cli")]
            progress.inc(1);
        }
        MagicTable { entries }
    };

    let rook = build(rays::rook_attacks_slow, rays::rook_blocker_mask);
    let bishop = build(rays::bishop_attacks_slow, rays::bishop_blocker_mask);

    #[cfg(feature = "cli")]
    progress.finish_and_clear();

    MagicTables { rook, bishop }
}

fn build_entry(
    sq: usize,
    mask: u64,
    slider_attacks: fn(usize, u64) -> u64,
    rng: &mut StdRng,
) -> MagicEntry {
    let blockers = rays::enumerate_subsets(mask);
    let attacks: Vec<u64> = blockers.iter().map(|&b| slider_attacks(sq, b)).collect();
    let shift = 64 - mask.count_ones();

    let magic = find_magic(&blockers, &attacks, shift, rng)
        .expect("magic search exhausted its candidate budget");

    let mut table = vec![0u64; blockers.len()].into_boxed_slice();
    for (&blocker, &attack) in blockers.iter().zip(&attacks) {
        let index = (blocker.wrapping_mul(magic) >> shift) as usize;
        table[index] = attack;
    }

    MagicEntry { magic, shift, mask, table }
}
