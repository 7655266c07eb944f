//! Process-lifetime zobrist universe. The keys are drawn once at startup and
//! must never change afterwards: transposition-table entries persist across
//! searches and would alias under reseeded keys.

use once_cell::sync::OnceCell;
use rand::{RngCore, SeedableRng, rngs::StdRng};

#[cfg(feature = "deterministic_zobrist")]
const ZOBRIST_SEED: u64 = 0x9E37_79B9_AAAC_5C87;

pub struct ZobristKeys {
    /// `[piece code 0-11][square]`.
    pub piece: [[u64; 64]; 12],
    /// Indexed by the whole four-bit castling mask.
    pub castling: [u64; 16],
    /// a..h => 0..7.
    pub ep_file: [u64; 8],
    /// XORed in when black is to move.
    pub side_to_move: u64,
}

fn make_rng() -> StdRng {
    #[cfg(feature = "deterministic_zobrist")]
    {
        StdRng::seed_from_u64(ZOBRIST_SEED)
    }
    #[cfg(not(feature = "deterministic_zobrist"))]
    {
        let mut seed = [0u8; 32];
        rand::rng().fill_bytes(&mut seed);
        StdRng::from_seed(seed)
    }
}

pub fn keys() -> &'static ZobristKeys {
    static KEYS: OnceCell<ZobristKeys> = OnceCell::new();
    KEYS.get_or_init(|| generate(make_rng()))
}

fn generate(mut rng: StdRng) -> ZobristKeys {
    // Zero keys would make distinct features hash identically.
    let mut next = || loop {
        let v = rng.next_u64();
        if v != 0 {
            break v;
        }
    };

    let mut keys = ZobristKeys {
        piece: [[0; 64]; 12],
        castling: [0; 16],
        ep_file: [0; 8],
        side_to_move: 0,
    };
    for piece in keys.piece.iter_mut() {
        for key in piece.iter_mut() {
            *key = next();
        }
    }
    for key in keys.castling.iter_mut() {
        *key = next();
    }
    for key in keys.ep_file.iter_mut() {
        *key = next();
    }
    keys.side_to_move = next();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_stable_across_calls() {
        let a = keys() as *const ZobristKeys;
        let b = keys() as *const ZobristKeys;
        assert_eq!(a, b);
    }

    #[test]
    fn keys_are_nonzero_and_distinct_sample() {
        let k = keys();
        assert_ne!(k.side_to_move, 0);
        assert_ne!(k.piece[0][0], k.piece[0][1]);
        assert_ne!(k.castling[1], k.castling[2]);
        assert_ne!(k.ep_file[0], k.ep_file[7]);
    }
}
