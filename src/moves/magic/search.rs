//! Random search for magic multipliers.

use rand::RngCore;

/// Sparse candidates (AND of three draws) collide far less often in the
/// high bits after multiplication.
#[inline(always)]
pub fn random_sparse_u64<R: RngCore>(rng: &mut R) -> u64 {
    rng.next_u64() & rng.next_u64() & rng.next_u64()
}

/// A candidate is valid when no two blocker subsets with different attack
/// sets map to the same table index.
pub fn candidate_is_valid(
    blockers: &[u64],
    attacks: &[u64],
    magic: u64,
    shift: u32,
    scratch: &mut [u64],
) -> bool {
    scratch.fill(u64::MAX);
    for (&blocker, &attack) in blockers.iter().zip(attacks) {
        let index = (blocker.wrapping_mul(magic) >> shift) as usize;
        if scratch[index] == u64::MAX {
            scratch[index] = attack;
        } else if scratch[index] != attack {
            return false;
        }
    }
    true
}

pub fn find_magic<R: RngCore>(
    blockers: &[u64],
    attacks: &[u64],
    shift: u32,
    rng: &mut R,
) -> Result<u64, String> {
    let mut scratch = vec![0u64; blockers.len()];
    for _ in 0..1_000_000 {
        let magic = random_sparse_u64(rng);
        if candidate_is_valid(blockers, attacks, magic, shift, &mut scratch) {
            return Ok(magic);
        }
    }
    Err("no valid magic number found after 1,000,000 candidates".to_string())
}
