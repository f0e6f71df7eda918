//! Zobrist keys, generated once per process from a fixed seed so that every
//! process (and every worker thread) agrees on position hashes.

use once_cell::sync::OnceCell;
use rand::{RngCore, SeedableRng, rngs::StdRng};

const ZOBRIST_SEED: u64 = 0x9E37_79B9_AAAC_5C87;

pub struct ZobristKeys {
    /// [piece][square] with pieces 0..12 = kind + 6 * color. Row 12 is the
    /// empty-square sentinel and stays all zero so it can be XORed blindly.
    pub piece: [[u64; 64]; 13],
    /// Indexed by the en-passant square; slot 0 is zero ("no square").
    pub en_passant: [u64; 64],
    /// Indexed by the 4-bit castle-rights mask.
    pub castling: [u64; 16],
    /// XORed in when Black is to move.
    pub side: u64,
}

pub fn zobrist_keys() -> &'static ZobristKeys {
    static KEYS: OnceCell<ZobristKeys> = OnceCell::new();
    KEYS.get_or_init(generate_keys)
}

fn generate_keys() -> ZobristKeys {
    let mut rng = StdRng::seed_from_u64(ZOBRIST_SEED);

    let mut keys = ZobristKeys {
        piece: [[0u64; 64]; 13],
        en_passant: [0u64; 64],
        castling: [0u64; 16],
        side: 0,
    };

    for sq in 0..64 {
        keys.en_passant[sq] = rng.next_u64();
        for piece in 0..12 {
            keys.piece[piece][sq] = rng.next_u64();
        }
    }

    // square 0 can never be an en-passant square; a zero key lets "none"
    // hash as a no-op
    keys.en_passant[0] = 0;

    for mask in 0..16 {
        keys.castling[mask] = rng.next_u64();
    }

    keys.side = rng.next_u64();

    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_deterministic_and_distinct() {
        let keys = zobrist_keys();
        assert_eq!(keys.en_passant[0], 0);
        assert_eq!(keys.piece[12][17], 0);
        assert_ne!(keys.piece[0][0], keys.piece[0][1]);
        assert_ne!(keys.side, 0);
        // same seed, same keys
        let again = generate_keys();
        assert_eq!(again.side, keys.side);
        assert_eq!(again.piece[5][33], keys.piece[5][33]);
    }
}
