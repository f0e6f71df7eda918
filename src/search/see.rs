//! Static exchange evaluation: a captures-only minimax of the exchange on
//! one square, computed with a swap list and xray refreshes instead of
//! make/unmake.

use crate::bitboard::BitboardExt;
use crate::board::{Color, PIECE_TYPES, Piece, PieceType, Position};
use crate::moves::attacks::attacks;
use crate::moves::execute::prev_pawn_square;
use crate::moves::types::Move;

pub const SEE_VALUES: [i32; 6] = [100, 300, 300, 500, 900, 100_000];
pub const SEE_MARGIN: i32 = 50;
pub const SEE_MULTIPLIER: i32 = 1000;

#[inline(always)]
fn value_of(kind: PieceType) -> i32 {
    SEE_VALUES[kind as usize]
}

/// Every piece of either side attacking `sq` under the given occupancy.
pub fn all_attackers_to(pos: &Position, sq: usize, occupancy: u64) -> u64 {
    let tables = attacks();

    let mut attackers = tables.knight[sq]
        & (pos.pieces(PieceType::Knight, Color::White) | pos.pieces(PieceType::Knight, Color::Black));
    attackers |= tables.pawn_attacks[1][sq] & pos.pieces(PieceType::Pawn, Color::White);
    attackers |= tables.pawn_attacks[0][sq] & pos.pieces(PieceType::Pawn, Color::Black);
    attackers |= tables.king[sq]
        & (pos.pieces(PieceType::King, Color::White) | pos.pieces(PieceType::King, Color::Black));

    let diag = pos.pieces(PieceType::Bishop, Color::White)
        | pos.pieces(PieceType::Bishop, Color::Black)
        | pos.pieces(PieceType::Queen, Color::White)
        | pos.pieces(PieceType::Queen, Color::Black);
    let orth = pos.pieces(PieceType::Rook, Color::White)
        | pos.pieces(PieceType::Rook, Color::Black)
        | pos.pieces(PieceType::Queen, Color::White)
        | pos.pieces(PieceType::Queen, Color::Black);

    attackers |= tables.bishop_attacks(sq, occupancy) & diag;
    attackers |= tables.rook_attacks(sq, occupancy) & orth;

    attackers & occupancy
}

fn refresh_diagonal(pos: &Position, sq: usize, occupancy: u64, attackers: &mut u64) {
    let diag = pos.pieces(PieceType::Bishop, Color::White)
        | pos.pieces(PieceType::Bishop, Color::Black)
        | pos.pieces(PieceType::Queen, Color::White)
        | pos.pieces(PieceType::Queen, Color::Black);
    *attackers |= attacks().bishop_attacks(sq, occupancy) & diag;
    *attackers &= occupancy;
}

fn refresh_orthogonal(pos: &Position, sq: usize, occupancy: u64, attackers: &mut u64) {
    let orth = pos.pieces(PieceType::Rook, Color::White)
        | pos.pieces(PieceType::Rook, Color::Black)
        | pos.pieces(PieceType::Queen, Color::White)
        | pos.pieces(PieceType::Queen, Color::Black);
    *attackers |= attacks().rook_attacks(sq, occupancy) & orth;
    *attackers &= occupancy;
}

/// Material gained by the move itself, and the value of the piece that
/// ends up on the target square.
fn initial_gain(pos: &Position, mv: Move) -> (i32, i32) {
    let to = mv.to_sq() as usize;

    let mut gain;
    let landing_kind;

    if mv.is_en_passant() {
        gain = value_of(PieceType::Pawn);
        landing_kind = PieceType::Pawn;
    } else {
        let captured = pos.board[to];
        gain = if captured == Piece::None {
            0
        } else {
            value_of(captured.kind())
        };
        landing_kind = pos.board[mv.from_sq() as usize].kind();
    }

    if let Some(promo) = mv.promo_kind() {
        gain += value_of(promo) - value_of(PieceType::Pawn);
        return (gain, value_of(promo));
    }

    (gain, value_of(landing_kind))
}

/// Exchange score of `mv` in centipawns, from the moving side's view.
pub fn see(pos: &Position, mv: Move) -> i32 {
    if mv.is_castle() {
        return 0;
    }

    let to = mv.to_sq() as usize;
    let from = mv.from_sq() as usize;
    let us = pos.side_to_move;
    let mut side = us.other();

    let mut occupancy = pos.occupied();
    let mut attackers = all_attackers_to(pos, to, occupancy);

    let (gain, landing_value) = initial_gain(pos, mv);
    let mut scores = [0i32; 32];
    scores[0] = gain;
    scores[1] = landing_value - scores[0];

    // play the first capture
    let from_bb = 1u64 << from;
    attackers &= !from_bb;
    occupancy &= !from_bb;

    let diag_xrayers = pos.pieces(PieceType::Pawn, Color::White)
        | pos.pieces(PieceType::Pawn, Color::Black)
        | pos.pieces(PieceType::Bishop, Color::White)
        | pos.pieces(PieceType::Bishop, Color::Black)
        | pos.pieces(PieceType::Queen, Color::White)
        | pos.pieces(PieceType::Queen, Color::Black);
    let orth_xrayers = pos.pieces(PieceType::Rook, Color::White)
        | pos.pieces(PieceType::Rook, Color::Black)
        | pos.pieces(PieceType::Queen, Color::White)
        | pos.pieces(PieceType::Queen, Color::Black);

    if mv.is_en_passant() {
        // the captured pawn leaves the board as well; only a rank or file
        // ray can open through its square toward the target
        occupancy &= !(1u64 << prev_pawn_square(to, us));
        refresh_orthogonal(pos, to, occupancy, &mut attackers);
    }

    if from_bb & diag_xrayers != 0 {
        refresh_diagonal(pos, to, occupancy, &mut attackers);
    }
    if from_bb & orth_xrayers != 0 {
        refresh_orthogonal(pos, to, occupancy, &mut attackers);
    }

    // swap the rest, least valuable attacker first
    let mut k = 2;
    loop {
        let mut attacker_bb = 0u64;
        let mut attacker_kind = PieceType::Pawn;
        for kind in PIECE_TYPES {
            let candidates = pos.pieces(kind, side) & attackers;
            if candidates != 0 {
                attacker_kind = kind;
                attacker_bb = 1u64 << candidates.lsb();
                break;
            }
        }
        if attacker_bb == 0 {
            break;
        }
        if k >= scores.len() {
            break;
        }

        scores[k] = value_of(attacker_kind) - scores[k - 1];
        occupancy &= !attacker_bb;

        if attacker_bb & diag_xrayers != 0 {
            refresh_diagonal(pos, to, occupancy, &mut attackers);
        }
        if attacker_bb & orth_xrayers != 0 {
            refresh_orthogonal(pos, to, occupancy, &mut attackers);
        }

        k += 1;
        side = side.other();
        attackers &= !attacker_bb;
    }

    // collapse the swap list: each side stands pat when capturing loses
    for i in (1..k - 1).rev() {
        scores[i - 1] = -(-scores[i - 1]).max(scores[i]);
    }

    scores[0]
}

/// Threshold form: `see(pos, mv) >= threshold`, with two early exits. The
/// exchange result can never exceed the immediate gain, and never falls
/// below the immediate gain minus the moving piece (the opponent
/// recaptures only when it pays).
pub fn see_ge(pos: &Position, mv: Move, threshold: i32) -> bool {
    if mv.is_castle() {
        return threshold <= 0;
    }

    let (gain, landing_value) = initial_gain(pos, mv);
    if gain < threshold {
        return false;
    }
    if gain - landing_value >= threshold {
        return true;
    }

    see(pos, mv) >= threshold
}
