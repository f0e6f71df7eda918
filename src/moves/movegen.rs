//! Fully legal move generation.
//!
//! Generation is monomorphized over the side to move and parameterized by
//! generation class (noisy / quiet / all). Legality is built in: king moves
//! avoid the enemy attack map (computed with our king off the board, so a
//! slider's ray is not cut short by the king it checks), double check emits
//! king moves only, single check restricts targets to capture or block
//! masks, and pinned pieces move only along their pin rays. The generator
//! caches the enemy attack map and checker set on the position; make
//! invalidates them.

use crate::bitboard::{BitboardExt, RANK_1, RANK_2, RANK_4, RANK_5, RANK_7, RANK_8};
use crate::board::{
    BLACK, CASTLE_BK, CASTLE_BQ, CASTLE_WK, CASTLE_WQ, Color, OCC, Piece, PieceType, Position,
    WHITE, WHITE_OCC,
};
use crate::board::{
    BKC_KING_SQUARES, BKC_SQUARES, BQC_KING_SQUARES, BQC_SQUARES, WKC_KING_SQUARES, WKC_SQUARES,
    WQC_KING_SQUARES, WQC_SQUARES,
};
use crate::moves::attacks::{
    attacks, bishop_attacks_from, knight_attacks_from, pawn_attacks_from, rook_attacks_from,
};
use crate::moves::types::{
    BISHOP_PROMOTION, BISHOP_PROMOTION_CAPTURE, CAPTURE_MOVE, DOUBLE_PAWN_PUSH,
    EN_PASSANT_CAPTURE, KING_CASTLE, KNIGHT_PROMOTION, KNIGHT_PROMOTION_CAPTURE, Move, MoveList,
    QUEEN_CASTLE, QUEEN_PROMOTION, QUEEN_PROMOTION_CAPTURE, QUIET_MOVE, ROOK_PROMOTION,
    ROOK_PROMOTION_CAPTURE, UNUSED_MOVE_TYPE_1, UNUSED_MOVE_TYPE_2, add_moves_from_bitboard,
};

/// What to generate: noisy covers captures and every promotion, quiet the
/// rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenClass {
    Noisy,
    Quiet,
    All,
}

impl GenClass {
    #[inline(always)]
    fn wants_quiet(self) -> bool {
        matches!(self, GenClass::Quiet | GenClass::All)
    }

    #[inline(always)]
    fn wants_noisy(self) -> bool {
        matches!(self, GenClass::Noisy | GenClass::All)
    }
}

pub fn generate_moves(pos: &mut Position, class: GenClass, moves: &mut MoveList) {
    match pos.side_to_move {
        Color::White => generate_sided::<WHITE>(pos, class, moves),
        Color::Black => generate_sided::<BLACK>(pos, class, moves),
    }
}

pub fn generate_legal(pos: &mut Position, moves: &mut MoveList) {
    generate_moves(pos, GenClass::All, moves);
}

/// All squares attacked by the enemy of `SIDE`, with our king removed from
/// the occupancy.
pub fn enemy_attack_map<const SIDE: usize>(pos: &Position) -> u64 {
    let enemy = 1 - SIDE;
    let tables = attacks();
    let occ_no_king = pos.bitboards[OCC] & !pos.bitboards[PieceType::King.id(SIDE)];

    let mut map = if enemy == WHITE {
        pawn_attacks_from::<WHITE>(pos.bitboards[PieceType::Pawn.id(enemy)])
    } else {
        pawn_attacks_from::<BLACK>(pos.bitboards[PieceType::Pawn.id(enemy)])
    };
    map |= knight_attacks_from(pos.bitboards[PieceType::Knight.id(enemy)]);
    map |= bishop_attacks_from(
        pos.bitboards[PieceType::Bishop.id(enemy)] | pos.bitboards[PieceType::Queen.id(enemy)],
        occ_no_king,
    );
    map |= rook_attacks_from(
        pos.bitboards[PieceType::Rook.id(enemy)] | pos.bitboards[PieceType::Queen.id(enemy)],
        occ_no_king,
    );
    map |= tables.king[pos.king_square(Color::from_index(enemy))];

    map
}

/// Enemy pieces of `SIDE` giving check to the king on `king_sq`.
fn checkers_of<const SIDE: usize>(pos: &Position, king_sq: usize) -> u64 {
    let enemy = 1 - SIDE;
    let tables = attacks();
    let occ = pos.bitboards[OCC];

    let mut checkers = tables.knight[king_sq] & pos.bitboards[PieceType::Knight.id(enemy)];
    checkers |= tables.pawn_attacks[SIDE][king_sq] & pos.bitboards[PieceType::Pawn.id(enemy)];
    checkers |= tables.bishop_attacks(king_sq, occ)
        & (pos.bitboards[PieceType::Bishop.id(enemy)] | pos.bitboards[PieceType::Queen.id(enemy)]);
    checkers |= tables.rook_attacks(king_sq, occ)
        & (pos.bitboards[PieceType::Rook.id(enemy)] | pos.bitboards[PieceType::Queen.id(enemy)]);
    // needed when probing pseudolegal king moves
    checkers |= tables.king[king_sq] & pos.bitboards[PieceType::King.id(enemy)];

    checkers
}

fn in_check_sided<const SIDE: usize>(pos: &mut Position) -> bool {
    let for_side_to_move = SIDE == pos.side_to_move.index();

    if for_side_to_move && let Some(checkers) = pos.gen_cache.checkers {
        pos.in_check = checkers != 0;
        return pos.in_check;
    }

    let king_sq = pos.king_square(Color::from_index(SIDE));
    let checkers = checkers_of::<SIDE>(pos, king_sq);

    if for_side_to_move {
        pos.gen_cache.checkers = Some(checkers);
        pos.in_check = checkers != 0;
    }

    checkers != 0
}

/// Is the side to move in check? Updates the position's cache.
pub fn in_check(pos: &mut Position) -> bool {
    match pos.side_to_move {
        Color::White => in_check_sided::<WHITE>(pos),
        Color::Black => in_check_sided::<BLACK>(pos),
    }
}

/// Is the side that just moved still in check? (Legality filter.)
pub fn other_side_in_check(pos: &mut Position) -> bool {
    match pos.side_to_move {
        Color::White => in_check_sided::<BLACK>(pos),
        Color::Black => in_check_sided::<WHITE>(pos),
    }
}

fn generate_sided<const SIDE: usize>(pos: &mut Position, class: GenClass, moves: &mut MoveList) {
    let enemy = 1 - SIDE;
    let tables = attacks();

    let friendly_pawn = PieceType::Pawn.id(SIDE);
    let friendly_knight = PieceType::Knight.id(SIDE);
    let friendly_bishop = PieceType::Bishop.id(SIDE);
    let friendly_rook = PieceType::Rook.id(SIDE);
    let friendly_queen = PieceType::Queen.id(SIDE);
    let friendly_king = PieceType::King.id(SIDE);

    let enemy_bishop = PieceType::Bishop.id(enemy);
    let enemy_rook = PieceType::Rook.id(enemy);
    let enemy_queen = PieceType::Queen.id(enemy);

    let occ = pos.bitboards[OCC];
    let friendly_occ = pos.bitboards[WHITE_OCC + SIDE];
    let enemy_occ = pos.bitboards[WHITE_OCC + enemy];

    let enemy_attacks = match pos.gen_cache.enemy_attacks {
        Some(map) => map,
        None => {
            let map = enemy_attack_map::<SIDE>(pos);
            pos.gen_cache.enemy_attacks = Some(map);
            map
        }
    };

    let king_sq = pos.king_square(Color::from_index(SIDE));

    let checkers = match pos.gen_cache.checkers {
        Some(checkers) => checkers,
        None => {
            let checkers = checkers_of::<SIDE>(pos, king_sq);
            pos.gen_cache.checkers = Some(checkers);
            checkers
        }
    };

    // block mask: squares between the king and a checking slider
    let mut block_mask = 0u64;
    if checkers != 0 {
        let bishop_rays_from_king = tables.bishop_attacks(king_sq, occ);
        let rook_rays_from_king = tables.rook_attacks(king_sq, occ);
        let checking_bishops = checkers
            & bishop_rays_from_king
            & (pos.bitboards[enemy_bishop] | pos.bitboards[enemy_queen]);
        let checking_rooks = checkers
            & rook_rays_from_king
            & (pos.bitboards[enemy_rook] | pos.bitboards[enemy_queen]);

        block_mask = bishop_attacks_from(checking_bishops, occ) & bishop_rays_from_king;
        block_mask |= rook_attacks_from(checking_rooks, occ) & rook_rays_from_king;
    }

    let num_checks = checkers.count();
    pos.in_check = num_checks > 0;

    // king moves
    if class.wants_quiet() {
        add_moves_from_bitboard(
            king_sq as u8,
            tables.king[king_sq] & !enemy_attacks & !occ,
            QUIET_MOVE,
            moves,
        );
    }
    if class.wants_noisy() {
        add_moves_from_bitboard(
            king_sq as u8,
            tables.king[king_sq] & !enemy_attacks & enemy_occ,
            CAPTURE_MOVE,
            moves,
        );
    }

    // only king moves are legal under double check
    if num_checks >= 2 {
        return;
    }

    let mut capture_mask = checkers;
    if num_checks == 0 {
        block_mask = !0;
        capture_mask = !0;
    }

    // pinned pieces: shoot from the king, remove the first blockers, and
    // look again; enemy sliders on the xray are pinners

    // diagonal pins
    let blockers = tables.bishop_attacks(king_sq, occ) & occ;
    let xray = tables.bishop_attacks(king_sq, occ & !blockers);
    let pinners = xray & (pos.bitboards[enemy_bishop] | pos.bitboards[enemy_queen]);
    let pin_rays = bishop_attacks_from(pinners, occ & !blockers) & xray;
    let mut pinned_pieces = pin_rays & friendly_occ;

    if class.wants_noisy() {
        let promo_rank = if SIDE == WHITE { RANK_7 } else { RANK_2 };

        let mut pinned_promo_pawns = pinned_pieces & pos.bitboards[friendly_pawn] & promo_rank;
        while pinned_promo_pawns != 0 {
            let sq = pinned_promo_pawns.pop_lsb();
            let targets = tables.pawn_attacks[SIDE][sq as usize] & pinners & capture_mask;
            add_moves_from_bitboard(sq, targets, QUEEN_PROMOTION_CAPTURE, moves);
            add_moves_from_bitboard(sq, targets, ROOK_PROMOTION_CAPTURE, moves);
            add_moves_from_bitboard(sq, targets, BISHOP_PROMOTION_CAPTURE, moves);
            add_moves_from_bitboard(sq, targets, KNIGHT_PROMOTION_CAPTURE, moves);
        }

        let mut pinned_pawns = pinned_pieces & pos.bitboards[friendly_pawn] & !promo_rank;
        while pinned_pawns != 0 {
            let sq = pinned_pawns.pop_lsb();
            add_moves_from_bitboard(
                sq,
                tables.pawn_attacks[SIDE][sq as usize] & pinners & capture_mask,
                CAPTURE_MOVE,
                moves,
            );
            if pos.en_passant != 0 {
                add_moves_from_bitboard(
                    sq,
                    tables.pawn_attacks[SIDE][sq as usize]
                        & (1u64 << pos.en_passant)
                        & pin_rays
                        & capture_mask,
                    EN_PASSANT_CAPTURE,
                    moves,
                );
            }
        }
    }

    let mut pinned_diag_sliders =
        pinned_pieces & (pos.bitboards[friendly_bishop] | pos.bitboards[friendly_queen]);
    while pinned_diag_sliders != 0 {
        let sq = pinned_diag_sliders.pop_lsb();
        let attack = tables.bishop_attacks(sq as usize, occ);
        if class.wants_quiet() {
            add_moves_from_bitboard(sq, attack & pin_rays & block_mask & !occ, QUIET_MOVE, moves);
        }
        if class.wants_noisy() {
            add_moves_from_bitboard(sq, attack & pinners & capture_mask, CAPTURE_MOVE, moves);
        }
    }

    // orthogonal pins
    let blockers = tables.rook_attacks(king_sq, occ) & occ;
    let xray = tables.rook_attacks(king_sq, occ & !blockers);
    let pinners = xray & (pos.bitboards[enemy_rook] | pos.bitboards[enemy_queen]);
    let pin_rays = rook_attacks_from(pinners, occ & !blockers) & xray;
    let pinned_straight = pin_rays & friendly_occ;
    pinned_pieces |= pinned_straight;

    if class.wants_quiet() {
        let mut pinned_pawns = pinned_straight & pos.bitboards[friendly_pawn];
        while pinned_pawns != 0 {
            let sq = pinned_pawns.pop_lsb();
            add_moves_from_bitboard(
                sq,
                tables.pawn_pushes[SIDE][sq as usize] & pin_rays & block_mask & !occ,
                QUIET_MOVE,
                moves,
            );
            let double_push = if SIDE == WHITE {
                tables.pawn_double_pushes[SIDE][sq as usize]
                    & RANK_4
                    & pin_rays
                    & block_mask
                    & !occ
                    & !(occ << 8)
            } else {
                tables.pawn_double_pushes[SIDE][sq as usize]
                    & RANK_5
                    & pin_rays
                    & block_mask
                    & !occ
                    & !(occ >> 8)
            };
            add_moves_from_bitboard(sq, double_push, DOUBLE_PAWN_PUSH, moves);
        }
    }

    let mut pinned_straight_sliders =
        pinned_straight & (pos.bitboards[friendly_rook] | pos.bitboards[friendly_queen]);
    while pinned_straight_sliders != 0 {
        let sq = pinned_straight_sliders.pop_lsb();
        let attack = tables.rook_attacks(sq as usize, occ);
        if class.wants_quiet() {
            add_moves_from_bitboard(sq, attack & pin_rays & block_mask & !occ, QUIET_MOVE, moves);
        }
        if class.wants_noisy() {
            add_moves_from_bitboard(sq, attack & pinners & capture_mask, CAPTURE_MOVE, moves);
        }
    }

    // knights (a pinned knight never moves)
    let mut knights = pos.bitboards[friendly_knight] & !pinned_pieces;
    while knights != 0 {
        let sq = knights.pop_lsb();
        if class.wants_quiet() {
            add_moves_from_bitboard(
                sq,
                tables.knight[sq as usize] & !occ & block_mask,
                QUIET_MOVE,
                moves,
            );
        }
        if class.wants_noisy() {
            add_moves_from_bitboard(
                sq,
                tables.knight[sq as usize] & enemy_occ & capture_mask,
                CAPTURE_MOVE,
                moves,
            );
        }
    }

    // unpinned pawns, generated set-wise
    let pawns = pos.bitboards[friendly_pawn] & !pinned_pieces;

    let single_pushes;
    let mut double_pushes = 0u64;
    let mut left_attacks = 0u64;
    let mut right_attacks = 0u64;

    if SIDE == WHITE {
        single_pushes = pawns << 8 & block_mask & !occ;
        if class.wants_quiet() {
            double_pushes = (pawns & RANK_2) << 16 & block_mask & !occ & !(occ << 8);
        }
        if class.wants_noisy() {
            left_attacks = pawns << 7 & enemy_occ & capture_mask & !crate::bitboard::H_FILE;
            right_attacks = pawns << 9 & enemy_occ & capture_mask & !crate::bitboard::A_FILE;
        }
    } else {
        single_pushes = pawns >> 8 & block_mask & !occ;
        if class.wants_quiet() {
            double_pushes = (pawns & RANK_7) >> 16 & block_mask & !occ & !(occ >> 8);
        }
        if class.wants_noisy() {
            left_attacks = pawns >> 9 & enemy_occ & capture_mask & !crate::bitboard::H_FILE;
            right_attacks = pawns >> 7 & enemy_occ & capture_mask & !crate::bitboard::A_FILE;
        }
    }

    let promo_ranks = RANK_1 | RANK_8;
    let mut promotions = single_pushes & promo_ranks;
    let quiet_pushes = single_pushes & !promo_ranks;
    let mut left_promo_captures = left_attacks & promo_ranks;
    let mut right_promo_captures = right_attacks & promo_ranks;
    left_attacks &= !promo_ranks;
    right_attacks &= !promo_ranks;

    let push_delta: i8 = if SIDE == WHITE { 8 } else { -8 };
    let left_delta: i8 = if SIDE == WHITE { 7 } else { -9 };
    let right_delta: i8 = if SIDE == WHITE { 9 } else { -7 };

    if class.wants_quiet() {
        let mut double_pushes = double_pushes;
        while double_pushes != 0 {
            let to = double_pushes.pop_lsb();
            moves.add(Move::encode(
                (to as i8 - 2 * push_delta) as u8,
                to,
                DOUBLE_PAWN_PUSH,
            ));
        }
        let mut quiet_pushes = quiet_pushes;
        while quiet_pushes != 0 {
            let to = quiet_pushes.pop_lsb();
            moves.add(Move::encode((to as i8 - push_delta) as u8, to, QUIET_MOVE));
        }
    }

    if class.wants_noisy() {
        while promotions != 0 {
            let to = promotions.pop_lsb();
            let from = (to as i8 - push_delta) as u8;
            moves.add(Move::encode(from, to, QUEEN_PROMOTION));
            moves.add(Move::encode(from, to, KNIGHT_PROMOTION));
            moves.add(Move::encode(from, to, BISHOP_PROMOTION));
            moves.add(Move::encode(from, to, ROOK_PROMOTION));
        }

        for (targets, delta) in [
            (&mut left_promo_captures, left_delta),
            (&mut right_promo_captures, right_delta),
        ] {
            while *targets != 0 {
                let to = targets.pop_lsb();
                let from = (to as i8 - delta) as u8;
                moves.add(Move::encode(from, to, QUEEN_PROMOTION_CAPTURE));
                moves.add(Move::encode(from, to, KNIGHT_PROMOTION_CAPTURE));
                moves.add(Move::encode(from, to, BISHOP_PROMOTION_CAPTURE));
                moves.add(Move::encode(from, to, ROOK_PROMOTION_CAPTURE));
            }
        }

        for (targets, delta) in [(&mut left_attacks, left_delta), (&mut right_attacks, right_delta)]
        {
            while *targets != 0 {
                let to = targets.pop_lsb();
                moves.add(Move::encode((to as i8 - delta) as u8, to, CAPTURE_MOVE));
            }
        }

        // en passant
        if pos.en_passant != 0 {
            let ep_sq = pos.en_passant as usize;
            let captured_sq = if SIDE == WHITE { ep_sq - 8 } else { ep_sq + 8 };
            let mut ep_attackers = tables.pawn_attacks[enemy][ep_sq] & pawns;

            // legal while in check only when the double-pushed pawn is the
            // checker
            let resolves_check = tables.pawn_attacks[enemy][captured_sq]
                & pos.bitboards[friendly_king]
                != 0;
            if num_checks == 0 || resolves_check {
                let ep_rank = if SIDE == WHITE { RANK_5 } else { RANK_4 };
                while ep_attackers != 0 {
                    let from = ep_attackers.pop_lsb();
                    if pos.bitboards[friendly_king] & ep_rank != 0 {
                        // the classic fifth-rank pin: removing both pawns
                        // must not expose the king to a rook or queen
                        let cleared =
                            occ & !(1u64 << from) & !(1u64 << captured_sq);
                        let rays = tables.rook_attacks(king_sq, cleared);
                        if rays & (pos.bitboards[enemy_rook] | pos.bitboards[enemy_queen]) != 0 {
                            break;
                        }
                    }
                    moves.add(Move::encode(from, ep_sq as u8, EN_PASSANT_CAPTURE));
                }
            }
        }
    }

    // unpinned sliders
    let mut diag_sliders =
        (pos.bitboards[friendly_bishop] | pos.bitboards[friendly_queen]) & !pinned_pieces;
    while diag_sliders != 0 {
        let sq = diag_sliders.pop_lsb();
        let attack = tables.bishop_attacks(sq as usize, occ);
        if class.wants_quiet() {
            add_moves_from_bitboard(sq, attack & !occ & block_mask, QUIET_MOVE, moves);
        }
        if class.wants_noisy() {
            add_moves_from_bitboard(sq, attack & enemy_occ & capture_mask, CAPTURE_MOVE, moves);
        }
    }

    let mut straight_sliders =
        (pos.bitboards[friendly_rook] | pos.bitboards[friendly_queen]) & !pinned_pieces;
    while straight_sliders != 0 {
        let sq = straight_sliders.pop_lsb();
        let attack = tables.rook_attacks(sq as usize, occ);
        if class.wants_quiet() {
            add_moves_from_bitboard(sq, attack & !occ & block_mask, QUIET_MOVE, moves);
        }
        if class.wants_noisy() {
            add_moves_from_bitboard(sq, attack & enemy_occ & capture_mask, CAPTURE_MOVE, moves);
        }
    }

    // castling: never out of check, through attacked squares, or across
    // occupied ones. The rook's own square is not attack-checked.
    if class.wants_quiet() && num_checks == 0 {
        if SIDE == WHITE {
            if pos.has_castling(CASTLE_WK)
                && occ & WKC_SQUARES == 0
                && enemy_attacks & WKC_KING_SQUARES == 0
            {
                moves.add(Move::encode(4, 6, KING_CASTLE));
            }
            if pos.has_castling(CASTLE_WQ)
                && occ & WQC_SQUARES == 0
                && enemy_attacks & WQC_KING_SQUARES == 0
            {
                moves.add(Move::encode(4, 2, QUEEN_CASTLE));
            }
        } else {
            if pos.has_castling(CASTLE_BK)
                && occ & BKC_SQUARES == 0
                && enemy_attacks & BKC_KING_SQUARES == 0
            {
                moves.add(Move::encode(60, 62, KING_CASTLE));
            }
            if pos.has_castling(CASTLE_BQ)
                && occ & BQC_SQUARES == 0
                && enemy_attacks & BQC_KING_SQUARES == 0
            {
                moves.add(Move::encode(60, 58, QUEEN_CASTLE));
            }
        }
    }
}

/// Enemy pieces attacking `sq` for the current side to move. Used by the
/// castle-path probe of the pseudolegality check.
fn square_attackers(pos: &Position, sq: usize) -> u64 {
    let us = pos.side_to_move.index();
    let them = 1 - us;
    let tables = attacks();
    let occ = pos.bitboards[OCC];

    let mut attackers = tables.knight[sq] & pos.bitboards[PieceType::Knight.id(them)];
    attackers |= tables.pawn_attacks[us][sq] & pos.bitboards[PieceType::Pawn.id(them)];
    attackers |= tables.bishop_attacks(sq, occ)
        & (pos.bitboards[PieceType::Bishop.id(them)] | pos.bitboards[PieceType::Queen.id(them)]);
    attackers |= tables.rook_attacks(sq, occ)
        & (pos.bitboards[PieceType::Rook.id(them)] | pos.bitboards[PieceType::Queen.id(them)]);
    attackers |= tables.king[sq] & pos.bitboards[PieceType::King.id(them)];

    attackers
}

/// Decides, without making the move, whether a 16-bit move could have been
/// produced by the generator for this position — apart from leaving the
/// king in check, which `is_legal` verifies by a speculative make.
pub fn is_pseudo_legal(pos: &Position, mv: Move) -> bool {
    if mv.is_null() {
        return false;
    }

    let tables = attacks();
    let us = pos.side_to_move;
    let from_sq = mv.from_sq() as usize;
    let to_sq = mv.to_sq() as usize;
    let from_bb = 1u64 << from_sq;
    let to_bb = 1u64 << to_sq;
    let occ = pos.bitboards[OCC];

    let piece = pos.board[from_sq];
    if piece == Piece::None || piece.color() != us {
        return false;
    }
    let kind = piece.kind();

    let move_type = mv.move_type();
    if move_type == UNUSED_MOVE_TYPE_1 || move_type == UNUSED_MOVE_TYPE_2 {
        return false;
    }

    // target occupancy must fit the move class
    if mv.is_capture() && !mv.is_en_passant() {
        if to_bb & pos.occupancy(us.other()) == 0 {
            return false;
        }
        if pos.board[to_sq].kind() == PieceType::King {
            return false;
        }
    } else if !mv.is_en_passant() && to_bb & occ != 0 {
        return false;
    }

    match kind {
        PieceType::Pawn => {
            if !mv.is_promotion() && to_bb & (RANK_1 | RANK_8) != 0 {
                return false;
            }
            if mv.is_capture() {
                if to_bb & tables.pawn_attacks[us.index()][from_sq] == 0 {
                    return false;
                }
            } else if to_bb & tables.pawn_pushes[us.index()][from_sq] == 0
                && !mv.is_double_pawn_push()
            {
                return false;
            }
        }
        PieceType::Knight => {
            if to_bb & tables.knight[from_sq] == 0 {
                return false;
            }
        }
        PieceType::Bishop => {
            if to_bb & tables.bishop_attacks(from_sq, occ) == 0 {
                return false;
            }
        }
        PieceType::Rook => {
            if to_bb & tables.rook_attacks(from_sq, occ) == 0 {
                return false;
            }
        }
        PieceType::Queen => {
            if to_bb & tables.queen_attacks(from_sq, occ) == 0 {
                return false;
            }
        }
        PieceType::King => {
            if !mv.is_castle() && to_bb & tables.king[from_sq] == 0 {
                return false;
            }
        }
    }

    if mv.is_promotion() {
        let back_rank = if us == Color::White { RANK_8 } else { RANK_1 };
        if kind != PieceType::Pawn || to_bb & back_rank == 0 {
            return false;
        }
    } else if mv.is_double_pawn_push() {
        if kind != PieceType::Pawn
            || to_bb & tables.pawn_double_pushes[us.index()][from_sq] == 0
            || tables.pawn_pushes[us.index()][from_sq] & occ != 0
        {
            return false;
        }
    } else if mv.is_en_passant() {
        if kind != PieceType::Pawn || pos.en_passant == 0 || to_sq != pos.en_passant as usize {
            return false;
        }
        if to_bb & tables.pawn_attacks[us.index()][from_sq] == 0 {
            return false;
        }
    } else if mv.is_castle() {
        if kind != PieceType::King {
            return false;
        }
        let side = us.index();
        let (right, path, king_path, rook_home) = if mv.move_type() == KING_CASTLE {
            (
                if side == WHITE { CASTLE_WK } else { CASTLE_BK },
                if side == WHITE { WKC_SQUARES } else { BKC_SQUARES },
                if side == WHITE {
                    WKC_KING_SQUARES | from_bb
                } else {
                    BKC_KING_SQUARES | from_bb
                },
                1u64 << (7 + 56 * side),
            )
        } else {
            (
                if side == WHITE { CASTLE_WQ } else { CASTLE_BQ },
                if side == WHITE { WQC_SQUARES } else { BQC_SQUARES },
                if side == WHITE {
                    WQC_KING_SQUARES | from_bb
                } else {
                    BQC_KING_SQUARES | from_bb
                },
                1u64 << (56 * side),
            )
        };
        let king_to = if mv.move_type() == KING_CASTLE { 6 } else { 2 } + 56 * side;
        if !pos.has_castling(right) || from_sq != 4 + 56 * side || to_sq != king_to {
            return false;
        }
        if occ & path != 0 || pos.bitboards[PieceType::Rook.id(side)] & rook_home == 0 {
            return false;
        }
        let mut probe = king_path;
        while probe != 0 {
            if square_attackers(pos, probe.pop_lsb() as usize) != 0 {
                return false;
            }
        }
    }

    true
}

/// Full legality: pseudolegal, then a speculative make/unmake to confirm
/// the king is not left in check.
pub fn is_legal(pos: &mut Position, mv: Move) -> bool {
    if !is_pseudo_legal(pos, mv) {
        return false;
    }
    pos.make(mv);
    let illegal = other_side_in_check(pos);
    pos.unmake();
    !illegal
}
