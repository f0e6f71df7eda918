//! Make and unmake. Every branch pushes an undo record first, keeps the
//! bitboards, occupancies, mailbox and incremental Zobrist key coherent,
//! and invalidates the movegen cache. Unmake restores the prior key from
//! the record instead of recomputing.

use crate::board::{Color, GenCache, Piece, PieceType, Position, Undo, WHITE_OCC, OCC};
use crate::hash::zobrist::zobrist_keys;
use crate::moves::attacks::attacks;
use crate::moves::types::{
    CAPTURE_MOVE, DOUBLE_PAWN_PUSH, EN_PASSANT_CAPTURE, KING_CASTLE, Move, NULL_MOVE,
    QUEEN_CASTLE, QUIET_MOVE,
};

/// The square the captured pawn sits on for an en-passant capture to
/// `to_sq`, which is also the square a double push passed over.
#[inline(always)]
pub fn prev_pawn_square(to_sq: usize, side: Color) -> usize {
    if side == Color::White {
        to_sq - 8
    } else {
        to_sq + 8
    }
}

impl Position {
    #[inline(always)]
    fn move_piece<const UPDATE_KEY: bool>(&mut self, from: usize, to: usize, piece: Piece) {
        if UPDATE_KEY {
            let keys = zobrist_keys();
            self.z_key ^= keys.piece[piece.index()][from];
            self.z_key ^= keys.piece[piece.index()][to];
        }
        let mask = (1u64 << from) | (1u64 << to);
        self.bitboards[piece.index()] ^= mask;
        self.bitboards[WHITE_OCC + piece.color().index()] ^= mask;
        self.bitboards[OCC] ^= mask;
        self.board[from] = Piece::None;
        self.board[to] = piece;
    }

    #[inline(always)]
    fn remove_piece<const UPDATE_KEY: bool>(&mut self, sq: usize, piece: Piece) {
        if UPDATE_KEY {
            self.z_key ^= zobrist_keys().piece[piece.index()][sq];
        }
        let mask = 1u64 << sq;
        self.bitboards[piece.index()] ^= mask;
        self.bitboards[WHITE_OCC + piece.color().index()] &= !mask;
        self.bitboards[OCC] &= !mask;
        self.board[sq] = Piece::None;
    }

    #[inline(always)]
    fn place_piece<const UPDATE_KEY: bool>(&mut self, sq: usize, piece: Piece) {
        if UPDATE_KEY {
            self.z_key ^= zobrist_keys().piece[piece.index()][sq];
        }
        let mask = 1u64 << sq;
        self.bitboards[piece.index()] ^= mask;
        self.bitboards[WHITE_OCC + piece.color().index()] ^= mask;
        self.bitboards[OCC] ^= mask;
        self.board[sq] = piece;
    }

    pub fn make(&mut self, mv: Move) {
        debug_assert!(!mv.is_null());
        let keys = zobrist_keys();
        let us = self.side_to_move;
        let from = mv.from_sq() as usize;
        let to = mv.to_sq() as usize;
        let move_type = mv.move_type();
        let piece = self.board[from];
        debug_assert!(piece != Piece::None, "no piece on {} in {}", from, self.to_fen());

        let mut undo = Undo {
            mv,
            piece_moved: piece,
            captured: Piece::None,
            castle_rights: self.castle_rights,
            en_passant: self.en_passant,
            fifty_move: self.fifty_move,
            z_key: self.z_key,
            in_check: self.in_check,
            gen_cache: self.gen_cache,
        };
        self.gen_cache = GenCache::default();

        if self.en_passant != 0 {
            self.z_key ^= keys.en_passant[self.en_passant as usize];
            self.en_passant = 0;
        }

        match move_type {
            QUIET_MOVE => {
                self.move_piece::<true>(from, to, piece);
            }
            CAPTURE_MOVE => {
                let captured = self.board[to];
                debug_assert!(captured.kind() != PieceType::King);
                undo.captured = captured;
                self.remove_piece::<true>(to, captured);
                self.move_piece::<true>(from, to, piece);
            }
            DOUBLE_PAWN_PUSH => {
                self.move_piece::<true>(from, to, piece);
                // expose the ep square only when an enemy pawn can take
                // there, so unreachable ep squares never enter the hash
                let ep = prev_pawn_square(to, us);
                let capturers = attacks().pawn_attacks[us.index()][ep]
                    & self.bitboards[PieceType::Pawn.id(us.other().index())];
                if capturers != 0 {
                    self.en_passant = ep as u8;
                    self.z_key ^= keys.en_passant[ep];
                }
            }
            KING_CASTLE => {
                debug_assert!(piece.kind() == PieceType::King);
                let rook = Piece::new(PieceType::Rook, us);
                self.move_piece::<true>(from, to, piece);
                self.move_piece::<true>(7 + 56 * us.index(), 5 + 56 * us.index(), rook);
            }
            QUEEN_CASTLE => {
                let rook = Piece::new(PieceType::Rook, us);
                self.move_piece::<true>(from, to, piece);
                self.move_piece::<true>(56 * us.index(), 3 + 56 * us.index(), rook);
            }
            EN_PASSANT_CAPTURE => {
                let captured = Piece::new(PieceType::Pawn, us.other());
                undo.captured = captured;
                self.remove_piece::<true>(prev_pawn_square(to, us), captured);
                self.move_piece::<true>(from, to, piece);
            }
            _ => {
                // the four promotion tags and their capture variants
                let promoted = Piece::new(
                    mv.promo_kind().expect("promotion tag carries a piece"),
                    us,
                );
                if mv.is_capture() {
                    let captured = self.board[to];
                    undo.captured = captured;
                    self.remove_piece::<true>(to, captured);
                }
                self.remove_piece::<true>(from, piece);
                self.place_piece::<true>(to, promoted);
            }
        }

        // castle rights survive only while king and rook sit at home
        if self.castle_rights != 0 {
            use crate::board::{CASTLE_BK, CASTLE_BQ, CASTLE_WK, CASTLE_WQ};
            self.z_key ^= keys.castling[self.castle_rights as usize];

            let white_rooks = self.bitboards[PieceType::Rook.id(0)];
            let white_king = self.bitboards[PieceType::King.id(0)];
            let black_rooks = self.bitboards[PieceType::Rook.id(1)];
            let black_king = self.bitboards[PieceType::King.id(1)];

            if white_rooks & 1 == 0 || white_king & (1 << 4) == 0 {
                self.castle_rights &= !CASTLE_WQ;
            }
            if white_rooks & (1 << 7) == 0 || white_king & (1 << 4) == 0 {
                self.castle_rights &= !CASTLE_WK;
            }
            if black_rooks & (1 << 56) == 0 || black_king & (1 << 60) == 0 {
                self.castle_rights &= !CASTLE_BQ;
            }
            if black_rooks & (1 << 63) == 0 || black_king & (1 << 60) == 0 {
                self.castle_rights &= !CASTLE_BK;
            }

            self.z_key ^= keys.castling[self.castle_rights as usize];
        }

        if piece.kind() == PieceType::Pawn || mv.is_capture() {
            self.fifty_move = 0;
        } else {
            self.fifty_move += 1;
        }

        self.z_key ^= keys.side;
        self.side_to_move = us.other();
        self.half_moves += 1;
        self.in_check = false;

        self.undo_stack.push(undo);

        #[cfg(all(debug_assertions, feature = "paranoid_hash"))]
        self.assert_hash();
    }

    pub fn unmake(&mut self) {
        let undo = self.undo_stack.pop().expect("unmake without make");
        debug_assert!(!undo.mv.is_null(), "unmake on a null record");
        self.side_to_move = self.side_to_move.other();
        let us = self.side_to_move;

        let mv = undo.mv;
        let from = mv.from_sq() as usize;
        let to = mv.to_sq() as usize;
        let move_type = mv.move_type();

        self.gen_cache = undo.gen_cache;
        self.en_passant = undo.en_passant;
        self.fifty_move = undo.fifty_move;
        self.castle_rights = undo.castle_rights;
        self.in_check = undo.in_check;
        self.half_moves -= 1;

        match move_type {
            QUIET_MOVE | DOUBLE_PAWN_PUSH => {
                let piece = self.board[to];
                self.move_piece::<false>(to, from, piece);
            }
            CAPTURE_MOVE => {
                let piece = self.board[to];
                self.move_piece::<false>(to, from, piece);
                self.place_piece::<false>(to, undo.captured);
            }
            KING_CASTLE => {
                let rook = Piece::new(PieceType::Rook, us);
                self.move_piece::<false>(to, from, self.board[to]);
                self.move_piece::<false>(5 + 56 * us.index(), 7 + 56 * us.index(), rook);
            }
            QUEEN_CASTLE => {
                let rook = Piece::new(PieceType::Rook, us);
                self.move_piece::<false>(to, from, self.board[to]);
                self.move_piece::<false>(3 + 56 * us.index(), 56 * us.index(), rook);
            }
            EN_PASSANT_CAPTURE => {
                self.place_piece::<false>(prev_pawn_square(to, us), undo.captured);
                self.move_piece::<false>(to, from, self.board[to]);
            }
            _ => {
                let promoted = self.board[to];
                self.remove_piece::<false>(to, promoted);
                self.place_piece::<false>(from, Piece::new(PieceType::Pawn, us));
                if undo.captured != Piece::None {
                    self.place_piece::<false>(to, undo.captured);
                }
            }
        }

        self.z_key = undo.z_key;

        #[cfg(all(debug_assertions, feature = "paranoid_hash"))]
        self.assert_hash();
    }

    /// Passes the move: flips the side, clears en passant, bumps the
    /// clocks. The movegen cache is invalidated like any other make.
    pub fn make_null(&mut self) {
        let keys = zobrist_keys();
        self.undo_stack.push(Undo {
            mv: NULL_MOVE,
            piece_moved: Piece::None,
            captured: Piece::None,
            castle_rights: self.castle_rights,
            en_passant: self.en_passant,
            fifty_move: self.fifty_move,
            z_key: self.z_key,
            in_check: self.in_check,
            gen_cache: self.gen_cache,
        });
        self.gen_cache = GenCache::default();

        if self.en_passant != 0 {
            self.z_key ^= keys.en_passant[self.en_passant as usize];
            self.en_passant = 0;
        }

        self.side_to_move = self.side_to_move.other();
        self.z_key ^= keys.side;
        self.half_moves += 1;
        self.fifty_move += 1;
        self.in_check = false;
    }

    pub fn unmake_null(&mut self) {
        let undo = self.undo_stack.pop().expect("unmake_null without make_null");
        debug_assert!(undo.mv.is_null());
        self.side_to_move = self.side_to_move.other();
        self.gen_cache = undo.gen_cache;
        self.en_passant = undo.en_passant;
        self.fifty_move = undo.fifty_move;
        self.in_check = undo.in_check;
        self.z_key = undo.z_key;
        self.half_moves -= 1;
    }
}
