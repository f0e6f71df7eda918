//! FEN parsing and emission, plus UCI move decoding against the board.

use crate::board::{
    BLACK_OCC, Color, OCC, Piece, PieceType, Position, WHITE_OCC, castle_rights_from_char,
};
use crate::moves::attacks::attacks;
use crate::moves::movegen;
use crate::moves::types::{
    CAPTURE_MOVE, DOUBLE_PAWN_PUSH, EN_PASSANT_CAPTURE, KING_CASTLE, KNIGHT_PROMOTION, Move,
    QUEEN_CASTLE, QUEEN_PROMOTION, QUIET_MOVE, ROOK_PROMOTION,
};
use crate::square::Square;

impl Position {
    /// Loads a six-field FEN, replacing the whole position. On error the
    /// position is left cleared; callers keep their previous copy if they
    /// need to recover.
    pub fn set_fen(&mut self, fen: &str) -> Result<(), String> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(format!("fen needs at least 4 fields: {}", fen));
        }

        *self = Position::empty();

        // piece placement, rank 8 first
        let mut sq = 56i32;
        for c in fields[0].chars() {
            match c {
                '/' => sq -= 16,
                d if d.is_ascii_digit() => sq += d.to_digit(10).unwrap() as i32,
                _ => {
                    let piece =
                        Piece::from_letter(c).ok_or_else(|| format!("bad fen piece: {}", c))?;
                    if !(0..64).contains(&sq) {
                        return Err(format!("fen square overflow: {}", fen));
                    }
                    self.bitboards[piece.index()] |= 1u64 << sq;
                    self.board[sq as usize] = piece;
                    sq += 1;
                }
            }
        }

        for piece in 0..6 {
            self.bitboards[WHITE_OCC] |= self.bitboards[piece];
            self.bitboards[BLACK_OCC] |= self.bitboards[piece + 6];
        }
        self.bitboards[OCC] = self.bitboards[WHITE_OCC] | self.bitboards[BLACK_OCC];

        if self.pieces(PieceType::King, Color::White).count_ones() != 1
            || self.pieces(PieceType::King, Color::Black).count_ones() != 1
        {
            return Err(format!("fen needs exactly one king per side: {}", fen));
        }

        self.side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(format!("bad side to move: {}", other)),
        };

        for c in fields[2].chars() {
            self.castle_rights |= castle_rights_from_char(c);
        }

        // keep the en-passant square only when a pawn can actually take
        // there, so positions differing in unreachable ep squares hash
        // identically
        if fields[3] != "-" {
            let ep: Square = fields[3]
                .parse()
                .map_err(|e| format!("bad en passant field: {}", e))?;
            let us = self.side_to_move;
            let capturers = attacks().pawn_attacks[us.other().index()][ep.index() as usize]
                & self.pieces(PieceType::Pawn, us);
            if capturers != 0 {
                self.en_passant = ep.index();
            }
        }

        self.fifty_move = fields
            .get(4)
            .and_then(|f| f.parse().ok())
            .unwrap_or_default();
        let full_moves: u16 = fields.get(5).and_then(|f| f.parse().ok()).unwrap_or(1);
        self.half_moves = 2 * full_moves.saturating_sub(1) + self.side_to_move.index() as u16;

        self.z_key = self.generate_zobrist();
        movegen::in_check(self);

        Ok(())
    }

    pub fn to_fen(&self) -> String {
        let mut fen = String::new();

        for rank in (0..8).rev() {
            let mut empties = 0;
            for file in 0..8 {
                let piece = self.board[rank * 8 + file];
                if piece == Piece::None {
                    empties += 1;
                } else {
                    if empties > 0 {
                        fen.push_str(&empties.to_string());
                        empties = 0;
                    }
                    fen.push(piece.letter());
                }
            }
            if empties > 0 {
                fen.push_str(&empties.to_string());
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        });

        fen.push(' ');
        if self.castle_rights == 0 {
            fen.push('-');
        } else {
            for (flag, c) in [
                (crate::board::CASTLE_WK, 'K'),
                (crate::board::CASTLE_WQ, 'Q'),
                (crate::board::CASTLE_BK, 'k'),
                (crate::board::CASTLE_BQ, 'q'),
            ] {
                if self.castle_rights & flag != 0 {
                    fen.push(c);
                }
            }
        }

        if self.en_passant != 0 {
            fen.push(' ');
            fen.push_str(&Square::from_index(self.en_passant).to_string());
        } else {
            fen.push_str(" -");
        }

        fen.push_str(&format!(
            " {} {}",
            self.fifty_move,
            self.half_moves / 2 + 1
        ));

        fen
    }

    /// Decodes a UCI move string against the current board, deriving the
    /// move-type tag from the piece and squares. The result is not
    /// legality-checked.
    pub fn parse_move(&self, move_string: &str) -> Option<Move> {
        let bytes = move_string.as_bytes();
        if bytes.len() < 4 {
            return None;
        }

        let from: Square = move_string.get(0..2)?.parse().ok()?;
        let to: Square = move_string.get(2..4)?.parse().ok()?;
        let piece = self.board[from.index() as usize];
        if piece == Piece::None {
            return None;
        }
        let kind = piece.kind();

        let mut move_type = QUIET_MOVE;
        if self.board[to.index() as usize] != Piece::None {
            move_type |= CAPTURE_MOVE;
        }

        let promo_rank = if piece.color() == Color::White { 7 } else { 0 };
        if kind == PieceType::Pawn && to.rank() == promo_rank {
            move_type |= match bytes.get(4) {
                Some(b'q') | Some(b'Q') => QUEEN_PROMOTION,
                Some(b'r') | Some(b'R') => ROOK_PROMOTION,
                Some(b'b') | Some(b'B') => crate::moves::types::BISHOP_PROMOTION,
                Some(b'n') | Some(b'N') => KNIGHT_PROMOTION,
                _ => return None,
            };
        } else if kind == PieceType::Pawn && self.en_passant != 0 && to.index() == self.en_passant
        {
            move_type = EN_PASSANT_CAPTURE;
        } else if kind == PieceType::Pawn && to.index().abs_diff(from.index()) == 16 {
            move_type = DOUBLE_PAWN_PUSH;
        } else if kind == PieceType::King && from.index().abs_diff(to.index()) == 2 {
            move_type = if to.file() == 6 {
                KING_CASTLE
            } else {
                QUEEN_CASTLE
            };
        }

        Some(Move::encode(from.index(), to.index(), move_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::STARTPOS;
    use std::str::FromStr;

    #[test]
    fn startpos_round_trip() {
        let pos = Position::startpos();
        assert_eq!(pos.to_fen(), STARTPOS);
    }

    #[test]
    fn kiwipete_round_trip() {
        let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        let pos = Position::from_str(fen).unwrap();
        assert_eq!(pos.to_fen(), fen);
        assert_eq!(pos.z_key, pos.generate_zobrist());
    }

    #[test]
    fn unreachable_ep_square_is_dropped() {
        // black's d5 push left d6 open but no white pawn can take there
        let with_ep = Position::from_str("4k3/8/8/3p4/8/8/8/4K3 w - d6 0 2").unwrap();
        let without = Position::from_str("4k3/8/8/3p4/8/8/8/4K3 w - - 0 2").unwrap();
        assert_eq!(with_ep.en_passant, 0);
        assert_eq!(with_ep.z_key, without.z_key);

        // here a white pawn on c5 really can capture
        let live = Position::from_str("4k3/8/8/2Pp4/8/8/8/4K3 w - d6 0 2").unwrap();
        assert_eq!(live.en_passant, 43);
    }

    #[test]
    fn malformed_fens_are_rejected() {
        assert!(Position::from_str("not a fen").is_err());
        assert!(Position::from_str("8/8/8/8/8/8/8/8 w - -").is_err()); // no kings
    }

    #[test]
    fn parse_move_derives_tags() {
        let pos = Position::startpos();
        let mv = pos.parse_move("e2e4").unwrap();
        assert!(mv.is_double_pawn_push());
        let mv = pos.parse_move("g1f3").unwrap();
        assert!(mv.is_quiet());
        assert!(pos.parse_move("e9e4").is_none());

        let castled = Position::from_str("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        assert_eq!(castled.parse_move("e1g1").unwrap().move_type(), KING_CASTLE);
        assert_eq!(
            castled.parse_move("e1c1").unwrap().move_type(),
            QUEEN_CASTLE
        );
    }
}
