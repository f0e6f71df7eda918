//! Staged move picker: TT move, winning noisy moves, the two killers,
//! then quiets and the losing-noisy tail. One move per call, selected by
//! a single selection-sort step, so a beta cutoff never pays for sorting
//! moves it will not search.

use crate::board::Position;
use crate::moves::movegen::{GenClass, generate_moves, is_legal};
use crate::moves::types::{
    BISHOP_PROMOTION, BISHOP_PROMOTION_CAPTURE, CAPTURE_MOVE, DOUBLE_PAWN_PUSH,
    EN_PASSANT_CAPTURE, KNIGHT_PROMOTION, KNIGHT_PROMOTION_CAPTURE, Move, MoveList, NULL_MOVE,
    QUEEN_PROMOTION, QUEEN_PROMOTION_CAPTURE, ROOK_PROMOTION, ROOK_PROMOTION_CAPTURE,
};
use crate::search::context::HistoryTable;
use crate::search::see::{SEE_MULTIPLIER, SEE_VALUES, see};

pub const IGNORE_MOVE: i32 = -(1 << 30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    TtMove,
    GoodNoisy,
    Killer1,
    Killer2,
    QuietAndBadNoisy,
    End,
}

pub struct MovePicker {
    stage: Stage,
    tt_move: Move,
    killer_1: Move,
    killer_2: Move,
    noisy: MoveList,
    quiets: MoveList,
    noisy_index: usize,
    quiet_index: usize,
    generated_noisy: bool,
    generated_quiets: bool,
    skip_quiets: bool,
}

impl MovePicker {
    pub fn new(tt_move: Move, killer_1: Move, killer_2: Move) -> Self {
        MovePicker {
            stage: Stage::TtMove,
            tt_move,
            killer_1,
            killer_2,
            noisy: MoveList::new(),
            quiets: MoveList::new(),
            noisy_index: 0,
            quiet_index: 0,
            generated_noisy: false,
            generated_quiets: false,
            skip_quiets: false,
        }
    }

    /// Stop yielding quiet moves (late-move pruning, futility). Killers
    /// count as quiets here.
    pub fn skip_quiets(&mut self) {
        self.skip_quiets = true;
        self.quiet_index = self.quiets.len();
    }

    fn score_noisy(&self, pos: &Position, mv: Move) -> i32 {
        match mv.move_type() {
            CAPTURE_MOVE | EN_PASSANT_CAPTURE | QUEEN_PROMOTION_CAPTURE
            | KNIGHT_PROMOTION_CAPTURE => see(pos, mv) * SEE_MULTIPLIER,
            QUEEN_PROMOTION => {
                (SEE_VALUES[4] - SEE_VALUES[0]) * SEE_MULTIPLIER
            }
            KNIGHT_PROMOTION => 0,
            ROOK_PROMOTION | BISHOP_PROMOTION | ROOK_PROMOTION_CAPTURE
            | BISHOP_PROMOTION_CAPTURE => IGNORE_MOVE,
            _ => 0,
        }
    }

    fn generate_noisy(&mut self, pos: &mut Position) {
        let mut generated = MoveList::new();
        generate_moves(pos, GenClass::Noisy, &mut generated);
        for i in 0..generated.len() {
            let mv = generated[i].mv;
            // the tt move was already yielded; killers keep their own slot
            if mv == self.tt_move || mv == self.killer_1 || mv == self.killer_2 {
                continue;
            }
            let score = self.score_noisy(pos, mv);
            self.noisy.add(mv);
            let last = self.noisy.len() - 1;
            self.noisy[last].score = score;
        }
        self.generated_noisy = true;
    }

    fn generate_quiets(&mut self, pos: &mut Position, history: &HistoryTable) {
        let mut generated = MoveList::new();
        generate_moves(pos, GenClass::Quiet, &mut generated);
        let side = pos.side_to_move;
        for i in 0..generated.len() {
            let mv = generated[i].mv;
            if mv == self.tt_move || mv == self.killer_1 || mv == self.killer_2 {
                continue;
            }
            let mut score = history.get(side, mv.from_sq() as usize, mv.to_sq() as usize);
            if mv.move_type() == DOUBLE_PAWN_PUSH {
                score += 1;
            }
            self.quiets.add(mv);
            let last = self.quiets.len() - 1;
            self.quiets[last].score = score;
        }
        self.generated_quiets = true;
    }

    /// Selection-sort step: swap the best-scored remaining entry to
    /// `start` and return its move and score.
    fn select_best(list: &mut MoveList, start: usize) -> (Move, i32) {
        let mut best = start;
        for i in start + 1..list.len() {
            if list[i].score > list[best].score {
                best = i;
            }
        }
        let chosen = list[best];
        list[best] = list[start];
        list[start] = chosen;
        (chosen.mv, chosen.score)
    }

    fn killer_ok(&self, pos: &mut Position, killer: Move) -> bool {
        !killer.is_null() && killer != self.tt_move && is_legal(pos, killer)
    }

    /// Next move for the main search, or null when exhausted.
    pub fn next(&mut self, pos: &mut Position, history: &HistoryTable) -> Move {
        loop {
            match self.stage {
                Stage::TtMove => {
                    self.stage = Stage::GoodNoisy;
                    if !self.tt_move.is_null() && is_legal(pos, self.tt_move) {
                        return self.tt_move;
                    }
                }

                Stage::GoodNoisy => {
                    if !self.generated_noisy {
                        self.generate_noisy(pos);
                    }
                    if self.noisy_index < self.noisy.len() {
                        let (mv, score) = Self::select_best(&mut self.noisy, self.noisy_index);
                        if score > 0 {
                            self.noisy_index += 1;
                            return mv;
                        }
                    }
                    self.stage = Stage::Killer1;
                }

                Stage::Killer1 => {
                    self.stage = Stage::Killer2;
                    if !self.skip_quiets && self.killer_ok(pos, self.killer_1) {
                        return self.killer_1;
                    }
                }

                Stage::Killer2 => {
                    self.stage = Stage::QuietAndBadNoisy;
                    if !self.skip_quiets
                        && self.killer_2 != self.killer_1
                        && self.killer_ok(pos, self.killer_2)
                    {
                        return self.killer_2;
                    }
                }

                Stage::QuietAndBadNoisy => {
                    if !self.generated_quiets && !self.skip_quiets {
                        self.generate_quiets(pos, history);
                    }
                    if self.quiet_index < self.quiets.len() {
                        let (mv, _) = Self::select_best(&mut self.quiets, self.quiet_index);
                        self.quiet_index += 1;
                        return mv;
                    }
                    if self.noisy_index < self.noisy.len() {
                        let (mv, _) = Self::select_best(&mut self.noisy, self.noisy_index);
                        self.noisy_index += 1;
                        return mv;
                    }
                    self.stage = Stage::End;
                }

                Stage::End => return NULL_MOVE,
            }
        }
    }

    /// Quiescence entry: the TT move when it is noisy, then every noisy
    /// move in score order. Quiets and killers never appear.
    pub fn next_capture(&mut self, pos: &mut Position) -> Move {
        loop {
            match self.stage {
                Stage::TtMove => {
                    self.stage = Stage::GoodNoisy;
                    if !self.tt_move.is_null()
                        && self.tt_move.is_noisy()
                        && is_legal(pos, self.tt_move)
                    {
                        return self.tt_move;
                    }
                }

                Stage::GoodNoisy => {
                    if !self.generated_noisy {
                        self.generate_noisy(pos);
                    }
                    if self.noisy_index < self.noisy.len() {
                        let (mv, _) = Self::select_best(&mut self.noisy, self.noisy_index);
                        self.noisy_index += 1;
                        return mv;
                    }
                    self.stage = Stage::End;
                }

                _ => return NULL_MOVE,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::movegen::generate_legal;
    use std::str::FromStr;

    fn drain(pos: &mut Position, picker: &mut MovePicker) -> Vec<Move> {
        let history = HistoryTable::new();
        let mut out = Vec::new();
        loop {
            let mv = picker.next(pos, &history);
            if mv.is_null() {
                break;
            }
            out.push(mv);
        }
        out
    }

    #[test]
    fn picker_yields_exactly_the_legal_moves() {
        let fens = [
            crate::board::STARTPOS,
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
        ];
        for fen in fens {
            let mut pos = Position::from_str(fen).unwrap();
            let mut legal = MoveList::new();
            generate_legal(&mut pos, &mut legal);

            let mut picker = MovePicker::new(NULL_MOVE, NULL_MOVE, NULL_MOVE);
            let picked = drain(&mut pos, &mut picker);

            assert_eq!(picked.len(), legal.len(), "count mismatch in {}", fen);
            for mv in &picked {
                assert!(legal.contains(*mv), "{} not legal in {}", mv, fen);
            }
            let mut dedup = picked.clone();
            dedup.sort_by_key(|m| m.raw());
            dedup.dedup();
            assert_eq!(dedup.len(), picked.len(), "duplicate move in {}", fen);
        }
    }

    #[test]
    fn tt_move_comes_first_and_only_once() {
        let mut pos = Position::startpos();
        let tt_move = pos.parse_move("e2e4").unwrap();
        let mut picker = MovePicker::new(tt_move, NULL_MOVE, NULL_MOVE);
        let picked = drain(&mut pos, &mut picker);
        assert_eq!(picked[0], tt_move);
        assert_eq!(picked.iter().filter(|&&m| m == tt_move).count(), 1);
        assert_eq!(picked.len(), 20);
    }

    #[test]
    fn illegal_tt_move_is_skipped() {
        let mut pos = Position::startpos();
        // a move for the wrong side
        let bogus = pos.parse_move("e7e5");
        let mut picker = MovePicker::new(bogus.unwrap(), NULL_MOVE, NULL_MOVE);
        let picked = drain(&mut pos, &mut picker);
        assert_eq!(picked.len(), 20);
    }

    #[test]
    fn killers_follow_good_captures() {
        // white can win a queen with d1xd8; killer is the quiet h2h3
        let mut pos =
            Position::from_str("3q3k/8/8/8/8/8/7P/3R3K w - - 0 1").unwrap();
        let killer = pos.parse_move("h2h3").unwrap();
        let mut picker = MovePicker::new(NULL_MOVE, killer, NULL_MOVE);
        let picked = drain(&mut pos, &mut picker);
        let capture = pos.parse_move("d1d8").unwrap();
        let cap_at = picked.iter().position(|&m| m == capture).unwrap();
        let killer_at = picked.iter().position(|&m| m == killer).unwrap();
        assert!(cap_at < killer_at);
        assert_eq!(picked.iter().filter(|&&m| m == killer).count(), 1);
    }

    #[test]
    fn losing_captures_come_last() {
        // rook takes defended pawn is the only capture and it loses material
        let mut pos = Position::from_str("3r3k/8/8/8/3p4/8/8/3R2K1 w - - 0 1").unwrap();
        let mut picker = MovePicker::new(NULL_MOVE, NULL_MOVE, NULL_MOVE);
        let picked = drain(&mut pos, &mut picker);
        let losing = pos.parse_move("d1d4").unwrap();
        assert_eq!(*picked.last().unwrap(), losing);
    }

    #[test]
    fn next_capture_yields_only_noisy() {
        let mut pos = Position::from_str(
            "r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4",
        )
        .unwrap();
        let mut picker = MovePicker::new(NULL_MOVE, NULL_MOVE, NULL_MOVE);
        loop {
            let mv = picker.next_capture(&mut pos);
            if mv.is_null() {
                break;
            }
            assert!(mv.is_noisy(), "{} is not noisy", mv);
        }
    }
}
