//! The search: iterative deepening with aspiration windows around a
//! negamax alpha-beta with quiescence, driven per worker thread against
//! the shared transposition table.

pub mod context;
pub mod eval;
pub mod picker;
pub mod see;
pub mod threads;
pub mod tt;

use crate::board::Position;
use crate::moves::movegen::in_check;
use crate::moves::types::{Move, MoveList, NULL_MOVE};
use crate::search::context::{HistoryTable, PVTable, StackEntry};
use crate::search::eval::eval;
use crate::search::picker::MovePicker;
use crate::search::see::{SEE_MARGIN, see_ge};
use crate::search::tt::{NodeType, TT};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

pub const MAX_PLY: usize = 128;
pub const POSITIVE_INFINITY: i32 = 32_000;
pub const NEGATIVE_INFINITY: i32 = -POSITIVE_INFINITY;
pub const MATE_SCORE: i32 = 31_000;
pub const MATE_THRESHOLD: i32 = 30_000;
pub(crate) const MAX_HISTORY: i32 = 49_990;

const WINDOW_MIN_DEPTH: i32 = 3;
const WINDOW_SIZE: i32 = 10;
const TIME_CHECK_INTERVAL: u32 = 1000;

#[derive(Debug, Clone, Copy)]
pub struct SearchResult {
    pub mv: Move,
    pub score: i32,
}

pub struct Search {
    pub thread_id: usize,
    pub make_output: bool,

    tt: Arc<TT>,
    is_stopped: Arc<AtomicBool>,
    /// One published node counter per worker; ours is `thread_id`.
    node_counters: Arc<Vec<AtomicU64>>,
    pub nodes_searched: u64,
    pub q_nodes: u64,
    pub tt_hits: u64,

    node_search: bool,
    max_nodes: u64,
    times_up: bool,
    time_check: u32,
    time_check_interval: u32,
    timer_duration: u64,
    soft_time_limit: u64,
    start_time: Instant,

    allow_nmp: bool,
    enable_qsearch_tt: bool,

    killer_1: [Move; MAX_PLY],
    killer_2: [Move; MAX_PLY],
    history: HistoryTable,
    lmr_table: Box<[[i32; 256]; MAX_PLY]>,
    stack: [StackEntry; MAX_PLY],
    pv: PVTable,
}

impl Search {
    pub fn new(
        tt: Arc<TT>,
        is_stopped: Arc<AtomicBool>,
        node_counters: Arc<Vec<AtomicU64>>,
        thread_id: usize,
    ) -> Self {
        let mut lmr_table = Box::new([[0i32; 256]; MAX_PLY]);
        for (depth, row) in lmr_table.iter_mut().enumerate().skip(1) {
            for (moves, slot) in row.iter_mut().enumerate().skip(1) {
                *slot = ((depth as f64).ln() * (moves as f64).ln() / 2.5 + 1.8) as i32;
            }
        }

        Search {
            thread_id,
            make_output: true,
            tt,
            is_stopped,
            node_counters,
            nodes_searched: 0,
            q_nodes: 0,
            tt_hits: 0,
            node_search: false,
            max_nodes: 0,
            times_up: false,
            time_check: TIME_CHECK_INTERVAL,
            time_check_interval: TIME_CHECK_INTERVAL,
            timer_duration: 0,
            soft_time_limit: 0,
            start_time: Instant::now(),
            allow_nmp: true,
            enable_qsearch_tt: true,
            killer_1: [NULL_MOVE; MAX_PLY],
            killer_2: [NULL_MOVE; MAX_PLY],
            history: HistoryTable::new(),
            lmr_table,
            stack: [StackEntry::default(); MAX_PLY],
            pv: PVTable::new(),
        }
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    fn clear_killers(&mut self) {
        self.killer_1 = [NULL_MOVE; MAX_PLY];
        self.killer_2 = [NULL_MOVE; MAX_PLY];
    }

    #[inline(always)]
    fn save_killer(&mut self, ply: usize, mv: Move) {
        self.killer_2[ply] = self.killer_1[ply];
        self.killer_1[ply] = mv;
    }

    fn set_timer(&mut self, duration_ms: u64, interval: u32) {
        self.time_check_interval = interval;
        self.timer_duration = duration_ms;
        self.soft_time_limit = duration_ms * 3 / 4;
        self.time_check = interval;
        self.times_up = false;
        self.start_time = Instant::now();
    }

    #[inline(always)]
    fn count_node(&mut self) {
        self.nodes_searched += 1;
        self.node_counters[self.thread_id].store(self.nodes_searched, Ordering::Relaxed);
    }

    /// Nodes across every worker; the counters are written relaxed, read
    /// relaxed, and only ever treated as an estimate.
    pub fn total_nodes(&self) -> u64 {
        self.node_counters
            .iter()
            .map(|counter| counter.load(Ordering::Relaxed))
            .sum()
    }

    /// Cooperative abort: throttled by a countdown so the atomic and the
    /// clock are touched once per `time_check_interval` node entries.
    fn times_up(&mut self) -> bool {
        if self.times_up {
            return true;
        }
        if self.time_check > 0 {
            self.time_check -= 1;
            return false;
        }
        self.time_check = self.time_check_interval;

        if self.is_stopped.load(Ordering::Relaxed) {
            self.times_up = true;
            return true;
        }
        if self.node_search {
            if self.total_nodes() >= self.max_nodes {
                self.is_stopped.store(true, Ordering::Relaxed);
                self.times_up = true;
                return true;
            }
        } else if self.thread_id == 0
            && self.start_time.elapsed().as_millis() as u64 > self.timer_duration
        {
            self.is_stopped.store(true, Ordering::Relaxed);
            self.times_up = true;
            return true;
        }
        false
    }

    /// The main worker does not begin another iteration past 3/4 of the
    /// hard budget.
    fn soft_times_up(&mut self) -> bool {
        if self.node_search {
            return false;
        }
        if self.start_time.elapsed().as_millis() as u64 > self.soft_time_limit {
            self.times_up = true;
            self.is_stopped.store(true, Ordering::Relaxed);
            return true;
        }
        false
    }

    pub fn time_search(&mut self, pos: &mut Position, max_depth: i32, time_in_ms: u64) -> SearchResult {
        self.node_search = false;
        self.set_timer(time_in_ms, TIME_CHECK_INTERVAL);
        self.iter_search(pos, max_depth)
    }

    pub fn node_search(&mut self, pos: &mut Position, max_depth: i32, num_nodes: u64) -> SearchResult {
        self.node_search = true;
        self.times_up = false;
        self.max_nodes = num_nodes;
        self.time_check = self.time_check_interval;
        self.start_time = Instant::now();
        self.iter_search(pos, max_depth)
    }

    /// Quiescence score of the position with the TT silenced; used by the
    /// self-play generator to recognize quiet positions.
    pub fn q_score(&mut self, pos: &mut Position) -> i32 {
        self.set_timer(1000, TIME_CHECK_INTERVAL);
        self.node_search = false;
        self.enable_qsearch_tt = false;
        let score = self.qsearch::<false>(pos, 0, NEGATIVE_INFINITY, POSITIVE_INFINITY);
        self.enable_qsearch_tt = true;
        score
    }

    fn output_info(&self, depth: i32, score: i32) {
        let nodes = self.total_nodes();
        let elapsed = self.start_time.elapsed().as_secs_f64().max(1e-6);
        let nps = (nodes as f64 / elapsed) as u64;

        let score_str = if score.abs() >= MATE_THRESHOLD {
            let mate_in = (MATE_SCORE - score.abs() + 1) / 2;
            if score > 0 {
                format!("mate {}", mate_in)
            } else {
                format!("mate -{}", mate_in)
            }
        } else {
            format!("cp {}", score)
        };

        let pv = self
            .pv
            .line()
            .iter()
            .map(|mv| mv.to_uci())
            .collect::<Vec<_>>()
            .join(" ");

        println!(
            "info depth {} score {} nodes {} nps {} hashfull {} pv {}",
            depth,
            score_str,
            nodes,
            nps,
            self.tt.hashfull(),
            pv
        );
    }

    fn iter_search(&mut self, pos: &mut Position, max_depth: i32) -> SearchResult {
        self.nodes_searched = 0;
        self.q_nodes = 0;
        self.tt_hits = 0;
        self.enable_qsearch_tt = true;
        self.node_counters[self.thread_id].store(0, Ordering::Relaxed);
        self.pv.clear();
        self.clear_killers();

        let mut best_move = NULL_MOVE;
        let mut best_score = NEGATIVE_INFINITY;
        let mut alpha = NEGATIVE_INFINITY;
        let mut beta = POSITIVE_INFINITY;
        let mut delta = WINDOW_SIZE;

        let mut depth = 1;
        while depth <= max_depth.min(MAX_PLY as i32 - 1) {
            self.allow_nmp = true;

            let score = self.negamax::<true, false, true>(pos, depth, 0, alpha, beta);
            let iter_move = self.pv.root_move();

            if self.times_up() {
                // a partially searched depth may already prefer another
                // move; trust it, it was found with full information
                if !iter_move.is_null() && iter_move != best_move {
                    best_move = iter_move;
                    if self.thread_id == 0 && self.make_output {
                        self.output_info(depth, best_score);
                    }
                }
                break;
            }

            // aspiration misses widen the failed bound and re-search
            if score <= alpha {
                beta = (alpha + beta) / 2;
                alpha = (alpha - delta).max(NEGATIVE_INFINITY);
                delta *= 2;
                continue;
            }
            if score >= beta {
                beta = (beta + delta).min(POSITIVE_INFINITY);
                delta *= 2;
                continue;
            }

            if !iter_move.is_null() {
                best_move = iter_move;
            }
            best_score = score;

            if self.thread_id == 0 && self.make_output {
                self.output_info(depth, best_score);
            }
            if self.thread_id == 0 && self.soft_times_up() {
                break;
            }

            depth += 1;
            delta = WINDOW_SIZE;
            if depth > WINDOW_MIN_DEPTH {
                alpha = best_score - WINDOW_SIZE;
                beta = best_score + WINDOW_SIZE;
            } else {
                alpha = NEGATIVE_INFINITY;
                beta = POSITIVE_INFINITY;
            }
        }

        // nothing to recommend when not even depth 1 completed
        if self.thread_id == 0 && self.make_output && !best_move.is_null() {
            println!("bestmove {}", best_move.to_uci());
        }

        SearchResult {
            mv: best_move,
            score: best_score,
        }
    }

    /// Runtime dispatch onto the monomorphized child searches; call sites
    /// pass constants, so this folds away.
    #[inline(always)]
    fn negamax_child(
        &mut self,
        pos: &mut Position,
        depth: i32,
        ply: usize,
        alpha: i32,
        beta: i32,
        pv: bool,
        cut: bool,
    ) -> i32 {
        match (pv, cut) {
            (true, true) => self.negamax::<true, true, false>(pos, depth, ply, alpha, beta),
            (true, false) => self.negamax::<true, false, false>(pos, depth, ply, alpha, beta),
            (false, true) => self.negamax::<false, true, false>(pos, depth, ply, alpha, beta),
            (false, false) => self.negamax::<false, false, false>(pos, depth, ply, alpha, beta),
        }
    }

    fn negamax<const PV: bool, const CUT: bool, const ROOT: bool>(
        &mut self,
        pos: &mut Position,
        mut depth: i32,
        ply: usize,
        mut alpha: i32,
        mut beta: i32,
    ) -> i32 {
        debug_assert!(alpha < beta);

        if ply >= MAX_PLY - 1 {
            return eval(pos);
        }

        self.pv.zero_len(ply);

        if self.times_up() {
            return 0;
        }
        if !ROOT && (pos.is_triple_repetition() || pos.fifty_move >= 100) {
            return 0;
        }

        let checked = in_check(pos);

        if depth <= 0 {
            return self.qsearch::<PV>(pos, ply, alpha, beta);
        }

        self.count_node();

        // mate-distance pruning: no line from here can beat a mate we
        // already have in hand
        if !ROOT {
            alpha = alpha.max(-MATE_SCORE + ply as i32);
            beta = beta.min(MATE_SCORE - ply as i32 - 1);
            if alpha >= beta {
                return beta;
            }
        }

        let mut tt_move = NULL_MOVE;
        let mut tt_was_pv = false;
        let mut tt_eval = None;
        if let Some(entry) = self.tt.probe(pos.z_key, ply as i32) {
            tt_move = entry.best_move;
            tt_was_pv = entry.is_pv();
            tt_eval = Some(entry.s_eval as i32);

            if !PV && !ROOT && entry.depth as i32 >= depth {
                let score = entry.score as i32;
                let cutoff = match entry.node_type() {
                    NodeType::Exact => true,
                    NodeType::LowerBound => score >= beta,
                    NodeType::UpperBound => score <= alpha,
                    NodeType::Null => false,
                };
                if cutoff {
                    self.tt_hits += 1;
                    self.pv.update_from_tt(ply, tt_move);
                    return score;
                }
            }
        }

        let s_eval = tt_eval.unwrap_or_else(|| eval(pos));
        self.stack[ply].s_eval = s_eval;

        let improving = ply < 2 || s_eval > self.stack[ply - 2].s_eval;

        // reverse futility pruning
        if !PV && !ROOT && !checked && depth <= 6 && s_eval >= beta + 120 * depth {
            return s_eval;
        }

        // null-move pruning: if passing still beats beta, the real best
        // move almost certainly does too
        if !PV
            && !ROOT
            && self.allow_nmp
            && depth >= 2
            && !checked
            && s_eval >= beta
            && pos.zugzwang_unlikely()
        {
            self.allow_nmp = false;
            let reduction = 3 + depth / 3;
            pos.make_null();
            let score =
                -self.negamax::<false, true, false>(pos, depth - reduction, ply + 1, -beta, -beta + 1);
            pos.unmake_null();
            self.allow_nmp = true;

            if self.times_up {
                return 0;
            }
            if score >= beta {
                return beta;
            }
        }

        // check extension
        if checked && depth <= 3 {
            depth += 1;
        }

        // internal iterative reduction: nodes the TT knows nothing about
        // are rarely worth full depth
        if depth >= 5 && tt_move.is_null() && !checked {
            depth -= 1;
        }

        let can_fprune = !PV && !ROOT && depth <= 4 && !checked && s_eval < alpha - 50 - 80 * depth;

        if ply + 1 < MAX_PLY {
            self.killer_1[ply + 1] = NULL_MOVE;
            self.killer_2[ply + 1] = NULL_MOVE;
        }

        let mut picker = MovePicker::new(tt_move, self.killer_1[ply], self.killer_2[ply]);
        let mut best_score = NEGATIVE_INFINITY;
        let mut best_move = NULL_MOVE;
        let mut upper_bound = true;
        let mut num_moves: i32 = 0;
        let mut quiets_tried: i32 = 0;
        let mut bad_quiets = MoveList::new();

        loop {
            let mv = picker.next(pos, &self.history);
            if mv.is_null() {
                break;
            }

            // futility: once a realistic score exists, quiets cannot save
            // a hopeless node
            if can_fprune && num_moves > 0 && best_score > -MATE_THRESHOLD && !mv.is_noisy() {
                picker.skip_quiets();
                continue;
            }

            // static-exchange pruning of clearly losing moves
            if depth <= 7 && !checked && num_moves > 0 {
                let margin =
                    -50 - 150 * (mv.is_noisy() as i32) - 100 * (improving as i32);
                if !see_ge(pos, mv, margin) {
                    continue;
                }
            }

            self.stack[ply].mv = mv;
            self.stack[ply].piece_moved = pos.board[mv.from_sq() as usize];

            pos.make(mv);
            self.tt.prefetch(pos.z_key);
            let gives_check = in_check(pos);

            // late-move pruning: deep in the quiet tail, the rest of the
            // quiets are noise
            if !PV
                && !ROOT
                && depth <= 7
                && !checked
                && mv.is_quiet()
                && quiets_tried > 1 + 2 * depth + 3 * (improving as i32)
                && !gives_check
            {
                pos.unmake();
                picker.skip_quiets();
                continue;
            }

            num_moves += 1;
            if mv.is_quiet() {
                quiets_tried += 1;
            }

            let mut score;
            if num_moves == 1 {
                score = -self.negamax_child(pos, depth - 1, ply + 1, -beta, -alpha, PV, !CUT);
            } else {
                let mut reduction = 0;
                if !ROOT
                    && depth > 2
                    && !checked
                    && (num_moves > 2 || (!improving && num_moves > 1))
                {
                    reduction = self.lmr_table[(depth as usize).min(MAX_PLY - 1)]
                        [(num_moves as usize).min(255)];
                    reduction -= tt_was_pv as i32;
                    reduction -= gives_check as i32;
                    reduction -= mv.is_noisy() as i32;
                    reduction = reduction.clamp(0, depth - 1);
                }

                if reduction > 1 {
                    score = -self.negamax::<false, true, false>(
                        pos,
                        depth - reduction,
                        ply + 1,
                        -alpha - 1,
                        -alpha,
                    );
                    if score > alpha {
                        score =
                            -self.negamax_child(pos, depth - 1, ply + 1, -beta, -alpha, PV, !CUT);
                    }
                } else if PV {
                    score = -self.negamax::<false, true, false>(
                        pos,
                        depth - 1,
                        ply + 1,
                        -alpha - 1,
                        -alpha,
                    );
                    if score > alpha && score < beta {
                        score =
                            -self.negamax::<true, false, false>(pos, depth - 1, ply + 1, -beta, -alpha);
                    }
                } else {
                    score = -self.negamax_child(pos, depth - 1, ply + 1, -beta, -alpha, PV, !CUT);
                }
            }

            pos.unmake();

            if self.times_up {
                return 0;
            }

            if score > best_score {
                best_score = score;
                best_move = mv;
                self.pv.update(ply, mv);

                if best_score >= beta {
                    if mv.is_quiet() {
                        self.save_killer(ply, mv);
                        self.history.update(
                            pos.side_to_move,
                            mv.from_sq() as usize,
                            mv.to_sq() as usize,
                            depth * depth,
                        );
                    }
                    // every quiet tried before the cutoff move pays
                    for i in 0..bad_quiets.len() {
                        let bq = bad_quiets[i].mv;
                        self.history.update(
                            pos.side_to_move,
                            bq.from_sq() as usize,
                            bq.to_sq() as usize,
                            -depth * depth,
                        );
                    }
                    self.tt.save(
                        pos.z_key,
                        depth,
                        ply as i32,
                        mv,
                        best_score,
                        NodeType::LowerBound,
                        s_eval,
                        PV,
                    );
                    return score;
                }
                if score > alpha {
                    alpha = score;
                    upper_bound = false;
                }
            }

            if mv.is_quiet() {
                bad_quiets.add(mv);
            }
        }

        if num_moves == 0 {
            if checked {
                return -MATE_SCORE + ply as i32;
            }
            return 0;
        }

        if upper_bound {
            // keep the tt move alive through fail-lows
            if !tt_move.is_null() {
                best_move = tt_move;
            }
            self.tt.save(
                pos.z_key,
                depth,
                ply as i32,
                best_move,
                best_score,
                NodeType::UpperBound,
                s_eval,
                PV,
            );
        } else {
            self.tt.save(
                pos.z_key,
                depth,
                ply as i32,
                best_move,
                best_score,
                NodeType::Exact,
                s_eval,
                PV,
            );
        }

        best_score
    }

    fn qsearch<const PV: bool>(
        &mut self,
        pos: &mut Position,
        ply: usize,
        mut alpha: i32,
        beta: i32,
    ) -> i32 {
        if self.times_up() {
            return 0;
        }
        if ply >= MAX_PLY || pos.fifty_move >= 100 {
            return eval(pos);
        }

        self.count_node();
        self.q_nodes += 1;
        self.pv.zero_len(ply);

        let mut tt_move = NULL_MOVE;
        if self.enable_qsearch_tt
            && let Some(entry) = self.tt.probe(pos.z_key, ply as i32)
        {
            tt_move = entry.best_move;
            let score = entry.score as i32;
            let cutoff = match entry.node_type() {
                NodeType::Exact => true,
                NodeType::LowerBound => score >= beta,
                NodeType::UpperBound => score <= alpha,
                NodeType::Null => false,
            };
            if cutoff {
                self.tt_hits += 1;
                return score;
            }
        }

        let checked = in_check(pos);

        // only a noisy tt move is worth anything to a captures search
        if !checked && !tt_move.is_noisy() {
            tt_move = NULL_MOVE;
        }

        let s_eval = eval(pos);

        // stand pat: doing nothing is an option, unless in check
        let mut best_score = if checked { NEGATIVE_INFINITY } else { s_eval };
        let mut upper_bound = true;

        if best_score >= beta {
            return best_score;
        }
        if best_score > alpha {
            alpha = best_score;
            upper_bound = false;
        }

        let mut picker = MovePicker::new(tt_move, NULL_MOVE, NULL_MOVE);
        let mut best_move = NULL_MOVE;
        let mut num_moves = 0;

        loop {
            let mv = if checked {
                picker.next(pos, &self.history)
            } else {
                picker.next_capture(pos)
            };
            if mv.is_null() {
                break;
            }
            num_moves += 1;

            // a capture has to promise at least the missing margin
            if mv.is_noisy() && !see_ge(pos, mv, (alpha - s_eval) - SEE_MARGIN) {
                continue;
            }

            pos.make(mv);
            self.tt.prefetch(pos.z_key);
            let score = -self.qsearch::<PV>(pos, ply + 1, -beta, -alpha);
            pos.unmake();

            if self.times_up {
                return 0;
            }

            if score >= beta {
                if self.enable_qsearch_tt {
                    self.tt.save(
                        pos.z_key,
                        0,
                        ply as i32,
                        mv,
                        score,
                        NodeType::LowerBound,
                        s_eval,
                        false,
                    );
                }
                return score;
            }
            if score > best_score {
                best_score = score;
                best_move = mv;
                self.pv.update(ply, mv);
            }
            if score > alpha {
                alpha = score;
                upper_bound = false;
            }
        }

        if num_moves == 0 {
            if checked {
                return -MATE_SCORE + ply as i32;
            }
            // no captures at all: confirm the position is not stalemate
            // before standing pat
            let mut any = MoveList::new();
            crate::moves::movegen::generate_legal(pos, &mut any);
            if any.is_empty() {
                return 0;
            }
        }

        if best_score == NEGATIVE_INFINITY {
            best_score = s_eval;
        }

        if self.enable_qsearch_tt {
            if upper_bound {
                if !tt_move.is_null() {
                    best_move = tt_move;
                }
                self.tt.save(
                    pos.z_key,
                    0,
                    ply as i32,
                    best_move,
                    best_score,
                    NodeType::UpperBound,
                    s_eval,
                    false,
                );
            } else {
                self.tt.save(
                    pos.z_key,
                    0,
                    ply as i32,
                    best_move,
                    best_score,
                    NodeType::Exact,
                    s_eval,
                    false,
                );
            }
        }

        best_score
    }
}

/// A single-threaded search against a private table; the convenience
/// entry used by tests and the self-play generator.
pub fn standalone_search(pos: &mut Position, max_depth: i32, time_in_ms: u64) -> SearchResult {
    let tt = Arc::new(TT::new(tt::DEFAULT_TT_MB));
    let stop = Arc::new(AtomicBool::new(false));
    let counters = Arc::new(vec![AtomicU64::new(0)]);
    let mut search = Search::new(tt, stop, counters, 0);
    search.make_output = false;
    search.time_search(pos, max_depth, time_in_ms)
}
