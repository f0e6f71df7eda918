//! Self-play data generation: random openings, fixed-node searches, and
//! sampled quiet positions written as `<fen> <result>` lines for the
//! offline evaluation tuner.

use crate::board::Position;
use crate::moves::movegen::generate_legal;
use crate::moves::types::MoveList;
use crate::search::eval::eval;
use crate::search::tt::TT;
use crate::search::{MATE_THRESHOLD, Search};
use crate::status::position_status;
use parking_lot::Mutex;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64};
use tracing::info;

const FIFTY_MOVE_LIMIT: u16 = 20;
const MAX_RANDOM_MOVES: usize = 15;
const MIN_RANDOM_MOVES: usize = 5;
const BASE_NODE_COUNT: u64 = 5000;
const SAMPLES_PER_GAME: usize = 10;

/// Each game thread runs full searches; give it search-sized stacks.
const GAME_THREAD_STACK_SIZE: usize = 16 * 1024 * 1024;

pub fn selfplay(num_games: usize, num_threads: usize) {
    let games_played = Arc::new(Mutex::new(0usize));
    let mut handles = Vec::new();

    for id in 0..num_threads.max(1) {
        let counter = Arc::clone(&games_played);
        let handle = std::thread::Builder::new()
            .name(format!("datagen-{}", id))
            .stack_size(GAME_THREAD_STACK_SIZE)
            .spawn(move || play_games(num_games, id, counter))
            .expect("failed to spawn datagen worker");
        handles.push(handle);
    }

    for handle in handles {
        let _ = handle.join();
    }
}

fn play_games(num_games: usize, id: usize, games_played: Arc<Mutex<usize>>) {
    let Ok(file) = File::create(format!("selfplay{}.txt", id)) else {
        return;
    };
    let mut output = BufWriter::new(file);

    let tt = Arc::new(TT::new(16));
    let stop = Arc::new(AtomicBool::new(false));
    let counters = Arc::new(vec![AtomicU64::new(0)]);
    let mut search = Search::new(Arc::clone(&tt), Arc::clone(&stop), counters, 0);
    search.make_output = false;

    let mut rng = StdRng::from_os_rng();
    let mut pos = Position::startpos();

    loop {
        {
            let mut played = games_played.lock();
            *played += 1;
            if *played > num_games {
                break;
            }
            info!("starting game {} of {} on thread {}", *played, num_games, id);
        }

        pos.set_fen(crate::board::STARTPOS).expect("startpos");
        tt.clear();
        search.clear_history();

        let mut fens: Vec<String> = Vec::new();
        let mut result = "0.5";

        // a random opening so games diverge
        let num_random = rng.random_range(MIN_RANDOM_MOVES..=MAX_RANDOM_MOVES);
        let mut finished_early = false;
        for _ in 0..num_random {
            if let Some(game_result) = game_over(&mut pos) {
                result = game_result;
                finished_early = true;
                break;
            }
            let mut moves = MoveList::new();
            generate_legal(&mut pos, &mut moves);
            let mv = moves[rng.random_range(0..moves.len())].mv;
            pos.make(mv);
        }

        // play the game out with short fixed-node searches
        while !finished_early {
            if let Some(game_result) = game_over(&mut pos) {
                result = game_result;
                break;
            }

            stop.store(false, std::sync::atomic::Ordering::Relaxed);
            let outcome = search.node_search(
                &mut pos,
                crate::search::MAX_PLY as i32 - 1,
                BASE_NODE_COUNT + rng.random_range(0..30_000u64),
            );
            if outcome.mv.is_null() {
                break;
            }

            // sample only quiet, undecided positions
            stop.store(false, std::sync::atomic::Ordering::Relaxed);
            let quiet = search.q_score(&mut pos) == eval(&pos);
            if quiet && outcome.score.abs() < MATE_THRESHOLD {
                fens.push(pos.to_fen());
            }

            pos.make(outcome.mv);
        }

        for fen in fens.choose_multiple(&mut rng, SAMPLES_PER_GAME) {
            let _ = writeln!(output, "{} {}", fen, result);
        }
        let _ = output.flush();
    }
}

/// Draw and decisive terminations, with the short adjudication clock that
/// keeps data games from shuffling forever. Results are from White's
/// point of view.
fn game_over(pos: &mut Position) -> Option<&'static str> {
    if pos.fifty_move >= FIFTY_MOVE_LIMIT {
        return Some("0.5");
    }
    position_status(pos).result(pos.side_to_move)
}
