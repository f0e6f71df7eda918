//! The UCI text front-end: pumps positions and budgets into the worker
//! pool and leaves all search output to worker 0. Malformed input is
//! ignored; the engine keeps its previous state.

use crate::board::{Color, Position, STARTPOS};
use crate::moves::movegen::is_legal;
use crate::moves::perft::perft_divide;
use crate::search::threads::Threads;
use std::io::BufRead;
use std::time::Instant;
use tracing::{debug, warn};

pub struct Uci {
    threads: Threads,
    position: Position,
}

impl Default for Uci {
    fn default() -> Self {
        Self::new()
    }
}

impl Uci {
    pub fn new() -> Self {
        Uci {
            threads: Threads::new(1),
            position: Position::startpos(),
        }
    }

    pub fn run(&mut self) {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => break,
            };
            if !self.handle_command(line.trim()) {
                break;
            }
        }
        self.threads.stop();
    }

    /// One command line; returns false on `quit`.
    pub fn handle_command(&mut self, line: &str) -> bool {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(&command) = tokens.first() else {
            return true;
        };

        match command {
            "uci" => {
                println!("id name Lantern");
                println!("id author the Lantern authors");
                println!("option name Threads type spin default 1 min 1 max 64");
                println!("option name Hash type spin default 16 min 1 max 4096");
                println!("uciok");
            }
            "isready" => println!("readyok"),
            "ucinewgame" => self.threads.new_game(),
            "position" => self.parse_position(&tokens[1..]),
            "go" => self.parse_go(&tokens[1..]),
            "setoption" => self.parse_setoption(&tokens[1..]),
            "stop" => self.threads.stop(),
            "quit" => return false,
            "d" => println!("{}", self.position),
            _ => debug!("ignoring unknown command: {}", line),
        }
        true
    }

    fn parse_position(&mut self, tokens: &[&str]) {
        let mut pos = Position::empty();
        let mut rest = tokens;

        match rest.first() {
            Some(&"startpos") => {
                if pos.set_fen(STARTPOS).is_err() {
                    return;
                }
                rest = &rest[1..];
            }
            Some(&"fen") => {
                let end = rest
                    .iter()
                    .position(|&t| t == "moves")
                    .unwrap_or(rest.len());
                let fen = rest[1..end].join(" ");
                if let Err(err) = pos.set_fen(&fen) {
                    warn!("rejected position command: {}", err);
                    return;
                }
                rest = &rest[end..];
            }
            _ => return,
        }

        if rest.first() == Some(&"moves") {
            for token in &rest[1..] {
                let Some(mv) = pos.parse_move(token) else {
                    warn!("rejected unparseable move: {}", token);
                    return;
                };
                if !is_legal(&mut pos, mv) {
                    warn!("rejected illegal move: {}", token);
                    return;
                }
                pos.make(mv);
            }
        }

        self.position = pos;
    }

    fn parse_go(&mut self, tokens: &[&str]) {
        self.threads.stop();

        let grab = |name: &str| -> Option<u64> {
            tokens
                .iter()
                .position(|&t| t == name)
                .and_then(|i| tokens.get(i + 1))
                .and_then(|v| v.parse().ok())
        };

        if let Some(depth) = grab("perft") {
            let start = Instant::now();
            let nodes = perft_divide(&mut self.position, depth as u32);
            let elapsed = start.elapsed().as_secs_f64().max(1e-9);
            println!(
                "{} nodes searched in {:.3}s {} nps",
                nodes,
                elapsed,
                (nodes as f64 / elapsed) as u64
            );
            return;
        }

        if let Some(nodes) = grab("nodes") {
            self.threads.node_search(&self.position, nodes);
            return;
        }

        if tokens.contains(&"infinite") {
            self.threads.infinite_search(&self.position);
            return;
        }

        let (time, inc) = match self.position.side_to_move {
            Color::White => (grab("wtime"), grab("winc").unwrap_or(0)),
            Color::Black => (grab("btime"), grab("binc").unwrap_or(0)),
        };
        let Some(time) = time else {
            debug!("go without a budget ignored");
            return;
        };

        let movestogo = grab("movestogo").unwrap_or(30).min(30);

        let search_time = if movestogo <= 1 {
            // last move of the period: use everything, minus a margin to
            // get the bestmove out
            time.saturating_sub(2).max(1)
        } else {
            time / movestogo + inc * 3 / 4
        };

        self.threads.time_search(&self.position, search_time);
    }

    fn parse_setoption(&mut self, tokens: &[&str]) {
        if tokens.first() != Some(&"name") {
            return;
        }
        let value = tokens
            .iter()
            .position(|&t| t == "value")
            .and_then(|i| tokens.get(i + 1))
            .and_then(|v| v.parse::<usize>().ok());

        match tokens.get(1) {
            Some(&"Threads") => {
                if let Some(n) = value
                    && (1..=64).contains(&n)
                {
                    self.threads.resize(n);
                }
            }
            Some(&"Hash") => {
                if let Some(mb) = value
                    && (1..=4096).contains(&mb)
                {
                    self.threads.stop();
                    self.threads.tt.resize(mb);
                }
            }
            other => debug!("ignoring unknown option: {:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_command_applies_moves() {
        let mut uci = Uci::new();
        uci.handle_command("position startpos moves e2e4 e7e5 g1f3");
        assert_eq!(
            uci.position.to_fen(),
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKBNR b KQkq - 1 2"
        );
    }

    #[test]
    fn malformed_position_keeps_prior_state() {
        let mut uci = Uci::new();
        uci.handle_command("position startpos moves e2e4");
        let before = uci.position.to_fen();
        uci.handle_command("position fen totally/broken w - - 0 1");
        uci.handle_command("position startpos moves e2e5");
        assert_eq!(uci.position.to_fen(), before);
    }

    #[test]
    fn unknown_commands_are_ignored() {
        let mut uci = Uci::new();
        assert!(uci.handle_command("xyzzy with args"));
        assert!(uci.handle_command(""));
        assert!(!uci.handle_command("quit"));
    }
}
