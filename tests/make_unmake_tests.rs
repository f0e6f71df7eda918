//! Position invariants under make/unmake: bitwise round trips, Zobrist
//! parity, occupancy coherence and mailbox agreement, exercised over a
//! FEN corpus and seeded random walks.

use lantern::board::{Color, PIECE_TYPES, Piece, Position};
use lantern::moves::movegen::generate_legal;
use lantern::moves::types::MoveList;
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::str::FromStr;

const CORPUS: [&str; 8] = [
    lantern::board::STARTPOS,
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
    "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
    "4k3/8/8/1pP5/8/8/8/4K3 w - b6 0 1",
    "8/8/8/8/8/6k1/4q3/6K1 w - - 40 1",
    "r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 0 1",
];

fn check_coherence(pos: &Position, context: &str) {
    // white and black occupancy partition the total
    assert_eq!(
        pos.occupancy(Color::White) & pos.occupancy(Color::Black),
        0,
        "{}",
        context
    );
    assert_eq!(
        pos.occupancy(Color::White) | pos.occupancy(Color::Black),
        pos.occupied(),
        "{}",
        context
    );

    // exactly one king each
    for color in [Color::White, Color::Black] {
        assert_eq!(
            pos.pieces(lantern::board::PieceType::King, color).count_ones(),
            1,
            "{}",
            context
        );
    }

    // the mailbox and the piece boards tell the same story
    for sq in 0..64 {
        let piece = pos.piece_at(sq);
        let on_some_board = PIECE_TYPES.iter().any(|&kind| {
            [Color::White, Color::Black]
                .iter()
                .any(|&color| pos.pieces(kind, color) & (1u64 << sq) != 0)
        });
        assert_eq!(piece != Piece::None, on_some_board, "square {} {}", sq, context);
        if piece != Piece::None {
            assert!(
                pos.pieces(piece.kind(), piece.color()) & (1u64 << sq) != 0,
                "square {} {}",
                sq,
                context
            );
        }
    }

    // incremental hash equals the recomputation
    assert_eq!(pos.z_key, pos.generate_zobrist(), "{}", context);
}

#[test]
fn every_move_round_trips_bitwise() {
    for fen in CORPUS {
        let mut pos = Position::from_str(fen).unwrap();
        let fen_before = pos.to_fen();
        let key_before = pos.z_key;

        let mut moves = MoveList::new();
        generate_legal(&mut pos, &mut moves);
        for mv in moves.iter().collect::<Vec<_>>() {
            pos.make(mv);
            check_coherence(&pos, &format!("{} after {}", fen, mv));
            pos.unmake();
            assert_eq!(pos.to_fen(), fen_before, "after {}", mv);
            assert_eq!(pos.z_key, key_before, "after {}", mv);
            check_coherence(&pos, &format!("{} after undoing {}", fen, mv));
        }
    }
}

#[test]
fn random_walks_stay_coherent() {
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);

    for fen in CORPUS {
        let mut pos = Position::from_str(fen).unwrap();
        let mut made = 0;

        for step in 0..120 {
            let mut moves = MoveList::new();
            generate_legal(&mut pos, &mut moves);
            if moves.is_empty() {
                break;
            }
            let mv = moves[rng.random_range(0..moves.len())].mv;
            pos.make(mv);
            made += 1;
            check_coherence(&pos, &format!("{} walk step {}", fen, step));
        }

        // unwind the whole game and land exactly where we started
        for _ in 0..made {
            pos.unmake();
        }
        assert_eq!(pos.to_fen(), Position::from_str(fen).unwrap().to_fen());
        check_coherence(&pos, fen);
    }
}

#[test]
fn fifty_move_counter_resets_on_pawn_and_capture() {
    let mut pos = Position::startpos();
    pos.make(pos.parse_move("g1f3").unwrap());
    assert_eq!(pos.fifty_move, 1);
    pos.make(pos.parse_move("b8c6").unwrap());
    assert_eq!(pos.fifty_move, 2);
    pos.make(pos.parse_move("e2e4").unwrap());
    assert_eq!(pos.fifty_move, 0);
    pos.make(pos.parse_move("c6d4").unwrap());
    assert_eq!(pos.fifty_move, 1);
    pos.make(pos.parse_move("f3d4").unwrap());
    assert_eq!(pos.fifty_move, 0);
}

#[test]
fn null_move_keeps_zobrist_parity() {
    for fen in CORPUS {
        let mut pos = Position::from_str(fen).unwrap();
        let before = pos.to_fen();
        pos.make_null();
        assert_eq!(pos.z_key, pos.generate_zobrist(), "{}", fen);
        pos.unmake_null();
        assert_eq!(pos.to_fen(), before, "{}", fen);
    }
}
