//! Hash discipline: the incremental key must be path-independent, agree
//! with the full recomputation, and react to every hashed feature.

use lantern::board::Position;
use std::str::FromStr;

fn play(pos: &mut Position, moves: &[&str]) {
    for token in moves {
        let mv = pos.parse_move(token).expect(token);
        pos.make(mv);
    }
}

#[test]
fn transpositions_hash_identically() {
    // 1. Nf3 Nf6 2. g3 g6  reached via both move orders
    let mut first = Position::startpos();
    play(&mut first, &["g1f3", "g8f6", "g2g3", "g7g6"]);

    let mut second = Position::startpos();
    play(&mut second, &["g2g3", "g7g6", "g1f3", "g8f6"]);

    assert_eq!(first.z_key, second.z_key);
    assert_eq!(first.to_fen(), second.to_fen());
}

#[test]
fn en_passant_rights_split_the_hash() {
    // same piece placement; only one history allows ...dxe3
    let mut capturable = Position::from_str("4k3/8/8/8/3p4/8/4P3/4K3 w - - 0 1").unwrap();
    play(&mut capturable, &["e2e4"]);

    let mut dead = Position::from_str("4k3/8/8/8/3p4/8/4P3/4K3 w - - 0 1").unwrap();
    play(&mut dead, &["e2e3", "e8d8", "e3e4", "d8e8"]);

    // one pawn double-pushed with a capture available, the other walked
    assert_ne!(capturable.en_passant, 0);
    assert_eq!(dead.en_passant, 0);
    assert_ne!(capturable.z_key, dead.z_key);

    // once the ep chance expires the keys converge again
    play(&mut capturable, &["e8d8", "e1e2", "d8e8", "e2e1"]);
    play(&mut dead, &["e8d8", "e1e2", "d8e8", "e2e1"]);
    assert_eq!(capturable.z_key, dead.z_key);
}

#[test]
fn castle_rights_split_the_hash() {
    let rights = Position::from_str("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
    let none = Position::from_str("r3k2r/8/8/8/8/8/8/R3K2R w - - 0 1").unwrap();
    assert_ne!(rights.z_key, none.z_key);

    // shuffling a rook out and back burns the right and the key shows it
    let mut shuffled = Position::from_str("r3k2r/p7/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
    play(&mut shuffled, &["a1a2", "a7a6", "a2a1", "a6a5"]);
    assert_eq!(shuffled.to_fen(), "r3k2r/8/8/p7/8/8/8/R3K2R w Kkq - 0 3");
    let same_placement = Position::from_str("r3k2r/8/8/p7/8/8/8/R3K2R w KQkq - 0 3").unwrap();
    assert_ne!(shuffled.z_key, same_placement.z_key);
    assert_eq!(shuffled.z_key, shuffled.generate_zobrist());
}

#[test]
fn side_to_move_is_hashed() {
    let white = Position::from_str("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
    let black = Position::from_str("4k3/8/8/8/8/8/8/4K3 b - - 0 1").unwrap();
    assert_ne!(white.z_key, black.z_key);
}

#[test]
fn long_game_keeps_incremental_parity() {
    let mut pos = Position::startpos();
    play(
        &mut pos,
        &[
            "e2e4", "c7c5", "g1f3", "d7d6", "d2d4", "c5d4", "f3d4", "g8f6", "b1c3", "a7a6",
            "c1e3", "e7e5", "d4b3", "c8e6", "f2f3", "f8e7", "d1d2", "e8g8", "e1c1", "b8d7",
        ],
    );
    assert_eq!(pos.z_key, pos.generate_zobrist());

    // unwinding the whole line restores the start key
    for _ in 0..20 {
        pos.unmake();
    }
    assert_eq!(pos.z_key, Position::startpos().z_key);
}

#[test]
fn promotions_hash_the_new_piece() {
    let mut pos = Position::from_str("4k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
    play(&mut pos, &["a7a8q"]);
    assert_eq!(pos.z_key, pos.generate_zobrist());

    let direct = Position::from_str("Q3k3/8/8/8/8/8/8/4K3 b - - 0 1").unwrap();
    assert_eq!(pos.z_key, direct.z_key);
}
