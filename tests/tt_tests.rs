use lantern::moves::types::{Move, NULL_MOVE};
use lantern::search::tt::{NodeType, TT};
use lantern::search::{MATE_SCORE, MATE_THRESHOLD};

#[test]
fn probe_after_save_returns_exact_bound() {
    let tt = TT::new(2);
    for i in 0..500u64 {
        let key = i.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1 << 63;
        tt.save(
            key,
            6,
            0,
            Move::from_raw((i % 0xFFFF) as u16),
            i as i32 % 1000,
            NodeType::Exact,
            0,
            false,
        );
        let entry = tt.probe(key, 0).expect("fresh save must be probeable");
        assert_eq!(entry.node_type(), NodeType::Exact);
        assert!(entry.depth >= 6);
    }
}

#[test]
fn missing_key_is_a_clean_miss() {
    let tt = TT::new(1);
    assert!(tt.probe(0x1234_5678_9ABC_DEF0, 0).is_none());
    tt.save(1, 1, 0, NULL_MOVE, 0, NodeType::LowerBound, 0, false);
    // same bucket, different high bits
    assert!(tt.probe(1 | 0xABCD << 48, 0).is_none());
}

#[test]
fn clear_forgets_everything() {
    let tt = TT::new(1);
    tt.save(42, 9, 0, NULL_MOVE, 77, NodeType::Exact, 5, true);
    assert!(tt.probe(42, 0).is_some());
    tt.clear();
    assert!(tt.probe(42, 0).is_none());
    assert_eq!(tt.hashfull(), 0);
}

#[test]
fn mate_scores_survive_different_root_distances() {
    let tt = TT::new(1);
    let key = 0xAA55_AA55_AA55_AA55;

    // a mate discovered at ply 6 scores MATE - 9 from that node
    let score_at_node = MATE_SCORE - 9;
    tt.save(key, 8, 6, NULL_MOVE, score_at_node, NodeType::Exact, 0, true);

    // the same node reached at ply 3 in a later search
    let probed = tt.probe(key, 3).unwrap();
    assert_eq!(probed.score as i32, MATE_SCORE - 9 + 6 - 3);
    assert!(probed.score as i32 > MATE_THRESHOLD);

    // and mated-side scores mirror
    tt.save(key, 8, 6, NULL_MOVE, -score_at_node, NodeType::Exact, 0, true);
    let probed = tt.probe(key, 3).unwrap();
    assert_eq!(probed.score as i32, -(MATE_SCORE - 9 + 6 - 3));
}

#[test]
fn resize_drops_contents_but_stays_usable() {
    let tt = TT::new(1);
    tt.save(7, 3, 0, NULL_MOVE, 10, NodeType::UpperBound, 0, false);
    tt.resize(2);
    assert!(tt.probe(7, 0).is_none());
    tt.save(7, 3, 0, NULL_MOVE, 10, NodeType::UpperBound, 0, false);
    assert!(tt.probe(7, 0).is_some());
}

#[test]
fn concurrent_hammering_never_returns_garbage_bounds() {
    use std::sync::Arc;

    // the table is racy by contract; what it must never do is hand back
    // an entry whose key check passed but whose fields are from nowhere
    let tt = Arc::new(TT::new(1));
    let mut handles = Vec::new();
    for t in 0..4u64 {
        let tt = Arc::clone(&tt);
        handles.push(std::thread::spawn(move || {
            for i in 0..20_000u64 {
                let key = (i % 512).wrapping_mul(0x2545_F491_4F6C_DD1D) ^ t << 60;
                tt.save(
                    key,
                    (i % 32) as i32,
                    0,
                    Move::from_raw(i as u16),
                    (i % 2000) as i32 - 1000,
                    NodeType::LowerBound,
                    0,
                    false,
                );
                if let Some(entry) = tt.probe(key, 0) {
                    assert!(entry.depth >= 0 && entry.depth < 64);
                    assert!(entry.score.abs() <= 1000);
                }
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
}
