//! Bucketed transposition table, shared by every search worker without
//! locks.
//!
//! The table is lossy and racy by design: entries are plain values behind
//! an `UnsafeCell`, and a torn read is rejected by the 16-bit key check
//! stored next to the payload. Workers only ever copy entries out. Mate
//! scores are stored relative to the entry's node (ply added on save,
//! removed on probe) so they stay consistent across root distances.

use crate::moves::types::{Move, NULL_MOVE};
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU8, Ordering};

pub const BUCKET_SIZE: usize = 3;
pub const DEFAULT_TT_MB: usize = 16;

use crate::search::MATE_THRESHOLD;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NodeType {
    Null = 0,
    Exact = 1,
    LowerBound = 2,
    UpperBound = 3,
}

impl NodeType {
    #[inline(always)]
    fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            1 => NodeType::Exact,
            2 => NodeType::LowerBound,
            3 => NodeType::UpperBound,
            _ => NodeType::Null,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TTEntry {
    /// High 16 bits of the Zobrist key; the low bits addressed the bucket.
    pub hash16: u16,
    pub best_move: Move,
    pub score: i16,
    pub s_eval: i16,
    pub depth: i16,
    /// Bits 0-1 node type, bit 2 was-a-pv-node.
    flags: u8,
    pub age: u8,
}

impl TTEntry {
    const fn empty() -> Self {
        TTEntry {
            hash16: 0,
            best_move: NULL_MOVE,
            score: 0,
            s_eval: 0,
            depth: 0,
            flags: 0,
            age: 0,
        }
    }

    #[inline(always)]
    pub fn node_type(&self) -> NodeType {
        NodeType::from_bits(self.flags)
    }

    #[inline(always)]
    pub fn is_pv(&self) -> bool {
        self.flags & 0b100 != 0
    }
}

#[derive(Clone, Copy)]
struct TTBucket {
    entries: [TTEntry; BUCKET_SIZE],
    _pad: [u8; 4],
}

impl TTBucket {
    const fn empty() -> Self {
        TTBucket {
            entries: [TTEntry::empty(); BUCKET_SIZE],
            _pad: [0; 4],
        }
    }
}

pub struct TT {
    buckets: UnsafeCell<Box<[TTBucket]>>,
    generation: AtomicU8,
}

// Concurrent racy access is the contract; see the module docs.
unsafe impl Sync for TT {}
unsafe impl Send for TT {}

impl TT {
    pub fn new(size_mb: usize) -> Self {
        let num_buckets = (size_mb * 1024 * 1024 / std::mem::size_of::<TTBucket>()).max(1);
        TT {
            buckets: UnsafeCell::new(vec![TTBucket::empty(); num_buckets].into_boxed_slice()),
            generation: AtomicU8::new(0),
        }
    }

    #[inline(always)]
    fn num_buckets(&self) -> usize {
        unsafe { (&*self.buckets.get()).len() }
    }

    #[inline(always)]
    fn bucket_ptr(&self, key: u64) -> *mut TTBucket {
        let index = (key % self.num_buckets() as u64) as usize;
        unsafe { (*self.buckets.get()).as_mut_ptr().add(index) }
    }

    /// Reallocates the table. Callers must guarantee no search is running.
    pub fn resize(&self, size_mb: usize) {
        let num_buckets = (size_mb * 1024 * 1024 / std::mem::size_of::<TTBucket>()).max(1);
        unsafe {
            *self.buckets.get() = vec![TTBucket::empty(); num_buckets].into_boxed_slice();
        }
        self.generation.store(0, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        unsafe {
            for bucket in (*self.buckets.get()).iter_mut() {
                *bucket = TTBucket::empty();
            }
        }
        self.generation.store(0, Ordering::Relaxed);
    }

    /// Ages out earlier searches; called once per `go` / new game.
    pub fn next_generation(&self) {
        self.generation.fetch_add(1, Ordering::Relaxed);
    }

    /// Warm the bucket's cache line before it is probed.
    #[inline(always)]
    pub fn prefetch(&self, key: u64) {
        #[cfg(target_arch = "x86_64")]
        unsafe {
            use std::arch::x86_64::{_MM_HINT_T0, _mm_prefetch};
            _mm_prefetch(self.bucket_ptr(key) as *const i8, _MM_HINT_T0);
        }
        #[cfg(not(target_arch = "x86_64"))]
        let _ = key;
    }

    /// Copies out the entry matching `key`, mate scores already adjusted
    /// to `ply`.
    pub fn probe(&self, key: u64, ply: i32) -> Option<TTEntry> {
        let hash16 = (key >> 48) as u16;
        let bucket = unsafe { &*self.bucket_ptr(key) };

        for entry in &bucket.entries {
            let mut entry = *entry;
            if entry.hash16 == hash16 && entry.node_type() != NodeType::Null {
                let score = entry.score as i32;
                if score > MATE_THRESHOLD {
                    entry.score = (score - ply) as i16;
                } else if score < -MATE_THRESHOLD {
                    entry.score = (score + ply) as i16;
                }
                return Some(entry);
            }
        }
        None
    }

    #[allow(clippy::too_many_arguments)]
    pub fn save(
        &self,
        key: u64,
        depth: i32,
        ply: i32,
        best_move: Move,
        mut score: i32,
        node_type: NodeType,
        s_eval: i32,
        is_pv: bool,
    ) {
        let hash16 = (key >> 48) as u16;
        let generation = self.generation.load(Ordering::Relaxed);
        let bucket = unsafe { &mut *self.bucket_ptr(key) };

        if score > MATE_THRESHOLD {
            score += ply;
        } else if score < -MATE_THRESHOLD {
            score -= ply;
        }

        // find the matching entry, or the one with the worst replacement
        // score: depth less an aging penalty
        let mut replace_index = 0;
        let mut worst_score = i32::MAX;
        let mut matched = false;
        for (i, entry) in bucket.entries.iter().enumerate() {
            if entry.hash16 == hash16 && entry.node_type() != NodeType::Null {
                replace_index = i;
                matched = true;
                break;
            }
            let replacement_score =
                entry.depth as i32 - 8 * generation.wrapping_sub(entry.age) as i32;
            if replacement_score < worst_score {
                worst_score = replacement_score;
                replace_index = i;
            }
        }

        // a matching entry only gives way to a deeper or exact result
        if matched {
            let old = &bucket.entries[replace_index];
            if depth < old.depth as i32 && node_type != NodeType::Exact {
                return;
            }
        }

        bucket.entries[replace_index] = TTEntry {
            hash16,
            best_move,
            score: score.clamp(i16::MIN as i32, i16::MAX as i32) as i16,
            s_eval: s_eval.clamp(i16::MIN as i32, i16::MAX as i32) as i16,
            depth: depth as i16,
            flags: node_type as u8 | ((is_pv as u8) << 2),
            age: generation,
        };
    }

    /// Permille of entries from the current generation, sampled from the
    /// first thousand buckets.
    pub fn hashfull(&self) -> usize {
        let generation = self.generation.load(Ordering::Relaxed);
        let sample = self.num_buckets().min(1000);
        let mut filled = 0;
        unsafe {
            for bucket in (*self.buckets.get()).iter().take(sample) {
                for entry in &bucket.entries {
                    if entry.node_type() != NodeType::Null && entry.age == generation {
                        filled += 1;
                    }
                }
            }
        }
        filled * 1000 / (sample * BUCKET_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::MATE_SCORE;

    #[test]
    fn save_then_probe_round_trips() {
        let tt = TT::new(1);
        let mv = Move::from_raw(0x1234);
        tt.save(0xDEAD_BEEF_0000_1234, 7, 0, mv, 42, NodeType::Exact, 17, true);

        let entry = tt.probe(0xDEAD_BEEF_0000_1234, 0).expect("hit");
        assert_eq!(entry.best_move, mv);
        assert_eq!(entry.score, 42);
        assert_eq!(entry.s_eval, 17);
        assert_eq!(entry.depth, 7);
        assert_eq!(entry.node_type(), NodeType::Exact);
        assert!(entry.is_pv());

        assert!(tt.probe(0xDEAD_BEEF_0000_5678 | 1 << 50, 0).is_none());
    }

    #[test]
    fn shallower_non_exact_does_not_replace() {
        let tt = TT::new(1);
        let key = 0x0123_4567_89AB_CDEF;
        tt.save(key, 9, 0, NULL_MOVE, 50, NodeType::Exact, 0, false);
        tt.save(key, 3, 0, NULL_MOVE, -10, NodeType::LowerBound, 0, false);
        assert_eq!(tt.probe(key, 0).unwrap().depth, 9);

        // exact always lands
        tt.save(key, 2, 0, NULL_MOVE, 5, NodeType::Exact, 0, false);
        assert_eq!(tt.probe(key, 0).unwrap().depth, 2);
    }

    #[test]
    fn mate_scores_are_ply_relative() {
        let tt = TT::new(1);
        let key = 0xFFEE_DDCC_BBAA_0099;
        // mate found 4 plies into the search, stored from ply 4
        tt.save(key, 5, 4, NULL_MOVE, MATE_SCORE - 7, NodeType::Exact, 0, false);
        // probed from ply 2 the mate is further away
        let entry = tt.probe(key, 2).unwrap();
        assert_eq!(entry.score as i32, MATE_SCORE - 7 + 4 - 2);
    }

    #[test]
    fn generation_ages_out_entries() {
        let tt = TT::new(1);
        let key = 0x1111_2222_3333_4444;
        tt.save(key, 5, 0, NULL_MOVE, 1, NodeType::Exact, 0, false);
        assert!(tt.hashfull() > 0 || tt.probe(key, 0).is_some());
        tt.next_generation();
        // still probeable, just old
        assert!(tt.probe(key, 0).is_some());
        assert_eq!(tt.hashfull(), 0);
    }
}
