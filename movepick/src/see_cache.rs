//! A per-worker, direct-mapped cache of Static Exchange Evaluation
//! results.
//!
//! Keyed by a hash derived from the position, the move, and the piece
//! being captured. `probe` only returns a hit when the full identity
//! (key, destination, attacked piece) matches; otherwise the caller
//! falls back to computing SEE from scratch, exactly as on a cold
//! cache. `save` always overwrites, so two colliding entries simply
//! evict one another -- there is no eviction policy to get right.

use chesscore::movegen::moves::Move;
use chesscore::piece::PieceType;
use chesscore::square::Square;

use crate::zobrist::ZHash;

/// Number of slots in the table. A power of two so the slot index is a
/// cheap mask instead of a modulo.
const SEE_CACHE_SIZE: usize = 1 << 14;

#[derive(Debug, Clone, Copy)]
struct SeeCacheEntry {
    key: u64,
    destination: Square,
    attacked: PieceType,
    value: i32,
}

#[derive(Debug)]
pub struct SeeCache {
    slots: Vec<Option<SeeCacheEntry>>,
}

impl SeeCache {
    pub fn new() -> Self {
        Self {
            slots: vec![None; SEE_CACHE_SIZE],
        }
    }

    fn key(hash: ZHash, mv: Move, attacked: PieceType) -> u64 {
        let mut h = hash.0;
        h ^= mv.src() as u64;
        h ^= (mv.tgt() as u64) << 8;
        h ^= (attacked as u64) << 16;
        h
    }

    fn slot(key: u64) -> usize {
        (key as usize) & (SEE_CACHE_SIZE - 1)
    }

    /// Look up a cached SEE value for the given position/move/attacked
    /// piece triple. Returns `None` on any mismatch, including an empty
    /// slot or a slot occupied by a colliding entry.
    pub fn probe(&self, hash: ZHash, mv: Move, attacked: PieceType) -> Option<i32> {
        let key = Self::key(hash, mv, attacked);
        let entry = self.slots[Self::slot(key)]?;

        if entry.key == key && entry.destination == mv.tgt() && entry.attacked == attacked {
            Some(entry.value)
        } else {
            None
        }
    }

    /// Unconditionally store a SEE result, overwriting whatever
    /// occupied the slot.
    pub fn save(&mut self, hash: ZHash, mv: Move, attacked: PieceType, value: i32) {
        let key = Self::key(hash, mv, attacked);

        self.slots[Self::slot(key)] = Some(SeeCacheEntry {
            key,
            destination: mv.tgt(),
            attacked,
            value,
        });
    }

    pub fn clear(&mut self) {
        self.slots.fill(None);
    }
}

impl Default for SeeCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chesscore::square::Square;
    use chesscore::movegen::moves::MoveType;

    fn mv(src: Square, tgt: Square) -> Move {
        Move::new(src, tgt, MoveType::Capture)
    }

    #[test]
    fn round_trip_returns_saved_value() {
        let mut cache = SeeCache::new();
        let hash = ZHash(42);
        let m = mv(Square::E2, Square::E4);

        cache.save(hash, m, PieceType::Pawn, 100);
        assert_eq!(cache.probe(hash, m, PieceType::Pawn), Some(100));
    }

    #[test]
    fn miss_on_empty_slot() {
        let cache = SeeCache::new();
        let hash = ZHash(7);
        let m = mv(Square::A2, Square::A4);

        assert_eq!(cache.probe(hash, m, PieceType::Pawn), None);
    }

    #[test]
    fn overwrite_replaces_prior_entry() {
        let mut cache = SeeCache::new();
        let hash = ZHash(1);
        let m = mv(Square::D2, Square::D4);

        cache.save(hash, m, PieceType::Pawn, 100);
        cache.save(hash, m, PieceType::Pawn, -200);
        assert_eq!(cache.probe(hash, m, PieceType::Pawn), Some(-200));
    }
}
