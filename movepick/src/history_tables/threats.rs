//! Threat-conditioned main history: splits the flat history table into
//! four buckets based on whether the move's source and/or destination
//! square is under enemy attack. Moves that escape a threat or wander
//! into one behave very differently, so bucketing by threat status
//! sharpens the score the plain butterfly history would otherwise blur.

use std::ops::{Index, IndexMut};

use chesscore::bitboard::Bitboard;
use chesscore::movegen::moves::Move;

use super::history::HistoryTable;

#[derive(Debug)]
pub struct ThreatsHistoryTable {
    tables: [[HistoryTable; 2]; 2],
}

impl ThreatsHistoryTable {
    pub fn boxed() -> Box<Self> {
        #![allow(clippy::cast_ptr_alignment)]
        // SAFETY: flat array of HistoryTable, itself a flat array of
        // i16s, so zeroed memory is a valid instance.
        unsafe {
            let layout = std::alloc::Layout::new::<Self>();
            let ptr = std::alloc::alloc_zeroed(layout);
            if ptr.is_null() {
                std::alloc::handle_alloc_error(layout);
            }
            Box::from_raw(ptr.cast())
        }
    }

    pub fn age_entries(&mut self) {
        for tables in &mut self.tables {
            for table in tables {
                table.age_entries();
            }
        }
    }
}

impl Index<ThreatIndex> for ThreatsHistoryTable {
    type Output = HistoryTable;

    fn index(&self, index: ThreatIndex) -> &Self::Output {
        let from_threat = index.threats.contains(index.mv.src());
        let to_threat = index.threats.contains(index.mv.tgt());

        &self.tables[from_threat as usize][to_threat as usize]
    }
}

impl IndexMut<ThreatIndex> for ThreatsHistoryTable {
    fn index_mut(&mut self, index: ThreatIndex) -> &mut Self::Output {
        let from_threat = index.threats.contains(index.mv.src());
        let to_threat = index.threats.contains(index.mv.tgt());

        &mut self.tables[from_threat as usize][to_threat as usize]
    }
}

#[derive(Copy, Clone, Debug)]
pub struct ThreatIndex {
    threats: Bitboard,
    mv: Move,
}

impl ThreatIndex {
    pub fn new(threats: Bitboard, mv: Move) -> Self {
        Self { threats, mv }
    }
}
