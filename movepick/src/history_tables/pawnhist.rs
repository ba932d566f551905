//! Pawn history: `(pawn_structure_index, piece, destination) -> score`.
//!
//! Captures pawn-skeleton-conditioned move quality -- the same quiet
//! move can be excellent in one pawn structure and pointless in
//! another, and the plain history table can't tell those apart.

use std::ops::{Index, IndexMut};

use super::history::HistoryTable;
use super::params::PAWN_HISTORY_SIZE;

#[derive(Debug)]
pub struct PawnHistoryTable {
    tables: Vec<HistoryTable>,
}

impl PawnHistoryTable {
    pub fn boxed() -> Box<Self> {
        Box::new(Self {
            tables: vec![HistoryTable::new(); PAWN_HISTORY_SIZE],
        })
    }

    fn bucket(pawn_structure_index: u64) -> usize {
        pawn_structure_index as usize % PAWN_HISTORY_SIZE
    }
}

impl Index<u64> for PawnHistoryTable {
    type Output = HistoryTable;

    fn index(&self, pawn_structure_index: u64) -> &Self::Output {
        &self.tables[Self::bucket(pawn_structure_index)]
    }
}

impl IndexMut<u64> for PawnHistoryTable {
    fn index_mut(&mut self, pawn_structure_index: u64) -> &mut Self::Output {
        let bucket = Self::bucket(pawn_structure_index);
        &mut self.tables[bucket]
    }
}
