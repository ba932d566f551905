//! Continuation history: `(piece, destination) -> score`, conditioned on
//! the move played at a specific back-ply offset. The picker consults
//! entries at offsets {0, 1, 2, 3, 5} back from the current ply, so this
//! table stores one flat `HistoryTable` per conditioning move rather than
//! per offset -- the offsets just pick which stored index to look up.

use std::ops::{Index, IndexMut};

use chesscore::piece::Piece;
use chesscore::square::Square;

use super::history::{HistoryIndex, HistoryTable};

#[derive(Debug)]
pub struct ContHist {
    table: [[HistoryTable; Square::COUNT]; Piece::COUNT],
}

impl ContHist {
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
}

impl Index<HistoryIndex> for ContHist {
    type Output = HistoryTable;

    fn index(&self, index: HistoryIndex) -> &Self::Output {
        &self.table[index.piece() as usize][index.square() as usize]
    }
}

impl IndexMut<HistoryIndex> for ContHist {
    fn index_mut(&mut self, index: HistoryIndex) -> &mut Self::Output {
        &mut self.table[index.piece() as usize][index.square() as usize]
    }
}
