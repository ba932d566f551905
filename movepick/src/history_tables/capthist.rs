//! Capture history: `(moving_piece, destination_square, captured_piece_type) -> score`,
//! used to bias ordering among captures once MVV-LVA has put them in the
//! same rough bracket.

use std::ops::Index;

use chesscore::piece::PieceType;

use super::history::HistoryTable;

#[derive(Copy, Clone, Debug)]
pub struct CaptureHistoryTable {
    tables: [HistoryTable; PieceType::COUNT],
}

impl CaptureHistoryTable {
    pub fn boxed() -> Box<Self> {
        #![allow(clippy::cast_ptr_alignment)]
        // SAFETY: this is a flat array of HistoryTable, itself a flat
        // array of i16s, so a zeroed allocation is a valid instance.
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

impl Index<PieceType> for CaptureHistoryTable {
    type Output = HistoryTable;

    fn index(&self, index: PieceType) -> &Self::Output {
        &self.tables[index]
    }
}

impl std::ops::IndexMut<PieceType> for CaptureHistoryTable {
    fn index_mut(&mut self, index: PieceType) -> &mut Self::Output {
        &mut self.tables[index]
    }
}
