//! Countermove table: stores, for each (piece, destination) pair of the
//! previously played move, a single quiet reply that caused a beta
//! cutoff the last time it was seen. Played right after killer moves.

use std::ops::{Index, IndexMut};

use chesscore::movegen::moves::Move;
use chesscore::piece::Piece;
use chesscore::square::Square;

use super::history::HistoryIndex;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CountermoveTable {
    moves: [[Option<Move>; Square::COUNT]; Piece::COUNT],
}

impl CountermoveTable {
    pub fn boxed() -> Box<Self> {
        #![allow(clippy::cast_ptr_alignment)]
        // SAFETY: flat array of Option<Move>, which is a 16-bit move
        // niche-packed into a 32-bit value; all-zero decodes to `None`.
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

impl Index<HistoryIndex> for CountermoveTable {
    type Output = Option<Move>;

    fn index(&self, index: HistoryIndex) -> &Self::Output {
        &self.moves[index.piece() as usize][index.square() as usize]
    }
}

impl IndexMut<HistoryIndex> for CountermoveTable {
    fn index_mut(&mut self, index: HistoryIndex) -> &mut Self::Output {
        &mut self.moves[index.piece() as usize][index.square() as usize]
    }
}
