//! Low-ply history: `(ply, from_to_index) -> score`, tracked only for the
//! first few plies of the search where move ordering matters most and
//! games-over-games statistics are most informative.

use std::ops::{Index, IndexMut};

use chesscore::movegen::moves::Move;
use chesscore::square::Square;

use super::history::HistoryScore;
use super::params::LOW_PLY_HISTORY_SIZE;

const FROM_TO_COUNT: usize = Square::COUNT * Square::COUNT;

#[derive(Debug)]
pub struct LowPlyHistoryTable {
    scores: Box<[[HistoryScore; FROM_TO_COUNT]; LOW_PLY_HISTORY_SIZE]>,
}

impl LowPlyHistoryTable {
    pub fn boxed() -> Box<Self> {
        #![allow(clippy::cast_ptr_alignment)]
        // SAFETY: flat array of i16s, zeroed memory is a valid instance.
        unsafe {
            let layout = std::alloc::Layout::new::<[[HistoryScore; FROM_TO_COUNT]; LOW_PLY_HISTORY_SIZE]>();
            let ptr = std::alloc::alloc_zeroed(layout);
            if ptr.is_null() {
                std::alloc::handle_alloc_error(layout);
            }
            let scores = Box::from_raw(ptr.cast());
            Box::new(Self { scores })
        }
    }

    fn from_to(mv: Move) -> usize {
        mv.src() as usize * Square::COUNT + mv.tgt() as usize
    }
}

impl Index<(usize, Move)> for LowPlyHistoryTable {
    type Output = HistoryScore;

    fn index(&self, (ply, mv): (usize, Move)) -> &Self::Output {
        &self.scores[ply][Self::from_to(mv)]
    }
}

impl IndexMut<(usize, Move)> for LowPlyHistoryTable {
    fn index_mut(&mut self, (ply, mv): (usize, Move)) -> &mut Self::Output {
        &mut self.scores[ply][Self::from_to(mv)]
    }
}
