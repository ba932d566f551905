use arrayvec::ArrayVec;

use chesscore::board::Board;
use chesscore::movegen::moves::Move;
use chesscore::piece::PieceType;

use capthist::CaptureHistoryTable;
use conthist::ContHist;
use countermoves::CountermoveTable;
use history::HistoryIndex;
use killers::Killers;
use lowply::LowPlyHistoryTable;
use params::{MAX_DEPTH, CONT_HISTORY_DECAY, HISTORY_DECAY};
use pawnhist::PawnHistoryTable;
use threats::{ThreatIndex, ThreatsHistoryTable};

pub mod capthist;
pub mod conthist;
pub mod countermoves;
pub mod history;
pub mod killers;
pub mod lowply;
pub mod params;
pub mod pawnhist;
pub mod threats;

/// Back-ply offsets the continuation history is consulted at when
/// scoring a quiet move, relative to the current ply.
pub const CONT_HIST_OFFSETS: [usize; 5] = [0, 1, 2, 3, 5];

/// Bundle of every history-like table the move picker consults, plus the
/// bookkeeping (move indices per ply) needed to look up continuation
/// history entries several plies back.
#[derive(Debug)]
pub struct History {
    pub main_hist: Box<ThreatsHistoryTable>,
    pub cont_hist: Box<ContHist>,
    pub capt_hist: Box<CaptureHistoryTable>,
    pub pawn_hist: Box<PawnHistoryTable>,
    pub low_ply_hist: Box<LowPlyHistoryTable>,
    pub countermoves: Box<CountermoveTable>,
    pub killers: [Killers; MAX_DEPTH],
    indices: ArrayVec<HistoryIndex, MAX_DEPTH>,
}

impl History {
    pub fn new() -> Self {
        Self {
            main_hist: ThreatsHistoryTable::boxed(),
            cont_hist: ContHist::boxed(),
            capt_hist: CaptureHistoryTable::boxed(),
            pawn_hist: PawnHistoryTable::boxed(),
            low_ply_hist: LowPlyHistoryTable::boxed(),
            countermoves: CountermoveTable::boxed(),
            killers: [Killers::new(); MAX_DEPTH],
            indices: ArrayVec::new(),
        }
    }

    pub fn push_mv(&mut self, mv: Move, board: &Board) {
        self.indices.push(HistoryIndex::new(board, mv));
    }

    pub fn push_null_mv(&mut self) {
        self.indices.push(HistoryIndex::default());
    }

    pub fn pop_mv(&mut self) {
        self.indices.pop();
    }

    /// The history index played `offset` plies ago, if the stack is deep
    /// enough.
    pub fn indexed_ply(&self, offset: usize) -> Option<HistoryIndex> {
        self.indices
            .len()
            .checked_sub(offset + 1)
            .map(|ply| self.indices[ply])
    }

    pub fn add_quiet_bonus(&mut self, mv: Move, board: &Board, bonus: i32) {
        let idx = HistoryIndex::new(board, mv);
        let threat_idx = ThreatIndex::new(board.threats, mv);

        self.main_hist[threat_idx][idx].update(bonus, HISTORY_DECAY);

        for offset in CONT_HIST_OFFSETS {
            if let Some(parent) = self.indexed_ply(offset) {
                self.cont_hist[parent][idx].update(bonus, CONT_HISTORY_DECAY);
            }
        }
    }

    pub fn add_capture_bonus(&mut self, mv: Move, board: &Board, bonus: i32) {
        let idx = HistoryIndex::new(board, mv);
        let victim = board
            .get_at(mv.get_capture_sq(board.current))
            .map(|p| p.piece_type())
            .unwrap_or(PieceType::Pawn);

        self.capt_hist[victim][idx].update(bonus, HISTORY_DECAY);
    }

    pub fn get_capture_score(&self, mv: Move, board: &Board) -> i32 {
        let idx = HistoryIndex::new(board, mv);
        let victim = board
            .get_at(mv.get_capture_sq(board.current))
            .map(|p| p.piece_type())
            .unwrap_or(PieceType::Pawn);

        i32::from(self.capt_hist[victim][idx])
    }

    pub fn add_countermove(&mut self, mv: Move) {
        if let Some(parent) = self.indices.last() {
            self.countermoves[*parent] = Some(mv);
        }
    }

    pub fn get_countermove(&self) -> Option<Move> {
        self.indices.last().and_then(|&idx| self.countermoves[idx])
    }

    pub fn add_killer(&mut self, ply: usize, mv: Move) {
        self.killers[ply].add(mv);
    }

    pub fn clear_killers(&mut self, ply: usize) {
        self.killers[ply].clear();
    }

    pub fn clear_all_killers(&mut self) {
        self.killers = [Killers::new(); MAX_DEPTH];
    }

    pub fn age_entries(&mut self) {
        self.main_hist.age_entries();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
