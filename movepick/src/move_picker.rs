//! The staged move picker: a lazy, scored, partially-sorted move
//! enumerator used at every search node.
//!
//! Rather than generating and sorting the full legal move list up
//! front, the picker only does as much work as the caller actually asks
//! for by repeatedly calling [`MovePicker::next_move`]. Moves are
//! produced in roughly best-first order: the transposition-table move,
//! then captures (good ones first, bad ones last), then quiets (again
//! good ones first).
//!
//! The state machine is a tagged enum rather than virtual dispatch, and
//! re-entrant: each call to `next_move` picks up wherever the last call
//! left off by matching on `self.stage`.

use arrayvec::ArrayVec;

use chesscore::movegen::move_array::MoveArray;
use chesscore::movegen::moves::Move;
use chesscore::piece::PieceType;
use chesscore::square::Square;

use crate::history_tables::{History, CONT_HIST_OFFSETS};
use crate::position::Position;

const PIECE_VALS: [i32; PieceType::COUNT] = [100, 300, 300, 500, 900, 0];

/// Multiplier applied to the captured piece's value when scoring
/// captures, before adding the capture-history term.
const CAPTURE_VALUE_MULT: i32 = 16;

/// Bonus for a quiet move that gives check with SEE at least this good.
const CHECK_BONUS: i32 = 16384;
const CHECK_SEE_THRESHOLD: i32 = -75;

/// Per-piece-type bonus/penalty for threat migration, indexed by
/// `PieceType`. Pawns and kings don't participate.
const THREAT_MIGRATION_BONUS: [i32; PieceType::COUNT] = [0, 144, 144, 256, 517, 0];

const QUIET_CHECK_DEPTH_THRESHOLD: i32 = 0;

/// Sentinel score marking a capture that failed its SEE check; it's
/// pushed to the bad-capture tail and replayed later in whatever order
/// it was discovered, not resorted.
const BAD_CAPTURE: i32 = i32::MIN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    MainTT,
    CaptureInit,
    GoodCapture,
    QuietInit,
    GoodQuiet,
    BadCapture,
    BadQuiet,

    EvasionTT,
    EvasionInit,
    Evasion,

    ProbCutTT,
    ProbCutInit,
    ProbCutCapture,

    QSearchTT,
    QCaptureInit,
    QCapture,
    QuietCheck,

    Done,
}

/// The three ways a picker can be constructed, per the public contract.
pub enum PickerMode {
    /// Main search or quiescence; `depth` decides which branch of the
    /// state machine is entered.
    Normal,
    /// Only captures with SEE at least `threshold` are ever yielded.
    ProbCut { threshold: i32 },
    /// Only captures landing on `square` are ever yielded (deep
    /// quiescence recapture search).
    Recapture { square: Square },
}

pub struct MovePicker<'pos> {
    stage: Stage,
    moves: MoveArray,
    scores: [i32; MoveArray::SIZE],
    illegal: [bool; MoveArray::SIZE],
    last_yielded: Option<usize>,

    index: usize,
    quiet_index: usize,
    bad_capture_index: usize,
    bad_quiet_start: Option<usize>,

    tt_move: Option<Move>,
    tt_move_done: bool,

    depth: i32,
    ply: usize,
    skip_quiets: bool,
    quiet_checks_appended: bool,

    mode_threshold: Option<i32>,
    recapture_sq: Option<Square>,

    killers: ArrayVec<Move, 2>,
    countermove: Option<Move>,

    position: &'pos Position,
    history: &'pos History,
}

impl<'pos> MovePicker<'pos> {
    pub fn new(
        position: &'pos Position,
        tt_move: Option<Move>,
        depth: i32,
        ply: usize,
        history: &'pos History,
        mode: PickerMode,
    ) -> Self {
        let in_check = position.in_check();

        let (mode_threshold, recapture_sq) = match mode {
            PickerMode::Normal => (None, None),
            PickerMode::ProbCut { threshold } => (Some(threshold), None),
            PickerMode::Recapture { square } => (None, Some(square)),
        };

        let tt_move = tt_move.filter(|&mv| Self::tt_move_is_usable(position, mv, mode_threshold));

        let killers: ArrayVec<Move, 2> = history
            .killers
            .get(ply)
            .map(|k| k.moves().iter().copied().collect())
            .unwrap_or_default();

        let mut countermove = history.get_countermove();
        if countermove.is_some() && killers.contains(&countermove.unwrap()) {
            countermove = None;
        }

        let initial_stage = if mode_threshold.is_some() {
            Stage::ProbCutTT
        } else if in_check {
            Stage::EvasionTT
        } else if depth > 0 {
            Stage::MainTT
        } else {
            Stage::QSearchTT
        };

        let stage = if tt_move.is_some() {
            initial_stage
        } else {
            Self::advance(initial_stage)
        };

        MovePicker {
            stage,
            moves: MoveArray::new(),
            scores: [0; MoveArray::SIZE],
            illegal: [false; MoveArray::SIZE],
            last_yielded: None,
            index: 0,
            quiet_index: 0,
            bad_capture_index: 0,
            bad_quiet_start: None,
            tt_move,
            tt_move_done: false,
            depth,
            ply,
            skip_quiets: false,
            quiet_checks_appended: false,
            mode_threshold,
            recapture_sq,
            killers,
            countermove,
            position,
            history,
        }
    }

    fn tt_move_is_usable(position: &Position, mv: Move, probcut_threshold: Option<i32>) -> bool {
        if !position.pseudo_legal(mv) {
            return false;
        }

        match probcut_threshold {
            Some(threshold) => position.capture(mv) && position.see_ge(mv, threshold),
            None => true,
        }
    }

    fn advance(stage: Stage) -> Stage {
        use Stage::*;
        match stage {
            MainTT => CaptureInit,
            CaptureInit => GoodCapture,
            GoodCapture => QuietInit,
            QuietInit => GoodQuiet,
            GoodQuiet => BadCapture,
            BadCapture => BadQuiet,
            BadQuiet => Done,

            EvasionTT => EvasionInit,
            EvasionInit => Evasion,
            Evasion => Done,

            ProbCutTT => ProbCutInit,
            ProbCutInit => ProbCutCapture,
            ProbCutCapture => Done,

            QSearchTT => QCaptureInit,
            QCaptureInit => QCapture,
            QCapture => QuietCheck,
            QuietCheck => Done,

            Done => Done,
        }
    }

    ////////////////////////////////////////////////////////////////////////
    // Public contract
    ////////////////////////////////////////////////////////////////////////

    pub fn skip_quiet_moves(&mut self) {
        self.skip_quiets = true;
    }

    /// Flag the last move returned by `next_move` as illegal, so
    /// `other_piece_types_mobile` ignores it.
    pub fn mark_current_illegal(&mut self) {
        if let Some(idx) = self.last_yielded {
            self.illegal[idx] = true;
        }
    }

    /// During a quiet stage, whether any already-generated legal move is
    /// not moved by `piece_type`. Outside a quiet stage the picker can't
    /// answer, so it conservatively returns `true`.
    pub fn other_piece_types_mobile(&self, piece_type: PieceType) -> bool {
        if !matches!(self.stage, Stage::GoodQuiet | Stage::BadQuiet) {
            return true;
        }

        self.moves[..self.index].iter().enumerate().any(|(i, &mv)| {
            if self.illegal[i] {
                return false;
            }
            self.position
                .moved_piece(mv)
                .map(|p| p.piece_type() != piece_type)
                .unwrap_or(false)
        })
    }

    pub fn next_move(&mut self) -> Option<Move> {
        let mv = self.next_move_inner();
        self.last_yielded = None;

        if let Some(mv) = mv {
            if let Some(idx) = self.find_index(mv) {
                self.last_yielded = Some(idx);
            }
        }

        mv
    }

    fn find_index(&self, mv: Move) -> Option<usize> {
        self.moves[..self.moves.len()].iter().position(|&m| m == mv)
    }

    ////////////////////////////////////////////////////////////////////////
    // Buffer helpers
    ////////////////////////////////////////////////////////////////////////

    fn swap(&mut self, i: usize, j: usize) {
        self.moves.swap(i, j);
        self.scores.swap(i, j);
    }

    /// Swap the maximum-scored element in `[start, end)` to `start` and
    /// return it. Linear in the range length.
    fn pick_best(&mut self, start: usize, end: usize) -> Option<Move> {
        if start >= end {
            return None;
        }

        let mut best = start;
        for i in (start + 1)..end {
            if self.scores[i] > self.scores[best] {
                best = i;
            }
        }

        self.swap(start, best);
        Some(self.moves[start])
    }

    fn push_moves(&mut self, moves: Vec<Move>) {
        for mv in moves {
            self.moves.push(mv);
        }
    }

    ////////////////////////////////////////////////////////////////////////
    // Scoring
    ////////////////////////////////////////////////////////////////////////

    fn score_capture(&self, mv: Move) -> i32 {
        let board = &self.position.board;
        let us = board.current;
        let them = !us;

        let victim = board
            .get_at(mv.get_capture_sq(us))
            .map(|p| p.piece_type())
            .unwrap_or_else(|| mv.get_promo_type().unwrap_or(PieceType::Pawn));

        let mut mult = CAPTURE_VALUE_MULT;

        let blockers = self.position.blockers_for_king(them);
        if blockers.contains(mv.src()) && !squares_aligned(self.position.king_square(them), mv.src(), mv.tgt()) {
            mult *= 2;
        }

        mult * PIECE_VALS[victim] + self.history.get_capture_score(mv, board)
    }

    fn score_quiet(&self, mv: Move) -> i32 {
        let board = &self.position.board;
        let us = board.current;
        let piece_type = self
            .position
            .moved_piece(mv)
            .map(|p| p.piece_type())
            .unwrap_or(PieceType::Pawn);

        let mut score = 0;
        score += i32::from(self.history.main_hist[crate::history_tables::threats::ThreatIndex::new(board.threats, mv)]
            [crate::history_tables::history::HistoryIndex::new(board, mv)]);

        let pawn_idx = self.position.pawn_structure_index();
        score += i32::from(self.history.pawn_hist[pawn_idx][crate::history_tables::history::HistoryIndex::new(board, mv)]);

        for &offset in &CONT_HIST_OFFSETS {
            if let Some(parent) = self.history.indexed_ply(offset) {
                score += i32::from(self.history.cont_hist[parent][crate::history_tables::history::HistoryIndex::new(board, mv)]);
            }
        }

        if self.ply < crate::history_tables::params::LOW_PLY_HISTORY_SIZE {
            let low_ply_score = i32::from(self.history.low_ply_hist[(self.ply, mv)]);
            score += 8 * low_ply_score / (1 + 2 * self.ply as i32);
        }

        if self.position.check_squares(piece_type).contains(mv.tgt()) && self.position.see_ge(mv, CHECK_SEE_THRESHOLD) {
            score += CHECK_BONUS;
        }

        if matches!(piece_type, PieceType::Knight | PieceType::Bishop | PieceType::Rook | PieceType::Queen) {
            let bonus = THREAT_MIGRATION_BONUS[piece_type];
            let lesser_attackers = lesser_piece_attackers(self.position, !us, piece_type);

            let origin_threatened = lesser_attackers.contains(mv.src());
            let dest_threatened = lesser_attackers.contains(mv.tgt());

            if origin_threatened && !dest_threatened {
                score += bonus;
            } else if dest_threatened {
                score -= bonus;
            }
        }

        if self.killers.contains(&mv) {
            score += 10_000;
        }

        if self.countermove == Some(mv) {
            score += 10_000;
        }

        score
    }

    fn score_evasion(&self, mv: Move) -> i32 {
        let board = &self.position.board;

        if self.position.capture(mv) {
            let victim = board
                .get_at(mv.get_capture_sq(board.current))
                .map(|p| p.piece_type())
                .unwrap_or(PieceType::Pawn);

            PIECE_VALS[victim] + (1 << 28)
        } else {
            let idx = crate::history_tables::history::HistoryIndex::new(board, mv);
            let threat_idx = crate::history_tables::threats::ThreatIndex::new(board.threats, mv);
            let mut score = i32::from(self.history.main_hist[threat_idx][idx]);

            if let Some(parent) = self.history.indexed_ply(0) {
                score += i32::from(self.history.cont_hist[parent][idx]);
            }

            score
        }
    }

    /// Dynamic SEE threshold gating good vs. bad captures: more
    /// history-favoured captures get more SEE slack.
    fn see_threshold(score: i32) -> i32 {
        -score / 18
    }

    ////////////////////////////////////////////////////////////////////////
    // The state machine
    ////////////////////////////////////////////////////////////////////////

    fn next_move_inner(&mut self) -> Option<Move> {
        loop {
            match self.stage {
                Stage::MainTT | Stage::EvasionTT | Stage::ProbCutTT | Stage::QSearchTT => {
                    self.stage = Self::advance(self.stage);
                    if !self.tt_move_done {
                        self.tt_move_done = true;
                        if let Some(mv) = self.tt_move {
                            return Some(mv);
                        }
                    }
                }

                Stage::CaptureInit | Stage::ProbCutInit | Stage::QCaptureInit => {
                    let captures = self.position.captures();
                    self.push_moves(captures);
                    self.quiet_index = self.moves.len();
                    self.bad_capture_index = self.index;

                    for i in self.index..self.moves.len() {
                        self.scores[i] = self.score_capture(self.moves[i]);
                    }

                    self.stage = Self::advance(self.stage);
                }

                Stage::GoodCapture => {
                    while self.index < self.quiet_index {
                        let mv = self.pick_best(self.index, self.quiet_index).unwrap();
                        let i = self.index;
                        self.index += 1;

                        if Some(mv) == self.tt_move {
                            continue;
                        }

                        let threshold = Self::see_threshold(self.scores[i]);
                        if self.position.see_ge(mv, threshold) {
                            return Some(mv);
                        }

                        self.scores[i] = BAD_CAPTURE;
                    }

                    self.stage = Self::advance(self.stage);
                }

                Stage::QuietInit => {
                    if !self.skip_quiets {
                        let quiets = self.position.quiets();
                        self.push_moves(quiets);

                        for i in self.quiet_index..self.moves.len() {
                            self.scores[i] = self.score_quiet(self.moves[i]);
                        }
                    }

                    self.bad_quiet_start = Some(self.moves.len());
                    self.index = self.quiet_index;
                    self.stage = Self::advance(self.stage);
                }

                Stage::GoodQuiet => {
                    if self.skip_quiets {
                        self.stage = Self::advance(self.stage);
                        continue;
                    }

                    let end = self.bad_quiet_start.unwrap_or(self.moves.len());

                    if self.index < end {
                        let limit = -3560 * self.depth;
                        let mv = self.pick_best(self.index, end).unwrap();
                        let score = self.scores[self.index];
                        let i = self.index;
                        self.index += 1;

                        if score <= -7998 || score < limit {
                            self.bad_quiet_start = Some(i);
                            self.index = i;
                            self.stage = Self::advance(self.stage);
                            continue;
                        }

                        if Some(mv) == self.tt_move {
                            continue;
                        }

                        return Some(mv);
                    }

                    self.stage = Self::advance(self.stage);
                }

                Stage::BadCapture => {
                    while self.bad_capture_index < self.quiet_index {
                        let i = self.bad_capture_index;
                        self.bad_capture_index += 1;

                        if self.scores[i] == BAD_CAPTURE {
                            let mv = self.moves[i];
                            if Some(mv) != self.tt_move {
                                return Some(mv);
                            }
                        }
                    }

                    self.stage = Self::advance(self.stage);
                }

                Stage::BadQuiet => {
                    if self.skip_quiets {
                        self.stage = Stage::Done;
                        continue;
                    }

                    let start = self.bad_quiet_start.unwrap_or(self.moves.len());
                    let end = self.moves.len();
                    self.index = self.index.max(start);

                    while self.index < end {
                        let mv = self.moves[self.index];
                        self.index += 1;

                        if Some(mv) == self.tt_move {
                            continue;
                        }

                        return Some(mv);
                    }

                    self.stage = Stage::Done;
                }

                Stage::EvasionInit => {
                    let evasions = self.position.all_moves();
                    self.push_moves(evasions);

                    for i in self.index..self.moves.len() {
                        self.scores[i] = self.score_evasion(self.moves[i]);
                    }

                    self.stage = Self::advance(self.stage);
                }

                Stage::Evasion => {
                    while self.index < self.moves.len() {
                        let mv = self.pick_best(self.index, self.moves.len()).unwrap();
                        self.index += 1;

                        if Some(mv) == self.tt_move {
                            continue;
                        }

                        return Some(mv);
                    }

                    self.stage = Stage::Done;
                }

                Stage::ProbCutCapture => {
                    let threshold = self.mode_threshold.unwrap_or(0);

                    while self.index < self.moves.len() {
                        let mv = self.pick_best(self.index, self.moves.len()).unwrap();
                        self.index += 1;

                        if Some(mv) == self.tt_move {
                            continue;
                        }

                        if self.position.see_ge(mv, threshold) {
                            return Some(mv);
                        }
                    }

                    self.stage = Stage::Done;
                }

                Stage::QCapture => {
                    while self.index < self.moves.len() {
                        let mv = self.pick_best(self.index, self.moves.len()).unwrap();
                        self.index += 1;

                        if Some(mv) == self.tt_move {
                            continue;
                        }

                        if let Some(sq) = self.recapture_sq {
                            if mv.tgt() != sq {
                                continue;
                            }
                        }

                        return Some(mv);
                    }

                    self.stage = Self::advance(self.stage);
                }

                Stage::QuietCheck => {
                    if self.depth <= QUIET_CHECK_DEPTH_THRESHOLD {
                        self.stage = Stage::Done;
                        continue;
                    }

                    if !self.quiet_checks_appended {
                        self.quiet_checks_appended = true;
                        let start = self.moves.len();
                        let checks = self.position.quiet_checks();
                        self.push_moves(checks);

                        for i in start..self.moves.len() {
                            self.scores[i] = self.score_quiet(self.moves[i]);
                        }
                    }

                    while self.index < self.moves.len() {
                        let mv = self.pick_best(self.index, self.moves.len()).unwrap();
                        self.index += 1;

                        if Some(mv) == self.tt_move {
                            continue;
                        }

                        return Some(mv);
                    }

                    self.stage = Stage::Done;
                }

                Stage::Done => return None,
            }
        }
    }
}

/// Whether `a`, `b`, and `c` lie on a common rank, file, or diagonal.
fn squares_aligned(a: Square, b: Square, c: Square) -> bool {
    let (ar, af) = (a.rank() as i32, a.file() as i32);
    let (br, bf) = (b.rank() as i32, b.file() as i32);
    let (cr, cf) = (c.rank() as i32, c.file() as i32);

    (ar == br && br == cr)
        || (af == bf && bf == cf)
        || (ar - af == br - bf && br - bf == cr - cf)
        || (ar + af == br + bf && br + bf == cr + cf)
}

/// Squares where `color`'s pieces of strictly lesser value than
/// `piece_type` currently attack.
fn lesser_piece_attackers(position: &Position, color: chesscore::piece::Color, piece_type: PieceType) -> chesscore::bitboard::Bitboard {
    use PieceType::*;

    let lesser: &[PieceType] = match piece_type {
        Knight | Bishop => &[Pawn],
        Rook => &[Pawn, Knight, Bishop],
        Queen => &[Pawn, Knight, Bishop, Rook],
        _ => &[],
    };

    let mut attacks = chesscore::bitboard::Bitboard::EMPTY;
    for &pt in lesser {
        attacks |= position.attacks_by(pt, color);
    }

    attacks
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chesscore::board::Board;
    use chesscore::movegen::moves::BareMove;

    use super::*;
    use crate::history_tables::History;

    fn parse_move(board: &Board, uci: &str) -> Move {
        let bare = BareMove::from_str(uci).unwrap();
        board.find_move(bare).unwrap()
    }

    fn collect_moves(picker: &mut MovePicker) -> Vec<Move> {
        let mut out = Vec::new();
        while let Some(mv) = picker.next_move() {
            out.push(mv);
        }
        out
    }

    #[test]
    fn starting_position_yields_every_move_with_tt_move_first() {
        let board =
            Board::from_str("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").unwrap();
        let tt_move = parse_move(&board, "e2e4");
        let position = Position::new(board);
        let history = History::new();

        let mut picker = MovePicker::new(&position, Some(tt_move), 10, 0, &history, PickerMode::Normal);
        let moves = collect_moves(&mut picker);

        assert_eq!(moves.len(), 20);
        assert_eq!(moves[0], tt_move);
        assert_eq!(moves.iter().filter(|&&m| m == tt_move).count(), 1);
    }

    #[test]
    fn king_move_is_present_in_quiet_endgame() {
        let board = Board::from_str("8/8/8/8/5kp1/P7/8/1K1N4 w - - 0 1").unwrap();
        let position = Position::new(board);
        let history = History::new();

        let mut picker = MovePicker::new(&position, None, 8, 0, &history, PickerMode::Normal);
        let moves = collect_moves(&mut picker);

        let kc2 = parse_move(&board, "b1c2");
        assert!(moves.contains(&kc2));
    }

    #[test]
    fn single_legal_move_is_yielded_exactly_once_then_none() {
        // Black king on a8 has exactly one legal move, Kb8: a7 is covered
        // by the white king on b6, and nothing attacks b8.
        let board = Board::from_str("k7/8/1K6/8/8/8/8/7R b - - 0 1").unwrap();
        let position = Position::new(board);
        let history = History::new();

        let mut picker = MovePicker::new(&position, None, 5, 0, &history, PickerMode::Normal);
        let moves = collect_moves(&mut picker);

        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0], parse_move(&board, "a8b8"));
        assert_eq!(picker.next_move(), None);
    }

    #[test]
    fn probcut_rejects_a_losing_capture() {
        // Qxd7 loses the queen to the rook on d8: SEE is deeply negative,
        // so a zero-threshold ProbCut picker must never yield it.
        let board = Board::from_str("3r3k/3p4/8/8/8/8/8/3QK3 w - - 0 1").unwrap();
        let position = Position::new(board);
        let history = History::new();
        let qxd7 = parse_move(&board, "d1d7");

        assert!(!position.see_ge(qxd7, 0));

        let mut picker =
            MovePicker::new(&position, None, 5, 0, &history, PickerMode::ProbCut { threshold: 0 });
        let moves = collect_moves(&mut picker);

        assert!(!moves.contains(&qxd7));
    }

    #[test]
    fn recapture_mode_only_yields_captures_on_the_recapture_square() {
        let board = Board::from_str("4k3/8/8/4p3/3P4/8/8/4K3 w - - 0 1").unwrap();
        let position = Position::new(board);
        let history = History::new();
        let e5 = Square::E5;

        let mut picker = MovePicker::new(
            &position,
            None,
            0,
            0,
            &history,
            PickerMode::Recapture { square: e5 },
        );
        let moves = collect_moves(&mut picker);

        assert!(!moves.is_empty());
        assert!(moves.iter().all(|mv| mv.tgt() == e5));
    }

    #[test]
    fn history_favoured_quiet_is_ordered_before_a_plain_quiet() {
        let board =
            Board::from_str("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").unwrap();
        let position = Position::new(board);
        let mut history = History::new();

        let favoured = parse_move(&board, "g1f3");
        let plain = parse_move(&board, "b1c3");
        history.add_quiet_bonus(favoured, &board, 2000);

        let mut picker = MovePicker::new(&position, None, 1, 0, &history, PickerMode::Normal);
        let moves = collect_moves(&mut picker);

        let favoured_pos = moves.iter().position(|&m| m == favoured).unwrap();
        let plain_pos = moves.iter().position(|&m| m == plain).unwrap();

        assert!(favoured_pos < plain_pos);
    }

    #[test]
    fn countermove_is_covered_even_when_unscored_in_other_tables() {
        let board =
            Board::from_str("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").unwrap();
        let position = Position::new(board);
        let mut history = History::new();

        let reply = parse_move(&board, "b1c3");
        history.push_mv(parse_move(&board, "e2e4"), &board);
        history.add_countermove(reply);

        let mut picker = MovePicker::new(&position, None, 1, 0, &history, PickerMode::Normal);
        let moves = collect_moves(&mut picker);

        assert_eq!(moves.len(), 20);
        assert_eq!(moves.iter().filter(|&&m| m == reply).count(), 1);
    }
}
