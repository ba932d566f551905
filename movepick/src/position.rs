//! A `Position` wraps a [`Board`] with the history and incremental hashes
//! the move picker and history tables need: repetition detection, and
//! the separate pawn/material/minor keys used to index correction and
//! pawn-history tables.

use anyhow::Context;
use arrayvec::ArrayVec;

use chesscore::bitboard::Bitboard;
use chesscore::board::Board;
use chesscore::movegen::moves::Move;
use chesscore::piece::{Color, Piece, PieceType};
use chesscore::square::Square;

use crate::zobrist::ZHash;

/// Plies of history kept for repetition detection. A single game rarely
/// revisits a position further back than this, and it bounds the
/// allocation up front instead of growing a `Vec`.
const HISTORY_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct Position {
    pub board: Board,
    pub hash: ZHash,
    pub pawn_hash: ZHash,
    pub nonpawn_hashes: [ZHash; 2],
    pub material_hash: ZHash,
    pub minor_hash: ZHash,
    history: ArrayVec<ZHash, HISTORY_SIZE>,
}

impl Position {
    /// Parse a position from FEN.
    pub fn from_fen(fen: &str) -> anyhow::Result<Self> {
        let board: Board = fen.parse().context("invalid FEN")?;
        Ok(Self::new(board))
    }

    pub fn new(board: Board) -> Self {
        let hash = ZHash::from(&board);
        let pawn_hash = ZHash::pawn_hash(&board);
        let nonpawn_hashes = [
            ZHash::nonpawn_hash(&board, Color::White),
            ZHash::nonpawn_hash(&board, Color::Black),
        ];
        let material_hash = ZHash::material_hash(&board);
        let minor_hash = ZHash::minor_hash(&board);

        let mut history = ArrayVec::new();
        history.push(hash);

        Position {
            board,
            hash,
            pawn_hash,
            nonpawn_hashes,
            material_hash,
            minor_hash,
            history,
        }
    }

    /// Play a move, returning the resulting position. The hashes are
    /// recomputed from the resulting board rather than updated
    /// incrementally piece-by-piece, since `Board::play_move` already
    /// does the bitboard bookkeeping and a from-scratch hash is cheap
    /// relative to a search node.
    pub fn play_move(&self, mv: Move) -> Self {
        let board = self.board.play_move(mv);
        let mut next = Position::new(board);

        next.history = self.history.clone();
        if next.history.is_full() {
            next.history.remove(0);
        }
        next.history.push(next.hash);

        next
    }

    pub fn play_null_move(&self) -> Self {
        let mut board = self.board;
        board.current = !board.current;
        board.en_passant = None;

        let mut next = Position::new(board);
        next.history = self.history.clone();
        if next.history.is_full() {
            next.history.remove(0);
        }
        next.history.push(next.hash);

        next
    }

    /// Whether the current position has occurred earlier in the game,
    /// counting only plies where the side to move matches (every other
    /// ply).
    pub fn is_repetition(&self) -> bool {
        self.history
            .iter()
            .rev()
            .skip(1)
            .step_by(2)
            .any(|&h| h == self.hash)
    }

    ////////////////////////////////////////////////////////////////////////
    // External interface used by the move picker and history tables
    ////////////////////////////////////////////////////////////////////////

    pub fn side_to_move(&self) -> Color {
        self.board.current
    }

    pub fn checkers(&self) -> Bitboard {
        self.board.get_checkers()
    }

    pub fn in_check(&self) -> bool {
        self.board.in_check()
    }

    pub fn piece_on(&self, sq: Square) -> Option<Piece> {
        self.board.get_at(sq)
    }

    pub fn moved_piece(&self, mv: Move) -> Option<Piece> {
        self.board.get_at(mv.src())
    }

    /// Whether `mv` is pseudo-legal in this position: there's a piece of
    /// the side to move on its source square, and the move shows up
    /// among the fully-legal moves generated for the position. The board
    /// this crate is built on only exposes a legal generator, so "pseudo
    /// legal" here means "legal" -- callers (e.g. TT move validation)
    /// still benefit from the cheap piece-on-source check before paying
    /// for full generation.
    pub fn pseudo_legal(&self, mv: Move) -> bool {
        match self.board.get_at(mv.src()) {
            Some(piece) if piece.color() == self.board.current => {
                self.board.legal_moves::<true>().contains(&mv)
            }
            _ => false,
        }
    }

    pub fn capture(&self, mv: Move) -> bool {
        mv.is_capture()
    }

    /// Whether `mv` should be staged alongside captures: real captures,
    /// en passant, and queen promotions.
    pub fn capture_stage(&self, mv: Move) -> bool {
        mv.is_capture() || mv.get_promo_type() == Some(PieceType::Queen)
    }

    pub fn see_ge(&self, mv: Move, threshold: i32) -> bool {
        self.board.see(mv, threshold)
    }

    pub fn square(&self, piece_type: PieceType, color: Color) -> Square {
        self.board
            .get_bb(piece_type, color)
            .into_iter()
            .next()
            .expect("every legal position has exactly one king per side")
    }

    pub fn king_square(&self, color: Color) -> Square {
        self.square(PieceType::King, color)
    }

    /// Squares from which a piece of type `piece_type`, belonging to the
    /// side to move, would give check to the opponent's king. Exploits
    /// the fact that attack tables are symmetric: the squares attacking
    /// the opponent king square are the same squares the king square
    /// would attack if a piece of that type stood there.
    pub fn check_squares(&self, piece_type: PieceType) -> Bitboard {
        let them = !self.board.current;
        let king_sq = self.king_square(them);
        let blockers = self.board.all_occupied();

        match piece_type {
            PieceType::Pawn => king_sq.pawn_attacks(them),
            PieceType::Knight => king_sq.knight_squares(),
            PieceType::Bishop => king_sq.bishop_squares(blockers),
            PieceType::Rook => king_sq.rook_squares(blockers),
            PieceType::Queen => king_sq.queen_squares(blockers),
            PieceType::King => king_sq.king_squares(),
        }
    }

    pub fn attacks_by(&self, piece_type: PieceType, color: Color) -> Bitboard {
        let blockers = self.board.all_occupied();
        let mut attacks = Bitboard::EMPTY;

        for sq in self.board.get_bb(piece_type, color) {
            attacks |= match piece_type {
                PieceType::Pawn => sq.pawn_attacks(color),
                PieceType::Knight => sq.knight_squares(),
                PieceType::Bishop => sq.bishop_squares(blockers),
                PieceType::Rook => sq.rook_squares(blockers),
                PieceType::Queen => sq.queen_squares(blockers),
                PieceType::King => sq.king_squares(),
            };
        }

        attacks
    }

    /// Pieces (of either type, if `piece_type` is `None`) belonging to
    /// `color`.
    pub fn pieces(&self, color: Color, piece_type: Option<PieceType>) -> Bitboard {
        match piece_type {
            Some(pt) => self.board.get_bb(pt, color),
            None => self.board.occupied_by(color),
        }
    }

    /// Pinned pieces and other blockers standing between `color`'s king
    /// and a potential attacker, used to detect discovered checks.
    pub fn blockers_for_king(&self, color: Color) -> Bitboard {
        self.board.get_pinrays(color)
    }

    /// Hash used to index pawn-structure-keyed tables (low-ply and
    /// pawn history).
    pub fn pawn_structure_index(&self) -> u64 {
        self.pawn_hash.0
    }

    ////////////////////////////////////////////////////////////////////////
    // Move generation
    ////////////////////////////////////////////////////////////////////////

    /// Every legal move, quiet or capture. While in check, this is
    /// exactly the set of legal evasions.
    pub fn all_moves(&self) -> Vec<Move> {
        self.board.legal_moves::<true>()
    }

    /// Legal captures only (including en passant and promotion captures).
    pub fn captures(&self) -> Vec<Move> {
        self.board.legal_moves::<false>()
    }

    /// Legal quiet moves only: everything in `all_moves` that isn't
    /// already in `captures`.
    pub fn quiets(&self) -> Vec<Move> {
        self.all_moves().into_iter().filter(|mv| !mv.is_capture()).collect()
    }

    /// Quiet moves that give check, approximated as quiets landing on a
    /// square `check_squares` reports for the moved piece's type. This
    /// misses discovered checks, which would require tracking blockers
    /// for the opponent king through the move's vacated square.
    pub fn quiet_checks(&self) -> Vec<Move> {
        self.quiets()
            .into_iter()
            .filter(|mv| {
                let piece_type = self
                    .board
                    .get_at(mv.src())
                    .map(|p| p.piece_type())
                    .unwrap_or(PieceType::Pawn);
                self.check_squares(piece_type).contains(mv.tgt())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn repetition_is_detected() {
        let board = Board::from_str("8/8/8/4k3/8/8/4K3/8 w - - 0 1").unwrap();
        let mut pos = Position::new(board);

        let moves = pos.board.legal_moves::<true>();
        let back_and_forth = moves[0];

        // Play the same move out and back twice to force a repeat.
        let away = pos.play_move(back_and_forth);
        let legal_back = away.board.legal_moves::<true>();
        let home = away.play_move(legal_back[0]);

        let away2 = home.play_move(back_and_forth);
        let legal_back2 = away2.board.legal_moves::<true>();
        let home2 = away2.play_move(legal_back2[0]);

        assert_eq!(home.hash, home2.hash);
        assert!(home2.is_repetition());
    }

    #[test]
    fn pawn_hash_ignores_piece_moves() {
        let board = Board::from_str(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        )
        .unwrap();
        let pos = Position::new(board);
        let moves = pos.board.legal_moves::<true>();
        let knight_move = moves
            .iter()
            .find(|mv| pos.board.get_at(mv.src()).unwrap().piece_type() == PieceType::Knight)
            .expect("starting position has legal knight moves");

        let next = pos.play_move(*knight_move);
        assert_eq!(pos.pawn_hash, next.pawn_hash);
        assert_ne!(pos.hash, next.hash);
    }

    #[test]
    fn from_fen_parses_valid_fen_and_rejects_garbage() {
        let pos = Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
            .unwrap();
        assert_eq!(pos.board.current, Color::White);

        assert!(Position::from_fen("not a fen").is_err());
    }

    #[test]
    fn quiets_includes_double_pushes_castling_and_quiet_promotions() {
        let pos = Position::new(
            Board::from_str("r3k2r/8/8/8/8/8/4P3/R3K2R w KQkq - 0 1").unwrap(),
        );
        let quiets = pos.quiets();

        let double_push = quiets
            .iter()
            .any(|mv| mv.src().to_string() == "e2" && mv.tgt().to_string() == "e4");
        assert!(double_push, "double pawn push should be a quiet move");

        let castle = quiets.iter().any(|mv| mv.is_castle());
        assert!(castle, "castling should be a quiet move");

        assert!(quiets.iter().all(|mv| !mv.is_capture()));
    }
}
