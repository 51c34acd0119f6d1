use crate::game_state::chess_types::*;
use crate::moves::bitboard::Bitboard;
use crate::moves::move_descriptions::Move;

/// Single undo record for `make_move` / `unmake_move`.
///
/// Holds the irreversible parts of the state *before* the move, so undo is a
/// handful of assignments plus reversing the piece relocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoState {
    /// `Move::NONE` for a null move.
    pub mv: Move,
    pub captured_piece: Option<Piece>,

    pub prev_castling_rights: CastlingRights,
    pub prev_en_passant_square: Option<Square>,
    pub prev_halfmove_clock: u16,
    pub prev_plies_from_null: u16,

    pub prev_zobrist_key: u64,
    pub prev_checkers: Bitboard,
    pub prev_pinned: Bitboard,
}
