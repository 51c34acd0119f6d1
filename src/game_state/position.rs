//! Core incremental board state representation.
//!
//! `Position` stores piece bitboards, occupancy caches, turn/state flags,
//! clocks, the incremental Zobrist key and the undo stack used by make/unmake.
//! Checkers and pinned pieces for the side to move are cached and refreshed
//! once per applied move.
//!
//! A position borrows the immutable `EngineTables`; it is never `Copy`, so a
//! worker that needs its own board must `clone()` it explicitly.

use std::fmt;

use crate::errors::{ChessError, ChessResult};
use crate::game_state::chess_rules::*;
use crate::game_state::chess_types::*;
use crate::move_generation::move_generator::{generate_moves, GenerationMode};
use crate::moves::bitboard::Bitboard;
use crate::moves::leaper_attacks::{king_attacks, knight_attacks, pawn_attacks};
use crate::moves::move_descriptions::Move;
use crate::tables::engine_tables::EngineTables;
use crate::utils::algebraic::square_name;
use crate::utils::fen_generator::generate_fen;
use crate::utils::fen_parser::parse_fen;

#[derive(Clone)]
pub struct Position<'t> {
    tables: &'t EngineTables,

    // [color][piece_kind]
    pieces: [[Bitboard; 6]; 2],
    occupancy_by_color: [Bitboard; 2],
    occupancy_all: Bitboard,
    board: [Option<Piece>; 64],

    side_to_move: Color,
    castling_rights: CastlingRights,
    en_passant_square: Option<Square>,

    halfmove_clock: u16,
    fullmove_number: u16,
    plies_from_null: u16,

    zobrist_key: u64,

    // Cached for the side to move.
    checkers: Bitboard,
    pinned: Bitboard,

    undo_stack: Vec<UndoState>,
}

/// Placement and state fields of a board description, before validation.
#[derive(Debug, Clone)]
pub struct PositionParts {
    pub board: [Option<Piece>; 64],
    pub side_to_move: Color,
    pub castling_rights: CastlingRights,
    pub en_passant_square: Option<Square>,
    pub halfmove_clock: u16,
    pub fullmove_number: u16,
}

impl<'t> Position<'t> {
    pub fn from_fen(tables: &'t EngineTables, fen: &str) -> ChessResult<Self> {
        let parts = parse_fen(fen)?;
        Self::from_parts(tables, parts)
    }

    pub fn start(tables: &'t EngineTables) -> ChessResult<Self> {
        Self::from_fen(tables, STARTING_POSITION_FEN)
    }

    pub fn to_fen(&self) -> String {
        generate_fen(self)
    }

    /// Builds a position from parsed parts, enforcing the setup rules.
    pub fn from_parts(tables: &'t EngineTables, parts: PositionParts) -> ChessResult<Self> {
        let mut position = Self {
            tables,
            pieces: [[Bitboard::EMPTY; 6]; 2],
            occupancy_by_color: [Bitboard::EMPTY; 2],
            occupancy_all: Bitboard::EMPTY,
            board: [None; 64],
            side_to_move: parts.side_to_move,
            castling_rights: 0,
            en_passant_square: None,
            halfmove_clock: parts.halfmove_clock,
            fullmove_number: parts.fullmove_number.max(1),
            plies_from_null: parts.halfmove_clock,
            zobrist_key: 0,
            checkers: Bitboard::EMPTY,
            pinned: Bitboard::EMPTY,
            undo_stack: Vec::with_capacity(256),
        };

        for (square, piece) in parts.board.iter().enumerate() {
            if let Some(piece) = *piece {
                let square = square as Square;
                if piece.kind == PieceKind::Pawn && matches!(rank_of(square), 0 | 7) {
                    return Err(ChessError::malformed(format!(
                        "pawn on back rank square {}",
                        square_name(square)
                    )));
                }
                position.place(piece, square);
            }
        }

        for color in Color::ALL {
            let kings = position.pieces(color, PieceKind::King).count();
            if kings != 1 {
                return Err(ChessError::malformed(format!(
                    "expected exactly one {color:?} king, found {kings}"
                )));
            }
            position.check_material(color)?;
        }

        // Rights whose king or rook has left its home square are dropped.
        for castle in CASTLING_MOVES {
            if parts.castling_rights & castle.right != 0
                && position.board[castle.king_from as usize]
                    == Some(Piece::new(castle.color, PieceKind::King))
                && position.board[castle.rook_from as usize]
                    == Some(Piece::new(castle.color, PieceKind::Rook))
            {
                position.castling_rights |= castle.right;
            }
        }

        if let Some(ep) = parts.en_passant_square {
            let us = parts.side_to_move;
            if us.relative_rank(rank_of(ep)) != 5 {
                return Err(ChessError::malformed(format!(
                    "en-passant square {} on the wrong rank",
                    square_name(ep)
                )));
            }
            let pushed = (ep as i8 - us.pawn_push()) as Square;
            let origin = (ep as i8 + us.pawn_push()) as Square;
            let consistent = position.board[pushed as usize]
                == Some(Piece::new(us.opposite(), PieceKind::Pawn))
                && position.board[ep as usize].is_none()
                && position.board[origin as usize].is_none();
            let capturable = (pawn_attacks(us.opposite(), ep)
                & position.pieces(us, PieceKind::Pawn))
            .is_not_empty();
            if consistent && capturable {
                position.en_passant_square = Some(ep);
            }
        }

        let them = position.side_to_move.opposite();
        let their_king = position.king_square(them);
        if (position.attackers_to(their_king, position.occupancy_all)
            & position.occupancy_by_color[position.side_to_move.index()])
        .is_not_empty()
        {
            return Err(ChessError::malformed("side not to move is in check".to_string()));
        }

        position.zobrist_key = position.compute_zobrist_key();
        position.refresh_check_info();
        Ok(position)
    }

    /// At most 16 men and 8 pawns per side, and no more promoted pieces
    /// than missing pawns.
    fn check_material(&self, color: Color) -> ChessResult<()> {
        let count = |kind| self.pieces(color, kind).count();
        let men = self.occupancy_by_color[color.index()].count();
        let pawns = count(PieceKind::Pawn);
        let promoted = count(PieceKind::Knight).saturating_sub(2)
            + count(PieceKind::Bishop).saturating_sub(2)
            + count(PieceKind::Rook).saturating_sub(2)
            + count(PieceKind::Queen).saturating_sub(1);
        if men > 16 || pawns > 8 || promoted > 8 - pawns {
            return Err(ChessError::malformed(format!(
                "impossible {color:?} material: {men} men, {pawns} pawns, {promoted} promoted"
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn tables(&self) -> &'t EngineTables {
        self.tables
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline]
    pub fn castling_rights(&self) -> CastlingRights {
        self.castling_rights
    }

    #[inline]
    pub fn en_passant_square(&self) -> Option<Square> {
        self.en_passant_square
    }

    #[inline]
    pub fn halfmove_clock(&self) -> u16 {
        self.halfmove_clock
    }

    #[inline]
    pub fn fullmove_number(&self) -> u16 {
        self.fullmove_number
    }

    /// Plies since the start of the game, derived from the move counters.
    #[inline]
    pub fn game_ply(&self) -> u32 {
        2 * u32::from(self.fullmove_number - 1) + u32::from(self.side_to_move == Color::Dark)
    }

    #[inline]
    pub fn key(&self) -> u64 {
        self.zobrist_key
    }

    #[inline]
    pub fn checkers(&self) -> Bitboard {
        self.checkers
    }

    /// Pieces of the side to move pinned to their own king.
    #[inline]
    pub fn pinned(&self) -> Bitboard {
        self.pinned
    }

    #[inline]
    pub fn in_check(&self) -> bool {
        self.checkers.is_not_empty()
    }

    #[inline]
    pub fn piece_on(&self, square: Square) -> Option<Piece> {
        self.board[square as usize]
    }

    #[inline]
    pub fn pieces(&self, color: Color, kind: PieceKind) -> Bitboard {
        self.pieces[color.index()][kind.index()]
    }

    /// Pieces of `kind` for both colors.
    #[inline]
    pub fn pieces_of_kind(&self, kind: PieceKind) -> Bitboard {
        self.pieces[0][kind.index()] | self.pieces[1][kind.index()]
    }

    #[inline]
    pub fn occupancy(&self) -> Bitboard {
        self.occupancy_all
    }

    #[inline]
    pub fn occupancy_of(&self, color: Color) -> Bitboard {
        self.occupancy_by_color[color.index()]
    }

    #[inline]
    pub fn king_square(&self, color: Color) -> Square {
        self.pieces(color, PieceKind::King).lsb()
    }

    #[inline]
    pub fn piece_count(&self) -> u32 {
        self.occupancy_all.count()
    }

    /// Centipawn value of knights, bishops, rooks and queens of `color`.
    pub fn non_pawn_material(&self, color: Color) -> i32 {
        [PieceKind::Knight, PieceKind::Bishop, PieceKind::Rook, PieceKind::Queen]
            .iter()
            .map(|&kind| self.pieces(color, kind).count() as i32 * PIECE_VALUES[kind.index()])
            .sum()
    }

    /// Number of moves applied since setup (null moves included).
    #[inline]
    pub fn history_len(&self) -> usize {
        self.undo_stack.len()
    }

    #[inline]
    pub fn last_move(&self) -> Option<Move> {
        self.undo_stack.last().map(|undo| undo.mv)
    }

    /// Pieces of both colors attacking `square` under `occupancy`.
    pub fn attackers_to(&self, square: Square, occupancy: Bitboard) -> Bitboard {
        let rooks = self.pieces_of_kind(PieceKind::Rook) | self.pieces_of_kind(PieceKind::Queen);
        let bishops =
            self.pieces_of_kind(PieceKind::Bishop) | self.pieces_of_kind(PieceKind::Queen);
        (pawn_attacks(Color::Dark, square) & self.pieces(Color::Light, PieceKind::Pawn))
            | (pawn_attacks(Color::Light, square) & self.pieces(Color::Dark, PieceKind::Pawn))
            | (knight_attacks(square) & self.pieces_of_kind(PieceKind::Knight))
            | (king_attacks(square) & self.pieces_of_kind(PieceKind::King))
            | (self.tables.rook_attacks(square, occupancy) & rooks)
            | (self.tables.bishop_attacks(square, occupancy) & bishops)
    }

    #[inline]
    pub fn is_square_attacked(&self, square: Square, by: Color, occupancy: Bitboard) -> bool {
        (self.attackers_to(square, occupancy) & self.occupancy_of(by)).is_not_empty()
    }

    #[inline]
    pub fn moved_piece(&self, mv: Move) -> Option<Piece> {
        self.board[mv.from() as usize]
    }

    #[inline]
    pub fn is_capture(&self, mv: Move) -> bool {
        mv.is_en_passant() || (!mv.is_castle() && self.board[mv.to() as usize].is_some())
    }

    /// Kind of the piece `mv` would capture, if any.
    pub fn captured_piece(&self, mv: Move) -> Option<PieceKind> {
        if mv.is_en_passant() {
            Some(PieceKind::Pawn)
        } else if mv.is_castle() {
            None
        } else {
            self.board[mv.to() as usize].map(|piece| piece.kind)
        }
    }

    /// Membership in the legal move list.
    pub fn is_legal(&self, mv: Move) -> bool {
        mv.is_some() && generate_moves(self, GenerationMode::All).contains(mv)
    }

    /// Whether the legal move `mv` checks the opponent king.
    ///
    /// Tests direct attacks of the moved (or promoted) piece and slider
    /// attacks discovered by vacating the origin, the en-passant victim's
    /// square, or the castling rook's square.
    pub fn move_gives_check(&self, mv: Move) -> bool {
        let us = self.side_to_move;
        let their_king = self.king_square(us.opposite());
        let (from, to) = (mv.from(), mv.to());
        let kind = match self.board[from as usize] {
            Some(piece) => mv.promotion_kind().unwrap_or(piece.kind),
            None => return false,
        };

        let mut occupancy = self.occupancy_all;
        occupancy.remove(from);
        occupancy.insert(to);

        let mut rooks = self.pieces(us, PieceKind::Rook) | self.pieces(us, PieceKind::Queen);
        let mut bishops = self.pieces(us, PieceKind::Bishop) | self.pieces(us, PieceKind::Queen);
        rooks.remove(from);
        bishops.remove(from);

        match kind {
            PieceKind::Pawn => {
                if pawn_attacks(us, to).contains(their_king) {
                    return true;
                }
            }
            PieceKind::Knight => {
                if knight_attacks(to).contains(their_king) {
                    return true;
                }
            }
            PieceKind::Bishop => bishops.insert(to),
            PieceKind::Rook => rooks.insert(to),
            PieceKind::Queen => {
                bishops.insert(to);
                rooks.insert(to);
            }
            PieceKind::King => {}
        }

        if mv.is_en_passant() {
            occupancy.remove((to as i8 - us.pawn_push()) as Square);
        } else if mv.is_castle() {
            if let Some(castle) = castling_move_to(to) {
                occupancy.remove(castle.rook_from);
                occupancy.insert(castle.rook_to);
                rooks.remove(castle.rook_from);
                rooks.insert(castle.rook_to);
            }
        }

        (self.tables.rook_attacks(their_king, occupancy) & rooks).is_not_empty()
            || (self.tables.bishop_attacks(their_king, occupancy) & bishops).is_not_empty()
    }

    /// Applies a legal move and pushes its undo record.
    pub fn make_move(&mut self, mv: Move) -> ChessResult<()> {
        let us = self.side_to_move;
        let them = us.opposite();
        let (from, to) = (mv.from(), mv.to());

        let moving = match self.board[from as usize] {
            Some(piece) if piece.color == us && mv.is_some() => piece,
            _ => {
                return Err(ChessError::invariant(format!(
                    "move {mv} does not start on a {us:?} piece"
                )))
            }
        };
        let castle = if mv.is_castle() {
            Some(castling_move_to(to).ok_or_else(|| {
                ChessError::invariant(format!("castle move {mv} has no castling geometry"))
            })?)
        } else {
            None
        };
        let captured_square = if mv.is_en_passant() {
            (to as i8 - us.pawn_push()) as Square
        } else {
            to
        };
        let captured = if castle.is_some() {
            None
        } else {
            self.board[captured_square as usize]
        };
        if let Some(victim) = captured {
            if victim.color == us || victim.kind == PieceKind::King {
                return Err(ChessError::invariant(format!(
                    "move {mv} captures {victim:?}"
                )));
            }
        }

        self.undo_stack.push(UndoState {
            mv,
            captured_piece: captured,
            prev_castling_rights: self.castling_rights,
            prev_en_passant_square: self.en_passant_square,
            prev_halfmove_clock: self.halfmove_clock,
            prev_plies_from_null: self.plies_from_null,
            prev_zobrist_key: self.zobrist_key,
            prev_checkers: self.checkers,
            prev_pinned: self.pinned,
        });

        let tables = self.tables;
        let keys = &tables.zobrist;
        let mut key = self.zobrist_key ^ keys.side_to_move();
        if let Some(ep) = self.en_passant_square.take() {
            key ^= keys.en_passant_file(file_of(ep));
        }

        self.halfmove_clock += 1;
        self.plies_from_null += 1;
        if us == Color::Dark {
            self.fullmove_number += 1;
        }

        if let Some(victim) = captured {
            self.lift(victim, captured_square);
            key ^= keys.piece_square(victim.color, victim.kind, captured_square);
            self.halfmove_clock = 0;
        }

        self.relocate(moving, from, to);
        key ^= keys.piece_square(us, moving.kind, from) ^ keys.piece_square(us, moving.kind, to);

        if let Some(castle) = castle {
            let rook = Piece::new(us, PieceKind::Rook);
            self.relocate(rook, castle.rook_from, castle.rook_to);
            key ^= keys.piece_square(us, PieceKind::Rook, castle.rook_from)
                ^ keys.piece_square(us, PieceKind::Rook, castle.rook_to);
        } else if let Some(kind) = mv.promotion_kind() {
            self.lift(moving, to);
            self.place(Piece::new(us, kind), to);
            key ^= keys.piece_square(us, PieceKind::Pawn, to) ^ keys.piece_square(us, kind, to);
        }

        if moving.kind == PieceKind::Pawn {
            self.halfmove_clock = 0;
            if from.abs_diff(to) == 16 {
                let ep = (from + to) / 2;
                if (pawn_attacks(us, ep) & self.pieces(them, PieceKind::Pawn)).is_not_empty() {
                    self.en_passant_square = Some(ep);
                    key ^= keys.en_passant_file(file_of(ep));
                }
            }
        }

        let rights = self.castling_rights
            & !(CASTLING_RIGHTS_LOST[from as usize] | CASTLING_RIGHTS_LOST[to as usize]);
        if rights != self.castling_rights {
            key ^= keys.castling(self.castling_rights) ^ keys.castling(rights);
            self.castling_rights = rights;
        }

        self.side_to_move = them;
        self.zobrist_key = key;
        self.refresh_check_info();
        Ok(())
    }

    /// Reverts the most recent `make_move`.
    pub fn unmake_move(&mut self) -> ChessResult<()> {
        let undo = match self.undo_stack.pop() {
            Some(undo) if undo.mv.is_some() => undo,
            Some(undo) => {
                self.undo_stack.push(undo);
                return Err(ChessError::invariant(
                    "unmake_move called on a null move".to_string(),
                ));
            }
            None => {
                return Err(ChessError::invariant(
                    "unmake_move called with empty history".to_string(),
                ))
            }
        };

        let us = self.side_to_move.opposite();
        let mv = undo.mv;
        let (from, to) = (mv.from(), mv.to());

        let landed = self.board[to as usize]
            .ok_or_else(|| ChessError::invariant(format!("no piece on target of {mv}")))?;

        if mv.is_castle() {
            let castle = castling_move_to(to).ok_or_else(|| {
                ChessError::invariant(format!("castle move {mv} has no castling geometry"))
            })?;
            self.relocate(landed, to, from);
            self.relocate(Piece::new(us, PieceKind::Rook), castle.rook_to, castle.rook_from);
        } else {
            let mut mover = landed;
            if mv.is_promotion() {
                self.lift(landed, to);
                mover = Piece::new(us, PieceKind::Pawn);
                self.place(mover, to);
            }
            self.relocate(mover, to, from);
            if let Some(victim) = undo.captured_piece {
                let square = if mv.is_en_passant() {
                    (to as i8 - us.pawn_push()) as Square
                } else {
                    to
                };
                self.place(victim, square);
            }
        }

        if us == Color::Dark {
            self.fullmove_number -= 1;
        }
        self.side_to_move = us;
        self.restore(undo);
        Ok(())
    }

    /// Passes the turn. Not allowed while in check.
    pub fn make_null_move(&mut self) -> ChessResult<()> {
        if self.in_check() {
            return Err(ChessError::invariant(
                "null move while in check".to_string(),
            ));
        }
        self.undo_stack.push(UndoState {
            mv: Move::NONE,
            captured_piece: None,
            prev_castling_rights: self.castling_rights,
            prev_en_passant_square: self.en_passant_square,
            prev_halfmove_clock: self.halfmove_clock,
            prev_plies_from_null: self.plies_from_null,
            prev_zobrist_key: self.zobrist_key,
            prev_checkers: self.checkers,
            prev_pinned: self.pinned,
        });

        let tables = self.tables;
        let keys = &tables.zobrist;
        self.zobrist_key ^= keys.side_to_move();
        if let Some(ep) = self.en_passant_square.take() {
            self.zobrist_key ^= keys.en_passant_file(file_of(ep));
        }
        self.halfmove_clock += 1;
        self.plies_from_null = 0;
        if self.side_to_move == Color::Dark {
            self.fullmove_number += 1;
        }
        self.side_to_move = self.side_to_move.opposite();
        self.refresh_check_info();
        Ok(())
    }

    pub fn unmake_null_move(&mut self) -> ChessResult<()> {
        let undo = match self.undo_stack.pop() {
            Some(undo) if undo.mv.is_none() => undo,
            Some(undo) => {
                self.undo_stack.push(undo);
                return Err(ChessError::invariant(
                    "unmake_null_move called on a real move".to_string(),
                ));
            }
            None => {
                return Err(ChessError::invariant(
                    "unmake_null_move called with empty history".to_string(),
                ))
            }
        };
        let us = self.side_to_move.opposite();
        if us == Color::Dark {
            self.fullmove_number -= 1;
        }
        self.side_to_move = us;
        self.restore(undo);
        Ok(())
    }

    /// Draw by the fifty-move rule, repetition or insufficient material.
    ///
    /// `ply_from_root` is the distance to the search root: a single repeat
    /// inside the searched line already counts, positions before the root
    /// must occur twice more.
    pub fn is_draw(&self, ply_from_root: usize) -> bool {
        if self.halfmove_clock >= FIFTY_MOVE_LIMIT
            && (!self.in_check() || !generate_moves(self, GenerationMode::All).is_empty())
        {
            return true;
        }
        self.is_repetition(ply_from_root) || self.has_insufficient_material()
    }

    fn is_repetition(&self, ply_from_root: usize) -> bool {
        let window = usize::from(self.halfmove_clock.min(self.plies_from_null));
        let len = self.undo_stack.len();
        let mut repeats = 0;
        let mut back = 4;
        while back <= window && back <= len {
            if self.undo_stack[len - back].prev_zobrist_key == self.zobrist_key {
                if back <= ply_from_root {
                    return true;
                }
                repeats += 1;
                if repeats >= 2 {
                    return true;
                }
            }
            back += 2;
        }
        false
    }

    /// K v K, or K + single minor v K.
    fn has_insufficient_material(&self) -> bool {
        let heavy = self.pieces_of_kind(PieceKind::Pawn)
            | self.pieces_of_kind(PieceKind::Rook)
            | self.pieces_of_kind(PieceKind::Queen);
        let minors =
            self.pieces_of_kind(PieceKind::Knight) | self.pieces_of_kind(PieceKind::Bishop);
        heavy.is_empty() && !minors.more_than_one()
    }

    /// Recomputes every cache and the key from the placement and compares.
    pub fn validate(&self) -> ChessResult<()> {
        let mut by_color = [Bitboard::EMPTY; 2];
        for color in Color::ALL {
            for kind in PieceKind::ALL {
                let set = self.pieces(color, kind);
                if (set & by_color[color.index()]).is_not_empty() {
                    return Err(ChessError::invariant(format!(
                        "overlapping {color:?} piece sets"
                    )));
                }
                by_color[color.index()] |= set;
                for square in set {
                    if self.board[square as usize] != Some(Piece::new(color, kind)) {
                        return Err(ChessError::invariant(format!(
                            "mailbox disagrees with bitboards on {}",
                            square_name(square)
                        )));
                    }
                }
            }
            if self.pieces(color, PieceKind::King).count() != 1 {
                return Err(ChessError::invariant(format!(
                    "{color:?} does not have exactly one king"
                )));
            }
        }
        if by_color != self.occupancy_by_color
            || (by_color[0] | by_color[1]) != self.occupancy_all
            || (by_color[0] & by_color[1]).is_not_empty()
        {
            return Err(ChessError::invariant("occupancy caches are stale".to_string()));
        }
        if self.board.iter().filter(|p| p.is_some()).count() != self.occupancy_all.count() as usize
        {
            return Err(ChessError::invariant("mailbox has stray pieces".to_string()));
        }
        if self.compute_zobrist_key() != self.zobrist_key {
            return Err(ChessError::invariant("zobrist key is stale".to_string()));
        }
        let us = self.side_to_move;
        let checkers = self.attackers_to(self.king_square(us), self.occupancy_all)
            & self.occupancy_of(us.opposite());
        if checkers != self.checkers || self.blockers_for_king(us) != self.pinned {
            return Err(ChessError::invariant("check info is stale".to_string()));
        }
        Ok(())
    }

    pub fn compute_zobrist_key(&self) -> u64 {
        let keys = &self.tables.zobrist;
        let mut key = 0;
        for (square, piece) in self.board.iter().enumerate() {
            if let Some(piece) = piece {
                key ^= keys.piece_square(piece.color, piece.kind, square as Square);
            }
        }
        if self.side_to_move == Color::Dark {
            key ^= keys.side_to_move();
        }
        key ^= keys.castling(self.castling_rights);
        if let Some(ep) = self.en_passant_square {
            key ^= keys.en_passant_file(file_of(ep));
        }
        key
    }

    fn refresh_check_info(&mut self) {
        let us = self.side_to_move;
        self.checkers = self.attackers_to(self.king_square(us), self.occupancy_all)
            & self.occupancy_of(us.opposite());
        self.pinned = self.blockers_for_king(us);
    }

    /// Own pieces that alone stand between `color`'s king and an enemy slider.
    fn blockers_for_king(&self, color: Color) -> Bitboard {
        let king = self.king_square(color);
        let them = color.opposite();
        let snipers = (self.tables.rook.pseudo_attacks(king)
            & (self.pieces(them, PieceKind::Rook) | self.pieces(them, PieceKind::Queen)))
            | (self.tables.bishop.pseudo_attacks(king)
                & (self.pieces(them, PieceKind::Bishop) | self.pieces(them, PieceKind::Queen)));

        let mut pinned = Bitboard::EMPTY;
        for sniper in snipers {
            let blockers = self.tables.between(king, sniper) & self.occupancy_all;
            if blockers.count() == 1 {
                pinned |= blockers & self.occupancy_of(color);
            }
        }
        pinned
    }

    fn restore(&mut self, undo: UndoState) {
        self.castling_rights = undo.prev_castling_rights;
        self.en_passant_square = undo.prev_en_passant_square;
        self.halfmove_clock = undo.prev_halfmove_clock;
        self.plies_from_null = undo.prev_plies_from_null;
        self.zobrist_key = undo.prev_zobrist_key;
        self.checkers = undo.prev_checkers;
        self.pinned = undo.prev_pinned;
    }

    #[inline]
    fn place(&mut self, piece: Piece, square: Square) {
        self.pieces[piece.color.index()][piece.kind.index()].insert(square);
        self.occupancy_by_color[piece.color.index()].insert(square);
        self.occupancy_all.insert(square);
        self.board[square as usize] = Some(piece);
    }

    #[inline]
    fn lift(&mut self, piece: Piece, square: Square) {
        self.pieces[piece.color.index()][piece.kind.index()].remove(square);
        self.occupancy_by_color[piece.color.index()].remove(square);
        self.occupancy_all.remove(square);
        self.board[square as usize] = None;
    }

    #[inline]
    fn relocate(&mut self, piece: Piece, from: Square, to: Square) {
        self.lift(piece, from);
        self.place(piece, to);
    }
}

impl PartialEq for Position<'_> {
    /// Equal board state and history; the shared tables are not compared.
    fn eq(&self, other: &Self) -> bool {
        self.pieces == other.pieces
            && self.occupancy_by_color == other.occupancy_by_color
            && self.occupancy_all == other.occupancy_all
            && self.board == other.board
            && self.side_to_move == other.side_to_move
            && self.castling_rights == other.castling_rights
            && self.en_passant_square == other.en_passant_square
            && self.halfmove_clock == other.halfmove_clock
            && self.fullmove_number == other.fullmove_number
            && self.plies_from_null == other.plies_from_null
            && self.zobrist_key == other.zobrist_key
            && self.checkers == other.checkers
            && self.pinned == other.pinned
            && self.undo_stack == other.undo_stack
    }
}

impl fmt::Debug for Position<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Position")
            .field("fen", &self.to_fen())
            .field("key", &format_args!("{:#018x}", self.zobrist_key))
            .field("checkers", &self.checkers)
            .field("pinned", &self.pinned)
            .field("history", &self.undo_stack.len())
            .finish()
    }
}

impl fmt::Display for Position<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8u8).rev() {
            for file in 0..8u8 {
                let ch = self.board[square_of(file, rank) as usize]
                    .map_or('.', Piece::to_fen_char);
                write!(f, "{ch}")?;
            }
            writeln!(f)?;
        }
        write!(f, "{}", self.to_fen())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::tables;
    use crate::utils::long_algebraic::parse_move;

    const KIWIPETE: &str =
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

    fn play(position: &mut Position<'_>, text: &str) {
        let mv = parse_move(position, text);
        assert!(mv.is_some(), "{text} should be legal in {}", position.to_fen());
        position.make_move(mv).expect("legal move applies");
        position.validate().expect("caches consistent after move");
    }

    #[test]
    fn setup_rejects_malformed_descriptions() {
        let t = tables();
        let bad = [
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP w KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQQBNR w KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - zero 1",
            "Pnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "4k3/8/8/8/8/8/8/4K2r b - - 0 1",
            "R6R/1Q1Q4/1Q4Q1/4Q3/2Q4Q/Q4Q2/pp1Q4/kBNN1KB1 w - - 0 1",
            "4k3/pppppppp/8/8/8/8/PPPPPPPP/QQ2K3 w - - 0 1",
            "4k3/8/8/8/8/P7/PPPPPPPP/4K3 w - - 0 1",
        ];
        for fen in bad {
            assert!(
                matches!(Position::from_fen(t, fen), Err(ChessError::MalformedInput(_))),
                "{fen} should be rejected"
            );
        }
        // One pawn missing pays for the second queen.
        Position::from_fen(t, "4k3/8/8/8/8/8/1PPPPPPP/QQ2K3 w - - 0 1").expect("promoted queen");
    }

    #[test]
    fn setup_drops_unsupported_castling_and_en_passant() {
        let t = tables();
        let position =
            Position::from_fen(t, "4k3/8/8/8/4P3/8/8/R3K3 b KQkq e3 0 1").expect("valid fen");
        assert_eq!(position.castling_rights(), CASTLE_LIGHT_QUEENSIDE);
        assert_eq!(position.en_passant_square(), None);
        position.validate().expect("consistent");
    }

    #[test]
    fn make_then_unmake_restores_everything() {
        let t = tables();
        let mut position = Position::from_fen(t, KIWIPETE).expect("valid fen");
        let before = position.clone();
        for mv in generate_moves(&position, GenerationMode::All).iter().copied() {
            position.make_move(mv).expect("legal move applies");
            position.validate().expect("consistent after make");
            position.unmake_move().expect("undo");
            assert_eq!(position, before, "{mv} did not restore");
        }
    }

    #[test]
    fn en_passant_is_set_only_when_capturable() {
        let t = tables();
        let mut position = Position::start(t).expect("start");
        play(&mut position, "e2e4");
        assert_eq!(position.en_passant_square(), None);
        play(&mut position, "d7d5");
        play(&mut position, "e4e5");
        play(&mut position, "f7f5");
        assert_eq!(position.en_passant_square(), Some(45));
        play(&mut position, "e5f6");
        assert_eq!(position.piece_on(37), None);
        assert_eq!(position.halfmove_clock(), 0);
    }

    #[test]
    fn castling_moves_rook_and_clears_rights() {
        let t = tables();
        let mut position = Position::from_fen(t, KIWIPETE).expect("valid fen");
        play(&mut position, "e1g1");
        assert_eq!(
            position.piece_on(squares::F1),
            Some(Piece::new(Color::Light, PieceKind::Rook))
        );
        assert_eq!(position.castling_rights(), CASTLE_DARK_KINGSIDE | CASTLE_DARK_QUEENSIDE);
        // Moving the h8 rook drops only the kingside right.
        play(&mut position, "h8h7");
        assert_eq!(position.castling_rights(), CASTLE_DARK_QUEENSIDE);
    }

    #[test]
    fn incremental_key_matches_transposed_line() {
        let t = tables();
        let mut a = Position::start(t).expect("start");
        let mut b = Position::start(t).expect("start");
        for text in ["g1f3", "g8f6", "b1c3", "b8c6"] {
            play(&mut a, text);
        }
        for text in ["b1c3", "b8c6", "g1f3", "g8f6"] {
            play(&mut b, text);
        }
        assert_eq!(a.key(), b.key());
        assert_eq!(a.to_fen(), b.to_fen());
    }

    #[test]
    fn null_move_round_trip() {
        let t = tables();
        let mut position = Position::from_fen(t, KIWIPETE).expect("valid fen");
        let before = position.clone();
        position.make_null_move().expect("not in check");
        assert_eq!(position.side_to_move(), Color::Dark);
        position.validate().expect("consistent");
        assert!(position.unmake_move().is_err());
        position.unmake_null_move().expect("undo null");
        assert_eq!(position, before);
    }

    #[test]
    fn checkers_and_pins_are_cached_for_side_to_move() {
        let t = tables();
        // Bishop on b5 pins the d7 knight; queen on e2 checks along the e-file.
        let position =
            Position::from_fen(t, "4k3/3n4/8/1B6/8/8/4Q3/4K3 b - - 0 1").expect("valid fen");
        assert_eq!(position.checkers(), Bitboard::from_square(12));
        assert_eq!(position.pinned(), Bitboard::from_square(51));
    }

    #[test]
    fn gives_check_detects_direct_discovered_and_castle_checks() {
        let t = tables();
        let position =
            Position::from_fen(t, "5k2/8/8/8/8/4B3/8/R3K2R w KQ - 0 1").expect("valid fen");
        assert!(position.move_gives_check(parse_move(&position, "e1g1")));
        assert!(!position.move_gives_check(parse_move(&position, "e1c1")));
        assert!(position.move_gives_check(parse_move(&position, "e3c5")));
        assert!(!position.move_gives_check(parse_move(&position, "e3d4")));

        let discovered =
            Position::from_fen(t, "4k3/8/8/8/4N3/8/8/4R1K1 w - - 0 1").expect("valid fen");
        assert!(discovered.move_gives_check(parse_move(&discovered, "e4c3")));
        assert!(!discovered.move_gives_check(parse_move(&discovered, "g1g2")));
    }

    #[test]
    fn draws_by_repetition_fifty_moves_and_material() {
        let t = tables();
        let mut position = Position::start(t).expect("start");
        for text in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            play(&mut position, text);
        }
        assert!(position.is_draw(4));
        assert!(!position.is_draw(0));
        for text in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            play(&mut position, text);
        }
        assert!(position.is_draw(0));

        let fifty = Position::from_fen(t, "4k3/8/8/8/8/8/4P3/4K3 w - - 100 80").expect("fen");
        assert!(fifty.is_draw(0));
        // Checkmate on the hundredth halfmove stands.
        let mated =
            Position::from_fen(t, "7k/6Q1/6K1/8/8/8/8/8 b - - 100 80").expect("valid fen");
        assert!(!mated.is_draw(0));

        let minor = Position::from_fen(t, "4k3/8/8/8/8/8/8/2B1K3 w - - 0 1").expect("fen");
        assert!(minor.is_draw(0));
        let two_minors = Position::from_fen(t, "4k3/8/8/8/8/8/8/1NB1K3 w - - 0 1").expect("fen");
        assert!(!two_minors.is_draw(0));
    }
}
